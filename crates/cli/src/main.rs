use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "igrelay")]
#[command(about = "Relay Discord replies to Instagram DMs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the gateway (Discord interactions endpoint + Instagram webhook). Secrets are loaded once; a missing or malformed secrets file aborts startup.
    Serve {
        /// Config file path (default: IGRELAY_CONFIG_PATH or ~/.igrelay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config or 8080)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Append a hidden recipient id to TEXT and print the result.
    Encode {
        text: String,
        /// Numeric id; non-digit characters are dropped.
        id: String,
    },

    /// Print the recipient id hidden in TEXT.
    Decode { text: String },

    /// Refresh the Instagram long-lived access token and write it back to the secrets file.
    RefreshToken {
        /// Config file path (default: IGRELAY_CONFIG_PATH or ~/.igrelay/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("igrelay {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Encode { text, id }) => {
            println!("{}", lib::codec::embed(&text, &id));
        }
        Some(Commands::Decode { text }) => match lib::codec::decode(&text) {
            Some(id) => println!("{}", id),
            None => {
                eprintln!("no identifier found");
                std::process::exit(1);
            }
        },
        Some(Commands::RefreshToken { config }) => {
            if let Err(e) = run_refresh_token(config).await {
                log::error!("token refresh failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, _) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    let secrets_path = lib::config::resolve_secrets_path(&config);
    let secrets = lib::config::load_secrets(&secrets_path)?;
    log::info!("starting gateway on {}:{}", config.gateway.bind, config.gateway.port);
    lib::gateway::run_gateway(config, secrets).await
}

async fn run_refresh_token(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let (config, _) = lib::config::load_config(config_path)?;
    let secrets_path = lib::config::resolve_secrets_path(&config);
    let raw = lib::config::read_secrets_file(&secrets_path)?;
    let current = raw
        .get("INSTAGRAM_ACCESS_TOKEN")
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("INSTAGRAM_ACCESS_TOKEN not found in {}", secrets_path.display()))?;
    let channel = lib::channels::InstagramChannel::new(
        config.instagram.api_base.clone(),
        config.instagram.api_version.clone(),
        current,
    );
    let token = channel
        .refresh_access_token()
        .await
        .map_err(|e| anyhow::anyhow!("could not refresh token: {}", e))?;
    lib::config::write_access_token(&secrets_path, &token)?;
    println!("refreshed Instagram access token in {}", secrets_path.display());
    Ok(())
}
