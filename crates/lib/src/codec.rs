//! Invisible identifier codec: hides a numeric id inside ordinary message text.
//!
//! Each ASCII digit maps to one invisible code point. An encoded id is a fixed
//! marker (three zero-width spaces) followed by one code point per digit, appended
//! after the visible text. Chat clients keep these code points but do not render
//! them, so the id survives a round trip through a posted message.

/// Invisible code point for each digit, indexed by digit value.
const DIGIT_CHARS: [char; 10] = [
    '\u{200B}', // zero-width space
    '\u{200C}', // zero-width non-joiner
    '\u{200D}', // zero-width joiner
    '\u{2060}', // word joiner
    '\u{2061}', // function application
    '\u{2062}', // invisible times
    '\u{2063}', // invisible separator
    '\u{2064}', // invisible plus
    '\u{206A}', // inhibit symmetric swapping
    '\u{206B}', // activate symmetric swapping
];

/// Marker placed before the encoded digits.
pub const MARKER: &str = "\u{200B}\u{200B}\u{200B}";

fn encode_digit(c: char) -> Option<char> {
    c.to_digit(10).map(|d| DIGIT_CHARS[d as usize])
}

fn decode_char(c: char) -> Option<char> {
    DIGIT_CHARS
        .iter()
        .position(|&z| z == c)
        .and_then(|d| char::from_digit(d as u32, 10))
}

/// True if `c` belongs to the invisible digit alphabet.
pub fn is_hidden(c: char) -> bool {
    DIGIT_CHARS.contains(&c)
}

/// Map each ASCII digit of `id` to its invisible code point. Non-digit characters are dropped.
pub fn encode_digits(id: &str) -> String {
    id.chars().filter_map(encode_digit).collect()
}

/// Append `MARKER` and the encoded `id` to `visible`.
///
/// Any invisible alphabet code points already present in `visible` are removed first,
/// so a stray zero-width space in the host text cannot be mistaken for the marker.
pub fn embed(visible: &str, id: &str) -> String {
    let mut out = strip_hidden(visible);
    out.push_str(MARKER);
    out.push_str(&encode_digits(id));
    out
}

/// Recover the identifier hidden in `text`.
///
/// Finds the first `MARKER` and reads mapped code points after it until the first
/// unmapped character or the end of the text. Returns `None` when there is no marker
/// or no digits follow it.
pub fn decode(text: &str) -> Option<String> {
    let idx = text.find(MARKER)?;
    let id: String = text[idx + MARKER.len()..]
        .chars()
        .map_while(decode_char)
        .collect();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Remove every invisible alphabet code point from `text`.
pub fn strip_hidden(text: &str) -> String {
    text.chars().filter(|c| !is_hidden(*c)).collect()
}

/// "**From**: {username}" line with the sender id hidden after the name.
/// Replying to a message containing this line lets the dispatcher recover `sender_id`.
pub fn sender_line(username: &str, sender_id: &str) -> String {
    embed(&format!("**From**: {}", username), sender_id)
}
