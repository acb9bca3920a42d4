//! Text conventions for programs that talk in character codes
//!
//! Such programs read a line as its character codes followed by a newline
//! and print characters the same way. Values too large to be a character
//! are results and are shown as numbers.

/// Largest value rendered as a character
pub const MAX_CHAR: i64 = 127;

/// Character codes of `line` followed by a newline
pub fn encode_line(line: &str) -> Vec<i64> {
    line.bytes()
        .map(i64::from)
        .chain(std::iter::once(i64::from(b'\n')))
        .collect()
}

/// Render output values as text
pub fn render(values: &[i64]) -> String {
    let mut text = String::new();
    for value in values {
        match u8::try_from(*value) {
            Ok(byte) if i64::from(byte) <= MAX_CHAR => text.push(char::from(byte)),
            _ => text.push_str(&value.to_string()),
        }
    }
    text
}
