//! ISBN shape checks

/// Strip separators and return the ISBN if it has a valid ISBN-10 or ISBN-13 shape.
///
/// Only the shape is checked (9 digits plus a digit or `X`, or 13 digits);
/// check digits are not verified.
pub fn normalize_isbn(raw: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, '-' | ' ' | '\u{2010}' | '\u{2011}'))
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let bytes = compact.as_bytes();
    let valid = compact.is_ascii()
        && match bytes.len() {
            10 => bytes[..9].iter().all(u8::is_ascii_digit) && (bytes[9].is_ascii_digit() || bytes[9] == b'X'),
            13 => bytes.iter().all(u8::is_ascii_digit),
            _ => false,
        };

    valid.then_some(compact)
}
