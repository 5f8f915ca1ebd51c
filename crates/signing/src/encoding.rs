//! Query-component encoding used in canonical requests.

use std::fmt::Write as FmtWrite;

/// Percent-encodes a query key or value.
///
/// Unreserved characters (`A-Z a-z 0-9 - _ . ~`) pass through. Every other
/// byte of the UTF-8 encoding becomes `%XX` with upper-case hex, including
/// `! ' ( ) *`, except a space, which becomes `+`.
pub fn url_encode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());

    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            b' ' => result.push('+'),
            _ => {
                // Writing to a String cannot fail.
                let _ = write!(result, "%{byte:02X}");
            }
        }
    }

    result
}
