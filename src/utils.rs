//! Utility functions for the guide scraper
//!
//! - `utils::datetime` for XMLTV timestamp formatting
//! - URL and text helpers used when rendering channel blocks

pub mod datetime;

/// Normalize a channel logo path into an absolute http URL
///
/// The feed hands out protocol-relative paths such as
/// `//zap2it.tmsimg.com/assets/s10035_ll.png?w=55&h=55`. The query string is
/// dropped and leading slashes are stripped before prefixing `http://`.
pub fn normalize_icon_url(thumbnail: &str) -> String {
    let path = thumbnail.split('?').next().unwrap_or_default();
    format!("http://{}", path.trim_start_matches('/'))
}

/// Upper-case the first letter of every word and lower-case the rest
///
/// A word is any run of alphabetic characters, so `"NBC-WNBC"` becomes
/// `"Nbc-Wnbc"`.
pub fn title_case(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut previous_is_alpha = false;

    for c in input.chars() {
        if c.is_alphabetic() {
            if previous_is_alpha {
                output.extend(c.to_lowercase());
            } else {
                output.extend(c.to_uppercase());
            }
            previous_is_alpha = true;
        } else {
            output.push(c);
            previous_is_alpha = false;
        }
    }

    output
}
