//! XMLTV datetime formatting
//!
//! The listings feed publishes ISO-8601-like timestamps such as
//! `2024-05-01T18:00Z`. XMLTV wants the compact `YYYYMMDDhhmm[ss] +zzzz`
//! form, so `2024-05-01T18:00Z` becomes `202405011800 +0000`.
//!
//! # Usage
//!
//! ```rust
//! use guide_scrape::utils::datetime::XmltvDateFormatter;
//!
//! let start = XmltvDateFormatter::format_upstream("2024-05-01T18:00Z");
//! assert_eq!(start, "202405011800 +0000");
//! ```

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use tracing::warn;

const XMLTV_MINUTES_FORMAT: &str = "%Y%m%d%H%M %z";
const XMLTV_SECONDS_FORMAT: &str = "%Y%m%d%H%M%S %z";

/// Upstream shapes, paired with the XMLTV format that keeps their precision
const UTC_FORMATS: &[(&str, &str)] = &[
    ("%Y-%m-%dT%H:%MZ", "%Y%m%d%H%M +0000"),
    ("%Y-%m-%dT%H:%M:%SZ", "%Y%m%d%H%M%S +0000"),
];
const OFFSET_FORMATS: &[(&str, &str)] = &[
    ("%Y-%m-%dT%H:%M%:z", XMLTV_MINUTES_FORMAT),
    ("%Y-%m-%dT%H:%M:%S%:z", XMLTV_SECONDS_FORMAT),
];

/// Formatting helpers between upstream timestamps and XMLTV
pub struct XmltvDateFormatter;

impl XmltvDateFormatter {
    /// Convert an upstream timestamp into XMLTV's compact representation
    ///
    /// Precision is kept as sent: a feed value without seconds yields an
    /// XMLTV value without seconds. Unparseable input is logged and passed
    /// through trimmed.
    pub fn format_upstream(timestamp: &str) -> String {
        let trimmed = timestamp.trim();
        Self::parse_and_format(trimmed).unwrap_or_else(|| {
            warn!("Unrecognized upstream timestamp {:?}, passing through", trimmed);
            trimmed.to_string()
        })
    }

    fn parse_and_format(timestamp: &str) -> Option<String> {
        for (input, output) in UTC_FORMATS {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(timestamp, input) {
                return Some(parsed.format(output).to_string());
            }
        }
        for (input, output) in OFFSET_FORMATS {
            if let Ok(parsed) = DateTime::<FixedOffset>::parse_from_str(timestamp, input) {
                return Some(parsed.format(output).to_string());
            }
        }
        DateTime::parse_from_rfc3339(timestamp)
            .ok()
            .map(|parsed| parsed.format(XMLTV_SECONDS_FORMAT).to_string())
    }
}
