//! Episode numbering in the three XMLTV systems the feed supports
//!
//! - `common`: `S02E05`, 1-indexed and zero padded
//! - `xmltv_ns`: `1.4`, 0-indexed season and episode
//! - `dd_progid`: the provider's program id, `EP012345.0042`

use tracing::debug;

pub const SYSTEM_COMMON: &str = "common";
pub const SYSTEM_XMLTV_NS: &str = "xmltv_ns";
pub const SYSTEM_DD_PROGID: &str = "dd_progid";

/// Program id suffix the provider uses for whole-series records
const SERIES_SUFFIX: &str = "0000";

/// The encoded episode numbers of one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeNumbers {
    /// `common` code, present only when the event has an episode number
    pub common: Option<String>,
    /// `xmltv_ns` code, present only when the event has an episode number
    pub xmltv_ns: Option<String>,
    pub dd_progid: String,
}

impl EpisodeNumbers {
    /// Events with an episode number are tagged with the `Series` category
    pub fn is_series(&self) -> bool {
        self.common.is_some()
    }
}

pub struct EpisodeEncoder;

impl EpisodeEncoder {
    pub fn encode(
        season: Option<&str>,
        episode: Option<&str>,
        series_id: &str,
        program_id: &str,
    ) -> EpisodeNumbers {
        let season = parse_number("season", season, program_id);
        let episode = parse_number("episode", episode, program_id);

        let (common, xmltv_ns) = if episode == 0 {
            (None, None)
        } else {
            let season_index = season.saturating_sub(1);
            (
                Some(format!("S{:02}E{:02}", season, episode)),
                Some(format!("{}.{}", season_index, episode - 1)),
            )
        };

        EpisodeNumbers {
            common,
            xmltv_ns,
            dd_progid: dd_progid(series_id, program_id),
        }
    }
}

/// `SH…` series ids become `EP…` ids unless the program id marks the whole series
pub fn dd_progid(series_id: &str, program_id: &str) -> String {
    let suffix = last_chars(program_id, 4);
    if suffix == SERIES_SUFFIX {
        format!("{}.{}", series_id, suffix)
    } else {
        format!("{}.{}", series_id.replace("SH", "EP"), suffix)
    }
}

/// The trailing `count` characters, or the whole string when it is shorter
fn last_chars(value: &str, count: usize) -> &str {
    value
        .char_indices()
        .rev()
        .nth(count - 1)
        .map(|(index, _)| &value[index..])
        .unwrap_or(value)
}

/// Missing or unparsable values count as zero
fn parse_number(field: &str, raw: Option<&str>, program_id: &str) -> u32 {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return 0;
    };

    raw.parse().unwrap_or_else(|_| {
        debug!(
            "Unparsable {} '{}' for program {}, treating as 0",
            field, raw, program_id
        );
        0
    })
}
