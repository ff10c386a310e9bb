//! Fetch instants covering the guide window
//!
//! The window opens 24 hours before "now", aligned down to a half hour, so
//! programmes that are in progress or recently ended are included. The feed
//! serves 3-hour grids, so one fetch is planned every 3 hours until the
//! configured number of days is covered.

use chrono::{DateTime, Duration, DurationRound, Utc};
use tracing::warn;

use crate::config::MAX_GUIDE_DAYS;

pub const LOOKBACK_HOURS: i64 = 24;
pub const ALIGNMENT_MINUTES: i64 = 30;
pub const GRID_STRIDE_HOURS: i64 = 3;

#[derive(Debug, Clone, Copy)]
pub struct TimeWindowPlanner {
    days: u32,
}

impl TimeWindowPlanner {
    /// Windows longer than [`MAX_GUIDE_DAYS`] are shortened to it
    pub fn new(days: u32) -> Self {
        if days > MAX_GUIDE_DAYS {
            warn!("{} guide days requested, planning {}", days, MAX_GUIDE_DAYS);
        }
        Self {
            days: days.min(MAX_GUIDE_DAYS),
        }
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    /// First instant of the window: (now - 24h) rounded down to 30 minutes
    pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
        let lookback = now - Duration::hours(LOOKBACK_HOURS);
        lookback
            .duration_trunc(Duration::minutes(ALIGNMENT_MINUTES))
            .unwrap_or(lookback)
    }

    /// Exclusive end of the window; a window that would run past the
    /// representable range ends where it starts
    pub fn window_end(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let start = Self::window_start(now);
        start
            .checked_add_signed(Duration::days(i64::from(self.days)))
            .unwrap_or_else(|| {
                warn!("Guide window of {} days from {} is out of range", self.days, start);
                start
            })
    }

    /// Ordered fetch instants `t0, t0+3h, …` strictly before the window end
    pub fn plan(&self, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let start = Self::window_start(now);
        let end = self.window_end(now);
        let stride = Duration::hours(GRID_STRIDE_HOURS);

        let mut instants = Vec::new();
        let mut instant = start;
        while instant < end {
            instants.push(instant);
            instant += stride;
        }
        instants
    }
}
