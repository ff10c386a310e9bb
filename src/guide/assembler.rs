//! Guide assembly
//!
//! Walks every (time instant, postal code) cell of the plan in order, feeds
//! each fetched grid through the channel and event registries, and
//! serializes the result. Dedup state is created per [`GuideAssembler::build`]
//! call, so repeated builds never see each other's channels or events.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

use super::document::GuideDocument;
use super::planner::TimeWindowPlanner;
use super::programme::ProgrammeBuilder;
use super::registry::{ChannelRegistry, EventRegistry, FavoritesFilter};
use crate::config::Config;
use crate::errors::{AppError, AppResult, ConfigError};
use crate::models::GridResponse;
use crate::sources::GridSource;

/// Where a build currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyPhase {
    Init,
    Authenticated,
    Building {
        time_index: usize,
        postal_index: usize,
    },
    Serialized,
    Done,
}

impl fmt::Display for AssemblyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssemblyPhase::Init => write!(f, "init"),
            AssemblyPhase::Authenticated => write!(f, "authenticated"),
            AssemblyPhase::Building {
                time_index,
                postal_index,
            } => write!(f, "building({}, {})", time_index, postal_index),
            AssemblyPhase::Serialized => write!(f, "serialized"),
            AssemblyPhase::Done => write!(f, "done"),
        }
    }
}

/// What to do when a single grid fetch fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Record the failed cell and keep going
    #[default]
    Isolate,
    /// Abort the whole build on the first failure
    Abort,
}

/// Inputs of a build
#[derive(Debug, Clone)]
pub struct AssemblerSettings {
    pub lang: String,
    pub guide_days: u32,
    pub favorites: HashSet<String>,
    pub zip_codes: Vec<String>,
    pub failure_policy: FailurePolicy,
}

impl AssemblerSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let favorites = config.prefs.favorites();
        if favorites.is_empty() {
            info!("No favorite channels set, all channels will be included.");
        }

        Ok(Self {
            lang: config.prefs.lang.clone(),
            guide_days: config.prefs.guide_days(),
            favorites,
            zip_codes: config.zip_codes()?,
            failure_policy: if config.prefs.strict {
                FailurePolicy::Abort
            } else {
                FailurePolicy::Isolate
            },
        })
    }
}

/// A cell whose grid could not be fetched
#[derive(Debug, Clone)]
pub struct FailedCell {
    pub instant: DateTime<Utc>,
    pub postal_code: String,
    pub error: String,
}

/// Outcome of one build
#[derive(Debug)]
pub struct BuildReport {
    pub document: GuideDocument,
    pub xml: Vec<u8>,
    pub cells_planned: usize,
    pub cells_fetched: usize,
    pub failed_cells: Vec<FailedCell>,
}

impl BuildReport {
    pub fn channel_count(&self) -> usize {
        self.document.channels().len()
    }

    pub fn programme_count(&self) -> usize {
        self.document.programmes().len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed_cells.is_empty()
    }
}

pub struct GuideAssembler {
    settings: AssemblerSettings,
}

impl GuideAssembler {
    pub fn new(settings: AssemblerSettings) -> Self {
        Self { settings }
    }

    /// Build the full guide for the window around `now`
    pub async fn build<S>(&self, source: &mut S, now: DateTime<Utc>) -> AppResult<BuildReport>
    where
        S: GridSource + ?Sized,
    {
        let mut phase = AssemblyPhase::Init;
        debug!("Guide build phase: {}", phase);

        if self.settings.zip_codes.is_empty() {
            return Err(AppError::build("no postal codes configured"));
        }

        source.authenticate().await?;
        advance(&mut phase, AssemblyPhase::Authenticated);

        let planner = TimeWindowPlanner::new(self.settings.guide_days);
        let instants = planner.plan(now);
        info!("Loading guide data for {} days", planner.days());

        let favorites = FavoritesFilter::new(self.settings.favorites.clone());
        let mut document = GuideDocument::new();
        let mut channels = ChannelRegistry::new(favorites.clone());
        let builder = ProgrammeBuilder::new(self.settings.lang.as_str());
        let mut events = EventRegistry::new(favorites, builder);

        // Postal codes whose channel list has not been registered yet. Normally
        // this empties on the first instant; a code whose first grid failed
        // stays pending until one of its grids arrives.
        let mut channels_pending: Vec<bool> = vec![true; self.settings.zip_codes.len()];

        let cells_planned = instants.len() * self.settings.zip_codes.len();
        let mut cells_fetched = 0;
        let mut failed_cells = Vec::new();

        for (time_index, instant) in instants.iter().enumerate() {
            for (postal_index, postal_code) in self.settings.zip_codes.iter().enumerate() {
                advance(
                    &mut phase,
                    AssemblyPhase::Building {
                        time_index,
                        postal_index,
                    },
                );
                info!("Load Guide for time: {} :: {}", instant.timestamp(), postal_code);

                let grid = match source.fetch_grid(*instant, postal_code).await {
                    Ok(grid) => grid,
                    Err(e) => match self.settings.failure_policy {
                        FailurePolicy::Abort => return Err(e),
                        FailurePolicy::Isolate => {
                            warn!(
                                "Failed to load guide for time: {} :: {}: {}",
                                instant.timestamp(),
                                postal_code,
                                e
                            );
                            failed_cells.push(FailedCell {
                                instant: *instant,
                                postal_code: postal_code.clone(),
                                error: e.to_string(),
                            });
                            continue;
                        }
                    },
                };
                cells_fetched += 1;

                if channels_pending[postal_index] {
                    let added = add_channels(&grid, &mut channels, &mut document);
                    debug!("Added {} channels from {}", added, postal_code);
                    channels_pending[postal_index] = false;
                }
                let added = add_events(&grid, &mut events, &mut document);
                debug!("Added {} events from {} :: {}", added, instant.timestamp(), postal_code);
            }
        }

        if cells_planned > 0 && cells_fetched == 0 {
            return Err(AppError::build(format!(
                "all {} grid fetches failed",
                cells_planned
            )));
        }

        let xml = document.to_xml()?;
        advance(&mut phase, AssemblyPhase::Serialized);

        info!(
            "Guide built: {} channels, {} programmes, {}/{} grids fetched",
            channels.len(),
            events.len(),
            cells_fetched,
            cells_planned
        );
        if !failed_cells.is_empty() {
            warn!("{} grid fetches failed; guide is partial", failed_cells.len());
        }
        advance(&mut phase, AssemblyPhase::Done);

        Ok(BuildReport {
            document,
            xml,
            cells_planned,
            cells_fetched,
            failed_cells,
        })
    }
}

fn advance(phase: &mut AssemblyPhase, next: AssemblyPhase) {
    debug!("Guide build phase: {} -> {}", phase, next);
    *phase = next;
}

fn add_channels(
    grid: &GridResponse,
    registry: &mut ChannelRegistry,
    document: &mut GuideDocument,
) -> usize {
    grid.channels
        .iter()
        .filter(|channel| registry.add_if_new(channel, document))
        .count()
}

fn add_events(
    grid: &GridResponse,
    registry: &mut EventRegistry,
    document: &mut GuideDocument,
) -> usize {
    let mut added = 0;
    for channel in &grid.channels {
        for event in &channel.events {
            if registry.add_if_new(event, &channel.channel_id, document) {
                added += 1;
            }
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceError;
    use crate::models::{GridChannel, GridEvent};
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct FixedSource {
        authenticated: bool,
        grid: GridResponse,
        fail_postal: Option<String>,
    }

    #[async_trait]
    impl GridSource for FixedSource {
        async fn authenticate(&mut self) -> AppResult<()> {
            self.authenticated = true;
            Ok(())
        }

        async fn fetch_grid(
            &self,
            _instant: DateTime<Utc>,
            postal_code: &str,
        ) -> AppResult<GridResponse> {
            if !self.authenticated {
                return Err(SourceError::NotAuthenticated.into());
            }
            if self.fail_postal.as_deref() == Some(postal_code) {
                return Err(SourceError::Http {
                    status: 500,
                    url: "grid".to_string(),
                }
                .into());
            }
            Ok(self.grid.clone())
        }
    }

    fn grid() -> GridResponse {
        GridResponse {
            channels: vec![GridChannel {
                channel_id: "10001".to_string(),
                channel_no: "4".to_string(),
                call_sign: "WNBC".to_string(),
                affiliate_name: "NBC".to_string(),
                events: vec![GridEvent {
                    start_time: "2024-05-01T18:00Z".to_string(),
                    end_time: "2024-05-01T18:30Z".to_string(),
                    duration: "30".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
    }

    fn settings(zip_codes: &[&str], policy: FailurePolicy) -> AssemblerSettings {
        AssemblerSettings {
            lang: "en".to_string(),
            guide_days: 1,
            favorites: HashSet::new(),
            zip_codes: zip_codes.iter().map(|z| z.to_string()).collect(),
            failure_policy: policy,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 18, 47, 0).unwrap()
    }

    #[tokio::test]
    async fn test_repeated_grids_deduplicate() {
        let mut source = FixedSource {
            authenticated: false,
            grid: grid(),
            fail_postal: None,
        };
        let assembler = GuideAssembler::new(settings(&["10001", "10002"], FailurePolicy::Isolate));

        let report = assembler.build(&mut source, now()).await.unwrap();
        assert_eq!(report.cells_planned, 16);
        assert_eq!(report.cells_fetched, 16);
        assert_eq!(report.channel_count(), 1);
        assert_eq!(report.programme_count(), 1);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_isolated_failures_are_reported() {
        let mut source = FixedSource {
            authenticated: false,
            grid: grid(),
            fail_postal: Some("10002".to_string()),
        };
        let assembler = GuideAssembler::new(settings(&["10001", "10002"], FailurePolicy::Isolate));

        let report = assembler.build(&mut source, now()).await.unwrap();
        assert_eq!(report.cells_fetched, 8);
        assert_eq!(report.failed_cells.len(), 8);
        assert!(report.failed_cells.iter().all(|c| c.postal_code == "10002"));
    }

    #[tokio::test]
    async fn test_abort_policy_stops_on_first_failure() {
        let mut source = FixedSource {
            authenticated: false,
            grid: grid(),
            fail_postal: Some("10002".to_string()),
        };
        let assembler = GuideAssembler::new(settings(&["10001", "10002"], FailurePolicy::Abort));
        assert!(assembler.build(&mut source, now()).await.is_err());
    }

    #[tokio::test]
    async fn test_no_postal_codes_is_an_error() {
        let mut source = FixedSource {
            authenticated: false,
            grid: grid(),
            fail_postal: None,
        };
        let assembler = GuideAssembler::new(settings(&[], FailurePolicy::Isolate));
        let err = assembler.build(&mut source, now()).await.unwrap_err();
        assert!(matches!(err, AppError::Build { .. }));
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.prefs.zip_code = vec!["10001".to_string()];
        config.prefs.strict = true;

        let settings = AssemblerSettings::from_config(&config).unwrap();
        assert_eq!(settings.zip_codes, vec!["10001"]);
        assert_eq!(settings.guide_days, 14);
        assert_eq!(settings.failure_policy, FailurePolicy::Abort);
    }

    #[test]
    fn test_phase_display() {
        let phase = AssemblyPhase::Building {
            time_index: 2,
            postal_index: 1,
        };
        assert_eq!(phase.to_string(), "building(2, 1)");
    }
}
