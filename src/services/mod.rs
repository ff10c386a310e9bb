//! Service layer
//!
//! Ties configuration, the listings client, the assembler and storage
//! together for the CLI and the refresh scheduler.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::errors::AppResult;
use crate::guide::{AssemblerSettings, BuildReport, GuideAssembler};
use crate::models::Provider;
use crate::sources::{GracenoteClient, GracenoteSettings, GridSource};
use crate::storage::GuideStorage;

/// Builds and publishes the guide described by a [`Config`]
#[derive(Debug, Clone)]
pub struct GuideService {
    config: Config,
    storage: GuideStorage,
}

impl GuideService {
    pub fn new<P: Into<PathBuf>>(config: Config, output_path: P) -> Self {
        let storage = GuideStorage::new(output_path, config.prefs.historical_guide_days);
        Self { config, storage }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &GuideStorage {
        &self.storage
    }

    fn client(&self) -> AppResult<GracenoteClient> {
        GracenoteClient::new(GracenoteSettings::from_config(&self.config)?)
    }

    /// Fetch, assemble and publish a fresh guide
    pub async fn refresh(&self) -> AppResult<BuildReport> {
        let settings = AssemblerSettings::from_config(&self.config)?;
        let mut client = self.client()?;
        let report = GuideAssembler::new(settings)
            .build(&mut client, Utc::now())
            .await?;
        self.storage.publish(&report.xml).await?;
        Ok(report)
    }

    /// Providers serving each configured postal code
    pub async fn find_ids(&self) -> AppResult<Vec<(String, Vec<Provider>)>> {
        let client = self.client()?;
        let mut found = Vec::new();
        for postal_code in self.config.zip_codes()? {
            info!("Finding IDs for: {}", postal_code);
            let providers = client.find_providers(&postal_code).await?;
            found.push((postal_code, providers));
        }
        Ok(found)
    }

    /// Channels currently listed for the configured postal codes
    pub async fn available_channels(&self) -> AppResult<BTreeMap<ChannelSortKey, String>> {
        let mut client = self.client()?;
        available_channels(&mut client, &self.config.zip_codes()?, Utc::now()).await
    }
}

/// Orders channel ids numerically, with non-numeric ids after the rest
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChannelSortKey {
    numeric: u64,
    channel_id: String,
}

impl ChannelSortKey {
    pub fn new(channel_id: &str) -> Self {
        Self {
            numeric: channel_id.trim().parse().unwrap_or(u64::MAX),
            channel_id: channel_id.to_string(),
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }
}

/// `callSign::channelNo` for every channel in the current grid of each
/// postal code; a later postal code overwrites an earlier label
pub async fn available_channels<S>(
    source: &mut S,
    postal_codes: &[String],
    now: DateTime<Utc>,
) -> AppResult<BTreeMap<ChannelSortKey, String>>
where
    S: GridSource + ?Sized,
{
    source.authenticate().await?;

    let mut channels = BTreeMap::new();
    for postal_code in postal_codes {
        info!("Loading available channels for: {}", postal_code);
        let grid = source.fetch_grid(now, postal_code).await?;
        for channel in grid.channels {
            channels.insert(
                ChannelSortKey::new(&channel.channel_id),
                format!("{}::{}", channel.call_sign, channel.channel_no),
            );
        }
    }
    Ok(channels)
}

pub fn format_channel_table(channels: &BTreeMap<ChannelSortKey, String>) -> String {
    let mut table = format!("{:<15}|{:<40}|\n", "CHAN ID", "name");
    for (key, label) in channels {
        let _ = writeln!(table, "{:<15}|{:<40}|", key.channel_id(), label);
    }
    table
}

pub fn format_provider_table(providers: &[Provider]) -> String {
    let mut table = format!(
        "{:<15}|{:<40}|{:<15}|{:<15}|{:<25}|{:<15}\n",
        "type", "name", "location", "headendID", "lineupId", "device"
    );
    for provider in providers {
        let _ = writeln!(
            table,
            "{:<15}|{:<40}|{:<15}|{:<15}|{:<25}|{:<15}",
            provider.provider_type,
            provider.name,
            provider.location,
            provider.headend_id,
            provider.lineup_id,
            provider.device
        );
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GridChannel, GridResponse};
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct ChannelSource;

    #[async_trait]
    impl GridSource for ChannelSource {
        async fn authenticate(&mut self) -> AppResult<()> {
            Ok(())
        }

        async fn fetch_grid(
            &self,
            _instant: DateTime<Utc>,
            postal_code: &str,
        ) -> AppResult<GridResponse> {
            let channel = |id: &str, call_sign: &str| GridChannel {
                channel_id: id.to_string(),
                channel_no: format!("{}.{}", postal_code, id),
                call_sign: call_sign.to_string(),
                ..Default::default()
            };
            Ok(GridResponse {
                channels: vec![
                    channel("200", "WABC"),
                    channel("15", "WNBC"),
                    channel("x1", "LOCAL"),
                ],
            })
        }
    }

    #[test]
    fn test_channel_sort_key_orders_numerically() {
        let mut keys = vec![
            ChannelSortKey::new("200"),
            ChannelSortKey::new("abc"),
            ChannelSortKey::new("15"),
        ];
        keys.sort();
        let ids: Vec<_> = keys.iter().map(|k| k.channel_id()).collect();
        assert_eq!(ids, vec!["15", "200", "abc"]);
    }

    #[tokio::test]
    async fn test_available_channels_sorted_and_last_wins() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap();
        let postal_codes = vec!["10001".to_string(), "07001".to_string()];

        let channels = available_channels(&mut ChannelSource, &postal_codes, now)
            .await
            .unwrap();

        let rows: Vec<_> = channels
            .iter()
            .map(|(k, v)| (k.channel_id(), v.as_str()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("15", "WNBC::07001.15"),
                ("200", "WABC::07001.200"),
                ("x1", "LOCAL::07001.x1"),
            ]
        );

        let table = format_channel_table(&channels);
        assert!(table.starts_with("CHAN ID"));
        assert_eq!(table.lines().count(), 4);
    }

    #[test]
    fn test_provider_table() {
        let providers = vec![Provider {
            provider_type: "CABLE".to_string(),
            name: "Spectrum".to_string(),
            location: "New York".to_string(),
            headend_id: "NY31519".to_string(),
            lineup_id: "USA-NY31519-X".to_string(),
            device: "X".to_string(),
        }];
        let table = format_provider_table(&providers);
        let row = table.lines().nth(1).unwrap();
        assert!(row.starts_with("CABLE          |Spectrum"));
        assert!(row.contains("|USA-NY31519-X"));
    }
}
