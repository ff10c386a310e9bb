//! Guide file storage
//!
//! Owns the published guide file and the timestamped historical copies kept
//! next to it.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::errors::AppResult;

pub const GUIDE_EXTENSION: &str = ".xmltv";
const SECONDS_PER_DAY: u64 = 86_400;

#[derive(Debug, Clone)]
pub struct GuideStorage {
    output_path: PathBuf,
    historical_days: u32,
}

impl GuideStorage {
    pub fn new<P: Into<PathBuf>>(output_path: P, historical_days: u32) -> Self {
        Self {
            output_path: output_path.into(),
            historical_days,
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Directory holding the guide and its historical copies
    pub fn output_dir(&self) -> PathBuf {
        match self.output_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Write the guide, replacing the previous one in a single rename
    pub async fn write_guide(&self, xml: &[u8]) -> AppResult<()> {
        let mut staging = self.output_path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        fs::write(&staging, xml).await?;
        fs::rename(&staging, &self.output_path).await?;
        info!("Guide written to {}", self.output_path.display());
        Ok(())
    }

    /// `name.xmltv` becomes `name.YYYYMMDDHHMMSS.xmltv`
    pub fn historical_path(&self, at: DateTime<Local>) -> PathBuf {
        let stamp = at.format("%Y%m%d%H%M%S");
        let output = self.output_path.to_string_lossy();
        let stem = output.strip_suffix(GUIDE_EXTENSION).unwrap_or(&output);
        PathBuf::from(format!("{}.{}{}", stem, stamp, GUIDE_EXTENSION))
    }

    pub async fn copy_historical(&self, xml: &[u8], at: DateTime<Local>) -> AppResult<PathBuf> {
        let path = self.historical_path(at);
        fs::write(&path, xml).await?;
        debug!("Historical guide written to {}", path.display());
        Ok(path)
    }

    /// Remove `*.xmltv` files in the output directory at least
    /// `historical_days` old. The published guide itself is never removed.
    /// Returns the removed paths.
    pub async fn clean_historical(&self, now: SystemTime) -> AppResult<Vec<PathBuf>> {
        let max_age = Duration::from_secs(u64::from(self.historical_days) * SECONDS_PER_DAY);
        let live_name = self.output_path.file_name();
        let mut removed = Vec::new();

        let mut entries = fs::read_dir(self.output_dir()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.file_name() == live_name {
                continue;
            }
            let is_guide = path
                .file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| name.ends_with(GUIDE_EXTENSION));
            if !is_guide {
                continue;
            }

            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let age = match metadata.modified() {
                Ok(modified) => now.duration_since(modified).unwrap_or_default(),
                Err(e) => {
                    warn!("Cannot read modification time of {}: {}", path.display(), e);
                    continue;
                }
            };

            if age >= max_age {
                fs::remove_file(&path).await?;
                info!("Removed historical guide {}", path.display());
                removed.push(path);
            }
        }

        Ok(removed)
    }

    /// Age of the published guide, `None` when it has not been written yet
    pub async fn guide_age(&self, now: SystemTime) -> Option<Duration> {
        let metadata = fs::metadata(&self.output_path).await.ok()?;
        let modified = metadata.modified().ok()?;
        Some(now.duration_since(modified).unwrap_or_default())
    }

    /// Write the guide, snapshot it and prune old snapshots
    pub async fn publish(&self, xml: &[u8]) -> AppResult<PathBuf> {
        self.write_guide(xml).await?;
        let historical = self.copy_historical(xml, Local::now()).await?;
        let removed = self.clean_historical(SystemTime::now()).await?;
        if !removed.is_empty() {
            info!("Pruned {} historical guides", removed.len());
        }
        Ok(historical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs::File;

    fn age_file(path: &Path, age: Duration) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_historical_path() {
        let storage = GuideStorage::new("/srv/guide/xmlguide.xmltv", 30);
        let at = Local.with_ymd_and_hms(2024, 5, 1, 18, 4, 9).unwrap();
        assert_eq!(
            storage.historical_path(at),
            PathBuf::from("/srv/guide/xmlguide.20240501180409.xmltv")
        );

        let storage = GuideStorage::new("guide.xml", 30);
        assert_eq!(
            storage.historical_path(at),
            PathBuf::from("guide.xml.20240501180409.xmltv")
        );
    }

    #[test]
    fn test_output_dir_of_bare_file_name() {
        assert_eq!(GuideStorage::new("xmlguide.xmltv", 30).output_dir(), PathBuf::from("."));
    }

    #[tokio::test]
    async fn test_publish_writes_guide_and_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let storage = GuideStorage::new(dir.path().join("xmlguide.xmltv"), 30);

        let historical = storage.publish(b"<tv/>").await.unwrap();

        assert_eq!(std::fs::read(storage.output_path()).unwrap(), b"<tv/>");
        assert_eq!(std::fs::read(&historical).unwrap(), b"<tv/>");
        assert!(!dir.path().join("xmlguide.xmltv.tmp").exists());
    }

    #[tokio::test]
    async fn test_clean_removes_only_old_guides() {
        let dir = tempfile::tempdir().unwrap();
        let storage = GuideStorage::new(dir.path().join("xmlguide.xmltv"), 2);

        let old = dir.path().join("xmlguide.20240101000000.xmltv");
        let fresh = dir.path().join("xmlguide.20240105000000.xmltv");
        let unrelated = dir.path().join("notes.txt");
        for path in [&old, &fresh, &unrelated] {
            std::fs::write(path, b"x").unwrap();
        }
        age_file(&old, Duration::from_secs(3 * SECONDS_PER_DAY));
        age_file(&fresh, Duration::from_secs(SECONDS_PER_DAY));
        age_file(&unrelated, Duration::from_secs(10 * SECONDS_PER_DAY));

        let removed = storage.clean_historical(SystemTime::now()).await.unwrap();

        assert_eq!(removed, vec![old.clone()]);
        assert!(!old.exists());
        assert!(fresh.exists());
        assert!(unrelated.exists());
    }

    #[tokio::test]
    async fn test_zero_retention_keeps_published_guide() {
        let dir = tempfile::tempdir().unwrap();
        let storage = GuideStorage::new(dir.path().join("xmlguide.xmltv"), 0);

        let historical = storage.publish(b"<tv/>").await.unwrap();

        assert!(storage.output_path().exists());
        assert!(!historical.exists());
        let age = storage.guide_age(SystemTime::now()).await;
        assert!(age.is_some());
    }

    #[tokio::test]
    async fn test_old_published_guide_survives_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let storage = GuideStorage::new(dir.path().join("xmlguide.xmltv"), 1);
        storage.write_guide(b"<tv/>").await.unwrap();
        age_file(storage.output_path(), Duration::from_secs(5 * SECONDS_PER_DAY));

        let removed = storage.clean_historical(SystemTime::now()).await.unwrap();

        assert!(removed.is_empty());
        assert!(storage.output_path().exists());
    }

    #[tokio::test]
    async fn test_guide_age() {
        let dir = tempfile::tempdir().unwrap();
        let storage = GuideStorage::new(dir.path().join("xmlguide.xmltv"), 30);
        assert!(storage.guide_age(SystemTime::now()).await.is_none());

        storage.write_guide(b"<tv/>").await.unwrap();
        age_file(storage.output_path(), Duration::from_secs(7200));
        let age = storage.guide_age(SystemTime::now()).await.unwrap();
        assert!(age >= Duration::from_secs(7200));
    }
}
