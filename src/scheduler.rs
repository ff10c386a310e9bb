//! Background guide refresh
//!
//! Checks the published guide on a fixed interval and rebuilds it when it
//! is missing or older than the configured maximum age.

use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::services::GuideService;

const SECONDS_PER_HOUR: u64 = 3600;

#[derive(Clone)]
pub struct RefreshScheduler {
    service: Arc<GuideService>,
    check_interval: Duration,
    max_age: Duration,
    build_lock: Arc<Mutex<()>>,
}

impl RefreshScheduler {
    pub fn new(service: Arc<GuideService>) -> Self {
        let web = &service.config().web;
        let check_interval = Duration::from_secs(web.refresh_check_interval.max(1));
        let max_age = Duration::from_secs(web.max_guide_age * SECONDS_PER_HOUR);
        Self {
            service,
            check_interval,
            max_age,
            build_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Whether a guide of the given age should be rebuilt
    pub fn needs_refresh(&self, age: Option<Duration>) -> bool {
        match age {
            None => {
                info!("Guide data does not exist.");
                true
            }
            Some(age) if age > self.max_age => {
                info!("Guide is older than {} hours.", self.max_age.as_secs() / SECONDS_PER_HOUR);
                true
            }
            Some(_) => {
                info!(
                    "Guide was generated within the last {} hours.",
                    self.max_age.as_secs() / SECONDS_PER_HOUR
                );
                false
            }
        }
    }

    /// Run one freshness check, rebuilding when needed
    pub async fn tick(&self) {
        // A build that outlasts the interval must not be started twice
        let Ok(_guard) = self.build_lock.try_lock() else {
            debug!("Guide build still running, skipping check");
            return;
        };

        let age = self.service.storage().guide_age(SystemTime::now()).await;
        if !self.needs_refresh(age) {
            info!("Guide Is Still Valid");
            return;
        }

        match self.service.refresh().await {
            Ok(report) => info!(
                "Guide Refreshed: {} channels, {} programmes",
                report.channel_count(),
                report.programme_count()
            ),
            Err(e) => error!("Error Refreshing Guide: {}", e),
        }
    }

    /// Check forever; the first check runs immediately
    pub async fn start(self) {
        info!(
            "Starting guide refresh scheduler (every {}s)",
            self.check_interval.as_secs()
        );
        let mut interval = interval(self.check_interval);
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }
}
