//! Gracenote (zap2it) listings client
//!
//! Handles the three upstream calls the scraper makes: account login, the
//! postal code provider lookup, and the `api/grid` listings request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::traits::GridSource;
use crate::config::Config;
use crate::errors::{AppResult, ConfigError, SourceError};
use crate::models::{GridResponse, LoginResponse, Provider, ProviderResponse};

pub const LOGIN_URL: &str = "https://tvlistings.gracenote.com/api/user/login";
pub const PROVIDERS_URL: &str =
    "https://tvlistings.gracenote.com/gapzap_webapi/api/Providers/getPostalCodeProviders";
pub const GRID_URL: &str = "https://tvlistings.gracenote.com/api/grid";

/// The service rejects requests without a browser user agent
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_9_3) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/35.0.1916.47 Safari/537.36";

const AFFILIATE_ID: &str = "orbebb";
const GRID_TIMESPAN_HOURS: &str = "3";
const DEFAULT_DEVICE: &str = "-";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Account and lineup settings for the listings service
#[derive(Debug, Clone)]
pub struct GracenoteSettings {
    pub username: String,
    pub password: String,
    pub country: String,
    pub lang: String,
    pub lineup_id: Option<String>,
    pub headend_id: Option<String>,
    pub device: Option<String>,
}

impl GracenoteSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let username = config
            .creds
            .username
            .clone()
            .ok_or_else(|| ConfigError::missing_setting("creds", "username"))?;
        let password = config
            .creds
            .password
            .clone()
            .ok_or_else(|| ConfigError::missing_setting("creds", "password"))?;

        Ok(Self {
            username,
            password,
            country: config.prefs.country.clone(),
            lang: config.prefs.lang.clone(),
            lineup_id: non_empty(&config.lineup.lineup_id),
            headend_id: non_empty(&config.lineup.headend_id),
            device: non_empty(&config.lineup.device),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Session negotiated at login
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    /// Headend published on the account, used when no lineup is configured
    pub headend_id: Option<String>,
}

pub struct GracenoteClient {
    client: Client,
    settings: GracenoteSettings,
    session: Option<Session>,
}

impl GracenoteClient {
    pub fn new(settings: GracenoteSettings) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            settings,
            session: None,
        })
    }

    /// List the lineup providers serving a postal code
    pub async fn find_providers(&self, postal_code: &str) -> AppResult<Vec<Provider>> {
        let url = self.providers_url(postal_code);
        info!("Loading provider ID data from: {}", url);

        let response: ProviderResponse = self.fetch_json(self.client.get(&url), &url).await?;
        Ok(response.providers)
    }

    pub fn providers_url(&self, postal_code: &str) -> String {
        let mut url = format!(
            "{}/{}/{}/gapzap/",
            PROVIDERS_URL, self.settings.country, postal_code
        );
        url.push_str(&self.settings.lang);
        url
    }

    /// Query string of a grid request for one cell
    pub fn grid_query(
        &self,
        instant: DateTime<Utc>,
        postal_code: &str,
    ) -> AppResult<Vec<(&'static str, String)>> {
        let session = self.session.as_ref().ok_or(SourceError::NotAuthenticated)?;

        let lineup_id = self
            .settings
            .lineup_id
            .clone()
            .or_else(|| session.headend_id.clone())
            .unwrap_or_else(|| {
                warn!("No lineup_id configured and none published on the account");
                String::new()
            });
        let headend_id = self
            .settings
            .headend_id
            .clone()
            .unwrap_or_else(|| lineup_id.clone());
        let device = self
            .settings
            .device
            .clone()
            .unwrap_or_else(|| DEFAULT_DEVICE.to_string());

        Ok(vec![
            ("Activity_ID", "1".to_string()),
            ("FromPage", "TV Guide".to_string()),
            ("AffiliateId", AFFILIATE_ID.to_string()),
            ("token", session.token.clone()),
            ("aid", AFFILIATE_ID.to_string()),
            ("lineupId", lineup_id),
            ("timespan", GRID_TIMESPAN_HOURS.to_string()),
            ("headendId", headend_id),
            ("country", self.settings.country.clone()),
            ("device", device),
            ("postalCode", postal_code.to_string()),
            ("isOverride", "true".to_string()),
            ("time", instant.timestamp().to_string()),
            ("pref", "m,p".to_string()),
            ("userId", "-".to_string()),
        ])
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> AppResult<T> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                url: context.to_string(),
            }
            .into());
        }

        let body = response.text().await?;
        debug!("Received {} bytes from {}", body.len(), context);
        serde_json::from_str(&body)
            .map_err(|e| SourceError::parse_error(context, e.to_string()).into())
    }
}

#[async_trait]
impl GridSource for GracenoteClient {
    async fn authenticate(&mut self) -> AppResult<()> {
        let form = [
            ("emailid", self.settings.username.as_str()),
            ("password", self.settings.password.as_str()),
            ("isfacebookuser", "false"),
            ("usertype", "0"),
            ("objectid", ""),
        ];

        let login: LoginResponse = self
            .fetch_json(self.client.post(LOGIN_URL).form(&form[..]), LOGIN_URL)
            .await
            .map_err(|e| {
                warn!("Error connecting to tvlistings.gracenote.com: {}", e);
                e
            })?;

        let headend_id = login.headend_id();
        let token = login
            .token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| SourceError::auth_failed("login response did not include a token"))?;

        info!("Authenticated with tvlistings.gracenote.com");
        self.session = Some(Session { token, headend_id });
        Ok(())
    }

    async fn fetch_grid(
        &self,
        instant: DateTime<Utc>,
        postal_code: &str,
    ) -> AppResult<GridResponse> {
        let query = self.grid_query(instant, postal_code)?;
        let context = format!("{} ({} :: {})", GRID_URL, instant.timestamp(), postal_code);
        self.fetch_json(self.client.get(GRID_URL).query(&query), &context)
            .await
    }
}
