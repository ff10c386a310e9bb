//! Configuration loading
//!
//! Settings live in a TOML file split into `[creds]`, `[prefs]`, `[lineup]`
//! and `[web]` sections. Every key can be overridden from the environment
//! as `ZAP2IT_<SECTION>_<KEY>`, e.g. `ZAP2IT_PREFS_GUIDE_DAYS=7`.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "./zap2itconfig.toml";
pub const DEFAULT_OUTPUT_FILE: &str = "xmlguide.xmltv";
pub const DEFAULT_GUIDE_DAYS: u32 = 14;
/// Longest guide window accepted from configuration
pub const MAX_GUIDE_DAYS: u32 = 366;
pub const DEFAULT_HISTORICAL_GUIDE_DAYS: u32 = 30;
pub const ENV_PREFIX: &str = "ZAP2IT";

/// Keys that may be overridden from the environment, per section
const OVERRIDABLE_KEYS: &[(&str, &[&str])] = &[
    ("creds", &["username", "password"]),
    (
        "prefs",
        &[
            "country",
            "zip_code",
            "lang",
            "guide_days",
            "historical_guide_days",
            "favorite_channels",
            "strict",
        ],
    ),
    ("lineup", &["lineup_id", "headend_id", "device"]),
    (
        "web",
        &["host", "port", "refresh_check_interval", "max_guide_age"],
    ),
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub creds: CredsConfig,
    #[serde(default)]
    pub prefs: PrefsConfig,
    #[serde(default)]
    pub lineup: LineupConfig,
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredsConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefsConfig {
    #[serde(default = "default_country")]
    pub country: String,
    /// A single postal code, a JSON list in a string, or a TOML array
    #[serde(default, deserialize_with = "deserialize_string_list")]
    pub zip_code: Vec<String>,
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Kept raw so a malformed value can fall back to the default
    #[serde(default)]
    pub guide_days: Option<toml::Value>,
    #[serde(default = "default_historical_guide_days")]
    pub historical_guide_days: u32,
    /// Channel ids to keep; empty keeps everything
    #[serde(default, deserialize_with = "deserialize_string_list")]
    pub favorite_channels: Vec<String>,
    /// Abort the whole build on the first failed grid fetch
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineupConfig {
    pub lineup_id: Option<String>,
    pub headend_id: Option<String>,
    pub device: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Seconds between freshness checks of the published guide
    #[serde(default = "default_refresh_check_interval")]
    pub refresh_check_interval: u64,
    /// Hours after which the published guide is rebuilt
    #[serde(default = "default_max_guide_age")]
    pub max_guide_age: u64,
}

fn default_country() -> String {
    "us".to_string()
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_historical_guide_days() -> u32 {
    DEFAULT_HISTORICAL_GUIDE_DAYS
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9000
}

fn default_refresh_check_interval() -> u64 {
    60
}

fn default_max_guide_age() -> u64 {
    24
}

impl Default for PrefsConfig {
    fn default() -> Self {
        Self {
            country: default_country(),
            zip_code: Vec::new(),
            lang: default_lang(),
            guide_days: None,
            historical_guide_days: default_historical_guide_days(),
            favorite_channels: Vec::new(),
            strict: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            refresh_check_interval: default_refresh_check_interval(),
            max_guide_age: default_max_guide_age(),
        }
    }
}

impl PrefsConfig {
    /// Number of days the guide should span
    ///
    /// Missing, unparsable or out of range values (above
    /// [`MAX_GUIDE_DAYS`]) fall back to [`DEFAULT_GUIDE_DAYS`].
    pub fn guide_days(&self) -> u32 {
        let parsed = match &self.guide_days {
            None => {
                info!("guide_days not in config. using default: {}", DEFAULT_GUIDE_DAYS);
                return DEFAULT_GUIDE_DAYS;
            }
            Some(toml::Value::Integer(days)) => u32::try_from(*days).ok(),
            Some(toml::Value::String(days)) => days.trim().parse::<u32>().ok(),
            Some(_) => None,
        };

        parsed.filter(|days| *days <= MAX_GUIDE_DAYS).unwrap_or_else(|| {
            warn!(
                "guide_days {:?} is not a valid day count. using default: {}",
                self.guide_days, DEFAULT_GUIDE_DAYS
            );
            DEFAULT_GUIDE_DAYS
        })
    }

    /// Favorite channel ids as a lookup set
    pub fn favorites(&self) -> HashSet<String> {
        self.favorite_channels.iter().cloned().collect()
    }
}

impl Config {
    /// Load configuration from a file, applying environment overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let origin = path.display().to_string();

        if !path.exists() {
            return Err(ConfigError::Missing { path: origin });
        }

        info!("Loading config: {}", origin);
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: origin.clone(),
            message: e.to_string(),
        })?;

        Self::from_toml_str(&contents, &origin, |name| std::env::var(name).ok())
    }

    /// Parse configuration text, consulting `env` for overrides
    pub fn from_toml_str<F>(contents: &str, origin: &str, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let invalid = |message: String| ConfigError::Invalid {
            path: origin.to_string(),
            message,
        };

        let mut root = contents
            .parse::<toml::Table>()
            .map_err(|e| invalid(e.to_string()))?;

        for (section, keys) in OVERRIDABLE_KEYS {
            for key in keys.iter() {
                let var = env_var_name(section, key);
                let Some(value) = env(&var) else {
                    debug!("No environment override {} for {}.{}", var, section, key);
                    continue;
                };

                info!("Using environment variable {} for {}.{}", var, section, key);
                let table = root
                    .entry(section.to_string())
                    .or_insert_with(|| toml::Value::Table(toml::Table::new()));
                match table {
                    toml::Value::Table(table) => {
                        table.insert(key.to_string(), env_value(key, &value));
                    }
                    _ => return Err(invalid(format!("[{}] is not a table", section))),
                }
            }
        }

        toml::Value::Table(root)
            .try_into::<Config>()
            .map_err(|e: toml::de::Error| invalid(e.to_string()))
    }

    /// Configured postal codes, trimmed and without blanks
    pub fn zip_codes(&self) -> Result<Vec<String>, ConfigError> {
        let codes: Vec<String> = self
            .prefs
            .zip_code
            .iter()
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .collect();

        if codes.is_empty() {
            return Err(ConfigError::missing_setting("prefs", "zip_code"));
        }

        info!("Loaded Zip Codes: {:?}", codes);
        Ok(codes)
    }
}

/// `ZAP2IT_PREFS_GUIDE_DAYS` for (`prefs`, `guide_days`)
pub fn env_var_name(section: &str, key: &str) -> String {
    format!(
        "{}_{}_{}",
        ENV_PREFIX,
        section.to_uppercase(),
        key.to_uppercase()
    )
}

/// Settings whose environment value is coerced to a TOML integer or boolean
const TYPED_KEYS: &[&str] = &[
    "guide_days",
    "historical_guide_days",
    "strict",
    "port",
    "refresh_check_interval",
    "max_guide_age",
];

/// Environment values are untyped. Numeric and boolean settings are coerced
/// so they still deserialize; everything else stays a string so postal codes
/// keep their leading zeros.
fn env_value(key: &str, raw: &str) -> toml::Value {
    if TYPED_KEYS.contains(&key) {
        if let Ok(number) = raw.trim().parse::<i64>() {
            return toml::Value::Integer(number);
        }
        match raw.trim() {
            "true" => return toml::Value::Boolean(true),
            "false" => return toml::Value::Boolean(false),
            _ => {}
        }
    }
    toml::Value::String(raw.to_string())
}

/// Accepts a TOML array, a JSON list inside a string, or a single string
/// split on commas and whitespace
fn deserialize_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<toml::Value>::deserialize(deserializer)?;
    Ok(match value {
        None => Vec::new(),
        Some(toml::Value::Array(items)) => items.iter().map(scalar_to_string).collect(),
        Some(toml::Value::String(raw)) => split_string_list(&raw),
        Some(other) => vec![scalar_to_string(&other)],
    })
}

fn scalar_to_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn split_string_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        if let Ok(items) = serde_json::from_str::<Vec<serde_json::Value>>(trimmed) {
            return items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect();
        }
        warn!("Could not parse list {:?} as JSON, splitting on separators", trimmed);
    }

    trimmed
        .split(|c: char| c == ',' || c.is_whitespace() || c == '[' || c == ']' || c == '"')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_for_empty_file() {
        let config = Config::from_toml_str("", "test", no_env).unwrap();
        assert_eq!(config.prefs.country, "us");
        assert_eq!(config.prefs.lang, "en");
        assert_eq!(config.prefs.guide_days(), DEFAULT_GUIDE_DAYS);
        assert_eq!(config.prefs.historical_guide_days, 30);
        assert!(config.prefs.favorites().is_empty());
        assert!(!config.prefs.strict);
        assert_eq!(config.web.port, 9000);
        assert!(config.zip_codes().is_err());
    }

    #[test]
    fn test_guide_days_fallback() {
        let config =
            Config::from_toml_str("[prefs]\nguide_days = \"soon\"\n", "test", no_env).unwrap();
        assert_eq!(config.prefs.guide_days(), DEFAULT_GUIDE_DAYS);

        let config = Config::from_toml_str("[prefs]\nguide_days = -3\n", "test", no_env).unwrap();
        assert_eq!(config.prefs.guide_days(), DEFAULT_GUIDE_DAYS);

        let config =
            Config::from_toml_str("[prefs]\nguide_days = \"7\"\n", "test", no_env).unwrap();
        assert_eq!(config.prefs.guide_days(), 7);

        let config = Config::from_toml_str("[prefs]\nguide_days = 3\n", "test", no_env).unwrap();
        assert_eq!(config.prefs.guide_days(), 3);
    }

    #[test]
    fn test_guide_days_out_of_range() {
        let config =
            Config::from_toml_str("[prefs]\nguide_days = 4000000000\n", "test", no_env).unwrap();
        assert_eq!(config.prefs.guide_days(), DEFAULT_GUIDE_DAYS);

        let config = Config::from_toml_str("[prefs]\nguide_days = 367\n", "test", no_env).unwrap();
        assert_eq!(config.prefs.guide_days(), DEFAULT_GUIDE_DAYS);

        let config = Config::from_toml_str("[prefs]\nguide_days = 366\n", "test", no_env).unwrap();
        assert_eq!(config.prefs.guide_days(), MAX_GUIDE_DAYS);
    }

    #[test]
    fn test_zip_code_formats() {
        let single =
            Config::from_toml_str("[prefs]\nzip_code = \"10001\"\n", "test", no_env).unwrap();
        assert_eq!(single.zip_codes().unwrap(), vec!["10001"]);

        let json = Config::from_toml_str(
            "[prefs]\nzip_code = '[\"10001\", \" 07001 \"]'\n",
            "test",
            no_env,
        )
        .unwrap();
        assert_eq!(json.zip_codes().unwrap(), vec!["10001", "07001"]);

        let array = Config::from_toml_str(
            "[prefs]\nzip_code = [\"10001\", 90210]\n",
            "test",
            no_env,
        )
        .unwrap();
        assert_eq!(array.zip_codes().unwrap(), vec!["10001", "90210"]);
    }

    #[test]
    fn test_favorites_split() {
        let config = Config::from_toml_str(
            "[prefs]\nfavorite_channels = \"10035, 10036 10037\"\n",
            "test",
            no_env,
        )
        .unwrap();
        let favorites = config.prefs.favorites();
        assert_eq!(favorites.len(), 3);
        assert!(favorites.contains("10036"));
    }

    #[test]
    fn test_environment_overrides_file() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ZAP2IT_PREFS_GUIDE_DAYS", "2"),
            ("ZAP2IT_PREFS_ZIP_CODE", "07001"),
            ("ZAP2IT_CREDS_USERNAME", "someone@example.com"),
            ("ZAP2IT_WEB_PORT", "9100"),
            ("ZAP2IT_PREFS_STRICT", "true"),
        ]);
        let config = Config::from_toml_str(
            "[prefs]\nguide_days = 14\nzip_code = \"10001\"\n",
            "test",
            |name| env.get(name).map(|v| v.to_string()),
        )
        .unwrap();

        assert_eq!(config.prefs.guide_days(), 2);
        assert_eq!(config.zip_codes().unwrap(), vec!["07001"]);
        assert_eq!(config.creds.username.as_deref(), Some("someone@example.com"));
        assert_eq!(config.web.port, 9100);
        assert!(config.prefs.strict);
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var_name("prefs", "guide_days"), "ZAP2IT_PREFS_GUIDE_DAYS");
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load_from_file("/nonexistent/zap2itconfig.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zap2itconfig.toml");
        std::fs::write(&path, "[creds]\nusername = \"someone\"\n[prefs]\nzip_code = \"10001\"\n")
            .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.creds.username.as_deref(), Some("someone"));
        assert_eq!(config.zip_codes().unwrap(), vec!["10001"]);
    }
}
