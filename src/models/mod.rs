//! Wire models for the upstream listings grid
//!
//! One [`GridResponse`] is returned per (time instant, postal code) request.
//! Field names follow the feed's camelCase JSON.

use serde::{Deserialize, Deserializer, Serialize};

/// One grid payload covering a 3-hour slot for one postal code
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridResponse {
    #[serde(default)]
    pub channels: Vec<GridChannel>,
}

/// A channel row of the grid together with its scheduled events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridChannel {
    pub channel_id: String,
    #[serde(default, deserialize_with = "deserialize_stringish")]
    pub channel_no: String,
    #[serde(default)]
    pub call_sign: String,
    #[serde(default)]
    pub affiliate_name: String,
    /// Logo path; usually protocol-relative and carrying a query string
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub events: Vec<GridEvent>,
}

/// A single scheduled broadcast
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridEvent {
    pub start_time: String,
    pub end_time: String,
    /// Length in minutes
    #[serde(default, deserialize_with = "deserialize_stringish")]
    pub duration: String,
    #[serde(default)]
    pub series_id: String,
    pub program: GridProgram,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "deserialize_list")]
    pub filter: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_list")]
    pub flag: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_list")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub rating: Option<String>,
}

/// Program metadata nested inside an event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridProgram {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub episode_title: Option<String>,
    #[serde(default)]
    pub short_desc: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_stringish")]
    pub season: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_stringish")]
    pub episode: Option<String>,
}

/// Result of the login call
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: Option<String>,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl LoginResponse {
    /// Property key under which the account's headend id is published
    pub const HEADEND_PROPERTY: &'static str = "2004";

    pub fn headend_id(&self) -> Option<String> {
        self.properties
            .get(Self::HEADEND_PROPERTY)
            .and_then(value_to_string)
    }
}

/// Result of the postal code provider lookup
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderResponse {
    #[serde(rename = "Providers", default)]
    pub providers: Vec<Provider>,
}

/// A lineup provider serving a postal code
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    #[serde(rename = "type", default)]
    pub provider_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, deserialize_with = "deserialize_stringish")]
    pub headend_id: String,
    #[serde(default, deserialize_with = "deserialize_stringish")]
    pub lineup_id: String,
    #[serde(default)]
    pub device: String,
}

fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// The feed sends some numeric fields as strings and others as numbers
fn deserialize_optional_stringish<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_string))
}

fn deserialize_stringish<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_optional_stringish(deserializer)?.unwrap_or_default())
}

/// Treats an explicit `null` like a missing list
fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
