//! Wire format of the `/v3/get` response and its normalization into saves.

#![allow(clippy::cast_possible_truncation)] // fractional wire numbers are truncated

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::{Save, SaveId, SaveStatus};
use crate::util::non_blank;
use crate::{Error, Result};

const UNTITLED: &str = "Untitled";

/// A number that may arrive as a JSON number or as a (possibly empty) string
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl LenientNumber {
    fn into_i64(self) -> std::result::Result<i64, String> {
        match self {
            Self::Int(value) => Ok(value),
            Self::Float(value) => Ok(value.trunc() as i64),
            Self::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(0);
                }
                text.parse::<i64>()
                    .or_else(|_| text.parse::<f64>().map(|value| value.trunc() as i64))
                    .map_err(|_| format!("expected a number, got '{text}'"))
            }
        }
    }
}

fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<LenientNumber>::deserialize(deserializer)? {
        Some(number) => number.into_i64().map_err(serde::de::Error::custom),
        None => Ok(0),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => text,
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct GetResponse {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub since: i64,
    #[serde(default)]
    list: Option<Value>,
}

impl GetResponse {
    /// Normalize every item of the response into a save.
    pub(crate) fn into_changes(self) -> Result<Vec<Save>> {
        let items = match self.list {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Object(items)) => items,
            // An empty result is sent as `[]` instead of `{}`
            Some(Value::Array(items)) if items.is_empty() => return Ok(Vec::new()),
            Some(other) => {
                return Err(Error::Decode(format!(
                    "expected 'list' to be an object, got {}",
                    json_kind(&other)
                )));
            }
        };

        items
            .into_iter()
            .map(|(key, value)| {
                let item: WireItem = serde_json::from_value(value)
                    .map_err(|error| Error::Decode(format!("item {key}: {error}")))?;
                item.into_save(&key)
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct WireItem {
    #[serde(default, deserialize_with = "lenient_string")]
    item_id: String,
    #[serde(default)]
    given_title: Option<String>,
    #[serde(default)]
    resolved_title: Option<String>,
    #[serde(default)]
    given_url: Option<String>,
    #[serde(default)]
    resolved_url: Option<String>,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    time_to_read: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    time_added: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    time_updated: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    status: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    favorite: i64,
    #[serde(default)]
    tags: Option<Value>,
}

impl WireItem {
    fn into_save(self, key: &str) -> Result<Save> {
        let id = non_empty(Some(self.item_id))
            .or_else(|| non_empty(Some(key.to_string())))
            .ok_or_else(|| Error::Decode("item without an item_id".to_string()))?;

        let status = SaveStatus::from_code(self.status).ok_or_else(|| {
            Error::Decode(format!("item {id} has unknown status {}", self.status))
        })?;
        if status == SaveStatus::Deleted {
            return Ok(Save::deleted(id));
        }

        let url = non_empty(self.given_url)
            .or_else(|| non_empty(self.resolved_url))
            .ok_or_else(|| Error::Decode(format!("item {id} has no URL")))?;

        let title = non_empty(self.resolved_title)
            .or_else(|| non_empty(self.given_title))
            .unwrap_or_else(|| UNTITLED.to_string());

        Ok(Save {
            id: SaveId::new(id),
            title,
            url,
            description: self.excerpt.unwrap_or_default().trim().to_string(),
            time_to_read: self.time_to_read.max(0),
            status,
            favorite: self.favorite != 0,
            tags: tag_names(self.tags.as_ref()),
            added_on: self.time_added,
            updated_on: self.time_updated,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.as_deref().and_then(non_blank).map(str::to_string)
}

/// Tag names are the keys of the `tags` object
fn tag_names(tags: Option<&Value>) -> String {
    match tags {
        Some(Value::Object(tags)) => tags
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(","),
        _ => String::new(),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a non-empty array",
        Value::Object(_) => "an object",
    }
}
