// ABOUTME: Data models for Tredict API resources: activities, body values and the user profile
// ABOUTME: Typed fields for the common attributes, with the remaining JSON preserved as-is
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 The tredict developers

//! # Data Models
//!
//! Tredict responses carry more attributes than this crate types out. Each model
//! deserializes the commonly used fields and keeps everything else in an `extra`
//! map, so nothing the API returns is lost when a caller re-serializes a model.
//!
//! List endpoints are accepted either as a bare JSON array or as an object
//! wrapping the array under a well-known key.

use chrono::{DateTime, Utc};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single activity, as listed or fetched in detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Tredict activity id
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Activity title
    #[serde(default)]
    pub name: Option<String>,
    /// Sport type as reported by Tredict (e.g. "running", "cycling")
    #[serde(default)]
    pub sport_type: Option<String>,
    /// Start time
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub start_date: Option<DateTime<Utc>>,
    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    /// Distance in meters
    #[serde(default)]
    pub distance: Option<f64>,
    /// Any other attributes returned by the API
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of the activity list endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityList {
    /// Activities in the requested range
    pub activities: Vec<Activity>,
    /// Envelope attributes (paging links, totals) when the list was wrapped
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<'de> Deserialize<'de> for ActivityList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let (activities, extra) =
            split_list(value, &["activityList", "activities", "data"]).map_err(de::Error::custom)?;
        Ok(Self { activities, extra })
    }
}

/// Query parameters for the activity list endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityListQuery {
    /// Only activities starting at or after this instant
    pub start_date: Option<DateTime<Utc>>,
    /// Only activities starting before this instant
    pub end_date: Option<DateTime<Utc>>,
    /// Page number, as understood by the API
    pub page: Option<u32>,
    /// Page size, as understood by the API
    pub page_size: Option<u32>,
}

impl ActivityListQuery {
    /// Query string pairs for the parameters that are set
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(start) = self.start_date {
            pairs.push(("startDate", start.to_rfc3339()));
        }
        if let Some(end) = self.end_date {
            pairs.push(("endDate", end.to_rfc3339()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(page_size) = self.page_size {
            pairs.push(("pageSize", page_size.to_string()));
        }
        pairs
    }
}

/// One body measurement entry (weight, resting heart rate, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyValue {
    /// When the measurement was taken
    #[serde(default, alias = "date", deserialize_with = "lenient_datetime")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Measured values keyed by name
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

/// Result of the body values endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BodyValues {
    /// Measurement entries
    pub values: Vec<BodyValue>,
    /// Envelope attributes when the list was wrapped
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<'de> Deserialize<'de> for BodyValues {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let (values, extra) = split_list(value, &["bodyValues", "bodyvalues", "values", "data"])
            .map_err(de::Error::custom)?;
        Ok(Self { values, extra })
    }
}

/// Profile of the authorized user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Tredict user id
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub id: Option<String>,
    /// Display name
    #[serde(default, alias = "name")]
    pub display_name: Option<String>,
    /// Any other attributes returned by the API
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Split a list response into its items and envelope
///
/// A bare array yields the items and an empty envelope. An object yields the
/// array under the first matching key, with the remaining keys as envelope.
fn split_list<T: DeserializeOwned>(
    value: Value,
    keys: &[&str],
) -> Result<(Vec<T>, Map<String, Value>), serde_json::Error> {
    match value {
        Value::Array(_) => Ok((serde_json::from_value(value)?, Map::new())),
        Value::Object(mut map) => {
            let items = keys
                .iter()
                .find_map(|key| map.remove(*key))
                .map_or_else(|| Ok(Vec::new()), serde_json::from_value)?;
            Ok((items, map))
        }
        other => Err(de::Error::custom(format!(
            "expected a list or an object, got {other}"
        ))),
    }
}

fn value_to_id(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    value_to_id(Value::deserialize(deserializer)?)
        .ok_or_else(|| de::Error::custom("expected a string or a number"))
}

fn optional_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(value_to_id))
}

/// Accepts RFC 3339 strings and epoch milliseconds; anything else becomes `None`
fn lenient_datetime<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Some(Value::Number(n)) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    })
}
