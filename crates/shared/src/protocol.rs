use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::SYSTEM_USER_ID;

/// One sub-item attached to a metric record. The console treats its fields as opaque.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricResponse {
    pub fields: Map<String, Value>,
}

impl MetricResponse {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub responses: Vec<MetricResponse>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MetricRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_responses(mut self, responses: Vec<MetricResponse>) -> Self {
        self.responses = responses;
        self
    }

    pub fn is_system(&self) -> bool {
        self.id == SYSTEM_USER_ID.to_string()
    }
}

/// A single page of a cursor-paginated metrics listing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsList {
    #[serde(rename = "metrics", alias = "items", default)]
    pub items: Vec<MetricRecord>,
    #[serde(default)]
    pub next_cursor: String,
    #[serde(default)]
    pub prev_cursor: String,
}
