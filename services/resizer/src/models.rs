use crate::cloud::CloudError;
use actix_web::web;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Default)]
pub struct ResizeQuery {
    pub size: Option<String>,
}

impl ResizeQuery {
    /// Reads the first `size` pair from a raw query string. A query string
    /// that fails to decode is treated like one without `size`.
    pub fn from_query_string(query: &str) -> Self {
        let size = web::Query::<Vec<(String, String)>>::from_query(query)
            .ok()
            .and_then(|pairs| {
                pairs
                    .into_inner()
                    .into_iter()
                    .find(|(key, _)| key == "size")
                    .map(|(_, value)| value)
            });

        Self { size }
    }

    /// Missing or malformed sizes fall back to zero.
    pub fn node_count(&self) -> i64 {
        self.size
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivationPolicy {
    Always,
    Never,
}

impl ActivationPolicy {
    pub fn for_node_count(node_count: i64) -> Self {
        if node_count > 0 {
            ActivationPolicy::Always
        } else {
            ActivationPolicy::Never
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivationPolicy::Always => "ALWAYS",
            ActivationPolicy::Never => "NEVER",
        }
    }
}

impl fmt::Display for ActivationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorDescriptor {
    pub error: String,
}

/// Result of one upstream call as it appears in the response body: the raw
/// API payload, or `{"error": "..."}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum CallOutcome {
    Success(Value),
    Failure(ErrorDescriptor),
}

impl CallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success(_))
    }
}

impl From<Result<Value, CloudError>> for CallOutcome {
    fn from(result: Result<Value, CloudError>) -> Self {
        match result {
            Ok(payload) => CallOutcome::Success(payload),
            Err(e) => CallOutcome::Failure(ErrorDescriptor {
                error: e.to_string(),
            }),
        }
    }
}

/// Per-pool outcomes in configuration order. Recording the same pool twice
/// replaces the earlier outcome but keeps its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolResults {
    entries: Vec<(String, CallOutcome)>,
}

impl PoolResults {
    pub fn record(&mut self, node_pool: &str, outcome: CallOutcome) {
        match self.entries.iter_mut().find(|(name, _)| name == node_pool) {
            Some(entry) => entry.1 = outcome,
            None => self.entries.push((node_pool.to_string(), outcome)),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|(_, outcome)| outcome.is_success()).count()
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

impl Serialize for PoolResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, outcome) in &self.entries {
            map.serialize_entry(name, outcome)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResizeReport {
    #[serde(rename = "GKE Responses")]
    pub gke_responses: PoolResults,
    #[serde(rename = "Cloud SQL Response")]
    pub cloud_sql_response: CallOutcome,
}
