//! Shard outcome types parsed from the `_shards` block of search responses.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Shard outcome summary reported in the `_shards` block of every search
/// and scroll response.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ShardsSummary {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub successful: u32,
    #[serde(default)]
    pub skipped: u32,
    #[serde(default)]
    pub failed: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ShardFailure>,
}

/// A single failed shard as described by the store.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ShardFailure {
    #[serde(default)]
    pub shard: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(default)]
    pub reason: FailureReason,
}

/// Why a shard failed.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct FailureReason {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub reason: String,
}

/// Error payload carried by [`EsdumpError::ShardFailure`](super::EsdumpError).
#[derive(Debug, Clone)]
pub struct ShardFailureReport {
    pub total: u32,
    pub failed: u32,
    pub failures: Vec<ShardFailure>,
}

impl ShardsSummary {
    /// Whether any shard failed while serving the request.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Build an error report, or `None` when every shard answered.
    pub fn failure_report(&self) -> Option<ShardFailureReport> {
        self.has_failures().then(|| ShardFailureReport {
            total: self.total,
            failed: self.failed,
            failures: self.failures.clone(),
        })
    }
}

impl fmt::Display for ShardFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "shard {} of index '{}' on node '{}': {}",
            self.shard,
            self.index.as_deref().unwrap_or("?"),
            self.node.as_deref().unwrap_or("?"),
            self.reason
        )
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind.is_empty(), self.reason.is_empty()) {
            (true, true) => write!(f, "unknown reason"),
            (true, false) => write!(f, "{}", self.reason),
            (false, true) => write!(f, "{}", self.kind),
            (false, false) => write!(f, "[{}] {}", self.kind, self.reason),
        }
    }
}

impl fmt::Display for ShardFailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} shards failed", self.failed, self.total)?;
        for failure in &self.failures {
            write!(f, "; {failure}")?;
        }
        Ok(())
    }
}
