//! Search and scroll response envelope

use serde::Deserialize;
use serde_json::value::RawValue;

use crate::error::{EsdumpError, Result, ShardsSummary};

/// Parsed response to a search or scroll request.
///
/// Hits are kept as raw JSON so they can be forwarded verbatim.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "_shards", default)]
    pub shards: ShardsSummary,

    #[serde(rename = "_scroll_id", default)]
    pub scroll_id: Option<String>,

    #[serde(default)]
    pub hits: HitsEnvelope,
}

/// The `hits` block of a response
#[derive(Debug, Default, Deserialize)]
pub struct HitsEnvelope {
    #[serde(default)]
    total: Option<TotalField>,

    #[serde(default)]
    pub hits: Vec<Box<RawValue>>,
}

/// Relation between the reported total and the real hit count
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalRelation {
    /// The total is exact
    #[default]
    Eq,
    /// The total is a lower bound
    Gte,
}

/// Total hit count reported by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotalHits {
    pub value: u64,
    pub relation: TotalRelation,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalField {
    Object {
        value: u64,
        #[serde(default)]
        relation: TotalRelation,
    },
    // Stores before 7.0 report a bare integer
    Count(u64),
}

impl SearchResponse {
    /// Parse a raw response body
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(|e| EsdumpError::MalformedResponse(e.to_string()))
    }

    /// The hit documents of this page
    pub fn hits(&self) -> &[Box<RawValue>] {
        &self.hits.hits
    }

    /// Total hit count, zero when the store did not report one
    pub fn total_hits(&self) -> TotalHits {
        match self.hits.total {
            Some(TotalField::Object { value, relation }) => TotalHits { value, relation },
            Some(TotalField::Count(value)) => TotalHits {
                value,
                relation: TotalRelation::Eq,
            },
            None => TotalHits {
                value: 0,
                relation: TotalRelation::Eq,
            },
        }
    }

    /// Fail with the shard report when any shard failed
    pub fn ensure_shards_succeeded(&self) -> Result<()> {
        match self.shards.failure_report() {
            Some(report) => Err(EsdumpError::ShardFailure(report)),
            None => Ok(()),
        }
    }
}
