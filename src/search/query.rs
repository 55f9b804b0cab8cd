//! Slice descriptors and query augmentation

use serde::Serialize;
use serde_json::Value;

use crate::error::{EsdumpError, Result};

/// One partition of a sliced scroll: `id` in `0..max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SliceDescriptor {
    pub id: usize,
    pub max: usize,
}

impl SliceDescriptor {
    /// Descriptor for an unsliced query
    pub const UNSLICED: SliceDescriptor = SliceDescriptor { id: 0, max: 1 };

    /// Create a descriptor, returning `None` unless `id < max`
    pub fn new(id: usize, max: usize) -> Option<Self> {
        (id < max).then_some(Self { id, max })
    }

    /// All descriptors `(0..count, count)`; a count of 0 behaves like 1
    pub fn all(count: usize) -> impl Iterator<Item = SliceDescriptor> {
        let max = count.max(1);
        (0..max).map(move |id| SliceDescriptor { id, max })
    }

    /// Whether this descriptor actually partitions the query
    pub fn is_sliced(&self) -> bool {
        self.max > 1
    }
}

/// Annotate a query with its slice parameters
///
/// Unsliced queries are returned byte-for-byte, even when they are not valid
/// JSON. Sliced queries must be JSON objects; an empty query stands for the
/// store's match-all default and is treated as `{}`.
///
/// # Arguments
/// * `query` - Query document as text
/// * `slice` - Slice to inject
///
/// # Returns
/// * `Result<String>` - Augmented query text
pub fn augment(query: &str, slice: SliceDescriptor) -> Result<String> {
    if !slice.is_sliced() {
        return Ok(query.to_string());
    }

    let mut document = if query.trim().is_empty() {
        serde_json::Map::new()
    } else {
        match serde_json::from_str::<Value>(query) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(EsdumpError::MalformedQuery(format!(
                    "expected a JSON object, found {}",
                    json_kind(&other)
                )));
            }
            Err(e) => return Err(EsdumpError::MalformedQuery(e.to_string())),
        }
    };

    let slice_value = serde_json::to_value(slice)
        .map_err(|e| EsdumpError::MalformedQuery(e.to_string()))?;
    document.insert("slice".to_string(), slice_value);

    serde_json::to_string(&document).map_err(|e| {
        EsdumpError::MalformedQuery(format!(
            "failed to re-serialize query with slice information: {e}"
        ))
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
