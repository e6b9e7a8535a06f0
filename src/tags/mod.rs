//! Symbol tags and the canonical identity used to track them across revisions
//!
//! The tag extractor reports each symbol with a line span that is only
//! meaningful within one file revision. To aggregate churn for "the same"
//! symbol across a commit and its parent, every revision-sensitive field
//! (`line`, `end`, and the extractor's `_type` bookkeeping) is dropped,
//! leaving an order-independent set of (field, value) pairs: the
//! [`CanonicalTag`].

pub mod ctags;
pub mod provider;

pub use ctags::CtagsDriver;
pub use provider::TagProvider;

use anyhow::Result;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Fields that vary per revision and are excluded from canonical identity.
const REVISION_FIELDS: &[&str] = &["line", "end", "_type"];

/// Contract violations from the tag extractor. These are fatal: without a
/// `line`, span membership is undefined and churn cannot be attributed.
#[derive(Error, Debug)]
pub enum TagError {
    #[error("tag {name:?} is missing the mandatory `line` field")]
    MissingLine { name: String },

    #[error("tag extractor emitted a non-object record: {0}")]
    NotAnObject(String),

    #[error("tag extractor emitted invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One symbol record as returned by the tag extractor for a single file
/// revision: the raw fields plus the validated line span.
///
/// A missing `end` is a known extractor quirk (observed only for the last
/// tag in a file), not an error; the span is then open-ended.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTag {
    line: u32,
    end: Option<u32>,
    fields: Map<String, Value>,
}

impl RawTag {
    /// Build from a parsed JSON object, validating the `line` contract.
    pub fn from_fields(fields: Map<String, Value>) -> Result<Self, TagError> {
        let line = field_line_number(&fields, "line").ok_or_else(|| TagError::MissingLine {
            name: fields
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("<unnamed>")
                .to_string(),
        })?;
        let end = field_line_number(&fields, "end");
        Ok(Self { line, end, fields })
    }

    /// 1-based first line of the symbol's span.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// 1-based inclusive last line, if the extractor reported one.
    pub fn end(&self) -> Option<u32> {
        self.end
    }

    /// Whether `lineno` falls inside this tag's span. An absent `end` means
    /// the span extends at least to the end of the file, so every line at
    /// or below `line` matches.
    pub fn spans_line(&self, lineno: u32) -> bool {
        lineno >= self.line && self.end.map_or(true, |end| lineno <= end)
    }

    /// Reduce to the revision-independent identity key.
    pub fn canonical(&self) -> CanonicalTag {
        let fields = self
            .fields
            .iter()
            .filter(|(key, _)| !REVISION_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), stringify(value)))
            .collect();
        CanonicalTag { fields }
    }
}

/// Line-number fields usually arrive as JSON numbers, but some extractor
/// configurations stringify them.
fn field_line_number(fields: &Map<String, Value>, key: &str) -> Option<u32> {
    match fields.get(key)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Revision-independent symbol identity: every raw field except the line
/// span, as a sorted map so equality and hashing never depend on the
/// extractor's field order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalTag {
    fields: BTreeMap<String, String>,
}

impl CanonicalTag {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }
}

impl FromIterator<(String, String)> for CanonicalTag {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Where the churn aggregator gets its symbol lists from.
///
/// The production implementation is [`TagProvider`] (git show + ctags with
/// a memo cache); tests substitute in-memory sources.
pub trait TagSource {
    /// Symbol list for `filename` as it exists at revision `rev`.
    fn tags(&self, filename: &str, rev: &str) -> Result<Arc<Vec<RawTag>>>;

    /// Symbol list for `filename` as it existed immediately before `rev`.
    fn parent_tags(&self, filename: &str, rev: &str) -> Result<Arc<Vec<RawTag>>>;
}

impl<T: TagSource + ?Sized> TagSource for &T {
    fn tags(&self, filename: &str, rev: &str) -> Result<Arc<Vec<RawTag>>> {
        (**self).tags(filename, rev)
    }

    fn parent_tags(&self, filename: &str, rev: &str) -> Result<Arc<Vec<RawTag>>> {
        (**self).parent_tags(filename, rev)
    }
}
