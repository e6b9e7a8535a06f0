//! Output formatting for churn records
//!
//! Two formats, selected by configuration:
//! - `human` - compact `path > name (kind)` display
//! - `json` - one sorted-key JSON object of every canonical field
//!
//! Either way a record renders as one tab-separated line:
//! `commit-hash<TAB>churn<TAB>tag`.

use crate::churn::ChurnRecord;
use crate::tags::CanonicalTag;
use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Supported tag output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format '{}'. Valid formats: human, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Human => write!(f, "human"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Render one record as a tab-separated output line.
pub fn render_record(record: &ChurnRecord, format: OutputFormat) -> Result<String> {
    Ok(format!(
        "{}\t{}\t{}",
        record.commit,
        record.churn,
        render_tag(&record.tag, format)?
    ))
}

/// Render a canonical tag in the selected format.
pub fn render_tag(tag: &CanonicalTag, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human(tag)),
        OutputFormat::Json => {
            serde_json::to_string(tag.fields()).map_err(|e| anyhow!("failed to render tag: {e}"))
        }
    }
}

fn human(tag: &CanonicalTag) -> String {
    let field = |key| tag.get(key).unwrap_or("?");
    format!("{} > {} ({})", field("path"), field("name"), field("kind"))
}
