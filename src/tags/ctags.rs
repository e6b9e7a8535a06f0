//! Driver for the universal-ctags interactive protocol
//!
//! One `generate-tags` request per (file, content) pair: a JSON header line
//! carrying the content's byte size, followed by the raw content. The
//! response is line-delimited JSON; the first and last messages identify
//! the program and signal completion, so only `_type == "tag"` objects are
//! kept.

use super::{RawTag, TagError};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::debug;

const CTAGS_ARGS: &[&str] = &["--_interactive", "--fields=FzZNpen", "--extras=+f"];

#[derive(Serialize)]
struct GenerateTagsRequest<'a> {
    command: &'a str,
    filename: &'a str,
    size: usize,
}

/// Runs the universal-ctags binary in interactive mode, one process per
/// request.
pub struct CtagsDriver {
    ctags_bin: String,
}

impl CtagsDriver {
    pub fn new(ctags_bin: impl Into<String>) -> Self {
        Self {
            ctags_bin: ctags_bin.into(),
        }
    }

    /// Extract symbol tags for `text` as if it were the content of
    /// `filename` (the name determines the language parser ctags picks).
    pub fn generate_tags(&self, filename: &str, text: &str) -> Result<Vec<RawTag>> {
        debug!("ctags generate-tags for {} ({} bytes)", filename, text.len());
        let mut child = Command::new(&self.ctags_bin)
            .args(CTAGS_ARGS)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.ctags_bin))?;

        let request = serde_json::to_string(&GenerateTagsRequest {
            command: "generate-tags",
            filename,
            // size is the UTF-8 byte length, not the character count.
            size: text.len(),
        })?;

        {
            let mut stdin = child.stdin.take().context("ctags stdin unavailable")?;
            stdin.write_all(request.as_bytes())?;
            stdin.write_all(b"\n")?;
            stdin.write_all(text.as_bytes())?;
            // Dropping stdin closes the pipe so ctags finishes the request.
        }

        let output = child
            .wait_with_output()
            .context("failed to read ctags output")?;
        if !output.status.success() {
            bail!(
                "ctags exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let stdout =
            String::from_utf8(output.stdout).context("ctags produced non-UTF-8 output")?;
        parse_response(&stdout)
    }
}

fn parse_response(stdout: &str) -> Result<Vec<RawTag>> {
    let mut tags = Vec::new();
    for line in stdout.lines() {
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(TagError::Json)?;
        let Value::Object(fields) = value else {
            return Err(TagError::NotAnObject(line.to_string()).into());
        };
        if fields.get("_type").and_then(Value::as_str) != Some("tag") {
            // Program identification and completion messages.
            continue;
        }
        tags.push(RawTag::from_fields(fields)?);
    }
    Ok(tags)
}
