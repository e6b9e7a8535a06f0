//! Streaming parser for `git log` diff output
//!
//! Turns the line-oriented text produced by [`GitDriver::log`] into a lazy
//! sequence of [`Commit`] records. The input must come from a log invocation
//! with merges and rename detection disabled, zero-context unified diffs,
//! and `--diff-filter=AMD` (see [`crate::git::driver::GIT_LOG_ARGS`]); the
//! parser recognizes exactly the markers that configuration produces.
//!
//! Parsing is a single pass with two by-value accumulators: a pending
//! [`Change`] and a pending [`Commit`]. Each `commit` marker flushes both;
//! end of input flushes whatever is still pending, so the final commit is
//! emitted even though no marker follows it.
//!
//! [`GitDriver::log`]: crate::git::driver::GitDriver::log

use crate::models::{Change, ChangeKind, Chunk, Commit};
use regex::Regex;
use std::io::BufRead;
use std::sync::OnceLock;
use thiserror::Error;

const COMMIT_MARKER: &str = "commit ";
const DIFF_MARKER: &str = "diff --git";
const OLD_FILE_MARKER: &str = "--- a/";
const NEW_FILE_MARKER: &str = "+++ b/";
const NEW_FILE_MODE_MARKER: &str = "new file mode";
const DELETED_FILE_MODE_MARKER: &str = "deleted file mode";
const HUNK_MARKER: &str = "@@ ";

/// Errors from the log parser. All of these are fatal: once diff accounting
/// cannot be trusted, every downstream churn number is suspect.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid hunk header: {0}")]
    InvalidHunkHeader(String),

    #[error("change finalized without a filename")]
    ChangeWithoutFilename,

    #[error("commit finalized without a hash")]
    CommitWithoutHash,

    #[error("failed to read log stream: {0}")]
    Io(#[from] std::io::Error),
}

fn hunk_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("valid regex")
    })
}

/// Parse one hunk header. Omitted counts default to 1 per git convention,
/// so `@@ -5 +7 @@` means one line deleted at 5 and one added at 7.
fn parse_hunk(line: &str) -> Result<Chunk, ParseError> {
    let caps = hunk_regex()
        .captures(line)
        .ok_or_else(|| ParseError::InvalidHunkHeader(line.to_string()))?;
    let number = |index: usize| -> Result<u32, ParseError> {
        match caps.get(index) {
            Some(m) => m
                .as_str()
                .parse()
                .map_err(|_| ParseError::InvalidHunkHeader(line.to_string())),
            None => Ok(1),
        }
    };
    Ok(Chunk {
        del_start: number(1)?,
        del_count: number(2)?,
        new_start: number(3)?,
        new_count: number(4)?,
    })
}

/// Accumulator for the Change currently being parsed.
///
/// Finalize consumes the builder; a finalized builder can never be mutated
/// again. The parser swaps in a fresh one via `std::mem::take`.
#[derive(Default)]
struct ChangeBuilder {
    filename: Option<String>,
    kind: ChangeKind,
    chunks: Vec<Chunk>,
}

impl ChangeBuilder {
    /// A change is only flushable once a filename has been seen.
    fn is_valid(&self) -> bool {
        self.filename.is_some()
    }

    fn finalize(self) -> Result<Change, ParseError> {
        let filename = self.filename.ok_or(ParseError::ChangeWithoutFilename)?;
        Ok(Change {
            filename,
            kind: self.kind,
            chunks: self.chunks,
        })
    }
}

/// Accumulator for the Commit currently being parsed.
#[derive(Default)]
struct CommitBuilder {
    hash: Option<String>,
    parents: Vec<String>,
    changes: Vec<Change>,
}

impl CommitBuilder {
    fn is_valid(&self) -> bool {
        self.hash.is_some()
    }

    fn finalize(self) -> Result<Commit, ParseError> {
        let hash = self.hash.ok_or(ParseError::CommitWithoutHash)?;
        Ok(Commit {
            hash,
            parents: self.parents,
            changes: self.changes,
        })
    }
}

/// Parse a log text stream into a lazy commit sequence.
///
/// Single pass, non-restartable; fully consuming the iterator exhausts the
/// reader exactly once. An empty input yields nothing.
pub fn parse<R: BufRead>(reader: R) -> Commits<R> {
    Commits {
        lines: reader.lines(),
        commit: CommitBuilder::default(),
        change: ChangeBuilder::default(),
        done: false,
    }
}

/// Iterator over commits in a log stream. Created by [`parse`].
pub struct Commits<R> {
    lines: std::io::Lines<R>,
    commit: CommitBuilder,
    change: ChangeBuilder,
    done: bool,
}

impl<R: BufRead> Commits<R> {
    /// Flush the pending change into the pending commit, if one is open.
    fn flush_change(&mut self) -> Result<(), ParseError> {
        if self.change.is_valid() {
            let change = std::mem::take(&mut self.change).finalize()?;
            self.commit.changes.push(change);
        }
        Ok(())
    }

    fn take_commit(&mut self) -> Result<Commit, ParseError> {
        std::mem::take(&mut self.commit).finalize()
    }

    /// Classify one log line and update the accumulators. Returns a commit
    /// when this line closed one (i.e. a new `commit` marker was seen).
    fn consume_line(&mut self, line: &str) -> Result<Option<Commit>, ParseError> {
        if let Some(rest) = line.strip_prefix(COMMIT_MARKER) {
            self.flush_change()?;
            let previous = if self.commit.is_valid() {
                Some(self.take_commit()?)
            } else {
                None
            };
            let mut hashes = rest.split_whitespace();
            self.commit.hash = hashes.next().map(str::to_owned);
            self.commit.parents = hashes.map(str::to_owned).collect();
            return Ok(previous);
        }

        if line.starts_with(DIFF_MARKER) {
            self.flush_change()?;
        } else if line.starts_with(NEW_FILE_MODE_MARKER) {
            self.change.kind = ChangeKind::Added;
        } else if line.starts_with(DELETED_FILE_MODE_MARKER) {
            self.change.kind = ChangeKind::Deleted;
        } else if let Some(filename) = line.strip_prefix(OLD_FILE_MARKER) {
            // For added files the old side is /dev/null and never matches.
            self.change.filename = Some(filename.to_string());
        } else if let Some(filename) = line.strip_prefix(NEW_FILE_MARKER) {
            // For deleted files the new side is /dev/null and never matches.
            self.change.filename = Some(filename.to_string());
        } else if line.starts_with(HUNK_MARKER) {
            self.change.chunks.push(parse_hunk(line)?);
        }

        Ok(None)
    }
}

impl<R: BufRead> Iterator for Commits<R> {
    type Item = Result<Commit, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.lines.next() {
                Some(Ok(line)) => match self.consume_line(line.trim_end()) {
                    Ok(Some(commit)) => return Some(Ok(commit)),
                    Ok(None) => {}
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                },
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
                None => {
                    // End of input: the final commit has no trailing marker
                    // to close it, so flush whatever is pending.
                    self.done = true;
                    if let Err(e) = self.flush_change() {
                        return Some(Err(e));
                    }
                    if self.commit.is_valid() {
                        return Some(self.take_commit());
                    }
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse_all(text: &str) -> Vec<Commit> {
        parse(Cursor::new(text.to_string()))
            .collect::<Result<Vec<_>, _>>()
            .expect("log should parse")
    }

    const TWO_COMMIT_LOG: &str = "\
commit bbbb2222 aaaa1111
diff --git a/src/lib.rs b/src/lib.rs
index 1111111..2222222 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -10,5 +20,3 @@ fn context() {
@@ -30,0 +31,2 @@
diff --git a/README.md b/README.md
new file mode 100644
index 0000000..3333333
--- /dev/null
+++ b/README.md
@@ -0,0 +1,4 @@
commit aaaa1111
diff --git a/src/old.rs b/src/old.rs
deleted file mode 100644
index 4444444..0000000
--- a/src/old.rs
+++ /dev/null
@@ -1,7 +0,0 @@
";

    #[test]
    fn parses_commits_changes_and_chunks() {
        let commits = parse_all(TWO_COMMIT_LOG);
        assert_eq!(commits.len(), 2);

        let newest = &commits[0];
        assert_eq!(newest.hash, "bbbb2222");
        assert_eq!(newest.parents, vec!["aaaa1111".to_string()]);
        assert_eq!(newest.changes.len(), 2);
        assert_eq!(newest.changes[0].filename, "src/lib.rs");
        assert_eq!(newest.changes[0].kind, ChangeKind::Modified);
        assert_eq!(newest.changes[0].chunks.len(), 2);
        assert_eq!(newest.changes[1].filename, "README.md");
        assert_eq!(newest.changes[1].kind, ChangeKind::Added);

        let oldest = &commits[1];
        assert_eq!(oldest.hash, "aaaa1111");
        assert!(oldest.parents.is_empty());
        assert_eq!(oldest.changes.len(), 1);
        assert_eq!(oldest.changes[0].kind, ChangeKind::Deleted);
        assert_eq!(oldest.changes[0].filename, "src/old.rs");
    }

    #[test]
    fn hunk_header_with_counts() {
        let chunk = parse_hunk("@@ -10,5 +20,3 @@").unwrap();
        assert_eq!(
            chunk,
            Chunk {
                del_start: 10,
                del_count: 5,
                new_start: 20,
                new_count: 3,
            }
        );
    }

    #[test]
    fn hunk_header_with_omitted_counts_defaults_to_one() {
        let chunk = parse_hunk("@@ -5 +7 @@").unwrap();
        assert_eq!(chunk.del_start, 5);
        assert_eq!(chunk.del_count, 1);
        assert_eq!(chunk.new_start, 7);
        assert_eq!(chunk.new_count, 1);
    }

    #[test]
    fn hunk_header_keeps_zero_anchors() {
        // Pure addition at the top of a new file.
        let chunk = parse_hunk("@@ -0,0 +1,4 @@").unwrap();
        assert_eq!(chunk.del_start, 0);
        assert_eq!(chunk.del_count, 0);
        assert_eq!(chunk.new_start, 1);
        assert_eq!(chunk.new_count, 4);
    }

    #[test]
    fn malformed_hunk_header_is_fatal() {
        let text = "\
commit abcd
diff --git a/f b/f
--- a/f
+++ b/f
@@ garbage @@
";
        let results: Vec<_> = parse(Cursor::new(text.to_string())).collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(ParseError::InvalidHunkHeader(_))
        ));
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(parse_all("").is_empty());
    }

    #[test]
    fn commit_without_diff_section_is_still_emitted() {
        let commits = parse_all("commit abcd 1234\n");
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].hash, "abcd");
        assert_eq!(commits[0].parents, vec!["1234".to_string()]);
        assert!(commits[0].changes.is_empty());
    }

    #[test]
    fn merge_style_parent_lists_are_kept() {
        let commits = parse_all("commit abcd 1111 2222\n");
        assert_eq!(
            commits[0].parents,
            vec!["1111".to_string(), "2222".to_string()]
        );
    }

    #[test]
    fn final_commit_is_flushed_at_end_of_input() {
        let text = "\
commit abcd
diff --git a/f b/f
--- a/f
+++ b/f
@@ -1,2 +1,2 @@
";
        let commits = parse_all(text);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].changes.len(), 1);
        assert_eq!(commits[0].changes[0].chunks.len(), 1);
    }

    #[test]
    fn unrecognized_lines_are_ignored() {
        let text = "\
commit abcd
Author: Someone <someone@example.com>
Date:   Mon Jan 1 00:00:00 2024 +0000

    commit message mentioning diff --git inline

diff --git a/f b/f
index 1111111..2222222 100644
--- a/f
+++ b/f
@@ -3,1 +3,1 @@
";
        // The indented message line does not start with a marker, so it
        // cannot open a change or commit.
        let commits = parse_all(text);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].changes.len(), 1);
    }

    #[test]
    fn consuming_twice_is_fused() {
        let mut commits = parse(Cursor::new("commit abcd\n".to_string()));
        assert!(commits.next().is_some());
        assert!(commits.next().is_none());
        assert!(commits.next().is_none());
    }
}
