//! End-to-end streaming pipeline
//!
//! `git log` -> parse -> churn -> record lines, strictly one commit at a
//! time. The parser is lazy and the aggregator holds no cross-commit state,
//! so memory use stays flat regardless of history length. Any failure
//! (parse, resolver, subprocess) aborts the run; no commit is silently
//! skipped except by the explicit max-changes filter.

use crate::churn::{ChurnProvider, ChurnRecord};
use crate::git::{parse, GitDriver, ParseError};
use crate::models::Commit;
use crate::reporters::{render_record, OutputFormat};
use crate::tags::{CtagsDriver, TagProvider, TagSource};
use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

/// Everything the pipeline needs, resolved from CLI flags and config.
#[derive(Debug, Clone)]
pub struct Options {
    pub repo: PathBuf,
    pub git_bin: String,
    pub ctags_bin: String,
    pub format: OutputFormat,
    /// Skip commits touching more than this many files (noise filter for
    /// mass reformattings and similar).
    pub max_changes: Option<usize>,
    /// Extra arguments appended to the fixed `git log` invocation.
    pub git_log_args: Vec<String>,
}

/// Run the whole pipeline, writing record lines to `out`.
pub fn run(options: &Options, out: impl Write) -> Result<()> {
    let git = GitDriver::new(
        options.git_bin.clone(),
        options.repo.clone(),
        options.git_log_args.clone(),
    );
    let tags = TagProvider::new(&git, CtagsDriver::new(options.ctags_bin.clone()));
    let churn = ChurnProvider::new(&tags);

    let mut log = git.log()?;
    let reader = log.take_reader()?;
    let emitted = stream(
        &churn,
        parse(reader),
        options.max_changes,
        options.format,
        out,
    )?;
    log.wait()?;
    info!(
        "emitted {} records from {} resolved file revisions",
        emitted,
        tags.cached_revisions()
    );
    Ok(())
}

/// Correlate a commit sequence and emit one line per (commit, symbol) pair
/// with nonzero churn. Returns the number of records written.
///
/// Records are grouped by commit in log order; within a commit they are
/// sorted by tag for deterministic output.
pub fn stream<T: TagSource>(
    churn: &ChurnProvider<T>,
    commits: impl Iterator<Item = Result<Commit, ParseError>>,
    max_changes: Option<usize>,
    format: OutputFormat,
    mut out: impl Write,
) -> Result<u64> {
    let mut emitted = 0;
    for commit in commits {
        let commit = commit?;
        if let Some(limit) = max_changes {
            if commit.changes.len() > limit {
                debug!(
                    "skipping {} ({} changes > limit {})",
                    commit.hash,
                    commit.changes.len(),
                    limit
                );
                continue;
            }
        }
        let mut counts: Vec<_> = churn.churn(&commit)?.into_iter().collect();
        counts.sort();
        for (tag, count) in counts {
            let record = ChurnRecord {
                commit: commit.hash.clone(),
                churn: count,
                tag,
            };
            writeln!(out, "{}", render_record(&record, format)?)?;
            emitted += 1;
        }
    }
    Ok(emitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Change, ChangeKind, Chunk};
    use crate::tags::RawTag;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Tag source that counts how often it is asked to resolve anything.
    struct CountingTags {
        calls: AtomicUsize,
    }

    impl CountingTags {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        fn sample(&self) -> Arc<Vec<RawTag>> {
            let Value::Object(fields) =
                json!({"name": "f", "path": "a.rs", "kind": "function", "line": 1})
            else {
                unreachable!()
            };
            Arc::new(vec![RawTag::from_fields(fields).unwrap()])
        }
    }

    impl TagSource for CountingTags {
        fn tags(&self, _: &str, _: &str) -> Result<Arc<Vec<RawTag>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.sample())
        }

        fn parent_tags(&self, _: &str, _: &str) -> Result<Arc<Vec<RawTag>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.sample())
        }
    }

    fn add_only_change(filename: &str) -> Change {
        Change {
            filename: filename.to_string(),
            kind: ChangeKind::Modified,
            chunks: vec![Chunk {
                new_start: 1,
                new_count: 2,
                del_start: 0,
                del_count: 0,
            }],
        }
    }

    fn commit_with_changes(hash: &str, n: usize) -> Commit {
        Commit {
            hash: hash.to_string(),
            parents: vec![],
            changes: (0..n).map(|i| add_only_change(&format!("f{i}.rs"))).collect(),
        }
    }

    #[test]
    fn oversized_commits_skip_before_any_resolution() {
        let tags = CountingTags::new();
        let churn = ChurnProvider::new(&tags);
        let commits = vec![Ok(commit_with_changes("big", 5))];

        let mut out = Vec::new();
        let emitted = stream(
            &churn,
            commits.into_iter(),
            Some(3),
            OutputFormat::Human,
            &mut out,
        )
        .unwrap();

        assert_eq!(emitted, 0);
        assert!(out.is_empty());
        assert_eq!(tags.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn commits_at_the_limit_still_run() {
        let tags = CountingTags::new();
        let churn = ChurnProvider::new(&tags);
        let commits = vec![Ok(commit_with_changes("ok", 3))];

        let mut out = Vec::new();
        let emitted = stream(
            &churn,
            commits.into_iter(),
            Some(3),
            OutputFormat::Human,
            &mut out,
        )
        .unwrap();

        assert_eq!(emitted, 1);
        assert!(tags.calls.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn records_are_tab_separated_lines_grouped_by_commit() {
        let tags = CountingTags::new();
        let churn = ChurnProvider::new(&tags);
        let commits = vec![
            Ok(commit_with_changes("c1", 1)),
            Ok(commit_with_changes("c2", 1)),
        ];

        let mut out = Vec::new();
        stream(
            &churn,
            commits.into_iter(),
            None,
            OutputFormat::Human,
            &mut out,
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            vec!["c1\t2\ta.rs > f (function)", "c2\t2\ta.rs > f (function)"]
        );
    }

    #[test]
    fn parse_errors_propagate() {
        let tags = CountingTags::new();
        let churn = ChurnProvider::new(&tags);
        let commits: Vec<Result<Commit, ParseError>> =
            vec![Err(ParseError::InvalidHunkHeader("@@ bad @@".to_string()))];

        let mut out = Vec::new();
        let result = stream(
            &churn,
            commits.into_iter(),
            None,
            OutputFormat::Human,
            &mut out,
        );
        assert!(result.is_err());
    }

    #[test]
    fn empty_commit_stream_emits_nothing() {
        let tags = CountingTags::new();
        let churn = ChurnProvider::new(&tags);
        let mut out = Vec::new();
        let emitted = stream(
            &churn,
            std::iter::empty(),
            None,
            OutputFormat::Human,
            &mut out,
        )
        .unwrap();
        assert_eq!(emitted, 0);
        assert!(out.is_empty());
    }
}
