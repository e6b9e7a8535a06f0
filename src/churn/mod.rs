//! Churn aggregation: map changed lines to enclosing symbols
//!
//! For each commit, every added line is matched against the symbol spans of
//! the file at the commit's own revision, and every deleted line against
//! the spans at the parent revision (the content as it existed immediately
//! before the commit). Counts are keyed by [`CanonicalTag`] so the same
//! symbol aggregates across both sides even though its span shifted.
//!
//! A line inside nested spans (a method inside a class, say) counts toward
//! every enclosing symbol; attribution is additive across nesting levels.

use crate::models::{Change, Commit};
use crate::tags::{CanonicalTag, RawTag, TagSource};
use anyhow::Result;
use std::collections::{BTreeSet, HashMap};

/// Total added-plus-deleted lines per canonical symbol, for one commit.
pub type ChurnCounts = HashMap<CanonicalTag, u64>;

/// One emitted (commit, churn, symbol) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChurnRecord {
    pub commit: String,
    pub churn: u64,
    pub tag: CanonicalTag,
}

/// Correlates one commit at a time against a [`TagSource`].
///
/// Holds no cross-commit state; whatever caching happens lives behind the
/// tag source.
pub struct ChurnProvider<T> {
    tags: T,
}

impl<T: TagSource> ChurnProvider<T> {
    pub fn new(tags: T) -> Self {
        Self { tags }
    }

    /// Churn counts for one commit. Symbols with zero touched lines are
    /// never present in the result.
    pub fn churn(&self, commit: &Commit) -> Result<ChurnCounts> {
        let mut counts = ChurnCounts::new();
        for change in &commit.changes {
            self.count_adds(&commit.hash, change, &mut counts)?;
            self.count_dels(&commit.hash, change, &mut counts)?;
        }
        Ok(counts)
    }

    fn count_adds(&self, hash: &str, change: &Change, counts: &mut ChurnCounts) -> Result<()> {
        if !change.has_added_lines() {
            return Ok(());
        }
        let tags = self.tags.tags(&change.filename, hash)?;
        accumulate(&tags, &change.added_lines(), counts);
        Ok(())
    }

    fn count_dels(&self, hash: &str, change: &Change, counts: &mut ChurnCounts) -> Result<()> {
        if !change.has_deleted_lines() {
            return Ok(());
        }
        let tags = self.tags.parent_tags(&change.filename, hash)?;
        accumulate(&tags, &change.deleted_lines(), counts);
        Ok(())
    }
}

/// Count, per tag, the changed lines inside its span, summing into the
/// running map. Summing (not assigning) is what makes a symbol touched by
/// several changes, or by both the add and delete side, come out right.
fn accumulate(tags: &[RawTag], lines: &BTreeSet<u32>, counts: &mut ChurnCounts) {
    for tag in tags {
        let hits = lines.iter().filter(|&&n| tag.spans_line(n)).count() as u64;
        if hits > 0 {
            *counts.entry(tag.canonical()).or_insert(0) += hits;
        }
    }
}
