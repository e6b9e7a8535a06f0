//! Core value types produced by the log parser
//!
//! These are immutable records: one [`Commit`] per log entry, one [`Change`]
//! per file the commit touched, one [`Chunk`] per diff hunk. They carry no
//! behavior beyond derived line-range queries.

use serde::Serialize;
use std::collections::BTreeSet;

/// One diff hunk, as described by a `@@ -a,b +c,d @@` header.
///
/// Line numbers are 1-based. A count of 0 means no lines on that side
/// (a pure addition or pure deletion hunk); git then reports the anchor
/// line, which may be 0 for changes at the very top of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// First added line in the post-image.
    pub new_start: u32,
    /// Number of added lines.
    pub new_count: u32,
    /// First deleted line in the pre-image.
    pub del_start: u32,
    /// Number of deleted lines.
    pub del_count: u32,
}

impl Chunk {
    /// Absolute line numbers added by this hunk: `[new_start, new_start + new_count)`.
    pub fn added_lines(&self) -> impl Iterator<Item = u32> {
        self.new_start..self.new_start + self.new_count
    }

    /// Absolute line numbers deleted by this hunk: `[del_start, del_start + del_count)`.
    pub fn deleted_lines(&self) -> impl Iterator<Item = u32> {
        self.del_start..self.del_start + self.del_count
    }
}

/// How a commit touched a file.
///
/// Renames never appear: the log is produced with rename detection disabled,
/// so a move shows up as a Deleted plus an Added change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ChangeKind {
    Added,
    #[default]
    Modified,
    Deleted,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "A"),
            ChangeKind::Modified => write!(f, "M"),
            ChangeKind::Deleted => write!(f, "D"),
        }
    }
}

/// One file touched by a commit, with its hunks in diff order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub filename: String,
    pub kind: ChangeKind,
    pub chunks: Vec<Chunk>,
}

impl Change {
    /// Whether any hunk adds lines.
    pub fn has_added_lines(&self) -> bool {
        self.chunks.iter().any(|c| c.new_count > 0)
    }

    /// Whether any hunk deletes lines.
    pub fn has_deleted_lines(&self) -> bool {
        self.chunks.iter().any(|c| c.del_count > 0)
    }

    /// Distinct added line numbers, unioned across all hunks.
    pub fn added_lines(&self) -> BTreeSet<u32> {
        self.chunks.iter().flat_map(Chunk::added_lines).collect()
    }

    /// Distinct deleted line numbers, unioned across all hunks.
    pub fn deleted_lines(&self) -> BTreeSet<u32> {
        self.chunks.iter().flat_map(Chunk::deleted_lines).collect()
    }
}

/// One commit from the log. A commit with zero changes is valid (e.g. an
/// empty commit) and still flows through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    pub hash: String,
    pub parents: Vec<String>,
    pub changes: Vec<Change>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(new_start: u32, new_count: u32, del_start: u32, del_count: u32) -> Chunk {
        Chunk {
            new_start,
            new_count,
            del_start,
            del_count,
        }
    }

    #[test]
    fn chunk_line_ranges_are_half_open() {
        let c = chunk(20, 3, 10, 5);
        assert_eq!(c.added_lines().collect::<Vec<_>>(), vec![20, 21, 22]);
        assert_eq!(
            c.deleted_lines().collect::<Vec<_>>(),
            vec![10, 11, 12, 13, 14]
        );
    }

    #[test]
    fn zero_count_means_no_lines() {
        let c = chunk(1, 5, 0, 0);
        assert_eq!(c.deleted_lines().count(), 0);
        assert_eq!(c.added_lines().count(), 5);
    }

    #[test]
    fn change_predicates_follow_chunk_counts() {
        let change = Change {
            filename: "src/lib.rs".to_string(),
            kind: ChangeKind::Modified,
            chunks: vec![chunk(7, 2, 0, 0)],
        };
        assert!(change.has_added_lines());
        assert!(!change.has_deleted_lines());
    }

    #[test]
    fn change_lines_union_across_chunks() {
        let change = Change {
            filename: "src/lib.rs".to_string(),
            kind: ChangeKind::Modified,
            chunks: vec![chunk(5, 2, 5, 1), chunk(6, 2, 9, 0)],
        };
        // Line 6 appears in both hunks; the union stays distinct.
        assert_eq!(
            change.added_lines().into_iter().collect::<Vec<_>>(),
            vec![5, 6, 7]
        );
        assert_eq!(
            change.deleted_lines().into_iter().collect::<Vec<_>>(),
            vec![5]
        );
    }

    #[test]
    fn change_kind_displays_git_status_letters() {
        assert_eq!(ChangeKind::Added.to_string(), "A");
        assert_eq!(ChangeKind::Modified.to_string(), "M");
        assert_eq!(ChangeKind::Deleted.to_string(), "D");
    }
}
