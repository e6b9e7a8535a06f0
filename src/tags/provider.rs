//! Memoized (file, revision) -> tags resolution
//!
//! Resolving a file's tags means one `git show` plus one ctags run, and the
//! same (file, revision) pair comes up repeatedly: a commit and its child
//! both resolve the parent side. Content at a fixed revision is immutable,
//! so results are cached forever with no invalidation.

use super::ctags::CtagsDriver;
use super::{RawTag, TagSource};
use crate::git::GitDriver;
use anyhow::Result;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Resolves the symbol list for a file at a fixed revision, memoized.
pub struct TagProvider<'a> {
    git: &'a GitDriver,
    ctags: CtagsDriver,
    cache: DashMap<(String, String), Arc<Vec<RawTag>>>,
}

impl<'a> TagProvider<'a> {
    pub fn new(git: &'a GitDriver, ctags: CtagsDriver) -> Self {
        Self {
            git,
            ctags,
            cache: DashMap::new(),
        }
    }

    /// Number of distinct (file, revision) pairs resolved so far.
    pub fn cached_revisions(&self) -> usize {
        self.cache.len()
    }
}

impl TagSource for TagProvider<'_> {
    fn tags(&self, filename: &str, rev: &str) -> Result<Arc<Vec<RawTag>>> {
        let key = (filename.to_string(), rev.to_string());
        if let Some(hit) = self.cache.get(&key) {
            return Ok(Arc::clone(&hit));
        }
        debug!("resolving tags for {}@{}", filename, rev);
        let text = self.git.show(filename, rev)?;
        let tags = Arc::new(self.ctags.generate_tags(filename, &text)?);
        self.cache.insert(key, Arc::clone(&tags));
        Ok(tags)
    }

    fn parent_tags(&self, filename: &str, rev: &str) -> Result<Arc<Vec<RawTag>>> {
        // Immediate parent. GitDriver::canonical_rev exists if the
        // nearest-touching-ancestor interpretation is ever wanted instead.
        self.tags(filename, &format!("{rev}^"))
    }
}
