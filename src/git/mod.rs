//! Git log access and parsing
//!
//! Two halves: [`driver::GitDriver`] spawns the real git binary with a
//! fixed, parser-friendly log configuration, and [`log::parse`] turns the
//! resulting text stream into a lazy sequence of [`crate::models::Commit`]
//! records, one pass, nothing buffered beyond the commit being built.

pub mod driver;
pub mod log;

pub use driver::{is_git_repo, GitDriver, LogStream, GIT_LOG_ARGS};
pub use log::{parse, Commits, ParseError};
