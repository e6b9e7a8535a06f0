//! Gitchurn - symbol-level git churn analysis
//!
//! Attributes commit churn to the functions, methods, and classes enclosing
//! each changed line, instead of to whole files. A streaming parser turns
//! `git log` diff text into commit records; a correlation engine maps every
//! added and deleted line to the symbol spans universal-ctags reports for
//! the relevant revision, aggregated under a revision-independent symbol
//! identity.

pub mod churn;
pub mod cli;
pub mod config;
pub mod git;
pub mod models;
pub mod pipeline;
pub mod reporters;
pub mod tags;
