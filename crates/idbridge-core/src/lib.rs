//! Shared domain model for the idbridge reconciliation agent.
//!
//! This crate holds the pieces every other crate agrees on: the directory
//! entities ([`User`], [`Group`]), the [`DirectorySource`] capability a
//! source adapter offers to the reconciliation engine, the group filter
//! that decides which source groups are in scope, and the per-run tally
//! ([`SyncStat`]) rendered at the end of a run.

pub mod filter;
pub mod model;
pub mod report;
pub mod source;

pub use filter::GroupFilter;
pub use model::{Group, User};
pub use report::SyncStat;
pub use source::{DirectorySource, SourceError};
