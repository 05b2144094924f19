//! Change tracking against committed baselines.
//!
//! The engine diffs an open document against the last committed version of
//! the file, turns the result into line decorations, and drives a
//! stage-and-commit workflow whose commits replace those baselines. Tab and
//! document state for a project lives in [`workspace::Workspace`]; persistence
//! sits behind the traits in [`store`], implemented for SQLite in [`db`].

pub mod annotate;
pub mod changeset;
pub mod db;
pub mod debounce;
pub mod diff;
pub mod document;
pub mod error;
pub mod import;
pub mod schema;
pub mod staging;
pub mod store;
pub mod suggest;
pub mod tabs;
pub mod types;
pub mod workspace;

pub use error::{CoreError, Result};
