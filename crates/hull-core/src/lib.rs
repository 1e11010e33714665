//! # hull-core
//!
//! Shared data model for the hullscan catalog: the [`Artifact`] record the
//! catalog owns, and the [`SecurityState`] the scanning subsystem writes
//! back after each successful scan.
//!
//! The scanning subsystem borrows an artifact for one scan cycle and returns
//! an updated copy; nothing in this crate performs I/O.

pub mod types;

pub use types::*;
