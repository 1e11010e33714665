//! # hull-cli
//!
//! Command-line interface for the hullscan artifact security catalog.
//!
//! - **scan**: run a bounded-concurrency vulnerability scan batch over the
//!   catalog, persisting every success as it completes
//! - **status**: show the current security posture per artifact
//! - **clear-failure**: drop an artifact's failure-cache entry so it is
//!   retried on the next batch

pub mod cli;
pub mod config;

pub use cli::run;
