//! # hull-scan
//!
//! The concurrent vulnerability-scanning core of hullscan.
//!
//! For each cataloged artifact it resolves a concrete image reference
//! (digest-qualified when possible), consults a TTL cache of known-failing
//! artifacts, drives the external scanner through a two-tier remote/local
//! strategy, classifies failures, and persists every success immediately.
//!
//! ## Data flow
//!
//! ```text
//! Orchestrator -> Resolver (image coordinate)
//!              -> Failure cache (skip if known-bad)
//!              -> Scanner (remote tier, then pull + local tier)
//!              -> success: persist one artifact (merge upsert)
//!                 failure: classify + cache with policy TTL
//! ```
//!
//! Per-artifact consistency, not per-batch: a crash mid-batch loses only
//! in-flight work; everything already scanned is on disk and everything
//! else is re-selected next run.

pub mod cache;
pub mod classify;
pub mod error;
pub mod orchestrator;
pub mod resolve;
pub mod runner;
pub mod scanner;

pub use cache::{FailureInfo, ScanFailureCache};
pub use classify::{cache_ttl, classify, FailureClass};
pub use error::{Result, ScanError};
pub use orchestrator::{BatchResult, OrchestratorConfig, ProgressFn, ScanOrchestrator};
pub use resolve::{resolve, ImageCoordinate};
pub use runner::{CommandOutput, CommandRunner, TokioRunner};
pub use scanner::{ScanAttempt, ScannerConfig, TrivyScanner};
