//! # hull-store
//!
//! Persistence collaborators for hullscan: the artifact catalog
//! ([`CatalogStore`]) and a generic categorized TTL key-value store
//! ([`TtlStore`]).
//!
//! Both are deliberately narrow traits so the scanning core can be tested
//! against in-memory substitutes. The production implementations are plain
//! JSON files; catalog scale is thousands of records, not millions.

pub mod catalog;
pub mod error;
pub mod ttl;

pub use catalog::{CatalogStore, JsonCatalogStore};
pub use error::{Result, StoreError};
pub use ttl::{JsonTtlStore, MemoryTtlStore, TtlEntry, TtlStore};
