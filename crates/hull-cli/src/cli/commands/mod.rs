//! Command implementations.

pub mod clear;
pub mod scan;
pub mod status;
