//! Rotation module
//!
//! This module groups all logic responsible for:
//! - Reading complete collection snapshots (reader)
//! - Uniform sampling without replacement (sampler)
//! - Finding destination items that came from a source (differ)
//! - Chunked, paced mutation of the destination (mutator)
//! - Sequencing all of the above into one run (runner)
//!
//! Design notes:
//! - Catalog-specific logic MUST NOT live here
//! - Every remote call is awaited in sequence; nothing fans out

pub mod differ;
pub mod mutator;
pub mod reader;
pub mod runner;
pub mod sampler;
