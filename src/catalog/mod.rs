//! Catalog access layer
//!
//! This module provides:
//! - The `CatalogClient` trait the rotation pipeline talks to
//! - The `Session` handle carrying the per-run access token
//! - The Spotify Web API implementation
//!
//! Nothing outside this module knows about HTTP, URLs or JSON
//! payload shapes.

pub mod client;
pub mod spotify;

#[cfg(test)]
pub mod memory;

pub use client::{CatalogClient, Session, CHUNK_SIZE, PAGE_SIZE};
