//! Database layer for callpulse
//!
//! This module provides the SQLite record store with:
//! - Schema migrations
//! - Repository pattern for metric and record queries

pub mod repo;
pub mod schema;

pub use repo::{Database, StoredRecord};
