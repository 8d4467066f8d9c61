//! # callpulse-core
//!
//! Core library for callpulse - the call-center KPI dashboard engine.
//!
//! This library provides:
//! - Period keys for month, quarter, half-year and year records
//! - Rollup, aggregation and period comparison for KPI series
//! - A record store abstraction with an SQLite implementation
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Example
//!
//! ```rust,no_run
//! use callpulse_core::analytics::{Dashboard, DashboardOptions};
//! use callpulse_core::{Config, Database};
//!
//! let config = Config::load().expect("failed to load config");
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let mut dashboard = Dashboard::new(&db, config.dashboard_options());
//! dashboard.select_metric("aht").expect("unknown metric");
//! for bucket in dashboard.buckets() {
//!     println!("{} {}", bucket.label, bucket.value);
//! }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use period::Period;
pub use store::{MemoryStore, RecordStore};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod period;
pub mod store;
pub mod types;
