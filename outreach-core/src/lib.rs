//! Core library for Outreach.
//!
//! This crate provides the domain models and the SQLite-backed store for the
//! prospect pipeline and the organization/user admin, independent of any
//! transport layer (HTTP, MCP, etc.).
//!
//! # Usage
//!
//! ```no_run
//! use outreach_core::db::Database;
//! use outreach_core::models::*;
//!
//! let db = Database::open_default()?;
//! db.migrate()?;
//!
//! let metrics = db.funnel_metrics()?;
//! println!("{} prospects, {} replies", metrics.total_prospects, metrics.replies);
//! # Ok::<(), outreach_core::Error>(())
//! ```

pub mod db;
pub mod error;
pub mod models;
pub mod slug;
pub mod store;

// Re-export commonly used types at crate root
pub use db::Database;
pub use error::{Error, Result};
pub use store::ProspectStore;
