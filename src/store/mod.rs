//! Time-series persistence for metric samples
//!
//! Mirrors a pluggable-backend layout: the `TimeSeriesStore` trait in
//! `backend`, a bounded in-memory implementation in `memory`, and a durable
//! SQLite implementation in `sqlite`.

pub mod backend;
pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;

pub use backend::TimeSeriesStore;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use schema::{MetricKind, Sample};
pub use sqlite::SqliteStore;
