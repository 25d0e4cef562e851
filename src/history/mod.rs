//! Persistence layer.
//!
//! Stores the query log and runtime configuration records in PostgreSQL for:
//! - Health aggregation over trailing windows
//! - Configuration shared across service instances

mod store;

pub use store::{ConfigRecord, QueryRecord, Store};
