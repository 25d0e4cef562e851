//! Service backbone for an AI query pipeline.
//!
//! Exposes three operations over a PostgreSQL store: a static greeting, a
//! rolling error-rate health check aggregated from the persisted query log,
//! and atomic upserts of keyed runtime configuration records.

pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod http;
pub mod server;
pub mod service;

pub use error::{Error, Result};
