//! HTTP backend for tabular analytics.
//!
//! One process-wide working dataset is loaded from uploads (or the built-in
//! sample), profiled, cleaned and extended with lookup columns resolved
//! against tables persisted in SQLite.

#![forbid(unsafe_code)]

pub mod config;
pub mod data;
pub mod error;
pub mod extract;
pub mod formulas;
pub mod lookup_tables;
pub mod sample;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use server::{router, serve};
pub use state::{AppState, NoDataLoaded, SharedState, WorkingSet};
