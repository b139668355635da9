pub mod backend;
pub mod business;
pub mod metadata_impl;
pub mod schema;
pub mod visit;

pub use backend::DuckDbBackend;

/// Re-export the `duckdb` crate so consumers (especially tests) can use
/// `leadpulse_duckdb::duckdb::params!` without an extra dependency.
pub use duckdb;
