//! Database access layer.
//!
//! - Connection provider: descriptor validation and per-request connections
//! - Query executor: statement execution, result shaping, error boundary
//! - Type mappings: PostgreSQL values to JSON

pub mod executor;
pub mod provider;
pub mod types;

pub use executor::QueryExecutor;
pub use provider::ConnectionProvider;
