//! PostgreSQL Query MCP Server Library
//!
//! This library provides a single MCP (Model Context Protocol) tool,
//! `execute_query`, that runs SQL against a PostgreSQL database and returns
//! a normalized, size-bounded result or a normalized error.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod transport;

pub use config::Config;
pub use error::GatewayError;
pub use mcp::QueryService;
