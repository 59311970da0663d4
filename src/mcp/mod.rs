//! MCP server integration module.

pub mod service;

pub use service::QueryService;
