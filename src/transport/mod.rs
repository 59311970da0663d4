//! Transport layer for the MCP server.
//!
//! Stdio is the only transport: the gateway is designed as one process per
//! caller session, so concurrent callers run separate processes rather than
//! sharing one server.

pub mod stdio;

pub use stdio::StdioTransport;
