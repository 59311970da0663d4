//! MCP service implementation.
//!
//! Hand-written `ServerHandler` rather than the tool-router macros: the
//! catalog has exactly one entry and the response payload is a fixed text
//! shape, so the dispatch is a single name match. Unknown tool names get a
//! compact `{"error": "Unknown tool: <name>"}` payload, deliberately distinct
//! from the query failure shape, and never open a database connection.

use crate::db::QueryExecutor;
use crate::error::GatewayError;
use crate::models::QueryResponse;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Name of the single tool this server exposes.
pub const EXECUTE_QUERY_TOOL: &str = "execute_query";

/// The static tool catalog: one entry.
pub fn tool_catalog() -> Vec<Tool> {
    vec![Tool::new(
        EXECUTE_QUERY_TOOL,
        "Execute a SQL query against the PostgreSQL database. \
         Use for SELECT, INSERT, UPDATE, DELETE operations.",
        Arc::new(rmcp::model::object(json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The SQL query to execute"
                }
            },
            "required": ["query"]
        }))),
    )]
}

/// Protocol-level error payload for an unrecognized tool name. Built by hand
/// so the text is exactly `{"error": "Unknown tool: <name>"}` with a space
/// after the colon; the message still goes through serde for escaping.
pub fn unknown_tool_payload(name: &str) -> String {
    let message = serde_json::Value::String(format!("Unknown tool: {}", name));
    format!(r#"{{"error": {}}}"#, message)
}

#[derive(Clone)]
pub struct QueryService {
    executor: Arc<QueryExecutor>,
}

impl QueryService {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }

    /// Run one execute_query invocation and serialize the outcome.
    ///
    /// An absent or empty `query` argument is rejected here, before a
    /// connection is opened, and reported in the normal failure shape.
    async fn handle_execute_query(&self, query: &str) -> String {
        let response = if query.trim().is_empty() {
            QueryResponse::failure(&GatewayError::invalid_input(
                "query must be a non-empty string",
            ))
        } else {
            self.executor.execute(query).await
        };
        response.to_json_text()
    }
}

impl ServerHandler for QueryService {
    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move {
            Ok(ListToolsResult {
                meta: None,
                tools: tool_catalog(),
                next_cursor: None,
            })
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            if request.name != EXECUTE_QUERY_TOOL {
                debug!(tool = %request.name, "Unknown tool requested");
                return Ok(CallToolResult::success(vec![Content::text(
                    unknown_tool_payload(&request.name),
                )]));
            }

            let arguments = request.arguments.unwrap_or_default();
            let query = arguments
                .get("query")
                .and_then(|v| v.as_str())
                .unwrap_or_default();

            let payload = self.handle_execute_query(query).await;
            Ok(CallToolResult::success(vec![Content::text(payload)]))
        }
    }

    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "postgres-query-mcp".to_owned(),
                title: Some("PostgreSQL Query MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Execute SQL against the configured PostgreSQL database.\n\
                \n\
                ## Usage\n\
                Call `execute_query` with a `query` string. SELECT-shaped statements return\n\
                `columns`, `rows` (capped at the configured MAX_ROWS, default 100), the\n\
                engine's full matched `row_count`, and a `truncated` flag. Mutations and DDL\n\
                return `affected_rows`. Failures return `success: false` with the engine's\n\
                message and SQLSTATE in `error`/`error_code`.\n\
                \n\
                ## Trust boundary\n\
                The query text is executed verbatim: no parameter binding, no statement\n\
                allow-list, no sanitization. Only connect this server to databases where the\n\
                caller is fully trusted with the connection's privileges."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_exactly_one_tool() {
        let tools = tool_catalog();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, EXECUTE_QUERY_TOOL);
    }

    #[test]
    fn test_catalog_schema_requires_query_string() {
        let tools = tool_catalog();
        let schema = serde_json::Value::Object((*tools[0].input_schema).clone());
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(schema["required"], json!(["query"]));
    }

    #[test]
    fn test_catalog_description_mentions_postgresql() {
        let tools = tool_catalog();
        let description = tools[0].description.as_deref().unwrap();
        assert!(description.contains("PostgreSQL"));
    }

    #[test]
    fn test_unknown_tool_payload_exact_text() {
        let payload = unknown_tool_payload("drop_database");
        assert_eq!(payload, r#"{"error": "Unknown tool: drop_database"}"#);
    }

    #[test]
    fn test_unknown_tool_payload_escapes_name() {
        let payload = unknown_tool_payload("a\"b");
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["error"], "Unknown tool: a\"b");
    }

    #[tokio::test]
    async fn test_empty_query_rejected_without_connection() {
        use crate::db::ConnectionProvider;
        use std::time::Duration;

        // Unroutable address: if a connection were attempted this would hang
        // or fail differently; the invalid-input rejection must come first.
        let provider = ConnectionProvider::new("postgres://127.0.0.1:1/nope").unwrap();
        let executor = Arc::new(QueryExecutor::new(provider, 100, Duration::from_secs(5)));
        let service = QueryService::new(executor);

        let payload = service.handle_execute_query("").await;
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["success"], false);
        assert!(value["error"].as_str().unwrap().contains("non-empty"));
        assert_eq!(value["error_code"], serde_json::Value::Null);
    }
}
