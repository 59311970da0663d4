//! Response payloads for the execute_query tool.
//!
//! These are the three wire shapes callers can receive. Field order matters:
//! serde serializes struct fields in declaration order and the payload is
//! documented with `success` first.

use crate::error::GatewayError;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Message constant reported for successful non-row-returning statements.
pub const MUTATION_MESSAGE: &str = "Query executed successfully";

/// A single result row, keyed by column name so field access is
/// order-independent for callers.
pub type JsonRow = serde_json::Map<String, JsonValue>;

/// Outcome of one execute_query invocation. Exactly one of the three shapes
/// is serialized; `success` distinguishes failure from the two success forms.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum QueryResponse {
    Rows(RowsPayload),
    Mutation(MutationPayload),
    Failure(FailurePayload),
}

/// Row-returning statement result. `row_count` is the engine's matched-row
/// count and may exceed `rows.len()` when the result was truncated.
#[derive(Debug, Clone, Serialize)]
pub struct RowsPayload {
    pub success: bool,
    pub columns: Vec<String>,
    pub rows: Vec<JsonRow>,
    pub row_count: u64,
    pub truncated: bool,
}

/// Mutation/DDL statement result.
#[derive(Debug, Clone, Serialize)]
pub struct MutationPayload {
    pub success: bool,
    pub affected_rows: u64,
    pub message: &'static str,
}

/// Normalized error result. `error_code` is the SQLSTATE when the engine
/// reported one, and serializes as JSON null otherwise (never omitted).
#[derive(Debug, Clone, Serialize)]
pub struct FailurePayload {
    pub success: bool,
    pub error: String,
    pub error_code: Option<String>,
}

impl QueryResponse {
    /// Build a row-returning result. `truncated` is derived from the engine's
    /// matched count, not from how many rows were materialized.
    pub fn rows(columns: Vec<String>, rows: Vec<JsonRow>, row_count: u64, limit: u32) -> Self {
        Self::Rows(RowsPayload {
            success: true,
            columns,
            rows,
            row_count,
            truncated: row_count > limit as u64,
        })
    }

    /// Build a mutation result from the driver's affected-row count.
    pub fn mutation(affected_rows: u64) -> Self {
        Self::Mutation(MutationPayload {
            success: true,
            affected_rows,
            message: MUTATION_MESSAGE,
        })
    }

    /// Convert a gateway error into the normalized failure shape.
    pub fn failure(err: &GatewayError) -> Self {
        Self::Failure(FailurePayload {
            success: false,
            error: err.to_string(),
            error_code: err.sql_state().map(str::to_string),
        })
    }

    /// Whether this response reports success.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failure(_))
    }

    /// Serialize to the transport's text payload: JSON with 2-space indent.
    /// Serialization of these shapes cannot realistically fail, but if it
    /// ever does the caller still gets a well-formed failure payload.
    pub fn to_json_text(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            serde_json::json!({
                "success": false,
                "error": format!("Failed to serialize response: {}", e),
                "error_code": JsonValue::Null,
            })
            .to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_payload_shape() {
        let mut row = JsonRow::new();
        row.insert("a".to_string(), JsonValue::from(1));
        row.insert("b".to_string(), JsonValue::from(2));
        let response =
            QueryResponse::rows(vec!["a".to_string(), "b".to_string()], vec![row], 1, 100);

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["columns"], serde_json::json!(["a", "b"]));
        assert_eq!(value["rows"][0]["a"], 1);
        assert_eq!(value["rows"][0]["b"], 2);
        assert_eq!(value["row_count"], 1);
        assert_eq!(value["truncated"], false);
    }

    #[test]
    fn test_truncated_follows_engine_count_not_materialized_rows() {
        // 250 rows matched, cap of 100: truncated even though only the
        // materialized rows are present.
        let response = QueryResponse::rows(vec!["n".to_string()], Vec::new(), 250, 100);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["truncated"], true);
        assert_eq!(value["row_count"], 250);
    }

    #[test]
    fn test_row_count_equal_to_limit_is_not_truncated() {
        let response = QueryResponse::rows(vec!["n".to_string()], Vec::new(), 100, 100);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["truncated"], false);
    }

    #[test]
    fn test_mutation_payload_shape() {
        let response = QueryResponse::mutation(0);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["affected_rows"], 0);
        assert_eq!(value["message"], MUTATION_MESSAGE);
        // Mutation results carry no rows/columns keys.
        assert!(value.get("rows").is_none());
        assert!(value.get("columns").is_none());
    }

    #[test]
    fn test_failure_payload_carries_sqlstate() {
        let err = GatewayError::database("syntax error", Some("42601".to_string()));
        let response = QueryResponse::failure(&err);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "syntax error");
        assert_eq!(value["error_code"], "42601");
        assert!(!response.is_success());
    }

    #[test]
    fn test_failure_payload_null_error_code_is_present() {
        let err = GatewayError::connection("connection refused");
        let text = QueryResponse::failure(&err).to_json_text();
        // error_code must serialize as null, not disappear.
        assert!(text.contains("\"error_code\": null"));
    }

    #[test]
    fn test_json_text_is_two_space_indented() {
        let response = QueryResponse::mutation(3);
        let text = response.to_json_text();
        assert!(text.starts_with("{\n  \"success\": true"));
    }

    #[test]
    fn test_key_order_is_stable() {
        let response = QueryResponse::rows(vec!["a".to_string()], Vec::new(), 0, 100);
        let text = response.to_json_text();
        let success_pos = text.find("\"success\"").unwrap();
        let columns_pos = text.find("\"columns\"").unwrap();
        let rows_pos = text.find("\"rows\"").unwrap();
        let count_pos = text.find("\"row_count\"").unwrap();
        assert!(success_pos < columns_pos && columns_pos < rows_pos && rows_pos < count_pos);
    }
}
