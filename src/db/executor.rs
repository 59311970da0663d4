//! Query execution engine.
//!
//! One invocation maps to one connection: the executor opens a connection via
//! the provider, runs the statement, and closes the connection on every exit
//! path. The whole connect-prepare-execute-fetch sequence runs under a
//! bounded timeout so a hung query cannot hang the session.
//!
//! This is the system's error boundary: every driver failure is converted to
//! a failure payload here and never propagates to the transport loop.

use crate::db::provider::ConnectionProvider;
use crate::db::types::row_to_json_map;
use crate::error::{GatewayError, GatewayResult};
use crate::models::{JsonRow, QueryResponse};
use futures_util::StreamExt;
use sqlx::postgres::PgConnection;
use sqlx::{Column, Connection, Either, Executor, Statement};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

pub struct QueryExecutor {
    provider: ConnectionProvider,
    max_rows: u32,
    query_timeout: Duration,
}

impl QueryExecutor {
    /// Create an executor. A row cap of 0 is lifted to 1 so a misconfigured
    /// cap cannot mark every result as truncated while returning nothing.
    pub fn new(provider: ConnectionProvider, max_rows: u32, query_timeout: Duration) -> Self {
        Self {
            provider,
            max_rows: max_rows.max(1),
            query_timeout,
        }
    }

    /// The effective row cap.
    pub fn max_rows(&self) -> u32 {
        self.max_rows
    }

    /// Execute a statement verbatim and return the normalized outcome.
    ///
    /// Never returns an error: driver failures and timeouts become failure
    /// payloads so a single bad query cannot terminate the session. The SQL
    /// text is run exactly as supplied, with no binding and no allow-list;
    /// the caller is trusted.
    pub async fn execute(&self, sql: &str) -> QueryResponse {
        let start = Instant::now();
        debug!(sql = %sql, limit = self.max_rows, "Executing query");

        let outcome = match timeout(self.query_timeout, self.run(sql)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::timeout(
                "query execution",
                self.query_timeout.as_secs(),
            )),
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(response) => {
                debug!(elapsed_ms, "Query completed");
                response
            }
            Err(err) => {
                warn!(error = %err, elapsed_ms, "Query failed");
                QueryResponse::failure(&err)
            }
        }
    }

    async fn run(&self, sql: &str) -> GatewayResult<QueryResponse> {
        let mut conn = self.provider.open().await?;
        let result = self.run_on(&mut conn, sql).await;
        // Release the connection on every exit path. A close error after the
        // statement outcome is known is not worth surfacing.
        if let Err(close_err) = conn.close().await {
            debug!(error = %close_err, "Error closing connection");
        }
        result
    }

    async fn run_on(&self, conn: &mut PgConnection, sql: &str) -> GatewayResult<QueryResponse> {
        // Preparing the statement yields its column descriptor without
        // executing it: a non-empty descriptor means row-returning.
        let columns: Vec<String> = {
            let statement = conn.prepare(sql).await?;
            statement
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect()
        };

        if columns.is_empty() {
            self.run_mutation(conn, sql).await
        } else {
            self.run_select(conn, sql, columns).await
        }
    }

    /// Mutation/DDL path: run inside an explicit transaction and commit
    /// before reporting success, instead of relying on the connection's
    /// auto-commit state.
    async fn run_mutation(
        &self,
        conn: &mut PgConnection,
        sql: &str,
    ) -> GatewayResult<QueryResponse> {
        let mut tx = conn.begin().await?;
        let done = sqlx::query(sql).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(QueryResponse::mutation(done.rows_affected()))
    }

    /// Row-returning path: materialize at most `max_rows` rows, but keep
    /// draining the stream so the engine's command tag (its full matched-row
    /// count) is still observed. Memory stays bounded; row order and column
    /// order are exactly as the engine returned them.
    async fn run_select(
        &self,
        conn: &mut PgConnection,
        sql: &str,
        columns: Vec<String>,
    ) -> GatewayResult<QueryResponse> {
        let limit = self.max_rows as usize;
        let mut rows: Vec<JsonRow> = Vec::new();
        let mut seen: u64 = 0;
        let mut reported: Option<u64> = None;

        {
            let mut stream = conn.fetch_many(sql);
            while let Some(item) = stream.next().await {
                match item? {
                    Either::Left(done) => {
                        reported = Some(done.rows_affected());
                    }
                    Either::Right(row) => {
                        seen += 1;
                        if rows.len() < limit {
                            rows.push(row_to_json_map(&row));
                        }
                    }
                }
            }
        }

        // Postgres reports the matched count in the SELECT command tag; fall
        // back to the drained count if the tag was absent.
        let row_count = reported.unwrap_or(seen);
        if row_count > self.max_rows as u64 {
            warn!(
                row_count,
                limit = self.max_rows,
                "Query result truncated"
            );
        }

        Ok(QueryResponse::rows(columns, rows, row_count, self.max_rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_executor(max_rows: u32) -> QueryExecutor {
        let provider = ConnectionProvider::new("postgres://localhost:5432/test").unwrap();
        QueryExecutor::new(provider, max_rows, Duration::from_secs(30))
    }

    #[test]
    fn test_zero_row_cap_lifted_to_one() {
        assert_eq!(test_executor(0).max_rows(), 1);
    }

    #[test]
    fn test_row_cap_preserved() {
        assert_eq!(test_executor(250).max_rows(), 250);
    }

    #[tokio::test]
    async fn test_unreachable_database_yields_failure_payload() {
        // Port 1 is never a postgres server; the connect error must surface
        // as a failure payload, not a panic or a propagated error.
        let provider = ConnectionProvider::new("postgres://127.0.0.1:1/nope").unwrap();
        let executor = QueryExecutor::new(provider, 100, Duration::from_secs(5));
        let response = executor.execute("SELECT 1").await;
        assert!(!response.is_success());
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], false);
        assert!(!value["error"].as_str().unwrap().is_empty());
        assert_eq!(value["error_code"], serde_json::Value::Null);
    }
}
