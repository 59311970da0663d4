//! Data models for the query gateway.

pub mod query;

pub use query::{
    FailurePayload, JsonRow, MUTATION_MESSAGE, MutationPayload, QueryResponse, RowsPayload,
};
