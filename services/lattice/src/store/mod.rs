//! Tuple store contract and backends.
//!
//! The store is the only shared mutable resource in the service. Both
//! backends expose the same deterministic total order over tuples (see
//! [`crate::model::SortKey`]) so pagination cursors are stable across
//! requests and interchangeable between a backend restart and a resume.
use crate::model::{RelationQuery, RelationTuple};
use async_trait::async_trait;
use thiserror::Error;

pub mod cursor;
pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("invalid page token: {0}")]
    InvalidCursor(String),
    #[error("store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One page of a paginated list. `next_page_token` is empty when the scan
/// is exhausted; otherwise it is an opaque cursor resuming strictly after
/// the last tuple of this page.
#[derive(Debug, Clone)]
pub struct TuplePage {
    pub tuples: Vec<RelationTuple>,
    pub next_page_token: String,
}

#[async_trait]
pub trait RelationTupleStore: Send + Sync {
    /// Idempotent insertion: tuples that already exist are left untouched.
    async fn write_relation_tuples(&self, tuples: &[RelationTuple]) -> StoreResult<()>;

    /// Exact-match deletion; tuples that do not exist are silently
    /// tolerated.
    async fn delete_relation_tuples(&self, tuples: &[RelationTuple]) -> StoreResult<()>;

    /// Bulk deletion by pattern. A fully unspecified pattern is rejected
    /// with [`StoreError::InvalidQuery`] rather than erasing the store.
    async fn delete_all_relation_tuples(&self, query: &RelationQuery) -> StoreResult<()>;

    /// Atomic batch: either every insert and delete is applied or none is.
    async fn transact_relation_tuples(
        &self,
        inserts: &[RelationTuple],
        deletes: &[RelationTuple],
    ) -> StoreResult<()>;

    /// Up to `page_size` matching tuples in the store's total order,
    /// starting after `page_token` (empty token means from the start).
    async fn get_relation_tuples(
        &self,
        query: &RelationQuery,
        page_token: &str,
        page_size: usize,
    ) -> StoreResult<TuplePage>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}
