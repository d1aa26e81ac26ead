//! In-memory implementation of the tuple store.
//!
//! # Purpose
//! Implements [`RelationTupleStore`] with a `BTreeMap` ordered by the
//! store's sort key, guarded by `tokio::sync::RwLock`. It exists for:
//! - local development and tests (no external dependencies)
//! - deployments where durability is not required
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - **Single-process consistency**: mutations take the write lock, reads
//!   the read lock, so a transaction is atomic with respect to readers.
//!
//! # Pagination
//! The `BTreeMap` iterates in sort-key order, which is exactly the
//! deterministic total order pagination cursors refer to. A page scan
//! resumes from the cursor bound and filters by the query pattern, so
//! pages stay stable under concurrent writes elsewhere in the keyspace.
use super::{cursor, RelationTupleStore, StoreError, StoreResult, TuplePage};
use crate::model::{RelationQuery, RelationTuple, SortKey};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ops::Bound;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryStore {
    tuples: RwLock<BTreeMap<SortKey, RelationTuple>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RelationTupleStore for InMemoryStore {
    async fn write_relation_tuples(&self, tuples: &[RelationTuple]) -> StoreResult<()> {
        let mut guard = self.tuples.write().await;
        for tuple in tuples {
            // Insertion is idempotent: re-inserting an existing tuple is a
            // no-op, keyed by the identity fields.
            guard.entry(tuple.sort_key()).or_insert_with(|| tuple.clone());
        }
        Ok(())
    }

    async fn delete_relation_tuples(&self, tuples: &[RelationTuple]) -> StoreResult<()> {
        let mut guard = self.tuples.write().await;
        for tuple in tuples {
            guard.remove(&tuple.sort_key());
        }
        Ok(())
    }

    async fn delete_all_relation_tuples(&self, query: &RelationQuery) -> StoreResult<()> {
        if query.is_empty() {
            return Err(StoreError::InvalidQuery(
                "at least one field must be specified".to_string(),
            ));
        }
        let mut guard = self.tuples.write().await;
        guard.retain(|_, tuple| !query.matches(tuple));
        Ok(())
    }

    async fn transact_relation_tuples(
        &self,
        inserts: &[RelationTuple],
        deletes: &[RelationTuple],
    ) -> StoreResult<()> {
        // A single write-lock scope makes the batch atomic with respect to
        // every reader, and map operations cannot fail halfway.
        let mut guard = self.tuples.write().await;
        for tuple in inserts {
            guard.entry(tuple.sort_key()).or_insert_with(|| tuple.clone());
        }
        for tuple in deletes {
            guard.remove(&tuple.sort_key());
        }
        Ok(())
    }

    async fn get_relation_tuples(
        &self,
        query: &RelationQuery,
        page_token: &str,
        page_size: usize,
    ) -> StoreResult<TuplePage> {
        let lower = if page_token.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(cursor::decode(page_token)?)
        };
        let page_size = page_size.max(1);

        let guard = self.tuples.read().await;
        let mut tuples = Vec::with_capacity(page_size.min(64));
        let mut more = false;
        for (_, tuple) in guard.range((lower, Bound::Unbounded)) {
            if !query.matches(tuple) {
                continue;
            }
            if tuples.len() == page_size {
                // One more match exists beyond this page.
                more = true;
                break;
            }
            tuples.push(tuple.clone());
        }
        // The cursor points at the last returned tuple; the next page
        // resumes strictly after it.
        let next_page_token = match (more, tuples.last()) {
            (true, Some(last)) => cursor::encode(&last.sort_key()),
            _ => String::new(),
        };
        Ok(TuplePage {
            tuples,
            next_page_token,
        })
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
