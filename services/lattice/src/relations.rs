//! Write/patch facade over the mapper and the tuple store.
//!
//! All mutation and listing flows through here: structural validation
//! first (any invalid delta aborts a whole batch before the store is
//! touched), then identifier mapping, then the store call. Listing maps
//! the pattern, clamps the page size against the registry, and renders
//! results back into wire form.
use crate::mapper::{MapperError, UuidMapper};
use crate::registry::NamespaceRegistry;
use crate::store::{RelationTupleStore, StoreError};
use lattice_api as api;
use lattice_api::PatchAction;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum RelationError {
    #[error("invalid relation tuple: {0}")]
    InvalidTuple(#[source] api::Error),
    #[error("unknown patch action {0:?}")]
    InvalidAction(String),
    #[error("unknown namespace {0:?}")]
    UnknownNamespace(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<MapperError> for RelationError {
    fn from(err: MapperError) -> Self {
        match err {
            MapperError::UnknownNamespace(namespace) => RelationError::UnknownNamespace(namespace),
            MapperError::InvalidTuple(err) => RelationError::InvalidTuple(err),
        }
    }
}

/// Acknowledgement of a patch. The snapshot tokens are placeholders, one
/// per inserted tuple; they carry no consistency semantics yet.
#[derive(Debug)]
pub struct PatchAck {
    pub snapshot_tokens: Vec<String>,
}

const SNAPSHOT_TOKEN_PLACEHOLDER: &str = "not yet implemented";

pub struct Relations {
    registry: Arc<NamespaceRegistry>,
    mapper: UuidMapper,
    store: Arc<dyn RelationTupleStore>,
}

impl Relations {
    pub fn new(registry: Arc<NamespaceRegistry>, store: Arc<dyn RelationTupleStore>) -> Self {
        Self {
            mapper: UuidMapper::new(registry.clone()),
            registry,
            store,
        }
    }

    /// Insert one tuple, returning its canonical (normalized) wire form.
    pub async fn create(
        &self,
        tuple: &api::RelationTuple,
    ) -> Result<api::RelationTuple, RelationError> {
        tuple.validate().map_err(RelationError::InvalidTuple)?;
        let internal = self.mapper.from_tuple(tuple)?;
        self.store.write_relation_tuples(&[internal.clone()]).await?;
        metrics::counter!("lattice_tuples_written_total").increment(1);
        Ok(internal.to_api())
    }

    /// Apply a batch of deltas atomically. Validation covers the whole
    /// batch before anything is mapped or persisted.
    pub async fn patch(&self, deltas: &[api::PatchDelta]) -> Result<PatchAck, RelationError> {
        let mut inserts = Vec::new();
        let mut deletes = Vec::new();
        for delta in deltas {
            let action = match delta.parsed_action() {
                Ok(action) => action,
                Err(api::Error::UnknownAction(action)) => {
                    return Err(RelationError::InvalidAction(action))
                }
                Err(err) => return Err(RelationError::InvalidTuple(err)),
            };
            delta
                .relation_tuple
                .validate()
                .map_err(RelationError::InvalidTuple)?;
            match action {
                PatchAction::Insert => inserts.push(delta.relation_tuple.clone()),
                PatchAction::Delete => deletes.push(delta.relation_tuple.clone()),
            }
        }

        let internal_inserts = self.mapper.from_tuples(&inserts)?;
        let internal_deletes = self.mapper.from_tuples(&deletes)?;
        self.store
            .transact_relation_tuples(&internal_inserts, &internal_deletes)
            .await?;
        metrics::counter!("lattice_tuples_written_total").increment(internal_inserts.len() as u64);
        metrics::counter!("lattice_tuples_deleted_total").increment(internal_deletes.len() as u64);

        Ok(PatchAck {
            snapshot_tokens: vec![SNAPSHOT_TOKEN_PLACEHOLDER.to_string(); internal_inserts.len()],
        })
    }

    /// Delete every tuple matching the pattern. The store rejects a fully
    /// unspecified pattern.
    pub async fn delete_by_query(&self, query: &api::RelationQuery) -> Result<(), RelationError> {
        let internal = self.mapper.from_query(query)?;
        self.store.delete_all_relation_tuples(&internal).await?;
        metrics::counter!("lattice_tuples_deleted_total").increment(1);
        Ok(())
    }

    /// List tuples matching the pattern, one page at a time.
    pub async fn list(
        &self,
        query: &api::RelationQuery,
        page_token: &str,
        page_size: Option<usize>,
    ) -> Result<(Vec<api::RelationTuple>, String), RelationError> {
        let internal = self.mapper.from_query(query)?;
        let page_size = self.registry.clamp_page_size(page_size);
        let page = self
            .store
            .get_relation_tuples(&internal, page_token, page_size)
            .await?;
        let tuples = page.tuples.iter().map(|tuple| tuple.to_api()).collect();
        Ok((tuples, page.next_page_token))
    }
}
