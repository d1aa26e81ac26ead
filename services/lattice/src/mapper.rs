//! Identifier mapper: external strings to stable internal identifiers.
//!
//! Objects and subject ids are mapped to UUIDv5 over the nil namespace
//! UUID, so the mapping is deterministic and stateless: the same string
//! always yields the same identifier, and tests can construct identifiers
//! without touching the store. The external string is kept alongside the
//! UUID for rendering (see [`crate::model::ObjectId`]).
use crate::model::{ObjectId, RelationQuery, RelationTuple, Subject, SubjectSet};
use crate::registry::NamespaceRegistry;
use lattice_api as api;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    #[error("unknown namespace {0:?}")]
    UnknownNamespace(String),
    #[error("invalid relation tuple: {0}")]
    InvalidTuple(#[from] api::Error),
}

#[derive(Clone)]
pub struct UuidMapper {
    registry: Arc<NamespaceRegistry>,
}

impl UuidMapper {
    pub fn new(registry: Arc<NamespaceRegistry>) -> Self {
        Self { registry }
    }

    /// Deterministic identifier for an external string.
    pub fn object_id(name: &str) -> ObjectId {
        ObjectId {
            uid: Uuid::new_v5(&Uuid::nil(), name.as_bytes()),
            name: name.to_string(),
        }
    }

    fn check_namespace(&self, namespace: &str) -> Result<(), MapperError> {
        if self.registry.contains(namespace) {
            Ok(())
        } else {
            Err(MapperError::UnknownNamespace(namespace.to_string()))
        }
    }

    /// Map a validated external tuple into internal form. The tuple's
    /// namespace and any SubjectSet namespace must be declared.
    pub fn from_tuple(&self, tuple: &api::RelationTuple) -> Result<RelationTuple, MapperError> {
        self.check_namespace(&tuple.namespace)?;
        let subject = match tuple.subject()? {
            api::Subject::Id(id) => Subject::Id(Self::object_id(&id)),
            api::Subject::Set(mut set) => {
                set.normalize();
                self.check_namespace(&set.namespace)?;
                Subject::Set(SubjectSet {
                    namespace: set.namespace,
                    object: Self::object_id(&set.object),
                    relation: set.relation,
                })
            }
        };
        Ok(RelationTuple {
            namespace: tuple.namespace.clone(),
            object: Self::object_id(&tuple.object),
            relation: tuple.relation.clone(),
            subject,
        })
    }

    pub fn from_tuples(
        &self,
        tuples: &[api::RelationTuple],
    ) -> Result<Vec<RelationTuple>, MapperError> {
        tuples.iter().map(|tuple| self.from_tuple(tuple)).collect()
    }

    /// Map a query pattern; unspecified fields stay unspecified. Specified
    /// namespaces are validated against the registry.
    pub fn from_query(&self, query: &api::RelationQuery) -> Result<RelationQuery, MapperError> {
        if let Some(namespace) = &query.namespace {
            self.check_namespace(namespace)?;
        }
        let subject = match query.subject()? {
            None => None,
            Some(api::Subject::Id(id)) => Some(Subject::Id(Self::object_id(&id))),
            Some(api::Subject::Set(mut set)) => {
                set.normalize();
                self.check_namespace(&set.namespace)?;
                Some(Subject::Set(SubjectSet {
                    namespace: set.namespace,
                    object: Self::object_id(&set.object),
                    relation: set.relation,
                }))
            }
        };
        Ok(RelationQuery {
            namespace: query.namespace.clone(),
            object: query.object.as_deref().map(|o| Self::object_id(o).uid),
            relation: query.relation.clone(),
            subject,
        })
    }
}
