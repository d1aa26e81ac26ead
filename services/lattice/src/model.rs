//! Internal relation-tuple model.
//!
//! # Purpose
//! The store and the check engine operate on stable 128-bit identifiers,
//! not on the free-form strings clients send. This module defines the
//! identifier-keyed tuple, subject, and query types plus the sort key that
//! fixes the store's deterministic total order.
//!
//! Each identifier keeps the external string it was derived from so list
//! responses can render tuples back in wire form without a reverse lookup.
use lattice_api as api;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// A mapped identifier: the UUIDv5 the engine compares plus the external
/// name it was derived from. Equality, ordering, and hashing use only the
/// UUID; the name rides along for rendering.
#[derive(Debug, Clone)]
pub struct ObjectId {
    pub uid: Uuid,
    pub name: String,
}

impl PartialEq for ObjectId {
    fn eq(&self, other: &Self) -> bool {
        self.uid == other.uid
    }
}

impl Eq for ObjectId {}

impl PartialOrd for ObjectId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ObjectId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.uid.cmp(&other.uid)
    }
}

impl Hash for ObjectId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uid.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subject {
    Id(ObjectId),
    Set(SubjectSet),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectSet {
    pub namespace: String,
    pub object: ObjectId,
    /// Empty means "any relation on that object".
    pub relation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationTuple {
    pub namespace: String,
    pub object: ObjectId,
    pub relation: String,
    pub subject: Subject,
}

/// Query pattern in internal form. Unspecified fields match anything.
#[derive(Debug, Clone, Default)]
pub struct RelationQuery {
    pub namespace: Option<String>,
    pub object: Option<Uuid>,
    pub relation: Option<String>,
    pub subject: Option<Subject>,
}

impl RelationQuery {
    pub fn is_empty(&self) -> bool {
        self.namespace.is_none()
            && self.object.is_none()
            && self.relation.is_none()
            && self.subject.is_none()
    }

    pub fn matches(&self, tuple: &RelationTuple) -> bool {
        if let Some(namespace) = &self.namespace {
            if tuple.namespace != *namespace {
                return false;
            }
        }
        if let Some(object) = &self.object {
            if tuple.object.uid != *object {
                return false;
            }
        }
        if let Some(relation) = &self.relation {
            if tuple.relation != *relation {
                return false;
            }
        }
        if let Some(subject) = &self.subject {
            if tuple.subject != *subject {
                return false;
            }
        }
        true
    }
}

impl Subject {
    /// Discriminant used in the sort order and the database: ids order
    /// before sets.
    pub fn kind(&self) -> u8 {
        match self {
            Subject::Id(_) => 0,
            Subject::Set(_) => 1,
        }
    }
}

impl RelationTuple {
    /// Render back into wire form using the external names carried by the
    /// identifiers.
    pub fn to_api(&self) -> api::RelationTuple {
        match &self.subject {
            Subject::Id(id) => api::RelationTuple::with_subject_id(
                self.namespace.clone(),
                self.object.name.clone(),
                self.relation.clone(),
                id.name.clone(),
            ),
            Subject::Set(set) => api::RelationTuple::with_subject_set(
                self.namespace.clone(),
                self.object.name.clone(),
                self.relation.clone(),
                api::SubjectSet::new(
                    set.namespace.clone(),
                    set.object.name.clone(),
                    set.relation.clone(),
                ),
            ),
        }
    }

    pub fn sort_key(&self) -> SortKey {
        let (subject_namespace, subject_object, subject_relation) = match &self.subject {
            Subject::Id(id) => (String::new(), id.uid, String::new()),
            Subject::Set(set) => (set.namespace.clone(), set.object.uid, set.relation.clone()),
        };
        SortKey {
            namespace: self.namespace.clone(),
            object: self.object.uid,
            relation: self.relation.clone(),
            subject_kind: self.subject.kind(),
            subject_namespace,
            subject_object,
            subject_relation,
        }
    }
}

/// Position in the store's total order: lexicographic over
/// `(namespace, object, relation, subject kind, subject fields)`. Derived
/// `Ord` matches the field order, and the Postgres backend orders by the
/// same columns, so cursors mean the same position in both backends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortKey {
    pub namespace: String,
    pub object: Uuid,
    pub relation: String,
    pub subject_kind: u8,
    pub subject_namespace: String,
    pub subject_object: Uuid,
    pub subject_relation: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::UuidMapper;

    fn tuple(namespace: &str, object: &str, relation: &str, subject: Subject) -> RelationTuple {
        RelationTuple {
            namespace: namespace.to_string(),
            object: UuidMapper::object_id(object),
            relation: relation.to_string(),
            subject,
        }
    }

    #[test]
    fn object_id_identity_ignores_name() {
        let a = UuidMapper::object_id("alice");
        let mut b = a.clone();
        b.name = "renamed".to_string();
        assert_eq!(a, b);
    }

    #[test]
    fn sort_key_orders_ids_before_sets() {
        let id = tuple("n", "o", "r", Subject::Id(UuidMapper::object_id("s")));
        let set = tuple(
            "n",
            "o",
            "r",
            Subject::Set(SubjectSet {
                namespace: "n".to_string(),
                object: UuidMapper::object_id("s"),
                relation: "member".to_string(),
            }),
        );
        assert!(id.sort_key() < set.sort_key());
    }

    #[test]
    fn query_matches_only_specified_fields() {
        let t = tuple("n", "o", "r", Subject::Id(UuidMapper::object_id("s")));
        let by_relation = RelationQuery {
            relation: Some("r".to_string()),
            ..Default::default()
        };
        assert!(by_relation.matches(&t));

        let wrong_object = RelationQuery {
            object: Some(UuidMapper::object_id("other").uid),
            ..Default::default()
        };
        assert!(!wrong_object.matches(&t));

        assert!(RelationQuery::default().matches(&t));
        assert!(RelationQuery::default().is_empty());
    }

    #[test]
    fn to_api_round_trips_external_names() {
        let t = tuple(
            "videos",
            "cat.mp4",
            "view",
            Subject::Set(SubjectSet {
                namespace: "groups".to_string(),
                object: UuidMapper::object_id("admins"),
                relation: "member".to_string(),
            }),
        );
        assert_eq!(t.to_api().to_string(), "videos:cat.mp4#view@groups:admins#member");
    }
}
