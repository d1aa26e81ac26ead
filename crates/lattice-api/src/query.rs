//! Query patterns over relation tuples.
//!
//! Every position is optional; unspecified fields match anything. The URL
//! encoding uses the flat keys `namespace`, `object`, `relation`,
//! `subject_id`, and `subject_set.{namespace,object,relation}`.
use crate::tuple::{RelationTuple, Subject, SubjectSet};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default, PartialEq, Eq)]
pub struct RelationQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_set: Option<SubjectSet>,
}

impl RelationQuery {
    /// Pattern matching exactly one tuple.
    pub fn from_tuple(tuple: &RelationTuple) -> Self {
        Self {
            namespace: Some(tuple.namespace.clone()),
            object: Some(tuple.object.clone()),
            relation: Some(tuple.relation.clone()),
            subject_id: tuple.subject_id.clone(),
            subject_set: tuple.subject_set.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.namespace.is_none()
            && self.object.is_none()
            && self.relation.is_none()
            && self.subject_id.is_none()
            && self.subject_set.is_none()
    }

    pub fn subject(&self) -> Result<Option<Subject>> {
        match (&self.subject_id, &self.subject_set) {
            (None, None) => Ok(None),
            (Some(id), None) => Ok(Some(Subject::Id(id.clone()))),
            (None, Some(set)) => Ok(Some(Subject::Set(set.clone()))),
            _ => Err(Error::InvalidSubject),
        }
    }

    /// Build a query from URL key/value pairs, ignoring unrelated keys
    /// (pagination parameters travel in the same query string). A partial
    /// `subject_set.*` group is invalid.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut query = Self::default();
        let mut set_namespace = None;
        let mut set_object = None;
        let mut set_relation = None;
        for (key, value) in pairs {
            match key {
                "namespace" => query.namespace = Some(value.to_string()),
                "object" => query.object = Some(value.to_string()),
                "relation" => query.relation = Some(value.to_string()),
                "subject_id" => query.subject_id = Some(value.to_string()),
                "subject_set.namespace" => set_namespace = Some(value.to_string()),
                "subject_set.object" => set_object = Some(value.to_string()),
                "subject_set.relation" => set_relation = Some(value.to_string()),
                _ => {}
            }
        }
        match (set_namespace, set_object) {
            (Some(namespace), Some(object)) => {
                query.subject_set = Some(SubjectSet::new(
                    namespace,
                    object,
                    set_relation.unwrap_or_default(),
                ));
            }
            (None, None) if set_relation.is_none() => {}
            _ => return Err(Error::InvalidSubject),
        }
        if query.subject_id.is_some() && query.subject_set.is_some() {
            return Err(Error::InvalidSubject);
        }
        Ok(query)
    }

    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(namespace) = &self.namespace {
            pairs.push(("namespace", namespace.clone()));
        }
        if let Some(object) = &self.object {
            pairs.push(("object", object.clone()));
        }
        if let Some(relation) = &self.relation {
            pairs.push(("relation", relation.clone()));
        }
        if let Some(subject_id) = &self.subject_id {
            pairs.push(("subject_id", subject_id.clone()));
        }
        if let Some(set) = &self.subject_set {
            pairs.push(("subject_set.namespace", set.namespace.clone()));
            pairs.push(("subject_set.object", set.object.clone()));
            pairs.push(("subject_set.relation", set.relation.clone()));
        }
        pairs
    }
}
