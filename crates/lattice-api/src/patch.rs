//! Patch deltas for the transactional write path.
use crate::tuple::RelationTuple;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One element of a `PATCH /admin/relation-tuples` body. The action stays
/// a string on the wire so unknown values reach validation instead of
/// failing opaquely during deserialization.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct PatchDelta {
    pub action: String,
    pub relation_tuple: RelationTuple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchAction {
    Insert,
    Delete,
}

impl PatchAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchAction::Insert => "insert",
            PatchAction::Delete => "delete",
        }
    }
}

impl TryFrom<&str> for PatchAction {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "insert" => Ok(PatchAction::Insert),
            "delete" => Ok(PatchAction::Delete),
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }
}

impl PatchDelta {
    pub fn insert(relation_tuple: RelationTuple) -> Self {
        Self {
            action: PatchAction::Insert.as_str().to_string(),
            relation_tuple,
        }
    }

    pub fn delete(relation_tuple: RelationTuple) -> Self {
        Self {
            action: PatchAction::Delete.as_str().to_string(),
            relation_tuple,
        }
    }

    pub fn parsed_action(&self) -> Result<PatchAction> {
        PatchAction::try_from(self.action.as_str())
    }
}
