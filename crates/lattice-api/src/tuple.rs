//! Relation tuples and subjects in external (string-keyed) form.
//!
//! # Purpose
//! This is the wire shape: `subject_id` and `subject_set` are separate
//! optional fields so the JSON matches what clients send, and `validate()`
//! enforces that exactly one of them is present. In-process code should
//! prefer the [`Subject`] view obtained via [`RelationTuple::subject`].
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Relation literal clients may use instead of an empty SubjectSet
/// relation. Both spellings denote "any relation on that object".
pub const ANY_RELATION: &str = "...";

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq, Hash)]
pub struct RelationTuple {
    pub namespace: String,
    pub object: String,
    pub relation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_set: Option<SubjectSet>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq, Hash)]
pub struct SubjectSet {
    pub namespace: String,
    pub object: String,
    /// Empty means "any relation on that object".
    #[serde(default)]
    pub relation: String,
}

/// Canonical in-process view of a tuple's subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subject {
    Id(String),
    Set(SubjectSet),
}

impl RelationTuple {
    pub fn with_subject_id(
        namespace: impl Into<String>,
        object: impl Into<String>,
        relation: impl Into<String>,
        subject_id: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            object: object.into(),
            relation: relation.into(),
            subject_id: Some(subject_id.into()),
            subject_set: None,
        }
    }

    pub fn with_subject_set(
        namespace: impl Into<String>,
        object: impl Into<String>,
        relation: impl Into<String>,
        subject_set: SubjectSet,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            object: object.into(),
            relation: relation.into(),
            subject_id: None,
            subject_set: Some(subject_set),
        }
    }

    /// Structural invariants: non-empty namespace/object/relation, exactly
    /// one subject variant, and a well-formed SubjectSet when present.
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(Error::EmptyField("namespace"));
        }
        if self.object.is_empty() {
            return Err(Error::EmptyField("object"));
        }
        if self.relation.is_empty() {
            return Err(Error::EmptyField("relation"));
        }
        match (&self.subject_id, &self.subject_set) {
            (Some(id), None) => {
                if id.is_empty() {
                    return Err(Error::EmptyField("subject_id"));
                }
            }
            (None, Some(set)) => set.validate()?,
            _ => return Err(Error::InvalidSubject),
        }
        Ok(())
    }

    /// The subject as a single variant. Fails on tuples that do not pass
    /// [`validate`](Self::validate).
    pub fn subject(&self) -> Result<Subject> {
        match (&self.subject_id, &self.subject_set) {
            (Some(id), None) => Ok(Subject::Id(id.clone())),
            (None, Some(set)) => Ok(Subject::Set(set.clone())),
            _ => Err(Error::InvalidSubject),
        }
    }

}

impl SubjectSet {
    pub fn new(
        namespace: impl Into<String>,
        object: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        let mut set = Self {
            namespace: namespace.into(),
            object: object.into(),
            relation: relation.into(),
        };
        set.normalize();
        set
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(Error::EmptyField("subject_set.namespace"));
        }
        if self.object.is_empty() {
            return Err(Error::EmptyField("subject_set.object"));
        }
        Ok(())
    }

    pub fn normalize(&mut self) {
        if self.relation == ANY_RELATION {
            self.relation.clear();
        }
    }
}

/// Parse the `ns:obj#rel@subject` form. The subject is a SubjectSet
/// whenever it contains a `:`, otherwise a bare subject id. `#` followed
/// by nothing and no `#` at all both yield the empty relation.
impl FromStr for RelationTuple {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (namespace, rest) = s.split_once(':').ok_or(Error::MissingSeparator(':'))?;
        let (object, rest) = rest.split_once('#').ok_or(Error::MissingSeparator('#'))?;
        let (relation, subject) = rest.split_once('@').ok_or(Error::MissingSeparator('@'))?;

        let mut tuple = Self {
            namespace: namespace.to_string(),
            object: object.to_string(),
            relation: relation.to_string(),
            subject_id: None,
            subject_set: None,
        };
        match parse_subject(subject) {
            Subject::Id(id) => tuple.subject_id = Some(id),
            Subject::Set(set) => tuple.subject_set = Some(set),
        }
        tuple.validate()?;
        Ok(tuple)
    }
}

fn parse_subject(s: &str) -> Subject {
    match s.split_once(':') {
        Some((namespace, rest)) => {
            let (object, relation) = match rest.split_once('#') {
                Some((object, relation)) => (object, relation),
                None => (rest, ""),
            };
            Subject::Set(SubjectSet::new(namespace, object, relation))
        }
        None => Subject::Id(s.to_string()),
    }
}

/// Canonical rendering. A SubjectSet with the empty relation renders
/// without a trailing `#`, so parse∘render is the identity on canonical
/// strings.
impl fmt::Display for RelationTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}@", self.namespace, self.object, self.relation)?;
        match (&self.subject_id, &self.subject_set) {
            (Some(id), _) => write!(f, "{id}"),
            (_, Some(set)) => write!(f, "{set}"),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for SubjectSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.relation.is_empty() {
            write!(f, "{}:{}", self.namespace, self.object)
        } else {
            write!(f, "{}:{}#{}", self.namespace, self.object, self.relation)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subject_id_tuple() {
        let tuple: RelationTuple = "videos:cat.mp4#view@alice".parse().expect("parse");
        assert_eq!(tuple.namespace, "videos");
        assert_eq!(tuple.object, "cat.mp4");
        assert_eq!(tuple.relation, "view");
        assert_eq!(tuple.subject_id.as_deref(), Some("alice"));
        assert!(tuple.subject_set.is_none());
    }

    #[test]
    fn parses_subject_set_tuple() {
        let tuple: RelationTuple = "videos:cat.mp4#view@groups:admins#member"
            .parse()
            .expect("parse");
        assert_eq!(
            tuple.subject_set,
            Some(SubjectSet::new("groups", "admins", "member"))
        );
    }

    #[test]
    fn empty_and_missing_relation_are_equivalent() {
        let with_hash: RelationTuple = "n:o#r@u:obj#".parse().expect("parse");
        let without_hash: RelationTuple = "n:o#r@u:obj".parse().expect("parse");
        let dots: RelationTuple = "n:o#r@u:obj#...".parse().expect("parse");
        assert_eq!(with_hash, without_hash);
        assert_eq!(with_hash, dots);
        assert_eq!(
            with_hash.subject_set.as_ref().map(|s| s.relation.as_str()),
            Some("")
        );
    }

    #[test]
    fn rejects_missing_separators() {
        assert_eq!(
            "no-separators".parse::<RelationTuple>(),
            Err(Error::MissingSeparator(':'))
        );
        assert_eq!(
            "n:obj-without-relation".parse::<RelationTuple>(),
            Err(Error::MissingSeparator('#'))
        );
        assert_eq!(
            "n:o#rel-without-subject".parse::<RelationTuple>(),
            Err(Error::MissingSeparator('@'))
        );
    }

    #[test]
    fn rejects_empty_fields() {
        assert_eq!(
            ":o#r@s".parse::<RelationTuple>(),
            Err(Error::EmptyField("namespace"))
        );
        assert_eq!(
            "n:#r@s".parse::<RelationTuple>(),
            Err(Error::EmptyField("object"))
        );
        assert_eq!(
            "n:o#@s".parse::<RelationTuple>(),
            Err(Error::EmptyField("relation"))
        );
        assert_eq!(
            "n:o#r@".parse::<RelationTuple>(),
            Err(Error::EmptyField("subject_id"))
        );
    }

    #[test]
    fn validate_requires_exactly_one_subject() {
        let mut tuple = RelationTuple::with_subject_id("n", "o", "r", "s");
        tuple.subject_set = Some(SubjectSet::new("n", "o", "r"));
        assert_eq!(tuple.validate(), Err(Error::InvalidSubject));

        let neither = RelationTuple {
            namespace: "n".into(),
            object: "o".into(),
            relation: "r".into(),
            subject_id: None,
            subject_set: None,
        };
        assert_eq!(neither.validate(), Err(Error::InvalidSubject));
    }

    #[test]
    fn render_round_trips() {
        for s in [
            "videos:cat.mp4#view@alice",
            "videos:cat.mp4#view@groups:admins#member",
            "files:readme#parent@files:docs",
        ] {
            let tuple: RelationTuple = s.parse().expect("parse");
            assert_eq!(tuple.to_string(), s);
        }
    }

    #[test]
    fn subject_json_shape_is_flat() {
        let tuple: RelationTuple = "n:o#r@s".parse().expect("parse");
        let json = serde_json::to_value(&tuple).expect("json");
        assert_eq!(json["subject_id"], "s");
        assert!(json.get("subject_set").is_none());
    }
}
