//! External relation-tuple representation for lattice.
//!
//! # Purpose
//! Defines the string-keyed relation tuple, subject variants, query
//! patterns, and patch deltas exchanged over the wire and on the command
//! line, together with the textual tuple grammar:
//!
//! ```text
//! tuple   := ns ":" obj "#" rel "@" subject
//! subject := id | ns ":" obj [ "#" [ rel ] ]
//! ```
//!
//! Everything in this crate is plain data: no I/O, no async. The service
//! maps these types onto its internal identifier-based model before they
//! reach the store or the check engine.
pub mod patch;
pub mod query;
pub mod tuple;

pub use patch::{PatchAction, PatchDelta};
pub use query::RelationQuery;
pub use tuple::{RelationTuple, Subject, SubjectSet};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("missing {0:?} separator in relation tuple")]
    MissingSeparator(char),
    #[error("relation tuple field {0:?} must not be empty")]
    EmptyField(&'static str),
    #[error("exactly one of subject_id and subject_set must be set")]
    InvalidSubject,
    #[error("unknown patch action {0:?}")]
    UnknownAction(String),
}
