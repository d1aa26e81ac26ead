//! HTTP API module.
//!
//! # Purpose
//! Route handler modules plus the shared query-string parsing helper.
//! Handlers translate wire requests into facade/engine calls and map
//! errors through `api::error` so every endpoint speaks the same error
//! shape.
pub mod check;
pub mod error;
pub mod openapi;
pub mod relation_tuples;
pub mod system;
pub mod types;

use crate::api::error::{ApiError, api_bad_request};
use lattice_api::RelationQuery;
use std::collections::HashMap;

/// Parse the tuple-pattern portion of a query string. Pagination keys and
/// other parameters are ignored by `from_pairs`.
pub(crate) fn query_from_params(
    params: &HashMap<String, String>,
) -> Result<RelationQuery, ApiError> {
    RelationQuery::from_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .map_err(|err| api_bad_request("invalid_query", &err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_from_params_parses_subject_set() {
        let params: HashMap<String, String> = [
            ("namespace", "files"),
            ("subject_set.namespace", "groups"),
            ("subject_set.object", "eng"),
            ("subject_set.relation", "member"),
            ("page_size", "10"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let query = query_from_params(&params).expect("query");
        assert_eq!(query.namespace.as_deref(), Some("files"));
        let set = query.subject_set.expect("subject set");
        assert_eq!(set.relation, "member");
    }

    #[test]
    fn query_from_params_rejects_conflicting_subjects() {
        let params: HashMap<String, String> = [
            ("subject_id", "alice"),
            ("subject_set.namespace", "groups"),
            ("subject_set.object", "eng"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let err = query_from_params(&params).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.body.code, "invalid_query");
    }
}
