//! Membership check handler.
use crate::api::error::{ApiError, api_bad_request, relation_error, store_error};
use crate::api::query_from_params;
use crate::api::types::CheckResponse;
use crate::app::AppState;
use axum::Json;
use axum::extract::{Query, State};
use lattice_api::RelationTuple;
use std::collections::HashMap;

#[utoipa::path(
    get,
    path = "/check",
    tag = "check",
    params(
        ("namespace" = String, Query, description = "Namespace of the set"),
        ("object" = String, Query, description = "Object of the set"),
        ("relation" = String, Query, description = "Relation of the set"),
        ("subject_id" = Option<String>, Query, description = "Subject id to check"),
        ("subject_set.namespace" = Option<String>, Query, description = "Subject set namespace"),
        ("subject_set.object" = Option<String>, Query, description = "Subject set object"),
        ("subject_set.relation" = Option<String>, Query, description = "Subject set relation"),
        ("max-depth" = Option<i32>, Query, description = "Expansion depth; non-positive or absent uses the global limit")
    ),
    responses(
        (status = 200, description = "Membership decision", body = CheckResponse),
        (status = 400, description = "Malformed check tuple", body = crate::api::types::ErrorResponse),
        (status = 500, description = "Store failure", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn check(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Json<CheckResponse>, ApiError> {
    let tuple = tuple_from_params(&params)?;
    let max_depth = match params.get("max-depth") {
        None => 0,
        Some(raw) => raw
            .parse::<i32>()
            .map_err(|_| api_bad_request("invalid_query", "max-depth must be an integer"))?,
    };

    let internal = state
        .mapper
        .from_tuple(&tuple)
        .map_err(|err| relation_error("failed to map check tuple", err.into()))?;
    let allowed = state
        .engine
        .check_is_member(&internal, max_depth)
        .await
        .map_err(|err| store_error("failed to evaluate check", err))?;
    Ok(Json(CheckResponse { allowed }))
}

/// A check needs a fully specified tuple: every set field plus exactly one
/// subject variant.
fn tuple_from_params(params: &HashMap<String, String>) -> Result<RelationTuple, ApiError> {
    let query = query_from_params(params)?;
    let namespace = query
        .namespace
        .ok_or_else(|| api_bad_request("invalid_tuple", "namespace is required"))?;
    let object = query
        .object
        .ok_or_else(|| api_bad_request("invalid_tuple", "object is required"))?;
    let relation = query
        .relation
        .ok_or_else(|| api_bad_request("invalid_tuple", "relation is required"))?;
    let tuple = RelationTuple {
        namespace,
        object,
        relation,
        subject_id: query.subject_id,
        subject_set: query.subject_set,
    };
    tuple
        .validate()
        .map_err(|err| api_bad_request("invalid_tuple", &err.to_string()))?;
    Ok(tuple)
}
