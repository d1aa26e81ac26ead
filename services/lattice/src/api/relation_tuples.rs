//! Relation-tuple read and write handlers.
//!
//! # Purpose
//! Implements the create/patch/bulk-delete admin endpoints and the
//! paginated listing endpoint. Validation and identifier mapping live in
//! the facade; handlers only translate between HTTP and facade calls.
use crate::api::error::{ApiError, api_bad_request, relation_error};
use crate::api::query_from_params;
use crate::api::types::ListRelationTuplesResponse;
use crate::app::AppState;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use lattice_api::{PatchDelta, RelationTuple};
use std::collections::HashMap;

#[utoipa::path(
    put,
    path = "/admin/relation-tuples",
    tag = "relation-tuples",
    request_body = RelationTuple,
    responses(
        (status = 201, description = "Relation tuple created", body = RelationTuple),
        (status = 400, description = "Invalid tuple or unknown namespace", body = crate::api::types::ErrorResponse),
        (status = 500, description = "Store failure", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_relation_tuple(
    State(state): State<AppState>,
    Json(body): Json<RelationTuple>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state
        .relations
        .create(&body)
        .await
        .map_err(|err| relation_error("failed to create relation tuple", err))?;
    tracing::debug!(tuple = %created, "created relation tuple");
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    patch,
    path = "/admin/relation-tuples",
    tag = "relation-tuples",
    request_body = Vec<PatchDelta>,
    responses(
        (status = 204, description = "Deltas applied atomically"),
        (status = 400, description = "Invalid tuple or unknown action", body = crate::api::types::ErrorResponse),
        (status = 500, description = "Store failure", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn patch_relation_tuples(
    State(state): State<AppState>,
    Json(deltas): Json<Vec<PatchDelta>>,
) -> Result<StatusCode, ApiError> {
    state
        .relations
        .patch(&deltas)
        .await
        .map_err(|err| relation_error("failed to patch relation tuples", err))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/admin/relation-tuples",
    tag = "relation-tuples",
    params(
        ("namespace" = Option<String>, Query, description = "Namespace filter"),
        ("object" = Option<String>, Query, description = "Object filter"),
        ("relation" = Option<String>, Query, description = "Relation filter"),
        ("subject_id" = Option<String>, Query, description = "Subject id filter"),
        ("subject_set.namespace" = Option<String>, Query, description = "Subject set namespace filter"),
        ("subject_set.object" = Option<String>, Query, description = "Subject set object filter"),
        ("subject_set.relation" = Option<String>, Query, description = "Subject set relation filter")
    ),
    responses(
        (status = 204, description = "Matching relation tuples deleted"),
        (status = 400, description = "Empty or malformed pattern", body = crate::api::types::ErrorResponse),
        (status = 500, description = "Store failure", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_relation_tuples(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let query = query_from_params(&params)?;
    tracing::debug!(?query, "deleting relation tuples by pattern");
    state
        .relations
        .delete_by_query(&query)
        .await
        .map_err(|err| relation_error("failed to delete relation tuples", err))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/relation-tuples",
    tag = "relation-tuples",
    params(
        ("namespace" = Option<String>, Query, description = "Namespace filter"),
        ("object" = Option<String>, Query, description = "Object filter"),
        ("relation" = Option<String>, Query, description = "Relation filter"),
        ("subject_id" = Option<String>, Query, description = "Subject id filter"),
        ("subject_set.namespace" = Option<String>, Query, description = "Subject set namespace filter"),
        ("subject_set.object" = Option<String>, Query, description = "Subject set object filter"),
        ("subject_set.relation" = Option<String>, Query, description = "Subject set relation filter"),
        ("page_token" = Option<String>, Query, description = "Opaque pagination cursor"),
        ("page_size" = Option<usize>, Query, description = "Maximum tuples per page")
    ),
    responses(
        (status = 200, description = "One page of matching relation tuples", body = ListRelationTuplesResponse),
        (status = 400, description = "Malformed pattern or cursor", body = crate::api::types::ErrorResponse),
        (status = 500, description = "Store failure", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_relation_tuples(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Json<ListRelationTuplesResponse>, ApiError> {
    let query = query_from_params(&params)?;
    let page_token = params.get("page_token").cloned().unwrap_or_default();
    let page_size = match params.get("page_size") {
        None => None,
        Some(raw) => Some(raw.parse::<usize>().map_err(|_| {
            api_bad_request("invalid_query", "page_size must be a non-negative integer")
        })?),
    };
    let (relation_tuples, next_page_token) = state
        .relations
        .list(&query, &page_token, page_size)
        .await
        .map_err(|err| relation_error("failed to list relation tuples", err))?;
    Ok(Json(ListRelationTuplesResponse {
        relation_tuples,
        next_page_token,
    }))
}
