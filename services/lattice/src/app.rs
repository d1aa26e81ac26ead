//! HTTP application wiring.
//!
//! # Purpose
//! Builds the axum router, configures middleware, and defines the shared
//! application state injected into handlers. Route composition lives here
//! so `main` stays small and integration tests can drive the full router
//! in-process.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::check::CheckEngine;
use crate::mapper::UuidMapper;
use crate::registry::NamespaceRegistry;
use crate::relations::Relations;
use crate::store::RelationTupleStore;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<NamespaceRegistry>,
    pub store: Arc<dyn RelationTupleStore>,
    pub mapper: UuidMapper,
    pub relations: Arc<Relations>,
    pub engine: Arc<CheckEngine>,
}

impl AppState {
    pub fn new(registry: Arc<NamespaceRegistry>, store: Arc<dyn RelationTupleStore>) -> Self {
        Self {
            mapper: UuidMapper::new(registry.clone()),
            relations: Arc::new(Relations::new(registry.clone(), store.clone())),
            engine: Arc::new(CheckEngine::new(registry.clone(), store.clone())),
            registry,
            store,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            )
        });

    Router::new()
        .route(
            "/health/alive",
            axum::routing::get(api::system::health_alive),
        )
        .route(
            "/health/ready",
            axum::routing::get(api::system::health_ready),
        )
        .route("/version", axum::routing::get(api::system::version))
        .route(
            "/relation-tuples",
            axum::routing::get(api::relation_tuples::list_relation_tuples),
        )
        .route("/check", axum::routing::get(api::check::check))
        .route(
            "/admin/relation-tuples",
            axum::routing::put(api::relation_tuples::create_relation_tuple)
                .patch(api::relation_tuples::patch_relation_tuples)
                .delete(api::relation_tuples::delete_relation_tuples),
        )
        .merge(utoipa_swagger_ui::SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(trace_layer)
        .with_state(state)
}
