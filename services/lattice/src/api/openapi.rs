//! OpenAPI document assembled from the handler annotations.
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "lattice",
        version = "v1",
        description = "Relationship-based authorization service HTTP API"
    ),
    paths(
        crate::api::system::health_alive,
        crate::api::system::health_ready,
        crate::api::system::version,
        crate::api::relation_tuples::create_relation_tuple,
        crate::api::relation_tuples::patch_relation_tuples,
        crate::api::relation_tuples::delete_relation_tuples,
        crate::api::relation_tuples::list_relation_tuples,
        crate::api::check::check
    ),
    components(schemas(
        crate::api::types::ErrorResponse,
        crate::api::types::ListRelationTuplesResponse,
        crate::api::types::CheckResponse,
        crate::api::types::HealthStatus,
        crate::api::types::VersionResponse,
        lattice_api::RelationTuple,
        lattice_api::SubjectSet,
        lattice_api::RelationQuery,
        lattice_api::PatchDelta
    )),
    tags(
        (name = "system", description = "Health and version endpoints"),
        (name = "relation-tuples", description = "Relation tuple management"),
        (name = "check", description = "Membership checks")
    )
)]
pub struct ApiDoc;
