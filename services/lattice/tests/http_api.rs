use axum::body::Body;
use axum::http::{Request, StatusCode};
use lattice::app::{AppState, build_router};
use lattice::registry::NamespaceRegistry;
use lattice::store::memory::InMemoryStore;
use std::sync::Arc;
use tower::ServiceExt;

fn test_state() -> AppState {
    let registry = Arc::new(NamespaceRegistry::new(
        ["files".to_string(), "groups".to_string()],
        5,
        100,
        1000,
    ));
    AppState::new(registry, Arc::new(InMemoryStore::new()))
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[tokio::test]
async fn write_read_check_flow() {
    let app = build_router(test_state());

    // user -> member of groups:eng -> viewers of files:readme
    for tuple in [
        serde_json::json!({
            "namespace": "files",
            "object": "readme",
            "relation": "view",
            "subject_set": {"namespace": "groups", "object": "eng", "relation": "member"}
        }),
        serde_json::json!({
            "namespace": "groups",
            "object": "eng",
            "relation": "member",
            "subject_id": "alice"
        }),
    ] {
        let response = app
            .clone()
            .oneshot(json_request("PUT", "/admin/relation-tuples", tuple))
            .await
            .expect("create");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(get_request("/relation-tuples?namespace=files"))
        .await
        .expect("list");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert_eq!(payload["relation_tuples"].as_array().unwrap().len(), 1);
    assert_eq!(payload["next_page_token"], "");

    // Direct membership.
    let response = app
        .clone()
        .oneshot(get_request(
            "/check?namespace=groups&object=eng&relation=member&subject_id=alice",
        ))
        .await
        .expect("check");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["allowed"], true);

    // Indirect membership through the subject set.
    let response = app
        .clone()
        .oneshot(get_request(
            "/check?namespace=files&object=readme&relation=view&subject_id=alice",
        ))
        .await
        .expect("check");
    assert_eq!(read_json(response).await["allowed"], true);

    // A depth of one is not enough for the indirect path.
    let response = app
        .clone()
        .oneshot(get_request(
            "/check?namespace=files&object=readme&relation=view&subject_id=alice&max-depth=1",
        ))
        .await
        .expect("check");
    assert_eq!(read_json(response).await["allowed"], false);

    let response = app
        .clone()
        .oneshot(get_request(
            "/check?namespace=files&object=readme&relation=view&subject_id=mallory",
        ))
        .await
        .expect("check");
    assert_eq!(read_json(response).await["allowed"], false);
}

#[tokio::test]
async fn patch_applies_and_deletes() {
    let app = build_router(test_state());

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/admin/relation-tuples",
            serde_json::json!({
                "namespace": "files",
                "object": "readme",
                "relation": "view",
                "subject_id": "old"
            }),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/admin/relation-tuples",
            serde_json::json!([
                {"action": "insert", "relation_tuple": {
                    "namespace": "files", "object": "readme", "relation": "view", "subject_id": "new"
                }},
                {"action": "delete", "relation_tuple": {
                    "namespace": "files", "object": "readme", "relation": "view", "subject_id": "old"
                }}
            ]),
        ))
        .await
        .expect("patch");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(get_request("/relation-tuples?namespace=files"))
        .await
        .expect("list");
    let payload = read_json(response).await;
    let tuples = payload["relation_tuples"].as_array().unwrap();
    assert_eq!(tuples.len(), 1);
    assert_eq!(tuples[0]["subject_id"], "new");
}

#[tokio::test]
async fn bulk_delete_by_pattern() {
    let app = build_router(test_state());

    for subject in ["alice", "bob"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/admin/relation-tuples",
                serde_json::json!({
                    "namespace": "files",
                    "object": "readme",
                    "relation": "view",
                    "subject_id": subject
                }),
            ))
            .await
            .expect("create");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/admin/relation-tuples?namespace=files&relation=view")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("delete");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(get_request("/relation-tuples?namespace=files"))
        .await
        .expect("list");
    let payload = read_json(response).await;
    assert!(payload["relation_tuples"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn pagination_walks_all_tuples() {
    let app = build_router(test_state());

    for i in 0..7 {
        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/admin/relation-tuples",
                serde_json::json!({
                    "namespace": "files",
                    "object": "readme",
                    "relation": "view",
                    "subject_id": format!("user-{i}")
                }),
            ))
            .await
            .expect("create");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let mut seen = Vec::new();
    let mut token = String::new();
    loop {
        let uri = if token.is_empty() {
            "/relation-tuples?namespace=files&page_size=3".to_string()
        } else {
            format!("/relation-tuples?namespace=files&page_size=3&page_token={token}")
        };
        let response = app.clone().oneshot(get_request(&uri)).await.expect("page");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json(response).await;
        for tuple in payload["relation_tuples"].as_array().unwrap() {
            seen.push(tuple["subject_id"].as_str().unwrap().to_string());
        }
        token = payload["next_page_token"].as_str().unwrap().to_string();
        if token.is_empty() {
            break;
        }
    }
    seen.sort();
    let expected: Vec<String> = (0..7).map(|i| format!("user-{i}")).collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn error_status_mapping() {
    let app = build_router(test_state());

    // Both subject variants set: invalid tuple.
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/admin/relation-tuples",
            serde_json::json!({
                "namespace": "files",
                "object": "readme",
                "relation": "view",
                "subject_id": "alice",
                "subject_set": {"namespace": "groups", "object": "eng", "relation": "member"}
            }),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["code"], "invalid_tuple");

    // Undeclared namespace.
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/admin/relation-tuples",
            serde_json::json!({
                "namespace": "videos",
                "object": "cat.mp4",
                "relation": "view",
                "subject_id": "alice"
            }),
        ))
        .await
        .expect("create");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["code"], "namespace_unknown");

    // Unknown patch action.
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/admin/relation-tuples",
            serde_json::json!([
                {"action": "upsert", "relation_tuple": {
                    "namespace": "files", "object": "readme", "relation": "view", "subject_id": "alice"
                }}
            ]),
        ))
        .await
        .expect("patch");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["code"], "invalid_action");

    // Fully empty bulk-delete pattern.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/admin/relation-tuples")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("delete");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["code"], "invalid_query");

    // Undecodable pagination cursor.
    let response = app
        .clone()
        .oneshot(get_request(
            "/relation-tuples?namespace=files&page_token=garbage",
        ))
        .await
        .expect("list");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["code"], "invalid_cursor");

    // Check without a subject.
    let response = app
        .clone()
        .oneshot(get_request(
            "/check?namespace=files&object=readme&relation=view",
        ))
        .await
        .expect("check");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["code"], "invalid_tuple");

    // Non-numeric max-depth.
    let response = app
        .clone()
        .oneshot(get_request(
            "/check?namespace=files&object=readme&relation=view&subject_id=alice&max-depth=soon",
        ))
        .await
        .expect("check");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["code"], "invalid_query");
}

#[tokio::test]
async fn health_and_version() {
    let app = build_router(test_state());

    let response = app
        .clone()
        .oneshot(get_request("/health/alive"))
        .await
        .expect("alive");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["status"], "ok");

    let response = app
        .clone()
        .oneshot(get_request("/health/ready"))
        .await
        .expect("ready");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request("/version"))
        .await
        .expect("version");
    let payload = read_json(response).await;
    assert_eq!(payload["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn check_respects_runtime_depth_limit() {
    let state = test_state();
    let registry = state.registry.clone();
    let app = build_router(state);

    for tuple in [
        serde_json::json!({
            "namespace": "files", "object": "o", "relation": "admin", "subject_id": "user"
        }),
        serde_json::json!({
            "namespace": "files", "object": "o", "relation": "owner",
            "subject_set": {"namespace": "files", "object": "o", "relation": "admin"}
        }),
        serde_json::json!({
            "namespace": "files", "object": "o", "relation": "access",
            "subject_set": {"namespace": "files", "object": "o", "relation": "owner"}
        }),
    ] {
        let response = app
            .clone()
            .oneshot(json_request("PUT", "/admin/relation-tuples", tuple))
            .await
            .expect("create");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let check_uri = "/check?namespace=files&object=o&relation=access&subject_id=user&max-depth=3";
    let response = app.clone().oneshot(get_request(check_uri)).await.expect("check");
    assert_eq!(read_json(response).await["allowed"], true);

    // Lowering the global limit caps the request depth immediately.
    registry.set_max_read_depth(2);
    let response = app.clone().oneshot(get_request(check_uri)).await.expect("check");
    assert_eq!(read_json(response).await["allowed"], false);
}
