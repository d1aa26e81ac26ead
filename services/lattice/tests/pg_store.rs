//! Store-contract tests against a real Postgres.
//!
//! Enabled with `--features pg-tests` and a `LATTICE_TEST_POSTGRES_URL`
//! pointing at a database this test may write to. Without the URL the
//! tests skip, so the feature can be part of an `--all-features` run.
#![cfg(feature = "pg-tests")]

use lattice::config::PostgresConfig;
use lattice::mapper::UuidMapper;
use lattice::model::{RelationQuery, RelationTuple, Subject};
use lattice::store::postgres::PostgresStore;
use lattice::store::{RelationTupleStore, StoreError};

fn test_url() -> Option<String> {
    std::env::var("LATTICE_TEST_POSTGRES_URL").ok()
}

async fn connect() -> Option<PostgresStore> {
    let url = test_url()?;
    let store = PostgresStore::connect(&PostgresConfig {
        url,
        max_connections: 4,
        acquire_timeout_ms: 5_000,
    })
    .await
    .expect("connect test postgres");
    Some(store)
}

fn tuple(namespace: &str, object: &str, relation: &str, subject: &str) -> RelationTuple {
    RelationTuple {
        namespace: namespace.to_string(),
        object: UuidMapper::object_id(object),
        relation: relation.to_string(),
        subject: Subject::Id(UuidMapper::object_id(subject)),
    }
}

#[tokio::test]
async fn insert_list_delete_round_trip() {
    let Some(store) = connect().await else {
        eprintln!("LATTICE_TEST_POSTGRES_URL not set; skipping");
        return;
    };
    // A namespace unique to this test keeps runs independent.
    let namespace = format!("pgtest-{}", std::process::id());
    let query = RelationQuery {
        namespace: Some(namespace.clone()),
        ..Default::default()
    };

    let t = tuple(&namespace, "readme", "view", "alice");
    store.write_relation_tuples(&[t.clone()]).await.expect("write");
    store.write_relation_tuples(&[t.clone()]).await.expect("idempotent write");

    let page = store.get_relation_tuples(&query, "", 10).await.expect("get");
    assert_eq!(page.tuples, vec![t.clone()]);
    assert!(page.next_page_token.is_empty());

    store.delete_relation_tuples(&[t]).await.expect("delete");
    let page = store.get_relation_tuples(&query, "", 10).await.expect("get");
    assert!(page.tuples.is_empty());
}

#[tokio::test]
async fn transact_and_paginate() {
    let Some(store) = connect().await else {
        eprintln!("LATTICE_TEST_POSTGRES_URL not set; skipping");
        return;
    };
    let namespace = format!("pgtest-page-{}", std::process::id());
    let query = RelationQuery {
        namespace: Some(namespace.clone()),
        ..Default::default()
    };

    let tuples: Vec<RelationTuple> = (0..7)
        .map(|i| tuple(&namespace, "readme", "view", &format!("user-{i}")))
        .collect();
    store
        .transact_relation_tuples(&tuples, &[])
        .await
        .expect("transact");

    let mut seen = Vec::new();
    let mut token = String::new();
    loop {
        let page = store
            .get_relation_tuples(&query, &token, 3)
            .await
            .expect("page");
        assert!(page.tuples.len() <= 3);
        seen.extend(page.tuples);
        if page.next_page_token.is_empty() {
            break;
        }
        token = page.next_page_token;
    }
    assert_eq!(seen.len(), tuples.len());
    let mut expected = tuples;
    expected.sort_by_key(|t| t.sort_key());
    assert_eq!(seen, expected);

    let err = store
        .delete_all_relation_tuples(&RelationQuery::default())
        .await
        .expect_err("empty pattern");
    assert!(matches!(err, StoreError::InvalidQuery(_)));
    store
        .delete_all_relation_tuples(&query)
        .await
        .expect("cleanup");
}
