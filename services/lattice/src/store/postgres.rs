//! Postgres-backed implementation of the tuple store.
//!
//! # Data model
//! One authoritative table, `relation_tuples`, holds a row per fact. The
//! identity columns `(namespace, object, relation, subject_kind,
//! subject_namespace, subject_object, subject_relation)` carry a UNIQUE
//! constraint, which both makes insertion idempotent (`ON CONFLICT DO
//! NOTHING`) and provides the index backing keyset pagination.
//!
//! # Ordering
//! List queries order by the identity columns. The text columns are
//! created with `COLLATE "C"` so Postgres compares bytes exactly like the
//! in-memory `BTreeMap` compares Rust strings; a cursor minted against one
//! backend describes the same position in the other.
//!
//! # Consistency / atomicity
//! `transact_relation_tuples` applies its inserts and deletes in a single
//! database transaction. Individual calls use one pooled connection per
//! statement batch and release it before returning; paginated readers hold
//! no connection between pages.
//!
//! # Operational notes
//! - Migrations are embedded (`sqlx::migrate!`) and run before the first
//!   request is served.
//! - Pool acquire timeouts are deliberate: a saturated or unreachable
//!   database must fail fast as *store-unavailable*, not hang the request.
use super::{cursor, RelationTupleStore, StoreError, StoreResult, TuplePage};
use crate::config::PostgresConfig;
use crate::model::{ObjectId, RelationQuery, RelationTuple, SortKey, Subject, SubjectSet};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

const SUBJECT_KIND_ID: i16 = 0;
const SUBJECT_KIND_SET: i16 = 1;

pub struct PostgresStore {
    pool: PgPool,
}

/// Row shape of the `relation_tuples` table. Kept separate from the
/// domain type so schema details (flattened subject columns, smallint
/// discriminant) stay localized here.
#[derive(Debug, Clone, FromRow)]
struct DbRelationTuple {
    namespace: String,
    object: Uuid,
    object_name: String,
    relation: String,
    subject_kind: i16,
    subject_namespace: String,
    subject_object: Uuid,
    subject_object_name: String,
    subject_relation: String,
}

impl DbRelationTuple {
    fn into_model(self) -> StoreResult<RelationTuple> {
        let subject = match self.subject_kind {
            SUBJECT_KIND_ID => Subject::Id(ObjectId {
                uid: self.subject_object,
                name: self.subject_object_name,
            }),
            SUBJECT_KIND_SET => Subject::Set(SubjectSet {
                namespace: self.subject_namespace,
                object: ObjectId {
                    uid: self.subject_object,
                    name: self.subject_object_name,
                },
                relation: self.subject_relation,
            }),
            other => {
                return Err(StoreError::Unexpected(anyhow::anyhow!(
                    "unknown subject kind {other} in relation_tuples"
                )))
            }
        };
        Ok(RelationTuple {
            namespace: self.namespace,
            object: ObjectId {
                uid: self.object,
                name: self.object_name,
            },
            relation: self.relation,
            subject,
        })
    }
}

/// Subject columns as bound in SQL: `(kind, namespace, object uuid,
/// object name, relation)`. A subject id leaves the set columns at their
/// empty-string defaults so the uniqueness constraint has no NULLs.
fn subject_columns(subject: &Subject) -> (i16, &str, Uuid, &str, &str) {
    match subject {
        Subject::Id(id) => (SUBJECT_KIND_ID, "", id.uid, id.name.as_str(), ""),
        Subject::Set(set) => (
            SUBJECT_KIND_SET,
            set.namespace.as_str(),
            set.object.uid,
            set.object.name.as_str(),
            set.relation.as_str(),
        ),
    }
}

/// Query pattern decomposed into optional binds for the shared
/// `($n IS NULL OR column = $n)` filter clause.
struct QueryBinds {
    namespace: Option<String>,
    object: Option<Uuid>,
    relation: Option<String>,
    subject_kind: Option<i16>,
    subject_namespace: Option<String>,
    subject_object: Option<Uuid>,
    subject_relation: Option<String>,
}

impl QueryBinds {
    fn from_query(query: &RelationQuery) -> Self {
        let (subject_kind, subject_namespace, subject_object, subject_relation) =
            match &query.subject {
                None => (None, None, None, None),
                Some(Subject::Id(id)) => (
                    Some(SUBJECT_KIND_ID),
                    Some(String::new()),
                    Some(id.uid),
                    Some(String::new()),
                ),
                Some(Subject::Set(set)) => (
                    Some(SUBJECT_KIND_SET),
                    Some(set.namespace.clone()),
                    Some(set.object.uid),
                    Some(set.relation.clone()),
                ),
            };
        Self {
            namespace: query.namespace.clone(),
            object: query.object,
            relation: query.relation.clone(),
            subject_kind,
            subject_namespace,
            subject_object,
            subject_relation,
        }
    }
}

const FILTER_CLAUSE: &str = "($1::text IS NULL OR namespace = $1) \
     AND ($2::uuid IS NULL OR object = $2) \
     AND ($3::text IS NULL OR relation = $3) \
     AND ($4::smallint IS NULL OR subject_kind = $4) \
     AND ($5::text IS NULL OR subject_namespace = $5) \
     AND ($6::uuid IS NULL OR subject_object = $6) \
     AND ($7::text IS NULL OR subject_relation = $7)";

fn store_err(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(err.into())
        }
        other => StoreError::Unexpected(other.into()),
    }
}

impl PostgresStore {
    /// Connect, run embedded migrations, and hand back a pooled store.
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        let connect_options = PgConnectOptions::from_str(&pg.url)
            .map_err(|err| StoreError::Unexpected(err.into()))?;
        let pool = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options)
            .await
            .map_err(store_err)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|err| StoreError::Unexpected(err.into()))?;

        Ok(Self { pool })
    }

    async fn insert_tuples(
        tx: &mut Transaction<'_, Postgres>,
        tuples: &[RelationTuple],
    ) -> StoreResult<()> {
        for tuple in tuples {
            let (kind, set_namespace, subject_object, subject_name, set_relation) =
                subject_columns(&tuple.subject);
            sqlx::query(
                "INSERT INTO relation_tuples \
                     (namespace, object, object_name, relation, subject_kind, \
                      subject_namespace, subject_object, subject_object_name, subject_relation) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
                 ON CONFLICT ON CONSTRAINT relation_tuples_identity DO NOTHING",
            )
            .bind(&tuple.namespace)
            .bind(tuple.object.uid)
            .bind(&tuple.object.name)
            .bind(&tuple.relation)
            .bind(kind)
            .bind(set_namespace)
            .bind(subject_object)
            .bind(subject_name)
            .bind(set_relation)
            .execute(&mut **tx)
            .await
            .map_err(store_err)?;
        }
        Ok(())
    }

    async fn delete_tuples(
        tx: &mut Transaction<'_, Postgres>,
        tuples: &[RelationTuple],
    ) -> StoreResult<()> {
        for tuple in tuples {
            let (kind, set_namespace, subject_object, _, set_relation) =
                subject_columns(&tuple.subject);
            sqlx::query(
                "DELETE FROM relation_tuples \
                 WHERE namespace = $1 AND object = $2 AND relation = $3 \
                   AND subject_kind = $4 AND subject_namespace = $5 \
                   AND subject_object = $6 AND subject_relation = $7",
            )
            .bind(&tuple.namespace)
            .bind(tuple.object.uid)
            .bind(&tuple.relation)
            .bind(kind)
            .bind(set_namespace)
            .bind(subject_object)
            .bind(set_relation)
            .execute(&mut **tx)
            .await
            .map_err(store_err)?;
        }
        Ok(())
    }
}

#[async_trait]
impl RelationTupleStore for PostgresStore {
    async fn write_relation_tuples(&self, tuples: &[RelationTuple]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        Self::insert_tuples(&mut tx, tuples).await?;
        tx.commit().await.map_err(store_err)
    }

    async fn delete_relation_tuples(&self, tuples: &[RelationTuple]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        Self::delete_tuples(&mut tx, tuples).await?;
        tx.commit().await.map_err(store_err)
    }

    async fn delete_all_relation_tuples(&self, query: &RelationQuery) -> StoreResult<()> {
        if query.is_empty() {
            return Err(StoreError::InvalidQuery(
                "at least one field must be specified".to_string(),
            ));
        }
        let binds = QueryBinds::from_query(query);
        sqlx::query(&format!("DELETE FROM relation_tuples WHERE {FILTER_CLAUSE}"))
            .bind(binds.namespace)
            .bind(binds.object)
            .bind(binds.relation)
            .bind(binds.subject_kind)
            .bind(binds.subject_namespace)
            .bind(binds.subject_object)
            .bind(binds.subject_relation)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn transact_relation_tuples(
        &self,
        inserts: &[RelationTuple],
        deletes: &[RelationTuple],
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        Self::insert_tuples(&mut tx, inserts).await?;
        Self::delete_tuples(&mut tx, deletes).await?;
        tx.commit().await.map_err(store_err)
    }

    async fn get_relation_tuples(
        &self,
        query: &RelationQuery,
        page_token: &str,
        page_size: usize,
    ) -> StoreResult<TuplePage> {
        let after: Option<SortKey> = if page_token.is_empty() {
            None
        } else {
            Some(cursor::decode(page_token)?)
        };
        let page_size = page_size.max(1);
        let binds = QueryBinds::from_query(query);

        // Keyset pagination: resume strictly after the cursor position via
        // a row-value comparison over the identity columns, which is
        // served by the UNIQUE constraint's index.
        let sql = format!(
            "SELECT namespace, object, object_name, relation, subject_kind, \
                    subject_namespace, subject_object, subject_object_name, subject_relation \
             FROM relation_tuples \
             WHERE {FILTER_CLAUSE} \
               AND ($8::text IS NULL OR \
                    (namespace, object, relation, subject_kind, \
                     subject_namespace, subject_object, subject_relation) \
                    > ($8::text, $9::uuid, $10::text, $11::smallint, $12::text, $13::uuid, $14::text)) \
             ORDER BY namespace, object, relation, subject_kind, \
                      subject_namespace, subject_object, subject_relation \
             LIMIT $15"
        );
        let rows = sqlx::query_as::<_, DbRelationTuple>(&sql)
            .bind(binds.namespace)
            .bind(binds.object)
            .bind(binds.relation)
            .bind(binds.subject_kind)
            .bind(binds.subject_namespace)
            .bind(binds.subject_object)
            .bind(binds.subject_relation)
            .bind(after.as_ref().map(|k| k.namespace.clone()))
            .bind(after.as_ref().map(|k| k.object))
            .bind(after.as_ref().map(|k| k.relation.clone()))
            .bind(after.as_ref().map(|k| k.subject_kind as i16))
            .bind(after.as_ref().map(|k| k.subject_namespace.clone()))
            .bind(after.as_ref().map(|k| k.subject_object))
            .bind(after.as_ref().map(|k| k.subject_relation.clone()))
            .bind((page_size + 1) as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        let more = rows.len() > page_size;
        let mut tuples = Vec::with_capacity(rows.len().min(page_size));
        for row in rows.into_iter().take(page_size) {
            tuples.push(row.into_model()?);
        }
        let next_page_token = match (more, tuples.last()) {
            (true, Some(last)) => cursor::encode(&last.sort_key()),
            _ => String::new(),
        };
        Ok(TuplePage {
            tuples,
            next_page_token,
        })
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
