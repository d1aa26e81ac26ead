// Lattice (HTTP)
// --------------
// This binary is the relationship-based authorization service. It exposes
// a JSON/HTTP API (axum) for managing relation tuples and answering
// membership checks over them.
//
// Storage model:
// - Pluggable `RelationTupleStore`: in-memory (default) or Postgres when
//   LATTICE_POSTGRES_URL / DATABASE_URL / storage.backend=postgres is set.
// - Postgres keeps one authoritative table with a uniqueness constraint
//   over the tuple identity; migrations run at startup.
// - The memory store preserves dev/test behavior and resets on restart.
//
// Request flow:
// - Writes go through the facade: validate → map external strings to
//   stable identifiers → transactional store apply.
// - Checks walk the tuple graph with a per-request depth budget capped by
//   the configured `max_read_depth`, a visited set for cycle safety, and
//   concurrent fan-out of sub-checks.
use anyhow::Context;
use lattice::app::{AppState, build_router};
use lattice::config::{LatticeConfig, StorageBackend};
use lattice::observability;
use lattice::registry::NamespaceRegistry;
use lattice::store::memory::InMemoryStore;
use lattice::store::postgres::PostgresStore;
use lattice::store::RelationTupleStore;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let metrics_handle = observability::init_observability();

    let config = LatticeConfig::from_env_or_yaml().context("lattice config")?;
    let store: Arc<dyn RelationTupleStore> = match config.storage {
        StorageBackend::Memory => Arc::new(InMemoryStore::new()),
        StorageBackend::Postgres => {
            let pg = config
                .postgres
                .as_ref()
                .context("postgres configuration missing")?;
            Arc::new(
                PostgresStore::connect(pg)
                    .await
                    .context("connect tuple store")?,
            )
        }
    };

    let registry = Arc::new(NamespaceRegistry::from_config(&config));
    tracing::info!(
        backend = store.backend_name(),
        durable = store.is_durable(),
        namespaces = registry.namespaces().len(),
        max_read_depth = registry.max_read_depth(),
        "relation tuple store ready"
    );

    let state = AppState::new(registry, store);

    tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state);
    let addr = config.bind_addr;
    tracing::info!(%addr, "lattice listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
