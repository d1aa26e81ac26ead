use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;

pub const DEFAULT_MAX_READ_DEPTH: u32 = 5;
pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_MAX_PAGE_SIZE: usize = 1000;

const DEFAULT_PG_MAX_CONNECTIONS: u32 = 16;
const DEFAULT_PG_ACQUIRE_TIMEOUT_MS: u64 = 5_000;

// Service configuration sourced from environment variables, with an
// optional YAML override file (LATTICE_CONFIG).
#[derive(Debug, Clone)]
pub struct LatticeConfig {
    // HTTP bind address for the API.
    pub bind_addr: SocketAddr,
    // Metrics HTTP bind address.
    pub metrics_bind: SocketAddr,
    // Declared namespaces; tuples naming anything else are rejected.
    pub namespaces: Vec<String>,
    // Global ceiling on check-engine expansion depth.
    pub max_read_depth: u32,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    pub url: String,
    #[serde(default = "default_pg_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_pg_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

fn default_pg_max_connections() -> u32 {
    DEFAULT_PG_MAX_CONNECTIONS
}

fn default_pg_acquire_timeout_ms() -> u64 {
    DEFAULT_PG_ACQUIRE_TIMEOUT_MS
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    namespaces: Option<Vec<String>>,
    limits: Option<LimitsOverride>,
    pagination: Option<PaginationOverride>,
    storage: Option<StorageOverride>,
}

#[derive(Debug, Default, Deserialize)]
struct LimitsOverride {
    max_read_depth: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct PaginationOverride {
    default_page_size: Option<usize>,
    max_page_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct StorageOverride {
    backend: Option<StorageBackend>,
    postgres: Option<PostgresConfig>,
}

impl LatticeConfig {
    pub fn from_env() -> Result<Self> {
        // Environment variables provide defaults for local development.
        let bind_addr = std::env::var("LATTICE_BIND")
            .unwrap_or_else(|_| "0.0.0.0:4466".to_string())
            .parse()
            .with_context(|| "parse LATTICE_BIND")?;
        let metrics_bind = std::env::var("LATTICE_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse LATTICE_METRICS_BIND")?;
        let namespaces = std::env::var("LATTICE_NAMESPACES")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|ns| !ns.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let max_read_depth = match std::env::var("LATTICE_MAX_READ_DEPTH") {
            Ok(value) => value.parse().with_context(|| "parse LATTICE_MAX_READ_DEPTH")?,
            Err(_) => DEFAULT_MAX_READ_DEPTH,
        };

        // A DSN in the environment selects the Postgres backend.
        let postgres_url = std::env::var("LATTICE_POSTGRES_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .ok();
        let (storage, postgres) = match postgres_url {
            Some(url) => (
                StorageBackend::Postgres,
                Some(PostgresConfig {
                    url,
                    max_connections: DEFAULT_PG_MAX_CONNECTIONS,
                    acquire_timeout_ms: DEFAULT_PG_ACQUIRE_TIMEOUT_MS,
                }),
            ),
            None => (StorageBackend::Memory, None),
        };

        let config = Self {
            bind_addr,
            metrics_bind,
            namespaces,
            max_read_depth,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            storage,
            postgres,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("LATTICE_CONFIG") {
            // YAML overrides allow ops-friendly config files.
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read LATTICE_CONFIG: {path}"))?;
            let override_cfg: ConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse lattice config yaml")?;
            if let Some(value) = override_cfg.bind_addr {
                config.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
            }
            if let Some(value) = override_cfg.metrics_bind {
                config.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
            }
            if let Some(value) = override_cfg.namespaces {
                config.namespaces = value;
            }
            if let Some(limits) = override_cfg.limits {
                if let Some(value) = limits.max_read_depth {
                    config.max_read_depth = value;
                }
            }
            if let Some(pagination) = override_cfg.pagination {
                if let Some(value) = pagination.default_page_size {
                    config.default_page_size = value;
                }
                if let Some(value) = pagination.max_page_size {
                    config.max_page_size = value;
                }
            }
            if let Some(storage) = override_cfg.storage {
                if let Some(backend) = storage.backend {
                    config.storage = backend;
                }
                if let Some(postgres) = storage.postgres {
                    config.postgres = Some(postgres);
                }
            }
            config.validate()?;
        }
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_read_depth == 0 {
            bail!("limits.max_read_depth must be positive");
        }
        if self.default_page_size == 0 {
            bail!("pagination.default_page_size must be positive");
        }
        if self.default_page_size > self.max_page_size {
            bail!("pagination.default_page_size must not exceed max_page_size");
        }
        if self.storage == StorageBackend::Postgres && self.postgres.is_none() {
            bail!("storage.backend is postgres but no DSN is configured");
        }
        Ok(())
    }
}
