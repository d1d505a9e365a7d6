use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::engine::Engine;
use crate::limits::*;
use crate::sweeper;

/// Per-tenant engines, keyed by the pgwire database name. Each tenant gets
/// its own Engine, WAL file, sweeper and compactor.
pub struct TenantManager {
    engines: DashMap<String, Arc<Engine>>,
    data_dir: PathBuf,
    compact_threshold: u64,
    sweep_interval: Duration,
}

/// Keep only characters that are safe in a file name.
fn sanitize(tenant: &str) -> io::Result<String> {
    if tenant.len() > MAX_TENANT_NAME_LEN {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "tenant name too long"));
    }
    let safe: String = tenant
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if safe.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty tenant name"));
    }
    Ok(safe)
}

impl TenantManager {
    pub fn new(data_dir: PathBuf, compact_threshold: u64, sweep_interval: Duration) -> Self {
        Self {
            engines: DashMap::new(),
            data_dir,
            compact_threshold,
            sweep_interval,
        }
    }

    /// The engine for a tenant that is loaded or has a WAL on disk. Never
    /// creates a new tenant.
    pub fn get_existing(&self, tenant: &str) -> io::Result<Option<Arc<Engine>>> {
        let name = sanitize(tenant)?;
        if let Some(engine) = self.engines.get(&name) {
            return Ok(Some(engine.value().clone()));
        }
        if !self.data_dir.join(format!("{name}.wal")).exists() {
            return Ok(None);
        }
        self.get_or_create(&name).map(Some)
    }

    /// Get or lazily create the engine for `tenant`. Names that sanitize to
    /// the same file share one engine.
    pub fn get_or_create(&self, tenant: &str) -> io::Result<Arc<Engine>> {
        let name = sanitize(tenant)?;
        if let Some(engine) = self.engines.get(&name) {
            return Ok(engine.value().clone());
        }
        if self.engines.len() >= MAX_TENANTS {
            return Err(io::Error::other("too many tenants"));
        }

        let engine = match self.engines.entry(name) {
            Entry::Occupied(e) => return Ok(e.get().clone()),
            Entry::Vacant(slot) => {
                let wal_path = self.data_dir.join(format!("{}.wal", slot.key()));
                let engine = Arc::new(Engine::new(wal_path)?);
                tokio::spawn(sweeper::run_sweeper(engine.clone(), self.sweep_interval));
                tokio::spawn(sweeper::run_compactor(engine.clone(), self.compact_threshold));
                tracing::info!("tenant {} loaded", slot.key());
                slot.insert(engine.clone());
                engine
            }
        };
        // Shard guard is released; len() locks every shard.
        metrics::gauge!(crate::observability::TENANTS_ACTIVE).set(self.engines.len() as f64);
        Ok(engine)
    }
}
