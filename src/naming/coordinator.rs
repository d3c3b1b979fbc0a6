//! The naming coordinator (§4.3): owns the directory tree, the path lock
//! table, and the storage-node registry, and implements every client-service
//! and registration operation.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};

use dashmap::{DashMap, DashSet};
use rand::seq::IteratorRandom;

use crate::locking::{LockGuard, LockMode, LockTable};
use crate::path::Path;
use crate::storage::CommandStub;
use crate::tree::{StorageId, Tree};

use super::error::NamingError;
use super::workers;

/// Number of shared-lock acquisitions on a file path after which a
/// replication task is dispatched (§4.2).
pub const DEFAULT_REPLICATION_THRESHOLD: u64 = 20;

pub struct Coordinator {
    self_ref: Weak<Coordinator>,
    tree: Tree,
    lock_table: LockTable,
    registry: DashSet<StorageId>,
    access_counters: DashMap<Path, AtomicU64>,
    held_locks: DashMap<(Path, bool), StdMutex<Vec<LockGuard>>>,
    replication_threshold: u64,
}

impl Coordinator {
    pub fn new(replication_threshold: u64) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Coordinator {
            self_ref: self_ref.clone(),
            tree: Tree::new(),
            lock_table: LockTable::new(),
            registry: DashSet::new(),
            access_counters: DashMap::new(),
            held_locks: DashMap::new(),
            replication_threshold,
        })
    }

    fn arc(&self) -> Arc<Coordinator> {
        self.self_ref.upgrade().expect("coordinator outlives its own handle")
    }

    pub(crate) fn tree(&self) -> &Tree {
        &self.tree
    }

    pub(crate) fn lock_table(&self) -> &LockTable {
        &self.lock_table
    }

    pub(crate) fn registry_snapshot(&self) -> Vec<StorageId> {
        self.registry.iter().map(|r| *r.key()).collect()
    }

    pub(crate) fn replication_threshold(&self) -> u64 {
        self.replication_threshold
    }

    pub(crate) fn reset_counter(&self, path: &Path) {
        if let Some(counter) = self.access_counters.get(path) {
            counter.store(0, Ordering::SeqCst);
        }
    }

    pub(crate) fn counter_value(&self, path: &Path) -> u64 {
        self.access_counters.get(path).map(|c| c.load(Ordering::SeqCst)).unwrap_or(0)
    }

    // ---- client service -------------------------------------------------

    #[tracing::instrument(skip(self), fields(%path, exclusive))]
    pub async fn lock(&self, path: &Path, exclusive: bool) -> Result<(), NamingError> {
        if self.tree.is_directory(path).is_none() {
            return Err(NamingError::NotFound);
        }
        let mode = if exclusive { LockMode::Exclusive } else { LockMode::Shared };
        let guard = self.lock_table.acquire(path, mode).await;
        self.trigger_on_lock(path, exclusive);
        self.held_locks
            .entry((path.clone(), exclusive))
            .or_insert_with(|| StdMutex::new(Vec::new()))
            .lock()
            .unwrap()
            .push(guard);
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(%path, exclusive))]
    pub async fn unlock(&self, path: &Path, exclusive: bool) -> Result<(), NamingError> {
        let key = (path.clone(), exclusive);
        let guard = match self.held_locks.get(&key) {
            Some(entry) => entry.lock().unwrap().pop(),
            None => None,
        };
        match guard {
            Some(guard) => {
                guard.release();
                Ok(())
            }
            None => Err(NamingError::InvalidArgument(format!(
                "no held {} lock on {path}",
                if exclusive { "exclusive" } else { "shared" }
            ))),
        }
    }

    /// Dispatches the replication/invalidation hook for a lock just taken on
    /// a file path (§4.2 "Replication hook"). A no-op for directories.
    fn trigger_on_lock(&self, path: &Path, exclusive: bool) {
        if self.tree.replicas(path).is_none() {
            return;
        }
        if exclusive {
            let coordinator = self.arc();
            let path = path.clone();
            tokio::spawn(async move { workers::invalidate(coordinator, path).await });
        } else {
            let count = {
                let counter = self
                    .access_counters
                    .entry(path.clone())
                    .or_insert_with(|| AtomicU64::new(0));
                counter.fetch_add(1, Ordering::SeqCst) + 1
            };
            if count > self.replication_threshold {
                let coordinator = self.arc();
                let path = path.clone();
                tokio::spawn(async move { workers::replicate(coordinator, path, count).await });
            }
        }
    }

    pub async fn is_directory(&self, path: &Path) -> Result<bool, NamingError> {
        self.tree.is_directory(path).ok_or(NamingError::NotFound)
    }

    #[tracing::instrument(skip(self), fields(%path))]
    pub async fn list(&self, path: &Path) -> Result<Vec<String>, NamingError> {
        let guard = self.lock_table.acquire(path, LockMode::Shared).await;
        let names = self.tree.list(path);
        guard.release();
        names.ok_or(NamingError::NotFound)
    }

    #[tracing::instrument(skip(self), fields(%path))]
    pub async fn create_file(&self, path: &Path) -> Result<bool, NamingError> {
        if path.is_root() {
            return Ok(false);
        }
        let parent = path.parent().expect("non-root has a parent");
        if self.tree.is_directory(&parent).is_none() {
            return Err(NamingError::NotFound);
        }
        let guard = self.lock_table.acquire(&parent, LockMode::Shared).await;
        let result = self.do_create_file(path).await;
        guard.release();
        result
    }

    async fn do_create_file(&self, path: &Path) -> Result<bool, NamingError> {
        if self.tree.is_directory(path).is_some() {
            return Ok(false);
        }
        let storage = self
            .registry
            .iter()
            .map(|r| *r.key())
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| NamingError::InvalidState("no storage nodes registered".into()))?;
        CommandStub::new(storage.command).create(path).await?;
        Ok(self.tree.create_file(path, storage)?)
    }

    #[tracing::instrument(skip(self), fields(%path))]
    pub async fn create_directory(&self, path: &Path) -> Result<bool, NamingError> {
        if path.is_root() {
            return Ok(false);
        }
        let parent = path.parent().expect("non-root has a parent");
        if self.tree.is_directory(&parent).is_none() {
            return Err(NamingError::NotFound);
        }
        let guard = self.lock_table.acquire(&parent, LockMode::Shared).await;
        let result = self.tree.create_directory(path).map_err(NamingError::from);
        guard.release();
        result
    }

    #[tracing::instrument(skip(self), fields(%path))]
    pub async fn delete(&self, path: &Path) -> Result<bool, NamingError> {
        if path.is_root() {
            return Ok(false);
        }
        let is_directory = match self.tree.is_directory(path) {
            Some(b) => b,
            None => return Err(NamingError::NotFound),
        };
        let guard = self.lock_table.acquire(path, LockMode::Exclusive).await;
        let result = self.tree.delete(path);
        guard.release();
        let (removed, deleted) = result.map_err(NamingError::from)?;
        if !removed {
            return Ok(false);
        }

        let targets: Vec<StorageId> = if is_directory {
            self.registry_snapshot()
        } else {
            deleted.file_replicas.iter().flat_map(|(_, replicas)| replicas.iter().copied()).collect()
        };

        let mut all_ok = true;
        for storage in targets {
            let ok = match CommandStub::new(storage.command).delete(path).await {
                Ok(ok) => ok,
                Err(err) => {
                    tracing::warn!(%storage, %err, "delete rpc to storage node failed");
                    false
                }
            };
            all_ok &= ok;
        }
        Ok(all_ok)
    }

    pub async fn get_storage(&self, path: &Path) -> Result<StorageId, NamingError> {
        self.tree.random_replica(path).ok_or(NamingError::NotFound)
    }

    // ---- registration service -------------------------------------------

    #[tracing::instrument(skip(self, files), fields(%data, %command, n_files = files.len()))]
    pub async fn register(
        &self,
        data: SocketAddr,
        command: SocketAddr,
        files: Vec<Path>,
    ) -> Result<Vec<Path>, NamingError> {
        let id = StorageId::new(data, command);
        if !self.registry.insert(id) {
            return Err(NamingError::InvalidState(format!("{id} is already registered")));
        }
        let mut duplicates = Vec::new();
        for file in files {
            match self.tree.register_file(&file, id) {
                crate::tree::RegisterOutcome::Inserted => {}
                crate::tree::RegisterOutcome::Duplicate => duplicates.push(file),
            }
        }
        tracing::info!(%id, duplicates = duplicates.len(), "storage node registered");
        Ok(duplicates)
    }
}
