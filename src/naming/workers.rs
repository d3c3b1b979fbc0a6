//! Replication and invalidation workers (§4.3): independent tasks dispatched
//! from a lock acquisition on a file path, that re-acquire the lock
//! themselves once the triggering caller has released it.

use std::sync::Arc;

use rand::seq::IteratorRandom;

use crate::locking::LockMode;
use crate::storage::CommandStub;

use super::coordinator::Coordinator;
use crate::path::Path;

/// Runs after a file path's access counter crosses the replication
/// threshold. Adds one replica hosted by a storage node that doesn't
/// already have the file, chosen at random, copying from a random existing
/// replica.
#[tracing::instrument(skip(coordinator), fields(%path, trigger_count))]
pub async fn replicate(coordinator: Arc<Coordinator>, path: Path, trigger_count: u64) {
    if trigger_count < coordinator.replication_threshold() {
        coordinator.reset_counter(&path);
        return;
    }

    let guard = coordinator.lock_table().acquire(&path, LockMode::Shared).await;

    let Some(current_replicas) = coordinator.tree().replicas(&path) else {
        guard.release();
        return;
    };

    let candidates: Vec<_> = coordinator
        .registry_snapshot()
        .into_iter()
        .filter(|s| !current_replicas.contains(s))
        .collect();

    if candidates.is_empty() {
        guard.release();
        return;
    }

    let Some(target) = candidates.into_iter().choose(&mut rand::thread_rng()) else {
        guard.release();
        return;
    };
    let Some(source) = current_replicas.iter().choose(&mut rand::thread_rng()) else {
        guard.release();
        return;
    };

    match CommandStub::new(target.command).copy(&path, source.data).await {
        Ok(()) => {
            coordinator.tree().add_replica(&path, target);
            coordinator.reset_counter(&path);
            tracing::info!(%target, "replica added");
        }
        Err(err) => {
            tracing::debug!(%err, %target, "replication copy failed, leaving counter untouched");
        }
    }

    guard.release();
}

/// Runs after a file path is locked exclusively. Prunes the replica set down
/// to one survivor, chosen at random, deleting the rest.
#[tracing::instrument(skip(coordinator), fields(%path))]
pub async fn invalidate(coordinator: Arc<Coordinator>, path: Path) {
    if coordinator.counter_value(&path) == 0 {
        return;
    }

    let guard = coordinator.lock_table().acquire(&path, LockMode::Exclusive).await;

    let Some(replicas) = coordinator.tree().replicas(&path) else {
        guard.release();
        return;
    };

    if replicas.len() > 1 {
        let keep = replicas.iter().choose(&mut rand::thread_rng()).copied();
        for storage in replicas.iter().filter(|s| Some(**s) != keep) {
            match CommandStub::new(storage.command).delete(&path).await {
                Ok(_) => tracing::info!(%storage, "replica invalidated"),
                Err(err) => tracing::debug!(%err, %storage, "invalidation delete rpc failed"),
            }
            coordinator.tree().remove_replica(&path, storage);
        }
    }

    coordinator.reset_counter(&path);
    guard.release();
}
