//! End-to-end scenarios (spec §8) driven through real stub proxies over
//! loopback TCP, against naming/storage servers started in-process on
//! ephemeral ports.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use distfs::naming::{ClientService, ClientStub, Coordinator, RegistrationService, RegistrationStub};
use distfs::path::Path;
use distfs::rpc::Skeleton;
use distfs::storage::{CommandService, DataService, DataStub, StorageNode};

struct Naming {
    client: ClientStub,
    registration_addr: SocketAddr,
    // Kept alive for the harness's lifetime so the listeners stay bound;
    // the test process tearing down closes the sockets.
    _client_skeleton: Skeleton<ClientService>,
    _registration_skeleton: Skeleton<RegistrationService>,
}

async fn start_naming(replication_threshold: u64) -> Naming {
    let coordinator = Coordinator::new(replication_threshold);
    let client_skeleton =
        Skeleton::new("127.0.0.1:0".parse().unwrap(), Arc::new(ClientService::new(coordinator.clone())));
    let registration_skeleton = Skeleton::new(
        "127.0.0.1:0".parse().unwrap(),
        Arc::new(RegistrationService::new(coordinator.clone())),
    );
    let client_addr = client_skeleton.start().await.unwrap();
    let registration_addr = registration_skeleton.start().await.unwrap();
    Naming {
        client: ClientStub::new(client_addr),
        registration_addr,
        _client_skeleton: client_skeleton,
        _registration_skeleton: registration_skeleton,
    }
}

struct Storage {
    _dir: tempfile::TempDir,
    node: Arc<StorageNode>,
    data_addr: SocketAddr,
    command_addr: SocketAddr,
    _data_skeleton: Skeleton<DataService>,
    _command_skeleton: Skeleton<CommandService>,
}

async fn start_storage() -> Storage {
    let dir = tempfile::tempdir().unwrap();
    let node = Arc::new(StorageNode::new(dir.path().to_path_buf()));
    let data_skeleton =
        Skeleton::new("127.0.0.1:0".parse().unwrap(), Arc::new(DataService::new(node.clone())));
    let command_skeleton =
        Skeleton::new("127.0.0.1:0".parse().unwrap(), Arc::new(CommandService::new(node.clone())));
    let data_addr = data_skeleton.start().await.unwrap();
    let command_addr = command_skeleton.start().await.unwrap();
    Storage {
        _dir: dir,
        node,
        data_addr,
        command_addr,
        _data_skeleton: data_skeleton,
        _command_skeleton: command_skeleton,
    }
}

/// Registers a storage node with the naming server, reporting whatever files
/// already sit under its root (the registration dance each storage-server
/// binary runs at startup, per §4.4).
async fn register(storage: &Storage, naming: &Naming) -> Vec<Path> {
    let reg = RegistrationStub::new(naming.registration_addr);
    let files = storage.node.scan_local_files().await.unwrap();
    reg.register(storage.data_addr, storage.command_addr, files).await.unwrap()
}

#[tokio::test]
async fn bootstrap_then_create_file_and_list() {
    let naming = start_naming(20).await;
    let s1 = start_storage().await;
    assert!(register(&s1, &naming).await.is_empty());

    assert!(naming.client.create_directory(&Path::parse("/a").unwrap()).await.unwrap());
    assert!(naming.client.create_file(&Path::parse("/a/f").unwrap()).await.unwrap());

    let storage_id = naming.client.get_storage(&Path::parse("/a/f").unwrap()).await.unwrap();
    assert_eq!(storage_id.data, s1.data_addr);

    let names = naming.client.list(&Path::parse("/a").unwrap()).await.unwrap();
    assert_eq!(names, vec!["f".to_string()]);
}

#[tokio::test]
async fn duplicate_registration_is_pruned_from_the_new_node() {
    let naming = start_naming(20).await;
    let s1 = start_storage().await;
    assert!(register(&s1, &naming).await.is_empty());

    assert!(naming.client.create_file(&Path::parse("/x").unwrap()).await.unwrap());
    let before = naming.client.get_storage(&Path::parse("/x").unwrap()).await.unwrap();
    assert_eq!(before.data, s1.data_addr);

    // S2 starts up already holding a local copy of /x (e.g. a stale replica
    // from a previous run it never got to report).
    let s2 = start_storage().await;
    s2.node.create(&Path::parse("/x").unwrap()).await.unwrap();
    let duplicates = register(&s2, &naming).await;
    assert_eq!(duplicates, vec![Path::parse("/x").unwrap()]);

    for dup in &duplicates {
        assert!(s2.node.delete(dup).await.unwrap());
    }
    assert!(matches!(s2.node.size(&Path::parse("/x").unwrap()).await, Err(_)));

    // The tree still has exactly the one replica registered by S1.
    let after = naming.client.get_storage(&Path::parse("/x").unwrap()).await.unwrap();
    assert_eq!(after.data, s1.data_addr);
}

#[tokio::test]
async fn replication_threshold_adds_a_second_replica() {
    let naming = start_naming(3).await;
    let s1 = start_storage().await;
    assert!(register(&s1, &naming).await.is_empty());
    let s2 = start_storage().await;
    assert!(register(&s2, &naming).await.is_empty());

    let f = Path::parse("/f").unwrap();
    assert!(naming.client.create_file(&f).await.unwrap());

    for _ in 0..5 {
        naming.client.lock(&f, false).await.unwrap();
        naming.client.unlock(&f, false).await.unwrap();
    }

    // The replication worker is a detached task; give it time to land.
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(DataStub::new(s1.data_addr).size(&f).await.is_ok());
    assert!(DataStub::new(s2.data_addr).size(&f).await.is_ok());
}

#[tokio::test]
async fn exclusive_lock_invalidates_down_to_one_replica() {
    let naming = start_naming(3).await;
    let s1 = start_storage().await;
    assert!(register(&s1, &naming).await.is_empty());
    let s2 = start_storage().await;
    assert!(register(&s2, &naming).await.is_empty());

    let f = Path::parse("/f").unwrap();
    assert!(naming.client.create_file(&f).await.unwrap());

    for _ in 0..5 {
        naming.client.lock(&f, false).await.unwrap();
        naming.client.unlock(&f, false).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(300)).await;

    // One more read so the access counter is non-zero going into the
    // exclusive lock (the invalidation worker is a no-op on an idle file
    // whose counter a prior replication success already reset to zero).
    naming.client.lock(&f, false).await.unwrap();
    naming.client.unlock(&f, false).await.unwrap();

    naming.client.lock(&f, true).await.unwrap();
    naming.client.unlock(&f, true).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let on_s1 = DataStub::new(s1.data_addr).size(&f).await.is_ok();
    let on_s2 = DataStub::new(s2.data_addr).size(&f).await.is_ok();
    assert_ne!(on_s1, on_s2, "exactly one replica should survive invalidation");
}

#[tokio::test]
async fn cross_branch_locking_does_not_deadlock() {
    let naming = start_naming(20).await;
    let s1 = start_storage().await;
    assert!(register(&s1, &naming).await.is_empty());

    assert!(naming.client.create_directory(&Path::parse("/a").unwrap()).await.unwrap());
    assert!(naming.client.create_directory(&Path::parse("/a/b").unwrap()).await.unwrap());
    assert!(naming.client.create_directory(&Path::parse("/a/c").unwrap()).await.unwrap());

    let ab = Path::parse("/a/b").unwrap();
    let ac = Path::parse("/a/c").unwrap();
    let a = Path::parse("/a").unwrap();

    let client_a = naming.client;
    let client_b = naming.client;
    let client_c = naming.client;

    client_a.lock(&ab, true).await.unwrap();
    client_b.lock(&ac, true).await.unwrap();

    let blocked = tokio::spawn(async move {
        client_c.lock(&a, true).await.unwrap();
        client_c.unlock(&a, true).await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!blocked.is_finished());

    client_a.unlock(&ab, true).await.unwrap();
    client_b.unlock(&ac, true).await.unwrap();

    tokio::time::timeout(Duration::from_millis(500), blocked).await.unwrap().unwrap();
}

#[tokio::test]
async fn delete_cascades_to_every_registered_storage_node() {
    let naming = start_naming(20).await;
    let s1 = start_storage().await;
    assert!(register(&s1, &naming).await.is_empty());
    let s2 = start_storage().await;
    assert!(register(&s2, &naming).await.is_empty());

    assert!(naming.client.create_directory(&Path::parse("/d").unwrap()).await.unwrap());
    assert!(naming.client.create_file(&Path::parse("/d/f1").unwrap()).await.unwrap());
    assert!(naming.client.create_file(&Path::parse("/d/f2").unwrap()).await.unwrap());

    let removed = naming.client.delete(&Path::parse("/d").unwrap()).await.unwrap();
    assert!(removed);
    assert!(naming.client.is_directory(&Path::parse("/d").unwrap()).await.is_err());
}
