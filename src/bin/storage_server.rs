//! Storage server binary: serves a local-disk [`StorageNode`] over a data
//! endpoint and a command endpoint, and runs the startup registration dance
//! (§4.4 "Startup/registration") against a naming server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde::Deserialize;

use distfs::config;
use distfs::naming::RegistrationStub;
use distfs::rpc::Skeleton;
use distfs::storage::{CommandService, DataService, StorageNode};

#[derive(Parser, Debug)]
#[command(about = "distfs storage server")]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,
    /// Root directory this node stores files under.
    #[arg(long)]
    root: Option<PathBuf>,
    #[arg(long)]
    data_addr: Option<SocketAddr>,
    #[arg(long)]
    command_addr: Option<SocketAddr>,
    #[arg(long)]
    naming_registration_addr: Option<SocketAddr>,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    root: Option<PathBuf>,
    data_addr: Option<SocketAddr>,
    command_addr: Option<SocketAddr>,
    naming_registration_addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let file_cfg: FileConfig = match &args.config {
        Some(path) => config::read_toml_file(path)?,
        None => FileConfig::default(),
    };

    let root = args.root.or(file_cfg.root).unwrap_or_else(|| PathBuf::from("./distfs-storage"));
    let data_addr = args.data_addr.or(file_cfg.data_addr).unwrap_or_else(|| {
        format!("0.0.0.0:{}", config::DEFAULT_DATA_PORT).parse().expect("valid default addr")
    });
    let command_addr = args.command_addr.or(file_cfg.command_addr).unwrap_or_else(|| {
        format!("0.0.0.0:{}", config::DEFAULT_COMMAND_PORT).parse().expect("valid default addr")
    });
    let naming_registration_addr =
        args.naming_registration_addr.or(file_cfg.naming_registration_addr).unwrap_or_else(|| {
            format!("127.0.0.1:{}", config::DEFAULT_REGISTRATION_PORT).parse().expect("valid default addr")
        });

    tokio::fs::create_dir_all(&root).await?;
    let node = Arc::new(StorageNode::new(root));

    let data_skeleton = Skeleton::new(data_addr, Arc::new(DataService::new(node.clone())));
    let command_skeleton = Skeleton::new(command_addr, Arc::new(CommandService::new(node.clone())));
    let bound_data = data_skeleton.start().await?;
    let bound_command = command_skeleton.start().await?;
    tracing::info!(%bound_data, %bound_command, "storage node listening");

    let local_files = node.scan_local_files().await?;
    let registration = RegistrationStub::new(naming_registration_addr);
    let duplicates = registration.register(bound_data, bound_command, local_files).await?;
    tracing::info!(duplicates = duplicates.len(), "registered with naming server");
    for dup in &duplicates {
        if let Err(err) = node.delete(dup).await {
            tracing::warn!(%dup, %err, "failed to remove duplicate reported by naming server");
            continue;
        }
        if let Err(err) = node.prune_empty_ancestors(dup).await {
            tracing::warn!(%dup, %err, "failed to prune ancestors of removed duplicate");
        }
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    data_skeleton.stop().await?;
    command_skeleton.stop().await?;
    Ok(())
}
