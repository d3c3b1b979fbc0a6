//! Naming server binary: binds the client service and the registration
//! service over one shared [`Coordinator`] (§4.3, §6).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde::Deserialize;

use distfs::config;
use distfs::naming::{ClientService, Coordinator, RegistrationService};
use distfs::rpc::Skeleton;

#[derive(Parser, Debug)]
#[command(about = "distfs naming server")]
struct Args {
    /// Optional TOML config file. CLI flags override it; unset fields fall
    /// back to the built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    service_addr: Option<SocketAddr>,
    #[arg(long)]
    registration_addr: Option<SocketAddr>,
    #[arg(long)]
    replication_threshold: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    service_addr: Option<SocketAddr>,
    registration_addr: Option<SocketAddr>,
    replication_threshold: Option<u64>,
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

    let service_addr = args.service_addr.or(file_cfg.service_addr).unwrap_or_else(|| {
        format!("0.0.0.0:{}", config::DEFAULT_SERVICE_PORT).parse().expect("valid default addr")
    });
    let registration_addr = args.registration_addr.or(file_cfg.registration_addr).unwrap_or_else(|| {
        format!("0.0.0.0:{}", config::DEFAULT_REGISTRATION_PORT).parse().expect("valid default addr")
    });
    let replication_threshold = args
        .replication_threshold
        .or(file_cfg.replication_threshold)
        .unwrap_or(config::DEFAULT_REPLICATION_THRESHOLD);

    let coordinator = Coordinator::new(replication_threshold);
    let client_skeleton = Skeleton::new(service_addr, Arc::new(ClientService::new(coordinator.clone())));
    let registration_skeleton =
        Skeleton::new(registration_addr, Arc::new(RegistrationService::new(coordinator.clone())));

    let bound_service = client_skeleton.start().await?;
    let bound_registration = registration_skeleton.start().await?;
    tracing::info!(
        %bound_service,
        %bound_registration,
        replication_threshold,
        "naming server listening"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    client_skeleton.stop().await?;
    registration_skeleton.stop().await?;
    Ok(())
}
