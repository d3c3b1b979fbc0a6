//! Thin CLI over the naming coordinator's client service (§6 "filesystem-level
//! command surface"): mkdir, touch, ls.

use std::net::SocketAddr;

use clap::{Parser, Subcommand};

use distfs::naming::ClientStub;
use distfs::path::Path as DfsPath;

#[derive(Parser, Debug)]
#[command(about = "distfs command-line client")]
struct Args {
    #[arg(long, default_value = "127.0.0.1:9000")]
    naming_service_addr: SocketAddr,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a directory.
    Mkdir { path: String },
    /// Create an empty file.
    Touch { path: String },
    /// List a directory's entries.
    Ls { path: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let client = ClientStub::new(args.naming_service_addr);

    // §6 describes each command wrapping itself in an explicit exclusive
    // (mutation) or shared (query) lock/unlock pair. This CLI skips that:
    // `create_directory`/`create_file`/`list` already acquire and release
    // whatever locks they need internally (§4.3's operation table), and
    // wrapping them in another lock/unlock pair from here would just
    // deadlock each command against itself. `ClientStub::lock`/`unlock`
    // remain exposed for a caller that wants to hold a lock *across*
    // several RPCs, which none of these single-shot commands do.
    match args.command {
        Command::Mkdir { path } => {
            let path = DfsPath::parse(&path)?;
            if client.create_directory(&path).await? {
                println!("created directory {path}");
            } else {
                println!("{path} already exists");
            }
        }
        Command::Touch { path } => {
            let path = DfsPath::parse(&path)?;
            if client.create_file(&path).await? {
                println!("created file {path}");
            } else {
                println!("{path} already exists");
            }
        }
        Command::Ls { path } => {
            let path = DfsPath::parse(&path)?;
            for name in client.list(&path).await? {
                println!("{name}");
            }
        }
    }
    Ok(())
}
