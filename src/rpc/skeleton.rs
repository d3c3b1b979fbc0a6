//! The server side of the RPC substrate: binds a listening socket, accepts
//! connections, and dispatches one framed request per connection to a
//! [`Service`] implementation (§4.5 "Skeleton").

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::{JoinHandle, JoinSet};

use super::error::RpcError;
use super::frame;

/// What a top-level `accept()` error should do to the listener loop.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ListenErrorAction {
    Resume,
    Shutdown,
}

/// The application logic a [`Skeleton`] dispatches framed requests to. Every
/// remote interface in this crate (client service, registration service,
/// storage data/command services) is one `Service` impl, with its own
/// request/reply enums standing in for the "remote-interface contract":
/// every method's reply variant wraps a `Result` whose error type is the
/// declared failure mode, so construction never needs a separate fallible
/// check the way a reflection-based proxy would.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    type Request: Serialize + DeserializeOwned + Send + 'static;
    type Response: Serialize + DeserializeOwned + Send + 'static;

    async fn call(&self, request: Self::Request) -> Self::Response;

    /// Observes a per-connection dispatch error. Does not influence the
    /// accept loop, which keeps running regardless.
    fn on_service_error(&self, _err: &RpcError) {}

    /// Decides whether a top-level `accept()` error should be resumed from
    /// or should shut the listener down. Transient errors are common and
    /// resuming is the safer default.
    fn on_listen_error(&self, _err: &std::io::Error) -> ListenErrorAction {
        ListenErrorAction::Resume
    }

    /// Invoked exactly once, after `stop` has drained every in-flight worker.
    fn on_stopped(&self) {}
}

enum RunState {
    Stopped,
    Running { shutdown: oneshot::Sender<()>, accept_task: JoinHandle<()>, workers: Arc<AsyncMutex<JoinSet<()>>> },
}

/// A started-or-stopped RPC server bound to one `Service`. `start`/`stop` are
/// mutually exclusive and serialized against each other; a second `start`
/// before a matching `stop` fails with [`RpcError::AlreadyStarted`].
pub struct Skeleton<S: Service> {
    bind_addr: SocketAddr,
    service: Arc<S>,
    state: AsyncMutex<RunState>,
}

impl<S: Service> Skeleton<S> {
    pub fn new(bind_addr: SocketAddr, service: Arc<S>) -> Self {
        Skeleton { bind_addr, service, state: AsyncMutex::new(RunState::Stopped) }
    }

    /// Binds the listening socket (port 0 picks an ephemeral port) and spawns
    /// the accept loop. Returns the address actually bound.
    pub async fn start(&self) -> Result<SocketAddr, RpcError> {
        let mut state = self.state.lock().await;
        if matches!(&*state, RunState::Running { .. }) {
            return Err(RpcError::AlreadyStarted);
        }
        let listener = TcpListener::bind(self.bind_addr).await?;
        let bound_addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let workers = Arc::new(AsyncMutex::new(JoinSet::new()));
        let service = self.service.clone();
        let accept_task =
            tokio::spawn(accept_loop(listener, service, workers.clone(), shutdown_rx));
        *state = RunState::Running { shutdown: shutdown_tx, accept_task, workers };
        tracing::info!(addr = %bound_addr, "rpc skeleton started");
        Ok(bound_addr)
    }

    /// Stops accepting, waits for in-flight workers to finish, then invokes
    /// [`Service::on_stopped`] exactly once. Errors if not currently running.
    pub async fn stop(&self) -> Result<(), RpcError> {
        let mut state = self.state.lock().await;
        let running = std::mem::replace(&mut *state, RunState::Stopped);
        match running {
            RunState::Stopped => {
                *state = RunState::Stopped;
                Err(RpcError::NotStarted)
            }
            RunState::Running { shutdown, accept_task, workers } => {
                let _ = shutdown.send(());
                let _ = accept_task.await;
                let mut workers = workers.lock().await;
                while workers.join_next().await.is_some() {}
                drop(workers);
                self.service.on_stopped();
                tracing::info!("rpc skeleton stopped");
                Ok(())
            }
        }
    }
}

async fn accept_loop<S: Service>(
    listener: TcpListener,
    service: Arc<S>,
    workers: Arc<AsyncMutex<JoinSet<()>>>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::debug!("rpc accept loop received shutdown signal");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        tracing::trace!(%peer, "rpc connection accepted");
                        let service = service.clone();
                        let mut workers = workers.lock().await;
                        workers.spawn(async move {
                            if let Err(err) = serve_connection(stream, &service).await {
                                tracing::warn!(%err, "rpc connection dispatch failed");
                                service.on_service_error(&err);
                            }
                        });
                    }
                    Err(err) => {
                        tracing::warn!(%err, "rpc accept() failed");
                        match service.on_listen_error(&err) {
                            ListenErrorAction::Resume => continue,
                            ListenErrorAction::Shutdown => break,
                        }
                    }
                }
            }
        }
    }
}

async fn serve_connection<S: Service>(mut stream: TcpStream, service: &S) -> Result<(), RpcError> {
    stream.set_nodelay(true).ok();
    let request: S::Request = frame::read_frame(&mut stream).await?;
    let response = service.call(request).await;
    frame::write_frame(&mut stream, &response).await?;
    Ok(())
}
