//! TCP transport and accept loop
//!
//! Each accepted socket is split and bridged onto a [`Channel`] by two pump
//! tasks: the reader decodes frames into the channel's inbound queue, the
//! writer encodes whatever the engine sends. When either side of the bridge
//! ends, the other follows, and the channel observes it as closed.

use crate::channel::{wait_closed, Channel};
use crate::config::ServerConfig;
use crate::coordinator::Coordinator;
use crate::liveness::LivenessMonitor;
use crate::lobby::LobbyCatalog;
use crate::registry::PlayerRegistry;
use log::{debug, error, info, warn};
use shared::{read_frame, write_frame};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Bridges `stream` onto a new channel and returns the server-side half.
pub fn attach(stream: TcpStream, peer: SocketAddr) -> Arc<Channel> {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not set TCP_NODELAY for {}: {}", peer, e);
    }

    let (channel, endpoint) = Channel::pair(peer.to_string());
    let (inbound, mut outbound, shutdown) = endpoint.split();
    let (mut reader, mut writer) = stream.into_split();
    let (reader_done, mut stop_writer) = oneshot::channel::<()>();

    let mut reader_shutdown = shutdown.clone();
    tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                frame = read_frame(&mut reader) => frame,
                _ = wait_closed(&mut reader_shutdown) => break,
            };
            match frame {
                Ok(Some(message)) => {
                    if inbound.send(message).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("Connection {} closed by peer", peer);
                    break;
                }
                Err(e) => {
                    warn!("Dropping connection {}: {}", peer, e);
                    break;
                }
            }
        }
        let _ = reader_done.send(());
    });

    let mut writer_shutdown = shutdown;
    tokio::spawn(async move {
        loop {
            tokio::select! {
                // Drain queued messages before honouring a close.
                biased;
                message = outbound.recv() => match message {
                    Some(message) => {
                        if let Err(e) = write_frame(&mut writer, &message).await {
                            debug!("Write to {} failed: {}", peer, e);
                            break;
                        }
                    }
                    None => break,
                },
                _ = wait_closed(&mut writer_shutdown) => break,
                _ = &mut stop_writer => break,
            }
        }
        let _ = writer.shutdown().await;
    });

    Arc::new(channel)
}

/// Aborts the liveness monitor when the server stops running.
struct MonitorGuard(JoinHandle<()>);

impl Drop for MonitorGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Game server bound to a TCP listener.
pub struct Server {
    listener: TcpListener,
    registry: Arc<PlayerRegistry>,
    catalog: Arc<LobbyCatalog>,
    config: Arc<ServerConfig>,
}

impl Server {
    pub async fn bind(addr: &str, config: ServerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let config = Arc::new(config);
        let registry = Arc::new(PlayerRegistry::new(config.starting_lives));
        let catalog = Arc::new(LobbyCatalog::new(
            Arc::clone(&registry),
            Arc::clone(&config),
        ));

        Ok(Self {
            listener,
            registry,
            catalog,
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> &Arc<PlayerRegistry> {
        &self.registry
    }

    pub fn catalog(&self) -> &Arc<LobbyCatalog> {
        &self.catalog
    }

    /// Accepts connections until the future is dropped. Each connection gets
    /// its own coordinator task; the liveness monitor runs alongside.
    pub async fn run(self) {
        let _monitor = MonitorGuard(
            LivenessMonitor::new(
                Arc::clone(&self.registry),
                Arc::clone(&self.catalog),
                &self.config,
            )
            .spawn(),
        );

        let coordinator = Arc::new(Coordinator::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.catalog),
            Arc::clone(&self.config),
        ));

        info!("Server started successfully");

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    info!("Accepted connection from {}", peer);
                    let channel = attach(stream, peer);
                    let coordinator = Arc::clone(&coordinator);
                    tokio::spawn(async move { coordinator.run(channel).await });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}
