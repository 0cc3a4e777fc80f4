//! Typed, bidirectional message channel bound to one connection
//!
//! The engine never touches sockets. Every connection is presented as a
//! [`Channel`]: an outbound queue of [`Message`]s, an inbound queue, and a
//! shutdown flag. Whatever sits on the far side (the TCP pumps in
//! [`crate::network`], or a test harness holding an [`Endpoint`]) moves
//! messages between those queues and the wire.
//!
//! Receiving is cancel-safe, so a bounded wait can be expressed by wrapping
//! [`Channel::receive`] in a timeout without losing or splitting a message.

use log::debug;
use shared::Message;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex};

/// Queue depth in each direction.
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("channel closed")]
    Closed,
    #[error("timed out waiting for a reply")]
    Timeout,
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl ChannelError {
    /// Builds a protocol error for a reply of the wrong kind.
    pub fn unexpected(expected: &str, got: &Message) -> Self {
        ChannelError::Protocol(format!("expected {}, got {}", expected, got.kind()))
    }
}

/// Server-side half of a connection.
pub struct Channel {
    peer: String,
    outbound: mpsc::Sender<Message>,
    inbound: Mutex<mpsc::Receiver<Message>>,
    shutdown: watch::Sender<bool>,
}

/// Far side of a [`Channel`]: whatever transports messages to and from the
/// remote player.
pub struct Endpoint {
    /// Messages pushed here are delivered to [`Channel::receive`].
    pub sender: mpsc::Sender<Message>,
    /// Messages passed to [`Channel::send`] come out here.
    pub receiver: mpsc::Receiver<Message>,
    shutdown: watch::Receiver<bool>,
}

impl Channel {
    /// Creates a connected channel/endpoint pair. `peer` labels the
    /// connection in logs.
    pub fn pair(peer: impl Into<String>) -> (Channel, Endpoint) {
        let (out_tx, out_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let channel = Channel {
            peer: peer.into(),
            outbound: out_tx,
            inbound: Mutex::new(in_rx),
            shutdown: shutdown_tx,
        };
        let endpoint = Endpoint {
            sender: in_tx,
            receiver: out_rx,
            shutdown: shutdown_rx,
        };
        (channel, endpoint)
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub async fn send(&self, message: Message) -> Result<(), ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }
        self.outbound
            .send(message)
            .await
            .map_err(|_| ChannelError::Closed)
    }

    /// Waits for the next inbound message.
    ///
    /// Fails with [`ChannelError::Closed`] once the channel is closed locally
    /// or the far side has gone away.
    pub async fn receive(&self) -> Result<Message, ChannelError> {
        let mut inbound = self.inbound.lock().await;
        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow_and_update() {
            return Err(ChannelError::Closed);
        }

        tokio::select! {
            message = inbound.recv() => message.ok_or(ChannelError::Closed),
            _ = shutdown.changed() => Err(ChannelError::Closed),
        }
    }

    /// Like [`Channel::receive`], bounded by `limit` when one is given.
    pub async fn receive_within(&self, limit: Option<Duration>) -> Result<Message, ChannelError> {
        match limit {
            Some(limit) => tokio::time::timeout(limit, self.receive())
                .await
                .map_err(|_| ChannelError::Timeout)?,
            None => self.receive().await,
        }
    }

    /// Resolves once the far side has stopped taking messages, e.g. the
    /// remote peer hung up.
    pub async fn peer_closed(&self) {
        self.outbound.closed().await
    }

    /// Closes the channel. Idempotent; pending and future operations fail
    /// with [`ChannelError::Closed`].
    pub fn close(&self) {
        if !self.shutdown.send_replace(true) {
            debug!("Closed channel to {}", self.peer);
        }
    }
}

impl Endpoint {
    /// Resolves once the server side has closed the channel.
    pub async fn closed(&mut self) {
        wait_closed(&mut self.shutdown).await
    }

    /// Splits into the inbound sender, the outbound receiver and the
    /// shutdown signal, so each can move into its own task.
    pub fn split(
        self,
    ) -> (
        mpsc::Sender<Message>,
        mpsc::Receiver<Message>,
        watch::Receiver<bool>,
    ) {
        (self.sender, self.receiver, self.shutdown)
    }

    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }
}

/// Resolves once `shutdown` reads true or its channel is gone.
pub async fn wait_closed(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
