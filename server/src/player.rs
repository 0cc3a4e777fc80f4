//! Player identity and per-connection state
//!
//! A [`Player`] binds a nickname and its permanent [`Ticket`] to exactly one
//! [`Channel`]. Game counters are atomics so that the round loop, the
//! coordinator and the liveness monitor can all read them without sharing a
//! lock.
//!
//! All request/reply traffic on a player's channel goes through
//! [`Player::exchange`] or [`Player::try_exchange`], which hold the player's
//! exchange lock from sending the prompt until the reply arrives. This is what
//! keeps a liveness probe from ever reading a guess, or a round from reading a
//! PONG.

use crate::channel::{Channel, ChannelError};
use shared::{Message, PlayerStanding};
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

/// Sentinel stored in `last_choice` when no guess was recorded this round.
const NO_CHOICE: i32 = i32::MIN;

/// Permanent identity record issued once per distinct nickname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    id: Uuid,
    pseudo_name: String,
}

impl Ticket {
    pub fn new(pseudo_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            pseudo_name: pseudo_name.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pseudo_name(&self) -> &str {
        &self.pseudo_name
    }
}

/// Where a connected player currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Owned by its coordinator: identifying or choosing a game.
    Lobby,
    /// Seated in a game session, which owns further prompts.
    InGame,
    /// Disconnected or evicted. Terminal.
    Gone,
}

pub struct Player {
    nickname: String,
    ticket: Ticket,
    channel: Arc<Channel>,
    exchange: Mutex<()>,
    lives: AtomicI32,
    last_choice: AtomicI32,
    wins: AtomicU32,
    presence: watch::Sender<Presence>,
}

impl Player {
    /// Creates a connected player in the lobby. `wins` carries the record of
    /// a previous connection under the same nickname.
    pub fn new(ticket: Ticket, channel: Arc<Channel>, lives: i32, wins: u32) -> Self {
        let (presence, _) = watch::channel(Presence::Lobby);
        Self {
            nickname: ticket.pseudo_name().to_string(),
            ticket,
            channel,
            exchange: Mutex::new(()),
            lives: AtomicI32::new(lives),
            last_choice: AtomicI32::new(NO_CHOICE),
            wins: AtomicU32::new(wins),
            presence,
        }
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn ticket(&self) -> &Ticket {
        &self.ticket
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn lives(&self) -> i32 {
        self.lives.load(Ordering::SeqCst)
    }

    pub fn reset_lives(&self, lives: i32) {
        self.lives.store(lives, Ordering::SeqCst);
    }

    /// Takes one life and returns the remaining count.
    pub fn lose_life(&self) -> i32 {
        self.lives.fetch_sub(1, Ordering::SeqCst) - 1
    }

    pub fn last_choice(&self) -> Option<i32> {
        match self.last_choice.load(Ordering::SeqCst) {
            NO_CHOICE => None,
            choice => Some(choice),
        }
    }

    pub fn set_last_choice(&self, choice: Option<i32>) {
        self.last_choice
            .store(choice.unwrap_or(NO_CHOICE), Ordering::SeqCst);
    }

    pub fn wins(&self) -> u32 {
        self.wins.load(Ordering::SeqCst)
    }

    pub fn record_win(&self) -> u32 {
        self.wins.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn standing(&self) -> PlayerStanding {
        PlayerStanding {
            name: self.nickname.clone(),
            lives: self.lives(),
            last_guess: self.last_choice(),
        }
    }

    pub fn presence(&self) -> Presence {
        *self.presence.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.presence() != Presence::Gone
    }

    /// Moves a connected player between lobby and game. Has no effect once
    /// the player is gone.
    pub fn set_presence(&self, presence: Presence) {
        self.presence.send_if_modified(|current| {
            if *current == Presence::Gone || *current == presence {
                false
            } else {
                *current = presence;
                true
            }
        });
    }

    pub fn watch_presence(&self) -> watch::Receiver<Presence> {
        self.presence.subscribe()
    }

    /// Marks the player gone and closes its channel. Returns false if it was
    /// already disconnected.
    pub fn disconnect(&self) -> bool {
        let was_connected = self.presence.send_replace(Presence::Gone) != Presence::Gone;
        self.channel.close();
        was_connected
    }

    /// Pushes a message that expects no reply.
    pub async fn send(&self, message: Message) -> Result<(), ChannelError> {
        self.channel.send(message).await
    }

    /// Sends `prompt` and waits for the reply while holding the exchange
    /// lock. Waits behind any exchange already in flight.
    pub async fn exchange(
        &self,
        prompt: Message,
        limit: Option<Duration>,
    ) -> Result<Message, ChannelError> {
        let _guard = self.exchange.lock().await;
        self.channel.send(prompt).await?;
        self.channel.receive_within(limit).await
    }

    /// Like [`Player::exchange`] but returns `None` instead of waiting when
    /// another exchange is in flight.
    pub async fn try_exchange(
        &self,
        prompt: Message,
        limit: Option<Duration>,
    ) -> Option<Result<Message, ChannelError>> {
        let _guard = self.exchange.try_lock().ok()?;
        let result = match self.channel.send(prompt).await {
            Ok(()) => self.channel.receive_within(limit).await,
            Err(e) => Err(e),
        };
        Some(result)
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("nickname", &self.nickname)
            .field("ticket", &self.ticket.id)
            .field("lives", &self.lives())
            .field("wins", &self.wins())
            .field("presence", &self.presence())
            .finish()
    }
}
