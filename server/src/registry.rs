//! Registry of connected players
//!
//! Tracks every connected [`Player`] by nickname, in registration order, and
//! keeps the ticket and win count of players that have left so that a later
//! connection under the same nickname picks them up again.
//!
//! Lookup and insertion happen under a single registry lock, which is enough
//! to stop two connections from claiming the same nickname at once.

use crate::channel::Channel;
use crate::leaderboard;
use crate::player::{Player, Ticket};
use log::info;
use shared::LeaderboardEntry;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("nickname {0} is already in use by a connected player")]
    NicknameTaken(String),
    #[error("nickname must not be empty")]
    InvalidNickname,
}

/// What survives a player's disconnection.
#[derive(Debug, Clone)]
struct Record {
    ticket: Ticket,
    wins: u32,
}

#[derive(Default)]
struct Inner {
    connected: Vec<Arc<Player>>,
    departed: HashMap<String, Record>,
}

pub struct PlayerRegistry {
    inner: Mutex<Inner>,
    starting_lives: i32,
}

impl PlayerRegistry {
    pub fn new(starting_lives: i32) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            starting_lives,
        }
    }

    /// Binds `nickname` to `channel`.
    ///
    /// A nickname last used by a departed player reuses that player's ticket
    /// and wins. A nickname held by a connected player is refused; if the
    /// holder is already marked disconnected it is dropped first.
    pub async fn find_or_create(
        &self,
        nickname: &str,
        channel: Arc<Channel>,
    ) -> Result<Arc<Player>, RegistryError> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(RegistryError::InvalidNickname);
        }

        let mut inner = self.inner.lock().await;

        if let Some(index) = inner
            .connected
            .iter()
            .position(|p| p.nickname() == nickname)
        {
            if inner.connected[index].is_connected() {
                return Err(RegistryError::NicknameTaken(nickname.to_string()));
            }
            let stale = inner.connected.remove(index);
            inner.retire(&stale);
        }

        let record = inner.departed.remove(nickname);
        let returning = record.is_some();
        let record = record.unwrap_or_else(|| Record {
            ticket: Ticket::new(nickname),
            wins: 0,
        });

        let player = Arc::new(Player::new(
            record.ticket,
            channel,
            self.starting_lives,
            record.wins,
        ));
        inner.connected.push(Arc::clone(&player));

        info!(
            "Player {} registered ({}, ticket {})",
            nickname,
            if returning { "returning" } else { "new" },
            player.ticket().id()
        );
        Ok(player)
    }

    /// Removes this exact player binding and marks it disconnected. Returns
    /// false if it was no longer registered.
    pub async fn remove(&self, player: &Arc<Player>) -> bool {
        player.disconnect();

        let mut inner = self.inner.lock().await;
        match inner.connected.iter().position(|p| Arc::ptr_eq(p, player)) {
            Some(index) => {
                let player = inner.connected.remove(index);
                inner.retire(&player);
                info!("Player {} removed from registry", player.nickname());
                true
            }
            None => false,
        }
    }

    /// Connected nicknames in registration order, as of this call.
    pub async fn snapshot_connected_names(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner
            .connected
            .iter()
            .filter(|p| p.is_connected())
            .map(|p| p.nickname().to_string())
            .collect()
    }

    /// Every registered player, in registration order.
    pub async fn players(&self) -> Vec<Arc<Player>> {
        self.inner.lock().await.connected.clone()
    }

    pub async fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        leaderboard::compute(&self.players().await)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.connected.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Inner {
    fn retire(&mut self, player: &Player) {
        self.departed.insert(
            player.nickname().to_string(),
            Record {
                ticket: player.ticket().clone(),
                wins: player.wins(),
            },
        );
    }
}
