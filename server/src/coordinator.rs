//! Per-connection control flow
//!
//! A [`Coordinator`] walks one connection through identification, the
//! leaderboard and player snapshots, and lobby selection. Once the player is
//! seated, prompts belong to the game session; the coordinator parks until the
//! session releases the player back to the lobby or the connection dies.
//! Whatever ends the connection, the player is removed from the registry and
//! from every roster on the way out.

use crate::channel::{Channel, ChannelError};
use crate::config::ServerConfig;
use crate::lobby::LobbyCatalog;
use crate::player::{Player, Presence};
use crate::registry::PlayerRegistry;
use log::{debug, info, warn};
use shared::{JoinStatus, Message};
use std::sync::Arc;

pub struct Coordinator {
    registry: Arc<PlayerRegistry>,
    catalog: Arc<LobbyCatalog>,
    config: Arc<ServerConfig>,
}

impl Coordinator {
    pub fn new(
        registry: Arc<PlayerRegistry>,
        catalog: Arc<LobbyCatalog>,
        config: Arc<ServerConfig>,
    ) -> Self {
        Self {
            registry,
            catalog,
            config,
        }
    }

    /// Serves one connection to completion.
    pub async fn run(&self, channel: Arc<Channel>) {
        let player = match self.identify(&channel).await {
            Ok(player) => player,
            Err(e) => {
                info!("Connection {} ended before identification: {}", channel.peer(), e);
                channel.close();
                return;
            }
        };

        match self.serve(&player).await {
            Ok(()) => info!("Player {} disconnected", player.nickname()),
            Err(e) => warn!("Player {} dropped: {}", player.nickname(), e),
        }

        self.registry.remove(&player).await;
        self.catalog.remove_player(&player).await;
    }

    /// Reads nicknames until one can be registered, then acknowledges it
    /// with the player's ticket.
    async fn identify(&self, channel: &Arc<Channel>) -> Result<Arc<Player>, ChannelError> {
        loop {
            let nickname = match channel.receive().await? {
                Message::IdentifySubmit { nickname } => nickname,
                other => return Err(ChannelError::unexpected("IdentifySubmit", &other)),
            };

            match self
                .registry
                .find_or_create(&nickname, Arc::clone(channel))
                .await
            {
                Ok(player) => {
                    let ack = Message::IdentifyAck {
                        ticket_id: player.ticket().id(),
                        message: format!(
                            "Identification successful. Welcome, {}\nYour ticket ID is {}",
                            player.nickname(),
                            player.ticket().id()
                        ),
                    };
                    if let Err(e) = player.send(ack).await {
                        self.registry.remove(&player).await;
                        return Err(e);
                    }
                    return Ok(player);
                }
                Err(e) => {
                    debug!("Rejected nickname {:?} on {}: {}", nickname, channel.peer(), e);
                    channel
                        .send(Message::IdentifyRejected {
                            reason: e.to_string(),
                        })
                        .await?;
                }
            }
        }
    }

    /// Lobby loop: snapshots, game choice, then wait out the game. Returns
    /// `Ok` when the connection goes away while the player is seated.
    async fn serve(&self, player: &Arc<Player>) -> Result<(), ChannelError> {
        loop {
            player
                .send(Message::LeaderboardSnapshot {
                    entries: self.registry.leaderboard().await,
                })
                .await?;
            player
                .send(Message::ConnectedPlayers {
                    names: self.registry.snapshot_connected_names().await,
                })
                .await?;

            self.choose_game(player).await?;

            if !self.wait_while_in_game(player).await {
                return Ok(());
            }
            debug!("Player {} is back in the lobby", player.nickname());
        }
    }

    /// Offers the lobby list until the player is seated somewhere.
    async fn choose_game(&self, player: &Arc<Player>) -> Result<(), ChannelError> {
        loop {
            let games = self.catalog.list().await;
            let reply = player
                .exchange(Message::GameList { games }, self.config.lobby_timeout)
                .await?;

            let name = match reply {
                Message::JoinRequest { game } => game,
                other => return Err(ChannelError::unexpected("JoinRequest", &other)),
            };
            if name.trim().is_empty() {
                continue;
            }

            let session = self.catalog.find_or_create(&name).await;
            match session.join(player).await {
                JoinStatus::Locked => continue,
                JoinStatus::Joined | JoinStatus::Waiting => return Ok(()),
            }
        }
    }

    /// Parks while the player is seated. Returns true once the session hands
    /// the player back to the lobby, false if the player is gone.
    async fn wait_while_in_game(&self, player: &Player) -> bool {
        let mut presence = player.watch_presence();
        loop {
            let current = *presence.borrow_and_update();
            match current {
                Presence::Lobby => return true,
                Presence::Gone => return false,
                Presence::InGame => {}
            }

            tokio::select! {
                changed = presence.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
                _ = player.channel().peer_closed() => return false,
            }
        }
    }
}
