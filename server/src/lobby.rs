//! Named collection of game sessions.

use crate::config::ServerConfig;
use crate::player::Player;
use crate::registry::PlayerRegistry;
use crate::session::GameSession;
use log::info;
use shared::GameListing;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct LobbyCatalog {
    sessions: Mutex<Vec<Arc<GameSession>>>,
    registry: Arc<PlayerRegistry>,
    config: Arc<ServerConfig>,
}

impl LobbyCatalog {
    /// Creates the catalog seeded with the configured default lobbies.
    pub fn new(registry: Arc<PlayerRegistry>, config: Arc<ServerConfig>) -> Self {
        let sessions = config
            .default_lobbies
            .iter()
            .map(|name| {
                Arc::new(GameSession::new(
                    name.clone(),
                    Arc::clone(&registry),
                    Arc::clone(&config),
                ))
            })
            .collect();

        Self {
            sessions: Mutex::new(sessions),
            registry,
            config,
        }
    }

    /// One row per session, in creation order.
    pub async fn list(&self) -> Vec<GameListing> {
        let sessions = self.sessions.lock().await.clone();
        let mut listings = Vec::with_capacity(sessions.len());
        for session in &sessions {
            listings.push(session.listing().await);
        }
        listings
    }

    /// Returns the session called `name`, creating a pending one if needed.
    pub async fn find_or_create(&self, name: &str) -> Arc<GameSession> {
        let name = name.trim();
        let mut sessions = self.sessions.lock().await;

        if let Some(session) = sessions.iter().find(|s| s.name() == name) {
            return Arc::clone(session);
        }

        let session = Arc::new(GameSession::new(
            name,
            Arc::clone(&self.registry),
            Arc::clone(&self.config),
        ));
        sessions.push(Arc::clone(&session));
        info!("Created game {}", name);
        session
    }

    /// Removes `player` from every session it is seated in.
    pub async fn remove_player(&self, player: &Arc<Player>) {
        let sessions = self.sessions.lock().await.clone();
        for session in &sessions {
            session.remove_player(player).await;
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
