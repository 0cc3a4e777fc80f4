use shared::{MAX_PLAYERS, STARTING_LIVES};
use std::time::Duration;

/// Tunables shared by every part of the engine.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Time between liveness sweeps.
    pub ping_interval: Duration,
    /// How long a probed player has to answer PING.
    pub pong_timeout: Duration,
    /// Pause between consecutive rounds of one session.
    pub round_delay: Duration,
    /// Bound on waiting for a guess. `None` waits forever.
    pub guess_timeout: Option<Duration>,
    /// Bound on waiting for the leader's start decision. `None` waits forever.
    pub start_timeout: Option<Duration>,
    /// Bound on waiting for a player to pick a game. `None` waits forever.
    pub lobby_timeout: Option<Duration>,
    pub starting_lives: i32,
    pub max_players: usize,
    /// Lobbies created at startup.
    pub default_lobbies: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(20),
            round_delay: Duration::from_secs(2),
            guess_timeout: Some(Duration::from_secs(120)),
            start_timeout: Some(Duration::from_secs(120)),
            lobby_timeout: Some(Duration::from_secs(300)),
            starting_lives: STARTING_LIVES,
            max_players: MAX_PLAYERS,
            default_lobbies: vec![
                "game1".to_string(),
                "game2".to_string(),
                "game3".to_string(),
            ],
        }
    }
}
