use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use uuid::Uuid;

pub mod codec;

pub use codec::{read_frame, write_frame, FrameError, MAX_FRAME_LEN};

pub const DEFAULT_PORT: u16 = 13337;
pub const STARTING_LIVES: i32 = 5;
pub const MAX_PLAYERS: usize = 6;
pub const MIN_PLAYERS_TO_START: usize = 2;
pub const LEADERBOARD_SIZE: usize = 5;
pub const GUESS_RANGE: RangeInclusive<i32> = 0..=100;

/// Every message exchanged over a player's connection.
///
/// The set is closed: both ends dispatch on the variant, never on the text
/// carried inside it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Message {
    // Identification
    IdentifySubmit {
        nickname: String,
    },
    IdentifyAck {
        ticket_id: Uuid,
        message: String,
    },
    IdentifyRejected {
        reason: String,
    },

    // Lobby
    LeaderboardSnapshot {
        entries: Vec<LeaderboardEntry>,
    },
    ConnectedPlayers {
        names: Vec<String>,
    },
    GameList {
        games: Vec<GameListing>,
    },
    JoinRequest {
        game: String,
    },
    JoinAck {
        status: JoinStatus,
        message: String,
    },
    StartPrompt {
        lobby_size: usize,
        message: String,
    },
    StartResponse {
        answer: String,
    },

    // Rounds
    RoundStart {
        round: u32,
    },
    GuessSubmit {
        guess: i32,
    },
    Eliminated {
        round: u32,
        message: String,
    },
    RoundResult {
        round: u32,
        standings: Vec<PlayerStanding>,
        winner: Option<String>,
        eliminated: Vec<String>,
    },
    GameOver {
        winner: Option<String>,
        message: String,
    },

    // Liveness
    Ping,
    Pong,
}

impl Message {
    /// Short variant name used in logs and protocol errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::IdentifySubmit { .. } => "IdentifySubmit",
            Message::IdentifyAck { .. } => "IdentifyAck",
            Message::IdentifyRejected { .. } => "IdentifyRejected",
            Message::LeaderboardSnapshot { .. } => "LeaderboardSnapshot",
            Message::ConnectedPlayers { .. } => "ConnectedPlayers",
            Message::GameList { .. } => "GameList",
            Message::JoinRequest { .. } => "JoinRequest",
            Message::JoinAck { .. } => "JoinAck",
            Message::StartPrompt { .. } => "StartPrompt",
            Message::StartResponse { .. } => "StartResponse",
            Message::RoundStart { .. } => "RoundStart",
            Message::GuessSubmit { .. } => "GuessSubmit",
            Message::Eliminated { .. } => "Eliminated",
            Message::RoundResult { .. } => "RoundResult",
            Message::GameOver { .. } => "GameOver",
            Message::Ping => "Ping",
            Message::Pong => "Pong",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub name: String,
    pub wins: u32,
}

impl fmt::Display for LeaderboardEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - Wins: {}", self.name, self.wins)
    }
}

/// One row of the lobby table.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GameListing {
    pub name: String,
    pub occupancy: usize,
    pub capacity: usize,
    pub is_active: bool,
    pub is_locked: bool,
}

/// A roster member as reported in a round summary.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlayerStanding {
    pub name: String,
    pub lives: i32,
    pub last_guess: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum JoinStatus {
    /// Seated, and enough players are present for the leader to start.
    Joined,
    /// Seated, waiting for a second player.
    Waiting,
    /// Rejected: the session is full or already running.
    Locked,
}

/// Returns true if the answer to a start prompt means "start now".
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affirmative_answers() {
        assert!(is_affirmative("yes"));
        assert!(is_affirmative("  YES\n"));
        assert!(is_affirmative("Yes"));
        assert!(!is_affirmative("no"));
        assert!(!is_affirmative("y"));
        assert!(!is_affirmative(""));
    }

    #[test]
    fn test_guess_range_bounds() {
        assert!(GUESS_RANGE.contains(&0));
        assert!(GUESS_RANGE.contains(&100));
        assert!(!GUESS_RANGE.contains(&-1));
        assert!(!GUESS_RANGE.contains(&101));
    }

    #[test]
    fn test_leaderboard_entry_display() {
        let entry = LeaderboardEntry {
            name: "alice".to_string(),
            wins: 3,
        };
        assert_eq!(entry.to_string(), "alice - Wins: 3");
    }

    #[test]
    fn test_message_kind() {
        assert_eq!(Message::Ping.kind(), "Ping");
        assert_eq!(Message::GuessSubmit { guess: 4 }.kind(), "GuessSubmit");
        assert_eq!(
            Message::JoinRequest {
                game: "g1".to_string()
            }
            .kind(),
            "JoinRequest"
        );
    }

    #[test]
    fn test_packet_serialization_round_result() {
        let packet = Message::RoundResult {
            round: 3,
            standings: vec![
                PlayerStanding {
                    name: "p1".to_string(),
                    lives: 5,
                    last_guess: Some(30),
                },
                PlayerStanding {
                    name: "p2".to_string(),
                    lives: 4,
                    last_guess: None,
                },
            ],
            winner: Some("p1".to_string()),
            eliminated: vec!["p3".to_string()],
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Message = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Message::RoundResult {
                round,
                standings,
                winner,
                eliminated,
            } => {
                assert_eq!(round, 3);
                assert_eq!(standings.len(), 2);
                assert_eq!(standings[1].last_guess, None);
                assert_eq!(winner.as_deref(), Some("p1"));
                assert_eq!(eliminated, vec!["p3".to_string()]);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_identify_ack() {
        let ticket_id = Uuid::new_v4();
        let packet = Message::IdentifyAck {
            ticket_id,
            message: "welcome".to_string(),
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Message = bincode::deserialize(&serialized).unwrap();
        assert_eq!(deserialized, packet);
    }
}
