//! # Game Server Library
//!
//! Authoritative server for "guess two-thirds of the average". Players
//! connect over TCP, identify with a nickname, pick a named game from the
//! lobby and play elimination rounds until one of them is left standing.
//!
//! ## Game Rules
//!
//! Each round every player with lives left guesses an integer in `0..=100`.
//! The target is two-thirds of the mean guess; the guess closest to it wins
//! the round and every other player still in the game loses a life. With
//! exactly two guessers, a guess of 0 is replaced by the other guess plus 2
//! before the target is computed. A player at zero lives is eliminated but
//! keeps receiving round summaries until the game ends. The last player with
//! lives is credited with a win on the leaderboard.
//!
//! ## Architecture Design
//!
//! ### Task Per Concern
//! Every connection is served by its own coordinator task, every running
//! game by its own round-loop task, and a single liveness task probes all
//! players on a fixed interval. Tasks share state through `Arc`-held
//! registries guarded by `tokio` mutexes, never across an `.await` on I/O.
//!
//! ### Typed Channels
//! The engine never touches sockets. Each connection is seen as a
//! [`channel::Channel`] carrying [`shared::Message`] values; the TCP layer in
//! [`network`] pumps length-prefixed bincode frames on and off it. The same
//! channel type backs the in-memory test harnesses.
//!
//! ### One Exchange At A Time
//! Request/reply traffic on a player goes through the player's exchange
//! lock, so a liveness probe can never consume a guess and a round can never
//! consume a PONG. Players already inside an exchange are skipped by the
//! probe for that sweep.
//!
//! ### Fault Isolation
//! A timeout, hang-up or malformed reply on one player evicts that player
//! only. Rounds, lobbies and other connections carry on.
//!
//! ## Module Organization
//!
//! - `channel`: per-connection message queues with timeouts and close
//! - `config`: server tunables and their defaults
//! - `coordinator`: identification and lobby flow for one connection
//! - `leaderboard`: top players by wins
//! - `liveness`: periodic PING/PONG sweep
//! - `lobby`: named game sessions, created on demand
//! - `network`: TCP transport and accept loop
//! - `player`: player identity, counters and exchanges
//! - `registry`: connected players and reconnection records
//! - `round`: pure round resolution
//! - `session`: join, start and round loop of one game
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let server = Server::bind("127.0.0.1:13337", ServerConfig::default()).await?;
//!     server.run().await;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod config;
pub mod coordinator;
pub mod leaderboard;
pub mod liveness;
pub mod lobby;
pub mod network;
pub mod player;
pub mod registry;
pub mod round;
pub mod session;
