//! # Game Client Library
//!
//! Terminal client for the two-thirds guessing game. It connects to the
//! server over TCP, prints every message it receives and answers prompts
//! (nickname, game choice, start decision, guesses) with lines typed by the
//! player. Liveness probes are answered automatically.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! Owns the connection and the prompt/answer loop. Guesses are checked
//! against the allowed range before they are sent, so the server never sees
//! an out-of-range guess from this client.
//!
//! ### Display Module (`display`)
//! Formats leaderboards, lobby listings and round summaries as text, and
//! parses typed guesses.

pub mod display;
pub mod network;
