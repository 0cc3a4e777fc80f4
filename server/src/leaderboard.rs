use crate::player::Player;
use shared::{LeaderboardEntry, LEADERBOARD_SIZE};
use std::sync::Arc;

/// Top players by wins, most wins first.
///
/// The sort is stable, so players with equal wins keep registration order.
pub fn compute(players: &[Arc<Player>]) -> Vec<LeaderboardEntry> {
    let mut ranked: Vec<&Arc<Player>> = players.iter().collect();
    ranked.sort_by(|a, b| b.wins().cmp(&a.wins()));

    ranked
        .into_iter()
        .take(LEADERBOARD_SIZE)
        .map(|p| LeaderboardEntry {
            name: p.ticket().pseudo_name().to_string(),
            wins: p.wins(),
        })
        .collect()
}
