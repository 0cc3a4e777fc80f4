//! Text rendering of server messages and parsing of typed answers.

use shared::{GameListing, LeaderboardEntry, PlayerStanding, GUESS_RANGE};

pub fn leaderboard(entries: &[LeaderboardEntry]) -> String {
    if entries.is_empty() {
        return "Leaderboard: no games played yet".to_string();
    }
    let mut out = String::from("Leaderboard:");
    for (rank, entry) in entries.iter().enumerate() {
        out.push_str(&format!("\n  {}. {}", rank + 1, entry));
    }
    out
}

pub fn connected_players(names: &[String]) -> String {
    format!("Connected players ({}): {}", names.len(), names.join(", "))
}

pub fn game_list(games: &[GameListing]) -> String {
    let mut out = String::from("Available games:");
    for game in games {
        let status = if game.is_active {
            " [in progress]"
        } else if game.is_locked {
            " [locked]"
        } else {
            ""
        };
        out.push_str(&format!(
            "\n  {} ({}/{}){}",
            game.name, game.occupancy, game.capacity, status
        ));
    }
    out.push_str("\nEnter the name of a game to join, or a new name to create one:");
    out
}

pub fn round_result(
    round: u32,
    standings: &[PlayerStanding],
    winner: Option<&str>,
    eliminated: &[String],
) -> String {
    let mut out = format!("Round {} results:", round);
    for standing in standings {
        let guess = standing
            .last_guess
            .map(|g| g.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "\n  {:<16} guess {:>3}  lives {}",
            standing.name, guess, standing.lives
        ));
    }
    if let Some(winner) = winner {
        out.push_str(&format!("\nRound winner: {}", winner));
    }
    if !eliminated.is_empty() {
        out.push_str(&format!("\nEliminated: {}", eliminated.join(", ")));
    }
    out
}

/// Parses a guess typed by the player. The error is the hint to show.
pub fn parse_guess(input: &str) -> Result<i32, String> {
    let guess: i32 = input
        .trim()
        .parse()
        .map_err(|_| format!("{:?} is not a whole number", input.trim()))?;
    if GUESS_RANGE.contains(&guess) {
        Ok(guess)
    } else {
        Err(format!(
            "Guess must be between {} and {}",
            GUESS_RANGE.start(),
            GUESS_RANGE.end()
        ))
    }
}
