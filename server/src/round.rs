//! Round resolution: "two thirds of the average".
//!
//! Guesses are passed in prompt order. Every function here is pure; the
//! session supplies the guesses and applies the outcome to its players.

/// Amount added to the other player's guess when the two-player rule
/// replaces a zero.
const ZERO_GUESS_PENALTY: i32 = 2;

/// Result of resolving one round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundOutcome {
    /// Effective guesses, after the two-player rule.
    pub guesses: Vec<i32>,
    pub target: f64,
    /// Index into `guesses` of the round winner.
    pub winner: usize,
}

/// With exactly two guessers, a zero guess is replaced by the other guess
/// plus two, unless both guessed zero.
pub fn apply_two_player_rule(guesses: &mut [i32]) {
    if let [a, b] = guesses {
        if *a == 0 && *b != 0 {
            *a = *b + ZERO_GUESS_PENALTY;
        } else if *b == 0 && *a != 0 {
            *b = *a + ZERO_GUESS_PENALTY;
        }
    }
}

/// `(sum / count) * 2/3` in real arithmetic. `None` for no guesses.
pub fn target(guesses: &[i32]) -> Option<f64> {
    if guesses.is_empty() {
        return None;
    }
    let sum: f64 = guesses.iter().map(|&g| f64::from(g)).sum();
    Some(sum / guesses.len() as f64 * (2.0 / 3.0))
}

/// Index of the guess closest to `target`. Ties go to the earliest guess.
pub fn pick_winner(guesses: &[i32], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, &guess) in guesses.iter().enumerate() {
        let distance = (f64::from(guess) - target).abs();
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((index, distance)),
        }
    }
    best.map(|(index, _)| index)
}

/// Applies the two-player rule, then computes target and winner.
pub fn resolve(raw_guesses: &[i32]) -> Option<RoundOutcome> {
    let mut guesses = raw_guesses.to_vec();
    apply_two_player_rule(&mut guesses);

    let target = target(&guesses)?;
    let winner = pick_winner(&guesses, target)?;
    Some(RoundOutcome {
        guesses,
        target,
        winner,
    })
}
