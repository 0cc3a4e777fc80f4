//! Game session: lobby, round loop and elimination bookkeeping
//!
//! A [`GameSession`] moves through three states:
//!
//! - **Pending**: the roster is forming. Each join that leaves two or more
//!   players seated asks the leader (`roster[0]`) whether to start.
//! - **Active**: a spawned round loop owns prompting. Rounds repeat while
//!   more than one player still has lives.
//! - **Finished**: the survivor is credited with a win, everyone is told the
//!   game is over and released back to the lobby, and the session resets to
//!   Pending under the same name.
//!
//! Two locks guard a session. `roster` protects the player lists and flags
//! and is only held for short, non-blocking sections so lobby listings never
//! wait on a round. `turn` serializes the slow work (a join that prompts the
//! leader, a whole round) so the two never interleave.
//!
//! A fault on any player's channel evicts that player only; the round goes on
//! with whoever is left.

use crate::channel::ChannelError;
use crate::config::ServerConfig;
use crate::player::{Player, Presence};
use crate::registry::PlayerRegistry;
use crate::round;
use log::{debug, info, warn};
use shared::{is_affirmative, GameListing, JoinStatus, Message, GUESS_RANGE, MIN_PLAYERS_TO_START};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    Active,
    Finished,
}

struct Roster {
    /// Players still guessing. Index 0 leads.
    players: Vec<Arc<Player>>,
    /// Everyone seated this play-through, eliminated players included.
    audience: Vec<Arc<Player>>,
    state: SessionState,
    locked: bool,
    round: u32,
    eliminated: Vec<String>,
}

impl Roster {
    fn new() -> Self {
        Self {
            players: Vec::new(),
            audience: Vec::new(),
            state: SessionState::Pending,
            locked: false,
            round: 0,
            eliminated: Vec::new(),
        }
    }

    fn remove(&mut self, player: &Arc<Player>) -> bool {
        let before = self.audience.len() + self.players.len();
        self.players.retain(|p| !Arc::ptr_eq(p, player));
        self.audience.retain(|p| !Arc::ptr_eq(p, player));
        before != self.audience.len() + self.players.len()
    }
}

pub struct GameSession {
    name: String,
    roster: Mutex<Roster>,
    turn: Mutex<()>,
    registry: Arc<PlayerRegistry>,
    config: Arc<ServerConfig>,
}

impl GameSession {
    pub fn new(
        name: impl Into<String>,
        registry: Arc<PlayerRegistry>,
        config: Arc<ServerConfig>,
    ) -> Self {
        Self {
            name: name.into(),
            roster: Mutex::new(Roster::new()),
            turn: Mutex::new(()),
            registry,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn state(&self) -> SessionState {
        self.roster.lock().await.state
    }

    pub async fn is_locked(&self) -> bool {
        self.roster.lock().await.locked
    }

    pub async fn round_number(&self) -> u32 {
        self.roster.lock().await.round
    }

    pub async fn roster_names(&self) -> Vec<String> {
        let roster = self.roster.lock().await;
        roster.players.iter().map(|p| p.nickname().to_string()).collect()
    }

    pub async fn audience_names(&self) -> Vec<String> {
        let roster = self.roster.lock().await;
        roster.audience.iter().map(|p| p.nickname().to_string()).collect()
    }

    pub async fn eliminated_names(&self) -> Vec<String> {
        self.roster.lock().await.eliminated.clone()
    }

    pub async fn listing(&self) -> GameListing {
        let roster = self.roster.lock().await;
        GameListing {
            name: self.name.clone(),
            occupancy: roster.players.len(),
            capacity: self.config.max_players,
            is_active: roster.state == SessionState::Active,
            is_locked: roster.locked,
        }
    }

    /// Seats `player`, or refuses it with [`JoinStatus::Locked`].
    ///
    /// The player always receives a `JoinAck`. When the join leaves at least
    /// two players seated the leader is asked to start before this returns.
    pub async fn join(self: &Arc<Self>, player: &Arc<Player>) -> JoinStatus {
        // Refuse quickly rather than waiting out a round.
        if self.is_locked().await {
            return self.refuse(player).await;
        }

        let _turn = self.turn.lock().await;

        let (status, leader, lobby_size) = {
            let mut roster = self.roster.lock().await;
            if roster.locked || roster.state != SessionState::Pending {
                drop(roster);
                return self.refuse(player).await;
            }

            player.reset_lives(self.config.starting_lives);
            player.set_last_choice(None);
            player.set_presence(Presence::InGame);
            roster.players.push(Arc::clone(player));
            roster.audience.push(Arc::clone(player));

            if roster.players.len() >= self.config.max_players {
                roster.locked = true;
                info!("Game {} is full and now locked", self.name);
            }

            if roster.players.len() >= MIN_PLAYERS_TO_START {
                (
                    JoinStatus::Joined,
                    Some(Arc::clone(&roster.players[0])),
                    roster.audience.len(),
                )
            } else {
                (JoinStatus::Waiting, None, roster.audience.len())
            }
        };

        info!(
            "Player {} joined game {} ({} seated)",
            player.nickname(),
            self.name,
            lobby_size
        );

        let message = match status {
            JoinStatus::Waiting => "Waiting for game to start...".to_string(),
            _ => format!("Joined game: {}", self.name),
        };
        if let Err(e) = player.send(Message::JoinAck { status, message }).await {
            self.evict(player, e).await;
            return status;
        }

        if let Some(leader) = leader {
            self.prompt_leader(&leader, lobby_size).await;
        }

        status
    }

    async fn refuse(&self, player: &Arc<Player>) -> JoinStatus {
        debug!(
            "Refused {} from locked game {}",
            player.nickname(),
            self.name
        );
        let ack = Message::JoinAck {
            status: JoinStatus::Locked,
            message: "Game is already started or locked. Please choose another game.".to_string(),
        };
        if let Err(e) = player.send(ack).await {
            warn!(
                "Could not notify {} of locked game: {}",
                player.nickname(),
                e
            );
        }
        JoinStatus::Locked
    }

    async fn prompt_leader(self: &Arc<Self>, leader: &Arc<Player>, lobby_size: usize) {
        let prompt = Message::StartPrompt {
            lobby_size,
            message: format!(
                "#Players in Lobby: {}\nLeader, do you want to start the game? (yes or no)",
                lobby_size
            ),
        };

        match leader.exchange(prompt, self.config.start_timeout).await {
            Ok(Message::StartResponse { answer }) if is_affirmative(&answer) => {
                self.start().await;
            }
            Ok(Message::StartResponse { answer }) => {
                info!(
                    "Leader {} declined to start game {} ({:?})",
                    leader.nickname(),
                    self.name,
                    answer.trim()
                );
            }
            Ok(other) => {
                self.evict(leader, ChannelError::unexpected("StartResponse", &other))
                    .await;
            }
            Err(e) => self.evict(leader, e).await,
        }
    }

    /// Pending -> Active, and spawn the round loop.
    async fn start(self: &Arc<Self>) {
        {
            let mut roster = self.roster.lock().await;
            if roster.state != SessionState::Pending
                || roster.players.len() < MIN_PLAYERS_TO_START
            {
                return;
            }
            roster.state = SessionState::Active;
            roster.locked = true;
        }

        info!("Game {} started", self.name);
        tokio::spawn(Arc::clone(self).run_rounds());
    }

    async fn keep_playing(&self) -> bool {
        let roster = self.roster.lock().await;
        roster.state == SessionState::Active && roster.players.len() > 1
    }

    /// Round loop of an active session. Ends only when at most one player is
    /// left guessing.
    pub(crate) async fn run_rounds(self: Arc<Self>) {
        while self.keep_playing().await {
            self.play_round().await;
            if !self.keep_playing().await {
                break;
            }
            tokio::time::sleep(self.config.round_delay).await;
        }
        self.finish().await;
    }

    async fn play_round(&self) {
        let _turn = self.turn.lock().await;

        let (round, audience) = {
            let mut roster = self.roster.lock().await;
            roster.round += 1;
            (roster.round, roster.audience.clone())
        };
        debug!("Game {} round {} begins", self.name, round);

        let mut guessers: Vec<Arc<Player>> = Vec::new();
        let mut raw_guesses: Vec<i32> = Vec::new();

        for player in &audience {
            if !player.is_connected() {
                continue;
            }

            if player.lives() > 0 {
                player.set_last_choice(None);
                match self.collect_guess(player, round).await {
                    Ok(guess) => {
                        player.set_last_choice(Some(guess));
                        guessers.push(Arc::clone(player));
                        raw_guesses.push(guess);
                    }
                    Err(e) => self.evict(player, e).await,
                }
            } else {
                let notice = Message::Eliminated {
                    round,
                    message: format!("You are eliminated. Round {} has begun.", round),
                };
                self.roster
                    .lock()
                    .await
                    .players
                    .retain(|p| !Arc::ptr_eq(p, player));
                if let Err(e) = player.send(notice).await {
                    self.evict(player, e).await;
                }
            }
        }

        let (outcome, winner, standings, eliminated, audience) = {
            let mut roster = self.roster.lock().await;

            // Players evicted after answering no longer take part.
            let (guessers, raw_guesses): (Vec<Arc<Player>>, Vec<i32>) = guessers
                .into_iter()
                .zip(raw_guesses)
                .filter(|(player, _)| roster.players.iter().any(|p| Arc::ptr_eq(p, player)))
                .unzip();

            let outcome = round::resolve(&raw_guesses);
            let winner = outcome.as_ref().map(|o| Arc::clone(&guessers[o.winner]));
            if let Some(outcome) = &outcome {
                for (player, guess) in guessers.iter().zip(&outcome.guesses) {
                    player.set_last_choice(Some(*guess));
                }
            }

            let mut newly_eliminated = Vec::new();
            for player in &roster.players {
                if winner.as_ref().is_some_and(|w| Arc::ptr_eq(w, player)) {
                    continue;
                }
                if player.lose_life() <= 0 {
                    newly_eliminated.push(player.nickname().to_string());
                }
            }
            for name in &newly_eliminated {
                info!("Player {} eliminated from game {}", name, self.name);
            }
            roster.eliminated.extend(newly_eliminated);

            let standings = roster.players.iter().map(|p| p.standing()).collect();
            roster.players.retain(|p| p.lives() > 0);
            (
                outcome,
                winner,
                standings,
                roster.eliminated.clone(),
                roster.audience.clone(),
            )
        };

        if let (Some(outcome), Some(winner)) = (&outcome, &winner) {
            info!(
                "Game {} round {}: target {:.2}, winner {}",
                self.name,
                round,
                outcome.target,
                winner.nickname()
            );
        }

        let summary = Message::RoundResult {
            round,
            standings,
            winner: winner.map(|w| w.nickname().to_string()),
            eliminated,
        };
        self.broadcast(&audience, summary).await;
    }

    async fn collect_guess(&self, player: &Player, round: u32) -> Result<i32, ChannelError> {
        let reply = player
            .exchange(Message::RoundStart { round }, self.config.guess_timeout)
            .await?;
        match reply {
            Message::GuessSubmit { guess } if GUESS_RANGE.contains(&guess) => Ok(guess),
            Message::GuessSubmit { guess } => Err(ChannelError::Protocol(format!(
                "guess {} outside {:?}",
                guess, GUESS_RANGE
            ))),
            other => Err(ChannelError::unexpected("GuessSubmit", &other)),
        }
    }

    /// Active -> Finished -> Pending.
    async fn finish(&self) {
        let (winner, audience) = {
            let mut roster = self.roster.lock().await;
            roster.state = SessionState::Finished;
            let winner = match roster.players.as_slice() {
                [survivor] => Some(Arc::clone(survivor)),
                _ => None,
            };
            (winner, roster.audience.clone())
        };

        let message = match &winner {
            Some(winner) => {
                let wins = winner.record_win();
                info!(
                    "Game {} over: {} wins (total {})",
                    self.name,
                    winner.nickname(),
                    wins
                );
                format!("Game over. {} wins!", winner.nickname())
            }
            None => {
                info!("Game {} over without a winner", self.name);
                "Game over".to_string()
            }
        };

        self.broadcast(
            &audience,
            Message::GameOver {
                winner: winner.map(|w| w.nickname().to_string()),
                message,
            },
        )
        .await;

        {
            let mut roster = self.roster.lock().await;
            *roster = Roster::new();
        }
        for player in &audience {
            player.set_presence(Presence::Lobby);
        }
        debug!("Game {} reset to pending", self.name);
    }

    async fn broadcast(&self, audience: &[Arc<Player>], message: Message) {
        for player in audience {
            if !player.is_connected() {
                continue;
            }
            if let Err(e) = player.send(message.clone()).await {
                self.evict(player, e).await;
            }
        }
    }

    /// Drops `player` from both rosters. Returns false if it was not seated.
    pub async fn remove_player(&self, player: &Arc<Player>) -> bool {
        let removed = self.roster.lock().await.remove(player);
        if removed {
            info!("Player {} left game {}", player.nickname(), self.name);
        }
        removed
    }

    async fn evict(&self, player: &Arc<Player>, cause: ChannelError) {
        warn!(
            "Evicting {} from game {}: {}",
            player.nickname(),
            self.name,
            cause
        );
        self.registry.remove(player).await;
        self.remove_player(player).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Channel, Endpoint};
    use std::time::Duration;

    fn test_config() -> Arc<ServerConfig> {
        Arc::new(ServerConfig {
            round_delay: Duration::from_millis(5),
            guess_timeout: Some(Duration::from_secs(2)),
            start_timeout: Some(Duration::from_secs(2)),
            ..ServerConfig::default()
        })
    }

    fn test_session(name: &str) -> (Arc<GameSession>, Arc<PlayerRegistry>) {
        let registry = Arc::new(PlayerRegistry::new(5));
        let session = Arc::new(GameSession::new(name, Arc::clone(&registry), test_config()));
        (session, registry)
    }

    async fn connect(registry: &PlayerRegistry, name: &str) -> (Arc<Player>, Endpoint) {
        let (channel, endpoint) = Channel::pair(name);
        let player = registry
            .find_or_create(name, Arc::new(channel))
            .await
            .unwrap();
        (player, endpoint)
    }

    async fn expect(endpoint: &mut Endpoint) -> Message {
        tokio::time::timeout(Duration::from_secs(2), endpoint.receiver.recv())
            .await
            .expect("timed out waiting for message")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_first_player_waits() {
        let (session, registry) = test_session("g1");
        let (p1, mut e1) = connect(&registry, "p1").await;

        assert_eq!(session.join(&p1).await, JoinStatus::Waiting);
        match expect(&mut e1).await {
            Message::JoinAck { status, .. } => assert_eq!(status, JoinStatus::Waiting),
            other => panic!("Unexpected message: {:?}", other),
        }
        assert_eq!(p1.presence(), Presence::InGame);
        assert_eq!(session.state().await, SessionState::Pending);
    }

    #[tokio::test]
    async fn test_leader_declines_then_session_stays_pending() {
        let (session, registry) = test_session("g1");
        let (p1, mut e1) = connect(&registry, "p1").await;
        let (p2, mut e2) = connect(&registry, "p2").await;

        session.join(&p1).await;
        expect(&mut e1).await;

        let join = {
            let session = Arc::clone(&session);
            let p2 = Arc::clone(&p2);
            tokio::spawn(async move { session.join(&p2).await })
        };

        match expect(&mut e2).await {
            Message::JoinAck { status, .. } => assert_eq!(status, JoinStatus::Joined),
            other => panic!("Unexpected message: {:?}", other),
        }
        match expect(&mut e1).await {
            Message::StartPrompt { lobby_size, .. } => assert_eq!(lobby_size, 2),
            other => panic!("Unexpected message: {:?}", other),
        }
        e1.sender
            .send(Message::StartResponse {
                answer: "No".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(join.await.unwrap(), JoinStatus::Joined);
        assert_eq!(session.state().await, SessionState::Pending);
        assert!(!session.is_locked().await);
        assert_eq!(session.roster_names().await, vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_full_session_locks() {
        let (session, registry) = test_session("full");
        let mut endpoints = Vec::new();

        for i in 0..6 {
            let (player, endpoint) = connect(&registry, &format!("p{}", i)).await;
            endpoints.push(endpoint);

            let responder = if i >= 1 {
                // Leader answers "no" to every prompt.
                let mut leader = endpoints.remove(0);
                Some(tokio::spawn(async move {
                    loop {
                        match leader.receiver.recv().await {
                            Some(Message::StartPrompt { .. }) => {
                                leader
                                    .sender
                                    .send(Message::StartResponse {
                                        answer: "no".to_string(),
                                    })
                                    .await
                                    .unwrap();
                                return leader;
                            }
                            Some(_) => continue,
                            None => return leader,
                        }
                    }
                }))
            } else {
                None
            };

            session.join(&player).await;
            if let Some(responder) = responder {
                endpoints.insert(0, responder.await.unwrap());
            }
        }

        // The leader declined with every seat taken: locked, yet still pending.
        assert!(session.is_locked().await);
        assert_eq!(session.state().await, SessionState::Pending);
        assert_eq!(session.listing().await.occupancy, 6);

        let (late, mut late_endpoint) = connect(&registry, "late").await;
        assert_eq!(session.join(&late).await, JoinStatus::Locked);
        match expect(&mut late_endpoint).await {
            Message::JoinAck { status, .. } => assert_eq!(status, JoinStatus::Locked),
            other => panic!("Unexpected message: {:?}", other),
        }
        assert_eq!(late.presence(), Presence::Lobby);

        // A freed seat does not unlock the session.
        let leaver = registry.players().await[1].clone();
        session.remove_player(&leaver).await;
        assert_eq!(session.join(&late).await, JoinStatus::Locked);
    }

    #[tokio::test]
    async fn test_round_resolution_and_lives() {
        let (session, registry) = test_session("g1");
        let (p1, mut e1) = connect(&registry, "p1").await;
        let (p2, mut e2) = connect(&registry, "p2").await;

        {
            let mut roster = session.roster.lock().await;
            roster.players = vec![Arc::clone(&p1), Arc::clone(&p2)];
            roster.audience = roster.players.clone();
            roster.state = SessionState::Active;
            roster.locked = true;
        }

        let round = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.play_round().await })
        };

        assert_eq!(expect(&mut e1).await, Message::RoundStart { round: 1 });
        e1.sender
            .send(Message::GuessSubmit { guess: 30 })
            .await
            .unwrap();
        assert_eq!(expect(&mut e2).await, Message::RoundStart { round: 1 });
        e2.sender
            .send(Message::GuessSubmit { guess: 90 })
            .await
            .unwrap();

        round.await.unwrap();

        match expect(&mut e1).await {
            Message::RoundResult {
                round,
                standings,
                winner,
                eliminated,
            } => {
                assert_eq!(round, 1);
                assert_eq!(winner.as_deref(), Some("p1"));
                assert_eq!(standings[0].last_guess, Some(30));
                assert_eq!(standings[1].lives, 4);
                assert!(eliminated.is_empty());
            }
            other => panic!("Unexpected message: {:?}", other),
        }
        assert!(matches!(
            expect(&mut e2).await,
            Message::RoundResult { .. }
        ));
        assert_eq!(p1.lives(), 5);
        assert_eq!(p2.lives(), 4);
    }

    #[tokio::test]
    async fn test_out_of_range_guess_evicts_sender() {
        let (session, registry) = test_session("g1");
        let (p1, mut e1) = connect(&registry, "p1").await;
        let (p2, mut e2) = connect(&registry, "p2").await;
        let (p3, mut e3) = connect(&registry, "p3").await;

        {
            let mut roster = session.roster.lock().await;
            roster.players = vec![Arc::clone(&p1), Arc::clone(&p2), Arc::clone(&p3)];
            roster.audience = roster.players.clone();
            roster.state = SessionState::Active;
        }

        let round = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.play_round().await })
        };

        expect(&mut e1).await;
        e1.sender
            .send(Message::GuessSubmit { guess: 150 })
            .await
            .unwrap();
        expect(&mut e2).await;
        e2.sender
            .send(Message::GuessSubmit { guess: 10 })
            .await
            .unwrap();
        expect(&mut e3).await;
        e3.sender
            .send(Message::GuessSubmit { guess: 20 })
            .await
            .unwrap();
        round.await.unwrap();

        assert!(!p1.is_connected());
        assert!(e1.is_closed());
        assert_eq!(session.roster_names().await, vec!["p2", "p3"]);
        assert_eq!(registry.snapshot_connected_names().await, vec!["p2", "p3"]);

        // target = 15 * 2/3 = 10, p2 wins
        assert_eq!(p2.lives(), 5);
        assert_eq!(p3.lives(), 4);
    }

    #[tokio::test]
    async fn test_guess_of_evicted_player_is_discarded() {
        let (session, registry) = test_session("g1");
        let (p1, mut e1) = connect(&registry, "p1").await;
        let (p2, mut e2) = connect(&registry, "p2").await;
        let (p3, mut e3) = connect(&registry, "p3").await;

        {
            let mut roster = session.roster.lock().await;
            roster.players = vec![Arc::clone(&p1), Arc::clone(&p2), Arc::clone(&p3)];
            roster.audience = roster.players.clone();
            roster.state = SessionState::Active;
        }

        let round = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.play_round().await })
        };

        expect(&mut e1).await;
        e1.sender
            .send(Message::GuessSubmit { guess: 10 })
            .await
            .unwrap();

        // p1 drops out while p2 is still being asked.
        assert_eq!(expect(&mut e2).await, Message::RoundStart { round: 1 });
        registry.remove(&p1).await;
        session.remove_player(&p1).await;

        e2.sender
            .send(Message::GuessSubmit { guess: 90 })
            .await
            .unwrap();
        expect(&mut e3).await;
        e3.sender
            .send(Message::GuessSubmit { guess: 80 })
            .await
            .unwrap();
        round.await.unwrap();

        match expect(&mut e3).await {
            Message::RoundResult {
                standings, winner, ..
            } => {
                // Only 90 and 80 count: target 56.67, p3 is closer.
                assert_eq!(winner.as_deref(), Some("p3"));
                let names: Vec<&str> = standings.iter().map(|s| s.name.as_str()).collect();
                assert_eq!(names, vec!["p2", "p3"]);
            }
            other => panic!("Unexpected message: {:?}", other),
        }
        assert_eq!(p2.lives(), 4);
        assert_eq!(p3.lives(), 5);
    }

    #[tokio::test]
    async fn test_running_session_refuses_join_with_free_seats() {
        let (session, registry) = test_session("g1");
        let (p1, mut e1) = connect(&registry, "p1").await;
        let (p2, mut e2) = connect(&registry, "p2").await;
        let (late, mut late_endpoint) = connect(&registry, "late").await;

        session.join(&p1).await;
        expect(&mut e1).await;

        let join = {
            let session = Arc::clone(&session);
            let p2 = Arc::clone(&p2);
            tokio::spawn(async move { session.join(&p2).await })
        };
        expect(&mut e2).await;
        assert!(matches!(
            expect(&mut e1).await,
            Message::StartPrompt { .. }
        ));
        e1.sender
            .send(Message::StartResponse {
                answer: "yes".to_string(),
            })
            .await
            .unwrap();
        join.await.unwrap();

        assert_eq!(session.state().await, SessionState::Active);
        let listing = session.listing().await;
        assert!(listing.is_active);
        assert!(listing.occupancy < listing.capacity);

        assert_eq!(session.join(&late).await, JoinStatus::Locked);
        match expect(&mut late_endpoint).await {
            Message::JoinAck { status, .. } => assert_eq!(status, JoinStatus::Locked),
            other => panic!("Unexpected message: {:?}", other),
        }
        assert_eq!(session.roster_names().await, vec!["p1", "p2"]);
        assert_eq!(late.presence(), Presence::Lobby);
    }

    #[tokio::test]
    async fn test_elimination_and_game_over() {
        let (session, registry) = test_session("g1");
        let (p1, mut e1) = connect(&registry, "p1").await;
        let (p2, mut e2) = connect(&registry, "p2").await;
        p2.reset_lives(1);

        {
            let mut roster = session.roster.lock().await;
            roster.players = vec![Arc::clone(&p1), Arc::clone(&p2)];
            roster.audience = roster.players.clone();
            roster.state = SessionState::Active;
            roster.locked = true;
        }

        let game = tokio::spawn(Arc::clone(&session).run_rounds());

        expect(&mut e1).await;
        e1.sender
            .send(Message::GuessSubmit { guess: 10 })
            .await
            .unwrap();
        expect(&mut e2).await;
        e2.sender
            .send(Message::GuessSubmit { guess: 80 })
            .await
            .unwrap();

        game.await.unwrap();

        match expect(&mut e2).await {
            Message::RoundResult { eliminated, .. } => assert_eq!(eliminated, vec!["p2"]),
            other => panic!("Unexpected message: {:?}", other),
        }
        match expect(&mut e2).await {
            Message::GameOver { winner, .. } => assert_eq!(winner.as_deref(), Some("p1")),
            other => panic!("Unexpected message: {:?}", other),
        }

        assert_eq!(p1.wins(), 1);
        assert_eq!(p2.wins(), 0);
        assert_eq!(session.state().await, SessionState::Pending);
        assert!(!session.is_locked().await);
        assert!(session.roster_names().await.is_empty());
        assert!(session.eliminated_names().await.is_empty());
        assert_eq!(session.round_number().await, 0);
        assert_eq!(p1.presence(), Presence::Lobby);
        assert_eq!(p2.presence(), Presence::Lobby);
    }

    #[tokio::test]
    async fn test_eliminated_player_keeps_receiving_broadcasts() {
        let (session, registry) = test_session("g1");
        let (p1, mut e1) = connect(&registry, "p1").await;
        let (p2, mut e2) = connect(&registry, "p2").await;
        let (p3, mut e3) = connect(&registry, "p3").await;
        p3.reset_lives(0);

        {
            let mut roster = session.roster.lock().await;
            roster.players = vec![Arc::clone(&p1), Arc::clone(&p2), Arc::clone(&p3)];
            roster.audience = roster.players.clone();
            roster.state = SessionState::Active;
        }

        let round = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.play_round().await })
        };

        expect(&mut e1).await;
        e1.sender
            .send(Message::GuessSubmit { guess: 0 })
            .await
            .unwrap();
        expect(&mut e2).await;
        e2.sender
            .send(Message::GuessSubmit { guess: 40 })
            .await
            .unwrap();

        assert!(matches!(
            expect(&mut e3).await,
            Message::Eliminated { round: 1, .. }
        ));
        round.await.unwrap();
        assert!(matches!(
            expect(&mut e3).await,
            Message::RoundResult { .. }
        ));

        assert_eq!(session.roster_names().await, vec!["p1", "p2"]);
        assert_eq!(session.audience_names().await, vec!["p1", "p2", "p3"]);
        // Two guessers: p1's zero became 42, target 27.33, p2 wins.
        assert_eq!(p1.last_choice(), Some(42));
        assert_eq!(p1.lives(), 4);
        assert_eq!(p2.lives(), 5);
    }
}
