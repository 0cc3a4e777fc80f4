//! Periodic PING/PONG sweep that evicts dead connections
//!
//! Every `ping_interval` the monitor probes each connected player. Probes run
//! concurrently, each isolated in its own task, so one slow or faulty player
//! never delays or aborts the others.
//!
//! A player already inside an exchange (waiting for a guess, a start decision
//! or a lobby choice) is skipped for that sweep: its channel has a read in
//! flight, and a second read would steal its reply.

use crate::channel::ChannelError;
use crate::config::ServerConfig;
use crate::lobby::LobbyCatalog;
use crate::player::Player;
use crate::registry::PlayerRegistry;
use log::{debug, error, info, warn};
use shared::Message;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};

#[derive(Debug)]
enum Probe {
    Alive,
    Busy,
    Dead(ChannelError),
}

/// Outcome of one sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub alive: usize,
    pub skipped: usize,
    pub evicted: Vec<String>,
}

pub struct LivenessMonitor {
    registry: Arc<PlayerRegistry>,
    catalog: Arc<LobbyCatalog>,
    ping_interval: Duration,
    pong_timeout: Duration,
}

impl LivenessMonitor {
    pub fn new(
        registry: Arc<PlayerRegistry>,
        catalog: Arc<LobbyCatalog>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            registry,
            catalog,
            ping_interval: config.ping_interval,
            pong_timeout: config.pong_timeout,
        }
    }

    /// Runs the monitor on its own task until the handle is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut ticker = interval(self.ping_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Skip the first tick since it fires immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let report = self.sweep().await;
            if !report.evicted.is_empty() {
                info!(
                    "Liveness sweep: {} alive, {} busy, evicted {:?}",
                    report.alive, report.skipped, report.evicted
                );
            }
        }
    }

    /// Probes every connected player once and evicts the unresponsive ones.
    pub async fn sweep(&self) -> SweepReport {
        let mut probes = JoinSet::new();
        for player in self.registry.players().await {
            if !player.is_connected() {
                continue;
            }
            let timeout = self.pong_timeout;
            probes.spawn(async move {
                let probe = probe(&player, timeout).await;
                (player, probe)
            });
        }

        let mut report = SweepReport::default();
        while let Some(joined) = probes.join_next().await {
            let (player, probe) = match joined {
                Ok(result) => result,
                Err(e) => {
                    error!("Liveness probe task failed: {}", e);
                    continue;
                }
            };

            match probe {
                Probe::Alive => {
                    debug!("Ping successful for {}", player.nickname());
                    report.alive += 1;
                }
                Probe::Busy => {
                    debug!("Skipping ping for {}: exchange in flight", player.nickname());
                    report.skipped += 1;
                }
                Probe::Dead(cause) => {
                    warn!(
                        "Player {} failed liveness check, disconnecting: {}",
                        player.nickname(),
                        cause
                    );
                    self.evict(&player).await;
                    report.evicted.push(player.nickname().to_string());
                }
            }
        }
        report
    }

    async fn evict(&self, player: &Arc<Player>) {
        self.registry.remove(player).await;
        self.catalog.remove_player(player).await;
    }
}

async fn probe(player: &Player, timeout: Duration) -> Probe {
    match player.try_exchange(Message::Ping, Some(timeout)).await {
        None => Probe::Busy,
        Some(Ok(Message::Pong)) => Probe::Alive,
        Some(Ok(other)) => Probe::Dead(ChannelError::unexpected("Pong", &other)),
        Some(Err(e)) => Probe::Dead(e),
    }
}
