//! Fixed-rate loop task that owns the simulation

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::config::GameConfig;
use crate::util::time::Timer;

use super::simulation::Simulation;
use super::snapshot::StatusBoard;
use super::GameCommand;

/// Commands buffered between sessions and the loop
const COMMAND_BUFFER: usize = 1024;

/// Handle to the running game loop
#[derive(Clone)]
pub struct GameHandle {
    command_tx: mpsc::Sender<GameCommand>,
    status_rx: watch::Receiver<StatusBoard>,
}

impl GameHandle {
    /// Queue a command for the loop. Returns false once the loop has stopped.
    pub async fn send(&self, command: GameCommand) -> bool {
        self.command_tx.send(command).await.is_ok()
    }

    /// Latest status published by the loop
    pub fn status(&self) -> StatusBoard {
        self.status_rx.borrow().clone()
    }
}

/// The authoritative game loop
pub struct GameLoop {
    sim: Simulation,
    command_rx: mpsc::Receiver<GameCommand>,
    status_tx: watch::Sender<StatusBoard>,
}

impl GameLoop {
    pub fn new(config: GameConfig) -> (Self, GameHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let sim = Simulation::new(config);
        let (status_tx, status_rx) = watch::channel(sim.status());

        let handle = GameHandle {
            command_tx,
            status_rx,
        };
        let game_loop = Self {
            sim,
            command_rx,
            status_tx,
        };

        (game_loop, handle)
    }

    /// Run until every handle is dropped.
    ///
    /// Commands are applied as they arrive and ticks fire on the interval.
    /// Both run on this task, one at a time, each to completion.
    pub async fn run(mut self) {
        let config = self.sim.config().clone();
        let dt = config.tick_delta();
        let tick_duration = Duration::from_secs_f64(1.0 / f64::from(config.tick_rate));
        let mut ticker = interval(tick_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            tick_rate = config.tick_rate,
            half_arena = config.half_arena,
            seed = config.seed,
            "Game loop started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let timer = Timer::new();
                    let report = self.sim.tick(dt);
                    if report.tick > 0 {
                        trace!(
                            tick = report.tick,
                            kills = report.kills().count(),
                            elapsed_micros = timer.elapsed_micros(),
                            "Tick"
                        );
                    }
                    self.publish_status();
                }
                command = self.command_rx.recv() => match command {
                    Some(command) => {
                        trace!(?command, "Command");
                        self.sim.dispatch(command);
                    }
                    None => {
                        debug!("Command channel closed");
                        break;
                    }
                },
            }
        }

        info!(
            tick = self.sim.current_tick(),
            players = self.sim.state().player_count(),
            "Game loop stopped"
        );
    }

    fn publish_status(&self) {
        // No receivers left is fine; the loop keeps running for sessions
        let _ = self.status_tx.send(self.sim.status());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use uuid::Uuid;

    use super::*;
    use crate::game::registry::ChannelSink;
    use crate::ws::protocol::{ClientMsg, ServerMsg};

    async fn next_msg(rx: &mut mpsc::Receiver<Arc<ServerMsg>>) -> Arc<ServerMsg> {
        tokio_test::assert_ok!(timeout(Duration::from_secs(2), rx.recv()).await)
            .expect("outbound channel closed")
    }

    #[tokio::test]
    async fn loop_acknowledges_join_and_streams_snapshots() {
        let (game_loop, handle) = GameLoop::new(GameConfig::default());
        let task = tokio::spawn(game_loop.run());

        let id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::channel(256);
        assert!(
            handle
                .send(GameCommand::Connect {
                    sink: Box::new(ChannelSink::new(id, tx)),
                })
                .await
        );
        assert!(
            handle
                .send(GameCommand::Client {
                    connection_id: id,
                    msg: ClientMsg::JoinGame {
                        name: "looper".to_string(),
                    },
                })
                .await
        );

        match &*next_msg(&mut rx).await {
            ServerMsg::PlayerJoined { player } => {
                assert_eq!(player.id, id);
                assert_eq!(player.name, "looper");
            }
            other => panic!("expected join ack, got {other:?}"),
        }

        // join snapshot, then at least two tick snapshots with advancing time
        let mut ticks = Vec::new();
        while ticks.len() < 3 {
            if let ServerMsg::GameState { tick, .. } = &*next_msg(&mut rx).await {
                ticks.push(*tick);
            }
        }
        assert!(ticks.windows(2).all(|w| w[0] < w[1]));

        let status = handle.status();
        assert!(status.is_game_active);
        assert_eq!(status.players.len(), 1);

        drop(handle);
        let joined = tokio_test::assert_ok!(timeout(Duration::from_secs(2), task).await);
        tokio_test::assert_ok!(joined);
    }
}
