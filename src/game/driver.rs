//! Real-time driver: owns a match and runs it on a fixed tick interval

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{info, warn};
use uuid::Uuid;

use crate::audio::AudioSink;
use crate::protocol::{MatchReport, MatchSnapshot};
use crate::util::time::{clamp_delta, SIMULATION_TPS, SNAPSHOT_TPS, TICK_DURATION_MICROS};

use super::r#match::{GameMatch, MatchPhase};
use super::snapshot::SnapshotBuilder;
use super::{Intent, PlayerInput};

/// Handle to a running match
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    pub input_tx: mpsc::Sender<PlayerInput>,
    pub snapshot_tx: broadcast::Sender<MatchSnapshot>,
}

impl MatchHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<MatchSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Queue an intent for the next tick
    pub async fn send_intent(
        &self,
        combatant_id: Uuid,
        intent: Intent,
    ) -> Result<(), mpsc::error::SendError<PlayerInput>> {
        self.input_tx
            .send(PlayerInput {
                combatant_id,
                intent,
            })
            .await
    }
}

/// Owns a [`GameMatch`] plus the channels and sinks around it
pub struct MatchDriver {
    game: GameMatch,
    input_rx: mpsc::Receiver<PlayerInput>,
    snapshot_tx: broadcast::Sender<MatchSnapshot>,
    snapshot_builder: SnapshotBuilder,
    audio: Box<dyn AudioSink + Send>,
}

impl MatchDriver {
    pub fn new(game: GameMatch, audio: Box<dyn AudioSink + Send>) -> (Self, MatchHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (snapshot_tx, _) = broadcast::channel(64);

        let handle = MatchHandle {
            id: game.id(),
            input_tx,
            snapshot_tx: snapshot_tx.clone(),
        };

        let driver = Self {
            game,
            input_rx,
            snapshot_tx,
            snapshot_builder: SnapshotBuilder::new(SIMULATION_TPS / SNAPSHOT_TPS),
            audio,
        };

        (driver, handle)
    }

    /// Run the tick loop until the match ends
    pub async fn run(mut self) -> MatchReport {
        info!(match_id = %self.game.id(), tps = SIMULATION_TPS, "Match driver running");

        let mut tick_interval = interval(Duration::from_micros(TICK_DURATION_MICROS));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = Instant::now();

        loop {
            tick_interval.tick().await;
            let now = Instant::now();
            let dt = clamp_delta(now.duration_since(last_tick).as_secs_f64());
            last_tick = now;

            // Drain input queue
            self.process_inputs();

            let events = match self.game.tick(dt) {
                Ok(events) => events,
                Err(error) => {
                    warn!(match_id = %self.game.id(), %error, "Tick rejected");
                    continue;
                }
            };

            for event in &events {
                self.audio.play(event.audio_cue());
            }
            self.snapshot_builder.record(events);

            let ended = self.game.phase() == MatchPhase::Ended;
            if ended {
                self.snapshot_builder.force_next();
            }

            if self.snapshot_builder.should_send() {
                let snapshot = self.snapshot_builder.build(&self.game);
                // No subscribers is fine
                let _ = self.snapshot_tx.send(snapshot);
            }

            if ended {
                break;
            }
        }

        let report = self.game.report();
        info!(
            match_id = %report.match_id,
            ticks = report.ticks,
            winner = ?report.winner_id,
            outcome = ?report.outcome,
            "Match driver finished"
        );
        report
    }

    /// Apply every queued input; the newest one per combatant wins
    fn process_inputs(&mut self) {
        while let Ok(input) = self.input_rx.try_recv() {
            if let Err(error) = self.game.set_intent(input.combatant_id, input.intent) {
                warn!(match_id = %self.game.id(), %error, "Dropping input");
            }
        }
    }
}
