//! Arena Duel - headless match runner
//!
//! Runs one Brawler vs Prince match in real time with both sides driven by
//! a seeded random input source, then prints the match report as JSON.

use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arena_duel::audio::TracingAudioSink;
use arena_duel::config::Config;
use arena_duel::game::{ArchetypeKind, GameMatch, MatchDriver, MatchHandle, MatchPhase};
use arena_duel::input::RandomInputSource;
use arena_duel::protocol::MatchSnapshot;
use arena_duel::util::time::TICK_DURATION_MICROS;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    let seed = config.seed.unwrap_or_else(rand::random);
    info!(seed, "Starting Arena Duel");

    let game = GameMatch::duel(config.arena.clone(), ArchetypeKind::Brawler, ArchetypeKind::Prince)?;
    let (driver, handle) = MatchDriver::new(game, Box::new(TracingAudioSink));

    let driver_task = tokio::spawn(driver.run());
    tokio::spawn(feed_random_inputs(handle.clone(), seed));
    tokio::spawn(log_snapshots(handle.subscribe()));

    let report = driver_task.await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    info!("Match runner finished");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Send one random intent per combatant per tick until the driver stops
async fn feed_random_inputs(handle: MatchHandle, seed: u64) {
    let mut source = RandomInputSource::new(seed);
    let mut snapshots = handle.subscribe();
    let mut latest: Option<MatchSnapshot> = None;
    let mut ticker = tokio::time::interval(Duration::from_micros(TICK_DURATION_MICROS));

    loop {
        ticker.tick().await;
        loop {
            match snapshots.try_recv() {
                Ok(snapshot) => latest = Some(snapshot),
                Err(tokio::sync::broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }

        let Some(snapshot) = &latest else {
            continue;
        };
        for combatant in &snapshot.combatants {
            let intent = source.intent_for(combatant);
            if handle.send_intent(combatant.id, intent).await.is_err() {
                return;
            }
        }
    }
}

async fn log_snapshots(mut snapshots: tokio::sync::broadcast::Receiver<MatchSnapshot>) {
    let mut phase = None;
    loop {
        let snapshot = match snapshots.recv().await {
            Ok(snapshot) => snapshot,
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "Snapshot logger lagged");
                continue;
            }
            Err(RecvError::Closed) => return,
        };

        if phase != Some(snapshot.phase) {
            phase = Some(snapshot.phase);
            info!(tick = snapshot.tick, phase = ?snapshot.phase, "Phase changed");
        }
        for c in &snapshot.combatants {
            debug!(
                tick = snapshot.tick,
                combatant = %c.name,
                health = c.health,
                meter = c.meter,
                state = ?c.state,
                combo = c.combo_count,
                "Combatant"
            );
        }
        if snapshot.phase == MatchPhase::Ended {
            return;
        }
    }
}
