//! Time utilities for the match simulation

/// Tick rate configuration
pub const SIMULATION_TPS: u32 = 60; // 60 ticks per second
pub const SNAPSHOT_TPS: u32 = 20; // 20 snapshots per second
pub const TICK_DURATION_MICROS: u64 = 1_000_000 / SIMULATION_TPS as u64;

/// Largest step the simulation accepts from the driver (30 fps floor)
pub const MAX_TICK_DELTA: f64 = 1.0 / 30.0;

/// Clamp a measured frame time into a stable integration step.
/// Negative or NaN measurements collapse to zero.
pub fn clamp_delta(elapsed_secs: f64) -> f64 {
    if elapsed_secs.is_nan() {
        return 0.0;
    }
    elapsed_secs.clamp(0.0, MAX_TICK_DELTA)
}
