//! Per-tick orchestration
//!
//! Strict subsystem order per tick: physics step, merge queue drain,
//! scheduled-completion drain, danger check. Particles and animations advance
//! per frame by wall-clock delta, outside the fixed-tick loop.

use super::state::{GamePhase, GameState};
use super::{danger, merge};

/// One fixed-timestep advance. `dt` is the physics step in seconds, `now`
/// the wall clock in ms (animation and completion timing).
pub fn tick(state: &mut GameState, dt: f32, now: f64) {
    if !state.is_running() {
        return;
    }
    state.tick_count += 1;

    state.physics.step(dt);
    merge::detect_merges(state);
    merge::resolve_merges(state, now);
    merge::drain_completions(state, now);
    danger::update_highest_top(state);
    danger::check_end(state, now);
}

/// Best-effort per-frame advance of the visual subsystems. Non-blocking and
/// independent of the tick cadence; frozen while paused.
pub fn frame_advance(state: &mut GameState, dt: f32, now: f64) {
    if state.session.phase == GamePhase::Paused {
        return;
    }
    state.particles.update(dt);
    state.animations.advance(now, &mut state.physics);
}
