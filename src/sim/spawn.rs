//! Drop placement
//!
//! A drop lands at the preview x on the fixed spawn row when that spot is
//! clear. Occupied spots fall back to a bounded search: small stepped offsets
//! around the request, then a zig-zag sweep across the whole row. Exhausting
//! the search ends the session - a board with no room at the spawn row is
//! lost.

use glam::Vec2;

use super::state::{EndReason, GameEvent, GameState};
use crate::consts::DROP_COOLDOWN_MS;

/// Minimum center distance factor against other discs
const SPAWN_CLEARANCE: f32 = 1.1;

/// Handle a drop request: cooldown gate, placement search, spawn
pub fn request_drop(state: &mut GameState, now: f64) {
    if !state.is_running() {
        return;
    }
    // Rate limit, independent of the placement search
    if now - state.session.last_drop_at < DROP_COOLDOWN_MS {
        return;
    }
    let value = state.session.next_value;
    let radius = state.config.radius_for_value(value);
    match find_spawn_x(state, radius) {
        Some(x) => {
            state.session.last_drop_at = now;
            let value = state.draw_next_value();
            let pos = Vec2::new(x, state.config.spawn_y);
            if state.spawn_disc(pos, value, now).is_some() {
                state.events.push(GameEvent::Dropped { value });
            }
        }
        None => {
            state.end_session(EndReason::NoSpace, now);
        }
    }
}

/// Whether a disc of `radius` fits at (x, spawn row) - inside the board and
/// clear of every live disc by the clearance factor
pub fn is_spawn_free(state: &GameState, x: f32, radius: f32) -> bool {
    if x < radius || x > state.config.width - radius {
        return false;
    }
    let pos = Vec2::new(x, state.config.spawn_y);
    for disc in &state.discs {
        let Some(other) = state.physics.position(disc.body) else {
            continue;
        };
        let other_radius = state.config.radius_for_value(disc.value);
        if (other - pos).length() < (radius + other_radius) * SPAWN_CLEARANCE {
            return false;
        }
    }
    true
}

/// Bounded placement search. Candidate order: the preview x itself, stepped
/// offsets (left then right, one then two steps), then a zig-zag sweep
/// outward until both directions leave the board.
fn find_spawn_x(state: &GameState, radius: f32) -> Option<f32> {
    let x0 = state
        .session
        .preview_x
        .clamp(radius, state.config.width - radius);
    let step = radius * SPAWN_CLEARANCE;

    for dx in [0.0, -step, step, -2.0 * step, 2.0 * step] {
        let x = x0 + dx;
        if is_spawn_free(state, x, radius) {
            return Some(x);
        }
    }

    let mut k = 3;
    loop {
        let left = x0 - k as f32 * step;
        let right = x0 + k as f32 * step;
        let left_in = left >= radius;
        let right_in = right <= state.config.width - radius;
        if !left_in && !right_in {
            return None;
        }
        if left_in && is_spawn_free(state, left, radius) {
            return Some(left);
        }
        if right_in && is_spawn_free(state, right, radius) {
            return Some(right);
        }
        k += 1;
    }
}
