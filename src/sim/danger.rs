//! Danger-line and end-of-session detection
//!
//! One cheap pass per tick maintains the topmost disc-top y. The expensive
//! per-disc scan (grace periods, band counting) only runs once that value
//! reaches the danger line.

use crate::consts::{GRACE_PERIOD_MS, STACKED_COUNT_MIN, STACKED_NEAR_LINE_MIN};

use super::state::{EndReason, GameState};

/// Incrementally maintained topmost point of the disc stack
#[derive(Debug, Default)]
pub struct DangerTracker {
    /// Minimum (y - radius) over all discs; infinity when the board is empty
    pub highest_top: f32,
}

impl DangerTracker {
    pub fn new() -> Self {
        Self {
            highest_top: f32::INFINITY,
        }
    }

    pub fn reset(&mut self) {
        self.highest_top = f32::INFINITY;
    }
}

/// Single pass over all discs; called once per tick
pub fn update_highest_top(state: &mut GameState) {
    state.danger.highest_top = recompute_highest_top(state);
}

/// Ground truth for the incremental value (also used by the invariant tests)
pub fn recompute_highest_top(state: &GameState) -> f32 {
    let mut top = f32::INFINITY;
    for disc in &state.discs {
        let Some(pos) = state.physics.position(disc.body) else {
            continue;
        };
        let radius = state.config.radius_for_value(disc.value);
        top = top.min(pos.y - radius);
    }
    top
}

/// Evaluate end conditions. Fast path: nothing can have crossed while the
/// stack top is still below the line.
pub fn check_end(state: &mut GameState, now: f64) {
    if state.danger.highest_top > state.config.danger_y {
        return;
    }

    let danger_y = state.config.danger_y;
    let band_bottom = state.config.danger_band_bottom();
    let mut crossed = false;
    let mut near_line = 0usize;

    for disc in &state.discs {
        // Fresh spawns fall through the line on the way in; exempt them
        if now - disc.spawned_at < GRACE_PERIOD_MS {
            continue;
        }
        let Some(pos) = state.physics.position(disc.body) else {
            continue;
        };
        let radius = state.config.radius_for_value(disc.value);
        let top = pos.y - radius;
        if top <= danger_y {
            crossed = true;
            break;
        }
        if top <= band_bottom {
            near_line += 1;
        }
    }

    if crossed {
        state.end_session(EndReason::DangerLine, now);
        return;
    }

    // Stalemate breaker: a tall pile pressed against the line that never
    // technically crosses it is still unrecoverable.
    if state.discs.len() > STACKED_COUNT_MIN && near_line > STACKED_NEAR_LINE_MIN {
        state.end_session(EndReason::Stacked, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::GamePhase;
    use crate::sim::test_util::new_state;
    use glam::Vec2;
    use proptest::prelude::*;

    #[test]
    fn test_empty_board_is_safe() {
        let mut state = new_state();
        state.start(0.0);
        update_highest_top(&mut state);
        assert_eq!(state.danger.highest_top, f32::INFINITY);
        check_end(&mut state, 10_000.0);
        assert_eq!(state.session.phase, GamePhase::Running);
    }

    #[test]
    fn test_grace_period_exempts_young_discs() {
        let mut state = new_state();
        state.start(0.0);
        // Spawned right at the line, well above it
        state.spawn_disc(Vec2::new(200.0, 10.0), 2, 1000.0);
        update_highest_top(&mut state);
        check_end(&mut state, 1000.0 + GRACE_PERIOD_MS - 1.0);
        assert_eq!(state.session.phase, GamePhase::Running);
    }

    #[test]
    fn test_settled_disc_past_line_ends_session() {
        let mut state = new_state();
        state.start(0.0);
        state.spawn_disc(Vec2::new(200.0, 10.0), 2, 0.0);
        update_highest_top(&mut state);
        check_end(&mut state, GRACE_PERIOD_MS + 1.0);
        assert_eq!(state.session.phase, GamePhase::Ended);
        assert_eq!(state.session.end_reason, Some(EndReason::DangerLine));
    }

    #[test]
    fn test_fast_path_skips_scan_when_stack_low() {
        let mut state = new_state();
        state.start(0.0);
        // Deep disc, old enough to be cleared, far from the line
        state.spawn_disc(Vec2::new(200.0, 600.0), 2, 0.0);
        update_highest_top(&mut state);
        assert!(state.danger.highest_top > state.config.danger_y);
        check_end(&mut state, 10_000.0);
        assert_eq!(state.session.phase, GamePhase::Running);
    }

    #[test]
    fn test_stacked_heuristic_ends_session() {
        let mut state = new_state();
        state.start(0.0);
        let danger_y = state.config.danger_y;
        let r = state.config.radius_for_value(2);
        // One young disc crossing the line arms the scan without ending it
        state.spawn_disc(Vec2::new(30.0, danger_y - 1.0), 2, 100_000.0);
        // Eight cleared discs parked in the band just below the line
        for i in 0..8 {
            state.spawn_disc(
                Vec2::new(60.0 + i as f32 * 45.0, danger_y + r + 2.0),
                2,
                0.0,
            );
        }
        // Filler discs deep in the board to cross the count threshold
        for i in 0..8 {
            state.spawn_disc(Vec2::new(40.0 + i as f32 * 50.0, 600.0), 2, 0.0);
        }
        update_highest_top(&mut state);
        check_end(&mut state, 100_000.0);
        assert_eq!(state.session.phase, GamePhase::Ended);
        assert_eq!(state.session.end_reason, Some(EndReason::Stacked));
    }

    proptest! {
        /// The incrementally maintained top always equals a from-scratch pass
        #[test]
        fn prop_highest_top_matches_recompute(
            positions in proptest::collection::vec((20.0f32..460.0, 50.0f32..700.0), 0..24)
        ) {
            let mut state = new_state();
            state.start(0.0);
            for (x, y) in positions {
                state.spawn_disc(Vec2::new(x, y), 2, 0.0);
            }
            update_highest_top(&mut state);
            let ground_truth = recompute_highest_top(&state);
            prop_assert_eq!(state.danger.highest_top, ground_truth);
        }
    }
}
