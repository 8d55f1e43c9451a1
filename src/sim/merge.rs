//! Merge detection and resolution
//!
//! Collision-start pairs are never resolved inline. Eligible pairs go into a
//! per-tick queue, drained once after the physics step, so merges resolve in
//! detection order and each disc joins at most one resolution per tick.
//! Completion (remove both, spawn the doubled disc) is deferred past the
//! glide animation through a timestamp-keyed list drained by the tick driver;
//! restart invalidates the whole list at once.

use glam::Vec2;

use super::animation::Anim;
use super::state::{DiscId, GameEvent, GameState};
use crate::consts::{MERGE_GLIDE_MS, MERGE_POP_IMPULSE, MERGE_REL_SPEED_MAX, MERGE_SPEED_MAX};

/// An eligible pair awaiting resolution at tick end
#[derive(Debug, Clone, Copy)]
pub struct MergeRequest {
    pub disc_a: DiscId,
    pub disc_b: DiscId,
    pub midpoint: Vec2,
    pub merged_value: u32,
    pub detected_at_tick: u64,
}

/// A resolved merge whose removal/spawn fires after the glide
#[derive(Debug, Clone, Copy)]
struct PendingCompletion {
    due_at: f64,
    pos: Vec2,
    value: u32,
    disc_a: DiscId,
    disc_b: DiscId,
}

/// Queue + scheduled-completion list, owned by the session state
#[derive(Default)]
pub struct MergeResolver {
    queue: Vec<MergeRequest>,
    pending: Vec<PendingCompletion>,
}

impl MergeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wholesale invalidation (restart); nothing is canceled individually
    pub fn clear(&mut self) {
        self.queue.clear();
        self.pending.clear();
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn pending_completions(&self) -> usize {
        self.pending.len()
    }
}

/// Scan this tick's collision-start pairs for mergeable disc pairs
pub fn detect_merges(state: &mut GameState) {
    let tick = state.tick_count;
    let mut found: Vec<MergeRequest> = Vec::new();
    for contact in state.physics.collision_starts() {
        // Walls and vanished bodies fall out here
        let Some(a) = state.disc_by_body(contact.a) else {
            continue;
        };
        let Some(b) = state.disc_by_body(contact.b) else {
            continue;
        };
        if a.value != b.value || a.merging || b.merging {
            continue;
        }
        // One resolution per disc per tick
        let busy = |id: DiscId| {
            found
                .iter()
                .chain(state.merge.queue.iter())
                .any(|r| r.disc_a == id || r.disc_b == id)
        };
        if busy(a.id) || busy(b.id) {
            continue;
        }
        // Speed gates: violent collisions read wrong as merges
        if contact.speed_a >= MERGE_SPEED_MAX || contact.speed_b >= MERGE_SPEED_MAX {
            continue;
        }
        if contact.rel_speed >= MERGE_REL_SPEED_MAX {
            continue;
        }
        let (Some(pa), Some(pb)) = (
            state.physics.position(contact.a),
            state.physics.position(contact.b),
        ) else {
            continue;
        };
        found.push(MergeRequest {
            disc_a: a.id,
            disc_b: b.id,
            midpoint: (pa + pb) / 2.0,
            merged_value: a.value * 2,
            detected_at_tick: tick,
        });
    }
    state.merge.queue.append(&mut found);
}

/// Drain the queue: lock participants, start glides, score, schedule the
/// delayed removal/spawn. Stale requests (a participant vanished or was
/// consumed earlier in this batch) are skipped silently - that race is
/// expected, not an error.
pub fn resolve_merges(state: &mut GameState, now: f64) {
    let requests = std::mem::take(&mut state.merge.queue);
    for req in requests {
        let (Some(a), Some(b)) = (state.disc(req.disc_a), state.disc(req.disc_b)) else {
            continue;
        };
        if a.merging || b.merging {
            continue;
        }
        let (body_a, body_b) = (a.body, b.body);
        let old_value = a.value;
        let (Some(pa), Some(pb)) = (
            state.physics.position(body_a),
            state.physics.position(body_b),
        ) else {
            continue;
        };

        if let Some(d) = state.disc_mut(req.disc_a) {
            d.merging = true;
        }
        if let Some(d) = state.disc_mut(req.disc_b) {
            d.merging = true;
        }
        state.physics.set_kinematic(body_a, true);
        state.physics.set_kinematic(body_b, true);
        state.animations.set(
            req.disc_a,
            body_a,
            Anim::MergeGlide {
                from: pa,
                to: req.midpoint,
                started_at: now,
            },
        );
        state.animations.set(
            req.disc_b,
            body_b,
            Anim::MergeGlide {
                from: pb,
                to: req.midpoint,
                started_at: now,
            },
        );

        let burst_radius = state.config.radius_for_value(old_value);
        let color = crate::sprites::color_index(req.merged_value);
        state
            .particles
            .spawn_burst(&mut state.rng, req.midpoint, burst_radius, color, now);

        state.add_score(2 * old_value as u64, now);
        state.events.push(GameEvent::Merged {
            value: req.merged_value,
        });
        log::debug!(
            "merge {}+{} -> {} at ({:.0},{:.0})",
            old_value,
            old_value,
            req.merged_value,
            req.midpoint.x,
            req.midpoint.y
        );

        state.merge.pending.push(PendingCompletion {
            due_at: now + MERGE_GLIDE_MS,
            pos: req.midpoint,
            value: req.merged_value,
            disc_a: req.disc_a,
            disc_b: req.disc_b,
        });
    }
}

/// Fire completions whose glide has elapsed. Re-entrant-safe: the due set is
/// detached before any mutation, so several merges may complete in one tick.
pub fn drain_completions(state: &mut GameState, now: f64) {
    let mut due: Vec<PendingCompletion> = Vec::new();
    state.merge.pending.retain(|p| {
        if p.due_at <= now {
            due.push(*p);
            false
        } else {
            true
        }
    });
    for completion in due {
        // Capacity is judged against the pre-removal population. When the
        // board is full the spawn fails silently and both originals stay
        // removed - net count drops by two, keeping the hard cap.
        let at_capacity = state.discs.len() >= crate::consts::MAX_DISCS;
        state.remove_disc(completion.disc_a);
        state.remove_disc(completion.disc_b);
        if at_capacity {
            log::warn!("merged disc spawn rejected at capacity");
            state.events.push(GameEvent::CapacityReached);
            continue;
        }
        if let Some(id) = state.spawn_disc(completion.pos, completion.value, now) {
            if let Some(disc) = state.disc(id) {
                let body = disc.body;
                state
                    .physics
                    .apply_impulse(body, Vec2::new(0.0, -MERGE_POP_IMPULSE));
            }
        }
    }
}
