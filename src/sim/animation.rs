//! Transient per-disc animations
//!
//! Time-keyed visual states. A merge glide also drives the physics body's
//! position for its duration; spawn grow only affects the rendered scale.
//! At most one animation per disc - attaching a new one overwrites the old.

use glam::Vec2;

use super::physics::{BodyHandle, PhysicsWorld};
use super::state::DiscId;
use crate::consts::{MERGE_GLIDE_MS, SPAWN_GROW_MS};

#[derive(Debug, Clone, Copy)]
pub enum Anim {
    /// Interpolates the disc from `from` to `to` over the glide duration
    MergeGlide {
        from: Vec2,
        to: Vec2,
        started_at: f64,
    },
    /// Rendered scale 0 -> 1 over the grow duration
    SpawnGrow { started_at: f64 },
}

impl Anim {
    fn duration_ms(&self) -> f64 {
        match self {
            Anim::MergeGlide { .. } => MERGE_GLIDE_MS,
            Anim::SpawnGrow { .. } => SPAWN_GROW_MS,
        }
    }

    fn started_at(&self) -> f64 {
        match self {
            Anim::MergeGlide { started_at, .. } | Anim::SpawnGrow { started_at } => *started_at,
        }
    }

    fn elapsed_frac(&self, now: f64) -> f32 {
        let t = (now - self.started_at()) / self.duration_ms();
        t.clamp(0.0, 1.0) as f32
    }
}

#[derive(Default)]
pub struct AnimationTracker {
    entries: Vec<(DiscId, BodyHandle, Anim)>,
}

impl AnimationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an animation, replacing any active one for the disc
    pub fn set(&mut self, disc: DiscId, body: BodyHandle, anim: Anim) {
        self.remove(disc);
        self.entries.push((disc, body, anim));
    }

    pub fn remove(&mut self, disc: DiscId) {
        self.entries.retain(|(id, _, _)| *id != disc);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, disc: DiscId) -> Option<&Anim> {
        self.entries
            .iter()
            .find(|(id, _, _)| *id == disc)
            .map(|(_, _, anim)| anim)
    }

    /// Rendered scale for a disc (spawn grow), 1.0 when no animation applies
    pub fn scale_for(&self, disc: DiscId, now: f64) -> f32 {
        match self.get(disc) {
            Some(anim @ Anim::SpawnGrow { .. }) => anim.elapsed_frac(now),
            _ => 1.0,
        }
    }

    /// Advance animations: glides write positions back into the physics
    /// world, and anything past its duration is dropped.
    pub fn advance(&mut self, now: f64, physics: &mut PhysicsWorld) {
        for (_, body, anim) in &self.entries {
            if let Anim::MergeGlide { from, to, .. } = anim {
                let t = anim.elapsed_frac(now);
                let pos = Vec2::new(
                    crate::lerp(from.x, to.x, t),
                    crate::lerp(from.y, to.y, t),
                );
                physics.set_position(*body, pos);
            }
        }
        self.entries
            .retain(|(_, _, anim)| anim.elapsed_frac(now) < 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::config::PhysicsTuning;

    fn setup() -> (PhysicsWorld, BodyHandle) {
        let mut physics = PhysicsWorld::new(PhysicsTuning::default());
        let body = physics.insert_disc(Vec2::new(0.0, 0.0), 10.0);
        physics.set_kinematic(body, true);
        (physics, body)
    }

    #[test]
    fn test_glide_interpolates_position() {
        let (mut physics, body) = setup();
        let mut tracker = AnimationTracker::new();
        tracker.set(
            DiscId(1),
            body,
            Anim::MergeGlide {
                from: Vec2::new(0.0, 0.0),
                to: Vec2::new(100.0, 0.0),
                started_at: 0.0,
            },
        );
        tracker.advance(150.0, &mut physics);
        let pos = physics.position(body).unwrap();
        assert!((pos.x - 50.0).abs() < 0.01);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_animation_removed_after_duration() {
        let (mut physics, body) = setup();
        let mut tracker = AnimationTracker::new();
        tracker.set(
            DiscId(1),
            body,
            Anim::SpawnGrow { started_at: 0.0 },
        );
        tracker.advance(crate::consts::SPAWN_GROW_MS + 1.0, &mut physics);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_new_animation_overwrites_old() {
        let (_, body) = setup();
        let mut tracker = AnimationTracker::new();
        let disc = DiscId(1);
        tracker.set(disc, body, Anim::SpawnGrow { started_at: 0.0 });
        tracker.set(
            disc,
            body,
            Anim::MergeGlide {
                from: Vec2::ZERO,
                to: Vec2::ONE,
                started_at: 10.0,
            },
        );
        assert_eq!(tracker.len(), 1);
        assert!(matches!(tracker.get(disc), Some(Anim::MergeGlide { .. })));
    }

    #[test]
    fn test_spawn_grow_scale() {
        let (_, body) = setup();
        let mut tracker = AnimationTracker::new();
        let disc = DiscId(1);
        tracker.set(disc, body, Anim::SpawnGrow { started_at: 0.0 });
        assert_eq!(tracker.scale_for(disc, 0.0), 0.0);
        let half = tracker.scale_for(disc, crate::consts::SPAWN_GROW_MS / 2.0);
        assert!((half - 0.5).abs() < 0.01);
        assert_eq!(tracker.scale_for(disc, 1000.0), 1.0);
        // No animation -> full scale
        assert_eq!(tracker.scale_for(DiscId(2), 0.0), 1.0);
    }
}
