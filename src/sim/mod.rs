//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by insertion, ids monotonic)
//! - No rendering or platform dependencies
//!
//! Per-tick order is fixed: physics step, merge queue drain, scheduled
//! completion drain, danger check. Particles and animations advance per
//! frame by wall-clock delta.

pub mod animation;
pub mod config;
pub mod danger;
pub mod merge;
pub mod particles;
pub mod physics;
pub mod spawn;
pub mod state;
pub mod tick;

pub use animation::{Anim, AnimationTracker};
pub use config::{BoardConfig, PhysicsTuning};
pub use danger::DangerTracker;
pub use merge::{MergeRequest, MergeResolver};
pub use particles::{ParticlePool, ParticleView};
pub use physics::{BodyHandle, ContactStart, PhysicsWorld};
pub use state::{
    AnimKind, Disc, DiscId, DiscView, EndReason, FrameSnapshot, GameEvent, GamePhase, GameState,
    Session, SessionSummary,
};
pub use tick::{frame_advance, tick};

#[cfg(test)]
pub(crate) mod test_util {
    use super::config::BoardConfig;
    use super::state::GameState;
    use crate::bestscore::BestScoreStore;
    use crate::settings::Settings;

    pub fn new_state() -> GameState {
        GameState::new(
            BoardConfig::new(480.0, 720.0, false),
            &Settings::default(),
            7,
            None,
        )
    }

    pub fn new_state_with_store(store: Box<dyn BestScoreStore>) -> GameState {
        GameState::new(
            BoardConfig::new(480.0, 720.0, false),
            &Settings::default(),
            7,
            Some(store),
        )
    }
}
