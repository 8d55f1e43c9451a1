//! Game state and session control
//!
//! All mutable simulation state lives here, touched only from the single
//! tick/render path. The render boundary reads snapshots and drains events;
//! it never mutates.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::animation::{Anim, AnimationTracker};
use super::config::BoardConfig;
use super::danger::DangerTracker;
use super::merge::MergeResolver;
use super::particles::{ParticlePool, ParticleView};
use super::physics::{BodyHandle, PhysicsWorld};
use crate::bestscore::BestScoreStore;
use crate::consts::{BEST_SAVE_MIN_INTERVAL_MS, MAX_DISCS, WALL_THICKNESS};
use crate::settings::Settings;

/// Stable disc identifier, never reused while the disc is alive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DiscId(pub u64);

/// A dynamic circular body carrying a power-of-two value
#[derive(Debug, Clone)]
pub struct Disc {
    pub id: DiscId,
    pub body: BodyHandle,
    /// Always a power of two >= 2
    pub value: u32,
    pub spawned_at: f64,
    /// Mid-merge lock: blocks further merge eligibility and resolution
    pub merging: bool,
}

/// Session phases. `Ended` is terminal until an explicit restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GamePhase {
    NotRunning,
    Running,
    Paused,
    Ended,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EndReason {
    DangerLine,
    Stacked,
    NoSpace,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::DangerLine => "Danger line crossed.",
            EndReason::Stacked => "Too many circles stacked.",
            EndReason::NoSpace => "No space to spawn.",
        }
    }
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Advisories drained by the boundary each frame (toasts, sounds)
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Dropped { value: u32 },
    Merged { value: u32 },
    NewBestScore(u64),
    /// Disc table at capacity; a spawn was rejected
    CapacityReached,
    SessionEnded(EndReason),
}

/// Player-facing session fields
#[derive(Debug, Clone)]
pub struct Session {
    pub score: u64,
    pub best_score: u64,
    pub next_value: u32,
    pub phase: GamePhase,
    pub end_reason: Option<EndReason>,
    pub preview_x: f32,
    pub last_drop_at: f64,
}

/// Active animation kind, surfaced with each disc view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnimKind {
    Glide,
    Grow,
}

/// Read-only disc state for the render boundary
#[derive(Debug, Clone, Serialize)]
pub struct DiscView {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub value: u32,
    /// Rendered scale (spawn grow), 1.0 when settled
    pub scale: f32,
    pub anim: Option<AnimKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub score: u64,
    pub best_score: u64,
    pub next_value: u32,
    pub phase: GamePhase,
    pub end_reason: Option<&'static str>,
    pub preview_x: f32,
}

/// One frame's read-only state for the render boundary
#[derive(Debug, Clone, Serialize)]
pub struct FrameSnapshot {
    pub discs: Vec<DiscView>,
    pub particles: Vec<ParticleView>,
    pub session: SessionSummary,
}

/// The whole mutable game: physics, discs, pools, session
pub struct GameState {
    pub config: BoardConfig,
    pub physics: PhysicsWorld,
    pub discs: Vec<Disc>,
    pub particles: ParticlePool,
    pub animations: AnimationTracker,
    pub danger: DangerTracker,
    pub merge: MergeResolver,
    pub session: Session,
    pub events: Vec<GameEvent>,
    pub rng: Pcg32,
    pub seed: u64,
    pub tick_count: u64,
    next_disc_id: u64,
    walls: [BodyHandle; 4],
    store: Option<Box<dyn BestScoreStore>>,
    last_best_save_at: f64,
    best_dirty: bool,
}

impl GameState {
    pub fn new(
        config: BoardConfig,
        settings: &Settings,
        seed: u64,
        mut store: Option<Box<dyn BestScoreStore>>,
    ) -> Self {
        let mut physics = PhysicsWorld::new(config.tuning);
        let walls = build_walls(&mut physics, &config);
        let mut rng = Pcg32::seed_from_u64(seed);
        let next_value = config.draw_spawn_value(&mut rng);
        let best_score = store.as_mut().map(|s| s.load()).unwrap_or(0);
        Self {
            particles: ParticlePool::new(settings.effective_max_particles()),
            animations: AnimationTracker::new(),
            danger: DangerTracker::new(),
            merge: MergeResolver::new(),
            session: Session {
                score: 0,
                best_score,
                next_value,
                phase: GamePhase::NotRunning,
                end_reason: None,
                preview_x: config.width / 2.0,
                last_drop_at: f64::NEG_INFINITY,
            },
            events: Vec::new(),
            rng,
            seed,
            tick_count: 0,
            next_disc_id: 1,
            walls,
            store,
            last_best_save_at: f64::NEG_INFINITY,
            best_dirty: false,
            config,
            physics,
            discs: Vec::new(),
        }
    }

    // --- Session control ---

    pub fn start(&mut self, now: f64) {
        if self.session.phase == GamePhase::NotRunning {
            log::info!("session started (seed {})", self.seed);
            self.session.phase = GamePhase::Running;
            self.session.last_drop_at = now - crate::consts::DROP_COOLDOWN_MS;
        }
    }

    pub fn pause(&mut self) {
        if self.session.phase == GamePhase::Running {
            self.session.phase = GamePhase::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.session.phase == GamePhase::Paused {
            self.session.phase = GamePhase::Running;
        }
    }

    /// Tear down the world and start a fresh session. Pending merge
    /// completions die with the old world - invalidated wholesale, never
    /// individually.
    pub fn restart(&mut self, seed: u64, now: f64) {
        log::info!("session restarted (seed {seed})");
        self.physics = PhysicsWorld::new(self.config.tuning);
        self.walls = build_walls(&mut self.physics, &self.config);
        self.discs.clear();
        self.particles.clear();
        self.animations.clear();
        self.merge.clear();
        self.danger.reset();
        self.events.clear();
        self.rng = Pcg32::seed_from_u64(seed);
        self.seed = seed;
        self.tick_count = 0;
        self.session.score = 0;
        self.session.next_value = self.config.draw_spawn_value(&mut self.rng);
        self.session.phase = GamePhase::Running;
        self.session.end_reason = None;
        self.session.preview_x = self.config.width / 2.0;
        self.session.last_drop_at = now - crate::consts::DROP_COOLDOWN_MS;
    }

    /// End the session. Idempotent: only the first reason sticks.
    pub fn end_session(&mut self, reason: EndReason, now: f64) {
        if self.session.phase == GamePhase::Ended {
            return;
        }
        log::info!("session ended: {reason}");
        self.session.phase = GamePhase::Ended;
        self.session.end_reason = Some(reason);
        self.events.push(GameEvent::SessionEnded(reason));
        self.flush_best_score(now);
    }

    pub fn is_running(&self) -> bool {
        self.session.phase == GamePhase::Running
    }

    // --- Input boundary ---

    /// Normalized pointer position in board space
    pub fn on_pointer_move(&mut self, x: f32) {
        self.session.preview_x = x.clamp(0.0, self.config.width);
    }

    /// Drop request; cooldown and placement are validated in `sim::spawn`
    pub fn on_drop_requested(&mut self, now: f64) {
        super::spawn::request_drop(self, now);
    }

    /// Resize boundary: regenerate walls wholesale and recompute the radius
    /// regime. Existing discs are preserved - never lost or duplicated.
    pub fn on_board_resized(&mut self, width: f32, height: f32, compact: bool) {
        log::info!("board resized to {width}x{height} (compact: {compact})");
        let tuning = self.config.tuning;
        self.config = BoardConfig::new(width, height, compact);
        self.config.tuning = tuning;

        for handle in self.walls {
            self.physics.remove(handle);
        }
        self.walls = build_walls(&mut self.physics, &self.config);

        for disc in &self.discs {
            let radius = self.config.radius_for_value(disc.value);
            self.physics.set_radius(disc.body, radius);
            if let Some(pos) = self.physics.position(disc.body) {
                let clamped = Vec2::new(
                    pos.x.clamp(radius, width - radius),
                    pos.y.min(height - radius),
                );
                if clamped != pos {
                    self.physics.set_position(disc.body, clamped);
                }
            }
        }
        self.physics.wake_all();
        self.session.preview_x = self.session.preview_x.clamp(0.0, width);
    }

    // --- Discs ---

    /// Insert a disc, or reject at capacity (advisory event, soft failure)
    pub fn spawn_disc(&mut self, pos: Vec2, value: u32, now: f64) -> Option<DiscId> {
        if self.discs.len() >= MAX_DISCS {
            log::warn!("disc capacity reached ({MAX_DISCS}); spawn rejected");
            self.events.push(GameEvent::CapacityReached);
            return None;
        }
        let radius = self.config.radius_for_value(value);
        let body = self.physics.insert_disc(pos, radius);
        let id = DiscId(self.next_disc_id);
        self.next_disc_id += 1;
        self.discs.push(Disc {
            id,
            body,
            value,
            spawned_at: now,
            merging: false,
        });
        self.animations.set(id, body, Anim::SpawnGrow { started_at: now });
        Some(id)
    }

    /// Remove a disc and its physics body and animation. Safe on stale ids.
    pub fn remove_disc(&mut self, id: DiscId) {
        if let Some(i) = self.discs.iter().position(|d| d.id == id) {
            let disc = self.discs.remove(i);
            self.physics.remove(disc.body);
            self.animations.remove(id);
        }
    }

    pub fn disc(&self, id: DiscId) -> Option<&Disc> {
        self.discs.iter().find(|d| d.id == id)
    }

    pub fn disc_mut(&mut self, id: DiscId) -> Option<&mut Disc> {
        self.discs.iter_mut().find(|d| d.id == id)
    }

    pub fn disc_by_body(&self, body: BodyHandle) -> Option<&Disc> {
        self.discs.iter().find(|d| d.body == body)
    }

    pub fn draw_next_value(&mut self) -> u32 {
        let value = self.session.next_value;
        self.session.next_value = self.config.draw_spawn_value(&mut self.rng);
        value
    }

    // --- Score ---

    /// Add merge points; a new best is persisted through the boundary store,
    /// rate-limited to bound write frequency.
    pub fn add_score(&mut self, points: u64, now: f64) {
        self.session.score += points;
        if self.session.score > self.session.best_score {
            self.session.best_score = self.session.score;
            self.events.push(GameEvent::NewBestScore(self.session.best_score));
            self.best_dirty = true;
            if now - self.last_best_save_at >= BEST_SAVE_MIN_INTERVAL_MS {
                self.flush_best_score(now);
            }
        }
    }

    fn flush_best_score(&mut self, now: f64) {
        if !self.best_dirty {
            return;
        }
        if let Some(store) = self.store.as_mut() {
            store.save(self.session.best_score);
            log::debug!("best score saved: {}", self.session.best_score);
        }
        self.last_best_save_at = now;
        self.best_dirty = false;
    }

    // --- Output boundary ---

    /// Drain pending advisories
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Read-only state for the render boundary
    pub fn snapshot(&self, now: f64) -> FrameSnapshot {
        let discs = self
            .discs
            .iter()
            .filter_map(|disc| {
                let pos = self.physics.position(disc.body)?;
                let anim = self.animations.get(disc.id).map(|a| match a {
                    Anim::MergeGlide { .. } => AnimKind::Glide,
                    Anim::SpawnGrow { .. } => AnimKind::Grow,
                });
                Some(DiscView {
                    id: disc.id.0,
                    x: pos.x,
                    y: pos.y,
                    radius: self.config.radius_for_value(disc.value),
                    value: disc.value,
                    scale: self.animations.scale_for(disc.id, now),
                    anim,
                })
            })
            .collect();
        FrameSnapshot {
            discs,
            particles: self.particles.views(),
            session: SessionSummary {
                score: self.session.score,
                best_score: self.session.best_score,
                next_value: self.session.next_value,
                phase: self.session.phase,
                end_reason: self.session.end_reason.map(|r| r.as_str()),
                preview_x: self.session.preview_x,
            },
        }
    }
}

/// Insert the four boundary walls for the current board size. Walls sit just
/// outside the visible board; the floor spans the full width plus both
/// corners so discs can't escape diagonally.
fn build_walls(physics: &mut PhysicsWorld, config: &BoardConfig) -> [BodyHandle; 4] {
    let w = config.width;
    let h = config.height;
    let t = WALL_THICKNESS;
    let left = physics.insert_wall(
        Vec2::new(-t / 2.0, h / 2.0),
        Vec2::new(t / 2.0, h / 2.0 + t),
    );
    let right = physics.insert_wall(
        Vec2::new(w + t / 2.0, h / 2.0),
        Vec2::new(t / 2.0, h / 2.0 + t),
    );
    let floor = physics.insert_wall(
        Vec2::new(w / 2.0, h + t / 2.0),
        Vec2::new(w / 2.0 + t, t / 2.0),
    );
    let ceiling = physics.insert_wall(
        Vec2::new(w / 2.0, -t / 2.0),
        Vec2::new(w / 2.0 + t, t / 2.0),
    );
    [left, right, floor, ceiling]
}
