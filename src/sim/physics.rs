//! Circle rigid-body world
//!
//! From-scratch solver for the one case the game needs: dynamic circles under
//! gravity, confined by four static rectangular walls. Impulse response with
//! restitution and tangential friction, positional overlap correction, a speed
//! clamp against tunneling, and per-body sleeping.
//!
//! Bodies are referenced by stable integer handles. A removed handle never
//! resolves to a live body again. Insert/remove only between ticks; removal
//! mid-step is undefined.

use glam::Vec2;
use std::collections::HashSet;

use super::config::PhysicsTuning;

/// Overlap solver passes per step (stacking stability)
const SOLVER_ITERATIONS: usize = 4;
/// Contact slop: pairs within this gap count as touching (px)
const CONTACT_SLOP: f32 = 0.5;
/// Contacts gentler than this leave a sleeping body asleep (px/s)
const WAKE_SPEED: f32 = 30.0;

/// Stable identifier for a body in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(u32);

impl BodyHandle {
    pub fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
enum Shape {
    Circle { radius: f32 },
    Rect { half: Vec2 },
}

#[derive(Debug, Clone)]
struct Body {
    handle: BodyHandle,
    shape: Shape,
    pos: Vec2,
    vel: Vec2,
    dynamic: bool,
    /// Animation-driven: skipped by integration and the solver
    kinematic: bool,
    sleeping: bool,
    low_speed_time: f32,
}

impl Body {
    fn radius(&self) -> f32 {
        match self.shape {
            Shape::Circle { radius } => radius,
            Shape::Rect { .. } => 0.0,
        }
    }

    /// Mass proportional to area; equal density for all discs
    fn mass(&self) -> f32 {
        let r = self.radius();
        (r * r).max(1.0)
    }

    fn wake(&mut self) {
        self.sleeping = false;
        self.low_speed_time = 0.0;
    }
}

/// A pair that came into contact this tick. Speeds are pre-solve (at the
/// moment of impact, before restitution) - the merge gate needs the approach
/// speed, not the rebound.
#[derive(Debug, Clone, Copy)]
pub struct ContactStart {
    pub a: BodyHandle,
    pub b: BodyHandle,
    pub speed_a: f32,
    pub speed_b: f32,
    pub rel_speed: f32,
}

/// The simulation world: circle bodies plus static walls
pub struct PhysicsWorld {
    tuning: PhysicsTuning,
    bodies: Vec<Body>,
    next_handle: u32,
    prev_contacts: HashSet<(u32, u32)>,
    collision_starts: Vec<ContactStart>,
}

impl PhysicsWorld {
    pub fn new(tuning: PhysicsTuning) -> Self {
        Self {
            tuning,
            bodies: Vec::new(),
            next_handle: 1,
            prev_contacts: HashSet::new(),
            collision_starts: Vec::new(),
        }
    }

    fn alloc_handle(&mut self) -> BodyHandle {
        let h = BodyHandle(self.next_handle);
        self.next_handle += 1;
        h
    }

    pub fn insert_disc(&mut self, pos: Vec2, radius: f32) -> BodyHandle {
        let handle = self.alloc_handle();
        self.bodies.push(Body {
            handle,
            shape: Shape::Circle { radius },
            pos,
            vel: Vec2::ZERO,
            dynamic: true,
            kinematic: false,
            sleeping: false,
            low_speed_time: 0.0,
        });
        handle
    }

    pub fn insert_wall(&mut self, center: Vec2, half: Vec2) -> BodyHandle {
        let handle = self.alloc_handle();
        self.bodies.push(Body {
            handle,
            shape: Shape::Rect { half },
            pos: center,
            vel: Vec2::ZERO,
            dynamic: false,
            kinematic: false,
            sleeping: false,
            low_speed_time: 0.0,
        });
        handle
    }

    /// Remove a body. Must not be called during `step`.
    pub fn remove(&mut self, handle: BodyHandle) -> bool {
        let before = self.bodies.len();
        self.bodies.retain(|b| b.handle != handle);
        self.bodies.len() != before
    }

    fn index_of(&self, handle: BodyHandle) -> Option<usize> {
        self.bodies.iter().position(|b| b.handle == handle)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.index_of(handle).is_some()
    }

    pub fn is_disc(&self, handle: BodyHandle) -> bool {
        self.index_of(handle)
            .map(|i| matches!(self.bodies[i].shape, Shape::Circle { .. }))
            .unwrap_or(false)
    }

    pub fn position(&self, handle: BodyHandle) -> Option<Vec2> {
        self.index_of(handle).map(|i| self.bodies[i].pos)
    }

    pub fn velocity(&self, handle: BodyHandle) -> Option<Vec2> {
        self.index_of(handle).map(|i| self.bodies[i].vel)
    }

    pub fn speed(&self, handle: BodyHandle) -> f32 {
        self.velocity(handle).map(|v| v.length()).unwrap_or(0.0)
    }

    pub fn radius_of(&self, handle: BodyHandle) -> Option<f32> {
        self.index_of(handle).map(|i| self.bodies[i].radius())
    }

    pub fn set_position(&mut self, handle: BodyHandle, pos: Vec2) {
        if let Some(i) = self.index_of(handle) {
            self.bodies[i].pos = pos;
        }
    }

    pub fn set_velocity(&mut self, handle: BodyHandle, vel: Vec2) {
        if let Some(i) = self.index_of(handle) {
            self.bodies[i].vel = vel;
            self.bodies[i].wake();
        }
    }

    pub fn apply_impulse(&mut self, handle: BodyHandle, dv: Vec2) {
        if let Some(i) = self.index_of(handle) {
            self.bodies[i].vel += dv;
            self.bodies[i].wake();
        }
    }

    /// Radius is derived state; the caller recomputes it on regime changes
    pub fn set_radius(&mut self, handle: BodyHandle, radius: f32) {
        if let Some(i) = self.index_of(handle) {
            if let Shape::Circle { radius: r } = &mut self.bodies[i].shape {
                *r = radius;
            }
        }
    }

    /// Kinematic bodies follow externally-driven positions (merge glide)
    pub fn set_kinematic(&mut self, handle: BodyHandle, kinematic: bool) {
        if let Some(i) = self.index_of(handle) {
            self.bodies[i].kinematic = kinematic;
            if kinematic {
                self.bodies[i].vel = Vec2::ZERO;
            }
            self.bodies[i].wake();
        }
    }

    /// Wake every dynamic body (wall geometry changed)
    pub fn wake_all(&mut self) {
        for body in &mut self.bodies {
            if body.dynamic {
                body.wake();
            }
        }
    }

    pub fn is_sleeping(&self, handle: BodyHandle) -> bool {
        self.index_of(handle)
            .map(|i| self.bodies[i].sleeping)
            .unwrap_or(false)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Collision-start pairs from the most recent `step`
    pub fn collision_starts(&self) -> &[ContactStart] {
        &self.collision_starts
    }

    /// Advance the world by `dt` seconds
    pub fn step(&mut self, dt: f32) {
        self.collision_starts.clear();

        // Integrate awake dynamic bodies
        let gravity = self.tuning.gravity;
        let max_speed = self.tuning.max_speed;
        for body in &mut self.bodies {
            if !body.dynamic || body.kinematic || body.sleeping {
                continue;
            }
            body.vel.y += gravity * dt;
            let speed = body.vel.length();
            if speed > max_speed {
                body.vel = body.vel * (max_speed / speed);
            }
            body.pos += body.vel * dt;
        }

        // Impact velocities, snapshotted before the solver rewrites them
        let pre_solve: Vec<(u32, Vec2)> = self
            .bodies
            .iter()
            .map(|b| (b.handle.0, b.vel))
            .collect();

        // Overlap resolution
        for _ in 0..SOLVER_ITERATIONS {
            self.solve_pairs();
            self.solve_walls();
        }

        // Contact set and start events
        let touching = self.touching_pairs();
        let vel_of = |raw: u32| {
            pre_solve
                .iter()
                .find(|(h, _)| *h == raw)
                .map(|(_, v)| *v)
                .unwrap_or(Vec2::ZERO)
        };
        // Events in ascending handle order: detection order must be stable
        let mut fresh: Vec<(u32, u32)> = touching
            .iter()
            .filter(|pair| !self.prev_contacts.contains(pair))
            .copied()
            .collect();
        fresh.sort_unstable();
        for (a, b) in fresh {
            let va = vel_of(a);
            let vb = vel_of(b);
            self.collision_starts.push(ContactStart {
                a: BodyHandle(a),
                b: BodyHandle(b),
                speed_a: va.length(),
                speed_b: vb.length(),
                rel_speed: (va - vb).length(),
            });
        }
        self.prev_contacts = touching;

        // Sleep bookkeeping
        let sleep_speed = self.tuning.sleep_speed;
        let sleep_delay = self.tuning.sleep_delay;
        for body in &mut self.bodies {
            if !body.dynamic || body.kinematic || body.sleeping {
                continue;
            }
            if body.vel.length() < sleep_speed {
                body.low_speed_time += dt;
                if body.low_speed_time >= sleep_delay {
                    body.sleeping = true;
                    body.vel = Vec2::ZERO;
                }
            } else {
                body.low_speed_time = 0.0;
            }
        }
    }

    /// Circle-circle resolution, one pass
    fn solve_pairs(&mut self) {
        let n = self.bodies.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (left, right) = self.bodies.split_at_mut(j);
                let a = &mut left[i];
                let b = &mut right[0];
                let (ra, rb) = match (a.shape, b.shape) {
                    (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => (ra, rb),
                    _ => continue,
                };
                if a.kinematic || b.kinematic {
                    continue;
                }

                let delta = b.pos - a.pos;
                let dist = delta.length();
                let min_dist = ra + rb;
                if dist >= min_dist {
                    continue;
                }
                let normal = if dist > 1e-4 { delta / dist } else { Vec2::Y };
                let overlap = min_dist - dist;

                let rel = b.vel - a.vel;
                let vn = rel.dot(normal);
                let gentle = vn.abs() < WAKE_SPEED;

                // A sleeping body only yields to a forceful contact; gentle
                // pressure from settling neighbors treats it as static.
                let (ma, mb) = (a.mass(), b.mass());
                let (wa, wb) = match (a.sleeping, b.sleeping) {
                    (true, true) => continue,
                    (true, false) if gentle => (0.0, 1.0),
                    (false, true) if gentle => (1.0, 0.0),
                    _ => {
                        let total = ma + mb;
                        (mb / total, ma / total)
                    }
                };
                // Forceful contacts wake sleepers; awake bodies keep their
                // sleep timers so gentle persistent pressure can still settle.
                if a.sleeping && wa > 0.0 {
                    a.wake();
                }
                if b.sleeping && wb > 0.0 {
                    b.wake();
                }

                a.pos -= normal * (overlap * wa);
                b.pos += normal * (overlap * wb);

                if vn < 0.0 {
                    let e = self.tuning.restitution;
                    let inv_ma = if wa > 0.0 { 1.0 / ma } else { 0.0 };
                    let inv_mb = if wb > 0.0 { 1.0 / mb } else { 0.0 };
                    let inv_sum = inv_ma + inv_mb;
                    if inv_sum > 0.0 {
                        let impulse = -(1.0 + e) * vn / inv_sum;
                        a.vel -= normal * (impulse * inv_ma);
                        b.vel += normal * (impulse * inv_mb);

                        // Friction: remove a fraction of tangential relative velocity
                        let tangential = rel - normal * vn;
                        let jt = tangential * self.tuning.friction;
                        a.vel += jt * (wa);
                        b.vel -= jt * (wb);
                    }
                }
            }
        }
    }

    /// Circle-wall resolution, one pass
    fn solve_walls(&mut self) {
        let walls: Vec<(Vec2, Vec2)> = self
            .bodies
            .iter()
            .filter_map(|b| match b.shape {
                Shape::Rect { half } => Some((b.pos, half)),
                _ => None,
            })
            .collect();

        for body in &mut self.bodies {
            let radius = match body.shape {
                Shape::Circle { radius } => radius,
                _ => continue,
            };
            if body.kinematic || body.sleeping {
                continue;
            }
            for &(center, half) in &walls {
                let min = center - half;
                let max = center + half;
                let closest = body.pos.clamp(min, max);
                let delta = body.pos - closest;
                let dist = delta.length();
                if dist >= radius {
                    continue;
                }

                let (normal, penetration) = if dist > 1e-4 {
                    (delta / dist, radius - dist)
                } else {
                    // Center inside the wall: push out along the shallowest face
                    let to_left = body.pos.x - min.x;
                    let to_right = max.x - body.pos.x;
                    let to_top = body.pos.y - min.y;
                    let to_bottom = max.y - body.pos.y;
                    let shallowest = to_left.min(to_right).min(to_top).min(to_bottom);
                    let normal = if shallowest == to_left {
                        Vec2::new(-1.0, 0.0)
                    } else if shallowest == to_right {
                        Vec2::new(1.0, 0.0)
                    } else if shallowest == to_top {
                        Vec2::new(0.0, -1.0)
                    } else {
                        Vec2::new(0.0, 1.0)
                    };
                    (normal, radius + shallowest)
                };

                body.pos += normal * penetration;
                let vn = body.vel.dot(normal);
                if vn < 0.0 {
                    body.vel -= normal * (vn * (1.0 + self.tuning.restitution));
                    let tangential = body.vel - normal * body.vel.dot(normal);
                    body.vel -= tangential * self.tuning.friction;
                }
            }
        }
    }

    /// Pairs currently in contact (within slop), keyed by ordered raw handles
    fn touching_pairs(&self) -> HashSet<(u32, u32)> {
        let mut touching = HashSet::new();
        let n = self.bodies.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let a = &self.bodies[i];
                let b = &self.bodies[j];
                let in_contact = match (a.shape, b.shape) {
                    (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
                        (b.pos - a.pos).length() <= ra + rb + CONTACT_SLOP
                    }
                    (Shape::Circle { radius }, Shape::Rect { half }) => {
                        circle_touches_rect(a.pos, radius, b.pos, half)
                    }
                    (Shape::Rect { half }, Shape::Circle { radius }) => {
                        circle_touches_rect(b.pos, radius, a.pos, half)
                    }
                    (Shape::Rect { .. }, Shape::Rect { .. }) => false,
                };
                if in_contact {
                    let key = if a.handle.0 < b.handle.0 {
                        (a.handle.0, b.handle.0)
                    } else {
                        (b.handle.0, a.handle.0)
                    };
                    touching.insert(key);
                }
            }
        }
        touching
    }
}

fn circle_touches_rect(pos: Vec2, radius: f32, center: Vec2, half: Vec2) -> bool {
    let closest = pos.clamp(center - half, center + half);
    (pos - closest).length() <= radius + CONTACT_SLOP
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(PhysicsTuning::default())
    }

    /// Floor spanning x 0..480 at y=720
    fn world_with_floor() -> PhysicsWorld {
        let mut w = world();
        w.insert_wall(Vec2::new(240.0, 760.0), Vec2::new(400.0, 40.0));
        w
    }

    #[test]
    fn test_gravity_accelerates_downward() {
        let mut w = world();
        let h = w.insert_disc(Vec2::new(100.0, 100.0), 10.0);
        for _ in 0..10 {
            w.step(1.0 / 120.0);
        }
        let v = w.velocity(h).unwrap();
        assert!(v.y > 0.0);
        let p = w.position(h).unwrap();
        assert!(p.y > 100.0);
    }

    #[test]
    fn test_disc_rests_on_floor() {
        let mut w = world_with_floor();
        let h = w.insert_disc(Vec2::new(240.0, 600.0), 12.0);
        for _ in 0..600 {
            w.step(1.0 / 120.0);
        }
        let p = w.position(h).unwrap();
        // Resting on the floor top (y=720) with its radius
        assert!((p.y - (720.0 - 12.0)).abs() < 2.0, "y = {}", p.y);
        assert!(w.speed(h) < 20.0);
    }

    #[test]
    fn test_speed_clamped() {
        let mut w = world();
        let h = w.insert_disc(Vec2::new(100.0, 100.0), 10.0);
        w.set_velocity(h, Vec2::new(0.0, 1e6));
        w.step(1.0 / 120.0);
        assert!(w.speed(h) <= PhysicsTuning::default().max_speed + 1.0);
    }

    #[test]
    fn test_collision_start_fires_once_per_contact() {
        let mut w = world_with_floor();
        let h = w.insert_disc(Vec2::new(240.0, 700.0), 12.0);
        let mut starts = 0;
        for _ in 0..240 {
            w.step(1.0 / 120.0);
            starts += w
                .collision_starts()
                .iter()
                .filter(|c| c.a == h || c.b == h)
                .count();
        }
        // One touchdown; small bounces may re-trigger but continuous rest must not
        assert!(starts >= 1 && starts < 10, "starts = {starts}");
    }

    #[test]
    fn test_overlapping_discs_separate() {
        let mut w = world_with_floor();
        let a = w.insert_disc(Vec2::new(238.0, 600.0), 12.0);
        let b = w.insert_disc(Vec2::new(242.0, 600.0), 12.0);
        for _ in 0..300 {
            w.step(1.0 / 120.0);
        }
        let pa = w.position(a).unwrap();
        let pb = w.position(b).unwrap();
        assert!((pb - pa).length() >= 24.0 - 0.5);
    }

    #[test]
    fn test_settled_disc_sleeps_and_wakes() {
        let mut w = world_with_floor();
        let h = w.insert_disc(Vec2::new(240.0, 700.0), 12.0);
        for _ in 0..600 {
            w.step(1.0 / 120.0);
        }
        assert!(w.is_sleeping(h));
        w.apply_impulse(h, Vec2::new(200.0, -200.0));
        assert!(!w.is_sleeping(h));
    }

    #[test]
    fn test_removed_handle_never_resolves() {
        let mut w = world();
        let h = w.insert_disc(Vec2::new(100.0, 100.0), 10.0);
        assert!(w.remove(h));
        assert!(!w.contains(h));
        assert!(!w.remove(h));
        let h2 = w.insert_disc(Vec2::new(100.0, 100.0), 10.0);
        assert_ne!(h, h2);
    }

    #[test]
    fn test_kinematic_skips_gravity_and_contacts() {
        let mut w = world_with_floor();
        let h = w.insert_disc(Vec2::new(240.0, 700.0), 12.0);
        w.set_kinematic(h, true);
        let before = w.position(h).unwrap();
        for _ in 0..120 {
            w.step(1.0 / 120.0);
        }
        assert_eq!(w.position(h).unwrap(), before);
    }
}
