//! Pooled visual particles
//!
//! Fixed-capacity struct-of-arrays store with free-list allocation. Bursts are
//! truncated when the pool is exhausted; the pool never grows. Slots are only
//! ever referenced by index inside this module's callers for the duration of
//! one operation - nothing outside the pool owns a particle.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::consts::{PARTICLE_DAMPING, PARTICLE_GRAVITY};

/// Burst size per merge, before radius scaling
const BURST_BASE: usize = 14;
/// Extra particles per px of the larger disc's radius
const BURST_PER_RADIUS: f32 = 0.5;

pub struct ParticlePool {
    capacity: usize,
    xs: Vec<f32>,
    ys: Vec<f32>,
    vxs: Vec<f32>,
    vys: Vec<f32>,
    sizes: Vec<f32>,
    initial_sizes: Vec<f32>,
    lives: Vec<f32>,
    initial_lives: Vec<f32>,
    spawned_at: Vec<f64>,
    colors: Vec<u8>,
    alive: Vec<bool>,
    free: Vec<u32>,
}

/// Read-only view of one live particle, for the render boundary
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct ParticleView {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub color: u8,
    /// 1.0 at spawn, 0.0 at expiry
    pub alpha: f32,
}

impl ParticlePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            xs: vec![0.0; capacity],
            ys: vec![0.0; capacity],
            vxs: vec![0.0; capacity],
            vys: vec![0.0; capacity],
            sizes: vec![0.0; capacity],
            initial_sizes: vec![0.0; capacity],
            lives: vec![0.0; capacity],
            initial_lives: vec![0.0; capacity],
            spawned_at: vec![0.0; capacity],
            colors: vec![0; capacity],
            alive: vec![false; capacity],
            free: (0..capacity as u32).rev().collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn live_count(&self) -> usize {
        self.capacity - self.free.len()
    }

    /// Pop a free slot. `None` means exhausted - callers skip the rest of
    /// their burst, never retry.
    pub fn acquire(&mut self) -> Option<usize> {
        let slot = self.free.pop()? as usize;
        self.alive[slot] = true;
        Some(slot)
    }

    /// Return a slot to the free list. Double-release and out-of-range
    /// indices are no-ops.
    pub fn release(&mut self, slot: usize) {
        if slot >= self.capacity || !self.alive[slot] {
            return;
        }
        self.alive[slot] = false;
        self.free.push(slot as u32);
    }

    /// Spawn a merge burst around `center`, scaled to the merged disc radius
    pub fn spawn_burst(&mut self, rng: &mut Pcg32, center: Vec2, radius: f32, color: u8, now: f64) {
        let count = BURST_BASE + (radius * BURST_PER_RADIUS) as usize;
        for _ in 0..count {
            let Some(slot) = self.acquire() else {
                break;
            };
            let angle = rng.random_range(0.0..std::f32::consts::TAU);
            let speed = rng.random_range(60.0..220.0) + radius * 2.0;
            let size = rng.random_range(2.0..5.0) + radius * 0.08;
            let life = rng.random_range(0.4..0.9);
            self.xs[slot] = center.x + angle.cos() * radius * 0.5;
            self.ys[slot] = center.y + angle.sin() * radius * 0.5;
            self.vxs[slot] = angle.cos() * speed;
            self.vys[slot] = angle.sin() * speed - 40.0;
            self.sizes[slot] = size;
            self.initial_sizes[slot] = size;
            self.lives[slot] = life;
            self.initial_lives[slot] = life;
            self.spawned_at[slot] = now;
            self.colors[slot] = color;
        }
    }

    /// Advance all live particles by `dt` seconds
    pub fn update(&mut self, dt: f32) {
        for slot in 0..self.capacity {
            if !self.alive[slot] {
                continue;
            }
            self.lives[slot] -= dt;
            if self.lives[slot] <= 0.0 {
                self.release(slot);
                continue;
            }
            self.vys[slot] += PARTICLE_GRAVITY * dt;
            self.vxs[slot] *= PARTICLE_DAMPING;
            self.vys[slot] *= PARTICLE_DAMPING;
            self.xs[slot] += self.vxs[slot] * dt;
            self.ys[slot] += self.vys[slot] * dt;
            // Size tracks remaining life fraction
            let frac = self.lives[slot] / self.initial_lives[slot];
            self.sizes[slot] = self.initial_sizes[slot] * frac.max(0.0);
        }
    }

    /// Wall-clock spawn time of a live slot
    pub fn spawn_time(&self, slot: usize) -> Option<f64> {
        (slot < self.capacity && self.alive[slot]).then(|| self.spawned_at[slot])
    }

    /// Drop every live particle (restart)
    pub fn clear(&mut self) {
        for slot in 0..self.capacity {
            if self.alive[slot] {
                self.release(slot);
            }
        }
    }

    /// Snapshot live particles for rendering
    pub fn views(&self) -> Vec<ParticleView> {
        (0..self.capacity)
            .filter(|&slot| self.alive[slot])
            .map(|slot| ParticleView {
                x: self.xs[slot],
                y: self.ys[slot],
                size: self.sizes[slot],
                color: self.colors[slot],
                alpha: (self.lives[slot] / self.initial_lives[slot]).clamp(0.0, 1.0),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_acquire_release_roundtrip() {
        let mut pool = ParticlePool::new(4);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_ne!(a, b);
        assert_eq!(pool.live_count(), 2);
        pool.release(a);
        assert_eq!(pool.live_count(), 1);
        pool.release(a); // double release is a no-op
        assert_eq!(pool.live_count(), 1);
        pool.release(9999); // out of range is a no-op
        assert_eq!(pool.live_count(), 1);
    }

    #[test]
    fn test_exhaustion_returns_none() {
        let mut pool = ParticlePool::new(2);
        assert!(pool.acquire().is_some());
        assert!(pool.acquire().is_some());
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn test_burst_truncated_under_load() {
        let mut pool = ParticlePool::new(8);
        let mut rng = Pcg32::seed_from_u64(1);
        pool.spawn_burst(&mut rng, Vec2::new(100.0, 100.0), 40.0, 0, 0.0);
        assert_eq!(pool.live_count(), 8);
    }

    #[test]
    fn test_expired_particles_are_released() {
        let mut pool = ParticlePool::new(16);
        let mut rng = Pcg32::seed_from_u64(1);
        pool.spawn_burst(&mut rng, Vec2::ZERO, 10.0, 0, 0.0);
        assert!(pool.live_count() > 0);
        for _ in 0..300 {
            pool.update(1.0 / 60.0);
        }
        assert_eq!(pool.live_count(), 0);
        // Slots are reusable after expiry
        assert!(pool.acquire().is_some());
    }

    #[test]
    fn test_size_shrinks_with_life() {
        let mut pool = ParticlePool::new(4);
        let mut rng = Pcg32::seed_from_u64(3);
        pool.spawn_burst(&mut rng, Vec2::ZERO, 10.0, 0, 0.0);
        let before: f32 = pool.views().iter().map(|v| v.size).sum();
        pool.update(0.2);
        let after: f32 = pool.views().iter().map(|v| v.size).sum();
        assert!(after < before);
    }
}
