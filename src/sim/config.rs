//! Resolution-derived board configuration
//!
//! Everything here is a pure function of the board dimensions and layout
//! regime. Nothing is cached outside `BoardConfig`; a resize builds a fresh
//! value and downstream radii are recomputed from it.

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// Disc radius curve: base fraction of board width per regime
const BASE_RADIUS_FRAC: f32 = 0.028;
const BASE_RADIUS_FRAC_COMPACT: f32 = 0.034;
/// Growth factor per doubling of value
const RADIUS_GROWTH: f32 = 1.22;
/// Radius ceiling as a fraction of board width
const MAX_RADIUS_FRAC: f32 = 0.16;

/// Danger line and spawn height as fractions of board height
const DANGER_Y_FRAC: f32 = 0.14;
const SPAWN_Y_FRAC: f32 = 0.07;
/// Stalemate band extends this far below the danger line
const DANGER_BAND_FRAC: f32 = 0.12;

/// Spawnable values and their draw weights (low values common)
const SPAWN_VALUES: [u32; 4] = [2, 4, 8, 16];
const SPAWN_WEIGHTS: [u32; 4] = [4, 3, 2, 1];

/// Physics tuning scalars, resolution-independent
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    /// Downward acceleration (px/s^2)
    pub gravity: f32,
    /// Contact bounciness, 0..1
    pub restitution: f32,
    /// Tangential velocity loss per contact, 0..1
    pub friction: f32,
    /// Speed clamp against tunneling (px/s)
    pub max_speed: f32,
    /// Below this speed a body starts its sleep timer (px/s)
    pub sleep_speed: f32,
    /// Sustained low speed required before sleeping (s)
    pub sleep_delay: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            gravity: 1800.0,
            restitution: 0.25,
            friction: 0.08,
            max_speed: 1600.0,
            sleep_speed: 10.0,
            sleep_delay: 0.5,
        }
    }
}

/// Derived constants for one board size / layout regime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    pub width: f32,
    pub height: f32,
    /// Compact (narrow/portrait) layout uses a larger radius regime
    pub compact: bool,
    /// Discs whose top crosses this y end the session
    pub danger_y: f32,
    /// Fixed drop height
    pub spawn_y: f32,
    pub tuning: PhysicsTuning,
}

impl BoardConfig {
    pub fn new(width: f32, height: f32, compact: bool) -> Self {
        Self {
            width,
            height,
            compact,
            danger_y: height * DANGER_Y_FRAC,
            spawn_y: height * SPAWN_Y_FRAC,
            tuning: PhysicsTuning::default(),
        }
    }

    /// Disc radius for a value under the current regime.
    ///
    /// Pure function of (value, board); never stored as independent state.
    pub fn radius_for_value(&self, value: u32) -> f32 {
        let base_frac = if self.compact {
            BASE_RADIUS_FRAC_COMPACT
        } else {
            BASE_RADIUS_FRAC
        };
        let level = crate::value_level(value);
        let r = self.width * base_frac * RADIUS_GROWTH.powi(level as i32 - 1);
        r.min(self.width * MAX_RADIUS_FRAC)
    }

    /// Lower edge of the stalemate band below the danger line
    pub fn danger_band_bottom(&self) -> f32 {
        self.danger_y + self.height * DANGER_BAND_FRAC
    }

    /// Draw the next spawnable value from the weighted distribution
    pub fn draw_spawn_value(&self, rng: &mut Pcg32) -> u32 {
        let total: u32 = SPAWN_WEIGHTS.iter().sum();
        let mut roll = rng.random_range(0..total);
        for (value, weight) in SPAWN_VALUES.iter().zip(SPAWN_WEIGHTS) {
            if roll < weight {
                return *value;
            }
            roll -= weight;
        }
        SPAWN_VALUES[0]
    }
}
