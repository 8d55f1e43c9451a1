//! Game settings and preferences
//!
//! Persisted by the host as JSON, separately from the best score.

use serde::{Deserialize, Serialize};

use crate::consts::MAX_PARTICLES;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Particle cap for this preset. Only Low trims the pool; the default
    /// keeps its full capacity.
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 100,
            QualityPreset::Medium | QualityPreset::High => MAX_PARTICLES,
        }
    }

    /// Device-pixel-ratio cap for sprite rendering; low quality renders at
    /// 1x regardless of the display
    pub fn dpr_cap(&self) -> f64 {
        match self {
            QualityPreset::Low => 1.0,
            QualityPreset::Medium => 1.5,
            QualityPreset::High => 2.0,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,
    /// Particle effects (merge bursts)
    pub particles: bool,
    /// Show the FPS counter
    pub show_fps: bool,
    /// Reduced motion (skip spawn/merge animations at the render layer)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            particles: true,
            show_fps: false,
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Effective particle pool capacity
    pub fn effective_max_particles(&self) -> usize {
        if !self.particles {
            0
        } else {
            self.quality.max_particles().min(MAX_PARTICLES)
        }
    }

    /// Effective pixel density for the sprite cache key
    pub fn effective_dpr(&self, device_dpr: f64) -> f64 {
        device_dpr.min(self.quality.dpr_cap())
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".into())
    }

    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("settings unreadable ({e}); using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_roundtrip() {
        for preset in [QualityPreset::Low, QualityPreset::Medium, QualityPreset::High] {
            assert_eq!(QualityPreset::from_str(preset.as_str()), Some(preset));
        }
        assert_eq!(QualityPreset::from_str("ultra"), None);
    }

    #[test]
    fn test_particles_off_zeroes_pool() {
        let mut settings = Settings::default();
        settings.particles = false;
        assert_eq!(settings.effective_max_particles(), 0);
    }

    #[test]
    fn test_dpr_capped_by_quality() {
        let mut settings = Settings::default();
        settings.quality = QualityPreset::Low;
        assert_eq!(settings.effective_dpr(3.0), 1.0);
        settings.quality = QualityPreset::High;
        assert_eq!(settings.effective_dpr(3.0), 2.0);
        assert_eq!(settings.effective_dpr(1.0), 1.0);
    }

    #[test]
    fn test_json_roundtrip_and_bad_input() {
        let settings = Settings {
            quality: QualityPreset::High,
            particles: true,
            show_fps: true,
            reduced_motion: false,
        };
        let json = settings.to_json();
        let back = Settings::from_json(&json);
        assert_eq!(back.quality, QualityPreset::High);
        assert!(back.show_fps);

        let fallback = Settings::from_json("definitely not json");
        assert_eq!(fallback.quality, QualityPreset::Medium);
    }
}
