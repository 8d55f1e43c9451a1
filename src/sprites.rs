//! Sprite cache keys and per-value colors
//!
//! Drawing is the boundary's job; what lives here is the memoization
//! strategy. Sprites are keyed by (value, quantized radius, quantized pixel
//! density) so continuous resize doesn't mint a cache entry per sub-pixel
//! radius, and a regime change invalidates wholesale.

use std::collections::HashMap;

use serde::Serialize;

/// Radius buckets of 0.5 px
const RADIUS_BUCKET_PX: f32 = 0.5;
/// Pixel-density buckets of 0.25
const DPR_BUCKET: f64 = 0.25;

/// Per-value disc colors (RGB), indexed by `log2(value) - 1`
pub const DISC_COLORS: [[u8; 3]; 11] = [
    [0xe8, 0x4d, 0x4d], // 2
    [0xf0, 0x8a, 0x3c], // 4
    [0xf5, 0xc8, 0x42], // 8
    [0x8f, 0xc9, 0x3a], // 16
    [0x3d, 0xb8, 0x6b], // 32
    [0x35, 0xb5, 0xb0], // 64
    [0x3f, 0x8f, 0xe0], // 128
    [0x5a, 0x62, 0xd6], // 256
    [0x8e, 0x4e, 0xd0], // 512
    [0xc9, 0x45, 0xa8], // 1024
    [0xe0, 0x3e, 0x6e], // 2048
];

/// Color for values past the table. The source treats this as intentional,
/// not a bug to fix: everything beyond 2048 renders plain white.
pub const FALLBACK_COLOR: [u8; 3] = [0xff, 0xff, 0xff];

/// Color-table index for a value; saturates past the table for callers that
/// index palettes (particles)
pub fn color_index(value: u32) -> u8 {
    let level = crate::value_level(value);
    (level.saturating_sub(1)).min(DISC_COLORS.len() as u32 - 1) as u8
}

/// RGB for a disc value, with the documented fallback beyond the table
pub fn color_for_value(value: u32) -> [u8; 3] {
    let level = crate::value_level(value) as usize;
    if level >= 1 && level <= DISC_COLORS.len() {
        DISC_COLORS[level - 1]
    } else {
        FALLBACK_COLOR
    }
}

/// Memoization key for one rendered disc sprite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SpriteKey {
    pub value: u32,
    pub radius_bucket: u32,
    pub dpr_bucket: u32,
}

impl SpriteKey {
    pub fn new(value: u32, radius: f32, dpr: f64) -> Self {
        Self {
            value,
            radius_bucket: (radius / RADIUS_BUCKET_PX).round() as u32,
            dpr_bucket: (dpr / DPR_BUCKET).round() as u32,
        }
    }
}

/// Sprite memoization over an opaque payload the boundary draws with
pub struct SpriteCache<T> {
    entries: HashMap<SpriteKey, T>,
    hits: u64,
    misses: u64,
}

impl<T> SpriteCache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Fetch the sprite for a key, building it on first use
    pub fn get_or_insert_with(&mut self, key: SpriteKey, build: impl FnOnce() -> T) -> &T {
        if self.entries.contains_key(&key) {
            self.hits += 1;
        } else {
            self.misses += 1;
            self.entries.insert(key, build());
        }
        &self.entries[&key]
    }

    /// Wholesale invalidation on a regime change (resize, DPR switch)
    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl<T> Default for SpriteCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_quantizes_radius() {
        // Sub-bucket jitter maps to the same key
        let a = SpriteKey::new(2, 13.40, 1.0);
        let b = SpriteKey::new(2, 13.44, 1.0);
        assert_eq!(a, b);
        // A real change does not
        let c = SpriteKey::new(2, 16.0, 1.0);
        assert_ne!(a, c);
    }

    #[test]
    fn test_key_separates_dpr() {
        let a = SpriteKey::new(2, 13.0, 1.0);
        let b = SpriteKey::new(2, 13.0, 2.0);
        assert_ne!(a, b);
        // Sub-bucket DPR noise collapses
        let c = SpriteKey::new(2, 13.0, 2.05);
        assert_eq!(b, c);
    }

    #[test]
    fn test_cache_memoizes_and_invalidates() {
        let mut cache: SpriteCache<u32> = SpriteCache::new();
        let key = SpriteKey::new(4, 16.0, 1.0);
        let mut builds = 0;
        cache.get_or_insert_with(key, || {
            builds += 1;
            7
        });
        cache.get_or_insert_with(key, || {
            builds += 1;
            8
        });
        assert_eq!(builds, 1);
        assert_eq!(cache.len(), 1);
        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_color_table_and_fallback() {
        assert_eq!(color_for_value(2), DISC_COLORS[0]);
        assert_eq!(color_for_value(2048), DISC_COLORS[10]);
        // Beyond the table: the intentional fallback, preserved
        assert_eq!(color_for_value(4096), FALLBACK_COLOR);
        assert_eq!(color_index(4096), (DISC_COLORS.len() - 1) as u8);
    }
}
