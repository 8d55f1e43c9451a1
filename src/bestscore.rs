//! Best-score persistence boundary
//!
//! The core only ever needs one number back. Writes happen on a new best
//! and are rate-limited by the session (see `GameState::add_score`), so a
//! merge cascade doesn't hammer the store.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage boundary: the host decides where the number lives
pub trait BestScoreStore {
    fn load(&mut self) -> u64;
    fn save(&mut self, score: u64);
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct BestFile {
    best: u64,
}

/// JSON file store for native hosts. Load failures (missing file, bad JSON)
/// fall back to zero; write failures are logged and swallowed - losing a
/// best-score write never disturbs the session.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BestScoreStore for JsonFileStore {
    fn load(&mut self) -> u64 {
        match std::fs::read_to_string(&self.path) {
            Ok(json) => match serde_json::from_str::<BestFile>(&json) {
                Ok(file) => {
                    log::info!("loaded best score: {}", file.best);
                    file.best
                }
                Err(e) => {
                    log::warn!("best score file unreadable ({e}); starting fresh");
                    0
                }
            },
            Err(_) => {
                log::info!("no best score file; starting fresh");
                0
            }
        }
    }

    fn save(&mut self, score: u64) {
        let file = BestFile { best: score };
        match serde_json::to_string(&file) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    log::warn!("failed to save best score: {e}");
                }
            }
            Err(e) => log::warn!("failed to encode best score: {e}"),
        }
    }
}

/// In-memory store recording every write, for tests
#[cfg(test)]
#[derive(Clone, Default)]
pub struct RecordingStore {
    saves: std::rc::Rc<std::cell::RefCell<Vec<u64>>>,
}

#[cfg(test)]
impl RecordingStore {
    pub fn shared() -> Self {
        Self::default()
    }

    pub fn saves(&self) -> Vec<u64> {
        self.saves.borrow().clone()
    }
}

#[cfg(test)]
impl BestScoreStore for RecordingStore {
    fn load(&mut self) -> u64 {
        self.saves.borrow().last().copied().unwrap_or(0)
    }

    fn save(&mut self, score: u64) {
        self.saves.borrow_mut().push(score);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = std::env::temp_dir().join("fusefall_test_bestscore");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("best.json");
        let _ = std::fs::remove_file(&path);

        let mut store = JsonFileStore::new(&path);
        assert_eq!(store.load(), 0);
        store.save(1024);
        assert_eq!(store.load(), 1024);
        store.save(4096);
        assert_eq!(store.load(), 4096);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_zero() {
        let dir = std::env::temp_dir().join("fusefall_test_bestscore");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("corrupt.json");
        std::fs::write(&path, "not json").unwrap();

        let mut store = JsonFileStore::new(&path);
        assert_eq!(store.load(), 0);

        let _ = std::fs::remove_file(&path);
    }
}
