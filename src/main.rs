//! Fusefall entry point
//!
//! Headless demo: drives a scripted session through the real runner and tick
//! path on a synthetic 144 Hz clock, logging session events and the outcome.

use fusefall::bestscore::JsonFileStore;
use fusefall::runner::StepRunner;
use fusefall::sim::{self, BoardConfig, GameEvent, GamePhase, GameState};
use fusefall::Settings;

fn main() {
    env_logger::init();
    log::info!("Fusefall (headless demo) starting...");

    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    let settings = Settings::default();
    let config = BoardConfig::new(480.0, 720.0, false);
    let store = Box::new(JsonFileStore::new("fusefall_best.json"));
    let mut state = GameState::new(config, &settings, seed, Some(store));
    let mut runner = StepRunner::new();

    state.start(0.0);

    let frame_ms = 1000.0 / 144.0;
    let mut now = 0.0_f64;
    let mut next_drop = 500.0_f64;

    while now < 120_000.0 {
        now += frame_ms;

        // Sweep the pointer and drop on a steady cadence
        let x = 240.0 + 190.0 * ((now / 1700.0).sin() as f32);
        state.on_pointer_move(x);
        if state.is_running() && now >= next_drop {
            state.on_drop_requested(now);
            next_drop = now + 600.0;
        }

        runner.frame(now, |dt| sim::tick(&mut state, dt, now));
        sim::frame_advance(&mut state, (frame_ms / 1000.0) as f32, now);

        for event in state.take_events() {
            match event {
                GameEvent::Merged { value } => log::info!("merged into {value}"),
                GameEvent::NewBestScore(best) => log::info!("new best score: {best}"),
                GameEvent::CapacityReached => log::warn!("board at capacity"),
                GameEvent::SessionEnded(reason) => log::info!("game over: {reason}"),
                GameEvent::Dropped { .. } => {}
            }
        }

        if state.session.phase == GamePhase::Ended {
            break;
        }
    }

    let snapshot = state.snapshot(now);
    log::info!(
        "demo finished after {:.1}s: score {}, best {}, {} discs on board, target {:.0} Hz",
        now / 1000.0,
        snapshot.session.score,
        snapshot.session.best_score,
        snapshot.discs.len(),
        runner.target_hz()
    );
}
