//! Adaptive fixed-timestep frame driver
//!
//! Called once per animation frame with the wall clock. A short warm-up
//! probes the host's refresh cadence to pick the tick-rate ceiling; after
//! that, achieved FPS is measured over one-second windows and the target
//! rate backs off when the host can't keep up. Elapsed time accumulates and
//! drains in whole tick intervals, with the per-invocation delta capped so a
//! backgrounded tab doesn't trigger a catch-up avalanche on resume.

/// Tick-rate clamp (Hz)
const MIN_TICK_HZ: f64 = 60.0;
const MAX_TICK_HZ: f64 = 240.0;
/// Default target before the cadence probe completes
const DEFAULT_TICK_HZ: f64 = 120.0;
/// Frames sampled by the warm-up probe
const WARMUP_FRAMES: usize = 20;
/// Per-frame delta cap (ms) - spiral-of-death guard
const MAX_FRAME_DELTA_MS: f64 = 250.0;
/// Safe numeric band for a single tick dt (seconds)
const TICK_DT_MIN: f32 = 1.0 / 480.0;
const TICK_DT_MAX: f32 = 1.0 / 30.0;
/// FPS measurement window (ms)
const FPS_WINDOW_MS: f64 = 1000.0;
/// Persistent shortfall below this fraction of target lowers the rate
const SLOW_FRACTION: f64 = 0.9;
/// Consecutive slow windows before backing off
const SLOW_WINDOWS: u32 = 2;
/// Back-off / recovery factors for the target rate
const BACKOFF: f64 = 0.75;
const RECOVERY: f64 = 1.25;

pub struct StepRunner {
    target_hz: f64,
    /// Probed refresh ceiling; the target never exceeds it
    ceiling_hz: f64,
    accumulator_ms: f64,
    last_frame_at: f64,
    warmup_deltas: Vec<f64>,
    probed: bool,
    window_start: f64,
    frames_in_window: u32,
    fps: f64,
    slow_streak: u32,
    good_streak: u32,
}

impl StepRunner {
    pub fn new() -> Self {
        Self {
            target_hz: DEFAULT_TICK_HZ,
            ceiling_hz: MAX_TICK_HZ,
            accumulator_ms: 0.0,
            last_frame_at: f64::NAN,
            warmup_deltas: Vec::with_capacity(WARMUP_FRAMES),
            probed: false,
            window_start: f64::NAN,
            frames_in_window: 0,
            fps: 0.0,
            slow_streak: 0,
            good_streak: 0,
        }
    }

    pub fn target_hz(&self) -> f64 {
        self.target_hz
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Zero the accumulator and measurement state. Required on restart so a
    /// stale accumulator doesn't burst catch-up ticks into the fresh world.
    pub fn reset(&mut self) {
        self.accumulator_ms = 0.0;
        self.last_frame_at = f64::NAN;
        self.window_start = f64::NAN;
        self.frames_in_window = 0;
        self.slow_streak = 0;
        self.good_streak = 0;
    }

    /// One animation frame at wall-clock `now` (ms). Invokes `tick_fn` once
    /// per drained tick interval with the clamped dt in seconds. Returns the
    /// number of ticks run.
    pub fn frame(&mut self, now: f64, mut tick_fn: impl FnMut(f32)) -> u32 {
        let delta = if self.last_frame_at.is_nan() {
            1000.0 / self.target_hz
        } else {
            (now - self.last_frame_at).clamp(0.0, MAX_FRAME_DELTA_MS)
        };
        self.last_frame_at = now;

        if !self.probed {
            self.probe(delta);
        }
        self.measure(now);

        self.accumulator_ms += delta;
        let interval_ms = 1000.0 / self.target_hz;
        let dt = (interval_ms / 1000.0) as f32;
        let dt = dt.clamp(TICK_DT_MIN, TICK_DT_MAX);

        let mut ticks = 0;
        while self.accumulator_ms >= interval_ms {
            tick_fn(dt);
            self.accumulator_ms -= interval_ms;
            ticks += 1;
        }
        ticks
    }

    /// Warm-up: derive the refresh ceiling from the median frame delta
    fn probe(&mut self, delta: f64) {
        if delta > 0.0 {
            self.warmup_deltas.push(delta);
        }
        if self.warmup_deltas.len() < WARMUP_FRAMES {
            return;
        }
        let mut sorted = self.warmup_deltas.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let median = sorted[sorted.len() / 2];
        let cadence_hz = (1000.0 / median).clamp(MIN_TICK_HZ, MAX_TICK_HZ);
        self.ceiling_hz = cadence_hz;
        self.target_hz = cadence_hz;
        self.probed = true;
        log::info!("probed refresh cadence: {cadence_hz:.0} Hz");
    }

    /// FPS over one-second windows drives the adaptive target rate
    fn measure(&mut self, now: f64) {
        if self.window_start.is_nan() {
            self.window_start = now;
            self.frames_in_window = 0;
        }
        self.frames_in_window += 1;
        let elapsed = now - self.window_start;
        if elapsed < FPS_WINDOW_MS {
            return;
        }
        self.fps = self.frames_in_window as f64 * 1000.0 / elapsed;
        self.window_start = now;
        self.frames_in_window = 0;

        if !self.probed {
            return;
        }
        if self.fps < self.target_hz * SLOW_FRACTION {
            self.good_streak = 0;
            self.slow_streak += 1;
            if self.slow_streak >= SLOW_WINDOWS {
                self.slow_streak = 0;
                let lowered = (self.target_hz * BACKOFF).max(MIN_TICK_HZ);
                if lowered < self.target_hz {
                    log::info!(
                        "fps {:.0} below target {:.0}; lowering tick rate to {:.0} Hz",
                        self.fps,
                        self.target_hz,
                        lowered
                    );
                    self.target_hz = lowered;
                }
            }
        } else {
            self.slow_streak = 0;
            self.good_streak += 1;
            // Recover toward the probed ceiling, never past it
            if self.good_streak >= SLOW_WINDOWS && self.target_hz < self.ceiling_hz {
                self.good_streak = 0;
                let raised = (self.target_hz * RECOVERY).min(self.ceiling_hz);
                log::info!("fps recovered; raising tick rate to {raised:.0} Hz");
                self.target_hz = raised;
            }
        }
    }
}

impl Default for StepRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive the runner with a synthetic steady clock
    fn drive(runner: &mut StepRunner, start: f64, frames: usize, frame_ms: f64) -> u32 {
        let mut ticks = 0;
        let mut now = start;
        for _ in 0..frames {
            now += frame_ms;
            ticks += runner.frame(now, |_| {});
        }
        ticks
    }

    #[test]
    fn test_probe_locks_to_cadence() {
        let mut runner = StepRunner::new();
        drive(&mut runner, 0.0, 30, 1000.0 / 144.0);
        assert!((runner.target_hz() - 144.0).abs() < 2.0);
    }

    #[test]
    fn test_probe_clamped_to_range() {
        let mut runner = StepRunner::new();
        // 30 Hz host is clamped up to the floor
        drive(&mut runner, 0.0, 30, 1000.0 / 30.0);
        assert!(runner.target_hz() >= MIN_TICK_HZ);
        let mut fast = StepRunner::new();
        // 360 Hz host is clamped down to the ceiling
        drive(&mut fast, 0.0, 30, 1000.0 / 360.0);
        assert!(fast.target_hz() <= MAX_TICK_HZ);
    }

    #[test]
    fn test_ticks_track_wall_clock() {
        let mut runner = StepRunner::new();
        drive(&mut runner, 0.0, 30, 1000.0 / 120.0);
        // Over one second at 120 Hz the runner should produce ~120 ticks
        let ticks = drive(&mut runner, 30.0 * 1000.0 / 120.0, 120, 1000.0 / 120.0);
        assert!((100..=140).contains(&ticks), "ticks = {ticks}");
    }

    #[test]
    fn test_dt_stays_in_band() {
        let mut runner = StepRunner::new();
        let mut seen = Vec::new();
        let mut now = 0.0;
        for _ in 0..200 {
            now += 7.0;
            runner.frame(now, |dt| seen.push(dt));
        }
        assert!(!seen.is_empty());
        for dt in seen {
            assert!((TICK_DT_MIN..=TICK_DT_MAX).contains(&dt));
        }
    }

    #[test]
    fn test_resume_delta_is_capped() {
        let mut runner = StepRunner::new();
        drive(&mut runner, 0.0, 30, 1000.0 / 120.0);
        let resume_at = 30.0 * 1000.0 / 120.0 + 60_000.0; // one minute away
        let ticks = runner.frame(resume_at, |_| {});
        // At most the capped delta's worth of catch-up
        let max_ticks = (MAX_FRAME_DELTA_MS / (1000.0 / runner.target_hz())) as u32 + 1;
        assert!(ticks <= max_ticks, "ticks = {ticks}");
    }

    #[test]
    fn test_persistent_slowdown_lowers_target() {
        let mut runner = StepRunner::new();
        drive(&mut runner, 0.0, 30, 1000.0 / 120.0);
        let probed = runner.target_hz();
        // Several seconds at half the probed cadence
        drive(&mut runner, 30.0 * 1000.0 / 120.0, 300, 1000.0 / 60.0);
        assert!(runner.target_hz() < probed);
        assert!(runner.target_hz() >= MIN_TICK_HZ);
    }

    #[test]
    fn test_recovery_never_exceeds_ceiling() {
        let mut runner = StepRunner::new();
        drive(&mut runner, 0.0, 30, 1000.0 / 120.0);
        let ceiling = runner.target_hz();
        let mut now = 30.0 * 1000.0 / 120.0;
        // Slow stretch, then a fast stretch well above the ceiling
        for _ in 0..300 {
            now += 1000.0 / 60.0;
            runner.frame(now, |_| {});
        }
        for _ in 0..1000 {
            now += 1000.0 / 240.0;
            runner.frame(now, |_| {});
        }
        assert!(runner.target_hz() <= ceiling + 0.001);
    }

    #[test]
    fn test_reset_clears_accumulator() {
        let mut runner = StepRunner::new();
        drive(&mut runner, 0.0, 30, 1000.0 / 120.0);
        runner.reset();
        // First frame after reset must not burst catch-up ticks
        let ticks = runner.frame(123_456.0, |_| {});
        assert!(ticks <= 2, "ticks = {ticks}");
    }
}
