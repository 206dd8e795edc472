//! Frame pacing for the streaming loop.
//!
//! The host drives us with one callback per display refresh; the pacer
//! decides which of those callbacks get to do real work so the stream holds
//! a fixed target rate regardless of the refresh rate. Excess callbacks are
//! dropped, never queued. Timestamps are plain milliseconds because that is
//! what the refresh callback carries, and it keeps the whole crate testable
//! with synthetic clocks.

#[derive(Debug, thiserror::Error)]
pub enum PacerError {
    #[error("target rate must be a positive, finite FPS value (got {0})")]
    InvalidRate(f32),
}

/// Lifecycle of the pacing loop.
///
/// `Idle` until the surface and the compute module are both up, `Running`
/// for the steady loop, `Stopped` only on explicit teardown or fatal
/// surface loss. Per-frame failures never leave `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacerState {
    Idle,
    Running,
    Stopped,
}

/// Verdict for a single refresh callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDecision {
    /// Enough time has passed; run one full frame now.
    Render,
    /// Inside the throttle window (or not running); do no work, re-arm.
    Skip,
}

/// Timestamp of the last accepted frame plus the minimum spacing between
/// accepted frames. Mutated only by [`FramePacer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    pub last_accepted_ms: f64,
    pub interval_ms: f64,
}

pub struct FramePacer {
    state: PacerState,
    clock: FrameClock,
    rollback_ms: Option<f64>,
}

impl FramePacer {
    /// Builds a pacer for the given target rate. The pacer starts `Idle`;
    /// call [`FramePacer::start`] once the session is ready.
    pub fn new(target_fps: f32) -> Result<Self, PacerError> {
        if !target_fps.is_finite() || target_fps <= 0.0 {
            return Err(PacerError::InvalidRate(target_fps));
        }
        Ok(Self {
            state: PacerState::Idle,
            clock: FrameClock {
                last_accepted_ms: 0.0,
                interval_ms: 1000.0 / f64::from(target_fps),
            },
            rollback_ms: None,
        })
    }

    pub fn state(&self) -> PacerState {
        self.state
    }

    pub fn clock(&self) -> FrameClock {
        self.clock
    }

    /// Transitions `Idle -> Running`. The clock is primed comfortably in
    /// the past so the first refresh callback is accepted immediately.
    /// No-op from any other state; `Stopped` is terminal.
    pub fn start(&mut self, now_ms: f64) {
        if self.state == PacerState::Idle {
            self.clock.last_accepted_ms = now_ms - self.clock.interval_ms * 2.0;
            self.state = PacerState::Running;
        }
    }

    pub fn stop(&mut self) {
        self.state = PacerState::Stopped;
    }

    /// Called on every host refresh callback.
    ///
    /// On accept the clock advances phase-preserving:
    /// `last = now - (delta mod interval)` rather than snapping to `now`,
    /// so the long-run rate tracks the target exactly instead of drifting
    /// with callback jitter. The pre-accept timestamp is kept until
    /// [`FramePacer::frame_presented`] so a failed frame can roll back.
    pub fn on_refresh(&mut self, now_ms: f64) -> FrameDecision {
        if self.state != PacerState::Running {
            return FrameDecision::Skip;
        }
        let delta = now_ms - self.clock.last_accepted_ms;
        if delta < self.clock.interval_ms {
            return FrameDecision::Skip;
        }
        self.rollback_ms = Some(self.clock.last_accepted_ms);
        self.clock.last_accepted_ms = now_ms - (delta % self.clock.interval_ms);
        FrameDecision::Render
    }

    /// The frame accepted by the last `on_refresh` completed; commit the
    /// clock advance.
    pub fn frame_presented(&mut self) {
        self.rollback_ms = None;
    }

    /// The frame accepted by the last `on_refresh` failed. Restores the
    /// previous clock so the next callback retries under the same throttle
    /// logic. A failed frame never changes the state.
    pub fn frame_failed(&mut self) {
        if let Some(previous) = self.rollback_ms.take() {
            self.clock.last_accepted_ms = previous;
        }
    }

    /// Earliest timestamp at which the next callback would be accepted.
    /// `None` unless running; callers use it to sleep instead of spinning.
    pub fn next_deadline_ms(&self) -> Option<f64> {
        match self.state {
            PacerState::Running => Some(self.clock.last_accepted_ms + self.clock.interval_ms),
            PacerState::Idle | PacerState::Stopped => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FPS: f32 = 24.0;
    const INTERVAL: f64 = 1000.0 / 24.0;

    fn running_pacer(start_ms: f64) -> FramePacer {
        let mut pacer = FramePacer::new(FPS).unwrap();
        pacer.start(start_ms);
        pacer
    }

    #[test]
    fn rejects_non_positive_rates() {
        assert!(matches!(
            FramePacer::new(0.0),
            Err(PacerError::InvalidRate(_))
        ));
        assert!(matches!(
            FramePacer::new(-24.0),
            Err(PacerError::InvalidRate(_))
        ));
        assert!(matches!(
            FramePacer::new(f32::NAN),
            Err(PacerError::InvalidRate(_))
        ));
    }

    #[test]
    fn idle_and_stopped_never_render() {
        let mut pacer = FramePacer::new(FPS).unwrap();
        assert_eq!(pacer.on_refresh(1000.0), FrameDecision::Skip);
        assert_eq!(pacer.next_deadline_ms(), None);

        pacer.start(1000.0);
        pacer.stop();
        assert_eq!(pacer.state(), PacerState::Stopped);
        assert_eq!(pacer.on_refresh(5000.0), FrameDecision::Skip);

        // Stopped is terminal.
        pacer.start(6000.0);
        assert_eq!(pacer.state(), PacerState::Stopped);
    }

    #[test]
    fn first_callback_after_start_is_accepted() {
        let mut pacer = running_pacer(100.0);
        assert_eq!(pacer.on_refresh(100.0), FrameDecision::Render);
    }

    #[test]
    fn callbacks_inside_the_interval_are_dropped() {
        let mut pacer = running_pacer(0.0);
        assert_eq!(pacer.on_refresh(0.0), FrameDecision::Render);
        pacer.frame_presented();

        assert_eq!(pacer.on_refresh(10.0), FrameDecision::Skip);
        assert_eq!(pacer.on_refresh(30.0), FrameDecision::Skip);
        assert_eq!(pacer.on_refresh(INTERVAL + 1.0), FrameDecision::Render);
    }

    #[test]
    fn clock_advances_in_exact_interval_steps() {
        // Phase preservation: each accepted frame moves the clock by a
        // whole number of intervals, regardless of callback jitter.
        let mut pacer = running_pacer(0.0);
        let mut now = 0.0;
        let mut previous = None;
        for step in 0..600 {
            now += 16.6 + if step % 3 == 0 { 4.2 } else { 0.0 };
            if pacer.on_refresh(now) == FrameDecision::Render {
                pacer.frame_presented();
                let current = pacer.clock().last_accepted_ms;
                if let Some(prev) = previous {
                    let advance: f64 = current - prev;
                    let steps = (advance / INTERVAL).round();
                    assert!(steps >= 1.0);
                    assert!(
                        (advance - steps * INTERVAL).abs() < 1e-6,
                        "clock advanced by {advance}ms, not a multiple of the interval"
                    );
                }
                previous = Some(current);
            }
        }
    }

    #[test]
    fn long_run_rate_matches_target_under_jitter() {
        let mut pacer = running_pacer(0.0);
        let mut now = 0.0;
        let mut accepted = 0u32;
        let mut first_accept = None;
        let mut last_accept = 0.0;
        // Irregular ~60Hz callbacks for ~100 simulated seconds.
        for step in 0..6000 {
            now += match step % 4 {
                0 => 14.1,
                1 => 18.9,
                2 => 16.7,
                _ => 17.3,
            };
            if pacer.on_refresh(now) == FrameDecision::Render {
                pacer.frame_presented();
                accepted += 1;
                first_accept.get_or_insert(now);
                last_accept = now;
            }
        }
        let span_s = (last_accept - first_accept.unwrap()) / 1000.0;
        let rate = f64::from(accepted - 1) / span_s;
        assert!(
            (rate - f64::from(FPS)).abs() < 0.1,
            "long-run rate {rate:.3} fps drifted from target"
        );
    }

    #[test]
    fn accepted_gaps_never_undershoot_by_more_than_one_callback() {
        let callback_period = 1000.0 / 60.0;
        let mut pacer = running_pacer(0.0);
        let mut now = 0.0;
        let mut accepts = Vec::new();
        for _ in 0..3000 {
            now += callback_period;
            if pacer.on_refresh(now) == FrameDecision::Render {
                pacer.frame_presented();
                accepts.push(now);
            }
        }
        for pair in accepts.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(
                gap + 1e-6 >= INTERVAL - callback_period,
                "gap {gap}ms fell below the throttle window"
            );
        }
    }

    #[test]
    fn failed_frame_does_not_advance_the_clock() {
        let mut pacer = running_pacer(0.0);
        assert_eq!(pacer.on_refresh(50.0), FrameDecision::Render);
        let before = pacer.clock().last_accepted_ms;
        pacer.frame_failed();
        assert!(pacer.clock().last_accepted_ms < before);
        assert_eq!(pacer.state(), PacerState::Running);

        // The very next callback retries and may succeed.
        assert_eq!(pacer.on_refresh(66.0), FrameDecision::Render);
        pacer.frame_presented();
        assert_eq!(pacer.on_refresh(70.0), FrameDecision::Skip);
    }

    #[test]
    fn deadline_tracks_the_clock() {
        let mut pacer = running_pacer(0.0);
        assert_eq!(pacer.on_refresh(0.0), FrameDecision::Render);
        pacer.frame_presented();
        let deadline = pacer.next_deadline_ms().unwrap();
        assert!((deadline - INTERVAL).abs() < 1e-9);
        pacer.stop();
        assert_eq!(pacer.next_deadline_ms(), None);
    }
}
