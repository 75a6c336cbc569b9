use std::time::{Duration, Instant};

/// Default delta above which a frame is treated as a stall and contributes nothing.
pub const DEFAULT_STALL_THRESHOLD: Duration = Duration::from_millis(200);

/// Abstraction over where wall-clock readings originate from.
pub trait TimeSource {
    /// Milliseconds since an arbitrary, fixed origin.
    fn now_millis(&mut self) -> u64;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn now_millis(&mut self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Time source that only moves when told to. Used for scripted playback and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualTimeSource {
    now: u64,
}

impl ManualTimeSource {
    pub fn new(start_millis: u64) -> Self {
        Self { now: start_millis }
    }

    pub fn advance(&mut self, by: Duration) {
        self.now = self.now.saturating_add(by.as_millis() as u64);
    }

    pub fn set(&mut self, millis: u64) {
        self.now = millis;
    }
}

impl TimeSource for ManualTimeSource {
    fn now_millis(&mut self) -> u64 {
        self.now
    }
}

pub type BoxedTimeSource = Box<dyn TimeSource>;

/// Snapshot handed to the scene for one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Effective delta: zero while paused or after a stall.
    pub delta_millis: u64,
    /// Accumulated simulation time.
    pub elapsed_millis: u64,
    pub frame_index: u64,
    pub paused: bool,
}

impl FrameTime {
    pub fn delta_seconds(&self) -> f32 {
        self.delta_millis as f32 / 1000.0
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed_millis as f32 / 1000.0
    }
}

/// Per-frame timing state: stall suppression, pause gating and elapsed time.
///
/// `last_millis` always follows the wall clock, so resuming after a pause or a
/// long hitch never produces a catch-up jump.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last_millis: u64,
    elapsed_millis: u64,
    frame_index: u64,
    paused: bool,
    stall_threshold_millis: u64,
}

impl FrameClock {
    pub fn new(now_millis: u64) -> Self {
        Self::with_stall_threshold(now_millis, DEFAULT_STALL_THRESHOLD)
    }

    pub fn with_stall_threshold(now_millis: u64, stall_threshold: Duration) -> Self {
        Self {
            last_millis: now_millis,
            elapsed_millis: 0,
            frame_index: 0,
            paused: false,
            stall_threshold_millis: stall_threshold.as_millis() as u64,
        }
    }

    pub fn tick(&mut self, now_millis: u64) -> FrameTime {
        let mut delta = now_millis.saturating_sub(self.last_millis);
        self.last_millis = now_millis;
        if delta > self.stall_threshold_millis {
            tracing::debug!(delta_ms = delta, "frame stall; ignoring delta");
            delta = 0;
        }
        self.advance(delta)
    }

    /// Advances by exactly `step` regardless of how much wall time passed.
    pub fn step(&mut self, now_millis: u64, step: Duration) -> FrameTime {
        self.last_millis = now_millis;
        self.advance(step.as_millis() as u64)
    }

    fn advance(&mut self, delta: u64) -> FrameTime {
        let delta = if self.paused { 0 } else { delta };
        self.elapsed_millis = self.elapsed_millis.saturating_add(delta);
        let frame = FrameTime {
            delta_millis: delta,
            elapsed_millis: self.elapsed_millis,
            frame_index: self.frame_index,
            paused: self.paused,
        };
        self.frame_index = self.frame_index.saturating_add(1);
        frame
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }
}
