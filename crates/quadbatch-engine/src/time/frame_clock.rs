use std::time::{Duration, Instant};

/// Timing of one frame.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,
    pub now: Instant,
    pub frame_index: u64,
}

/// Produces `FrameTime` snapshots and, with a target rate, frame deadlines.
///
/// `dt` is clamped so a debugger pause or a minimized window does not hand
/// the application a multi-second step.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
    frame_interval: Option<Duration>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            frame_index: 0,
            dt_min,
            dt_max,
            frame_interval: None,
        }
    }

    /// Paces frames at `fps`; `None` or `0` renders as fast as presentation
    /// allows.
    pub fn with_target_fps(mut self, fps: Option<u32>) -> Self {
        self.frame_interval = fps
            .filter(|&fps| fps > 0)
            .map(|fps| Duration::from_secs(1) / fps);
        self
    }

    pub fn frame_interval(&self) -> Option<Duration> {
        self.frame_interval
    }

    /// Resets the baseline, e.g. after the window was restored.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);
        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }

    /// When the next frame is due, or `None` when unpaced.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.frame_interval.map(|interval| self.last + interval)
    }

    /// Whether the next frame is due at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.next_deadline().is_none_or(|deadline| now >= deadline)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dt_is_clamped() {
        let mut clock = FrameClock::new();
        let start = clock.last;

        let ft = clock.tick_at(start);
        assert_eq!(ft.dt, Duration::from_micros(100).as_secs_f32());

        let ft = clock.tick_at(start + Duration::from_secs(5));
        assert_eq!(ft.dt, 0.25);
        assert_eq!(ft.frame_index, 1);
    }

    #[test]
    fn sixty_fps_deadline_follows_last_tick() {
        let mut clock = FrameClock::new().with_target_fps(Some(60));
        assert_eq!(clock.frame_interval(), Some(Duration::from_secs(1) / 60));

        let start = clock.last;
        clock.tick_at(start);
        let deadline = clock.next_deadline().unwrap();
        assert_eq!(deadline, start + Duration::from_secs(1) / 60);
        assert!(!clock.is_due(start));
        assert!(clock.is_due(deadline));
    }

    #[test]
    fn unpaced_clock_is_always_due() {
        let clock = FrameClock::new().with_target_fps(Some(0));
        assert_eq!(clock.next_deadline(), None);
        assert!(clock.is_due(Instant::now()));
    }
}
