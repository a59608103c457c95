use std::time::{Duration, Instant};

use crate::easing::Easing;

/// Largest `f32` strictly below one; raw progress never reaches 1.0.
const RAW_TIME_CEILING: f32 = 1.0 - f32::EPSILON / 2.0;

/// Snapshot of the time state handed to each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSample {
    /// Time elapsed since the source's origin.
    pub elapsed: Duration,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(elapsed: Duration, frame_index: u64) -> Self {
        Self {
            elapsed,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource: Send {
    /// Resets the source to its initial state.
    fn reset(&mut self);
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frame: u64,
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
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.origin.elapsed(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source that always reports a fixed timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    elapsed: Duration,
}

impl FixedTimeSource {
    pub fn new(elapsed: Duration) -> Self {
        Self { elapsed }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

impl TimeSource for FixedTimeSource {
    fn reset(&mut self) {}

    fn sample(&mut self) -> TimeSample {
        TimeSample::new(self.elapsed, 0)
    }
}

/// Synthetic clock advancing by a fixed step per sample, independent of wall time.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct SteppedTimeSource {
    step: Duration,
    next: Duration,
    frame: u64,
}

#[cfg(test)]
impl SteppedTimeSource {
    pub(crate) fn new(step: Duration) -> Self {
        Self {
            step,
            next: Duration::ZERO,
            frame: 0,
        }
    }
}

#[cfg(test)]
impl TimeSource for SteppedTimeSource {
    fn reset(&mut self) {
        self.next = Duration::ZERO;
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.next, self.frame);
        self.next = self.next.saturating_add(self.step);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Folds elapsed time into a `[0, 1)` progress value repeating every `period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealClock {
    period: Duration,
}

impl RevealClock {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_nanos(1)),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn raw_time(&self, sample: &TimeSample) -> f32 {
        let period = self.period.as_nanos();
        let within = sample.elapsed.as_nanos() % period;
        let raw = (within as f64 / period as f64) as f32;
        raw.min(RAW_TIME_CEILING)
    }

    pub fn phase(&self, sample: &TimeSample, easing: Easing) -> RevealPhase {
        RevealPhase::new(self.raw_time(sample), easing)
    }
}

/// Linear and eased progress for one frame.
///
/// The eased value is only ever derived from the raw value through the menu's
/// easing, so the panel uniform and the card animator cannot disagree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealPhase {
    raw: f32,
    eased: f32,
}

impl RevealPhase {
    pub fn new(raw: f32, easing: Easing) -> Self {
        Self {
            raw,
            eased: easing.sample(raw),
        }
    }

    pub fn raw(&self) -> f32 {
        self.raw
    }

    pub fn eased(&self) -> f32 {
        self.eased
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_time_wraps_every_period() {
        let clock = RevealClock::new(Duration::from_millis(2000));
        let at = |ms: u64| clock.raw_time(&TimeSample::new(Duration::from_millis(ms), 0));
        assert_eq!(at(0), 0.0);
        assert!((at(500) - 0.25).abs() < 1e-6);
        assert!((at(1000) - 0.5).abs() < 1e-6);
        assert_eq!(at(2000), 0.0);
        assert_eq!(at(2500), at(500));
        assert_eq!(at(64_000 + 1234), at(1234));
    }

    #[test]
    fn raw_time_stays_below_one() {
        let clock = RevealClock::new(Duration::from_secs(2));
        let sample = TimeSample::new(Duration::from_secs(2) - Duration::from_nanos(1), 0);
        let raw = clock.raw_time(&sample);
        assert!(raw < 1.0);
        assert!(raw > 0.999);
    }

    #[test]
    fn phase_eases_raw_value() {
        let clock = RevealClock::new(Duration::from_secs(1));
        let phase = clock.phase(
            &TimeSample::new(Duration::from_millis(300), 0),
            Easing::Smoothstep,
        );
        assert!((phase.raw() - 0.3).abs() < 1e-6);
        assert!((phase.eased() - Easing::Smoothstep.sample(phase.raw())).abs() < 1e-7);
    }

    #[test]
    fn stepped_source_advances_deterministically() {
        let mut source = SteppedTimeSource::new(Duration::from_millis(10));
        assert_eq!(source.sample(), TimeSample::new(Duration::ZERO, 0));
        assert_eq!(source.sample(), TimeSample::new(Duration::from_millis(10), 1));
        source.reset();
        assert_eq!(source.sample().elapsed, Duration::ZERO);
    }

    #[test]
    fn fixed_source_repeats_timestamp() {
        let mut source = FixedTimeSource::new(Duration::from_millis(750));
        assert_eq!(source.sample().elapsed, Duration::from_millis(750));
        assert_eq!(source.sample().elapsed, Duration::from_millis(750));
    }
}
