//! Frame loop abstraction.
//!
//! A [`FrameDriver`] calls back once per rendered frame with the time sample
//! for that frame. Windowed hosts would implement it on top of their own
//! redraw events; [`HeadlessFrameDriver`] runs a plain loop for the CLI and
//! for tests.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::clock::{BoxedTimeSource, TimeSample};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameControl {
    Continue,
    Stop,
}

pub trait FrameDriver {
    /// Drives `on_frame` until it returns [`FrameControl::Stop`] or the driver
    /// runs out of frames. Returns the number of frames delivered.
    fn run(&mut self, on_frame: &mut dyn FnMut(&TimeSample) -> FrameControl) -> Result<u64>;
}

pub struct HeadlessFrameDriver {
    source: BoxedTimeSource,
    frames: Option<u64>,
    pacer: FramePacer,
}

impl HeadlessFrameDriver {
    pub fn new(source: BoxedTimeSource) -> Self {
        Self {
            source,
            frames: None,
            pacer: FramePacer::new(None),
        }
    }

    /// Stops after `frames` callbacks.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frames = Some(frames);
        self
    }

    /// Sleeps between callbacks so they arrive at most `fps` times a second.
    pub fn with_target_fps(mut self, fps: Option<f32>) -> Self {
        self.pacer = FramePacer::new(fps);
        self
    }
}

impl FrameDriver for HeadlessFrameDriver {
    fn run(&mut self, on_frame: &mut dyn FnMut(&TimeSample) -> FrameControl) -> Result<u64> {
        self.source.reset();
        self.pacer.reset();
        let mut delivered = 0u64;
        loop {
            if self.frames.is_some_and(|limit| delivered >= limit) {
                break;
            }
            self.pacer.wait();
            let sample = self.source.sample();
            delivered += 1;
            if on_frame(&sample) == FrameControl::Stop {
                break;
            }
        }
        tracing::debug!(frames = delivered, "headless frame loop finished");
        Ok(delivered)
    }
}

struct FramePacer {
    target_interval: Option<Duration>,
    next_deadline: Option<Instant>,
}

impl FramePacer {
    fn new(target_fps: Option<f32>) -> Self {
        let target_interval = target_fps.and_then(|fps| {
            if fps > 0.0 {
                Some(Duration::from_secs_f32(1.0 / fps))
            } else {
                None
            }
        });
        Self {
            target_interval,
            next_deadline: None,
        }
    }

    fn reset(&mut self) {
        self.next_deadline = None;
    }

    fn wait(&mut self) {
        let Some(interval) = self.target_interval else {
            return;
        };
        let now = Instant::now();
        match self.next_deadline {
            Some(deadline) if deadline > now => {
                thread::sleep(deadline - now);
                self.next_deadline = Some(deadline + interval);
            }
            // Fell behind or first frame: re-anchor instead of bursting.
            _ => self.next_deadline = Some(now + interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SteppedTimeSource;

    #[test]
    fn stops_at_frame_limit() {
        let mut driver =
            HeadlessFrameDriver::new(Box::new(SteppedTimeSource::new(Duration::from_millis(10))))
                .with_frame_limit(5);
        let mut seen = Vec::new();
        let delivered = driver
            .run(&mut |sample| {
                seen.push(*sample);
                FrameControl::Continue
            })
            .unwrap();
        assert_eq!(delivered, 5);
        assert_eq!(seen.len(), 5);
        assert_eq!(seen[0].elapsed, Duration::ZERO);
        assert_eq!(seen[4].elapsed, Duration::from_millis(40));
        assert_eq!(seen[4].frame_index, 4);
    }

    #[test]
    fn callback_can_stop_early() {
        let mut driver =
            HeadlessFrameDriver::new(Box::new(SteppedTimeSource::new(Duration::from_millis(1))));
        let delivered = driver
            .run(&mut |sample| {
                if sample.frame_index == 2 {
                    FrameControl::Stop
                } else {
                    FrameControl::Continue
                }
            })
            .unwrap();
        assert_eq!(delivered, 3);
    }

    #[test]
    fn rerun_restarts_the_source() {
        let mut driver =
            HeadlessFrameDriver::new(Box::new(SteppedTimeSource::new(Duration::from_millis(5))))
                .with_frame_limit(2);
        driver.run(&mut |_| FrameControl::Continue).unwrap();
        let mut first = None;
        driver
            .run(&mut |sample| {
                first.get_or_insert(*sample);
                FrameControl::Continue
            })
            .unwrap();
        assert_eq!(first.map(|sample| sample.elapsed), Some(Duration::ZERO));
    }

    #[test]
    fn pacing_spaces_frames_out() {
        let mut driver =
            HeadlessFrameDriver::new(Box::new(SteppedTimeSource::new(Duration::from_millis(1))))
                .with_frame_limit(3)
                .with_target_fps(Some(100.0));
        let started = Instant::now();
        driver.run(&mut |_| FrameControl::Continue).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(15));
    }
}
