use crate::easing::Easing;

/// Position and opacity of one card for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardPose {
    pub position: [f32; 3],
    pub opacity: f32,
}

/// Staggered fly-in: each card rises `drop_offset` units into its rest
/// position while fading in, starting `stagger` later than the previous index.
///
/// There are no discrete states; a card is a continuous function of the raw
/// clock value, fully hidden below its rest slot at `g = 0` and settled at
/// `g = 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardAnimator {
    easing: Easing,
    stagger: f32,
    drop_offset: f32,
}

impl CardAnimator {
    pub fn new(easing: Easing, stagger: f32, drop_offset: f32) -> Self {
        Self {
            easing,
            stagger,
            drop_offset,
        }
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    pub fn start_time(&self, index: usize) -> f32 {
        index as f32 * self.stagger
    }

    /// Eased progress `g` of card `index` at `raw_time`.
    pub fn progress(&self, raw_time: f32, index: usize) -> f32 {
        self.easing.sample(raw_time - self.start_time(index))
    }

    pub fn pose(&self, base: [f32; 3], raw_time: f32, index: usize) -> CardPose {
        let g = self.progress(raw_time, index);
        let h = 1.0 - g;
        CardPose {
            position: [base[0], base[1] - self.drop_offset * h, base[2]],
            opacity: g.clamp(0.0, 1.0),
        }
    }
}
