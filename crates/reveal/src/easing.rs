//! Progress remapping curves.
//!
//! The same [`Easing`] value drives the panel wipe uniform and every card's
//! fly-in, so both describe one curve. Inputs outside `[0, 1]` are clamped to
//! the domain before sampling: a card whose start time lies ahead of the clock
//! stays at `sample(0.0)` instead of extrapolating the polynomial.

const NEWTON_ITERATIONS: usize = 4;
const NEWTON_MIN_SLOPE: f32 = 0.001;
const SUBDIVISION_PRECISION: f32 = 1e-7;
const SUBDIVISION_MAX_ITERATIONS: usize = 10;
const SPLINE_TABLE_SIZE: usize = 11;
const SAMPLE_STEP: f32 = 1.0 / (SPLINE_TABLE_SIZE as f32 - 1.0);

/// Monotonic mapping from normalized progress to eased progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    Linear,
    Smoothstep,
    EaseInOut,
    CubicBezier(CubicBezier),
}

impl Default for Easing {
    /// `cubic-bezier(0, 1, 0, 1)`: a very fast start that settles into the rest value.
    fn default() -> Self {
        Self::CubicBezier(CubicBezier::new(0.0, 1.0, 0.0, 1.0))
    }
}

impl Easing {
    pub fn sample(self, t: f32) -> f32 {
        let clamped = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Easing::Linear => clamped,
            Easing::Smoothstep => clamped * clamped * (3.0 - 2.0 * clamped),
            Easing::EaseInOut => {
                if clamped < 0.5 {
                    2.0 * clamped * clamped
                } else {
                    -1.0 + (4.0 - 2.0 * clamped) * clamped
                }
            }
            Easing::CubicBezier(curve) => curve.solve(clamped),
        }
    }
}

/// CSS-style cubic bezier through `(0, 0)`, `(x1, y1)`, `(x2, y2)`, `(1, 1)`.
///
/// `x1` and `x2` must lie in `[0, 1]` so the curve is a function of x.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    samples: [f32; SPLINE_TABLE_SIZE],
}

impl CubicBezier {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        let x1 = x1.clamp(0.0, 1.0);
        let x2 = x2.clamp(0.0, 1.0);
        let mut samples = [0.0; SPLINE_TABLE_SIZE];
        for (i, slot) in samples.iter_mut().enumerate() {
            *slot = calc_bezier(i as f32 * SAMPLE_STEP, x1, x2);
        }
        Self {
            x1,
            y1,
            x2,
            y2,
            samples,
        }
    }

    pub fn control_points(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    fn solve(&self, x: f32) -> f32 {
        if self.x1 == self.y1 && self.x2 == self.y2 {
            return x;
        }
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }
        calc_bezier(self.t_for_x(x), self.y1, self.y2)
    }

    fn t_for_x(&self, x: f32) -> f32 {
        let mut interval_start = 0.0;
        let mut current = 1;
        let last = SPLINE_TABLE_SIZE - 1;
        while current != last && self.samples[current] <= x {
            interval_start += SAMPLE_STEP;
            current += 1;
        }
        current -= 1;

        let span = self.samples[current + 1] - self.samples[current];
        let dist = if span > 0.0 {
            (x - self.samples[current]) / span
        } else {
            0.0
        };
        let guess = interval_start + dist * SAMPLE_STEP;

        let initial_slope = slope(guess, self.x1, self.x2);
        if initial_slope >= NEWTON_MIN_SLOPE {
            newton_raphson(x, guess, self.x1, self.x2)
        } else if initial_slope == 0.0 {
            guess
        } else {
            binary_subdivide(x, interval_start, interval_start + SAMPLE_STEP, self.x1, self.x2)
        }
    }
}

fn coeff_a(a1: f32, a2: f32) -> f32 {
    1.0 - 3.0 * a2 + 3.0 * a1
}

fn coeff_b(a1: f32, a2: f32) -> f32 {
    3.0 * a2 - 6.0 * a1
}

fn coeff_c(a1: f32) -> f32 {
    3.0 * a1
}

fn calc_bezier(t: f32, a1: f32, a2: f32) -> f32 {
    ((coeff_a(a1, a2) * t + coeff_b(a1, a2)) * t + coeff_c(a1)) * t
}

fn slope(t: f32, a1: f32, a2: f32) -> f32 {
    3.0 * coeff_a(a1, a2) * t * t + 2.0 * coeff_b(a1, a2) * t + coeff_c(a1)
}

fn newton_raphson(x: f32, mut guess: f32, x1: f32, x2: f32) -> f32 {
    for _ in 0..NEWTON_ITERATIONS {
        let current_slope = slope(guess, x1, x2);
        if current_slope == 0.0 {
            return guess;
        }
        let current_x = calc_bezier(guess, x1, x2) - x;
        guess -= current_x / current_slope;
    }
    guess.clamp(0.0, 1.0)
}

fn binary_subdivide(x: f32, mut low: f32, mut high: f32, x1: f32, x2: f32) -> f32 {
    let mut t = low;
    for _ in 0..SUBDIVISION_MAX_ITERATIONS {
        t = low + (high - low) / 2.0;
        let current_x = calc_bezier(t, x1, x2) - x;
        if current_x.abs() <= SUBDIVISION_PRECISION {
            break;
        }
        if current_x > 0.0 {
            high = t;
        } else {
            low = t;
        }
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_closed_form(x: f32) -> f32 {
        // cubic-bezier(0, 1, 0, 1) reduces to x(t) = t^3, y(t) = 1 - (1 - t)^3.
        let t = x.cbrt();
        1.0 - (1.0 - t).powi(3)
    }

    #[test]
    fn every_curve_hits_endpoints() {
        for easing in [
            Easing::Linear,
            Easing::Smoothstep,
            Easing::EaseInOut,
            Easing::default(),
            Easing::CubicBezier(CubicBezier::new(0.42, 0.0, 0.58, 1.0)),
        ] {
            assert!(easing.sample(0.0).abs() < 1e-6, "{easing:?} at 0");
            assert!((easing.sample(1.0) - 1.0).abs() < 1e-6, "{easing:?} at 1");
        }
    }

    #[test]
    fn default_curve_matches_closed_form() {
        let easing = Easing::default();
        for step in 1..20 {
            let x = step as f32 / 20.0;
            let expected = default_closed_form(x);
            let actual = easing.sample(x);
            assert!(
                (actual - expected).abs() < 2e-3,
                "x={x} expected {expected} got {actual}"
            );
        }
    }

    #[test]
    fn bezier_curves_increase_monotonically() {
        let curves = [
            Easing::default(),
            Easing::CubicBezier(CubicBezier::new(0.25, 0.1, 0.25, 1.0)),
            Easing::CubicBezier(CubicBezier::new(0.42, 0.0, 0.58, 1.0)),
        ];
        for easing in curves {
            let mut last = 0.0;
            for step in 0..=200 {
                let sample = easing.sample(step as f32 / 200.0);
                assert!(sample >= last - 1e-4, "{easing:?} regressed at {step}");
                last = sample;
            }
        }
    }

    #[test]
    fn out_of_domain_inputs_clamp() {
        let easing = Easing::default();
        assert_eq!(easing.sample(-0.3), easing.sample(0.0));
        assert_eq!(easing.sample(1.7), easing.sample(1.0));
        assert_eq!(easing.sample(f32::NAN), easing.sample(0.0));
    }

    #[test]
    fn linear_control_points_are_identity() {
        let easing = Easing::CubicBezier(CubicBezier::new(0.3, 0.3, 0.7, 0.7));
        for step in 0..=10 {
            let x = step as f32 / 10.0;
            assert!((easing.sample(x) - x).abs() < 1e-6);
        }
    }

    #[test]
    fn smoothstep_matches_expected_values() {
        let curve = Easing::Smoothstep;
        assert!((curve.sample(0.5) - 0.5).abs() < 1e-6);
        assert!(curve.sample(0.25) < 0.25);
        assert!(curve.sample(0.75) > 0.75);
    }

    #[test]
    fn ease_in_out_accelerates_then_decelerates() {
        let curve = Easing::EaseInOut;
        let first = curve.sample(0.25);
        let mid = curve.sample(0.5);
        let last = curve.sample(0.75);
        assert!(first < mid);
        assert!(last > mid);
    }
}
