//! Exponential lowpass filters for fingertip positions.
//!
//! Both variants share the same smoothing step: `alpha = 1 - exp(-dt * 2π * cutoff)`
//! applied per component, with the first sample after a reset passed through.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::types::{Vec3, sub};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterSettings {
    Simple {
        cutoff_hz: f32,
    },
    OneEuro {
        min_cutoff: f32,
        delta_cutoff: f32,
        cutoff_slope: f32,
    },
}

impl FilterSettings {
    pub fn one_euro() -> Self {
        FilterSettings::OneEuro {
            min_cutoff: 0.9,
            delta_cutoff: 1.0,
            cutoff_slope: 0.1,
        }
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        FilterSettings::Simple { cutoff_hz: 2.0 }
    }
}

fn smoothing_factor(dt: f32, cutoff: f32) -> f32 {
    1.0 - (-dt * TAU * cutoff).exp()
}

#[derive(Clone, Debug)]
struct BaseLowpass {
    previous: Vec3,
    previous_raw: Vec3,
    first_time: bool,
}

impl BaseLowpass {
    fn new() -> Self {
        Self {
            previous: [0.0; 3],
            previous_raw: [0.0; 3],
            first_time: true,
        }
    }

    fn filter(&mut self, value: Vec3, alpha: Vec3) -> Vec3 {
        let result = if self.first_time {
            self.first_time = false;
            value
        } else {
            [
                self.previous[0] + alpha[0] * (value[0] - self.previous[0]),
                self.previous[1] + alpha[1] * (value[1] - self.previous[1]),
                self.previous[2] + alpha[2] * (value[2] - self.previous[2]),
            ]
        };

        self.previous = result;
        self.previous_raw = value;
        result
    }

    fn reset(&mut self) {
        self.first_time = true;
    }
}

/// Fixed-cutoff exponential smoothing.
#[derive(Clone, Debug)]
pub struct SimpleLowpass {
    pub cutoff_hz: f32,
    base: BaseLowpass,
}

impl SimpleLowpass {
    pub fn new(cutoff_hz: f32) -> Self {
        Self {
            cutoff_hz,
            base: BaseLowpass::new(),
        }
    }

    pub fn filter(&mut self, value: Vec3, dt: f32) -> Vec3 {
        if dt <= 0.0 {
            return value;
        }
        let alpha = smoothing_factor(dt, self.cutoff_hz);
        self.base.filter(value, [alpha; 3])
    }

    pub fn output(&self) -> Vec3 {
        self.base.previous
    }

    pub fn reset(&mut self) {
        self.base.reset();
    }
}

/// One-euro filter: the cutoff rises with the filtered rate of change, so
/// slow drift is smoothed hard and fast motion lags less.
#[derive(Clone, Debug)]
pub struct OneEuroLowpass {
    /// Lower values give less jitter and more lag on small movements.
    pub min_cutoff: f32,
    /// Cutoff used when smoothing the rate estimate itself.
    pub delta_cutoff: f32,
    /// Raise this if fast movements lag too much.
    pub cutoff_slope: f32,
    raw: BaseLowpass,
    delta: BaseLowpass,
}

impl OneEuroLowpass {
    pub fn new(min_cutoff: f32, delta_cutoff: f32, cutoff_slope: f32) -> Self {
        Self {
            min_cutoff,
            delta_cutoff,
            cutoff_slope,
            raw: BaseLowpass::new(),
            delta: BaseLowpass::new(),
        }
    }

    pub fn filter(&mut self, value: Vec3, dt: f32) -> Vec3 {
        if dt <= 0.0 {
            return value;
        }

        let rate = if self.raw.first_time {
            [0.0; 3]
        } else {
            let d = sub(value, self.raw.previous_raw);
            [d[0] / dt, d[1] / dt, d[2] / dt]
        };

        let delta_alpha = smoothing_factor(dt, self.delta_cutoff);
        let estimated = self.delta.filter(rate, [delta_alpha; 3]);

        let alpha = estimated
            .map(|rate| smoothing_factor(dt, self.min_cutoff + self.cutoff_slope * rate.abs()));
        self.raw.filter(value, alpha)
    }

    pub fn output(&self) -> Vec3 {
        self.raw.previous
    }

    pub fn reset(&mut self) {
        self.raw.reset();
        self.delta.reset();
    }
}

#[derive(Clone, Debug)]
pub enum LowpassFilter {
    Simple(SimpleLowpass),
    OneEuro(OneEuroLowpass),
}

impl LowpassFilter {
    pub fn from_settings(settings: &FilterSettings) -> Self {
        match *settings {
            FilterSettings::Simple { cutoff_hz } => {
                LowpassFilter::Simple(SimpleLowpass::new(cutoff_hz))
            }
            FilterSettings::OneEuro {
                min_cutoff,
                delta_cutoff,
                cutoff_slope,
            } => LowpassFilter::OneEuro(OneEuroLowpass::new(
                min_cutoff,
                delta_cutoff,
                cutoff_slope,
            )),
        }
    }

    pub fn filter(&mut self, value: Vec3, dt: f32) -> Vec3 {
        match self {
            LowpassFilter::Simple(f) => f.filter(value, dt),
            LowpassFilter::OneEuro(f) => f.filter(value, dt),
        }
    }

    /// Latest filtered value; `[0.0; 3]` before the first sample.
    pub fn output(&self) -> Vec3 {
        match self {
            LowpassFilter::Simple(f) => f.output(),
            LowpassFilter::OneEuro(f) => f.output(),
        }
    }

    /// Drops the history so the next sample passes through unblended.
    /// [`output`](Self::output) keeps the last value until that sample arrives.
    pub fn reset(&mut self) {
        match self {
            LowpassFilter::Simple(f) => f.reset(),
            LowpassFilter::OneEuro(f) => f.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(a: Vec3, b: Vec3) -> f32 {
        crate::types::length_squared(sub(a, b)).sqrt()
    }

    fn both_filters() -> [LowpassFilter; 2] {
        [
            LowpassFilter::from_settings(&FilterSettings::Simple { cutoff_hz: 2.0 }),
            LowpassFilter::from_settings(&FilterSettings::one_euro()),
        ]
    }

    #[test]
    fn test_first_sample_passes_through() {
        for mut filter in both_filters() {
            assert_eq!(filter.filter([1.0, 2.0, 3.0], 0.016), [1.0, 2.0, 3.0]);
        }
    }

    #[test]
    fn test_reset_passes_next_sample_through() {
        for mut filter in both_filters() {
            for i in 0..20 {
                filter.filter([i as f32, 0.0, -(i as f32)], 0.011);
            }
            filter.reset();
            let value = [7.25, -3.5, 100.0];
            assert_eq!(filter.filter(value, 0.011), value, "{filter:?}");
            assert_eq!(filter.output(), value);
        }
    }

    #[test]
    fn test_output_holds_last_value_until_next_sample_after_reset() {
        for mut filter in both_filters() {
            assert_eq!(filter.output(), [0.0; 3]);
            filter.filter([4.0, 5.0, 6.0], 0.011);
            filter.reset();
            assert_eq!(filter.output(), [4.0, 5.0, 6.0]);
            filter.filter([-1.0, 0.5, 2.0], 0.011);
            assert_eq!(filter.output(), [-1.0, 0.5, 2.0]);
        }
    }

    #[test]
    fn test_constant_input_converges_monotonically() {
        for mut filter in both_filters() {
            filter.filter([0.0, 0.0, 0.0], 1.0 / 90.0);
            let target = [10.0, -4.0, 2.5];
            let mut last_error = error(filter.output(), target);
            for step in 0..200 {
                let out = filter.filter(target, 1.0 / 90.0);
                let err = error(out, target);
                assert!(
                    err <= last_error,
                    "error grew at step {step}: {err} > {last_error} ({filter:?})"
                );
                last_error = err;
            }
            assert!(last_error < 0.5, "did not converge: {last_error}");
        }
    }

    #[test]
    fn test_simple_blend_factor() {
        let mut filter = SimpleLowpass::new(1.0);
        filter.filter([0.0; 3], 0.1);
        let out = filter.filter([1.0, 0.0, 0.0], 0.1);
        let expected = 1.0 - (-0.1f32 * TAU).exp();
        assert!((out[0] - expected).abs() < 1e-6, "{out:?} vs {expected}");
        assert_eq!(out[1], 0.0);
    }

    #[test]
    fn test_one_euro_degenerate_dt_returns_input_untouched() {
        let mut filter = OneEuroLowpass::new(0.9, 1.0, 0.1);
        filter.filter([1.0, 1.0, 1.0], 0.1);
        let before = filter.output();
        let raw_before = filter.raw.previous_raw;

        assert_eq!(filter.filter([5.0, 6.0, 7.0], 0.0), [5.0, 6.0, 7.0]);
        assert_eq!(filter.filter([8.0, 9.0, 10.0], -0.5), [8.0, 9.0, 10.0]);

        assert_eq!(filter.output(), before);
        assert_eq!(filter.raw.previous_raw, raw_before);
        assert_eq!(filter.delta.previous, [0.0; 3]);
    }

    #[test]
    fn test_simple_degenerate_dt_returns_input_untouched() {
        let mut filter = SimpleLowpass::new(2.0);
        filter.filter([0.0; 3], 0.01);

        assert_eq!(filter.filter([1.0, 1.0, 1.0], -1.0), [1.0, 1.0, 1.0]);
        assert_eq!(filter.filter([2.0, 2.0, 2.0], 0.0), [2.0, 2.0, 2.0]);
        assert_eq!(filter.output(), [0.0; 3]);

        let out = filter.filter([1.0, 1.0, 1.0], 0.01);
        assert!(out.iter().all(|v| (0.0..=1.0).contains(v)), "{out:?}");
    }

    #[test]
    fn test_one_euro_tracks_fast_motion_closer_than_slow_cutoff() {
        let mut adaptive = OneEuroLowpass::new(0.9, 1.0, 0.5);
        let mut fixed = SimpleLowpass::new(0.9);
        let dt = 1.0 / 60.0;
        let mut adaptive_out = [0.0; 3];
        let mut fixed_out = [0.0; 3];
        for i in 0..30 {
            let x = i as f32 * 2.0;
            adaptive_out = adaptive.filter([x, 0.0, 0.0], dt);
            fixed_out = fixed.filter([x, 0.0, 0.0], dt);
        }
        assert!(
            adaptive_out[0] > fixed_out[0],
            "adaptive {adaptive_out:?} should lead fixed {fixed_out:?}"
        );
    }
}
