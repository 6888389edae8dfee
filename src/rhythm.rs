//! Rhythm helpers
//!
//! Euclidean onset patterns and random chord durations.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `(steps, pulses)` pairs that give musically familiar Euclidean rhythms.
///
/// See Toussaint, "The Euclidean Algorithm Generates Traditional Musical Rhythms".
pub const EUCLIDEAN_TUPLES: &[(usize, usize)] = &[
    (1, 1),
    (2, 1),
    (3, 1),
    (3, 2),
    (4, 3),
    (5, 2),
    (5, 3),
    (6, 5),
    (7, 4),
    (7, 5),
    (8, 5),
    (8, 7),
    (9, 5),
];

/// Errors raised by the rhythm helpers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RhythmError {
    /// A Euclidean pattern needs between 1 and `steps` pulses.
    #[error("cannot place {pulses} pulses in {steps} steps")]
    InvalidPulses {
        /// Pattern length.
        steps: usize,
        /// Requested onsets.
        pulses: usize,
    },

    /// Duration bounds must satisfy `0 <= min <= max` and a positive interval.
    #[error("invalid duration bounds [{min}, {max}] with interval {interval}")]
    InvalidDurations {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
        /// Rounding interval.
        interval: f64,
    },
}

/// `n` steps with `k` onsets spread as evenly as possible (Bjorklund).
///
/// The pattern is rotated to start on an onset, so `euclidean_sequence(8, 3)`
/// is `[1, 0, 0, 1, 0, 0, 1, 0]`.
pub fn euclidean_sequence(n: usize, k: usize) -> Result<Vec<u8>, RhythmError> {
    if k == 0 || k > n {
        return Err(RhythmError::InvalidPulses { steps: n, pulses: k });
    }

    let mut counts: Vec<usize> = Vec::new();
    let mut remainders: Vec<usize> = vec![k];
    let mut divisor = n - k;
    let mut level = 0;

    loop {
        counts.push(divisor / remainders[level]);
        remainders.push(divisor % remainders[level]);
        divisor = remainders[level];
        level += 1;

        if remainders[level] <= 1 {
            break;
        }
    }
    counts.push(divisor);

    let mut pattern = Vec::with_capacity(n);
    build_level(level as isize, &counts, &remainders, &mut pattern);

    if let Some(first) = pattern.iter().position(|&b| b == 1) {
        pattern.rotate_left(first);
    }
    Ok(pattern)
}

fn build_level(level: isize, counts: &[usize], remainders: &[usize], pattern: &mut Vec<u8>) {
    match level {
        -1 => pattern.push(0),
        -2 => pattern.push(1),
        _ => {
            let ix = level as usize;
            for _ in 0..counts[ix] {
                build_level(level - 1, counts, remainders, pattern);
            }
            if remainders[ix] != 0 {
                build_level(level - 2, counts, remainders, pattern);
            }
        }
    }
}

/// Round `x` to the closest multiple of `base`.
pub fn round_to_base(x: f64, base: f64) -> f64 {
    base * (x / base).round_ties_even()
}

/// Range and grid of randomly drawn chord durations, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationBounds {
    /// Shortest duration.
    pub min: f64,
    /// Longest duration.
    pub max: f64,
    /// Grid that drawn durations snap to.
    pub interval: f64,
}

impl Default for DurationBounds {
    fn default() -> Self {
        DurationBounds {
            min: 3.0,
            max: 3.0,
            interval: 0.5,
        }
    }
}

impl DurationBounds {
    /// Bounds over `[min, max]` on an `interval` grid.
    pub fn new(min: f64, max: f64, interval: f64) -> Self {
        DurationBounds { min, max, interval }
    }

    /// Draw `n` durations within these bounds.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<f64>, RhythmError> {
        random_durations(n, self.min, self.max, self.interval, rng)
    }
}

/// `n` durations drawn uniformly from `[min, max]`, rounded to `interval`.
///
/// Equal bounds give `n` copies of `min`.
pub fn random_durations<R: Rng + ?Sized>(
    n: usize,
    min: f64,
    max: f64,
    interval: f64,
    rng: &mut R,
) -> Result<Vec<f64>, RhythmError> {
    if min < 0.0 || min > max || interval <= 0.0 {
        return Err(RhythmError::InvalidDurations { min, max, interval });
    }
    if min == max {
        return Ok(vec![min; n]);
    }

    Ok((0..n)
        .map(|_| round_to_base(rng.gen_range(min..max), interval))
        .collect())
}
