//! Moving-average smoothing
//!
//! Turns raw per-window counts into a trailing moving average so that the
//! report shows sustained activity rather than single-window spikes.

use crate::error::PulseError;
use std::collections::VecDeque;

/// Default smoothing window, in binning windows
pub const DEFAULT_SMOOTHING_WINDOW: usize = 120;

/// Trailing moving average over a fixed number of values
#[derive(Debug, Clone)]
pub struct MovingAverage {
    values: VecDeque<u32>,
    sum: u64,
    window_size: usize,
}

impl MovingAverage {
    /// Create an averager; the window must hold at least one value
    pub fn new(window_size: usize) -> Result<Self, PulseError> {
        if window_size == 0 {
            return Err(PulseError::InvalidConfig(
                "smoothing window must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            values: VecDeque::with_capacity(window_size),
            sum: 0,
            window_size,
        })
    }

    /// Add a value and return the mean of the values currently in the window
    pub fn push(&mut self, value: u32) -> f64 {
        self.values.push_back(value);
        self.sum += u64::from(value);
        while self.values.len() > self.window_size {
            if let Some(old) = self.values.pop_front() {
                self.sum -= u64::from(old);
            }
        }
        self.sum as f64 / self.values.len() as f64
    }
}

/// Smooth `counts` with a trailing mean over up to `window_size` values.
///
/// Position `i` averages `counts[i + 1 - window_size ..= i]`, or everything
/// up to `i` while fewer values are available.
pub fn smooth(counts: &[u32], window_size: usize) -> Result<Vec<f64>, PulseError> {
    let mut average = MovingAverage::new(window_size)?;
    Ok(counts.iter().map(|&c| average.push(c)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expanding_then_trailing_mean() {
        let smoothed = smooth(&[1, 2, 3, 4, 5], 3).unwrap();
        assert_eq!(smoothed, vec![1.0, 1.5, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_window_of_one_is_identity() {
        let counts = [4, 0, 7, 1];
        let smoothed = smooth(&counts, 1).unwrap();
        assert_eq!(smoothed, vec![4.0, 0.0, 7.0, 1.0]);
    }

    #[test]
    fn test_window_larger_than_series() {
        let smoothed = smooth(&[2, 4, 0], DEFAULT_SMOOTHING_WINDOW).unwrap();
        assert_eq!(smoothed, vec![2.0, 3.0, 2.0]);
    }

    #[test]
    fn test_empty_series() {
        assert!(smooth(&[], 3).unwrap().is_empty());
    }

    #[test]
    fn test_zero_window_is_rejected() {
        let err = smooth(&[1, 2], 0).unwrap_err();
        assert!(matches!(err, PulseError::InvalidConfig(_)));
    }

    #[test]
    fn test_moving_average_rolls() {
        let mut avg = MovingAverage::new(2).unwrap();
        assert_eq!(avg.push(10), 10.0);
        assert_eq!(avg.push(20), 15.0);
        assert_eq!(avg.push(0), 10.0);
        assert_eq!(avg.push(0), 0.0);
    }
}
