//! Interval / sample-rate conversion
//!
//! An interval is the delay per sample; a rate is samples per second.
//! A zero interval means "as fast as possible", i.e. an unbounded rate.

use std::time::Duration;

/// Samples per second for a poll interval. `0` maps to `f64::INFINITY`.
pub fn interval_to_rate(interval: Duration) -> f64 {
    if interval.is_zero() {
        f64::INFINITY
    } else {
        1.0 / interval.as_secs_f64()
    }
}

/// Poll interval for a sample rate. `f64::INFINITY` maps to zero.
///
/// Rates that are zero, negative or NaN never fire and saturate to `Duration::MAX`.
pub fn rate_to_interval(rate: f64) -> Duration {
    if rate == f64::INFINITY {
        Duration::ZERO
    } else if rate.is_nan() || rate <= 0.0 {
        Duration::MAX
    } else {
        Duration::try_from_secs_f64(1.0 / rate).unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_to_rate() {
        // 1000ms per sample is 1 sample per second
        assert_eq!(interval_to_rate(Duration::from_millis(1000)), 1.0);
        assert_eq!(interval_to_rate(Duration::from_millis(500)), 2.0);
        assert_eq!(interval_to_rate(Duration::ZERO), f64::INFINITY);
    }

    #[test]
    fn test_rate_to_interval() {
        assert_eq!(rate_to_interval(1.0), Duration::from_millis(1000));
        assert_eq!(rate_to_interval(2.0), Duration::from_millis(500));
        assert_eq!(rate_to_interval(f64::INFINITY), Duration::ZERO);
    }

    #[test]
    fn test_degenerate_rates() {
        assert_eq!(rate_to_interval(0.0), Duration::MAX);
        assert_eq!(rate_to_interval(-3.0), Duration::MAX);
        assert_eq!(rate_to_interval(f64::NAN), Duration::MAX);
    }
}
