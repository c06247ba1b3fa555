//! Shared test utilities for the clickhist workspace.
//!
//! - Synthetic coordinate grids and paired precipitation-like arrays
//! - Fixed epochs, regions and bin edges used across the suite
//! - Temporary directories and on-disk dataset writers
//! - Approximate float assertions
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Assert two floats are within `epsilon` of each other.
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(86400.0 * 1.5e-4, 12.96, 1e-9);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right, epsilon): (f64, f64, f64) = ($left as f64, $right as f64, $epsilon as f64);
        let diff = (left - right).abs();
        if !(diff <= epsilon) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`\n right: `{:?}`\n  diff: `{:?}` > `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Assert a (lon, lat) pair matches within `epsilon`.
#[macro_export]
macro_rules! assert_lonlat_approx_eq {
    (($lon1:expr, $lat1:expr), ($lon2:expr, $lat2:expr), $epsilon:expr) => {{
        $crate::assert_approx_eq!($lon1, $lon2, $epsilon);
        $crate::assert_approx_eq!($lat1, $lat2, $epsilon);
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(12.96000001, 12.96, 1e-6);
        assert_approx_eq!(-140.0, -140.0, 0.0);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_rejects_nan() {
        assert_approx_eq!(f64::NAN, 1.0, 1.0);
    }

    #[test]
    fn test_assert_lonlat_approx_eq_passes() {
        assert_lonlat_approx_eq!((-140.0001, -5.0001), (-140.0, -5.0), 0.001);
    }
}
