//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
///
/// The mapping is not clamped, values outside the source range are
/// extrapolated along the same line.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Clamp a value between `min` and `max`.
///
/// Returns the clamped value and whether clamping occured.
pub fn clamp<T>(value: T, min: T, max: T) -> (T, bool)
where
    T: Float
{
    if value > max {
        (max, true)
    }
    else if value < min {
        (min, true)
    }
    else {
        (value, false)
    }
}

/// Sum of the absolute values of the elements of a slice.
pub fn sum_abs<T>(values: &[T]) -> T
where
    T: Float
{
    values.iter().fold(T::zero(), |acc, v| acc + v.abs())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 10f64), (0f64, 100f64), 5f64), 50f64);
        assert_eq!(lin_map((0f64, -90f64), (1500f64, 500f64), -45f64), 1000f64);
        assert_eq!(lin_map((0f64, 10f64), (0f64, 100f64), 20f64), 200f64);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(1.5f64, -1f64, 1f64), (1f64, true));
        assert_eq!(clamp(-1.5f64, -1f64, 1f64), (-1f64, true));
        assert_eq!(clamp(0.5f64, -1f64, 1f64), (0.5f64, false));
        assert_eq!(sum_abs(&[1f64, -2f64, 0.5f64]), 3.5f64);
    }
}
