use num_traits::float::FloatCore;

/// Closed interval used to map raw converter codes onto calibrated volts and
/// back.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Range<T: FloatCore> {
    min: T,
    max: T,
}

impl<T: FloatCore> Range<T> {
    pub const fn new(min: T, max: T) -> Self {
        Range { min, max }
    }

    pub fn map_value_to_range(&self, val: T, new_range: &Range<T>) -> T {
        let scale = (new_range.max - new_range.min) / (self.max - self.min);

        (val - self.min) * scale + new_range.min
    }
}

#[cfg(test)]
mod tests {
    use super::Range;

    #[test]
    fn small_to_large() {
        let small = Range::new(0f32, 10f32);
        let large = Range::new(0f32, 50f32);
        assert_eq!(small.map_value_to_range(5.0, &large), 25.0);
    }

    #[test]
    fn move_zero_point() {
        let small = Range::new(0f32, 10f32);
        let large = Range::new(10f32, 50f32);
        assert_eq!(small.map_value_to_range(5.0, &large), 30.0);
    }

    #[test]
    fn symmetric_ranges() {
        let raw = Range::new(-32768f32, 32768f32);
        let volts = Range::new(-10f32, 10f32);
        assert_eq!(raw.map_value_to_range(16384.0, &volts), 5.0);
        assert_eq!(volts.map_value_to_range(-5.0, &raw), -16384.0);
    }
}
