//! Multiplicative jitter applied as the last step of both scoring paths

use rand::Rng;
use std::ops::RangeInclusive;

/// Source of the jitter factor
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Jitter {
    /// Uniform draw from the path's range
    #[default]
    Uniform,
    /// Always the given factor
    Fixed(f64),
}

impl Jitter {
    /// Jitter disabled
    pub const NONE: Jitter = Jitter::Fixed(1.0);

    /// Build from the `scoring.jitter` flag
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            Jitter::Uniform
        } else {
            Jitter::NONE
        }
    }

    /// Draw a factor for the given range
    pub fn factor(&self, range: &RangeInclusive<f64>) -> f64 {
        match self {
            Jitter::Uniform => rand::thread_rng().gen_range(range.clone()),
            Jitter::Fixed(factor) => *factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_stays_in_range() {
        let range = 0.95..=1.05;
        for _ in 0..1000 {
            let factor = Jitter::Uniform.factor(&range);
            assert!(range.contains(&factor), "factor {} out of range", factor);
        }
    }

    #[test]
    fn test_fixed_ignores_range() {
        assert_eq!(Jitter::Fixed(0.98).factor(&(0.95..=1.05)), 0.98);
        assert_eq!(Jitter::from_enabled(false).factor(&(0.98..=1.02)), 1.0);
        assert_eq!(Jitter::from_enabled(true), Jitter::Uniform);
    }
}
