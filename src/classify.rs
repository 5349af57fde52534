//! Emission severity tiers.

use crate::domain::Tier;

/// Upper bound (exclusive) of the green tier, in Mt CO₂.
pub const GREEN_BELOW: f64 = 3000.0;

/// Upper bound (inclusive) of the yellow tier, in Mt CO₂.
pub const YELLOW_UP_TO: f64 = 6000.0;

/// Map a predicted value to its tier.
///
/// `< 3000` is green, `[3000, 6000]` yellow, `> 6000` red. Negative values are
/// green; NaN fails both comparisons and lands in red.
pub fn classify(value: f64) -> Tier {
    if value < GREEN_BELOW {
        Tier::Green
    } else if value <= YELLOW_UP_TO {
        Tier::Yellow
    } else {
        Tier::Red
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries() {
        assert_eq!(classify(2999.99), Tier::Green);
        assert_eq!(classify(3000.0), Tier::Yellow);
        assert_eq!(classify(6000.0), Tier::Yellow);
        assert_eq!(classify(6000.01), Tier::Red);
    }

    #[test]
    fn total_over_extremes() {
        assert_eq!(classify(-50.0), Tier::Green);
        assert_eq!(classify(f64::NEG_INFINITY), Tier::Green);
        assert_eq!(classify(f64::INFINITY), Tier::Red);
        assert_eq!(classify(f64::NAN), Tier::Red);
    }
}
