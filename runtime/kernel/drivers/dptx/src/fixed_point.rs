// Licensed under the Apache-2.0 license

//! Exact rational helpers for time-slot arithmetic.

/// Non-negative rational `num / den`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ratio {
    pub num: u64,
    pub den: u64,
}

impl Ratio {
    pub const fn new(num: u64, den: u64) -> Self {
        Self { num, den }
    }

    pub const fn floor(self) -> u64 {
        self.num / self.den
    }

    pub const fn ceil(self) -> u64 {
        self.num.div_ceil(self.den)
    }
}

/// A value held in units of 1/8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Eighths(pub u64);

impl Eighths {
    pub const fn whole(self) -> u64 {
        self.0 / 8
    }

    pub const fn fraction(self) -> u64 {
        self.0 % 8
    }

    pub const fn ceil(self) -> u64 {
        self.0.div_ceil(8)
    }
}

/// Target slot count between the average and the PBN-derived ceiling:
/// `floor(avg) + floor(8 * (max - floor(avg))) / 8`.
pub fn interpolate_slots(average: Ratio, maximum: Ratio) -> Eighths {
    let whole = average.floor();
    let fraction = (8 * maximum.num).saturating_sub(8 * whole * maximum.den) / maximum.den;
    Eighths(8 * whole + fraction)
}

/// Rounds `value` up to the next multiple of `multiple`.
pub const fn round_up_to_multiple(value: u32, multiple: u32) -> u32 {
    value.div_ceil(multiple) * multiple
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_rounding() {
        let r = Ratio::new(7, 2);
        assert_eq!(r.floor(), 3);
        assert_eq!(r.ceil(), 4);
        assert_eq!(Ratio::new(8, 2).ceil(), 4);
    }

    #[test]
    fn test_interpolate_slots() {
        // avg 13.2, max 13.3 -> 13 + 2/8
        let slots = interpolate_slots(Ratio::new(132, 10), Ratio::new(133, 10));
        assert_eq!(slots, Eighths(106));
        assert_eq!(slots.whole(), 13);
        assert_eq!(slots.fraction(), 2);
        assert_eq!(slots.ceil(), 14);

        // less than an eighth above the average truncates to a whole slot
        let slots = interpolate_slots(Ratio::new(10, 1), Ratio::new(161, 16));
        assert_eq!(slots, Eighths(80));
        assert_eq!(slots.ceil(), 10);
    }

    #[test]
    fn test_round_up_to_multiple() {
        assert_eq!(round_up_to_multiple(14, 4), 16);
        assert_eq!(round_up_to_multiple(16, 4), 16);
        assert_eq!(round_up_to_multiple(13, 2), 14);
        assert_eq!(round_up_to_multiple(0, 4), 0);
        for value in 0..64 {
            assert_eq!(round_up_to_multiple(value, 4) % 4, 0);
            assert_eq!(round_up_to_multiple(value, 2) % 2, 0);
        }
    }
}
