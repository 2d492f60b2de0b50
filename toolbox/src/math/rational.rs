use num::BigRational;
use num_bigint::BigInt;

/// A rational approximation of a double, produced by truncating the
/// continued-fraction expansion once the denominator cap is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub numerator: i64,
    pub denominator: i64,
}

impl Rational {
    pub fn zero() -> Self {
        Self {
            numerator: 0,
            denominator: 1,
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    pub fn to_big(&self) -> BigRational {
        BigRational::new(
            BigInt::from(self.numerator),
            BigInt::from(self.denominator),
        )
    }
}

/// Finds the best rational approximation to `value` with denominator at
/// most `max_denominator`, by the continued-fraction construction
/// (Eppstein 1993, with Formella's corrections).
///
/// The expansion `x = a1 + 1/(a2 + 1/(a3 + ...))` is truncated when the
/// denominator would exceed the cap; of the two candidates (truncate, or
/// bump the last term as far as the cap allows) the one with the smaller
/// absolute error wins. Zero, including negative zero, maps to `0/1`.
pub fn rational_approximation(value: f64, max_denominator: u32) -> Rational {
    if value == 0.0 || !value.is_finite() {
        return Rational::zero();
    }
    let maxden = max_denominator.max(1) as i64;
    let mut m = [[1i64, 0i64], [0i64, 1i64]];
    let mut x = value;

    loop {
        let ai = x as i64;
        if (m[1][0] * ai + m[1][1]).abs() > maxden {
            break;
        }
        let t = m[0][0] * ai + m[0][1];
        m[0][1] = m[0][0];
        m[0][0] = t;
        let t = m[1][0] * ai + m[1][1];
        m[1][1] = m[1][0];
        m[1][0] = t;
        if x == ai as f64 {
            break;
        }
        x = 1.0 / (x - ai as f64);
        if x.abs() > i32::MAX as f64 {
            break;
        }
    }

    let first = Rational {
        numerator: m[0][0],
        denominator: m[1][0],
    };
    let first_ok = first.denominator != 0;
    let error_first = if first_ok {
        value - first.as_f64()
    } else {
        f64::INFINITY
    };

    // Bumping the last term as far as the cap allows gives the other
    // truncation candidate.
    let ai = if m[1][0] != 0 {
        (maxden - m[1][1]) / m[1][0]
    } else {
        0
    };
    let second = Rational {
        numerator: m[0][0] * ai + m[0][1],
        denominator: m[1][0] * ai + m[1][1],
    };
    let second_ok = second.denominator != 0 && second.denominator.abs() <= maxden;
    let error_second = if second_ok {
        value - second.as_f64()
    } else {
        f64::INFINITY
    };

    if !first_ok && !second_ok {
        return Rational {
            numerator: value.round() as i64,
            denominator: 1,
        };
    }
    let mut best = if error_first.abs() <= error_second.abs() {
        first
    } else {
        second
    };
    if best.denominator < 0 {
        best.numerator = -best.numerator;
        best.denominator = -best.denominator;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_small_fractions_round_trip() {
        let r = rational_approximation(0.5, 100);
        assert_eq!((r.numerator, r.denominator), (1, 2));
        let r = rational_approximation(-0.75, 100);
        assert_eq!((r.numerator, r.denominator), (-3, 4));
        let r = rational_approximation(3.0, 100);
        assert_eq!((r.numerator, r.denominator), (3, 1));
    }

    #[test]
    fn zero_keeps_a_positive_denominator() {
        for z in [0.0, -0.0] {
            let r = rational_approximation(z, 100);
            assert_eq!((r.numerator, r.denominator), (0, 1));
        }
    }

    #[test]
    fn denominator_respects_the_cap() {
        let r = rational_approximation(std::f64::consts::PI, 100);
        assert!(r.denominator <= 100);
        assert!((r.as_f64() - std::f64::consts::PI).abs() < 1e-4);
    }

    #[test]
    fn error_shrinks_with_a_larger_cap() {
        let tight = rational_approximation(std::f64::consts::E, 10);
        let loose = rational_approximation(std::f64::consts::E, 10_000);
        let e = std::f64::consts::E;
        assert!((loose.as_f64() - e).abs() <= (tight.as_f64() - e).abs());
    }

    #[test]
    fn sampled_values_stay_within_the_dirichlet_bound() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let value: f64 = rng.gen_range(-8.0..8.0);
            let cap = rng.gen_range(10u32..500);
            let r = rational_approximation(value, cap);
            assert!(r.denominator >= 1 && r.denominator <= cap as i64);
            // A best approximation with denominator at most `cap` lies
            // within 1/cap of the target.
            assert!(
                (r.as_f64() - value).abs() <= 1.0 / cap as f64 + 1e-12,
                "{value} approximated as {}/{} under cap {cap}",
                r.numerator,
                r.denominator
            );
        }
    }
}
