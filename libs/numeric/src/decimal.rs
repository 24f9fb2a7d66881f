//! Bridging between the exact rational world and the decimal backend.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::ToPrimitive;
use rust_decimal::Decimal;

/// Converts a rational to the decimal backend. `None` when numerator or
/// denominator exceed the backend's 96-bit mantissa.
pub fn decimal_from_rational(r: &BigRational) -> Option<Decimal> {
    let n = bigint_to_decimal(r.numer())?;
    let d = bigint_to_decimal(r.denom())?;
    n.checked_div(d)
}

fn bigint_to_decimal(n: &BigInt) -> Option<Decimal> {
    Decimal::try_from_i128_with_scale(n.to_i128()?, 0).ok()
}

pub fn decimal_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(f64::NAN)
}

pub fn f64_to_decimal(v: f64) -> Option<Decimal> {
    Decimal::try_from(v).ok()
}

/// Default tolerance for a working precision of `precision` significant
/// digits: the last two digits are ignored.
pub fn tolerance_for_precision(precision: u32) -> f64 {
    10f64.powi(-(precision.saturating_sub(2) as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    #[test]
    fn test_decimal_from_rational() {
        let r = BigRational::new(BigInt::from(1), BigInt::from(4));
        assert_eq!(decimal_from_rational(&r), Some(Decimal::new(25, 2)));
    }

    #[test]
    fn test_decimal_from_huge_rational_is_none() {
        let r = BigRational::from_integer(BigInt::from(10).pow(60));
        assert_eq!(decimal_from_rational(&r), None);
    }

    #[test]
    fn test_tolerance() {
        assert!((tolerance_for_precision(10) - 1e-8).abs() < 1e-20);
    }
}
