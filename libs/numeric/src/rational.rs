//! Exact big-integer and rational helpers.

use num_bigint::BigInt;
use num_integer::Roots;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

/// Exact integer `n`-th root: `Some(r)` iff `r^n == base` exactly.
///
/// Even roots of negative numbers have no integer solution.
pub fn nth_root_exact(base: &BigInt, n: u32) -> Option<BigInt> {
    if n == 0 {
        return None;
    }
    if base.is_negative() {
        if n % 2 == 0 {
            return None;
        }
        return nth_root_exact(&-base, n).map(|r| -r);
    }
    let root = base.nth_root(n);
    if num_traits::Pow::pow(&root, n) == *base {
        Some(root)
    } else {
        None
    }
}

/// Exact `base^exp` for a rational exponent, when the result is itself
/// rational: integer exponents always, fractional exponents only when
/// numerator and denominator of the base are perfect powers.
pub fn rational_pow_exact(base: &BigRational, exp: &BigRational) -> Option<BigRational> {
    if base.is_zero() {
        return if exp.is_positive() {
            Some(BigRational::zero())
        } else {
            None
        };
    }
    if exp.is_zero() {
        return Some(BigRational::one());
    }

    let p = exp.numer().to_i64()?;
    let q = exp.denom().to_u32()?;

    // Take the q-th root first; it must be exact for an exact result.
    let rooted = if q == 1 {
        base.clone()
    } else {
        let n = nth_root_exact(base.numer(), q)?;
        let d = nth_root_exact(base.denom(), q)?;
        BigRational::new(n, d)
    };

    if p.unsigned_abs() > u32::MAX as u64 {
        return None;
    }
    let powed = num_traits::Pow::pow(&rooted, p.unsigned_abs() as u32);
    Some(if p < 0 { powed.recip() } else { powed })
}

/// `n!` as an exact big integer.
pub fn big_factorial(n: u64) -> BigInt {
    let mut acc = BigInt::one();
    for k in 2..=n {
        acc *= BigInt::from(k);
    }
    acc
}

/// `n!!`, the product of every other integer down to 1 or 2. By convention
/// `0!! == 1!! == 1`.
pub fn big_double_factorial(n: u64) -> BigInt {
    let mut acc = BigInt::one();
    let mut k = n;
    while k > 1 {
        acc *= BigInt::from(k);
        k -= 2;
    }
    acc
}

/// Greatest common divisor, always non-negative.
pub fn big_gcd(a: &BigInt, b: &BigInt) -> BigInt {
    num_integer::Integer::gcd(a, b)
}

/// Least common multiple; zero when either operand is zero.
pub fn big_lcm(a: &BigInt, b: &BigInt) -> BigInt {
    num_integer::Integer::lcm(a, b)
}

/// Binomial coefficient `C(n, k)`, multiplicative form.
pub fn big_binomial(n: u64, k: u64) -> BigInt {
    if k > n {
        return BigInt::zero();
    }
    let k = k.min(n - k);
    let mut acc = BigInt::one();
    for i in 0..k {
        acc = acc * BigInt::from(n - i) / BigInt::from(i + 1);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nth_root_exact() {
        assert_eq!(nth_root_exact(&BigInt::from(27), 3), Some(BigInt::from(3)));
        assert_eq!(nth_root_exact(&BigInt::from(28), 3), None);
        assert_eq!(
            nth_root_exact(&BigInt::from(-27), 3),
            Some(BigInt::from(-3))
        );
        assert_eq!(nth_root_exact(&BigInt::from(-4), 2), None);
    }

    #[test]
    fn test_rational_pow_exact() {
        let base = BigRational::new(BigInt::from(8), BigInt::from(27));
        let exp = BigRational::new(BigInt::from(1), BigInt::from(3));
        let out = rational_pow_exact(&base, &exp).unwrap();
        assert_eq!(out, BigRational::new(BigInt::from(2), BigInt::from(3)));

        let exp = BigRational::new(BigInt::from(-2), BigInt::from(3));
        let out = rational_pow_exact(&base, &exp).unwrap();
        assert_eq!(out, BigRational::new(BigInt::from(9), BigInt::from(4)));

        let irrational = BigRational::new(BigInt::from(2), BigInt::from(1));
        let half = BigRational::new(BigInt::from(1), BigInt::from(2));
        assert_eq!(rational_pow_exact(&irrational, &half), None);
    }

    #[test]
    fn test_factorials() {
        assert_eq!(big_factorial(0), BigInt::from(1));
        assert_eq!(big_factorial(5), BigInt::from(120));
        assert_eq!(big_double_factorial(0), BigInt::from(1));
        assert_eq!(big_double_factorial(6), BigInt::from(48));
        assert_eq!(big_double_factorial(7), BigInt::from(105));
        // 170! has 307 digits; it must not overflow.
        assert_eq!(big_factorial(170).to_string().len(), 307);
    }

    #[test]
    fn test_binomial() {
        assert_eq!(big_binomial(10, 3), BigInt::from(120));
        assert_eq!(big_binomial(10, 0), BigInt::from(1));
        assert_eq!(big_binomial(3, 5), BigInt::from(0));
    }

    #[test]
    fn test_gcd_lcm() {
        assert_eq!(
            big_gcd(&BigInt::from(12), &BigInt::from(18)),
            BigInt::from(6)
        );
        assert_eq!(
            big_lcm(&BigInt::from(4), &BigInt::from(6)),
            BigInt::from(12)
        );
        assert_eq!(big_gcd(&BigInt::from(-8), &BigInt::from(12)), BigInt::from(4));
    }
}
