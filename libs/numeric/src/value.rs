//! The [`NumericValue`] type: constructors, predicates and conversions.

use crate::error::{Error, Result};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Sign of a real quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Negative,
    Zero,
    Positive,
}

impl Sign {
    pub fn flip(self) -> Sign {
        match self {
            Sign::Negative => Sign::Positive,
            Sign::Zero => Sign::Zero,
            Sign::Positive => Sign::Negative,
        }
    }
}

/// A numeric quantity in one of four representations.
///
/// The representation is significant: `Rational(1/2)` and `Real(0.5)` are
/// mathematically equal (see [`NumericValue::eq_num`]) but not the *same*
/// value (see `PartialEq`), and they hash differently.
#[derive(Debug, Clone)]
pub enum NumericValue {
    /// Machine float. Also carries `±∞` and NaN.
    Real(f64),
    /// High-precision decimal (28 significant digits).
    Decimal(Decimal),
    /// Exact rational, reduced, positive denominator. Integers have
    /// denominator 1.
    Rational(BigRational),
    /// Complex pair `(re, im)`. Parts are never themselves complex, and
    /// `im` is never exactly zero (the constructor collapses that case).
    Complex(Box<NumericValue>, Box<NumericValue>),
}

impl NumericValue {
    pub fn from_i64(n: i64) -> Self {
        NumericValue::Rational(BigRational::from_integer(BigInt::from(n)))
    }

    pub fn from_bigint(n: BigInt) -> Self {
        NumericValue::Rational(BigRational::from_integer(n))
    }

    /// Exact quotient `n / d`. A zero denominator yields NaN or a signed
    /// infinity, matching float semantics.
    pub fn from_ratio(n: i64, d: i64) -> Self {
        if d == 0 {
            return NumericValue::Real(match n.signum() {
                0 => f64::NAN,
                1 => f64::INFINITY,
                _ => f64::NEG_INFINITY,
            });
        }
        NumericValue::Rational(BigRational::new(BigInt::from(n), BigInt::from(d)))
    }

    pub fn from_big_rational(r: BigRational) -> Self {
        NumericValue::Rational(r)
    }

    /// A machine float, normalized to an exact integer when the value is
    /// integral and small enough to be exact in `f64`.
    pub fn machine(v: f64) -> Self {
        NumericValue::Real(v)
    }

    pub fn decimal(d: Decimal) -> Self {
        NumericValue::Decimal(d)
    }

    /// Builds a complex value, collapsing to the real part when the
    /// imaginary part is exactly zero.
    pub fn complex(re: NumericValue, im: NumericValue) -> Self {
        debug_assert!(!matches!(re, NumericValue::Complex(..)));
        debug_assert!(!matches!(im, NumericValue::Complex(..)));
        if im.is_zero() {
            re
        } else {
            NumericValue::Complex(Box::new(re), Box::new(im))
        }
    }

    pub fn zero() -> Self {
        Self::from_i64(0)
    }

    pub fn one() -> Self {
        Self::from_i64(1)
    }

    pub fn nan() -> Self {
        NumericValue::Real(f64::NAN)
    }

    pub fn pos_infinity() -> Self {
        NumericValue::Real(f64::INFINITY)
    }

    pub fn neg_infinity() -> Self {
        NumericValue::Real(f64::NEG_INFINITY)
    }

    /// The imaginary unit `i`.
    pub fn imaginary_unit() -> Self {
        NumericValue::Complex(Box::new(Self::zero()), Box::new(Self::one()))
    }

    // ------------------------------------------------------------------
    // Predicates
    // ------------------------------------------------------------------

    pub fn is_zero(&self) -> bool {
        match self {
            NumericValue::Real(v) => *v == 0.0,
            NumericValue::Decimal(d) => d.is_zero(),
            NumericValue::Rational(r) => r.is_zero(),
            NumericValue::Complex(re, im) => re.is_zero() && im.is_zero(),
        }
    }

    pub fn is_one(&self) -> bool {
        match self {
            NumericValue::Real(v) => *v == 1.0,
            NumericValue::Decimal(d) => *d == Decimal::ONE,
            NumericValue::Rational(r) => r.is_integer() && r.numer() == &BigInt::from(1),
            NumericValue::Complex(..) => false,
        }
    }

    pub fn is_negative_one(&self) -> bool {
        match self {
            NumericValue::Real(v) => *v == -1.0,
            NumericValue::Decimal(d) => *d == Decimal::NEGATIVE_ONE,
            NumericValue::Rational(r) => r.is_integer() && r.numer() == &BigInt::from(-1),
            NumericValue::Complex(..) => false,
        }
    }

    /// True when the value is mathematically an integer, whatever the
    /// representation.
    pub fn is_integer(&self) -> bool {
        match self {
            NumericValue::Real(v) => v.is_finite() && v.fract() == 0.0,
            NumericValue::Decimal(d) => d.is_integer(),
            NumericValue::Rational(r) => r.is_integer(),
            NumericValue::Complex(..) => false,
        }
    }

    /// True when the representation is an exact rational.
    pub fn is_exact(&self) -> bool {
        match self {
            NumericValue::Rational(_) => true,
            NumericValue::Complex(re, im) => re.is_exact() && im.is_exact(),
            _ => false,
        }
    }

    pub fn is_real(&self) -> bool {
        !matches!(self, NumericValue::Complex(..))
    }

    pub fn is_finite(&self) -> bool {
        match self {
            NumericValue::Real(v) => v.is_finite(),
            NumericValue::Decimal(_) | NumericValue::Rational(_) => true,
            NumericValue::Complex(re, im) => re.is_finite() && im.is_finite(),
        }
    }

    pub fn is_infinite(&self) -> bool {
        match self {
            NumericValue::Real(v) => v.is_infinite(),
            NumericValue::Complex(re, im) => re.is_infinite() || im.is_infinite(),
            _ => false,
        }
    }

    pub fn is_nan(&self) -> bool {
        match self {
            NumericValue::Real(v) => v.is_nan(),
            NumericValue::Complex(re, im) => re.is_nan() || im.is_nan(),
            _ => false,
        }
    }

    /// Strictly positive. False for zero, NaN and complex values.
    pub fn is_positive(&self) -> bool {
        matches!(self.sign(), Some(Sign::Positive))
    }

    /// Strictly negative. False for zero, NaN and complex values.
    pub fn is_negative(&self) -> bool {
        matches!(self.sign(), Some(Sign::Negative))
    }

    /// Parity. `Some` only for integer values.
    pub fn is_even(&self) -> Option<bool> {
        let n = self.try_to_bigint()?;
        Some((n % BigInt::from(2)).is_zero())
    }

    pub fn is_odd(&self) -> Option<bool> {
        self.is_even().map(|e| !e)
    }

    /// Sign of a real value; `None` for NaN and non-real complex values.
    pub fn sign(&self) -> Option<Sign> {
        match self {
            NumericValue::Real(v) => {
                if v.is_nan() {
                    None
                } else if *v == 0.0 {
                    Some(Sign::Zero)
                } else if *v > 0.0 {
                    Some(Sign::Positive)
                } else {
                    Some(Sign::Negative)
                }
            }
            NumericValue::Decimal(d) => Some(if d.is_zero() {
                Sign::Zero
            } else if d.is_sign_positive() {
                Sign::Positive
            } else {
                Sign::Negative
            }),
            NumericValue::Rational(r) => Some(if r.is_zero() {
                Sign::Zero
            } else if r.is_positive() {
                Sign::Positive
            } else {
                Sign::Negative
            }),
            NumericValue::Complex(..) => None,
        }
    }

    // ------------------------------------------------------------------
    // Accessors and conversions
    // ------------------------------------------------------------------

    /// Real part (the value itself for real representations).
    pub fn re(&self) -> NumericValue {
        match self {
            NumericValue::Complex(re, _) => (**re).clone(),
            other => other.clone(),
        }
    }

    /// Imaginary part (zero for real representations).
    pub fn im(&self) -> NumericValue {
        match self {
            NumericValue::Complex(_, im) => (**im).clone(),
            _ => NumericValue::zero(),
        }
    }

    /// Lossy conversion to machine float. Complex values with a nonzero
    /// imaginary part convert to NaN.
    pub fn to_f64(&self) -> f64 {
        match self {
            NumericValue::Real(v) => *v,
            NumericValue::Decimal(d) => d.to_f64().unwrap_or(f64::NAN),
            NumericValue::Rational(r) => r.to_f64().unwrap_or(f64::NAN),
            NumericValue::Complex(re, im) => {
                if im.is_zero() {
                    re.to_f64()
                } else {
                    f64::NAN
                }
            }
        }
    }

    /// Exact integer extraction; `None` unless the value is an integer
    /// that fits in `i64`.
    pub fn try_to_i64(&self) -> Option<i64> {
        match self {
            NumericValue::Real(v) if v.is_finite() && v.fract() == 0.0 => {
                if *v >= i64::MIN as f64 && *v <= i64::MAX as f64 {
                    Some(*v as i64)
                } else {
                    None
                }
            }
            NumericValue::Decimal(d) if d.is_integer() => d.to_i64(),
            NumericValue::Rational(r) if r.is_integer() => r.numer().to_i64(),
            _ => None,
        }
    }

    /// Exact big-integer extraction for integer values.
    pub fn try_to_bigint(&self) -> Option<BigInt> {
        match self {
            NumericValue::Real(v) if v.is_finite() && v.fract() == 0.0 => {
                BigInt::from_f64(*v)
            }
            NumericValue::Decimal(d) if d.is_integer() => {
                BigInt::from_i128(d.to_i128()?)
            }
            NumericValue::Rational(r) if r.is_integer() => Some(r.numer().clone()),
            _ => None,
        }
    }

    /// Exact conversion to the decimal backend; fails when the value
    /// exceeds its range or is not real.
    pub fn to_decimal(&self) -> Result<Decimal> {
        match self {
            NumericValue::Decimal(d) => Ok(*d),
            NumericValue::Rational(r) => {
                crate::decimal::decimal_from_rational(r).ok_or(Error::NotRepresentable)
            }
            NumericValue::Real(f) => {
                Decimal::try_from(*f).map_err(|_| Error::NotRepresentable)
            }
            NumericValue::Complex(..) => Err(Error::NotRepresentable),
        }
    }

    /// Exact rational extraction. `Some` for rationals and for decimals
    /// (which are exact by construction); `None` for floats and complex.
    pub fn try_to_rational(&self) -> Option<BigRational> {
        match self {
            NumericValue::Rational(r) => Some(r.clone()),
            NumericValue::Decimal(d) => {
                let mantissa = BigInt::from(d.mantissa());
                let denom = BigInt::from(10u8).pow(d.scale());
                Some(BigRational::new(mantissa, denom))
            }
            _ => None,
        }
    }

    /// Hashes the *representation*. `0.5` and `1/2` hash differently.
    pub fn repr_hash<H: Hasher>(&self, state: &mut H) {
        match self {
            NumericValue::Real(v) => {
                0u8.hash(state);
                v.to_bits().hash(state);
            }
            NumericValue::Decimal(d) => {
                1u8.hash(state);
                d.hash(state);
            }
            NumericValue::Rational(r) => {
                2u8.hash(state);
                r.numer().hash(state);
                r.denom().hash(state);
            }
            NumericValue::Complex(re, im) => {
                3u8.hash(state);
                re.repr_hash(state);
                im.repr_hash(state);
            }
        }
    }
}

/// Parses `"42"`, `"-3/4"`, `"2.5"`, `"1e10"`, `"NaN"` and the signed
/// infinity names. Integers and quotients of integers parse exactly;
/// decimal literals parse to the decimal backend when they fit.
impl FromStr for NumericValue {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "NaN" => return Ok(NumericValue::nan()),
            "Infinity" | "+Infinity" => return Ok(NumericValue::pos_infinity()),
            "-Infinity" => return Ok(NumericValue::neg_infinity()),
            _ => {}
        }
        if let Some((n, d)) = s.split_once('/') {
            let n = BigInt::from_str(n.trim())
                .map_err(|_| Error::Parse(s.into()))?;
            let d = BigInt::from_str(d.trim())
                .map_err(|_| Error::Parse(s.into()))?;
            if d.is_zero() {
                return Err(Error::Parse(s.into()));
            }
            return Ok(NumericValue::Rational(BigRational::new(n, d)));
        }
        if !s.contains(['.', 'e', 'E']) {
            if let Ok(i) = BigInt::from_str(s) {
                return Ok(NumericValue::from_bigint(i));
            }
        }
        if let Ok(d) = Decimal::from_str(s) {
            return Ok(NumericValue::Decimal(d));
        }
        s.parse::<f64>()
            .map(NumericValue::Real)
            .map_err(|_| Error::Parse(s.into()))
    }
}

/// Representation equality: same variant, same stored value. NaN equals
/// NaN here so that structurally identical expressions stay identical.
impl PartialEq for NumericValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NumericValue::Real(a), NumericValue::Real(b)) => {
                a == b || (a.is_nan() && b.is_nan())
            }
            (NumericValue::Decimal(a), NumericValue::Decimal(b)) => a == b,
            (NumericValue::Rational(a), NumericValue::Rational(b)) => a == b,
            (NumericValue::Complex(ar, ai), NumericValue::Complex(br, bi)) => {
                ar == br && ai == bi
            }
            _ => false,
        }
    }
}

impl Eq for NumericValue {}

impl fmt::Display for NumericValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericValue::Real(v) => write!(f, "{v}"),
            NumericValue::Decimal(d) => write!(f, "{d}"),
            NumericValue::Rational(r) => {
                if r.is_integer() {
                    write!(f, "{}", r.numer())
                } else {
                    write!(f, "{}/{}", r.numer(), r.denom())
                }
            }
            NumericValue::Complex(re, im) => {
                if im.is_negative() {
                    write!(f, "{re}-{}i", im.neg())
                } else {
                    write!(f, "{re}+{im}i")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_representation_equality() {
        let half_exact = NumericValue::from_ratio(1, 2);
        let half_float = NumericValue::machine(0.5);
        assert_ne!(half_exact, half_float);
        assert_eq!(half_exact, NumericValue::from_ratio(2, 4));
    }

    #[test]
    fn test_complex_collapses_to_real() {
        let v = NumericValue::complex(NumericValue::from_i64(3), NumericValue::zero());
        assert!(v.is_real());
        assert_eq!(v.try_to_i64(), Some(3));
    }

    #[test]
    fn test_integer_predicates() {
        assert!(NumericValue::from_i64(-4).is_integer());
        assert_eq!(NumericValue::from_i64(-4).is_even(), Some(true));
        assert_eq!(NumericValue::from_i64(7).is_odd(), Some(true));
        assert!(!NumericValue::from_ratio(1, 2).is_integer());
        assert_eq!(NumericValue::from_ratio(1, 2).is_even(), None);
    }

    #[test]
    fn test_sign() {
        assert_eq!(NumericValue::from_i64(-2).sign(), Some(Sign::Negative));
        assert_eq!(NumericValue::zero().sign(), Some(Sign::Zero));
        assert_eq!(NumericValue::nan().sign(), None);
        assert_eq!(NumericValue::imaginary_unit().sign(), None);
    }

    #[test]
    fn test_zero_denominator() {
        assert!(NumericValue::from_ratio(0, 0).is_nan());
        assert!(NumericValue::from_ratio(1, 0).is_infinite());
        assert!(NumericValue::from_ratio(-1, 0).is_negative());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("42".parse::<NumericValue>().unwrap(), NumericValue::from_i64(42));
        assert_eq!(
            "-3/4".parse::<NumericValue>().unwrap(),
            NumericValue::from_ratio(-3, 4)
        );
        assert!("2.5".parse::<NumericValue>().unwrap().eq_num(&NumericValue::from_ratio(5, 2)));
        assert!("NaN".parse::<NumericValue>().unwrap().is_nan());
        assert!("1e300".parse::<NumericValue>().unwrap().is_finite());
        assert!("1/0".parse::<NumericValue>().is_err());
        assert!("pebble".parse::<NumericValue>().is_err());
    }

    #[test]
    fn test_to_decimal() {
        assert!(NumericValue::from_ratio(1, 4).to_decimal().is_ok());
        assert!(NumericValue::imaginary_unit().to_decimal().is_err());
        assert!(NumericValue::pos_infinity().to_decimal().is_err());
    }
}
