//! Binary arithmetic with automatic promotion.
//!
//! The promotion table, applied per operation:
//!
//! - `Rational op Rational` → `Rational` (exact, never leaves the rationals)
//! - `Decimal` with anything real → `Decimal`, falling back to machine
//!   floats on decimal overflow
//! - `Real` with `Rational` → `Real`
//! - anything with `Complex` → `Complex`
//!
//! All operations are total: indeterminate forms come back as NaN rather
//! than as errors, mirroring float semantics.

use crate::complex;
use crate::decimal::decimal_from_rational;
use crate::rational::{nth_root_exact, rational_pow_exact};
use crate::value::{NumericValue, Sign};
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use rust_decimal::{Decimal, MathematicalOps};

impl NumericValue {
    pub fn add(&self, other: &NumericValue) -> NumericValue {
        use NumericValue::*;
        match (self, other) {
            (Complex(..), _) | (_, Complex(..)) => complex::add(self, other),
            (Rational(a), Rational(b)) => Rational(a + b),
            (Decimal(_), _) | (_, Decimal(_)) => {
                match (as_decimal(self), as_decimal(other)) {
                    (Some(a), Some(b)) => match a.checked_add(b) {
                        Some(d) => Decimal(d),
                        None => Real(self.to_f64() + other.to_f64()),
                    },
                    _ => Real(self.to_f64() + other.to_f64()),
                }
            }
            _ => Real(self.to_f64() + other.to_f64()),
        }
    }

    pub fn sub(&self, other: &NumericValue) -> NumericValue {
        self.add(&other.neg())
    }

    pub fn neg(&self) -> NumericValue {
        use NumericValue::*;
        match self {
            Real(v) => Real(-v),
            Decimal(d) => Decimal(-d),
            Rational(r) => Rational(-r),
            Complex(re, im) => NumericValue::complex(re.neg(), im.neg()),
        }
    }

    pub fn mul(&self, other: &NumericValue) -> NumericValue {
        use NumericValue::*;
        match (self, other) {
            (Complex(..), _) | (_, Complex(..)) => complex::mul(self, other),
            (Rational(a), Rational(b)) => Rational(a * b),
            (Decimal(_), _) | (_, Decimal(_)) => {
                match (as_decimal(self), as_decimal(other)) {
                    (Some(a), Some(b)) => match a.checked_mul(b) {
                        Some(d) => Decimal(d),
                        None => Real(self.to_f64() * other.to_f64()),
                    },
                    _ => Real(self.to_f64() * other.to_f64()),
                }
            }
            _ => Real(self.to_f64() * other.to_f64()),
        }
    }

    pub fn div(&self, other: &NumericValue) -> NumericValue {
        use NumericValue::*;
        match (self, other) {
            (Complex(..), _) | (_, Complex(..)) => complex::div(self, other),
            (Rational(a), Rational(b)) => {
                if b.is_zero() {
                    // 0/0 is indeterminate, n/0 is a signed infinity.
                    return match a.numer().sign() {
                        num_bigint::Sign::NoSign => NumericValue::nan(),
                        num_bigint::Sign::Plus => NumericValue::pos_infinity(),
                        num_bigint::Sign::Minus => NumericValue::neg_infinity(),
                    };
                }
                Rational(a / b)
            }
            (Decimal(_), _) | (_, Decimal(_)) => {
                match (as_decimal(self), as_decimal(other)) {
                    (Some(a), Some(b)) => match a.checked_div(b) {
                        Some(d) => Decimal(d),
                        None => Real(self.to_f64() / other.to_f64()),
                    },
                    _ => Real(self.to_f64() / other.to_f64()),
                }
            }
            _ => Real(self.to_f64() / other.to_f64()),
        }
    }

    pub fn abs(&self) -> NumericValue {
        use NumericValue::*;
        match self {
            Real(v) => Real(v.abs()),
            Decimal(d) => Decimal(d.abs()),
            Rational(r) => Rational(r.abs()),
            Complex(..) => {
                // Modulus: sqrt(re² + im²).
                let re = self.re();
                let im = self.im();
                re.mul(&re).add(&im.mul(&im)).sqrt()
            }
        }
    }

    pub fn floor(&self) -> NumericValue {
        use NumericValue::*;
        match self {
            Real(v) => Real(v.floor()),
            Decimal(d) => Decimal(d.floor()),
            Rational(r) => Rational(r.floor()),
            Complex(..) => NumericValue::nan(),
        }
    }

    pub fn ceil(&self) -> NumericValue {
        use NumericValue::*;
        match self {
            Real(v) => Real(v.ceil()),
            Decimal(d) => Decimal(d.ceil()),
            Rational(r) => Rational(r.ceil()),
            Complex(..) => NumericValue::nan(),
        }
    }

    /// `self^exponent`. Exact whenever the base is rational and the power
    /// is exactly representable (integer exponents; rational exponents on
    /// perfect powers). Negative bases with fractional exponents go
    /// complex.
    pub fn pow(&self, exponent: &NumericValue) -> NumericValue {
        use NumericValue::*;

        if matches!(self, Complex(..)) || matches!(exponent, Complex(..)) {
            return complex::pow(self, exponent);
        }

        // 0^0 is indeterminate.
        if self.is_zero() && exponent.is_zero() {
            return NumericValue::nan();
        }

        // Integer exponent on an exact base stays exact.
        if let (Rational(base), Some(e)) = (self, exponent.try_to_i64()) {
            if e.unsigned_abs() <= u32::MAX as u64 {
                if base.is_zero() && e < 0 {
                    return NumericValue::pos_infinity();
                }
                let powed = num_traits::Pow::pow(base, e.unsigned_abs() as u32);
                return if e < 0 {
                    Rational(powed.recip())
                } else {
                    Rational(powed)
                };
            }
        }

        // Rational exponent on an exact base: extract perfect powers.
        if let (Rational(base), Rational(exp)) = (self, exponent) {
            if let Some(exact) = rational_pow_exact(base, exp) {
                return Rational(exact);
            }
            // Negative base with an even-denominator exponent leaves the
            // reals.
            if base.is_negative() && !exp.is_integer() {
                return complex::pow(self, exponent);
            }
        }

        if let (Decimal(_), true) = (self, exponent.is_real()) {
            if let (Some(a), Some(b)) = (as_decimal(self), as_decimal(exponent)) {
                if let Some(d) = a.checked_powd(b) {
                    return Decimal(d);
                }
            }
        }

        let b = self.to_f64();
        let e = exponent.to_f64();
        if b < 0.0 && e.fract() != 0.0 {
            return complex::pow(self, exponent);
        }
        Real(b.powf(e))
    }

    /// Square root. Exact for perfect rational squares, complex for
    /// negative reals.
    pub fn sqrt(&self) -> NumericValue {
        use NumericValue::*;
        match self {
            Complex(..) => complex::complex_sqrt(self),
            Rational(r) if !r.is_negative() => {
                if let (Some(n), Some(d)) =
                    (nth_root_exact(r.numer(), 2), nth_root_exact(r.denom(), 2))
                {
                    return Rational(BigRational::new(n, d));
                }
                Real(self.to_f64().sqrt())
            }
            Decimal(d) if !d.is_sign_negative() => match d.sqrt() {
                Some(s) => Decimal(s),
                None => Real(self.to_f64().sqrt()),
            },
            _ => {
                let v = self.to_f64();
                if v < 0.0 {
                    complex::complex_sqrt(self)
                } else {
                    Real(v.sqrt())
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Comparisons
    // ------------------------------------------------------------------

    /// Mathematical equality across representations: `1/2 == 0.5`.
    pub fn eq_num(&self, other: &NumericValue) -> bool {
        use NumericValue::*;
        match (self, other) {
            (Complex(..), _) | (_, Complex(..)) => {
                self.re().eq_num(&other.re()) && self.im().eq_num(&other.im())
            }
            (Rational(a), Rational(b)) => a == b,
            (Decimal(a), Decimal(b)) => a == b,
            (Rational(_), Decimal(_)) | (Decimal(_), Rational(_)) => {
                match (self.try_to_rational(), other.try_to_rational()) {
                    (Some(a), Some(b)) => a == b,
                    _ => self.to_f64() == other.to_f64(),
                }
            }
            _ => self.to_f64() == other.to_f64(),
        }
    }

    /// Strict order on real values; `None` for NaN or complex operands.
    pub fn lt(&self, other: &NumericValue) -> Option<bool> {
        use NumericValue::*;
        if self.is_nan() || other.is_nan() || !self.is_real() || !other.is_real() {
            return None;
        }
        match (self, other) {
            (Rational(a), Rational(b)) => Some(a < b),
            (Decimal(a), Decimal(b)) => Some(a < b),
            _ => Some(self.to_f64() < other.to_f64()),
        }
    }

    pub fn le(&self, other: &NumericValue) -> Option<bool> {
        if self.eq_num(other) {
            return Some(true);
        }
        self.lt(other)
    }

    pub fn gt(&self, other: &NumericValue) -> Option<bool> {
        other.lt(self)
    }

    pub fn ge(&self, other: &NumericValue) -> Option<bool> {
        other.le(self)
    }

    /// Treats `|self| ≤ eps` as zero. For complex values both components
    /// must vanish.
    pub fn is_zero_with_tolerance(&self, eps: f64) -> bool {
        match self {
            NumericValue::Complex(re, im) => {
                re.is_zero_with_tolerance(eps) && im.is_zero_with_tolerance(eps)
            }
            _ => {
                let v = self.to_f64();
                v.is_finite() && v.abs() <= eps
            }
        }
    }

    /// Sign after applying a tolerance band around zero.
    pub fn sign_with_tolerance(&self, eps: f64) -> Option<Sign> {
        if self.is_zero_with_tolerance(eps) {
            return Some(Sign::Zero);
        }
        self.sign()
    }
}

fn as_decimal(v: &NumericValue) -> Option<Decimal> {
    match v {
        NumericValue::Decimal(d) => Some(*d),
        NumericValue::Rational(r) => decimal_from_rational(r),
        NumericValue::Real(f) => Decimal::try_from(*f).ok(),
        NumericValue::Complex(..) => None,
    }
}
