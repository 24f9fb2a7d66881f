#![forbid(unsafe_code)]

//! Unified numeric value for the Calx symbolic engine.
//!
//! A [`NumericValue`] is one of four representations:
//!
//! - `Real`: a machine `f64` (also carries infinities and NaN)
//! - `Decimal`: a high-precision decimal (28 significant digits)
//! - `Rational`: an exact big-integer rational, always reduced
//! - `Complex`: a real/imaginary pair of non-complex values
//!
//! Binary operations promote along an explicit table (machine → rational →
//! decimal → complex) and preserve exactness whenever both operands are
//! exact: `Rational op Rational` never leaves the rationals unless the
//! operation itself does (e.g. an irrational root).

mod arith;
mod complex;
mod decimal;
mod error;
mod rational;
mod value;

pub use complex::complex_sqrt;
pub use decimal::{decimal_from_rational, decimal_to_f64, f64_to_decimal, tolerance_for_precision};
pub use error::{Error, Result};
pub use rational::{
    big_binomial, big_double_factorial, big_factorial, big_gcd, big_lcm, nth_root_exact,
    rational_pow_exact,
};
pub use value::{NumericValue, Sign};

/// Largest integer `n` for which `n!` fits in an `f64` without overflow.
pub const MAX_MACHINE_FACTORIAL: u64 = 170;
