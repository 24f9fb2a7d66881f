//! Complex arithmetic.
//!
//! Addition and multiplication are carried out componentwise over
//! [`NumericValue`] parts, so exact complex values (Gaussian rationals)
//! stay exact. Transcendental operations go through the machine complex
//! backend.

use crate::value::NumericValue;
use num_complex::Complex64;

fn to_complex64(v: &NumericValue) -> Complex64 {
    Complex64::new(v.re().to_f64(), v.im().to_f64())
}

fn from_complex64(c: Complex64) -> NumericValue {
    NumericValue::complex(NumericValue::machine(c.re), NumericValue::machine(c.im))
}

pub(crate) fn add(a: &NumericValue, b: &NumericValue) -> NumericValue {
    NumericValue::complex(a.re().add(&b.re()), a.im().add(&b.im()))
}

pub(crate) fn mul(a: &NumericValue, b: &NumericValue) -> NumericValue {
    let (ar, ai) = (a.re(), a.im());
    let (br, bi) = (b.re(), b.im());
    NumericValue::complex(
        ar.mul(&br).sub(&ai.mul(&bi)),
        ar.mul(&bi).add(&ai.mul(&br)),
    )
}

pub(crate) fn div(a: &NumericValue, b: &NumericValue) -> NumericValue {
    let (br, bi) = (b.re(), b.im());
    // Multiply by the conjugate; denominator is |b|².
    let denom = br.mul(&br).add(&bi.mul(&bi));
    if denom.is_zero() {
        return NumericValue::nan();
    }
    let conj = NumericValue::complex(br, bi.neg());
    let num = mul(a, &conj);
    NumericValue::complex(num.re().div(&denom), num.im().div(&denom))
}

pub(crate) fn pow(base: &NumericValue, exponent: &NumericValue) -> NumericValue {
    // Integer exponents on exact complex bases by repeated squaring.
    if let Some(e) = exponent.try_to_i64() {
        if base.is_exact() && e.unsigned_abs() <= 64 {
            let mut acc = NumericValue::one();
            for _ in 0..e.unsigned_abs() {
                acc = mul(&acc, base);
            }
            if e < 0 {
                return div(&NumericValue::one(), &acc);
            }
            return acc;
        }
    }
    from_complex64(to_complex64(base).powc(to_complex64(exponent)))
}

/// Principal square root, staying exact for negative perfect rational
/// squares (`sqrt(-4) == 2i`).
pub fn complex_sqrt(v: &NumericValue) -> NumericValue {
    if v.is_real() && v.is_negative() {
        let pos_root = v.neg().sqrt();
        if !pos_root.is_nan() {
            return NumericValue::complex(NumericValue::zero(), pos_root);
        }
    }
    from_complex64(to_complex64(v).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_gaussian_power() {
        // (1+i)^4 = -4
        let one_plus_i =
            NumericValue::complex(NumericValue::from_i64(1), NumericValue::from_i64(1));
        let p = pow(&one_plus_i, &NumericValue::from_i64(4));
        assert!(p.is_real());
        assert!(p.eq_num(&NumericValue::from_i64(-4)));
    }

    #[test]
    fn test_sqrt_minus_four() {
        let s = complex_sqrt(&NumericValue::from_i64(-4));
        assert!(s.re().is_zero());
        assert!(s.im().eq_num(&NumericValue::from_i64(2)));
    }

    #[test]
    fn test_division() {
        // (2 + 2i) / (1 + i) = 2
        let n = NumericValue::complex(NumericValue::from_i64(2), NumericValue::from_i64(2));
        let d = NumericValue::complex(NumericValue::from_i64(1), NumericValue::from_i64(1));
        let q = div(&n, &d);
        assert!(q.eq_num(&NumericValue::from_i64(2)));
    }
}
