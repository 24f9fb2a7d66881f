use calx_numeric::{
    big_factorial, nth_root_exact, tolerance_for_precision, NumericValue, Sign,
};
use num_bigint::BigInt;

#[test]
fn promotion_keeps_exactness() {
    let a = NumericValue::from_ratio(2, 3);
    let b = NumericValue::from_ratio(5, 6);
    let sum = a.add(&b);
    assert!(sum.is_exact());
    assert!(sum.eq_num(&NumericValue::from_ratio(3, 2)));
}

#[test]
fn machine_contaminates() {
    let a = NumericValue::from_ratio(2, 3);
    let b = NumericValue::machine(1.5);
    assert!(!a.mul(&b).is_exact());
}

#[test]
fn complex_contaminates() {
    let a = NumericValue::from_i64(2);
    let b = NumericValue::imaginary_unit();
    let p = a.mul(&b);
    assert!(!p.is_real());
    assert!(p.im().eq_num(&NumericValue::from_i64(2)));
}

#[test]
fn representation_vs_mathematical_equality() {
    let half_exact = NumericValue::from_ratio(1, 2);
    let half_float = NumericValue::machine(0.5);
    assert_ne!(half_exact, half_float);
    assert!(half_exact.eq_num(&half_float));
}

#[test]
fn indeterminate_forms_are_nan() {
    let zero = NumericValue::from_i64(0);
    let inf = NumericValue::pos_infinity();
    assert!(zero.pow(&zero).is_nan());
    assert!(zero.mul(&inf).is_nan());
    assert!(inf.div(&inf).is_nan());
}

#[test]
fn gamma_range_factorial() {
    // 170! is the largest factorial representable as f64, but the exact
    // path must go far beyond.
    let f = big_factorial(170);
    assert_eq!(f.to_string().len(), 307);
    let v = NumericValue::from_bigint(big_factorial(200));
    assert!(v.is_exact());
    assert!(v.is_finite());
}

#[test]
fn exact_roots() {
    assert_eq!(
        nth_root_exact(&BigInt::from(1024), 10),
        Some(BigInt::from(2))
    );
    let v = NumericValue::from_i64(16).pow(&NumericValue::from_ratio(3, 4));
    assert!(v.eq_num(&NumericValue::from_i64(8)));
}

#[test]
fn sign_with_tolerance_band() {
    let eps = tolerance_for_precision(10);
    let tiny = NumericValue::machine(1e-12);
    assert_eq!(tiny.sign_with_tolerance(eps), Some(Sign::Zero));
    assert_eq!(tiny.sign(), Some(Sign::Positive));
}
