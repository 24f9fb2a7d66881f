//! The Power family: exponent laws, square roots, n-th roots.
//!
//! Sign-safety is the whole game here: `(x^n)^m = x^{nm}` and
//! `sqrt(x²) = x` are wrong on the negative reals, so every collapsing
//! rule either checks the base's sign or routes through `Abs`.

use super::{
    abs_pow, abs_of, div_of, known_infinite, known_nonnegative, known_positive, mul_of, negate,
    pow_of, sqrt_of, RuleStep,
};
use crate::engine::ComputeEngine;
use crate::expr::Expr;
use calx_numeric::{nth_root_exact, NumericValue};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

pub fn simplify_power(engine: &ComputeEngine, expr: &Expr) -> Option<RuleStep> {
    let base = expr.arg(0)?;
    let exp = expr.arg(1)?;

    if let Some(e) = exp.numeric() {
        if e.is_zero() {
            if base.numeric().is_some_and(NumericValue::is_zero) {
                return Some(RuleStep::new(
                    Expr::number(NumericValue::nan()),
                    "0^0 is indeterminate",
                ));
            }
            if known_infinite(engine, base) {
                return None; // the infinity family classifies ∞^0
            }
            return Some(RuleStep::new(Expr::int(1), "x^0 = 1"));
        }
        if e.is_one() {
            return Some(RuleStep::new(base.clone(), "x^1 = x"));
        }
    }

    if base.numeric().is_some_and(NumericValue::is_one) {
        if known_infinite(engine, exp) {
            return None; // 1^∞ is the infinity family's case
        }
        return Some(RuleStep::new(Expr::int(1), "1^x = 1"));
    }

    if base.numeric().is_some_and(NumericValue::is_zero) && known_positive(engine, exp) {
        return Some(RuleStep::new(Expr::int(0), "0^x = 0 for positive x"));
    }

    // (x^n)^m → x^{n·m}, only when sign-safe.
    if base.is_function_of("Power") && base.nargs() == 2 {
        let (x, n) = (base.arg(0)?, base.arg(1)?);
        let outer_integer = exp.numeric().is_some_and(NumericValue::is_integer);
        let inner_odd_integer = n.numeric().and_then(NumericValue::is_odd) == Some(true);
        if known_nonnegative(engine, x) || outer_integer || inner_odd_integer {
            let combined = match (n.numeric(), exp.numeric()) {
                (Some(a), Some(b)) => Expr::number(a.mul(b)),
                _ => mul_of(vec![n.clone(), exp.clone()]),
            };
            return Some(RuleStep::new(
                engine.box_expr(pow_of(x.clone(), combined)),
                "(x^n)^m = x^(n·m)",
            ));
        }
    }

    // Parity of a negated base.
    if base.is_function_of("Negate") && base.nargs() == 1 {
        let u = base.arg(0)?;
        if let Some(e) = exp.numeric() {
            if let Some(r) = e.try_to_rational() {
                let p_even = (r.numer() % BigInt::from(2)).is_zero();
                let q_even = (r.denom() % BigInt::from(2)).is_zero();
                let rewritten = if p_even || q_even {
                    // Even exponent or even root kills the sign.
                    pow_of(u.clone(), exp.clone())
                } else {
                    negate(pow_of(u.clone(), exp.clone()))
                };
                return Some(RuleStep::new(
                    engine.box_expr(rewritten),
                    "(-x)^n parity",
                ));
            }
        }
    }

    // (a/b)^{-n} → (b/a)^n.
    if base.is_function_of("Divide") && base.nargs() == 2 {
        if let Some(e) = exp.numeric() {
            if e.is_negative() {
                let flipped = div_of(base.arg(1)?.clone(), base.arg(0)?.clone());
                return Some(RuleStep::new(
                    engine.box_expr(pow_of(flipped, Expr::number(e.neg()))),
                    "(a/b)^(-n) = (b/a)^n",
                ));
            }
        }
    }

    None
}

pub fn simplify_sqrt(engine: &ComputeEngine, expr: &Expr) -> Option<RuleStep> {
    let u = expr.arg(0)?;

    // Exact perfect squares fold.
    if let Some(v) = u.numeric() {
        if v.is_exact() && !v.is_negative() {
            let root = v.sqrt();
            if root.is_exact() {
                return Some(RuleStep::new(Expr::number(root), "perfect square"));
            }
        }
        return None;
    }

    // sqrt(x^n).
    if u.is_function_of("Power") && u.nargs() == 2 {
        let (x, n) = (u.arg(0)?, u.arg(1)?);
        if let Some(n) = n.numeric().and_then(|v| v.try_to_i64()) {
            if n == 2 {
                return Some(RuleStep::new(
                    engine.box_expr(abs_of(x.clone())),
                    "sqrt(x²) = |x|",
                ));
            }
            if n > 2 && n % 2 == 0 {
                return Some(RuleStep::new(
                    engine.box_expr(abs_pow(x.clone(), n / 2)),
                    "sqrt(x^(2k)) = |x|^k",
                ));
            }
            if n > 2 {
                let out = mul_of(vec![abs_pow(x.clone(), n / 2), sqrt_of(x.clone())]);
                return Some(RuleStep::new(
                    engine.box_expr(out),
                    "sqrt(x^(2k+1)) = |x|^k·sqrt(x)",
                ));
            }
        }
    }

    // sqrt of a product: factor out perfect squares.
    if u.is_function_of("Multiply") {
        if let Some(step) = factor_squares_out(engine, u) {
            return Some(step);
        }
    }

    // sqrt of a sum: perfect-square trinomials and differences of
    // squares.
    if u.is_function_of("Add") {
        if let Some(step) = sqrt_of_sum(engine, u) {
            return Some(step);
        }
    }

    None
}

/// `sqrt(a·b·…)`: every square factor moves outside as an absolute
/// value; odd powers split into an even part outside and one factor
/// left under the root.
fn factor_squares_out(engine: &ComputeEngine, product: &Expr) -> Option<RuleStep> {
    let mut outside: Vec<Expr> = Vec::new();
    let mut inside: Vec<Expr> = Vec::new();

    for factor in product.args() {
        if factor.is_function_of("Power") && factor.nargs() == 2 {
            if let (Some(x), Some(n)) = (
                factor.arg(0),
                factor
                    .arg(1)
                    .and_then(Expr::numeric)
                    .and_then(NumericValue::try_to_i64),
            ) {
                if n >= 2 {
                    outside.push(abs_pow(x.clone(), n / 2));
                    if n % 2 == 1 {
                        inside.push(x.clone());
                    }
                    continue;
                }
            }
        }
        if let Some(v) = factor.numeric() {
            if let Some(n) = v.try_to_bigint() {
                if !n.is_negative() {
                    let (square_part, free_part) = square_free_split(&n);
                    if !square_part.is_one() {
                        outside.push(Expr::number(NumericValue::from_bigint(square_part)));
                        if !free_part.is_one() {
                            inside.push(Expr::number(NumericValue::from_bigint(free_part)));
                        }
                        continue;
                    }
                }
            }
        }
        inside.push(factor.clone());
    }

    if outside.is_empty() {
        return None;
    }
    if !inside.is_empty() {
        let radicand = if inside.len() == 1 {
            inside.pop().unwrap()
        } else {
            mul_of(inside)
        };
        outside.push(sqrt_of(radicand));
    }
    let out = if outside.len() == 1 {
        outside.pop().unwrap()
    } else {
        mul_of(outside)
    };
    Some(RuleStep::new(
        engine.box_expr(out),
        "factor perfect squares out of sqrt",
    ))
}

/// `n = s²·r` with `r` square-free over the primes below 1000.
fn square_free_split(n: &BigInt) -> (BigInt, BigInt) {
    // A perfect square extracts whole regardless of magnitude.
    if let Some(root) = nth_root_exact(n, 2) {
        return (root, BigInt::one());
    }
    let Some(mut rest) = n.to_u64() else {
        return (BigInt::one(), n.clone());
    };
    let mut square = 1u64;
    let mut p = 2u64;
    while p * p <= rest && p < 1000 {
        while rest % (p * p) == 0 {
            rest /= p * p;
            square *= p;
        }
        p += 1;
    }
    (BigInt::from(square), BigInt::from(rest))
}

/// Trinomial squares `a² ± 2ab + b² → |a ± b|` and the rewrite of
/// `a² - b²` into its factored form for further descent.
fn sqrt_of_sum(engine: &ComputeEngine, sum: &Expr) -> Option<RuleStep> {
    let terms = sum.args();

    let as_square = |t: &Expr| -> Option<Expr> {
        if t.is_function_of("Power")
            && t.nargs() == 2
            && t.arg(1)?.numeric()?.try_to_i64() == Some(2)
        {
            t.arg(0).cloned()
        } else {
            None
        }
    };
    // A term of the form ±2·a·b, after peeling a Negate.
    let as_cross = |t: &Expr| -> Option<(bool, Vec<Expr>)> {
        let (negative, t) = if t.is_function_of("Negate") && t.nargs() == 1 {
            (true, t.arg(0)?.clone())
        } else {
            (false, t.clone())
        };
        if !t.is_function_of("Multiply") {
            return None;
        }
        let mut coefficient_two = false;
        let mut rest: Vec<Expr> = Vec::new();
        let mut negative = negative;
        for f in t.args() {
            match f.numeric().and_then(NumericValue::try_to_i64) {
                Some(2) => coefficient_two = true,
                Some(-2) => {
                    coefficient_two = true;
                    negative = !negative;
                }
                _ => rest.push(f.clone()),
            }
        }
        (coefficient_two && rest.len() == 2).then_some((negative, rest))
    };

    if terms.len() == 3 {
        for cross_index in 0..3 {
            let others: Vec<&Expr> = terms
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != cross_index)
                .map(|(_, t)| t)
                .collect();
            let (Some(a), Some(b)) = (as_square(others[0]), as_square(others[1])) else {
                continue;
            };
            let Some((negative, factors)) = as_cross(&terms[cross_index]) else {
                continue;
            };
            let matches = (factors[0].is_same(&a) && factors[1].is_same(&b))
                || (factors[0].is_same(&b) && factors[1].is_same(&a));
            if !matches {
                continue;
            }
            let inner = if negative {
                Expr::function("Add", vec![a, negate(b)])
            } else {
                Expr::function("Add", vec![a, b])
            };
            return Some(RuleStep::new(
                engine.box_expr(abs_of(inner)),
                "sqrt(a² ± 2ab + b²) = |a ± b|",
            ));
        }
    }

    if terms.len() == 2 {
        // a² - b²: factor inside the root so descent can continue.
        let (pos, neg): (Vec<&Expr>, Vec<&Expr>) =
            terms.iter().partition(|t| !t.is_function_of("Negate"));
        if let ([p], [n]) = (&pos[..], &neg[..]) {
            if let (Some(a), Some(b)) = (as_square(p), n.arg(0).and_then(as_square)) {
                let factored = mul_of(vec![
                    Expr::function("Add", vec![a.clone(), negate(b.clone())]),
                    Expr::function("Add", vec![a, b]),
                ]);
                return Some(RuleStep::new(
                    engine.box_expr(sqrt_of(factored)),
                    "a² - b² factors under sqrt",
                ));
            }
        }
    }

    None
}

pub fn simplify_root(engine: &ComputeEngine, expr: &Expr) -> Option<RuleStep> {
    let x = expr.arg(0)?;
    let n = expr.arg(1)?.numeric()?.try_to_i64()?;
    if n < 2 {
        return None;
    }

    if n == 2 {
        return Some(RuleStep::new(
            engine.box_expr(sqrt_of(x.clone())),
            "root(x, 2) = sqrt(x)",
        ));
    }

    if x.is_function_of("Power") && x.nargs() == 2 {
        let (b, m) = (x.arg(0)?, x.arg(1)?);
        if let Some(m) = m.numeric().and_then(|v| v.try_to_i64()) {
            if m == n {
                let out = if n % 2 == 0 && !known_nonnegative(engine, b) {
                    abs_of(b.clone())
                } else {
                    b.clone()
                };
                return Some(RuleStep::new(engine.box_expr(out), "root(x^n, n)"));
            }
            if m % n == 0 {
                let k = m / n;
                let out = if n % 2 == 0 && !known_nonnegative(engine, b) {
                    abs_pow(b.clone(), k)
                } else {
                    pow_of(b.clone(), Expr::int(k))
                };
                return Some(RuleStep::new(
                    engine.box_expr(out),
                    "root(x^m, n) = x^(m/n)",
                ));
            }
            let g = m.gcd(&n);
            if g > 1 {
                // An even index makes the unreduced value nonnegative;
                // an odd reduced exponent would reintroduce the base's
                // sign, so it goes under an absolute value.
                let base = if n % 2 == 0 && (m / g) % 2 == 1 && !known_nonnegative(engine, b) {
                    abs_of(b.clone())
                } else {
                    b.clone()
                };
                let reduced = Expr::function(
                    "Root",
                    vec![pow_of(base, Expr::int(m / g)), Expr::int(n / g)],
                );
                return Some(RuleStep::new(
                    engine.box_expr(reduced),
                    "reduce root index",
                ));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> ComputeEngine {
        ComputeEngine::new()
    }

    fn simplified(input: serde_json::Value) -> (ComputeEngine, Expr) {
        let e = engine();
        let out = e.simplify(&e.box_json(&input));
        (e, out)
    }

    #[test]
    fn test_power_of_zero_exponent() {
        let (_, out) = simplified(json!(["Power", "x", 0]));
        assert_eq!(out.as_i64(), Some(1));
        let (_, out) = simplified(json!(["Power", 0, 0]));
        assert!(out.numeric().unwrap().is_nan());
    }

    #[test]
    fn test_power_one() {
        let (_, out) = simplified(json!(["Power", "x", 1]));
        assert!(out.is_symbol("x"));
        let (_, out) = simplified(json!(["Power", 1, "x"]));
        assert_eq!(out.as_i64(), Some(1));
    }

    #[test]
    fn test_sqrt_of_square_is_abs() {
        let (_, out) = simplified(json!(["Sqrt", ["Power", "x", 2]]));
        assert!(out.is_function_of("Abs"));
        assert!(out.arg(0).unwrap().is_symbol("x"));
    }

    #[test]
    fn test_sqrt_of_even_odd_powers() {
        // sqrt(x⁴) = x² (|x|² relaxes to x²).
        let (_, out) = simplified(json!(["Sqrt", ["Power", "x", 4]]));
        assert!(out.is_function_of("Power"));
        assert!(out.arg(0).unwrap().is_symbol("x"), "got {out}");

        let (_, out) = simplified(json!(["Sqrt", ["Power", "x", 5]]));
        assert!(out.is_function_of("Multiply"), "got {out}");
    }

    #[test]
    fn test_negated_base_parity() {
        let (_, out) = simplified(json!(["Power", ["Negate", "x"], 4]));
        assert!(out.is_function_of("Power"));
        assert!(out.arg(0).unwrap().is_symbol("x"));

        let (_, out) = simplified(json!(["Power", ["Negate", "x"], 3]));
        assert!(out.is_function_of("Negate"), "got {out}");
    }

    #[test]
    fn test_nested_power_sign_safety() {
        // (x²)³ collapses: outer exponent is an integer.
        let (_, out) = simplified(json!(["Power", ["Power", "x", 2], 3]));
        assert!(out.is_function_of("Power"));
        assert_eq!(out.arg(1).unwrap().as_i64(), Some(6));

        // (x²)^(1/2) must NOT collapse to x for unknown x.
        let (_, out) = simplified(json!(["Power", ["Power", "x", 2], ["Rational", 1, 2]]));
        assert!(!out.is_symbol("x"));
    }

    #[test]
    fn test_nested_power_with_known_sign() {
        let e = engine();
        e.assume(&Expr::function(
            "Greater",
            vec![Expr::symbol("p"), Expr::int(0)],
        ))
        .unwrap();
        let out = e.simplify(&e.box_json(&json!([
            "Power", ["Power", "p", 2], ["Rational", 1, 2]
        ])));
        assert!(out.is_symbol("p"), "got {out}");
    }

    #[test]
    fn test_reciprocal_power_of_quotient() {
        let (_, out) = simplified(json!(["Power", ["Divide", "a", "b"], -2]));
        assert!(out.is_function_of("Power"));
        assert_eq!(out.arg(1).unwrap().as_i64(), Some(2));
        let base = out.arg(0).unwrap();
        assert!(base.is_function_of("Divide"));
        assert!(base.arg(0).unwrap().is_symbol("b"));
    }

    #[test]
    fn test_factor_squares_from_product() {
        // sqrt(4x²y) = 2x·sqrt(y) up to the |x| refinement.
        let (_, out) = simplified(json!([
            "Sqrt",
            ["Multiply", 4, ["Power", "x", 2], "y"]
        ]));
        let rendered = format!("{out}");
        assert!(
            rendered.contains("Abs(x)") && rendered.contains("Sqrt(y)") && rendered.contains('2'),
            "got {rendered}"
        );
    }

    #[test]
    fn test_square_free_split() {
        let (s, r) = square_free_split(&BigInt::from(8));
        assert_eq!((s, r), (BigInt::from(2), BigInt::from(2)));
        let (s, r) = square_free_split(&BigInt::from(36));
        assert_eq!((s, r), (BigInt::from(6), BigInt::one()));
        let (s, r) = square_free_split(&BigInt::from(7));
        assert_eq!((s, r), (BigInt::one(), BigInt::from(7)));
    }

    #[test]
    fn test_perfect_square_trinomial() {
        let (_, out) = simplified(json!([
            "Sqrt",
            ["Add", ["Power", "a", 2], ["Multiply", 2, "a", "b"], ["Power", "b", 2]]
        ]));
        assert!(out.is_function_of("Abs"), "got {out}");
    }

    #[test]
    fn test_root_rules() {
        let (_, out) = simplified(json!(["Root", ["Power", "x", 3], 3]));
        assert!(out.is_symbol("x"));

        let (_, out) = simplified(json!(["Root", ["Power", "x", 4], 2]));
        assert!(out.is_function_of("Power"));
        assert!(out.arg(0).unwrap().is_symbol("x"), "got {out}");

        // Index reduction must stay sign-safe: whatever shape comes out
        // of root(x^6, 4), at x = -2 its value is root(64, 4), not the
        // sqrt of a negative.
        let (e, out) = simplified(json!(["Root", ["Power", "x", 6], 4]));
        e.assign("x", Expr::int(-2)).unwrap();
        let v = e.n(&out).numeric().cloned().expect("numeric value");
        assert!(v.is_real(), "got {v}");
        assert!((v.to_f64() - 64f64.powf(0.25)).abs() < 1e-12, "got {v}");
    }
}
