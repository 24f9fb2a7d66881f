//! The Abs family.
//!
//! Absolute values dissolve wherever a sign is known, distribute over
//! products and quotients, commute with odd functions, and cancel
//! against even exponents.

use super::{
    abs_of, div_of, known_nonnegative, known_nonpositive, known_positive, known_negative,
    mul_of, negate, pow_of, RuleStep,
};
use crate::engine::ComputeEngine;
use crate::expr::Expr;
use crate::trig::is_odd_function;
use calx_numeric::NumericValue;
use num_bigint::BigInt;
use num_traits::Zero;

pub fn simplify_abs(engine: &ComputeEngine, expr: &Expr) -> Option<RuleStep> {
    let u = expr.arg(0)?;

    // Known sign dissolves the absolute value.
    if known_nonnegative(engine, u) {
        return Some(RuleStep::new(u.clone(), "|x| = x for x ≥ 0"));
    }
    if known_nonpositive(engine, u) {
        return Some(RuleStep::new(
            engine.box_expr(negate(u.clone())),
            "|x| = -x for x ≤ 0",
        ));
    }

    // |-x| = |x|.
    if u.is_function_of("Negate") && u.nargs() == 1 {
        return Some(RuleStep::new(
            engine.box_expr(abs_of(u.arg(0)?.clone())),
            "|-x| = |x|",
        ));
    }

    // Binary products: peel a sign-known factor, else distribute.
    if u.is_function_of("Multiply") && u.nargs() == 2 {
        let (x, y) = (u.arg(0)?, u.arg(1)?);
        for (known, other) in [(x, y), (y, x)] {
            if known_positive(engine, known) {
                let out = mul_of(vec![known.clone(), abs_of(other.clone())]);
                return Some(RuleStep::new(
                    engine.box_expr(out),
                    "|x·y| = x·|y| for x > 0",
                ));
            }
            if known_negative(engine, known) {
                let out = mul_of(vec![negate(known.clone()), abs_of(other.clone())]);
                return Some(RuleStep::new(
                    engine.box_expr(out),
                    "|x·y| = -x·|y| for x < 0",
                ));
            }
        }
        let out = mul_of(vec![abs_of(x.clone()), abs_of(y.clone())]);
        return Some(RuleStep::new(engine.box_expr(out), "|x·y| = |x|·|y|"));
    }

    // Quotients, by the signs of numerator and denominator.
    if u.is_function_of("Divide") && u.nargs() == 2 {
        let (n, d) = (u.arg(0)?, u.arg(1)?);
        let n_known = known_nonnegative(engine, n);
        let d_known = known_positive(engine, d);
        let out = match (n_known, d_known) {
            (true, true) => return None, // whole quotient is nonnegative, handled above
            (true, false) => div_of(n.clone(), abs_of(d.clone())),
            (false, true) => div_of(abs_of(n.clone()), d.clone()),
            (false, false) => div_of(abs_of(n.clone()), abs_of(d.clone())),
        };
        return Some(RuleStep::new(engine.box_expr(out), "|x/y| distributes"));
    }

    // Powers: parity of the exponent decides.
    if u.is_function_of("Power") && u.nargs() == 2 {
        let (x, n) = (u.arg(0)?, u.arg(1)?);
        if let Some(v) = n.numeric() {
            if let Some(r) = v.try_to_rational() {
                let p_even = (r.numer() % BigInt::from(2)).is_zero();
                let out = if p_even {
                    // Even numerator: x^n is already nonnegative.
                    pow_of(x.clone(), n.clone())
                } else {
                    pow_of(abs_of(x.clone()), n.clone())
                };
                return Some(RuleStep::new(
                    engine.box_expr(out),
                    "|x^n| by exponent parity",
                ));
            }
            // Irrational exponents keep the base under the bar.
            if v.is_real() {
                return Some(RuleStep::new(
                    engine.box_expr(pow_of(abs_of(x.clone()), n.clone())),
                    "|x^n| = |x|^n",
                ));
            }
        }
    }

    // |f(x)| = f(|x|) for odd f.
    if let Some(op) = u.operator() {
        if is_odd_function(op) && u.nargs() == 1 {
            let out = Expr::function(op, vec![abs_of(u.arg(0)?.clone())]);
            return Some(RuleStep::new(
                engine.box_expr(out),
                "|f(x)| = f(|x|) for odd f",
            ));
        }
    }

    None
}

/// Under `Power`: `|x|^n → x^n` for even `n`, and `|x|^{p/q} → x^{p/q}`
/// for even `p`.
pub fn simplify_abs_base_power(engine: &ComputeEngine, expr: &Expr) -> Option<RuleStep> {
    let base = expr.arg(0)?;
    let exp = expr.arg(1)?;
    if !base.is_function_of("Abs") || base.nargs() != 1 {
        return None;
    }
    let r = exp.numeric()?.try_to_rational()?;
    if !(r.numer() % BigInt::from(2)).is_zero() {
        return None;
    }
    let out = pow_of(base.arg(0)?.clone(), exp.clone());
    Some(RuleStep::new(
        engine.box_expr(out),
        "|x|^n = x^n for even n",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> ComputeEngine {
        ComputeEngine::new()
    }

    fn simplified(input: serde_json::Value) -> Expr {
        let e = engine();
        e.simplify(&e.box_json(&input))
    }

    #[test]
    fn test_abs_of_known_sign() {
        let e = engine();
        e.assume(&Expr::function(
            "Greater",
            vec![Expr::symbol("p"), Expr::int(0)],
        ))
        .unwrap();
        let out = e.simplify(&e.box_json(&json!(["Abs", "p"])));
        assert!(out.is_symbol("p"));

        e.assume(&Expr::function(
            "Less",
            vec![Expr::symbol("m"), Expr::int(0)],
        ))
        .unwrap();
        let out = e.simplify(&e.box_json(&json!(["Abs", "m"])));
        assert!(out.is_function_of("Negate"));
    }

    #[test]
    fn test_abs_of_negation() {
        let out = simplified(json!(["Abs", ["Negate", "x"]]));
        assert!(out.is_function_of("Abs"));
        assert!(out.arg(0).unwrap().is_symbol("x"));
    }

    #[test]
    fn test_abs_distributes_over_product() {
        let out = simplified(json!(["Abs", ["Multiply", "x", "y"]]));
        assert!(out.is_function_of("Multiply"));
        assert!(out.args().iter().all(|a| a.is_function_of("Abs")));
    }

    #[test]
    fn test_abs_with_signed_factor() {
        let e = engine();
        e.assume(&Expr::function(
            "Greater",
            vec![Expr::symbol("c"), Expr::int(0)],
        ))
        .unwrap();
        let out = e.simplify(&e.box_json(&json!(["Abs", ["Multiply", "c", "y"]])));
        // c comes out of the bar.
        assert!(out.is_function_of("Multiply"));
        assert!(out.args().iter().any(|a| a.is_symbol("c")));
    }

    #[test]
    fn test_abs_power_parity() {
        let out = simplified(json!(["Abs", ["Power", "x", 2]]));
        assert!(out.is_function_of("Power"));
        assert!(out.arg(0).unwrap().is_symbol("x"));

        let out = simplified(json!(["Abs", ["Power", "x", 3]]));
        assert!(out.is_function_of("Power"));
        assert!(out.arg(0).unwrap().is_function_of("Abs"));
    }

    #[test]
    fn test_abs_odd_function() {
        let out = simplified(json!(["Abs", ["Sin", "x"]]));
        assert!(out.is_function_of("Sin"), "got {out}");
        assert!(out.arg(0).unwrap().is_function_of("Abs"));
    }

    #[test]
    fn test_even_function_drops_abs() {
        let out = simplified(json!(["Cos", ["Abs", "x"]]));
        assert!(out.is_function_of("Cos"));
        assert!(out.arg(0).unwrap().is_symbol("x"));
    }

    #[test]
    fn test_abs_base_even_power() {
        let out = simplified(json!(["Power", ["Abs", "x"], 2]));
        assert!(out.is_function_of("Power"));
        assert!(out.arg(0).unwrap().is_symbol("x"));
    }
}
