//! The Infinity family.
//!
//! Arithmetic with infinite literals: absorbing products, indeterminate
//! forms, and the asymptotics of powers and exponentials. Signs of the
//! finite operands come from literals and assumptions.

use super::{known_negative, known_positive, known_zero, RuleStep};
use crate::engine::ComputeEngine;
use crate::expr::Expr;
use calx_numeric::{NumericValue, Sign};

fn as_infinite_sign(e: &Expr) -> Option<Sign> {
    let v = e.numeric()?;
    if !v.is_infinite() {
        return None;
    }
    v.sign()
}

fn infinity(sign: Sign) -> Expr {
    match sign {
        Sign::Negative => Expr::number(NumericValue::neg_infinity()),
        _ => Expr::number(NumericValue::pos_infinity()),
    }
}

pub fn simplify_multiply_infinity(engine: &ComputeEngine, expr: &Expr) -> Option<RuleStep> {
    let mut result_sign: Option<Sign> = None;
    for a in expr.args() {
        if let Some(s) = as_infinite_sign(a) {
            result_sign = Some(match result_sign {
                None => s,
                Some(acc) => combine(acc, s),
            });
        }
    }
    let mut sign = result_sign?;

    for a in expr.args() {
        if as_infinite_sign(a).is_some() {
            continue;
        }
        if known_zero(engine, a) {
            return Some(RuleStep::new(
                Expr::number(NumericValue::nan()),
                "0·∞ is indeterminate",
            ));
        }
        if known_positive(engine, a) {
            continue;
        }
        if known_negative(engine, a) {
            sign = sign.flip();
            continue;
        }
        // An operand of unknown sign blocks the reduction.
        return None;
    }
    Some(RuleStep::new(infinity(sign), "∞ absorbs a signed product"))
}

fn combine(a: Sign, b: Sign) -> Sign {
    match (a, b) {
        (Sign::Negative, Sign::Negative) => Sign::Positive,
        (Sign::Negative, _) | (_, Sign::Negative) => Sign::Negative,
        _ => Sign::Positive,
    }
}

pub fn simplify_divide_infinity(engine: &ComputeEngine, expr: &Expr) -> Option<RuleStep> {
    let n = expr.arg(0)?;
    let d = expr.arg(1)?;
    let n_inf = as_infinite_sign(n);
    let d_inf = as_infinite_sign(d);

    match (n_inf, d_inf) {
        (Some(_), Some(_)) => Some(RuleStep::new(
            Expr::number(NumericValue::nan()),
            "∞/∞ is indeterminate",
        )),
        (Some(s), None) => {
            if known_positive(engine, d) {
                Some(RuleStep::new(infinity(s), "±∞ / finite"))
            } else if known_negative(engine, d) {
                Some(RuleStep::new(infinity(s.flip()), "±∞ / finite"))
            } else {
                None
            }
        }
        (None, Some(_)) => {
            // finite / ∞ → 0.
            n.numeric()
                .filter(|v| v.is_finite())
                .map(|_| RuleStep::new(Expr::int(0), "finite/∞ = 0"))
        }
        (None, None) => None,
    }
}

pub fn simplify_power_infinity(engine: &ComputeEngine, expr: &Expr) -> Option<RuleStep> {
    let base = expr.arg(0)?;
    let exp = expr.arg(1)?;
    let _ = engine;

    // Infinite exponent on a finite positive base.
    if let Some(es) = as_infinite_sign(exp) {
        if let Some(b) = base.numeric() {
            if b.is_one() {
                return Some(RuleStep::new(
                    Expr::number(NumericValue::nan()),
                    "1^∞ is indeterminate",
                ));
            }
            if !b.is_finite() || !b.is_real() {
                return None;
            }
            let above_one = b.gt(&NumericValue::one()) == Some(true);
            let between = b.is_positive() && b.lt(&NumericValue::one()) == Some(true);
            let grows = (above_one && es == Sign::Positive) || (between && es == Sign::Negative);
            let decays = (above_one && es == Sign::Negative) || (between && es == Sign::Positive);
            if grows {
                return Some(RuleStep::new(infinity(Sign::Positive), "a^±∞ diverges"));
            }
            if decays {
                return Some(RuleStep::new(Expr::int(0), "a^±∞ decays to 0"));
            }
        }
        return None;
    }

    // Infinite base.
    let bs = as_infinite_sign(base)?;
    let e = exp.numeric()?;
    if e.is_zero() {
        return Some(RuleStep::new(
            Expr::number(NumericValue::nan()),
            "∞^0 is indeterminate",
        ));
    }
    if e.is_negative() {
        return Some(RuleStep::new(Expr::int(0), "∞^negative = 0"));
    }
    if bs == Sign::Positive {
        return Some(RuleStep::new(infinity(Sign::Positive), "+∞^positive = +∞"));
    }
    // (-∞)^e by the parity of a rational exponent p/q with odd q.
    let r = e.try_to_rational()?;
    let q_odd = (r.denom() % num_bigint::BigInt::from(2)) != num_bigint::BigInt::from(0);
    if !q_odd {
        return None;
    }
    let p_odd = (r.numer() % num_bigint::BigInt::from(2)) != num_bigint::BigInt::from(0);
    Some(RuleStep::new(
        infinity(if p_odd { Sign::Negative } else { Sign::Positive }),
        "(-∞)^n by parity",
    ))
}

pub fn simplify_exp_infinity(engine: &ComputeEngine, expr: &Expr) -> Option<RuleStep> {
    let _ = engine;
    match as_infinite_sign(expr.arg(0)?)? {
        Sign::Positive => Some(RuleStep::new(
            Expr::number(NumericValue::pos_infinity()),
            "Exp(+∞) = +∞",
        )),
        Sign::Negative => Some(RuleStep::new(Expr::int(0), "Exp(-∞) = 0")),
        Sign::Zero => None,
    }
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
    fn test_multiply_with_infinity() {
        let e = engine();
        e.assume(&Expr::function(
            "Greater",
            vec![Expr::symbol("p"), Expr::int(0)],
        ))
        .unwrap();
        let out = e.simplify(&e.box_json(&json!(["Multiply", "PositiveInfinity", "p"])));
        assert!(out.numeric().unwrap().is_infinite());
        assert!(out.numeric().unwrap().is_positive());

        e.assume(&Expr::function(
            "Less",
            vec![Expr::symbol("m"), Expr::int(0)],
        ))
        .unwrap();
        let out = e.simplify(&e.box_json(&json!(["Multiply", "PositiveInfinity", "m"])));
        assert!(out.numeric().unwrap().is_negative());
    }

    #[test]
    fn test_zero_times_infinity() {
        let out = simplified(json!(["Multiply", 0.0, "PositiveInfinity"]));
        assert!(out.numeric().unwrap().is_nan());
    }

    #[test]
    fn test_unknown_sign_blocks() {
        let out = simplified(json!(["Multiply", "NegativeInfinity", "x"]));
        assert!(out.is_function_of("Multiply"));
    }

    #[test]
    fn test_divide_infinities() {
        let out = simplified(json!([
            "Divide", "PositiveInfinity", "NegativeInfinity"
        ]));
        assert!(out.numeric().unwrap().is_nan());

        let out = simplified(json!(["Divide", 5, "PositiveInfinity"]));
        assert_eq!(out.as_i64(), Some(0));

        let out = simplified(json!(["Divide", "PositiveInfinity", -2]));
        assert!(out.numeric().unwrap().is_negative());
    }

    #[test]
    fn test_power_asymptotics() {
        let out = simplified(json!(["Power", 2, "PositiveInfinity"]));
        assert!(out.numeric().unwrap().is_infinite());

        let out = simplified(json!(["Power", ["Rational", 1, 2], "PositiveInfinity"]));
        assert_eq!(out.as_i64(), Some(0));

        let out = simplified(json!(["Power", 2, "NegativeInfinity"]));
        assert_eq!(out.as_i64(), Some(0));

        let out = simplified(json!(["Power", 1, "PositiveInfinity"]));
        assert!(out.numeric().unwrap().is_nan());

        let out = simplified(json!(["Power", "PositiveInfinity", 0]));
        assert!(out.numeric().unwrap().is_nan());
    }

    #[test]
    fn test_negative_infinity_parity() {
        let out = simplified(json!(["Power", "NegativeInfinity", 2]));
        assert!(out.numeric().unwrap().is_positive());

        let out = simplified(json!(["Power", "NegativeInfinity", 3]));
        assert!(out.numeric().unwrap().is_negative());

        let out = simplified(json!([
            "Power", "NegativeInfinity", ["Rational", 2, 3]
        ]));
        assert!(out.numeric().unwrap().is_positive());

        let out = simplified(json!([
            "Power", "NegativeInfinity", ["Rational", 1, 3]
        ]));
        assert!(out.numeric().unwrap().is_negative());
    }

    #[test]
    fn test_exp_infinity() {
        let out = simplified(json!(["Exp", "PositiveInfinity"]));
        assert!(out.numeric().unwrap().is_infinite());
        let out = simplified(json!(["Exp", "NegativeInfinity"]));
        assert_eq!(out.as_i64(), Some(0));
    }
}
