//! The Divide family.
//!
//! Classifies the indeterminate quotients as inline errors, cancels
//! identical operands, unnests reciprocal towers and collapses same-base
//! quotients. Exact nonzero numeric quotients never reach these rules;
//! canonicalization already folded them.

use super::{div_of, generic_nonzero_finite, mul_of, pow_of, RuleStep};
use crate::engine::ComputeEngine;
use crate::error::ErrorKind;
use crate::expr::Expr;
use calx_numeric::NumericValue;

pub fn simplify_divide(engine: &ComputeEngine, expr: &Expr) -> Option<RuleStep> {
    let n = expr.arg(0)?;
    let d = expr.arg(1)?;

    let n_zero = n.numeric().is_some_and(NumericValue::is_zero);
    let d_zero = d.numeric().is_some_and(NumericValue::is_zero);

    if n_zero && d_zero {
        return Some(RuleStep::new(
            Expr::error(ErrorKind::Indeterminate, Some(expr.clone())),
            "0/0 is indeterminate",
        ));
    }
    if d_zero {
        return Some(RuleStep::new(
            Expr::error(ErrorKind::DivisionByZero, Some(expr.clone())),
            "division by zero",
        ));
    }

    // 0/a → 0 when the denominator is a concrete nonzero number or an
    // expression with a free variable. A denominator that folded to a
    // literal zero was caught above, which is what defuses 0/(1-1).
    if n_zero {
        let denominator_safe = match d.numeric() {
            Some(v) => !v.is_zero() && !v.is_nan(),
            None => !d.symbols().is_empty(),
        };
        if denominator_safe {
            return Some(RuleStep::new(Expr::int(0), "0/a = 0 for nonzero a"));
        }
    }

    if n.is_same(d) && generic_nonzero_finite(engine, n) {
        return Some(RuleStep::new(Expr::int(1), "a/a = 1"));
    }

    // Reciprocal towers.
    if d.is_function_of("Divide") && d.nargs() == 2 {
        let (b, c) = (d.arg(0)?, d.arg(1)?);
        if n.numeric().is_some_and(NumericValue::is_one)
            && b.numeric().is_some_and(NumericValue::is_one)
        {
            return Some(RuleStep::new(c.clone(), "1/(1/a) = a"));
        }
        if b.numeric().is_some_and(NumericValue::is_one) {
            return Some(RuleStep::new(
                engine.box_expr(mul_of(vec![n.clone(), c.clone()])),
                "a/(1/b) = a·b",
            ));
        }
        return Some(RuleStep::new(
            engine.box_expr(div_of(mul_of(vec![n.clone(), c.clone()]), b.clone())),
            "a/(b/c) = a·c/b",
        ));
    }

    // a / b^{-k} → a·b^k.
    if d.is_function_of("Power") && d.nargs() == 2 {
        if let Some(e) = d.arg(1)?.numeric() {
            if e.is_negative() {
                let flipped = pow_of(d.arg(0)?.clone(), Expr::number(e.neg()));
                return Some(RuleStep::new(
                    engine.box_expr(mul_of(vec![n.clone(), flipped])),
                    "a/b^(-k) = a·b^k",
                ));
            }
        }
    }

    None
}

/// `x^a / x^b → x^{a-b}` for a shared base (an implicit exponent of 1 on
/// either side counts).
pub fn simplify_same_base_quotient(engine: &ComputeEngine, expr: &Expr) -> Option<RuleStep> {
    let n = expr.arg(0)?;
    let d = expr.arg(1)?;

    let split = |e: &Expr| -> (Expr, Expr) {
        if e.is_function_of("Power") && e.nargs() == 2 {
            (e.arg(0).unwrap().clone(), e.arg(1).unwrap().clone())
        } else {
            (e.clone(), Expr::int(1))
        }
    };
    let (nb, ne) = split(n);
    let (db, de) = split(d);
    if !nb.is_same(&db) {
        return None;
    }
    // The identical-operand case belongs to a/a.
    if n.is_same(d) {
        return None;
    }

    let exponent = match (ne.numeric(), de.numeric()) {
        (Some(a), Some(b)) => Expr::number(a.sub(b)),
        _ => Expr::function("Subtract", vec![ne, de]),
    };
    Some(RuleStep::new(
        engine.box_expr(pow_of(nb, exponent)),
        "x^a / x^b = x^(a-b)",
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
    fn test_zero_over_zero_is_inline_error() {
        let out = simplified(json!(["Divide", 0, 0]));
        assert!(!out.is_valid());
        assert_eq!(
            out.arg(0).and_then(Expr::string_value),
            Some("indeterminate")
        );
    }

    #[test]
    fn test_masked_zero_denominator_trap() {
        // x·0 / (1-1) must classify as indeterminate, not fold to 0.
        let out = simplified(json!([
            "Divide",
            ["Multiply", "x", 0],
            ["Subtract", 1, 1]
        ]));
        assert!(!out.is_valid());
        assert_eq!(
            out.arg(0).and_then(Expr::string_value),
            Some("indeterminate")
        );
    }

    #[test]
    fn test_zero_numerator() {
        let out = simplified(json!(["Divide", 0, "x"]));
        assert_eq!(out.as_i64(), Some(0));
        let out = simplified(json!(["Divide", 0, 7.5]));
        assert_eq!(out.as_i64(), Some(0));
    }

    #[test]
    fn test_cancellation() {
        let out = simplified(json!(["Divide", "x", "x"]));
        assert_eq!(out.as_i64(), Some(1));
        // But not when the operand is a literal zero.
        let out = simplified(json!(["Divide", 0.0, 0.0]));
        assert!(!out.is_valid());
    }

    #[test]
    fn test_reciprocal_towers() {
        let out = simplified(json!(["Divide", 1, ["Divide", 1, "a"]]));
        assert!(out.is_symbol("a"));

        let out = simplified(json!(["Divide", "a", ["Divide", 1, "b"]]));
        assert!(out.is_function_of("Multiply"));

        let out = simplified(json!(["Divide", "a", ["Divide", "b", "c"]]));
        assert!(out.is_function_of("Divide"), "got {out}");
        assert!(out.arg(0).unwrap().is_function_of("Multiply"));
    }

    #[test]
    fn test_negative_power_denominator() {
        let out = simplified(json!(["Divide", "a", ["Power", "b", -3]]));
        assert!(out.is_function_of("Multiply"), "got {out}");
    }

    #[test]
    fn test_same_base_quotient() {
        let out = simplified(json!([
            "Divide",
            ["Power", "x", "a"],
            ["Power", "x", "b"]
        ]));
        assert!(out.is_function_of("Power"), "got {out}");

        let out = simplified(json!(["Divide", ["Power", "x", 5], "x"]));
        assert!(out.is_function_of("Power"));
        assert_eq!(out.arg(1).unwrap().as_i64(), Some(4));
    }
}
