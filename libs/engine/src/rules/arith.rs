//! Arithmetic collection: like terms in sums, repeated bases in
//! products.

use super::{mul_of, negate, pow_of, RuleStep};
use crate::engine::ComputeEngine;
use crate::expr::Expr;
use calx_numeric::NumericValue;

/// `2x + 3x → 5x`: terms split into a numeric coefficient and a symbolic
/// core; cores that compare structurally equal merge their coefficients.
pub fn collect_like_terms(engine: &ComputeEngine, expr: &Expr) -> Option<RuleStep> {
    // (coefficient, core); a `None` core is the constant bucket.
    let mut buckets: Vec<(NumericValue, Option<Expr>)> = Vec::new();
    let mut merged = false;

    for term in expr.args() {
        let (coefficient, core) = split_coefficient(term);
        match buckets.iter_mut().find(|(_, c)| match (c, &core) {
            (None, None) => true,
            (Some(a), Some(b)) => a.is_same(b),
            _ => false,
        }) {
            Some((acc, _)) => {
                *acc = acc.add(&coefficient);
                merged = true;
            }
            None => buckets.push((coefficient, core)),
        }
    }
    if !merged {
        return None;
    }

    let mut terms: Vec<Expr> = Vec::new();
    for (coefficient, core) in buckets {
        match core {
            None => {
                if !coefficient.is_zero() {
                    terms.push(Expr::number(coefficient));
                }
            }
            Some(core) => {
                if coefficient.is_zero() {
                    continue;
                }
                if coefficient.is_one() {
                    terms.push(core);
                } else if coefficient.is_negative_one() {
                    terms.push(negate(core));
                } else {
                    terms.push(mul_of(vec![Expr::number(coefficient), core]));
                }
            }
        }
    }
    let out = match terms.len() {
        0 => Expr::int(0),
        1 => terms.pop().unwrap(),
        _ => Expr::function("Add", terms),
    };
    Some(RuleStep::new(engine.box_expr(out), "collect like terms"))
}

/// Splits a term into its numeric coefficient and symbolic core.
fn split_coefficient(term: &Expr) -> (NumericValue, Option<Expr>) {
    if let Some(v) = term.numeric() {
        return (v.clone(), None);
    }
    if term.is_function_of("Negate") && term.nargs() == 1 {
        let (c, core) = split_coefficient(term.arg(0).unwrap());
        return (c.neg(), core);
    }
    if term.is_function_of("Multiply") {
        let mut coefficient = NumericValue::one();
        let mut rest: Vec<Expr> = Vec::new();
        for f in term.args() {
            match f.numeric() {
                Some(v) => coefficient = coefficient.mul(v),
                None => rest.push(f.clone()),
            }
        }
        if !rest.is_empty() {
            let core = if rest.len() == 1 {
                rest.pop().unwrap()
            } else {
                mul_of(rest)
            };
            return (coefficient, Some(core));
        }
        return (coefficient, None);
    }
    (NumericValue::one(), Some(term.clone()))
}

/// `x·x² → x³`: factors with a structurally shared base merge their
/// exponents.
pub fn collect_product_powers(engine: &ComputeEngine, expr: &Expr) -> Option<RuleStep> {
    let mut bases: Vec<(Expr, Vec<Expr>)> = Vec::new();
    let mut merged = false;

    for factor in expr.args() {
        let (base, exponent) = if factor.is_function_of("Power") && factor.nargs() == 2 {
            (factor.arg(0).unwrap().clone(), factor.arg(1).unwrap().clone())
        } else {
            (factor.clone(), Expr::int(1))
        };
        match bases.iter_mut().find(|(b, _)| b.is_same(&base)) {
            Some((_, exps)) => {
                exps.push(exponent);
                merged = true;
            }
            None => bases.push((base, vec![exponent])),
        }
    }
    if !merged {
        return None;
    }

    let mut factors: Vec<Expr> = Vec::new();
    for (base, mut exps) in bases {
        let factor = if exps.len() == 1 {
            let e = exps.pop().unwrap();
            if e.as_i64() == Some(1) {
                base
            } else {
                pow_of(base, e)
            }
        } else {
            let exponent = match exps
                .iter()
                .map(|e| e.numeric().cloned())
                .collect::<Option<Vec<_>>>()
            {
                Some(nums) => {
                    let mut acc = NumericValue::zero();
                    for n in &nums {
                        acc = acc.add(n);
                    }
                    Expr::number(acc)
                }
                None => Expr::function("Add", exps),
            };
            pow_of(base, exponent)
        };
        factors.push(factor);
    }
    let out = match factors.len() {
        0 => Expr::int(1),
        1 => factors.pop().unwrap(),
        _ => Expr::function("Multiply", factors),
    };
    Some(RuleStep::new(engine.box_expr(out), "merge repeated factors"))
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
    fn test_collect_like_terms() {
        let out = simplified(json!([
            "Add", ["Multiply", 2, "x"], ["Multiply", 3, "x"]
        ]));
        assert!(out.is_function_of("Multiply"), "got {out}");
        assert!(out.args().iter().any(|a| a.as_i64() == Some(5)));
        assert!(out.args().iter().any(|a| a.is_symbol("x")));
    }

    #[test]
    fn test_collect_cancels_to_zero() {
        let out = simplified(json!(["Add", "x", ["Negate", "x"]]));
        assert_eq!(out.as_i64(), Some(0));
    }

    #[test]
    fn test_collect_with_constant() {
        let out = simplified(json!([
            "Add", ["Multiply", 2, "x"], 1, "x"
        ]));
        // 3x + 1
        assert!(out.is_function_of("Add"), "got {out}");
        assert_eq!(out.nargs(), 2);
    }

    #[test]
    fn test_collect_unit_coefficient() {
        let out = simplified(json!(["Add", ["Multiply", 2, "y"], ["Negate", "y"]]));
        assert!(out.is_symbol("y"), "got {out}");
    }

    #[test]
    fn test_merge_product_powers() {
        let out = simplified(json!(["Multiply", "x", "x"]));
        assert!(out.is_function_of("Power"), "got {out}");
        assert_eq!(out.arg(1).unwrap().as_i64(), Some(2));

        let out = simplified(json!(["Multiply", "x", ["Power", "x", 2]]));
        assert!(out.is_function_of("Power"));
        assert_eq!(out.arg(1).unwrap().as_i64(), Some(3));
    }

    #[test]
    fn test_unrelated_factors_untouched() {
        let out = simplified(json!(["Multiply", "x", "y"]));
        assert!(out.is_function_of("Multiply"));
        assert_eq!(out.nargs(), 2);
    }
}
