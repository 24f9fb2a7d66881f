//! Quantifiers over finite domains.
//!
//! `ForAll`, `Exists` and `ExistsUnique` take a condition naming the
//! bound variable and its domain (`Element(x, Set(…))`) plus a body.
//! Evaluation enumerates the domain, substituting and short-circuiting;
//! nested quantifiers multiply out into a Cartesian product through
//! recursion. Anything non-finite, capped out, or non-boolean leaves the
//! expression symbolic.

use crate::engine::{CancellationToken, ComputeEngine};
use crate::error::Result;
use crate::expr::Expr;
use std::sync::Arc;

const QUANTIFIERS: [&str; 5] = ["ForAll", "Exists", "ExistsUnique", "NotForAll", "NotExists"];

pub fn eval_quantifier(
    engine: &ComputeEngine,
    op: &str,
    args: &[Expr],
    token: &CancellationToken,
) -> Result<Expr> {
    let original = || engine.box_expr(Expr::function(op, args.to_vec()));

    // The negated quantifiers evaluate the positive one and flip.
    if let Some(positive) = match op {
        "NotForAll" => Some("ForAll"),
        "NotExists" => Some("Exists"),
        _ => None,
    } {
        let inner = eval_quantifier(engine, positive, args, token)?;
        return Ok(if inner.is_true() {
            Expr::boolean(false)
        } else if inner.is_false() {
            Expr::boolean(true)
        } else {
            original()
        });
    }

    let (Some(condition), Some(body)) = (args.first(), args.get(1)) else {
        return Ok(original());
    };

    // A constant body decides immediately.
    if body.is_true() || body.is_false() {
        return Ok(body.clone());
    }

    let Some((var, domain)) = finite_domain(condition) else {
        return Ok(original());
    };

    // A body that never references the bound variable is just itself.
    if !body.contains_symbol(&var) {
        return Ok(engine.evaluate(body));
    }

    let mut true_count = 0usize;
    for value in &domain {
        token.check()?;
        let instantiated = substitute_free(body, &var, value);
        let outcome = engine.evaluate(&engine.box_expr(instantiated));
        if outcome.is_true() {
            if op == "Exists" {
                return Ok(Expr::boolean(true));
            }
            true_count += 1;
        } else if outcome.is_false() {
            if op == "ForAll" {
                return Ok(Expr::boolean(false));
            }
        } else {
            // Non-boolean instantiation: stay symbolic.
            return Ok(original());
        }
    }

    Ok(match op {
        "ForAll" => Expr::boolean(true),
        "Exists" => Expr::boolean(false),
        "ExistsUnique" => Expr::boolean(true_count == 1),
        _ => original(),
    })
}

/// Extracts the bound variable and its finite domain from a condition of
/// the form `Element(x, Set(…))` (or a `List` literal).
fn finite_domain(condition: &Expr) -> Option<(Arc<str>, Vec<Expr>)> {
    if !condition.is_function_of("Element") || condition.nargs() != 2 {
        return None;
    }
    let var: Arc<str> = Arc::from(condition.arg(0)?.symbol_name()?);
    let domain = condition.arg(1)?;
    match domain.operator() {
        Some("Set") | Some("List") => Some((var, domain.args().to_vec())),
        _ => None,
    }
}

/// Substitutes free occurrences of `name` only: a nested quantifier that
/// re-binds the same name shadows the outer binding.
fn substitute_free(expr: &Expr, name: &str, value: &Expr) -> Expr {
    if expr.symbol_name() == Some(name) {
        return value.clone();
    }
    if let Some(op) = expr.operator() {
        if QUANTIFIERS.contains(&op) {
            let bound = expr
                .arg(0)
                .and_then(|c| c.arg(0))
                .and_then(Expr::symbol_name);
            if bound == Some(name) {
                return expr.clone();
            }
        }
    }
    expr.map(&mut |a| substitute_free(a, name, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> ComputeEngine {
        ComputeEngine::new()
    }

    #[test]
    fn test_forall_over_set() {
        let e = engine();
        let out = e.evaluate(&e.box_json(&json!([
            "ForAll",
            ["Element", "x", ["Set", 1, 2, 3]],
            ["Greater", "x", 0]
        ])));
        assert!(out.is_true());

        let out = e.evaluate(&e.box_json(&json!([
            "ForAll",
            ["Element", "x", ["Set", 1, -2, 3]],
            ["Greater", "x", 0]
        ])));
        assert!(out.is_false());
    }

    #[test]
    fn test_exists_short_circuits() {
        let e = engine();
        let out = e.evaluate(&e.box_json(&json!([
            "Exists",
            ["Element", "x", ["Set", 1, 2, 3]],
            ["Equal", "x", 2]
        ])));
        assert!(out.is_true());
    }

    #[test]
    fn test_exists_unique() {
        let e = engine();
        let unique = e.evaluate(&e.box_json(&json!([
            "ExistsUnique",
            ["Element", "x", ["Set", 1, 2, 3]],
            ["Equal", "x", 2]
        ])));
        assert!(unique.is_true());

        let not_unique = e.evaluate(&e.box_json(&json!([
            "ExistsUnique",
            ["Element", "x", ["Set", 1, 2, 3]],
            ["Greater", "x", 1]
        ])));
        assert!(not_unique.is_false());
    }

    #[test]
    fn test_negated_quantifiers() {
        let e = engine();
        let out = e.evaluate(&e.box_json(&json!([
            "NotExists",
            ["Element", "x", ["Set", 1, 2]],
            ["Greater", "x", 5]
        ])));
        assert!(out.is_true());

        let out = e.evaluate(&e.box_json(&json!([
            "NotForAll",
            ["Element", "x", ["Set", 1, 2]],
            ["Greater", "x", 1]
        ])));
        assert!(out.is_true());
    }

    #[test]
    fn test_nested_cartesian_product() {
        let e = engine();
        // ∀x ∈ {1,2}. ∃y ∈ {1,2,3}. x + y = 4
        let out = e.evaluate(&e.box_json(&json!([
            "ForAll",
            ["Element", "x", ["Set", 1, 2]],
            ["Exists",
                ["Element", "y", ["Set", 1, 2, 3]],
                ["Equal", ["Add", "x", "y"], 4]]
        ])));
        assert!(out.is_true());
    }

    #[test]
    fn test_infinite_domain_stays_symbolic() {
        let e = engine();
        let out = e.evaluate(&e.box_json(&json!([
            "ForAll",
            ["Element", "x", "Integers"],
            ["Greater", "x", 0]
        ])));
        assert!(out.is_function_of("ForAll"));
    }

    #[test]
    fn test_body_without_bound_variable() {
        let e = engine();
        let out = e.evaluate(&e.box_json(&json!([
            "ForAll",
            ["Element", "x", ["Set", 1, 2]],
            ["Greater", 3, 0]
        ])));
        assert!(out.is_true());
    }
}
