//! The default cost function.
//!
//! Simplification is monotone descent over this scalar: a rewrite is
//! accepted only when it is strictly cheaper. The default penalizes
//! node count (nesting in particular), negative exponents and wide
//! operand lists; inline errors are cheap so that classifying an
//! indeterminate form counts as progress.

use crate::expr::{Expr, ExprKind};

pub fn default_cost(expr: &Expr) -> f64 {
    match expr.kind() {
        ExprKind::Number(v) => {
            if v.is_exact() {
                1.0
            } else {
                1.5
            }
        }
        ExprKind::Symbol(_) | ExprKind::Str(_) => 1.0,
        ExprKind::Function { op, args } => {
            if &**op == "Error" {
                return 1.5;
            }
            // A sign is nearly transparent: Negate is cheap and exempt
            // from the nesting penalty, so pulling signs outward counts
            // as progress.
            if &**op == "Negate" {
                return 1.5 + args.iter().map(default_cost).sum::<f64>();
            }
            // Material under an absolute-value bar weighs extra, so
            // dissolving or distributing the bar counts as progress.
            if &**op == "Abs" {
                return 1.0 + 2.5 * args.iter().map(default_cost).sum::<f64>();
            }
            // Likewise for radicands: moving factors out of a root (and
            // factoring sums into products under one) is progress.
            if &**op == "Sqrt" || &**op == "Root" {
                let radicand_weight = if args.first().is_some_and(|a| a.is_function_of("Add")) {
                    3.0
                } else {
                    2.5
                };
                let radicand = args.first().map_or(0.0, default_cost);
                let rest: f64 = args.iter().skip(1).map(default_cost).sum();
                return 2.0 + radicand_weight * radicand + rest;
            }
            // The non-elementary combinatoric operators are expensive:
            // rewriting them into plain factorials is progress. Power is
            // slightly below the baseline so that collecting repeated
            // factors (`x·x` into `x²`) is, too.
            let mut cost = match &**op {
                "Gamma" | "Factorial2" => 6.0,
                "Power" => 1.8,
                // Sums are the least compact normal form: folding a sum
                // into a product (`x + x` into `2x`) is progress.
                "Add" => 2.2,
                _ => 2.0,
            };
            // Wide operand lists cost extra beyond binary, nested
            // function operands beyond leaves.
            cost += 0.5 * args.len().saturating_sub(2) as f64;
            cost += 0.5
                * args
                    .iter()
                    .filter(|a| matches!(a.kind(), ExprKind::Function { .. }))
                    .count() as f64;
            if &**op == "Power" {
                if let Some(e) = args.get(1).and_then(Expr::numeric) {
                    if e.is_negative() {
                        cost += 1.0;
                    }
                }
            }
            // A complicated denominator is worse than the same material
            // in the numerator; unnesting quotient towers is progress.
            if &**op == "Divide" {
                let num = args.first().map_or(0.0, default_cost);
                let den = args.get(1).map_or(0.0, default_cost);
                return cost + num + 1.2 * den;
            }
            cost + args.iter().map(default_cost).sum::<f64>()
        }
        ExprKind::Tensor { elems, .. } => {
            2.0 + elems.iter().map(default_cost).sum::<f64>()
        }
        ExprKind::Dict(entries) => {
            2.0 + entries.values().map(default_cost).sum::<f64>()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fewer_nodes_cost_less() {
        let big = Expr::function(
            "Add",
            vec![
                Expr::function("Multiply", vec![Expr::int(2), Expr::symbol("x")]),
                Expr::function("Multiply", vec![Expr::int(3), Expr::symbol("x")]),
            ],
        );
        let small = Expr::function("Multiply", vec![Expr::int(5), Expr::symbol("x")]);
        assert!(default_cost(&small) < default_cost(&big));
    }

    #[test]
    fn test_negative_exponent_penalty() {
        let pos = Expr::function("Power", vec![Expr::symbol("x"), Expr::int(2)]);
        let neg = Expr::function("Power", vec![Expr::symbol("x"), Expr::int(-2)]);
        assert!(default_cost(&neg) > default_cost(&pos));
    }

    #[test]
    fn test_error_is_cheap() {
        let err = Expr::error(crate::error::ErrorKind::Indeterminate, None);
        let divide = Expr::function("Divide", vec![Expr::int(0), Expr::int(0)]);
        assert!(default_cost(&err) < default_cost(&divide));
    }
}
