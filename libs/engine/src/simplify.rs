//! The simplifier orchestrator.
//!
//! One iteration finds the leftmost-innermost improving rewrite: operands
//! are tried bottom-up before the node itself, node candidates come from
//! the operator's rule families (plus any user rules), and only a
//! strictly cost-decreasing candidate is accepted. Iteration runs to a
//! fixpoint or the engine's iteration limit. Rule handlers never invoke
//! the simplifier on their own output; descent is driven entirely from
//! here, which is what guarantees termination alongside the monotone
//! cost.

use crate::engine::{CancellationToken, ComputeEngine};
use crate::error::Result;
use crate::expr::Expr;
use crate::pattern::match_pattern;
use crate::rules;
use tracing::trace;

/// One accepted rewrite.
#[derive(Debug, Clone)]
pub struct SimplifyStep {
    pub expr: Expr,
    pub because: String,
}

/// A user-provided rewrite rule: wildcard pattern, replacement template,
/// and an identifier used as the step reason.
#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: Expr,
    pub replacement: Expr,
    pub id: String,
}

pub(crate) fn simplify_steps(
    engine: &ComputeEngine,
    expr: &Expr,
    user_rules: &[Rule],
    token: &CancellationToken,
) -> Result<Vec<SimplifyStep>> {
    let mut steps: Vec<SimplifyStep> = Vec::new();
    let mut current = expr.clone();
    let mut current_cost = engine.cost(&current);

    for _ in 0..engine.iteration_limit() {
        token.check()?;
        let Some((candidate, because)) = rewrite_once(engine, &current, user_rules, token)?
        else {
            break;
        };
        let candidate_cost = engine.cost(&candidate);
        if candidate_cost >= current_cost {
            break;
        }
        trace!(from = %current, to = %candidate, %because, "simplify step");
        steps.push(SimplifyStep {
            expr: candidate.clone(),
            because,
        });
        current = candidate;
        current_cost = candidate_cost;
    }
    Ok(steps)
}

/// The leftmost-innermost candidate rewrite, if any.
fn rewrite_once(
    engine: &ComputeEngine,
    expr: &Expr,
    user_rules: &[Rule],
    token: &CancellationToken,
) -> Result<Option<(Expr, String)>> {
    let Some(op) = expr.operator() else {
        return Ok(node_rewrite(engine, expr, user_rules));
    };
    if op == "Error" || op == "Hold" {
        return Ok(None);
    }
    // Rule handlers return None on invalid input; descent stops too.
    if !expr.is_valid() {
        return Ok(None);
    }

    // Operands first, bottom-up.
    for (i, arg) in expr.args().iter().enumerate() {
        token.check()?;
        if let Some((new_arg, because)) = rewrite_once(engine, arg, user_rules, token)? {
            let mut args = expr.args().to_vec();
            args[i] = new_arg;
            let rebuilt = engine.box_expr(Expr::function(op, args));
            return Ok(Some((rebuilt, because)));
        }
    }

    Ok(node_rewrite(engine, expr, user_rules))
}

/// Candidates at a single node: the operator's rule families, then user
/// rules. The cheapest strictly-improving candidate wins.
fn node_rewrite(
    engine: &ComputeEngine,
    expr: &Expr,
    user_rules: &[Rule],
) -> Option<(Expr, String)> {
    let current_cost = engine.cost(expr);
    let mut best: Option<(Expr, String, f64)> = None;

    let mut consider = |candidate: Expr, because: String| {
        let cost = engine.cost(&candidate);
        if cost >= current_cost {
            return;
        }
        match &best {
            Some((_, _, best_cost)) if *best_cost <= cost => {}
            _ => best = Some((candidate, because, cost)),
        }
    };

    if let Some(op) = expr.operator() {
        for rule in rules::rules_for(op) {
            if let Some(step) = rule(engine, expr) {
                consider(step.value, step.because.to_string());
            }
        }
    }

    for rule in user_rules {
        if let Some(subst) = match_pattern(expr, &rule.pattern) {
            let candidate = engine.box_expr(subst.apply(&rule.replacement));
            consider(candidate, rule.id.clone());
        }
    }

    best.map(|(e, because, _)| (e, because))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> ComputeEngine {
        ComputeEngine::new()
    }

    #[test]
    fn test_steps_are_monotone() {
        let e = engine();
        let expr = e.box_json(&json!(["Sqrt", ["Power", ["Negate", "x"], 2]]));
        let steps = e.simplify_steps(&expr, &[]);
        assert!(!steps.is_empty());
        let mut last = e.cost(&expr);
        for step in &steps {
            let c = e.cost(&step.expr);
            assert!(c < last, "non-decreasing step: {}", step.expr);
            last = c;
        }
    }

    #[test]
    fn test_simplify_is_idempotent() {
        let e = engine();
        for input in [
            json!(["Add", ["Multiply", 2, "x"], ["Multiply", 3, "x"]]),
            json!(["Sqrt", ["Power", "x", 2]]),
            json!(["Power", ["Negate", "x"], 4]),
        ] {
            let once = e.simplify(&e.box_json(&input));
            let twice = e.simplify(&once);
            assert!(once.is_same(&twice), "not idempotent: {once} vs {twice}");
        }
    }

    #[test]
    fn test_user_rule() {
        let e = engine();
        // Rewrite Sin(_x)² + Cos(_x)² → 1.
        let rule = Rule {
            pattern: e.box_json(&json!([
                "Add",
                ["Power", ["Sin", "_t"], 2],
                ["Power", ["Cos", "_t"], 2]
            ])),
            replacement: Expr::int(1),
            id: "pythagorean-identity".into(),
        };
        let expr = e.box_json(&json!([
            "Add",
            ["Power", ["Sin", "u"], 2],
            ["Power", ["Cos", "u"], 2]
        ]));
        let steps = e.simplify_steps(&expr, &[rule]);
        assert!(steps.last().unwrap().expr.numeric().unwrap().is_one());
        assert_eq!(steps.last().unwrap().because, "pythagorean-identity");
    }

    #[test]
    fn test_cancellation() {
        let e = engine();
        let token = CancellationToken::new();
        token.cancel();
        let expr = e.box_json(&json!(["Add", ["Multiply", 2, "x"], ["Multiply", 3, "x"]]));
        assert!(simplify_steps(&e, &expr, &[], &token).is_err());
    }
}
