//! Truth-table enumeration.
//!
//! Assignments are enumerated by bit-indexing: assignment `i` gives
//! variable `k` the value of bit `k` of `i`. Hard caps keep the
//! enumeration tractable; above a cap the operators stay symbolic rather
//! than erroring.

use crate::engine::ComputeEngine;
use crate::expr::Expr;
use std::collections::HashMap;
use std::sync::Arc;

/// Cap for satisfiability / tautology decisions.
pub const SAT_CAP: usize = 20;
/// Cap for materializing a full truth table.
pub const TABLE_CAP: usize = 10;
/// Cap for Quine–McCluskey minimization.
pub const QM_CAP: usize = 12;

/// The distinct propositional variables of a boolean expression, sorted.
/// `True` and `False` are constants, not variables.
pub fn extract_variables(expr: &Expr) -> Vec<Arc<str>> {
    expr.symbols()
        .into_iter()
        .filter(|s| &**s != "True" && &**s != "False")
        .collect()
}

/// Evaluates `expr` under the assignment encoded by `index`.
pub fn evaluate_assignment(
    engine: &ComputeEngine,
    expr: &Expr,
    vars: &[Arc<str>],
    index: u64,
) -> Option<bool> {
    let mut bindings: HashMap<Arc<str>, Expr> = HashMap::with_capacity(vars.len());
    for (k, var) in vars.iter().enumerate() {
        bindings.insert(var.clone(), Expr::boolean(index >> k & 1 == 1));
    }
    let out = engine.evaluate(&engine.box_expr(expr.subs(&bindings)));
    if out.is_true() {
        Some(true)
    } else if out.is_false() {
        Some(false)
    } else {
        None
    }
}

/// The full table: entry `i` is the value under assignment `i`. `None`
/// above the cap or when any row fails to evaluate to a boolean.
pub fn truth_table(engine: &ComputeEngine, expr: &Expr) -> Option<Vec<bool>> {
    let vars = extract_variables(expr);
    if vars.len() > TABLE_CAP {
        return None;
    }
    let rows = 1u64 << vars.len();
    (0..rows)
        .map(|i| evaluate_assignment(engine, expr, &vars, i))
        .collect()
}

/// Some assignment satisfies `expr`. `None` above the cap.
pub fn satisfiable(engine: &ComputeEngine, expr: &Expr) -> Option<bool> {
    decide(engine, expr, SAT_CAP, true)
}

/// Every assignment satisfies `expr`. `None` above the cap.
pub fn tautology(engine: &ComputeEngine, expr: &Expr) -> Option<bool> {
    decide(engine, expr, SAT_CAP, false)
}

fn decide(
    engine: &ComputeEngine,
    expr: &Expr,
    cap: usize,
    looking_for: bool,
) -> Option<bool> {
    let vars = extract_variables(expr);
    if vars.len() > cap {
        return None;
    }
    let rows = 1u64 << vars.len();
    for i in 0..rows {
        let value = evaluate_assignment(engine, expr, &vars, i)?;
        if value == looking_for {
            // A witness decides satisfiability; a countermodel decides
            // tautology.
            return Some(looking_for);
        }
    }
    Some(!looking_for)
}

/// Handler for the `Satisfiable` and `Tautology` operators.
pub fn eval_decision(engine: &ComputeEngine, op: &str, arg: &Expr) -> Option<Expr> {
    let verdict = match op {
        "Satisfiable" => satisfiable(engine, arg),
        "Tautology" => tautology(engine, arg),
        _ => None,
    };
    verdict.map(Expr::boolean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> ComputeEngine {
        ComputeEngine::new()
    }

    #[test]
    fn test_extract_variables() {
        let e = engine();
        let expr = e.box_json(&json!(["And", "q", ["Or", "p", "True"], "p"]));
        let vars = extract_variables(&expr);
        assert_eq!(vars.len(), 2);
        assert_eq!(&*vars[0], "p");
        assert_eq!(&*vars[1], "q");
    }

    #[test]
    fn test_truth_table_xor() {
        let e = engine();
        let expr = e.box_json(&json!(["Xor", "a", "b"]));
        let table = truth_table(&e, &expr).unwrap();
        assert_eq!(table, vec![false, true, true, false]);
    }

    #[test]
    fn test_satisfiable_and_tautology() {
        let e = engine();
        let contingent = e.box_json(&json!(["And", "a", "b"]));
        assert_eq!(satisfiable(&e, &contingent), Some(true));
        assert_eq!(tautology(&e, &contingent), Some(false));

        let taut = e.box_json(&json!(["Or", "a", ["Not", "a"]]));
        assert_eq!(tautology(&e, &taut), Some(true));

        let contradiction = e.box_json(&json!(["And", "a", ["Not", "a"]]));
        assert_eq!(satisfiable(&e, &contradiction), Some(false));
    }

    #[test]
    fn test_cap_leaves_symbolic() {
        let e = engine();
        // 11 variables exceeds the table cap.
        let vars: Vec<serde_json::Value> = (0..11)
            .map(|i| serde_json::Value::String(format!("v{i}")))
            .collect();
        let mut items = vec![serde_json::Value::String("Or".into())];
        items.extend(vars);
        let expr = e.box_json(&serde_json::Value::Array(items));
        assert!(truth_table(&e, &expr).is_none());
        // But the SAT cap is higher, so satisfiability still decides.
        assert_eq!(satisfiable(&e, &expr), Some(true));
    }
}
