//! The boolean subsystem.
//!
//! Connective evaluation (short-circuiting, absorption, contradiction and
//! tautology detection), normal forms, truth tables, Quine–McCluskey
//! minimization and finite-domain quantifiers.

pub mod forms;
pub mod minimize;
pub mod quantifier;
pub mod truth_table;

use crate::engine::ComputeEngine;
use crate::expr::Expr;

/// Is `b` the negation of `a` (in either direction)?
pub(crate) fn is_negation_of(a: &Expr, b: &Expr) -> bool {
    let negated = |x: &Expr, y: &Expr| {
        x.is_function_of("Not") && x.nargs() == 1 && x.arg(0).unwrap().is_same(y)
    };
    negated(a, b) || negated(b, a)
}

/// Evaluates an n-ary or binary boolean connective. Returns `None` when
/// nothing reduces (the expression stays symbolic).
pub fn eval_connective(engine: &ComputeEngine, op: &str, args: &[Expr]) -> Option<Expr> {
    match op {
        "And" => eval_and_or(engine, args, true),
        "Or" => eval_and_or(engine, args, false),
        "Not" => {
            let a = args.first()?;
            if a.is_true() {
                Some(Expr::boolean(false))
            } else if a.is_false() {
                Some(Expr::boolean(true))
            } else {
                None
            }
        }
        "Implies" => {
            let (a, b) = (args.first()?, args.get(1)?);
            if a.is_false() || b.is_true() {
                Some(Expr::boolean(true))
            } else if a.is_true() {
                Some(b.clone())
            } else if b.is_false() {
                Some(engine.box_expr(Expr::function("Not", vec![a.clone()])))
            } else {
                None
            }
        }
        "Equivalent" => {
            let (a, b) = (args.first()?, args.get(1)?);
            if a.is_same(b) {
                Some(Expr::boolean(true))
            } else if is_negation_of(a, b) {
                Some(Expr::boolean(false))
            } else if a.is_true() {
                Some(b.clone())
            } else if a.is_false() {
                Some(engine.box_expr(Expr::function("Not", vec![b.clone()])))
            } else if b.is_true() {
                Some(a.clone())
            } else if b.is_false() {
                Some(engine.box_expr(Expr::function("Not", vec![a.clone()])))
            } else {
                None
            }
        }
        "Xor" => eval_xor(engine, args),
        "Nand" => negate_reduction(engine, "And", args),
        "Nor" => negate_reduction(engine, "Or", args),
        _ => None,
    }
}

/// Shared And/Or evaluation; the two are dual in their absorbing and
/// identity elements.
fn eval_and_or(engine: &ComputeEngine, args: &[Expr], is_and: bool) -> Option<Expr> {
    let op = if is_and { "And" } else { "Or" };
    let dual = if is_and { "Or" } else { "And" };
    let mut changed = false;
    let mut terms: Vec<Expr> = Vec::with_capacity(args.len());

    for a in args {
        // Identity element drops; absorbing element decides.
        if (is_and && a.is_true()) || (!is_and && a.is_false()) {
            changed = true;
            continue;
        }
        if (is_and && a.is_false()) || (!is_and && a.is_true()) {
            return Some(Expr::boolean(!is_and));
        }
        if terms.iter().any(|t| t.is_same(a)) {
            changed = true;
            continue;
        }
        terms.push(a.clone());
    }

    // A ∧ ¬A is a contradiction; A ∨ ¬A is a tautology.
    for (i, t) in terms.iter().enumerate() {
        if terms[i + 1..].iter().any(|u| is_negation_of(t, u)) {
            return Some(Expr::boolean(!is_and));
        }
    }

    // Direct-child absorption: A ∧ (A ∨ B) → A and A ∨ (A ∧ B) → A.
    let absorbed: Vec<Expr> = terms
        .iter()
        .filter(|t| {
            !(t.is_function_of(dual)
                && t.args()
                    .iter()
                    .any(|inner| terms.iter().any(|other| other.is_same(inner))))
        })
        .cloned()
        .collect();
    if absorbed.len() != terms.len() {
        changed = true;
        terms = absorbed;
    }

    match terms.len() {
        0 => Some(Expr::boolean(is_and)),
        1 => Some(terms.pop().unwrap()),
        _ if changed => Some(engine.box_expr(Expr::function(op, terms))),
        _ => None,
    }
}

/// Xor is parity: known values fold into a parity bit that flips the
/// remaining unknowns; identical unknowns cancel in pairs.
fn eval_xor(engine: &ComputeEngine, args: &[Expr]) -> Option<Expr> {
    let mut parity = false;
    let mut unknowns: Vec<Expr> = Vec::new();
    let mut changed = false;

    for a in args {
        if a.is_true() {
            parity = !parity;
            changed = true;
        } else if a.is_false() {
            changed = true;
        } else if let Some(i) = unknowns.iter().position(|u| u.is_same(a)) {
            unknowns.remove(i);
            changed = true;
        } else {
            unknowns.push(a.clone());
        }
    }

    if unknowns.is_empty() {
        return Some(Expr::boolean(parity));
    }
    if !changed {
        return None;
    }
    let core = if unknowns.len() == 1 {
        unknowns.pop().unwrap()
    } else {
        engine.box_expr(Expr::function("Xor", unknowns))
    };
    Some(if parity {
        engine.box_expr(Expr::function("Not", vec![core]))
    } else {
        core
    })
}

/// Nand and Nor are the negations of And and Or.
fn negate_reduction(engine: &ComputeEngine, inner_op: &str, args: &[Expr]) -> Option<Expr> {
    let reduced = eval_and_or(engine, args, inner_op == "And")?;
    if reduced.is_true() {
        return Some(Expr::boolean(false));
    }
    if reduced.is_false() {
        return Some(Expr::boolean(true));
    }
    Some(engine.box_expr(Expr::function("Not", vec![reduced])))
}
