//! Normal forms: NNF, CNF, DNF.
//!
//! `to_nnf` eliminates Implies/Equivalent/Xor/Nand/Nor and pushes
//! negations down to literals via De Morgan. `to_cnf` and `to_dnf` start
//! from NNF and distribute one connective over the other. Outputs are
//! canonical, so And/Or come back flattened, sorted and deduplicated.

use crate::engine::ComputeEngine;
use crate::expr::Expr;

/// Negation normal form: every `Not` in the output wraps a literal.
pub fn to_nnf(engine: &ComputeEngine, expr: &Expr) -> Expr {
    let expr = engine.box_expr(expr.clone());
    engine.box_expr(nnf(&expr, false))
}

/// Conjunctive normal form: an `And` of clauses, each a literal or an
/// `Or` of literals.
pub fn to_cnf(engine: &ComputeEngine, expr: &Expr) -> Expr {
    let nnf = to_nnf(engine, expr);
    engine.box_expr(distribute(&nnf, true))
}

/// Disjunctive normal form, dual to CNF.
pub fn to_dnf(engine: &ComputeEngine, expr: &Expr) -> Expr {
    let nnf = to_nnf(engine, expr);
    engine.box_expr(distribute(&nnf, false))
}

fn not(e: Expr) -> Expr {
    Expr::function("Not", vec![e])
}

/// Rewrites to NNF; `negated` tracks a pending negation being pushed
/// inward.
fn nnf(expr: &Expr, negated: bool) -> Expr {
    let Some(op) = expr.operator() else {
        // A literal (symbol or constant).
        return if negated { not(expr.clone()) } else { expr.clone() };
    };
    let args = expr.args();

    match op {
        "Not" => match args.first() {
            Some(inner) => nnf(inner, !negated),
            None => expr.clone(),
        },
        "And" | "Or" => {
            // De Morgan: negation swaps the connective.
            let out_op = match (op, negated) {
                ("And", false) | ("Or", true) => "And",
                _ => "Or",
            };
            Expr::function(out_op, args.iter().map(|a| nnf(a, negated)).collect())
        }
        "Implies" => {
            let (a, b) = (&args[0], &args[1]);
            if negated {
                // ¬(a ⇒ b) ≡ a ∧ ¬b
                Expr::function("And", vec![nnf(a, false), nnf(b, true)])
            } else {
                Expr::function("Or", vec![nnf(a, true), nnf(b, false)])
            }
        }
        "Equivalent" => {
            let (a, b) = (&args[0], &args[1]);
            if negated {
                // ¬(a ⇔ b) ≡ (a ∧ ¬b) ∨ (¬a ∧ b)
                Expr::function(
                    "Or",
                    vec![
                        Expr::function("And", vec![nnf(a, false), nnf(b, true)]),
                        Expr::function("And", vec![nnf(a, true), nnf(b, false)]),
                    ],
                )
            } else {
                Expr::function(
                    "Or",
                    vec![
                        Expr::function("And", vec![nnf(a, false), nnf(b, false)]),
                        Expr::function("And", vec![nnf(a, true), nnf(b, true)]),
                    ],
                )
            }
        }
        "Xor" => {
            // Fold left: Xor(a, b, …) = Xor(Xor(a, b), …).
            match args.len() {
                0 => Expr::boolean(negated),
                1 => nnf(&args[0], negated),
                _ => {
                    let mut acc = args[0].clone();
                    for b in &args[1..] {
                        acc = Expr::function(
                            "Or",
                            vec![
                                Expr::function("And", vec![acc.clone(), not(b.clone())]),
                                Expr::function("And", vec![not(acc), b.clone()]),
                            ],
                        );
                    }
                    nnf(&acc, negated)
                }
            }
        }
        "Nand" => nnf(&Expr::function("And", args.to_vec()), !negated),
        "Nor" => nnf(&Expr::function("Or", args.to_vec()), !negated),
        // Anything else (relations, predicates) is a literal.
        _ => {
            if negated {
                not(expr.clone())
            } else {
                expr.clone()
            }
        }
    }
}

/// Distributes Or over And (`cnf == true`) or And over Or (`cnf ==
/// false`) in an NNF input, flattening nested instances first and
/// recursing until no distribution remains.
fn distribute(expr: &Expr, cnf: bool) -> Expr {
    let (outer, inner) = if cnf { ("And", "Or") } else { ("Or", "And") };

    match expr.operator() {
        Some(op) if op == outer => Expr::function(
            outer,
            expr.args().iter().map(|a| distribute(a, cnf)).collect(),
        ),
        Some(op) if op == inner => {
            // Flatten nested inner connectives before distributing.
            let mut flat: Vec<Expr> = Vec::new();
            for a in expr.args() {
                let a = distribute(a, cnf);
                if a.is_function_of(inner) {
                    flat.extend(a.args().iter().cloned());
                } else {
                    flat.push(a);
                }
            }
            // Find an outer-connective operand to distribute across.
            match flat.iter().position(|a| a.is_function_of(outer)) {
                None => Expr::function(inner, flat),
                Some(i) => {
                    let pivot = flat.remove(i);
                    let branches: Vec<Expr> = pivot
                        .args()
                        .iter()
                        .map(|branch| {
                            let mut terms = flat.clone();
                            terms.push(branch.clone());
                            distribute(&Expr::function(inner, terms), cnf)
                        })
                        .collect();
                    Expr::function(outer, branches)
                }
            }
        }
        _ => expr.clone(),
    }
}
