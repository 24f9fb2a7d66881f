//! Quine–McCluskey two-level minimization.
//!
//! Minterms merge pairwise into prime implicants; a minimal cover is
//! selected essential-implicants-first with a greedy pass over the
//! remainder. CNF minimization runs the same machinery on the
//! complement and dualizes the result.

use super::truth_table::{extract_variables, truth_table, QM_CAP};
use crate::engine::ComputeEngine;
use crate::expr::Expr;
use smallvec::SmallVec;
use std::sync::Arc;

/// A product term over the variable set: `bits` holds the polarity of
/// each specified position, `mask` marks which positions are specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Implicant {
    bits: u32,
    mask: u32,
}

impl Implicant {
    fn covers(&self, minterm: u32) -> bool {
        (minterm & self.mask) == self.bits
    }
}

/// Prime implicants of the function given by its minterms.
fn prime_implicants(minterms: &[u32], nvars: usize) -> Vec<Implicant> {
    let full_mask = if nvars == 32 { u32::MAX } else { (1u32 << nvars) - 1 };
    let mut current: Vec<Implicant> = minterms
        .iter()
        .map(|m| Implicant {
            bits: *m,
            mask: full_mask,
        })
        .collect();
    current.dedup();

    let mut primes: Vec<Implicant> = Vec::new();
    while !current.is_empty() {
        let mut merged_flags = vec![false; current.len()];
        let mut next: Vec<Implicant> = Vec::new();

        for i in 0..current.len() {
            for j in i + 1..current.len() {
                let (a, b) = (current[i], current[j]);
                if a.mask != b.mask {
                    continue;
                }
                let diff = a.bits ^ b.bits;
                // Mergeable iff they differ in exactly one specified bit.
                if diff.count_ones() == 1 && (diff & a.mask) == diff {
                    let merged = Implicant {
                        bits: a.bits & !diff,
                        mask: a.mask & !diff,
                    };
                    if !next.contains(&merged) {
                        next.push(merged);
                    }
                    merged_flags[i] = true;
                    merged_flags[j] = true;
                }
            }
        }

        for (k, imp) in current.iter().enumerate() {
            if !merged_flags[k] && !primes.contains(imp) {
                primes.push(*imp);
            }
        }
        current = next;
    }
    primes
}

/// Minimal cover: essential prime implicants first, then a greedy cover
/// of what remains.
fn select_cover(primes: &[Implicant], minterms: &[u32]) -> Vec<Implicant> {
    let mut cover: Vec<Implicant> = Vec::new();
    let mut uncovered: Vec<u32> = minterms.to_vec();

    // Essential primes: sole cover of some minterm.
    for m in minterms {
        let covering: SmallVec<[usize; 4]> = primes
            .iter()
            .enumerate()
            .filter(|(_, p)| p.covers(*m))
            .map(|(i, _)| i)
            .collect();
        if let [only] = covering[..] {
            let p = primes[only];
            if !cover.contains(&p) {
                cover.push(p);
                uncovered.retain(|u| !p.covers(*u));
            }
        }
    }

    // Greedy: repeatedly take the prime covering the most of the rest.
    while !uncovered.is_empty() {
        let best = primes
            .iter()
            .filter(|p| !cover.contains(p))
            .max_by_key(|p| uncovered.iter().filter(|u| p.covers(**u)).count());
        match best {
            Some(p) if uncovered.iter().any(|u| p.covers(*u)) => {
                cover.push(*p);
                uncovered.retain(|u| !p.covers(*u));
            }
            _ => break,
        }
    }
    cover
}

/// Renders a product term as an `And` of literals (or `True` when every
/// position is a don't-care). `negate_literals` dualizes for implicates.
fn implicant_to_expr(
    imp: &Implicant,
    vars: &[Arc<str>],
    connective: &str,
    negate_literals: bool,
) -> Expr {
    let mut literals: Vec<Expr> = Vec::new();
    for (k, var) in vars.iter().enumerate() {
        if imp.mask >> k & 1 == 0 {
            continue;
        }
        let positive = (imp.bits >> k & 1 == 1) != negate_literals;
        let atom = Expr::symbol(&**var);
        literals.push(if positive {
            atom
        } else {
            Expr::function("Not", vec![atom])
        });
    }
    match literals.len() {
        0 => Expr::boolean(connective == "And"),
        1 => literals.pop().unwrap(),
        _ => Expr::function(connective, literals),
    }
}

fn terms_to_expr(
    engine: &ComputeEngine,
    terms: Vec<Expr>,
    connective: &str,
    empty: bool,
) -> Expr {
    let out = match terms.len() {
        0 => Expr::boolean(empty),
        1 => terms.into_iter().next().unwrap(),
        _ => Expr::function(connective, terms),
    };
    engine.box_expr(out)
}

/// The function's minterms (or maxterms when `value == false`).
fn terms_of(table: &[bool], value: bool) -> Vec<u32> {
    table
        .iter()
        .enumerate()
        .filter(|(_, v)| **v == value)
        .map(|(i, _)| i as u32)
        .collect()
}

/// Handler for `MinimalDNF`, `MinimalCNF`, `PrimeImplicants` and
/// `PrimeImplicates`. Returns `None` (stays symbolic) above the variable
/// cap or when the operand is not a boolean function.
pub fn eval_minimization(engine: &ComputeEngine, op: &str, arg: &Expr) -> Option<Expr> {
    let vars = extract_variables(arg);
    if vars.len() > QM_CAP {
        return None;
    }
    let table = truth_table(engine, arg)?;

    // For CNF forms, minimize the complement and dualize.
    let cnf = op == "MinimalCNF" || op == "PrimeImplicates";
    let terms = terms_of(&table, !cnf);
    if terms.is_empty() {
        // Constant function.
        return Some(Expr::boolean(cnf));
    }
    if terms.len() == table.len() {
        return Some(Expr::boolean(!cnf));
    }

    let primes = prime_implicants(&terms, vars.len());
    let (inner, outer) = if cnf { ("Or", "And") } else { ("And", "Or") };

    match op {
        "MinimalDNF" | "MinimalCNF" => {
            let cover = select_cover(&primes, &terms);
            let exprs = cover
                .iter()
                .map(|p| implicant_to_expr(p, &vars, inner, cnf))
                .collect();
            Some(terms_to_expr(engine, exprs, outer, cnf))
        }
        "PrimeImplicants" | "PrimeImplicates" => {
            let exprs: Vec<Expr> = primes
                .iter()
                .map(|p| implicant_to_expr(p, &vars, inner, cnf))
                .collect();
            Some(engine.box_expr(Expr::function("List", exprs)))
        }
        _ => None,
    }
}
