//! Wildcard pattern matching.
//!
//! Wildcards are symbols whose name starts with `_`: `_x` captures a
//! single subexpression, `__xs` captures a span of function arguments
//! (materialized as a `Sequence`). A bare `_` or `__` matches without
//! capturing. Captures unify: a second occurrence of `_x` only matches a
//! structurally identical subexpression.

use crate::expr::Expr;
use crate::operators;
use std::collections::HashMap;
use std::sync::Arc;

/// Capture map produced by a successful match.
#[derive(Debug, Clone, Default)]
pub struct Substitution(pub HashMap<Arc<str>, Expr>);

impl Substitution {
    pub fn get(&self, name: &str) -> Option<&Expr> {
        self.0.get(name)
    }

    /// Applies the captures to a replacement template.
    pub fn apply(&self, template: &Expr) -> Expr {
        template.subs(&self.0)
    }

    fn bind(&mut self, name: &Arc<str>, value: &Expr) -> bool {
        // Anonymous wildcards do not capture.
        if &**name == "_" || &**name == "__" {
            return true;
        }
        match self.0.get(name) {
            Some(existing) => existing.is_same(value),
            None => {
                self.0.insert(name.clone(), value.clone());
                true
            }
        }
    }
}

/// Matches `expr` against `pattern`; `None` when they do not unify.
pub fn match_pattern(expr: &Expr, pattern: &Expr) -> Option<Substitution> {
    let mut subst = Substitution::default();
    if match_into(expr, pattern, &mut subst) {
        Some(subst)
    } else {
        None
    }
}

fn match_into(expr: &Expr, pattern: &Expr, subst: &mut Substitution) -> bool {
    if let Some(name) = pattern.symbol_name() {
        if name.starts_with('_') {
            let name: Arc<str> = Arc::from(name);
            return subst.bind(&name, expr);
        }
        return expr.symbol_name() == Some(name);
    }

    match (pattern.operator(), expr.operator()) {
        (Some(pop), Some(eop)) if pop == eop => {
            let commutative =
                operators::is_commutative(pop) && pattern.args().iter().any(has_wildcard);
            if commutative {
                match_args_commutative(expr.args(), pattern.args(), subst)
            } else {
                match_args_sequential(expr.args(), pattern.args(), subst)
            }
        }
        (Some(_), _) => false,
        (None, _) => expr.is_same(pattern),
    }
}

fn has_wildcard(e: &Expr) -> bool {
    if e.is_wildcard() {
        return true;
    }
    e.args().iter().any(has_wildcard)
}

/// Positional matching with sequence-wildcard spans.
fn match_args_sequential(eargs: &[Expr], pargs: &[Expr], subst: &mut Substitution) -> bool {
    match pargs.first() {
        None => eargs.is_empty(),
        Some(p) if p.is_sequence_wildcard() => {
            let name: Arc<str> = Arc::from(p.symbol_name().unwrap());
            // Try spans shortest-first, backtracking on failure.
            for take in 0..=eargs.len() {
                let mut attempt = subst.clone();
                let span = Expr::function("Sequence", eargs[..take].to_vec());
                if attempt.bind(&name, &span)
                    && match_args_sequential(&eargs[take..], &pargs[1..], &mut attempt)
                {
                    *subst = attempt;
                    return true;
                }
            }
            false
        }
        Some(p) => {
            let Some(e) = eargs.first() else { return false };
            let mut attempt = subst.clone();
            if match_into(e, p, &mut attempt)
                && match_args_sequential(&eargs[1..], &pargs[1..], &mut attempt)
            {
                *subst = attempt;
                return true;
            }
            false
        }
    }
}

/// For commutative operators, pattern arguments may match expression
/// arguments in any order. Backtracks over assignments; a trailing
/// sequence wildcard absorbs whatever is left over.
fn match_args_commutative(eargs: &[Expr], pargs: &[Expr], subst: &mut Substitution) -> bool {
    // Guard against factorial blowup on degenerate patterns.
    if eargs.len() > 8 {
        return match_args_sequential(eargs, pargs, subst);
    }
    let mut used = vec![false; eargs.len()];
    match_commutative_rec(eargs, pargs, &mut used, subst)
}

fn match_commutative_rec(
    eargs: &[Expr],
    pargs: &[Expr],
    used: &mut [bool],
    subst: &mut Substitution,
) -> bool {
    match pargs.first() {
        None => used.iter().all(|u| *u),
        Some(p) if p.is_sequence_wildcard() => {
            debug_assert!(pargs.len() == 1, "sequence wildcard must come last");
            let name: Arc<str> = Arc::from(p.symbol_name().unwrap());
            let rest: Vec<Expr> = eargs
                .iter()
                .zip(used.iter())
                .filter(|(_, u)| !**u)
                .map(|(e, _)| e.clone())
                .collect();
            subst.bind(&name, &Expr::function("Sequence", rest))
        }
        Some(p) => {
            for i in 0..eargs.len() {
                if used[i] {
                    continue;
                }
                let mut attempt = subst.clone();
                if match_into(&eargs[i], p, &mut attempt) {
                    used[i] = true;
                    if match_commutative_rec(eargs, &pargs[1..], used, &mut attempt) {
                        *subst = attempt;
                        return true;
                    }
                    used[i] = false;
                }
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(args: Vec<Expr>) -> Expr {
        Expr::function("Add", args)
    }

    #[test]
    fn test_simple_capture() {
        let e = Expr::function("Power", vec![Expr::symbol("x"), Expr::int(2)]);
        let p = Expr::function("Power", vec![Expr::symbol("_base"), Expr::int(2)]);
        let s = match_pattern(&e, &p).unwrap();
        assert!(s.get("_base").unwrap().is_symbol("x"));
    }

    #[test]
    fn test_capture_must_unify() {
        let p = Expr::function("Multiply", vec![Expr::symbol("_a"), Expr::symbol("_a")]);
        let same = Expr::function("Multiply", vec![Expr::symbol("y"), Expr::symbol("y")]);
        assert!(match_pattern(&same, &p).is_some());
        let diff = Expr::function("Multiply", vec![Expr::symbol("y"), Expr::symbol("z")]);
        assert!(match_pattern(&diff, &p).is_none());
    }

    #[test]
    fn test_commutative_reorder() {
        let e = add(vec![Expr::symbol("x"), Expr::int(1)]);
        let p = add(vec![Expr::int(1), Expr::symbol("_t")]);
        let s = match_pattern(&e, &p).unwrap();
        assert!(s.get("_t").unwrap().is_symbol("x"));
    }

    #[test]
    fn test_sequence_wildcard() {
        let e = add(vec![Expr::symbol("x"), Expr::int(1), Expr::int(2)]);
        let p = add(vec![Expr::symbol("x"), Expr::symbol("__rest")]);
        let s = match_pattern(&e, &p).unwrap();
        assert_eq!(s.get("__rest").unwrap().nargs(), 2);
    }

    #[test]
    fn test_anonymous_wildcard_no_capture() {
        let e = Expr::function("Sin", vec![Expr::symbol("x")]);
        let p = Expr::function("Sin", vec![Expr::symbol("_")]);
        let s = match_pattern(&e, &p).unwrap();
        assert!(s.get("_").is_none());
    }

    #[test]
    fn test_apply_substitution() {
        let e = Expr::function("Power", vec![Expr::symbol("y"), Expr::int(2)]);
        let p = Expr::function("Power", vec![Expr::symbol("_x"), Expr::int(2)]);
        let s = match_pattern(&e, &p).unwrap();
        let template = Expr::function("Abs", vec![Expr::symbol("_x")]);
        let out = s.apply(&template);
        assert!(out.arg(0).unwrap().is_symbol("y"));
    }
}
