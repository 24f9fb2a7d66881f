//! The Factorial / Gamma / Binomial family.
//!
//! Concrete arguments fold through the exact big-integer backends; the
//! symbolic rules translate Gamma into factorials, expand double
//! factorials of even symbolic arguments, collapse the trivial binomial
//! shapes, and factor sums of factorials with nearby offsets.

use super::{mul_of, pow_of, RuleStep};
use crate::engine::ComputeEngine;
use crate::eval::{combinatoric, EvalMode};
use crate::expr::Expr;
use calx_numeric::NumericValue;

/// Maximum offset between factorial arguments that the Add family will
/// bridge with a product of consecutive terms.
const MAX_FACTORIAL_OFFSET: i64 = 8;

pub fn simplify_combinatoric(engine: &ComputeEngine, expr: &Expr) -> Option<RuleStep> {
    let op = expr.operator()?;
    let args = expr.args();

    // Concrete arguments reduce through the exact evaluators.
    if let Some(value) = combinatoric(op, args, EvalMode::Evaluate) {
        return Some(RuleStep::new(value, "exact combinatoric value"));
    }

    match op {
        "Gamma" => simplify_gamma(engine, args.first()?),
        "Factorial2" => simplify_double_factorial(engine, args.first()?),
        "Binomial" => simplify_binomial(engine, args),
        _ => None,
    }
}

/// The integer offset `a - b` when it is structurally apparent: equal
/// expressions, a literal difference, or `a = Add(b, c)` with literal
/// `c`.
fn offset_of(a: &Expr, b: &Expr) -> Option<i64> {
    if a.is_same(b) {
        return Some(0);
    }
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x.checked_sub(y);
    }
    if let Some((core, c)) = split_offset(a) {
        if core.is_same(b) {
            return Some(c);
        }
        if let Some((other_core, d)) = split_offset(b) {
            if core.is_same(&other_core) {
                return c.checked_sub(d);
            }
        }
    }
    if let Some((core, c)) = split_offset(b) {
        if core.is_same(a) {
            return Some(-c);
        }
    }
    None
}

/// Splits `Add(core…, literal)` into the symbolic core and the literal.
fn split_offset(e: &Expr) -> Option<(Expr, i64)> {
    if !e.is_function_of("Add") {
        return None;
    }
    let mut constant: Option<i64> = None;
    let mut rest: Vec<Expr> = Vec::new();
    for t in e.args() {
        match t.as_i64() {
            Some(c) if constant.is_none() => constant = Some(c),
            _ => rest.push(t.clone()),
        }
    }
    let constant = constant?;
    let core = match rest.len() {
        0 => return None,
        1 => rest.pop().unwrap(),
        _ => Expr::function("Add", rest),
    };
    Some((core, constant))
}

fn add_offset(engine: &ComputeEngine, core: &Expr, offset: i64) -> Expr {
    if offset == 0 {
        return core.clone();
    }
    engine.box_expr(Expr::function(
        "Add",
        vec![core.clone(), Expr::int(offset)],
    ))
}

fn symbolic_integer(engine: &ComputeEngine, e: &Expr) -> bool {
    e.symbol_name()
        .is_some_and(|n| engine.symbol_flags(n).integer == Some(true))
}

fn symbolic_positive_integer(engine: &ComputeEngine, e: &Expr) -> bool {
    e.symbol_name().is_some_and(|n| {
        let flags = engine.symbol_flags(n);
        flags.integer == Some(true) && flags.positive == Some(true)
    })
}

fn simplify_gamma(engine: &ComputeEngine, arg: &Expr) -> Option<RuleStep> {
    // Gamma(n+1) → n! for a symbolic integer n.
    if let Some((core, 1)) = split_offset(arg) {
        if symbolic_integer(engine, &core) {
            return Some(RuleStep::new(
                engine.box_expr(Expr::function("Factorial", vec![core])),
                "Gamma(n+1) = n!",
            ));
        }
    }
    // Gamma(n) → (n-1)! for a symbolic positive integer n.
    if symbolic_positive_integer(engine, arg) {
        let shifted = add_offset(engine, arg, -1);
        return Some(RuleStep::new(
            engine.box_expr(Expr::function("Factorial", vec![shifted])),
            "Gamma(n) = (n-1)!",
        ));
    }
    None
}

fn simplify_double_factorial(engine: &ComputeEngine, arg: &Expr) -> Option<RuleStep> {
    // (2n)!! → 2^n · n! for a symbolic integer n.
    if !arg.is_function_of("Multiply") || arg.nargs() != 2 {
        return None;
    }
    let (a, b) = (arg.arg(0)?, arg.arg(1)?);
    let (two, n) = if a.as_i64() == Some(2) { (a, b) } else { (b, a) };
    if two.as_i64() != Some(2) || !symbolic_integer(engine, n) {
        return None;
    }
    let out = mul_of(vec![
        pow_of(Expr::int(2), n.clone()),
        Expr::function("Factorial", vec![n.clone()]),
    ]);
    Some(RuleStep::new(
        engine.box_expr(out),
        "(2n)!! = 2^n·n!",
    ))
}

fn simplify_binomial(engine: &ComputeEngine, args: &[Expr]) -> Option<RuleStep> {
    let n = args.first()?;
    let k = args.get(1)?;
    if k.as_i64() == Some(0) {
        return Some(RuleStep::new(Expr::int(1), "C(n,0) = 1"));
    }
    if k.as_i64() == Some(1) {
        return Some(RuleStep::new(n.clone(), "C(n,1) = n"));
    }
    match offset_of(n, k) {
        Some(0) => Some(RuleStep::new(Expr::int(1), "C(n,n) = 1")),
        Some(1) => Some(RuleStep::new(n.clone(), "C(n,n-1) = n")),
        _ => {
            let _ = engine;
            None
        }
    }
}

/// Under `Divide`: `n!!/k!!` for concrete integers of the same parity is
/// the partial product with step two.
pub fn simplify_double_factorial_quotient(
    engine: &ComputeEngine,
    expr: &Expr,
) -> Option<RuleStep> {
    let _ = engine;
    let num = expr.arg(0)?;
    let den = expr.arg(1)?;
    if !num.is_function_of("Factorial2") || !den.is_function_of("Factorial2") {
        return None;
    }
    let a = num.arg(0)?.as_i64()?;
    let b = den.arg(0)?.as_i64()?;
    if a < b || a < 0 || b < 0 || (a - b) % 2 != 0 {
        return None;
    }
    let mut acc = NumericValue::one();
    let mut k = b + 2;
    while k <= a {
        acc = acc.mul(&NumericValue::from_i64(k));
        k += 2;
    }
    Some(RuleStep::new(
        Expr::number(acc),
        "n!!/k!! partial product",
    ))
}

/// Under `Add`: factorials of a shared symbolic base with small positive
/// offsets factor out the smallest one.
pub fn simplify_factorial_sum(engine: &ComputeEngine, expr: &Expr) -> Option<RuleStep> {
    // Collect (term index, core, offset) for factorial terms.
    let mut factorials: Vec<(usize, Expr, i64)> = Vec::new();
    for (i, term) in expr.args().iter().enumerate() {
        if !term.is_function_of("Factorial") || term.nargs() != 1 {
            continue;
        }
        let arg = term.arg(0).unwrap();
        if arg.is_number() {
            continue;
        }
        let (core, offset) = split_offset(arg).unwrap_or((arg.clone(), 0));
        factorials.push((i, core, offset));
    }
    if factorials.len() < 2 {
        return None;
    }

    // Use the first group sharing a core.
    let (_, base_core, _) = factorials[0].clone();
    let group: Vec<&(usize, Expr, i64)> = factorials
        .iter()
        .filter(|(_, core, _)| core.is_same(&base_core))
        .collect();
    if group.len() < 2 {
        return None;
    }
    let min_offset = group.iter().map(|(_, _, o)| *o).min().unwrap();
    if group
        .iter()
        .any(|(_, _, o)| *o - min_offset > MAX_FACTORIAL_OFFSET)
    {
        return None;
    }

    // (x+o)! = (x+min)! · ∏_{j=min+1..=o} (x+j)
    let grouped_indices: Vec<usize> = group.iter().map(|(i, _, _)| *i).collect();
    let mut cofactors: Vec<Expr> = Vec::new();
    for (_, _, offset) in &group {
        let mut product: Vec<Expr> = Vec::new();
        for j in (min_offset + 1)..=*offset {
            product.push(add_offset(engine, &base_core, j));
        }
        cofactors.push(match product.len() {
            0 => Expr::int(1),
            1 => product.pop().unwrap(),
            _ => mul_of(product),
        });
    }

    let factored = mul_of(vec![
        Expr::function(
            "Factorial",
            vec![add_offset(engine, &base_core, min_offset)],
        ),
        Expr::function("Add", cofactors),
    ]);

    // Keep the non-factorial (and other-base) terms.
    let mut terms: Vec<Expr> = vec![factored];
    for (i, term) in expr.args().iter().enumerate() {
        if !grouped_indices.contains(&i) {
            terms.push(term.clone());
        }
    }
    let out = if terms.len() == 1 {
        terms.pop().unwrap()
    } else {
        Expr::function("Add", terms)
    };
    Some(RuleStep::new(
        engine.box_expr(out),
        "factor the smallest factorial out of the sum",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::NumericFlags;
    use serde_json::json;

    fn engine() -> ComputeEngine {
        ComputeEngine::new()
    }

    fn engine_with_integer(name: &str, positive: bool) -> ComputeEngine {
        let e = engine();
        let flags = NumericFlags {
            integer: Some(true),
            positive: if positive { Some(true) } else { None },
            ..Default::default()
        };
        e.define_symbol(
            name,
            crate::defs::ValueDef::new(crate::types::Type::INTEGERS).with_flags(flags),
        )
        .unwrap();
        e
    }

    #[test]
    fn test_binomial_shapes() {
        let e = engine();
        let out = e.simplify(&e.box_json(&json!(["Binomial", "n", 0])));
        assert_eq!(out.as_i64(), Some(1));
        let out = e.simplify(&e.box_json(&json!(["Binomial", "n", 1])));
        assert!(out.is_symbol("n"));
        let out = e.simplify(&e.box_json(&json!(["Binomial", "n", "n"])));
        assert_eq!(out.as_i64(), Some(1));
        let out = e.simplify(&e.box_json(&json!([
            "Binomial", "n", ["Add", "n", -1]
        ])));
        assert!(out.is_symbol("n"), "got {out}");
    }

    #[test]
    fn test_concrete_binomial() {
        let e = engine();
        let out = e.simplify(&e.box_json(&json!(["Binomial", 10, 3])));
        assert_eq!(out.as_i64(), Some(120));
    }

    #[test]
    fn test_gamma_of_symbolic_integer() {
        let e = engine_with_integer("n", false);
        let out = e.simplify(&e.box_json(&json!(["Gamma", ["Add", "n", 1]])));
        assert!(out.is_function_of("Factorial"), "got {out}");
        assert!(out.arg(0).unwrap().is_symbol("n"));

        let e = engine_with_integer("m", true);
        let out = e.simplify(&e.box_json(&json!(["Gamma", "m"])));
        assert!(out.is_function_of("Factorial"), "got {out}");
    }

    #[test]
    fn test_gamma_concrete() {
        let e = engine();
        let out = e.simplify(&e.box_json(&json!(["Gamma", 6])));
        assert_eq!(out.as_i64(), Some(120));
        let out = e.simplify(&e.box_json(&json!(["Gamma", 1])));
        assert_eq!(out.as_i64(), Some(1));
    }

    #[test]
    fn test_double_factorial() {
        let e = engine();
        let out = e.simplify(&e.box_json(&json!(["Factorial2", 0])));
        assert_eq!(out.as_i64(), Some(1));
        let out = e.simplify(&e.box_json(&json!(["Factorial2", 7])));
        assert_eq!(out.as_i64(), Some(105));

        let e = engine_with_integer("n", false);
        let out = e.simplify(&e.box_json(&json!(["Factorial2", ["Multiply", 2, "n"]])));
        assert!(out.is_function_of("Multiply"), "got {out}");
    }

    #[test]
    fn test_double_factorial_quotient() {
        let e = engine();
        // 9!!/5!! = 7·9 = 63.
        let out = e.simplify(&e.box_json(&json!([
            "Divide", ["Factorial2", 9], ["Factorial2", 5]
        ])));
        assert_eq!(out.as_i64(), Some(63));
        // Mixed parity stays.
        let out = e.simplify(&e.box_json(&json!([
            "Divide", ["Factorial2", 8], ["Factorial2", 5]
        ])));
        assert!(!out.is_number());
    }

    #[test]
    fn test_factorial_sum_factoring() {
        let e = engine();
        // n! + (n+1)! = n!·(n+2)
        let out = e.simplify(&e.box_json(&json!([
            "Add", ["Factorial", "n"], ["Factorial", ["Add", "n", 1]]
        ])));
        assert!(out.is_function_of("Multiply"), "got {out}");
        let rendered = format!("{out}");
        assert!(rendered.contains("Factorial(n)"), "got {rendered}");
    }

    #[test]
    fn test_factorial_sum_offset_cap() {
        let e = engine();
        let out = e.simplify(&e.box_json(&json!([
            "Add", ["Factorial", "n"], ["Factorial", ["Add", "n", 9]]
        ])));
        assert!(out.is_function_of("Add"), "got {out}");
    }
}
