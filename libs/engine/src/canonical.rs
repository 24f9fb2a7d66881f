//! Canonicalization.
//!
//! `canonicalize` walks a raw tree bottom-up and produces the canonical
//! form: identifiers validated and bound through the scope chain, number
//! literals normalized, `Sequence` operands spliced, associative operators
//! flattened, commutative operands sorted (complexity descending,
//! structural ascending), idempotent duplicates removed and involutions
//! folded. Arity violations surface as inline `Error` operands, never as
//! panics.
//!
//! Canonicalization folds *exact* numeric literals (`1 - 1` becomes `0`)
//! but never substitutes a symbol's value unless its definition says
//! `holdUntil: never`.

use crate::defs::{Definition, HoldUntil};
use crate::engine::ComputeEngine;
use crate::error::ErrorKind;
use crate::expr::{Expr, ExprKind};
use crate::operators::{self, HoldStrategy};
use crate::order;
use calx_numeric::NumericValue;

/// Canonicalizes a raw expression against the engine's current scope.
pub fn canonicalize(engine: &ComputeEngine, expr: &Expr) -> Expr {
    if expr.is_canonical() {
        return expr.clone();
    }
    match expr.kind() {
        ExprKind::Number(_) | ExprKind::Str(_) => expr.clone().into_canonical(),
        ExprKind::Symbol(name) => canonicalize_symbol(engine, name),
        ExprKind::Function { op, args } => canonicalize_function(engine, op, args),
        ExprKind::Tensor { shape, elems } => {
            let elems = elems.iter().map(|e| canonicalize(engine, e)).collect();
            Expr::tensor(shape.clone(), elems).into_canonical()
        }
        ExprKind::Dict(entries) => {
            let entries = entries
                .iter()
                .map(|(k, v)| (k.clone(), canonicalize(engine, v)))
                .collect();
            Expr::dict(entries).into_canonical()
        }
    }
}

/// Canonicalization for patterns: identical, except that wildcards are
/// (by construction) never auto-bound or reported unknown.
pub fn canonicalize_pattern(engine: &ComputeEngine, pattern: &Expr) -> Expr {
    canonicalize(engine, pattern)
}

/// The identifier grammar: a letter or `_`, then letters, digits or `_`.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn canonicalize_symbol(engine: &ComputeEngine, name: &str) -> Expr {
    if !is_valid_identifier(name) {
        return Expr::error(ErrorKind::InvalidSymbol, Some(Expr::string(name)));
    }

    // Wildcards are pattern placeholders, not bindable identifiers.
    if name.starts_with('_') {
        return Expr::symbol(name).into_canonical();
    }

    // The non-finite literals read as numbers.
    match name {
        "NaN" => return Expr::number(NumericValue::nan()),
        "PositiveInfinity" => return Expr::number(NumericValue::pos_infinity()),
        "NegativeInfinity" => return Expr::number(NumericValue::neg_infinity()),
        _ => {}
    }

    let def = engine.lookup_definition(name);
    match def {
        Some(Definition::Value(v)) => {
            if v.hold_until == HoldUntil::Never {
                if let Some(value) = &v.value {
                    return canonicalize(engine, value);
                }
            }
            Expr::symbol(name).into_canonical()
        }
        Some(Definition::Operator(_)) => Expr::symbol(name).into_canonical(),
        None => {
            if engine.is_strict() {
                return Expr::error(ErrorKind::UnknownSymbol, Some(Expr::string(name)));
            }
            // Auto-bind: install an inferred definition of type unknown
            // so later uses can narrow it.
            let _ = engine.define_symbol(name, crate::defs::ValueDef::inferred_unknown());
            Expr::symbol(name).into_canonical()
        }
    }
}

fn canonicalize_function(engine: &ComputeEngine, op: &str, raw_args: &[Expr]) -> Expr {
    // Inline errors and held content pass through untouched.
    if op == "Error" || op == "Hold" {
        return Expr::function(op, raw_args.to_vec()).into_canonical();
    }

    let meta = operators::metadata(op);
    let holds_all = meta.is_some_and(|m| m.hold == HoldStrategy::All);

    // Bottom-up: canonicalize operands first. Scoped operators (the
    // quantifiers) still canonicalize their operands so domain
    // expressions normalize, but evaluation is what brackets the scope.
    let mut args: Vec<Expr> = if holds_all && meta.is_some_and(|m| m.scoped) {
        raw_args.iter().map(|a| canonicalize(engine, a)).collect()
    } else if holds_all {
        raw_args.to_vec()
    } else {
        raw_args.iter().map(|a| canonicalize(engine, a)).collect()
    };

    // An error operand short-circuits the handler; the expression is
    // rebuilt as-is and is not valid.
    if args.iter().any(Expr::is_error) {
        return Expr::function(op, args).into_canonical();
    }

    // Splice Sequence operands. Only Sequence itself keeps nested
    // sequences (by flattening them as its associativity).
    if op != "Sequence" {
        args = splice_sequences(args);
    }

    // Literal-normalization handlers.
    match op {
        "Rational" => {
            if let Some(v) = fold_rational(&args) {
                return Expr::number(v);
            }
        }
        "Complex" => {
            if let Some(v) = fold_complex(&args) {
                return Expr::number(v);
            }
        }
        "Negate" => {
            if args.len() == 1 {
                if let Some(v) = args[0].numeric() {
                    return Expr::number(v.neg());
                }
            }
        }
        "Subtract" => {
            // a - b is a + (-b) canonically.
            if args.len() == 2 {
                let negated = canonicalize(
                    engine,
                    &Expr::function("Negate", vec![args[1].clone()]),
                );
                return canonicalize_function(engine, "Add", &[args[0].clone(), negated]);
            }
        }
        "Divide" if args.len() == 2 => {
            // Exact nonzero quotients fold to a rational literal; 0/0 and
            // x/0 are left for the rule families to classify.
            if let (Some(n), Some(d)) = (args[0].numeric(), args[1].numeric()) {
                if n.is_exact() && d.is_exact() && !d.is_zero() {
                    return Expr::number(n.div(d));
                }
            }
        }
        _ => {}
    }

    if let Some(m) = meta {
        // Associative operators flatten nested instances of themselves.
        if m.associative {
            args = flatten_associative(op, args);
        }

        // Exact-literal folding for the arithmetic monoids.
        if op == "Add" {
            args = fold_exact_terms(args, NumericValue::zero(), NumericValue::add);
            if args.is_empty() {
                return Expr::int(0);
            }
        } else if op == "Multiply" {
            // A zero factor annihilates the product, unless a non-finite
            // factor makes the form indeterminate.
            let has_non_finite = args
                .iter()
                .any(|a| a.numeric().is_some_and(|v| !v.is_finite()));
            if !has_non_finite
                && args
                    .iter()
                    .any(|a| a.numeric().is_some_and(|v| v.is_exact() && v.is_zero()))
            {
                return Expr::int(0);
            }
            args = fold_exact_terms(args, NumericValue::one(), NumericValue::mul);
            if args.is_empty() {
                return Expr::int(1);
            }
        }

        if m.commutative {
            args.sort_by(order::canonical_cmp);
            // Products read coefficient-first: 5x, not x·5.
            if op == "Multiply" {
                args.sort_by_key(|a| !a.is_number());
            }
        }
        if m.idempotent {
            args.dedup_by(|a, b| a.is_same(b));
        }
        // Involution: a double application cancels.
        if m.involution && args.len() == 1 {
            if let Some(inner) = args[0].operator() {
                if inner == op {
                    return args[0].arg(0).cloned().unwrap_or_else(|| args[0].clone());
                }
            }
        }

        // A one-operand associative monoid is its operand.
        if m.associative && args.len() == 1 && (op == "Add" || op == "Multiply") {
            return args.into_iter().next().unwrap();
        }

        // Arity validation.
        if args.len() < m.min_args {
            args.push(Expr::error(ErrorKind::MissingArgument, None));
        } else if let Some(max) = m.max_args {
            if args.len() > max {
                let offending = args.split_off(max);
                args.push(Expr::error(
                    ErrorKind::UnexpectedArgument,
                    Some(Expr::function("Sequence", offending)),
                ));
            }
        }

        // Use as an argument narrows an inferred symbol's type; strict
        // mode re-validates operand types against the parameter type.
        if let Some(param_ty) = parameter_type(op) {
            for i in 0..args.len() {
                if let Some(name) = args[i].symbol_name() {
                    engine.infer_narrow(name, &param_ty);
                }
                if engine.is_strict() {
                    let arg_ty = crate::eval::type_of(engine, &args[i]);
                    if arg_ty != crate::types::Type::UNKNOWN
                        && !arg_ty.is_subtype_of(&param_ty)
                    {
                        args[i] = Expr::error(
                            ErrorKind::IncompatibleType,
                            Some(args[i].clone()),
                        );
                    }
                }
            }
        }
    } else if let Some(Definition::Operator(def)) = engine.lookup_definition(op) {
        if def.associative {
            args = flatten_associative(op, args);
        }
        if def.commutative {
            args.sort_by(order::canonical_cmp);
        }
        if def.idempotent {
            args.dedup_by(|a, b| a.is_same(b));
        }
        if let Some(handler) = &def.canonical {
            return handler(engine, &args).into_canonical();
        }
    }

    Expr::function(op, args).into_canonical()
}

/// The declared parameter type of a builtin's operands, for the
/// operators whose signature is homogeneous.
fn parameter_type(op: &str) -> Option<crate::types::Type> {
    match op {
        "Add" | "Subtract" | "Negate" | "Multiply" | "Divide" | "Power" | "Root" | "Sqrt"
        | "Abs" | "Exp" | "Ln" | "Log" | "Factorial" | "Factorial2" | "Gamma" | "Binomial"
        | "Sin" | "Cos" | "Tan" | "Cot" | "Sec" | "Csc" | "Arcsin" | "Arccos" | "Arctan"
        | "Arccot" | "Arcsec" | "Arccsc" | "Sinh" | "Cosh" | "Tanh" | "Coth" | "Sech"
        | "Csch" | "Arsinh" | "Artanh" | "Arcoth" | "Arcsch" => Some(crate::types::Type::Literal(
            crate::types::TypeName::ExtendedComplexNumbers,
        )),
        "And" | "Or" | "Not" | "Implies" | "Equivalent" | "Xor" | "Nand" | "Nor" => {
            Some(crate::types::Type::BOOLEANS)
        }
        _ => None,
    }
}

fn splice_sequences(args: Vec<Expr>) -> Vec<Expr> {
    if !args.iter().any(|a| a.is_function_of("Sequence")) {
        return args;
    }
    let mut out = Vec::with_capacity(args.len());
    for a in args {
        if a.is_function_of("Sequence") {
            out.extend(a.args().iter().cloned());
        } else {
            out.push(a);
        }
    }
    out
}

fn flatten_associative(op: &str, args: Vec<Expr>) -> Vec<Expr> {
    if !args.iter().any(|a| a.is_function_of(op)) {
        return args;
    }
    let mut out = Vec::with_capacity(args.len());
    for a in args {
        if a.is_function_of(op) {
            out.extend(a.args().iter().cloned());
        } else {
            out.push(a);
        }
    }
    out
}

/// Folds the exact numeric operands of a commutative monoid into a single
/// literal, dropping the identity element. Machine floats are left alone;
/// approximate folding belongs to evaluation.
fn fold_exact_terms(
    args: Vec<Expr>,
    identity: NumericValue,
    fold: impl Fn(&NumericValue, &NumericValue) -> NumericValue,
) -> Vec<Expr> {
    let exact_count = args
        .iter()
        .filter(|a| a.numeric().is_some_and(NumericValue::is_exact))
        .count();
    if exact_count == 0 {
        return args;
    }

    let mut acc = identity.clone();
    let mut out = Vec::with_capacity(args.len());
    for a in args {
        match a.numeric() {
            Some(v) if v.is_exact() => acc = fold(&acc, v),
            _ => out.push(a),
        }
    }
    if acc != identity || out.is_empty() {
        out.push(Expr::number(acc));
    }
    out
}

fn fold_rational(args: &[Expr]) -> Option<NumericValue> {
    if args.len() != 2 {
        return None;
    }
    let n = args[0].numeric()?.try_to_bigint()?;
    let d = args[1].numeric()?.try_to_bigint()?;
    if d == num_bigint::BigInt::from(0) {
        return Some(NumericValue::nan());
    }
    Some(NumericValue::from_big_rational(
        num_rational::BigRational::new(n, d),
    ))
}

fn fold_complex(args: &[Expr]) -> Option<NumericValue> {
    if args.len() != 2 {
        return None;
    }
    let re = args[0].numeric()?.clone();
    let im = args[1].numeric()?.clone();
    if !re.is_real() || !im.is_real() {
        return None;
    }
    Some(NumericValue::complex(re, im))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> ComputeEngine {
        ComputeEngine::new()
    }

    #[test]
    fn test_canonical_is_fixpoint() {
        let e = engine();
        let expr = e.box_json(&json!(["Add", "x", 1, "y"]));
        assert!(expr.is_canonical());
        let again = e.box_expr(expr.clone());
        assert!(expr.ptr_eq(&again));
    }

    #[test]
    fn test_commutative_sort() {
        let e = engine();
        let expr = e.box_json(&json!(["Add", 7, "x"]));
        assert!(expr.arg(0).unwrap().is_symbol("x"));
        assert!(expr.arg(1).unwrap().is_number());
    }

    #[test]
    fn test_associative_flattening() {
        let e = engine();
        let expr = e.box_json(&json!(["Add", ["Add", "x", "y"], "z"]));
        assert_eq!(expr.nargs(), 3);
        assert!(expr.args().iter().all(|a| !a.is_function_of("Add")));
    }

    #[test]
    fn test_sequence_splicing() {
        let e = engine();
        let expr = e.box_json(&json!(["Add", ["Sequence", "x", "y"], 1]));
        assert_eq!(expr.nargs(), 3);
    }

    #[test]
    fn test_exact_folding() {
        let e = engine();
        let expr = e.box_json(&json!(["Subtract", 1, 1]));
        assert!(expr.numeric().unwrap().is_zero());

        let expr = e.box_json(&json!(["Multiply", "x", 0]));
        assert!(expr.numeric().unwrap().is_zero());

        let expr = e.box_json(&json!(["Add", 1, "x", 2]));
        assert_eq!(expr.nargs(), 2);
    }

    #[test]
    fn test_involution() {
        let e = engine();
        let expr = e.box_json(&json!(["Not", ["Not", "p"]]));
        assert!(expr.is_symbol("p"));
    }

    #[test]
    fn test_idempotent_dedupe() {
        let e = engine();
        let expr = e.box_json(&json!(["And", "p", "p", "q"]));
        assert_eq!(expr.nargs(), 2);
    }

    #[test]
    fn test_rational_literal_folds() {
        let e = engine();
        let expr = e.box_json(&json!(["Rational", 1, 2]));
        let v = expr.numeric().unwrap();
        assert!(v.is_exact());
        assert!(v.eq_num(&NumericValue::from_ratio(1, 2)));
    }

    #[test]
    fn test_invalid_symbol() {
        let e = engine();
        let expr = e.box_json(&json!(["Add", "not valid!", 1]));
        assert!(!expr.is_valid());
    }

    #[test]
    fn test_arity_errors() {
        let e = engine();
        let expr = e.box_json(&json!(["Power", "x"]));
        assert!(!expr.is_valid());
        let expr = e.box_json(&json!(["Power", "x", 1, 2]));
        assert!(!expr.is_valid());
    }

    #[test]
    fn test_infinity_symbols_become_numbers() {
        let e = engine();
        let expr = e.box_json(&json!("PositiveInfinity"));
        assert!(expr.numeric().unwrap().is_infinite());
        let expr = e.box_json(&json!("NaN"));
        assert!(expr.numeric().unwrap().is_nan());
    }

    #[test]
    fn test_strict_unknown_symbol() {
        let e = ComputeEngine::with_options(crate::engine::EngineOptions {
            strict: true,
            ..Default::default()
        })
        .unwrap();
        let expr = e.box_json(&json!("someUnknown"));
        assert!(!expr.is_valid());
    }
}
