//! The evaluation protocol.
//!
//! `evaluate` reduces a canonical expression: operands left-to-right
//! (except held ones), then the operator's handler. Exact operands fold
//! exactly; machine and decimal values follow the numeric promotion
//! table. `EvalMode::N` additionally substitutes `holdUntil: N` values
//! (the constants) and approximates exact non-integers at the engine
//! precision.

use crate::defs::{Definition, HoldUntil};
use crate::engine::{CancellationToken, ComputeEngine};
use crate::error::{ErrorKind, Result};
use crate::expr::{Expr, ExprKind};
use crate::logic;
use crate::operators::{self, HoldStrategy};
use crate::trig;
use crate::types::{Type, TypeName};
use calx_numeric::{
    big_binomial, big_double_factorial, big_factorial, decimal_from_rational, NumericValue, Sign,
};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    Evaluate,
    N,
}

pub fn evaluate(
    engine: &ComputeEngine,
    expr: &Expr,
    mode: EvalMode,
    token: &CancellationToken,
) -> Result<Expr> {
    token.check()?;
    match expr.kind() {
        ExprKind::Number(v) => Ok(if mode == EvalMode::N {
            Expr::number(approximate(engine, v))
        } else {
            expr.clone()
        }),
        ExprKind::Symbol(name) => evaluate_symbol(engine, expr, name, mode, token),
        ExprKind::Str(_) | ExprKind::Dict(_) => Ok(expr.clone()),
        ExprKind::Tensor { .. } => Ok(expr.clone()),
        ExprKind::Function { op, args } => evaluate_function(engine, expr, op, args, mode, token),
    }
}

/// Rounds an exact value to the working precision. Integers stay exact.
fn approximate(engine: &ComputeEngine, v: &NumericValue) -> NumericValue {
    match v {
        NumericValue::Rational(r) if !r.is_integer() => {
            if engine.is_machine_precision() {
                NumericValue::machine(v.to_f64())
            } else {
                match decimal_from_rational(r) {
                    Some(d) => NumericValue::decimal(d),
                    None => NumericValue::machine(v.to_f64()),
                }
            }
        }
        NumericValue::Complex(re, im) => NumericValue::complex(
            approximate(engine, re),
            approximate(engine, im),
        ),
        _ => v.clone(),
    }
}

fn evaluate_symbol(
    engine: &ComputeEngine,
    expr: &Expr,
    name: &str,
    mode: EvalMode,
    token: &CancellationToken,
) -> Result<Expr> {
    // Constants whose numeric value is precision-driven.
    if mode == EvalMode::N {
        if let Some(v) = engine.numeric_constant(name) {
            return Ok(Expr::number(v));
        }
    }

    let Some(Definition::Value(def)) = engine.lookup_definition(name) else {
        return Ok(expr.clone());
    };
    let substitute = match def.hold_until {
        HoldUntil::Never | HoldUntil::Simplify | HoldUntil::Evaluate => true,
        HoldUntil::N => mode == EvalMode::N,
    };
    let Some(value) = def.value.filter(|_| substitute) else {
        return Ok(expr.clone());
    };

    // A value that mentions the symbol it defines cannot resolve.
    {
        let mut resolving = engine.resolving.borrow_mut();
        if resolving.iter().any(|n| &**n == name) {
            return Ok(Expr::error(
                ErrorKind::CyclicDefinition,
                Some(Expr::string(name)),
            ));
        }
        resolving.push(Arc::from(name));
    }
    let out = evaluate(engine, &value, mode, token);
    engine.resolving.borrow_mut().pop();
    out
}

fn evaluate_function(
    engine: &ComputeEngine,
    expr: &Expr,
    op: &str,
    args: &[Expr],
    mode: EvalMode,
    token: &CancellationToken,
) -> Result<Expr> {
    if op == "Error" || op == "Hold" {
        return Ok(expr.clone());
    }
    if args.iter().any(|a| !a.is_valid()) {
        return Ok(expr.clone());
    }

    let hold = operators::metadata(op).map_or(HoldStrategy::None, |m| m.hold);

    // Operand evaluation, left to right, skipping held positions.
    let args: Vec<Expr> = match hold {
        HoldStrategy::All => args.to_vec(),
        HoldStrategy::None => {
            let mut out = Vec::with_capacity(args.len());
            for a in args {
                out.push(evaluate(engine, a, mode, token)?);
            }
            out
        }
        HoldStrategy::First => {
            let mut out = Vec::with_capacity(args.len());
            for (i, a) in args.iter().enumerate() {
                out.push(if i == 0 {
                    a.clone()
                } else {
                    evaluate(engine, a, mode, token)?
                });
            }
            out
        }
        HoldStrategy::Rest => {
            let mut out = Vec::with_capacity(args.len());
            for (i, a) in args.iter().enumerate() {
                out.push(if i == 0 {
                    evaluate(engine, a, mode, token)?
                } else {
                    a.clone()
                });
            }
            out
        }
    };

    if let Some(result) = dispatch(engine, op, &args, mode, token)? {
        return Ok(result);
    }

    // No handler applied: rebuild in canonical form.
    Ok(engine.box_expr(Expr::function(op, args)))
}

/// Operator dispatch. Returns `None` when the operator has no builtin
/// behavior or stays symbolic for these operands.
fn dispatch(
    engine: &ComputeEngine,
    op: &str,
    args: &[Expr],
    mode: EvalMode,
    token: &CancellationToken,
) -> Result<Option<Expr>> {
    if args.is_empty() {
        return Ok(None);
    }
    let out = match op {
        "Add" => fold_numeric_nary(engine, op, args, NumericValue::add),
        "Multiply" => fold_numeric_nary(engine, op, args, NumericValue::mul),
        "Negate" => args.first().and_then(Expr::numeric).map(|v| Expr::number(v.neg())),
        "Divide" => binary_numeric(args, |a, b| a.div(b)),
        "Power" => binary_numeric(args, |a, b| a.pow(b)),
        "Sqrt" => args.first().and_then(Expr::numeric).map(|v| Expr::number(v.sqrt())),
        "Abs" => args.first().and_then(Expr::numeric).map(|v| Expr::number(v.abs())),
        "Root" => binary_numeric(args, |a, n| {
            a.pow(&NumericValue::one().div(n))
        }),
        "Exp" | "Ln" | "Log" => transcendental(engine, op, args, mode),
        "Factorial" | "Factorial2" | "Gamma" | "Binomial" => combinatoric(op, args, mode),
        "Equal" | "NotEqual" | "Less" | "LessEqual" | "Greater" | "GreaterEqual" => {
            comparison(engine, op, args)
        }
        "Element" => element_of(engine, args),
        "And" | "Or" | "Not" | "Implies" | "Equivalent" | "Xor" | "Nand" | "Nor" => {
            logic::eval_connective(engine, op, args)
        }
        "MinimalDNF" | "MinimalCNF" | "PrimeImplicants" | "PrimeImplicates" => {
            logic::minimize::eval_minimization(engine, op, &args[0])
        }
        "Satisfiable" | "Tautology" => logic::truth_table::eval_decision(engine, op, &args[0]),
        "ForAll" | "Exists" | "ExistsUnique" | "NotForAll" | "NotExists" => {
            return logic::quantifier::eval_quantifier(engine, op, args, token).map(Some)
        }
        "Sin" | "Cos" | "Tan" | "Cot" | "Sec" | "Csc" | "Arcsin" | "Arccos" | "Arctan"
        | "Arccot" | "Arcsec" | "Arccsc" | "Sinh" | "Cosh" | "Tanh" | "Coth" | "Sech"
        | "Csch" | "Arsinh" | "Artanh" | "Arcoth" | "Arcsch" => {
            trig::evaluate(engine, op, &args[0], mode)
        }
        _ => {
            // User-defined operators evaluate through their handler.
            if let Some(Definition::Operator(def)) = engine.lookup_definition(op) {
                if let Some(handler) = &def.evaluate {
                    handler(engine, args)
                } else {
                    None
                }
            } else {
                None
            }
        }
    };
    Ok(out.map(|e| {
        if mode == EvalMode::N {
            match e.numeric() {
                Some(v) => Expr::number(approximate(engine, v)),
                None => e,
            }
        } else {
            e
        }
    }))
}

/// Folds the numeric operands of an n-ary arithmetic operator; symbolic
/// operands pass through. Returns `None` when nothing folded.
fn fold_numeric_nary(
    engine: &ComputeEngine,
    op: &str,
    args: &[Expr],
    fold: impl Fn(&NumericValue, &NumericValue) -> NumericValue,
) -> Option<Expr> {
    let numeric_count = args.iter().filter(|a| a.is_number()).count();
    if numeric_count < 2 {
        return None;
    }
    let mut acc: Option<NumericValue> = None;
    let mut rest = Vec::with_capacity(args.len());
    for a in args {
        match a.numeric() {
            Some(v) => {
                acc = Some(match acc {
                    Some(prev) => fold(&prev, v),
                    None => v.clone(),
                });
            }
            None => rest.push(a.clone()),
        }
    }
    let acc = acc.expect("at least two numeric operands");
    if rest.is_empty() {
        return Some(Expr::number(acc));
    }
    rest.push(Expr::number(acc));
    Some(engine.box_expr(Expr::function(op, rest)))
}

fn binary_numeric(
    args: &[Expr],
    f: impl Fn(&NumericValue, &NumericValue) -> NumericValue,
) -> Option<Expr> {
    let a = args.first()?.numeric()?;
    let b = args.get(1)?.numeric()?;
    Some(Expr::number(f(a, b)))
}

fn transcendental(
    engine: &ComputeEngine,
    op: &str,
    args: &[Expr],
    mode: EvalMode,
) -> Option<Expr> {
    let v = args.first()?.numeric()?;

    // Exact special values stay symbolic outside N mode.
    if mode == EvalMode::Evaluate {
        match op {
            "Exp" if v.is_zero() => return Some(Expr::int(1)),
            "Ln" if v.is_one() => return Some(Expr::int(0)),
            "Exp" | "Ln" if v.is_exact() => return None,
            _ => {}
        }
    }

    if v.is_negative() && (op == "Ln" || op == "Log") {
        return Some(Expr::error(ErrorKind::DomainError, Some(args[0].clone())));
    }

    // Decimal backend when the engine precision asks for it.
    if !engine.is_machine_precision() {
        use rust_decimal::MathematicalOps;
        let d = match v {
            NumericValue::Decimal(d) => Some(*d),
            NumericValue::Rational(r) => decimal_from_rational(r),
            _ => None,
        };
        if let Some(d) = d {
            let out = match op {
                "Exp" => d.checked_exp(),
                "Ln" => d.checked_ln(),
                "Log" => {
                    let base = args.get(1).and_then(Expr::numeric);
                    match base {
                        None => d.checked_log10(),
                        Some(b) => match (d.checked_ln(), b.to_f64()) {
                            (Some(ln), bf) if bf > 0.0 => {
                                rust_decimal::Decimal::try_from(bf.ln())
                                    .ok()
                                    .and_then(|lb| ln.checked_div(lb))
                            }
                            _ => None,
                        },
                    }
                }
                _ => None,
            };
            if let Some(out) = out {
                return Some(Expr::number(NumericValue::decimal(out)));
            }
        }
    }

    let x = v.to_f64();
    let out = match op {
        "Exp" => x.exp(),
        "Ln" => x.ln(),
        "Log" => {
            let base = args
                .get(1)
                .and_then(Expr::numeric)
                .map_or(10.0, NumericValue::to_f64);
            x.log(base)
        }
        _ => return None,
    };
    Some(Expr::float(out))
}

pub(crate) fn combinatoric(op: &str, args: &[Expr], mode: EvalMode) -> Option<Expr> {
    let v = args.first()?.numeric()?;
    match op {
        "Factorial" => {
            if let Some(n) = v.try_to_i64() {
                if n < 0 {
                    // Poles of Gamma at the non-positive integers.
                    return Some(Expr::symbol("ComplexInfinity").into_canonical());
                }
                return Some(Expr::number(NumericValue::from_bigint(big_factorial(
                    n as u64,
                ))));
            }
            if mode == EvalMode::N {
                return Some(Expr::float(machine_gamma(v.to_f64() + 1.0)));
            }
            None
        }
        "Factorial2" => {
            let n = v.try_to_i64()?;
            if n < -1 {
                return None;
            }
            Some(Expr::number(NumericValue::from_bigint(
                big_double_factorial(n.max(0) as u64),
            )))
        }
        "Gamma" => {
            if let Some(n) = v.try_to_i64() {
                if n <= 0 {
                    return Some(Expr::symbol("ComplexInfinity").into_canonical());
                }
                return Some(Expr::number(NumericValue::from_bigint(big_factorial(
                    (n - 1) as u64,
                ))));
            }
            if mode == EvalMode::N {
                return Some(Expr::float(machine_gamma(v.to_f64())));
            }
            None
        }
        "Binomial" => {
            let n = v.try_to_i64()?;
            let k = args.get(1)?.numeric()?.try_to_i64()?;
            if n >= 0 && k >= 0 {
                return Some(Expr::number(NumericValue::from_bigint(big_binomial(
                    n as u64, k as u64,
                ))));
            }
            None
        }
        _ => None,
    }
}

/// Lanczos approximation (g = 7, n = 9), good to ~15 significant digits.
fn machine_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_93,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_13,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        // Reflection formula.
        return std::f64::consts::PI / ((std::f64::consts::PI * x).sin() * machine_gamma(1.0 - x));
    }
    let x = x - 1.0;
    let mut acc = COEFFS[0];
    for (i, c) in COEFFS.iter().enumerate().skip(1) {
        acc += c / (x + i as f64);
    }
    let t = x + 7.5;
    (2.0 * std::f64::consts::PI).sqrt() * t.powf(x + 0.5) * (-t).exp() * acc
}

fn comparison(engine: &ComputeEngine, op: &str, args: &[Expr]) -> Option<Expr> {
    let (a, b) = (args.first()?, args.get(1)?);
    let verdict = match op {
        "Equal" => is_equal(engine, a, b),
        "NotEqual" => is_equal(engine, a, b).map(|v| !v),
        "Less" | "LessEqual" | "Greater" | "GreaterEqual" => {
            let (x, y) = if op.starts_with("Greater") { (b, a) } else { (a, b) };
            let le = op.ends_with("Equal");
            order_less(engine, x, y, le)
        }
        _ => None,
    };
    verdict.map(Expr::boolean)
}

fn order_less(engine: &ComputeEngine, a: &Expr, b: &Expr, or_equal: bool) -> Option<bool> {
    if let (Some(x), Some(y)) = (a.numeric(), b.numeric()) {
        return if or_equal { x.le(y) } else { x.lt(y) };
    }
    // Compare a symbol against zero through its known flags.
    if b.numeric().is_some_and(NumericValue::is_zero) {
        if let Some(name) = a.symbol_name() {
            let flags = engine.symbol_flags(name);
            return match (or_equal, flags.negative, flags.non_positive) {
                (false, Some(v), _) => Some(v),
                (true, _, Some(v)) => Some(v),
                _ => None,
            };
        }
    }
    None
}

fn element_of(engine: &ComputeEngine, args: &[Expr]) -> Option<Expr> {
    let (x, domain) = (args.first()?, args.get(1)?);
    match domain.operator() {
        Some("Set") | Some("List") => {
            if !x.is_number() && x.symbol_name().is_none() {
                return None;
            }
            let found = domain
                .args()
                .iter()
                .any(|e| e.is_same(x) || is_equal(engine, e, x) == Some(true));
            Some(Expr::boolean(found))
        }
        _ => match (domain.symbol_name(), x.numeric()) {
            (Some("Integers"), Some(v)) => Some(Expr::boolean(v.is_integer())),
            (Some("RationalNumbers"), Some(v)) => Some(Expr::boolean(v.is_exact())),
            (Some("RealNumbers"), Some(v)) => Some(Expr::boolean(v.is_real())),
            (Some("ComplexNumbers"), Some(v)) => Some(Expr::boolean(!v.is_nan())),
            _ => None,
        },
    }
}

/// Applies a `["Function", body, …params]` lambda: a fresh scope per
/// call keeps the parameter bindings local.
pub fn apply_lambda(engine: &ComputeEngine, lambda: &Expr, args: &[Expr]) -> Option<Expr> {
    if !lambda.is_function_of("Function") || lambda.nargs() == 0 {
        return None;
    }
    let body = lambda.arg(0)?.clone();
    let params: Vec<&str> = lambda.args()[1..]
        .iter()
        .filter_map(Expr::symbol_name)
        .collect();

    let mut bindings: HashMap<Arc<str>, Expr> = HashMap::new();
    for (param, arg) in params.iter().zip(args) {
        bindings.insert(Arc::from(*param), arg.clone());
    }
    Some(engine.with_scope(|e| {
        let substituted = body.subs(&bindings);
        e.evaluate(&substituted)
    }))
}

// ----------------------------------------------------------------------
// Type inference, sign, equality
// ----------------------------------------------------------------------

/// The inferred type of an expression.
pub fn type_of(engine: &ComputeEngine, expr: &Expr) -> Type {
    match expr.kind() {
        ExprKind::Number(v) => {
            if v.is_nan() || v.is_infinite() {
                Type::Literal(TypeName::ExtendedRealNumbers)
            } else if !v.is_real() {
                Type::COMPLEXES
            } else if v.is_integer() {
                Type::INTEGERS
            } else if v.is_exact() {
                Type::RATIONALS
            } else {
                Type::REALS
            }
        }
        ExprKind::Str(_) => Type::STRINGS,
        ExprKind::Symbol(name) => {
            if expr.is_true() || expr.is_false() {
                return Type::BOOLEANS;
            }
            match engine.lookup_definition(name) {
                Some(Definition::Value(v)) => v.ty,
                Some(Definition::Operator(o)) => o.signature,
                None => Type::UNKNOWN,
            }
        }
        ExprKind::Function { op, .. } => {
            if &**op == "Function" {
                return Type::function_of(
                    vec![Type::VarArg(Box::new(Type::ANYTHING))],
                    Type::ANYTHING,
                );
            }
            if let Some(m) = operators::metadata(op) {
                return Type::Literal(m.result);
            }
            match engine.lookup_definition(op) {
                Some(Definition::Operator(o)) => match &o.signature {
                    Type::FunctionOf { result, .. } => (**result).clone(),
                    _ => Type::ANYTHING,
                },
                _ => Type::ANYTHING,
            }
        }
        ExprKind::Tensor { .. } => Type::Literal(TypeName::Lists),
        ExprKind::Dict(_) => Type::Literal(TypeName::Dictionaries),
    }
}

/// Sign of an expression, using literal values, assumptions and the
/// structure of sign-transparent operators.
pub fn expr_sign(engine: &ComputeEngine, expr: &Expr) -> Option<Sign> {
    match expr.kind() {
        ExprKind::Number(v) => v.sign_with_tolerance(engine.tolerance()),
        ExprKind::Symbol(name) => {
            match name as &str {
                "Pi" | "ExponentialE" | "GoldenRatio" | "EulerGamma" | "CatalanConstant" => {
                    return Some(Sign::Positive)
                }
                _ => {}
            }
            let flags = engine.symbol_flags(name);
            if flags.zero == Some(true) {
                Some(Sign::Zero)
            } else if flags.positive == Some(true) {
                Some(Sign::Positive)
            } else if flags.negative == Some(true) {
                Some(Sign::Negative)
            } else {
                None
            }
        }
        ExprKind::Function { op, args } => {
            // A user definition's sgn handler takes precedence.
            if let Some(Definition::Operator(def)) = engine.lookup_definition(op) {
                if let Some(handler) = &def.sgn {
                    if let Some(s) = handler(engine, args) {
                        return Some(s);
                    }
                }
            }
            match &**op {
                "Negate" => expr_sign(engine, args.first()?).map(Sign::flip),
                "Abs" => match expr_sign(engine, args.first()?) {
                    Some(Sign::Zero) => Some(Sign::Zero),
                    Some(_) => Some(Sign::Positive),
                    None => None,
                },
                "Exp" => Some(Sign::Positive),
                "Sqrt" => match expr_sign(engine, args.first()?) {
                    Some(Sign::Positive) => Some(Sign::Positive),
                    Some(Sign::Zero) => Some(Sign::Zero),
                    _ => None,
                },
                "Multiply" => {
                    let mut sign = Sign::Positive;
                    for a in args {
                        match expr_sign(engine, a)? {
                            Sign::Zero => return Some(Sign::Zero),
                            Sign::Negative => sign = sign.flip(),
                            Sign::Positive => {}
                        }
                    }
                    Some(sign)
                }
                "Add" => {
                    let signs: Option<Vec<Sign>> =
                        args.iter().map(|a| expr_sign(engine, a)).collect();
                    let signs = signs?;
                    if signs.iter().all(|s| *s == Sign::Zero) {
                        Some(Sign::Zero)
                    } else if signs.iter().all(|s| !matches!(s, Sign::Negative)) {
                        Some(Sign::Positive)
                    } else if signs.iter().all(|s| !matches!(s, Sign::Positive)) {
                        Some(Sign::Negative)
                    } else {
                        None
                    }
                }
                "Power" => {
                    // An even power of a real is non-negative; positive
                    // base stays positive.
                    let base = expr_sign(engine, args.first()?);
                    let exp = args.get(1)?;
                    match base {
                        Some(Sign::Positive) => Some(Sign::Positive),
                        Some(Sign::Negative) => match exp.numeric().and_then(|v| v.is_even()) {
                            Some(true) => Some(Sign::Positive),
                            Some(false) => Some(Sign::Negative),
                            None => None,
                        },
                        _ => None,
                    }
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Three-valued mathematical equality.
pub fn is_equal(engine: &ComputeEngine, a: &Expr, b: &Expr) -> Option<bool> {
    // Operator-specific eq handlers, tried symmetrically.
    for (x, y) in [(a, b), (b, a)] {
        if let Some(op) = x.operator() {
            if let Some(Definition::Operator(def)) = engine.lookup_definition(op) {
                if let Some(eq) = &def.eq {
                    if let Some(v) = eq(engine, x, y) {
                        return Some(v);
                    }
                }
            }
        }
    }

    if a.is_same(b) {
        return Some(true);
    }
    if let (Some(x), Some(y)) = (a.numeric(), b.numeric()) {
        return Some(x.eq_num(y));
    }

    // Value-ful pure expressions: subtract and compare to zero within
    // tolerance.
    let diff = engine.n(&Expr::function("Subtract", vec![a.clone(), b.clone()]));
    if let Some(v) = diff.numeric() {
        if v.is_nan() {
            return None;
        }
        return Some(v.is_zero_with_tolerance(engine.tolerance()));
    }

    // Symbolic: consult the assumption store, else undecidable.
    let stored = engine.ask(&Expr::function("Equal", vec![a.clone(), b.clone()]));
    if !stored.is_empty() {
        return Some(true);
    }
    let stored = engine.ask(&Expr::function("NotEqual", vec![a.clone(), b.clone()]));
    if !stored.is_empty() {
        return Some(false);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> ComputeEngine {
        ComputeEngine::new()
    }

    #[test]
    fn test_exact_arithmetic() {
        let e = engine();
        let out = e.evaluate(&e.box_json(&json!(["Add", 1, 2, 3])));
        assert_eq!(out.as_i64(), Some(6));
        let out = e.evaluate(&e.box_json(&json!(["Divide", 1, 3])));
        assert!(out.numeric().unwrap().is_exact());
    }

    #[test]
    fn test_indeterminate_forms() {
        let e = engine();
        let zero_pow_zero = e.evaluate(&e.box_json(&json!(["Power", 0, 0])));
        assert!(zero_pow_zero.numeric().unwrap().is_nan());

        let inf_by_inf = e.evaluate(&e.box_json(&json!([
            "Divide", "PositiveInfinity", "PositiveInfinity"
        ])));
        assert!(inf_by_inf.numeric().unwrap().is_nan());

        let zero_times_inf =
            e.evaluate(&e.box_json(&json!(["Multiply", 0.0, "PositiveInfinity"])));
        assert!(zero_times_inf.numeric().unwrap().is_nan());
    }

    #[test]
    fn test_symbol_substitution() {
        let e = engine();
        e.assign("x", Expr::int(4)).unwrap();
        let out = e.evaluate(&e.box_json(&json!(["Multiply", "x", 3])));
        assert_eq!(out.as_i64(), Some(12));
    }

    #[test]
    fn test_constants_hold_until_n() {
        let e = engine();
        let sym = e.evaluate(&e.box_json(&json!("Pi")));
        assert!(sym.is_symbol("Pi"));
        let num = e.n(&e.box_json(&json!("Pi")));
        assert!((num.numeric().unwrap().to_f64() - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn test_cyclic_definition() {
        let e = engine();
        e.assign("a", Expr::symbol("b")).unwrap();
        e.assign("b", Expr::function("Add", vec![Expr::symbol("a"), Expr::int(1)]))
            .unwrap();
        let out = e.evaluate(&e.box_json(&json!("a")));
        assert!(!out.is_valid());
    }

    #[test]
    fn test_gamma_factorial_range() {
        let e = engine();
        let g5 = e.evaluate(&e.box_json(&json!(["Gamma", 5])));
        assert_eq!(g5.as_i64(), Some(24));

        // Gamma(171) = 170!: exact, not an overflow.
        let g171 = e.evaluate(&e.box_json(&json!(["Gamma", 171])));
        let v = g171.numeric().unwrap();
        assert!(v.is_exact() && v.is_finite());

        let gamma_pole = e.evaluate(&e.box_json(&json!(["Gamma", 0])));
        assert!(gamma_pole.is_symbol("ComplexInfinity"));
    }

    #[test]
    fn test_machine_gamma_half() {
        // Gamma(1/2) = sqrt(pi)
        let v = machine_gamma(0.5);
        assert!((v - std::f64::consts::PI.sqrt()).abs() < 1e-10);
    }

    #[test]
    fn test_comparisons() {
        let e = engine();
        assert!(e.evaluate(&e.box_json(&json!(["Less", 1, 2]))).is_true());
        assert!(e
            .evaluate(&e.box_json(&json!(["GreaterEqual", 2, 2])))
            .is_true());
        assert!(e
            .evaluate(&e.box_json(&json!(["Equal", ["Rational", 1, 2], 0.5])))
            .is_true());
    }

    #[test]
    fn test_comparison_via_assumption() {
        let e = engine();
        e.assume(&Expr::function(
            "Greater",
            vec![Expr::symbol("x"), Expr::int(0)],
        ))
        .unwrap();
        let out = e.evaluate(&e.box_json(&json!(["Less", "x", 0])));
        assert!(out.is_false());
    }

    #[test]
    fn test_element_of_set() {
        let e = engine();
        assert!(e
            .evaluate(&e.box_json(&json!(["Element", 2, ["Set", 1, 2, 3]])))
            .is_true());
        assert!(e
            .evaluate(&e.box_json(&json!(["Element", 5, ["Set", 1, 2, 3]])))
            .is_false());
    }

    #[test]
    fn test_lambda_application() {
        let e = engine();
        e.assign(
            "double",
            Expr::function(
                "Function",
                vec![
                    Expr::function("Multiply", vec![Expr::int(2), Expr::symbol("t")]),
                    Expr::symbol("t"),
                ],
            ),
        )
        .unwrap();
        let out = e.evaluate(&e.box_json(&json!(["double", 21])));
        assert_eq!(out.as_i64(), Some(42));
    }

    #[test]
    fn test_type_inference() {
        let e = engine();
        assert_eq!(type_of(&e, &e.box_json(&json!(3))), Type::INTEGERS);
        assert_eq!(
            type_of(&e, &e.box_json(&json!(["Rational", 1, 2]))),
            Type::RATIONALS
        );
        assert_eq!(type_of(&e, &e.box_json(&json!("True"))), Type::BOOLEANS);
    }

    #[test]
    fn test_sign_propagation() {
        let e = engine();
        e.assume(&Expr::function(
            "Greater",
            vec![Expr::symbol("p"), Expr::int(0)],
        ))
        .unwrap();
        let sq = e.box_json(&json!(["Multiply", "p", "p"]));
        assert_eq!(expr_sign(&e, &sq), Some(Sign::Positive));
        let neg = e.box_json(&json!(["Negate", "p"]));
        assert_eq!(expr_sign(&e, &neg), Some(Sign::Negative));
    }
}
