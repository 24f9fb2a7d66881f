//! Rule families for the simplifier.
//!
//! Each family module exposes handlers of type [`RuleFn`]: given an
//! expression whose operator the dispatcher routed here, a handler
//! returns a rewriting step or `None`. Handlers never invoke the
//! simplifier on their output; the orchestrator drives all descent.

pub mod abs;
pub mod arith;
pub mod divide;
pub mod factorial;
pub mod infinity;
pub mod power;

use crate::engine::ComputeEngine;
use crate::eval::EvalMode;
use crate::expr::Expr;
use crate::logic::eval_connective;
use crate::trig;

/// One candidate rewrite proposed by a rule.
#[derive(Debug, Clone)]
pub struct RuleStep {
    pub value: Expr,
    pub because: &'static str,
}

impl RuleStep {
    pub fn new(value: Expr, because: &'static str) -> Self {
        RuleStep { value, because }
    }
}

pub type RuleFn = fn(&ComputeEngine, &Expr) -> Option<RuleStep>;

/// The dispatcher: operator name to the ordered list of family handlers.
pub fn rules_for(op: &str) -> &'static [RuleFn] {
    match op {
        "Power" => &[
            power::simplify_power,
            infinity::simplify_power_infinity,
            abs::simplify_abs_base_power,
        ],
        "Sqrt" => &[power::simplify_sqrt],
        "Root" => &[power::simplify_root],
        "Abs" => &[abs::simplify_abs],
        "Divide" => &[
            divide::simplify_divide,
            divide::simplify_same_base_quotient,
            infinity::simplify_divide_infinity,
            factorial::simplify_double_factorial_quotient,
        ],
        "Multiply" => &[
            infinity::simplify_multiply_infinity,
            arith::collect_product_powers,
        ],
        "Add" => &[arith::collect_like_terms, factorial::simplify_factorial_sum],
        "Exp" => &[infinity::simplify_exp_infinity],
        "Factorial" | "Factorial2" | "Gamma" | "Binomial" => &[factorial::simplify_combinatoric],
        "And" | "Or" | "Not" | "Implies" | "Equivalent" | "Xor" | "Nand" | "Nor" => {
            &[simplify_connective]
        }
        "Sin" | "Tan" | "Cot" | "Csc" | "Arcsin" | "Arctan" | "Arccot" | "Arccsc" | "Sinh"
        | "Tanh" | "Coth" | "Csch" | "Arsinh" | "Artanh" | "Arcoth" | "Arcsch" => {
            &[simplify_trig]
        }
        "Cos" | "Sec" | "Cosh" | "Sech" => &[simplify_trig, even_function_drops_abs],
        _ => &[],
    }
}

/// Bridges the boolean evaluation reductions (absorption, contradiction,
/// short-circuit) into the rewriting system.
fn simplify_connective(engine: &ComputeEngine, expr: &Expr) -> Option<RuleStep> {
    let op = expr.operator()?;
    let value = eval_connective(engine, op, expr.args())?;
    Some(RuleStep::new(value, "boolean reduction"))
}

/// Bridges exact trigonometric evaluation (constructible values, parity)
/// into the rewriting system.
fn simplify_trig(engine: &ComputeEngine, expr: &Expr) -> Option<RuleStep> {
    let op = expr.operator()?;
    let value = trig::evaluate(engine, op, expr.arg(0)?, EvalMode::Evaluate)?;
    Some(RuleStep::new(value, "trigonometric identity"))
}

/// `f(|x|) → f(x)` for the even functions.
fn even_function_drops_abs(engine: &ComputeEngine, expr: &Expr) -> Option<RuleStep> {
    let op = expr.operator()?;
    let arg = expr.arg(0)?;
    if !arg.is_function_of("Abs") || arg.nargs() != 1 {
        return None;
    }
    let value = engine.box_expr(Expr::function(op, vec![arg.arg(0)?.clone()]));
    Some(RuleStep::new(value, "even function absorbs absolute value"))
}

// ----------------------------------------------------------------------
// Shared sign/shape helpers for the families
// ----------------------------------------------------------------------

use calx_numeric::Sign;

pub(crate) fn sign_of(engine: &ComputeEngine, e: &Expr) -> Option<Sign> {
    crate::eval::expr_sign(engine, e)
}

pub(crate) fn known_nonnegative(engine: &ComputeEngine, e: &Expr) -> bool {
    if matches!(sign_of(engine, e), Some(Sign::Positive | Sign::Zero)) {
        return true;
    }
    // Structural facts that hold even when the operand's sign is open.
    match e.operator() {
        Some("Abs") => true,
        Some("Sqrt") => e
            .arg(0)
            .is_some_and(|inner| known_nonnegative(engine, inner)),
        Some("Power") => e
            .arg(1)
            .and_then(Expr::numeric)
            .and_then(calx_numeric::NumericValue::is_even)
            == Some(true),
        _ => false,
    }
}

pub(crate) fn known_nonpositive(engine: &ComputeEngine, e: &Expr) -> bool {
    matches!(sign_of(engine, e), Some(Sign::Negative | Sign::Zero))
}

pub(crate) fn known_positive(engine: &ComputeEngine, e: &Expr) -> bool {
    matches!(sign_of(engine, e), Some(Sign::Positive))
}

pub(crate) fn known_negative(engine: &ComputeEngine, e: &Expr) -> bool {
    matches!(sign_of(engine, e), Some(Sign::Negative))
}

pub(crate) fn known_zero(engine: &ComputeEngine, e: &Expr) -> bool {
    matches!(sign_of(engine, e), Some(Sign::Zero))
}

pub(crate) fn known_infinite(engine: &ComputeEngine, e: &Expr) -> bool {
    if e.numeric().is_some_and(calx_numeric::NumericValue::is_infinite) {
        return true;
    }
    e.symbol_name()
        .is_some_and(|n| engine.symbol_flags(n).infinity == Some(true))
}

/// Could the expression be zero or infinite? Conservative: only literal
/// values and assumption-backed symbols rule it out; everything else is
/// treated as a generic finite unknown, the way a CAS treats a free
/// variable.
pub(crate) fn generic_nonzero_finite(engine: &ComputeEngine, e: &Expr) -> bool {
    !known_zero(engine, e)
        && !known_infinite(engine, e)
        && !e.numeric().is_some_and(|v| v.is_nan())
}

// Shorthand constructors used throughout the families. Results are raw;
// callers box them.

pub(crate) fn negate(e: Expr) -> Expr {
    Expr::function("Negate", vec![e])
}

pub(crate) fn pow_of(base: Expr, exp: Expr) -> Expr {
    Expr::function("Power", vec![base, exp])
}

pub(crate) fn abs_of(e: Expr) -> Expr {
    Expr::function("Abs", vec![e])
}

pub(crate) fn mul_of(args: Vec<Expr>) -> Expr {
    Expr::function("Multiply", args)
}

pub(crate) fn div_of(n: Expr, d: Expr) -> Expr {
    Expr::function("Divide", vec![n, d])
}

pub(crate) fn sqrt_of(e: Expr) -> Expr {
    Expr::function("Sqrt", vec![e])
}

/// An even power of an absolute value is the plain power: `|x|^k = x^k`
/// for even `k`. Used when moving factors out of even roots.
pub(crate) fn abs_pow(x: Expr, k: i64) -> Expr {
    if k == 1 {
        abs_of(x)
    } else if k % 2 == 0 {
        pow_of(x, Expr::int(k))
    } else {
        pow_of(abs_of(x), Expr::int(k))
    }
}
