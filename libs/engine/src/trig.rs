//! Trigonometry.
//!
//! Exact evaluation at the constructible angles (the multiples of π/12,
//! π/10 and π/8 families), quadrant reduction with the per-function sign
//! table, an inverse-trig lookup built by inverting the forward table
//! once, and precision-aware numeric backends for everything else.
//!
//! Plain numeric arguments are interpreted in the engine's configured
//! angular unit; π-multiple arguments are always radians.

use crate::engine::{AngularUnit, ComputeEngine};
use crate::eval::EvalMode;
use crate::expr::{Expr, ExprKind};
use calx_numeric::NumericValue;
use num_bigint::BigInt;
use num_complex::Complex64;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use once_cell::sync::Lazy;
use rust_decimal::{Decimal, MathematicalOps};

/// The constructible angles, as numerator/denominator of their ratio to
/// π, covering `[0, π/2]`. The list is symmetric about π/4, so the
/// complement of entry `i` is entry `LEN - 1 - i`.
const ANGLES: [(i64, i64); 13] = [
    (0, 1),
    (1, 12),
    (1, 10),
    (1, 8),
    (1, 6),
    (1, 5),
    (1, 4),
    (3, 10),
    (1, 3),
    (3, 8),
    (2, 5),
    (5, 12),
    (1, 2),
];

// Small raw-expression builders for the table entries.

fn int(n: i64) -> Expr {
    Expr::int(n)
}

fn rat(n: i64, d: i64) -> Expr {
    Expr::rational(n, d)
}

fn sqrt(e: Expr) -> Expr {
    Expr::function("Sqrt", vec![e])
}

fn sqrt_i(n: i64) -> Expr {
    sqrt(int(n))
}

fn add(a: Expr, b: Expr) -> Expr {
    Expr::function("Add", vec![a, b])
}

fn sub(a: Expr, b: Expr) -> Expr {
    Expr::function("Subtract", vec![a, b])
}

fn mul(a: Expr, b: Expr) -> Expr {
    Expr::function("Multiply", vec![a, b])
}

fn cinf() -> Expr {
    Expr::symbol("ComplexInfinity")
}

/// Exact values of Sin at [`ANGLES`].
static SIN_TABLE: Lazy<[Expr; 13]> = Lazy::new(|| {
    [
        int(0),
        mul(rat(1, 4), sub(sqrt_i(6), sqrt_i(2))),
        mul(rat(1, 4), sub(sqrt_i(5), int(1))),
        mul(rat(1, 2), sqrt(sub(int(2), sqrt_i(2)))),
        rat(1, 2),
        mul(rat(1, 4), sqrt(sub(int(10), mul(int(2), sqrt_i(5))))),
        mul(rat(1, 2), sqrt_i(2)),
        mul(rat(1, 4), add(sqrt_i(5), int(1))),
        mul(rat(1, 2), sqrt_i(3)),
        mul(rat(1, 2), sqrt(add(int(2), sqrt_i(2)))),
        mul(rat(1, 4), sqrt(add(int(10), mul(int(2), sqrt_i(5))))),
        mul(rat(1, 4), add(sqrt_i(6), sqrt_i(2))),
        int(1),
    ]
});

/// Exact values of Tan at [`ANGLES`]; the last entry is the pole.
static TAN_TABLE: Lazy<[Expr; 13]> = Lazy::new(|| {
    [
        int(0),
        sub(int(2), sqrt_i(3)),
        mul(rat(1, 5), sqrt(sub(int(25), mul(int(10), sqrt_i(5))))),
        sub(sqrt_i(2), int(1)),
        mul(rat(1, 3), sqrt_i(3)),
        sqrt(sub(int(5), mul(int(2), sqrt_i(5)))),
        int(1),
        mul(rat(1, 5), sqrt(add(int(25), mul(int(10), sqrt_i(5))))),
        sqrt_i(3),
        add(sqrt_i(2), int(1)),
        sqrt(add(int(5), mul(int(2), sqrt_i(5)))),
        add(int(2), sqrt_i(3)),
        cinf(),
    ]
});

/// Exact values of Csc at [`ANGLES`]; the first entry is the pole.
static CSC_TABLE: Lazy<[Expr; 13]> = Lazy::new(|| {
    [
        cinf(),
        add(sqrt_i(6), sqrt_i(2)),
        add(sqrt_i(5), int(1)),
        sqrt(add(int(4), mul(int(2), sqrt_i(2)))),
        int(2),
        mul(rat(1, 5), sqrt(add(int(50), mul(int(10), sqrt_i(5))))),
        sqrt_i(2),
        sub(sqrt_i(5), int(1)),
        mul(rat(2, 3), sqrt_i(3)),
        sqrt(sub(int(4), mul(int(2), sqrt_i(2)))),
        mul(rat(1, 5), sqrt(sub(int(50), mul(int(10), sqrt_i(5))))),
        sub(sqrt_i(6), sqrt_i(2)),
        int(1),
    ]
});

/// The forward table entry for a function at angle index `i`, using the
/// complement symmetry for the cofunctions.
fn table_value(op: &str, i: usize) -> Option<Expr> {
    let j = ANGLES.len() - 1 - i;
    let e = match op {
        "Sin" => SIN_TABLE[i].clone(),
        "Cos" => SIN_TABLE[j].clone(),
        "Tan" => TAN_TABLE[i].clone(),
        "Cot" => TAN_TABLE[j].clone(),
        "Csc" => CSC_TABLE[i].clone(),
        "Sec" => CSC_TABLE[j].clone(),
        _ => return None,
    };
    Some(e)
}

/// Numeric value of a (pure numeric) table entry, without an engine.
fn numeric_of(e: &Expr) -> f64 {
    match e.kind() {
        ExprKind::Number(v) => v.to_f64(),
        ExprKind::Symbol(_) => f64::INFINITY, // ComplexInfinity pole
        ExprKind::Function { op, args } => match &**op {
            "Sqrt" => numeric_of(&args[0]).sqrt(),
            "Add" => args.iter().map(numeric_of).sum(),
            "Subtract" => numeric_of(&args[0]) - numeric_of(&args[1]),
            "Multiply" => args.iter().map(numeric_of).product(),
            "Negate" => -numeric_of(&args[0]),
            _ => f64::NAN,
        },
        _ => f64::NAN,
    }
}

/// The inverse table: (numeric sine value, angle index), built once by
/// inverting the forward table.
static INVERSE_SIN: Lazy<Vec<(f64, usize)>> = Lazy::new(|| {
    SIN_TABLE
        .iter()
        .enumerate()
        .map(|(i, e)| (numeric_of(e), i))
        .collect()
});

static INVERSE_TAN: Lazy<Vec<(f64, usize)>> = Lazy::new(|| {
    TAN_TABLE
        .iter()
        .enumerate()
        .map(|(i, e)| (numeric_of(e), i))
        .collect()
});

const INVERSE_TOLERANCE: f64 = 1e-12;

/// An angle expression `π·p/q` in canonical building blocks.
fn angle_expr(ratio: &BigRational) -> Expr {
    if ratio.is_zero() {
        return int(0);
    }
    if ratio.is_one() {
        return Expr::symbol("Pi");
    }
    mul(
        Expr::number(NumericValue::from_big_rational(ratio.clone())),
        Expr::symbol("Pi"),
    )
}

// ----------------------------------------------------------------------
// Angle extraction and reduction
// ----------------------------------------------------------------------

/// Extracts the exact ratio `θ/π` from a canonical argument. Plain exact
/// numbers are interpreted in the configured angular unit.
fn pi_ratio(engine: &ComputeEngine, arg: &Expr) -> Option<BigRational> {
    if arg.is_symbol("Pi") {
        return Some(BigRational::one());
    }
    if let Some(v) = arg.numeric() {
        let r = v.try_to_rational()?;
        // In radians only zero is an exact π-multiple.
        return match engine.angular_unit() {
            AngularUnit::Radians => r.is_zero().then(BigRational::zero),
            AngularUnit::Degrees => Some(r / BigInt::from(180)),
            AngularUnit::Gradians => Some(r / BigInt::from(200)),
            AngularUnit::Turns => Some(r * BigInt::from(2)),
        };
    }
    match arg.operator() {
        Some("Multiply") if arg.nargs() == 2 => {
            let (a, b) = (arg.arg(0)?, arg.arg(1)?);
            let (pi, num) = if a.is_symbol("Pi") { (a, b) } else { (b, a) };
            if !pi.is_symbol("Pi") {
                return None;
            }
            num.numeric()?.try_to_rational()
        }
        Some("Divide") if arg.nargs() == 2 => {
            if !arg.arg(0)?.is_symbol("Pi") {
                return None;
            }
            let d = arg.arg(1)?.numeric()?.try_to_rational()?;
            if d.is_zero() {
                return None;
            }
            Some(d.recip())
        }
        _ => None,
    }
}

/// Reduces a ratio to `[0, 2)` (one period) by subtracting the integer
/// multiple of 2.
fn reduce_period(ratio: &BigRational) -> BigRational {
    let two = BigRational::from_integer(BigInt::from(2));
    let turns = (ratio / &two).floor();
    ratio - turns * two
}

/// Quadrant reduction: maps a ratio in `[0, 2)` to a reference index into
/// [`ANGLES`] plus the sign of the given function in that quadrant.
/// The cofunction column of the classical table is realized through the
/// complement symmetry inside [`table_value`].
fn quadrant_reduce(op: &str, t: &BigRational) -> Option<(usize, bool)> {
    let one = BigRational::one();
    let half = BigRational::new(BigInt::from(1), BigInt::from(2));
    let three_half = BigRational::new(BigInt::from(3), BigInt::from(2));
    let two = BigRational::from_integer(BigInt::from(2));

    let (reference, quadrant) = if *t <= half {
        (t.clone(), 1u8)
    } else if *t <= one {
        (&one - t, 2)
    } else if *t <= three_half {
        (t - &one, 3)
    } else {
        (&two - t, 4)
    };

    let negative = match quadrant {
        1 => false,
        2 => !matches!(op, "Sin" | "Csc"),
        3 => !matches!(op, "Tan" | "Cot"),
        4 => !matches!(op, "Cos" | "Sec"),
        _ => unreachable!(),
    };

    let index = ANGLES
        .iter()
        .position(|(p, q)| reference == BigRational::new(BigInt::from(*p), BigInt::from(*q)))?;
    Some((index, negative))
}

// ----------------------------------------------------------------------
// Evaluation
// ----------------------------------------------------------------------

const ODD_FUNCTIONS: [&str; 16] = [
    "Sin", "Tan", "Cot", "Csc", "Arcsin", "Arctan", "Arccot", "Arccsc", "Sinh", "Tanh",
    "Coth", "Csch", "Arsinh", "Artanh", "Arcoth", "Arcsch",
];
const EVEN_FUNCTIONS: [&str; 4] = ["Cos", "Sec", "Cosh", "Sech"];

pub fn is_odd_function(op: &str) -> bool {
    ODD_FUNCTIONS.contains(&op)
}

pub fn is_even_function(op: &str) -> bool {
    EVEN_FUNCTIONS.contains(&op)
}

/// Evaluation handler for the trigonometric, inverse-trigonometric and
/// hyperbolic operators. Returns `None` to stay symbolic.
pub fn evaluate(engine: &ComputeEngine, op: &str, arg: &Expr, mode: EvalMode) -> Option<Expr> {
    // Parity identities on symbolic negations.
    if arg.is_function_of("Negate") && arg.nargs() == 1 {
        let inner = arg.arg(0).unwrap();
        let applied = evaluate(engine, op, inner, mode)
            .unwrap_or_else(|| engine.box_expr(Expr::function(op, vec![inner.clone()])));
        if is_odd_function(op) {
            return Some(engine.box_expr(Expr::function("Negate", vec![applied])));
        }
        if is_even_function(op) {
            return Some(applied);
        }
    }

    // Exact constructible values for the forward circular functions.
    if matches!(op, "Sin" | "Cos" | "Tan" | "Cot" | "Sec" | "Csc") {
        if let Some(ratio) = pi_ratio(engine, arg) {
            let t = reduce_period(&ratio.abs());
            let flip_for_negative = ratio.is_negative() && is_odd_function(op);
            if let Some((index, mut negative)) = quadrant_reduce(op, &t) {
                if let Some(value) = table_value(op, index) {
                    if flip_for_negative {
                        negative = !negative;
                    }
                    if value.is_symbol("ComplexInfinity") {
                        return Some(engine.box_expr(value));
                    }
                    let out = if negative {
                        Expr::function("Negate", vec![value])
                    } else {
                        value
                    };
                    return Some(engine.box_expr(out));
                }
            }
        }
    }

    // Exact inverse-trig values by inverting the forward table.
    if mode == EvalMode::Evaluate {
        if let Some(v) = arg.numeric() {
            if v.is_exact() || matches!(op, "Arcsin" | "Arccos" | "Arctan") {
                if let Some(out) = inverse_lookup(engine, op, v) {
                    return Some(out);
                }
            }
        }
    }

    let v = arg.numeric()?;

    // Exact arguments stay symbolic under plain evaluation (a float in,
    // a float out; an exact non-constructible argument is left alone).
    if mode == EvalMode::Evaluate && v.is_exact() && !v.is_zero() {
        return None;
    }

    numeric_eval(engine, op, v).map(Expr::number)
}

fn inverse_lookup(engine: &ComputeEngine, op: &str, v: &NumericValue) -> Option<Expr> {
    let x = v.to_f64();
    if !x.is_finite() {
        return None;
    }
    let (table, complement) = match op {
        "Arcsin" => (&*INVERSE_SIN, false),
        "Arccos" => (&*INVERSE_SIN, true),
        "Arctan" => (&*INVERSE_TAN, false),
        _ => return None,
    };
    let negative = x < 0.0;
    let x = x.abs();
    let index = table
        .iter()
        .find(|(value, _)| (value - x).abs() < INVERSE_TOLERANCE)
        .map(|(_, i)| *i)?;

    let (p, q) = ANGLES[index];
    let ratio = BigRational::new(BigInt::from(p), BigInt::from(q));
    let half = BigRational::new(BigInt::from(1), BigInt::from(2));

    // Place in the principal range: Arcsin and Arctan are odd with range
    // centered on zero; Arccos maps negatives above π/2.
    let ratio = if complement {
        if negative {
            &half + &ratio
        } else {
            &half - &ratio
        }
    } else if negative {
        -ratio
    } else {
        ratio
    };
    Some(engine.box_expr(angle_expr(&ratio)))
}

/// Numeric backends: machine floats, the decimal backend at elevated
/// precision, and machine complex.
fn numeric_eval(engine: &ComputeEngine, op: &str, v: &NumericValue) -> Option<NumericValue> {
    let unit_factor = engine.angular_unit().radians_per_unit();
    let is_forward = matches!(op, "Sin" | "Cos" | "Tan" | "Cot" | "Sec" | "Csc");

    if !v.is_real() {
        let c = Complex64::new(v.re().to_f64(), v.im().to_f64());
        let out = match op {
            "Sin" => c.sin(),
            "Cos" => c.cos(),
            "Tan" => c.tan(),
            "Cot" => c.tan().inv(),
            "Sec" => c.cos().inv(),
            "Csc" => c.sin().inv(),
            "Arcsin" => c.asin(),
            "Arccos" => c.acos(),
            "Arctan" => c.atan(),
            "Sinh" => c.sinh(),
            "Cosh" => c.cosh(),
            "Tanh" => c.tanh(),
            "Arsinh" => c.asinh(),
            "Artanh" => c.atanh(),
            _ => return None,
        };
        return Some(NumericValue::complex(
            NumericValue::machine(out.re),
            NumericValue::machine(out.im),
        ));
    }

    // Decimal backend for the forward circular functions.
    if is_forward && !engine.is_machine_precision() {
        let d = match v {
            NumericValue::Decimal(d) => Some(*d),
            NumericValue::Rational(r) => calx_numeric::decimal_from_rational(r),
            _ => None,
        };
        if let Some(d) = d {
            let radians = match engine.angular_unit() {
                AngularUnit::Radians => Some(d),
                AngularUnit::Degrees => d.checked_div(Decimal::from(180)).map(|x| x * Decimal::PI),
                AngularUnit::Gradians => d.checked_div(Decimal::from(200)).map(|x| x * Decimal::PI),
                AngularUnit::Turns => Some(d * Decimal::TWO_PI),
            };
            if let Some(rad) = radians {
                let out = match op {
                    "Sin" => Some(rad.sin()),
                    "Cos" => Some(rad.cos()),
                    "Tan" => Some(rad.tan()),
                    "Cot" => invert_decimal(rad.tan()),
                    "Sec" => invert_decimal(rad.cos()),
                    "Csc" => invert_decimal(rad.sin()),
                    _ => None,
                };
                if let Some(out) = out {
                    return Some(NumericValue::decimal(out));
                }
            }
        }
    }

    let x = v.to_f64();
    let x = if is_forward { x * unit_factor } else { x };
    let out = match op {
        "Sin" => x.sin(),
        "Cos" => x.cos(),
        "Tan" => x.tan(),
        "Cot" => 1.0 / x.tan(),
        "Sec" => 1.0 / x.cos(),
        "Csc" => 1.0 / x.sin(),
        "Arcsin" if (-1.0..=1.0).contains(&x) => x.asin(),
        "Arccos" if (-1.0..=1.0).contains(&x) => x.acos(),
        "Arcsin" | "Arccos" => {
            // Outside [-1, 1] the inverse leaves the reals.
            let c = Complex64::new(x, 0.0);
            let out = if op == "Arcsin" { c.asin() } else { c.acos() };
            return Some(NumericValue::complex(
                NumericValue::machine(out.re),
                NumericValue::machine(out.im),
            ));
        }
        "Arctan" => x.atan(),
        "Arccot" => (1.0 / x).atan(),
        "Arcsec" => (1.0 / x).acos(),
        "Arccsc" => (1.0 / x).asin(),
        "Sinh" => x.sinh(),
        "Cosh" => x.cosh(),
        "Tanh" => x.tanh(),
        "Coth" => 1.0 / x.tanh(),
        "Sech" => 1.0 / x.cosh(),
        "Csch" => 1.0 / x.sinh(),
        "Arsinh" => x.asinh(),
        "Artanh" => x.atanh(),
        "Arcoth" => (1.0 / x).atanh(),
        "Arcsch" => (1.0 / x).asinh(),
        _ => return None,
    };
    Some(NumericValue::machine(out))
}

fn invert_decimal(d: Decimal) -> Option<Decimal> {
    if d.is_zero() {
        None
    } else {
        Decimal::ONE.checked_div(d)
    }
}
