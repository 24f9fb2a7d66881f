//! MathJSON interchange.
//!
//! Parsers hand the engine raw MathJSON trees; serializers consume
//! canonical ones. Both shorthand forms (bare numbers, bare symbol
//! strings, `[operator, …operands]` arrays) and full object forms
//! (`{"num": …}`, `{"sym": …}`, `{"str": …}`, `{"fn": …}`, `{"dict": …}`)
//! are accepted on input; output form is controlled by
//! [`JsonSerializationOptions`].

use crate::expr::{Expr, ExprKind, Metadata};
use calx_numeric::NumericValue;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use std::str::FromStr;

/// Digit budget for serialized number literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigitBudget {
    /// Shortest representation that round-trips.
    #[default]
    Auto,
    /// Full stored precision.
    Max,
    /// At most this many significant digits.
    Digits(u32),
}

#[derive(Debug, Clone)]
pub struct JsonSerializationOptions {
    /// Which node kinds may use the compact shorthand form.
    pub shorthand_number: bool,
    pub shorthand_symbol: bool,
    pub shorthand_string: bool,
    pub shorthand_function: bool,
    pub shorthand_dictionary: bool,
    /// Include wikidata/description/url metadata (forces object form).
    pub metadata: bool,
    pub digits: DigitBudget,
    /// Detect repeating decimals and serialize them with `(…)` notation.
    pub repeating_decimal: bool,
    /// Operators serialized in object form even when shorthand is on.
    pub exclude: Vec<String>,
}

impl Default for JsonSerializationOptions {
    fn default() -> Self {
        JsonSerializationOptions {
            shorthand_number: true,
            shorthand_symbol: true,
            shorthand_string: true,
            shorthand_function: true,
            shorthand_dictionary: true,
            metadata: false,
            digits: DigitBudget::Auto,
            repeating_decimal: false,
            exclude: Vec::new(),
        }
    }
}

impl JsonSerializationOptions {
    /// No shorthands at all: every node in object form.
    pub fn full_form() -> Self {
        JsonSerializationOptions {
            shorthand_number: false,
            shorthand_symbol: false,
            shorthand_string: false,
            shorthand_function: false,
            shorthand_dictionary: false,
            ..Default::default()
        }
    }
}

// ----------------------------------------------------------------------
// Input
// ----------------------------------------------------------------------

/// Builds a raw (unboxed) expression from a MathJSON value. Invalid
/// shapes come back as `Error` expressions, not as `Err`: malformed input
/// is data, not a crash.
pub fn from_json(value: &Value) -> Expr {
    match value {
        Value::Null => Expr::symbol("Nothing"),
        Value::Bool(b) => Expr::boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Expr::int(i)
            } else {
                Expr::float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => from_json_string(s),
        Value::Array(items) => {
            let Some(Value::String(op)) = items.first() else {
                return Expr::error(
                    crate::error::ErrorKind::InvalidSymbol,
                    Some(Expr::string(value.to_string())),
                );
            };
            let args = items[1..].iter().map(from_json).collect();
            Expr::function(op.as_str(), args)
        }
        Value::Object(map) => from_json_object(map),
    }
}

fn from_json_string(s: &str) -> Expr {
    // A string bracketed in single quotes is a string literal; anything
    // else is a symbol reference.
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        Expr::string(&s[1..s.len() - 1])
    } else {
        Expr::symbol(s)
    }
}

fn from_json_object(map: &Map<String, Value>) -> Expr {
    let expr = if let Some(Value::String(num)) = map.get("num") {
        Expr::number(parse_number_literal(num))
    } else if let Some(Value::String(sym)) = map.get("sym") {
        Expr::symbol(sym.as_str())
    } else if let Some(Value::String(s)) = map.get("str") {
        Expr::string(s.as_str())
    } else if let Some(Value::Array(items)) = map.get("fn") {
        from_json(&Value::Array(items.clone()))
    } else if let Some(Value::Object(entries)) = map.get("dict") {
        Expr::dict(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), from_json(v)))
                .collect(),
        )
    } else {
        return Expr::error(
            crate::error::ErrorKind::InvalidSymbol,
            Some(Expr::string(Value::Object(map.clone()).to_string())),
        );
    };

    let meta = Metadata {
        wikidata: map
            .get("wikidata")
            .and_then(Value::as_str)
            .map(str::to_owned),
        description: map
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_owned),
        url: map.get("url").and_then(Value::as_str).map(str::to_owned),
    };
    if meta == Metadata::default() {
        expr
    } else {
        expr.with_metadata(meta)
    }
}

/// Parses a `{"num": …}` payload: integers (arbitrarily long, optional
/// `n` suffix), decimals, repeating decimals `1.(3)`, and the named
/// non-finite values.
pub fn parse_number_literal(s: &str) -> NumericValue {
    let s = s.trim().trim_end_matches('n');
    match s {
        "NaN" => return NumericValue::nan(),
        "+Infinity" | "Infinity" => return NumericValue::pos_infinity(),
        "-Infinity" => return NumericValue::neg_infinity(),
        _ => {}
    }

    if let Some(v) = parse_repeating_decimal(s) {
        return v;
    }
    if !s.contains(['.', 'e', 'E']) {
        if let Ok(i) = BigInt::from_str(s) {
            return NumericValue::from_bigint(i);
        }
    }
    if let Ok(d) = Decimal::from_str(s) {
        return NumericValue::decimal(d);
    }
    if let Ok(f) = f64::from_str(s) {
        return NumericValue::machine(f);
    }
    NumericValue::nan()
}

/// `"1.(3)"` → 4/3. The repeating block is bracketed in parentheses.
fn parse_repeating_decimal(s: &str) -> Option<NumericValue> {
    let open = s.find('(')?;
    if !s.ends_with(')') {
        return None;
    }
    let repeat = &s[open + 1..s.len() - 1];
    let prefix = &s[..open];
    if repeat.is_empty() || !repeat.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let dot = prefix.find('.')?;
    let frac_digits = (prefix.len() - dot - 1) as u32;

    let base = Decimal::from_str(prefix.trim_end_matches('.')).ok()?;
    let base = NumericValue::decimal(base).try_to_rational()?;
    // The repeating block contributes repeat / (10^k - 1) scaled under
    // the existing fractional digits.
    let block = BigInt::from_str(repeat).ok()?;
    let k = repeat.len() as u32;
    let denom = BigInt::from(10u8).pow(k) - BigInt::from(1u8);
    let scale = BigInt::from(10u8).pow(frac_digits);
    let tail = BigRational::new(block, denom * scale);
    let value = if s.starts_with('-') { base - tail } else { base + tail };
    Some(NumericValue::from_big_rational(value))
}

// ----------------------------------------------------------------------
// Output
// ----------------------------------------------------------------------

pub fn to_json(expr: &Expr, options: &JsonSerializationOptions) -> Value {
    let force_object = options.metadata && expr.metadata().is_some();
    match expr.kind() {
        ExprKind::Number(v) => number_to_json(v, options, force_object),
        ExprKind::Symbol(name) => {
            if options.shorthand_symbol && !force_object {
                Value::String(name.to_string())
            } else {
                with_metadata(expr, options, json!({ "sym": &**name }))
            }
        }
        ExprKind::Str(s) => {
            if options.shorthand_string && !force_object {
                Value::String(format!("'{s}'"))
            } else {
                with_metadata(expr, options, json!({ "str": &**s }))
            }
        }
        ExprKind::Function { op, args } => {
            let mut items = Vec::with_capacity(args.len() + 1);
            items.push(Value::String(op.to_string()));
            items.extend(args.iter().map(|a| to_json(a, options)));
            let array = Value::Array(items);
            let excluded = options.exclude.iter().any(|x| x == &**op);
            if options.shorthand_function && !force_object && !excluded {
                array
            } else {
                with_metadata(expr, options, json!({ "fn": array }))
            }
        }
        ExprKind::Tensor { shape: _, elems } => {
            // Tensors serialize as nested Lists.
            let mut items = vec![Value::String("List".into())];
            items.extend(elems.iter().map(|e| to_json(e, options)));
            Value::Array(items)
        }
        ExprKind::Dict(entries) => {
            let map: Map<String, Value> = entries
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v, options)))
                .collect();
            if options.shorthand_dictionary && !force_object {
                json!({ "dict": map })
            } else {
                with_metadata(expr, options, json!({ "dict": map }))
            }
        }
    }
}

fn with_metadata(expr: &Expr, options: &JsonSerializationOptions, mut value: Value) -> Value {
    if !options.metadata {
        return value;
    }
    if let (Some(meta), Some(obj)) = (expr.metadata(), value.as_object_mut()) {
        if let Some(w) = &meta.wikidata {
            obj.insert("wikidata".into(), Value::String(w.clone()));
        }
        if let Some(d) = &meta.description {
            obj.insert("description".into(), Value::String(d.clone()));
        }
        if let Some(u) = &meta.url {
            obj.insert("url".into(), Value::String(u.clone()));
        }
    }
    value
}

fn number_to_json(
    v: &NumericValue,
    options: &JsonSerializationOptions,
    force_object: bool,
) -> Value {
    match v {
        NumericValue::Real(f) => {
            if f.is_nan() {
                json!({ "num": "NaN" })
            } else if *f == f64::INFINITY {
                json!({ "num": "+Infinity" })
            } else if *f == f64::NEG_INFINITY {
                json!({ "num": "-Infinity" })
            } else if options.shorthand_number && !force_object {
                json!(budgeted_f64(*f, options.digits))
            } else {
                json!({ "num": f.to_string() })
            }
        }
        NumericValue::Decimal(d) => json!({ "num": decimal_string(*d, options.digits) }),
        NumericValue::Rational(r) => {
            if r.is_integer() {
                let n = r.numer();
                match n.to_i64() {
                    Some(i) if options.shorthand_number && !force_object => json!(i),
                    _ => json!({ "num": n.to_string() }),
                }
            } else if options.repeating_decimal {
                match repeating_decimal_string(r) {
                    Some(s) => json!({ "num": s }),
                    None => rational_to_json(r, options),
                }
            } else {
                rational_to_json(r, options)
            }
        }
        NumericValue::Complex(re, im) => json!([
            "Complex",
            number_to_json(re, options, false),
            number_to_json(im, options, false),
        ]),
    }
}

fn rational_to_json(r: &BigRational, options: &JsonSerializationOptions) -> Value {
    let n = match r.numer().to_i64() {
        Some(i) => json!(i),
        None => json!({ "num": r.numer().to_string() }),
    };
    let d = match r.denom().to_i64() {
        Some(i) => json!(i),
        None => json!({ "num": r.denom().to_string() }),
    };
    let _ = options;
    json!(["Rational", n, d])
}

fn budgeted_f64(f: f64, digits: DigitBudget) -> f64 {
    match digits {
        DigitBudget::Auto | DigitBudget::Max => f,
        DigitBudget::Digits(n) => {
            let formatted = format!("{f:.*e}", n.saturating_sub(1) as usize);
            formatted.parse().unwrap_or(f)
        }
    }
}

fn decimal_string(d: Decimal, digits: DigitBudget) -> String {
    match digits {
        DigitBudget::Auto | DigitBudget::Max => d.normalize().to_string(),
        DigitBudget::Digits(n) => {
            let s = d.normalize().to_string();
            let significant = s.bytes().filter(|b| b.is_ascii_digit()).count() as u32;
            if significant <= n {
                s
            } else {
                let scale = d.scale().saturating_sub(significant - n);
                d.round_dp(scale).normalize().to_string()
            }
        }
    }
}

/// Renders a rational as a repeating decimal (`4/3` → `"1.(3)"`) when the
/// cycle is short enough to be worth it.
fn repeating_decimal_string(r: &BigRational) -> Option<String> {
    const MAX_CYCLE: usize = 32;

    let negative = r.is_negative();
    let abs = r.abs();
    let int_part = abs.to_integer();
    let mut remainder = abs.numer() - &int_part * abs.denom();
    let denom = abs.denom().clone();

    let mut digits = String::new();
    let mut seen: Vec<(BigInt, usize)> = Vec::new();
    while !remainder.is_zero() {
        if let Some((_, at)) = seen.iter().find(|(rem, _)| *rem == remainder) {
            let (fixed, cycle) = digits.split_at(*at);
            let sign = if negative { "-" } else { "" };
            return Some(format!("{sign}{int_part}.{fixed}({cycle})"));
        }
        if seen.len() > MAX_CYCLE {
            return None;
        }
        seen.push((remainder.clone(), digits.len()));
        remainder *= BigInt::from(10u8);
        let digit = &remainder / &denom;
        digits.push_str(&digit.to_string());
        remainder -= digit * &denom;
    }
    // Terminating decimal: no cycle to mark.
    None
}
