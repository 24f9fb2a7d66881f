//! The compute engine.
//!
//! A [`ComputeEngine`] owns every piece of long-lived state: the scope
//! arena with its definitions, the assumption store, the simplification
//! cache and the per-precision constant cache. Expressions are plain data;
//! all engine-dependent operations (`box_expr`, `evaluate`, `n`,
//! `simplify`) are methods here taking expressions by reference.
//!
//! The engine is single-threaded and cooperative: the cancellable
//! evaluation variant checks a [`CancellationToken`] at safe points
//! (before each rule application, quantifier iteration and fixpoint
//! iteration) and unwinds with [`Error::Cancelled`] when it trips.

use crate::assume::AssumptionStore;
use crate::canonical;
use crate::defs::{Definition, HoldUntil, OperatorDef, ValueDef};
use crate::error::{Error, Result};
use crate::eval::{self, EvalMode};
use crate::expr::Expr;
use crate::flags::NumericFlags;
use crate::json::{self, JsonSerializationOptions};
use crate::scope::ScopeArena;
use crate::simplify::{self, Rule, SimplifyStep};
use crate::types::Type;
use calx_numeric::{tolerance_for_precision, NumericValue, Sign};
use lru::LruCache;
use rust_decimal::{Decimal, MathematicalOps};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Working precision: machine floats or a number of significant digits
/// on the decimal backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Machine,
    Digits(u32),
}

/// The unit plain numeric arguments of trigonometric functions are
/// expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngularUnit {
    #[default]
    Radians,
    Degrees,
    Gradians,
    Turns,
}

impl AngularUnit {
    /// Radians per one of this unit.
    pub fn radians_per_unit(self) -> f64 {
        match self {
            AngularUnit::Radians => 1.0,
            AngularUnit::Degrees => std::f64::consts::PI / 180.0,
            AngularUnit::Gradians => std::f64::consts::PI / 200.0,
            AngularUnit::Turns => std::f64::consts::TAU,
        }
    }
}

/// Cooperative cancellation signal for the cancellable evaluation entry
/// points. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Engine configuration.
#[derive(Clone)]
pub struct EngineOptions {
    pub precision: Precision,
    /// Zero-tolerance for numeric comparison; derived from precision when
    /// absent.
    pub tolerance: Option<f64>,
    pub angular_unit: AngularUnit,
    /// Cap on simplifier fixpoint iterations.
    pub iteration_limit: u32,
    /// Re-validate signatures on every boxing; unknown symbols become
    /// inline errors instead of inferred definitions.
    pub strict: bool,
    pub cost_function: Option<Arc<dyn Fn(&Expr) -> f64>>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            precision: Precision::Machine,
            tolerance: None,
            angular_unit: AngularUnit::Radians,
            iteration_limit: 1024,
            strict: false,
            cost_function: None,
        }
    }
}

impl std::fmt::Debug for EngineOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineOptions")
            .field("precision", &self.precision)
            .field("tolerance", &self.tolerance)
            .field("angular_unit", &self.angular_unit)
            .field("iteration_limit", &self.iteration_limit)
            .field("strict", &self.strict)
            .finish()
    }
}

/// Significant digits of the machine backend.
pub const MACHINE_PRECISION: u32 = 15;
/// Capacity of the decimal backend.
pub const MAX_PRECISION: u32 = 28;

const SIMPLIFY_CACHE_SIZE: usize = 256;

pub struct ComputeEngine {
    precision: Cell<u32>,
    machine: Cell<bool>,
    tolerance: Cell<f64>,
    angular_unit: Cell<AngularUnit>,
    iteration_limit: Cell<u32>,
    strict: Cell<bool>,
    cost_function: RefCell<Arc<dyn Fn(&Expr) -> f64>>,
    pub(crate) scopes: RefCell<ScopeArena>,
    pub(crate) assumptions: RefCell<AssumptionStore>,
    simplify_cache: RefCell<LruCache<String, Expr>>,
    constant_cache: RefCell<HashMap<(&'static str, u32), NumericValue>>,
    /// Symbols currently being resolved; used to detect cyclic
    /// definitions during evaluation.
    pub(crate) resolving: RefCell<Vec<Arc<str>>>,
}

impl ComputeEngine {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
            .expect("default options are valid")
    }

    pub fn with_options(options: EngineOptions) -> Result<Self> {
        let (precision, machine) = match options.precision {
            Precision::Machine => (MACHINE_PRECISION, true),
            Precision::Digits(0) => {
                return Err(Error::InvalidConfiguration(
                    "precision must be a positive integer".into(),
                ))
            }
            Precision::Digits(d) => (d.min(MAX_PRECISION), false),
        };
        if let Some(t) = options.tolerance {
            if !(t > 0.0) {
                return Err(Error::InvalidConfiguration(
                    "tolerance must be a positive real".into(),
                ));
            }
        }
        if options.iteration_limit == 0 {
            return Err(Error::InvalidConfiguration(
                "iteration limit must be positive".into(),
            ));
        }

        let engine = ComputeEngine {
            precision: Cell::new(precision),
            machine: Cell::new(machine),
            tolerance: Cell::new(
                options
                    .tolerance
                    .unwrap_or_else(|| tolerance_for_precision(precision)),
            ),
            angular_unit: Cell::new(options.angular_unit),
            iteration_limit: Cell::new(options.iteration_limit),
            strict: Cell::new(options.strict),
            cost_function: RefCell::new(
                options
                    .cost_function
                    .unwrap_or_else(|| Arc::new(crate::cost::default_cost)),
            ),
            scopes: RefCell::new(ScopeArena::new()),
            assumptions: RefCell::new(AssumptionStore::new()),
            simplify_cache: RefCell::new(LruCache::new(
                NonZeroUsize::new(SIMPLIFY_CACHE_SIZE).unwrap(),
            )),
            constant_cache: RefCell::new(HashMap::new()),
            resolving: RefCell::new(Vec::new()),
        };
        engine.install_standard_library();
        Ok(engine)
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    pub fn precision(&self) -> u32 {
        self.precision.get()
    }

    pub fn is_machine_precision(&self) -> bool {
        self.machine.get()
    }

    /// Changes the working precision and invalidates every cached value
    /// that was computed at the old precision.
    pub fn set_precision(&self, precision: Precision) -> Result<()> {
        let (digits, machine) = match precision {
            Precision::Machine => (MACHINE_PRECISION, true),
            Precision::Digits(0) => {
                return Err(Error::InvalidConfiguration(
                    "precision must be a positive integer".into(),
                ))
            }
            Precision::Digits(d) => (d.min(MAX_PRECISION), false),
        };
        self.precision.set(digits);
        self.machine.set(machine);
        self.tolerance.set(tolerance_for_precision(digits));
        self.reset();
        Ok(())
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance.get()
    }

    pub fn set_tolerance(&self, tolerance: f64) -> Result<()> {
        if !(tolerance > 0.0) {
            return Err(Error::InvalidConfiguration(
                "tolerance must be a positive real".into(),
            ));
        }
        self.tolerance.set(tolerance);
        Ok(())
    }

    pub fn angular_unit(&self) -> AngularUnit {
        self.angular_unit.get()
    }

    pub fn set_angular_unit(&self, unit: AngularUnit) {
        self.angular_unit.set(unit);
    }

    pub fn iteration_limit(&self) -> u32 {
        self.iteration_limit.get()
    }

    pub fn is_strict(&self) -> bool {
        self.strict.get()
    }

    pub fn set_cost_function(&self, f: Arc<dyn Fn(&Expr) -> f64>) {
        *self.cost_function.borrow_mut() = f;
        self.simplify_cache.borrow_mut().clear();
    }

    /// Clears every derived cache; values driven by engine precision are
    /// recomputed on next access.
    pub fn reset(&self) {
        self.simplify_cache.borrow_mut().clear();
        self.constant_cache.borrow_mut().clear();
    }

    // ------------------------------------------------------------------
    // Scopes and definitions
    // ------------------------------------------------------------------

    pub fn push_scope(&self) {
        self.scopes.borrow_mut().push();
    }

    pub fn pop_scope(&self) -> Result<()> {
        self.scopes.borrow_mut().pop()
    }

    /// Runs `f` inside a fresh scope, guaranteeing the pop on every exit
    /// path.
    pub fn with_scope<T>(&self, f: impl FnOnce(&Self) -> T) -> T {
        self.push_scope();
        let guard = ScopeGuard(self);
        let out = f(self);
        drop(guard);
        out
    }

    /// Declares a value definition. Re-declaration updates inferred
    /// definitions and rejects everything else.
    pub fn define_symbol(&self, name: &str, def: ValueDef) -> Result<()> {
        let mut scopes = self.scopes.borrow_mut();
        if scopes.is_local(name) {
            match scopes.lookup(name) {
                Some(existing) if existing.is_inferred() => {}
                Some(_) => return Err(Error::DuplicateDefinition(name.into())),
                None => {}
            }
        }
        scopes.define(Arc::from(name), Definition::Value(def));
        Ok(())
    }

    /// Declares an operator definition, same re-declaration policy.
    pub fn define_function(&self, name: &str, def: OperatorDef) -> Result<()> {
        let mut scopes = self.scopes.borrow_mut();
        if scopes.is_local(name) {
            match scopes.lookup(name) {
                Some(existing) if existing.is_inferred() => {}
                Some(_) => return Err(Error::DuplicateDefinition(name.into())),
                None => {}
            }
        }
        scopes.define(Arc::from(name), Definition::Operator(def));
        Ok(())
    }

    pub fn lookup_definition(&self, name: &str) -> Option<Definition> {
        self.scopes.borrow().lookup(name).cloned()
    }

    /// Assigns a value to a symbol, applying the conversion and inference
    /// rules: constants refuse reassignment; assigning a function-typed
    /// value converts the definition to an operator definition and vice
    /// versa; the declared type only widens when it was inferred.
    pub fn assign(&self, name: &str, value: Expr) -> Result<()> {
        let value = self.box_expr(value);
        let value_ty = eval::type_of(self, &value);
        let is_function_value = value.is_function_of("Function");

        enum Action {
            ToOperator,
            SetValue { widen: bool },
            ConvertToValue,
            Install,
        }

        let action = {
            let scopes = self.scopes.borrow();
            match scopes.lookup(name) {
                Some(Definition::Value(v)) if v.constant => {
                    return Err(Error::ReadOnly(name.into()))
                }
                Some(Definition::Value(v)) => {
                    if is_function_value {
                        Action::ToOperator
                    } else if v.inferred {
                        Action::SetValue { widen: true }
                    } else if !value_ty.is_subtype_of(&v.ty) {
                        return Err(Error::InvalidConfiguration(format!(
                            "cannot assign a {value_ty} to '{name}' of type {}",
                            v.ty
                        )));
                    } else {
                        Action::SetValue { widen: false }
                    }
                }
                Some(Definition::Operator(_)) => {
                    if is_function_value {
                        Action::ToOperator
                    } else {
                        Action::ConvertToValue
                    }
                }
                None => Action::Install,
            }
        };

        let lambda_def = |body: Expr| {
            let mut def = OperatorDef::new(Type::function_of(
                vec![Type::VarArg(Box::new(Type::ANYTHING))],
                Type::ANYTHING,
            ));
            def.pure = false;
            def.evaluate = Some(Arc::new(move |engine: &ComputeEngine, args: &[Expr]| {
                eval::apply_lambda(engine, &body, args)
            }));
            Definition::Operator(def)
        };

        match action {
            Action::ToOperator => {
                let def = lambda_def(value);
                let mut scopes = self.scopes.borrow_mut();
                *scopes.lookup_mut(name).expect("definition exists") = def;
            }
            Action::SetValue { widen } => {
                let mut scopes = self.scopes.borrow_mut();
                if let Some(Definition::Value(v)) = scopes.lookup_mut(name) {
                    if widen {
                        v.ty = v.ty.widen(&value_ty);
                    }
                    v.value = Some(value);
                }
            }
            Action::ConvertToValue => {
                let def = Definition::Value(ValueDef::new(value_ty).with_value(value));
                let mut scopes = self.scopes.borrow_mut();
                *scopes.lookup_mut(name).expect("definition exists") = def;
            }
            Action::Install => {
                if is_function_value {
                    let def = lambda_def(value);
                    self.scopes.borrow_mut().define(Arc::from(name), def);
                    return Ok(());
                }
                let def = ValueDef {
                    inferred: true,
                    ..ValueDef::new(value_ty).with_value(value)
                };
                return self.define_symbol(name, def);
            }
        }
        Ok(())
    }

    /// Narrows an inferred symbol type from a use as an argument:
    /// constraints accumulate, starting from `unknown`.
    pub(crate) fn infer_narrow(&self, name: &str, ty: &Type) {
        let mut scopes = self.scopes.borrow_mut();
        if let Some(Definition::Value(v)) = scopes.lookup_mut(name) {
            if v.inferred {
                if v.ty == Type::UNKNOWN {
                    v.ty = ty.clone();
                } else {
                    let narrowed = v.ty.narrow(ty);
                    if narrowed != Type::VOID {
                        v.ty = narrowed;
                    }
                }
            }
        }
    }

    /// Changes the declared type of a symbol, forgetting all assumptions
    /// about it.
    pub fn set_symbol_type(&self, name: &str, ty: Type) -> Result<()> {
        let mut scopes = self.scopes.borrow_mut();
        match scopes.lookup_mut(name) {
            Some(Definition::Value(v)) => {
                if v.constant {
                    return Err(Error::ReadOnly(name.into()));
                }
                v.ty = ty;
                v.inferred = false;
            }
            _ => {
                scopes.define(
                    Arc::from(name),
                    Definition::Value(ValueDef::new(ty)),
                );
            }
        }
        drop(scopes);
        self.assumptions.borrow_mut().forget(name);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Assumptions
    // ------------------------------------------------------------------

    pub fn assume(&self, prop: &Expr) -> Result<()> {
        let canonical = self.box_expr(prop.clone());
        self.assumptions.borrow_mut().insert(canonical);
        // Cached simplifications may depend on the old assumption set.
        self.simplify_cache.borrow_mut().clear();
        Ok(())
    }

    pub fn forget(&self, symbol: &str) {
        self.assumptions.borrow_mut().forget(symbol);
        self.simplify_cache.borrow_mut().clear();
    }

    pub fn ask(&self, pattern: &Expr) -> Vec<Expr> {
        let pattern = canonical::canonicalize_pattern(self, pattern);
        self.assumptions.borrow().ask(&pattern)
    }

    /// Numeric flags known for a symbol: assumption-derived facts merged
    /// over the declared flags.
    pub(crate) fn symbol_flags(&self, name: &str) -> NumericFlags {
        let assumed = self.assumptions.borrow().flags_for(name);
        if assumed != NumericFlags::default() {
            return assumed;
        }
        match self.scopes.borrow().lookup(name) {
            Some(Definition::Value(v)) => v.flags,
            _ => NumericFlags::default(),
        }
    }

    // ------------------------------------------------------------------
    // Boxing and serialization
    // ------------------------------------------------------------------

    /// Attaches a raw expression to the engine: canonicalizes bottom-up
    /// and resolves identifiers against the active scope chain.
    pub fn box_expr(&self, raw: Expr) -> Expr {
        if raw.is_canonical() {
            return raw;
        }
        trace!(expr = %raw, "boxing");
        canonical::canonicalize(self, &raw)
    }

    pub fn box_json(&self, value: &serde_json::Value) -> Expr {
        self.box_expr(json::from_json(value))
    }

    pub fn to_json(&self, expr: &Expr) -> serde_json::Value {
        json::to_json(expr, &JsonSerializationOptions::default())
    }

    pub fn to_json_with(
        &self,
        expr: &Expr,
        options: &JsonSerializationOptions,
    ) -> serde_json::Value {
        json::to_json(expr, options)
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    /// Symbolic evaluation. Inline errors propagate; cancellation is not
    /// observable on this entry point.
    pub fn evaluate(&self, expr: &Expr) -> Expr {
        let expr = self.box_expr(expr.clone());
        match eval::evaluate(self, &expr, EvalMode::Evaluate, &CancellationToken::default()) {
            Ok(e) => e,
            Err(_) => Expr::error(crate::error::ErrorKind::Cancelled, None),
        }
    }

    /// The cancellable variant: checks `token` at safe points and returns
    /// [`Error::Cancelled`] when it trips mid-flight.
    pub fn evaluate_cancellable(
        &self,
        expr: &Expr,
        token: &CancellationToken,
    ) -> Result<Expr> {
        let expr = self.box_expr(expr.clone());
        debug!(expr = %expr, "evaluate");
        eval::evaluate(self, &expr, EvalMode::Evaluate, token)
    }

    /// Numeric approximation at the engine precision.
    pub fn n(&self, expr: &Expr) -> Expr {
        let expr = self.box_expr(expr.clone());
        match eval::evaluate(self, &expr, EvalMode::N, &CancellationToken::default()) {
            Ok(e) => e,
            Err(_) => Expr::error(crate::error::ErrorKind::Cancelled, None),
        }
    }

    pub fn sgn(&self, expr: &Expr) -> Option<Sign> {
        eval::expr_sign(self, expr)
    }

    /// Three-valued mathematical equality.
    pub fn is_equal(&self, a: &Expr, b: &Expr) -> Option<bool> {
        eval::is_equal(self, a, b)
    }

    // ------------------------------------------------------------------
    // Simplification
    // ------------------------------------------------------------------

    /// Simplifies to the fixpoint of the default rule families; the
    /// cheapest expression reached is returned.
    pub fn simplify(&self, expr: &Expr) -> Expr {
        let expr = self.box_expr(expr.clone());
        // Display alone can collide across representations (`0.5` the
        // machine float vs `0.5` the decimal); the hash disambiguates.
        let key = format!("{}#{}", expr.hash(), expr);
        if let Some(hit) = self.simplify_cache.borrow_mut().get(&key) {
            return hit.clone();
        }
        let steps = self.simplify_steps(&expr, &[]);
        let out = steps.last().map_or(expr, |s| s.expr.clone());
        self.simplify_cache.borrow_mut().put(key, out.clone());
        out
    }

    /// The step list: each entry is strictly cheaper than the one before.
    pub fn simplify_steps(&self, expr: &Expr, rules: &[Rule]) -> Vec<SimplifyStep> {
        let expr = self.box_expr(expr.clone());
        debug!(expr = %expr, "simplify");
        simplify::simplify_steps(self, &expr, rules, &CancellationToken::default())
            .unwrap_or_default()
    }

    pub fn cost(&self, expr: &Expr) -> f64 {
        (self.cost_function.borrow())(expr)
    }

    // ------------------------------------------------------------------
    // Constants
    // ------------------------------------------------------------------

    /// The numeric value of a named constant at the current precision.
    /// Cached per (name, precision); `set_precision` clears the cache.
    pub(crate) fn numeric_constant(&self, name: &str) -> Option<NumericValue> {
        let key: &'static str = match name {
            "Pi" => "Pi",
            "ExponentialE" => "ExponentialE",
            "GoldenRatio" => "GoldenRatio",
            "EulerGamma" => "EulerGamma",
            "CatalanConstant" => "CatalanConstant",
            "Degrees" => "Degrees",
            _ => return None,
        };
        let precision = self.precision.get();
        if let Some(v) = self.constant_cache.borrow().get(&(key, precision)) {
            return Some(v.clone());
        }
        let value = if self.machine.get() {
            NumericValue::machine(match key {
                "Pi" => std::f64::consts::PI,
                "ExponentialE" => std::f64::consts::E,
                "GoldenRatio" => (1.0 + 5f64.sqrt()) / 2.0,
                "EulerGamma" => 0.577_215_664_901_532_9,
                "CatalanConstant" => 0.915_965_594_177_219,
                "Degrees" => std::f64::consts::PI / 180.0,
                _ => unreachable!(),
            })
        } else {
            NumericValue::decimal(match key {
                "Pi" => Decimal::PI,
                "ExponentialE" => Decimal::E,
                "GoldenRatio" => {
                    (Decimal::ONE + Decimal::from(5).sqrt().unwrap_or_default())
                        / Decimal::TWO
                }
                "EulerGamma" => Decimal::from_str("0.5772156649015328606065120901")
                    .unwrap_or_default(),
                "CatalanConstant" => Decimal::from_str("0.9159655941772190150546185697")
                    .unwrap_or_default(),
                "Degrees" => Decimal::PI / Decimal::from(180),
                _ => unreachable!(),
            })
        };
        self.constant_cache
            .borrow_mut()
            .insert((key, precision), value.clone());
        Some(value)
    }

    // ------------------------------------------------------------------
    // Standard library
    // ------------------------------------------------------------------

    fn install_standard_library(&self) {
        let mut scopes = self.scopes.borrow_mut();
        let constant = |ty: Type, flags: NumericFlags| {
            Definition::Value(ValueDef {
                value: None,
                ty,
                constant: true,
                hold_until: HoldUntil::N,
                flags: flags.normalized(),
                inferred: false,
            })
        };
        let positive_real = NumericFlags {
            real: Some(true),
            positive: Some(true),
            rational: Some(false),
            ..Default::default()
        };

        for name in ["Pi", "ExponentialE", "GoldenRatio", "EulerGamma", "CatalanConstant"] {
            scopes.define_in_global(Arc::from(name), constant(Type::REALS, positive_real));
        }
        scopes.define_in_global(
            Arc::from("ImaginaryUnit"),
            Definition::Value(ValueDef {
                value: Some(Expr::number(NumericValue::imaginary_unit())),
                ty: Type::COMPLEXES,
                constant: true,
                hold_until: HoldUntil::Evaluate,
                flags: NumericFlags {
                    imaginary: Some(true),
                    ..Default::default()
                }
                .normalized(),
                inferred: false,
            }),
        );
        for name in ["True", "False"] {
            scopes.define_in_global(
                Arc::from(name),
                constant(Type::BOOLEANS, NumericFlags::default()),
            );
        }
        scopes.define_in_global(
            Arc::from("Nothing"),
            constant(Type::NOTHING, NumericFlags::default()),
        );
        scopes.define_in_global(
            Arc::from("ComplexInfinity"),
            constant(
                Type::Literal(crate::types::TypeName::ExtendedComplexNumbers),
                NumericFlags {
                    infinity: Some(true),
                    ..Default::default()
                }
                .normalized(),
            ),
        );
    }
}

impl Default for ComputeEngine {
    fn default() -> Self {
        Self::new()
    }
}

struct ScopeGuard<'a>(&'a ComputeEngine);

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        // Unwinds the frame even on an exceptional exit.
        let _ = self.0.scopes.borrow_mut().pop();
    }
}
