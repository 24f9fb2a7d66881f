//! Value and operator definitions.
//!
//! A definition is what a symbol resolves to through the scope chain:
//! either a *value definition* (a constant or variable with a type, flags
//! and an optional value expression) or an *operator definition* (a
//! signature plus algebraic properties and optional handlers).
//!
//! Builtin operators do not install handler closures; their behavior is
//! dispatched by name in the `canonical` and `eval` modules. Handlers
//! exist so embedders can extend the engine with their own operators.

use crate::engine::ComputeEngine;
use crate::expr::Expr;
use crate::flags::NumericFlags;
use crate::operators::HoldStrategy;
use crate::types::Type;
use calx_numeric::Sign;
use std::fmt;
use std::sync::Arc;

/// How long a symbol's value is withheld during evaluation.
///
/// `Never` substitutes eagerly (during canonicalization), `N` only during
/// numeric approximation. A non-constant with `N` stays symbolic through
/// `evaluate` and `simplify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldUntil {
    Never,
    Simplify,
    Evaluate,
    N,
}

pub type CanonicalHandler = Arc<dyn Fn(&ComputeEngine, &[Expr]) -> Expr>;
pub type EvaluateHandler = Arc<dyn Fn(&ComputeEngine, &[Expr]) -> Option<Expr>>;
pub type TypeHandler = Arc<dyn Fn(&ComputeEngine, &[Expr]) -> Type>;
pub type SgnHandler = Arc<dyn Fn(&ComputeEngine, &[Expr]) -> Option<Sign>>;
pub type EvenHandler = Arc<dyn Fn(&ComputeEngine, &[Expr]) -> Option<bool>>;
pub type EqHandler = Arc<dyn Fn(&ComputeEngine, &Expr, &Expr) -> Option<bool>>;

#[derive(Clone)]
pub struct ValueDef {
    pub value: Option<Expr>,
    pub ty: Type,
    pub constant: bool,
    pub hold_until: HoldUntil,
    pub flags: NumericFlags,
    /// Installed by auto-binding; inferred definitions may be narrowed,
    /// widened or re-declared freely.
    pub inferred: bool,
}

impl ValueDef {
    pub fn new(ty: Type) -> Self {
        ValueDef {
            value: None,
            ty,
            constant: false,
            hold_until: HoldUntil::Evaluate,
            flags: NumericFlags::default(),
            inferred: false,
        }
    }

    /// The definition auto-binding installs for an unknown identifier.
    pub fn inferred_unknown() -> Self {
        ValueDef {
            inferred: true,
            ..ValueDef::new(Type::UNKNOWN)
        }
    }

    pub fn constant(value: Expr, ty: Type) -> Self {
        ValueDef {
            value: Some(value),
            ty,
            constant: true,
            hold_until: HoldUntil::N,
            flags: NumericFlags::default(),
            inferred: false,
        }
    }

    pub fn with_value(mut self, value: Expr) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_flags(mut self, flags: NumericFlags) -> Self {
        self.flags = flags.normalized();
        self
    }

    pub fn with_hold_until(mut self, hold_until: HoldUntil) -> Self {
        self.hold_until = hold_until;
        self
    }
}

#[derive(Clone)]
pub struct OperatorDef {
    pub signature: Type,
    pub associative: bool,
    pub commutative: bool,
    pub idempotent: bool,
    pub involution: bool,
    pub threadable: bool,
    pub pure: bool,
    pub lazy: bool,
    pub scoped: bool,
    pub complexity: u32,
    pub hold: HoldStrategy,
    pub canonical: Option<CanonicalHandler>,
    pub evaluate: Option<EvaluateHandler>,
    pub type_of: Option<TypeHandler>,
    pub sgn: Option<SgnHandler>,
    pub even: Option<EvenHandler>,
    pub eq: Option<EqHandler>,
}

impl OperatorDef {
    pub fn new(signature: Type) -> Self {
        OperatorDef {
            signature,
            associative: false,
            commutative: false,
            idempotent: false,
            involution: false,
            threadable: false,
            pure: true,
            lazy: false,
            scoped: false,
            complexity: 4000,
            hold: HoldStrategy::None,
            canonical: None,
            evaluate: None,
            type_of: None,
            sgn: None,
            even: None,
            eq: None,
        }
    }

    pub fn with_evaluate(mut self, f: EvaluateHandler) -> Self {
        self.evaluate = Some(f);
        self
    }

    pub fn commutative(mut self) -> Self {
        self.commutative = true;
        self
    }

    pub fn associative(mut self) -> Self {
        self.associative = true;
        self
    }
}

#[derive(Clone)]
pub enum Definition {
    Value(ValueDef),
    Operator(OperatorDef),
}

impl Definition {
    pub fn as_value(&self) -> Option<&ValueDef> {
        match self {
            Definition::Value(v) => Some(v),
            Definition::Operator(_) => None,
        }
    }

    pub fn as_operator(&self) -> Option<&OperatorDef> {
        match self {
            Definition::Operator(o) => Some(o),
            Definition::Value(_) => None,
        }
    }

    pub fn is_inferred(&self) -> bool {
        matches!(self, Definition::Value(v) if v.inferred)
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Value(v) => f
                .debug_struct("ValueDef")
                .field("ty", &v.ty)
                .field("constant", &v.constant)
                .field("has_value", &v.value.is_some())
                .field("inferred", &v.inferred)
                .finish(),
            Definition::Operator(o) => f
                .debug_struct("OperatorDef")
                .field("signature", &o.signature)
                .field("commutative", &o.commutative)
                .field("associative", &o.associative)
                .finish(),
        }
    }
}
