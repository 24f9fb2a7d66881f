#![forbid(unsafe_code)]

//! Calx symbolic computation engine.
//!
//! The engine represents mathematical expressions as canonical trees,
//! evaluates them exactly or numerically, and simplifies them through a
//! cost-guarded rewriting system. The pipeline:
//!
//! ```text
//! MathJSON value
//!      |
//!   from_json -> raw Expr
//!      |
//! Canonicalization -> bound, flattened, sorted, validated
//!      |
//! evaluate / n / simplify -> canonical Expr
//!      |
//!   to_json -> MathJSON value
//! ```
//!
//! A [`ComputeEngine`] owns all long-lived state (scopes, definitions,
//! assumptions, caches); expressions are immutable `Arc`-shared trees
//! that never point back at their engine.
//!
//! # Example
//!
//! ```
//! use calx_engine::ComputeEngine;
//! use serde_json::json;
//!
//! let engine = ComputeEngine::new();
//! let expr = engine.box_json(&json!(["Add", ["Multiply", 2, "x"], ["Multiply", 3, "x"]]));
//! let simplified = engine.simplify(&expr);
//! assert_eq!(engine.to_json(&simplified), json!(["Multiply", 5, "x"]));
//! ```

pub mod assume;
pub mod canonical;
pub mod cost;
pub mod defs;
pub mod engine;
pub mod error;
pub mod eval;
pub mod expr;
pub mod flags;
pub mod json;
pub mod logic;
pub mod operators;
pub mod order;
pub mod pattern;
pub mod rules;
mod scope;
pub mod simplify;
pub mod trig;
pub mod types;

// Re-export main types
pub use defs::{Definition, HoldUntil, OperatorDef, ValueDef};
pub use engine::{
    AngularUnit, CancellationToken, ComputeEngine, EngineOptions, Precision, MACHINE_PRECISION,
    MAX_PRECISION,
};
pub use error::{Error, ErrorKind, Result};
pub use eval::EvalMode;
pub use expr::{Expr, ExprKind, Metadata};
pub use flags::NumericFlags;
pub use json::{from_json, to_json, DigitBudget, JsonSerializationOptions};
pub use operators::{HoldStrategy, OperatorMetadata};
pub use pattern::{match_pattern, Substitution};
pub use simplify::{Rule, SimplifyStep};
pub use types::{Type, TypeName};

// The numeric tower is part of the public surface.
pub use calx_numeric::{NumericValue, Sign};
