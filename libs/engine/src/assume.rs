//! The assumption store.
//!
//! A persistent set of canonical boolean propositions about symbols.
//! `ask` retrieves matching propositions by wildcard pattern; the sign of
//! a symbol is derived by scanning stored (in)equalities against zero.

use crate::expr::Expr;
use crate::flags::NumericFlags;
use crate::pattern::match_pattern;

#[derive(Debug, Default)]
pub struct AssumptionStore {
    props: Vec<Expr>,
}

impl AssumptionStore {
    pub fn new() -> Self {
        AssumptionStore::default()
    }

    /// Records a canonical proposition. Duplicates are dropped.
    pub fn insert(&mut self, prop: Expr) {
        if !self.props.iter().any(|p| p.is_same(&prop)) {
            self.props.push(prop);
        }
    }

    /// Removes every proposition mentioning `symbol`.
    pub fn forget(&mut self, symbol: &str) {
        self.props.retain(|p| !p.contains_symbol(symbol));
    }

    pub fn clear(&mut self) {
        self.props.clear();
    }

    /// All stored propositions unifying with `pattern`.
    pub fn ask(&self, pattern: &Expr) -> Vec<Expr> {
        self.props
            .iter()
            .filter(|p| match_pattern(p, pattern).is_some())
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Expr> {
        self.props.iter()
    }

    /// Numeric flags implied by the stored propositions about `name`.
    ///
    /// Recognized shapes: comparisons of the symbol against zero (either
    /// orientation) and domain memberships `Element(name, DomainSymbol)`.
    pub fn flags_for(&self, name: &str) -> NumericFlags {
        let mut flags = NumericFlags::default();
        for prop in &self.props {
            let Some(op) = prop.operator() else { continue };
            let (Some(lhs), Some(rhs)) = (prop.arg(0), prop.arg(1)) else {
                continue;
            };

            // Orient so the symbol is on the left of the relation.
            let (op, other): (&str, &Expr) = if lhs.is_symbol(name) {
                (op, rhs)
            } else if rhs.is_symbol(name) {
                let flipped = match op {
                    "Less" => "Greater",
                    "Greater" => "Less",
                    "LessEqual" => "GreaterEqual",
                    "GreaterEqual" => "LessEqual",
                    other => other,
                };
                (flipped, lhs)
            } else {
                continue;
            };

            match op {
                "Element" => {
                    match other.symbol_name() {
                        Some("Integers") => flags.integer = Some(true),
                        Some("RationalNumbers") => flags.rational = Some(true),
                        Some("RealNumbers") => flags.real = Some(true),
                        Some("ComplexNumbers") => flags.complex = Some(true),
                        _ => {}
                    }
                    continue;
                }
                _ => {}
            }

            let Some(v) = other.numeric() else { continue };
            if !v.is_zero() {
                continue;
            }
            match op {
                "Greater" => flags.positive = Some(true),
                "GreaterEqual" => flags.non_negative = Some(true),
                "Less" => flags.negative = Some(true),
                "LessEqual" => flags.non_positive = Some(true),
                "Equal" => flags.zero = Some(true),
                "NotEqual" => flags.not_zero = Some(true),
                _ => {}
            }
        }
        let _ = flags.normalize();
        flags
    }
}
