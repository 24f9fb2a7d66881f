//! Builtin operator registry.
//!
//! Maps operator names to metadata: arity, algebraic properties, the
//! complexity key driving commutative argument order, the hold strategy,
//! and the default result type.
//!
//! Uses a compile-time perfect hash map (phf) for O(1) operator name
//! lookups with zero runtime allocation. Behavior (canonicalization,
//! evaluation) dispatches by name in the `canonical` and `eval` modules;
//! user-defined operators layer on top through the scope chain.

use crate::types::TypeName;
use phf::phf_map;

/// Which operands are passed unevaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldStrategy {
    /// Evaluate all operands before the handler runs.
    None,
    /// Pass all operands unevaluated.
    All,
    /// Hold the first operand, evaluate the rest.
    First,
    /// Evaluate the first operand, hold the rest.
    Rest,
}

#[derive(Debug, Clone, Copy)]
pub struct OperatorMetadata {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: Option<usize>, // None = unbounded
    /// Sort key for commutative canonical order (descending).
    pub complexity: u32,
    pub associative: bool,
    pub commutative: bool,
    pub idempotent: bool,
    pub involution: bool,
    pub threadable: bool,
    pub pure: bool,
    pub lazy: bool,
    /// Binds variables (quantifiers); evaluation brackets a fresh scope.
    pub scoped: bool,
    pub hold: HoldStrategy,
    pub result: TypeName,
}

const DEFAULTS: OperatorMetadata = OperatorMetadata {
    name: "",
    min_args: 0,
    max_args: None,
    complexity: 4000,
    associative: false,
    commutative: false,
    idempotent: false,
    involution: false,
    threadable: false,
    pure: true,
    lazy: false,
    scoped: false,
    hold: HoldStrategy::None,
    result: TypeName::Anything,
};

const fn arith(name: &'static str, min: usize, max: Option<usize>, complexity: u32) -> OperatorMetadata {
    OperatorMetadata {
        name,
        min_args: min,
        max_args: max,
        complexity,
        threadable: true,
        result: TypeName::Numbers,
        ..DEFAULTS
    }
}

const fn boolean(name: &'static str, min: usize, max: Option<usize>) -> OperatorMetadata {
    OperatorMetadata {
        name,
        min_args: min,
        max_args: max,
        complexity: 10_000,
        result: TypeName::Booleans,
        ..DEFAULTS
    }
}

const fn relation(name: &'static str) -> OperatorMetadata {
    OperatorMetadata {
        name,
        min_args: 2,
        max_args: Some(2),
        complexity: 11_000,
        result: TypeName::Booleans,
        ..DEFAULTS
    }
}

const fn trig(name: &'static str) -> OperatorMetadata {
    OperatorMetadata {
        name,
        min_args: 1,
        max_args: Some(1),
        complexity: 5600,
        threadable: true,
        result: TypeName::Numbers,
        ..DEFAULTS
    }
}

const fn quantifier(name: &'static str) -> OperatorMetadata {
    OperatorMetadata {
        name,
        min_args: 2,
        max_args: Some(2),
        complexity: 12_000,
        hold: HoldStrategy::All,
        scoped: true,
        result: TypeName::Booleans,
        ..DEFAULTS
    }
}

static OPERATORS: phf::Map<&'static str, OperatorMetadata> = phf_map! {
    // Arithmetic
    "Add" => OperatorMetadata {
        associative: true, commutative: true,
        ..arith("Add", 1, None, 1100)
    },
    "Subtract" => arith("Subtract", 2, Some(2), 1150),
    "Negate" => OperatorMetadata {
        involution: true,
        ..arith("Negate", 1, Some(1), 1200)
    },
    "Multiply" => OperatorMetadata {
        associative: true, commutative: true,
        ..arith("Multiply", 1, None, 2100)
    },
    "Divide" => arith("Divide", 2, Some(2), 3000),
    "Power" => arith("Power", 2, Some(2), 3500),
    "Root" => arith("Root", 2, Some(2), 3800),
    "Sqrt" => arith("Sqrt", 1, Some(1), 3700),
    "Abs" => arith("Abs", 1, Some(1), 4500),
    "Exp" => arith("Exp", 1, Some(1), 5200),
    "Ln" => arith("Ln", 1, Some(1), 5300),
    "Log" => arith("Log", 1, Some(2), 5400),

    // Combinatorics
    "Factorial" => arith("Factorial", 1, Some(1), 6100),
    "Factorial2" => arith("Factorial2", 1, Some(1), 6200),
    "Gamma" => arith("Gamma", 1, Some(1), 6300),
    "Binomial" => arith("Binomial", 2, Some(2), 6400),

    // Trigonometry
    "Sin" => trig("Sin"),
    "Cos" => trig("Cos"),
    "Tan" => trig("Tan"),
    "Cot" => trig("Cot"),
    "Sec" => trig("Sec"),
    "Csc" => trig("Csc"),
    "Arcsin" => trig("Arcsin"),
    "Arccos" => trig("Arccos"),
    "Arctan" => trig("Arctan"),
    "Arccot" => trig("Arccot"),
    "Arcsec" => trig("Arcsec"),
    "Arccsc" => trig("Arccsc"),
    "Sinh" => trig("Sinh"),
    "Cosh" => trig("Cosh"),
    "Tanh" => trig("Tanh"),
    "Coth" => trig("Coth"),
    "Sech" => trig("Sech"),
    "Csch" => trig("Csch"),
    "Arsinh" => trig("Arsinh"),
    "Artanh" => trig("Artanh"),
    "Arcoth" => trig("Arcoth"),
    "Arcsch" => trig("Arcsch"),

    // Boolean connectives
    "And" => OperatorMetadata {
        associative: true, commutative: true, idempotent: true,
        ..boolean("And", 1, None)
    },
    "Or" => OperatorMetadata {
        associative: true, commutative: true, idempotent: true,
        ..boolean("Or", 1, None)
    },
    "Not" => OperatorMetadata {
        involution: true,
        ..boolean("Not", 1, Some(1))
    },
    "Implies" => boolean("Implies", 2, Some(2)),
    "Equivalent" => boolean("Equivalent", 2, Some(2)),
    "Xor" => OperatorMetadata {
        associative: true, commutative: true,
        ..boolean("Xor", 1, None)
    },
    "Nand" => OperatorMetadata {
        commutative: true,
        ..boolean("Nand", 1, None)
    },
    "Nor" => OperatorMetadata {
        commutative: true,
        ..boolean("Nor", 1, None)
    },

    // Normal forms and minimization
    "MinimalDNF" => boolean("MinimalDNF", 1, Some(1)),
    "MinimalCNF" => boolean("MinimalCNF", 1, Some(1)),
    "PrimeImplicants" => OperatorMetadata {
        result: TypeName::Lists,
        ..boolean("PrimeImplicants", 1, Some(1))
    },
    "PrimeImplicates" => OperatorMetadata {
        result: TypeName::Lists,
        ..boolean("PrimeImplicates", 1, Some(1))
    },
    "Satisfiable" => boolean("Satisfiable", 1, Some(1)),
    "Tautology" => boolean("Tautology", 1, Some(1)),

    // Quantifiers
    "ForAll" => quantifier("ForAll"),
    "Exists" => quantifier("Exists"),
    "ExistsUnique" => quantifier("ExistsUnique"),
    "NotForAll" => quantifier("NotForAll"),
    "NotExists" => quantifier("NotExists"),

    // Relations
    "Equal" => OperatorMetadata { commutative: true, ..relation("Equal") },
    "NotEqual" => OperatorMetadata { commutative: true, ..relation("NotEqual") },
    "Less" => relation("Less"),
    "LessEqual" => relation("LessEqual"),
    "Greater" => relation("Greater"),
    "GreaterEqual" => relation("GreaterEqual"),
    "Element" => relation("Element"),

    // Collections and structure
    "List" => OperatorMetadata {
        complexity: 8000, result: TypeName::Lists, ..DEFAULTS
    },
    "Set" => OperatorMetadata {
        commutative: true, idempotent: true,
        complexity: 8100, result: TypeName::Collections, ..DEFAULTS
    },
    "Tuple" => OperatorMetadata {
        complexity: 8200, result: TypeName::Tuples, ..DEFAULTS
    },
    "Sequence" => OperatorMetadata {
        associative: true, complexity: 8300, ..DEFAULTS
    },
    "Dictionary" => OperatorMetadata {
        complexity: 8400, result: TypeName::Dictionaries, ..DEFAULTS
    },

    // Control
    "Hold" => OperatorMetadata {
        min_args: 1, max_args: Some(1), hold: HoldStrategy::All,
        complexity: 9000, ..DEFAULTS
    },
    "Error" => OperatorMetadata {
        min_args: 1, max_args: Some(3), hold: HoldStrategy::All,
        complexity: 9999, pure: false, ..DEFAULTS
    },
};

pub fn metadata(op: &str) -> Option<&'static OperatorMetadata> {
    OPERATORS.get(op)
}

/// Complexity key for commutative ordering; unknown operators rank
/// between builtins and collections.
pub fn complexity_of(op: &str) -> u32 {
    metadata(op).map_or(DEFAULTS.complexity, |m| m.complexity)
}

pub fn is_associative(op: &str) -> bool {
    metadata(op).is_some_and(|m| m.associative)
}

pub fn is_commutative(op: &str) -> bool {
    metadata(op).is_some_and(|m| m.commutative)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let add = metadata("Add").unwrap();
        assert!(add.associative && add.commutative);
        assert!(metadata("NoSuchOperator").is_none());
    }

    #[test]
    fn test_hold_strategies() {
        assert_eq!(metadata("ForAll").unwrap().hold, HoldStrategy::All);
        assert_eq!(metadata("Add").unwrap().hold, HoldStrategy::None);
    }

    #[test]
    fn test_complexity_ordering() {
        // Powers sort before products, products before sums.
        assert!(complexity_of("Power") > complexity_of("Multiply"));
        assert!(complexity_of("Multiply") > complexity_of("Add"));
    }
}
