//! The type lattice: domain literals, type constructors, and subtyping.
//!
//! Literal types form a DAG (`Integers ⊑ RationalNumbers ⊑ … ⊑ Numbers`,
//! with the extended-real branch joining the extended-complex one).
//! Constructors compare structurally: `FunctionOf` with covariant result
//! and contravariant parameters, `TupleOf` pointwise, `Union`/`Intersection`
//! by quantification over alternatives. `widen` and `narrow` are the two
//! directions of inference: widening accumulates possibilities for return
//! values, narrowing accumulates constraints on parameters.

use std::fmt;

/// Named domain literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeName {
    Anything,
    /// Not statically known; compatible in both directions.
    Unknown,
    /// The domain of the `Nothing` symbol (an absent optional argument).
    NothingDomain,
    /// The empty type: result of narrowing incompatible types.
    Void,
    Values,
    Numbers,
    ExtendedComplexNumbers,
    ExtendedRealNumbers,
    ComplexNumbers,
    ImaginaryNumbers,
    RealNumbers,
    AlgebraicNumbers,
    RationalNumbers,
    Integers,
    Booleans,
    Strings,
    Symbols,
    Collections,
    Lists,
    Tuples,
    Dictionaries,
    Functions,
}

impl TypeName {
    /// Direct supertypes in the literal DAG.
    fn parents(self) -> &'static [TypeName] {
        use TypeName::*;
        match self {
            Anything => &[],
            Unknown => &[Anything],
            NothingDomain => &[Anything],
            Void => &[],
            Values => &[Anything],
            Numbers => &[Values],
            ExtendedComplexNumbers => &[Numbers],
            ExtendedRealNumbers => &[ExtendedComplexNumbers],
            ComplexNumbers => &[ExtendedComplexNumbers],
            ImaginaryNumbers => &[ComplexNumbers],
            RealNumbers => &[ComplexNumbers, ExtendedRealNumbers],
            AlgebraicNumbers => &[RealNumbers],
            RationalNumbers => &[AlgebraicNumbers],
            Integers => &[RationalNumbers],
            Booleans => &[Values],
            Strings => &[Values],
            Symbols => &[Values],
            Collections => &[Values],
            Lists => &[Collections],
            Tuples => &[Collections],
            Dictionaries => &[Collections],
            Functions => &[Values],
        }
    }

    /// Reflexive-transitive reachability in the literal DAG.
    fn is_sub_literal(self, other: TypeName) -> bool {
        if self == other || other == TypeName::Anything {
            return true;
        }
        self.parents().iter().any(|p| p.is_sub_literal(other))
    }

    pub fn as_str(self) -> &'static str {
        use TypeName::*;
        match self {
            Anything => "Anything",
            Unknown => "Unknown",
            NothingDomain => "NothingDomain",
            Void => "Void",
            Values => "Values",
            Numbers => "Numbers",
            ExtendedComplexNumbers => "ExtendedComplexNumbers",
            ExtendedRealNumbers => "ExtendedRealNumbers",
            ComplexNumbers => "ComplexNumbers",
            ImaginaryNumbers => "ImaginaryNumbers",
            RealNumbers => "RealNumbers",
            AlgebraicNumbers => "AlgebraicNumbers",
            RationalNumbers => "RationalNumbers",
            Integers => "Integers",
            Booleans => "Booleans",
            Strings => "Strings",
            Symbols => "Symbols",
            Collections => "Collections",
            Lists => "Lists",
            Tuples => "Tuples",
            Dictionaries => "Dictionaries",
            Functions => "Functions",
        }
    }
}

/// A type: a literal or a constructor application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Literal(TypeName),
    FunctionOf {
        params: Vec<Type>,
        result: Box<Type>,
    },
    ListOf(Box<Type>),
    TupleOf(Vec<Type>),
    DictionaryOf(Box<Type>),
    Union(Vec<Type>),
    Intersection(Vec<Type>),
    /// An optional trailing parameter; its absence has type
    /// `NothingDomain`.
    OptArg(Box<Type>),
    /// A variadic tail: zero or more arguments of the wrapped type.
    VarArg(Box<Type>),
    Covariant(Box<Type>),
    Contravariant(Box<Type>),
    Invariant(Box<Type>),
    Bivariant(Box<Type>),
}

impl Type {
    pub const ANYTHING: Type = Type::Literal(TypeName::Anything);
    pub const UNKNOWN: Type = Type::Literal(TypeName::Unknown);
    pub const VOID: Type = Type::Literal(TypeName::Void);
    pub const NOTHING: Type = Type::Literal(TypeName::NothingDomain);
    pub const NUMBERS: Type = Type::Literal(TypeName::Numbers);
    pub const INTEGERS: Type = Type::Literal(TypeName::Integers);
    pub const RATIONALS: Type = Type::Literal(TypeName::RationalNumbers);
    pub const REALS: Type = Type::Literal(TypeName::RealNumbers);
    pub const COMPLEXES: Type = Type::Literal(TypeName::ComplexNumbers);
    pub const EXTENDED_REALS: Type = Type::Literal(TypeName::ExtendedRealNumbers);
    pub const BOOLEANS: Type = Type::Literal(TypeName::Booleans);
    pub const STRINGS: Type = Type::Literal(TypeName::Strings);
    pub const SYMBOLS: Type = Type::Literal(TypeName::Symbols);
    pub const FUNCTIONS: Type = Type::Literal(TypeName::Functions);

    pub fn function_of(params: Vec<Type>, result: Type) -> Type {
        Type::FunctionOf {
            params,
            result: Box::new(result),
        }
    }

    /// The literal a constructor falls back to (`FunctionOf ⊑ Functions`,
    /// `ListOf ⊑ Lists`, …).
    fn base_literal(&self) -> Option<TypeName> {
        match self {
            Type::Literal(n) => Some(*n),
            Type::FunctionOf { .. } => Some(TypeName::Functions),
            Type::ListOf(_) => Some(TypeName::Lists),
            Type::TupleOf(_) => Some(TypeName::Tuples),
            Type::DictionaryOf(_) => Some(TypeName::Dictionaries),
            _ => None,
        }
    }

    /// The subtype partial order.
    pub fn is_subtype_of(&self, other: &Type) -> bool {
        use Type::*;

        // Unknown is compatible in both directions; Void is bottom.
        if matches!(self, Literal(TypeName::Unknown)) || matches!(other, Literal(TypeName::Unknown))
        {
            return true;
        }
        if matches!(self, Literal(TypeName::Void)) {
            return true;
        }

        match (self, other) {
            // Variance wrappers direct the comparison.
            (Covariant(t), _) => t.is_subtype_of(other),
            (_, Covariant(t)) => self.is_subtype_of(t),
            (Contravariant(t), _) => other.is_subtype_of(t),
            (_, Contravariant(t)) => t.is_subtype_of(self),
            (Invariant(t), _) => t.as_ref() == other,
            (_, Invariant(t)) => self == t.as_ref(),
            (Bivariant(t), _) => t.is_subtype_of(other) || other.is_subtype_of(t),
            (_, Bivariant(t)) => self.is_subtype_of(t) || t.is_subtype_of(self),

            // Union on the left: every alternative must fit. On the
            // right: any alternative suffices.
            (Union(alts), _) => alts.iter().all(|t| t.is_subtype_of(other)),
            (_, Union(alts)) => alts.iter().any(|t| self.is_subtype_of(t)),
            // Intersection is dual.
            (Intersection(alts), _) => alts.iter().any(|t| t.is_subtype_of(other)),
            (_, Intersection(alts)) => alts.iter().all(|t| self.is_subtype_of(t)),

            // An optional parameter accepts its payload or absence.
            (_, OptArg(t)) => {
                matches!(self, Literal(TypeName::NothingDomain)) || self.is_subtype_of(t)
            }
            (OptArg(t), _) => t.is_subtype_of(other),
            (_, VarArg(t)) => self.is_subtype_of(t),
            (VarArg(t), _) => t.is_subtype_of(other),

            (Literal(a), Literal(b)) => a.is_sub_literal(*b),

            (
                FunctionOf { params: pa, result: ra },
                FunctionOf { params: pb, result: rb },
            ) => {
                // Covariant result, contravariant parameters.
                ra.is_subtype_of(rb) && params_compatible(pb, pa)
            }
            (ListOf(a), ListOf(b)) => a.is_subtype_of(b),
            (DictionaryOf(a), DictionaryOf(b)) => a.is_subtype_of(b),
            (TupleOf(a), TupleOf(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.is_subtype_of(y))
            }

            // Constructor against a literal: compare the base.
            (_, Literal(b)) => self
                .base_literal()
                .is_some_and(|a| a.is_sub_literal(*b)),
            _ => false,
        }
    }

    /// Least common ancestor walk; used when inferring return types.
    pub fn widen(&self, other: &Type) -> Type {
        if other.is_subtype_of(self) {
            return self.clone();
        }
        if self.is_subtype_of(other) {
            return other.clone();
        }
        // Walk up this type's literal ancestry until the other fits.
        let mut frontier = match self.base_literal() {
            Some(n) => vec![n],
            None => return Type::ANYTHING,
        };
        loop {
            let mut next = Vec::new();
            for name in &frontier {
                if other.is_subtype_of(&Type::Literal(*name)) {
                    return Type::Literal(*name);
                }
                next.extend_from_slice(name.parents());
            }
            if next.is_empty() {
                return Type::ANYTHING;
            }
            frontier = next;
        }
    }

    /// The more specific of two comparable types; `Void` when
    /// incomparable. Used when inferring parameter types.
    pub fn narrow(&self, other: &Type) -> Type {
        if self.is_subtype_of(other) {
            return self.clone();
        }
        if other.is_subtype_of(self) {
            return other.clone();
        }
        Type::VOID
    }

    /// Checks an argument list against this type, which must be a
    /// `FunctionOf`. Returns the result type on success.
    pub fn match_signature(&self, args: &[Type]) -> Option<Type> {
        let Type::FunctionOf { params, result } = self else {
            return None;
        };
        if params_accept(params, args) {
            Some((**result).clone())
        } else {
            None
        }
    }
}

/// `provided` parameter lists accept at least what `required` does
/// (pointwise contravariant compatibility with OptArg/VarArg tails).
fn params_compatible(required: &[Type], provided: &[Type]) -> bool {
    // Every argument list the required params accept must be accepted by
    // the provided params. Approximate by pointwise comparison; extra
    // provided parameters are fine when optional or variadic.
    if provided.len() > required.len() && !matches!(required.last(), Some(Type::VarArg(_))) {
        let extras = &provided[required.len()..];
        if !extras
            .iter()
            .all(|p| matches!(p, Type::OptArg(_) | Type::VarArg(_)))
        {
            return false;
        }
    }
    let pointwise = required.len().min(provided.len());
    provided[..pointwise]
        .iter()
        .enumerate()
        .all(|(i, p)| required[i].is_subtype_of(p))
        && (required.len() <= provided.len()
            || matches!(provided.last(), Some(Type::VarArg(_)))
            || required[provided.len()..]
                .iter()
                .all(|r| matches!(r, Type::OptArg(_) | Type::VarArg(_))))
}

/// Does a concrete argument list satisfy a parameter list?
fn params_accept(params: &[Type], args: &[Type]) -> bool {
    let mut ai = 0;
    for (pi, param) in params.iter().enumerate() {
        match param {
            Type::VarArg(t) => {
                // Kleene repeat: the rest of the arguments, if any, must
                // all match.
                debug_assert!(pi == params.len() - 1);
                while ai < args.len() {
                    if !args[ai].is_subtype_of(t) {
                        return false;
                    }
                    ai += 1;
                }
                return true;
            }
            Type::OptArg(t) => {
                if ai < args.len() {
                    if !args[ai].is_subtype_of(t) {
                        return false;
                    }
                    ai += 1;
                }
                // Absent optional argument: fine, keep going.
            }
            _ => {
                if ai >= args.len() {
                    return false;
                }
                if !args[ai].is_subtype_of(param) {
                    return false;
                }
                ai += 1;
            }
        }
    }
    ai == args.len()
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, ts: &[Type], sep: &str) -> fmt::Result {
            for (i, t) in ts.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{t}")?;
            }
            Ok(())
        }
        match self {
            Type::Literal(n) => f.write_str(n.as_str()),
            Type::FunctionOf { params, result } => {
                f.write_str("(")?;
                join(f, params, ", ")?;
                write!(f, ") -> {result}")
            }
            Type::ListOf(t) => write!(f, "ListOf({t})"),
            Type::TupleOf(ts) => {
                f.write_str("TupleOf(")?;
                join(f, ts, ", ")?;
                f.write_str(")")
            }
            Type::DictionaryOf(t) => write!(f, "DictionaryOf({t})"),
            Type::Union(ts) => join(f, ts, " | "),
            Type::Intersection(ts) => join(f, ts, " & "),
            Type::OptArg(t) => write!(f, "{t}?"),
            Type::VarArg(t) => write!(f, "{t}*"),
            Type::Covariant(t) | Type::Contravariant(t) | Type::Invariant(t)
            | Type::Bivariant(t) => write!(f, "{t}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtype_reflexive() {
        for t in [Type::INTEGERS, Type::BOOLEANS, Type::ANYTHING] {
            assert!(t.is_subtype_of(&t));
        }
    }

    #[test]
    fn test_literal_chain() {
        assert!(Type::INTEGERS.is_subtype_of(&Type::RATIONALS));
        assert!(Type::INTEGERS.is_subtype_of(&Type::REALS));
        assert!(Type::INTEGERS.is_subtype_of(&Type::NUMBERS));
        assert!(Type::REALS.is_subtype_of(&Type::EXTENDED_REALS));
        assert!(!Type::REALS.is_subtype_of(&Type::INTEGERS));
        assert!(!Type::BOOLEANS.is_subtype_of(&Type::NUMBERS));
    }

    #[test]
    fn test_function_variance() {
        // (Reals -> Integers) ⊑ (Integers -> Reals): result covariant,
        // params contravariant.
        let f = Type::function_of(vec![Type::REALS], Type::INTEGERS);
        let g = Type::function_of(vec![Type::INTEGERS], Type::REALS);
        assert!(f.is_subtype_of(&g));
        assert!(!g.is_subtype_of(&f));
        assert!(f.is_subtype_of(&Type::FUNCTIONS));
    }

    #[test]
    fn test_union_intersection() {
        let num_or_bool = Type::Union(vec![Type::NUMBERS, Type::BOOLEANS]);
        assert!(Type::INTEGERS.is_subtype_of(&num_or_bool));
        assert!(!num_or_bool.is_subtype_of(&Type::NUMBERS));
        let both = Type::Intersection(vec![Type::REALS, Type::RATIONALS]);
        assert!(both.is_subtype_of(&Type::REALS));
    }

    #[test]
    fn test_tuple_pointwise() {
        let a = Type::TupleOf(vec![Type::INTEGERS, Type::BOOLEANS]);
        let b = Type::TupleOf(vec![Type::REALS, Type::BOOLEANS]);
        assert!(a.is_subtype_of(&b));
        let c = Type::TupleOf(vec![Type::INTEGERS]);
        assert!(!a.is_subtype_of(&c));
    }

    #[test]
    fn test_widen_narrow() {
        assert_eq!(Type::INTEGERS.widen(&Type::RATIONALS), Type::RATIONALS);
        assert_eq!(
            Type::REALS.widen(&Type::Literal(TypeName::ImaginaryNumbers)),
            Type::COMPLEXES
        );
        assert_eq!(Type::INTEGERS.narrow(&Type::REALS), Type::INTEGERS);
        assert_eq!(Type::BOOLEANS.narrow(&Type::NUMBERS), Type::VOID);
    }

    #[test]
    fn test_signature_matching() {
        let sig = Type::function_of(
            vec![
                Type::NUMBERS,
                Type::OptArg(Box::new(Type::INTEGERS)),
            ],
            Type::NUMBERS,
        );
        assert!(sig.match_signature(&[Type::REALS]).is_some());
        assert!(sig.match_signature(&[Type::REALS, Type::INTEGERS]).is_some());
        assert!(sig.match_signature(&[]).is_none());
        assert!(sig
            .match_signature(&[Type::REALS, Type::BOOLEANS])
            .is_none());

        let variadic = Type::function_of(
            vec![Type::VarArg(Box::new(Type::NUMBERS))],
            Type::NUMBERS,
        );
        assert!(variadic.match_signature(&[]).is_some());
        assert!(variadic
            .match_signature(&[Type::INTEGERS, Type::REALS, Type::RATIONALS])
            .is_some());
        assert!(variadic.match_signature(&[Type::BOOLEANS]).is_none());
    }

    #[test]
    fn test_transitivity_spot_checks() {
        let chain = [
            Type::INTEGERS,
            Type::RATIONALS,
            Type::REALS,
            Type::COMPLEXES,
            Type::NUMBERS,
            Type::ANYTHING,
        ];
        for i in 0..chain.len() {
            for j in i..chain.len() {
                assert!(chain[i].is_subtype_of(&chain[j]));
            }
        }
    }
}
