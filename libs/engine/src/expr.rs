//! The expression tree.
//!
//! An [`Expr`] is an immutable, `Arc`-shared node. Structural sharing makes
//! cloning O(1) and lets a canonical expression be pointer-identical to its
//! own canonical form. Each node caches a structural hash computed on first
//! use; equality checks reject on hash mismatch before any recursion.
//!
//! Engine-dependent operations (binding, canonicalization, evaluation) live
//! on [`ComputeEngine`](crate::engine::ComputeEngine) and take expressions
//! by reference; the nodes themselves never point back at the engine, and
//! symbols find their definition by name + scope lookup at use.

use crate::error::ErrorKind;
use calx_numeric::NumericValue;
use once_cell::sync::OnceCell;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Clone)]
pub struct Expr(Arc<ExprNode>);

pub struct ExprNode {
    kind: ExprKind,
    canonical: bool,
    hash: OnceCell<u64>,
    meta: Option<Arc<Metadata>>,
}

/// Optional node metadata. Ignored by hashing and structural equality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub wikidata: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
}

#[derive(Clone)]
pub enum ExprKind {
    Number(NumericValue),
    Symbol(Arc<str>),
    Str(Arc<str>),
    Function { op: Arc<str>, args: Vec<Expr> },
    Tensor { shape: Vec<usize>, elems: Vec<Expr> },
    Dict(BTreeMap<String, Expr>),
}

impl Expr {
    pub(crate) fn new(kind: ExprKind, canonical: bool) -> Expr {
        Expr(Arc::new(ExprNode {
            kind,
            canonical,
            hash: OnceCell::new(),
            meta: None,
        }))
    }

    pub fn with_metadata(self, meta: Metadata) -> Expr {
        Expr(Arc::new(ExprNode {
            kind: self.0.kind.clone(),
            canonical: self.0.canonical,
            hash: OnceCell::new(),
            meta: Some(Arc::new(meta)),
        }))
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.0.meta.as_deref()
    }

    // ------------------------------------------------------------------
    // Constructors (raw: not yet canonical unless trivially so)
    // ------------------------------------------------------------------

    pub fn number(v: NumericValue) -> Expr {
        Expr::new(ExprKind::Number(v), true)
    }

    pub fn int(n: i64) -> Expr {
        Expr::number(NumericValue::from_i64(n))
    }

    pub fn rational(n: i64, d: i64) -> Expr {
        Expr::number(NumericValue::from_ratio(n, d))
    }

    pub fn float(v: f64) -> Expr {
        Expr::number(NumericValue::machine(v))
    }

    pub fn symbol(name: impl AsRef<str>) -> Expr {
        Expr::new(ExprKind::Symbol(Arc::from(name.as_ref())), false)
    }

    pub fn string(s: impl AsRef<str>) -> Expr {
        Expr::new(ExprKind::Str(Arc::from(s.as_ref())), true)
    }

    pub fn function(op: impl AsRef<str>, args: Vec<Expr>) -> Expr {
        Expr::new(
            ExprKind::Function {
                op: Arc::from(op.as_ref()),
                args,
            },
            false,
        )
    }

    pub fn dict(entries: BTreeMap<String, Expr>) -> Expr {
        Expr::new(ExprKind::Dict(entries), false)
    }

    pub fn tensor(shape: Vec<usize>, elems: Vec<Expr>) -> Expr {
        Expr::new(ExprKind::Tensor { shape, elems }, false)
    }

    /// The boolean constants. Already canonical: `True` and `False` are
    /// bound in every engine's global scope.
    pub fn boolean(b: bool) -> Expr {
        Expr::new(
            ExprKind::Symbol(Arc::from(if b { "True" } else { "False" })),
            true,
        )
    }

    /// An inline `["Error", "'kind'", offending?]` expression.
    pub fn error(kind: ErrorKind, offending: Option<Expr>) -> Expr {
        let mut args = vec![Expr::string(kind.as_str())];
        if let Some(off) = offending {
            args.push(off);
        }
        Expr::new(
            ExprKind::Function {
                op: Arc::from("Error"),
                args,
            },
            true,
        )
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    pub fn is_canonical(&self) -> bool {
        self.0.canonical
    }

    /// Same node, flagged canonical. Used by the canonicalizer once an
    /// expression satisfies its operator's canonical form.
    pub(crate) fn into_canonical(self) -> Expr {
        if self.0.canonical {
            return self;
        }
        Expr(Arc::new(ExprNode {
            kind: self.0.kind.clone(),
            canonical: true,
            hash: OnceCell::new(),
            meta: self.0.meta.clone(),
        }))
    }

    pub fn operator(&self) -> Option<&str> {
        match &self.0.kind {
            ExprKind::Function { op, .. } => Some(op),
            _ => None,
        }
    }

    pub fn args(&self) -> &[Expr] {
        match &self.0.kind {
            ExprKind::Function { args, .. } => args,
            ExprKind::Tensor { elems, .. } => elems,
            _ => &[],
        }
    }

    pub fn arg(&self, i: usize) -> Option<&Expr> {
        self.args().get(i)
    }

    pub fn nargs(&self) -> usize {
        self.args().len()
    }

    pub fn symbol_name(&self) -> Option<&str> {
        match &self.0.kind {
            ExprKind::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn string_value(&self) -> Option<&str> {
        match &self.0.kind {
            ExprKind::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn numeric(&self) -> Option<&NumericValue> {
        match &self.0.kind {
            ExprKind::Number(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.numeric()?.try_to_i64()
    }

    // ------------------------------------------------------------------
    // Predicates
    // ------------------------------------------------------------------

    pub fn is_number(&self) -> bool {
        matches!(self.0.kind, ExprKind::Number(_))
    }

    pub fn is_symbol(&self, name: &str) -> bool {
        self.symbol_name() == Some(name)
    }

    pub fn is_function_of(&self, op: &str) -> bool {
        self.operator() == Some(op)
    }

    pub fn is_true(&self) -> bool {
        self.is_symbol("True")
    }

    pub fn is_false(&self) -> bool {
        self.is_symbol("False")
    }

    /// Is this node itself an inline error?
    pub fn is_error(&self) -> bool {
        self.is_function_of("Error")
    }

    /// Errors are contagious: an expression is valid iff no subexpression
    /// is an inline error.
    pub fn is_valid(&self) -> bool {
        if self.is_error() {
            return false;
        }
        match &self.0.kind {
            ExprKind::Function { args, .. } | ExprKind::Tensor { elems: args, .. } => {
                args.iter().all(Expr::is_valid)
            }
            ExprKind::Dict(entries) => entries.values().all(Expr::is_valid),
            _ => true,
        }
    }

    pub fn contains_symbol(&self, name: &str) -> bool {
        match &self.0.kind {
            ExprKind::Symbol(s) => &**s == name,
            ExprKind::Function { args, .. } | ExprKind::Tensor { elems: args, .. } => {
                args.iter().any(|a| a.contains_symbol(name))
            }
            ExprKind::Dict(entries) => entries.values().any(|v| v.contains_symbol(name)),
            _ => false,
        }
    }

    /// Collects the distinct symbol names in the tree, sorted.
    pub fn symbols(&self) -> Vec<Arc<str>> {
        fn walk(e: &Expr, out: &mut Vec<Arc<str>>) {
            match e.kind() {
                ExprKind::Symbol(s) => {
                    if !out.contains(s) {
                        out.push(s.clone());
                    }
                }
                ExprKind::Function { args, .. } | ExprKind::Tensor { elems: args, .. } => {
                    for a in args {
                        walk(a, out);
                    }
                }
                ExprKind::Dict(entries) => {
                    for v in entries.values() {
                        walk(v, out);
                    }
                }
                _ => {}
            }
        }
        let mut out = Vec::new();
        walk(self, &mut out);
        out.sort();
        out
    }

    /// A wildcard is a symbol whose name starts with `_`.
    pub fn is_wildcard(&self) -> bool {
        self.symbol_name().is_some_and(|n| n.starts_with('_'))
    }

    /// Sequence wildcards (`__xs`) capture argument spans.
    pub fn is_sequence_wildcard(&self) -> bool {
        self.symbol_name().is_some_and(|n| n.starts_with("__"))
    }

    // ------------------------------------------------------------------
    // Structural identity
    // ------------------------------------------------------------------

    /// Cached structural hash. Number literals hash by representation:
    /// `0.5` and `1/2` hash (and compare) differently.
    pub fn hash(&self) -> u64 {
        *self.0.hash.get_or_init(|| {
            let mut h = DefaultHasher::new();
            self.hash_into(&mut h);
            h.finish()
        })
    }

    fn hash_into(&self, h: &mut DefaultHasher) {
        match &self.0.kind {
            ExprKind::Number(v) => {
                0u8.hash(h);
                v.repr_hash(h);
            }
            ExprKind::Symbol(s) => {
                1u8.hash(h);
                s.hash(h);
            }
            ExprKind::Str(s) => {
                2u8.hash(h);
                s.hash(h);
            }
            ExprKind::Function { op, args } => {
                3u8.hash(h);
                op.hash(h);
                args.len().hash(h);
                for a in args {
                    a.hash().hash(h);
                }
            }
            ExprKind::Tensor { shape, elems } => {
                4u8.hash(h);
                shape.hash(h);
                for e in elems {
                    e.hash().hash(h);
                }
            }
            ExprKind::Dict(entries) => {
                5u8.hash(h);
                entries.len().hash(h);
                for (k, v) in entries {
                    k.hash(h);
                    v.hash().hash(h);
                }
            }
        }
    }

    /// Structural equality, constructor by constructor. Pointer equality
    /// and hash mismatch short-circuit before any deep comparison.
    pub fn is_same(&self, other: &Expr) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        if self.hash() != other.hash() {
            return false;
        }
        match (&self.0.kind, &other.0.kind) {
            (ExprKind::Number(a), ExprKind::Number(b)) => a == b,
            (ExprKind::Symbol(a), ExprKind::Symbol(b)) => a == b,
            (ExprKind::Str(a), ExprKind::Str(b)) => a == b,
            (
                ExprKind::Function { op: oa, args: aa },
                ExprKind::Function { op: ob, args: ab },
            ) => oa == ob && aa.len() == ab.len() && aa.iter().zip(ab).all(|(x, y)| x.is_same(y)),
            (
                ExprKind::Tensor { shape: sa, elems: ea },
                ExprKind::Tensor { shape: sb, elems: eb },
            ) => sa == sb && ea.iter().zip(eb).all(|(x, y)| x.is_same(y)),
            (ExprKind::Dict(a), ExprKind::Dict(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|((ka, va), (kb, vb))| ka == kb && va.is_same(vb))
            }
            _ => false,
        }
    }

    /// Pointer identity (the strongest notion of sameness).
    pub fn ptr_eq(&self, other: &Expr) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    // ------------------------------------------------------------------
    // Structural transformation
    // ------------------------------------------------------------------

    /// Applies `f` to each operand; an empty-`Sequence` return removes the
    /// operand. The result is raw (not canonical).
    pub fn map(&self, f: &mut impl FnMut(&Expr) -> Expr) -> Expr {
        match &self.0.kind {
            ExprKind::Function { op, args } => {
                let mut out = Vec::with_capacity(args.len());
                for a in args {
                    let mapped = f(a);
                    if mapped.is_function_of("Sequence") && mapped.nargs() == 0 {
                        continue;
                    }
                    out.push(mapped);
                }
                Expr::function(op.clone(), out)
            }
            ExprKind::Tensor { shape, elems } => {
                Expr::tensor(shape.clone(), elems.iter().map(|e| f(e)).collect())
            }
            ExprKind::Dict(entries) => Expr::dict(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), f(v)))
                    .collect(),
            ),
            _ => self.clone(),
        }
    }

    /// Replaces each occurrence of the mapped symbols. The result is raw;
    /// callers re-canonicalize when needed.
    pub fn subs(&self, bindings: &std::collections::HashMap<Arc<str>, Expr>) -> Expr {
        match &self.0.kind {
            ExprKind::Symbol(s) => match bindings.get(s) {
                Some(replacement) => replacement.clone(),
                None => self.clone(),
            },
            ExprKind::Function { .. } | ExprKind::Tensor { .. } | ExprKind::Dict(_) => {
                self.map(&mut |a| a.subs(bindings))
            }
            _ => self.clone(),
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            ExprKind::Number(v) => write!(f, "{v}"),
            ExprKind::Symbol(s) => f.write_str(s),
            ExprKind::Str(s) => write!(f, "'{s}'"),
            ExprKind::Function { op, args } => {
                write!(f, "{op}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{a}")?;
                }
                f.write_str(")")
            }
            ExprKind::Tensor { shape, elems } => {
                write!(f, "Tensor{shape:?}(")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{e}")?;
                }
                f.write_str(")")
            }
            ExprKind::Dict(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_same_and_hash_agree() {
        let a = Expr::function("Add", vec![Expr::symbol("x"), Expr::int(1)]);
        let b = Expr::function("Add", vec![Expr::symbol("x"), Expr::int(1)]);
        assert!(a.is_same(&b));
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_number_representation_matters() {
        let half = Expr::rational(1, 2);
        let point_five = Expr::float(0.5);
        assert!(!half.is_same(&point_five));
        assert_ne!(half.hash(), point_five.hash());
    }

    #[test]
    fn test_error_contagion() {
        let bad = Expr::error(crate::error::ErrorKind::MissingArgument, None);
        let tree = Expr::function("Add", vec![Expr::int(1), bad]);
        assert!(!tree.is_valid());
        assert!(tree.arg(0).unwrap().is_valid());
    }

    #[test]
    fn test_subs() {
        let mut bindings = std::collections::HashMap::new();
        bindings.insert(Arc::from("x"), Expr::int(5));
        let e = Expr::function("Multiply", vec![Expr::int(2), Expr::symbol("x")]);
        let out = e.subs(&bindings);
        assert!(out.arg(1).unwrap().is_same(&Expr::int(5)));
    }

    #[test]
    fn test_map_removes_empty_sequence() {
        let e = Expr::function("Add", vec![Expr::symbol("x"), Expr::symbol("y")]);
        let out = e.map(&mut |a| {
            if a.is_symbol("y") {
                Expr::function("Sequence", vec![])
            } else {
                a.clone()
            }
        });
        assert_eq!(out.nargs(), 1);
    }

    #[test]
    fn test_symbols_sorted_distinct() {
        let e = Expr::function(
            "Add",
            vec![
                Expr::symbol("b"),
                Expr::symbol("a"),
                Expr::symbol("b"),
                Expr::int(3),
            ],
        );
        let syms = e.symbols();
        assert_eq!(syms.len(), 2);
        assert_eq!(&*syms[0], "a");
        assert_eq!(&*syms[1], "b");
    }
}
