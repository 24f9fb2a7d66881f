//! Property-based invariants over randomly generated expressions.

use calx_engine::logic::{forms, truth_table};
use calx_engine::{ComputeEngine, Expr, Type};
use quickcheck::{Arbitrary, Gen, QuickCheck};
use serde_json::{json, Value};

fn engine() -> ComputeEngine {
    ComputeEngine::new()
}

// ----------------------------------------------------------------------
// Generators
// ----------------------------------------------------------------------

/// A random boolean expression over three variables, as MathJSON.
#[derive(Clone, Debug)]
struct BoolJson(Value);

fn gen_bool(g: &mut Gen, depth: usize) -> Value {
    let leaf = ["p", "q", "r", "True", "False"];
    if depth == 0 || u8::arbitrary(g) % 4 == 0 {
        return json!(*g.choose(&leaf).unwrap());
    }
    match u8::arbitrary(g) % 8 {
        0 => json!(["Not", gen_bool(g, depth - 1)]),
        1 => json!(["And", gen_bool(g, depth - 1), gen_bool(g, depth - 1)]),
        2 => json!(["Or", gen_bool(g, depth - 1), gen_bool(g, depth - 1)]),
        3 => json!(["Implies", gen_bool(g, depth - 1), gen_bool(g, depth - 1)]),
        4 => json!(["Equivalent", gen_bool(g, depth - 1), gen_bool(g, depth - 1)]),
        5 => json!(["Xor", gen_bool(g, depth - 1), gen_bool(g, depth - 1)]),
        6 => json!(["Nand", gen_bool(g, depth - 1), gen_bool(g, depth - 1)]),
        _ => json!(["Nor", gen_bool(g, depth - 1), gen_bool(g, depth - 1)]),
    }
}

impl Arbitrary for BoolJson {
    fn arbitrary(g: &mut Gen) -> Self {
        BoolJson(gen_bool(g, 4))
    }
}

/// A random arithmetic expression over two variables and small literals.
#[derive(Clone, Debug)]
struct ArithJson(Value);

fn gen_arith(g: &mut Gen, depth: usize) -> Value {
    if depth == 0 || u8::arbitrary(g) % 3 == 0 {
        return match u8::arbitrary(g) % 4 {
            0 => json!("x"),
            1 => json!("y"),
            2 => json!((i8::arbitrary(g) % 10) as i64),
            _ => json!(["Rational", 1 + (u8::arbitrary(g) % 5) as i64, 2]),
        };
    }
    match u8::arbitrary(g) % 6 {
        0 => json!(["Add", gen_arith(g, depth - 1), gen_arith(g, depth - 1)]),
        1 => json!(["Multiply", gen_arith(g, depth - 1), gen_arith(g, depth - 1)]),
        2 => json!(["Negate", gen_arith(g, depth - 1)]),
        3 => json!(["Power", gen_arith(g, depth - 1), (1 + (u8::arbitrary(g) % 4)) as i64]),
        4 => json!(["Divide", gen_arith(g, depth - 1), gen_arith(g, depth - 1)]),
        _ => json!(["Abs", gen_arith(g, depth - 1)]),
    }
}

impl Arbitrary for ArithJson {
    fn arbitrary(g: &mut Gen) -> Self {
        ArithJson(gen_arith(g, 3))
    }
}

#[derive(Clone, Debug)]
struct SmallType(Type);

impl Arbitrary for SmallType {
    fn arbitrary(g: &mut Gen) -> Self {
        let literals = [
            Type::INTEGERS,
            Type::RATIONALS,
            Type::REALS,
            Type::COMPLEXES,
            Type::NUMBERS,
            Type::BOOLEANS,
            Type::STRINGS,
            Type::ANYTHING,
        ];
        let base = g.choose(&literals).unwrap().clone();
        match u8::arbitrary(g) % 4 {
            0 => SmallType(Type::ListOf(Box::new(base))),
            1 => SmallType(Type::function_of(vec![base.clone()], base)),
            _ => SmallType(base),
        }
    }
}

// ----------------------------------------------------------------------
// Properties
// ----------------------------------------------------------------------

#[test]
fn boxing_is_idempotent_by_reference() {
    fn prop(input: ArithJson) -> bool {
        let e = engine();
        let boxed = e.box_json(&input.0);
        let again = e.box_expr(boxed.clone());
        boxed.ptr_eq(&again)
    }
    QuickCheck::new().quickcheck(prop as fn(ArithJson) -> bool);
}

#[test]
fn json_round_trip_preserves_structure() {
    fn prop(input: ArithJson) -> bool {
        let e = engine();
        let boxed = e.box_json(&input.0);
        let back = e.box_json(&e.to_json(&boxed));
        boxed.is_same(&back)
    }
    QuickCheck::new().quickcheck(prop as fn(ArithJson) -> bool);
}

#[test]
fn is_same_implies_equal_hash() {
    fn prop(a: ArithJson, b: ArithJson) -> bool {
        let e = engine();
        let x = e.box_json(&a.0);
        let y = e.box_json(&b.0);
        !x.is_same(&y) || x.hash() == y.hash()
    }
    QuickCheck::new().quickcheck(prop as fn(ArithJson, ArithJson) -> bool);
}

#[test]
fn simplifier_cost_is_monotone() {
    fn prop(input: ArithJson) -> bool {
        let e = engine();
        let boxed = e.box_json(&input.0);
        let steps = e.simplify_steps(&boxed, &[]);
        let mut last = e.cost(&boxed);
        for step in steps {
            let c = e.cost(&step.expr);
            if c >= last {
                return false;
            }
            last = c;
        }
        true
    }
    QuickCheck::new().quickcheck(prop as fn(ArithJson) -> bool);
}

#[test]
fn simplify_is_idempotent() {
    fn prop(input: ArithJson) -> bool {
        let e = engine();
        let once = e.simplify(&e.box_json(&input.0));
        let twice = e.simplify(&once);
        once.is_same(&twice)
    }
    QuickCheck::new().quickcheck(prop as fn(ArithJson) -> bool);
}

fn check_nnf_shape(e: &Expr) -> bool {
    if e.is_function_of("Not") {
        return e.nargs() == 1 && e.arg(0).unwrap().operator().is_none();
    }
    if let Some(op) = e.operator() {
        if matches!(op, "Implies" | "Equivalent" | "Xor" | "Nand" | "Nor") {
            return false;
        }
    }
    e.args().iter().all(check_nnf_shape)
}

#[test]
fn nnf_eliminates_derived_connectives() {
    fn prop(input: BoolJson) -> bool {
        let e = engine();
        let nnf = forms::to_nnf(&e, &e.box_json(&input.0));
        check_nnf_shape(&nnf)
    }
    QuickCheck::new().quickcheck(prop as fn(BoolJson) -> bool);
}

#[test]
fn nnf_is_idempotent() {
    fn prop(input: BoolJson) -> bool {
        let e = engine();
        let once = forms::to_nnf(&e, &e.box_json(&input.0));
        let twice = forms::to_nnf(&e, &once);
        once.is_same(&twice)
    }
    QuickCheck::new().quickcheck(prop as fn(BoolJson) -> bool);
}

#[test]
fn nnf_preserves_truth_table() {
    fn prop(input: BoolJson) -> bool {
        let e = engine();
        let original = e.box_json(&input.0);
        let nnf = forms::to_nnf(&e, &original);
        same_truth_table(&e, &original, &nnf)
    }
    QuickCheck::new().quickcheck(prop as fn(BoolJson) -> bool);
}

#[test]
fn cnf_has_clause_shape_and_same_table() {
    fn prop(input: BoolJson) -> bool {
        let e = engine();
        let original = e.box_json(&input.0);
        let cnf = forms::to_cnf(&e, &original);

        let literal = |x: &Expr| x.operator().is_none() || x.is_function_of("Not");
        let clause =
            |x: &Expr| literal(x) || (x.is_function_of("Or") && x.args().iter().all(literal));
        let shaped =
            clause(&cnf) || (cnf.is_function_of("And") && cnf.args().iter().all(clause));
        shaped && same_truth_table(&e, &original, &cnf)
    }
    QuickCheck::new().quickcheck(prop as fn(BoolJson) -> bool);
}

#[test]
fn minimal_dnf_preserves_truth_table() {
    fn prop(input: BoolJson) -> bool {
        let e = engine();
        let original = e.box_json(&input.0);
        let minimized = e.evaluate(&e.box_json(&json!(["MinimalDNF", input.0])));
        same_truth_table(&e, &original, &minimized)
    }
    QuickCheck::new().quickcheck(prop as fn(BoolJson) -> bool);
}

/// Compare on the union of both variable sets so constant collapses
/// (e.g. to True) still compare correctly.
fn same_truth_table(e: &ComputeEngine, a: &Expr, b: &Expr) -> bool {
    let mut vars = truth_table::extract_variables(a);
    for v in truth_table::extract_variables(b) {
        if !vars.contains(&v) {
            vars.push(v);
        }
    }
    vars.sort();
    let rows = 1u64 << vars.len();
    for i in 0..rows {
        let va = truth_table::evaluate_assignment(e, a, &vars, i);
        let vb = truth_table::evaluate_assignment(e, b, &vars, i);
        if va != vb {
            return false;
        }
    }
    true
}

#[test]
fn subtype_is_reflexive_and_transitive() {
    fn reflexive(t: SmallType) -> bool {
        t.0.is_subtype_of(&t.0)
    }
    fn transitive(a: SmallType, b: SmallType, c: SmallType) -> bool {
        !(a.0.is_subtype_of(&b.0) && b.0.is_subtype_of(&c.0)) || a.0.is_subtype_of(&c.0)
    }
    QuickCheck::new().quickcheck(reflexive as fn(SmallType) -> bool);
    QuickCheck::new().quickcheck(transitive as fn(SmallType, SmallType, SmallType) -> bool);
}

#[test]
fn canonical_add_is_sorted() {
    fn prop(input: ArithJson) -> bool {
        let e = engine();
        fn check(e: &ComputeEngine, expr: &Expr) -> bool {
            if expr.is_function_of("Add") {
                let args = expr.args();
                for w in args.windows(2) {
                    if calx_engine::order::canonical_cmp(&w[0], &w[1]).is_gt() {
                        return false;
                    }
                }
            }
            expr.args().iter().all(|a| check(e, a))
        }
        let boxed = e.box_json(&json!(["Add", input.0, ["Add", "x", 1]]));
        check(&e, &boxed)
    }
    QuickCheck::new().quickcheck(prop as fn(ArithJson) -> bool);
}
