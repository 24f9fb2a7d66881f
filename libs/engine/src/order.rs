//! Canonical operand ordering.
//!
//! Commutative operators sort their operands by complexity (descending)
//! with a structural total order as tiebreak (ascending). The result is
//! deterministic: polynomials come out highest-degree first, symbols
//! before literals (`x + 7`, never `7 + x`).

use crate::expr::{Expr, ExprKind};
use crate::operators;
use std::cmp::Ordering;

/// Complexity key of a single node.
pub fn expr_complexity(e: &Expr) -> u32 {
    match e.kind() {
        ExprKind::Number(_) => 100,
        ExprKind::Str(_) => 300,
        ExprKind::Symbol(_) => 500,
        ExprKind::Function { op, .. } => operators::complexity_of(op),
        ExprKind::Dict(_) => 700,
        ExprKind::Tensor { .. } => 800,
    }
}

fn kind_rank(e: &Expr) -> u8 {
    match e.kind() {
        ExprKind::Number(_) => 0,
        ExprKind::Symbol(_) => 1,
        ExprKind::Str(_) => 2,
        ExprKind::Function { .. } => 3,
        ExprKind::Tensor { .. } => 4,
        ExprKind::Dict(_) => 5,
    }
}

/// A total structural order, independent of mathematical value except for
/// numbers of comparable magnitude.
pub fn structural_cmp(a: &Expr, b: &Expr) -> Ordering {
    let rank = kind_rank(a).cmp(&kind_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a.kind(), b.kind()) {
        (ExprKind::Number(x), ExprKind::Number(y)) => {
            let (fx, fy) = (x.to_f64(), y.to_f64());
            // NaN sorts last; otherwise numeric order, with the exact
            // representation breaking exact ties.
            match (fx.is_nan(), fy.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => fx
                    .partial_cmp(&fy)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.hash().cmp(&b.hash())),
            }
        }
        (ExprKind::Symbol(x), ExprKind::Symbol(y)) => x.cmp(y),
        (ExprKind::Str(x), ExprKind::Str(y)) => x.cmp(y),
        (ExprKind::Function { op: xo, args: xa }, ExprKind::Function { op: yo, args: ya }) => {
            xo.cmp(yo)
                .then_with(|| xa.len().cmp(&ya.len()))
                .then_with(|| {
                    for (x, y) in xa.iter().zip(ya) {
                        let c = structural_cmp(x, y);
                        if c != Ordering::Equal {
                            return c;
                        }
                    }
                    Ordering::Equal
                })
        }
        (ExprKind::Tensor { shape: xs, elems: xe }, ExprKind::Tensor { shape: ys, elems: ye }) => {
            xs.cmp(ys).then_with(|| {
                for (x, y) in xe.iter().zip(ye) {
                    let c = structural_cmp(x, y);
                    if c != Ordering::Equal {
                        return c;
                    }
                }
                xe.len().cmp(&ye.len())
            })
        }
        (ExprKind::Dict(x), ExprKind::Dict(y)) => {
            for ((kx, vx), (ky, vy)) in x.iter().zip(y.iter()) {
                let c = kx.cmp(ky).then_with(|| structural_cmp(vx, vy));
                if c != Ordering::Equal {
                    return c;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => unreachable!("kind ranks matched"),
    }
}

/// The canonical argument order for commutative operators: complexity
/// descending, then structural ascending.
pub fn canonical_cmp(a: &Expr, b: &Expr) -> Ordering {
    expr_complexity(b)
        .cmp(&expr_complexity(a))
        .then_with(|| structural_cmp(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols_before_numbers() {
        let x = Expr::symbol("x");
        let seven = Expr::int(7);
        assert_eq!(canonical_cmp(&x, &seven), Ordering::Less);
    }

    #[test]
    fn test_powers_before_symbols() {
        let x2 = Expr::function("Power", vec![Expr::symbol("x"), Expr::int(2)]);
        let y = Expr::symbol("y");
        assert_eq!(canonical_cmp(&x2, &y), Ordering::Less);
    }

    #[test]
    fn test_structural_tiebreak() {
        let a = Expr::function("Multiply", vec![Expr::int(2), Expr::symbol("x")]);
        let b = Expr::function("Multiply", vec![Expr::int(3), Expr::symbol("x")]);
        assert_eq!(canonical_cmp(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_total_order_is_consistent() {
        let exprs = vec![
            Expr::int(1),
            Expr::symbol("a"),
            Expr::string("s"),
            Expr::function("Add", vec![Expr::int(1)]),
        ];
        for x in &exprs {
            assert_eq!(structural_cmp(x, x), Ordering::Equal);
            for y in &exprs {
                let xy = structural_cmp(x, y);
                let yx = structural_cmp(y, x);
                assert_eq!(xy, yx.reverse());
            }
        }
    }
}
