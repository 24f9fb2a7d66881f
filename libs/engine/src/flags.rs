//! Numeric property flags and their normalization.
//!
//! A [`NumericFlags`] record answers three-valued questions about a value:
//! `Some(true)` / `Some(false)` when known, `None` when open. The flags are
//! subject to an implication graph (integer ⇒ rational ⇒ real ⇒ complex,
//! positive ⇒ nonNegative ∧ ¬zero, …); [`NumericFlags::normalize`]
//! propagates every implication to its unique fixed point.

use calx_numeric::{NumericValue, Sign};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NumericFlags {
    pub number: Option<bool>,
    pub integer: Option<bool>,
    pub rational: Option<bool>,
    pub algebraic: Option<bool>,
    pub real: Option<bool>,
    pub extended_real: Option<bool>,
    pub complex: Option<bool>,
    pub extended_complex: Option<bool>,
    pub imaginary: Option<bool>,

    pub positive: Option<bool>,
    pub non_positive: Option<bool>,
    pub negative: Option<bool>,
    pub non_negative: Option<bool>,

    pub zero: Option<bool>,
    pub not_zero: Option<bool>,
    pub one: Option<bool>,
    pub negative_one: Option<bool>,
    pub infinity: Option<bool>,
    pub finite: Option<bool>,
    pub nan: Option<bool>,

    pub even: Option<bool>,
    pub odd: Option<bool>,
    pub prime: Option<bool>,
    pub composite: Option<bool>,
}

/// Merge `implied` into `slot`; reports a contradiction when the slot
/// already holds the opposite.
fn imply(slot: &mut Option<bool>, implied: bool, changed: &mut bool, conflict: &mut bool) {
    match *slot {
        None => {
            *slot = Some(implied);
            *changed = true;
        }
        Some(v) if v != implied => *conflict = true,
        _ => {}
    }
}

impl NumericFlags {
    /// Flags fully describing a concrete numeric literal.
    pub fn from_value(v: &NumericValue) -> Self {
        let mut f = NumericFlags {
            number: Some(true),
            nan: Some(v.is_nan()),
            finite: Some(v.is_finite()),
            infinity: Some(v.is_infinite()),
            ..Default::default()
        };
        if v.is_nan() {
            return f.normalized();
        }
        if v.is_infinite() {
            f.extended_real = Some(v.is_real());
            f.extended_complex = Some(true);
            match v.sign() {
                Some(Sign::Positive) => f.positive = Some(true),
                Some(Sign::Negative) => f.negative = Some(true),
                _ => {}
            }
            return f.normalized();
        }
        f.complex = Some(true);
        f.real = Some(v.is_real());
        f.imaginary = Some(!v.is_real() && v.re().is_zero());
        if v.is_real() {
            f.rational = Some(v.is_exact() || v.is_integer());
            f.integer = Some(v.is_integer());
            f.zero = Some(v.is_zero());
            f.one = Some(v.is_one());
            f.negative_one = Some(v.is_negative_one());
            match v.sign() {
                Some(Sign::Positive) => {
                    f.positive = Some(true);
                    f.negative = Some(false);
                }
                Some(Sign::Negative) => {
                    f.positive = Some(false);
                    f.negative = Some(true);
                }
                Some(Sign::Zero) => {
                    f.positive = Some(false);
                    f.negative = Some(false);
                }
                None => {}
            }
            if let Some(e) = v.is_even() {
                f.even = Some(e);
                f.odd = Some(!e);
            }
        }
        f.normalized()
    }

    /// Runs the implication graph to its fixed point. Returns `None` when
    /// the flags are contradictory (e.g. `positive` and `zero`).
    pub fn normalize(&mut self) -> Option<()> {
        let mut conflict = false;
        loop {
            let mut changed = false;
            let c = &mut conflict;
            let ch = &mut changed;

            // Domain chain: integer ⇒ rational ⇒ algebraic ⇒ real ⇒
            // complex ⇒ number, and extended variants.
            if self.integer == Some(true) {
                imply(&mut self.rational, true, ch, c);
            }
            if self.rational == Some(true) {
                imply(&mut self.algebraic, true, ch, c);
            }
            if self.algebraic == Some(true) {
                imply(&mut self.real, true, ch, c);
            }
            if self.real == Some(true) {
                imply(&mut self.complex, true, ch, c);
                imply(&mut self.extended_real, true, ch, c);
                imply(&mut self.nan, false, ch, c);
            }
            if self.complex == Some(true) {
                imply(&mut self.number, true, ch, c);
                imply(&mut self.extended_complex, true, ch, c);
                imply(&mut self.finite, true, ch, c);
                imply(&mut self.infinity, false, ch, c);
            }
            if self.extended_real == Some(true) {
                imply(&mut self.extended_complex, true, ch, c);
            }
            if self.extended_complex == Some(true) {
                imply(&mut self.number, true, ch, c);
            }
            // Downward negations: not rational ⇒ not integer, etc.
            if self.rational == Some(false) {
                imply(&mut self.integer, false, ch, c);
            }
            if self.algebraic == Some(false) {
                imply(&mut self.rational, false, ch, c);
            }
            if self.real == Some(false) {
                imply(&mut self.algebraic, false, ch, c);
            }
            if self.complex == Some(false) {
                imply(&mut self.real, false, ch, c);
            }

            // Sign lattice.
            if self.positive == Some(true) {
                imply(&mut self.non_negative, true, ch, c);
                imply(&mut self.zero, false, ch, c);
                imply(&mut self.negative, false, ch, c);
                imply(&mut self.non_positive, false, ch, c);
                imply(&mut self.extended_real, true, ch, c);
            }
            if self.negative == Some(true) {
                imply(&mut self.non_positive, true, ch, c);
                imply(&mut self.zero, false, ch, c);
                imply(&mut self.positive, false, ch, c);
                imply(&mut self.non_negative, false, ch, c);
                imply(&mut self.extended_real, true, ch, c);
            }
            if self.non_negative == Some(true) {
                imply(&mut self.negative, false, ch, c);
            }
            if self.non_positive == Some(true) {
                imply(&mut self.positive, false, ch, c);
            }
            if self.non_negative == Some(true) && self.not_zero == Some(true) {
                imply(&mut self.positive, true, ch, c);
            }
            if self.non_positive == Some(true) && self.not_zero == Some(true) {
                imply(&mut self.negative, true, ch, c);
            }

            // Zero and its consequences.
            if self.zero == Some(true) {
                imply(&mut self.not_zero, false, ch, c);
                imply(&mut self.positive, false, ch, c);
                imply(&mut self.negative, false, ch, c);
                imply(&mut self.integer, true, ch, c);
                imply(&mut self.even, true, ch, c);
                imply(&mut self.prime, false, ch, c);
                imply(&mut self.composite, false, ch, c);
                imply(&mut self.one, false, ch, c);
                imply(&mut self.negative_one, false, ch, c);
            }
            if self.not_zero == Some(true) {
                imply(&mut self.zero, false, ch, c);
            }
            if self.zero == Some(false) && self.number == Some(true) {
                imply(&mut self.not_zero, true, ch, c);
            }
            if self.one == Some(true) {
                imply(&mut self.positive, true, ch, c);
                imply(&mut self.integer, true, ch, c);
                imply(&mut self.odd, true, ch, c);
                imply(&mut self.prime, false, ch, c);
                imply(&mut self.composite, false, ch, c);
            }
            if self.negative_one == Some(true) {
                imply(&mut self.negative, true, ch, c);
                imply(&mut self.integer, true, ch, c);
                imply(&mut self.odd, true, ch, c);
            }

            // Parity implies integrality.
            if self.even == Some(true) {
                imply(&mut self.integer, true, ch, c);
                imply(&mut self.odd, false, ch, c);
            }
            if self.odd == Some(true) {
                imply(&mut self.integer, true, ch, c);
                imply(&mut self.even, false, ch, c);
            }

            // Primality.
            if self.prime == Some(true) {
                imply(&mut self.integer, true, ch, c);
                imply(&mut self.positive, true, ch, c);
                imply(&mut self.composite, false, ch, c);
            }
            if self.composite == Some(true) {
                imply(&mut self.integer, true, ch, c);
                imply(&mut self.positive, true, ch, c);
                imply(&mut self.prime, false, ch, c);
            }

            // Infinity excludes finiteness and NaN.
            if self.infinity == Some(true) {
                imply(&mut self.finite, false, ch, c);
                imply(&mut self.nan, false, ch, c);
                imply(&mut self.complex, false, ch, c);
                imply(&mut self.number, true, ch, c);
            }
            if self.nan == Some(true) {
                imply(&mut self.finite, false, ch, c);
                imply(&mut self.infinity, false, ch, c);
                imply(&mut self.real, false, ch, c);
            }
            if self.imaginary == Some(true) {
                imply(&mut self.real, false, ch, c);
                imply(&mut self.complex, true, ch, c);
            }

            if conflict {
                return None;
            }
            if !changed {
                return Some(());
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        // A contradictory literal cannot arise from from_value; callers
        // normalizing assumed flags handle None explicitly.
        let _ = self.normalize();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_implies_chain() {
        let mut f = NumericFlags {
            integer: Some(true),
            ..Default::default()
        };
        f.normalize().unwrap();
        assert_eq!(f.rational, Some(true));
        assert_eq!(f.real, Some(true));
        assert_eq!(f.complex, Some(true));
        assert_eq!(f.number, Some(true));
        assert_eq!(f.finite, Some(true));
    }

    #[test]
    fn test_positive_implies() {
        let mut f = NumericFlags {
            positive: Some(true),
            ..Default::default()
        };
        f.normalize().unwrap();
        assert_eq!(f.non_negative, Some(true));
        assert_eq!(f.zero, Some(false));
        assert_eq!(f.not_zero, Some(true));
    }

    #[test]
    fn test_zero_excludes_primality() {
        let mut f = NumericFlags {
            zero: Some(true),
            ..Default::default()
        };
        f.normalize().unwrap();
        assert_eq!(f.prime, Some(false));
        assert_eq!(f.composite, Some(false));
        assert_eq!(f.even, Some(true));
    }

    #[test]
    fn test_contradiction_detected() {
        let mut f = NumericFlags {
            positive: Some(true),
            zero: Some(true),
            ..Default::default()
        };
        assert!(f.normalize().is_none());
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let mut f = NumericFlags {
            prime: Some(true),
            ..Default::default()
        };
        f.normalize().unwrap();
        let snapshot = f;
        f.normalize().unwrap();
        assert_eq!(f, snapshot);
    }

    #[test]
    fn test_from_value() {
        let f = NumericFlags::from_value(&NumericValue::from_i64(7));
        assert_eq!(f.integer, Some(true));
        assert_eq!(f.positive, Some(true));
        assert_eq!(f.odd, Some(true));

        let f = NumericFlags::from_value(&NumericValue::nan());
        assert_eq!(f.nan, Some(true));
        assert_eq!(f.finite, Some(false));
    }
}
