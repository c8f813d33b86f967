//! Variables, literals, and linear expressions.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Not, Sub};

/// An integer decision variable with a bounded domain.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct IntVar(pub(crate) u32);

impl IntVar {
    /// Returns the variable's index in the model.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A 0/1 decision variable.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct BoolVar(pub(crate) u32);

impl BoolVar {
    /// Returns the variable's index in the model.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The positive literal of this variable.
    pub fn literal(self) -> Literal {
        Literal {
            var: self.0,
            negated: false,
        }
    }
}

/// A boolean variable or its negation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Literal {
    pub(crate) var: u32,
    pub(crate) negated: bool,
}

impl Literal {
    /// The underlying variable.
    pub fn var(self) -> BoolVar {
        BoolVar(self.var)
    }

    /// Returns `true` if this is the negation of its variable.
    pub fn is_negated(self) -> bool {
        self.negated
    }
}

impl From<BoolVar> for Literal {
    fn from(v: BoolVar) -> Self {
        v.literal()
    }
}

impl Not for BoolVar {
    type Output = Literal;

    fn not(self) -> Literal {
        !self.literal()
    }
}

impl Not for Literal {
    type Output = Literal;

    fn not(self) -> Literal {
        Literal {
            var: self.var,
            negated: !self.negated,
        }
    }
}

/// A linear expression `Σ coeff·var + constant`.
///
/// Literals are accepted as terms: a negated literal `¬x` contributes `1 − x`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearExpr {
    pub(crate) terms: Vec<(u32, i64)>,
    pub(crate) constant: i64,
}

impl LinearExpr {
    /// The empty expression, equal to zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// A constant expression.
    pub fn constant(value: i64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// Builds `Σ coeff·item` from `(item, coeff)` pairs.
    pub fn weighted_sum<T, I>(items: I) -> Self
    where
        T: Into<LinearExpr>,
        I: IntoIterator<Item = (T, i64)>,
    {
        let mut expr = Self::new();
        for (item, coeff) in items {
            expr += item.into() * coeff;
        }
        expr
    }

    /// Adds `coeff·var` to the expression.
    pub fn add_term(&mut self, var: impl Into<LinearExpr>, coeff: i64) -> &mut Self {
        *self += var.into() * coeff;
        self
    }

    /// Returns the constant offset.
    pub fn offset(&self) -> i64 {
        self.constant
    }

    /// Returns `true` if the expression has no variable terms.
    pub fn is_constant(&self) -> bool {
        self.terms.iter().all(|&(_, c)| c == 0)
    }

    /// Merges duplicate variables and drops zero coefficients, ordering terms
    /// by variable index.
    pub(crate) fn normalized(&self) -> Self {
        let mut terms = self.terms.clone();
        terms.sort_unstable_by_key(|&(v, _)| v);
        let mut merged: Vec<(u32, i64)> = Vec::with_capacity(terms.len());
        for (v, c) in terms {
            match merged.last_mut() {
                Some((last, acc)) if *last == v => *acc += c,
                _ => merged.push((v, c)),
            }
        }
        merged.retain(|&(_, c)| c != 0);
        Self {
            terms: merged,
            constant: self.constant,
        }
    }

    /// Evaluates the expression under a full assignment.
    pub(crate) fn eval(&self, values: &[i64]) -> i64 {
        self.terms
            .iter()
            .map(|&(v, c)| c * values[v as usize])
            .sum::<i64>()
            + self.constant
    }
}

impl From<IntVar> for LinearExpr {
    fn from(v: IntVar) -> Self {
        Self {
            terms: vec![(v.0, 1)],
            constant: 0,
        }
    }
}

impl From<BoolVar> for LinearExpr {
    fn from(v: BoolVar) -> Self {
        Self {
            terms: vec![(v.0, 1)],
            constant: 0,
        }
    }
}

impl From<Literal> for LinearExpr {
    fn from(l: Literal) -> Self {
        if l.negated {
            Self {
                terms: vec![(l.var, -1)],
                constant: 1,
            }
        } else {
            Self {
                terms: vec![(l.var, 1)],
                constant: 0,
            }
        }
    }
}

impl From<i64> for LinearExpr {
    fn from(value: i64) -> Self {
        Self::constant(value)
    }
}

impl From<i32> for LinearExpr {
    fn from(value: i32) -> Self {
        Self::constant(i64::from(value))
    }
}

impl<T: Into<LinearExpr>> AddAssign<T> for LinearExpr {
    fn add_assign(&mut self, rhs: T) {
        let rhs = rhs.into();
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
    }
}

impl<T: Into<LinearExpr>> Add<T> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: T) -> LinearExpr {
        self += rhs;
        self
    }
}

impl<T: Into<LinearExpr>> Sub<T> for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: T) -> LinearExpr {
        self += -rhs.into();
        self
    }
}

impl Mul<i64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(mut self, k: i64) -> LinearExpr {
        for term in &mut self.terms {
            term.1 *= k;
        }
        self.constant *= k;
        self
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        self * -1
    }
}

impl<T: Into<LinearExpr>> FromIterator<T> for LinearExpr {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut expr = Self::new();
        for item in iter {
            expr += item;
        }
        expr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negated_literal_is_one_minus_var() {
        let x = BoolVar(3);
        let e = LinearExpr::from(!x);
        assert_eq!(e.terms, vec![(3, -1)]);
        assert_eq!(e.constant, 1);
        assert_eq!(e.eval(&[0, 0, 0, 1]), 0);
        assert_eq!(e.eval(&[0, 0, 0, 0]), 1);
    }

    #[test]
    fn double_negation() {
        let x = BoolVar(0);
        assert_eq!(!!x.literal(), x.literal());
    }

    #[test]
    fn normalize_merges_and_drops() {
        let a = IntVar(1);
        let b = IntVar(0);
        let e = (LinearExpr::from(a) * 2 + b - a - a + 5).normalized();
        assert_eq!(e.terms, vec![(0, 1)]);
        assert_eq!(e.offset(), 5);
    }

    #[test]
    fn weighted_sum_and_collect() {
        let vars = [BoolVar(0), BoolVar(1), BoolVar(2)];
        let w = LinearExpr::weighted_sum(vars.iter().copied().zip([3, 4, 5]));
        assert_eq!(w.eval(&[1, 0, 1]), 8);
        let s: LinearExpr = vars.iter().copied().collect();
        assert_eq!(s.eval(&[1, 1, 0]), 2);
    }
}
