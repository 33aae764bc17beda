//! Propositional variables and literals for the clause store.

use std::fmt;
use std::ops::Neg;

/// A propositional variable (1-indexed).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(u32);

impl Var {
    /// # Panics
    ///
    /// Panics if `id == 0`. Variables must be 1-indexed.
    pub fn new(id: u32) -> Self {
        assert_ne!(id, 0, "Variable IDs must be >= 1");
        Var(id)
    }

    pub fn id(self) -> u32 {
        self.0
    }

    pub fn pos(self) -> Lit {
        Lit::new(self, false)
    }

    pub fn neg(self) -> Lit {
        Lit::new(self, true)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// A literal: a variable with a polarity.
///
/// Encoded as `2 * var + negated`, so literals of one variable are adjacent
/// and `index()` can address per-literal arrays directly.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Lit(u32);

impl Lit {
    pub fn new(var: Var, negated: bool) -> Self {
        Lit((var.id() << 1) | negated as u32)
    }

    /// Literal from a non-zero DIMACS integer.
    pub fn from_dimacs(lit: i32) -> Self {
        assert_ne!(lit, 0, "DIMACS literal must be non-zero");
        Lit::new(Var::new(lit.unsigned_abs()), lit < 0)
    }

    pub fn to_dimacs(self) -> i32 {
        let v = self.var().id() as i32;
        if self.is_negated() {
            -v
        } else {
            v
        }
    }

    pub fn var(self) -> Var {
        Var(self.0 >> 1)
    }

    pub fn is_negated(self) -> bool {
        self.0 & 1 == 1
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Neg for Lit {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Lit(self.0 ^ 1)
    }
}

impl fmt::Debug for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_dimacs())
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negated() {
            write!(f, "~{}", self.var())
        } else {
            write!(f, "{}", self.var())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lit_encoding() {
        let x = Var::new(3);
        assert_eq!(x.pos().var(), x);
        assert!(!x.pos().is_negated());
        assert!(x.neg().is_negated());
        assert_eq!(-x.pos(), x.neg());
        assert_eq!(x.pos().index() ^ 1, x.neg().index());
    }

    #[test]
    fn test_dimacs() {
        assert_eq!(Lit::from_dimacs(-5).to_dimacs(), -5);
        assert_eq!(Lit::from_dimacs(7), Var::new(7).pos());
    }

    #[test]
    #[should_panic(expected = "Variable IDs must be >= 1")]
    fn test_var_zero() {
        Var::new(0);
    }
}
