//! Positive Boolean formulas over automaton states.
//!
//! [`BoolExpr`] is the shape every alternating transition target takes.
//! Everything structural about it (renaming, substitution, DeMorgan duals,
//! conversion into another representation) is a [`fold`][BoolExpr::fold]
//! into some [`Lattice`].

use std::collections::BTreeSet;
use std::fmt::{Debug, Display, Formatter};
use std::hash::Hash;

use crate::StateId;

/// Interpretation of positive formulas: the target of [`BoolExpr::fold`].
pub trait Lattice {
    type Elem: Clone + Debug + Eq + Hash;

    fn top(&mut self) -> Self::Elem;
    fn bottom(&mut self) -> Self::Elem;
    fn state(&mut self, s: StateId) -> Self::Elem;
    fn and(&mut self, a: Self::Elem, b: Self::Elem) -> Self::Elem;
    fn or(&mut self, a: Self::Elem, b: Self::Elem) -> Self::Elem;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoolExpr {
    True,
    False,
    State(StateId),
    And(Box<BoolExpr>, Box<BoolExpr>),
    Or(Box<BoolExpr>, Box<BoolExpr>),
}

impl BoolExpr {
    pub fn state(s: StateId) -> Self {
        BoolExpr::State(s)
    }

    /// Conjunction, absorbing constants and identical operands.
    pub fn and(a: BoolExpr, b: BoolExpr) -> Self {
        match (a, b) {
            (BoolExpr::False, _) | (_, BoolExpr::False) => BoolExpr::False,
            (BoolExpr::True, x) | (x, BoolExpr::True) => x,
            (a, b) if a == b => a,
            (a, b) => BoolExpr::And(Box::new(a), Box::new(b)),
        }
    }

    /// Disjunction, absorbing constants and identical operands.
    pub fn or(a: BoolExpr, b: BoolExpr) -> Self {
        match (a, b) {
            (BoolExpr::True, _) | (_, BoolExpr::True) => BoolExpr::True,
            (BoolExpr::False, x) | (x, BoolExpr::False) => x,
            (a, b) if a == b => a,
            (a, b) => BoolExpr::Or(Box::new(a), Box::new(b)),
        }
    }

    pub fn and_all(exprs: impl IntoIterator<Item = BoolExpr>) -> Self {
        exprs.into_iter().fold(BoolExpr::True, BoolExpr::and)
    }

    pub fn or_all(exprs: impl IntoIterator<Item = BoolExpr>) -> Self {
        exprs.into_iter().fold(BoolExpr::False, BoolExpr::or)
    }

    pub fn is_true(&self) -> bool {
        matches!(self, BoolExpr::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, BoolExpr::False)
    }

    pub fn fold<L: Lattice + ?Sized>(&self, lattice: &mut L) -> L::Elem {
        match self {
            BoolExpr::True => lattice.top(),
            BoolExpr::False => lattice.bottom(),
            BoolExpr::State(s) => lattice.state(*s),
            BoolExpr::And(a, b) => {
                let a = a.fold(lattice);
                let b = b.fold(lattice);
                lattice.and(a, b)
            }
            BoolExpr::Or(a, b) => {
                let a = a.fold(lattice);
                let b = b.fold(lattice);
                lattice.or(a, b)
            }
        }
    }

    /// States mentioned by the formula.
    pub fn states(&self) -> BTreeSet<StateId> {
        let mut res = BTreeSet::new();
        self.collect_states(&mut res);
        res
    }

    fn collect_states(&self, acc: &mut BTreeSet<StateId>) {
        match self {
            BoolExpr::True | BoolExpr::False => {}
            BoolExpr::State(s) => {
                acc.insert(*s);
            }
            BoolExpr::And(a, b) | BoolExpr::Or(a, b) => {
                a.collect_states(acc);
                b.collect_states(acc);
            }
        }
    }

    /// Largest state id mentioned, if any.
    pub fn max_state(&self) -> Option<StateId> {
        self.states().last().copied()
    }

    /// Evaluate with each state replaced by `valuation(state)`.
    pub fn eval(&self, valuation: &impl Fn(StateId) -> bool) -> bool {
        match self {
            BoolExpr::True => true,
            BoolExpr::False => false,
            BoolExpr::State(s) => valuation(*s),
            BoolExpr::And(a, b) => a.eval(valuation) && b.eval(valuation),
            BoolExpr::Or(a, b) => a.eval(valuation) || b.eval(valuation),
        }
    }

    /// Whether the set `model` (states assigned true) satisfies the formula.
    pub fn has_model(&self, model: &BTreeSet<StateId>) -> bool {
        self.eval(&|s| model.contains(&s))
    }

    /// Number of nodes in the formula tree.
    pub fn size(&self) -> usize {
        match self {
            BoolExpr::True | BoolExpr::False | BoolExpr::State(_) => 1,
            BoolExpr::And(a, b) | BoolExpr::Or(a, b) => 1 + a.size() + b.size(),
        }
    }

    /// Rename every state `s` to `s + offset`.
    pub fn offset(&self, offset: StateId) -> BoolExpr {
        self.substitute(&mut |s| BoolExpr::State(s + offset))
    }

    /// Replace every state `s` by `f(s)`.
    pub fn substitute(&self, f: &mut impl FnMut(StateId) -> BoolExpr) -> BoolExpr {
        self.fold(&mut Substitution { map: f })
    }

    /// DeMorgan dual: swap conjunction with disjunction and the constants,
    /// keeping state references positive.
    pub fn dual(&self) -> BoolExpr {
        self.fold(&mut Dual)
    }
}

impl From<StateId> for BoolExpr {
    fn from(s: StateId) -> Self {
        BoolExpr::State(s)
    }
}

impl Display for BoolExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BoolExpr::True => write!(f, "true"),
            BoolExpr::False => write!(f, "false"),
            BoolExpr::State(s) => write!(f, "s{}", s),
            BoolExpr::And(a, b) => write!(f, "({} & {})", a, b),
            BoolExpr::Or(a, b) => write!(f, "({} | {})", a, b),
        }
    }
}

/// The identity interpretation: rebuilds formulas with the simplifying
/// constructors.
#[derive(Debug, Default, Copy, Clone)]
pub struct Positive;

impl Lattice for Positive {
    type Elem = BoolExpr;

    fn top(&mut self) -> BoolExpr {
        BoolExpr::True
    }
    fn bottom(&mut self) -> BoolExpr {
        BoolExpr::False
    }
    fn state(&mut self, s: StateId) -> BoolExpr {
        BoolExpr::State(s)
    }
    fn and(&mut self, a: BoolExpr, b: BoolExpr) -> BoolExpr {
        BoolExpr::and(a, b)
    }
    fn or(&mut self, a: BoolExpr, b: BoolExpr) -> BoolExpr {
        BoolExpr::or(a, b)
    }
}

struct Substitution<'a, F> {
    map: &'a mut F,
}

impl<F: FnMut(StateId) -> BoolExpr> Lattice for Substitution<'_, F> {
    type Elem = BoolExpr;

    fn top(&mut self) -> BoolExpr {
        BoolExpr::True
    }
    fn bottom(&mut self) -> BoolExpr {
        BoolExpr::False
    }
    fn state(&mut self, s: StateId) -> BoolExpr {
        (self.map)(s)
    }
    fn and(&mut self, a: BoolExpr, b: BoolExpr) -> BoolExpr {
        BoolExpr::and(a, b)
    }
    fn or(&mut self, a: BoolExpr, b: BoolExpr) -> BoolExpr {
        BoolExpr::or(a, b)
    }
}

struct Dual;

impl Lattice for Dual {
    type Elem = BoolExpr;

    fn top(&mut self) -> BoolExpr {
        BoolExpr::False
    }
    fn bottom(&mut self) -> BoolExpr {
        BoolExpr::True
    }
    fn state(&mut self, s: StateId) -> BoolExpr {
        BoolExpr::State(s)
    }
    fn and(&mut self, a: BoolExpr, b: BoolExpr) -> BoolExpr {
        BoolExpr::or(a, b)
    }
    fn or(&mut self, a: BoolExpr, b: BoolExpr) -> BoolExpr {
        BoolExpr::and(a, b)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn s(i: StateId) -> BoolExpr {
        BoolExpr::state(i)
    }

    #[test]
    fn test_constant_absorption() {
        assert_eq!(BoolExpr::and(BoolExpr::True, s(1)), s(1));
        assert_eq!(BoolExpr::and(s(1), BoolExpr::False), BoolExpr::False);
        assert_eq!(BoolExpr::or(BoolExpr::False, s(1)), s(1));
        assert_eq!(BoolExpr::or(s(1), BoolExpr::True), BoolExpr::True);
        assert_eq!(BoolExpr::and(s(2), s(2)), s(2));
        assert_eq!(BoolExpr::and_all([]), BoolExpr::True);
        assert_eq!(BoolExpr::or_all([]), BoolExpr::False);
    }

    #[test]
    fn test_states_and_model() {
        let e = BoolExpr::and(s(1), BoolExpr::or(s(2), s(5)));
        assert_eq!(e.states(), BTreeSet::from([1, 2, 5]));
        assert_eq!(e.max_state(), Some(5));
        assert!(e.has_model(&BTreeSet::from([1, 5])));
        assert!(!e.has_model(&BTreeSet::from([2, 5])));
        assert_eq!(e.size(), 5);
        assert_eq!(e.to_string(), "(s1 & (s2 | s5))");
    }

    #[test]
    fn test_offset() {
        let e = BoolExpr::or(s(0), BoolExpr::and(s(1), BoolExpr::True));
        assert_eq!(e.offset(10), BoolExpr::or(s(10), s(11)));
    }

    #[test]
    fn test_substitute_simplifies() {
        let e = BoolExpr::and(s(0), s(1));
        let r = e.substitute(&mut |i| if i == 0 { BoolExpr::True } else { s(7) });
        assert_eq!(r, s(7));
        let r = e.substitute(&mut |i| if i == 0 { BoolExpr::False } else { s(7) });
        assert_eq!(r, BoolExpr::False);
    }

    #[test]
    fn test_dual() {
        let e = BoolExpr::and(s(0), BoolExpr::or(s(1), s(2)));
        assert_eq!(e.dual(), BoolExpr::or(s(0), BoolExpr::and(s(1), s(2))));
        assert_eq!(BoolExpr::True.dual(), BoolExpr::False);
        assert_eq!(e.dual().dual(), e);
    }

    #[test]
    fn test_positive_fold_is_identity() {
        let e = BoolExpr::or(BoolExpr::and(s(3), s(4)), s(0));
        assert_eq!(e.fold(&mut Positive), e);
    }
}
