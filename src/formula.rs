//! Interchangeable representations of state formulas.
//!
//! The alternating-automaton equivalence check works on formulas through an
//! [`ExprFactory`]: a [`Lattice`] that can also inspect and re-fold its own
//! elements. Three representations are provided:
//!
//! - [`Positive`]: the plain formula tree.
//! - [`SopLattice`]: antichains of minimal cubes.
//! - [`BddFactory`]: nodes of a shared decision diagram, where state `s` is
//!   variable `s + 1`.

use std::collections::BTreeSet;

use crate::bdd::Bdd;
use crate::expr::{BoolExpr, Lattice, Positive};
use crate::reference::Ref;
use crate::sop::{SopLattice, SumOfProducts};
use crate::StateId;

pub trait ExprFactory: Lattice + Clone {
    /// Interpret `e` in another lattice.
    fn fold_elem<L: Lattice + ?Sized>(&self, e: &Self::Elem, target: &mut L) -> L::Elem;

    fn states(&self, e: &Self::Elem) -> BTreeSet<StateId>;

    fn has_model(&self, e: &Self::Elem, model: &BTreeSet<StateId>) -> bool;

    fn size(&self, e: &Self::Elem) -> usize;

    /// Bring a formula tree into this representation.
    fn coerce(&mut self, e: &BoolExpr) -> Self::Elem {
        e.fold(self)
    }

    /// Replace every state `s` of `e` by `map(s)`.
    fn substitute(
        &self,
        e: &Self::Elem,
        map: &mut dyn FnMut(StateId) -> Self::Elem,
    ) -> Self::Elem {
        let mut lattice = Substitution {
            inner: self.clone(),
            map,
        };
        self.fold_elem(e, &mut lattice)
    }

    fn to_expr(&self, e: &Self::Elem) -> BoolExpr {
        self.fold_elem(e, &mut Positive)
    }
}

struct Substitution<'a, F: ExprFactory> {
    inner: F,
    map: &'a mut dyn FnMut(StateId) -> F::Elem,
}

impl<F: ExprFactory> Lattice for Substitution<'_, F> {
    type Elem = F::Elem;

    fn top(&mut self) -> Self::Elem {
        self.inner.top()
    }
    fn bottom(&mut self) -> Self::Elem {
        self.inner.bottom()
    }
    fn state(&mut self, s: StateId) -> Self::Elem {
        (self.map)(s)
    }
    fn and(&mut self, a: Self::Elem, b: Self::Elem) -> Self::Elem {
        self.inner.and(a, b)
    }
    fn or(&mut self, a: Self::Elem, b: Self::Elem) -> Self::Elem {
        self.inner.or(a, b)
    }
}

impl ExprFactory for Positive {
    fn fold_elem<L: Lattice + ?Sized>(&self, e: &BoolExpr, target: &mut L) -> L::Elem {
        e.fold(target)
    }

    fn states(&self, e: &BoolExpr) -> BTreeSet<StateId> {
        e.states()
    }

    fn has_model(&self, e: &BoolExpr, model: &BTreeSet<StateId>) -> bool {
        e.has_model(model)
    }

    fn size(&self, e: &BoolExpr) -> usize {
        e.size()
    }

    fn coerce(&mut self, e: &BoolExpr) -> BoolExpr {
        e.clone()
    }
}

impl ExprFactory for SopLattice {
    fn fold_elem<L: Lattice + ?Sized>(&self, e: &SumOfProducts, target: &mut L) -> L::Elem {
        e.fold(target)
    }

    fn states(&self, e: &SumOfProducts) -> BTreeSet<StateId> {
        e.states()
    }

    fn has_model(&self, e: &SumOfProducts, model: &BTreeSet<StateId>) -> bool {
        e.has_model(model)
    }

    fn size(&self, e: &SumOfProducts) -> usize {
        e.size()
    }
}

/// Formulas as nodes of a caller-owned [`Bdd`].
#[derive(Debug, Copy, Clone)]
pub struct BddFactory<'a> {
    bdd: &'a Bdd,
}

impl<'a> BddFactory<'a> {
    pub fn new(bdd: &'a Bdd) -> Self {
        Self { bdd }
    }

    pub fn bdd(&self) -> &'a Bdd {
        self.bdd
    }
}

impl Lattice for BddFactory<'_> {
    type Elem = Ref;

    fn top(&mut self) -> Ref {
        self.bdd.one
    }
    fn bottom(&mut self) -> Ref {
        self.bdd.zero
    }
    fn state(&mut self, s: StateId) -> Ref {
        self.bdd.mk_var(s + 1)
    }
    fn and(&mut self, a: Ref, b: Ref) -> Ref {
        self.bdd.apply_and(a, b)
    }
    fn or(&mut self, a: Ref, b: Ref) -> Ref {
        self.bdd.apply_or(a, b)
    }
}

impl ExprFactory for BddFactory<'_> {
    /// A positive function satisfies `f = (x ∧ f|x) ∨ f|¬x`, so every node
    /// folds without negation.
    fn fold_elem<L: Lattice + ?Sized>(&self, e: &Ref, target: &mut L) -> L::Elem {
        let zero = target.bottom();
        let one = target.top();
        self.bdd.fold(*e, zero, one, &mut |v, low, high| {
            let x = target.state(v - 1);
            let x_high = target.and(x, high);
            target.or(x_high, low)
        })
    }

    fn states(&self, e: &Ref) -> BTreeSet<StateId> {
        self.bdd.support(*e).into_iter().map(|v| v - 1).collect()
    }

    fn has_model(&self, e: &Ref, model: &BTreeSet<StateId>) -> bool {
        self.bdd.eval(*e, |v| model.contains(&(v - 1)))
    }

    fn size(&self, e: &Ref) -> usize {
        self.bdd.size(*e)
    }
}
