//! The predicate algebra every automaton is generic over.
//!
//! A [`BooleanAlgebra`] pairs a predicate type (a symbolic set of domain
//! values) with the concrete domain values themselves. The automata never
//! enumerate the domain: all alphabet-specific reasoning goes through
//! satisfiability, witness generation and, most importantly,
//! [`BooleanAlgebra::separating_predicates`].

use std::fmt::Debug;
use std::hash::Hash;

use log::debug;

use crate::deadline::Deadline;
use crate::error::{Error, Result};

/// Upper bound on the number of predicates split by [`BooleanAlgebra::minterms`].
pub const MAX_MINTERM_PREDICATES: usize = 2500;

/// One satisfiable cell of the partition induced by a list of predicates.
///
/// `bits[i]` tells whether the `i`-th predicate was taken positively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Minterm<P> {
    pub guard: P,
    pub bits: Vec<bool>,
}

impl<P> Minterm<P> {
    /// Indices of the predicates this cell lies inside.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(|&(_, &b)| b)
            .map(|(i, _)| i)
    }
}

pub trait BooleanAlgebra {
    /// Symbolic set of domain values.
    type Pred: Clone + Debug;
    /// Concrete domain value.
    type Elem: Clone + Debug + Eq + Hash;

    fn mk_true(&self) -> Self::Pred;
    fn mk_false(&self) -> Self::Pred;
    /// Predicate satisfied by exactly `elem`.
    fn mk_atom(&self, elem: &Self::Elem) -> Self::Pred;
    fn mk_not(&self, p: &Self::Pred) -> Self::Pred;
    fn mk_and(&self, p: &Self::Pred, q: &Self::Pred) -> Self::Pred;
    fn mk_or(&self, p: &Self::Pred, q: &Self::Pred) -> Self::Pred;

    fn is_satisfiable(&self, p: &Self::Pred) -> bool;
    fn has_model(&self, p: &Self::Pred, elem: &Self::Elem) -> bool;
    fn generate_witness(&self, p: &Self::Pred) -> Option<Self::Elem>;

    fn mk_and_many<'a>(&self, preds: impl IntoIterator<Item = &'a Self::Pred>) -> Self::Pred
    where
        Self::Pred: 'a,
    {
        preds
            .into_iter()
            .fold(self.mk_true(), |acc, p| self.mk_and(&acc, p))
    }

    fn mk_or_many<'a>(&self, preds: impl IntoIterator<Item = &'a Self::Pred>) -> Self::Pred
    where
        Self::Pred: 'a,
    {
        preds
            .into_iter()
            .fold(self.mk_false(), |acc, p| self.mk_or(&acc, p))
    }

    /// Two predicates denote the same set iff their symmetric difference is empty.
    fn are_equivalent(&self, p: &Self::Pred, q: &Self::Pred) -> bool {
        let p_not_q = self.mk_and(p, &self.mk_not(q));
        if self.is_satisfiable(&p_not_q) {
            return false;
        }
        let q_not_p = self.mk_and(q, &self.mk_not(p));
        !self.is_satisfiable(&q_not_p)
    }

    /// Satisfiable Boolean combinations of `preds`, each predicate taken
    /// either positively or negatively.
    ///
    /// The cells are pairwise disjoint and cover the whole domain.
    fn minterms(&self, preds: &[Self::Pred], deadline: &Deadline) -> Result<Vec<Minterm<Self::Pred>>> {
        if preds.len() > MAX_MINTERM_PREDICATES {
            return Err(Error::MintermLimit { count: preds.len() });
        }

        let mut cells = vec![Minterm {
            guard: self.mk_true(),
            bits: Vec::with_capacity(preds.len()),
        }];

        for p in preds {
            deadline.check()?;
            let not_p = self.mk_not(p);
            let mut next = Vec::with_capacity(cells.len() * 2);
            for cell in cells {
                let pos = self.mk_and(&cell.guard, p);
                let neg = self.mk_and(&cell.guard, &not_p);
                if self.is_satisfiable(&pos) {
                    let mut bits = cell.bits.clone();
                    bits.push(true);
                    next.push(Minterm { guard: pos, bits });
                }
                if self.is_satisfiable(&neg) {
                    let mut bits = cell.bits;
                    bits.push(false);
                    next.push(Minterm { guard: neg, bits });
                }
            }
            cells = next;
        }

        debug!("minterms: {} predicates -> {} cells", preds.len(), cells.len());
        Ok(cells)
    }

    /// One predicate per group such that the predicates are pairwise disjoint,
    /// cover the domain, and every witness satisfies its own group's predicate.
    ///
    /// The groups must not share elements. The default places every group
    /// except the largest one on the disjunction of its atoms and gives the
    /// largest group the complement of everything else.
    fn separating_predicates(
        &self,
        groups: &[Vec<Self::Elem>],
        deadline: &Deadline,
    ) -> Result<Vec<Self::Pred>> {
        match groups.len() {
            0 => return Ok(Vec::new()),
            1 => return Ok(vec![self.mk_true()]),
            _ => {}
        }

        let mut largest = 0;
        for (i, group) in groups.iter().enumerate() {
            if group.len() > groups[largest].len() {
                largest = i;
            }
        }

        let mut preds = vec![self.mk_false(); groups.len()];
        let mut others = self.mk_false();
        for (i, group) in groups.iter().enumerate() {
            if i == largest {
                continue;
            }
            deadline.check()?;
            let atoms: Vec<_> = group.iter().map(|e| self.mk_atom(e)).collect();
            let p = self.mk_or_many(&atoms);
            others = self.mk_or(&others, &p);
            preds[i] = p;
        }
        preds[largest] = self.mk_not(&others);

        Ok(preds)
    }
}

/// A [`BooleanAlgebra`] whose domain also carries unary functions, used as
/// output terms of transducers.
pub trait FunctionAlgebra: BooleanAlgebra {
    type Func: Clone + Debug + Eq + Hash;

    /// The identity function.
    fn mk_identity(&self) -> Self::Func;
    /// The constant function returning `elem`.
    fn mk_const(&self, elem: &Self::Elem) -> Self::Func;
    /// `x ↦ f(g(x))`.
    fn mk_compose(&self, f: &Self::Func, g: &Self::Func) -> Self::Func;

    /// `f(elem)`, or `None` if the result falls outside the domain.
    fn apply(&self, f: &Self::Func, elem: &Self::Elem) -> Option<Self::Elem>;
    /// Elements `x` such that `f(x)` is defined and satisfies `p`.
    fn preimage(&self, f: &Self::Func, p: &Self::Pred) -> Self::Pred;
    /// Whether `f` and `g` are defined and agree on every element of `p`.
    fn agree_on(&self, f: &Self::Func, g: &Self::Func, p: &Self::Pred) -> bool;
}
