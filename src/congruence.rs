//! Congruence relations over pairs of state formulas.
//!
//! A relation records pairs `(p, q)` already assumed equivalent by the
//! alternating-automaton bisimulation, where `p` is over the left
//! automaton's states and `q` over the right one's. A pair is a member when
//! `p ⇔ q` follows from the recorded pairs, so the relation is closed under
//! the Boolean congruence rules, not only under the pairs literally added.
//!
//! Both backends keep left and right states as distinct propositional
//! variables, allocated lazily on first use.

use std::collections::HashMap;

use log::debug;

use crate::bdd::Bdd;
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::expr::Lattice;
use crate::formula::ExprFactory;
use crate::reference::Ref;
use crate::sat::Solver;
use crate::types::Lit;
use crate::StateId;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Side {
    Left,
    Right,
}

pub trait CongruenceRelation {
    /// Whether `p ⇔ q` is implied by the pairs added so far.
    fn is_member<F: ExprFactory>(
        &mut self,
        factory: &F,
        p: &F::Elem,
        q: &F::Elem,
        deadline: &Deadline,
    ) -> Result<bool>;

    /// Record `p ⇔ q`. Returns `false` if the relation became infeasible,
    /// i.e. no assignment of the states satisfies all recorded pairs.
    fn add<F: ExprFactory>(
        &mut self,
        factory: &F,
        p: &F::Elem,
        q: &F::Elem,
        deadline: &Deadline,
    ) -> Result<bool>;

    /// Number of pairs recorded.
    fn len(&self) -> usize;

    /// Forget every recorded pair.
    fn clear(&mut self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Congruence relation kept as one monotonically shrinking decision diagram.
pub struct BddRelation {
    bdd: Bdd,
    vars: HashMap<(Side, StateId), u32>,
    relation: Ref,
    pairs: usize,
}

impl BddRelation {
    pub fn new() -> Self {
        Self::with_bdd(Bdd::default())
    }

    pub fn with_bdd(bdd: Bdd) -> Self {
        let relation = bdd.one;
        Self {
            bdd,
            vars: HashMap::new(),
            relation,
            pairs: 0,
        }
    }

    fn encode<F: ExprFactory>(&mut self, factory: &F, e: &F::Elem, side: Side) -> Ref {
        let mut embed = BddEmbed {
            bdd: &self.bdd,
            vars: &mut self.vars,
            side,
        };
        factory.fold_elem(e, &mut embed)
    }

    fn biconditional<F: ExprFactory>(&mut self, factory: &F, p: &F::Elem, q: &F::Elem) -> Ref {
        let l = self.encode(factory, p, Side::Left);
        let r = self.encode(factory, q, Side::Right);
        self.bdd.apply_eq(l, r)
    }
}

impl Default for BddRelation {
    fn default() -> Self {
        Self::new()
    }
}

impl CongruenceRelation for BddRelation {
    fn is_member<F: ExprFactory>(
        &mut self,
        factory: &F,
        p: &F::Elem,
        q: &F::Elem,
        deadline: &Deadline,
    ) -> Result<bool> {
        deadline.check()?;
        let eq = self.biconditional(factory, p, q);
        Ok(self.bdd.is_implies(self.relation, eq))
    }

    fn add<F: ExprFactory>(
        &mut self,
        factory: &F,
        p: &F::Elem,
        q: &F::Elem,
        deadline: &Deadline,
    ) -> Result<bool> {
        deadline.check()?;
        let eq = self.biconditional(factory, p, q);
        self.relation = self.bdd.apply_and(self.relation, eq);
        self.pairs += 1;
        debug!(
            "bdd relation: {} pairs, {} nodes",
            self.pairs,
            self.bdd.size(self.relation)
        );
        Ok(!self.bdd.is_zero(self.relation))
    }

    fn len(&self) -> usize {
        self.pairs
    }

    fn clear(&mut self) {
        self.relation = self.bdd.one;
        self.vars.clear();
        self.pairs = 0;
    }
}

struct BddEmbed<'a> {
    bdd: &'a Bdd,
    vars: &'a mut HashMap<(Side, StateId), u32>,
    side: Side,
}

impl Lattice for BddEmbed<'_> {
    type Elem = Ref;

    fn top(&mut self) -> Ref {
        self.bdd.one
    }
    fn bottom(&mut self) -> Ref {
        self.bdd.zero
    }
    fn state(&mut self, s: StateId) -> Ref {
        let next = self.vars.len() as u32 + 1;
        let v = *self.vars.entry((self.side, s)).or_insert(next);
        self.bdd.mk_var(v)
    }
    fn and(&mut self, a: Ref, b: Ref) -> Ref {
        self.bdd.apply_and(a, b)
    }
    fn or(&mut self, a: Ref, b: Ref) -> Ref {
        self.bdd.apply_or(a, b)
    }
}

/// Congruence relation kept as an incrementally extended clause set.
///
/// Formulas are Tseitin-encoded with hash-consed gate definitions; each added
/// pair asserts the literal of its biconditional as a unit clause.
pub struct SatRelation {
    solver: Solver,
    vars: HashMap<(Side, StateId), Lit>,
    gates: HashMap<(Lit, Lit), Lit>,
    truth: Lit,
    pairs: usize,
}

impl SatRelation {
    pub fn new() -> Self {
        let mut solver = Solver::new();
        let truth = solver.new_var().pos();
        solver.add_clause([truth]);
        Self {
            solver,
            vars: HashMap::new(),
            gates: HashMap::new(),
            truth,
            pairs: 0,
        }
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    fn encode<F: ExprFactory>(&mut self, factory: &F, e: &F::Elem, side: Side) -> Result<Lit> {
        let mut tseitin = Tseitin {
            relation: self,
            side,
            contradiction: false,
        };
        let lit = factory.fold_elem(e, &mut tseitin);
        if tseitin.contradiction {
            return Err(Error::Contradiction(
                "gate definition rejected by the clause store".to_string(),
            ));
        }
        Ok(lit)
    }

    fn biconditional<F: ExprFactory>(&mut self, factory: &F, p: &F::Elem, q: &F::Elem) -> Result<Lit> {
        let l = self.encode(factory, p, Side::Left)?;
        let r = self.encode(factory, q, Side::Right)?;
        let mut tseitin = Tseitin {
            relation: self,
            side: Side::Left,
            contradiction: false,
        };
        let both = tseitin.and(l, r);
        let neither = tseitin.and(-l, -r);
        let iff = tseitin.or(both, neither);
        if tseitin.contradiction {
            return Err(Error::Contradiction(
                "gate definition rejected by the clause store".to_string(),
            ));
        }
        Ok(iff)
    }

    fn var(&mut self, side: Side, s: StateId) -> Lit {
        if let Some(&lit) = self.vars.get(&(side, s)) {
            return lit;
        }
        let lit = self.solver.new_var().pos();
        self.vars.insert((side, s), lit);
        lit
    }

    /// Literal equivalent to `a ∧ b`. Returns `None` if a definition clause
    /// made the store contradictory.
    fn gate_and(&mut self, a: Lit, b: Lit) -> Option<Lit> {
        let t = self.truth;
        if a == -t || b == -t || a == -b {
            return Some(-t);
        }
        if a == t || a == b {
            return Some(b);
        }
        if b == t {
            return Some(a);
        }

        let key = if a < b { (a, b) } else { (b, a) };
        if let Some(&x) = self.gates.get(&key) {
            return Some(x);
        }
        let x = self.solver.new_var().pos();
        let ok = self.solver.add_clause([-x, a])
            && self.solver.add_clause([-x, b])
            && self.solver.add_clause([x, -a, -b]);
        if !ok {
            return None;
        }
        self.gates.insert(key, x);
        Some(x)
    }
}

impl Default for SatRelation {
    fn default() -> Self {
        Self::new()
    }
}

impl CongruenceRelation for SatRelation {
    fn is_member<F: ExprFactory>(
        &mut self,
        factory: &F,
        p: &F::Elem,
        q: &F::Elem,
        deadline: &Deadline,
    ) -> Result<bool> {
        deadline.check()?;
        let iff = self.biconditional(factory, p, q)?;
        let counter_model = self.solver.solve_under(&[-iff], deadline)?;
        Ok(!counter_model)
    }

    fn add<F: ExprFactory>(
        &mut self,
        factory: &F,
        p: &F::Elem,
        q: &F::Elem,
        deadline: &Deadline,
    ) -> Result<bool> {
        deadline.check()?;
        let iff = self.biconditional(factory, p, q)?;
        if !self.solver.add_clause([iff]) {
            return Err(Error::Contradiction(format!(
                "unit clause {:?} rejected",
                iff
            )));
        }
        self.pairs += 1;
        debug!(
            "sat relation: {} pairs, {} vars, {} clauses",
            self.pairs,
            self.solver.num_vars(),
            self.solver.num_clauses()
        );
        self.solver.solve(deadline)
    }

    fn len(&self) -> usize {
        self.pairs
    }

    fn clear(&mut self) {
        *self = Self::new();
    }
}

struct Tseitin<'a> {
    relation: &'a mut SatRelation,
    side: Side,
    contradiction: bool,
}

impl Lattice for Tseitin<'_> {
    type Elem = Lit;

    fn top(&mut self) -> Lit {
        self.relation.truth
    }
    fn bottom(&mut self) -> Lit {
        -self.relation.truth
    }
    fn state(&mut self, s: StateId) -> Lit {
        self.relation.var(self.side, s)
    }
    fn and(&mut self, a: Lit, b: Lit) -> Lit {
        match self.relation.gate_and(a, b) {
            Some(x) => x,
            None => {
                self.contradiction = true;
                -self.relation.truth
            }
        }
    }
    fn or(&mut self, a: Lit, b: Lit) -> Lit {
        -self.and(-a, -b)
    }
}
