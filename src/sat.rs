//! Incremental clause store with a small DPLL solver.
//!
//! Clauses are watched by two literals; search is chronological
//! backtracking over decisions, with unit propagation after every
//! assignment. Every solve starts from an empty assignment, so clauses may be
//! added freely between calls, and assumptions only live for one call.
//!
//! There is no clause learning and branching picks the lowest unassigned
//! variable, so the number of decisions grows exponentially on hard
//! instances. A [`SatRelation`](crate::congruence::SatRelation) over a large
//! bisimulation degrades accordingly; the deadline is the only bound.

use log::debug;

use crate::deadline::Deadline;
use crate::error::Result;
use crate::types::{Lit, Var};

pub struct Solver {
    num_vars: u32,
    clauses: Vec<Vec<Lit>>,
    /// Clause indices watching each literal, indexed by [`Lit::index`].
    watches: Vec<Vec<usize>>,
    units: Vec<Lit>,
    contradiction: bool,

    assignment: Vec<Option<bool>>,
    trail: Vec<Lit>,
    qhead: usize,
    num_decisions: u64,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver {
    pub fn new() -> Self {
        Self {
            num_vars: 0,
            clauses: Vec::new(),
            // Slots for the unused variable 0.
            watches: vec![Vec::new(), Vec::new()],
            units: Vec::new(),
            contradiction: false,
            assignment: vec![None],
            trail: Vec::new(),
            qhead: 0,
            num_decisions: 0,
        }
    }

    pub fn num_vars(&self) -> u32 {
        self.num_vars
    }

    /// Number of stored clauses, including units.
    pub fn num_clauses(&self) -> usize {
        self.clauses.len() + self.units.len()
    }

    /// Decisions made over all solves so far.
    pub fn num_decisions(&self) -> u64 {
        self.num_decisions
    }

    pub fn new_var(&mut self) -> Var {
        self.num_vars += 1;
        self.assignment.push(None);
        self.watches.push(Vec::new());
        self.watches.push(Vec::new());
        Var::new(self.num_vars)
    }

    /// Add a clause. Returns `false` if the store became trivially
    /// contradictory (the empty clause was added).
    pub fn add_clause(&mut self, lits: impl IntoIterator<Item = Lit>) -> bool {
        let mut lits: Vec<Lit> = lits.into_iter().collect();
        for lit in &lits {
            assert!(
                lit.var().id() <= self.num_vars,
                "Unknown variable {}",
                lit.var()
            );
        }
        lits.sort_unstable();
        lits.dedup();

        // A literal and its negation are adjacent after sorting.
        if lits.windows(2).any(|w| w[0] == -w[1]) {
            return true;
        }

        match lits.len() {
            0 => {
                self.contradiction = true;
                false
            }
            1 => {
                self.units.push(lits[0]);
                true
            }
            _ => {
                let index = self.clauses.len();
                self.watches[lits[0].index()].push(index);
                self.watches[lits[1].index()].push(index);
                self.clauses.push(lits);
                true
            }
        }
    }

    /// Value of `var` in the model found by the last successful solve.
    pub fn value(&self, var: Var) -> Option<bool> {
        self.assignment[var.id() as usize]
    }

    fn lit_value(&self, lit: Lit) -> Option<bool> {
        self.assignment[lit.var().id() as usize].map(|b| b != lit.is_negated())
    }

    fn assign(&mut self, lit: Lit) {
        self.assignment[lit.var().id() as usize] = Some(!lit.is_negated());
        self.trail.push(lit);
    }

    fn enqueue(&mut self, lit: Lit) -> bool {
        match self.lit_value(lit) {
            Some(b) => b,
            None => {
                self.assign(lit);
                true
            }
        }
    }

    fn backtrack(&mut self, len: usize) {
        while self.trail.len() > len {
            if let Some(lit) = self.trail.pop() {
                self.assignment[lit.var().id() as usize] = None;
            }
        }
        self.qhead = len;
    }

    /// Unit propagation. Returns `false` on conflict.
    fn propagate(&mut self) -> bool {
        while self.qhead < self.trail.len() {
            let false_lit = -self.trail[self.qhead];
            self.qhead += 1;

            let mut watchers = std::mem::take(&mut self.watches[false_lit.index()]);
            let mut conflict = false;
            let mut i = 0;
            while i < watchers.len() {
                let ci = watchers[i];
                if self.clauses[ci][0] == false_lit {
                    self.clauses[ci].swap(0, 1);
                }
                let first = self.clauses[ci][0];
                if self.lit_value(first) == Some(true) {
                    i += 1;
                    continue;
                }

                let replacement = (2..self.clauses[ci].len())
                    .find(|&k| self.lit_value(self.clauses[ci][k]) != Some(false));
                if let Some(k) = replacement {
                    self.clauses[ci].swap(1, k);
                    let watch = self.clauses[ci][1];
                    self.watches[watch.index()].push(ci);
                    watchers.swap_remove(i);
                    continue;
                }

                if self.lit_value(first) == Some(false) {
                    conflict = true;
                    break;
                }
                self.assign(first);
                i += 1;
            }
            // The falsified literal never becomes a replacement watch, so
            // nothing was pushed to its list meanwhile.
            self.watches[false_lit.index()] = watchers;

            if conflict {
                return false;
            }
        }
        true
    }

    pub fn solve(&mut self, deadline: &Deadline) -> Result<bool> {
        self.solve_under(&[], deadline)
    }

    /// Decide satisfiability of the stored clauses together with the
    /// temporary unit `assumptions`.
    pub fn solve_under(&mut self, assumptions: &[Lit], deadline: &Deadline) -> Result<bool> {
        self.backtrack(0);
        if self.contradiction {
            return Ok(false);
        }

        for i in 0..self.units.len() {
            let unit = self.units[i];
            if !self.enqueue(unit) {
                return Ok(false);
            }
        }
        for &lit in assumptions {
            if !self.enqueue(lit) {
                return Ok(false);
            }
        }
        if !self.propagate() {
            return Ok(false);
        }

        // (trail length before the decision, decision literal, already flipped)
        let mut decisions: Vec<(usize, Lit, bool)> = Vec::new();
        loop {
            deadline.check()?;

            let free = (1..=self.num_vars).find(|&v| self.assignment[v as usize].is_none());
            let Some(v) = free else {
                debug!(
                    "sat: {} vars, {} clauses, {} decisions",
                    self.num_vars,
                    self.num_clauses(),
                    self.num_decisions
                );
                return Ok(true);
            };

            let decision = Var::new(v).neg();
            self.num_decisions += 1;
            decisions.push((self.trail.len(), decision, false));
            self.assign(decision);

            while !self.propagate() {
                loop {
                    let Some((len, lit, flipped)) = decisions.pop() else {
                        return Ok(false);
                    };
                    self.backtrack(len);
                    if !flipped {
                        decisions.push((len, -lit, true));
                        self.assign(-lit);
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn lits(solver: &Solver, clause: &[i32]) -> Vec<Lit> {
        assert!(clause.iter().all(|l| l.unsigned_abs() <= solver.num_vars()));
        clause.iter().map(|&l| Lit::from_dimacs(l)).collect()
    }

    #[test]
    fn test_satisfiable() {
        let mut solver = Solver::new();
        for _ in 0..3 {
            solver.new_var();
        }
        let clauses = [vec![1, 2], vec![-1, 3], vec![-3, -2]];
        for c in &clauses {
            assert!(solver.add_clause(lits(&solver, c)));
        }
        assert!(solver.solve(&Deadline::unlimited()).unwrap());

        let value = |l: i32| solver.value(Var::new(l.unsigned_abs())).unwrap() == (l > 0);
        for c in &clauses {
            assert!(c.iter().any(|&l| value(l)));
        }
    }

    #[test]
    fn test_unsatisfiable() {
        let mut solver = Solver::new();
        solver.new_var();
        solver.new_var();
        for c in [[1, 2], [1, -2], [-1, 2], [-1, -2]] {
            solver.add_clause(lits(&solver, &c));
        }
        assert!(!solver.solve(&Deadline::unlimited()).unwrap());
    }

    /// `holes + 1` pigeons into `holes` holes; `p(i, h)`: pigeon `i` sits in hole `h`.
    fn pigeonhole(holes: i32) -> Solver {
        let pigeons = holes + 1;
        let mut solver = Solver::new();
        for _ in 0..pigeons * holes {
            solver.new_var();
        }
        let p = |i: i32, h: i32| holes * i + h + 1;
        for i in 0..pigeons {
            let clause: Vec<i32> = (0..holes).map(|h| p(i, h)).collect();
            solver.add_clause(lits(&solver, &clause));
        }
        for h in 0..holes {
            for i in 0..pigeons {
                for j in (i + 1)..pigeons {
                    solver.add_clause(lits(&solver, &[-p(i, h), -p(j, h)]));
                }
            }
        }
        solver
    }

    #[test]
    fn test_pigeonhole_three_into_two() {
        let mut solver = pigeonhole(2);
        assert!(!solver.solve(&Deadline::unlimited()).unwrap());
    }

    #[test]
    fn test_decisions_grow_without_learning() {
        let deadline = Deadline::unlimited();
        let mut counts = Vec::new();
        for holes in 2..=4 {
            let mut solver = pigeonhole(holes);
            assert!(!solver.solve(&deadline).unwrap());
            counts.push(solver.num_decisions());
        }
        // Each extra hole multiplies the search at least by the number of holes.
        assert!(counts[1] >= 2 * counts[0], "{:?}", counts);
        assert!(counts[2] >= 3 * counts[1], "{:?}", counts);
    }

    #[test]
    fn test_hard_instance_is_cut_by_deadline() {
        let mut solver = pigeonhole(9);
        let deadline = Deadline::after(std::time::Duration::from_millis(20));
        assert!(matches!(
            solver.solve(&deadline),
            Err(crate::error::Error::Timeout { .. })
        ));
    }

    #[test]
    fn test_assumptions_are_temporary() {
        let mut solver = Solver::new();
        let x = solver.new_var();
        let y = solver.new_var();
        solver.add_clause([x.neg(), y.pos()]);

        let deadline = Deadline::unlimited();
        assert!(!solver.solve_under(&[x.pos(), y.neg()], &deadline).unwrap());
        assert!(solver.solve_under(&[x.pos()], &deadline).unwrap());
        assert_eq!(solver.value(y), Some(true));
        assert!(solver.solve(&deadline).unwrap());
    }

    #[test]
    fn test_incremental_units() {
        let mut solver = Solver::new();
        let x = solver.new_var();
        let deadline = Deadline::unlimited();
        assert!(solver.add_clause([x.pos()]));
        assert!(solver.solve(&deadline).unwrap());
        assert!(solver.add_clause([x.neg()]));
        assert!(!solver.solve(&deadline).unwrap());
    }

    #[test]
    fn test_empty_and_tautological_clauses() {
        let mut solver = Solver::new();
        let x = solver.new_var();
        assert!(solver.add_clause([x.pos(), x.neg()]));
        assert_eq!(solver.num_clauses(), 0);
        assert!(!solver.add_clause([]));
        assert!(!solver.solve(&Deadline::unlimited()).unwrap());
    }

    #[test]
    #[should_panic(expected = "Unknown variable")]
    fn test_unknown_variable() {
        let mut solver = Solver::new();
        solver.add_clause([Var::new(1).pos()]);
    }
}
