//! Symbolic alternating finite automata.
//!
//! A [`Safa`] move goes from one state to a positive [`BoolExpr`] over
//! states. A configuration is itself such a formula: reading a symbol
//! replaces every state by the disjunction of the targets of its enabled
//! moves (`false` if none is enabled), and a configuration accepts when it
//! holds under the valuation "state is final".
//!
//! The Boolean operations act on the formulas directly (conjoining,
//! disjoining or dualizing targets), so they never build state products.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Display, Formatter};

use log::debug;

use crate::algebra::BooleanAlgebra;
use crate::deadline::Deadline;
use crate::error::Result;
use crate::expr::BoolExpr;
use crate::StateId;

mod boolean;
mod equivalence;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafaMove<P> {
    pub from: StateId,
    pub guard: P,
    pub to: BoolExpr,
}

impl<P> SafaMove<P> {
    pub fn new(from: StateId, guard: P, to: BoolExpr) -> Self {
        Self { from, guard, to }
    }
}

/// Post-processing applied by [`Safa::with_options`].
#[derive(Debug, Copy, Clone)]
pub struct SafaOptions {
    /// Split the moves of every state along their minterms, so that exactly
    /// one move is enabled per state and symbol.
    pub normalize: bool,
    /// Send the residual guard of every state to a rejecting sink. Implied by
    /// `normalize`.
    pub complete: bool,
}

impl Default for SafaOptions {
    fn default() -> Self {
        Self {
            normalize: true,
            complete: false,
        }
    }
}

const RAW: SafaOptions = SafaOptions {
    normalize: false,
    complete: false,
};

#[derive(Debug, Clone)]
pub struct Safa<P> {
    initial: BoolExpr,
    states: BTreeSet<StateId>,
    finals: BTreeSet<StateId>,
    moves_from: BTreeMap<StateId, Vec<SafaMove<P>>>,
    max_state: StateId,
    transition_count: usize,
}

impl<P: Clone + Debug> Safa<P> {
    fn bare(initial: BoolExpr, finals: BTreeSet<StateId>) -> Self {
        let mut states = initial.states();
        states.extend(finals.iter().copied());
        let max_state = states.iter().next_back().copied().unwrap_or(0);
        Self {
            initial,
            states,
            finals,
            moves_from: BTreeMap::new(),
            max_state,
            transition_count: 0,
        }
    }

    /// Initial formula `false`: accepts nothing.
    pub fn empty() -> Self {
        Self::bare(BoolExpr::False, BTreeSet::new())
    }

    /// Initial formula `true`: accepts everything.
    pub fn full() -> Self {
        Self::bare(BoolExpr::True, BTreeSet::new())
    }

    /// Build with the default [`SafaOptions`].
    pub fn new<A: BooleanAlgebra<Pred = P>>(
        moves: impl IntoIterator<Item = SafaMove<P>>,
        initial: BoolExpr,
        finals: impl IntoIterator<Item = StateId>,
        ba: &A,
        deadline: &Deadline,
    ) -> Result<Self> {
        Self::with_options(moves, initial, finals, SafaOptions::default(), ba, deadline)
    }

    /// Build from a move list, dropping moves whose guard is unsatisfiable.
    pub fn with_options<A: BooleanAlgebra<Pred = P>>(
        moves: impl IntoIterator<Item = SafaMove<P>>,
        initial: BoolExpr,
        finals: impl IntoIterator<Item = StateId>,
        options: SafaOptions,
        ba: &A,
        deadline: &Deadline,
    ) -> Result<Self> {
        let mut aut = Self::bare(initial, finals.into_iter().collect());
        for m in moves {
            deadline.check()?;
            if ba.is_satisfiable(&m.guard) {
                aut.push(m);
            }
        }

        if options.normalize {
            aut = aut.normalize(ba, deadline)?;
        } else if options.complete {
            aut = aut.complete(ba, deadline)?;
        }
        Ok(aut)
    }

    fn push(&mut self, m: SafaMove<P>) {
        let targets = m.to.states();
        self.states.insert(m.from);
        self.max_state = self.max_state.max(m.from);
        if let Some(&max) = targets.last() {
            self.max_state = self.max_state.max(max);
        }
        self.states.extend(targets);
        self.transition_count += 1;
        self.moves_from.entry(m.from).or_default().push(m);
    }

    /// States from which a move on `symbol` leads into a target satisfied
    /// by `current`.
    fn predecessors<A: BooleanAlgebra<Pred = P>>(
        &self,
        current: &BTreeSet<StateId>,
        symbol: &A::Elem,
        ba: &A,
    ) -> BTreeSet<StateId> {
        self.moves()
            .filter(|m| m.to.has_model(current) && ba.has_model(&m.guard, symbol))
            .map(|m| m.from)
            .collect()
    }

    /// Evaluate backwards: starting from the final states, compute the set of
    /// states accepting each suffix of the word, then test the initial
    /// formula against the set for the whole word.
    pub fn accepts<A: BooleanAlgebra<Pred = P>>(&self, word: &[A::Elem], ba: &A) -> bool {
        let mut current = self.finals.clone();
        for symbol in word.iter().rev() {
            current = self.predecessors(&current, symbol, ba);
        }
        self.initial.has_model(&current)
    }
}

impl<P> Safa<P> {
    pub fn initial(&self) -> &BoolExpr {
        &self.initial
    }

    pub fn states(&self) -> &BTreeSet<StateId> {
        &self.states
    }

    pub fn final_states(&self) -> &BTreeSet<StateId> {
        &self.finals
    }

    pub fn is_final(&self, s: StateId) -> bool {
        self.finals.contains(&s)
    }

    pub fn moves(&self) -> impl Iterator<Item = &SafaMove<P>> {
        self.moves_from.values().flatten()
    }

    pub fn moves_from(&self, s: StateId) -> &[SafaMove<P>] {
        self.moves_from.get(&s).map_or(&[], |v| v.as_slice())
    }

    pub fn max_state(&self) -> StateId {
        self.max_state
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transition_count
    }
}

impl<P: Display> Display for Safa<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "initial: {}", self.initial)?;
        writeln!(f, "finals: {:?}", self.finals)?;
        for m in self.moves() {
            writeln!(f, "{} -{}-> {}", m.from, m.guard, m.to)?;
        }
        Ok(())
    }
}

pub(crate) fn log_size<P>(op: &str, aut: &Safa<P>) {
    debug!(
        "{}: {} states, {} transitions, initial {}",
        op,
        aut.state_count(),
        aut.transition_count(),
        aut.initial()
    );
}
