//! Symbolic finite automata.
//!
//! An [`Sfa`] is an ordinary finite automaton whose moves carry predicates of
//! some [`BooleanAlgebra`] instead of single symbols, plus optional epsilon
//! moves. Automata are immutable: every operation builds a new one through
//! [`Sfa::with_options`], which drops unsatisfiable moves and, unless told
//! otherwise, merges parallel moves and prunes useless states.
//!
//! Any automaton with no reachable final state is replaced by the canonical
//! empty automaton ([`Sfa::empty`]).

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt::{Debug, Display, Formatter};

use log::debug;

use crate::algebra::BooleanAlgebra;
use crate::deadline::Deadline;
use crate::error::Result;
use crate::expr::BoolExpr;
use crate::safa::{Safa, SafaMove, SafaOptions};
use crate::StateId;

mod ambiguity;
mod boolean;
mod determinize;
mod equivalence;
mod minimize;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputMove<P> {
    pub from: StateId,
    pub guard: P,
    pub to: StateId,
}

/// A move given to the constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SfaMove<P> {
    Input(InputMove<P>),
    Epsilon { from: StateId, to: StateId },
}

impl<P> SfaMove<P> {
    pub fn input(from: StateId, guard: P, to: StateId) -> Self {
        SfaMove::Input(InputMove { from, guard, to })
    }

    pub fn epsilon(from: StateId, to: StateId) -> Self {
        SfaMove::Epsilon { from, to }
    }
}

/// Post-processing applied by [`Sfa::with_options`].
#[derive(Debug, Copy, Clone)]
pub struct SfaOptions {
    /// Merge moves with the same endpoints into one by disjoining the guards.
    pub normalize: bool,
    /// Remove states that are unreachable or cannot reach a final state.
    pub prune: bool,
}

impl Default for SfaOptions {
    fn default() -> Self {
        Self {
            normalize: true,
            prune: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sfa<P> {
    initial: StateId,
    states: BTreeSet<StateId>,
    finals: BTreeSet<StateId>,
    input_from: BTreeMap<StateId, Vec<InputMove<P>>>,
    epsilon_from: BTreeMap<StateId, BTreeSet<StateId>>,
    max_state: StateId,
    transition_count: usize,
    is_deterministic: bool,
    is_epsilon_free: bool,
    is_total: bool,
    is_empty: bool,
}

impl<P: Clone + Debug> Sfa<P> {
    fn bare(initial: StateId, finals: BTreeSet<StateId>) -> Self {
        let mut states: BTreeSet<StateId> = finals.clone();
        states.insert(initial);
        let max_state = states.iter().next_back().copied().unwrap_or(initial);
        Self {
            initial,
            states,
            finals,
            input_from: BTreeMap::new(),
            epsilon_from: BTreeMap::new(),
            max_state,
            transition_count: 0,
            is_deterministic: false,
            is_epsilon_free: true,
            is_total: false,
            is_empty: false,
        }
    }

    /// The automaton accepting nothing: a single non-final state with a
    /// `true` self-loop.
    pub fn empty<A: BooleanAlgebra<Pred = P>>(ba: &A) -> Self {
        let mut aut = Self::bare(0, BTreeSet::new());
        aut.push_input(InputMove {
            from: 0,
            guard: ba.mk_true(),
            to: 0,
        });
        aut.is_deterministic = true;
        aut.is_total = true;
        aut.is_empty = true;
        aut
    }

    /// The automaton accepting every word.
    pub fn full<A: BooleanAlgebra<Pred = P>>(ba: &A) -> Self {
        let mut aut = Self::bare(0, BTreeSet::from([0]));
        aut.push_input(InputMove {
            from: 0,
            guard: ba.mk_true(),
            to: 0,
        });
        aut.is_deterministic = true;
        aut.is_total = true;
        aut
    }

    /// The automaton accepting exactly the one-symbol words satisfying `guard`.
    pub fn atom<A: BooleanAlgebra<Pred = P>>(guard: P, ba: &A, deadline: &Deadline) -> Result<Self> {
        Self::new([SfaMove::input(0, guard, 1)], 0, [1], ba, deadline)
    }

    /// Build with the default [`SfaOptions`].
    pub fn new<A: BooleanAlgebra<Pred = P>>(
        moves: impl IntoIterator<Item = SfaMove<P>>,
        initial: StateId,
        finals: impl IntoIterator<Item = StateId>,
        ba: &A,
        deadline: &Deadline,
    ) -> Result<Self> {
        Self::with_options(moves, initial, finals, SfaOptions::default(), ba, deadline)
    }

    pub fn with_options<A: BooleanAlgebra<Pred = P>>(
        moves: impl IntoIterator<Item = SfaMove<P>>,
        initial: StateId,
        finals: impl IntoIterator<Item = StateId>,
        options: SfaOptions,
        ba: &A,
        deadline: &Deadline,
    ) -> Result<Self> {
        let finals: BTreeSet<StateId> = finals.into_iter().collect();
        if finals.is_empty() {
            return Ok(Self::empty(ba));
        }

        let mut aut = Self::bare(initial, finals);
        for m in moves {
            match m {
                SfaMove::Input(m) => {
                    deadline.check()?;
                    if ba.is_satisfiable(&m.guard) {
                        aut.push_input(m);
                    }
                }
                SfaMove::Epsilon { from, to } => aut.push_epsilon(from, to),
            }
        }

        if options.normalize {
            aut = aut.merge_parallel(ba);
        }
        if options.prune {
            aut = aut.prune();
        }
        if aut.finals.is_empty() || !aut.has_reachable_final() {
            return Ok(Self::empty(ba));
        }

        aut.is_deterministic = aut.check_deterministic(ba, deadline)?;
        Ok(aut)
    }

    fn push_input(&mut self, m: InputMove<P>) {
        self.states.insert(m.from);
        self.states.insert(m.to);
        self.max_state = self.max_state.max(m.from).max(m.to);
        self.transition_count += 1;
        self.input_from.entry(m.from).or_default().push(m);
    }

    fn push_epsilon(&mut self, from: StateId, to: StateId) {
        if from == to {
            return;
        }
        self.states.insert(from);
        self.states.insert(to);
        self.max_state = self.max_state.max(from).max(to);
        if self.epsilon_from.entry(from).or_default().insert(to) {
            self.transition_count += 1;
            self.is_epsilon_free = false;
        }
    }

    /// Disjoin the guards of moves sharing both endpoints.
    fn merge_parallel<A: BooleanAlgebra<Pred = P>>(self, ba: &A) -> Self {
        let mut merged: BTreeMap<(StateId, StateId), P> = BTreeMap::new();
        for m in self.input_from.values().flatten() {
            let guard = match merged.remove(&(m.from, m.to)) {
                Some(g) => ba.mk_or(&g, &m.guard),
                None => m.guard.clone(),
            };
            merged.insert((m.from, m.to), guard);
        }

        let mut aut = Self::bare(self.initial, self.finals);
        aut.states.extend(self.states);
        aut.max_state = aut.max_state.max(self.max_state);
        for ((from, to), guard) in merged {
            aut.push_input(InputMove { from, guard, to });
        }
        for (from, tos) in self.epsilon_from {
            for to in tos {
                aut.push_epsilon(from, to);
            }
        }
        aut
    }

    /// Keep only states reachable from the initial state that can also reach
    /// a final state.
    fn prune(self) -> Self {
        let forward = self.reachable_from(self.initial);

        let mut backward_edges: HashMap<StateId, Vec<StateId>> = HashMap::new();
        for m in self.input_from.values().flatten() {
            backward_edges.entry(m.to).or_default().push(m.from);
        }
        for (&from, tos) in &self.epsilon_from {
            for &to in tos {
                backward_edges.entry(to).or_default().push(from);
            }
        }
        let mut backward: BTreeSet<StateId> = self.finals.clone();
        let mut stack: Vec<StateId> = self.finals.iter().copied().collect();
        while let Some(s) = stack.pop() {
            for &p in backward_edges.get(&s).into_iter().flatten() {
                if backward.insert(p) {
                    stack.push(p);
                }
            }
        }

        let alive: BTreeSet<StateId> = forward.intersection(&backward).copied().collect();
        let finals = self.finals.intersection(&alive).copied().collect();
        let mut aut = Self::bare(self.initial, finals);
        for m in self.input_from.into_values().flatten() {
            if alive.contains(&m.from) && alive.contains(&m.to) {
                aut.push_input(m);
            }
        }
        for (from, tos) in self.epsilon_from {
            for to in tos {
                if alive.contains(&from) && alive.contains(&to) {
                    aut.push_epsilon(from, to);
                }
            }
        }
        aut
    }

    fn reachable_from(&self, start: StateId) -> BTreeSet<StateId> {
        let mut seen = BTreeSet::from([start]);
        let mut stack = vec![start];
        while let Some(s) = stack.pop() {
            let inputs = self.moves_from(s).iter().map(|m| m.to);
            let epsilons = self.epsilon_from(s).iter().copied();
            for t in inputs.chain(epsilons) {
                if seen.insert(t) {
                    stack.push(t);
                }
            }
        }
        seen
    }

    fn has_reachable_final(&self) -> bool {
        self.reachable_from(self.initial)
            .iter()
            .any(|s| self.finals.contains(s))
    }

    fn check_deterministic<A: BooleanAlgebra<Pred = P>>(&self, ba: &A, deadline: &Deadline) -> Result<bool> {
        if !self.is_epsilon_free {
            return Ok(false);
        }
        for moves in self.input_from.values() {
            for (i, a) in moves.iter().enumerate() {
                for b in &moves[i + 1..] {
                    deadline.check()?;
                    if ba.is_satisfiable(&ba.mk_and(&a.guard, &b.guard)) {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }

    /// All states reachable from `states` through epsilon moves.
    pub fn epsilon_closure(&self, states: impl IntoIterator<Item = StateId>) -> BTreeSet<StateId> {
        let mut closure: BTreeSet<StateId> = BTreeSet::new();
        let mut stack: Vec<StateId> = Vec::new();
        for s in states {
            if closure.insert(s) {
                stack.push(s);
            }
        }
        while let Some(s) = stack.pop() {
            for &t in self.epsilon_from(s) {
                if closure.insert(t) {
                    stack.push(t);
                }
            }
        }
        closure
    }

    pub fn is_final_configuration(&self, states: &BTreeSet<StateId>) -> bool {
        states.iter().any(|s| self.finals.contains(s))
    }

    pub fn accepts<A: BooleanAlgebra<Pred = P>>(&self, word: &[A::Elem], ba: &A) -> bool {
        let mut current = self.epsilon_closure([self.initial]);
        for symbol in word {
            let next: Vec<StateId> = current
                .iter()
                .flat_map(|&s| self.moves_from(s))
                .filter(|m| ba.has_model(&m.guard, symbol))
                .map(|m| m.to)
                .collect();
            if next.is_empty() {
                return false;
            }
            current = self.epsilon_closure(next);
        }
        self.is_final_configuration(&current)
    }

    /// A shortest accepted word, or `None` if the language is empty.
    pub fn witness<A: BooleanAlgebra<Pred = P>>(&self, ba: &A, deadline: &Deadline) -> Result<Option<Vec<A::Elem>>> {
        if self.is_empty {
            return Ok(None);
        }

        // 0-1 BFS: epsilon moves do not lengthen the word.
        let mut parent: HashMap<StateId, Option<(StateId, Option<A::Elem>)>> = HashMap::new();
        let mut queue: VecDeque<StateId> = VecDeque::new();
        let mut done: BTreeSet<StateId> = BTreeSet::new();
        parent.insert(self.initial, None);
        queue.push_back(self.initial);

        while let Some(s) = queue.pop_front() {
            if !done.insert(s) {
                continue;
            }
            deadline.check()?;
            if self.finals.contains(&s) {
                let mut word = Vec::new();
                let mut cur = s;
                while let Some(Some((prev, symbol))) = parent.get(&cur) {
                    if let Some(symbol) = symbol {
                        word.push(symbol.clone());
                    }
                    cur = *prev;
                }
                word.reverse();
                return Ok(Some(word));
            }
            for &t in self.epsilon_from(s) {
                if !done.contains(&t) {
                    parent.insert(t, Some((s, None)));
                    queue.push_front(t);
                }
            }
            for m in self.moves_from(s) {
                if parent.contains_key(&m.to) {
                    continue;
                }
                if let Some(symbol) = ba.generate_witness(&m.guard) {
                    parent.insert(m.to, Some((s, Some(symbol))));
                    queue.push_back(m.to);
                }
            }
        }
        Ok(None)
    }

    /// The same language as an alternating automaton whose targets are
    /// single states.
    pub fn to_safa<A: BooleanAlgebra<Pred = P>>(&self, ba: &A, deadline: &Deadline) -> Result<Safa<P>> {
        let aut = self.remove_epsilon_moves(ba, deadline)?;
        let moves = aut.moves().map(|m| SafaMove {
            from: m.from,
            guard: m.guard.clone(),
            to: BoolExpr::State(m.to),
        });
        Safa::with_options(
            moves,
            BoolExpr::State(aut.initial),
            aut.finals.iter().copied(),
            SafaOptions::default(),
            ba,
            deadline,
        )
    }
}

impl<P> Sfa<P> {
    pub fn initial_state(&self) -> StateId {
        self.initial
    }

    pub fn states(&self) -> &BTreeSet<StateId> {
        &self.states
    }

    pub fn final_states(&self) -> &BTreeSet<StateId> {
        &self.finals
    }

    pub fn non_final_states(&self) -> BTreeSet<StateId> {
        self.states.difference(&self.finals).copied().collect()
    }

    pub fn is_final(&self, s: StateId) -> bool {
        self.finals.contains(&s)
    }

    /// All input moves, grouped by source state.
    pub fn moves(&self) -> impl Iterator<Item = &InputMove<P>> {
        self.input_from.values().flatten()
    }

    pub fn moves_from(&self, s: StateId) -> &[InputMove<P>] {
        self.input_from.get(&s).map_or(&[], |v| v.as_slice())
    }

    /// Input moves entering `s`.
    pub fn moves_to(&self, s: StateId) -> impl Iterator<Item = &InputMove<P>> {
        self.moves().filter(move |m| m.to == s)
    }

    /// Input moves entering any of `states`.
    pub fn moves_to_set<'a>(&'a self, states: &'a BTreeSet<StateId>) -> impl Iterator<Item = &'a InputMove<P>> {
        self.moves().filter(move |m| states.contains(&m.to))
    }

    /// Sources of the epsilon moves entering `s`.
    pub fn epsilon_to(&self, s: StateId) -> impl Iterator<Item = StateId> + '_ {
        self.epsilon_moves().filter(move |&(_, to)| to == s).map(|(from, _)| from)
    }

    pub fn epsilon_moves(&self) -> impl Iterator<Item = (StateId, StateId)> + '_ {
        self.epsilon_from
            .iter()
            .flat_map(|(&from, tos)| tos.iter().map(move |&to| (from, to)))
    }

    pub fn epsilon_from(&self, s: StateId) -> &BTreeSet<StateId> {
        static NONE: BTreeSet<StateId> = BTreeSet::new();
        self.epsilon_from.get(&s).unwrap_or(&NONE)
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

    pub fn is_deterministic(&self) -> bool {
        self.is_deterministic
    }

    pub fn is_epsilon_free(&self) -> bool {
        self.is_epsilon_free
    }

    pub fn is_total(&self) -> bool {
        self.is_total
    }

    pub fn is_empty(&self) -> bool {
        self.is_empty
    }
}

impl<P: Display> Display for Sfa<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "initial: {}", self.initial)?;
        writeln!(f, "finals: {:?}", self.finals)?;
        for m in self.input_from.values().flatten() {
            writeln!(f, "{} -{}-> {}", m.from, m.guard, m.to)?;
        }
        for (from, to) in self.epsilon_moves() {
            writeln!(f, "{} -eps-> {}", from, to)?;
        }
        Ok(())
    }
}

pub(crate) fn log_size<P>(op: &str, aut: &Sfa<P>) {
    debug!(
        "{}: {} states, {} transitions",
        op,
        aut.state_count(),
        aut.transition_count()
    );
}

#[cfg(test)]
pub(crate) mod tests {
    use test_log::test;

    use super::*;
    use crate::intervals::{CharAlgebra, Ranges};

    pub(crate) fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    /// Words over `[a-z]` that contain at least one `b`.
    pub(crate) fn contains_b(ba: &CharAlgebra) -> Sfa<Ranges> {
        let d = Deadline::unlimited();
        Sfa::new(
            [
                SfaMove::input(0, ba.mk_not(&ba.range('b', 'b')), 0),
                SfaMove::input(0, ba.range('b', 'b'), 1),
                SfaMove::input(1, ba.mk_true(), 1),
            ],
            0,
            [1],
            ba,
            &d,
        )
        .unwrap()
    }

    /// Words whose every symbol is a digit (including the empty word).
    pub(crate) fn digits(ba: &CharAlgebra) -> Sfa<Ranges> {
        let d = Deadline::unlimited();
        Sfa::new([SfaMove::input(0, ba.range('0', '9'), 0)], 0, [0], ba, &d).unwrap()
    }

    #[test]
    fn test_empty_and_full() {
        let ba = CharAlgebra::new();
        let empty = Sfa::empty(&ba);
        assert!(empty.is_empty());
        assert!(!empty.accepts(&chars(""), &ba));
        assert!(!empty.accepts(&chars("abc"), &ba));
        let full = Sfa::full(&ba);
        assert!(full.accepts(&chars(""), &ba));
        assert!(full.accepts(&chars("xyz"), &ba));
        assert!(full.is_total());
    }

    #[test]
    fn test_unsatisfiable_moves_are_dropped() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let aut = Sfa::new([SfaMove::input(0, ba.mk_false(), 1)], 0, [1], &ba, &d).unwrap();
        assert!(aut.is_empty());
        assert_eq!(aut.state_count(), 1);
    }

    #[test]
    fn test_pruning_removes_dead_states() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let aut = Sfa::new(
            [
                SfaMove::input(0, ba.range('a', 'a'), 1),
                SfaMove::input(0, ba.range('b', 'b'), 2),
                SfaMove::input(3, ba.range('c', 'c'), 1),
            ],
            0,
            [1],
            &ba,
            &d,
        )
        .unwrap();
        assert_eq!(aut.states(), &BTreeSet::from([0, 1]));
        assert_eq!(aut.transition_count(), 1);
    }

    #[test]
    fn test_parallel_moves_are_merged() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let aut = Sfa::new(
            [
                SfaMove::input(0, ba.range('a', 'c'), 1),
                SfaMove::input(0, ba.range('x', 'z'), 1),
            ],
            0,
            [1],
            &ba,
            &d,
        )
        .unwrap();
        assert_eq!(aut.transition_count(), 1);
        assert!(aut.accepts(&chars("y"), &ba));
        assert!(aut.is_deterministic());
    }

    #[test]
    fn test_accepts() {
        let ba = CharAlgebra::new();
        let aut = contains_b(&ba);
        assert!(aut.accepts(&chars("abc"), &ba));
        assert!(aut.accepts(&chars("b"), &ba));
        assert!(!aut.accepts(&chars("acd"), &ba));
        assert!(!aut.accepts(&chars(""), &ba));
        assert!(aut.is_deterministic());
    }

    #[test]
    fn test_accepts_through_epsilon() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let aut = Sfa::new(
            [
                SfaMove::epsilon(0, 1),
                SfaMove::input(1, ba.range('a', 'a'), 2),
                SfaMove::epsilon(2, 3),
            ],
            0,
            [3],
            &ba,
            &d,
        )
        .unwrap();
        assert!(!aut.is_epsilon_free());
        assert!(!aut.is_deterministic());
        assert!(aut.accepts(&chars("a"), &ba));
        assert!(!aut.accepts(&chars(""), &ba));
        assert_eq!(aut.epsilon_moves().count(), 2);
    }

    #[test]
    fn test_moves_to() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let aut = Sfa::new(
            [
                SfaMove::input(0, ba.range('a', 'a'), 2),
                SfaMove::input(1, ba.range('b', 'b'), 2),
                SfaMove::input(2, ba.range('c', 'c'), 3),
                SfaMove::epsilon(0, 1),
                SfaMove::epsilon(1, 3),
            ],
            0,
            [3],
            &ba,
            &d,
        )
        .unwrap();
        let mut into_two: Vec<StateId> = aut.moves_to(2).map(|m| m.from).collect();
        into_two.sort();
        assert_eq!(into_two, vec![0, 1]);
        assert_eq!(aut.moves_to(0).count(), 0);
        assert_eq!(aut.epsilon_to(3).collect::<Vec<_>>(), vec![1]);
        assert_eq!(aut.epsilon_to(1).collect::<Vec<_>>(), vec![0]);
        let targets = BTreeSet::from([2, 3]);
        assert_eq!(aut.moves_to_set(&targets).count(), 3);
    }

    #[test]
    fn test_witness_is_shortest() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let aut = Sfa::new(
            [
                SfaMove::input(0, ba.range('a', 'a'), 1),
                SfaMove::input(1, ba.range('b', 'b'), 2),
                SfaMove::input(2, ba.range('c', 'c'), 3),
                SfaMove::input(0, ba.range('x', 'y'), 4),
                SfaMove::epsilon(4, 3),
            ],
            0,
            [3],
            &ba,
            &d,
        )
        .unwrap();
        let w = aut.witness(&ba, &d).unwrap().unwrap();
        assert_eq!(w, chars("x"));
        assert!(aut.accepts(&w, &ba));
        assert_eq!(Sfa::empty(&ba).witness(&ba, &d).unwrap(), None);
        assert_eq!(digits(&ba).witness(&ba, &d).unwrap(), Some(vec![]));
    }

    #[test]
    fn test_atom() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let aut = Sfa::atom(ba.range('0', '9'), &ba, &d).unwrap();
        assert!(aut.accepts(&chars("7"), &ba));
        assert!(!aut.accepts(&chars("77"), &ba));
        assert!(!aut.accepts(&chars("a"), &ba));
        assert!(Sfa::atom(ba.mk_false(), &ba, &d).unwrap().is_empty());
    }

    #[test]
    fn test_to_safa_preserves_language() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let aut = contains_b(&ba);
        let safa = aut.to_safa(&ba, &d).unwrap();
        for w in ["", "a", "b", "ab", "aab", "ca"] {
            assert_eq!(safa.accepts(&chars(w), &ba), aut.accepts(&chars(w), &ba), "{:?}", w);
        }
    }
}
