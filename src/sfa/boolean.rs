//! Boolean closure and the other language-level constructions.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;

use crate::algebra::BooleanAlgebra;
use crate::deadline::Deadline;
use crate::error::Result;
use crate::StateId;

use super::{log_size, Sfa, SfaMove, SfaOptions};

const KEEP_STATES: SfaOptions = SfaOptions {
    normalize: true,
    prune: false,
};

/// Number the product or subset state `key`, queueing it if new.
fn state_id<K: Clone + Eq + Hash>(key: K, reached: &mut HashMap<K, StateId>, queue: &mut VecDeque<K>) -> StateId {
    if let Some(&id) = reached.get(&key) {
        return id;
    }
    let id = reached.len() as StateId;
    reached.insert(key.clone(), id);
    queue.push_back(key);
    id
}

impl<P: Clone + Debug> Sfa<P> {
    /// Synchronized product over epsilon closures.
    pub fn intersection<A: BooleanAlgebra<Pred = P>>(&self, other: &Self, ba: &A, deadline: &Deadline) -> Result<Self> {
        if self.is_empty || other.is_empty {
            return Ok(Self::empty(ba));
        }

        let mut moves = Vec::new();
        let mut finals = Vec::new();
        let mut reached: HashMap<(StateId, StateId), StateId> = HashMap::new();
        let mut queue = VecDeque::new();
        state_id((self.initial, other.initial), &mut reached, &mut queue);

        while let Some((p, q)) = queue.pop_front() {
            let id = reached[&(p, q)];
            let left = self.epsilon_closure([p]);
            let right = other.epsilon_closure([q]);
            if self.is_final_configuration(&left) && other.is_final_configuration(&right) {
                finals.push(id);
            }

            for m1 in left.iter().flat_map(|&s| self.moves_from(s)) {
                for m2 in right.iter().flat_map(|&s| other.moves_from(s)) {
                    deadline.check()?;
                    let guard = ba.mk_and(&m1.guard, &m2.guard);
                    if ba.is_satisfiable(&guard) {
                        let to = state_id((m1.to, m2.to), &mut reached, &mut queue);
                        moves.push(SfaMove::input(id, guard, to));
                    }
                }
            }
        }

        let aut = Self::new(moves, 0, finals, ba, deadline)?;
        log_size("intersection", &aut);
        Ok(aut)
    }

    /// A fresh initial state with epsilon moves into both operands.
    pub fn union<A: BooleanAlgebra<Pred = P>>(&self, other: &Self, ba: &A, deadline: &Deadline) -> Result<Self> {
        if self.is_empty && other.is_empty {
            return Ok(Self::empty(ba));
        }

        let offset = self.max_state + 2;
        let initial = other.max_state + offset + 1;
        let mut moves = self.all_moves(0);
        moves.extend(other.all_moves(offset));
        moves.push(SfaMove::epsilon(initial, self.initial));
        moves.push(SfaMove::epsilon(initial, other.initial + offset));

        let finals = self
            .finals
            .iter()
            .copied()
            .chain(other.finals.iter().map(|&s| s + offset));

        let aut = Self::with_options(moves, initial, finals, KEEP_STATES, ba, deadline)?;
        log_size("union", &aut);
        Ok(aut)
    }

    /// Words of `self` not accepted by `other`.
    pub fn difference<A: BooleanAlgebra<Pred = P>>(&self, other: &Self, ba: &A, deadline: &Deadline) -> Result<Self> {
        let complement = other.complement(ba, deadline)?;
        self.intersection(&complement, ba, deadline)
    }

    /// Totalize, then swap final and non-final states.
    pub fn complement<A: BooleanAlgebra<Pred = P>>(&self, ba: &A, deadline: &Deadline) -> Result<Self> {
        let total = self.make_total(ba, deadline)?;
        let finals = total.non_final_states();
        let mut aut = Self::with_options(total.all_moves(0), total.initial, finals, KEEP_STATES, ba, deadline)?;
        aut.is_total = true;
        log_size("complement", &aut);
        Ok(aut)
    }

    /// Every final state of `self` continues into `other` by an epsilon move.
    pub fn concatenate<A: BooleanAlgebra<Pred = P>>(&self, other: &Self, ba: &A, deadline: &Deadline) -> Result<Self> {
        if self.is_empty || other.is_empty {
            return Ok(Self::empty(ba));
        }

        let offset = self.max_state + 1;
        let mut moves = self.all_moves(0);
        moves.extend(other.all_moves(offset));
        for &f in &self.finals {
            moves.push(SfaMove::epsilon(f, other.initial + offset));
        }
        let finals = other.finals.iter().map(|&s| s + offset);

        let aut = Self::with_options(moves, self.initial, finals, KEEP_STATES, ba, deadline)?;
        log_size("concatenate", &aut);
        Ok(aut)
    }

    /// Kleene star: a new accepting initial state, entered again from every
    /// final state.
    pub fn star<A: BooleanAlgebra<Pred = P>>(&self, ba: &A, deadline: &Deadline) -> Result<Self> {
        let initial = self.max_state + 1;
        let mut moves = self.all_moves(0);
        for &f in &self.finals {
            moves.push(SfaMove::epsilon(f, initial));
        }
        moves.push(SfaMove::epsilon(initial, self.initial));

        let aut = Self::with_options(moves, initial, [initial], KEEP_STATES, ba, deadline)?;
        log_size("star", &aut);
        Ok(aut)
    }

    /// Subset construction over epsilon closures.
    pub fn remove_epsilon_moves<A: BooleanAlgebra<Pred = P>>(&self, ba: &A, deadline: &Deadline) -> Result<Self> {
        if self.is_epsilon_free {
            return Ok(self.clone());
        }

        let mut moves = Vec::new();
        let mut reached: HashMap<BTreeSet<StateId>, StateId> = HashMap::new();
        let mut queue = VecDeque::new();
        state_id(self.epsilon_closure([self.initial]), &mut reached, &mut queue);

        while let Some(current) = queue.pop_front() {
            deadline.check()?;
            let id = reached[&current];
            for m in current.iter().flat_map(|&s| self.moves_from(s)) {
                let to = state_id(self.epsilon_closure([m.to]), &mut reached, &mut queue);
                moves.push(SfaMove::input(id, m.guard.clone(), to));
            }
        }

        let finals: Vec<StateId> = reached
            .iter()
            .filter(|(set, _)| self.is_final_configuration(set))
            .map(|(_, &id)| id)
            .collect();

        let aut = Self::with_options(moves, 0, finals, KEEP_STATES, ba, deadline)?;
        log_size("remove_epsilon_moves", &aut);
        Ok(aut)
    }

    /// Determinize if needed, then send the residual guard of every state to
    /// a fresh non-accepting sink.
    pub fn make_total<A: BooleanAlgebra<Pred = P>>(&self, ba: &A, deadline: &Deadline) -> Result<Self> {
        if self.is_total {
            return Ok(self.clone());
        }

        let dfa = self.determinize(ba, deadline)?;
        let sink = dfa.max_state + 1;
        let mut moves = dfa.all_moves(0);
        let mut needs_sink = false;
        for &s in &dfa.states {
            deadline.check()?;
            let residual = dfa
                .moves_from(s)
                .iter()
                .fold(ba.mk_true(), |acc, m| ba.mk_and(&acc, &ba.mk_not(&m.guard)));
            if ba.is_satisfiable(&residual) {
                needs_sink = true;
                moves.push(SfaMove::input(s, residual, sink));
            }
        }
        if needs_sink {
            moves.push(SfaMove::input(sink, ba.mk_true(), sink));
        }

        let mut aut = Self::with_options(moves, dfa.initial, dfa.finals.iter().copied(), KEEP_STATES, ba, deadline)?;
        aut.is_total = true;
        log_size("make_total", &aut);
        Ok(aut)
    }

    /// Collapse moves with the same endpoints into one.
    pub fn normalize<A: BooleanAlgebra<Pred = P>>(&self, ba: &A) -> Self {
        if self.is_empty {
            return Self::empty(ba);
        }
        let mut aut = self.clone().merge_parallel(ba);
        aut.is_deterministic = self.is_deterministic;
        aut.is_total = self.is_total;
        aut
    }

    /// Every move, input and epsilon, with both endpoints shifted by `offset`.
    pub(crate) fn all_moves(&self, offset: StateId) -> Vec<SfaMove<P>> {
        let inputs = self
            .moves()
            .map(|m| SfaMove::input(m.from + offset, m.guard.clone(), m.to + offset));
        let epsilons = self
            .epsilon_moves()
            .map(|(from, to)| SfaMove::epsilon(from + offset, to + offset));
        inputs.chain(epsilons).collect()
    }

    /// Outgoing guards of `s`, grouped by target.
    pub fn guards_by_target(&self, s: StateId) -> BTreeMap<StateId, Vec<&P>> {
        let mut res: BTreeMap<StateId, Vec<&P>> = BTreeMap::new();
        for m in self.moves_from(s) {
            res.entry(m.to).or_default().push(&m.guard);
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::intervals::CharAlgebra;
    use crate::sfa::tests::{chars, contains_b, digits};

    const WORDS: &[&str] = &["", "a", "b", "0", "ab", "ba", "01", "b1", "1b", "abba", "000", "x9b"];

    #[test]
    fn test_intersection_and_union() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let a = contains_b(&ba);
        let b = digits(&ba);
        let both = a.intersection(&b, &ba, &d).unwrap();
        let either = a.union(&b, &ba, &d).unwrap();
        assert!(both.is_empty());
        for w in WORDS {
            let w = chars(w);
            assert_eq!(either.accepts(&w, &ba), a.accepts(&w, &ba) || b.accepts(&w, &ba));
        }
    }

    #[test]
    fn test_complement_flips_membership() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let a = contains_b(&ba);
        let not_a = a.complement(&ba, &d).unwrap();
        assert!(not_a.is_total());
        for w in WORDS {
            let w = chars(w);
            assert_ne!(not_a.accepts(&w, &ba), a.accepts(&w, &ba));
        }
        assert!(Sfa::full(&ba).complement(&ba, &d).unwrap().is_empty());
        let all = Sfa::empty(&ba).complement(&ba, &d).unwrap();
        assert!(all.accepts(&chars("anything"), &ba));
    }

    #[test]
    fn test_difference() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let a = contains_b(&ba);
        let diff = Sfa::full(&ba).difference(&a, &ba, &d).unwrap();
        assert!(diff.accepts(&chars("acd"), &ba));
        assert!(!diff.accepts(&chars("abc"), &ba));
    }

    #[test]
    fn test_concatenate_and_star() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let digit = Sfa::atom(ba.range('0', '9'), &ba, &d).unwrap();
        let letter = Sfa::atom(ba.range('a', 'z'), &ba, &d).unwrap();
        let pair = letter.concatenate(&digit, &ba, &d).unwrap();
        assert!(pair.accepts(&chars("a1"), &ba));
        assert!(!pair.accepts(&chars("1a"), &ba));
        assert!(!pair.accepts(&chars("a"), &ba));

        let pairs = pair.star(&ba, &d).unwrap();
        assert!(pairs.accepts(&chars(""), &ba));
        assert!(pairs.accepts(&chars("a1b2c3"), &ba));
        assert!(!pairs.accepts(&chars("a1b"), &ba));

        let only_empty = Sfa::empty(&ba).star(&ba, &d).unwrap();
        assert!(only_empty.accepts(&chars(""), &ba));
        assert!(!only_empty.accepts(&chars("a"), &ba));
    }

    #[test]
    fn test_remove_epsilon_moves() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let digit = Sfa::atom(ba.range('0', '9'), &ba, &d).unwrap();
        let number = digit.concatenate(&digit.star(&ba, &d).unwrap(), &ba, &d).unwrap();
        let free = number.remove_epsilon_moves(&ba, &d).unwrap();
        assert!(free.is_epsilon_free());
        assert_eq!(free.epsilon_moves().count(), 0);
        for w in ["", "1", "12", "123", "1a", "a"] {
            let w = chars(w);
            assert_eq!(free.accepts(&w, &ba), number.accepts(&w, &ba));
        }
    }

    #[test]
    fn test_make_total() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let total = digits(&ba).make_total(&ba, &d).unwrap();
        assert!(total.is_total());
        assert_eq!(total.state_count(), 2);
        for &s in total.states() {
            let guards: Vec<_> = total.moves_from(s).iter().map(|m| m.guard.clone()).collect();
            let union = ba.mk_or_many(&guards);
            assert!(ba.are_equivalent(&union, &ba.mk_true()));
        }
        assert!(total.accepts(&chars("42"), &ba));
        assert!(!total.accepts(&chars("4a2"), &ba));
    }

    #[test]
    fn test_normalize_keeps_flags() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let total = digits(&ba).make_total(&ba, &d).unwrap();
        let n = total.normalize(&ba);
        assert!(n.is_total());
        assert!(n.is_deterministic());
        assert_eq!(n.guards_by_target(0).len(), 2);
    }
}
