//! Symbolic finite transducers.
//!
//! An [`Sft`] reads words like an [`Sfa`] and, on every move, emits a
//! possibly empty sequence of output terms applied to the symbol just read.
//! Output terms are the functions of a [`FunctionAlgebra`], so composing two
//! transducers only needs substitution of terms and preimages of guards.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::{Debug, Display, Formatter};

use log::{debug, info};

use crate::algebra::FunctionAlgebra;
use crate::deadline::Deadline;
use crate::error::Result;
use crate::sfa::{Sfa, SfaMove};
use crate::StateId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SftMove<P, F> {
    pub from: StateId,
    pub guard: P,
    pub outputs: Vec<F>,
    pub to: StateId,
}

impl<P, F> SftMove<P, F> {
    pub fn new(from: StateId, guard: P, outputs: impl IntoIterator<Item = F>, to: StateId) -> Self {
        Self {
            from,
            guard,
            outputs: outputs.into_iter().collect(),
            to,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sft<P, F> {
    initial: StateId,
    states: BTreeSet<StateId>,
    finals: BTreeSet<StateId>,
    moves_from: BTreeMap<StateId, Vec<SftMove<P, F>>>,
    transition_count: usize,
}

type Pair = (StateId, StateId);

fn pair_id(pair: Pair, reached: &mut HashMap<Pair, StateId>, queue: &mut VecDeque<Pair>) -> StateId {
    if let Some(&id) = reached.get(&pair) {
        return id;
    }
    let id = reached.len() as StateId;
    reached.insert(pair, id);
    queue.push_back(pair);
    id
}

impl<P: Clone + Debug, F: Clone + Debug> Sft<P, F> {
    /// The transducer defined on no input.
    pub fn empty() -> Self {
        Self {
            initial: 0,
            states: BTreeSet::from([0]),
            finals: BTreeSet::new(),
            moves_from: BTreeMap::new(),
            transition_count: 0,
        }
    }

    /// Drops unsatisfiable moves and states that are unreachable or cannot
    /// reach a final state.
    pub fn new<A: FunctionAlgebra<Pred = P, Func = F>>(
        moves: impl IntoIterator<Item = SftMove<P, F>>,
        initial: StateId,
        finals: impl IntoIterator<Item = StateId>,
        ba: &A,
        deadline: &Deadline,
    ) -> Result<Self> {
        let finals: BTreeSet<StateId> = finals.into_iter().collect();
        let mut live_moves = Vec::new();
        for m in moves {
            deadline.check()?;
            if ba.is_satisfiable(&m.guard) {
                live_moves.push(m);
            }
        }

        let mut forward = BTreeSet::from([initial]);
        let mut stack = vec![initial];
        while let Some(s) = stack.pop() {
            for m in live_moves.iter().filter(|m| m.from == s) {
                if forward.insert(m.to) {
                    stack.push(m.to);
                }
            }
        }
        let mut backward: BTreeSet<StateId> = finals.intersection(&forward).copied().collect();
        let mut stack: Vec<StateId> = backward.iter().copied().collect();
        while let Some(s) = stack.pop() {
            for m in live_moves.iter().filter(|m| m.to == s) {
                if forward.contains(&m.from) && backward.insert(m.from) {
                    stack.push(m.from);
                }
            }
        }
        if !backward.contains(&initial) {
            return Ok(Self::empty());
        }

        let mut sft = Self {
            initial,
            states: backward.clone(),
            finals: finals.intersection(&backward).copied().collect(),
            moves_from: BTreeMap::new(),
            transition_count: 0,
        };
        for m in live_moves {
            if backward.contains(&m.from) && backward.contains(&m.to) {
                sft.transition_count += 1;
                sft.moves_from.entry(m.from).or_default().push(m);
            }
        }
        debug!(
            "sft: {} states, {} transitions",
            sft.state_count(),
            sft.transition_count
        );
        Ok(sft)
    }

    /// An output produced on `input`, or `None` if no accepting run reads it.
    pub fn output_on<A: FunctionAlgebra<Pred = P, Func = F>>(&self, input: &[A::Elem], ba: &A) -> Option<Vec<A::Elem>> {
        let mut current: Vec<(StateId, Vec<A::Elem>)> = vec![(self.initial, Vec::new())];
        for symbol in input {
            let mut next: Vec<(StateId, Vec<A::Elem>)> = Vec::new();
            for (s, out) in &current {
                for m in self.moves_from(*s) {
                    if !ba.has_model(&m.guard, symbol) {
                        continue;
                    }
                    let emitted: Option<Vec<A::Elem>> = m.outputs.iter().map(|f| ba.apply(f, symbol)).collect();
                    let Some(emitted) = emitted else {
                        continue;
                    };
                    let mut out = out.clone();
                    out.extend(emitted);
                    let config = (m.to, out);
                    if !next.contains(&config) {
                        next.push(config);
                    }
                }
            }
            current = next;
        }
        current
            .into_iter()
            .find(|(s, _)| self.is_final(*s))
            .map(|(_, out)| out)
    }

    /// The automaton accepting the inputs on which the transducer is defined.
    pub fn domain<A: FunctionAlgebra<Pred = P, Func = F>>(&self, ba: &A, deadline: &Deadline) -> Result<Sfa<P>> {
        let moves = self
            .moves()
            .map(|m| SfaMove::input(m.from, m.guard.clone(), m.to));
        Sfa::new(moves, self.initial, self.finals.iter().copied(), ba, deadline)
    }

    /// The transducer running `self` and feeding its output to `other`.
    ///
    /// A move of `self` emitting `k` terms is paired with every chain of `k`
    /// moves of `other`. Each move of the chain reads one emitted term, so
    /// its guard is pulled back through that term and its outputs are
    /// substituted with it. A move emitting nothing leaves `other` in place.
    pub fn compose<A: FunctionAlgebra<Pred = P, Func = F>>(
        &self,
        other: &Self,
        ba: &A,
        deadline: &Deadline,
    ) -> Result<Self> {
        let mut reached: HashMap<Pair, StateId> = HashMap::new();
        let mut queue: VecDeque<Pair> = VecDeque::new();
        let mut moves = Vec::new();
        let mut finals = Vec::new();
        pair_id((self.initial, other.initial), &mut reached, &mut queue);

        while let Some((p, q)) = queue.pop_front() {
            let id = reached[&(p, q)];
            if self.is_final(p) && other.is_final(q) {
                finals.push(id);
            }
            for t1 in self.moves_from(p) {
                // (terms consumed, state of `other`, guard over the input, outputs)
                let mut stack = vec![(0usize, q, t1.guard.clone(), Vec::new())];
                while let Some((i, r, guard, outputs)) = stack.pop() {
                    deadline.check()?;
                    let Some(f) = t1.outputs.get(i) else {
                        let to = pair_id((t1.to, r), &mut reached, &mut queue);
                        moves.push(SftMove::new(id, guard, outputs, to));
                        continue;
                    };
                    for t2 in other.moves_from(r) {
                        let g = ba.mk_and(&guard, &ba.preimage(f, &t2.guard));
                        if !ba.is_satisfiable(&g) {
                            continue;
                        }
                        let mut out = outputs.clone();
                        out.extend(t2.outputs.iter().map(|h| ba.mk_compose(h, f)));
                        stack.push((i + 1, t2.to, g, out));
                    }
                }
            }
        }
        debug!("compose: {} pairs, {} moves", reached.len(), moves.len());

        Self::new(moves, 0, finals, ba, deadline)
    }

    /// Whether two single-valued transducers are defined on the same inputs
    /// and produce the same output on each of them.
    ///
    /// The domains are compared first. Then the product of the two
    /// transducers is explored, carrying for each pair of states the
    /// constant outputs one side has emitted ahead of the other. A pair
    /// reached with two different delays, or a final pair with a pending
    /// delay, means the outputs differ.
    pub fn is_equivalent_to<A: FunctionAlgebra<Pred = P, Func = F>>(
        &self,
        other: &Self,
        ba: &A,
        deadline: &Deadline,
    ) -> Result<bool> {
        let domains = self.domain(ba, deadline)?;
        if let Some(w) = domains.find_difference(&other.domain(ba, deadline)?, ba, deadline)? {
            debug!("is_equivalent_to: domains differ on {:?}", w);
            return Ok(false);
        }

        // Product moves: (guard, left move, right move, target).
        let start = (self.initial, other.initial);
        let mut edges: HashMap<Pair, Vec<(P, &SftMove<P, F>, &SftMove<P, F>, Pair)>> = HashMap::new();
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some((p, q)) = queue.pop_front() {
            deadline.check()?;
            let mut out = Vec::new();
            for t1 in self.moves_from(p) {
                for t2 in other.moves_from(q) {
                    let guard = ba.mk_and(&t1.guard, &t2.guard);
                    if !ba.is_satisfiable(&guard) {
                        continue;
                    }
                    let to = (t1.to, t2.to);
                    if seen.insert(to) {
                        queue.push_back(to);
                    }
                    out.push((guard, t1, t2, to));
                }
            }
            edges.insert((p, q), out);
        }

        let accepting = |&(p, q): &Pair| self.is_final(p) && other.is_final(q);
        let mut into: HashMap<Pair, Vec<Pair>> = HashMap::new();
        for (&from, out) in &edges {
            for (_, _, _, to) in out {
                into.entry(*to).or_default().push(from);
            }
        }
        let mut live: HashSet<Pair> = seen.iter().copied().filter(accepting).collect();
        let mut stack: Vec<Pair> = live.iter().copied().collect();
        while let Some(pair) = stack.pop() {
            for &from in into.get(&pair).into_iter().flatten() {
                if live.insert(from) {
                    stack.push(from);
                }
            }
        }

        // Constant outputs emitted ahead by the left and by the right side;
        // at most one of the two is non-empty.
        let mut delays: HashMap<Pair, (Vec<A::Elem>, Vec<A::Elem>)> = HashMap::from([(start, (Vec::new(), Vec::new()))]);
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            deadline.check()?;
            let (ahead_l, ahead_r) = delays[&current].clone();
            if accepting(&current) && !(ahead_l.is_empty() && ahead_r.is_empty()) {
                debug!("is_equivalent_to: pending output {:?} / {:?} at {:?}", ahead_l, ahead_r, current);
                return Ok(false);
            }

            for (guard, t1, t2, to) in &edges[&current] {
                if !live.contains(to) {
                    continue;
                }
                let u: Vec<F> = ahead_l.iter().map(|c| ba.mk_const(c)).chain(t1.outputs.iter().cloned()).collect();
                let v: Vec<F> = ahead_r.iter().map(|c| ba.mk_const(c)).chain(t2.outputs.iter().cloned()).collect();
                let n = u.len().min(v.len());
                if (0..n).any(|i| !ba.agree_on(&u[i], &v[i], guard)) {
                    debug!("is_equivalent_to: outputs differ between {:?} and {:?}", current, to);
                    return Ok(false);
                }

                let Some(x) = ba.generate_witness(guard) else {
                    continue;
                };
                let tail = if u.len() > n { &u[n..] } else { &v[n..] };
                let mut constants = Vec::with_capacity(tail.len());
                for f in tail {
                    let c = match ba.apply(f, &x) {
                        Some(c) if ba.agree_on(f, &ba.mk_const(&c), guard) => c,
                        _ => {
                            debug!("is_equivalent_to: output {:?} is not constant on {:?}", f, guard);
                            return Ok(false);
                        }
                    };
                    constants.push(c);
                }
                let delay = if u.len() > n {
                    (constants, Vec::new())
                } else {
                    (Vec::new(), constants)
                };

                match delays.get(to) {
                    Some(known) if *known != delay => {
                        debug!("is_equivalent_to: two delays at {:?}", to);
                        return Ok(false);
                    }
                    Some(_) => {}
                    None => {
                        delays.insert(*to, delay);
                        queue.push_back(*to);
                    }
                }
            }
        }

        info!("is_equivalent_to: equivalent, {} product states", delays.len());
        Ok(true)
    }
}

impl<P, F> Sft<P, F> {
    pub fn initial_state(&self) -> StateId {
        self.initial
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

    pub fn moves(&self) -> impl Iterator<Item = &SftMove<P, F>> {
        self.moves_from.values().flatten()
    }

    pub fn moves_from(&self, s: StateId) -> &[SftMove<P, F>] {
        self.moves_from.get(&s).map_or(&[], |v| v.as_slice())
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transition_count
    }
}

impl<P: Display, F: Display> Display for Sft<P, F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "initial: {}", self.initial)?;
        writeln!(f, "finals: {:?}", self.finals)?;
        for m in self.moves() {
            write!(f, "{} -{}/[", m.from, m.guard)?;
            for (i, out) in m.outputs.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", out)?;
            }
            writeln!(f, "]-> {}", m.to)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::algebra::BooleanAlgebra;
    use crate::intervals::{CharAlgebra, Ranges, Term};

    type CharSft = Sft<Ranges, Term>;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    /// Copies its input, dropping every `'0'`.
    fn delete_zeros(ba: &CharAlgebra) -> CharSft {
        let zero = ba.mk_atom(&'0');
        Sft::new(
            [
                SftMove::new(0, zero.clone(), [], 0),
                SftMove::new(0, ba.mk_not(&zero), [Term::IDENTITY], 0),
            ],
            0,
            [0],
            ba,
            &Deadline::unlimited(),
        )
        .unwrap()
    }

    /// Turns ASCII lowercase into uppercase and back.
    fn swap_case(ba: &CharAlgebra) -> CharSft {
        let lower = ba.range('a', 'z');
        let upper = ba.range('A', 'Z');
        let other = ba.mk_not(&ba.mk_or(&lower, &upper));
        Sft::new(
            [
                SftMove::new(0, lower, [Term::Offset(-32)], 0),
                SftMove::new(0, upper, [Term::Offset(32)], 0),
                SftMove::new(0, other, [Term::IDENTITY], 0),
            ],
            0,
            [0],
            ba,
            &Deadline::unlimited(),
        )
        .unwrap()
    }

    fn identity(ba: &CharAlgebra) -> CharSft {
        Sft::new(
            [SftMove::new(0, ba.mk_true(), [Term::IDENTITY], 0)],
            0,
            [0],
            ba,
            &Deadline::unlimited(),
        )
        .unwrap()
    }

    #[test]
    fn test_output_on() {
        let ba = CharAlgebra::new();
        assert_eq!(delete_zeros(&ba).output_on(&chars("a0b00"), &ba), Some(chars("ab")));
        assert_eq!(swap_case(&ba).output_on(&chars("aB1"), &ba), Some(chars("Ab1")));
        assert_eq!(swap_case(&ba).output_on(&chars(""), &ba), Some(chars("")));
        let empty: CharSft = Sft::empty();
        assert_eq!(empty.output_on(&chars(""), &ba), None);
    }

    #[test]
    fn test_unsatisfiable_moves_and_dead_states_are_dropped() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let sft = Sft::new(
            [
                SftMove::new(0, ba.mk_false(), [Term::IDENTITY], 1),
                SftMove::new(0, ba.range('a', 'a'), [Term::IDENTITY], 2),
                SftMove::new(0, ba.range('b', 'b'), [Term::IDENTITY], 3),
            ],
            0,
            [1, 2],
            &ba,
            &d,
        )
        .unwrap();
        assert_eq!(sft.transition_count(), 1);
        assert_eq!(sft.states(), &BTreeSet::from([0, 2]));
        assert_eq!(sft.final_states(), &BTreeSet::from([2]));
    }

    #[test]
    fn test_domain() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let digits_only: CharSft = Sft::new(
            [SftMove::new(0, ba.range('0', '9'), [Term::IDENTITY], 0)],
            0,
            [0],
            &ba,
            &d,
        )
        .unwrap();
        let domain = digits_only.domain(&ba, &d).unwrap();
        assert!(domain.accepts(&chars("42"), &ba));
        assert!(!domain.accepts(&chars("4a"), &ba));
        assert!(!digits_only.is_equivalent_to(&identity(&ba), &ba, &d).unwrap());
    }

    #[test]
    fn test_compose_chains_through_several_outputs() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let double: CharSft = Sft::new(
            [SftMove::new(0, ba.mk_true(), [Term::IDENTITY, Term::IDENTITY], 0)],
            0,
            [0],
            &ba,
            &d,
        )
        .unwrap();
        let composed = double.compose(&swap_case(&ba), &ba, &d).unwrap();
        assert_eq!(composed.output_on(&chars("aB0"), &ba), Some(chars("AAbb00")));
        let composed = double.compose(&delete_zeros(&ba), &ba, &d).unwrap();
        assert_eq!(composed.output_on(&chars("a0"), &ba), Some(chars("aa")));
    }

    #[test]
    fn test_delete_zeros_is_idempotent() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let once = delete_zeros(&ba);
        let mut composed = once.clone();
        for _ in 1..10 {
            composed = composed.compose(&once, &ba, &d).unwrap();
            assert!(composed.is_equivalent_to(&once, &ba, &d).unwrap());
        }
        assert_eq!(composed.output_on(&chars("10203"), &ba), Some(chars("123")));
    }

    #[test]
    fn test_swap_case_and_delete_zeros_commute() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let (swap, delete) = (swap_case(&ba), delete_zeros(&ba));
        let a = swap.compose(&delete, &ba, &d).unwrap();
        let b = delete.compose(&swap, &ba, &d).unwrap();
        assert!(a.is_equivalent_to(&b, &ba, &d).unwrap());
        assert_eq!(a.output_on(&chars("a0Z"), &ba), Some(chars("Az")));

        let twice = swap.compose(&swap, &ba, &d).unwrap();
        assert!(twice.is_equivalent_to(&identity(&ba), &ba, &d).unwrap());
    }

    #[test]
    fn test_different_outputs_are_told_apart() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let id = identity(&ba);
        assert!(!swap_case(&ba).is_equivalent_to(&id, &ba, &d).unwrap());
        assert!(!delete_zeros(&ba).is_equivalent_to(&id, &ba, &d).unwrap());
        assert!(id.is_equivalent_to(&id, &ba, &d).unwrap());
    }

    #[test]
    fn test_delayed_outputs() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let (a, b) = (ba.mk_atom(&'a'), ba.mk_atom(&'b'));
        // Only "ab" is read; both emit "ab", the second one a step late.
        let eager: CharSft = Sft::new(
            [
                SftMove::new(0, a.clone(), [Term::IDENTITY], 1),
                SftMove::new(1, b.clone(), [Term::IDENTITY], 2),
            ],
            0,
            [2],
            &ba,
            &d,
        )
        .unwrap();
        let late = |first: char| -> CharSft {
            Sft::new(
                [
                    SftMove::new(0, a.clone(), [], 1),
                    SftMove::new(1, b.clone(), [ba.mk_const(&first), Term::IDENTITY], 2),
                ],
                0,
                [2],
                &ba,
                &d,
            )
            .unwrap()
        };
        assert!(eager.is_equivalent_to(&late('a'), &ba, &d).unwrap());
        assert!(late('a').is_equivalent_to(&eager, &ba, &d).unwrap());
        assert!(!eager.is_equivalent_to(&late('c'), &ba, &d).unwrap());
    }
}
