use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Debug;

use log::debug;

use crate::algebra::BooleanAlgebra;
use crate::deadline::Deadline;
use crate::error::Result;
use crate::StateId;

use super::Sfa;

type Pair = (StateId, StateId);

impl<P: Clone + Debug> Sfa<P> {
    /// A word with two distinct accepting runs, or `None` if the automaton
    /// is unambiguous.
    ///
    /// Runs are those of the epsilon-free automaton with parallel moves
    /// merged, so two runs differ exactly when they visit different states.
    /// The automaton is paired with itself: an accepted word is ambiguous iff
    /// its pair of runs passes through a pair of distinct states from which
    /// both runs can still accept.
    pub fn ambiguous_input<A: BooleanAlgebra<Pred = P>>(
        &self,
        ba: &A,
        deadline: &Deadline,
    ) -> Result<Option<Vec<A::Elem>>> {
        let aut = self.remove_epsilon_moves(ba, deadline)?.normalize(ba);
        if aut.is_empty() {
            return Ok(None);
        }

        let start = (aut.initial, aut.initial);
        let mut edges: HashMap<Pair, Vec<(A::Elem, Pair)>> = HashMap::new();
        let mut parent: HashMap<Pair, Option<(Pair, A::Elem)>> = HashMap::from([(start, None)]);
        let mut order: Vec<Pair> = Vec::new();
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            deadline.check()?;
            order.push(current);
            let mut out = Vec::new();
            for a in aut.moves_from(current.0) {
                for b in aut.moves_from(current.1) {
                    let Some(symbol) = ba.generate_witness(&ba.mk_and(&a.guard, &b.guard)) else {
                        continue;
                    };
                    let next = (a.to, b.to);
                    if !parent.contains_key(&next) {
                        parent.insert(next, Some((current, symbol.clone())));
                        queue.push_back(next);
                    }
                    out.push((symbol, next));
                }
            }
            edges.insert(current, out);
        }

        // Pairs from which both runs can accept.
        let mut into: HashMap<Pair, Vec<Pair>> = HashMap::new();
        for (&from, out) in &edges {
            for (_, to) in out {
                into.entry(*to).or_default().push(from);
            }
        }
        let accepting = |&(p, q): &Pair| aut.is_final(p) && aut.is_final(q);
        let mut live: HashSet<Pair> = order.iter().copied().filter(accepting).collect();
        let mut stack: Vec<Pair> = live.iter().copied().collect();
        while let Some(pair) = stack.pop() {
            for &from in into.get(&pair).into_iter().flatten() {
                if live.insert(from) {
                    stack.push(from);
                }
            }
        }

        let Some(&split) = order.iter().find(|&&(p, q)| p != q && live.contains(&(p, q))) else {
            debug!("ambiguous_input: unambiguous, {} pairs", order.len());
            return Ok(None);
        };

        let mut word = Vec::new();
        let mut cur = split;
        while let Some(Some((prev, symbol))) = parent.get(&cur) {
            word.push(symbol.clone());
            cur = *prev;
        }
        word.reverse();

        // Shortest way on from the split to a pair of accepting states.
        let mut back: HashMap<Pair, Option<(Pair, A::Elem)>> = HashMap::from([(split, None)]);
        let mut queue = VecDeque::from([split]);
        while let Some(current) = queue.pop_front() {
            deadline.check()?;
            if accepting(&current) {
                let mut suffix = Vec::new();
                let mut cur = current;
                while let Some(Some((prev, symbol))) = back.get(&cur) {
                    suffix.push(symbol.clone());
                    cur = *prev;
                }
                suffix.reverse();
                word.extend(suffix);
                debug!("ambiguous_input: runs split at {:?}, word of length {}", split, word.len());
                return Ok(Some(word));
            }
            for (symbol, next) in &edges[&current] {
                if live.contains(next) && !back.contains_key(next) {
                    back.insert(*next, Some((current, symbol.clone())));
                    queue.push_back(*next);
                }
            }
        }
        Ok(None)
    }
}
