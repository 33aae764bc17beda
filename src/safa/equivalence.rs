//! Language equivalence of alternating automata.
//!
//! [`Safa::is_equivalent`] explores pairs of configurations of the two
//! automata, both read on the same words. A pair whose formulas disagree on
//! acceptance yields the word leading to it as a counterexample. A pair
//! already implied by the recorded pairs under Boolean congruence is skipped,
//! which cuts the search down to finitely many classes.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap, VecDeque};
use std::fmt::Debug;

use log::{debug, info};

use crate::algebra::BooleanAlgebra;
use crate::congruence::CongruenceRelation;
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::formula::ExprFactory;
use crate::sfa::{Sfa, SfaMove};
use crate::StateId;

use super::Safa;

/// A pair waiting to be expanded. Smaller formulas and shorter words first.
struct Pending<E, S> {
    size: usize,
    seq: usize,
    left: E,
    right: E,
    word: Vec<S>,
}

impl<E, S> Pending<E, S> {
    fn key(&self) -> (usize, usize, usize) {
        (self.size, self.word.len(), self.seq)
    }
}

impl<E, S> PartialEq for Pending<E, S> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<E, S> Eq for Pending<E, S> {}

impl<E, S> PartialOrd for Pending<E, S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E, S> Ord for Pending<E, S> {
    // Reversed: `BinaryHeap` is a max-heap.
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

impl<P: Clone + Debug> Safa<P> {
    /// Successor of the configuration `e` on `symbol`, accumulating into
    /// `implicant` the Boolean combination of guards that selects the same
    /// moves as `symbol`.
    fn step<A, F>(&self, e: &F::Elem, symbol: &A::Elem, implicant: &mut P, factory: &mut F, ba: &A) -> F::Elem
    where
        A: BooleanAlgebra<Pred = P>,
        F: ExprFactory,
    {
        let mut successor: HashMap<StateId, F::Elem> = HashMap::new();
        for s in factory.states(e) {
            let mut succ = factory.bottom();
            for m in self.moves_from(s) {
                if ba.has_model(&m.guard, symbol) {
                    let to = factory.coerce(&m.to);
                    succ = factory.or(succ, to);
                    *implicant = ba.mk_and(implicant, &m.guard);
                } else {
                    *implicant = ba.mk_and(implicant, &ba.mk_not(&m.guard));
                }
            }
            successor.insert(s, succ);
        }
        let bottom = factory.bottom();
        factory.substitute(e, &mut |s| successor.get(&s).cloned().unwrap_or_else(|| bottom.clone()))
    }

    /// Bisimulation up to congruence.
    ///
    /// Returns `None` if both automata accept the same language, otherwise a
    /// word accepted by exactly one of them. Formulas are represented through
    /// `factory`, and `relation` records the pairs assumed equivalent. The
    /// relation is cleared on entry; after the call it holds the pairs of this
    /// check only.
    ///
    /// The symbols of each pair are enumerated lazily: a witness of the
    /// remaining guard selects one set of enabled moves, the conjunction of
    /// the guards it satisfies and the negations of those it does not is
    /// removed from the remaining guard, and so on until nothing is left.
    pub fn is_equivalent<A, F, R>(
        left: &Self,
        right: &Self,
        factory: &mut F,
        relation: &mut R,
        ba: &A,
        deadline: &Deadline,
    ) -> Result<Option<Vec<A::Elem>>>
    where
        A: BooleanAlgebra<Pred = P>,
        F: ExprFactory,
        R: CongruenceRelation,
    {
        relation.clear();
        let l0 = factory.coerce(left.initial());
        let r0 = factory.coerce(right.initial());
        if factory.has_model(&l0, &left.finals) != factory.has_model(&r0, &right.finals) {
            return Ok(Some(Vec::new()));
        }
        if !relation.add(&*factory, &l0, &r0, deadline)? {
            return Err(Error::Contradiction(
                "initial pair made the relation unsatisfiable".to_string(),
            ));
        }

        let mut worklist = BinaryHeap::new();
        let mut seq = 0;
        worklist.push(Pending {
            size: factory.size(&l0) + factory.size(&r0),
            seq,
            left: l0,
            right: r0,
            word: Vec::new(),
        });

        let mut expanded = 0usize;
        while let Some(pair) = worklist.pop() {
            deadline.check()?;
            expanded += 1;

            let mut remaining = ba.mk_true();
            while let Some(symbol) = ba.generate_witness(&remaining) {
                deadline.check()?;
                let mut implicant = ba.mk_true();
                let l = left.step(&pair.left, &symbol, &mut implicant, factory, ba);
                let r = right.step(&pair.right, &symbol, &mut implicant, factory, ba);

                let mut word = pair.word.clone();
                word.push(symbol);

                if factory.has_model(&l, &left.finals) != factory.has_model(&r, &right.finals) {
                    info!(
                        "is_equivalent: counterexample of length {} after {} pairs",
                        word.len(),
                        expanded
                    );
                    return Ok(Some(word));
                }

                if !relation.is_member(&*factory, &l, &r, deadline)? {
                    // Every recorded pair agrees on acceptance, so the
                    // valuation "state is final" satisfies all of them.
                    if !relation.add(&*factory, &l, &r, deadline)? {
                        return Err(Error::Contradiction(format!(
                            "pair reached by {:?} made the relation unsatisfiable",
                            word
                        )));
                    }
                    seq += 1;
                    debug!("is_equivalent: new pair #{} at depth {}", seq, word.len());
                    worklist.push(Pending {
                        size: factory.size(&l) + factory.size(&r),
                        seq,
                        left: l,
                        right: r,
                        word,
                    });
                }

                remaining = ba.mk_and(&remaining, &ba.mk_not(&implicant));
                if !ba.is_satisfiable(&remaining) {
                    break;
                }
            }
        }

        info!(
            "is_equivalent: equivalent, {} pairs expanded, {} recorded",
            expanded,
            relation.len()
        );
        Ok(None)
    }

    /// Whether the automaton accepts no word.
    pub fn is_empty<A, F, R>(&self, factory: &mut F, relation: &mut R, ba: &A, deadline: &Deadline) -> Result<bool>
    where
        A: BooleanAlgebra<Pred = P>,
        F: ExprFactory,
        R: CongruenceRelation,
    {
        let empty = Self::empty();
        Ok(Self::is_equivalent(self, &empty, factory, relation, ba, deadline)?.is_none())
    }

    /// Deterministic automaton for the reversed language.
    ///
    /// Its states are sets of states of `self`, starting from the final ones.
    /// Reading a symbol moves to the set of states having an enabled move
    /// whose target the current set satisfies. A set is accepting when it
    /// satisfies the initial formula.
    pub fn reverse<A: BooleanAlgebra<Pred = P>>(&self, ba: &A, deadline: &Deadline) -> Result<Sfa<P>> {
        let mut moves = Vec::new();
        let mut finals = Vec::new();
        let mut reached: HashMap<BTreeSet<StateId>, StateId> = HashMap::new();
        let mut queue: VecDeque<BTreeSet<StateId>> = VecDeque::new();
        reached.insert(self.finals.clone(), 0);
        queue.push_back(self.finals.clone());

        while let Some(current) = queue.pop_front() {
            deadline.check()?;
            let id = reached[&current];
            if self.initial.has_model(&current) {
                finals.push(id);
            }

            let into: Vec<_> = self.moves().filter(|m| m.to.has_model(&current)).collect();
            let guards: Vec<P> = into.iter().map(|m| m.guard.clone()).collect();
            for cell in ba.minterms(&guards, deadline)? {
                let sources: BTreeSet<StateId> = cell.ones().map(|i| into[i].from).collect();
                if sources.is_empty() {
                    continue;
                }
                let to = match reached.get(&sources) {
                    Some(&to) => to,
                    None => {
                        let to = reached.len() as StateId;
                        reached.insert(sources.clone(), to);
                        queue.push_back(sources);
                        to
                    }
                };
                moves.push(SfaMove::input(id, cell.guard, to));
            }
        }
        debug!("reverse: {} subsets", reached.len());

        Sfa::new(moves, 0, finals, ba, deadline)
    }

    /// Compare two automata through the deterministic automata of their
    /// reversed languages. Returns a word accepted by exactly one of them.
    pub fn is_reverse_equivalent<A: BooleanAlgebra<Pred = P>>(
        left: &Self,
        right: &Self,
        ba: &A,
        deadline: &Deadline,
    ) -> Result<Option<Vec<A::Elem>>> {
        let l = left.reverse(ba, deadline)?;
        let r = right.reverse(ba, deadline)?;
        Ok(l.find_difference(&r, ba, deadline)?.map(|mut w| {
            w.reverse();
            w
        }))
    }
}
