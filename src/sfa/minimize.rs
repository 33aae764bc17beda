use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use log::debug;

use crate::algebra::BooleanAlgebra;
use crate::deadline::Deadline;
use crate::error::Result;
use crate::StateId;

use super::{log_size, Sfa, SfaMove, SfaOptions};

impl<P: Clone + Debug> Sfa<P> {
    /// Partition refinement on the total deterministic automaton.
    ///
    /// Blocks start as final / non-final. A block is split by the minterms
    /// of the guards leaving its states: two states stay together only if
    /// every cell leads both of them into the same block. The fixpoint is the
    /// coarsest language-preserving partition.
    pub fn minimize<A: BooleanAlgebra<Pred = P>>(&self, ba: &A, deadline: &Deadline) -> Result<Self> {
        if self.is_empty {
            return Ok(Self::empty(ba));
        }

        let dfa = self.determinize(ba, deadline)?.make_total(ba, deadline)?;

        let mut block_of: BTreeMap<StateId, usize> = dfa
            .states
            .iter()
            .map(|&s| (s, usize::from(!dfa.is_final(s))))
            .collect();
        let mut rounds = 0;

        loop {
            rounds += 1;
            let mut blocks: BTreeMap<usize, Vec<StateId>> = BTreeMap::new();
            for (&s, &b) in &block_of {
                blocks.entry(b).or_default().push(s);
            }

            let mut refined: BTreeMap<StateId, usize> = BTreeMap::new();
            let mut split = false;
            for members in blocks.values() {
                deadline.check()?;
                let outgoing: Vec<_> = members.iter().flat_map(|&s| dfa.moves_from(s)).collect();
                let guards: Vec<P> = outgoing.iter().map(|m| m.guard.clone()).collect();
                let cells = ba.minterms(&guards, deadline)?;

                let mut groups: BTreeMap<Vec<usize>, Vec<StateId>> = BTreeMap::new();
                for &s in members {
                    let signature = cells
                        .iter()
                        .map(|cell| {
                            cell.ones()
                                .map(|i| outgoing[i])
                                .find(|m| m.from == s)
                                .map_or(usize::MAX, |m| block_of[&m.to])
                        })
                        .collect();
                    groups.entry(signature).or_default().push(s);
                }

                split |= groups.len() > 1;
                for group in groups.into_values() {
                    let id = refined.len();
                    for s in group {
                        refined.insert(s, id);
                    }
                }
            }

            // Renumber so that block ids are dense.
            let mut dense: BTreeMap<usize, usize> = BTreeMap::new();
            for b in refined.values_mut() {
                let next = dense.len();
                *b = *dense.entry(*b).or_insert(next);
            }
            block_of = refined;
            if !split {
                break;
            }
        }

        let mut representative: BTreeMap<usize, StateId> = BTreeMap::new();
        for (&s, &b) in &block_of {
            representative.entry(b).or_insert(s);
        }
        let finals: BTreeSet<StateId> = dfa
            .finals
            .iter()
            .map(|s| block_of[s] as StateId)
            .collect();
        let moves: Vec<SfaMove<P>> = representative
            .iter()
            .flat_map(|(&b, &s)| {
                dfa.moves_from(s)
                    .iter()
                    .map(|m| SfaMove::input(b as StateId, m.guard.clone(), block_of[&m.to] as StateId))
                    .collect::<Vec<_>>()
            })
            .collect();
        debug!("minimize: {} rounds, {} blocks", rounds, representative.len());

        let options = SfaOptions {
            normalize: true,
            prune: false,
        };
        let initial = block_of[&dfa.initial] as StateId;
        let mut min = Self::with_options(moves, initial, finals, options, ba, deadline)?;
        min.is_deterministic = true;
        min.is_total = true;
        log_size("minimize", &min);
        Ok(min)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::intervals::CharAlgebra;
    use crate::sfa::tests::{chars, contains_b};

    #[test]
    fn test_minimize_merges_equivalent_states() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        // Two copies of the "seen b" state.
        let aut = Sfa::new(
            [
                SfaMove::input(0, ba.mk_not(&ba.range('b', 'b')), 0),
                SfaMove::input(0, ba.range('b', 'b'), 1),
                SfaMove::input(1, ba.range('a', 'm'), 2),
                SfaMove::input(1, ba.mk_not(&ba.range('a', 'm')), 1),
                SfaMove::input(2, ba.mk_true(), 1),
            ],
            0,
            [1, 2],
            &ba,
            &d,
        )
        .unwrap();
        let min = aut.minimize(&ba, &d).unwrap();
        assert_eq!(min.state_count(), 2);
        for w in ["", "b", "ab", "bab", "aaa", "bz"] {
            let w = chars(w);
            assert_eq!(min.accepts(&w, &ba), aut.accepts(&w, &ba));
        }
    }

    #[test]
    fn test_minimize_is_idempotent() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let a = contains_b(&ba);
        let digit = Sfa::atom(ba.range('0', '9'), &ba, &d).unwrap();
        let aut = a.concatenate(&digit, &ba, &d).unwrap().star(&ba, &d).unwrap();
        let once = aut.minimize(&ba, &d).unwrap();
        let twice = once.minimize(&ba, &d).unwrap();
        assert_eq!(once.state_count(), twice.state_count());
        assert!(once.is_equivalent_to(&aut, &ba, &d).unwrap());
    }

    #[test]
    fn test_minimize_keeps_sink() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let digit = Sfa::atom(ba.range('0', '9'), &ba, &d).unwrap();
        let min = digit.minimize(&ba, &d).unwrap();
        // start, accept, sink
        assert_eq!(min.state_count(), 3);
        assert!(min.is_total());
    }
}
