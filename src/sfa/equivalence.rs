use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt::Debug;

use log::{debug, info};

use crate::algebra::BooleanAlgebra;
use crate::deadline::Deadline;
use crate::error::Result;
use crate::StateId;

use super::Sfa;

/// Disjoint sets over subset ids, with path compression.
struct Classes {
    parent: Vec<usize>,
}

impl Classes {
    fn push(&mut self) -> usize {
        let id = self.parent.len();
        self.parent.push(id);
        id
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            let root = self.find(self.parent[x]);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    /// Returns `false` if both were already in the same class.
    fn union(&mut self, x: usize, y: usize) -> bool {
        let (rx, ry) = (self.find(x), self.find(y));
        if rx == ry {
            return false;
        }
        self.parent[ry] = rx;
        true
    }
}

/// Subsets of one automaton's states reached by the lazy subset construction.
struct Subsets {
    ids: HashMap<BTreeSet<StateId>, usize>,
}

impl Subsets {
    /// Id of `set` in `classes`, allocated on first sight.
    fn id(&mut self, set: &BTreeSet<StateId>, classes: &mut Classes) -> usize {
        if let Some(&id) = self.ids.get(set) {
            return id;
        }
        let id = classes.push();
        self.ids.insert(set.clone(), id);
        id
    }
}

impl<P: Clone + Debug> Sfa<P> {
    /// A word accepted by exactly one of the two automata, or `None` if they
    /// accept the same language.
    ///
    /// Each side of the symmetric difference is searched separately, so the
    /// word returned is a shortest word in `self \ other` if that language
    /// is non-empty.
    pub fn find_difference<A: BooleanAlgebra<Pred = P>>(
        &self,
        other: &Self,
        ba: &A,
        deadline: &Deadline,
    ) -> Result<Option<Vec<A::Elem>>> {
        let left = self.difference(other, ba, deadline)?;
        if let Some(w) = left.witness(ba, deadline)? {
            debug!("find_difference: accepted only by the left automaton: {:?}", w);
            return Ok(Some(w));
        }
        let right = other.difference(self, ba, deadline)?;
        let w = right.witness(ba, deadline)?;
        if let Some(w) = &w {
            debug!("find_difference: accepted only by the right automaton: {:?}", w);
        }
        Ok(w)
    }

    pub fn is_equivalent_to<A: BooleanAlgebra<Pred = P>>(
        &self,
        other: &Self,
        ba: &A,
        deadline: &Deadline,
    ) -> Result<bool> {
        Ok(self.find_difference(other, ba, deadline)?.is_none())
    }

    /// Hopcroft-Karp equivalence of two possibly nondeterministic automata.
    ///
    /// Both sides are determinized lazily: a pair of state sets is expanded
    /// over the minterms of the guards leaving either set, and the two
    /// successor sets are merged into one class unless they already share
    /// one. Two sets merged with different acceptance give a counterexample.
    /// Returns `None` if the automata accept the same language.
    ///
    /// Unlike [`Sfa::find_difference`], the word returned is not necessarily
    /// a shortest one.
    pub fn hopcroft_karp_difference<A: BooleanAlgebra<Pred = P>>(
        &self,
        other: &Self,
        ba: &A,
        deadline: &Deadline,
    ) -> Result<Option<Vec<A::Elem>>> {
        let left = self.remove_epsilon_moves(ba, deadline)?;
        let right = other.remove_epsilon_moves(ba, deadline)?;

        let l0 = BTreeSet::from([left.initial]);
        let r0 = BTreeSet::from([right.initial]);
        if left.is_final_configuration(&l0) != right.is_final_configuration(&r0) {
            return Ok(Some(Vec::new()));
        }

        let mut classes = Classes { parent: Vec::new() };
        let mut lefts = Subsets { ids: HashMap::new() };
        let mut rights = Subsets { ids: HashMap::new() };
        let li = lefts.id(&l0, &mut classes);
        let ri = rights.id(&r0, &mut classes);
        classes.union(li, ri);

        let mut queue = VecDeque::from([(l0, r0, Vec::new())]);
        let mut expanded = 0usize;
        while let Some((ls, rs, word)) = queue.pop_front() {
            deadline.check()?;
            expanded += 1;

            let l_moves: Vec<_> = ls.iter().flat_map(|&s| left.moves_from(s)).collect();
            let r_moves: Vec<_> = rs.iter().flat_map(|&s| right.moves_from(s)).collect();
            let guards: Vec<P> = l_moves
                .iter()
                .chain(&r_moves)
                .map(|m| m.guard.clone())
                .collect();

            for cell in ba.minterms(&guards, deadline)? {
                let Some(symbol) = ba.generate_witness(&cell.guard) else {
                    continue;
                };
                let mut lt = BTreeSet::new();
                let mut rt = BTreeSet::new();
                for i in cell.ones() {
                    match l_moves.get(i) {
                        Some(m) => lt.insert(m.to),
                        None => rt.insert(r_moves[i - l_moves.len()].to),
                    };
                }

                let lid = lefts.id(&lt, &mut classes);
                let rid = rights.id(&rt, &mut classes);
                if classes.find(lid) == classes.find(rid) {
                    continue;
                }

                let mut next = word.clone();
                next.push(symbol);
                if left.is_final_configuration(&lt) != right.is_final_configuration(&rt) {
                    info!(
                        "hopcroft_karp_difference: counterexample of length {} after {} pairs",
                        next.len(),
                        expanded
                    );
                    return Ok(Some(next));
                }
                classes.union(lid, rid);
                queue.push_back((lt, rt, next));
            }
        }

        debug!(
            "hopcroft_karp_difference: equivalent, {} pairs, {} + {} subsets",
            expanded,
            lefts.ids.len(),
            rights.ids.len()
        );
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use test_log::test;

    use super::*;
    use crate::error::Error;
    use crate::intervals::CharAlgebra;
    use crate::sfa::tests::{chars, contains_b, digits};
    use crate::sfa::SfaMove;

    #[test]
    fn test_find_difference() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let a = contains_b(&ba);
        let b = digits(&ba);
        let w = a.find_difference(&b, &ba, &d).unwrap().unwrap();
        assert_ne!(a.accepts(&w, &ba), b.accepts(&w, &ba));
        assert_eq!(w, chars("b"));
        let w = b.find_difference(&a, &ba, &d).unwrap().unwrap();
        assert_eq!(w, chars(""));
    }

    #[test]
    fn test_equivalent_up_to_structure() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let a = contains_b(&ba);
        // Same language, with the "seen b" state split in two.
        let b = Sfa::new(
            [
                SfaMove::input(0, ba.mk_not(&ba.range('b', 'b')), 0),
                SfaMove::input(0, ba.range('b', 'b'), 1),
                SfaMove::input(1, ba.range('0', '9'), 2),
                SfaMove::input(1, ba.mk_not(&ba.range('0', '9')), 1),
                SfaMove::input(2, ba.mk_true(), 2),
            ],
            0,
            [1, 2],
            &ba,
            &d,
        )
        .unwrap();
        assert!(a.is_equivalent_to(&b, &ba, &d).unwrap());
        assert!(b.is_equivalent_to(&a, &ba, &d).unwrap());
        assert!(!a.is_equivalent_to(&Sfa::full(&ba), &ba, &d).unwrap());
    }

    #[test]
    fn test_hopcroft_karp_agrees_with_products() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        // Contains a `b`, guessing nondeterministically where it is.
        let guessing = Sfa::new(
            [
                SfaMove::input(0, ba.mk_true(), 0),
                SfaMove::input(0, ba.range('b', 'b'), 1),
                SfaMove::input(1, ba.mk_true(), 1),
            ],
            0,
            [1],
            &ba,
            &d,
        )
        .unwrap();
        assert!(!guessing.is_deterministic());
        assert_eq!(guessing.hopcroft_karp_difference(&contains_b(&ba), &ba, &d).unwrap(), None);
        assert_eq!(contains_b(&ba).hopcroft_karp_difference(&guessing, &ba, &d).unwrap(), None);

        for other in [digits(&ba), Sfa::full(&ba), Sfa::empty(&ba)] {
            let w = guessing.hopcroft_karp_difference(&other, &ba, &d).unwrap().unwrap();
            assert_ne!(guessing.accepts(&w, &ba), other.accepts(&w, &ba), "{:?}", w);
            assert!(!guessing.is_equivalent_to(&other, &ba, &d).unwrap());
        }
    }

    #[test]
    fn test_hopcroft_karp_with_epsilon_moves() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        // digits* written as 0 -eps-> 1, 1 -digit-> 0, with 1 final.
        let looped = Sfa::new(
            [
                SfaMove::epsilon(0, 1),
                SfaMove::input(1, ba.range('0', '9'), 0),
            ],
            0,
            [1],
            &ba,
            &d,
        )
        .unwrap();
        assert_eq!(looped.hopcroft_karp_difference(&digits(&ba), &ba, &d).unwrap(), None);
        let w = looped.hopcroft_karp_difference(&contains_b(&ba), &ba, &d).unwrap().unwrap();
        assert_eq!(w, chars(""));
    }

    #[test]
    fn test_expired_deadline_fails() {
        let ba = CharAlgebra::new();
        let d = Deadline::after(Duration::ZERO);
        let a = contains_b(&ba);
        let b = digits(&ba);
        assert!(matches!(
            a.find_difference(&b, &ba, &d),
            Err(Error::Timeout { .. })
        ));
    }
}
