use std::collections::HashMap;
use std::fmt::Debug;

use log::{debug, info, trace};

use crate::algebra::BooleanAlgebra;
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::sfa::{Sfa, SfaMove};
use crate::StateId;

use super::{ObservationTable, Oracle};

/// L*-style learner of symbolic automata.
#[derive(Debug, Default, Clone)]
pub struct Learner {
    rounds: usize,
}

impl Learner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of conjectures submitted by the last call to [`Learner::learn`].
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Learn the target language of `oracle`.
    ///
    /// Every round brings the table to a closed and consistent state, turns
    /// it into a total deterministic conjecture and submits it. A
    /// counterexample is added to the table with all its prefixes.
    pub fn learn<A, O>(&mut self, oracle: &mut O, ba: &A, deadline: &Deadline) -> Result<Sfa<A::Pred>>
    where
        A: BooleanAlgebra,
        A::Pred: Clone + Debug,
        O: Oracle<A>,
    {
        let Some(arbitrary) = ba.generate_witness(&ba.mk_true()) else {
            return Err(Error::Contradiction(
                "the domain of the algebra is empty".to_string(),
            ));
        };
        let mut table = ObservationTable::new(arbitrary.clone());
        self.rounds = 0;

        loop {
            stabilize(&mut table, &arbitrary, oracle, ba, deadline)?;
            trace!("table:\n{}", table);

            let conjecture = build_conjecture(&table, ba, deadline)?;
            self.rounds += 1;
            debug!(
                "round {}: conjecture with {} states, {} transitions",
                self.rounds,
                conjecture.state_count(),
                conjecture.transition_count()
            );

            let Some(cx) = oracle.check_equivalence(&conjecture, ba, deadline)? else {
                info!(
                    "learn: done after {} rounds, {} states, {} suffixes",
                    self.rounds,
                    conjecture.state_count(),
                    table.suffixes().len()
                );
                return Ok(conjecture);
            };

            if table.add_prefixes(&cx) == 0 {
                return Err(Error::Contradiction(format!(
                    "counterexample {:?} is already explained by the table",
                    cx
                )));
            }
        }
    }
}

/// Run closure, consistency and distribution of evidence to a joint
/// fixpoint.
fn stabilize<A, O>(
    table: &mut ObservationTable<A::Elem>,
    arbitrary: &A::Elem,
    oracle: &mut O,
    ba: &A,
    deadline: &Deadline,
) -> Result<()>
where
    A: BooleanAlgebra,
    O: Oracle<A>,
{
    loop {
        deadline.check()?;
        table.fill(oracle, ba, deadline)?;

        let unclosed = table.unclosed();
        if !unclosed.is_empty() {
            for w in unclosed {
                table.promote(&w, arbitrary);
            }
            continue;
        }

        if let Some(split) = table.inconsistency() {
            table.add_suffix(split.suffix);
            let added = table.distribute(&split.left, &split.right);
            trace!("distributed {} words between {:?} and {:?}", added, split.left, split.right);
            continue;
        }

        return Ok(());
    }
}

/// One state per confirmed word. The symbols observed between two
/// signatures are generalized into guards by the separating predicates.
fn build_conjecture<A>(table: &ObservationTable<A::Elem>, ba: &A, deadline: &Deadline) -> Result<Sfa<A::Pred>>
where
    A: BooleanAlgebra,
    A::Pred: Clone + Debug,
{
    let n = table.states().len();
    let state_of: HashMap<&[bool], StateId> = table
        .states()
        .iter()
        .enumerate()
        .map(|(i, w)| (table.signature(w), i as StateId))
        .collect();
    let finals: Vec<StateId> = (0..n)
        .filter(|&i| table.is_accepting(&table.states()[i]))
        .map(|i| i as StateId)
        .collect();

    let mut evidence: Vec<Vec<Vec<A::Elem>>> = vec![vec![Vec::new(); n]; n];
    for word in table.words() {
        let Some((symbol, parent)) = word.split_last() else {
            continue;
        };
        let from = state_of[table.signature(parent)] as usize;
        let to = state_of[table.signature(word)] as usize;
        if !evidence[from][to].contains(symbol) {
            evidence[from][to].push(symbol.clone());
        }
    }

    let mut moves = Vec::new();
    for (from, groups) in evidence.iter().enumerate() {
        let preds = ba.separating_predicates(groups, deadline)?;
        if preds.len() != n {
            return Err(Error::Contradiction(format!(
                "{} separating predicates for {} groups",
                preds.len(),
                n
            )));
        }
        for (to, guard) in preds.into_iter().enumerate() {
            moves.push(SfaMove::input(from as StateId, guard, to as StateId));
        }
    }

    Sfa::new(moves, 0, finals, ba, deadline)?.make_total(ba, deadline)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use test_log::test;

    use super::*;
    use crate::intervals::{CharAlgebra, IntAlgebra, Ranges};
    use crate::learning::{CountingOracle, SfaOracle};
    use crate::sfa::tests::{contains_b, digits};

    /// Counts symbols of at least 10 modulo 4; accepts at 3.
    fn count_large(ba: &IntAlgebra) -> Sfa<Ranges> {
        let d = Deadline::unlimited();
        let small = ba.range(0, 9);
        let large = ba.at_least(10);
        let moves = (0..4).flat_map(|s| {
            [
                SfaMove::input(s, small.clone(), s),
                SfaMove::input(s, large.clone(), (s + 1) % 4),
            ]
        });
        Sfa::new(moves, 0, [3], ba, &d).unwrap()
    }

    #[test]
    fn test_learn_four_state_target() {
        let ba = IntAlgebra::new();
        let d = Deadline::unlimited();
        let target = count_large(&ba);
        let mut oracle = CountingOracle::new(SfaOracle::new(target.clone()));
        let mut learner = Learner::new();
        let learned = learner.learn(&mut oracle, &ba, &d).unwrap();

        assert!(learned.state_count() <= 4);
        assert!(learned.is_equivalent_to(&target, &ba, &d).unwrap());
        assert!(learned.is_deterministic());
        assert_eq!(oracle.equivalence_queries(), learner.rounds());
        assert!(oracle.membership_queries() > 0);
    }

    #[test]
    fn test_learn_char_targets() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        for target in [contains_b(&ba), digits(&ba), Sfa::full(&ba), Sfa::empty(&ba)] {
            let mut oracle = SfaOracle::new(target.clone());
            let learned = Learner::new().learn(&mut oracle, &ba, &d).unwrap();
            assert!(learned.is_equivalent_to(&target, &ba, &d).unwrap());
        }
    }

    #[test]
    fn test_learned_automaton_is_total() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let mut oracle = SfaOracle::new(digits(&ba));
        let learned = Learner::new().learn(&mut oracle, &ba, &d).unwrap();
        assert!(learned.is_total());
        for &q in learned.states() {
            for c in ['\0', '0', '9', 'a', '~'] {
                let enabled = learned
                    .moves_from(q)
                    .iter()
                    .filter(|m| ba.has_model(&m.guard, &c))
                    .count();
                assert_eq!(enabled, 1, "state {} symbol {:?}", q, c);
            }
        }
    }

    /// Algebra over a domain with no elements.
    struct Void;

    impl BooleanAlgebra for Void {
        type Pred = ();
        type Elem = u32;

        fn mk_true(&self) {}
        fn mk_false(&self) {}
        fn mk_atom(&self, _: &u32) {}
        fn mk_not(&self, _: &()) {}
        fn mk_and(&self, _: &(), _: &()) {}
        fn mk_or(&self, _: &(), _: &()) {}
        fn is_satisfiable(&self, _: &()) -> bool {
            false
        }
        fn has_model(&self, _: &(), _: &u32) -> bool {
            false
        }
        fn generate_witness(&self, _: &()) -> Option<u32> {
            None
        }
    }

    struct Silent;

    impl Oracle<Void> for Silent {
        fn check_membership(&mut self, _: &[u32], _: &Void) -> Result<bool> {
            Ok(false)
        }
        fn check_equivalence(&mut self, _: &Sfa<()>, _: &Void, _: &Deadline) -> Result<Option<Vec<u32>>> {
            Ok(None)
        }
    }

    #[test]
    fn test_learn_over_empty_domain_fails() {
        let d = Deadline::unlimited();
        assert!(matches!(
            Learner::new().learn(&mut Silent, &Void, &d),
            Err(Error::Contradiction(_))
        ));
    }

    /// Drops the last separating predicate.
    struct Short(IntAlgebra);

    impl BooleanAlgebra for Short {
        type Pred = Ranges;
        type Elem = u32;

        fn mk_true(&self) -> Ranges {
            self.0.mk_true()
        }
        fn mk_false(&self) -> Ranges {
            self.0.mk_false()
        }
        fn mk_atom(&self, e: &u32) -> Ranges {
            self.0.mk_atom(e)
        }
        fn mk_not(&self, p: &Ranges) -> Ranges {
            self.0.mk_not(p)
        }
        fn mk_and(&self, p: &Ranges, q: &Ranges) -> Ranges {
            self.0.mk_and(p, q)
        }
        fn mk_or(&self, p: &Ranges, q: &Ranges) -> Ranges {
            self.0.mk_or(p, q)
        }
        fn is_satisfiable(&self, p: &Ranges) -> bool {
            self.0.is_satisfiable(p)
        }
        fn has_model(&self, p: &Ranges, e: &u32) -> bool {
            self.0.has_model(p, e)
        }
        fn generate_witness(&self, p: &Ranges) -> Option<u32> {
            self.0.generate_witness(p)
        }
        fn separating_predicates(&self, groups: &[Vec<u32>], deadline: &Deadline) -> Result<Vec<Ranges>> {
            let mut preds = self.0.separating_predicates(groups, deadline)?;
            preds.pop();
            Ok(preds)
        }
    }

    struct Accepting;

    impl Oracle<Short> for Accepting {
        fn check_membership(&mut self, _: &[u32], _: &Short) -> Result<bool> {
            Ok(true)
        }
        fn check_equivalence(&mut self, _: &Sfa<Ranges>, _: &Short, _: &Deadline) -> Result<Option<Vec<u32>>> {
            Ok(None)
        }
    }

    #[test]
    fn test_missing_separating_predicate_is_reported() {
        let d = Deadline::unlimited();
        assert!(matches!(
            Learner::new().learn(&mut Accepting, &Short(IntAlgebra::new()), &d),
            Err(Error::Contradiction(_))
        ));
    }

    #[test]
    fn test_learn_times_out() {
        let ba = IntAlgebra::new();
        let d = Deadline::after(Duration::ZERO);
        let mut oracle = SfaOracle::new(count_large(&ba));
        assert!(matches!(
            Learner::new().learn(&mut oracle, &ba, &d),
            Err(Error::Timeout { .. })
        ));
    }
}
