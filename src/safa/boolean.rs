use std::collections::BTreeSet;
use std::fmt::Debug;

use crate::algebra::BooleanAlgebra;
use crate::deadline::Deadline;
use crate::error::Result;
use crate::expr::BoolExpr;
use crate::StateId;

use super::{log_size, Safa, SafaMove, RAW};

impl<P: Clone + Debug> Safa<P> {
    /// One move per state and minterm of its guards, targeting the
    /// disjunction of the targets of the guards the minterm lies inside.
    /// Minterms outside every guard go to a rejecting sink.
    pub fn normalize<A: BooleanAlgebra<Pred = P>>(&self, ba: &A, deadline: &Deadline) -> Result<Self> {
        let sink = self.max_state + 1;
        let mut moves = Vec::new();
        let mut needs_sink = false;

        for &s in &self.states {
            let out = self.moves_from(s);
            let guards: Vec<P> = out.iter().map(|m| m.guard.clone()).collect();
            for cell in ba.minterms(&guards, deadline)? {
                let targets: Vec<BoolExpr> = cell.ones().map(|i| out[i].to.clone()).collect();
                let to = if targets.is_empty() {
                    needs_sink = true;
                    BoolExpr::State(sink)
                } else {
                    BoolExpr::or_all(targets)
                };
                moves.push(SafaMove::new(s, cell.guard, to));
            }
        }
        if needs_sink {
            moves.push(SafaMove::new(sink, ba.mk_true(), BoolExpr::State(sink)));
        }

        let aut = Self::with_options(moves, self.initial.clone(), self.finals.iter().copied(), RAW, ba, deadline)?;
        log_size("normalize", &aut);
        Ok(aut)
    }

    /// Send the residual guard of every state to a rejecting sink.
    pub fn complete<A: BooleanAlgebra<Pred = P>>(&self, ba: &A, deadline: &Deadline) -> Result<Self> {
        let sink = self.max_state + 1;
        let mut moves: Vec<SafaMove<P>> = self.moves().cloned().collect();
        let mut needs_sink = false;

        for &s in &self.states {
            deadline.check()?;
            let residual = self
                .moves_from(s)
                .iter()
                .fold(ba.mk_true(), |acc, m| ba.mk_and(&acc, &ba.mk_not(&m.guard)));
            if ba.is_satisfiable(&residual) {
                needs_sink = true;
                moves.push(SafaMove::new(s, residual, BoolExpr::State(sink)));
            }
        }
        if needs_sink {
            moves.push(SafaMove::new(sink, ba.mk_true(), BoolExpr::State(sink)));
        }

        Self::with_options(moves, self.initial.clone(), self.finals.iter().copied(), RAW, ba, deadline)
    }

    /// Complement by duality.
    ///
    /// After normalization exactly one move is enabled per state and symbol,
    /// so dualizing every target, the initial formula and the final states
    /// negates acceptance of every configuration.
    pub fn negate<A: BooleanAlgebra<Pred = P>>(&self, ba: &A, deadline: &Deadline) -> Result<Self> {
        let normal = self.normalize(ba, deadline)?;
        let accept = normal.max_state + 1;
        let mut moves = Vec::new();
        let mut needs_accept = false;

        for &s in &normal.states {
            deadline.check()?;
            let mut residual = ba.mk_true();
            for m in normal.moves_from(s) {
                moves.push(SafaMove::new(s, m.guard.clone(), m.to.dual()));
                residual = ba.mk_and(&residual, &ba.mk_not(&m.guard));
            }
            if ba.is_satisfiable(&residual) {
                needs_accept = true;
                moves.push(SafaMove::new(s, residual, BoolExpr::State(accept)));
            }
        }

        let mut finals: BTreeSet<StateId> = normal.states.difference(&normal.finals).copied().collect();
        if needs_accept {
            finals.insert(accept);
            moves.push(SafaMove::new(accept, ba.mk_true(), BoolExpr::State(accept)));
        }

        let aut = Self::with_options(moves, normal.initial.dual(), finals, RAW, ba, deadline)?;
        log_size("negate", &aut);
        Ok(aut)
    }

    pub fn intersection<A: BooleanAlgebra<Pred = P>>(&self, other: &Self, ba: &A, deadline: &Deadline) -> Result<Self> {
        let aut = self.combine(other, BoolExpr::and, ba, deadline)?;
        log_size("intersection", &aut);
        Ok(aut)
    }

    pub fn union<A: BooleanAlgebra<Pred = P>>(&self, other: &Self, ba: &A, deadline: &Deadline) -> Result<Self> {
        let aut = self.combine(other, BoolExpr::or, ba, deadline)?;
        log_size("union", &aut);
        Ok(aut)
    }

    pub fn difference<A: BooleanAlgebra<Pred = P>>(&self, other: &Self, ba: &A, deadline: &Deadline) -> Result<Self> {
        let negated = other.negate(ba, deadline)?;
        self.intersection(&negated, ba, deadline)
    }

    /// Place `other` after the states of `self` and join the initial
    /// formulas with `op`.
    fn combine<A: BooleanAlgebra<Pred = P>>(
        &self,
        other: &Self,
        op: fn(BoolExpr, BoolExpr) -> BoolExpr,
        ba: &A,
        deadline: &Deadline,
    ) -> Result<Self> {
        let offset = self.max_state + 1;
        let mut moves: Vec<SafaMove<P>> = self.moves().cloned().collect();
        moves.extend(
            other
                .moves()
                .map(|m| SafaMove::new(m.from + offset, m.guard.clone(), m.to.offset(offset))),
        );
        let finals = self
            .finals
            .iter()
            .copied()
            .chain(other.finals.iter().map(|&s| s + offset));
        let initial = op(self.initial.clone(), other.initial.offset(offset));
        Self::with_options(moves, initial, finals, RAW, ba, deadline)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::intervals::CharAlgebra;
    use crate::safa::tests::{at_least_one, chars, s};

    const WORDS: &[&str] = &["", "a", "1", "a1", "1a", "aa", "11", "A", "a!", "!1b", "zz9"];

    #[test]
    fn test_intersection_of_at_least_one() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let lower = at_least_one(ba.range('a', 'z'), &ba);
        let digit = at_least_one(ba.range('0', '9'), &ba);
        let both = lower.intersection(&digit, &ba, &d).unwrap();
        assert!(both.accepts(&chars("a1"), &ba));
        assert!(!both.accepts(&chars("aa"), &ba));
        assert!(!both.accepts(&chars("11"), &ba));
        for w in WORDS {
            let w = chars(w);
            assert_eq!(both.accepts(&w, &ba), lower.accepts(&w, &ba) && digit.accepts(&w, &ba));
        }
    }

    #[test]
    fn test_union() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let lower = at_least_one(ba.range('a', 'z'), &ba);
        let digit = at_least_one(ba.range('0', '9'), &ba);
        let either = lower.union(&digit, &ba, &d).unwrap();
        for w in WORDS {
            let w = chars(w);
            assert_eq!(either.accepts(&w, &ba), lower.accepts(&w, &ba) || digit.accepts(&w, &ba));
        }
    }

    #[test]
    fn test_negate_flips_membership() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let lower = at_least_one(ba.range('a', 'z'), &ba);
        let digit = at_least_one(ba.range('0', '9'), &ba);
        let both = lower.intersection(&digit, &ba, &d).unwrap();
        let neither = both.negate(&ba, &d).unwrap();
        for w in WORDS {
            let w = chars(w);
            assert_ne!(neither.accepts(&w, &ba), both.accepts(&w, &ba), "{:?}", w);
        }
        let twice = neither.negate(&ba, &d).unwrap();
        for w in WORDS {
            let w = chars(w);
            assert_eq!(twice.accepts(&w, &ba), both.accepts(&w, &ba));
        }
    }

    #[test]
    fn test_negate_overlapping_moves() {
        // 0 -[a-z]-> 1 and 0 -[a-c]-> 2 overlap on [a-c].
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let aut = Safa::with_options(
            [
                SafaMove::new(0, ba.range('a', 'z'), s(1)),
                SafaMove::new(0, ba.range('a', 'c'), s(2)),
                SafaMove::new(2, ba.range('x', 'x'), s(1)),
            ],
            s(0),
            [1],
            RAW,
            &ba,
            &d,
        )
        .unwrap();
        let neg = aut.negate(&ba, &d).unwrap();
        for w in ["", "a", "z", "ax", "bx", "dx", "!", "a!"] {
            let w = chars(w);
            assert_ne!(neg.accepts(&w, &ba), aut.accepts(&w, &ba), "{:?}", w);
        }
    }

    #[test]
    fn test_negate_constants() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let empty = Safa::empty();
        let full = empty.negate(&ba, &d).unwrap();
        assert!(full.accepts(&chars(""), &ba));
        assert!(full.accepts(&chars("xyz"), &ba));
    }

    #[test]
    fn test_difference() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let lower = at_least_one(ba.range('a', 'z'), &ba);
        let digit = at_least_one(ba.range('0', '9'), &ba);
        let diff = lower.difference(&digit, &ba, &d).unwrap();
        for w in WORDS {
            let w = chars(w);
            assert_eq!(diff.accepts(&w, &ba), lower.accepts(&w, &ba) && !digit.accepts(&w, &ba));
        }
    }

    #[test]
    fn test_normalize_is_deterministic_per_state() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let aut = Safa::with_options(
            [
                SafaMove::new(0, ba.range('a', 'm'), s(1)),
                SafaMove::new(0, ba.range('k', 'z'), s(2)),
            ],
            s(0),
            [1, 2],
            RAW,
            &ba,
            &d,
        )
        .unwrap();
        let n = aut.normalize(&ba, &d).unwrap();
        for &q in n.states() {
            for c in ['\0', 'a', 'k', 'm', 'n', 'z', '~'] {
                let enabled = n.moves_from(q).iter().filter(|m| ba.has_model(&m.guard, &c)).count();
                assert_eq!(enabled, 1, "state {} symbol {:?}", q, c);
            }
        }
        let l = n.moves_from(0).iter().find(|m| ba.has_model(&m.guard, &'l')).unwrap();
        assert_eq!(l.to, BoolExpr::or(s(1), s(2)));
        for w in ["", "a", "l", "z", "!", "ab"] {
            let w = chars(w);
            assert_eq!(n.accepts(&w, &ba), aut.accepts(&w, &ba));
        }
    }

    #[test]
    fn test_complete_adds_sink() {
        let ba = CharAlgebra::new();
        let d = Deadline::unlimited();
        let aut = Safa::with_options([SafaMove::new(0, ba.range('a', 'a'), s(1))], s(0), [1], RAW, &ba, &d).unwrap();
        let c = aut.complete(&ba, &d).unwrap();
        assert_eq!(c.max_state(), 2);
        assert!(!c.is_final(2));
        assert!(c.accepts(&chars("a"), &ba));
        assert!(!c.accepts(&chars("b"), &ba));
    }
}
