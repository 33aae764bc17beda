use std::fmt::Debug;

use log::debug;

use crate::algebra::BooleanAlgebra;
use crate::deadline::Deadline;
use crate::error::Result;
use crate::sfa::Sfa;

/// Answers membership and equivalence queries about a target language over
/// `A::Elem`.
pub trait Oracle<A: BooleanAlgebra> {
    /// Whether `word` belongs to the target language.
    fn check_membership(&mut self, word: &[A::Elem], ba: &A) -> Result<bool>;

    /// A word on which `conjecture` and the target disagree, or `None` if
    /// they accept the same language.
    fn check_equivalence(
        &mut self,
        conjecture: &Sfa<A::Pred>,
        ba: &A,
        deadline: &Deadline,
    ) -> Result<Option<Vec<A::Elem>>>;
}

/// Answers queries from a known target automaton.
#[derive(Debug, Clone)]
pub struct SfaOracle<P> {
    target: Sfa<P>,
}

impl<P> SfaOracle<P> {
    pub fn new(target: Sfa<P>) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &Sfa<P> {
        &self.target
    }
}

impl<A> Oracle<A> for SfaOracle<A::Pred>
where
    A: BooleanAlgebra,
    A::Pred: Clone + Debug,
{
    fn check_membership(&mut self, word: &[A::Elem], ba: &A) -> Result<bool> {
        Ok(self.target.accepts(word, ba))
    }

    fn check_equivalence(
        &mut self,
        conjecture: &Sfa<A::Pred>,
        ba: &A,
        deadline: &Deadline,
    ) -> Result<Option<Vec<A::Elem>>> {
        self.target.find_difference(conjecture, ba, deadline)
    }
}

/// Wraps another oracle and counts the queries passed through it.
#[derive(Debug, Clone)]
pub struct CountingOracle<O> {
    inner: O,
    membership_queries: usize,
    equivalence_queries: usize,
}

impl<O> CountingOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            membership_queries: 0,
            equivalence_queries: 0,
        }
    }

    pub fn membership_queries(&self) -> usize {
        self.membership_queries
    }

    pub fn equivalence_queries(&self) -> usize {
        self.equivalence_queries
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }

    pub fn into_inner(self) -> O {
        self.inner
    }
}

impl<A: BooleanAlgebra, O: Oracle<A>> Oracle<A> for CountingOracle<O> {
    fn check_membership(&mut self, word: &[A::Elem], ba: &A) -> Result<bool> {
        self.membership_queries += 1;
        self.inner.check_membership(word, ba)
    }

    fn check_equivalence(
        &mut self,
        conjecture: &Sfa<A::Pred>,
        ba: &A,
        deadline: &Deadline,
    ) -> Result<Option<Vec<A::Elem>>> {
        self.equivalence_queries += 1;
        let answer = self.inner.check_equivalence(conjecture, ba, deadline)?;
        debug!(
            "equivalence query #{}: {}",
            self.equivalence_queries,
            match &answer {
                Some(w) => format!("counterexample {:?}", w),
                None => "equivalent".to_string(),
            }
        );
        Ok(answer)
    }
}
