use std::time::Duration;

use thiserror::Error;

/// Failures of the automata algorithms.
///
/// Counterexamples, empty automata and "not equivalent" answers are ordinary
/// return values, never errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The caller-supplied time budget was exhausted.
    #[error("time budget of {budget:?} exhausted")]
    Timeout { budget: Duration },

    /// A congruence backend reached an inconsistent state.
    #[error("constraint store contradiction: {0}")]
    Contradiction(String),

    /// Minterm construction was asked to split too many predicates.
    #[error("refusing to compute minterms of {count} predicates")]
    MintermLimit { count: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
