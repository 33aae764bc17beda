//! Active learning of symbolic automata.
//!
//! The [`Learner`] asks an [`Oracle`] membership and equivalence queries and
//! keeps the answers in an [`ObservationTable`]. Rows of the table with the
//! same signature are merged into one state of the conjecture, and the
//! symbols observed between states are generalized into guards by the
//! algebra's separating predicates.

mod learner;
mod oracle;
mod table;

pub use learner::Learner;
pub use oracle::{CountingOracle, Oracle, SfaOracle};
pub use table::ObservationTable;
