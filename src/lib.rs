//! # symbolic-automata: automata over Boolean algebras
//!
//! **`symbolic-automata`** implements finite and alternating automata whose transitions carry
//! *predicates* instead of single symbols. The alphabet may be huge or infinite (Unicode, integers),
//! yet no algorithm ever enumerates it: all reasoning about symbols goes through a
//! [`BooleanAlgebra`][crate::algebra::BooleanAlgebra] supplied by the caller.
//!
//! ## Key Features
//!
//! - **Symbolic finite automata** ([`Sfa`][crate::sfa::Sfa]): union, intersection, complement,
//!   concatenation, star, determinization, minimization, equivalence with counterexamples.
//! - **Symbolic alternating automata** ([`Safa`][crate::safa::Safa]): transitions lead to positive
//!   Boolean formulas over states, so Boolean operations never build state products.
//!   Equivalence is decided by bisimulation up to congruence, with the congruence kept either in a
//!   decision diagram ([`BddRelation`][crate::congruence::BddRelation]) or in a clause store
//!   ([`SatRelation`][crate::congruence::SatRelation]).
//! - **Symbolic transducers** ([`Sft`][crate::sft::Sft]): outputs are terms over the symbol read;
//!   composition and equivalence of single-valued transducers.
//! - **Active learning** ([`Learner`][crate::learning::Learner]): infers an SFA from membership and
//!   equivalence queries.
//! - **Explicit budgets**: every expensive operation takes a [`Deadline`][crate::deadline::Deadline]
//!   and fails with [`Error::Timeout`][crate::error::Error::Timeout] once it expires.
//!
//! ## Basic Usage
//!
//! ```rust
//! use symbolic_automata::algebra::BooleanAlgebra;
//! use symbolic_automata::deadline::Deadline;
//! use symbolic_automata::intervals::CharAlgebra;
//! use symbolic_automata::sfa::Sfa;
//!
//! let ba = CharAlgebra::new();
//! let d = Deadline::unlimited();
//!
//! // Words made of digits, and words made of lowercase letters.
//! let digits = Sfa::atom(ba.range('0', '9'), &ba, &d).unwrap().star(&ba, &d).unwrap();
//! let lower = Sfa::atom(ba.range('a', 'z'), &ba, &d).unwrap().star(&ba, &d).unwrap();
//!
//! let either = digits.union(&lower, &ba, &d).unwrap();
//! assert!(either.accepts(&['4', '2'], &ba));
//! assert!(!either.accepts(&['4', 'a'], &ba));
//!
//! // Both languages contain the empty word, and nothing else in common.
//! let both = digits.intersection(&lower, &ba, &d).unwrap();
//! assert_eq!(both.witness(&ba, &d).unwrap(), Some(vec![]));
//! let w = digits.find_difference(&lower, &ba, &d).unwrap().unwrap();
//! assert_ne!(digits.accepts(&w, &ba), lower.accepts(&w, &ba));
//! ```
//!
//! ## Core Components
//!
//! - **[`algebra`]**: the Boolean algebra contract, minterms and separating predicates.
//! - **[`sfa`]**, **[`safa`]**: the two automaton models.
//! - **[`sft`]**: transducers over a [`FunctionAlgebra`][crate::algebra::FunctionAlgebra].
//! - **[`expr`]**, **[`sop`]**, **[`formula`]**: state formulas and their representations.
//! - **[`congruence`]**: relations used by the alternating-automaton equivalence check.
//! - **[`bdd`]**, **[`sat`]**: the decision-diagram manager and the clause store behind them.
//! - **[`learning`]**: the active learner and its oracles.
//! - **[`intervals`]**: a ready-made algebra of integer and character ranges.

pub mod algebra;
pub mod bdd;
pub mod cache;
pub mod congruence;
pub mod deadline;
pub mod error;
pub mod expr;
pub mod formula;
pub mod intervals;
pub mod learning;
pub mod reference;
pub mod safa;
pub mod sat;
pub mod sfa;
pub mod sft;
pub mod sop;
pub mod table;
pub mod types;
pub mod utils;

/// Automaton state identifier.
pub type StateId = u32;
