use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Display, Formatter};
use std::hash::Hash;

use log::{debug, trace};

use crate::algebra::BooleanAlgebra;
use crate::deadline::Deadline;
use crate::error::Result;

use super::Oracle;

/// Two words with the same signature whose extensions by the same symbol
/// disagree on `suffix`.
#[derive(Debug, Clone)]
pub(crate) struct Split<S> {
    pub left: Vec<S>,
    pub right: Vec<S>,
    pub suffix: Vec<S>,
}

/// Observation table of the learner.
///
/// `states` are the confirmed words, one per state of the conjecture, and
/// `boundary` the words observed but not promoted. Every word is mapped to
/// its signature: the membership answers of the word followed by each of
/// the `suffixes`. The first suffix is always the empty word, so the first
/// entry of a signature tells whether the word itself is accepted.
///
/// The set of all words is kept prefix-closed.
#[derive(Debug, Clone)]
pub struct ObservationTable<S> {
    states: Vec<Vec<S>>,
    boundary: Vec<Vec<S>>,
    suffixes: Vec<Vec<S>>,
    rows: HashMap<Vec<S>, Vec<bool>>,
}

impl<S: Clone + Debug + Eq + Hash> ObservationTable<S> {
    /// The empty word as the only state, `arbitrary` as its only extension.
    pub fn new(arbitrary: S) -> Self {
        let mut table = Self {
            states: vec![Vec::new()],
            boundary: Vec::new(),
            suffixes: vec![Vec::new()],
            rows: HashMap::new(),
        };
        table.rows.insert(Vec::new(), Vec::new());
        table.add_boundary(vec![arbitrary]);
        table
    }

    pub fn states(&self) -> &[Vec<S>] {
        &self.states
    }

    pub fn boundary(&self) -> &[Vec<S>] {
        &self.boundary
    }

    pub fn suffixes(&self) -> &[Vec<S>] {
        &self.suffixes
    }

    /// States first, then boundary words.
    pub fn words(&self) -> impl Iterator<Item = &Vec<S>> {
        self.states.iter().chain(&self.boundary)
    }

    pub fn contains(&self, word: &[S]) -> bool {
        self.rows.contains_key(word)
    }

    pub fn signature(&self, word: &[S]) -> &[bool] {
        &self.rows[word]
    }

    pub fn is_accepting(&self, word: &[S]) -> bool {
        self.rows[word][0]
    }

    /// Add `word` to the boundary unless it is already in the table.
    pub fn add_boundary(&mut self, word: Vec<S>) -> bool {
        if self.contains(&word) {
            return false;
        }
        trace!("add_boundary: {:?}", word);
        self.rows.insert(word.clone(), Vec::new());
        self.boundary.push(word);
        true
    }

    /// Add all prefixes of `word` to the boundary. Returns the number of
    /// words added.
    pub fn add_prefixes(&mut self, word: &[S]) -> usize {
        (1..=word.len())
            .filter(|&i| self.add_boundary(word[..i].to_vec()))
            .count()
    }

    /// Move `word` from the boundary to the states and observe its extension
    /// by `arbitrary`.
    pub fn promote(&mut self, word: &[S], arbitrary: &S) {
        let i = self
            .boundary
            .iter()
            .position(|w| w == word)
            .unwrap_or_else(|| panic!("{:?} is not a boundary word", word));
        let word = self.boundary.remove(i);
        debug!("promote: {:?}", word);
        let mut extension = word.clone();
        extension.push(arbitrary.clone());
        self.states.push(word);
        self.add_boundary(extension);
    }

    pub fn add_suffix(&mut self, suffix: Vec<S>) -> bool {
        if self.suffixes.contains(&suffix) {
            return false;
        }
        debug!("add_suffix: {:?}", suffix);
        self.suffixes.push(suffix);
        true
    }

    /// Ask the membership queries missing from the signatures.
    pub fn fill<A, O>(&mut self, oracle: &mut O, ba: &A, deadline: &Deadline) -> Result<()>
    where
        A: BooleanAlgebra<Elem = S>,
        O: Oracle<A>,
    {
        for (word, row) in self.rows.iter_mut() {
            deadline.check()?;
            for suffix in &self.suffixes[row.len()..] {
                let mut query = word.clone();
                query.extend(suffix.iter().cloned());
                row.push(oracle.check_membership(&query, ba)?);
            }
        }
        Ok(())
    }

    /// Boundary words whose signature matches no state, one per missing
    /// signature, shortest first.
    pub fn unclosed(&self) -> Vec<Vec<S>> {
        let mut known: HashSet<&[bool]> = self.states.iter().map(|w| self.signature(w)).collect();
        let mut candidates: Vec<&Vec<S>> = self.boundary.iter().collect();
        candidates.sort_by_key(|w| w.len());
        candidates
            .into_iter()
            .filter(|w| known.insert(self.signature(w)))
            .cloned()
            .collect()
    }

    /// Symbols `a` such that `word · a` is in the table.
    pub fn continuations(&self, word: &[S]) -> Vec<S> {
        self.words()
            .filter(|w| w.len() == word.len() + 1 && w.starts_with(word))
            .map(|w| w[word.len()].clone())
            .collect()
    }

    /// Two words sharing a signature and a continuation symbol that lead to
    /// different signatures.
    pub(crate) fn inconsistency(&self) -> Option<Split<S>> {
        let mut seen: HashMap<(&[bool], &S), &Vec<S>> = HashMap::new();
        for word in self.words() {
            let Some((symbol, parent)) = word.split_last() else {
                continue;
            };
            match seen.get(&(self.signature(parent), symbol)) {
                None => {
                    seen.insert((self.signature(parent), symbol), word);
                }
                Some(&other) => {
                    let (a, b) = (self.signature(other), self.signature(word));
                    if let Some(i) = (0..a.len()).find(|&i| a[i] != b[i]) {
                        let mut suffix = vec![symbol.clone()];
                        suffix.extend(self.suffixes[i].iter().cloned());
                        return Some(Split {
                            left: other[..other.len() - 1].to_vec(),
                            right: parent.to_vec(),
                            suffix,
                        });
                    }
                }
            }
        }
        None
    }

    /// Mirror the continuations of each of the two words onto the other.
    pub(crate) fn distribute(&mut self, left: &[S], right: &[S]) -> usize {
        let mut added = 0;
        for (from, to) in [(left, right), (right, left)] {
            for symbol in self.continuations(from) {
                let mut word = to.to_vec();
                word.push(symbol);
                if self.add_boundary(word) {
                    added += 1;
                }
            }
        }
        added
    }
}

impl<S: Debug + Eq + Hash> Display for ObservationTable<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn signature(row: Option<&Vec<bool>>) -> String {
            row.map_or(String::new(), |row| {
                row.iter().map(|&b| if b { " +" } else { " -" }).collect()
            })
        }

        write!(f, "E:")?;
        for e in &self.suffixes {
            write!(f, " {:?}", e)?;
        }
        writeln!(f)?;
        writeln!(f, "S:")?;
        for w in &self.states {
            writeln!(f, "  {:?} :{}", w, signature(self.rows.get(w)))?;
        }
        writeln!(f, "R:")?;
        for w in &self.boundary {
            writeln!(f, "  {:?} :{}", w, signature(self.rows.get(w)))?;
        }
        Ok(())
    }
}
