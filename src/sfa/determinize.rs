use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt::Debug;

use log::debug;

use crate::algebra::BooleanAlgebra;
use crate::deadline::Deadline;
use crate::error::Result;
use crate::StateId;

use super::{log_size, Sfa, SfaMove, SfaOptions};

impl<P: Clone + Debug> Sfa<P> {
    /// Symbolic subset construction.
    ///
    /// The outgoing guards of each subset are split into minterms, and every
    /// satisfiable cell yields one deterministic move to the set of targets
    /// of the guards it lies inside.
    pub fn determinize<A: BooleanAlgebra<Pred = P>>(&self, ba: &A, deadline: &Deadline) -> Result<Self> {
        if self.is_deterministic {
            return Ok(self.clone());
        }

        let aut = self.remove_epsilon_moves(ba, deadline)?;
        if aut.is_deterministic {
            return Ok(aut);
        }

        let mut moves = Vec::new();
        let mut finals = Vec::new();
        let mut reached: HashMap<BTreeSet<StateId>, StateId> = HashMap::new();
        let mut queue: VecDeque<BTreeSet<StateId>> = VecDeque::new();

        let start = BTreeSet::from([aut.initial]);
        reached.insert(start.clone(), 0);
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            deadline.check()?;
            let id = reached[&current];
            if aut.is_final_configuration(&current) {
                finals.push(id);
            }

            let outgoing: Vec<_> = current.iter().flat_map(|&s| aut.moves_from(s)).collect();
            let guards: Vec<P> = outgoing.iter().map(|m| m.guard.clone()).collect();
            for cell in ba.minterms(&guards, deadline)? {
                let targets: BTreeSet<StateId> = cell.ones().map(|i| outgoing[i].to).collect();
                if targets.is_empty() {
                    continue;
                }
                let to = match reached.get(&targets) {
                    Some(&to) => to,
                    None => {
                        let to = reached.len() as StateId;
                        reached.insert(targets.clone(), to);
                        queue.push_back(targets);
                        to
                    }
                };
                moves.push(SfaMove::input(id, cell.guard, to));
            }
        }
        debug!("determinize: {} subsets explored", reached.len());

        let options = SfaOptions {
            normalize: true,
            prune: false,
        };
        let mut dfa = Self::with_options(moves, 0, finals, options, ba, deadline)?;
        dfa.is_deterministic = true;
        log_size("determinize", &dfa);
        Ok(dfa)
    }
}
