//! Sum-of-products form of positive formulas.
//!
//! A positive formula is determined by its minimal satisfying sets of states.
//! [`SumOfProducts`] stores exactly those: an antichain of cubes under set
//! inclusion, so two equivalent formulas always have equal representations.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use crate::expr::{BoolExpr, Lattice};
use crate::StateId;

pub type Cube = BTreeSet<StateId>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SumOfProducts {
    cubes: BTreeSet<Cube>,
}

impl SumOfProducts {
    pub fn top() -> Self {
        Self {
            cubes: BTreeSet::from([Cube::new()]),
        }
    }

    pub fn bottom() -> Self {
        Self {
            cubes: BTreeSet::new(),
        }
    }

    pub fn state(s: StateId) -> Self {
        Self {
            cubes: BTreeSet::from([Cube::from([s])]),
        }
    }

    /// Build from arbitrary cubes, keeping only the minimal ones.
    pub fn from_cubes(cubes: impl IntoIterator<Item = Cube>) -> Self {
        let mut cubes: Vec<Cube> = cubes.into_iter().collect();
        cubes.sort_by_key(|c| c.len());

        let mut antichain: Vec<Cube> = Vec::with_capacity(cubes.len());
        for cube in cubes {
            if !antichain.iter().any(|kept| kept.is_subset(&cube)) {
                antichain.push(cube);
            }
        }
        Self {
            cubes: antichain.into_iter().collect(),
        }
    }

    pub fn cubes(&self) -> &BTreeSet<Cube> {
        &self.cubes
    }

    pub fn is_top(&self) -> bool {
        self.cubes.len() == 1 && self.cubes.iter().all(|c| c.is_empty())
    }

    pub fn is_bottom(&self) -> bool {
        self.cubes.is_empty()
    }

    pub fn and(&self, other: &Self) -> Self {
        let mut product = Vec::with_capacity(self.cubes.len() * other.cubes.len());
        for a in &self.cubes {
            for b in &other.cubes {
                product.push(a.union(b).copied().collect());
            }
        }
        Self::from_cubes(product)
    }

    pub fn or(&self, other: &Self) -> Self {
        Self::from_cubes(self.cubes.iter().chain(other.cubes.iter()).cloned())
    }

    pub fn states(&self) -> BTreeSet<StateId> {
        self.cubes.iter().flatten().copied().collect()
    }

    pub fn has_model(&self, model: &BTreeSet<StateId>) -> bool {
        self.cubes.iter().any(|c| c.is_subset(model))
    }

    /// Total number of literal occurrences, plus one per cube.
    pub fn size(&self) -> usize {
        self.cubes.iter().map(|c| c.len() + 1).sum()
    }

    pub fn fold<L: Lattice + ?Sized>(&self, lattice: &mut L) -> L::Elem {
        let mut res = lattice.bottom();
        for cube in &self.cubes {
            let mut prod = lattice.top();
            for &s in cube {
                let x = lattice.state(s);
                prod = lattice.and(prod, x);
            }
            res = lattice.or(res, prod);
        }
        res
    }

    pub fn to_expr(&self) -> BoolExpr {
        BoolExpr::or_all(
            self.cubes
                .iter()
                .map(|c| BoolExpr::and_all(c.iter().map(|&s| BoolExpr::State(s)))),
        )
    }
}

impl From<&BoolExpr> for SumOfProducts {
    fn from(e: &BoolExpr) -> Self {
        e.fold(&mut SopLattice)
    }
}

impl Display for SumOfProducts {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_bottom() {
            return write!(f, "false");
        }
        for (i, cube) in self.cubes.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            if cube.is_empty() {
                write!(f, "true")?;
            }
            for (j, s) in cube.iter().enumerate() {
                if j > 0 {
                    write!(f, "&")?;
                }
                write!(f, "s{}", s)?;
            }
        }
        Ok(())
    }
}

/// Interpretation of formulas as antichains.
#[derive(Debug, Default, Copy, Clone)]
pub struct SopLattice;

impl Lattice for SopLattice {
    type Elem = SumOfProducts;

    fn top(&mut self) -> SumOfProducts {
        SumOfProducts::top()
    }
    fn bottom(&mut self) -> SumOfProducts {
        SumOfProducts::bottom()
    }
    fn state(&mut self, s: StateId) -> SumOfProducts {
        SumOfProducts::state(s)
    }
    fn and(&mut self, a: SumOfProducts, b: SumOfProducts) -> SumOfProducts {
        a.and(&b)
    }
    fn or(&mut self, a: SumOfProducts, b: SumOfProducts) -> SumOfProducts {
        a.or(&b)
    }
}
