//! Reduced ordered binary decision diagrams with complement edges.
//!
//! A [`Bdd`] is a single-owner manager: all nodes live in its hash-consing
//! table, and all operations go through it. Variables are 1-indexed and
//! ordered by their index (smaller indices closer to the root).
//!
//! The manager backs two things in this crate: the decision-diagram form of
//! state formulas ([`BddFactory`][crate::formula::BddFactory]) and the
//! decision-diagram congruence relation
//! ([`BddRelation`][crate::congruence::BddRelation]).

use std::cell::RefCell;
use std::cmp::min;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Debug;

use log::trace;

use crate::cache::Cache;
use crate::reference::Ref;
use crate::table::Table;
use crate::utils::{pairing3, MyHash};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Node {
    variable: u32,
    low: Ref,
    high: Ref,
}

impl Default for Node {
    fn default() -> Self {
        // Sentinel only; never dereferenced as a real node.
        Self {
            variable: 0,
            low: Ref::positive(1),
            high: Ref::positive(1),
        }
    }
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        pairing3(
            self.variable as u64,
            self.low.unsigned() as u64,
            self.high.unsigned() as u64,
        )
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct IteKey(Ref, Ref, Ref);

impl MyHash for IteKey {
    fn hash(&self) -> u64 {
        pairing3(
            self.0.unsigned() as u64,
            self.1.unsigned() as u64,
            self.2.unsigned() as u64,
        )
    }
}

pub struct Bdd {
    storage: RefCell<Table<Node>>,
    cache: RefCell<Cache<IteKey, Ref>>,
    pub zero: Ref,
    pub one: Ref,
}

impl Bdd {
    pub fn new(storage_bits: usize) -> Self {
        assert!(
            storage_bits <= 31,
            "Storage bits should be in the range 0..=31"
        );

        let mut storage = Table::new(storage_bits);

        // The terminal node gets index 1; `one` is its positive reference.
        let terminal = storage.add(Node {
            variable: 0,
            low: Ref::positive(1),
            high: Ref::positive(1),
        });
        assert_eq!(terminal, 1);
        let one = Ref::positive(1);

        Self {
            storage: RefCell::new(storage),
            cache: RefCell::new(Cache::new(min(storage_bits, 16))),
            zero: -one,
            one,
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new(20)
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bdd")
            .field("nodes", &self.storage.borrow().size())
            .finish()
    }
}

impl Bdd {
    /// Number of allocated nodes, including the terminal.
    pub fn num_nodes(&self) -> usize {
        self.storage.borrow().size()
    }

    pub fn variable(&self, index: u32) -> u32 {
        self.storage.borrow().value(index as usize).variable
    }
    pub fn low(&self, index: u32) -> Ref {
        self.storage.borrow().value(index as usize).low
    }
    pub fn high(&self, index: u32) -> Ref {
        self.storage.borrow().value(index as usize).high
    }

    pub fn low_node(&self, node: Ref) -> Ref {
        let low = self.low(node.index());
        if node.is_negated() {
            -low
        } else {
            low
        }
    }
    pub fn high_node(&self, node: Ref) -> Ref {
        let high = self.high(node.index());
        if node.is_negated() {
            -high
        } else {
            high
        }
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == self.zero
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == self.one
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        node.index() == self.one.index()
    }

    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");

        // Canonical form: the high edge is never complemented.
        if high.is_negated() {
            return -self.mk_node(v, -low, -high);
        }

        if low == high {
            return low;
        }

        let i = self.storage.borrow_mut().put(Node {
            variable: v,
            low,
            high,
        });
        Ref::positive(i as u32)
    }

    pub fn mk_var(&self, v: u32) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");
        self.mk_node(v, self.zero, self.one)
    }

    /// Cofactors of `node` with respect to `v`, which must not be below the
    /// top variable of `node`.
    pub fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        assert_ne!(v, 0, "Variable index should not be zero");

        if self.is_terminal(node) || v < self.variable(node.index()) {
            return (node, node);
        }
        assert_eq!(v, self.variable(node.index()));
        (self.low_node(node), self.high_node(node))
    }

    /// If-then-else: `(f ∧ g) ∨ (¬f ∧ h)`.
    ///
    /// ```
    /// use symbolic_automata::bdd::Bdd;
    ///
    /// let bdd = Bdd::default();
    /// let x = bdd.mk_var(1);
    /// let y = bdd.mk_var(2);
    /// let z = bdd.mk_var(3);
    /// let f = bdd.apply_ite(x, y, z);
    /// let g = bdd.apply_or(bdd.apply_and(x, y), bdd.apply_and(-x, z));
    /// assert_eq!(f, g);
    /// ```
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        trace!("apply_ite(f = {}, g = {}, h = {})", f, g, h);

        // Terminal cases
        if self.is_one(f) {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }
        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }

        // Standard triples:
        //   ite(F,F,H) => ite(F,1,H)
        //   ite(F,~F,H) => ite(F,0,H)
        //   ite(F,G,F) => ite(F,G,0)
        //   ite(F,G,~F) => ite(F,G,1)
        if g == f {
            return self.apply_ite(f, self.one, h);
        }
        if g == -f {
            return self.apply_ite(f, self.zero, h);
        }
        if h == f {
            return self.apply_ite(f, g, self.zero);
        }
        if h == -f {
            return self.apply_ite(f, g, self.one);
        }

        // ite(~F,G,H) => ite(F,H,G)
        let (f, g, h) = if f.is_negated() { (-f, h, g) } else { (f, g, h) };

        // ite(F,~G,H) => ~ite(F,G,~H)
        let (g, h, negate) = if g.is_negated() {
            (-g, -h, true)
        } else {
            (g, h, false)
        };

        let key = IteKey(f, g, h);
        let cached = self.cache.borrow().get(&key).copied();
        let res = match cached {
            Some(res) => res,
            None => {
                let m = [f, g, h]
                    .iter()
                    .map(|r| self.variable(r.index()))
                    .filter(|&v| v != 0)
                    .min()
                    .expect("f is not a terminal");

                let (f0, f1) = self.top_cofactors(f, m);
                let (g0, g1) = self.top_cofactors(g, m);
                let (h0, h1) = self.top_cofactors(h, m);

                let e = self.apply_ite(f0, g0, h0);
                let t = self.apply_ite(f1, g1, h1);
                let res = self.mk_node(m, e, t);
                self.cache.borrow_mut().insert(key, res);
                res
            }
        };

        if negate {
            -res
        } else {
            res
        }
    }

    pub fn apply_not(&self, f: Ref) -> Ref {
        -f
    }

    pub fn apply_and(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, self.zero)
    }

    pub fn apply_or(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, self.one, v)
    }

    pub fn apply_xor(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, -v, v)
    }

    pub fn apply_eq(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, -v)
    }

    pub fn apply_imply(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, self.one)
    }

    pub fn apply_and_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = self.one;
        for node in nodes {
            res = self.apply_and(res, node);
            if self.is_zero(res) {
                break;
            }
        }
        res
    }

    pub fn apply_or_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = self.zero;
        for node in nodes {
            res = self.apply_or(res, node);
            if self.is_one(res) {
                break;
            }
        }
        res
    }

    /// Whether `f → g` is valid.
    pub fn is_implies(&self, f: Ref, g: Ref) -> bool {
        self.is_zero(self.apply_and(f, -g))
    }

    /// Variables `f` depends on.
    pub fn support(&self, f: Ref) -> BTreeSet<u32> {
        let mut vars = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut stack = vec![f.index()];
        while let Some(i) = stack.pop() {
            if i == self.one.index() || !visited.insert(i) {
                continue;
            }
            vars.insert(self.variable(i));
            stack.push(self.low(i).index());
            stack.push(self.high(i).index());
        }
        vars
    }

    /// Evaluate `f` under the assignment `model`.
    pub fn eval(&self, f: Ref, model: impl Fn(u32) -> bool) -> bool {
        let mut node = f;
        while !self.is_terminal(node) {
            let v = self.variable(node.index());
            node = if model(v) {
                self.high_node(node)
            } else {
                self.low_node(node)
            };
        }
        self.is_one(node)
    }

    /// Number of distinct nodes reachable from `f`, including the terminal.
    pub fn size(&self, f: Ref) -> usize {
        let mut visited = HashSet::new();
        let mut stack = vec![f.index()];
        while let Some(i) = stack.pop() {
            if !visited.insert(i) || i == self.one.index() {
                continue;
            }
            stack.push(self.low(i).index());
            stack.push(self.high(i).index());
        }
        visited.len()
    }

    /// Some satisfying assignment of `f`, as signed variable literals.
    pub fn one_sat(&self, f: Ref) -> Option<Vec<i32>> {
        if self.is_zero(f) {
            return None;
        }
        let mut path = Vec::new();
        let mut node = f;
        while !self.is_terminal(node) {
            let v = self.variable(node.index()) as i32;
            let high = self.high_node(node);
            if self.is_zero(high) {
                path.push(-v);
                node = self.low_node(node);
            } else {
                path.push(v);
                node = high;
            }
        }
        Some(path)
    }

    /// Bottom-up fold over the nodes of `f` with a per-call memo table.
    ///
    /// The terminals are interpreted as `zero` and `one`, and `node` combines
    /// a variable with the already folded low and high children.
    pub fn fold<T: Clone>(
        &self,
        f: Ref,
        zero: T,
        one: T,
        node: &mut impl FnMut(u32, T, T) -> T,
    ) -> T {
        let mut memo = HashMap::new();
        self.fold_rec(f, &zero, &one, node, &mut memo)
    }

    fn fold_rec<T: Clone>(
        &self,
        f: Ref,
        zero: &T,
        one: &T,
        node: &mut impl FnMut(u32, T, T) -> T,
        memo: &mut HashMap<Ref, T>,
    ) -> T {
        if self.is_one(f) {
            return one.clone();
        }
        if self.is_zero(f) {
            return zero.clone();
        }
        if let Some(res) = memo.get(&f) {
            return res.clone();
        }
        let v = self.variable(f.index());
        let low = self.fold_rec(self.low_node(f), zero, one, node, memo);
        let high = self.fold_rec(self.high_node(f), zero, one, node, memo);
        let res = node(v, low, high);
        memo.insert(f, res.clone());
        res
    }
}
