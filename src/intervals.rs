//! Interval predicates over ordered domains.
//!
//! A predicate is a normalized list of inclusive ranges (sorted, disjoint,
//! non-adjacent), so structural equality coincides with semantic equality.
//! Two domains are provided: `u32` ([`IntAlgebra`]) and Unicode scalar
//! values ([`CharAlgebra`]).

use std::fmt::{Debug, Display, Formatter};
use std::hash::Hash;
use std::marker::PhantomData;

use log::debug;

use crate::algebra::{BooleanAlgebra, FunctionAlgebra};
use crate::deadline::Deadline;
use crate::error::Result;

/// A totally ordered domain embedded into `u32`.
pub trait Ordinal: Copy + Debug + Eq + Hash + Ord {
    /// Valid ordinals, as sorted disjoint inclusive ranges.
    const DOMAIN: &'static [(u32, u32)];

    fn to_ordinal(self) -> u32;
    fn from_ordinal(n: u32) -> Option<Self>;
}

impl Ordinal for u32 {
    const DOMAIN: &'static [(u32, u32)] = &[(0, u32::MAX)];

    fn to_ordinal(self) -> u32 {
        self
    }
    fn from_ordinal(n: u32) -> Option<Self> {
        Some(n)
    }
}

impl Ordinal for char {
    const DOMAIN: &'static [(u32, u32)] = &[(0, 0xD7FF), (0xE000, 0x10FFFF)];

    fn to_ordinal(self) -> u32 {
        self as u32
    }
    fn from_ordinal(n: u32) -> Option<Self> {
        char::from_u32(n)
    }
}

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Ranges {
    ranges: Vec<(u32, u32)>,
}

impl Ranges {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Normalize an arbitrary list of inclusive ranges.
    pub fn new(ranges: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut ranges: Vec<(u32, u32)> = ranges.into_iter().filter(|(lo, hi)| lo <= hi).collect();
        ranges.sort_unstable();

        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(ranges.len());
        for (lo, hi) in ranges {
            match merged.last_mut() {
                Some(last) if lo <= last.1.saturating_add(1) => {
                    last.1 = last.1.max(hi);
                }
                _ => merged.push((lo, hi)),
            }
        }
        Self { ranges: merged }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[(u32, u32)] {
        &self.ranges
    }

    pub fn contains(&self, n: u32) -> bool {
        // Ranges are sorted by their lower bound.
        let i = self.ranges.partition_point(|&(lo, _)| lo <= n);
        i > 0 && n <= self.ranges[i - 1].1
    }

    pub fn union(&self, other: &Ranges) -> Ranges {
        Ranges::new(self.ranges.iter().chain(other.ranges.iter()).copied())
    }

    pub fn intersection(&self, other: &Ranges) -> Ranges {
        let mut res = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let (a_lo, a_hi) = self.ranges[i];
            let (b_lo, b_hi) = other.ranges[j];
            let lo = a_lo.max(b_lo);
            let hi = a_hi.min(b_hi);
            if lo <= hi {
                res.push((lo, hi));
            }
            if a_hi < b_hi {
                i += 1;
            } else {
                j += 1;
            }
        }
        Ranges { ranges: res }
    }

    /// Complement with respect to the whole `u32` line.
    pub fn complement(&self) -> Ranges {
        let mut res = Vec::new();
        let mut next: Option<u32> = Some(0);
        for &(lo, hi) in &self.ranges {
            if let Some(start) = next {
                if start < lo {
                    res.push((start, lo - 1));
                }
            }
            next = hi.checked_add(1);
        }
        if let Some(start) = next {
            res.push((start, u32::MAX));
        }
        Ranges { ranges: res }
    }
}

impl Debug for Ranges {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Ranges {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, (lo, hi)) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            if lo == hi {
                write!(f, "{}", lo)?;
            } else {
                write!(f, "{}-{}", lo, hi)?;
            }
        }
        write!(f, "]")
    }
}

/// Interval algebra over the domain `T`.
pub struct IntervalAlgebra<T> {
    domain: Ranges,
    _phantom: PhantomData<T>,
}

pub type IntAlgebra = IntervalAlgebra<u32>;
pub type CharAlgebra = IntervalAlgebra<char>;

impl<T: Ordinal> IntervalAlgebra<T> {
    pub fn new() -> Self {
        Self {
            domain: Ranges::new(T::DOMAIN.iter().copied()),
            _phantom: PhantomData,
        }
    }

    /// Predicate for the inclusive range `lo..=hi`.
    pub fn range(&self, lo: T, hi: T) -> Ranges {
        Ranges::new([(lo.to_ordinal(), hi.to_ordinal())]).intersection(&self.domain)
    }

    /// Predicate for the union of the given inclusive ranges.
    pub fn ranges(&self, ranges: impl IntoIterator<Item = (T, T)>) -> Ranges {
        Ranges::new(
            ranges
                .into_iter()
                .map(|(lo, hi)| (lo.to_ordinal(), hi.to_ordinal())),
        )
        .intersection(&self.domain)
    }

    /// Everything at or above `lo`.
    pub fn at_least(&self, lo: T) -> Ranges {
        Ranges::new([(lo.to_ordinal(), u32::MAX)]).intersection(&self.domain)
    }
}

impl<T: Ordinal> Default for IntervalAlgebra<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ordinal> BooleanAlgebra for IntervalAlgebra<T> {
    type Pred = Ranges;
    type Elem = T;

    fn mk_true(&self) -> Ranges {
        self.domain.clone()
    }

    fn mk_false(&self) -> Ranges {
        Ranges::empty()
    }

    fn mk_atom(&self, elem: &T) -> Ranges {
        let n = elem.to_ordinal();
        Ranges::new([(n, n)])
    }

    fn mk_not(&self, p: &Ranges) -> Ranges {
        p.complement().intersection(&self.domain)
    }

    fn mk_and(&self, p: &Ranges, q: &Ranges) -> Ranges {
        p.intersection(q)
    }

    fn mk_or(&self, p: &Ranges, q: &Ranges) -> Ranges {
        p.union(q)
    }

    fn is_satisfiable(&self, p: &Ranges) -> bool {
        !p.is_empty()
    }

    fn has_model(&self, p: &Ranges, elem: &T) -> bool {
        p.contains(elem.to_ordinal())
    }

    fn generate_witness(&self, p: &Ranges) -> Option<T> {
        p.ranges().first().and_then(|&(lo, _)| T::from_ordinal(lo))
    }

    /// Sweep the sorted evidence and cut just before every change of group.
    ///
    /// Everything below the smallest witness goes to its group, and everything
    /// above the largest witness goes to the group of the largest one.
    fn separating_predicates(&self, groups: &[Vec<T>], deadline: &Deadline) -> Result<Vec<Ranges>> {
        if groups.len() <= 1 {
            return Ok(vec![self.mk_true(); groups.len()]);
        }

        let mut evidence: Vec<(u32, usize)> = groups
            .iter()
            .enumerate()
            .flat_map(|(i, g)| g.iter().map(move |e| (e.to_ordinal(), i)))
            .collect();
        evidence.sort_unstable();
        evidence.dedup();

        let mut cuts: Vec<Vec<(u32, u32)>> = vec![Vec::new(); groups.len()];
        if evidence.is_empty() {
            let mut preds = vec![self.mk_false(); groups.len()];
            preds[0] = self.mk_true();
            return Ok(preds);
        }

        let mut left = 0u32;
        for pair in evidence.windows(2) {
            deadline.check()?;
            let (a, ga) = pair[0];
            let (b, gb) = pair[1];
            assert!(a != b || ga == gb, "Element {} appears in groups {} and {}", a, ga, gb);
            if ga == gb {
                continue;
            }
            let right = b - 1;
            cuts[ga].push((left, right));
            left = b;
        }
        let (_, last) = evidence[evidence.len() - 1];
        cuts[last].push((left, u32::MAX));

        let preds: Vec<Ranges> = cuts
            .into_iter()
            .map(|rs| Ranges::new(rs).intersection(&self.domain))
            .collect();
        debug!("separating_predicates: {:?} -> {:?}", groups, preds);
        Ok(preds)
    }
}

/// Output terms over an [`Ordinal`] domain: a shift by a fixed distance or a
/// constant. Both are kept as ordinals, so a term may point outside the
/// domain, in which case it is undefined there.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Offset(i64),
    Const(i64),
}

impl Term {
    pub const IDENTITY: Term = Term::Offset(0);
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Offset(0) => write!(f, "x"),
            Term::Offset(k) if *k > 0 => write!(f, "x+{}", k),
            Term::Offset(k) => write!(f, "x{}", k),
            Term::Const(c) => write!(f, "{}", c),
        }
    }
}

impl<T: Ordinal> IntervalAlgebra<T> {
    fn ordinal(n: i64) -> Option<T> {
        u32::try_from(n).ok().and_then(T::from_ordinal)
    }
}

impl<T: Ordinal> FunctionAlgebra for IntervalAlgebra<T> {
    type Func = Term;

    fn mk_identity(&self) -> Term {
        Term::IDENTITY
    }

    fn mk_const(&self, elem: &T) -> Term {
        Term::Const(elem.to_ordinal() as i64)
    }

    fn mk_compose(&self, f: &Term, g: &Term) -> Term {
        match (*f, *g) {
            (Term::Const(c), _) => Term::Const(c),
            (Term::Offset(a), Term::Offset(b)) => Term::Offset(a + b),
            (Term::Offset(a), Term::Const(c)) => Term::Const(c + a),
        }
    }

    fn apply(&self, f: &Term, elem: &T) -> Option<T> {
        match *f {
            Term::Offset(k) => Self::ordinal(elem.to_ordinal() as i64 + k),
            Term::Const(c) => Self::ordinal(c),
        }
    }

    fn preimage(&self, f: &Term, p: &Ranges) -> Ranges {
        match *f {
            Term::Offset(k) => {
                let shifted = p.ranges().iter().filter_map(|&(lo, hi)| {
                    let lo = (lo as i64 - k).max(0);
                    let hi = (hi as i64 - k).min(u32::MAX as i64);
                    (lo <= hi).then_some((lo as u32, hi as u32))
                });
                Ranges::new(shifted).intersection(&self.domain)
            }
            Term::Const(c) => match Self::ordinal(c) {
                Some(e) if self.has_model(p, &e) => self.mk_true(),
                _ => self.mk_false(),
            },
        }
    }

    fn agree_on(&self, f: &Term, g: &Term, p: &Ranges) -> bool {
        let defined = |t: &Term| self.preimage(t, &self.mk_true());
        let outside = |t: &Term| self.mk_and(p, &self.mk_not(&defined(t)));
        if self.is_satisfiable(&outside(f)) || self.is_satisfiable(&outside(g)) {
            return false;
        }
        match (*f, *g) {
            (Term::Offset(a), Term::Offset(b)) => a == b || !self.is_satisfiable(p),
            (Term::Const(c), Term::Const(d)) => c == d || !self.is_satisfiable(p),
            // A shift is constant only on a single point.
            (Term::Offset(k), Term::Const(c)) | (Term::Const(c), Term::Offset(k)) => {
                let point = match u32::try_from(c - k) {
                    Ok(n) => Ranges::new([(n, n)]),
                    Err(_) => Ranges::empty(),
                };
                !self.is_satisfiable(&self.mk_and(p, &self.mk_not(&point)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_normalize() {
        let r = Ranges::new([(5, 9), (0, 2), (3, 4), (20, 19)]);
        assert_eq!(r.ranges(), &[(0, 9)]);
    }

    #[test]
    fn test_contains() {
        let r = Ranges::new([(0, 2), (10, 12)]);
        assert!(r.contains(0));
        assert!(r.contains(11));
        assert!(!r.contains(5));
        assert!(!r.contains(13));
    }

    #[test]
    fn test_complement() {
        let r = Ranges::new([(0, 2), (10, u32::MAX)]);
        assert_eq!(r.complement().ranges(), &[(3, 9)]);
        assert_eq!(Ranges::empty().complement().ranges(), &[(0, u32::MAX)]);
    }

    #[test]
    fn test_char_domain_skips_surrogates() {
        let ba = CharAlgebra::new();
        let below = ba.range('\u{D7FF}', '\u{D7FF}');
        let not_below = ba.mk_not(&below);
        assert!(!not_below.contains(0xD800));
        assert_eq!(ba.generate_witness(&ba.at_least('\u{D7FF}')), Some('\u{D7FF}'));
        let above = ba.mk_and(&not_below, &ba.at_least('\u{D7FF}'));
        assert_eq!(ba.generate_witness(&above), Some('\u{E000}'));
    }

    #[test]
    fn test_algebra_ops() {
        let ba = CharAlgebra::new();
        let lower = ba.range('a', 'z');
        let digit = ba.range('0', '9');
        assert!(!ba.is_satisfiable(&ba.mk_and(&lower, &digit)));
        assert!(ba.has_model(&ba.mk_or(&lower, &digit), &'5'));
        assert!(ba.has_model(&ba.mk_not(&lower), &'A'));
        assert!(ba.are_equivalent(&ba.mk_not(&ba.mk_not(&lower)), &lower));
        assert_eq!(ba.generate_witness(&lower), Some('a'));
        assert_eq!(ba.generate_witness(&ba.mk_false()), None);
    }

    #[test]
    fn test_separating_predicates_sweep() {
        let ba = IntAlgebra::new();
        let groups = vec![vec![0, 5], vec![10], vec![20, 30]];
        let preds = ba.separating_predicates(&groups, &Deadline::unlimited()).unwrap();
        assert_eq!(preds[0].ranges(), &[(0, 9)]);
        assert_eq!(preds[1].ranges(), &[(10, 19)]);
        assert_eq!(preds[2].ranges(), &[(20, u32::MAX)]);
    }

    #[test]
    fn test_separating_predicates_interleaved() {
        let ba = IntAlgebra::new();
        let groups = vec![vec![1, 50], vec![25]];
        let preds = ba.separating_predicates(&groups, &Deadline::unlimited()).unwrap();
        assert_eq!(preds[0].ranges(), &[(0, 24), (50, u32::MAX)]);
        assert_eq!(preds[1].ranges(), &[(25, 49)]);
    }

    #[test]
    fn test_separating_predicates_empty_groups() {
        let ba = IntAlgebra::new();
        let preds = ba
            .separating_predicates(&[vec![], vec![]], &Deadline::unlimited())
            .unwrap();
        assert!(ba.are_equivalent(&preds[0], &ba.mk_true()));
        assert!(!ba.is_satisfiable(&preds[1]));
    }

    #[test]
    fn test_separating_predicates_chars() {
        let ba = CharAlgebra::new();
        let groups = vec![vec!['a'], vec!['\u{D7FF}', '\u{E000}']];
        let preds = ba.separating_predicates(&groups, &Deadline::unlimited()).unwrap();
        assert!(ba.has_model(&preds[0], &'a'));
        assert!(ba.has_model(&preds[0], &'\0'));
        assert!(ba.has_model(&preds[1], &'\u{E000}'));
        assert!(!preds[1].contains(0xD800));
    }

    #[test]
    fn test_terms() {
        let ba = CharAlgebra::new();
        let up = Term::Offset(-32);
        assert_eq!(ba.apply(&up, &'a'), Some('A'));
        assert_eq!(ba.apply(&up, &'\0'), None);
        assert_eq!(ba.apply(&ba.mk_const(&'z'), &'q'), Some('z'));
        assert_eq!(ba.mk_compose(&Term::Offset(32), &up), Term::IDENTITY);
        assert_eq!(ba.mk_compose(&up, &ba.mk_const(&'b')), ba.mk_const(&'B'));

        // Inputs that an upper-casing shift sends into `A-Z`.
        let pre = ba.preimage(&up, &ba.range('A', 'Z'));
        assert_eq!(pre, ba.range('a', 'z'));
        assert!(!ba.is_satisfiable(&ba.preimage(&Term::Offset(32), &ba.range('\0', '\x05'))));
        assert_eq!(ba.preimage(&ba.mk_const(&'0'), &ba.range('0', '9')), ba.mk_true());
    }

    #[test]
    fn test_terms_agree_on() {
        let ba = CharAlgebra::new();
        let letters = ba.range('a', 'z');
        assert!(ba.agree_on(&Term::Offset(-32), &Term::Offset(-32), &letters));
        assert!(!ba.agree_on(&Term::Offset(-32), &Term::IDENTITY, &letters));
        assert!(ba.agree_on(&Term::IDENTITY, &ba.mk_const(&'q'), &ba.mk_atom(&'q')));
        assert!(!ba.agree_on(&Term::IDENTITY, &ba.mk_const(&'q'), &letters));
        // Undefined below ordinal 32.
        assert!(!ba.agree_on(&Term::Offset(-32), &Term::Offset(-32), &ba.range('\0', 'z')));
    }
}
