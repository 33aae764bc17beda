use std::fmt::{Display, Formatter};
use std::ops::Neg;

/// Handle to a decision-diagram node, with a complement bit in the sign.
///
/// `-r` denotes the negation of `r` in constant time.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Ref(i32);

impl Ref {
    pub fn positive(index: u32) -> Self {
        assert_ne!(index, 0, "Node index should not be zero");
        Self(index as i32)
    }

    pub const fn is_negated(self) -> bool {
        self.0 < 0
    }

    /// Index of the referenced node in the storage table.
    pub const fn index(self) -> u32 {
        self.0.unsigned_abs()
    }

    /// Distinct non-negative encoding, suitable for hashing.
    pub const fn unsigned(self) -> u32 {
        (self.0.unsigned_abs() << 1) | (self.0 < 0) as u32
    }
}

impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", if self.is_negated() { "~" } else { "" }, self.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negation() {
        let r = Ref::positive(5);
        assert!(!r.is_negated());
        assert!((-r).is_negated());
        assert_eq!(-(-r), r);
        assert_eq!((-r).index(), 5);
        assert_ne!(r.unsigned(), (-r).unsigned());
    }

    #[test]
    #[should_panic(expected = "Node index should not be zero")]
    fn test_zero_index() {
        Ref::positive(0);
    }
}
