//! Perfect hashing helpers for the decision-diagram tables.

/// [Szudzik pairing function][szudzik-pairing]: an injection `ℕ² → ℕ`.
///
/// ```text
/// (a, b) -> if (a<b) then (b^2 + a) else (a^2 + a + b)
/// ```
///
/// [szudzik-pairing]: http://szudzik.com/ElegantPairing.pdf
pub fn pairing2(a: u64, b: u64) -> u64 {
    if a < b {
        b.wrapping_mul(b).wrapping_add(a)
    } else {
        a.wrapping_mul(a).wrapping_add(a).wrapping_add(b)
    }
}

/// Pairing of three values, nested to the left.
pub fn pairing3(a: u64, b: u64, c: u64) -> u64 {
    pairing2(pairing2(a, b), c)
}

/// Hash used to pick buckets in [`Table`][crate::table::Table] and slots in
/// [`Cache`][crate::cache::Cache].
pub trait MyHash {
    fn hash(&self) -> u64;
}

impl MyHash for u64 {
    fn hash(&self) -> u64 {
        *self
    }
}

impl MyHash for (u64, u64) {
    fn hash(&self) -> u64 {
        pairing2(self.0, self.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairing2() {
        // a\b  0  1  2  3
        // ---------------
        // 0    0  1  4  9
        // 1    2  3  5 10
        // 2    6  7  8 11
        // 3   12 13 14 15
        assert_eq!(pairing2(0, 0), 0);
        assert_eq!(pairing2(0, 1), 1);
        assert_eq!(pairing2(1, 0), 2);
        assert_eq!(pairing2(1, 1), 3);
        assert_eq!(pairing2(1, 2), 5);
        assert_eq!(pairing2(2, 1), 7);
        assert_eq!(pairing2(3, 3), 15);
    }

    #[test]
    fn test_pairing3_injective_on_small_values() {
        let mut seen = std::collections::HashSet::new();
        for a in 0..8 {
            for b in 0..8 {
                for c in 0..8 {
                    assert!(seen.insert(pairing3(a, b, c)));
                }
            }
        }
    }
}
