use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Range of the numeric suffix appended to a colliding nickname.
pub const SUFFIX_RANGE: RangeInclusive<u32> = 5..=20;

/// Derives replacement nicknames (`<base>-<n>`) when the server reports the
/// requested one as taken. Not collision-free, just likely to get through.
pub struct NickAllocator {
    rng: StdRng,
}

impl NickAllocator {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic allocator for tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Next candidate for `base`.
    pub fn alternate(&mut self, base: &str) -> String {
        let suffix = self.rng.gen_range(SUFFIX_RANGE);
        format!("{base}-{suffix}")
    }
}

impl std::fmt::Debug for NickAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NickAllocator").finish_non_exhaustive()
    }
}
