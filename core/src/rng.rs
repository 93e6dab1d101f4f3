//! Deterministic random number generation for simulated sources.
//!
//! RULE: Scoring never touches randomness. Only simulated upstreams
//! (latency, outage injection) draw from a SourceRng, and each one is
//! seeded from (master_seed XOR slot index) so runs are reproducible.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for a single simulated source.
pub struct SourceRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SourceRng {
    /// Create a source RNG from the master seed and a stable slot.
    pub fn new(master_seed: u64, slot: SourceSlot) -> Self {
        let derived_seed = master_seed ^ (slot as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self {
            name: slot.name(),
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [lo, hi]. Returns `lo` when the range is empty.
    pub fn next_in_range(&mut self, lo: u64, hi: u64) -> u64 {
        if hi <= lo {
            return lo;
        }
        lo + self.inner.next_u64() % (hi - lo + 1)
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// Stable slot assignments for simulated sources.
/// NEVER reorder or remove entries. Only append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum SourceSlot {
    Sanctions = 0,
    AmlPep = 1,
    CriminalFraudSite = 2,
    CommunityFraudDb = 3,
}

impl SourceSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sanctions => "sanctions",
            Self::AmlPep => "aml_pep",
            Self::CriminalFraudSite => "criminal_fraud_site",
            Self::CommunityFraudDb => "community_fraud_db",
        }
    }
}
