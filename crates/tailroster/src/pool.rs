//! Working set construction.
//!
//! An [`IdentifierPool`] starts from a fixed seed of known registrations and
//! tops it up with synthesized ones until the requested number of unique
//! identifiers exists. Synthesized identifiers look like a country prefix
//! letter, four digits and a trailing letter (`N4821K`).

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, trace};

use crate::aircraft::Identifier;
use crate::config::RosterConfig;
use crate::error::{Error, Result};

/// Registrations known to resolve upstream.
pub const DEFAULT_SEED: [&str; 8] = [
    "HB-KDV", // Swiss
    "N271DV", // US
    "G-EUUU", // UK
    "VH-EBA", // Australian
    "JA8089", // Japanese
    "F-GSTC", // French
    "D-ABYT", // German
    "C-GEOU", // Canadian
];

/// Default prefix alphabet for synthesized identifiers.
pub const DEFAULT_PREFIXES: [char; 1] = ['N'];

/// Default cap on candidate draws per working set.
pub const DEFAULT_MAX_ATTEMPTS: usize = 100_000;

const SUFFIX_ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Produces working sets of unique lookup keys.
#[derive(Debug, Clone)]
pub struct IdentifierPool {
    seed: Vec<Identifier>,
    prefixes: Vec<char>,
    max_attempts: usize,
}

impl Default for IdentifierPool {
    fn default() -> Self {
        Self::new(DEFAULT_SEED.iter().map(Identifier::new).collect())
    }
}

impl IdentifierPool {
    /// Create a pool over the given seed with default generation settings.
    #[must_use]
    pub fn new(seed: Vec<Identifier>) -> Self {
        Self {
            seed,
            prefixes: DEFAULT_PREFIXES.to_vec(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Build a pool from roster configuration.
    #[must_use]
    pub fn from_config(config: &RosterConfig) -> Self {
        Self::new(
            config
                .seed_registrations
                .iter()
                .map(Identifier::new)
                .collect(),
        )
        .with_prefixes(config.prefixes.chars())
        .with_max_attempts(config.max_generation_attempts)
    }

    /// Set the prefix alphabet. Non-uppercase characters and repeats are
    /// dropped, keeping first-seen order; an empty result leaves the current
    /// alphabet in place.
    #[must_use]
    pub fn with_prefixes(mut self, prefixes: impl IntoIterator<Item = char>) -> Self {
        let mut seen = HashSet::new();
        let prefixes: Vec<char> = prefixes
            .into_iter()
            .filter(|c| c.is_ascii_uppercase() && seen.insert(*c))
            .collect();
        if !prefixes.is_empty() {
            self.prefixes = prefixes;
        }
        self
    }

    /// Set the maximum number of candidates drawn per working set.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Get the seed identifiers.
    #[must_use]
    pub fn seed(&self) -> &[Identifier] {
        &self.seed
    }

    /// Get the prefix alphabet.
    #[must_use]
    pub fn prefixes(&self) -> &[char] {
        &self.prefixes
    }

    /// Build a working set of `target` identifiers using the thread RNG.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolExhausted`] if the attempt cap is reached first.
    pub fn build_working_set(&self, target: usize) -> Result<Vec<Identifier>> {
        self.build_working_set_with(&mut rand::thread_rng(), target)
    }

    /// Build a working set of `target` identifiers using the given RNG.
    ///
    /// The seed is copied as a prefix. If `target` does not exceed the seed
    /// length the seed is returned unchanged; truncation is the aggregator's
    /// job. Otherwise candidates are drawn until `target` unique entries exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolExhausted`] if the attempt cap is reached first.
    pub fn build_working_set_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        target: usize,
    ) -> Result<Vec<Identifier>> {
        let mut working = self.seed.clone();
        if target <= working.len() {
            return Ok(working);
        }

        let mut seen: HashSet<Identifier> = working.iter().cloned().collect();
        let mut attempts = 0;

        while working.len() < target {
            if attempts >= self.max_attempts {
                return Err(Error::PoolExhausted {
                    target,
                    produced: working.len(),
                    attempts,
                });
            }
            attempts += 1;

            let candidate = self.synthesize(rng);
            if seen.insert(candidate.clone()) {
                working.push(candidate);
            } else {
                trace!(identifier = %candidate, "Discarding repeated candidate");
            }
        }

        debug!(
            seeded = self.seed.len(),
            target, attempts, "Built identifier working set"
        );
        Ok(working)
    }

    /// Draw one synthetic identifier.
    pub fn synthesize<R: Rng + ?Sized>(&self, rng: &mut R) -> Identifier {
        let prefix = self.prefixes.choose(rng).copied().unwrap_or('N');
        let digits: u16 = rng.gen_range(1000..=9999);
        let suffix = char::from(SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())]);
        Identifier::new(format!("{prefix}{digits}{suffix}"))
    }
}
