//! Player identities and colour assignment

use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Car colours handed out at connect time
pub const PALETTE: [&str; 6] = [
    "#ff0000", "#00ff00", "#0000ff", "#ffff00", "#ff00ff", "#00ffff",
];

/// Length of the random part of a generated id
const SUFFIX_LEN: usize = 6;

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque player identity, unique per connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Hands out player ids and colours.
///
/// Ids are a monotonic counter followed by a random base-36 suffix, so two
/// ids from the same generator never collide and ids from a restarted
/// process are unlikely to repeat a previous run's.
pub struct IdGenerator {
    next: u64,
    rng: ChaCha8Rng,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            next: 1,
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Deterministic generator for tests
    pub fn from_seed(seed: u64) -> Self {
        Self {
            next: 1,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn next_id(&mut self) -> PlayerId {
        let counter = self.next;
        self.next += 1;

        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| {
                let idx = self.rng.gen_range(0..SUFFIX_ALPHABET.len());
                SUFFIX_ALPHABET[idx] as char
            })
            .collect();

        PlayerId(format!("{counter:x}-{suffix}"))
    }

    /// Pick a palette colour uniformly at random
    pub fn next_color(&mut self) -> &'static str {
        PALETTE[self.rng.gen_range(0..PALETTE.len())]
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
