//! Seed derivation and per-purpose RNG streams.
//!
//! A single user-visible seed fans out into independent streams so that, for
//! example, changing the player range does not perturb the winning draws.

use hmac::{Hmac, Mac};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::Sha256;

use crate::constants::{STREAM_DRAW, STREAM_POPULATION, STREAM_TICKETS};

/// Derive a stream seed from the user seed and a domain tag.
#[must_use]
pub fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let seed_bytes: [u8; 8] = digest[..8].try_into().expect("digest slice length");
    u64::from_le_bytes(seed_bytes)
}

/// Draw a fresh seed from OS entropy for runs that did not supply one.
#[must_use]
pub fn fresh_seed() -> u64 {
    rand::random::<u64>()
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<ChaCha8Rng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: RngCore> RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

/// Independent random streams owned by one simulation run.
#[derive(Debug, Clone)]
pub struct RngStreams {
    seed: u64,
    population: CountingRng<ChaCha8Rng>,
    tickets: CountingRng<ChaCha8Rng>,
    draw: CountingRng<ChaCha8Rng>,
}

impl RngStreams {
    /// Construct the streams from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            seed,
            population: CountingRng::new(derive_stream_seed(seed, STREAM_POPULATION)),
            tickets: CountingRng::new(derive_stream_seed(seed, STREAM_TICKETS)),
            draw: CountingRng::new(derive_stream_seed(seed, STREAM_DRAW)),
        }
    }

    /// The user seed the streams were derived from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Player and bet counts.
    pub fn population(&mut self) -> &mut CountingRng<ChaCha8Rng> {
        &mut self.population
    }

    /// Numbers picked on each bet.
    pub fn tickets(&mut self) -> &mut CountingRng<ChaCha8Rng> {
        &mut self.tickets
    }

    /// Winning combination of each round.
    pub fn draw(&mut self) -> &mut CountingRng<ChaCha8Rng> {
        &mut self.draw
    }

    /// Total draws across every stream.
    #[must_use]
    pub const fn total_draws(&self) -> u64 {
        self.population
            .draws()
            .saturating_add(self.tickets.draws())
            .saturating_add(self.draw.draws())
    }
}
