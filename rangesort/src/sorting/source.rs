//! Pseudo-random value generation on the root.
use std::time::{SystemTime, UNIX_EPOCH};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::traits::types::{SortError, Value, VALUE_BITS};

/// Bits taken from each draw of the generator.
const DRAW_BITS: u32 = 16;

/// Mask selecting the bits of a draw that are used.
const DRAW_MASK: u64 = (1 << DRAW_BITS) - 1;

/// Deterministic source of values with only the low `bits_to_use` bits significant.
///
/// Draws come from ChaCha8 seeded with `seed_from_u64`, so identical seed, count and bit
/// width reproduce an identical sequence.
pub struct ValueSource {
    rng: ChaCha8Rng,
    seed: u64,
    offset: u32,
}

impl ValueSource {
    /// Seed a new source.
    ///
    /// # Arguments
    /// * `seed` - Generator seed, zero is replaced by a runtime derived non-zero seed.
    /// * `bits_to_use` - Number of significant low order bits, `1..=64`.
    pub fn new(seed: u64, bits_to_use: u32) -> Result<Self, SortError> {
        if bits_to_use == 0 || bits_to_use > VALUE_BITS {
            return Err(SortError::InvalidInput(format!(
                "bits_to_use must be in 1..={}, got {}",
                VALUE_BITS, bits_to_use
            )));
        }

        let seed = if seed == 0 { runtime_seed() } else { seed };

        Ok(ValueSource {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            offset: VALUE_BITS - bits_to_use,
        })
    }

    /// Seed actually fed to the generator.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Draw the next value, assembled from several 16 bit draws to fill the full width,
    /// then shifted down so only the configured low order bits remain.
    pub fn next_value(&mut self) -> Value {
        let mut value: Value = 0;
        for _ in 0..(VALUE_BITS / DRAW_BITS) {
            value <<= DRAW_BITS;
            value |= self.rng.next_u32() as u64 & DRAW_MASK;
        }
        value >> self.offset
    }

    /// Iterator yielding the next `count` values.
    pub fn take_values(&mut self, count: usize) -> impl Iterator<Item = Value> + '_ {
        (0..count).map(move |_| self.next_value())
    }
}

/// Non-zero seed derived from the wall clock.
pub fn runtime_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let seed = nanos ^ (nanos >> 32);
    if seed == 0 {
        1
    } else {
        seed
    }
}

/// Convenience wrapper generating `count` values in one go.
pub fn generate_values(seed: u64, count: usize, bits_to_use: u32) -> Result<Vec<Value>, SortError> {
    let mut source = ValueSource::new(seed, bits_to_use)?;
    Ok(source.take_values(count).collect())
}
