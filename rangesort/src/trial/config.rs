//! Per trial parameters.
use tracing::{info, warn};

use crate::sorting::source::runtime_seed;
use crate::traits::types::{DistributionMode, Rank, VALUE_BITS, ROOT_RANK};

/// Bit width used when the requested one can't be honoured, half the native width.
pub const FALLBACK_BITS: u32 = VALUE_BITS / 2;

/// Parameters of a single trial.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrialConfig {
    /// Number of values generated on the root
    pub number_count: usize,
    /// Generator seed, zero requests a runtime derived seed
    pub seed: u64,
    /// Number of significant low order bits of each value
    pub bits_to_use: u32,
    /// Distribution protocol
    pub mode: DistributionMode,
    /// Optional cap on the number of values a single growable buffer may hold
    pub buffer_limit: Option<usize>,
}

impl TrialConfig {
    /// Batched trial without a buffer limit.
    pub fn new(number_count: usize, seed: u64, bits_to_use: u32) -> Self {
        TrialConfig {
            number_count,
            seed,
            bits_to_use,
            mode: DistributionMode::default(),
            buffer_limit: None,
        }
    }

    /// Select the distribution protocol.
    pub fn with_mode(mut self, mode: DistributionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Cap the number of values any single growable buffer may hold.
    pub fn with_buffer_limit(mut self, limit: Option<usize>) -> Self {
        self.buffer_limit = limit;
        self
    }

    /// Apply the documented fallbacks: an unusable bit width becomes [`FALLBACK_BITS`] and, on
    /// the root, a zero seed is replaced by a runtime derived one. Other ranks never generate
    /// values, so their seed is left as given. Only the root reports the substitutions.
    pub fn sanitised(&self, rank: Rank) -> Self {
        let mut config = self.clone();

        if config.bits_to_use == 0 || config.bits_to_use > VALUE_BITS {
            if rank == ROOT_RANK {
                warn!(
                    requested = config.bits_to_use,
                    fallback = FALLBACK_BITS,
                    "Can't use {} bits, using {}",
                    config.bits_to_use,
                    FALLBACK_BITS
                );
            }
            config.bits_to_use = FALLBACK_BITS;
        }

        if config.seed == 0 && rank == ROOT_RANK {
            config.seed = runtime_seed();
            info!(seed = config.seed, "No seed given, generated one");
        }

        config
    }
}
