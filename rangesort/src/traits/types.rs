//! Utility types for trait definitions.
use std::fmt;
use std::time::Duration;

/// The value type sorted by the engine, the widest convenient unsigned integer.
pub type Value = u64;

/// Identifier of a participating rank, matches the MPI convention of a signed 32 bit integer.
pub type Rank = i32;

/// Number of bits in a [`Value`].
pub const VALUE_BITS: u32 = Value::BITS;

/// The rank responsible for generation, distribution, collection and verification.
pub const ROOT_RANK: Rank = 0;

/// Type to handle sort related errors
#[derive(Debug)]
pub enum SortError {
    /// Inputs that can't be used to run a trial
    InvalidInput(String),

    /// Failure of the underlying message passing layer, fatal for the trial
    Transport(String),

    /// Failure to run some business logic
    Failed(String),

    /// I/O failure
    Io(std::io::Error),
}

impl fmt::Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortError::InvalidInput(e) => write!(f, "Invalid input: {}", e),
            SortError::Transport(e) => write!(f, "Transport failure: {}", e),
            SortError::Failed(e) => write!(f, "Failed: {}", e),
            SortError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for SortError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SortError::Io(e) => Some(e),
            SortError::InvalidInput(_e) => None,
            SortError::Transport(_e) => None,
            SortError::Failed(_e) => None,
        }
    }
}

impl From<std::io::Error> for SortError {
    fn from(e: std::io::Error) -> Self {
        SortError::Io(e)
    }
}

/// Tags distinguishing the kinds of point to point message exchanged during distribution.
#[repr(i32)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MessageTag {
    /// Number of values a receiver should expect in its batch
    Count = 0,
    /// A batch of values
    Numbers = 1,
    /// A single streamed value
    Value = 2,
    /// End of a stream of values
    Stop = 3,
}

/// Strategy used by the root to hand values to their owning ranks.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum DistributionMode {
    /// Classify everything first, then send one count and one value array per destination.
    #[default]
    Batched,
    /// Send each value as soon as it is generated, terminated by a stop message.
    Streaming,
}

impl fmt::Display for DistributionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistributionMode::Batched => write!(f, "batched"),
            DistributionMode::Streaming => write!(f, "streaming"),
        }
    }
}

impl std::str::FromStr for DistributionMode {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "batched" | "batch" => Ok(DistributionMode::Batched),
            "streaming" | "stream" => Ok(DistributionMode::Streaming),
            other => Err(SortError::InvalidInput(format!(
                "unknown distribution mode '{}', expected 'batched' or 'streaming'",
                other
            ))),
        }
    }
}

/// Phases of a trial that are timed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum PhaseType {
    /// Range planning and buffer setup, before any value exists
    Setup,
    /// Value generation and classification on the root
    Generation,
    /// Hand-off of values to their owners, up to and including the barrier
    Distribution,
    /// Local sort of each rank's buffer
    Sort,
    /// Collective gather of the sorted buffers onto the root
    Collection,
    /// Order check of the gathered sequence
    Verification,
    /// Whole trial
    Total,
}

impl PhaseType {
    /// All phases in the order they are reported.
    pub const ALL: [PhaseType; 7] = [
        PhaseType::Setup,
        PhaseType::Generation,
        PhaseType::Distribution,
        PhaseType::Sort,
        PhaseType::Collection,
        PhaseType::Verification,
        PhaseType::Total,
    ];
}

/// Elapsed time of a phase, in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PhaseTime {
    /// Time in milliseconds
    pub time: f64,
}

impl PhaseTime {
    /// Convert a duration into a phase time.
    pub fn from_duration(d: Duration) -> Self {
        PhaseTime {
            time: d.as_secs_f64() * 1000.0,
        }
    }
}
