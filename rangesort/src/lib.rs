//! # Range partitioned distributed integer sort
//!
//! A fixed group of ranks jointly sorts a large set of pseudo-random unsigned integers that
//! initially exist only on the root rank.
//!
//! The value domain is split into contiguous, equal width ranges, one per rank. The root
//! generates the values and routes each one to the rank owning its range, every rank sorts
//! what it received, and a collective gather reassembles the sorted pieces on the root in rank
//! order. Because the ranges increase with rank, the concatenation is globally sorted, which
//! the root checks with a single scan.
//!
//! Notable features of this library are:
//! * Batched distribution, one count and one value array per destination, and a streaming
//!   alternative sending one message per value.
//! * A [`Transport`](traits::transport::Transport) seam with an in-process backend for
//!   testing and an MPI backend behind the `mpi` feature.
//! * Deterministic generation, the same seed reproduces the same trial.
#![cfg_attr(feature = "strict", deny(warnings))]
#![warn(missing_docs)]

pub mod sorting;
pub mod traits;
pub mod transport;
pub mod trial;

// Public API
#[doc(inline)]
pub use trial::{run_trial, TrialConfig, TrialReport};

#[doc(inline)]
pub use traits::types::{DistributionMode, Rank, SortError, Value};

#[doc(inline)]
pub use transport::{run_local_group, LocalTransport};

#[cfg(feature = "mpi")]
#[doc(inline)]
pub use transport::MpiTransport;
