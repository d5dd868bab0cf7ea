//! Implementations of [`Transport`](crate::traits::transport::Transport)
pub mod local;
#[cfg(feature = "mpi")]
pub mod mpi;

pub use local::{run_local_group, LocalTransport};
#[cfg(feature = "mpi")]
pub use self::mpi::MpiTransport;
