//! # Trait Definitions
pub mod transport;
pub mod types;
