//! Helpers shared across the admitly crates.

pub mod error;

pub use error::FromMessage;
