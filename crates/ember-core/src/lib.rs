//! Ember Core - shared types and utilities
//!
//! Error type and common value types used across the Ember
//! post-processing crates.

pub mod error;
pub mod types;

pub use error::{EmberError, Result};
pub use types::Color;
