//! # tp-core
//!
//! Core types, traits, and utilities for Timepiece RS.
//!
//! This crate provides the foundational building blocks used across all other crates:
//! - Common error types
//! - Result type aliases and the write-service result
//! - Record traits (Entity, Identifiable)
//! - Week and date range types
//! - The clock seam
//! - Configuration types

pub mod clock;
pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use clock::*;
pub use error::*;
pub use result::*;
pub use traits::*;
pub use types::*;
