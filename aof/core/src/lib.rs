#![no_std]
#![forbid(unsafe_code)]

//! # AOF Core
//!
//! Core types and traits for the AOF active-object framework: event and
//! signal primitives, reference counting, priority levels and the readiness
//! bitmap, plus the error and assertion machinery shared by all layers.
//!
//! Everything here is freestanding (`no_std`) and free of allocation so the
//! same code runs on bare metal and on a hosted OS.

use core::fmt;

#[cfg(feature = "std")]
extern crate std;

pub mod assert;
pub mod events;
pub mod priorities;

pub use events::*;
pub use priorities::*;

/// Framework version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used throughout the framework
pub type Result<T> = core::result::Result<T, Error>;

/// Recoverable error conditions.
///
/// Contract violations never surface here; they halt the framework through
/// [`assert::assertion_failed`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Priority outside `1..=MAX_ACTIVE`
    InvalidPriority,
    /// Event pool has no free blocks
    PoolExhausted,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidPriority => write!(f, "Priority outside the configured range"),
            Error::PoolExhausted => write!(f, "Event pool has no free blocks"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Error::InvalidPriority => defmt::write!(fmt, "InvalidPriority"),
            Error::PoolExhausted => defmt::write!(fmt, "PoolExhausted"),
        }
    }
}
