#![no_std]
#![forbid(unsafe_code)]

//! # AOF Framework Layer
//!
//! Active objects and asynchronous event delivery. Each active object owns a
//! bounded [`queue::EventQueue`] and a state machine; producers post events
//! from any context, and the readiness set in [`registry`] tells the
//! scheduler which objects have work.
//!
//! The layer is kernel-agnostic: the cooperative scheduler lives in
//! `aof-coop` and only consumes the registry surface exported here.

#[cfg(feature = "std")]
extern crate std;

pub mod active;
pub mod queue;
pub mod registry;

pub use active::{Active, ActiveObject, StateMachine};
pub use queue::{EventQueue, PostOutcome};
pub use registry::{highest_ready, lookup, publish, queue_min};
