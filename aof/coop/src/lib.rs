#![no_std]
#![forbid(unsafe_code)]

//! # AOF Cooperative Kernel
//!
//! Priority-based run-to-completion scheduling for active objects, on a
//! single thread of control. Each pass picks the highest-priority object
//! with pending events, dispatches exactly one event to completion, and
//! garbage-collects it. Producers (interrupt handlers, or other dispatches)
//! only ever touch queues and the readiness set, so the scheduler never
//! blocks and its pick is O(1) regardless of how many objects exist.

use aof_core::Event as _;
use aof_frame::Active as _;

const MODULE: &str = "coop";

/// Dispatch one event to the highest-priority ready object.
///
/// Returns false when every queue is empty. Events posted while a dispatch
/// runs are observed on the next call through the readiness set, never by
/// preempting the dispatch in progress.
pub fn run_one() -> bool {
    let picked = critical_section::with(|cs| {
        aof_frame::highest_ready(cs).map(|prio| (prio, aof_frame::lookup(cs, prio)))
    });
    let (prio, ao) = match picked {
        None => return false,
        Some((prio, Some(ao))) => (prio, ao),
        // A readiness bit with no started object behind it
        Some((_, None)) => aof_core::assert::assertion_failed(MODULE, 500),
    };

    let evt = ao.take();
    log::trace!("dispatching sig={} at {}", evt.signal(), prio);
    ao.dispatch(evt);
    critical_section::with(|cs| aof_pool::gc(cs, evt));
    true
}

/// Dispatch until every queue is empty.
pub fn run_until_idle() {
    while run_one() {}
}

/// Scheduler loop for an always-on system.
pub fn run() -> ! {
    loop {
        if !run_one() {
            idle();
        }
    }
}

fn idle() {
    #[cfg(all(feature = "cortex-m", target_arch = "arm"))]
    cortex_m::asm::wfi();
    #[cfg(not(all(feature = "cortex-m", target_arch = "arm")))]
    core::hint::spin_loop();
}
