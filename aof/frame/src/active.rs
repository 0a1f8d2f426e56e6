//! Active objects and the state-machine seam.

use core::sync::atomic::{AtomicU8, Ordering};

use aof_core::{Event as _, EventRef, Priority};
use critical_section::CriticalSection;

use crate::queue::{EventQueue, PostOutcome};
use crate::registry;

const MODULE: &str = "frame::active";

#[cfg(not(any(feature = "std", feature = "lock-free")))]
compile_error!("enable either the `std` or the `lock-free` feature for state-machine locking");

/// Serializes access to an object's state machine.
///
/// Dispatch runs outside the framework critical section, so the state
/// machine gets its own lock: an OS mutex on hosted targets, a spinlock on
/// `no_std` ones. Under the cooperative kernel only the scheduler thread
/// ever dispatches, so the lock is uncontended; it exists to let an
/// `ActiveObject` live in a `static`.
struct DispatchLock<S> {
    #[cfg(feature = "std")]
    sm: std::sync::Mutex<S>,
    #[cfg(not(feature = "std"))]
    sm: spin::Mutex<S>,
}

impl<S> DispatchLock<S> {
    const fn new(sm: S) -> Self {
        Self {
            #[cfg(feature = "std")]
            sm: std::sync::Mutex::new(sm),
            #[cfg(not(feature = "std"))]
            sm: spin::Mutex::new(sm),
        }
    }

    /// Run `f` with exclusive access to the state machine.
    fn with<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        #[cfg(feature = "std")]
        {
            match self.sm.lock() {
                Ok(mut sm) => f(&mut sm),
                // Poisoned: a previous dispatch panicked mid-event.
                Err(_) => aof_core::assert::assertion_failed(MODULE, 303),
            }
        }
        #[cfg(not(feature = "std"))]
        {
            f(&mut *self.sm.lock())
        }
    }
}

/// Behavior of an active object.
///
/// The framework treats the state machine as opaque: it only ever asks it
/// to process one event to completion. Hierarchical state machine engines,
/// hand-written match statements and test probes all plug in here equally.
pub trait StateMachine: Send {
    /// Initial transition, run once when the object starts.
    fn on_start(&mut self) {}

    /// Process one event, run-to-completion. Must not block.
    fn dispatch(&mut self, evt: EventRef);
}

/// Object-safe surface of an active object, as stored in the global table
/// and driven by the scheduler.
pub trait Active: Sync {
    /// Assigned priority; fatal before [`ActiveObject::start`].
    fn priority(&self) -> Priority;

    /// Deliver `evt` in FIFO order, demanding `margin` free slots after the
    /// insert. Returns false when the margin cannot be honored (the event
    /// has been garbage-collected); `margin == 0` turns that refusal into a
    /// fatal contract violation instead.
    fn post(&self, evt: EventRef, margin: u16) -> bool;

    /// Deliver `evt` ahead of everything queued. Self-posting only: it
    /// perturbs delivery order for every other producer.
    fn post_lifo(&self, evt: EventRef);

    /// Remove the next event. Fatal on an empty queue; the cooperative
    /// scheduler proves non-emptiness through the readiness set before
    /// calling.
    fn take(&self) -> EventRef;

    /// Run the state machine for one event, to completion.
    fn dispatch(&self, evt: EventRef);

    /// Smallest number of free queue slots ever observed.
    fn queue_min(&self) -> u16;
}

/// An active object: priority, bounded event queue, state machine.
///
/// Designed for `static` placement; `new` is const and `start` borrows for
/// `'static`.
pub struct ActiveObject<S: StateMachine, const N: usize> {
    prio: AtomicU8,
    queue: EventQueue<N>,
    sm: DispatchLock<S>,
}

impl<S: StateMachine, const N: usize> ActiveObject<S, N> {
    pub const fn new(sm: S) -> Self {
        Self {
            prio: AtomicU8::new(0),
            queue: EventQueue::new(),
            sm: DispatchLock::new(sm),
        }
    }

    /// Register the object at `prio` and run its initial transition.
    ///
    /// Priorities are unique; starting two objects on the same level is
    /// fatal, as is starting the same object twice.
    pub fn start(&'static self, prio: Priority) {
        critical_section::with(|cs| {
            aof_core::require!(MODULE, 300, self.prio.load(Ordering::Relaxed) == 0);
            registry::register(cs, prio, self);
            self.prio.store(prio.raw(), Ordering::Relaxed);
        });
        self.sm.with(|sm| sm.on_start());
    }

    /// Park `evt` on the deferral queue `dq` for a later [`recall`].
    ///
    /// Posts with a margin of one so a full deferral queue reports false
    /// instead of halting.
    ///
    /// [`recall`]: Self::recall
    pub fn defer<const M: usize>(&self, dq: &EventQueue<M>, evt: EventRef) -> bool {
        critical_section::with(|cs| {
            matches!(dq.post_fifo(cs, evt, 1), PostOutcome::Queued { .. })
        })
    }

    /// Move one event back from `dq`, ahead of the queue, so it is the next
    /// one this object processes. Returns false when `dq` was empty.
    pub fn recall<const M: usize>(&self, dq: &EventQueue<M>) -> bool {
        critical_section::with(|cs| match dq.get(cs) {
            None => false,
            Some((evt, _)) => {
                self.post_lifo_in(cs, evt);
                // The self-post took its own reference; release the one the
                // deferral queue held. The count cannot reach zero here.
                if evt.header().is_dynamic() {
                    evt.header().dec_ref(cs);
                }
                true
            }
        })
    }

    fn assigned_prio(&self) -> Priority {
        let raw = self.prio.load(Ordering::Relaxed);
        aof_core::require!(MODULE, 301, raw != 0);
        Priority::new_unchecked(raw)
    }

    fn post_lifo_in(&self, cs: CriticalSection, evt: EventRef) {
        if self.queue.post_lifo(cs, evt) {
            registry::mark_ready(cs, self.assigned_prio());
        }
    }
}

impl<S: StateMachine, const N: usize> Active for ActiveObject<S, N> {
    fn priority(&self) -> Priority {
        self.assigned_prio()
    }

    fn post(&self, evt: EventRef, margin: u16) -> bool {
        let prio = self.assigned_prio();
        critical_section::with(|cs| match self.queue.post_fifo(cs, evt, margin) {
            PostOutcome::Queued { signal } => {
                if signal {
                    registry::mark_ready(cs, prio);
                }
                true
            }
            PostOutcome::Dropped => false,
        })
    }

    fn post_lifo(&self, evt: EventRef) {
        critical_section::with(|cs| self.post_lifo_in(cs, evt));
    }

    fn take(&self) -> EventRef {
        let prio = self.assigned_prio();
        critical_section::with(|cs| match self.queue.get(cs) {
            Some((evt, now_empty)) => {
                if now_empty {
                    registry::clear_ready(cs, prio);
                }
                evt
            }
            None => aof_core::assert::assertion_failed(MODULE, 302),
        })
    }

    fn dispatch(&self, evt: EventRef) {
        self.sm.with(|sm| sm.dispatch(evt));
    }

    fn queue_min(&self) -> u16 {
        critical_section::with(|cs| self.queue.min_free(cs))
    }
}
