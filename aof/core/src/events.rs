//! Event and signal primitives.
//!
//! Events are lightweight messages identified by an integral [`Signal`].
//! Each event starts with an [`EventHeader`] carrying the signal, the id of
//! the pool the storage came from (0 for events in static storage) and a
//! reference count of live queue entries. The header fields use relaxed
//! atomics: every mutation happens inside the framework critical section,
//! which already orders them, and the atomics only make the shared reads
//! well defined.

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

use critical_section::CriticalSection;

#[cfg(all(feature = "signal-8", feature = "signal-32"))]
compile_error!("features `signal-8` and `signal-32` are mutually exclusive");

#[cfg(feature = "signal-8")]
pub type RawSignal = u8;
#[cfg(feature = "signal-8")]
type AtomicSignal = core::sync::atomic::AtomicU8;

#[cfg(feature = "signal-32")]
pub type RawSignal = u32;
#[cfg(feature = "signal-32")]
type AtomicSignal = core::sync::atomic::AtomicU32;

/// Raw integer width of a signal, selectable with the `signal-8` and
/// `signal-32` features.
#[cfg(not(any(feature = "signal-8", feature = "signal-32")))]
pub type RawSignal = u16;
#[cfg(not(any(feature = "signal-8", feature = "signal-32")))]
type AtomicSignal = core::sync::atomic::AtomicU16;

const MODULE: &str = "core::events";

/// Identifier for an event kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Signal(pub RawSignal);

impl Signal {
    /// Create a new signal from a raw value
    pub const fn new(raw: RawSignal) -> Self {
        Signal(raw)
    }

    /// Get the raw signal value
    pub const fn raw(self) -> RawSignal {
        self.0
    }
}

impl From<RawSignal> for Signal {
    #[inline]
    fn from(raw: RawSignal) -> Self {
        Signal(raw)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SIG({})", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Signal {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "SIG({})", self.0 as u32);
    }
}

/// Metadata shared by all events.
///
/// A `pool_id` of 0 marks a static event: it is never reclaimed and its
/// reference count is ignored. For dynamic events the count tracks live
/// queue entries; it is incremented on every enqueue and decremented by
/// garbage collection.
#[derive(Debug)]
pub struct EventHeader {
    signal: AtomicSignal,
    pool_id: AtomicU8,
    ref_ctr: AtomicU8,
}

impl EventHeader {
    /// Header for an event in static storage.
    pub const fn new(signal: Signal) -> Self {
        Self {
            signal: AtomicSignal::new(signal.0),
            pool_id: AtomicU8::new(0),
            ref_ctr: AtomicU8::new(0),
        }
    }

    /// The event's signal. Frozen once the event has been posted.
    #[inline]
    pub fn signal(&self) -> Signal {
        Signal(self.signal.load(Ordering::Relaxed))
    }

    /// Id of the owning pool; 0 for static events.
    #[inline]
    pub fn pool_id(&self) -> u8 {
        self.pool_id.load(Ordering::Relaxed)
    }

    /// Whether the event came from a pool and is reference counted.
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.pool_id() != 0
    }

    /// Current number of live references.
    #[inline]
    pub fn ref_ctr(&self) -> u8 {
        self.ref_ctr.load(Ordering::Relaxed)
    }

    /// Account for one more live reference.
    pub fn inc_ref(&self, _cs: CriticalSection) {
        let ctr = self.ref_ctr.load(Ordering::Relaxed);
        crate::require!(MODULE, 100, ctr < u8::MAX);
        self.ref_ctr.store(ctr + 1, Ordering::Relaxed);
    }

    /// Drop one live reference; returns the remaining count.
    pub fn dec_ref(&self, _cs: CriticalSection) -> u8 {
        let ctr = self.ref_ctr.load(Ordering::Relaxed);
        crate::require!(MODULE, 101, ctr > 0);
        self.ref_ctr.store(ctr - 1, Ordering::Relaxed);
        ctr - 1
    }

    /// Bind the header to pool `pool_id`. Called once while the pool
    /// registers its storage.
    pub fn mark_pooled(&self, _cs: CriticalSection, pool_id: u8) {
        crate::require!(MODULE, 102, pool_id != 0);
        self.pool_id.store(pool_id, Ordering::Relaxed);
    }

    /// Rearm a pooled header for delivery: stamp the signal and reset the
    /// reference count. Called by the pool at allocation time, before the
    /// event becomes visible to any producer.
    pub fn prepare(&self, _cs: CriticalSection, signal: Signal) {
        self.signal.store(signal.0, Ordering::Relaxed);
        self.ref_ctr.store(0, Ordering::Relaxed);
    }
}

/// Base trait for all events.
///
/// Concrete events embed an [`EventHeader`] and expose it here; the
/// framework never touches anything beyond the header. The payload is
/// logically read-only once the event has been posted.
pub trait Event: Sync {
    fn header(&self) -> &EventHeader;

    /// The event's signal.
    fn signal(&self) -> Signal {
        self.header().signal()
    }
}

/// Shared handle to an event, as stored in queues.
pub type EventRef = &'static dyn Event;

/// Event that carries no data beyond its signal.
#[derive(Debug)]
pub struct SignalEvent {
    header: EventHeader,
}

impl SignalEvent {
    pub const fn new(signal: Signal) -> Self {
        Self {
            header: EventHeader::new(signal),
        }
    }
}

impl Event for SignalEvent {
    fn header(&self) -> &EventHeader {
        &self.header
    }
}

/// Event with a strongly typed, read-only payload.
#[derive(Debug)]
pub struct PayloadEvent<T> {
    header: EventHeader,
    payload: T,
}

impl<T> PayloadEvent<T> {
    pub const fn new(signal: Signal, payload: T) -> Self {
        Self {
            header: EventHeader::new(signal),
            payload,
        }
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }
}

impl<T: Sync> Event for PayloadEvent<T> {
    fn header(&self) -> &EventHeader {
        &self.header
    }
}
