//! Pool interface, pool registry, and the signal-event pool.

use core::cell::RefCell;

use aof_core::{Error, Event, EventRef, Result, Signal, SignalEvent};
use critical_section::{CriticalSection, Mutex};

use crate::PoolStats;

const MODULE: &str = "pool";

/// Maximum number of pools the framework can route `gc` to.
pub const MAX_POOLS: usize = 3;

/// Storage provider for dynamic events.
///
/// The framework needs exactly one capability from an allocator: taking back
/// the storage of an event whose last reference was dropped.
pub trait EventPool: Sync {
    /// Return a fully released event's storage to the pool.
    fn reclaim(&self, cs: CriticalSection, evt: EventRef);
}

static POOLS: Mutex<RefCell<[Option<&'static dyn EventPool>; MAX_POOLS]>> =
    Mutex::new(RefCell::new([None; MAX_POOLS]));

/// Register a pool and assign its id (`1..=MAX_POOLS`).
///
/// Called once per pool at startup; a full table is a configuration
/// contract violation.
pub fn register_pool(cs: CriticalSection, pool: &'static dyn EventPool) -> u8 {
    let mut pools = POOLS.borrow_ref_mut(cs);
    let idx = match pools.iter().position(|slot| slot.is_none()) {
        Some(idx) => idx,
        None => aof_core::assert::assertion_failed(MODULE, 100),
    };
    pools[idx] = Some(pool);
    (idx + 1) as u8
}

fn pool_for(cs: CriticalSection, pool_id: u8) -> &'static dyn EventPool {
    let pools = POOLS.borrow_ref(cs);
    match pools.get(pool_id as usize - 1).copied().flatten() {
        Some(pool) => pool,
        None => aof_core::assert::assertion_failed(MODULE, 101),
    }
}

/// Garbage-collect one reference to `evt`.
///
/// No-op for static events. A dynamic event gives back one reference; with
/// the last one gone the storage returns to the owning pool. Balanced
/// against the `inc_ref` every enqueue performs, this reclaims an event
/// exactly once its last queue entry has been consumed.
pub fn gc(cs: CriticalSection, evt: EventRef) {
    let header = evt.header();
    if !header.is_dynamic() {
        return;
    }
    if header.ref_ctr() > 1 {
        header.dec_ref(cs);
    } else {
        // Last reference. A count of 0 happens when a refused post collects
        // an event that never reached a queue.
        log::trace!(
            "reclaiming sig={} into pool {}",
            header.signal(),
            header.pool_id()
        );
        pool_for(cs, header.pool_id()).reclaim(cs, evt);
    }
}

struct PoolInner<const N: usize> {
    free: heapless::Vec<u16, N>,
    /// Slots at `fresh..` have never been handed out yet.
    fresh: u16,
    pool_id: u8,
    stats: PoolStats,
}

/// Fixed-size pool of signal-only dynamic events.
///
/// The slots live inside the pool itself, so a `static` pool needs no
/// separate backing storage. Recycled slot indices go through a
/// `heapless::Vec` free list; untouched slots are handed out in order
/// first, which keeps startup allocation O(1) without an init pass.
pub struct SignalPool<const N: usize> {
    slots: [SignalEvent; N],
    inner: Mutex<RefCell<PoolInner<N>>>,
}

impl<const N: usize> SignalPool<N> {
    pub const fn new() -> Self {
        assert!(N > 0 && N <= u16::MAX as usize);
        Self {
            slots: [const { SignalEvent::new(Signal::new(0)) }; N],
            inner: Mutex::new(RefCell::new(PoolInner {
                free: heapless::Vec::new(),
                fresh: 0,
                pool_id: 0,
                stats: PoolStats::new(N as u16),
            })),
        }
    }

    /// Register the pool and stamp its id into every slot header.
    ///
    /// Must run at startup, before the first `alloc`.
    pub fn register(&'static self) -> u8 {
        critical_section::with(|cs| {
            let pool_id = register_pool(cs, self);
            self.inner.borrow_ref_mut(cs).pool_id = pool_id;
            for slot in &self.slots {
                slot.header().mark_pooled(cs, pool_id);
            }
            pool_id
        })
    }

    /// Take a free event and arm it with `signal`.
    pub fn alloc(&'static self, signal: Signal) -> Result<EventRef> {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            aof_core::require!(MODULE, 102, inner.pool_id != 0);

            let idx = match inner.free.pop() {
                Some(idx) => idx,
                None if (inner.fresh as usize) < N => {
                    let idx = inner.fresh;
                    inner.fresh += 1;
                    idx
                }
                None => {
                    log::warn!("pool {} exhausted", inner.pool_id);
                    return Err(Error::PoolExhausted);
                }
            };
            inner.stats.on_alloc();

            let slot = &self.slots[idx as usize];
            slot.header().prepare(cs, signal);
            Ok(slot as EventRef)
        })
    }

    /// Occupancy snapshot
    pub fn stats(&self) -> PoolStats {
        critical_section::with(|cs| self.inner.borrow_ref(cs).stats)
    }
}

impl<const N: usize> EventPool for SignalPool<N> {
    fn reclaim(&self, cs: CriticalSection, evt: EventRef) {
        let idx = self
            .slots
            .iter()
            .position(|slot| core::ptr::eq(slot.header(), evt.header()));
        let idx = match idx {
            // Reclaiming an event this pool never issued
            None => aof_core::assert::assertion_failed(MODULE, 103),
            Some(idx) => idx,
        };

        let mut inner = self.inner.borrow_ref_mut(cs);
        if inner.free.push(idx as u16).is_err() {
            // Free list overflow means a double reclaim
            aof_core::assert::assertion_failed(MODULE, 104);
        }
        inner.stats.on_dealloc();
    }
}
