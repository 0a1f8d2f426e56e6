//! Global active-object table and readiness set.
//!
//! The table maps each priority level to its started object; the readiness
//! set mirrors which of those queues currently hold events. Both live under
//! the framework critical section, written by producers and read by the
//! scheduler.

use core::cell::RefCell;

use aof_core::{Event as _, EventRef, Priority, PrioritySet, MAX_ACTIVE};
use critical_section::{CriticalSection, Mutex};

use crate::active::Active;

const MODULE: &str = "frame::registry";

const TABLE_LEN: usize = MAX_ACTIVE as usize + 1;

/// `active[prio]`, slot 0 unused.
static ACTIVE: Mutex<RefCell<[Option<&'static dyn Active>; TABLE_LEN]>> =
    Mutex::new(RefCell::new([None; TABLE_LEN]));

/// Priorities whose queues hold at least one event. Invariant: a bit is set
/// exactly while the corresponding queue is non-empty, as observed under
/// the critical section.
static READY: Mutex<RefCell<PrioritySet>> = Mutex::new(RefCell::new(PrioritySet::new()));

pub(crate) fn register(cs: CriticalSection, prio: Priority, ao: &'static dyn Active) {
    let mut table = ACTIVE.borrow_ref_mut(cs);
    let slot = &mut table[prio.raw() as usize];
    aof_core::require!(MODULE, 400, slot.is_none());
    *slot = Some(ao);
    log::debug!("active object started at {}", prio);
}

/// The started object at `prio`, if any.
pub fn lookup(cs: CriticalSection, prio: Priority) -> Option<&'static dyn Active> {
    ACTIVE.borrow_ref(cs)[prio.raw() as usize]
}

pub(crate) fn mark_ready(cs: CriticalSection, prio: Priority) {
    READY.borrow_ref_mut(cs).insert(prio);
}

pub(crate) fn clear_ready(cs: CriticalSection, prio: Priority) {
    READY.borrow_ref_mut(cs).remove(prio);
}

/// Highest priority with pending events, or `None` when every queue is
/// empty.
pub fn highest_ready(cs: CriticalSection) -> Option<Priority> {
    READY.borrow_ref(cs).find_max()
}

/// High-water diagnostic for the queue of the object started at `prio`.
/// Fatal when that priority holds no started object.
pub fn queue_min(prio: Priority) -> u16 {
    let ao = critical_section::with(|cs| lookup(cs, prio));
    match ao {
        Some(ao) => ao.queue_min(),
        None => aof_core::assert::assertion_failed(MODULE, 401),
    }
}

/// Best-effort broadcast of `evt` to every started object.
///
/// Each delivery uses a margin of one, so a saturated receiver drops the
/// event rather than halting the publisher. The publisher holds its own
/// reference across the loop; a dynamic event that reached no queue at all
/// is therefore still reclaimed.
pub fn publish(evt: EventRef) {
    let targets = critical_section::with(|cs| {
        if evt.header().is_dynamic() {
            evt.header().inc_ref(cs);
        }
        *ACTIVE.borrow_ref(cs)
    });

    for ao in targets.into_iter().flatten() {
        if !ao.post(evt, 1) {
            log::warn!("publish of sig={} dropped at {}", evt.signal(), ao.priority());
        }
    }

    critical_section::with(|cs| aof_pool::gc(cs, evt));
}
