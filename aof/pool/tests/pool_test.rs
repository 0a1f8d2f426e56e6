//! Event pool tests for aof-pool

use aof_core::{Event, Signal, SignalEvent};
use aof_pool::{gc, SignalPool};

static SMALL: SignalPool<2> = SignalPool::new();
static CYCLE: SignalPool<4> = SignalPool::new();
static UNREGISTERED: SignalPool<1> = SignalPool::new();

#[test]
fn alloc_until_exhausted_then_reuse() {
    SMALL.register();

    let e1 = SMALL.alloc(Signal::new(10)).unwrap();
    let e2 = SMALL.alloc(Signal::new(11)).unwrap();
    assert_eq!(e1.signal(), Signal(10));
    assert_eq!(e2.signal(), Signal(11));
    assert!(SMALL.alloc(Signal::new(12)).is_err());

    // One enqueue reference, then collect: the block comes back.
    critical_section::with(|cs| {
        e1.header().inc_ref(cs);
        gc(cs, e1);
    });
    let e3 = SMALL.alloc(Signal::new(13)).unwrap();
    assert_eq!(e3.signal(), Signal(13));
    assert!(e3.header().is_dynamic());
}

#[test]
fn ref_counting_drives_reclaim() {
    let pool_id = CYCLE.register();

    let evt = CYCLE.alloc(Signal::new(21)).unwrap();
    assert_eq!(evt.header().pool_id(), pool_id);
    assert_eq!(evt.header().ref_ctr(), 0);

    // Two queues hold the event; only the second gc releases the block.
    critical_section::with(|cs| {
        evt.header().inc_ref(cs);
        evt.header().inc_ref(cs);
        gc(cs, evt);
        assert_eq!(evt.header().ref_ctr(), 1);
    });
    assert_eq!(CYCLE.stats().used(), 1);

    critical_section::with(|cs| gc(cs, evt));
    assert_eq!(CYCLE.stats().used(), 0);
    assert_eq!(CYCLE.stats().min_free, 3);
}

#[test]
fn gc_ignores_static_events() {
    static EVT: SignalEvent = SignalEvent::new(Signal::new(99));
    critical_section::with(|cs| gc(cs, &EVT));
    assert_eq!(EVT.header().ref_ctr(), 0);
}

#[test]
#[should_panic(expected = "pool:102")]
fn alloc_before_register_is_fatal() {
    let _ = UNREGISTERED.alloc(Signal::new(1));
}
