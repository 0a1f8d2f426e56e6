//! Active object tests for aof-frame

use std::sync::Mutex as StdMutex;

use aof_core::{EventRef, Priority, Signal, SignalEvent};
use aof_frame::{Active, ActiveObject, EventQueue, StateMachine};
use once_cell::sync::Lazy;

/// Serializes the tests that observe the global readiness set.
static SERIAL: Lazy<StdMutex<()>> = Lazy::new(|| StdMutex::new(()));

fn prio(raw: u8) -> Priority {
    Priority::new(raw).unwrap()
}

struct Recorder {
    seen: &'static StdMutex<Vec<Signal>>,
}

impl StateMachine for Recorder {
    fn dispatch(&mut self, evt: EventRef) {
        self.seen.lock().unwrap().push(evt.signal());
    }
}

static E1: SignalEvent = SignalEvent::new(Signal::new(1));
static E2: SignalEvent = SignalEvent::new(Signal::new(2));
static E7: SignalEvent = SignalEvent::new(Signal::new(7));
static E8: SignalEvent = SignalEvent::new(Signal::new(8));

static SEEN_FIFO: StdMutex<Vec<Signal>> = StdMutex::new(Vec::new());
static AO_FIFO: ActiveObject<Recorder, 4> = ActiveObject::new(Recorder { seen: &SEEN_FIFO });

#[test]
fn fifo_delivery_updates_readiness() {
    let _guard = SERIAL.lock().unwrap();
    AO_FIFO.start(prio(10));

    assert!(AO_FIFO.post(&E1, 0));
    assert!(AO_FIFO.post(&E2, 0));
    assert_eq!(
        critical_section::with(aof_frame::highest_ready),
        Some(prio(10))
    );

    let evt = AO_FIFO.take();
    assert_eq!(evt.signal(), Signal(1));
    AO_FIFO.dispatch(evt);
    assert_eq!(AO_FIFO.take().signal(), Signal(2));

    assert_eq!(critical_section::with(aof_frame::highest_ready), None);
    assert_eq!(SEEN_FIFO.lock().unwrap().as_slice(), &[Signal(1)]);
}

static SEEN_MIN: StdMutex<Vec<Signal>> = StdMutex::new(Vec::new());
static AO_MIN: ActiveObject<Recorder, 4> = ActiveObject::new(Recorder { seen: &SEEN_MIN });

#[test]
fn queue_min_reports_high_water_mark() {
    let _guard = SERIAL.lock().unwrap();
    AO_MIN.start(prio(11));

    AO_MIN.post(&E1, 0);
    AO_MIN.post(&E2, 0);
    let _ = AO_MIN.take();
    let _ = AO_MIN.take();

    // Capacity 4 plus the front slot, minus the two events held at the peak.
    assert_eq!(aof_frame::queue_min(prio(11)), 3);
}

static SEEN_DUP: StdMutex<Vec<Signal>> = StdMutex::new(Vec::new());
static AO_DUP1: ActiveObject<Recorder, 2> = ActiveObject::new(Recorder { seen: &SEEN_DUP });
static AO_DUP2: ActiveObject<Recorder, 2> = ActiveObject::new(Recorder { seen: &SEEN_DUP });

#[test]
#[should_panic(expected = "frame::registry:400")]
fn duplicate_priority_is_fatal() {
    AO_DUP1.start(prio(12));
    AO_DUP2.start(prio(12));
}

static SEEN_DEFER: StdMutex<Vec<Signal>> = StdMutex::new(Vec::new());
static AO_DEFER: ActiveObject<Recorder, 4> = ActiveObject::new(Recorder { seen: &SEEN_DEFER });
static DQ: EventQueue<2> = EventQueue::new();

#[test]
fn defer_then_recall_jumps_the_queue() {
    let _guard = SERIAL.lock().unwrap();
    AO_DEFER.start(prio(13));

    AO_DEFER.post(&E7, 0);
    assert!(AO_DEFER.defer(&DQ, &E8));

    assert!(AO_DEFER.recall(&DQ));
    assert_eq!(AO_DEFER.take().signal(), Signal(8));
    assert_eq!(AO_DEFER.take().signal(), Signal(7));

    // Nothing left to recall.
    assert!(!AO_DEFER.recall(&DQ));
}

static SEEN_UNSTARTED: StdMutex<Vec<Signal>> = StdMutex::new(Vec::new());
static AO_UNSTARTED: ActiveObject<Recorder, 2> =
    ActiveObject::new(Recorder { seen: &SEEN_UNSTARTED });

#[test]
#[should_panic(expected = "frame::active:301")]
fn posting_to_an_unstarted_object_is_fatal() {
    AO_UNSTARTED.post(&E1, 0);
}

static SEEN_EMPTY: StdMutex<Vec<Signal>> = StdMutex::new(Vec::new());
static AO_EMPTY: ActiveObject<Recorder, 2> = ActiveObject::new(Recorder { seen: &SEEN_EMPTY });

#[test]
#[should_panic(expected = "frame::active:302")]
fn taking_from_an_empty_queue_is_fatal() {
    AO_EMPTY.start(prio(16));
    let _ = AO_EMPTY.take();
}
