//! Bounded event queue with a front-slot fast path.
//!
//! The queue holds one event in a dedicated front slot and the rest in a
//! ring of `N` slots. `n_free` counts unused slots including the front one,
//! so a completely empty queue has `n_free == N + 1`. The ring indices
//! follow the wrap-then-decrement discipline: `head` always names the next
//! FIFO write slot and `tail` the slot the front is refilled from, and both
//! wrap through 0 to `N` before decrementing. `n_min` records the smallest
//! `n_free` ever observed, the high-water mark for sizing the queue.
//!
//! All mutation happens inside the framework critical section; the methods
//! take the [`CriticalSection`] token as proof.

use core::cell::RefCell;

use aof_core::{Event as _, EventRef};
use critical_section::{CriticalSection, Mutex};

const MODULE: &str = "frame::queue";

/// Outcome of a FIFO post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOutcome {
    /// The event was stored. `signal` is true when this post took the queue
    /// from empty to non-empty, which is the edge the readiness set keys on.
    Queued { signal: bool },
    /// Not enough room for the requested margin; the event reference was
    /// garbage-collected, so nothing leaks.
    Dropped,
}

struct QueueInner<const N: usize> {
    front: Option<EventRef>,
    ring: [Option<EventRef>; N],
    head: u16,
    tail: u16,
    n_free: u16,
    n_min: u16,
}

/// Bounded FIFO of event references with LIFO self-posting.
pub struct EventQueue<const N: usize> {
    inner: Mutex<RefCell<QueueInner<N>>>,
}

impl<const N: usize> EventQueue<N> {
    const END: u16 = N as u16;

    /// An empty queue. `N` is the ring capacity; the queue holds at most
    /// `N + 1` events counting the front slot, and `N == 0` (front slot
    /// only) is legal.
    pub const fn new() -> Self {
        assert!(N < u16::MAX as usize);
        Self {
            inner: Mutex::new(RefCell::new(QueueInner {
                front: None,
                ring: [None; N],
                head: 0,
                tail: 0,
                n_free: N as u16 + 1,
                n_min: N as u16 + 1,
            })),
        }
    }

    /// Append `evt` in FIFO order, demanding `margin` slots stay free after
    /// the insert.
    ///
    /// With `margin == 0` the caller guarantees capacity, so running out of
    /// room is fatal. With `margin > 0` an insert that would leave fewer
    /// than `margin` free slots is refused: the event is garbage-collected
    /// and [`PostOutcome::Dropped`] returned.
    pub fn post_fifo(&self, cs: CriticalSection, evt: EventRef, margin: u16) -> PostOutcome {
        let mut q = self.inner.borrow_ref_mut(cs);

        let n = q.n_free;
        if n > margin {
            if evt.header().is_dynamic() {
                evt.header().inc_ref(cs);
            }
            let n = n - 1;
            q.n_free = n;
            if n < q.n_min {
                q.n_min = n;
            }

            let signal = if q.front.is_none() {
                q.front = Some(evt);
                true
            } else {
                let head = q.head as usize;
                q.ring[head] = Some(evt);
                if q.head == 0 {
                    q.head = Self::END;
                }
                q.head -= 1;
                false
            };
            PostOutcome::Queued { signal }
        } else {
            aof_core::require!(MODULE, 200, margin != 0);
            log::warn!("queue full, dropping sig={}", evt.signal());
            aof_pool::gc(cs, evt);
            PostOutcome::Dropped
        }
    }

    /// Insert `evt` ahead of everything already queued.
    ///
    /// The displaced front event moves to the tail-side ring slot so it is
    /// consumed right after `evt`. Overflow is fatal; LIFO is reserved for
    /// self-posting, where the object controls its own headroom. Returns
    /// the empty-to-non-empty signal flag.
    pub fn post_lifo(&self, cs: CriticalSection, evt: EventRef) -> bool {
        let mut q = self.inner.borrow_ref_mut(cs);

        aof_core::require!(MODULE, 210, q.n_free != 0);
        if evt.header().is_dynamic() {
            evt.header().inc_ref(cs);
        }
        let n = q.n_free - 1;
        q.n_free = n;
        if n < q.n_min {
            q.n_min = n;
        }

        match q.front.replace(evt) {
            None => true,
            Some(prev) => {
                q.tail += 1;
                if q.tail == Self::END {
                    q.tail = 0;
                }
                let tail = q.tail as usize;
                q.ring[tail] = Some(prev);
                false
            }
        }
    }

    /// Remove the next event, or `None` when the queue is empty.
    ///
    /// The flag is true when this call emptied the queue, the edge on which
    /// the owner's readiness bit is cleared.
    pub fn get(&self, cs: CriticalSection) -> Option<(EventRef, bool)> {
        let mut q = self.inner.borrow_ref_mut(cs);

        let evt = q.front?;
        let n = q.n_free + 1;
        q.n_free = n;

        let now_empty = if n <= Self::END {
            // Events remain in the ring; refill the front slot.
            let tail = q.tail as usize;
            let next = q.ring[tail].take();
            aof_core::require!(MODULE, 220, next.is_some());
            q.front = next;
            if q.tail == 0 {
                q.tail = Self::END;
            }
            q.tail -= 1;
            false
        } else {
            q.front = None;
            aof_core::require!(MODULE, 221, n == Self::END + 1);
            true
        };
        Some((evt, now_empty))
    }

    /// Smallest number of free slots ever observed.
    pub fn min_free(&self, cs: CriticalSection) -> u16 {
        self.inner.borrow_ref(cs).n_min
    }
}

impl<const N: usize> Default for EventQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aof_core::{Event, Signal, SignalEvent};

    static EVTS: [SignalEvent; 6] = [
        SignalEvent::new(Signal::new(1)),
        SignalEvent::new(Signal::new(2)),
        SignalEvent::new(Signal::new(3)),
        SignalEvent::new(Signal::new(4)),
        SignalEvent::new(Signal::new(5)),
        SignalEvent::new(Signal::new(6)),
    ];

    fn ev(i: usize) -> EventRef {
        &EVTS[i]
    }

    #[test]
    fn first_post_signals_once() {
        let queue: EventQueue<4> = EventQueue::new();
        critical_section::with(|cs| {
            assert_eq!(
                queue.post_fifo(cs, ev(0), 0),
                PostOutcome::Queued { signal: true }
            );
            assert_eq!(
                queue.post_fifo(cs, ev(1), 0),
                PostOutcome::Queued { signal: false }
            );
            // front slot taken, one ring slot used
            assert_eq!(queue.min_free(cs), 3);
        });
    }

    #[test]
    fn fifo_order_through_ring_wrap() {
        let queue: EventQueue<4> = EventQueue::new();
        critical_section::with(|cs| {
            for i in 0..5 {
                assert_eq!(
                    queue.post_fifo(cs, ev(i), 0),
                    PostOutcome::Queued { signal: i == 0 }
                );
            }
            assert_eq!(queue.min_free(cs), 0);

            for i in 0..5 {
                let (evt, now_empty) = queue.get(cs).unwrap();
                assert_eq!(evt.signal(), Signal::new(i as u16 + 1));
                assert_eq!(now_empty, i == 4);
            }
            assert!(queue.get(cs).is_none());
        });
    }

    #[test]
    #[should_panic(expected = "frame::queue:200")]
    fn overflow_without_margin_is_fatal() {
        let queue: EventQueue<4> = EventQueue::new();
        critical_section::with(|cs| {
            for i in 0..6 {
                queue.post_fifo(cs, ev(i), 0);
            }
        });
    }

    #[test]
    fn margin_refusal_leaves_queue_untouched() {
        let queue: EventQueue<4> = EventQueue::new();
        critical_section::with(|cs| {
            for i in 0..4 {
                queue.post_fifo(cs, ev(i), 0);
            }
            // n_free == 1; a margin of 1 cannot be honored
            assert_eq!(queue.post_fifo(cs, ev(4), 1), PostOutcome::Dropped);
            assert_eq!(queue.min_free(cs), 1);

            for i in 0..4 {
                let (evt, _) = queue.get(cs).unwrap();
                assert_eq!(evt.signal(), Signal::new(i as u16 + 1));
            }
            assert!(queue.get(cs).is_none());
        });
    }

    #[test]
    fn lifo_jumps_the_line() {
        let queue: EventQueue<4> = EventQueue::new();
        critical_section::with(|cs| {
            queue.post_fifo(cs, ev(0), 0);
            queue.post_fifo(cs, ev(1), 0);
            assert!(!queue.post_lifo(cs, ev(2)));

            let order: [_; 3] = core::array::from_fn(|_| queue.get(cs).unwrap().0.signal());
            assert_eq!(order, [Signal(3), Signal(1), Signal(2)]);
        });
    }

    #[test]
    fn lifo_into_empty_queue_signals() {
        let queue: EventQueue<2> = EventQueue::new();
        critical_section::with(|cs| {
            assert!(queue.post_lifo(cs, ev(0)));
            let (evt, now_empty) = queue.get(cs).unwrap();
            assert_eq!(evt.signal(), Signal(1));
            assert!(now_empty);
        });
    }

    #[test]
    #[should_panic(expected = "frame::queue:210")]
    fn lifo_overflow_is_fatal() {
        let queue: EventQueue<0> = EventQueue::new();
        critical_section::with(|cs| {
            queue.post_lifo(cs, ev(0));
            queue.post_lifo(cs, ev(1));
        });
    }

    #[test]
    fn front_slot_only_queue() {
        let queue: EventQueue<0> = EventQueue::new();
        critical_section::with(|cs| {
            assert_eq!(
                queue.post_fifo(cs, ev(0), 0),
                PostOutcome::Queued { signal: true }
            );
            assert_eq!(queue.post_fifo(cs, ev(1), 1), PostOutcome::Dropped);
            let (evt, now_empty) = queue.get(cs).unwrap();
            assert_eq!(evt.signal(), Signal(1));
            assert!(now_empty);
        });
    }
}
