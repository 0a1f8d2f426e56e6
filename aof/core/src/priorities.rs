//! Priority levels and the readiness bitmap.

use core::fmt;

use crate::{Error, Result};

/// Number of priority levels (and so the maximum number of active objects).
///
/// The two-word bitmap in [`PrioritySet`] caps this at 64; configuring it
/// outside `1..=64` is rejected at build time.
pub const MAX_ACTIVE: u8 = 64;

const _: () = assert!(
    MAX_ACTIVE >= 1 && MAX_ACTIVE <= 64,
    "MAX_ACTIVE must lie in 1..=64"
);

/// Priority level of an active object, `1..=MAX_ACTIVE`; larger is more
/// urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(u8);

impl Priority {
    /// Lowest priority level
    pub const MIN: Priority = Priority(1);

    /// Highest priority level
    pub const MAX: Priority = Priority(MAX_ACTIVE);

    /// Create a new priority level
    pub fn new(raw: u8) -> Result<Self> {
        if raw == 0 || raw > MAX_ACTIVE {
            Err(Error::InvalidPriority)
        } else {
            Ok(Priority(raw))
        }
    }

    /// Create a priority without range validation (const context)
    pub const fn new_unchecked(raw: u8) -> Self {
        Priority(raw)
    }

    /// Get the raw priority value
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Prio({})", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Priority {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Prio({})", self.0);
    }
}

/// Compact set of priorities with pending events.
///
/// Priority `n` maps to bit `n - 1` of the low word for `1..=32` and bit
/// `n - 33` of the high word for `33..=64`. All operations are O(1), so the
/// scheduler's pick is independent of how many active objects exist.
///
/// The set itself is plain data; the framework keeps it inside the critical
/// section, where producers insert and the scheduler reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrioritySet {
    low: u32,
    high: u32,
}

impl PrioritySet {
    /// Create an empty set
    pub const fn new() -> Self {
        Self { low: 0, high: 0 }
    }

    /// Remove every member
    pub fn clear_all(&mut self) {
        self.low = 0;
        self.high = 0;
    }

    /// True when no priority is pending. Each word is read exactly once and
    /// the results combine with short-circuit logic, so a racing producer is
    /// never observed half-way.
    #[inline]
    pub fn is_empty(&self) -> bool {
        let low = self.low;
        if low != 0 {
            return false;
        }
        let high = self.high;
        high == 0
    }

    /// True when at least one priority is pending
    #[inline]
    pub fn not_empty(&self) -> bool {
        !self.is_empty()
    }

    /// Membership test
    pub fn has(&self, prio: Priority) -> bool {
        let n = prio.raw();
        if n <= 32 {
            self.low & (1u32 << (n - 1)) != 0
        } else {
            self.high & (1u32 << (n - 33)) != 0
        }
    }

    /// Add a priority to the set
    pub fn insert(&mut self, prio: Priority) {
        let n = prio.raw();
        if n <= 32 {
            self.low |= 1u32 << (n - 1);
        } else {
            self.high |= 1u32 << (n - 33);
        }
    }

    /// Remove a priority from the set
    pub fn remove(&mut self, prio: Priority) {
        let n = prio.raw();
        if n <= 32 {
            self.low &= !(1u32 << (n - 1));
        } else {
            self.high &= !(1u32 << (n - 33));
        }
    }

    /// The largest pending priority, or `None` when the set is empty.
    ///
    /// Checks the high word first; `u32::leading_zeros` compiles to the
    /// hardware count-leading-zeros instruction where one exists.
    pub fn find_max(&self) -> Option<Priority> {
        let high = self.high;
        let n = if high != 0 {
            (64 - high.leading_zeros()) as u8
        } else {
            let low = self.low;
            (32 - low.leading_zeros()) as u8
        };
        if n == 0 {
            None
        } else {
            Some(Priority(n))
        }
    }
}

impl Default for PrioritySet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PrioritySet {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "PrioritySet({=u32:b},{=u32:b})", self.high, self.low);
    }
}
