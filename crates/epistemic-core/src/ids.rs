// epistemic-core/src/ids.rs
// ============================================================================
// Module: Identifier & Clock Service
// Description: Opaque prefixed identifiers and a monotonic UTC clock.
// Purpose: Give every downstream store a uniform, collision-free identifier
// scheme and a time source that tests can control.
// Dependencies: std::sync::atomic, serde
// ============================================================================

//! ## Overview
//! Every record in the engine is addressed by an opaque, prefixed string id
//! (`ku_...`, `ev_...`, `wi_...`, ...). Ids are generated by [`IdGenerator`],
//! which is safe to share across threads. Time is read through [`Clock`]
//! rather than directly from the OS so tests can replay deterministic
//! sequences; [`SystemClock`] is the production implementation and
//! [`ManualClock`] is the test double.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Instant
// ============================================================================

/// A UTC instant expressed as milliseconds since the Unix epoch.
///
/// # Invariants
/// - Never negative once produced by a [`Clock`]; callers constructing one
///   directly (e.g. from a persisted snapshot) are responsible for that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instant(i64);

impl Instant {
    /// Constructs an instant from raw Unix milliseconds.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the instant as Unix milliseconds.
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Returns the whole number of milliseconds elapsed between `earlier` and
    /// `self`, saturating at zero when `self` is not after `earlier`.
    #[must_use]
    pub const fn millis_since(self, earlier: Self) -> u64 {
        let delta = self.0 - earlier.0;
        if delta <= 0 { 0 } else { delta as u64 }
    }

    /// Returns a new instant offset forward by `millis`.
    #[must_use]
    pub const fn plus_millis(self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis as i64))
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Time source for the engine.
///
/// Pure logic (status derivation, priority scoring, rule checks) must never
/// read wall-clock time directly; it takes an [`Instant`] produced by a
/// `Clock` so that tests can replay deterministic sequences.
pub trait Clock: Send + Sync {
    /// Returns the current instant. Successive calls on the same `Clock`
    /// never go backwards.
    fn now(&self) -> Instant;
}

/// Wall-clock backed [`Clock`] that also guarantees monotonicity by
/// clamping against the last value it returned.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicI64,
}

impl SystemClock {
    /// Creates a new system clock.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }

    /// Reads the OS clock, falling back to zero if it reports a time before
    /// the Unix epoch.
    fn read_os_millis() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        let observed = Self::read_os_millis();
        let mut previous = self.last.load(Ordering::Acquire);
        loop {
            let candidate = observed.max(previous + 1).max(previous);
            let candidate = if candidate <= previous { previous + 1 } else { observed.max(previous) };
            match self.last.compare_exchange_weak(
                previous,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Instant::from_millis(candidate),
                Err(actual) => previous = actual,
            }
        }
    }
}

/// Deterministic [`Clock`] for tests: starts at a fixed instant and only
/// advances when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<i64>>,
}

impl ManualClock {
    /// Creates a manual clock starting at `start`.
    #[must_use]
    pub fn new(start: Instant) -> Self {
        Self {
            inner: Arc::new(Mutex::new(start.as_millis())),
        }
    }

    /// Advances the clock by `millis` and returns the new instant.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex has been poisoned by a prior panic.
    pub fn advance(&self, millis: u64) -> Instant {
        let mut guard = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = guard.saturating_add(millis as i64);
        Instant::from_millis(*guard)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let guard = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Instant::from_millis(*guard)
    }
}

// ============================================================================
// SECTION: Identifier Generation
// ============================================================================

const BASE36_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Encodes `value` as a lowercase base-36 string with no leading zero
/// padding (other than a single `"0"` for the value zero).
#[must_use]
fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::with_capacity(13);
    while value > 0 {
        let digit = (value % 36) as usize;
        digits.push(BASE36_ALPHABET[digit]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Deterministic, non-cryptographic mixing function (splitmix64) used to
/// turn a monotonically increasing counter into a well-distributed suffix.
/// The engine has no cryptographic-identity requirement; uniqueness under
/// concurrent calls is guaranteed by the counter, not by this mixing step.
const fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Generates collision-free opaque identifiers of the form
/// `<prefix>_<time36>_<rand6>`.
///
/// # Invariants
/// - Safe to share across threads; every call observes a fresh counter value.
/// - Output is unique under concurrent calls because the counter is strictly
///   increasing and injective into the rand6 suffix.
#[derive(Debug, Default)]
pub struct IdGenerator {
    counter: AtomicU64,
}

impl IdGenerator {
    /// Creates a new identifier generator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// Generates a new id with the given prefix, timestamped by `clock`.
    ///
    /// Uniqueness under concurrent calls is guaranteed by folding a strictly
    /// increasing counter through `splitmix64`, a bijection on 64-bit values:
    /// distinct counter values always produce a distinct suffix, unlike a
    /// plain hash-and-truncate which could collide.
    #[must_use]
    pub fn new_id(&self, prefix: &str, clock: &dyn Clock) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let time36 = to_base36(clock.now().as_millis().unsigned_abs());
        let suffix = to_base36(splitmix64(seq));
        let rand6 = format!("{suffix:0>6}");
        format!("{prefix}_{time36}_{rand6}")
    }
}

/// Shared, clonable handle to an [`IdGenerator`] and a [`Clock`].
///
/// Every store that needs identifiers or instants takes a `Services` handle
/// rather than constructing its own generator, so a whole engine shares one
/// counter and one time source.
#[derive(Clone)]
pub struct Services {
    /// Shared identifier generator.
    pub ids: Arc<IdGenerator>,
    /// Shared clock.
    pub clock: Arc<dyn Clock>,
}

impl Services {
    /// Builds a production services handle backed by [`SystemClock`].
    #[must_use]
    pub fn system() -> Self {
        Self {
            ids: Arc::new(IdGenerator::new()),
            clock: Arc::new(SystemClock::new()),
        }
    }

    /// Builds a services handle backed by the given clock (typically a
    /// [`ManualClock`] in tests).
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            ids: Arc::new(IdGenerator::new()),
            clock,
        }
    }

    /// Generates a new id with the given prefix.
    #[must_use]
    pub fn new_id(&self, prefix: &str) -> String {
        self.ids.new_id(prefix, self.clock.as_ref())
    }

    /// Returns the current instant.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.clock.now()
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services").field("ids", &self.ids).finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_under_many_sequential_calls() {
        let services = Services::with_clock(Arc::new(ManualClock::new(Instant::from_millis(1000))));
        let mut seen = std::collections::HashSet::new();
        for _ in 0..5000 {
            let id = services.new_id("ku");
            assert!(seen.insert(id), "id generator produced a duplicate");
        }
    }

    #[test]
    fn ids_carry_the_requested_prefix() {
        let services = Services::with_clock(Arc::new(ManualClock::new(Instant::from_millis(1000))));
        let id = services.new_id("ev");
        assert!(id.starts_with("ev_"));
        assert_eq!(id.split('_').count(), 3);
    }

    #[test]
    fn manual_clock_never_goes_backwards() {
        let clock = ManualClock::new(Instant::from_millis(100));
        let t0 = clock.now();
        let t1 = clock.advance(50);
        assert!(t1 >= t0);
    }

    #[test]
    fn system_clock_is_monotonic_across_calls() {
        let clock = SystemClock::new();
        let mut previous = clock.now();
        for _ in 0..1000 {
            let next = clock.now();
            assert!(next >= previous);
            previous = next;
        }
    }
}
