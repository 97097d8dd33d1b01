//! Time as tokens see it: whole seconds since the Unix epoch
//!
//! Issuance and verification never read `SystemTime` directly; they go
//! through the [`Clock`] trait so expiry behavior can be pinned in tests
//! without sleeping or stubbing the OS.

use std::{
    ops::Add,
    time::{Duration, SystemTime},
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A second-resolution timestamp, as carried by the `exp` claim
///
/// Wraps the count of seconds since 1970-01-01T00:00:00Z. Arithmetic
/// saturates rather than wrapping, so an absurd configured lifetime yields
/// a far-future expiry instead of a panic or a token that is born dead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Ord, PartialOrd)]
#[repr(transparent)]
pub struct UnixTime(pub u64);

impl From<SystemTime> for UnixTime {
    #[inline]
    fn from(t: SystemTime) -> Self {
        // A system clock before the epoch clamps to the epoch.
        let secs = t
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());

        UnixTime(secs)
    }
}

impl Add<Duration> for UnixTime {
    type Output = UnixTime;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        UnixTime(self.0.saturating_add(rhs.as_secs()))
    }
}

// On the wire the timestamp is a bare integer, not a struct.
impl Serialize for UnixTime {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for UnixTime {
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u64::deserialize(deserializer).map(Self)
    }
}

/// A source of the current time
pub trait Clock {
    /// The current time according to this source
    fn now(&self) -> UnixTime;
}

/// The operating system's wall clock
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct System;

impl Clock for System {
    #[inline]
    fn now(&self) -> UnixTime {
        UnixTime::from(SystemTime::now())
    }
}

/// A clock that only moves when a test tells it to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TestClock(UnixTime);

impl Clock for TestClock {
    #[inline]
    fn now(&self) -> UnixTime {
        self.0
    }
}

impl TestClock {
    /// Constructs a clock frozen at `time`
    #[inline]
    pub const fn new(time: UnixTime) -> Self {
        Self(time)
    }

    /// Jumps the clock to `val`
    pub fn set(&mut self, val: UnixTime) {
        self.0 = val;
    }

    /// Moves the clock forward by `inc` seconds
    pub fn inc(&mut self, inc: u64) {
        (self.0).0 = (self.0).0.saturating_add(inc);
    }
}
