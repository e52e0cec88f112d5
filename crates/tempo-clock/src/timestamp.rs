use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// An absolute point in time, in signed nanoseconds.
///
/// For wall clocks the zero value is the Unix epoch; for monotonic and fake
/// clocks it is whatever epoch the clock itself uses. Negative values are
/// valid (times before the epoch).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_nanos(ns: i64) -> Self {
        Self(ns)
    }

    /// Returns the timestamp as integer nanoseconds.
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Adds `d_ns` nanoseconds (which may be negative), saturating at the
    /// `i64` range.
    pub const fn add_ns(self, d_ns: i64) -> Self {
        Self(self.0.saturating_add(d_ns))
    }

    /// Returns `self - other` in nanoseconds.
    pub const fn sub_ns(self, other: Timestamp) -> i64 {
        self.0.saturating_sub(other.0)
    }

    /// Converts to a [`SystemTime`] relative to the Unix epoch.
    pub fn to_system_time(self) -> SystemTime {
        if self.0 >= 0 {
            UNIX_EPOCH + Duration::from_nanos(self.0 as u64)
        } else {
            UNIX_EPOCH - Duration::from_nanos(self.0.unsigned_abs())
        }
    }

    /// Converts from a [`SystemTime`], saturating outside the `i64`
    /// nanosecond range (~±292 years around the Unix epoch).
    pub fn from_system_time(t: SystemTime) -> Self {
        match t.duration_since(UNIX_EPOCH) {
            Ok(d) => Self(i64::try_from(d.as_nanos()).unwrap_or(i64::MAX)),
            Err(e) => {
                let before = e.duration();
                Self(i64::try_from(before.as_nanos()).map_or(i64::MIN, |ns| -ns))
            }
        }
    }
}

impl Add<i64> for Timestamp {
    type Output = Timestamp;

    fn add(self, d_ns: i64) -> Timestamp {
        self.add_ns(d_ns)
    }
}

impl AddAssign<i64> for Timestamp {
    fn add_assign(&mut self, d_ns: i64) {
        *self = self.add_ns(d_ns);
    }
}

impl Sub<i64> for Timestamp {
    type Output = Timestamp;

    fn sub(self, d_ns: i64) -> Timestamp {
        self.add_ns(d_ns.saturating_neg())
    }
}

impl SubAssign<i64> for Timestamp {
    fn sub_assign(&mut self, d_ns: i64) {
        *self = *self - d_ns;
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = i64;

    fn sub(self, other: Timestamp) -> i64 {
        self.sub_ns(other)
    }
}

impl From<i64> for Timestamp {
    fn from(ns: i64) -> Self {
        Self(ns)
    }
}

impl From<SystemTime> for Timestamp {
    fn from(t: SystemTime) -> Self {
        Self::from_system_time(t)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}
