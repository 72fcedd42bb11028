//! Total ordering key for point events.
//!
//! [`OrderKey`] places every point event on a single timeline. Two events
//! recorded at the same millisecond and nanosecond are still strictly ordered
//! by a random UUID v4 tiebreak generated when the event is created.

use std::fmt;

use chrono::{DateTime, Utc};

/// Chronological position of a point event.
///
/// Ordering compares `epoch_millis`, then `nano_offset`, then `tiebreak`,
/// all ascending. This is the only comparator used for "oldest first".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderKey {
    epoch_millis: i64,
    nano_offset: i32,
    tiebreak: uuid::Uuid,
}

impl OrderKey {
    /// Creates an `OrderKey` from explicit coordinates.
    #[must_use]
    pub const fn new(epoch_millis: i64, nano_offset: i32, tiebreak: uuid::Uuid) -> Self {
        Self {
            epoch_millis,
            nano_offset,
            tiebreak,
        }
    }

    /// Creates an `OrderKey` for the given instant with a fresh random tiebreak.
    #[must_use]
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        #[allow(clippy::cast_possible_wrap)]
        let nano_offset = instant.timestamp_subsec_nanos() as i32;
        Self::new(instant.timestamp_millis(), nano_offset, uuid::Uuid::new_v4())
    }

    /// Creates an `OrderKey` for the current instant.
    #[must_use]
    pub fn now() -> Self {
        Self::from_instant(Utc::now())
    }

    /// Milliseconds since the Unix epoch.
    #[must_use]
    pub const fn epoch_millis(&self) -> i64 {
        self.epoch_millis
    }

    /// Nanosecond-of-second component.
    #[must_use]
    pub const fn nano_offset(&self) -> i32 {
        self.nano_offset
    }

    /// Random tiebreak with no meaning beyond ordering.
    #[must_use]
    pub const fn tiebreak(&self) -> &uuid::Uuid {
        &self.tiebreak
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:09}#{}",
            self.epoch_millis, self.nano_offset, self.tiebreak
        )
    }
}
