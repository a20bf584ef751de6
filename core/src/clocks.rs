// Rideshare
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Sources of the current time.

use time::OffsetDateTime;

/// Generic definition of a clock.
///
/// Every timestamp recorded by the services (token issuance, ride creation and ride lifecycle
/// transitions) comes from a clock so that tests can control time.
pub trait Clock {
    /// Returns the current UTC time.
    fn now_utc(&self) -> OffsetDateTime;
}

/// Clock implementation that uses the system clock.
#[derive(Clone, Default)]
pub struct SystemClock {}

impl Clock for SystemClock {
    fn now_utc(&self) -> OffsetDateTime {
        // PostgreSQL timestamps only have microsecond resolution.  Truncate here so that values
        // read back from the database compare equal to the ones we wrote.
        let now = OffsetDateTime::now_utc();
        let micros = now.nanosecond() / 1000 * 1000;
        now.replace_nanosecond(micros).unwrap_or(now)
    }
}

/// Test utilities.
#[cfg(any(test, feature = "testutils"))]
pub mod testutils {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// A clock that returns a fixed instant until it is told otherwise.
    #[derive(Debug)]
    pub struct SettableClock {
        /// Current fake time.
        now: Mutex<OffsetDateTime>,
    }

    impl SettableClock {
        /// Creates a new clock that returns `now` until reconfigured with `set`.
        pub fn new(now: OffsetDateTime) -> Self {
            assert_eq!(0, now.nanosecond() % 1000, "Nanosecond precision not supported");
            Self { now: Mutex::new(now) }
        }

        /// Sets the new value of `now` that the clock returns.
        pub fn set(&self, now: OffsetDateTime) {
            assert_eq!(0, now.nanosecond() % 1000, "Nanosecond precision not supported");
            *self.now.lock().unwrap() = now;
        }

        /// Advances the current time by `delta`.
        pub fn advance(&self, delta: Duration) {
            assert_eq!(0, delta.subsec_nanos() % 1000, "Nanosecond precision not supported");
            let mut now = self.now.lock().unwrap();
            *now += delta;
        }
    }

    impl Clock for SettableClock {
        fn now_utc(&self) -> OffsetDateTime {
            *self.now.lock().unwrap()
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_systemclock_moves_forward() {
        let clock = SystemClock::default();
        let now1 = clock.now_utc();
        let now2 = clock.now_utc();
        assert!(now2 >= now1);
    }

    #[test]
    fn test_systemclock_microsecond_resolution() {
        let now = SystemClock::default().now_utc();
        assert_eq!(0, now.nanosecond() % 1000);
    }
}
