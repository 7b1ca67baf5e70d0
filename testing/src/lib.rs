//! # Carpool Testing
//!
//! Testing utilities for the carpool invitation services.
//!
//! This crate provides:
//! - Deterministic [`Clock`] implementations
//! - A one-shot tracing initializer for test output
//!
//! ## Example
//!
//! ```
//! use carpool_testing::mocks::{test_clock, AdjustableClock};
//! use carpool_core::environment::Clock;
//! use chrono::Duration;
//!
//! let clock = AdjustableClock::new(test_clock().now());
//! let start = clock.now();
//! clock.advance(Duration::days(8));
//! assert_eq!(clock.now() - start, Duration::days(8));
//! ```

use carpool_core::environment::Clock;
use chrono::{DateTime, Duration, Utc};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Duration, Utc};
    use std::sync::{Arc, RwLock};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use carpool_testing::mocks::FixedClock;
    /// use carpool_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that stands still until a test moves it.
    ///
    /// Clones share the same instant, so a test can keep one handle and
    /// hand another to the service under test.
    #[derive(Debug, Clone)]
    pub struct AdjustableClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl AdjustableClock {
        /// Create a clock frozen at `time`.
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Move the clock forward (or backward, with a negative duration).
        pub fn advance(&self, by: Duration) {
            let mut guard = self
                .time
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *guard += by;
        }

        /// Jump to an absolute instant.
        pub fn set(&self, time: DateTime<Utc>) {
            let mut guard = self
                .time
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *guard = time;
        }
    }

    impl Clock for AdjustableClock {
        fn now(&self) -> DateTime<Utc> {
            *self
                .time
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Test helpers
pub mod helpers {
    use std::sync::Once;

    static INIT: Once = Once::new();

    /// Install a test-friendly tracing subscriber once per process.
    ///
    /// Honors `RUST_LOG`; defaults to `warn` so passing suites stay quiet.
    pub fn init_test_tracing() {
        INIT.call_once(|| {
            let filter = tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_test_writer()
                .try_init();
        });
    }
}

// Re-export commonly used items
pub use mocks::{test_clock, AdjustableClock, FixedClock};
