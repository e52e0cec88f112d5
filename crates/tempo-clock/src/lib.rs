//! Pluggable clocks with deterministic virtual time for tests.
//!
//! Code that tells time through the [`Clock`] trait can run against the real
//! monotonic or wall clock in production and against a manually-driven
//! [`FakeClock`] in unit tests, where a call to [`FakeClock::advance`]
//! delivers timers and tickers synchronously and deterministically.
//!
//! All durations and instants are signed `i64` nanoseconds; [`Timestamp`]
//! wraps an instant for when the distinction matters.
//!
//! ```
//! use std::sync::Arc;
//! use tempo_clock::{Clock, FakeClock};
//!
//! let clock = FakeClock::new();
//! let timer = clock.new_timer(1_000);
//! let ticks = timer.ticks().unwrap();
//!
//! clock.advance(999);
//! assert!(ticks.try_recv().is_none());
//! clock.advance(1);
//! assert!(ticks.try_recv().is_some());
//!
//! // The same code path works against real time.
//! let _real: Arc<dyn Clock> = Arc::new(tempo_clock::MonotonicClock::new());
//! ```

mod channel;
mod clock;
mod error;
mod fake;
mod hooks;
mod real;
mod stopwatch;
mod throttled;
mod timer;
mod timestamp;

pub use channel::Ticks;
pub use clock::{Clock, ClockBuilder, MonotonicClock, NanotimeFn, TimeFn, WallClock};
pub use error::Error;
pub use fake::FakeClock;
pub use hooks::{Hook, HookEventFn, HookFilter, HookStopFn};
pub use stopwatch::{Stopwatch, StopwatchOptions};
pub use throttled::ThrottledClock;
pub use timer::{Ticker, Timer};
pub use timestamp::Timestamp;
