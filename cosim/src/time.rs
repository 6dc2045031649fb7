//! Simulation time and clocks.
//!
//! This module provides:
//!
//! * [`MonotonicTime`]: a monotonic timestamp based on the [TAI] time
//!   standard, used for all absolute simulation time points,
//! * [`ETERNITY`]: the stop time of executions without a defined end,
//! * [`Clock`]: a trait for types that can synchronize a simulation to an
//!   external time reference, implemented by [`NoClock`], [`SystemClock`] and
//!   [`AutoSystemClock`].
//!
//! Time intervals are plain [`std::time::Duration`]s.
//!
//! [TAI]: https://en.wikipedia.org/wiki/International_Atomic_Time
//!
//! # Examples
//!
//! An execution running ten times faster than the wall clock:
//!
//! ```
//! use cosim::simulation::SimInit;
//! use cosim::time::AutoSystemClock;
//!
//! let init = SimInit::new().set_clock(AutoSystemClock::new().with_real_time_factor(10.0));
//! # drop(init);
//! ```
mod clock;

use std::cell::Cell;
use std::fmt;

pub use clock::{AutoSystemClock, Clock, NoClock, SyncStatus, SystemClock};
pub use tai_time::MonotonicTime;

/// The stop time of an execution without a defined end.
pub const ETERNITY: Option<MonotonicTime> = None;

thread_local! {
    /// Simulation time of the step being processed by the current thread.
    static CURRENT_TIME: Cell<Option<MonotonicTime>> = const { Cell::new(None) };
}

/// Records the simulation time of the step processed by the current thread.
pub(crate) fn set_current_time(time: Option<MonotonicTime>) {
    CURRENT_TIME.with(|t| t.set(time));
}

/// Returns the simulation time of the step processed by the current thread,
/// if any.
#[cfg_attr(not(feature = "tracing"), allow(dead_code))]
pub(crate) fn current_time() -> Option<MonotonicTime> {
    CURRENT_TIME.with(|t| t.get())
}

/// Formats a time point as seconds elapsed since the epoch.
pub(crate) struct DisplayTime(pub(crate) MonotonicTime);

impl fmt::Display for DisplayTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.as_secs();
        let nanos = self.0.subsec_nanos();
        if secs < 0 && nanos > 0 {
            write!(f, "-{}.{:09}s", -(secs + 1), 1_000_000_000 - nanos)
        } else {
            write!(f, "{}.{:09}s", secs, nanos)
        }
    }
}
