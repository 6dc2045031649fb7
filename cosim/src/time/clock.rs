use std::time::{Duration, Instant};

use crate::time::MonotonicTime;

/// A type that can be used to synchronize a simulation.
///
/// This trait abstracts over different types of clocks, such as
/// as-fast-as-possible and real-time clocks.
///
/// A clock can be associated to a simulation prior to initialization by
/// calling [`SimInit::set_clock`](crate::simulation::SimInit::set_clock).
pub trait Clock: Send + 'static {
    /// Blocks until the deadline.
    fn synchronize(&mut self, deadline: MonotonicTime) -> SyncStatus;
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn synchronize(&mut self, deadline: MonotonicTime) -> SyncStatus {
        (**self).synchronize(deadline)
    }
}

/// The current synchronization status of a clock.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    /// The clock is synchronized.
    Synchronized,
    /// The deadline has already elapsed and lags behind the current clock
    /// time by the duration given in the payload.
    OutOfSync(Duration),
}

/// A dummy [`Clock`] that ignores synchronization.
///
/// Choosing this clock effectively makes the simulation run as fast as
/// possible.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoClock {}

impl NoClock {
    /// Constructs a new `NoClock` object.
    pub fn new() -> Self {
        Self {}
    }
}

impl Clock for NoClock {
    /// Returns immediately with status `SyncStatus::Synchronized`.
    fn synchronize(&mut self, _: MonotonicTime) -> SyncStatus {
        SyncStatus::Synchronized
    }
}

/// A real-time [`Clock`] based on the system's monotonic clock.
///
/// This clock accepts an arbitrary reference time and remains synchronized
/// with the system's monotonic clock, scaled by an optional real-time
/// factor.
#[derive(Copy, Clone, Debug)]
pub struct SystemClock {
    wall_clock_ref: Instant,
    simulation_ref: MonotonicTime,
    real_time_factor: f64,
}

impl SystemClock {
    /// Constructs a `SystemClock` with an offset between simulation clock and
    /// wall clock specified by a simulation time matched to an [`Instant`]
    /// timestamp.
    pub fn from_instant(simulation_ref: MonotonicTime, wall_clock_ref: Instant) -> Self {
        Self {
            wall_clock_ref,
            simulation_ref,
            real_time_factor: 1.0,
        }
    }

    /// Scales the passing of simulation time relative to the wall clock.
    ///
    /// A factor of `2.0` makes the simulation run twice as fast as the wall
    /// clock.
    ///
    /// # Panics
    ///
    /// Panics if the factor is not strictly positive and finite.
    pub fn with_real_time_factor(mut self, real_time_factor: f64) -> Self {
        assert!(
            real_time_factor.is_finite() && real_time_factor > 0.0,
            "the real-time factor must be strictly positive and finite"
        );
        self.real_time_factor = real_time_factor;
        self
    }

    /// Returns the wall clock instant matching the given simulation time.
    fn wall_clock_time(&self, deadline: MonotonicTime) -> Instant {
        if deadline <= self.simulation_ref {
            return self.wall_clock_ref;
        }
        let simulation_elapsed = deadline.duration_since(self.simulation_ref);

        self.wall_clock_ref + simulation_elapsed.div_f64(self.real_time_factor)
    }
}

impl Clock for SystemClock {
    /// Blocks until the system time corresponds to the specified simulation
    /// time.
    fn synchronize(&mut self, deadline: MonotonicTime) -> SyncStatus {
        let target = self.wall_clock_time(deadline);
        let now = Instant::now();

        if target > now {
            spin_sleep::sleep(target - now);

            SyncStatus::Synchronized
        } else {
            SyncStatus::OutOfSync(now - target)
        }
    }
}

/// An automatically initialized real-time [`Clock`] based on the system's
/// monotonic clock.
///
/// This clock is similar to [`SystemClock`] except that the first call to
/// [`synchronize()`](Clock::synchronize) never blocks and implicitly defines
/// the reference time. In other words, the clock starts running on its first
/// invocation.
#[derive(Copy, Clone, Debug)]
pub struct AutoSystemClock {
    inner: Option<SystemClock>,
    real_time_factor: f64,
}

impl AutoSystemClock {
    /// Constructs a new `AutoSystemClock`.
    pub fn new() -> Self {
        Self {
            inner: None,
            real_time_factor: 1.0,
        }
    }

    /// Scales the passing of simulation time relative to the wall clock.
    ///
    /// # Panics
    ///
    /// Panics if the factor is not strictly positive and finite.
    pub fn with_real_time_factor(mut self, real_time_factor: f64) -> Self {
        assert!(
            real_time_factor.is_finite() && real_time_factor > 0.0,
            "the real-time factor must be strictly positive and finite"
        );
        self.real_time_factor = real_time_factor;
        self
    }
}

impl Default for AutoSystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for AutoSystemClock {
    /// Initializes the time reference and returns immediately on the first
    /// call, otherwise blocks until the system time corresponds to the
    /// specified simulation time.
    fn synchronize(&mut self, deadline: MonotonicTime) -> SyncStatus {
        match &mut self.inner {
            None => {
                self.inner = Some(
                    SystemClock::from_instant(deadline, Instant::now())
                        .with_real_time_factor(self.real_time_factor),
                );

                SyncStatus::Synchronized
            }
            Some(clock) => clock.synchronize(deadline),
        }
    }
}
