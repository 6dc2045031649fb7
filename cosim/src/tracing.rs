//! Support for structured logging.
//!
//! # Overview
//!
//! The engine emits [`tracing`] events at the main stages of an execution:
//!
//! * `INFO` when a simulation is initialized and when it terminates,
//! * `DEBUG` at the beginning of each step,
//! * `WARN` when a slave rejects some input values, when a step is retried
//!   with a shorter duration, when a value is written to a broken slave and
//!   when the simulation clock lags behind,
//! * `ERROR` when a slave breaks and when an execution is aborted.
//!
//! Events relating to a slave carry a `slave` field with the slave name.
//!
//! These events are emitted whether or not the `tracing` feature is
//! activated; the feature only provides the [`SimulationTime`] timer, which
//! can be used with
//! [`tracing-subscriber`](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/)
//! to stamp events with the simulation time rather than the wall clock time.
//!
//! # Time-stamping with the simulation time
//!
//! The simulation time is recorded per thread: events emitted by the thread
//! driving the simulation are stamped with the time of the last
//! synchronization point, and events emitted by a slave while it is stepped,
//! including on its worker thread, are stamped with the start time of the
//! step. Events emitted outside of a simulation are stamped with a
//! placeholder.
//!
//! ```
//! use cosim::tracing::SimulationTime;
//!
//! tracing_subscriber::fmt()
//!     .with_timer(SimulationTime::new())
//!     .with_max_level(tracing::Level::INFO)
//!     .init();
//! ```
//!
//! A typical log line then reads:
//!
//! ```text
//! 12.500000000s  WARN cosim::simulation::slave_handle: step rejected and retried with a shorter duration slave=plant rejections=1 accepted_step=250ms
//! ```
use std::fmt;

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

use crate::time::{current_time, DisplayTime};

/// A timer for `tracing-subscriber` that stamps events with the simulation
/// time.
#[derive(Copy, Clone, Debug)]
pub struct SimulationTime {
    placeholder: &'static str,
}

impl SimulationTime {
    /// Creates a timer that stamps events emitted outside of a simulation
    /// with `--`.
    pub fn new() -> Self {
        Self { placeholder: "--" }
    }

    /// Sets the text printed for events emitted outside of a simulation.
    pub fn with_placeholder(mut self, placeholder: &'static str) -> Self {
        self.placeholder = placeholder;

        self
    }
}

impl Default for SimulationTime {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatTime for SimulationTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        match current_time() {
            Some(time) => write!(w, "{}", DisplayTime(time)),
            None => w.write_str(self.placeholder),
        }
    }
}
