use std::io;
use std::time::Duration;

use crate::error::{Errc, Error};
use crate::simulation::dispatcher::CallError;
use crate::time::{DisplayTime, MonotonicTime};

/// Consequence of a failure on the execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// The failure is recorded but the slave keeps running.
    Warning,
    /// The slave is broken; whether the execution continues is decided by
    /// the [`FailurePolicy`](crate::simulation::FailurePolicy).
    FatalToSlave,
    /// The execution cannot continue.
    FatalToRun,
}

/// The part of the execution in which a failure occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Slave setup, initialization and start of the simulation.
    Configuration,
    /// Stepping, variable exchange and end of the simulation.
    Simulation,
}

/// Why a rejected step could not be recovered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Rejection {
    /// The retry policy is disabled.
    RetryDisabled,
    /// The slave does not declare the ability to retry a step.
    CannotRetry,
    /// The minimum step duration or the attempt budget was reached.
    Exhausted {
        /// Number of rejected attempts.
        attempts: u32,
        /// Duration of the last rejected attempt.
        last: Duration,
    },
}

/// A raw failure signal collected by a slave handle.
#[derive(Clone, Debug)]
pub(crate) enum FailureSignal {
    /// The slave returned an error.
    Error(Error),
    /// The slave rejected a step with no possible recourse.
    StepRejected {
        /// Time at which the rejected attempt started.
        time: MonotonicTime,
        /// Cause.
        cause: Rejection,
    },
    /// The slave ignored some of the values written to it.
    SetRejected,
    /// The call overran the call timeout.
    Timeout(Duration),
    /// The slave panicked.
    Panic(String),
    /// The worker thread owning the slave is gone.
    Disconnected,
}

impl From<CallError> for FailureSignal {
    fn from(e: CallError) -> Self {
        match e {
            CallError::Timeout(timeout) => FailureSignal::Timeout(timeout),
            CallError::Panic(message) => FailureSignal::Panic(message),
            CallError::Disconnected => FailureSignal::Disconnected,
        }
    }
}

/// A failure mapped onto the error taxonomy.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Fault {
    pub(crate) error: Error,
    pub(crate) severity: Severity,
}

impl Fault {
    pub(crate) fn is_fatal(&self) -> bool {
        self.severity != Severity::Warning
    }
}

/// Maps a failure signal onto an error code and a severity.
///
/// Any failure other than a set rejection is fatal to the slave, and becomes
/// fatal to the run when it occurs before the simulation has started.
pub(crate) fn translate(signal: FailureSignal, phase: Phase) -> Fault {
    let error = match signal {
        FailureSignal::SetRejected => {
            return Fault {
                error: Error::with_message(
                    Errc::ModelError,
                    "some variable values were rejected by the slave",
                ),
                severity: Severity::Warning,
            };
        }
        FailureSignal::Error(error) => error,
        FailureSignal::StepRejected { time, cause } => rejection_error(time, cause),
        FailureSignal::Timeout(timeout) => Error::with_message(
            io::ErrorKind::TimedOut,
            format!("the slave did not respond within {timeout:?}"),
        ),
        FailureSignal::Panic(message) => {
            Error::with_message(Errc::ModelError, format!("the slave panicked: {message}"))
        }
        FailureSignal::Disconnected => Error::with_message(
            io::ErrorKind::BrokenPipe,
            "the slave worker thread has terminated",
        ),
    };

    let severity = match phase {
        Phase::Configuration => Severity::FatalToRun,
        Phase::Simulation => Severity::FatalToSlave,
    };

    Fault { error, severity }
}

fn rejection_error(time: MonotonicTime, cause: Rejection) -> Error {
    let at = DisplayTime(time);
    match cause {
        Rejection::RetryDisabled => Error::with_message(
            Errc::ModelError,
            format!("step rejected at {at} and step retry is disabled"),
        ),
        Rejection::CannotRetry => Error::with_message(
            Errc::UnsupportedFeature,
            format!("step rejected at {at} by a slave that cannot retry steps"),
        ),
        Rejection::Exhausted { attempts, last } => Error::with_message(
            Errc::ModelError,
            format!("step rejected at {at} after {attempts} attempt(s), the last one of {last:?}"),
        ),
    }
}
