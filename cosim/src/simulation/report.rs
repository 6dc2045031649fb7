use std::fmt;

use crate::error::Error;
use crate::model::SlaveId;
use crate::observer::StepNumber;
use crate::simulation::{SlaveFailure, SlaveState};
use crate::time::{DisplayTime, MonotonicTime};

/// A non-fatal problem reported by a slave.
#[derive(Clone, Debug, PartialEq)]
pub struct Warning {
    /// Simulation time at which the problem occurred.
    pub time: MonotonicTime,
    /// Description of the problem.
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", DisplayTime(self.time), self.message)
    }
}

/// The status of an execution.
#[derive(Clone, Debug, PartialEq)]
pub enum RunOutcome {
    /// The execution can still be stepped.
    Running,
    /// The simulation was ended normally.
    Completed,
    /// The simulation was cancelled.
    Cancelled,
    /// The simulation was aborted because of the failure of a slave.
    Aborted(SlaveFailure),
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Running => f.write_str("running"),
            RunOutcome::Completed => f.write_str("completed"),
            RunOutcome::Cancelled => f.write_str("cancelled"),
            RunOutcome::Aborted(failure) => write!(f, "aborted ({failure})"),
        }
    }
}

/// The final status of a slave.
#[derive(Clone, Debug, PartialEq)]
pub struct SlaveReport {
    /// Slave identifier.
    pub id: SlaveId,
    /// Slave name.
    pub name: String,
    /// Lifecycle state.
    pub state: SlaveState,
    /// The failure that broke the slave, if any.
    pub failure: Option<SlaveFailure>,
    /// Non-fatal problems, in chronological order.
    pub warnings: Vec<Warning>,
}

impl SlaveReport {
    /// Returns the error that broke the slave, if any.
    pub fn error(&self) -> Option<&Error> {
        self.failure.as_ref().map(|failure| &failure.error)
    }
}

/// A summary of an execution.
///
/// A report can be requested at any time, including after the execution
/// was aborted, in which case it reflects the partial results.
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    /// Name of the execution.
    pub execution_name: String,
    /// Status of the execution.
    pub outcome: RunOutcome,
    /// Start time of the simulation.
    pub start_time: MonotonicTime,
    /// Simulation time reached.
    pub end_time: MonotonicTime,
    /// Number of completed steps.
    pub steps: StepNumber,
    /// Status of each slave, in registration order.
    pub slaves: Vec<SlaveReport>,
}

impl RunReport {
    /// Returns the report of the slave with the given name.
    pub fn slave(&self, name: &str) -> Option<&SlaveReport> {
        self.slaves.iter().find(|slave| slave.name == name)
    }

    /// Returns an iterator over the reports of broken slaves.
    pub fn broken_slaves(&self) -> impl Iterator<Item = &SlaveReport> + '_ {
        self.slaves
            .iter()
            .filter(|slave| slave.state == SlaveState::Broken)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "execution '{}' {} after {} step(s), from {} to {}",
            self.execution_name,
            self.outcome,
            self.steps,
            DisplayTime(self.start_time),
            DisplayTime(self.end_time)
        )?;
        for slave in &self.slaves {
            write!(f, "  {} '{}': {}", slave.id, slave.name, slave.state)?;
            if let Some(error) = slave.error() {
                write!(f, " ({error})")?;
            }
            writeln!(f)?;
            for warning in &slave.warnings {
                writeln!(f, "    warning: {warning}")?;
            }
        }

        Ok(())
    }
}
