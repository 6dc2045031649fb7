//! Co-simulation management.
//!
//! This module contains most notably the [`Simulation`] environment, the
//! [`SimInit`] simulation builder and the execution policies gathered in
//! [`ExecutionConfig`].
//!
//! # Simulation lifecycle
//!
//! The lifecycle of a co-simulation goes through the following stages:
//!
//! 1. instantiation of slaves and registration with [`SimInit::add_slave`],
//! 2. declaration of the connections between slave outputs and inputs with
//!    [`SimInit::connect`], and optionally of initial values, observed
//!    variables and observers,
//! 3. initialization of the simulation with [`SimInit::init`], which sets
//!    up all slaves, writes the initial values, propagates the initial
//!    outputs and starts the simulation,
//! 4. stepping with [`Simulation::step`], [`Simulation::step_until`] or
//!    [`Simulation::run`], while possibly overriding inputs between steps
//!    with [`Simulation::set_value`],
//! 5. termination with [`Simulation::end`].
//!
//! ```ignore
//! let mut bench = SimInit::new().with_config(ExecutionConfig {
//!     step_size: StepSizePolicy::Fixed(Duration::from_millis(10)),
//!     ..Default::default()
//! });
//!
//! let plant = bench.add_slave(plant, "plant")?;
//! let controller = bench.add_slave(controller, "controller")?;
//! bench.connect(
//!     bench.variable_id(plant, "position")?,
//!     bench.variable_id(controller, "measurement")?,
//! )?;
//! bench.connect(
//!     bench.variable_id(controller, "command")?,
//!     bench.variable_id(plant, "force")?,
//! )?;
//!
//! let t0 = MonotonicTime::EPOCH;
//! let mut simu = bench.init(t0, Some(t0 + Duration::from_secs(10)))?;
//! simu.run()?;
//! ```
//!
//! # Master algorithm
//!
//! All slaves advance in lockstep. Each step from time `t` to `t + Δt`
//! proceeds as follows:
//!
//! 1. the input values overridden since the last step are written to their
//!    slaves,
//! 2. all slaves are stepped, in parallel unless the execution mode is
//!    [`ExecutionMode::Inline`]; a slave that rejects the step may be asked to
//!    cover the interval with shorter sub-steps, see [`RetryPolicy`],
//! 3. once all slaves are done, the read set of each slave is read,
//! 4. the values of connection sources are copied to their destinations and
//!    written to the destination slaves,
//! 5. the simulation time advances to `t + Δt` and observers are notified.
//!
//! A slave whose call fails is *broken*: no further call is ever made into it
//! and the inputs connected to its outputs become
//! [`Unavailable`](crate::model::Sample::Unavailable). Depending on the
//! [`FailurePolicy`], the execution is then either aborted, or continues with
//! the remaining slaves.
//!
//! Steps have a fixed duration unless an adaptive [`StepSizePolicy`] is
//! selected. With a fixed step size, the simulation ends at the last time
//! point that does not exceed the stop time; with an adaptive step size, the
//! last step is shortened to land exactly on the stop time.
//!
//! # Cancellation
//!
//! A [`Canceller`] obtained with [`Simulation::canceller`] can be sent to
//! another thread to request the termination of a simulation. The request is
//! honored before the next step; calls into slaves are never interrupted.
mod config;
mod connection;
pub(crate) mod dispatcher;
pub(crate) mod failure;
mod report;
mod sim_init;
pub(crate) mod slave_handle;

pub use config::{ExecutionConfig, ExecutionMode, FailurePolicy, RetryPolicy, StepSizePolicy};
pub use connection::Connection;
pub use failure::Severity;
pub use report::{RunOutcome, RunReport, SlaveReport, Warning};
pub use sim_init::SimInit;
pub use slave_handle::SlaveState;

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;
use crate::model::{
    Causality, ModelDescription, Sample, SlaveId, Value, VariableId, VariableType,
};
use crate::observer::{Observer, Snapshot, StepNumber};
use crate::time::{set_current_time, Clock, DisplayTime, MonotonicTime, SyncStatus};

use connection::ConnectionGraph;
use failure::{Fault, Phase};
use slave_handle::SlaveHandle;

/// Simulation environment.
///
/// A `Simulation` is created by calling [`SimInit::init`] on a simulation
/// initializer. It owns all slaves and drives them in lockstep through
/// [`step`](Simulation::step), [`step_until`](Simulation::step_until) or
/// [`run`](Simulation::run).
///
/// A simulation that is dropped without being ended releases its slaves
/// without calling [`end_simulation`](crate::slave::Slave::end_simulation).
pub struct Simulation {
    config: ExecutionConfig,
    slaves: Vec<SlaveHandle>,
    graph: ConnectionGraph,
    observers: Vec<Box<dyn Observer>>,
    clock: Box<dyn Clock>,
    start_time: MonotonicTime,
    stop_time: Option<MonotonicTime>,
    time: MonotonicTime,
    step_number: StepNumber,
    step_size: Duration,
    outcome: RunOutcome,
    cancelled: Arc<AtomicBool>,
}

impl Simulation {
    /// Creates a new `Simulation` with the specified slaves and connections.
    pub(crate) fn new(
        config: ExecutionConfig,
        slaves: Vec<SlaveHandle>,
        graph: ConnectionGraph,
        observers: Vec<Box<dyn Observer>>,
        clock: Box<dyn Clock>,
        start_time: MonotonicTime,
        stop_time: Option<MonotonicTime>,
    ) -> Self {
        let step_size = config.step_size.initial_step_size();

        Self {
            config,
            slaves,
            graph,
            observers,
            clock,
            start_time,
            stop_time,
            time: start_time,
            step_number: 0,
            step_size,
            outcome: RunOutcome::Running,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sets up, initializes and starts all slaves.
    pub(crate) fn initialize(
        &mut self,
        initial_values: Vec<(VariableId, Value)>,
    ) -> Result<(), ConfigError> {
        tracing::info!(
            execution = %self.config.execution_name,
            slaves = self.slaves.len(),
            connections = self.graph.connections().len(),
            start_time = %DisplayTime(self.start_time),
            "initializing simulation"
        );

        for slave in &self.slaves {
            for observer in &mut self.observers {
                observer.slave_added(slave.id(), slave.name(), slave.description());
            }
        }
        for &connection in self.graph.connections() {
            for observer in &mut self.observers {
                observer.variables_connected(connection);
            }
        }

        let mode = self.config.mode;
        let call_timeout = self.config.call_timeout;
        let registered = self.slaves.iter_mut().try_for_each(|slave| {
            slave
                .register(mode, call_timeout)
                .map_err(|source| (slave.id(), source))
        });
        if let Err((slave, source)) = registered {
            for slave in &mut self.slaves {
                slave.release();
            }

            return Err(ConfigError::Spawn { slave, source });
        }

        let start_time = self.start_time;
        let stop_time = self.stop_time;
        let adaptive = self.config.step_size.is_adaptive();
        let tolerance = self.config.step_size.relative_tolerance();
        let execution_name = self.config.execution_name.clone();
        self.configure(|slave| {
            slave.setup(&execution_name, start_time, stop_time, adaptive, tolerance)
        })?;

        for (variable, value) in initial_values {
            self.slaves[variable.slave.index()].queue(variable.index, Sample::Value(value));
        }
        self.configure(|slave| slave.flush(start_time, Phase::Configuration))?;
        self.configure(|slave| slave.read(start_time, Phase::Configuration))?;
        self.propagate();
        self.configure(|slave| slave.flush(start_time, Phase::Configuration))?;
        self.configure(|slave| slave.start_simulation(start_time))?;

        let snapshot = Snapshot::new(&self.slaves);
        for observer in &mut self.observers {
            observer.simulation_initialized(0, start_time, &snapshot);
        }
        self.synchronize_clock();
        set_current_time(Some(start_time));

        Ok(())
    }

    /// Applies an initialization operation to all slaves, aborting the
    /// execution on the first failure.
    fn configure<F>(&mut self, mut f: F) -> Result<(), ConfigError>
    where
        F: FnMut(&mut SlaveHandle) -> Result<(), Fault>,
    {
        for index in 0..self.slaves.len() {
            if let Err(fault) = f(&mut self.slaves[index]) {
                let slave = &self.slaves[index];
                let failure = SlaveFailure {
                    slave: slave.id(),
                    slave_name: slave.name().to_owned(),
                    time: self.start_time,
                    error: fault.error,
                };
                for observer in &mut self.observers {
                    observer.slave_broken(&failure);
                }
                self.terminate(RunOutcome::Aborted(failure.clone()));

                return Err(ConfigError::SlaveSetup(failure));
            }
        }

        Ok(())
    }

    /// Advances simulation time by one step.
    ///
    /// If the execution has a stop time, an
    /// [`ExecutionError::EndOfSimulation`] error is returned when the next
    /// step would overrun it.
    pub fn step(&mut self) -> Result<(), ExecutionError> {
        self.check_status()?;

        let delta_t = self
            .next_step_size(self.stop_time)
            .ok_or(ExecutionError::EndOfSimulation)?;

        self.advance(delta_t)
    }

    /// Iteratively advances simulation time until the specified deadline is
    /// reached.
    ///
    /// With a fixed step size, stepping stops at the last time point that
    /// does not exceed the deadline.
    ///
    /// An [`ExecutionError::InvalidDeadline`] error is returned if the
    /// deadline is not in the future or lies beyond the stop time.
    pub fn step_until(&mut self, deadline: MonotonicTime) -> Result<(), ExecutionError> {
        self.check_running()?;
        if deadline <= self.time || self.stop_time.is_some_and(|stop| deadline > stop) {
            return Err(ExecutionError::InvalidDeadline(deadline));
        }

        loop {
            self.check_status()?;
            match self.next_step_size(Some(deadline)) {
                Some(delta_t) => self.advance(delta_t)?,
                None => return Ok(()),
            }
        }
    }

    /// Steps until the stop time is reached and ends the simulation.
    ///
    /// If the execution has no stop time, this method only returns when the
    /// simulation is cancelled or aborted.
    pub fn run(&mut self) -> Result<(), ExecutionError> {
        loop {
            match self.step() {
                Ok(()) => {}
                Err(ExecutionError::EndOfSimulation) => return self.end(),
                Err(e) => return Err(e),
            }
        }
    }

    /// Ends the simulation.
    ///
    /// The simulation is ended for all slaves that are not broken, after
    /// which the slaves are dropped. If any slave fails to end its
    /// simulation, an error is returned and the outcome records the execution
    /// as aborted.
    pub fn end(&mut self) -> Result<(), ExecutionError> {
        self.check_running()?;

        match self.terminate(RunOutcome::Completed) {
            Some(failure) => Err(ExecutionError::SlaveFailure(failure)),
            None => Ok(()),
        }
    }

    /// Returns a handle that can be used to cancel the simulation from
    /// another thread.
    pub fn canceller(&self) -> Canceller {
        Canceller(self.cancelled.clone())
    }

    /// Requests a value to be written to an input variable before the next
    /// step.
    ///
    /// The value overrides any value propagated to the variable at the end
    /// of the previous step. Values written to a broken slave are ignored.
    pub fn set_value(
        &mut self,
        variable: VariableId,
        value: impl Into<Value>,
    ) -> Result<(), SimulationError> {
        self.check_running()?;

        let value = value.into();
        let slave = self
            .slaves
            .get_mut(variable.slave.index())
            .ok_or(ConfigError::UnknownSlave(variable.slave))?;
        validate_value(slave.description(), variable, &value)?;

        if slave.is_broken() {
            tracing::warn!(
                slave = %slave.name(),
                variable = %variable,
                "value written to a broken slave ignored"
            );
        } else {
            slave.queue(variable.index, Sample::Value(value));
        }

        Ok(())
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> MonotonicTime {
        self.time
    }

    /// Returns the start time of the simulation.
    pub fn start_time(&self) -> MonotonicTime {
        self.start_time
    }

    /// Returns the stop time of the simulation, if any.
    pub fn stop_time(&self) -> Option<MonotonicTime> {
        self.stop_time
    }

    /// Returns the number of completed steps.
    pub fn step_number(&self) -> StepNumber {
        self.step_number
    }

    /// Returns the nominal duration of the next step.
    pub fn step_size(&self) -> Duration {
        self.step_size
    }

    /// Returns the status of the execution.
    pub fn outcome(&self) -> &RunOutcome {
        &self.outcome
    }

    /// Returns the identifier of the slave with the given name.
    pub fn slave_id(&self, name: &str) -> Option<SlaveId> {
        self.slaves
            .iter()
            .find(|slave| slave.name() == name)
            .map(|slave| slave.id())
    }

    /// Returns the identifier of a variable from its name.
    pub fn variable_id(&self, slave: SlaveId, name: &str) -> Result<VariableId, ConfigError> {
        let slave = self
            .slaves
            .get(slave.index())
            .ok_or(ConfigError::UnknownSlave(slave))?;

        lookup_by_name(slave.id(), slave.description(), name)
    }

    /// Returns the description of a slave.
    pub fn model_description(&self, slave: SlaveId) -> Option<&ModelDescription> {
        Some(self.slaves.get(slave.index())?.description())
    }

    /// Returns the lifecycle state of a slave.
    pub fn slave_state(&self, slave: SlaveId) -> Option<SlaveState> {
        Some(self.slaves.get(slave.index())?.state())
    }

    /// Returns `true` if the slave is broken.
    pub fn is_broken(&self, slave: SlaveId) -> bool {
        self.slaves
            .get(slave.index())
            .is_some_and(|slave| slave.is_broken())
    }

    /// Returns the error that broke a slave, if any.
    pub fn last_error(&self, slave: SlaveId) -> Option<&Error> {
        Some(&self.slaves.get(slave.index())?.failure()?.error)
    }

    /// Returns the last known sample of a variable.
    pub fn sample(&self, variable: VariableId) -> Option<&Sample> {
        self.snapshot().get(variable)
    }

    /// Returns a view of the last known variable values.
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot::new(&self.slaves)
    }

    /// Returns the connections of the execution.
    pub fn connections(&self) -> &[Connection] {
        self.graph.connections()
    }

    /// Returns a summary of the execution.
    pub fn report(&self) -> RunReport {
        RunReport {
            execution_name: self.config.execution_name.clone(),
            outcome: self.outcome.clone(),
            start_time: self.start_time,
            end_time: self.time,
            steps: self.step_number,
            slaves: self
                .slaves
                .iter()
                .map(|slave| SlaveReport {
                    id: slave.id(),
                    name: slave.name().to_owned(),
                    state: slave.state(),
                    failure: slave.failure().cloned(),
                    warnings: slave.warnings().to_vec(),
                })
                .collect(),
        }
    }

    /// Performs one step of duration `delta_t`.
    fn advance(&mut self, delta_t: Duration) -> Result<(), ExecutionError> {
        let time = self.time;
        let end = time + delta_t;
        tracing::debug!(
            step = self.step_number + 1,
            time = %DisplayTime(time),
            delta_t = ?delta_t,
            "stepping"
        );

        let faults = self.for_each_alive(|slave| slave.flush(time, Phase::Simulation));
        self.handle_faults(faults)?;

        let retry = self.config.retry;
        let pending: Vec<_> = self
            .slaves
            .iter_mut()
            .enumerate()
            .filter(|(_, slave)| slave.state() == SlaveState::Simulating)
            .map(|(index, slave)| (index, slave.begin_step(time, delta_t, retry)))
            .collect();

        let mut accepted_step: Option<Duration> = None;
        let mut faults = Vec::new();
        let mut completed = Vec::new();
        for (index, pending) in pending {
            let slave = &mut self.slaves[index];
            match slave.finish_step(pending, time) {
                Ok(report) => {
                    completed.push(slave.id());
                    let variable_step = slave
                        .description()
                        .capabilities
                        .can_handle_variable_step_size;
                    if let (true, Some(step)) = (variable_step, report.accepted_step) {
                        accepted_step = Some(accepted_step.map_or(step, |s| s.min(step)));
                    }
                }
                Err(fault) => faults.push((index, fault)),
            }
        }
        for &slave in &completed {
            for observer in &mut self.observers {
                observer.slave_step_complete(slave, self.step_number + 1, delta_t, end);
            }
        }
        self.handle_faults(faults)?;

        let faults = self.for_each_alive(|slave| slave.read(end, Phase::Simulation));
        self.handle_faults(faults)?;
        self.propagate();
        let faults = self.for_each_alive(|slave| slave.flush(end, Phase::Simulation));
        self.handle_faults(faults)?;

        self.time = end;
        self.step_number += 1;
        self.step_size = self
            .config
            .step_size
            .next_step_size(self.step_size, accepted_step);
        set_current_time(Some(end));

        let snapshot = Snapshot::new(&self.slaves);
        for observer in &mut self.observers {
            observer.step_complete(self.step_number, delta_t, end, &snapshot);
        }
        self.synchronize_clock();

        Ok(())
    }

    /// Returns the duration of the next step, or `None` if no step fits
    /// before the limit.
    fn next_step_size(&self, limit: Option<MonotonicTime>) -> Option<Duration> {
        let Some(limit) = limit else {
            return Some(self.step_size);
        };
        if limit <= self.time {
            return None;
        }
        let remaining = limit.duration_since(self.time);

        if self.config.step_size.is_adaptive() {
            Some(self.step_size.min(remaining))
        } else {
            (self.step_size <= remaining).then_some(self.step_size)
        }
    }

    /// Copies the samples of all connection sources to their destinations.
    fn propagate(&mut self) {
        let slaves = &self.slaves;
        let routed = self
            .graph
            .route(|source| slaves.get(source.slave.index())?.sample(source.index));

        for (destination, sample) in routed {
            let slave = &mut self.slaves[destination.slave.index()];
            if !slave.state().is_terminal() {
                slave.queue(destination.index, sample);
            }
        }
    }

    /// Applies an operation to all slaves that are neither broken nor ended
    /// and collects the failures.
    fn for_each_alive<F>(&mut self, mut f: F) -> Vec<(usize, Fault)>
    where
        F: FnMut(&mut SlaveHandle) -> Result<(), Fault>,
    {
        self.slaves
            .iter_mut()
            .enumerate()
            .filter(|(_, slave)| !slave.state().is_terminal())
            .filter_map(|(index, slave)| f(slave).err().map(|fault| (index, fault)))
            .collect()
    }

    /// Notifies broken slaves and aborts the execution if required by the
    /// failure policy.
    fn handle_faults(&mut self, faults: Vec<(usize, Fault)>) -> Result<(), ExecutionError> {
        let mut first_failure = None;
        let mut fatal_to_run = false;

        for (index, fault) in faults {
            fatal_to_run |= fault.severity == Severity::FatalToRun;
            if let Some(failure) = self.slaves[index].failure().cloned() {
                for observer in &mut self.observers {
                    observer.slave_broken(&failure);
                }
                first_failure.get_or_insert(failure);
            }
        }

        // Isolation ends once no slave is left simulating.
        let none_alive = !self
            .slaves
            .iter()
            .any(|slave| slave.state() == SlaveState::Simulating);

        match first_failure {
            Some(failure)
                if fatal_to_run
                    || none_alive
                    || self.config.failure_policy == FailurePolicy::Abort =>
            {
                tracing::error!("aborting simulation: {}", failure);
                self.terminate(RunOutcome::Aborted(failure.clone()));

                Err(ExecutionError::SlaveFailure(failure))
            }
            _ => Ok(()),
        }
    }

    /// Ends the simulation of all running slaves, releases all slaves and
    /// sets the final outcome.
    ///
    /// Returns the first failure that occurred while ending the slaves.
    fn terminate(&mut self, outcome: RunOutcome) -> Option<SlaveFailure> {
        let time = self.time;
        let mut first_failure = None;

        for index in 0..self.slaves.len() {
            let slave = &mut self.slaves[index];
            if slave.state() != SlaveState::Simulating {
                slave.release();
                continue;
            }
            if slave.end_simulation(time).is_err() {
                if let Some(failure) = slave.failure().cloned() {
                    for observer in &mut self.observers {
                        observer.slave_broken(&failure);
                    }
                    first_failure.get_or_insert(failure);
                }
            }
        }

        // A failure while ending turns a normal completion into an abort.
        let outcome = match (outcome, &first_failure) {
            (RunOutcome::Completed, Some(failure)) => RunOutcome::Aborted(failure.clone()),
            (outcome, _) => outcome,
        };

        tracing::info!(
            execution = %self.config.execution_name,
            outcome = %outcome,
            steps = self.step_number,
            time = %DisplayTime(time),
            "simulation terminated"
        );
        self.outcome = outcome;

        first_failure
    }

    /// Checks that the simulation is running and honors cancellation
    /// requests.
    fn check_status(&mut self) -> Result<(), ExecutionError> {
        self.check_running()?;

        if self.cancelled.load(Ordering::Relaxed) {
            tracing::info!("simulation cancelled");
            self.terminate(RunOutcome::Cancelled);

            return Err(ExecutionError::Halted);
        }

        Ok(())
    }

    fn check_running(&self) -> Result<(), ExecutionError> {
        match self.outcome {
            RunOutcome::Running => Ok(()),
            _ => Err(ExecutionError::Terminated),
        }
    }

    fn synchronize_clock(&mut self) {
        if let SyncStatus::OutOfSync(lag) = self.clock.synchronize(self.time) {
            tracing::warn!(lag = ?lag, "simulation clock out of sync");
        }
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("config", &self.config)
            .field("slaves", &self.slaves)
            .field("time", &self.time)
            .field("step_number", &self.step_number)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

/// A handle that cancels a simulation.
///
/// Cancellation takes effect before the next step: all slaves that are not
/// broken are ended and the stepping method returns
/// [`ExecutionError::Halted`].
#[derive(Clone, Debug)]
pub struct Canceller(Arc<AtomicBool>);

impl Canceller {
    /// Requests the cancellation of the simulation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns `true` if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The failure of a slave.
#[derive(Clone, Debug, PartialEq)]
pub struct SlaveFailure {
    /// The failed slave.
    pub slave: SlaveId,
    /// The name of the failed slave.
    pub slave_name: String,
    /// Simulation time at which the failing operation started.
    pub time: MonotonicTime,
    /// The error.
    pub error: Error,
}

impl fmt::Display for SlaveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slave '{}' ({}) failed at {}: {}",
            self.slave_name,
            self.slave,
            DisplayTime(self.time),
            self.error
        )
    }
}

/// An error returned upon simulation execution failure.
#[derive(Debug)]
pub enum ExecutionError {
    /// The simulation has been cancelled.
    Halted,
    /// A slave failed and the execution was aborted.
    SlaveFailure(SlaveFailure),
    /// The stop time has been reached: no further step can be taken.
    EndOfSimulation,
    /// The specified deadline lies in the past or beyond the stop time.
    InvalidDeadline(MonotonicTime),
    /// The simulation has been terminated, either because it was ended,
    /// cancelled or aborted.
    Terminated,
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Halted => f.write_str("the simulation has been cancelled"),
            Self::SlaveFailure(failure) => {
                write!(f, "the simulation has been aborted: {failure}")
            }
            Self::EndOfSimulation => f.write_str("the stop time has been reached"),
            Self::InvalidDeadline(time) => write!(
                f,
                "the specified deadline ({}) lies in the past or beyond the stop time",
                DisplayTime(*time)
            ),
            Self::Terminated => f.write_str("the simulation has been terminated"),
        }
    }
}

impl StdError for ExecutionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::SlaveFailure(failure) => Some(&failure.error),
            _ => None,
        }
    }
}

/// An error returned upon simulation configuration or initialization
/// failure.
#[derive(Debug)]
pub enum ConfigError {
    /// The slave identifier does not match any registered slave.
    UnknownSlave(SlaveId),
    /// The slave exposes no variable with this index.
    UnknownVariable(VariableId),
    /// The slave exposes no variable with this name.
    UnknownVariableName {
        /// The slave.
        slave: SlaveId,
        /// The variable name.
        name: String,
    },
    /// Another slave has already been registered with this name.
    DuplicateSlaveName(String),
    /// The connected variables have different types.
    TypeMismatch {
        /// The output variable.
        source: VariableId,
        /// The input variable.
        destination: VariableId,
    },
    /// The value does not have the type of the variable.
    ValueTypeMismatch {
        /// The variable.
        variable: VariableId,
        /// The type of the variable.
        expected: VariableType,
        /// The type of the value.
        found: VariableType,
    },
    /// The variable does not have the required causality.
    CausalityMismatch {
        /// The variable.
        variable: VariableId,
        /// The required causality.
        expected: Causality,
        /// The causality of the variable.
        found: Causality,
    },
    /// The input variable is already the destination of a connection.
    DuplicateDestination {
        /// The input variable.
        destination: VariableId,
        /// The source of the existing connection.
        first_source: VariableId,
        /// The source of the rejected connection.
        second_source: VariableId,
    },
    /// The execution configuration is inconsistent.
    InvalidConfig(String),
    /// The stop time does not lie after the start time.
    InvalidTimeWindow {
        /// Start time.
        start: MonotonicTime,
        /// Stop time.
        stop: MonotonicTime,
    },
    /// The worker thread of a slave could not be spawned.
    Spawn {
        /// The slave.
        slave: SlaveId,
        /// The underlying error.
        source: io::Error,
    },
    /// A slave failed during setup, initialization or start of the
    /// simulation.
    SlaveSetup(SlaveFailure),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSlave(slave) => write!(f, "{slave} does not exist"),
            Self::UnknownVariable(variable) => write!(f, "variable {variable} does not exist"),
            Self::UnknownVariableName { slave, name } => {
                write!(f, "{slave} has no variable named '{name}'")
            }
            Self::DuplicateSlaveName(name) => {
                write!(f, "a slave named '{name}' has already been added")
            }
            Self::TypeMismatch {
                source,
                destination,
            } => write!(
                f,
                "cannot connect {source} to {destination}: the variable types differ"
            ),
            Self::ValueTypeMismatch {
                variable,
                expected,
                found,
            } => write!(
                f,
                "cannot write a {found} value to the {expected} variable {variable}"
            ),
            Self::CausalityMismatch {
                variable,
                expected,
                found,
            } => write!(
                f,
                "variable {variable} has causality '{found}' where '{expected}' is required"
            ),
            Self::DuplicateDestination {
                destination,
                first_source,
                second_source,
            } => write!(
                f,
                "cannot connect {second_source} to {destination}: the input is already connected to {first_source}"
            ),
            Self::InvalidConfig(message) => write!(f, "invalid configuration: {message}"),
            Self::InvalidTimeWindow { start, stop } => write!(
                f,
                "the stop time ({}) does not lie after the start time ({})",
                DisplayTime(*stop),
                DisplayTime(*start)
            ),
            Self::Spawn { slave, .. } => {
                write!(f, "the worker thread of {slave} could not be spawned")
            }
            Self::SlaveSetup(failure) => {
                write!(f, "the simulation could not be initialized: {failure}")
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            Self::SlaveSetup(failure) => Some(&failure.error),
            _ => None,
        }
    }
}

/// An error returned upon simulation execution or configuration failure.
#[derive(Debug)]
pub enum SimulationError {
    /// The execution of the simulation failed.
    ExecutionError(ExecutionError),
    /// The simulation is misconfigured.
    ConfigError(ConfigError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionError(e) => e.fmt(f),
            Self::ConfigError(e) => e.fmt(f),
        }
    }
}

impl StdError for SimulationError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::ExecutionError(e) => e.source(),
            Self::ConfigError(e) => e.source(),
        }
    }
}

impl From<ExecutionError> for SimulationError {
    fn from(e: ExecutionError) -> Self {
        Self::ExecutionError(e)
    }
}

impl From<ConfigError> for SimulationError {
    fn from(e: ConfigError) -> Self {
        Self::ConfigError(e)
    }
}

/// Returns the identifier of the variable with the given name.
pub(crate) fn lookup_by_name(
    slave: SlaveId,
    description: &ModelDescription,
    name: &str,
) -> Result<VariableId, ConfigError> {
    description
        .variable_by_name(name)
        .map(|variable| VariableId::new(slave, variable.index))
        .ok_or_else(|| ConfigError::UnknownVariableName {
            slave,
            name: name.to_owned(),
        })
}

/// Checks that a value can be written to a variable.
pub(crate) fn validate_value(
    description: &ModelDescription,
    variable: VariableId,
    value: &Value,
) -> Result<(), ConfigError> {
    let variable_description = description
        .variable(variable.index)
        .ok_or(ConfigError::UnknownVariable(variable))?;

    if !variable_description.is_settable() {
        return Err(ConfigError::CausalityMismatch {
            variable,
            expected: Causality::Input,
            found: variable_description.causality,
        });
    }
    if variable_description.variable_type != value.variable_type() {
        return Err(ConfigError::ValueTypeMismatch {
            variable,
            expected: variable_description.variable_type,
            found: value.variable_type(),
        });
    }

    Ok(())
}
