use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;
use crate::model::{ModelDescription, Sample, SlaveId, Value, VariableIndex, VariableType};
use crate::simulation::config::{ExecutionMode, RetryPolicy};
use crate::simulation::dispatcher::{CallError, Dispatcher, PendingCall};
use crate::simulation::failure::{self, FailureSignal, Fault, Phase, Rejection};
use crate::simulation::report::Warning;
use crate::simulation::SlaveFailure;
use crate::slave::{get_variables, set_variables, Slave, StepOutcome};
use crate::time::{set_current_time, MonotonicTime};

/// The lifecycle state of a slave.
///
/// ```text
/// Created ─► Configuring ─► Initializing ─► Simulating ─► Ended
///     │            │              │              │
///     └────────────┴──────────────┴──────────────┴──────► Broken
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SlaveState {
    /// The slave was added but the execution is not initialized yet.
    Created,
    /// The slave is registered with an execution and awaits setup.
    Configuring,
    /// The slave is set up and its variables are being initialized.
    Initializing,
    /// The simulation is started.
    Simulating,
    /// The simulation was ended.
    Ended,
    /// The slave failed; no further call will be made into it.
    Broken,
}

impl SlaveState {
    /// Returns `true` if no further call will be made into the slave.
    pub fn is_terminal(self) -> bool {
        matches!(self, SlaveState::Ended | SlaveState::Broken)
    }

    fn permits(self, operation: Operation) -> bool {
        matches!(
            (self, operation),
            (SlaveState::Created, Operation::Register)
                | (SlaveState::Configuring, Operation::Setup)
                | (
                    SlaveState::Initializing | SlaveState::Simulating,
                    Operation::Access
                )
                | (SlaveState::Initializing, Operation::Start)
                | (SlaveState::Simulating, Operation::Step | Operation::End)
        )
    }
}

impl fmt::Display for SlaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SlaveState::Created => "created",
            SlaveState::Configuring => "configuring",
            SlaveState::Initializing => "initializing",
            SlaveState::Simulating => "simulating",
            SlaveState::Ended => "ended",
            SlaveState::Broken => "broken",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Operation {
    Register,
    Setup,
    Access,
    Start,
    Step,
    End,
}

/// The outcome of a completed macro step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct StepReport {
    /// Number of rejected attempts.
    pub(crate) rejections: u32,
    /// Sub-step duration accepted after the last rejection, if any.
    pub(crate) accepted_step: Option<Duration>,
}

/// Variables read from the slave after each step, grouped by type.
type ReadSet = Arc<Vec<(VariableType, Vec<VariableIndex>)>>;

/// The engine-side representation of a slave.
///
/// All calls into the slave go through its handle, which checks them
/// against the lifecycle state machine.
pub(crate) struct SlaveHandle {
    id: SlaveId,
    name: String,
    description: ModelDescription,
    state: SlaveState,
    dispatcher: Dispatcher,
    read_set: ReadSet,
    samples: BTreeMap<VariableIndex, Sample>,
    inputs: BTreeMap<VariableIndex, Sample>,
    pending: BTreeMap<VariableIndex, Value>,
    failure: Option<SlaveFailure>,
    warnings: Vec<Warning>,
}

impl SlaveHandle {
    pub(crate) fn new(id: SlaveId, name: String, slave: Box<dyn Slave>) -> Self {
        let description = slave.model_description();

        Self {
            id,
            name,
            description,
            state: SlaveState::Created,
            dispatcher: Dispatcher::new(slave),
            read_set: Arc::default(),
            samples: BTreeMap::new(),
            inputs: BTreeMap::new(),
            pending: BTreeMap::new(),
            failure: None,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn id(&self) -> SlaveId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn description(&self) -> &ModelDescription {
        &self.description
    }

    pub(crate) fn state(&self) -> SlaveState {
        self.state
    }

    pub(crate) fn is_broken(&self) -> bool {
        self.state == SlaveState::Broken
    }

    pub(crate) fn failure(&self) -> Option<&SlaveFailure> {
        self.failure.as_ref()
    }

    pub(crate) fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Returns the last known sample of a variable.
    ///
    /// Variables read after each step take precedence over inputs delivered
    /// from connections.
    pub(crate) fn sample(&self, index: VariableIndex) -> Option<&Sample> {
        self.samples.get(&index).or_else(|| self.inputs.get(&index))
    }

    /// Returns an iterator over the variables read after each step.
    pub(crate) fn samples(&self) -> impl Iterator<Item = (VariableIndex, &Sample)> + '_ {
        self.samples.iter().map(|(&index, sample)| (index, sample))
    }

    /// Adds variables to the set read after each step.
    pub(crate) fn expose_for_reading(
        &mut self,
        variables: impl IntoIterator<Item = (VariableType, VariableIndex)>,
    ) {
        let mut read_set: BTreeMap<VariableType, Vec<VariableIndex>> =
            self.read_set.iter().cloned().collect();
        for (variable_type, index) in variables {
            let indices = read_set.entry(variable_type).or_default();
            if let Err(position) = indices.binary_search(&index) {
                indices.insert(position, index);
            }
        }
        self.read_set = Arc::new(read_set.into_iter().collect());
    }

    /// Attaches the slave to an execution.
    pub(crate) fn register(
        &mut self,
        mode: ExecutionMode,
        call_timeout: Option<Duration>,
    ) -> io::Result<()> {
        self.enter(Operation::Register);

        self.dispatcher.set_timeout(call_timeout);
        if mode == ExecutionMode::Threaded {
            let thread_name = if self.name.is_empty() {
                format!("cosim-slave-{}", self.id.index())
            } else {
                format!("cosim-{}", self.name)
            };
            self.dispatcher.spawn_worker(thread_name)?;
        }
        self.state = SlaveState::Configuring;

        Ok(())
    }

    pub(crate) fn setup(
        &mut self,
        execution_name: &str,
        start_time: MonotonicTime,
        stop_time: Option<MonotonicTime>,
        adaptive_step_size: bool,
        relative_tolerance: f64,
    ) -> Result<(), Fault> {
        self.enter(Operation::Setup);

        let slave_name = self.name.clone();
        let execution_name = execution_name.to_owned();
        let result = self.dispatcher.call(move |slave| {
            slave.setup(
                &slave_name,
                &execution_name,
                start_time,
                stop_time,
                adaptive_step_size,
                relative_tolerance,
            )
        });
        self.settle(result, start_time, Phase::Configuration)?;
        self.state = SlaveState::Initializing;

        Ok(())
    }

    pub(crate) fn start_simulation(&mut self, time: MonotonicTime) -> Result<(), Fault> {
        self.enter(Operation::Start);

        let result = self.dispatcher.call(|slave| slave.start_simulation());
        self.settle(result, time, Phase::Configuration)?;
        self.state = SlaveState::Simulating;

        Ok(())
    }

    /// Ends the simulation and drops the slave.
    pub(crate) fn end_simulation(&mut self, time: MonotonicTime) -> Result<(), Fault> {
        self.enter(Operation::End);

        let result = self.dispatcher.call(|slave| slave.end_simulation());
        self.settle(result, time, Phase::Simulation)?;
        self.state = SlaveState::Ended;
        self.dispatcher.release();

        Ok(())
    }

    /// Drops the slave without ending the simulation.
    pub(crate) fn release(&mut self) {
        self.dispatcher.release();
    }

    /// Queues a value or an unavailability notice for an input variable.
    ///
    /// Values are written to the slave on the next call to
    /// [`flush`](Self::flush). An unavailable sample cancels any pending
    /// value and is never written.
    pub(crate) fn queue(&mut self, index: VariableIndex, sample: Sample) {
        match &sample {
            Sample::Value(value) => {
                self.pending.insert(index, value.clone());
            }
            Sample::Unavailable => {
                self.pending.remove(&index);
            }
        }
        self.inputs.insert(index, sample);
    }

    /// Writes the pending input values to the slave.
    ///
    /// A rejection of some values by the slave is recorded as a warning.
    pub(crate) fn flush(&mut self, time: MonotonicTime, phase: Phase) -> Result<(), Fault> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.enter(Operation::Access);

        let mut batches: BTreeMap<VariableType, (Vec<VariableIndex>, Vec<Value>)> =
            BTreeMap::new();
        for (index, value) in std::mem::take(&mut self.pending) {
            let batch = batches.entry(value.variable_type()).or_default();
            batch.0.push(index);
            batch.1.push(value);
        }

        let result = self.dispatcher.call(move |slave: &mut dyn Slave| -> Result<bool, Error> {
            let mut accepted = true;
            for (variable_type, (indices, values)) in batches {
                accepted &= set_variables(slave, variable_type, &indices, &values)?;
            }

            Ok(accepted)
        });

        if !self.settle(result, time, phase)? {
            let fault = failure::translate(FailureSignal::SetRejected, phase);
            tracing::warn!(slave = %self.name, "{}", fault.error);
            self.warnings.push(Warning {
                time,
                message: fault.error.to_string(),
            });
        }

        Ok(())
    }

    /// Reads the variables of the read set into the snapshot.
    pub(crate) fn read(&mut self, time: MonotonicTime, phase: Phase) -> Result<(), Fault> {
        if self.read_set.is_empty() {
            return Ok(());
        }
        self.enter(Operation::Access);

        let read_set = self.read_set.clone();
        let result = self.dispatcher.call(move |slave| {
            read_set
                .iter()
                .map(|(variable_type, indices)| get_variables(&*slave, *variable_type, indices))
                .collect::<Result<Vec<_>, Error>>()
        });
        let batches = self.settle(result, time, phase)?;

        for ((_, indices), values) in self.read_set.iter().zip(batches) {
            for (&index, value) in indices.iter().zip(values) {
                self.samples.insert(index, Sample::Value(value));
            }
        }

        Ok(())
    }

    /// Submits a macro step from `time` to `time + delta_t`.
    pub(crate) fn begin_step(
        &mut self,
        time: MonotonicTime,
        delta_t: Duration,
        retry: RetryPolicy,
    ) -> PendingCall<Result<StepReport, FailureSignal>> {
        self.enter(Operation::Step);

        let can_retry = self.description.capabilities.can_retry_step;
        self.dispatcher.submit(move |slave| {
            set_current_time(Some(time));
            step_with_retry(slave, time, delta_t, retry, can_retry)
        })
    }

    /// Awaits the completion of a macro step submitted with
    /// [`begin_step`](Self::begin_step).
    pub(crate) fn finish_step(
        &mut self,
        pending: PendingCall<Result<StepReport, FailureSignal>>,
        time: MonotonicTime,
    ) -> Result<StepReport, Fault> {
        let signal = match pending.wait() {
            Ok(Ok(report)) => {
                if report.rejections > 0 {
                    tracing::warn!(
                        slave = %self.name,
                        rejections = report.rejections,
                        accepted_step = ?report.accepted_step,
                        "step rejected and retried with a shorter duration"
                    );
                }
                return Ok(report);
            }
            Ok(Err(signal)) => signal,
            Err(e) => e.into(),
        };

        Err(self.fail(signal, time, Phase::Simulation))
    }

    fn settle<T>(
        &mut self,
        result: Result<Result<T, Error>, CallError>,
        time: MonotonicTime,
        phase: Phase,
    ) -> Result<T, Fault> {
        let signal = match result {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => FailureSignal::Error(e),
            Err(e) => e.into(),
        };

        Err(self.fail(signal, time, phase))
    }

    /// Translates a failure and breaks the slave if it is fatal.
    pub(crate) fn fail(&mut self, signal: FailureSignal, time: MonotonicTime, phase: Phase) -> Fault {
        let timed_out = matches!(signal, FailureSignal::Timeout(_));
        let fault = failure::translate(signal, phase);
        if !fault.is_fatal() {
            return fault;
        }

        tracing::error!(slave = %self.name, state = %self.state, "slave broken: {}", fault.error);

        self.state = SlaveState::Broken;
        for sample in self.samples.values_mut() {
            *sample = Sample::Unavailable;
        }
        self.pending.clear();
        self.failure = Some(SlaveFailure {
            slave: self.id,
            slave_name: self.name.clone(),
            time,
            error: fault.error.clone(),
        });

        // A worker stuck in a call cannot be joined.
        if timed_out {
            self.dispatcher.abandon();
        } else {
            self.dispatcher.release();
        }

        fault
    }

    fn enter(&self, operation: Operation) {
        if !self.state.permits(operation) {
            panic!(
                "invalid call sequence: {:?} requested for {} in state `{}`",
                operation, self.id, self.state
            );
        }
    }
}

impl fmt::Debug for SlaveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlaveHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

/// Steps a slave from `time` to `time + delta_t`, sub-dividing the interval
/// when the slave rejects a step.
///
/// After each rejection the sub-step duration is halved, down to the minimum
/// step duration of the retry policy; the reduced duration is kept for the
/// remainder of the interval.
fn step_with_retry(
    slave: &mut dyn Slave,
    time: MonotonicTime,
    delta_t: Duration,
    retry: RetryPolicy,
    can_retry: bool,
) -> Result<StepReport, FailureSignal> {
    let end = time + delta_t;
    let mut current = time;
    let mut step = delta_t;
    let mut rejections = 0;

    while current < end {
        let h = step.min(end.duration_since(current));

        match slave.do_step(current, h).map_err(FailureSignal::Error)? {
            StepOutcome::Complete => current = current + h,
            StepOutcome::Failed => {
                let reject = |cause| FailureSignal::StepRejected {
                    time: current,
                    cause,
                };
                if !retry.enabled {
                    return Err(reject(Rejection::RetryDisabled));
                }
                if !can_retry {
                    return Err(reject(Rejection::CannotRetry));
                }

                rejections += 1;
                let exhausted = Rejection::Exhausted {
                    attempts: rejections,
                    last: h,
                };
                if rejections > retry.max_attempts || h <= retry.min_step {
                    return Err(reject(exhausted));
                }
                step = (h / 2).max(retry.min_step);
            }
        }
    }

    Ok(StepReport {
        rejections,
        accepted_step: (rejections > 0).then_some(step),
    })
}
