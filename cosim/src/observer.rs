//! Observation of a running simulation.
//!
//! An [`Observer`] is notified of the main events of an execution: slave
//! registration, connections, initialization, completion of each step and
//! breakage of slaves. Each notification that follows a synchronization point
//! comes with a [`Snapshot`] of the last known variable values.
//!
//! Only the variables of the *read set* appear in a snapshot, that is the
//! sources of connections and the variables explicitly observed, either
//! with [`SimInit::observe`](crate::simulation::SimInit::observe) or by an
//! observer through [`Observer::observed_variables`].
//!
//! Observers run on the thread that drives the simulation, between steps.
//! Ready-made observers are available in the `cosim-util` crate.
use std::fmt;
use std::time::Duration;

use crate::model::{ModelDescription, Sample, SlaveId, Value, VariableId};
use crate::simulation::slave_handle::SlaveHandle;
use crate::simulation::{Connection, SlaveFailure};
use crate::time::MonotonicTime;

/// The sequence number of a step; the initial synchronization point has
/// number 0.
pub type StepNumber = u64;

/// A type that observes an execution.
///
/// All methods have a default implementation that does nothing.
pub trait Observer: Send + 'static {
    /// Returns the variables that must be read after each step.
    ///
    /// This method is called once, when the observer is added.
    fn observed_variables(&self) -> Vec<VariableId> {
        Vec::new()
    }

    /// A slave has been registered with the execution.
    fn slave_added(&mut self, slave: SlaveId, name: &str, description: &ModelDescription) {
        let _ = (slave, name, description);
    }

    /// Two variables have been connected.
    fn variables_connected(&mut self, connection: Connection) {
        let _ = connection;
    }

    /// All slaves have been initialized and the simulation is started.
    fn simulation_initialized(
        &mut self,
        step: StepNumber,
        time: MonotonicTime,
        snapshot: &Snapshot<'_>,
    ) {
        let _ = (step, time, snapshot);
    }

    /// A slave has completed the step ending at `time`.
    ///
    /// This method is called for each slave that completed the step, before
    /// the results are propagated and before [`step_complete`](Self::step_complete).
    fn slave_step_complete(
        &mut self,
        slave: SlaveId,
        step: StepNumber,
        delta_t: Duration,
        time: MonotonicTime,
    ) {
        let _ = (slave, step, delta_t, time);
    }

    /// A step has been completed and its results propagated.
    fn step_complete(
        &mut self,
        step: StepNumber,
        delta_t: Duration,
        time: MonotonicTime,
        snapshot: &Snapshot<'_>,
    ) {
        let _ = (step, delta_t, time, snapshot);
    }

    /// A slave has broken.
    fn slave_broken(&mut self, failure: &SlaveFailure) {
        let _ = failure;
    }
}

impl<O: Observer + ?Sized> Observer for Box<O> {
    fn observed_variables(&self) -> Vec<VariableId> {
        (**self).observed_variables()
    }
    fn slave_added(&mut self, slave: SlaveId, name: &str, description: &ModelDescription) {
        (**self).slave_added(slave, name, description)
    }
    fn variables_connected(&mut self, connection: Connection) {
        (**self).variables_connected(connection)
    }
    fn simulation_initialized(
        &mut self,
        step: StepNumber,
        time: MonotonicTime,
        snapshot: &Snapshot<'_>,
    ) {
        (**self).simulation_initialized(step, time, snapshot)
    }
    fn slave_step_complete(
        &mut self,
        slave: SlaveId,
        step: StepNumber,
        delta_t: Duration,
        time: MonotonicTime,
    ) {
        (**self).slave_step_complete(slave, step, delta_t, time)
    }
    fn step_complete(
        &mut self,
        step: StepNumber,
        delta_t: Duration,
        time: MonotonicTime,
        snapshot: &Snapshot<'_>,
    ) {
        (**self).step_complete(step, delta_t, time, snapshot)
    }
    fn slave_broken(&mut self, failure: &SlaveFailure) {
        (**self).slave_broken(failure)
    }
}

/// A read-only view of the last known variable values.
#[derive(Clone, Copy)]
pub struct Snapshot<'a> {
    slaves: &'a [SlaveHandle],
}

impl<'a> Snapshot<'a> {
    pub(crate) fn new(slaves: &'a [SlaveHandle]) -> Self {
        Self { slaves }
    }

    /// Returns the last known sample of a variable.
    ///
    /// `None` is returned if the variable is not part of the read set and no
    /// value was ever delivered to it.
    pub fn get(&self, variable: VariableId) -> Option<&'a Sample> {
        self.slaves.get(variable.slave.index())?.sample(variable.index)
    }

    /// Returns the last known value of a variable, if available.
    pub fn value(&self, variable: VariableId) -> Option<&'a Value> {
        self.get(variable)?.value()
    }

    /// Returns the last known value of a real variable, if available.
    pub fn real(&self, variable: VariableId) -> Option<f64> {
        self.value(variable)?.as_real()
    }

    /// Returns `true` if the slave is broken.
    pub fn is_broken(&self, slave: SlaveId) -> bool {
        self.slaves
            .get(slave.index())
            .is_some_and(|slave| slave.is_broken())
    }

    /// Returns an iterator over all variables read after each step, ordered
    /// by slave and variable index.
    pub fn iter(&self) -> impl Iterator<Item = (VariableId, &'a Sample)> + 'a {
        let slaves = self.slaves;
        slaves.iter().flat_map(|slave| {
            let id = slave.id();
            slave
                .samples()
                .map(move |(index, sample)| (VariableId::new(id, index), sample))
        })
    }
}

impl fmt::Debug for Snapshot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
