use std::fmt;

use crate::model::{ModelDescription, SlaveId, Value, VariableId};
use crate::observer::Observer;
use crate::slave::Slave;
use crate::time::{Clock, MonotonicTime, NoClock};

use super::connection::{self, ConnectionGraph};
use super::slave_handle::SlaveHandle;
use super::{
    lookup_by_name, validate_value, ConfigError, Connection, ExecutionConfig, Simulation,
};

/// Builder for a co-simulation.
///
/// Connections, initial values and observed variables are validated as soon
/// as they are declared, so that configuration errors are reported at the
/// offending call.
pub struct SimInit {
    slaves: Vec<SlaveHandle>,
    connections: Vec<Connection>,
    initial_values: Vec<(VariableId, Value)>,
    observed: Vec<VariableId>,
    observers: Vec<Box<dyn Observer>>,
    config: ExecutionConfig,
    clock: Box<dyn Clock>,
}

impl SimInit {
    /// Creates a builder with the default configuration and no clock.
    pub fn new() -> Self {
        Self {
            slaves: Vec::new(),
            connections: Vec::new(),
            initial_values: Vec::new(),
            observed: Vec::new(),
            observers: Vec::new(),
            config: ExecutionConfig::default(),
            clock: Box::new(NoClock::new()),
        }
    }

    /// Sets the execution configuration.
    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;

        self
    }

    /// Synchronizes the simulation with the specified clock.
    ///
    /// If no clock is set, the simulation runs as fast as possible.
    pub fn set_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Box::new(clock);

        self
    }

    /// Adds a slave and returns its identifier.
    ///
    /// The name is forwarded to the slave at setup. Non-empty names must be
    /// unique.
    pub fn add_slave(
        &mut self,
        slave: impl Slave,
        name: impl Into<String>,
    ) -> Result<SlaveId, ConfigError> {
        self.add_boxed_slave(Box::new(slave), name)
    }

    /// Adds a type-erased slave and returns its identifier.
    pub fn add_boxed_slave(
        &mut self,
        slave: Box<dyn Slave>,
        name: impl Into<String>,
    ) -> Result<SlaveId, ConfigError> {
        let name = name.into();
        if !name.is_empty() && self.slaves.iter().any(|s| s.name() == name) {
            return Err(ConfigError::DuplicateSlaveName(name));
        }

        let id = SlaveId(self.slaves.len());
        self.slaves.push(SlaveHandle::new(id, name, slave));

        Ok(id)
    }

    /// Returns the description of a slave.
    pub fn model_description(&self, slave: SlaveId) -> Result<&ModelDescription, ConfigError> {
        self.slaves
            .get(slave.index())
            .map(|s| s.description())
            .ok_or(ConfigError::UnknownSlave(slave))
    }

    /// Returns the identifier of a variable from its name.
    pub fn variable_id(&self, slave: SlaveId, name: &str) -> Result<VariableId, ConfigError> {
        lookup_by_name(slave, self.model_description(slave)?, name)
    }

    /// Connects an output variable to an input variable.
    ///
    /// An output may be connected to any number of inputs, but an input may
    /// only be the destination of one connection.
    pub fn connect(
        &mut self,
        source: VariableId,
        destination: VariableId,
    ) -> Result<(), ConfigError> {
        let connection = Connection {
            source,
            destination,
        };
        connection::validate(&connection, &self.descriptions())?;

        if let Some(existing) = self
            .connections
            .iter()
            .find(|c| c.destination == destination)
        {
            return Err(ConfigError::DuplicateDestination {
                destination,
                first_source: existing.source,
                second_source: source,
            });
        }
        self.connections.push(connection);

        Ok(())
    }

    /// Sets the value of a variable during initialization.
    ///
    /// Initial values are written after the setup of the slave and before
    /// the initial outputs are propagated, so values propagated through
    /// connections take precedence.
    pub fn set_initial_value(
        &mut self,
        variable: VariableId,
        value: impl Into<Value>,
    ) -> Result<(), ConfigError> {
        let value = value.into();
        validate_value(self.model_description(variable.slave)?, variable, &value)?;
        self.initial_values.push((variable, value));

        Ok(())
    }

    /// Adds a variable to the set of variables read after each step.
    pub fn observe(&mut self, variable: VariableId) -> Result<(), ConfigError> {
        self.model_description(variable.slave)?
            .variable(variable.index)
            .ok_or(ConfigError::UnknownVariable(variable))?;
        if !self.observed.contains(&variable) {
            self.observed.push(variable);
        }

        Ok(())
    }

    /// Adds an observer and the variables it observes.
    pub fn add_observer(&mut self, observer: impl Observer) -> Result<(), ConfigError> {
        for variable in observer.observed_variables() {
            self.observe(variable)?;
        }
        self.observers.push(Box::new(observer));

        Ok(())
    }

    /// Builds a simulation starting at `start_time` and initializes all
    /// slaves.
    ///
    /// A `stop_time` of `None` means that the simulation has no defined end,
    /// see [`ETERNITY`](crate::time::ETERNITY).
    pub fn init(
        mut self,
        start_time: MonotonicTime,
        stop_time: Option<MonotonicTime>,
    ) -> Result<Simulation, ConfigError> {
        self.config.validate()?;
        if self.config.step_size.is_adaptive() {
            if let Some(slave) = self
                .slaves
                .iter()
                .find(|s| !s.description().capabilities.can_handle_variable_step_size)
            {
                return Err(ConfigError::InvalidConfig(format!(
                    "slave '{}' cannot handle variable step sizes and requires a fixed step size policy",
                    slave.name()
                )));
            }
        }
        if let Some(stop) = stop_time.filter(|&stop| stop <= start_time) {
            return Err(ConfigError::InvalidTimeWindow {
                start: start_time,
                stop,
            });
        }

        let descriptions: Vec<_> = self.slaves.iter().map(|s| s.description()).collect();
        let graph = ConnectionGraph::new(std::mem::take(&mut self.connections), &descriptions)?;

        for slave in &mut self.slaves {
            let id = slave.id();
            let sources: Vec<_> = graph
                .sources_of(id)
                .flat_map(|(variable_type, indices)| {
                    indices.iter().map(move |&index| (variable_type, index))
                })
                .collect();
            let observed: Vec<_> = self
                .observed
                .iter()
                .filter(|variable| variable.slave == id)
                .filter_map(|variable| {
                    slave
                        .description()
                        .variable(variable.index)
                        .map(|v| (v.variable_type, variable.index))
                })
                .collect();
            slave.expose_for_reading(sources.into_iter().chain(observed));
        }

        let mut simulation = Simulation::new(
            self.config,
            self.slaves,
            graph,
            self.observers,
            self.clock,
            start_time,
            stop_time,
        );
        simulation.initialize(self.initial_values)?;

        Ok(simulation)
    }

    fn descriptions(&self) -> Vec<&ModelDescription> {
        self.slaves.iter().map(|s| s.description()).collect()
    }
}

impl Default for SimInit {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SimInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimInit")
            .field("slaves", &self.slaves)
            .field("connections", &self.connections)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
