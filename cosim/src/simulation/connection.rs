use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::model::{
    Causality, ModelDescription, Sample, SlaveId, VariableDescription, VariableId, VariableIndex,
    VariableType,
};
use crate::simulation::ConfigError;

/// A value propagation edge from an output variable to an input variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Connection {
    /// The output variable.
    pub source: VariableId,
    /// The input variable.
    pub destination: VariableId,
}

/// Sources of a single type exposed by a single slave, with their
/// destinations.
#[derive(Clone, Debug)]
pub(crate) struct SourceBatch {
    pub(crate) slave: SlaveId,
    pub(crate) variable_type: VariableType,
    /// Source variable indices, in increasing order.
    pub(crate) indices: Vec<VariableIndex>,
    /// Destinations of each source, in the same order as `indices`.
    pub(crate) destinations: Vec<Vec<VariableId>>,
}

/// The validated, immutable set of connections of an execution.
///
/// The fan-out of each source is computed once at construction, grouped by
/// source slave and variable type so that sources can be read with bulk
/// accesses.
#[derive(Clone, Debug, Default)]
pub(crate) struct ConnectionGraph {
    connections: Vec<Connection>,
    batches: Vec<SourceBatch>,
}

impl ConnectionGraph {
    /// Validates the connections against the slave descriptions, indexed by
    /// slave identifier, and builds the graph.
    pub(crate) fn new(
        connections: Vec<Connection>,
        descriptions: &[&ModelDescription],
    ) -> Result<Self, ConfigError> {
        let mut incoming: BTreeMap<VariableId, VariableId> = BTreeMap::new();
        let mut fan_out: BTreeMap<(SlaveId, VariableType), BTreeMap<VariableIndex, Vec<VariableId>>> =
            BTreeMap::new();

        for connection in &connections {
            let variable_type = validate(connection, descriptions)?;

            match incoming.entry(connection.destination) {
                Entry::Vacant(e) => {
                    e.insert(connection.source);
                }
                Entry::Occupied(e) => {
                    return Err(ConfigError::DuplicateDestination {
                        destination: connection.destination,
                        first_source: *e.get(),
                        second_source: connection.source,
                    });
                }
            }

            fan_out
                .entry((connection.source.slave, variable_type))
                .or_default()
                .entry(connection.source.index)
                .or_default()
                .push(connection.destination);
        }

        let batches = fan_out
            .into_iter()
            .map(|((slave, variable_type), sources)| {
                let (indices, destinations) = sources.into_iter().unzip();
                SourceBatch {
                    slave,
                    variable_type,
                    indices,
                    destinations,
                }
            })
            .collect();

        Ok(Self {
            connections,
            batches,
        })
    }

    /// Returns all connections in declaration order.
    pub(crate) fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Returns the source batches.
    pub(crate) fn batches(&self) -> &[SourceBatch] {
        &self.batches
    }

    /// Returns an iterator over each source variable and its destinations.
    ///
    /// The iterator can be restarted at will since the fan-out is cached.
    pub(crate) fn fan_out(&self) -> impl Iterator<Item = (VariableId, &[VariableId])> + '_ {
        self.batches.iter().flat_map(|batch| {
            batch
                .indices
                .iter()
                .zip(&batch.destinations)
                .map(move |(&index, destinations)| {
                    (VariableId::new(batch.slave, index), destinations.as_slice())
                })
        })
    }

    /// Returns the source indices of the given slave, grouped by type.
    pub(crate) fn sources_of(
        &self,
        slave: SlaveId,
    ) -> impl Iterator<Item = (VariableType, &[VariableIndex])> + '_ {
        self.batches
            .iter()
            .filter(move |batch| batch.slave == slave)
            .map(|batch| (batch.variable_type, batch.indices.as_slice()))
    }

    /// Computes the samples to be delivered to each destination, given a
    /// lookup of the current source samples.
    ///
    /// Missing source samples are routed as `Sample::Unavailable`.
    pub(crate) fn route<'a, F>(&self, source_sample: F) -> Vec<(VariableId, Sample)>
    where
        F: Fn(VariableId) -> Option<&'a Sample>,
    {
        let mut routed = Vec::with_capacity(self.connections.len());
        for (source, destinations) in self.fan_out() {
            let sample = source_sample(source)
                .cloned()
                .unwrap_or(Sample::Unavailable);
            for &destination in destinations {
                routed.push((destination, sample.clone()));
            }
        }

        routed
    }
}

/// Checks one connection against the slave descriptions and returns its
/// variable type.
pub(crate) fn validate(
    connection: &Connection,
    descriptions: &[&ModelDescription],
) -> Result<VariableType, ConfigError> {
    let source = lookup(connection.source, descriptions)?;
    let destination = lookup(connection.destination, descriptions)?;

    if source.causality != Causality::Output {
        return Err(ConfigError::CausalityMismatch {
            variable: connection.source,
            expected: Causality::Output,
            found: source.causality,
        });
    }
    if destination.causality != Causality::Input {
        return Err(ConfigError::CausalityMismatch {
            variable: connection.destination,
            expected: Causality::Input,
            found: destination.causality,
        });
    }
    if source.variable_type != destination.variable_type {
        return Err(ConfigError::TypeMismatch {
            source: connection.source,
            destination: connection.destination,
        });
    }

    Ok(source.variable_type)
}

/// Returns the description of a variable.
pub(crate) fn lookup<'a>(
    variable: VariableId,
    descriptions: &[&'a ModelDescription],
) -> Result<&'a VariableDescription, ConfigError> {
    descriptions
        .get(variable.slave.0)
        .ok_or(ConfigError::UnknownSlave(variable.slave))?
        .variable(variable.index)
        .ok_or(ConfigError::UnknownVariable(variable))
}
