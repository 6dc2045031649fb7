//! Slave and variable metadata.
//!
//! Each slave describes itself with a [`ModelDescription`] that enumerates
//! the variables it exposes. A variable has a stable [`VariableIndex`], a
//! [`VariableType`] and a [`Causality`] which are fixed for the lifetime of
//! the slave. Within an execution, a variable is globally identified by a
//! [`VariableId`], i.e. the pair formed by the [`SlaveId`] assigned at
//! registration and the variable index.
//!
//! Variable values are never shared between slaves: they are exchanged as
//! [`Value`]s, which are plain copies.
use std::fmt;

/// The index of a variable within a slave.
pub type VariableIndex = u32;

/// Identifier of a slave within an execution.
///
/// Identifiers are assigned sequentially in registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlaveId(pub(crate) usize);

impl SlaveId {
    /// Returns the registration rank of the slave.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlaveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slave #{}", self.0)
    }
}

/// Global identifier of a variable within an execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariableId {
    /// The slave exposing the variable.
    pub slave: SlaveId,
    /// The index of the variable within the slave.
    pub index: VariableIndex,
}

impl VariableId {
    /// Creates a variable identifier.
    pub fn new(slave: SlaveId, index: VariableIndex) -> Self {
        Self { slave, index }
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.slave, self.index)
    }
}

/// The data type of a variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VariableType {
    /// A double-precision floating point number.
    Real,
    /// A 32-bit signed integer.
    Integer,
    /// A boolean.
    Boolean,
    /// A character string.
    String,
}

impl VariableType {
    /// All variable types, in the order used for batched accesses.
    pub const ALL: [VariableType; 4] = [
        VariableType::Real,
        VariableType::Integer,
        VariableType::Boolean,
        VariableType::String,
    ];
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VariableType::Real => "real",
            VariableType::Integer => "integer",
            VariableType::Boolean => "boolean",
            VariableType::String => "string",
        })
    }
}

/// The causality of a variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Causality {
    /// A value set from outside before the simulation starts.
    Parameter,
    /// A value computed by the slave from its parameters.
    CalculatedParameter,
    /// A value that can be set from outside during the simulation.
    Input,
    /// A value produced by the slave during the simulation.
    Output,
    /// An internal value that may be observed but not set.
    Local,
}

impl fmt::Display for Causality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Causality::Parameter => "parameter",
            Causality::CalculatedParameter => "calculated parameter",
            Causality::Input => "input",
            Causality::Output => "output",
            Causality::Local => "local",
        })
    }
}

/// The variability of a variable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Variability {
    /// The value never changes.
    Constant,
    /// The value is fixed after initialization.
    Fixed,
    /// The value may change between steps, but only through an external set.
    Tunable,
    /// The value changes only at discrete time instants.
    Discrete,
    /// The value may change continuously.
    #[default]
    Continuous,
}

/// Description of a single variable.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariableDescription {
    /// Name of the variable, unique within the slave.
    pub name: String,
    /// Index of the variable.
    pub index: VariableIndex,
    /// Data type.
    pub variable_type: VariableType,
    /// Causality.
    pub causality: Causality,
    /// Variability.
    pub variability: Variability,
}

impl VariableDescription {
    /// Creates a description of a continuous variable.
    pub fn new(
        name: impl Into<String>,
        index: VariableIndex,
        variable_type: VariableType,
        causality: Causality,
    ) -> Self {
        Self {
            name: name.into(),
            index,
            variable_type,
            causality,
            variability: Variability::default(),
        }
    }

    /// Overrides the variability.
    pub fn with_variability(mut self, variability: Variability) -> Self {
        self.variability = variability;
        self
    }

    /// Returns `true` if the engine may set the variable during the
    /// simulation.
    pub fn is_settable(&self) -> bool {
        matches!(self.causality, Causality::Input | Causality::Parameter)
    }
}

/// Optional capabilities of a slave.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Capabilities {
    /// The slave accepts steps of varying duration.
    pub can_handle_variable_step_size: bool,
    /// The slave can be asked to redo a rejected step with a shorter
    /// duration.
    pub can_retry_step: bool,
}

/// Description of a slave type.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelDescription {
    /// Model name.
    pub name: String,
    /// Universally unique identifier of the model.
    pub uuid: String,
    /// Human-readable description.
    pub description: String,
    /// Author.
    pub author: String,
    /// Model version.
    pub version: String,
    /// Optional capabilities.
    pub capabilities: Capabilities,
    /// Exposed variables.
    pub variables: Vec<VariableDescription>,
}

impl ModelDescription {
    /// Creates a description with the given model name and no variables.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Returns the description of the variable with the given index.
    pub fn variable(&self, index: VariableIndex) -> Option<&VariableDescription> {
        self.variables.iter().find(|v| v.index == index)
    }

    /// Returns the description of the variable with the given name.
    pub fn variable_by_name(&self, name: &str) -> Option<&VariableDescription> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// A variable value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// A real value.
    Real(f64),
    /// An integer value.
    Integer(i32),
    /// A boolean value.
    Boolean(bool),
    /// A string value.
    String(String),
}

impl Value {
    /// Returns the type of the value.
    pub fn variable_type(&self) -> VariableType {
        match self {
            Value::Real(_) => VariableType::Real,
            Value::Integer(_) => VariableType::Integer,
            Value::Boolean(_) => VariableType::Boolean,
            Value::String(_) => VariableType::String,
        }
    }

    /// Returns the value if it is a real.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value if it is an integer.
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value if it is a boolean.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Real(v) => write!(f, "{v}"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v:?}"),
        }
    }
}

/// The last known state of a variable as seen by the engine.
///
/// Variables of a broken slave, and inputs connected to them, are
/// `Unavailable`: their value is undefined and must not be relied upon.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sample {
    /// A defined value.
    Value(Value),
    /// No defined value.
    Unavailable,
}

impl Sample {
    /// Returns the value, if available.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Sample::Value(v) => Some(v),
            Sample::Unavailable => None,
        }
    }

    /// Returns `true` if the sample holds a value.
    pub fn is_available(&self) -> bool {
        matches!(self, Sample::Value(_))
    }
}

impl From<Value> for Sample {
    fn from(value: Value) -> Self {
        Sample::Value(value)
    }
}
