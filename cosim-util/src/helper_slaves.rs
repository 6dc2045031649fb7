//! Helper slaves.
//!
//! This module contains slaves useful for bench assembly and testing, whose
//! behavior is defined by closures rather than by a wrapped simulator.

use std::fmt;
use std::time::Duration;

use cosim::model::{
    Capabilities, Causality, ModelDescription, VariableDescription, VariableIndex, VariableType,
};
use cosim::slave::{Slave, StepOutcome};
use cosim::time::MonotonicTime;
use cosim::{Errc, Error};

/// The real variables of a [`FnSlave`], addressed by name.
#[derive(Clone, Debug, Default)]
pub struct Variables {
    names: Vec<String>,
    values: Vec<f64>,
}

impl Variables {
    /// Returns the value of a variable.
    ///
    /// # Panics
    ///
    /// Panics if the slave has no variable with this name.
    pub fn get(&self, name: &str) -> f64 {
        self.values[self.position(name)]
    }

    /// Sets the value of a variable.
    ///
    /// # Panics
    ///
    /// Panics if the slave has no variable with this name.
    pub fn set(&mut self, name: &str, value: f64) {
        let position = self.position(name);
        self.values[position] = value;
    }

    fn position(&self, name: &str) -> usize {
        self.names
            .iter()
            .position(|n| n == name)
            .unwrap_or_else(|| panic!("no variable named '{name}'"))
    }

    fn value(&self, index: VariableIndex) -> Result<f64, Error> {
        self.values.get(index as usize).copied().ok_or_else(|| {
            Error::with_message(Errc::ModelError, format!("no variable with index {index}"))
        })
    }
}

type StepFn =
    Box<dyn FnMut(&mut Variables, MonotonicTime, Duration) -> Result<StepOutcome, Error> + Send>;

/// A slave with real variables whose step is computed by a closure.
///
/// Variable indices are assigned in declaration order, starting from 0.
///
/// # Example
///
/// A first-order low-pass filter:
///
/// ```
/// use cosim::slave::StepOutcome;
/// use cosim_util::helper_slaves::FnSlave;
///
/// let tau = 0.5;
/// let filter = FnSlave::new("low_pass")
///     .input("u")
///     .output("y")
///     .on_step(move |v, _, dt| {
///         let alpha = dt.as_secs_f64() / (tau + dt.as_secs_f64());
///         v.set("y", v.get("y") + alpha * (v.get("u") - v.get("y")));
///         Ok(StepOutcome::Complete)
///     });
/// # drop(filter);
/// ```
pub struct FnSlave {
    description: ModelDescription,
    variables: Variables,
    initial_values: Vec<f64>,
    on_step: StepFn,
}

impl FnSlave {
    /// Creates a slave with the given model name and no variables.
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            description: ModelDescription::new(model_name),
            variables: Variables::default(),
            initial_values: Vec::new(),
            on_step: Box::new(|_, _, _| Ok(StepOutcome::Complete)),
        }
    }

    /// Declares a real input, initially zero.
    pub fn input(self, name: &str) -> Self {
        self.variable(name, Causality::Input, 0.0)
    }

    /// Declares a real output, initially zero.
    pub fn output(self, name: &str) -> Self {
        self.variable(name, Causality::Output, 0.0)
    }

    /// Declares a real output with a start value.
    pub fn output_with_start(self, name: &str, start: f64) -> Self {
        self.variable(name, Causality::Output, start)
    }

    /// Declares a real parameter with a default value.
    pub fn parameter(self, name: &str, default: f64) -> Self {
        self.variable(name, Causality::Parameter, default)
    }

    /// Declares a real local variable, which can be observed but not set.
    pub fn local(self, name: &str, initial: f64) -> Self {
        self.variable(name, Causality::Local, initial)
    }

    /// Declares the optional capabilities of the slave.
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.description.capabilities = capabilities;

        self
    }

    /// Sets the closure called on each step.
    ///
    /// The closure may return [`StepOutcome::Failed`] to reject the step.
    pub fn on_step<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut Variables, MonotonicTime, Duration) -> Result<StepOutcome, Error>
            + Send
            + 'static,
    {
        self.on_step = Box::new(f);

        self
    }

    fn variable(mut self, name: &str, causality: Causality, initial: f64) -> Self {
        let index = self.description.variables.len() as VariableIndex;
        self.description.variables.push(VariableDescription::new(
            name,
            index,
            VariableType::Real,
            causality,
        ));
        self.variables.names.push(name.to_owned());
        self.variables.values.push(initial);
        self.initial_values.push(initial);

        self
    }
}

impl fmt::Debug for FnSlave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSlave")
            .field("model", &self.description.name)
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}

impl Slave for FnSlave {
    fn model_description(&self) -> ModelDescription {
        self.description.clone()
    }

    fn setup(
        &mut self,
        _: &str,
        _: &str,
        _: MonotonicTime,
        _: Option<MonotonicTime>,
        _: bool,
        _: f64,
    ) -> Result<(), Error> {
        self.variables.values.clone_from(&self.initial_values);

        Ok(())
    }

    fn start_simulation(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn end_simulation(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn do_step(
        &mut self,
        current_time: MonotonicTime,
        delta_t: Duration,
    ) -> Result<StepOutcome, Error> {
        (self.on_step)(&mut self.variables, current_time, delta_t)
    }

    fn get_real_variables(
        &self,
        variables: &[VariableIndex],
        values: &mut [f64],
    ) -> Result<(), Error> {
        for (&index, value) in variables.iter().zip(values) {
            *value = self.variables.value(index)?;
        }

        Ok(())
    }

    fn get_integer_variables(&self, _: &[VariableIndex], _: &mut [i32]) -> Result<(), Error> {
        Err(Errc::UnsupportedFeature.into())
    }

    fn get_boolean_variables(&self, _: &[VariableIndex], _: &mut [bool]) -> Result<(), Error> {
        Err(Errc::UnsupportedFeature.into())
    }

    fn get_string_variables(&self, _: &[VariableIndex], _: &mut [String]) -> Result<(), Error> {
        Err(Errc::UnsupportedFeature.into())
    }

    fn set_real_variables(
        &mut self,
        variables: &[VariableIndex],
        values: &[f64],
    ) -> Result<bool, Error> {
        let mut accepted = true;
        for (&index, &value) in variables.iter().zip(values) {
            self.variables.value(index)?;
            if !value.is_finite() {
                accepted = false;
                continue;
            }
            self.variables.values[index as usize] = value;
        }

        Ok(accepted)
    }

    fn set_integer_variables(&mut self, _: &[VariableIndex], _: &[i32]) -> Result<bool, Error> {
        Err(Errc::UnsupportedFeature.into())
    }

    fn set_boolean_variables(&mut self, _: &[VariableIndex], _: &[bool]) -> Result<bool, Error> {
        Err(Errc::UnsupportedFeature.into())
    }

    fn set_string_variables(&mut self, _: &[VariableIndex], _: &[String]) -> Result<bool, Error> {
        Err(Errc::UnsupportedFeature.into())
    }
}

/// Returns a slave with a single output `y` held at a constant value.
///
/// The value is exposed as the parameter `value`, so it can be overridden
/// with an initial value or between steps.
pub fn constant(value: f64) -> FnSlave {
    FnSlave::new("constant")
        .parameter("value", value)
        .output("y")
        .on_step(|v, _, _| {
            v.set("y", v.get("value"));
            Ok(StepOutcome::Complete)
        })
}

/// Returns a slave with a single output `y` following a sine wave of the
/// given amplitude and frequency, sampled at the end of each step.
pub fn sine(amplitude: f64, frequency: f64) -> FnSlave {
    let mut elapsed = Duration::ZERO;

    FnSlave::new("sine")
        .parameter("amplitude", amplitude)
        .parameter("frequency", frequency)
        .output("y")
        .on_step(move |v, _, dt| {
            elapsed += dt;
            let phase = std::f64::consts::TAU * v.get("frequency") * elapsed.as_secs_f64();
            v.set("y", v.get("amplitude") * phase.sin());
            Ok(StepOutcome::Complete)
        })
}
