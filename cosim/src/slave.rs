//! The slave interface.
//!
//! A slave is an independently simulated model component, for instance a
//! wrapped FMU. The engine only depends on the [`Slave`] trait and never on a
//! concrete slave type.
//!
//! # Call sequence
//!
//! The engine calls the methods of a slave in the following order:
//!
//! 1. [`setup`](Slave::setup): configure the slave and enter initialization
//!    mode,
//! 2. `set_<type>_variables`, `get_<type>_variables`: variable
//!    initialization; these methods may be called multiple times in any
//!    order,
//! 3. [`start_simulation`](Slave::start_simulation): end initialization mode
//!    and start the simulation,
//! 4. [`do_step`](Slave::do_step), `get_<type>_variables`,
//!    `set_<type>_variables`: simulation; these methods may be called
//!    multiple times, in this order,
//! 5. [`end_simulation`](Slave::end_simulation): end the simulation.
//!
//! Any method may return an error, after which the slave instance is
//! considered *broken* and no further method call will be made. A slave is
//! never called concurrently, but it may be moved to, and called from, a
//! dedicated worker thread.
//!
//! # Bulk variable access
//!
//! Variables are read and written in batches of a single type. The index
//! slice and the value slice passed to any of the typed methods always have
//! the same length, and values are filled or applied in the order of the
//! indices. The [`get_variables`] and [`set_variables`] functions adapt these
//! typed families to the [`Value`] sum type used by the engine.
use std::time::Duration;

use crate::error::Error;
use crate::model::{ModelDescription, Value, VariableIndex, VariableType};
use crate::time::MonotonicTime;

/// The result of a successful call to [`Slave::do_step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The model calculations for the step were carried out.
    Complete,
    /// The step was not carried out but may be retried with a shorter
    /// duration.
    Failed,
}

/// An interface for types that represent slave instances.
pub trait Slave: Send + 'static {
    /// Returns an object that describes the slave type.
    fn model_description(&self) -> ModelDescription;

    /// Performs pre-simulation setup and enters initialization mode.
    ///
    /// `start_time` and `stop_time` bound the interval inside which the model
    /// equations are required to be valid: `do_step` is never called with a
    /// time point outside this interval. A `stop_time` of `None` means that
    /// there is no defined stop time.
    ///
    /// `relative_tolerance` is only meaningful if `adaptive_step_size` is
    /// `true`, in which case the slave may use it for error estimation in its
    /// internal integrator.
    fn setup(
        &mut self,
        slave_name: &str,
        execution_name: &str,
        start_time: MonotonicTime,
        stop_time: Option<MonotonicTime>,
        adaptive_step_size: bool,
        relative_tolerance: f64,
    ) -> Result<(), Error>;

    /// Ends initialization mode and starts the simulation.
    fn start_simulation(&mut self) -> Result<(), Error>;

    /// Ends the simulation.
    fn end_simulation(&mut self) -> Result<(), Error>;

    /// Performs model calculations for the time step which starts at
    /// `current_time` and has a duration of `delta_t`.
    ///
    /// Unless this is the first step, the previous step ended at
    /// `current_time`.
    ///
    /// Non-recoverable problems must be signaled with an error rather than
    /// with [`StepOutcome::Failed`].
    fn do_step(
        &mut self,
        current_time: MonotonicTime,
        delta_t: Duration,
    ) -> Result<StepOutcome, Error>;

    /// Retrieves the values of real variables.
    fn get_real_variables(
        &self,
        variables: &[VariableIndex],
        values: &mut [f64],
    ) -> Result<(), Error>;

    /// Retrieves the values of integer variables.
    fn get_integer_variables(
        &self,
        variables: &[VariableIndex],
        values: &mut [i32],
    ) -> Result<(), Error>;

    /// Retrieves the values of boolean variables.
    fn get_boolean_variables(
        &self,
        variables: &[VariableIndex],
        values: &mut [bool],
    ) -> Result<(), Error>;

    /// Retrieves the values of string variables.
    fn get_string_variables(
        &self,
        variables: &[VariableIndex],
        values: &mut [String],
    ) -> Result<(), Error>;

    /// Sets the values of real variables.
    ///
    /// Returns `Ok(false)` in the case of non-fatal problems, e.g. if some
    /// values were invalid and have been ignored.
    fn set_real_variables(
        &mut self,
        variables: &[VariableIndex],
        values: &[f64],
    ) -> Result<bool, Error>;

    /// Sets the values of integer variables.
    ///
    /// Returns `Ok(false)` in the case of non-fatal problems.
    fn set_integer_variables(
        &mut self,
        variables: &[VariableIndex],
        values: &[i32],
    ) -> Result<bool, Error>;

    /// Sets the values of boolean variables.
    ///
    /// Returns `Ok(false)` in the case of non-fatal problems.
    fn set_boolean_variables(
        &mut self,
        variables: &[VariableIndex],
        values: &[bool],
    ) -> Result<bool, Error>;

    /// Sets the values of string variables.
    ///
    /// Returns `Ok(false)` in the case of non-fatal problems.
    fn set_string_variables(
        &mut self,
        variables: &[VariableIndex],
        values: &[String],
    ) -> Result<bool, Error>;
}

/// Reads a batch of variables of a single type.
pub fn get_variables(
    slave: &dyn Slave,
    variable_type: VariableType,
    variables: &[VariableIndex],
) -> Result<Vec<Value>, Error> {
    let n = variables.len();

    Ok(match variable_type {
        VariableType::Real => {
            let mut values = vec![0.0; n];
            slave.get_real_variables(variables, &mut values)?;
            values.into_iter().map(Value::Real).collect()
        }
        VariableType::Integer => {
            let mut values = vec![0; n];
            slave.get_integer_variables(variables, &mut values)?;
            values.into_iter().map(Value::Integer).collect()
        }
        VariableType::Boolean => {
            let mut values = vec![false; n];
            slave.get_boolean_variables(variables, &mut values)?;
            values.into_iter().map(Value::Boolean).collect()
        }
        VariableType::String => {
            let mut values = vec![String::new(); n];
            slave.get_string_variables(variables, &mut values)?;
            values.into_iter().map(Value::String).collect()
        }
    })
}

/// Writes a batch of variables of a single type.
///
/// # Panics
///
/// Panics if `variables` and `values` have different lengths or if a value
/// does not have type `variable_type`. Both are violations of the calling
/// contract and are caught before the slave is called.
pub fn set_variables(
    slave: &mut dyn Slave,
    variable_type: VariableType,
    variables: &[VariableIndex],
    values: &[Value],
) -> Result<bool, Error> {
    assert_eq!(
        variables.len(),
        values.len(),
        "the index and value arrays must have the same length"
    );

    fn unpack<T>(
        values: &[Value],
        variable_type: VariableType,
        f: impl Fn(&Value) -> Option<T>,
    ) -> Vec<T> {
        values
            .iter()
            .map(|v| match f(v) {
                Some(v) => v,
                None => panic!(
                    "a {} value cannot be written to a {} variable",
                    v.variable_type(),
                    variable_type
                ),
            })
            .collect()
    }

    match variable_type {
        VariableType::Real => {
            slave.set_real_variables(variables, &unpack(values, variable_type, Value::as_real))
        }
        VariableType::Integer => slave.set_integer_variables(
            variables,
            &unpack(values, variable_type, Value::as_integer),
        ),
        VariableType::Boolean => slave.set_boolean_variables(
            variables,
            &unpack(values, variable_type, Value::as_boolean),
        ),
        VariableType::String => slave.set_string_variables(
            variables,
            &unpack(values, variable_type, |v| v.as_str().map(str::to_owned)),
        ),
    }
}
