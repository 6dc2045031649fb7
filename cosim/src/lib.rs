//! A co-simulation master algorithm for black-box slave simulators.
//!
//! Cosim drives a set of independently simulated model components, the
//! *slaves*, in lockstep through time. Slaves only expose typed scalar
//! variables and a fixed lifecycle: the engine knows nothing about their
//! internals, which makes it suitable for coupling wrapped FMUs, legacy
//! simulators or hand-written models within a single execution.
//!
//! Between two steps, the values of slave outputs are copied to the inputs
//! they are connected to. Slaves are stepped in parallel, each on its own
//! worker thread, and calls into slaves can be bounded by a timeout. Slave
//! failures are classified by severity and handled according to the
//! configured failure policy, either by aborting the execution or by
//! isolating the failed slave while the others keep running.
//!
//! # A practical overview
//!
//! Running a co-simulation typically involves three distinct activities:
//!
//! 1. the implementation of the [`Slave`](slave::Slave) trait for each
//!    simulated component, or the wrapping of existing simulators,
//! 2. the assembly of an execution from a set of slaves, performed by
//!    connecting slave outputs to slave inputs,
//! 3. the execution proper, managed through successive steps of the
//!    simulation time.
//!
//! ## Implementing slaves
//!
//! A slave describes the variables it exposes with a
//! [`ModelDescription`](model::ModelDescription). Each variable has an index,
//! a [`VariableType`](model::VariableType) and a
//! [`Causality`](model::Causality), which determines whether it can be the
//! source or the destination of a connection.
//!
//! Let us consider a simple integrator with a real input `u` and a real
//! output `y`:
//!
//! ```text
//!             ┌────────────┐
//!             │            │
//! u ●────────►│ Integrator ├────────► y
//!      f64    │            │   f64
//!             └────────────┘
//! ```
//!
//! `Integrator` could be implemented as follows:
//!
//! ```
//! use std::time::Duration;
//!
//! use cosim::model::{Causality, ModelDescription, VariableDescription, VariableIndex, VariableType};
//! use cosim::slave::{Slave, StepOutcome};
//! use cosim::time::MonotonicTime;
//! use cosim::{Errc, Error};
//!
//! #[derive(Default)]
//! pub struct Integrator {
//!     u: f64,
//!     y: f64,
//! }
//!
//! impl Slave for Integrator {
//!     fn model_description(&self) -> ModelDescription {
//!         ModelDescription {
//!             variables: vec![
//!                 VariableDescription::new("u", 0, VariableType::Real, Causality::Input),
//!                 VariableDescription::new("y", 1, VariableType::Real, Causality::Output),
//!             ],
//!             ..ModelDescription::new("integrator")
//!         }
//!     }
//!     fn setup(
//!         &mut self,
//!         _: &str,
//!         _: &str,
//!         _: MonotonicTime,
//!         _: Option<MonotonicTime>,
//!         _: bool,
//!         _: f64,
//!     ) -> Result<(), Error> {
//!         Ok(())
//!     }
//!     fn start_simulation(&mut self) -> Result<(), Error> {
//!         Ok(())
//!     }
//!     fn end_simulation(&mut self) -> Result<(), Error> {
//!         Ok(())
//!     }
//!     fn do_step(&mut self, _: MonotonicTime, dt: Duration) -> Result<StepOutcome, Error> {
//!         self.y += self.u * dt.as_secs_f64();
//!         Ok(StepOutcome::Complete)
//!     }
//!     fn get_real_variables(&self, vr: &[VariableIndex], v: &mut [f64]) -> Result<(), Error> {
//!         for (index, value) in vr.iter().zip(v) {
//!             *value = match index {
//!                 0 => self.u,
//!                 1 => self.y,
//!                 _ => return Err(Error::with_message(Errc::ModelError, "no such variable")),
//!             };
//!         }
//!         Ok(())
//!     }
//!     fn set_real_variables(&mut self, vr: &[VariableIndex], v: &[f64]) -> Result<bool, Error> {
//!         for (index, value) in vr.iter().zip(v) {
//!             match index {
//!                 0 => self.u = *value,
//!                 _ => return Err(Error::with_message(Errc::ModelError, "no such input")),
//!             }
//!         }
//!         Ok(true)
//!     }
//! #   fn get_integer_variables(&self, _: &[VariableIndex], _: &mut [i32]) -> Result<(), Error> {
//! #       Err(Errc::UnsupportedFeature.into())
//! #   }
//! #   fn get_boolean_variables(&self, _: &[VariableIndex], _: &mut [bool]) -> Result<(), Error> {
//! #       Err(Errc::UnsupportedFeature.into())
//! #   }
//! #   fn get_string_variables(&self, _: &[VariableIndex], _: &mut [String]) -> Result<(), Error> {
//! #       Err(Errc::UnsupportedFeature.into())
//! #   }
//! #   fn set_integer_variables(&mut self, _: &[VariableIndex], _: &[i32]) -> Result<bool, Error> {
//! #       Err(Errc::UnsupportedFeature.into())
//! #   }
//! #   fn set_boolean_variables(&mut self, _: &[VariableIndex], _: &[bool]) -> Result<bool, Error> {
//! #       Err(Errc::UnsupportedFeature.into())
//! #   }
//! #   fn set_string_variables(&mut self, _: &[VariableIndex], _: &[String]) -> Result<bool, Error> {
//! #       Err(Errc::UnsupportedFeature.into())
//! #   }
//!     // Integer, boolean and string accessors return an
//!     // `Errc::UnsupportedFeature` error.
//! }
//! ```
//!
//! Errors returned by a slave carry an [`ErrorCode`], usually one of the
//! [`Errc`] codes of the engine. A slave that fails a call is *broken* and
//! never called again.
//!
//! ## Assembling and running an execution
//!
//! Slaves are added to a [`SimInit`](simulation::SimInit) builder, which
//! assigns them a [`SlaveId`](model::SlaveId). Connections are declared
//! between an output and an input of the same type; an output may feed any
//! number of inputs but an input has at most one source.
//!
//! Let us chain two integrators, the first one being fed with a constant
//! input:
//!
//! ```text
//!        ┌────────────┐        ┌────────────┐
//!        │            │        │            │
//! 1.0 ●─►│ Integrator ├───────►│ Integrator ├───────► y
//!        │    "a"     │        │    "b"     │
//!        └────────────┘        └────────────┘
//! ```
//!
//! ```
//! # use std::time::Duration;
//! # use cosim::model::{Causality, ModelDescription, VariableDescription, VariableIndex, VariableType};
//! # use cosim::slave::{Slave, StepOutcome};
//! # use cosim::{Errc, Error};
//! # #[derive(Default)]
//! # pub struct Integrator { u: f64, y: f64 }
//! # impl Slave for Integrator {
//! #     fn model_description(&self) -> ModelDescription {
//! #         ModelDescription {
//! #             variables: vec![
//! #                 VariableDescription::new("u", 0, VariableType::Real, Causality::Input),
//! #                 VariableDescription::new("y", 1, VariableType::Real, Causality::Output),
//! #             ],
//! #             ..ModelDescription::new("integrator")
//! #         }
//! #     }
//! #     fn setup(&mut self, _: &str, _: &str, _: MonotonicTime, _: Option<MonotonicTime>, _: bool, _: f64) -> Result<(), Error> { Ok(()) }
//! #     fn start_simulation(&mut self) -> Result<(), Error> { Ok(()) }
//! #     fn end_simulation(&mut self) -> Result<(), Error> { Ok(()) }
//! #     fn do_step(&mut self, _: MonotonicTime, dt: Duration) -> Result<StepOutcome, Error> {
//! #         self.y += self.u * dt.as_secs_f64();
//! #         Ok(StepOutcome::Complete)
//! #     }
//! #     fn get_real_variables(&self, vr: &[VariableIndex], v: &mut [f64]) -> Result<(), Error> {
//! #         for (i, value) in vr.iter().zip(v) { *value = if *i == 0 { self.u } else { self.y }; }
//! #         Ok(())
//! #     }
//! #     fn set_real_variables(&mut self, _: &[VariableIndex], v: &[f64]) -> Result<bool, Error> {
//! #         self.u = v[0];
//! #         Ok(true)
//! #     }
//! #     fn get_integer_variables(&self, _: &[VariableIndex], _: &mut [i32]) -> Result<(), Error> { Err(Errc::UnsupportedFeature.into()) }
//! #     fn get_boolean_variables(&self, _: &[VariableIndex], _: &mut [bool]) -> Result<(), Error> { Err(Errc::UnsupportedFeature.into()) }
//! #     fn get_string_variables(&self, _: &[VariableIndex], _: &mut [String]) -> Result<(), Error> { Err(Errc::UnsupportedFeature.into()) }
//! #     fn set_integer_variables(&mut self, _: &[VariableIndex], _: &[i32]) -> Result<bool, Error> { Err(Errc::UnsupportedFeature.into()) }
//! #     fn set_boolean_variables(&mut self, _: &[VariableIndex], _: &[bool]) -> Result<bool, Error> { Err(Errc::UnsupportedFeature.into()) }
//! #     fn set_string_variables(&mut self, _: &[VariableIndex], _: &[String]) -> Result<bool, Error> { Err(Errc::UnsupportedFeature.into()) }
//! # }
//! use cosim::simulation::{ExecutionConfig, SimInit, StepSizePolicy};
//! use cosim::time::MonotonicTime;
//!
//! // Assembly.
//! let mut bench = SimInit::new().with_config(ExecutionConfig {
//!     step_size: StepSizePolicy::Fixed(Duration::from_millis(100)),
//!     ..Default::default()
//! });
//! let a = bench.add_slave(Integrator::default(), "a")?;
//! let b = bench.add_slave(Integrator::default(), "b")?;
//!
//! let a_u = bench.variable_id(a, "u")?;
//! let a_y = bench.variable_id(a, "y")?;
//! let b_u = bench.variable_id(b, "u")?;
//! let b_y = bench.variable_id(b, "y")?;
//! bench.connect(a_y, b_u)?;
//! bench.set_initial_value(a_u, 1.0)?;
//! bench.observe(b_y)?;
//!
//! // Initialization.
//! let t0 = MonotonicTime::EPOCH;
//! let mut simu = bench.init(t0, Some(t0 + Duration::from_secs(1)))?;
//!
//! // Execution.
//! simu.step()?;
//! assert_eq!(simu.time(), t0 + Duration::from_millis(100));
//! assert!((simu.snapshot().real(a_y).unwrap() - 0.1).abs() < 1e-12);
//!
//! // `b` sees the output of `a` with a delay of one step.
//! simu.run()?;
//! assert_eq!(simu.time(), t0 + Duration::from_secs(1));
//! assert!((simu.snapshot().real(b_y).unwrap() - 0.45).abs() < 1e-9);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Stepping and failures
//!
//! Each step follows the same sequence: all slaves are stepped, their
//! outputs are read once all of them are done and the values are propagated
//! through the connections before the time advances. A slave that rejects a
//! step may be asked to cover the interval with shorter sub-steps if retries
//! are enabled in the [`RetryPolicy`](simulation::RetryPolicy).
//!
//! The [`simulation`] module describes the master algorithm, the execution
//! modes and the failure policies in more details.
//!
//!
//! # Cargo feature flags
//!
//! ## Tracing
//!
//! The engine always emits [`tracing`](https://docs.rs/tracing/latest/tracing/)
//! events. The `tracing` feature flag additionally provides a timer that
//! stamps events with the simulation time, and can be activated in
//! `Cargo.toml` with:
//!
//! ```toml
//! [dependencies]
//! cosim = { version = "0.1.0", features = ["tracing"] }
//! ```
//!
//! See the [`tracing`] module for more information.
//!
//! ## Serde
//!
//! The `serde` feature flag derives `Serialize` and `Deserialize` for the
//! execution configuration, the model metadata and variable values:
//!
//! ```toml
//! [dependencies]
//! cosim = { version = "0.1.0", features = ["serde"] }
//! ```
//!
//!
//! # Other features and advanced topics
//!
//! * the [`slave`] module specifies the **call sequence** that slaves can rely
//!   on,
//! * the [`model`] module covers variable metadata, values and the
//!   *unavailable* samples of broken slaves,
//! * the [`observer`] module makes it possible to monitor an execution, step
//!   by step,
//! * the [`time`] module introduces the [`time::MonotonicTime`] timestamp
//!   object and **simulation clocks** for real-time executions.
//!
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]
#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg_hide))]

mod error;
pub mod model;
pub mod observer;
pub mod simulation;
pub mod slave;
pub mod time;

#[cfg(feature = "tracing")]
pub mod tracing;

pub use error::{Errc, Error, ErrorCode};
