//! Example: a ball bouncing on the ground, simulated by a slave that rejects
//! steps overshooting an impact.
//!
//! This example demonstrates in particular:
//!
//! * implementation of a custom slave,
//! * adaptive step size,
//! * step rejection and retry,
//! * accelerated real-time pacing.
//!
//! ```text
//!                 ┏━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┓
//!                 ┃ Simulation                   ┃
//!                 ┃   ┌──────────┐               ┃
//!                 ┃   │          │ height        ┃
//!                 ┃   │   Ball   ├───────────────╂─► [observed]
//!                 ┃   │          │               ┃
//!                 ┃   └──────────┘               ┃
//!                 ┗━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┛
//! ```

use std::time::Duration;

use cosim::model::{
    Capabilities, Causality, ModelDescription, VariableDescription, VariableIndex, VariableType,
};
use cosim::simulation::{
    ExecutionConfig, ExecutionError, RetryPolicy, SimInit, SimulationError, StepSizePolicy,
};
use cosim::slave::{Slave, StepOutcome};
use cosim::time::{AutoSystemClock, MonotonicTime};
use cosim::{Errc, Error};

const GRAVITY: f64 = 9.81;
const RESTITUTION: f64 = 0.8;
const IMPACT_RESOLUTION: Duration = Duration::from_millis(2);
const REST_SPEED: f64 = 0.05;

const HEIGHT: VariableIndex = 0;
const VELOCITY: VariableIndex = 1;

/// The `Ball` slave.
struct Ball {
    h0: f64,
    h: f64,
    v: f64,
}

impl Ball {
    fn new(h0: f64) -> Self {
        Self { h0, h: h0, v: 0.0 }
    }
}

impl Slave for Ball {
    fn model_description(&self) -> ModelDescription {
        let mut description = ModelDescription::new("ball");
        description.capabilities = Capabilities {
            can_handle_variable_step_size: true,
            can_retry_step: true,
        };
        description.variables = vec![
            VariableDescription::new("h", HEIGHT, VariableType::Real, Causality::Output),
            VariableDescription::new("v", VELOCITY, VariableType::Real, Causality::Output),
        ];

        description
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
        self.h = self.h0;
        self.v = 0.0;

        Ok(())
    }

    fn start_simulation(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn end_simulation(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn do_step(&mut self, _: MonotonicTime, delta_t: Duration) -> Result<StepOutcome, Error> {
        if self.h <= 0.0 && self.v.abs() < REST_SPEED {
            self.h = 0.0;
            self.v = 0.0;
            return Ok(StepOutcome::Complete);
        }

        let dt = delta_t.as_secs_f64();
        let h = self.h + self.v * dt - 0.5 * GRAVITY * dt * dt;
        let v = self.v - GRAVITY * dt;

        if h >= 0.0 {
            self.h = h;
            self.v = v;
        } else if delta_t > IMPACT_RESOLUTION {
            // The impact must be located more precisely.
            return Ok(StepOutcome::Failed);
        } else {
            self.h = 0.0;
            self.v = -RESTITUTION * v;
        }

        Ok(StepOutcome::Complete)
    }

    fn get_real_variables(
        &self,
        variables: &[VariableIndex],
        values: &mut [f64],
    ) -> Result<(), Error> {
        for (&variable, value) in variables.iter().zip(values) {
            *value = match variable {
                HEIGHT => self.h,
                VELOCITY => self.v,
                _ => return Err(Errc::ModelError.into()),
            };
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

    fn set_real_variables(&mut self, _: &[VariableIndex], _: &[f64]) -> Result<bool, Error> {
        Err(Errc::UnsupportedFeature.into())
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

fn main() -> Result<(), SimulationError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // ---------------
    // Bench assembly.
    // ---------------

    let mut bench = SimInit::new()
        .with_config(ExecutionConfig {
            execution_name: "bouncing_ball".into(),
            step_size: StepSizePolicy::Adaptive {
                initial: Duration::from_millis(100),
                min: Duration::from_millis(1),
                max: Duration::from_millis(100),
                growth_factor: 2.0,
                relative_tolerance: 1e-4,
            },
            retry: RetryPolicy::with_min_step(Duration::from_millis(1)).max_attempts(16),
            ..Default::default()
        })
        // Ten times faster than real time.
        .set_clock(AutoSystemClock::new().with_real_time_factor(10.0));

    let ball = bench.add_slave(Ball::new(2.0), "ball")?;
    let h = bench.variable_id(ball, "h")?;
    bench.observe(h)?;

    // Start time (arbitrary since the ball does not depend on absolute time).
    let t0 = MonotonicTime::EPOCH;
    let t1 = t0 + Duration::from_secs(5);

    // Assembly and initialization.
    let mut simu = bench.init(t0, Some(t1))?;

    // ----------
    // Simulation.
    // ----------

    let mut impacts = 0;
    let mut was_falling = false;
    let mut last_height = simu.sample(h).and_then(|s| s.value()?.as_real());
    loop {
        match simu.step() {
            Ok(()) => {}
            Err(ExecutionError::EndOfSimulation) => break,
            Err(e) => return Err(e.into()),
        }

        let height = simu.sample(h).and_then(|s| s.value()?.as_real());
        let falling = matches!((last_height, height), (Some(a), Some(b)) if b < a);
        if was_falling && !falling {
            impacts += 1;
        }
        was_falling = falling;
        last_height = height;
    }
    simu.end()?;

    println!(
        "{impacts} impacts in {} steps, final height {:.3} m",
        simu.step_number(),
        last_height.unwrap_or(f64::NAN)
    );
    println!("{}", simu.report());

    Ok(())
}
