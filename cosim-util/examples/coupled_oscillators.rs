//! Example: two mass-spring oscillators coupled by a spring, each simulated
//! by its own slave.
//!
//! This example demonstrates in particular:
//!
//! * closure-defined slaves,
//! * connections forming an algebraic loop broken by the step delay,
//! * parallel stepping of slaves,
//! * recording of time series,
//! * accelerated real-time pacing,
//! * cancellation from another thread.
//!
//! ```text
//!                 ┏━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┓
//!                 ┃ Simulation                                  ┃
//!                 ┃ ┌─────────────┐    x    ┌───────────┐       ┃
//!                 ┃ │             ├────────►│           │       ┃
//!                 ┃ │ Oscillator1 │    f    │           │       ┃
//!                 ┃ │             │◄────────┤           │       ┃
//!                 ┃ └─────────────┘         │  Coupling │       ┃
//!                 ┃ ┌─────────────┐    x    │           │       ┃
//!                 ┃ │             ├────────►│           │       ┃
//!                 ┃ │ Oscillator2 │    f    │           │       ┃
//!                 ┃ │             │◄────────┤           │       ┃
//!                 ┃ └─────────────┘         └───────────┘       ┃
//!                 ┗━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┛
//! ```

use std::thread;
use std::time::Duration;

use cosim::simulation::{
    ExecutionConfig, ExecutionError, SimInit, SimulationError, StepSizePolicy,
};
use cosim::slave::StepOutcome;
use cosim::time::{AutoSystemClock, MonotonicTime};
use cosim_util::helper_slaves::FnSlave;
use cosim_util::observers::TimeSeriesObserver;

const STEP: Duration = Duration::from_millis(1);
const MASS: f64 = 1.0;
const STIFFNESS: f64 = 4.0;
const COUPLING: f64 = 0.5;

/// Creates an oscillator with an initial displacement.
///
/// The state is integrated with the semi-implicit Euler method.
fn oscillator(x0: f64) -> FnSlave {
    FnSlave::new("oscillator")
        .parameter("m", MASS)
        .parameter("k", STIFFNESS)
        .input("f")
        .output_with_start("x", x0)
        .output("v")
        .on_step(|v, _, dt| {
            let dt = dt.as_secs_f64();
            let a = (v.get("f") - v.get("k") * v.get("x")) / v.get("m");
            v.set("v", v.get("v") + a * dt);
            v.set("x", v.get("x") + v.get("v") * dt);
            Ok(StepOutcome::Complete)
        })
}

/// Creates the coupling spring.
fn coupling() -> FnSlave {
    FnSlave::new("spring")
        .parameter("k", 1.0)
        .input("x1")
        .input("x2")
        .output("f1")
        .output("f2")
        .on_step(|v, _, _| {
            let f = v.get("k") * (v.get("x2") - v.get("x1"));
            v.set("f1", f);
            v.set("f2", -f);
            Ok(StepOutcome::Complete)
        })
}

fn main() -> Result<(), SimulationError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // ---------------
    // Bench assembly.
    // ---------------

    let mut bench = SimInit::new().with_config(ExecutionConfig {
        execution_name: "coupled_oscillators".into(),
        step_size: StepSizePolicy::Fixed(STEP),
        ..Default::default()
    })
    // Ten times faster than real time.
    .set_clock(AutoSystemClock::new().with_real_time_factor(10.0));

    // The first oscillator starts displaced, the second at rest.
    let osc1 = bench.add_slave(oscillator(1.0), "oscillator1")?;
    let osc2 = bench.add_slave(oscillator(0.0), "oscillator2")?;
    let spring = bench.add_slave(coupling(), "spring")?;
    bench.set_initial_value(bench.variable_id(spring, "k")?, COUPLING)?;

    for (osc, x, f) in [(osc1, "x1", "f1"), (osc2, "x2", "f2")] {
        bench.connect(bench.variable_id(osc, "x")?, bench.variable_id(spring, x)?)?;
        bench.connect(bench.variable_id(spring, f)?, bench.variable_id(osc, "f")?)?;
    }

    let x1 = bench.variable_id(osc1, "x")?;
    let x2 = bench.variable_id(osc2, "x")?;
    let observer = TimeSeriesObserver::new([x1, x2]).with_decimation(100);
    let series = observer.handle();
    bench.add_observer(observer)?;

    // Start time (arbitrary since slaves do not depend on absolute time).
    let t0 = MonotonicTime::EPOCH;

    // Assembly and initialization.
    let mut simu = bench.init(t0, None)?;

    // ----------
    // Simulation.
    // ----------

    // Without a stop time, the simulation only ends when cancelled.
    let canceller = simu.canceller();
    let watchdog = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        canceller.cancel();
    });
    match simu.run() {
        Err(ExecutionError::Halted) => {}
        res => res?,
    }
    watchdog.join().unwrap();

    println!("{}", simu.report());
    for ((t, x1), (_, x2)) in series.reals(x1).into_iter().zip(series.reals(x2)) {
        println!(
            "t = {:>6.2}s   x1 = {x1:>7.4}   x2 = {x2:>7.4}",
            t.duration_since(t0).as_secs_f64()
        );
    }

    Ok(())
}
