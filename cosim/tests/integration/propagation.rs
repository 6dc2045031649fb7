//! Propagation of values along connections, initial values and overrides.

use cosim::model::{Sample, SlaveId, Value, VariableId};
use cosim::simulation::{ConfigError, SimInit, Simulation, SimulationError};
use cosim::slave::StepOutcome;
use cosim::time::ETERNITY;

use crate::mock::{at, fixed_step, Call, MockSlave, Recorder};

struct Bench {
    simu: Simulation,
    a: SlaveId,
    x: VariableId,
    u: VariableId,
    rec_b: Recorder,
}

/// A.x -> B.u, where A sets x to 3.5 on its first step.
fn bench(initial_u: Option<f64>) -> Bench {
    let rec_a = Recorder::default();
    let rec_b = Recorder::default();
    let mut bench = SimInit::new().with_config(fixed_step(1000));

    let a = bench
        .add_slave(
            MockSlave::new(&rec_a).output("x").on_step(|v, _, _| {
                v.set("x", 3.5);
                Ok(StepOutcome::Complete)
            }),
            "A",
        )
        .unwrap();
    let b = bench
        .add_slave(MockSlave::new(&rec_b).input("u").output("y"), "B")
        .unwrap();
    let x = bench.variable_id(a, "x").unwrap();
    let u = bench.variable_id(b, "u").unwrap();
    bench.connect(x, u).unwrap();
    if let Some(value) = initial_u {
        bench.set_initial_value(u, value).unwrap();
    }

    Bench {
        simu: bench.init(at(0), ETERNITY).unwrap(),
        a,
        x,
        u,
        rec_b,
    }
}

#[test]
fn output_reaches_input_before_next_step() {
    let Bench {
        mut simu, x, rec_b, ..
    } = bench(None);

    simu.step().unwrap();

    assert_eq!(simu.sample(x), Some(&Sample::Value(Value::Real(3.5))));
    assert_eq!(rec_b.written(0).last(), Some(&3.5));

    simu.step().unwrap();

    let calls = rec_b.calls();
    let set = calls
        .iter()
        .position(|c| *c == Call::Set(vec![(0, 3.5)]))
        .unwrap();
    let second_step = calls
        .iter()
        .position(|c| *c == Call::Step(at(1000), std::time::Duration::from_secs(1)))
        .unwrap();
    assert!(set < second_step);
}

#[test]
fn propagated_values_override_initial_values() {
    let Bench { rec_b, .. } = bench(Some(-1.0));

    // The initial value is written first, then superseded by the initial
    // output of A.
    assert_eq!(rec_b.written(0), vec![-1.0, 0.0]);
}

#[test]
fn overrides_are_applied_before_the_next_step() {
    let Bench {
        mut simu, u, rec_b, ..
    } = bench(None);

    simu.step().unwrap();
    simu.set_value(u, 7.0).unwrap();
    simu.step().unwrap();

    // Override before the second step, then the propagated value again.
    assert_eq!(rec_b.written(0), vec![0.0, 3.5, 7.0, 3.5]);
    let calls = rec_b.calls();
    let set = calls
        .iter()
        .position(|c| *c == Call::Set(vec![(0, 7.0)]))
        .unwrap();
    let second_step = calls
        .iter()
        .position(|c| matches!(c, Call::Step(t, _) if *t == at(1000)))
        .unwrap();
    assert!(set < second_step);
}

#[test]
fn invalid_overrides_are_rejected() {
    let Bench {
        mut simu, x, u, ..
    } = bench(None);

    assert!(matches!(
        simu.set_value(x, 1.0),
        Err(SimulationError::ConfigError(
            ConfigError::CausalityMismatch { .. }
        ))
    ));
    assert!(matches!(
        simu.set_value(u, true),
        Err(SimulationError::ConfigError(
            ConfigError::ValueTypeMismatch { .. }
        ))
    ));
}

#[test]
fn observed_variables_are_read_after_each_step() {
    let rec = Recorder::default();
    let mut bench = SimInit::new().with_config(fixed_step(100));
    let s = bench
        .add_slave(
            MockSlave::new(&rec).output("y").on_step(|v, _, _| {
                v.set("y", v.get("y") + 0.5);
                Ok(StepOutcome::Complete)
            }),
            "counter",
        )
        .unwrap();
    let y = bench.variable_id(s, "y").unwrap();

    // Without observation, unconnected variables are never read.
    let mut unobserved = SimInit::new().with_config(fixed_step(100));
    let rec_unobserved = Recorder::default();
    unobserved
        .add_slave(MockSlave::new(&rec_unobserved).output("y"), "counter")
        .unwrap();
    let mut simu = unobserved.init(at(0), ETERNITY).unwrap();
    simu.step().unwrap();
    assert!(!rec_unobserved
        .calls()
        .iter()
        .any(|c| matches!(c, Call::Get(_))));

    bench.observe(y).unwrap();
    let mut simu = bench.init(at(0), ETERNITY).unwrap();
    simu.step().unwrap();
    simu.step().unwrap();

    assert_eq!(simu.snapshot().real(y), Some(1.0));
}

#[test]
fn initial_outputs_are_sampled() {
    let Bench { mut simu, a, .. } = bench(None);
    let before = simu.sample(VariableId::new(a, 0)).cloned();

    simu.step().unwrap();

    assert_eq!(before, Some(Sample::Value(Value::Real(0.0))));
    assert_eq!(
        simu.sample(VariableId::new(a, 0)),
        Some(&Sample::Value(Value::Real(3.5)))
    );
}
