//! Validation of slaves, connections and execution configurations.

use std::time::Duration;

use cosim::model::{Capabilities, Causality, VariableType};
use cosim::simulation::{
    ConfigError, ExecutionConfig, RetryPolicy, SimInit, StepSizePolicy,
};
use cosim::time::ETERNITY;

use crate::mock::{at, MockSlave, Recorder};

fn slave() -> MockSlave {
    MockSlave::new(&Recorder::default())
        .input("u")
        .output("y")
        .variable("n", VariableType::Integer, Causality::Input)
        .variable("k", VariableType::Real, Causality::Parameter)
}

#[test]
fn two_connections_to_one_input_are_rejected() {
    let mut bench = SimInit::new();
    let a = bench.add_slave(slave(), "A").unwrap();
    let b = bench.add_slave(slave(), "B").unwrap();
    let c = bench.add_slave(slave(), "C").unwrap();
    let a_y = bench.variable_id(a, "y").unwrap();
    let b_y = bench.variable_id(b, "y").unwrap();
    let c_u = bench.variable_id(c, "u").unwrap();

    bench.connect(a_y, c_u).unwrap();
    let err = bench.connect(b_y, c_u).unwrap_err();

    match err {
        ConfigError::DuplicateDestination {
            destination,
            first_source,
            second_source,
        } => {
            assert_eq!(destination, c_u);
            assert_eq!(first_source, a_y);
            assert_eq!(second_source, b_y);
        }
        e => panic!("unexpected error: {e}"),
    }

    // The bench remains usable with the first connection.
    let simu = bench.init(at(0), ETERNITY).unwrap();
    assert_eq!(simu.connections().len(), 1);
}

#[test]
fn fan_out_is_allowed() {
    let mut bench = SimInit::new();
    let a = bench.add_slave(slave(), "A").unwrap();
    let b = bench.add_slave(slave(), "B").unwrap();
    let a_y = bench.variable_id(a, "y").unwrap();

    bench.connect(a_y, bench.variable_id(a, "u").unwrap()).unwrap();
    bench.connect(a_y, bench.variable_id(b, "u").unwrap()).unwrap();
}

#[test]
fn connection_endpoints_are_validated() {
    let mut bench = SimInit::new();
    let a = bench.add_slave(slave(), "A").unwrap();
    let b = bench.add_slave(slave(), "B").unwrap();
    let a_u = bench.variable_id(a, "u").unwrap();
    let a_y = bench.variable_id(a, "y").unwrap();
    let b_u = bench.variable_id(b, "u").unwrap();
    let b_y = bench.variable_id(b, "y").unwrap();
    let b_n = bench.variable_id(b, "n").unwrap();

    assert!(matches!(
        bench.connect(a_u, b_u),
        Err(ConfigError::CausalityMismatch { variable, .. }) if variable == a_u
    ));
    assert!(matches!(
        bench.connect(a_y, b_y),
        Err(ConfigError::CausalityMismatch { variable, .. }) if variable == b_y
    ));
    assert!(matches!(
        bench.connect(a_y, b_n),
        Err(ConfigError::TypeMismatch { .. })
    ));
    assert!(matches!(
        bench.variable_id(a, "z"),
        Err(ConfigError::UnknownVariableName { .. })
    ));
}

#[test]
fn slave_names_are_unique() {
    let mut bench = SimInit::new();
    bench.add_slave(slave(), "A").unwrap();

    assert!(matches!(
        bench.add_slave(slave(), "A"),
        Err(ConfigError::DuplicateSlaveName(name)) if name == "A"
    ));
    // Anonymous slaves are allowed.
    bench.add_slave(slave(), "").unwrap();
    bench.add_slave(slave(), "").unwrap();
}

#[test]
fn initial_values_are_validated() {
    let mut bench = SimInit::new();
    let a = bench.add_slave(slave(), "A").unwrap();

    bench
        .set_initial_value(bench.variable_id(a, "k").unwrap(), 2.0)
        .unwrap();
    bench
        .set_initial_value(bench.variable_id(a, "n").unwrap(), 3)
        .unwrap();
    assert!(matches!(
        bench.set_initial_value(bench.variable_id(a, "y").unwrap(), 1.0),
        Err(ConfigError::CausalityMismatch { .. })
    ));
    assert!(matches!(
        bench.set_initial_value(bench.variable_id(a, "u").unwrap(), "on"),
        Err(ConfigError::ValueTypeMismatch { .. })
    ));
}

#[test]
fn invalid_configurations_are_rejected() {
    let configs = [
        ExecutionConfig {
            step_size: StepSizePolicy::Fixed(Duration::ZERO),
            ..Default::default()
        },
        ExecutionConfig {
            retry: RetryPolicy::with_min_step(Duration::ZERO),
            ..Default::default()
        },
        ExecutionConfig {
            step_size: StepSizePolicy::Adaptive {
                initial: Duration::from_millis(10),
                min: Duration::from_millis(20),
                max: Duration::from_millis(30),
                growth_factor: 1.5,
                relative_tolerance: 1e-4,
            },
            ..Default::default()
        },
    ];

    for config in configs {
        let mut bench = SimInit::new().with_config(config);
        bench.add_slave(slave(), "A").unwrap();

        assert!(matches!(
            bench.init(at(0), ETERNITY),
            Err(ConfigError::InvalidConfig(_))
        ));
    }
}

#[test]
fn adaptive_step_requires_variable_step_slaves() {
    let config = ExecutionConfig {
        step_size: StepSizePolicy::Adaptive {
            initial: Duration::from_millis(100),
            min: Duration::from_millis(10),
            max: Duration::from_millis(400),
            growth_factor: 2.0,
            relative_tolerance: 1e-4,
        },
        ..Default::default()
    };
    let variable_step = Capabilities {
        can_handle_variable_step_size: true,
        can_retry_step: false,
    };

    let fixed_recorder = Recorder::default();
    let mut bench = SimInit::new().with_config(config.clone());
    bench
        .add_slave(slave().capabilities(variable_step), "A")
        .unwrap();
    bench
        .add_slave(MockSlave::new(&fixed_recorder), "B")
        .unwrap();

    match bench.init(at(0), Some(at(1000))) {
        Err(ConfigError::InvalidConfig(message)) => assert!(message.contains("'B'")),
        r => panic!("unexpected result: {:?}", r.err()),
    }
    // The fixed-step slave was never set up.
    assert!(fixed_recorder.calls().is_empty());

    let mut bench = SimInit::new().with_config(config);
    bench
        .add_slave(slave().capabilities(variable_step), "A")
        .unwrap();
    assert!(bench.init(at(0), Some(at(1000))).is_ok());
}
