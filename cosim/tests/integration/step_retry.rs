//! Rejected steps and adaptive step sizes.

use std::time::Duration;

use cosim::model::Capabilities;
use cosim::simulation::{
    ExecutionConfig, ExecutionError, RetryPolicy, SimInit, SlaveState, StepSizePolicy,
};
use cosim::slave::StepOutcome;
use cosim::time::ETERNITY;
use cosim::Errc;

use crate::mock::{at, fixed_step, MockSlave, Recorder};

const RETRY: Capabilities = Capabilities {
    can_handle_variable_step_size: true,
    can_retry_step: true,
};

/// A slave that rejects any step longer than `max_step`.
fn picky(recorder: &Recorder, max_step: Duration, capabilities: Capabilities) -> MockSlave {
    MockSlave::new(recorder)
        .capabilities(capabilities)
        .on_step(move |_, _, dt| {
            Ok(if dt > max_step {
                StepOutcome::Failed
            } else {
                StepOutcome::Complete
            })
        })
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[test]
fn rejected_step_is_retried_with_a_shorter_duration() {
    let recorder = Recorder::default();
    let mut bench = SimInit::new().with_config(ExecutionConfig {
        retry: RetryPolicy::with_min_step(ms(100)),
        ..fixed_step(1000)
    });
    let c = bench
        .add_slave(picky(&recorder, ms(500), RETRY), "C")
        .unwrap();

    let mut simu = bench.init(at(0), ETERNITY).unwrap();
    simu.step().unwrap();

    assert_eq!(
        recorder.steps(),
        vec![(at(0), ms(1000)), (at(0), ms(500)), (at(500), ms(500))]
    );
    assert!(!simu.is_broken(c));
    assert_eq!(simu.time(), at(1000));
}

#[test]
fn rejected_step_breaks_the_slave_without_retry() {
    let recorder = Recorder::default();
    let mut bench = SimInit::new().with_config(ExecutionConfig {
        retry: RetryPolicy::disabled(),
        ..fixed_step(1000)
    });
    let c = bench
        .add_slave(picky(&recorder, ms(500), RETRY), "C")
        .unwrap();

    let mut simu = bench.init(at(0), ETERNITY).unwrap();

    match simu.step() {
        Err(ExecutionError::SlaveFailure(failure)) => {
            assert_eq!(failure.slave, c);
            assert_eq!(failure.error.code(), Errc::ModelError.into());
        }
        r => panic!("unexpected result: {r:?}"),
    }
    assert_eq!(recorder.steps(), vec![(at(0), ms(1000))]);
    assert!(simu.is_broken(c));
    assert_eq!(simu.slave_state(c), Some(SlaveState::Broken));
    assert_eq!(simu.time(), at(0));
}

#[test]
fn rejected_step_breaks_slaves_unable_to_retry() {
    let recorder = Recorder::default();
    let mut bench = SimInit::new().with_config(ExecutionConfig {
        retry: RetryPolicy::with_min_step(ms(100)),
        ..fixed_step(1000)
    });
    let c = bench
        .add_slave(picky(&recorder, ms(500), Capabilities::default()), "C")
        .unwrap();

    let mut simu = bench.init(at(0), ETERNITY).unwrap();

    assert!(matches!(simu.step(), Err(ExecutionError::SlaveFailure(_))));
    assert_eq!(recorder.steps().len(), 1);
    assert_eq!(
        simu.last_error(c).map(|e| e.code()),
        Some(Errc::UnsupportedFeature.into())
    );
}

#[test]
fn retry_stops_at_the_minimum_step() {
    let recorder = Recorder::default();
    let mut bench = SimInit::new().with_config(ExecutionConfig {
        retry: RetryPolicy::with_min_step(ms(100)),
        ..fixed_step(1000)
    });
    let c = bench
        .add_slave(picky(&recorder, ms(50), RETRY), "C")
        .unwrap();

    let mut simu = bench.init(at(0), ETERNITY).unwrap();

    assert!(matches!(simu.step(), Err(ExecutionError::SlaveFailure(_))));
    // 1000ms, 500ms, 250ms, 125ms, then the minimum of 100ms.
    let durations: Vec<_> = recorder.steps().into_iter().map(|(_, dt)| dt).collect();
    assert_eq!(durations, vec![ms(1000), ms(500), ms(250), ms(125), ms(100)]);
    assert!(durations.iter().all(|dt| *dt >= ms(100)));
    assert!(simu.is_broken(c));
}

#[test]
fn adaptive_step_follows_accepted_sub_steps() {
    let recorder = Recorder::default();
    let mut bench = SimInit::new().with_config(ExecutionConfig {
        step_size: StepSizePolicy::Adaptive {
            initial: ms(400),
            min: ms(50),
            max: ms(800),
            growth_factor: 2.0,
            relative_tolerance: 1e-6,
        },
        retry: RetryPolicy::with_min_step(ms(50)),
        ..Default::default()
    });
    bench
        .add_slave(picky(&recorder, ms(200), RETRY), "C")
        .unwrap();

    let mut simu = bench.init(at(0), Some(at(1000))).unwrap();

    // The 400ms step is covered with two 200ms sub-steps.
    simu.step().unwrap();
    assert_eq!(simu.time(), at(400));
    assert_eq!(simu.step_size(), ms(200));

    // No rejection: the step grows.
    simu.step().unwrap();
    assert_eq!(simu.time(), at(600));
    assert_eq!(simu.step_size(), ms(400));

    // Last step, clamped to the stop time and retried.
    simu.step().unwrap();
    assert_eq!(simu.time(), at(1000));
    assert!(matches!(simu.step(), Err(ExecutionError::EndOfSimulation)));

    assert!(recorder
        .steps()
        .iter()
        .all(|(t, dt)| *t + *dt <= at(1000)));
}
