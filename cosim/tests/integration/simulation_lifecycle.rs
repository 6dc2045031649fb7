//! Lifecycle of slaves and executions.

use std::thread;
use std::time::Duration;

use cosim::model::Sample;
use cosim::simulation::{
    ConfigError, ExecutionConfig, ExecutionError, ExecutionMode, RunOutcome, SimInit, SlaveState,
};
use cosim::slave::StepOutcome;
use cosim::time::ETERNITY;
use cosim::Errc;

use crate::mock::{at, fixed_step, Call, MockSlave, Recorder};

fn two_slaves(mode: ExecutionMode) -> (SimInit, Recorder, Recorder) {
    let rec_a = Recorder::default();
    let rec_b = Recorder::default();
    let mut bench = SimInit::new().with_config(ExecutionConfig {
        mode,
        ..fixed_step(100)
    });

    let a = bench
        .add_slave(
            MockSlave::new(&rec_a).output("x").on_step(|v, _, _| {
                v.set("x", v.get("x") + 1.0);
                Ok(StepOutcome::Complete)
            }),
            "a",
        )
        .unwrap();
    let b = bench
        .add_slave(MockSlave::new(&rec_b).input("u"), "b")
        .unwrap();
    let x = bench.variable_id(a, "x").unwrap();
    let u = bench.variable_id(b, "u").unwrap();
    bench.connect(x, u).unwrap();

    (bench, rec_a, rec_b)
}

#[test]
fn slaves_follow_the_call_sequence() {
    for mode in [ExecutionMode::Inline, ExecutionMode::Threaded] {
        let (bench, rec_a, rec_b) = two_slaves(mode);

        let mut simu = bench.init(at(0), Some(at(500))).unwrap();
        simu.run().unwrap();

        assert_eq!(simu.time(), at(500));
        assert_eq!(simu.step_number(), 5);
        assert_eq!(simu.outcome(), &RunOutcome::Completed);
        for recorder in [&rec_a, &rec_b] {
            recorder.check_sequence().unwrap();
            assert_eq!(
                recorder.calls().first(),
                Some(&Call::Setup {
                    start: at(0),
                    stop: Some(at(500))
                })
            );
            assert_eq!(recorder.calls().last(), Some(&Call::End));
            assert_eq!(recorder.steps().len(), 5);
        }
    }
}

#[test]
fn initial_outputs_are_propagated_before_start() {
    let (bench, _, rec_b) = two_slaves(ExecutionMode::Inline);

    let _simu = bench.init(at(0), ETERNITY).unwrap();

    let calls = rec_b.calls();
    let start = calls.iter().position(|c| *c == Call::Start).unwrap();
    let set = calls
        .iter()
        .position(|c| *c == Call::Set(vec![(0, 0.0)]))
        .unwrap();
    assert!(set < start);
}

#[test]
fn steps_are_synchronous() {
    let (bench, rec_a, rec_b) = two_slaves(ExecutionMode::Threaded);

    let mut simu = bench.init(at(0), ETERNITY).unwrap();
    for _ in 0..3 {
        simu.step().unwrap();
    }

    let expected: Vec<_> = (0..3).map(|n| (at(100 * n), Duration::from_millis(100))).collect();
    assert_eq!(rec_a.steps(), expected);
    assert_eq!(rec_b.steps(), expected);
}

#[test]
fn terminated_simulation() {
    let (bench, rec_a, _) = two_slaves(ExecutionMode::Inline);

    let mut simu = bench.init(at(0), ETERNITY).unwrap();
    simu.step().unwrap();
    simu.end().unwrap();

    assert_eq!(simu.outcome(), &RunOutcome::Completed);
    assert_eq!(simu.slave_state(simu.slave_id("a").unwrap()), Some(SlaveState::Ended));
    assert!(matches!(simu.step(), Err(ExecutionError::Terminated)));
    assert!(matches!(simu.end(), Err(ExecutionError::Terminated)));

    let calls = rec_a.calls();
    assert_eq!(calls.iter().filter(|c| **c == Call::End).count(), 1);
    rec_a.check_sequence().unwrap();
}

#[test]
fn dropped_simulation_does_not_end_slaves() {
    let (bench, rec_a, rec_b) = two_slaves(ExecutionMode::Threaded);

    let mut simu = bench.init(at(0), ETERNITY).unwrap();
    simu.step().unwrap();
    drop(simu);

    assert!(!rec_a.calls().contains(&Call::End));
    assert!(!rec_b.calls().contains(&Call::End));
}

#[test]
fn cancellation_before_step() {
    let (bench, rec_a, _) = two_slaves(ExecutionMode::Inline);

    let mut simu = bench.init(at(0), ETERNITY).unwrap();
    simu.step().unwrap();

    let canceller = simu.canceller();
    canceller.cancel();
    assert!(canceller.is_cancelled());

    assert!(matches!(simu.step(), Err(ExecutionError::Halted)));
    assert_eq!(simu.outcome(), &RunOutcome::Cancelled);
    assert_eq!(simu.time(), at(100));
    assert_eq!(rec_a.calls().last(), Some(&Call::End));
    assert!(matches!(simu.step(), Err(ExecutionError::Terminated)));

    // Partial results remain available.
    let x = simu.variable_id(simu.slave_id("a").unwrap(), "x").unwrap();
    assert_eq!(simu.sample(x), Some(&Sample::Value(1.0.into())));
}

#[test]
fn cancellation_from_another_thread() {
    let recorder = Recorder::default();
    let mut bench = SimInit::new().with_config(fixed_step(10));
    bench
        .add_slave(
            MockSlave::new(&recorder).on_step(|_, _, _| {
                thread::sleep(Duration::from_millis(1));
                Ok(StepOutcome::Complete)
            }),
            "slow",
        )
        .unwrap();

    let mut simu = bench.init(at(0), ETERNITY).unwrap();
    let canceller = simu.canceller();
    let th = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        canceller.cancel();
    });

    assert!(matches!(simu.run(), Err(ExecutionError::Halted)));
    th.join().unwrap();

    assert_eq!(simu.outcome(), &RunOutcome::Cancelled);
    assert!(simu.step_number() > 0);
    recorder.check_sequence().unwrap();
    assert_eq!(recorder.calls().last(), Some(&Call::End));
}

#[test]
fn setup_failure_aborts_initialization() {
    let rec_a = Recorder::default();
    let rec_b = Recorder::default();
    let mut bench = SimInit::new();
    bench.add_slave(MockSlave::new(&rec_a), "a").unwrap();
    let b = bench
        .add_slave(MockSlave::new(&rec_b).fail_setup(), "b")
        .unwrap();

    let err = bench.init(at(0), ETERNITY).unwrap_err();

    match err {
        ConfigError::SlaveSetup(failure) => {
            assert_eq!(failure.slave, b);
            assert_eq!(failure.slave_name, "b");
            assert_eq!(failure.error.code(), Errc::BadFile.into());
        }
        e => panic!("unexpected error: {e}"),
    }
    // The simulation was never started, so it is not ended either.
    assert!(!rec_a.calls().contains(&Call::Start));
    assert!(!rec_a.calls().contains(&Call::End));
    rec_a.check_sequence().unwrap();
}
