//! Slave failures and failure policies.

use std::io;
use std::thread;
use std::time::Duration;

use cosim::model::Sample;
use cosim::simulation::{
    ExecutionConfig, ExecutionError, ExecutionMode, FailurePolicy, RunOutcome, SimInit,
    SlaveState,
};
use cosim::slave::StepOutcome;
use cosim::time::ETERNITY;
use cosim::{Errc, Error, ErrorCode};

use crate::mock::{at, fixed_step, Call, MockSlave, Recorder};

/// A slave that fails at or after `failure_time`.
fn failing_at(recorder: &Recorder, failure_millis: u64) -> MockSlave {
    MockSlave::new(recorder)
        .output("y")
        .on_step(move |v, t, _| {
            if t >= at(failure_millis) {
                return Err(Error::with_message(Errc::ModelError, "solver diverged"));
            }
            v.set("y", v.get("y") + 1.0);
            Ok(StepOutcome::Complete)
        })
}

#[test]
fn isolated_slave_failure() {
    let rec_d = Recorder::default();
    let rec_e = Recorder::default();
    let rec_f = Recorder::default();
    let mut bench = SimInit::new().with_config(ExecutionConfig {
        failure_policy: FailurePolicy::Isolate,
        ..fixed_step(1000)
    });
    let d = bench.add_slave(failing_at(&rec_d, 2000), "D").unwrap();
    let e = bench
        .add_slave(MockSlave::new(&rec_e).input("u"), "E")
        .unwrap();
    bench.add_slave(MockSlave::new(&rec_f), "F").unwrap();
    let d_y = bench.variable_id(d, "y").unwrap();
    let e_u = bench.variable_id(e, "u").unwrap();
    bench.connect(d_y, e_u).unwrap();

    let mut simu = bench.init(at(0), Some(at(5000))).unwrap();
    simu.run().unwrap();

    // D received no call after its failure.
    assert_eq!(
        rec_d.steps(),
        vec![
            (at(0), Duration::from_secs(1)),
            (at(1000), Duration::from_secs(1)),
            (at(2000), Duration::from_secs(1)),
        ]
    );
    assert_eq!(rec_d.calls().last(), Some(&Call::Step(at(2000), Duration::from_secs(1))));
    rec_d.check_sequence().unwrap();

    // E and F completed.
    assert_eq!(rec_e.steps().len(), 5);
    assert_eq!(rec_f.steps().len(), 5);
    assert_eq!(rec_e.calls().last(), Some(&Call::End));
    assert_eq!(rec_f.calls().last(), Some(&Call::End));

    // The last value of D was never overwritten and E sees it as
    // unavailable.
    assert_eq!(rec_e.written(0), vec![0.0, 1.0, 2.0]);
    assert_eq!(simu.sample(e_u), Some(&Sample::Unavailable));
    assert_eq!(simu.sample(d_y), Some(&Sample::Unavailable));

    let report = simu.report();
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.end_time, at(5000));
    let d_report = report.slave("D").unwrap();
    assert_eq!(d_report.state, SlaveState::Broken);
    assert_eq!(d_report.error().map(|e| e.code()), Some(Errc::ModelError.into()));
    assert_eq!(d_report.failure.as_ref().map(|f| f.time), Some(at(2000)));
    for name in ["E", "F"] {
        let slave = report.slave(name).unwrap();
        assert_eq!(slave.state, SlaveState::Ended);
        assert!(slave.failure.is_none());
    }
    assert_eq!(report.broken_slaves().count(), 1);
}

#[test]
fn aborted_execution() {
    let rec_d = Recorder::default();
    let rec_e = Recorder::default();
    let mut bench = SimInit::new().with_config(fixed_step(1000));
    let d = bench.add_slave(failing_at(&rec_d, 1000), "D").unwrap();
    bench.add_slave(MockSlave::new(&rec_e), "E").unwrap();

    let mut simu = bench.init(at(0), ETERNITY).unwrap();
    simu.step().unwrap();

    let failure = match simu.step() {
        Err(ExecutionError::SlaveFailure(failure)) => failure,
        r => panic!("unexpected result: {r:?}"),
    };
    assert_eq!(failure.slave, d);
    assert_eq!(failure.time, at(1000));
    assert_eq!(simu.outcome(), &RunOutcome::Aborted(failure));

    // The healthy slave is ended, the broken one is not.
    assert_eq!(rec_e.calls().last(), Some(&Call::End));
    assert!(!rec_d.calls().contains(&Call::End));
    assert!(matches!(simu.step(), Err(ExecutionError::Terminated)));

    // Partial results remain inspectable.
    assert_eq!(simu.time(), at(1000));
    assert_eq!(simu.step_number(), 1);
    assert!(simu.is_broken(d));
    assert_eq!(
        simu.last_error(d).and_then(|e| e.message()),
        Some("solver diverged")
    );
}

#[test]
fn unresponsive_slave_times_out() {
    let rec_hung = Recorder::default();
    let rec_other = Recorder::default();
    let mut bench = SimInit::new().with_config(ExecutionConfig {
        mode: ExecutionMode::Threaded,
        call_timeout: Some(Duration::from_millis(50)),
        failure_policy: FailurePolicy::Isolate,
        ..fixed_step(100)
    });
    let hung = bench
        .add_slave(
            MockSlave::new(&rec_hung).on_step(|_, t, _| {
                if t >= at(100) {
                    thread::sleep(Duration::from_millis(500));
                }
                Ok(StepOutcome::Complete)
            }),
            "hung",
        )
        .unwrap();
    bench.add_slave(MockSlave::new(&rec_other), "other").unwrap();

    let mut simu = bench.init(at(0), ETERNITY).unwrap();
    simu.step().unwrap();
    simu.step().unwrap();
    simu.step().unwrap();

    assert!(simu.is_broken(hung));
    assert_eq!(
        simu.last_error(hung).map(|e| e.code()),
        Some(ErrorCode::Io(io::ErrorKind::TimedOut))
    );
    assert_eq!(rec_hung.steps().len(), 2);
    assert_eq!(rec_other.steps().len(), 3);
}

#[test]
fn panicking_slave_is_broken() {
    for mode in [ExecutionMode::Inline, ExecutionMode::Threaded] {
        let recorder = Recorder::default();
        let mut bench = SimInit::new().with_config(ExecutionConfig {
            mode,
            ..fixed_step(100)
        });
        let s = bench
            .add_slave(
                MockSlave::new(&recorder).on_step(|_, _, _| panic!("index out of bounds")),
                "faulty",
            )
            .unwrap();

        let mut simu = bench.init(at(0), ETERNITY).unwrap();

        assert!(matches!(simu.step(), Err(ExecutionError::SlaveFailure(_))));
        let error = simu.last_error(s).unwrap();
        assert_eq!(error.code(), Errc::ModelError.into());
        assert!(error.to_string().contains("index out of bounds"));
    }
}

#[test]
fn rejected_values_are_warnings() {
    let rec_a = Recorder::default();
    let rec_b = Recorder::default();
    let mut bench = SimInit::new().with_config(fixed_step(100));
    let a = bench
        .add_slave(MockSlave::new(&rec_a).output("x"), "a")
        .unwrap();
    let b = bench
        .add_slave(MockSlave::new(&rec_b).input("u").reject_sets(), "b")
        .unwrap();
    bench
        .connect(
            bench.variable_id(a, "x").unwrap(),
            bench.variable_id(b, "u").unwrap(),
        )
        .unwrap();

    let mut simu = bench.init(at(0), Some(at(300))).unwrap();
    simu.run().unwrap();

    assert!(!simu.is_broken(b));
    let report = simu.report();
    let b_report = report.slave("b").unwrap();
    assert_eq!(b_report.state, SlaveState::Ended);
    // One rejection at initialization and one after each step.
    assert_eq!(b_report.warnings.len(), 4);
    assert_eq!(b_report.warnings[0].time, at(0));
    assert_eq!(b_report.warnings[3].time, at(300));
}

#[test]
fn isolation_ends_when_no_slave_is_left() {
    let recorder = Recorder::default();
    let mut bench = SimInit::new().with_config(ExecutionConfig {
        mode: ExecutionMode::Inline,
        failure_policy: FailurePolicy::Isolate,
        ..fixed_step(100)
    });
    let s = bench
        .add_slave(
            MockSlave::new(&recorder).on_step(|_, _, _| Err(Errc::ModelError.into())),
            "doomed",
        )
        .unwrap();

    let mut simu = bench.init(at(0), ETERNITY).unwrap();

    // Without a stop time, `run` only returns because the execution aborts.
    let failure = match simu.run() {
        Err(ExecutionError::SlaveFailure(failure)) => failure,
        r => panic!("unexpected result: {r:?}"),
    };
    assert_eq!(failure.slave, s);
    assert_eq!(simu.outcome(), &RunOutcome::Aborted(failure));
    assert_eq!(simu.step_number(), 0);
    assert_eq!(recorder.steps().len(), 1);
    assert!(matches!(simu.step(), Err(ExecutionError::Terminated)));
}

#[test]
fn last_isolated_failure_aborts() {
    let rec_d = Recorder::default();
    let rec_e = Recorder::default();
    let mut bench = SimInit::new().with_config(ExecutionConfig {
        failure_policy: FailurePolicy::Isolate,
        ..fixed_step(1000)
    });
    let d = bench.add_slave(failing_at(&rec_d, 1000), "D").unwrap();
    let e = bench.add_slave(failing_at(&rec_e, 3000), "E").unwrap();

    let mut simu = bench.init(at(0), Some(at(10_000))).unwrap();
    let failure = match simu.run() {
        Err(ExecutionError::SlaveFailure(failure)) => failure,
        r => panic!("unexpected result: {r:?}"),
    };

    // D broke first and was isolated; the execution aborted with E.
    assert_eq!(failure.slave, e);
    assert_eq!(failure.time, at(3000));
    assert!(simu.is_broken(d));
    assert_eq!(simu.time(), at(3000));
    assert_eq!(simu.report().broken_slaves().count(), 2);
    assert!(!rec_d.calls().contains(&Call::End));
    assert!(!rec_e.calls().contains(&Call::End));
}

#[test]
fn failure_to_end_aborts_the_execution() {
    let recorder = Recorder::default();
    let mut bench = SimInit::new().with_config(fixed_step(100));
    let s = bench
        .add_slave(MockSlave::new(&recorder).fail_end(), "stubborn")
        .unwrap();

    let mut simu = bench.init(at(0), Some(at(200))).unwrap();
    let failure = match simu.run() {
        Err(ExecutionError::SlaveFailure(failure)) => failure,
        r => panic!("unexpected result: {r:?}"),
    };

    assert_eq!(failure.slave, s);
    assert_eq!(failure.error.message(), Some("cannot release resources"));
    assert_eq!(simu.outcome(), &RunOutcome::Aborted(failure));
    assert!(simu.is_broken(s));
    assert_eq!(recorder.steps().len(), 2);
    assert!(matches!(simu.end(), Err(ExecutionError::Terminated)));
}
