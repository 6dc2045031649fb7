//! Start and stop times, deadlines and clocks.

use std::time::{Duration, Instant};

use cosim::simulation::{ConfigError, ExecutionError, SimInit};
use cosim::time::{AutoSystemClock, ETERNITY};

use crate::mock::{at, fixed_step, Call, MockSlave, Recorder};

#[test]
fn steps_never_overrun_the_stop_time() {
    let recorder = Recorder::default();
    let mut bench = SimInit::new().with_config(fixed_step(100));
    bench.add_slave(MockSlave::new(&recorder), "s").unwrap();

    let mut simu = bench.init(at(200), Some(at(1250))).unwrap();
    simu.run().unwrap();

    // The last step that fits ends at 1.2s.
    assert_eq!(simu.time(), at(1200));
    assert_eq!(simu.step_number(), 10);
    let steps = recorder.steps();
    assert_eq!(steps.first(), Some(&(at(200), Duration::from_millis(100))));
    assert!(steps
        .iter()
        .all(|(t, dt)| *t >= at(200) && *t + *dt <= at(1250)));
    assert_eq!(
        recorder.calls().first(),
        Some(&Call::Setup {
            start: at(200),
            stop: Some(at(1250))
        })
    );
}

#[test]
fn end_of_simulation() {
    let recorder = Recorder::default();
    let mut bench = SimInit::new().with_config(fixed_step(100));
    bench.add_slave(MockSlave::new(&recorder), "s").unwrap();

    let mut simu = bench.init(at(0), Some(at(200))).unwrap();
    simu.step().unwrap();
    simu.step().unwrap();

    assert!(matches!(simu.step(), Err(ExecutionError::EndOfSimulation)));
    // Reaching the stop time does not end the simulation.
    assert!(!recorder.calls().contains(&Call::End));
    simu.end().unwrap();
    assert_eq!(recorder.calls().last(), Some(&Call::End));
}

#[test]
fn step_until_deadline() {
    let recorder = Recorder::default();
    let mut bench = SimInit::new().with_config(fixed_step(100));
    bench.add_slave(MockSlave::new(&recorder), "s").unwrap();

    let mut simu = bench.init(at(0), Some(at(2000))).unwrap();
    simu.step_until(at(450)).unwrap();

    assert_eq!(simu.time(), at(400));
    assert_eq!(recorder.steps().len(), 4);

    simu.step_until(at(1000)).unwrap();
    assert_eq!(simu.time(), at(1000));

    assert!(matches!(
        simu.step_until(at(1000)),
        Err(ExecutionError::InvalidDeadline(_))
    ));
    assert!(matches!(
        simu.step_until(at(2500)),
        Err(ExecutionError::InvalidDeadline(_))
    ));
    assert_eq!(simu.time(), at(1000));
}

#[test]
fn invalid_time_window() {
    let mut bench = SimInit::new();
    bench.add_slave(MockSlave::new(&Recorder::default()), "s").unwrap();

    assert!(matches!(
        bench.init(at(1000), Some(at(1000))),
        Err(ConfigError::InvalidTimeWindow { .. })
    ));
}

#[test]
fn eternity() {
    let recorder = Recorder::default();
    let mut bench = SimInit::new().with_config(fixed_step(1000));
    bench.add_slave(MockSlave::new(&recorder), "s").unwrap();

    let mut simu = bench.init(at(0), ETERNITY).unwrap();
    simu.step_until(at(3_600_000)).unwrap();

    assert_eq!(simu.stop_time(), None);
    assert_eq!(simu.step_number(), 3600);
    assert_eq!(
        recorder.calls().first(),
        Some(&Call::Setup {
            start: at(0),
            stop: None
        })
    );
}

#[test]
fn real_time_pacing() {
    let recorder = Recorder::default();
    let mut bench = SimInit::new()
        .with_config(fixed_step(10))
        .set_clock(AutoSystemClock::new());
    bench.add_slave(MockSlave::new(&recorder), "s").unwrap();

    let mut simu = bench.init(at(0), Some(at(100))).unwrap();
    let start = Instant::now();
    simu.run().unwrap();

    assert!(start.elapsed() >= Duration::from_millis(90));
    assert_eq!(simu.time(), at(100));
}
