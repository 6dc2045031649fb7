//! Ready-made observers.
//!
//! Observers are moved into the simulation, so the data they collect is
//! read through a cloneable handle that can be kept by the caller, possibly
//! on another thread.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cosim::model::{Sample, VariableId};
use cosim::observer::{Observer, Snapshot, StepNumber};
use cosim::time::MonotonicTime;

/// An observer that keeps the last known sample of a set of variables.
///
/// # Example
///
/// ```ignore
/// let observer = LastValueObserver::new([position]);
/// let values = observer.handle();
/// bench.add_observer(observer)?;
///
/// let mut simu = bench.init(t0, ETERNITY)?;
/// simu.step()?;
/// println!("position: {:?}", values.real(position));
/// ```
#[derive(Debug)]
pub struct LastValueObserver {
    variables: Vec<VariableId>,
    values: LastValues,
}

impl LastValueObserver {
    /// Creates an observer of the specified variables.
    pub fn new(variables: impl IntoIterator<Item = VariableId>) -> Self {
        Self {
            variables: variables.into_iter().collect(),
            values: LastValues::default(),
        }
    }

    /// Returns a handle to the collected values.
    pub fn handle(&self) -> LastValues {
        self.values.clone()
    }

    fn record(&self, time: MonotonicTime, snapshot: &Snapshot<'_>) {
        let mut inner = self.values.inner.lock().unwrap();
        inner.time = Some(time);
        for &variable in &self.variables {
            if let Some(sample) = snapshot.get(variable) {
                inner.samples.insert(variable, sample.clone());
            }
        }
    }
}

impl Observer for LastValueObserver {
    fn observed_variables(&self) -> Vec<VariableId> {
        self.variables.clone()
    }

    fn simulation_initialized(
        &mut self,
        _: StepNumber,
        time: MonotonicTime,
        snapshot: &Snapshot<'_>,
    ) {
        self.record(time, snapshot);
    }

    fn step_complete(
        &mut self,
        _: StepNumber,
        _: Duration,
        time: MonotonicTime,
        snapshot: &Snapshot<'_>,
    ) {
        self.record(time, snapshot);
    }
}

#[derive(Debug, Default)]
struct LastValuesInner {
    time: Option<MonotonicTime>,
    samples: BTreeMap<VariableId, Sample>,
}

/// A handle to the values collected by a [`LastValueObserver`].
#[derive(Clone, Debug, Default)]
pub struct LastValues {
    inner: Arc<Mutex<LastValuesInner>>,
}

impl LastValues {
    /// Returns the time of the last update, if any.
    pub fn time(&self) -> Option<MonotonicTime> {
        self.inner.lock().unwrap().time
    }

    /// Returns the last known sample of a variable.
    pub fn get(&self, variable: VariableId) -> Option<Sample> {
        self.inner.lock().unwrap().samples.get(&variable).cloned()
    }

    /// Returns the last known value of a real variable, if available.
    pub fn real(&self, variable: VariableId) -> Option<f64> {
        self.get(variable)?.value()?.as_real()
    }
}

/// An observer that records the history of a set of variables.
///
/// A sample is recorded at initialization and then every `decimation`
/// steps. When a capacity is set, the oldest samples are discarded.
#[derive(Debug)]
pub struct TimeSeriesObserver {
    variables: Vec<VariableId>,
    decimation: StepNumber,
    capacity: Option<usize>,
    series: TimeSeries,
}

impl TimeSeriesObserver {
    /// Creates an observer recording the specified variables at every step.
    pub fn new(variables: impl IntoIterator<Item = VariableId>) -> Self {
        Self {
            variables: variables.into_iter().collect(),
            decimation: 1,
            capacity: None,
            series: TimeSeries::default(),
        }
    }

    /// Records only one step out of `decimation`.
    ///
    /// # Panics
    ///
    /// Panics if `decimation` is zero.
    pub fn with_decimation(mut self, decimation: StepNumber) -> Self {
        assert!(decimation > 0, "the decimation factor must be non-zero");
        self.decimation = decimation;

        self
    }

    /// Keeps at most `capacity` samples per variable.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);

        self
    }

    /// Returns a handle to the recorded series.
    pub fn handle(&self) -> TimeSeries {
        self.series.clone()
    }

    fn record(&self, step: StepNumber, time: MonotonicTime, snapshot: &Snapshot<'_>) {
        if step % self.decimation != 0 {
            return;
        }

        let mut series = self.series.inner.lock().unwrap();
        for &variable in &self.variables {
            let sample = snapshot.get(variable).cloned().unwrap_or(Sample::Unavailable);
            let points = series.entry(variable).or_default();
            if self.capacity.is_some_and(|capacity| points.len() >= capacity) {
                points.pop_front();
            }
            points.push_back(Point { step, time, sample });
        }
    }
}

impl Observer for TimeSeriesObserver {
    fn observed_variables(&self) -> Vec<VariableId> {
        self.variables.clone()
    }

    fn simulation_initialized(
        &mut self,
        step: StepNumber,
        time: MonotonicTime,
        snapshot: &Snapshot<'_>,
    ) {
        self.record(step, time, snapshot);
    }

    fn step_complete(
        &mut self,
        step: StepNumber,
        _: Duration,
        time: MonotonicTime,
        snapshot: &Snapshot<'_>,
    ) {
        self.record(step, time, snapshot);
    }
}

/// A recorded sample.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    /// Step number.
    pub step: StepNumber,
    /// Simulation time.
    pub time: MonotonicTime,
    /// Sample of the variable.
    pub sample: Sample,
}

/// A handle to the series recorded by a [`TimeSeriesObserver`].
#[derive(Clone, Debug, Default)]
pub struct TimeSeries {
    inner: Arc<Mutex<BTreeMap<VariableId, VecDeque<Point>>>>,
}

impl TimeSeries {
    /// Returns the recorded samples of a variable, oldest first.
    pub fn get(&self, variable: VariableId) -> Vec<Point> {
        self.inner
            .lock()
            .unwrap()
            .get(&variable)
            .map(|points| points.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the available values of a real variable, oldest first.
    pub fn reals(&self, variable: VariableId) -> Vec<(MonotonicTime, f64)> {
        self.get(variable)
            .into_iter()
            .filter_map(|point| Some((point.time, point.sample.value()?.as_real()?)))
            .collect()
    }
}
