use std::time::Duration;

use crate::simulation::ConfigError;

/// How calls into slaves are dispatched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExecutionMode {
    /// Slaves are called sequentially on the thread driving the simulation.
    ///
    /// Call timeouts are detected once the overrunning call has returned.
    Inline,
    /// Each slave is owned by a dedicated worker thread and the slaves are
    /// stepped in parallel.
    ///
    /// A slave that overruns the call timeout is abandoned to its worker
    /// thread.
    #[default]
    Threaded,
}

/// Policy that determines the duration of each step.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StepSizePolicy {
    /// All steps have the same duration.
    Fixed(Duration),
    /// The step duration adapts to the steps accepted by the slaves.
    ///
    /// After a step in which a slave able to handle variable step sizes had
    /// to retry with a shorter duration, the next step uses the shortest
    /// duration accepted by such slaves. Otherwise the step grows by
    /// `growth_factor`. The duration always remains within `[min, max]`.
    ///
    /// Every slave must declare the
    /// [`can_handle_variable_step_size`](crate::model::Capabilities::can_handle_variable_step_size)
    /// capability, otherwise initialization fails.
    Adaptive {
        /// Duration of the first step.
        initial: Duration,
        /// Smallest step duration.
        min: Duration,
        /// Largest step duration.
        max: Duration,
        /// Growth factor applied after a step without retries.
        growth_factor: f64,
        /// Relative tolerance forwarded to slaves for their own error
        /// estimation.
        relative_tolerance: f64,
    },
}

impl StepSizePolicy {
    /// Returns the duration of the first step.
    pub fn initial_step_size(&self) -> Duration {
        match *self {
            StepSizePolicy::Fixed(step) => step,
            StepSizePolicy::Adaptive { initial, .. } => initial,
        }
    }

    /// Returns `true` for adaptive policies.
    pub fn is_adaptive(&self) -> bool {
        matches!(self, StepSizePolicy::Adaptive { .. })
    }

    /// Returns the relative tolerance to be forwarded to slaves.
    pub(crate) fn relative_tolerance(&self) -> f64 {
        match *self {
            StepSizePolicy::Fixed(_) => 0.0,
            StepSizePolicy::Adaptive {
                relative_tolerance, ..
            } => relative_tolerance,
        }
    }

    /// Computes the duration of the next step.
    ///
    /// `accepted` is the shortest duration accepted by slaves that can handle
    /// variable step sizes and had to retry during the last step, if any.
    pub(crate) fn next_step_size(&self, current: Duration, accepted: Option<Duration>) -> Duration {
        match *self {
            StepSizePolicy::Fixed(step) => step,
            StepSizePolicy::Adaptive {
                min,
                max,
                growth_factor,
                ..
            } => match accepted {
                Some(accepted) => accepted.clamp(min, max),
                None => current.mul_f64(growth_factor).clamp(min, max),
            },
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            StepSizePolicy::Fixed(step) if step.is_zero() => Err(ConfigError::InvalidConfig(
                "the step size must be strictly positive".into(),
            )),
            StepSizePolicy::Fixed(_) => Ok(()),
            StepSizePolicy::Adaptive {
                initial,
                min,
                max,
                growth_factor,
                relative_tolerance,
            } => {
                if min.is_zero() || min > initial || initial > max {
                    return Err(ConfigError::InvalidConfig(
                        "adaptive step sizes must satisfy 0 < min <= initial <= max".into(),
                    ));
                }
                if !(growth_factor.is_finite() && growth_factor >= 1.0) {
                    return Err(ConfigError::InvalidConfig(
                        "the step growth factor must be finite and at least 1".into(),
                    ));
                }
                if !(relative_tolerance.is_finite() && relative_tolerance > 0.0) {
                    return Err(ConfigError::InvalidConfig(
                        "the relative tolerance must be strictly positive".into(),
                    ));
                }

                Ok(())
            }
        }
    }
}

impl Default for StepSizePolicy {
    fn default() -> Self {
        StepSizePolicy::Fixed(Duration::from_millis(100))
    }
}

/// Policy for steps that a slave reports as not completed.
///
/// When enabled, a rejected step is retried by sub-dividing the remaining
/// interval: the duration is halved after each rejection, so the slave still
/// ends the step at the same time point as all other slaves. Retrying is only
/// attempted for slaves that declare the
/// [`can_retry_step`](crate::model::Capabilities::can_retry_step)
/// capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryPolicy {
    /// Whether rejected steps are retried at all.
    pub enabled: bool,
    /// Shortest duration that may be requested from a slave.
    pub min_step: Duration,
    /// Maximum number of rejections tolerated within one step.
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// A policy that treats any step rejection as fatal.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// A policy that retries down to the given minimum step duration.
    pub fn with_min_step(min_step: Duration) -> Self {
        Self {
            enabled: true,
            min_step,
            ..Self::default()
        }
    }

    /// Sets the maximum number of rejections tolerated within one step.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && (self.min_step.is_zero() || self.max_attempts == 0) {
            return Err(ConfigError::InvalidConfig(
                "an enabled retry policy needs a non-zero minimum step and attempt budget".into(),
            ));
        }

        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            min_step: Duration::from_millis(1),
            max_attempts: 8,
        }
    }
}

/// What happens to the execution when a slave breaks during the simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FailurePolicy {
    /// The execution stops at the first broken slave.
    #[default]
    Abort,
    /// The broken slave is isolated and the remaining slaves keep running;
    /// inputs connected to the broken slave become unavailable.
    ///
    /// The execution is still aborted once no slave is left running.
    Isolate,
}

/// Configuration of an execution.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExecutionConfig {
    /// Name of the execution, forwarded to each slave at setup.
    pub execution_name: String,
    /// Dispatch mode.
    pub mode: ExecutionMode,
    /// Step size policy.
    pub step_size: StepSizePolicy,
    /// Handling of rejected steps.
    pub retry: RetryPolicy,
    /// Handling of broken slaves.
    pub failure_policy: FailurePolicy,
    /// Maximum duration of a single slave call, if any.
    pub call_timeout: Option<Duration>,
}

impl ExecutionConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        self.step_size.validate()?;
        self.retry.validate()?;
        if self.call_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::InvalidConfig(
                "the call timeout must be strictly positive".into(),
            ));
        }

        Ok(())
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            execution_name: String::new(),
            mode: ExecutionMode::default(),
            step_size: StepSizePolicy::default(),
            retry: RetryPolicy::default(),
            failure_policy: FailurePolicy::default(),
            call_timeout: None,
        }
    }
}
