//! Dispatch of calls into a slave, either inline or on a dedicated worker
//! thread.
use std::any::Any;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::slave::Slave;

/// A call sent to a worker thread.
type Job = Box<dyn FnOnce(&mut dyn Slave) + Send>;

/// Reason why a dispatched call did not produce a result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum CallError {
    /// The call did not complete within the call timeout.
    Timeout(Duration),
    /// The slave panicked; the payload is the panic message.
    Panic(String),
    /// The slave is no longer reachable.
    Disconnected,
}

/// The result of a call that may still be in progress.
#[must_use]
pub(crate) enum PendingCall<R> {
    Ready(Result<R, CallError>),
    Remote {
        receiver: Receiver<thread::Result<R>>,
        timeout: Option<Duration>,
        deadline: Option<Instant>,
    },
}

impl<R> PendingCall<R> {
    /// Blocks until the call completes or its deadline elapses.
    ///
    /// The deadline is set when the call is submitted, so that calls
    /// submitted together to several workers run concurrently against the
    /// same time budget.
    pub(crate) fn wait(self) -> Result<R, CallError> {
        match self {
            PendingCall::Ready(result) => result,
            PendingCall::Remote {
                receiver,
                timeout,
                deadline,
            } => {
                let reply = match (timeout, deadline) {
                    (Some(timeout), Some(deadline)) => {
                        let budget = deadline.saturating_duration_since(Instant::now());
                        receiver.recv_timeout(budget).map_err(|e| match e {
                            RecvTimeoutError::Timeout => CallError::Timeout(timeout),
                            RecvTimeoutError::Disconnected => CallError::Disconnected,
                        })?
                    }
                    _ => receiver.recv().map_err(|_| CallError::Disconnected)?,
                };

                reply.map_err(|payload| CallError::Panic(panic_message(payload)))
            }
        }
    }
}

impl<R> fmt::Debug for PendingCall<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCall").finish_non_exhaustive()
    }
}

enum Inner {
    Inline(Box<dyn Slave>),
    Worker {
        sender: Sender<Job>,
        thread: JoinHandle<()>,
    },
    Released,
}

/// Owner of a slave instance, through which all calls into the slave are
/// made.
///
/// Calls into the slave are strictly sequential: a worker processes its jobs
/// in submission order, and an inline dispatcher runs each call to
/// completion before returning.
pub(crate) struct Dispatcher {
    inner: Inner,
    timeout: Option<Duration>,
}

impl Dispatcher {
    /// Creates a dispatcher that calls the slave on the caller's thread.
    pub(crate) fn new(slave: Box<dyn Slave>) -> Self {
        Self {
            inner: Inner::Inline(slave),
            timeout: None,
        }
    }

    /// Sets the maximum duration of a call.
    pub(crate) fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Moves the slave to a dedicated worker thread.
    ///
    /// This is a no-op if the slave is already owned by a worker.
    pub(crate) fn spawn_worker(&mut self, thread_name: String) -> io::Result<()> {
        let mut slave = match std::mem::replace(&mut self.inner, Inner::Released) {
            Inner::Inline(slave) => slave,
            other => {
                self.inner = other;
                return Ok(());
            }
        };

        let (sender, receiver) = mpsc::channel::<Job>();
        let thread = thread::Builder::new().name(thread_name).spawn(move || {
            for job in receiver {
                job(slave.as_mut());
            }
        })?;
        self.inner = Inner::Worker { sender, thread };

        Ok(())
    }

    /// Submits a call without waiting for its completion.
    ///
    /// Inline calls are executed immediately.
    pub(crate) fn submit<R, F>(&mut self, f: F) -> PendingCall<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut dyn Slave) -> R + Send + 'static,
    {
        match &mut self.inner {
            Inner::Inline(slave) => {
                let start = Instant::now();
                let result = panic::catch_unwind(AssertUnwindSafe(|| f(slave.as_mut())));
                let elapsed = start.elapsed();

                PendingCall::Ready(match result {
                    Err(payload) => Err(CallError::Panic(panic_message(payload))),
                    Ok(value) => match self.timeout {
                        Some(timeout) if elapsed > timeout => Err(CallError::Timeout(timeout)),
                        _ => Ok(value),
                    },
                })
            }
            Inner::Worker { sender, .. } => {
                let (reply_sender, reply_receiver) = mpsc::sync_channel(1);
                let job: Job = Box::new(move |slave: &mut dyn Slave| {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| f(slave)));
                    // The caller may have given up waiting.
                    let _ = reply_sender.send(result);
                });
                if sender.send(job).is_err() {
                    return PendingCall::Ready(Err(CallError::Disconnected));
                }

                PendingCall::Remote {
                    receiver: reply_receiver,
                    timeout: self.timeout,
                    deadline: self.timeout.map(|t| Instant::now() + t),
                }
            }
            Inner::Released => PendingCall::Ready(Err(CallError::Disconnected)),
        }
    }

    /// Submits a call and waits for its completion.
    pub(crate) fn call<R, F>(&mut self, f: F) -> Result<R, CallError>
    where
        R: Send + 'static,
        F: FnOnce(&mut dyn Slave) -> R + Send + 'static,
    {
        self.submit(f).wait()
    }

    /// Drops the slave.
    ///
    /// If the slave is owned by a worker, the worker is joined once it has
    /// processed all pending calls.
    pub(crate) fn release(&mut self) {
        if let Inner::Worker { sender, thread } = std::mem::replace(&mut self.inner, Inner::Released)
        {
            drop(sender);
            // A panic is already caught and reported by the job itself.
            let _ = thread.join();
        }
    }

    /// Relinquishes the slave without waiting for its worker.
    ///
    /// The worker is detached and exits, dropping the slave, as soon as the
    /// call it may be stuck in returns.
    pub(crate) fn abandon(&mut self) {
        self.inner = Inner::Released;
    }

    /// Returns `true` if the slave has been released or abandoned.
    pub(crate) fn is_released(&self) -> bool {
        matches!(self.inner, Inner::Released)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.inner {
            Inner::Inline(_) => "inline",
            Inner::Worker { .. } => "worker",
            Inner::Released => "released",
        };
        f.debug_struct("Dispatcher")
            .field("mode", &mode)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Extracts the message of a panic payload.
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
