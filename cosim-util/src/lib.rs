//! Helper slaves and observers for the `cosim` co-simulation engine.
//!
//! * the [`helper_slaves`] module provides [`FnSlave`](helper_slaves::FnSlave),
//!   a slave whose behavior is defined by a closure, together with a few
//!   ready-made signal sources,
//! * the [`observers`] module provides observers that collect the values of
//!   variables during an execution.
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

pub mod helper_slaves;
pub mod observers;
