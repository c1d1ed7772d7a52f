//! Intentions controller runtime
//!
//! Wires configuration, logging and metrics around a shared intentions index and exposes the
//! request [`Endpoint`] through which intentions are written and queried. Every request carries
//! the caller's authorizer, or `None` when access control is disabled.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use intentions_controller_core as core;
pub use intentions_controller_index as index;

mod args;
mod defaults;
mod endpoint;
mod error;
mod log;


pub use self::{
    args::{Args, Runtime},
    defaults::DefaultDecision,
    endpoint::Endpoint,
    error::Error,
    log::LogFormat,
};
