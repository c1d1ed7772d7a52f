//! Intentions index
//!
//! Holds the authoritative set of intentions for a datacenter. Writes are validated, assigned a
//! precedence and content hash, and stamped with the index at which they were applied. Every
//! write rebuilds an immutable, canonically ordered snapshot and publishes the new index on a
//! watch so that blocking queries can wake up:
//!
//! ```text
//! [ apply ] -> [ by id ] -> [ snapshot ] -> exact / match / check
//!                   \-> [ index watch ] -> blocking queries
//! ```
//!
//! Queries clone the snapshot under a read lock and evaluate it after the lock is released.
//!
//! Secondary datacenters converge on the primary by computing a [`Diff`] between their local
//! intentions and the primary's, then applying it.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod blocking;
mod error;
mod index;
pub mod metrics;
pub mod replication;

#[cfg(test)]
mod tests;

pub use self::{
    error::Error,
    index::{Index, SharedIndex, Snapshot},
    metrics::IndexMetrics,
    replication::Diff,
};
pub use intentions_controller_core::request::IntentionOp;
