// crates/drips-history/src/lib.rs

//! Streams history reconciliation and squeeze selection.
//!
//! - [`HistoryReconciler`] folds an unordered batch of list-changed and
//!   receiver-seen events into the chronological, hash-verified sequence of
//!   a sender's receiver lists.
//! - [`SqueezeSelector`] picks senders with funds streamed inside the open
//!   cycle and assembles the history suffix the chain needs to squeeze them.
//! - [`CycleBoundary`] keeps the cycle length a per-chain parameter.
//!
//! Everything here is synchronous and stateless: rerunning with the same
//! events yields the same result, and independent (account, token) pairs can
//! be processed in parallel by the caller.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

/// Cycle boundary abstraction and the contract's fixed-length cycles.
pub mod cycle;
/// Event reconciliation for streams and splits lists.
pub mod reconcile;
/// Squeezable-sender selection and squeeze proofs.
pub mod squeeze;

pub use cycle::{CycleBoundary, CycleConfig, CycleError, DEFAULT_CYCLE_SECS};
pub use reconcile::{HistoryReconciler, ReconcileConfig, ReconciledHistory};
pub use squeeze::SqueezeSelector;
