//! drips-core: stream config codec, receiver canonicalization and hash chaining.
//!
//! This crate defines the **stable boundary** shared by the Drips client crates:
//! - the packed stream-config codec (`StreamConfig` ⇄ `PackedStreamConfig`),
//! - canonical ordering rules for streams and splits receiver lists,
//! - the receiver-list hash and the history hash chain, reproduced bit-for-bit
//!   from the on-chain `abi.encode` + `keccak256` scheme,
//! - the event model handed over by indexers, and JSON/CBOR I/O helpers.
//!
//! ```
//! use drips_core::{canonicalize_streams, hash_receivers, StreamConfig, StreamReceiver};
//! use alloy_primitives::U256;
//!
//! let config = StreamConfig::new(7, U256::from(3_000_000_000u64), 0, 0).encode()?;
//! let receivers = canonicalize_streams([StreamReceiver::new(U256::from(42u64), config)])?;
//! let list_hash = hash_receivers(&receivers);
//! assert_ne!(list_hash, drips_core::EMPTY_RECEIVERS_HASH);
//! # Ok::<(), drips_core::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::doc_markdown
)]

/// Receiver-list canonicalization (sorting, dedup, protocol limits).
pub mod canonical;
/// Packed stream-config codec and amount-per-second helpers.
pub mod config;
/// Typed error taxonomy.
pub mod error;
/// Indexer-facing event model.
pub mod events;
/// Receiver-list hashing and the history hash chain.
pub mod hash;
/// JSON/CBOR helpers with extension-based auto-detection.
pub mod io;
/// Core data types: receivers, list states, history entries, squeeze proofs.
pub mod types;

pub use canonical::*;
pub use config::*;
pub use error::*;
pub use events::*;
pub use hash::*;
pub use types::*;

/// Commonly-used items for quick imports.
///
/// ```rust
/// use drips_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        canonical::{canonicalize_splits, canonicalize_streams, ProtocolLimits},
        config::{PackedStreamConfig, StreamConfig},
        error::Error,
        hash::{chain_history, hash_receivers, HistoryChain, Receiver},
        types::*,
    };
    pub use alloy_primitives::{Address, B256, U256};
}
