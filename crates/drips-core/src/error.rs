//! Error taxonomy for encoding, canonicalization, reconciliation and proof assembly.
//!
//! Every variant carries the offending value so callers can log or surface it
//! without re-deriving context. Nothing here is retried internally: all four
//! failure classes are deterministic for a given input, and only the caller
//! can change the input (fetch more events, fix a receiver list).

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::events::EventOrdinal;
use crate::types::AccountId;

/// Field of a [`crate::StreamConfig`] named in a [`RangeError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigField {
    /// Stream identifier.
    StreamId,
    /// Fixed-point amount streamed per second.
    AmountPerSec,
    /// Start timestamp.
    Start,
    /// Duration in seconds.
    Duration,
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StreamId => "stream id",
            Self::AmountPerSec => "amount per second",
            Self::Start => "start",
            Self::Duration => "duration",
        })
    }
}

/// A numeric value does not fit the packed on-chain representation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// `value` needs more than `bits` bits.
    #[error("{field} {value} does not fit in {bits} bits")]
    Overflow {
        /// Offending field.
        field: ConfigField,
        /// Offending value.
        value: U256,
        /// Width available in the packed layout.
        bits: usize,
    },
    /// Zero-rate streams are represented by omitting the receiver.
    #[error("amount per second must be non-zero")]
    ZeroAmountPerSec,
    /// Rate conversion over a zero-length time unit.
    #[error("time unit must be at least one second")]
    ZeroTimeUnit,
}

/// A receiver list violates the protocol's count/zero-value/weight rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidReceiverError {
    /// More receivers than the protocol accepts.
    #[error("{count} receivers exceed the maximum of {max}")]
    TooManyReceivers {
        /// Receivers after deduplication.
        count: usize,
        /// Protocol maximum.
        max: usize,
    },
    /// A streams receiver with a zero rate.
    #[error("receiver {account_id} has a zero amount per second")]
    ZeroAmountPerSec {
        /// Offending receiver.
        account_id: AccountId,
    },
    /// A splits receiver with a zero weight.
    #[error("splits receiver {account_id} has a zero weight")]
    ZeroWeight {
        /// Offending receiver.
        account_id: AccountId,
    },
    /// The same splits account listed with different weights.
    #[error("splits receiver {account_id} appears more than once")]
    DuplicateAccount {
        /// Offending receiver.
        account_id: AccountId,
    },
    /// Splits weights must add up to the protocol total unless the list is empty.
    #[error("splits weights sum to {sum}, expected {expected}")]
    WeightSumMismatch {
        /// Actual sum.
        sum: u64,
        /// Protocol total weight.
        expected: u32,
    },
    /// Entry `index` is not strictly greater than its predecessor.
    #[error("receiver list is not in canonical order at index {index}")]
    NotCanonical {
        /// First out-of-order position.
        index: usize,
    },
}

/// Event data could not be reconciled into a verified history.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationError {
    /// Receivers gathered for `list_hash` hash to something else.
    #[error("receivers seen for list {list_hash} hash to {computed} ({receivers} receivers)")]
    HashMismatch {
        /// Hash claimed by the list-changed events.
        list_hash: B256,
        /// Hash of the reconstructed list.
        computed: B256,
        /// Size of the reconstructed list.
        receivers: usize,
    },
    /// An event in the batch belongs to another (account, token) pair.
    #[error("event for account {account_id} token {token} in batch for account {expected_account} token {expected_token}")]
    ForeignEvent {
        /// Batch account.
        expected_account: AccountId,
        /// Batch token.
        expected_token: Address,
        /// Event account.
        account_id: AccountId,
        /// Event token.
        token: Address,
    },
    /// A splits event in a batch for another account.
    #[error("splits event for account {account_id} in batch for account {expected_account}")]
    ForeignSplitsEvent {
        /// Batch account.
        expected_account: AccountId,
        /// Event account.
        account_id: AccountId,
    },
    /// Two different events claim the same log position.
    #[error("conflicting events at {ordinal}")]
    ConflictingEvents {
        /// Shared log position.
        ordinal: EventOrdinal,
    },
    /// An emitted history hash is not the link from the preceding update,
    /// so at least one update is missing between them.
    #[error("history hash {emitted} emitted at timestamp {update_timestamp} does not follow the previous update (expected {expected})")]
    BrokenHistoryLink {
        /// Timestamp of the later update.
        update_timestamp: u64,
        /// History hash the later event carries.
        emitted: B256,
        /// Link computed from the previous update.
        expected: B256,
    },
    /// Two events share a timestamp and cannot be ordered.
    #[error("events at timestamp {update_timestamp} have no ordinal to break the tie")]
    AmbiguousOrder {
        /// Shared timestamp.
        update_timestamp: u64,
    },
    /// The latest reconciled list differs from the chain's stored list hash.
    #[error("on-chain list hash {on_chain} differs from reconciled {reconciled}")]
    CheckpointMismatch {
        /// Value read from the chain.
        on_chain: B256,
        /// Value derived from events.
        reconciled: B256,
    },
}

/// No suffix of the supplied history chains to the on-chain history hash.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no suffix of {available} history entries of sender {sender_id} replays to history hash {expected}")]
pub struct InsufficientHistoryError {
    /// Sender whose history was searched.
    pub sender_id: AccountId,
    /// On-chain history hash the replay had to reproduce.
    pub expected: B256,
    /// Entries available to the search.
    pub available: usize,
}

/// Umbrella error for callers that do not care which stage failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// See [`RangeError`].
    #[error(transparent)]
    Range(#[from] RangeError),
    /// See [`InvalidReceiverError`].
    #[error(transparent)]
    InvalidReceiver(#[from] InvalidReceiverError),
    /// See [`ReconciliationError`].
    #[error(transparent)]
    Reconciliation(#[from] ReconciliationError),
    /// See [`InsufficientHistoryError`].
    #[error(transparent)]
    InsufficientHistory(#[from] InsufficientHistoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_offending_values() {
        let e = RangeError::Overflow {
            field: ConfigField::Start,
            value: U256::from(1u64 << 40),
            bits: 32,
        };
        assert_eq!(e.to_string(), "start 1099511627776 does not fit in 32 bits");

        let e: Error = InvalidReceiverError::TooManyReceivers { count: 101, max: 100 }.into();
        assert_eq!(e.to_string(), "101 receivers exceed the maximum of 100");
    }
}
