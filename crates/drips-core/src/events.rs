//! Event model handed over by the indexer collaborator.
//!
//! The chain only stores running hashes; full receiver lists are disclosed
//! through "receiver seen" events the first time a list hash is used. These
//! structs mirror the emitted logs with one addition, [`EventOrdinal`], which
//! gives events sharing a block timestamp a total order.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{AccountId, SplitsReceiver, StreamReceiver};

/// Position of a log within the chain: `(block_number, log_index)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventOrdinal {
    /// Block containing the log.
    pub block_number: u64,
    /// Index of the log within the block.
    pub log_index: u64,
}

impl EventOrdinal {
    /// Construct an ordinal.
    #[inline]
    #[must_use]
    pub const fn new(block_number: u64, log_index: u64) -> Self {
        Self {
            block_number,
            log_index,
        }
    }
}

impl fmt::Display for EventOrdinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block {} log {}", self.block_number, self.log_index)
    }
}

/// A sender's streams receiver list changed (`StreamsSet`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListChangedEvent {
    /// Sender.
    pub account_id: AccountId,
    /// Streamed token.
    pub token: Address,
    /// Hash of the new receiver list.
    pub list_hash: B256,
    /// Block timestamp of the update.
    pub update_timestamp: u64,
    /// Balance-exhaustion timestamp under the new list.
    pub max_end: u64,
    /// Sender balance after the update.
    pub balance: u128,
    /// History hash before this update, as emitted.
    #[serde(default)]
    pub history_hash: Option<B256>,
    /// Log position, when the indexer exposes it.
    #[serde(default)]
    pub ordinal: Option<EventOrdinal>,
}

/// A receiver disclosed for a list hash (`StreamReceiverSeen`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverSeenEvent {
    /// List the receiver belongs to.
    pub list_hash: B256,
    /// Disclosed receiver.
    pub receiver: StreamReceiver,
}

/// An account's splits list changed (`SplitsSet`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitsSetEvent {
    /// Splitting account.
    pub account_id: AccountId,
    /// Hash of the new splits list.
    pub list_hash: B256,
    /// Block timestamp of the update.
    pub update_timestamp: u64,
    /// Log position, when the indexer exposes it.
    #[serde(default)]
    pub ordinal: Option<EventOrdinal>,
}

/// A splits receiver disclosed for a list hash (`SplitsReceiverSeen`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitsReceiverSeenEvent {
    /// List the receiver belongs to.
    pub list_hash: B256,
    /// Disclosed receiver.
    pub receiver: SplitsReceiver,
}

/// All streams events of one (account, token) pair, in any order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBatch {
    /// Sender.
    pub account_id: AccountId,
    /// Streamed token.
    pub token: Address,
    /// List-changed events.
    #[serde(default)]
    pub list_changed: Vec<ListChangedEvent>,
    /// Receiver-seen events for any list hash used by `list_changed`.
    #[serde(default)]
    pub receivers_seen: Vec<ReceiverSeenEvent>,
}

impl EventBatch {
    /// An empty batch for `(account_id, token)`.
    #[must_use]
    pub const fn new(account_id: AccountId, token: Address) -> Self {
        Self {
            account_id,
            token,
            list_changed: Vec::new(),
            receivers_seen: Vec::new(),
        }
    }

    /// Whether no list-changed events are present.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list_changed.is_empty()
    }
}
