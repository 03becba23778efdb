//! Canonical core types shared across the Drips client workspace.
//!
//! These live in `drips-core` and are re-exported at the crate root so other
//! crates can import via `drips_core::StreamReceiver`, `drips_core::HistoryEntry`, etc.
//!
//! Serialized forms stay conservative (serde; 256-bit values as `0x` hex strings).

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::config::{PackedStreamConfig, StreamConfig};
use crate::events::EventOrdinal;

/// Protocol account identifier (`uint256`).
pub type AccountId = U256;

/// One entry of a streams receiver list.
///
/// Field order matters: the derived `Ord` compares `account_id` first and the
/// packed config second, which is the ordering the chain enforces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StreamReceiver {
    /// Receiving account.
    pub account_id: AccountId,
    /// Packed stream parameters.
    pub config: PackedStreamConfig,
}

impl StreamReceiver {
    /// Construct a receiver.
    #[inline]
    #[must_use]
    pub const fn new(account_id: AccountId, config: PackedStreamConfig) -> Self {
        Self { account_id, config }
    }

    /// Unpacked view of `config`.
    #[inline]
    #[must_use]
    pub fn stream_config(&self) -> StreamConfig {
        self.config.decode()
    }
}

/// One entry of a splits receiver list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SplitsReceiver {
    /// Receiving account.
    pub account_id: AccountId,
    /// Share of the total splits weight.
    pub weight: u32,
}

impl SplitsReceiver {
    /// Construct a receiver.
    #[inline]
    #[must_use]
    pub const fn new(account_id: AccountId, weight: u32) -> Self {
        Self { account_id, weight }
    }
}

/// A reconciled streams receiver list, as set by one list-changed event.
///
/// **Invariant:** `hash == hash_receivers(&receivers)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverListState {
    /// Receiver-list hash committed on chain.
    pub hash: B256,
    /// Canonically ordered receivers (empty for a cleared list).
    pub receivers: Vec<StreamReceiver>,
    /// Block timestamp of the update.
    pub update_timestamp: u64,
    /// Timestamp at which the balance runs out under this list.
    pub max_end: u64,
    /// Sender balance after the update.
    pub balance: u128,
    /// History hash before this update, when the event source provides it.
    #[serde(default)]
    pub history_hash: Option<B256>,
    /// Position of the originating event, when known.
    #[serde(default)]
    pub ordinal: Option<EventOrdinal>,
}

impl ReceiverListState {
    /// Returns `true` if the list streams to `account_id` at a non-zero rate.
    #[must_use]
    pub fn streams_to(&self, account_id: AccountId) -> bool {
        self.receivers
            .iter()
            .any(|r| r.account_id == account_id && !r.config.amount_per_sec().is_zero())
    }

    /// History entry for this state; receivers are disclosed only if `disclose`.
    #[must_use]
    pub fn to_history_entry(&self, disclose: bool) -> HistoryEntry {
        if disclose {
            HistoryEntry::disclosed(self.receivers.clone(), self.update_timestamp, self.max_end)
        } else {
            HistoryEntry::hidden(self.hash, self.update_timestamp, self.max_end)
        }
    }
}

/// A reconciled splits receiver list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitsState {
    /// Splits hash committed on chain.
    pub hash: B256,
    /// Canonically ordered receivers.
    pub receivers: Vec<SplitsReceiver>,
    /// Block timestamp of the update.
    pub update_timestamp: u64,
    /// Position of the originating event, when known.
    #[serde(default)]
    pub ordinal: Option<EventOrdinal>,
}

/// One link of a streams history as submitted to the chain.
///
/// Either `receivers` is non-empty and `list_hash` is zero (the chain recomputes
/// the hash), or `receivers` is empty and `list_hash` stands in for the hidden
/// list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Hash of a hidden list; zero when `receivers` are disclosed.
    pub list_hash: B256,
    /// Disclosed receivers; empty when hidden.
    pub receivers: Vec<StreamReceiver>,
    /// Block timestamp of the update.
    pub update_timestamp: u64,
    /// Balance-exhaustion timestamp under this list.
    pub max_end: u64,
}

impl HistoryEntry {
    /// An entry disclosing its receivers.
    #[must_use]
    pub const fn disclosed(receivers: Vec<StreamReceiver>, update_timestamp: u64, max_end: u64) -> Self {
        Self {
            list_hash: B256::ZERO,
            receivers,
            update_timestamp,
            max_end,
        }
    }

    /// An entry hiding its receivers behind `list_hash`.
    #[must_use]
    pub const fn hidden(list_hash: B256, update_timestamp: u64, max_end: u64) -> Self {
        Self {
            list_hash,
            receivers: Vec::new(),
            update_timestamp,
            max_end,
        }
    }

    /// Whether the receivers are withheld.
    #[inline]
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.receivers.is_empty()
    }
}

/// Arguments for the chain's squeeze call. Built on demand, submitted once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqueezeProof {
    /// Receiver claiming the funds.
    pub account_id: AccountId,
    /// Streamed token.
    pub token: Address,
    /// Sender being squeezed.
    pub sender_id: AccountId,
    /// Sender history hash immediately before `history[0]`.
    pub history_hash: B256,
    /// Trailing history of the sender.
    pub history: Vec<HistoryEntry>,
}
