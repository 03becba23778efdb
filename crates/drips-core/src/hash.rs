//! Receiver-list hashing and the streams history hash chain.
//!
//! Both hashes reproduce the contract bit-for-bit:
//!
//! ```text
//! listHash    = len == 0 ? bytes32(0) : keccak256(abi.encode(receivers))
//! historyHash = keccak256(abi.encode(prevHistoryHash, listHash, updateTime, maxEnd))
//! ```
//!
//! The ABI layouts come from `sol!` definitions of the on-chain structs, so the
//! encoding is produced by `alloy-sol-types` rather than hand-assembled words.

use alloy_primitives::{keccak256, B256, U256};
use alloy_sol_types::{sol_data, SolType};
use std::fmt;

use crate::types::{AccountId, HistoryEntry, SplitsReceiver, StreamReceiver};

mod abi {
    alloy_sol_types::sol! {
        struct StreamReceiver {
            uint256 accountId;
            uint256 config;
        }

        struct SplitsReceiver {
            uint256 accountId;
            uint32 weight;
        }

        // updateTime/maxEnd are uint32 on chain; a uint256 word carries the same bytes.
        struct StreamsHistoryLink {
            bytes32 previous;
            bytes32 streamsHash;
            uint256 updateTime;
            uint256 maxEnd;
        }
    }
}

/// Hash the contract reports for an empty receiver list.
pub const EMPTY_RECEIVERS_HASH: B256 = B256::ZERO;

/// A receiver list element the chain knows how to hash.
pub trait Receiver: Clone + Ord + fmt::Debug {
    /// Receiving account.
    fn account_id(&self) -> AccountId;

    /// `abi.encode(receivers)` for a list of this kind.
    fn abi_encode_list(receivers: &[Self]) -> Vec<u8>;
}

impl Receiver for StreamReceiver {
    #[inline]
    fn account_id(&self) -> AccountId {
        self.account_id
    }

    fn abi_encode_list(receivers: &[Self]) -> Vec<u8> {
        let items: Vec<abi::StreamReceiver> = receivers
            .iter()
            .map(|r| abi::StreamReceiver {
                accountId: r.account_id,
                config: r.config.into_raw(),
            })
            .collect();
        <sol_data::Array<abi::StreamReceiver> as SolType>::abi_encode(&items)
    }
}

impl Receiver for SplitsReceiver {
    #[inline]
    fn account_id(&self) -> AccountId {
        self.account_id
    }

    fn abi_encode_list(receivers: &[Self]) -> Vec<u8> {
        let items: Vec<abi::SplitsReceiver> = receivers
            .iter()
            .map(|r| abi::SplitsReceiver {
                accountId: r.account_id,
                weight: r.weight,
            })
            .collect();
        <sol_data::Array<abi::SplitsReceiver> as SolType>::abi_encode(&items)
    }
}

/// Receiver-list hash of an already canonical list.
///
/// The list is hashed as given; callers canonicalize first.
#[must_use]
pub fn hash_receivers<R: Receiver>(receivers: &[R]) -> B256 {
    if receivers.is_empty() {
        return EMPTY_RECEIVERS_HASH;
    }
    keccak256(R::abi_encode_list(receivers))
}

/// One step of the history hash chain from raw fields.
#[must_use]
pub fn chain_history_link(previous: B256, list_hash: B256, update_timestamp: u64, max_end: u64) -> B256 {
    let link = abi::StreamsHistoryLink {
        previous,
        streamsHash: list_hash,
        updateTime: U256::from(update_timestamp),
        maxEnd: U256::from(max_end),
    };
    keccak256(<abi::StreamsHistoryLink as SolType>::abi_encode(&link))
}

/// One step of the history hash chain.
///
/// Disclosed entries are hashed through their receivers, hidden ones through
/// `list_hash`; both yield the same link for the same list.
#[must_use]
pub fn chain_history(previous: B256, entry: &HistoryEntry) -> B256 {
    let list_hash = if entry.is_hidden() {
        entry.list_hash
    } else {
        hash_receivers(&entry.receivers)
    };
    chain_history_link(previous, list_hash, entry.update_timestamp, entry.max_end)
}

/// Replay `entries` from `anchor` and return the resulting history hash.
#[must_use]
pub fn replay_history<'a, I>(anchor: B256, entries: I) -> B256
where
    I: IntoIterator<Item = &'a HistoryEntry>,
{
    let mut chain = HistoryChain::new(anchor);
    for entry in entries {
        chain.absorb(entry);
    }
    chain.head()
}

/// Running history hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoryChain {
    head: B256,
}

impl HistoryChain {
    /// Start from a known history hash (zero for an account's first update).
    #[inline]
    #[must_use]
    pub const fn new(anchor: B256) -> Self {
        Self { head: anchor }
    }

    /// Append one entry and return the new head.
    pub fn absorb(&mut self, entry: &HistoryEntry) -> B256 {
        self.head = chain_history(self.head, entry);
        self.head
    }

    /// Append a link given by its raw fields and return the new head.
    pub fn absorb_link(&mut self, list_hash: B256, update_timestamp: u64, max_end: u64) -> B256 {
        self.head = chain_history_link(self.head, list_hash, update_timestamp, max_end);
        self.head
    }

    /// Current head.
    #[inline]
    #[must_use]
    pub const fn head(&self) -> B256 {
        self.head
    }
}
