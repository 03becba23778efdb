//! Reconstruct receiver-list histories from indexer events.
//!
//! The chain stores only hashes. A list-changed event names the hash of the
//! new list; the list itself is disclosed once, through receiver-seen events,
//! the first time that hash is used. Reconciliation is a fold over the events
//! in chain order with one checkpoint per distinct list hash:
//!
//! 1. order list-changed events by `update_timestamp`, breaking ties by
//!    ordinal, and check consecutive emitted history hashes;
//! 2. collect the distinct list hashes in first-use order;
//! 3. gather and canonicalize every receiver seen for each hash;
//! 4. verify `hash_receivers(list) == list_hash` for each;
//! 5. attach the verified list to every event that used the hash.
//!
//! Any failed checkpoint aborts the whole reconciliation: a partial history is
//! never returned.

use alloy_primitives::{Address, B256};
use drips_core::{
    chain_history_link, hash_receivers, AccountId, EventBatch, EventOrdinal, HistoryChain, ListChangedEvent,
    Receiver, ReceiverListState, ReceiverSeenEvent, ReconciliationError,
    SplitsReceiverSeenEvent, SplitsSetEvent, SplitsState,
};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, instrument, warn};

/// Reconciliation knobs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Fail with [`ReconciliationError::AmbiguousOrder`] when events share a
    /// timestamp and are not all ordinal-tagged, instead of keeping their input
    /// order. Recommended whenever the indexer exposes log positions.
    #[serde(default)]
    pub require_ordinals: bool,
}

/// Verified receiver-list history of one (account, token) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledHistory {
    /// Sender.
    pub account_id: AccountId,
    /// Streamed token.
    pub token: Address,
    /// States in chain order; every `hash` matches its `receivers`.
    pub states: Vec<ReceiverListState>,
}

impl ReconciledHistory {
    /// Most recent state, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&ReceiverListState> {
        self.states.last()
    }

    /// Whether the account never set a list for this token.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Compare the latest list hash with the one read from the chain.
    ///
    /// An empty history corresponds to the empty-list hash.
    pub fn verify_list_hash(&self, on_chain: B256) -> Result<(), ReconciliationError> {
        let reconciled = self.latest().map_or(B256::ZERO, |s| s.hash);
        if reconciled != on_chain {
            warn!(%on_chain, %reconciled, "list hash checkpoint mismatch");
            return Err(ReconciliationError::CheckpointMismatch {
                on_chain,
                reconciled,
            });
        }
        Ok(())
    }

    /// History hash after replaying every state from `anchor`.
    #[must_use]
    pub fn history_head(&self, anchor: B256) -> B256 {
        let mut chain = HistoryChain::new(anchor);
        for s in &self.states {
            chain.absorb_link(s.hash, s.update_timestamp, s.max_end);
        }
        chain.head()
    }
}

/// Stateless event reconciler.
#[derive(Clone, Copy, Debug, Default)]
pub struct HistoryReconciler {
    config: ReconcileConfig,
}

impl HistoryReconciler {
    /// Reconciler with the given configuration.
    #[must_use]
    pub const fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Reconcile a batch for one (account, token) pair.
    pub fn reconcile(&self, batch: &EventBatch) -> Result<ReconciledHistory, ReconciliationError> {
        self.reconcile_events(
            batch.account_id,
            batch.token,
            &batch.list_changed,
            &batch.receivers_seen,
        )
    }

    /// Reconcile streams events of `(account_id, token)`.
    #[instrument(level = "debug", skip_all, fields(account = %account_id, token = %token, events = list_changed.len()))]
    pub fn reconcile_events(
        &self,
        account_id: AccountId,
        token: Address,
        list_changed: &[ListChangedEvent],
        receivers_seen: &[ReceiverSeenEvent],
    ) -> Result<ReconciledHistory, ReconciliationError> {
        if let Some(e) = list_changed
            .iter()
            .find(|e| e.account_id != account_id || e.token != token)
        {
            return Err(ReconciliationError::ForeignEvent {
                expected_account: account_id,
                expected_token: token,
                account_id: e.account_id,
                token: e.token,
            });
        }

        let ordered = order_events(list_changed, |e| (e.update_timestamp, e.ordinal), self.config)?;
        check_history_links(&ordered)?;
        let lists = resolve_lists(
            ordered.iter().map(|e| e.list_hash),
            receivers_seen.iter().map(|s| (s.list_hash, s.receiver)),
        )?;

        let mut states = Vec::with_capacity(ordered.len());
        for e in ordered {
            let receivers = lists.get(&e.list_hash).cloned().unwrap_or_default();
            states.push(ReceiverListState {
                hash: e.list_hash,
                receivers,
                update_timestamp: e.update_timestamp,
                max_end: e.max_end,
                balance: e.balance,
                history_hash: e.history_hash,
                ordinal: e.ordinal,
            });
        }
        debug!(states = states.len(), lists = lists.len(), "reconciled streams history");
        Ok(ReconciledHistory {
            account_id,
            token,
            states,
        })
    }

    /// Reconcile splits events of `account_id` into verified splits states.
    #[instrument(level = "debug", skip_all, fields(account = %account_id, events = splits_set.len()))]
    pub fn reconcile_splits(
        &self,
        account_id: AccountId,
        splits_set: &[SplitsSetEvent],
        receivers_seen: &[SplitsReceiverSeenEvent],
    ) -> Result<Vec<SplitsState>, ReconciliationError> {
        if let Some(e) = splits_set.iter().find(|e| e.account_id != account_id) {
            return Err(ReconciliationError::ForeignSplitsEvent {
                expected_account: account_id,
                account_id: e.account_id,
            });
        }

        let ordered = order_events(splits_set, |e| (e.update_timestamp, e.ordinal), self.config)?;
        let lists = resolve_lists(
            ordered.iter().map(|e| e.list_hash),
            receivers_seen.iter().map(|s| (s.list_hash, s.receiver)),
        )?;

        let states: Vec<SplitsState> = ordered
            .into_iter()
            .map(|e| SplitsState {
                hash: e.list_hash,
                receivers: lists.get(&e.list_hash).cloned().unwrap_or_default(),
                update_timestamp: e.update_timestamp,
                ordinal: e.ordinal,
            })
            .collect();
        debug!(states = states.len(), "reconciled splits history");
        Ok(states)
    }
}

/// Order events by timestamp, dropping repeated deliveries of one log.
///
/// Runs sharing a timestamp are ordered by ordinal when every event in the
/// run carries one and keep input order otherwise. Two different events with
/// the same ordinal are a conflict, whatever their input order.
fn order_events<E, F>(
    events: &[E],
    key: F,
    config: ReconcileConfig,
) -> Result<Vec<&E>, ReconciliationError>
where
    E: PartialEq,
    F: Fn(&E) -> (u64, Option<EventOrdinal>),
{
    let mut delivered: HashMap<EventOrdinal, &E> = HashMap::new();
    let mut ordered: Vec<&E> = Vec::with_capacity(events.len());
    for e in events {
        if let (_, Some(ordinal)) = key(e) {
            match delivered.entry(ordinal) {
                Entry::Occupied(first) if *first.get() == e => continue,
                Entry::Occupied(_) => {
                    warn!(%ordinal, "conflicting events share a log position");
                    return Err(ReconciliationError::ConflictingEvents { ordinal });
                }
                Entry::Vacant(slot) => {
                    slot.insert(e);
                }
            }
        }
        ordered.push(e);
    }

    ordered.sort_by_key(|e| key(e).0);
    for run in ordered.chunk_by_mut(|a, b| key(a).0 == key(b).0) {
        if run.len() < 2 {
            continue;
        }
        if run.iter().all(|e| key(e).1.is_some()) {
            run.sort_by_key(|e| key(e).1);
        } else if config.require_ordinals {
            return Err(ReconciliationError::AmbiguousOrder {
                update_timestamp: key(run[0]).0,
            });
        }
    }
    Ok(ordered)
}

/// Check every emitted pre-update history hash against the link from the
/// update before it. Events without an emitted hash are skipped.
fn check_history_links(ordered: &[&ListChangedEvent]) -> Result<(), ReconciliationError> {
    for pair in ordered.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        let (Some(anchor), Some(emitted)) = (prev.history_hash, next.history_hash) else {
            continue;
        };
        let expected = chain_history_link(anchor, prev.list_hash, prev.update_timestamp, prev.max_end);
        if emitted != expected {
            warn!(update_timestamp = next.update_timestamp, %emitted, %expected, "history hash chain broken");
            return Err(ReconciliationError::BrokenHistoryLink {
                update_timestamp: next.update_timestamp,
                emitted,
                expected,
            });
        }
    }
    Ok(())
}

/// Canonical receivers for every hash in `hashes`, verified against the hash.
///
/// Seen receivers for hashes no event uses are ignored.
fn resolve_lists<R, H, S>(hashes: H, seen: S) -> Result<BTreeMap<B256, Vec<R>>, ReconciliationError>
where
    R: Receiver,
    H: IntoIterator<Item = B256>,
    S: IntoIterator<Item = (B256, R)>,
{
    let mut used = HashSet::new();
    let distinct: Vec<B256> = hashes.into_iter().filter(|h| used.insert(*h)).collect();

    let mut gathered: BTreeMap<B256, Vec<R>> = BTreeMap::new();
    for (hash, receiver) in seen {
        if used.contains(&hash) {
            gathered.entry(hash).or_default().push(receiver);
        }
    }

    let mut lists = BTreeMap::new();
    for hash in distinct {
        let mut receivers = gathered.remove(&hash).unwrap_or_default();
        receivers.sort_unstable();
        receivers.dedup();
        let computed = hash_receivers(&receivers);
        if computed != hash {
            warn!(list_hash = %hash, %computed, receivers = receivers.len(), "receiver list does not match its hash");
            return Err(ReconciliationError::HashMismatch {
                list_hash: hash,
                computed,
                receivers: receivers.len(),
            });
        }
        lists.insert(hash, receivers);
    }
    Ok(lists)
}
