//! Squeezable-sender selection and squeeze proofs.
//!
//! Squeezing lets a receiver collect what a sender streamed to them inside the
//! still-open cycle. The chain authorizes it against the sender's stored
//! history hash, so the caller must present a run of history entries that
//! replays from some earlier history hash to the current one and covers the
//! open cycle.

use alloy_primitives::{Address, B256};
use drips_core::{
    chain_history_link, AccountId, HistoryEntry, InsufficientHistoryError, ReceiverListState,
    SqueezeProof,
};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

use crate::cycle::{CycleBoundary, CycleConfig};
use crate::reconcile::ReconciledHistory;

/// Squeeze decisions under a cycle boundary.
#[derive(Clone, Copy, Debug, Default)]
pub struct SqueezeSelector<C: CycleBoundary = CycleConfig> {
    cycle: C,
}

impl<C: CycleBoundary> SqueezeSelector<C> {
    /// Selector using `cycle` to locate the open cycle.
    pub const fn new(cycle: C) -> Self {
        Self { cycle }
    }

    /// Cycle boundary in use.
    pub const fn cycle(&self) -> &C {
        &self.cycle
    }

    /// Whether `state` holds squeezable funds for `receiver` at `now`:
    /// the list streams to them at a non-zero rate, the balance is non-zero,
    /// and the update happened inside the open cycle.
    pub fn is_qualifying(&self, receiver: AccountId, state: &ReceiverListState, now: u64) -> bool {
        state.balance != 0
            && self.cycle.is_in_open_cycle(state.update_timestamp, now)
            && state.streams_to(receiver)
    }

    /// Senders among `candidates` with at least one qualifying state for
    /// `receiver` and `token`, mapped to those states in chain order.
    pub fn select_squeezable_senders<'a, I>(
        &self,
        receiver: AccountId,
        token: Address,
        candidates: I,
        now: u64,
    ) -> BTreeMap<AccountId, Vec<ReceiverListState>>
    where
        I: IntoIterator<Item = &'a ReconciledHistory>,
    {
        let mut selected: BTreeMap<AccountId, Vec<ReceiverListState>> = BTreeMap::new();
        for history in candidates {
            if history.token != token {
                continue;
            }
            let qualifying = history
                .states
                .iter()
                .filter(|s| self.is_qualifying(receiver, s, now))
                .cloned();
            let entry = selected.entry(history.account_id).or_default();
            entry.extend(qualifying);
            if entry.is_empty() {
                selected.remove(&history.account_id);
            }
        }
        debug!(%receiver, senders = selected.len(), "selected squeezable senders");
        selected
    }

    /// Build the shortest history suffix that covers the open cycle and
    /// replays to `known_history_hash`, the sender's current on-chain value.
    ///
    /// `history` must be in chain order. Each state's starting hash is its
    /// emitted `history_hash` when present, otherwise the replay of the
    /// previous one (zero before the first state). Receivers are disclosed
    /// only for lists containing `receiver`.
    #[instrument(level = "debug", skip(self, history), fields(states = history.len()))]
    pub fn build_squeeze_proof(
        &self,
        receiver: AccountId,
        sender: AccountId,
        token: Address,
        history: &[ReceiverListState],
        known_history_hash: B256,
        now: u64,
    ) -> Result<SqueezeProof, InsufficientHistoryError> {
        let insufficient = || InsufficientHistoryError {
            sender_id: sender,
            expected: known_history_hash,
            available: history.len(),
        };
        let Some(first) = history.first() else {
            warn!("no history to squeeze from");
            return Err(insufficient());
        };

        let cycle_start = self.cycle.cycle_start(now);
        let covering = history
            .iter()
            .rposition(|s| s.update_timestamp <= cycle_start)
            .unwrap_or(0);

        let mut anchors = Vec::with_capacity(history.len());
        anchors.push(first.history_hash.unwrap_or(B256::ZERO));
        for pair in history.windows(2) {
            let prev = anchors[anchors.len() - 1];
            let next = pair[1]
                .history_hash
                .unwrap_or_else(|| link(prev, &pair[0]));
            anchors.push(next);
        }

        for start in (0..=covering).rev() {
            let head = history[start..]
                .iter()
                .fold(anchors[start], |acc, s| link(acc, s));
            if head != known_history_hash {
                continue;
            }
            let entries: Vec<HistoryEntry> = history[start..]
                .iter()
                .map(|s| s.to_history_entry(s.receivers.iter().any(|r| r.account_id == receiver)))
                .collect();
            debug!(start, entries = entries.len(), "squeeze history suffix found");
            return Ok(SqueezeProof {
                account_id: receiver,
                token,
                sender_id: sender,
                history_hash: anchors[start],
                history: entries,
            });
        }

        warn!(%known_history_hash, "no history suffix replays to the on-chain hash");
        Err(insufficient())
    }
}

#[inline]
fn link(previous: B256, state: &ReceiverListState) -> B256 {
    chain_history_link(previous, state.hash, state.update_timestamp, state.max_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use drips_core::{hash_receivers, replay_history, StreamConfig, StreamReceiver};

    fn state(receivers: Vec<StreamReceiver>, ts: u64) -> ReceiverListState {
        ReceiverListState {
            hash: hash_receivers(&receivers),
            receivers,
            update_timestamp: ts,
            max_end: ts + 1_000,
            balance: 1,
            history_hash: None,
            ordinal: None,
        }
    }

    fn to(account: u64) -> StreamReceiver {
        let config = StreamConfig::new(0, U256::from(1_000_000_000u64), 0, 0).encode().unwrap();
        StreamReceiver::new(U256::from(account), config)
    }

    #[test]
    fn qualifying_needs_rate_balance_and_open_cycle() {
        let sel = SqueezeSelector::new(CycleConfig::new(10).unwrap());
        let r = U256::from(5u8);
        let mut s = state(vec![to(5)], 21);
        assert!(sel.is_qualifying(r, &s, 25));
        assert!(!sel.is_qualifying(U256::from(6u8), &s, 25));
        assert!(!sel.is_qualifying(r, &s, 31));
        s.balance = 0;
        assert!(!sel.is_qualifying(r, &s, 25));
    }

    #[test]
    fn proof_discloses_only_lists_with_the_receiver() {
        let sel = SqueezeSelector::new(CycleConfig::new(10).unwrap());
        let history = vec![state(vec![to(9)], 12), state(vec![to(5), to(9)], 23)];
        let head = replay_history(
            B256::ZERO,
            &history.iter().map(|s| s.to_history_entry(false)).collect::<Vec<_>>(),
        );
        let proof = sel
            .build_squeeze_proof(U256::from(5u8), U256::from(1u8), Address::ZERO, &history, head, 25)
            .unwrap();
        assert_eq!(proof.history_hash, B256::ZERO);
        assert!(proof.history[0].is_hidden());
        assert!(!proof.history[1].is_hidden());
        assert_eq!(replay_history(proof.history_hash, &proof.history), head);
    }
}
