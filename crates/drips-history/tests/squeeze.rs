//! Squeeze selection at cycle boundaries and proof assembly.

use alloy_primitives::{Address, B256, U256};
use drips_core::{
    canonicalize_streams, chain_history_link, hash_receivers, replay_history, EventBatch,
    ListChangedEvent, PackedStreamConfig, ReceiverListState, ReceiverSeenEvent, StreamConfig,
    StreamReceiver,
};
use drips_history::{CycleConfig, HistoryReconciler, ReconciledHistory, SqueezeSelector};

const CYCLE: u64 = 100;
const RECEIVER: u64 = 42;

fn selector() -> SqueezeSelector {
    SqueezeSelector::new(CycleConfig::new(CYCLE).unwrap())
}

fn receiver(account: u64) -> StreamReceiver {
    let config = StreamConfig::new(0, U256::from(1_000_000_000u64), 0, 0).encode().unwrap();
    StreamReceiver::new(U256::from(account), config)
}

fn state(receivers: Vec<StreamReceiver>, ts: u64) -> ReceiverListState {
    ReceiverListState {
        hash: hash_receivers(&receivers),
        receivers,
        update_timestamp: ts,
        max_end: ts + 10_000,
        balance: 500,
        history_hash: None,
        ordinal: None,
    }
}

fn history(sender: u64, states: Vec<ReceiverListState>) -> ReconciledHistory {
    ReconciledHistory {
        account_id: U256::from(sender),
        token: Address::ZERO,
        states,
    }
}

/// Fill in the emitted pre-update history hash of every state from genesis.
fn with_emitted_hashes(mut states: Vec<ReceiverListState>) -> (Vec<ReceiverListState>, B256) {
    let mut head = B256::ZERO;
    for s in &mut states {
        s.history_hash = Some(head);
        head = chain_history_link(head, s.hash, s.update_timestamp, s.max_end);
    }
    (states, head)
}

#[test]
fn boundary_is_exclusive_at_cycle_start() {
    let now = 250;
    let at_start = history(1, vec![state(vec![receiver(RECEIVER)], 200)]);
    let after_start = history(2, vec![state(vec![receiver(RECEIVER)], 201)]);
    let selected = selector().select_squeezable_senders(
        U256::from(RECEIVER),
        Address::ZERO,
        [&at_start, &after_start],
        now,
    );
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[&U256::from(2u8)].len(), 1);
}

#[test]
fn zero_balance_other_token_and_other_receiver_are_excluded() {
    let now = 250;
    let mut drained = state(vec![receiver(RECEIVER)], 210);
    drained.balance = 0;
    let mut foreign = history(2, vec![state(vec![receiver(RECEIVER)], 210)]);
    foreign.token = Address::repeat_byte(1);
    let elsewhere = history(3, vec![state(vec![receiver(RECEIVER + 1)], 210)]);
    let selected = selector().select_squeezable_senders(
        U256::from(RECEIVER),
        Address::ZERO,
        [&history(1, vec![drained]), &foreign, &elsewhere],
        now,
    );
    assert!(selected.is_empty());
}

#[test]
fn end_to_end_single_stream() {
    let config = StreamConfig::new(7, U256::from(3_000_000_000u64), 0, 0);
    let packed = config.encode().unwrap();
    assert_eq!(PackedStreamConfig::decode(packed), config);

    let r = StreamReceiver::new(U256::from(RECEIVER), packed);
    let list = canonicalize_streams([r]).unwrap();
    assert_eq!(list, vec![r]);

    let sender = U256::from(9u8);
    let list_hash = hash_receivers(&list);
    let mut batch = EventBatch::new(sender, Address::ZERO);
    batch.list_changed.push(ListChangedEvent {
        account_id: sender,
        token: Address::ZERO,
        list_hash,
        update_timestamp: 1_005,
        max_end: 5_000,
        balance: 12_000,
        history_hash: Some(B256::ZERO),
        ordinal: None,
    });
    batch.receivers_seen.push(ReceiverSeenEvent { list_hash, receiver: r });

    let reconciled = HistoryReconciler::default().reconcile(&batch).unwrap();
    let selected =
        selector().select_squeezable_senders(U256::from(RECEIVER), Address::ZERO, [&reconciled], 1_050);
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[&sender], reconciled.states);

    let head = reconciled.history_head(B256::ZERO);
    let proof = selector()
        .build_squeeze_proof(U256::from(RECEIVER), sender, Address::ZERO, &reconciled.states, head, 1_050)
        .unwrap();
    assert_eq!(proof.history_hash, B256::ZERO);
    assert_eq!(proof.history.len(), 1);
    assert_eq!(proof.history[0].receivers, list);
}

#[test]
fn proof_uses_the_shortest_covering_suffix() {
    let states = vec![
        state(vec![receiver(7)], 50),
        state(vec![receiver(7), receiver(RECEIVER)], 120),
        state(vec![receiver(RECEIVER)], 210),
        state(vec![], 230),
    ];
    let (states, head) = with_emitted_hashes(states);
    let proof = selector()
        .build_squeeze_proof(U256::from(RECEIVER), U256::from(1u8), Address::ZERO, &states, head, 250)
        .unwrap();

    assert_eq!(proof.history.len(), 3);
    assert_eq!(Some(proof.history_hash), states[1].history_hash);
    assert!(!proof.history[0].is_hidden());
    assert!(!proof.history[1].is_hidden());
    assert!(proof.history[2].is_hidden());
    assert_eq!(replay_history(proof.history_hash, &proof.history), head);
}

#[test]
fn anchors_are_replayed_when_not_emitted() {
    let states = vec![
        state(vec![receiver(7)], 50),
        state(vec![receiver(RECEIVER)], 120),
        state(vec![receiver(RECEIVER)], 210),
    ];
    let (emitted, head) = with_emitted_hashes(states.clone());
    let proof = selector()
        .build_squeeze_proof(U256::from(RECEIVER), U256::from(1u8), Address::ZERO, &states, head, 250)
        .unwrap();
    assert_eq!(Some(proof.history_hash), emitted[1].history_hash);
    assert_eq!(proof.history.len(), 2);
}

#[test]
fn insufficient_history_is_reported() {
    let states = vec![
        state(vec![receiver(7)], 50),
        state(vec![receiver(RECEIVER)], 120),
        state(vec![receiver(RECEIVER)], 210),
    ];
    let (_, head) = with_emitted_hashes(states.clone());

    // A suffix fetched without emitted hashes cannot be anchored.
    let partial = &states[1..];
    let err = selector()
        .build_squeeze_proof(U256::from(RECEIVER), U256::from(1u8), Address::ZERO, partial, head, 250)
        .unwrap_err();
    assert_eq!(err.expected, head);
    assert_eq!(err.available, 2);

    let err = selector()
        .build_squeeze_proof(U256::from(RECEIVER), U256::from(1u8), Address::ZERO, &[], head, 250)
        .unwrap_err();
    assert_eq!(err.available, 0);
}
