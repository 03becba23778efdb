//! Invariants for the config codec, canonicalization and list hashing.
//!
//! These tests treat:
//! - the **codec** as a bijection on every config that encodes, for both
//!   layouts, and
//! - **canonicalization** as a projection: idempotent, and blind to the order
//!   and multiplicity of its input.

use alloy_primitives::{B256, U256};
use drips_core::{
    canonicalize_splits, canonicalize_streams, hash_receivers, is_canonical, ConfigLayout,
    InvalidReceiverError, PackedStreamConfig, ProtocolLimits, SplitsReceiver, StreamConfig,
    StreamReceiver, MAX_SPLITS_RECEIVERS, MAX_STREAMS_RECEIVERS, TOTAL_SPLITS_WEIGHT,
};
use proptest::prelude::*;

/// Rate strategy bounded to `bits` (never zero).
fn rate(bits: usize) -> impl Strategy<Value = U256> {
    (any::<u128>(), any::<u64>()).prop_map(move |(lo, hi)| {
        let v: U256 = (U256::from(hi) << 128) | U256::from(lo);
        let masked = if bits >= 256 { v } else { v & ((U256::from(1u8) << bits) - U256::from(1u8)) };
        if masked.is_zero() { U256::from(1u8) } else { masked }
    })
}

fn stream_receiver() -> impl Strategy<Value = StreamReceiver> {
    (0u8..8, any::<u32>(), 1u64..1_000_000, any::<u32>(), any::<u32>()).prop_map(
        |(account, id, amt, start, duration)| {
            let config = StreamConfig::new(id, U256::from(amt), u64::from(start), u64::from(duration))
                .encode()
                .unwrap();
            StreamReceiver::new(U256::from(account), config)
        },
    )
}

proptest! {
    #[test]
    fn current_layout_roundtrips(
        id in any::<u32>(),
        amt in rate(160),
        start in any::<u32>(),
        duration in any::<u32>(),
    ) {
        let c = StreamConfig::new(id, amt, u64::from(start), u64::from(duration));
        let packed = c.encode().unwrap();
        prop_assert_eq!(packed.decode(), c);
        prop_assert_eq!(packed.amount_per_sec(), amt);
        prop_assert_eq!(packed.to_string().parse::<PackedStreamConfig>().unwrap(), packed);
    }

    #[test]
    fn legacy_layout_roundtrips(amt in rate(128), start in any::<u32>(), duration in any::<u32>()) {
        let c = StreamConfig::new(0, amt, u64::from(start), u64::from(duration));
        let packed = c.encode_with(ConfigLayout::Legacy).unwrap();
        prop_assert!(packed.into_raw().bit_len() <= 192);
        prop_assert_eq!(packed.decode_with(ConfigLayout::Legacy), c);
    }

    #[test]
    fn stream_canonicalization_is_idempotent_and_order_blind(
        (list, shuffled) in prop::collection::vec(stream_receiver(), 0..24)
            .prop_flat_map(|list| (Just(list.clone()), Just(list).prop_shuffle())),
        repeats in 0usize..4,
    ) {
        let once = canonicalize_streams(list.clone()).unwrap();
        prop_assert!(is_canonical(&once));
        prop_assert_eq!(canonicalize_streams(once.clone()).unwrap(), once.clone());

        let mut shuffled = shuffled;
        shuffled.extend(list.iter().take(repeats).copied());
        let again = canonicalize_streams(shuffled).unwrap();
        prop_assert_eq!(hash_receivers(&again), hash_receivers(&once));
        prop_assert_eq!(again, once);
    }

    #[test]
    fn splits_canonicalization_is_order_blind(
        (list, shuffled) in prop::collection::btree_map(any::<u64>(), 1u32..1_000_000, 0..16)
            .prop_map(|weights| {
                weights
                    .into_iter()
                    .map(|(a, w)| SplitsReceiver::new(U256::from(a), w))
                    .collect::<Vec<_>>()
            })
            .prop_flat_map(|list| (Just(list.clone()), Just(list).prop_shuffle())),
    ) {
        let a = canonicalize_splits(list).unwrap();
        let b = canonicalize_splits(shuffled).unwrap();
        prop_assert!(is_canonical(&a));
        prop_assert_eq!(a, b);
    }

    #[test]
    fn only_the_empty_list_hashes_to_zero(list in prop::collection::vec(stream_receiver(), 0..6)) {
        let canon = canonicalize_streams(list).unwrap();
        prop_assert_eq!(hash_receivers(&canon) == B256::ZERO, canon.is_empty());
    }
}

fn distinct_streams(n: usize) -> Vec<StreamReceiver> {
    (0..n as u64)
        .map(|i| {
            let config = StreamConfig::new(0, U256::from(1u8), 0, 0).encode().unwrap();
            StreamReceiver::new(U256::from(i), config)
        })
        .collect()
}

fn distinct_splits(n: usize) -> Vec<SplitsReceiver> {
    (0..n as u64).map(|i| SplitsReceiver::new(U256::from(i), 1)).collect()
}

#[test]
fn default_limits_are_the_protocol_constants() {
    let limits = ProtocolLimits::default();
    assert_eq!(limits.max_streams_receivers, 100);
    assert_eq!(limits.max_splits_receivers, 200);
    assert_eq!(limits.total_splits_weight, 1_000_000);
    assert_eq!(
        (MAX_STREAMS_RECEIVERS, MAX_SPLITS_RECEIVERS, TOTAL_SPLITS_WEIGHT),
        (100, 200, 1_000_000)
    );
}

#[test]
fn default_limits_accept_the_maximum_and_reject_one_more() {
    assert_eq!(canonicalize_streams(distinct_streams(100)).unwrap().len(), 100);
    assert_eq!(
        canonicalize_streams(distinct_streams(101)),
        Err(InvalidReceiverError::TooManyReceivers { count: 101, max: 100 })
    );

    assert_eq!(canonicalize_splits(distinct_splits(200)).unwrap().len(), 200);
    assert_eq!(
        canonicalize_splits(distinct_splits(201)),
        Err(InvalidReceiverError::TooManyReceivers { count: 201, max: 200 })
    );
}
