//! Receiver-list canonicalization.
//!
//! The chain hashes the bytes of the *sorted* list and rejects lists that are
//! not strictly ascending, so two clients holding the same logical receiver set
//! must agree on one byte order. The rules:
//!
//! - streams: ascending by `(account_id, config)`, config compared as an
//!   unsigned integer; exact duplicates collapse to one entry;
//! - splits: ascending by `account_id`; exact duplicates collapse, an account
//!   listed with two different weights is rejected.
//!
//! Both functions are idempotent and insensitive to input order.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::InvalidReceiverError;
use crate::hash::Receiver;
use crate::types::{SplitsReceiver, StreamReceiver};

/// Maximum receivers in a streams list.
pub const MAX_STREAMS_RECEIVERS: usize = 100;

/// Maximum receivers in a splits list.
pub const MAX_SPLITS_RECEIVERS: usize = 200;

/// Weight a non-empty splits list must add up to.
pub const TOTAL_SPLITS_WEIGHT: u32 = 1_000_000;

/// Protocol limits applied during canonicalization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolLimits {
    /// See [`MAX_STREAMS_RECEIVERS`].
    pub max_streams_receivers: usize,
    /// See [`MAX_SPLITS_RECEIVERS`].
    pub max_splits_receivers: usize,
    /// See [`TOTAL_SPLITS_WEIGHT`].
    pub total_splits_weight: u32,
}

impl Default for ProtocolLimits {
    fn default() -> Self {
        Self {
            max_streams_receivers: MAX_STREAMS_RECEIVERS,
            max_splits_receivers: MAX_SPLITS_RECEIVERS,
            total_splits_weight: TOTAL_SPLITS_WEIGHT,
        }
    }
}

/// Canonicalize a streams list under the default [`ProtocolLimits`].
pub fn canonicalize_streams<I>(receivers: I) -> Result<Vec<StreamReceiver>, InvalidReceiverError>
where
    I: IntoIterator<Item = StreamReceiver>,
{
    canonicalize_streams_with(receivers, &ProtocolLimits::default())
}

/// Sort, deduplicate and validate a streams list.
///
/// # Errors
/// [`InvalidReceiverError::ZeroAmountPerSec`] for a zero-rate entry and
/// [`InvalidReceiverError::TooManyReceivers`] past `limits.max_streams_receivers`.
pub fn canonicalize_streams_with<I>(
    receivers: I,
    limits: &ProtocolLimits,
) -> Result<Vec<StreamReceiver>, InvalidReceiverError>
where
    I: IntoIterator<Item = StreamReceiver>,
{
    let list = sort_dedup(receivers);
    if let Some(r) = list.iter().find(|r| r.config.amount_per_sec().is_zero()) {
        return Err(InvalidReceiverError::ZeroAmountPerSec {
            account_id: r.account_id,
        });
    }
    if list.len() > limits.max_streams_receivers {
        return Err(InvalidReceiverError::TooManyReceivers {
            count: list.len(),
            max: limits.max_streams_receivers,
        });
    }
    debug!(receivers = list.len(), "canonicalized streams receivers");
    Ok(list)
}

/// Canonicalize a splits list under the default [`ProtocolLimits`].
pub fn canonicalize_splits<I>(receivers: I) -> Result<Vec<SplitsReceiver>, InvalidReceiverError>
where
    I: IntoIterator<Item = SplitsReceiver>,
{
    canonicalize_splits_with(receivers, &ProtocolLimits::default())
}

/// Sort, deduplicate and validate a splits list.
///
/// The weight sum is *not* checked here; see [`validate_splits_for_submission`].
///
/// # Errors
/// [`InvalidReceiverError::ZeroWeight`], [`InvalidReceiverError::DuplicateAccount`]
/// and [`InvalidReceiverError::TooManyReceivers`].
pub fn canonicalize_splits_with<I>(
    receivers: I,
    limits: &ProtocolLimits,
) -> Result<Vec<SplitsReceiver>, InvalidReceiverError>
where
    I: IntoIterator<Item = SplitsReceiver>,
{
    let list = sort_dedup(receivers);
    if let Some(r) = list.iter().find(|r| r.weight == 0) {
        return Err(InvalidReceiverError::ZeroWeight {
            account_id: r.account_id,
        });
    }
    if let Some(pair) = list.windows(2).find(|w| w[0].account_id == w[1].account_id) {
        return Err(InvalidReceiverError::DuplicateAccount {
            account_id: pair[1].account_id,
        });
    }
    if list.len() > limits.max_splits_receivers {
        return Err(InvalidReceiverError::TooManyReceivers {
            count: list.len(),
            max: limits.max_splits_receivers,
        });
    }
    debug!(receivers = list.len(), "canonicalized splits receivers");
    Ok(list)
}

/// Final check before a splits list is submitted: canonical order, and
/// either empty (clears all splits) or weights summing to the protocol total.
pub fn validate_splits_for_submission(
    receivers: &[SplitsReceiver],
    limits: &ProtocolLimits,
) -> Result<(), InvalidReceiverError> {
    if let Some(index) = first_out_of_order(receivers) {
        return Err(InvalidReceiverError::NotCanonical { index });
    }
    if receivers.is_empty() {
        return Ok(());
    }
    let sum: u64 = receivers.iter().map(|r| u64::from(r.weight)).sum();
    if sum != u64::from(limits.total_splits_weight) {
        return Err(InvalidReceiverError::WeightSumMismatch {
            sum,
            expected: limits.total_splits_weight,
        });
    }
    Ok(())
}

/// Returns `true` if `receivers` is strictly ascending (sorted, no duplicates).
#[must_use]
pub fn is_canonical<R: Receiver>(receivers: &[R]) -> bool {
    first_out_of_order(receivers).is_none()
}

fn first_out_of_order<R: Ord>(receivers: &[R]) -> Option<usize> {
    receivers
        .windows(2)
        .position(|w| w[0] >= w[1])
        .map(|i| i + 1)
}

fn sort_dedup<R: Ord, I: IntoIterator<Item = R>>(receivers: I) -> Vec<R> {
    let mut list: Vec<R> = receivers.into_iter().collect();
    list.sort_unstable();
    list.dedup();
    list
}
