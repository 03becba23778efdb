//! Serialization helpers for event batches, receiver lists and squeeze proofs.
//!
//! JSON and CBOR read/write utilities with extension-based auto-detection.
//! Unknown/missing extensions are rejected for reads and default to JSON
//! for writes.
//!
//! The core itself never touches the filesystem; these helpers exist for the
//! CLI and for fixtures exported from an indexer.

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Cursor, Write};
use std::path::Path;

use crate::events::EventBatch;
use crate::types::SqueezeProof;

/// Ensure the parent directory for a file exists (no-op if none).
fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating parent directory {}", display(path)))?;
        }
    }
    Ok(())
}

/* -------------------- generic JSON/CBOR -------------------- */

/// Read any `T` from **JSON**.
pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", display(path_ref)))?;
    let rdr = BufReader::new(f);
    serde_json::from_reader(rdr).with_context(|| format!("deserialize JSON {}", display(path_ref)))
}

/// Write any `T` to **JSON** (pretty).
pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, v: &T) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", display(path_ref)))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, v).with_context(|| "serialize JSON")?;
    w.flush().with_context(|| "flush JSON writer")?;
    Ok(())
}

/// Read any `T` from **CBOR**.
pub fn read_cbor<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", display(path_ref)))?;
    let mut rdr = BufReader::new(f);
    ciborium::de::from_reader(&mut rdr)
        .with_context(|| format!("deserialize CBOR {}", display(path_ref)))
}

/// Write any `T` to **CBOR**.
pub fn write_cbor<T: Serialize, P: AsRef<Path>>(path: P, v: &T) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", display(path_ref)))?;
    let mut w = BufWriter::new(f);
    ciborium::ser::into_writer(v, &mut w).with_context(|| "serialize CBOR")?;
    w.flush().with_context(|| "flush CBOR writer")?;
    Ok(())
}

/// Auto-detect read by extension `.json` / `.cbor` (case-insensitive).
pub fn read_auto<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    match ext_lower(path.as_ref()).as_deref() {
        Some("json") => read_json(path),
        Some("cbor") => read_cbor(path),
        Some(other) => Err(anyhow!(
            "unsupported extension: {} (supported: .json, .cbor)",
            other
        )),
        None => Err(anyhow!("path has no extension (expected .json or .cbor)")),
    }
}

/// Auto-detect write (defaults to **JSON** if unknown or missing).
pub fn write_auto<T: Serialize, P: AsRef<Path>>(path: P, v: &T) -> Result<()> {
    match ext_lower(path.as_ref()).as_deref() {
        Some("cbor") => write_cbor(path, v),
        _ => write_json(path, v),
    }
}

/* -------------------- typed wrappers -------------------- */

/// Read an [`EventBatch`] exported by the indexer.
pub fn read_event_batch_auto<P: AsRef<Path>>(path: P) -> Result<EventBatch> {
    let path_ref = path.as_ref();
    read_auto(path_ref).with_context(|| format!("reading event batch {}", display(path_ref)))
}

/// Write a [`SqueezeProof`] for the submission collaborator.
pub fn write_squeeze_proof_auto<P: AsRef<Path>>(path: P, proof: &SqueezeProof) -> Result<()> {
    let path_ref = path.as_ref();
    write_auto(path_ref, proof).with_context(|| format!("writing squeeze proof {}", display(path_ref)))
}

/* -------------------- in-memory CBOR -------------------- */

/// Serialize any `T: Serialize` to **CBOR bytes** using `ciborium`.
pub fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf).with_context(|| "serialize CBOR (to_cbor)")?;
    Ok(buf)
}

/// Deserialize any `T: DeserializeOwned` from **CBOR bytes** using `ciborium`.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut cur = Cursor::new(bytes);
    let v = ciborium::de::from_reader(&mut cur).with_context(|| "deserialize CBOR (from_cbor)")?;
    Ok(v)
}

/// Return the lowercase extension (without dot) if present.
fn ext_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Human-friendly path display for error messages.
fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreamConfig;
    use crate::events::{EventOrdinal, ListChangedEvent, ReceiverSeenEvent};
    use crate::hash::hash_receivers;
    use crate::types::StreamReceiver;
    use alloy_primitives::{Address, U256};

    fn tmp_path(name: &str, ext: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("drips_core_io_{name}_{nanos}.{ext}"));
        p
    }

    #[test]
    fn event_batch_json_roundtrip() {
        let receiver = StreamReceiver::new(
            U256::from(9u8),
            StreamConfig::new(1, U256::from(10u8), 0, 0).encode().unwrap(),
        );
        let list_hash = hash_receivers(&[receiver]);
        let mut batch = EventBatch::new(U256::from(1u8), Address::repeat_byte(0xaa));
        batch.list_changed.push(ListChangedEvent {
            account_id: batch.account_id,
            token: batch.token,
            list_hash,
            update_timestamp: 1_700_000_000,
            max_end: 1_800_000_000,
            balance: u128::from(u64::MAX) + 1,
            history_hash: None,
            ordinal: Some(EventOrdinal::new(10, 2)),
        });
        batch.receivers_seen.push(ReceiverSeenEvent { list_hash, receiver });

        let path = tmp_path("batch", "json");
        write_auto(&path, &batch).unwrap();
        let got = read_event_batch_auto(&path).unwrap();
        assert_eq!(got, batch);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn unknown_extension_rejected_on_read() {
        let err = read_auto::<EventBatch, _>("batch.yaml").unwrap_err();
        assert!(err.to_string().contains("unsupported extension"));
    }

    #[test]
    fn in_memory_cbor_helpers_roundtrip() {
        let v = vec![1u32, 2, 3, 5, 8];
        let bytes = to_cbor(&v).unwrap();
        let back: Vec<u32> = from_cbor(&bytes).unwrap();
        assert_eq!(v, back);
    }
}
