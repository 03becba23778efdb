// crates/drips-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use alloy_primitives::{Address, B256, U256};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use drips_core::{
    canonicalize_splits, canonicalize_streams, hash_receivers,
    io::{read_auto, read_event_batch_auto, write_auto, write_squeeze_proof_auto},
    validate_splits_for_submission, ConfigLayout, PackedStreamConfig, ProtocolLimits,
    SplitsReceiver, StreamConfig, StreamReceiver,
};
use drips_history::{
    CycleBoundary, CycleConfig, HistoryReconciler, ReconcileConfig, ReconciledHistory,
    SqueezeSelector, DEFAULT_CYCLE_SECS,
};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "drips-cli",
    about = "Drips stream accounting CLI",
    long_about = "Drips stream accounting CLI.\n\nUse this tool to pack stream configs, canonicalize receiver lists, reconcile indexer events into verified histories, and assemble squeeze proofs.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    /// Cycle length of the target deployment, in seconds (>1)
    #[arg(long, global = true, env = "DRIPS_CYCLE_SECS", default_value_t = DEFAULT_CYCLE_SECS)]
    cycle_secs: u64,

    /// Override the current unix time (defaults to the wall clock)
    #[arg(long, global = true)]
    now: Option<u64>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Pack a stream config into its on-chain integer
    Encode {
        /// Stream identifier
        #[arg(long, default_value_t = 0)]
        stream_id: u32,

        /// Fixed-point amount per second (token units * 10^9)
        #[arg(long)]
        amount_per_sec: U256,

        /// Start timestamp (0 = at configuration time)
        #[arg(long, default_value_t = 0)]
        start: u64,

        /// Duration in seconds (0 = until the balance runs out)
        #[arg(long, default_value_t = 0)]
        duration: u64,

        /// Bit layout
        #[arg(long, value_enum, default_value_t = LayoutOpt::Current)]
        layout: LayoutOpt,
    },

    /// Unpack an on-chain config integer (hex or decimal)
    Decode {
        /// Packed config
        packed: PackedStreamConfig,

        /// Bit layout
        #[arg(long, value_enum, default_value_t = LayoutOpt::Current)]
        layout: LayoutOpt,
    },

    /// Sort, deduplicate and validate a receiver list and print its hash
    Canonicalize {
        /// Receiver kind
        #[arg(long, value_enum, default_value_t = ListKind::Streams)]
        kind: ListKind,

        /// Input receiver list (JSON/CBOR)
        #[arg(long)]
        input: PathBuf,

        /// Output path for the canonical list (JSON/CBOR)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Also require a splits list to be ready for submission (weights sum to the total)
        #[arg(long, default_value_t = false)]
        submit: bool,
    },

    /// Reconcile an indexer event batch into a verified history
    Reconcile {
        /// Input event batch (JSON/CBOR)
        #[arg(long)]
        events: PathBuf,

        /// Output path for the reconciled history (JSON/CBOR)
        #[arg(long, default_value = "history.json")]
        out: PathBuf,

        /// Current on-chain list hash to check the latest state against
        #[arg(long)]
        list_hash: Option<B256>,

        /// Reject same-timestamp events that carry no log ordinal
        #[arg(long, default_value_t = false)]
        require_ordinals: bool,
    },

    /// List senders with squeezable funds for a receiver
    Select {
        /// Receiving account
        #[arg(long)]
        receiver: U256,

        /// Streamed token
        #[arg(long)]
        token: Address,

        /// Reconciled histories of candidate senders (JSON/CBOR)
        #[arg(long = "history", required = true)]
        histories: Vec<PathBuf>,
    },

    /// Build a squeeze proof from a reconciled sender history
    Squeeze {
        /// Receiving account
        #[arg(long)]
        receiver: U256,

        /// Reconciled history of the sender (JSON/CBOR)
        #[arg(long)]
        history: PathBuf,

        /// Sender's current on-chain history hash
        #[arg(long)]
        history_hash: B256,

        /// Output path for the proof (JSON/CBOR)
        #[arg(long, default_value = "squeeze.json")]
        out: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LayoutOpt {
    Current,
    Legacy,
}

impl From<LayoutOpt> for ConfigLayout {
    fn from(v: LayoutOpt) -> Self {
        match v {
            LayoutOpt::Current => Self::Current,
            LayoutOpt::Legacy => Self::Legacy,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ListKind {
    Streams,
    Splits,
}

#[derive(Serialize)]
struct Encoded {
    packed: PackedStreamConfig,
    decimal: String,
}

#[derive(Serialize)]
struct Decoded {
    #[serde(flatten)]
    config: StreamConfig,
    layout: ConfigLayout,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let cycle = CycleConfig::new(cli.cycle_secs).context("invalid --cycle-secs")?;
    match cli.cmd {
        Cmd::Encode {
            stream_id,
            amount_per_sec,
            start,
            duration,
            layout,
        } => encode(StreamConfig::new(stream_id, amount_per_sec, start, duration), layout),

        Cmd::Decode { packed, layout } => decode(packed, layout),

        Cmd::Canonicalize {
            kind,
            input,
            out,
            submit,
        } => canonicalize(kind, input, out, submit),

        Cmd::Reconcile {
            events,
            out,
            list_hash,
            require_ordinals,
        } => reconcile(events, out, list_hash, require_ordinals),

        Cmd::Select {
            receiver,
            token,
            histories,
        } => select(cycle, now_or_clock(cli.now)?, receiver, token, histories),

        Cmd::Squeeze {
            receiver,
            history,
            history_hash,
            out,
        } => squeeze(cycle, now_or_clock(cli.now)?, receiver, history, history_hash, out),
    }
}

/// Initialize tracing with `RUST_LOG` support and a compact formatter.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn now_or_clock(now: Option<u64>) -> Result<u64> {
    if let Some(now) = now {
        return Ok(now);
    }
    let since = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the unix epoch")?;
    Ok(since.as_secs())
}

fn print_json<T: Serialize>(v: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(v).context("serialize output")?;
    println!("{s}");
    Ok(())
}

fn encode(config: StreamConfig, layout: LayoutOpt) -> Result<()> {
    let packed = config
        .encode_with(layout.into())
        .with_context(|| format!("encoding {config:?}"))?;
    print_json(&Encoded {
        packed,
        decimal: packed.into_raw().to_string(),
    })
}

fn decode(packed: PackedStreamConfig, layout: LayoutOpt) -> Result<()> {
    let layout = ConfigLayout::from(layout);
    if packed.into_raw().bit_len() > layout.total_bits() {
        bail!(
            "{packed} is wider than the {} bits of the {layout:?} layout",
            layout.total_bits()
        );
    }
    print_json(&Decoded {
        config: packed.decode_with(layout),
        layout,
    })
}

fn canonicalize(kind: ListKind, input: PathBuf, out: Option<PathBuf>, submit: bool) -> Result<()> {
    let limits = ProtocolLimits::default();
    let hash = match kind {
        ListKind::Streams => {
            let list: Vec<StreamReceiver> = read_auto(&input)?;
            let canon = canonicalize_streams(list).context("invalid streams receivers")?;
            if let Some(out) = &out {
                write_auto(out, &canon)?;
            }
            hash_receivers(&canon)
        }
        ListKind::Splits => {
            let list: Vec<SplitsReceiver> = read_auto(&input)?;
            let canon = canonicalize_splits(list).context("invalid splits receivers")?;
            if submit {
                validate_splits_for_submission(&canon, &limits)
                    .context("splits list not ready for submission")?;
            }
            if let Some(out) = &out {
                write_auto(out, &canon)?;
            }
            hash_receivers(&canon)
        }
    };
    info!(input = %input.display(), "canonicalized receiver list");
    println!("{hash}");
    Ok(())
}

fn reconcile(
    events: PathBuf,
    out: PathBuf,
    list_hash: Option<B256>,
    require_ordinals: bool,
) -> Result<()> {
    let batch = read_event_batch_auto(&events)?;
    let reconciler = HistoryReconciler::new(ReconcileConfig { require_ordinals });
    let history = reconciler
        .reconcile(&batch)
        .with_context(|| format!("reconciling {}", events.display()))?;
    if let Some(on_chain) = list_hash {
        history.verify_list_hash(on_chain)?;
    }
    write_auto(&out, &history)?;
    info!(
        account = %history.account_id,
        states = history.states.len(),
        out = %out.display(),
        "wrote reconciled history"
    );
    Ok(())
}

fn select(
    cycle: CycleConfig,
    now: u64,
    receiver: U256,
    token: Address,
    histories: Vec<PathBuf>,
) -> Result<()> {
    let loaded = histories
        .iter()
        .map(|p| read_auto::<ReconciledHistory, _>(p))
        .collect::<Result<Vec<_>>>()?;
    let selector = SqueezeSelector::new(cycle);
    let selected = selector.select_squeezable_senders(receiver, token, &loaded, now);
    info!(
        cycle_start = cycle.cycle_start(now),
        candidates = loaded.len(),
        selected = selected.len(),
        "squeeze selection"
    );
    print_json(&selected)
}

fn squeeze(
    cycle: CycleConfig,
    now: u64,
    receiver: U256,
    history: PathBuf,
    history_hash: B256,
    out: PathBuf,
) -> Result<()> {
    let sender: ReconciledHistory = read_auto(&history)?;
    let proof = SqueezeSelector::new(cycle)
        .build_squeeze_proof(
            receiver,
            sender.account_id,
            sender.token,
            &sender.states,
            history_hash,
            now,
        )
        .context("fetch older events for this sender and reconcile again")?;
    write_squeeze_proof_auto(&out, &proof)?;
    info!(
        sender = %proof.sender_id,
        entries = proof.history.len(),
        out = %out.display(),
        "wrote squeeze proof"
    );
    Ok(())
}
