use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use orrery_stream::{
    CustomizationEntry, CustomizationSet, Heartbeat, Hello, HolderRow, HolderSnapshot,
    MessageKind, PROTOCOL_VERSION, encode_message,
};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::{TcpListener, TcpStream};

#[derive(Parser, Debug)]
#[command(about = "Synthetic holder feed for the orrery viewer", version)]
struct Args {
    /// Address to serve the viewer on (host:port).
    #[arg(long, default_value = "127.0.0.1:17471")]
    bind: String,

    /// Number of holders to simulate.
    #[arg(long, default_value_t = 40)]
    holders: usize,

    /// Milliseconds between holder snapshots.
    #[arg(long, default_value_t = 2_000)]
    interval_ms: u64,

    /// Seed for the simulated roster; random when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Replay rows from a JSON snapshot file instead of simulating.
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    snapshot: Option<PathBuf>,

    /// Token name announced with every snapshot.
    #[arg(long, default_value = "ORRERY")]
    token_name: String,

    /// Customize the top holder every N snapshots (0 disables).
    #[arg(long, default_value_t = 5)]
    customize_every: u64,
}

#[derive(Debug, Error)]
enum FeedError {
    #[error("holder count must be greater than zero")]
    EmptyRoster,
}

/// Random-walk holder roster. Amounts drift a few percent each round and
/// percentages are recomputed against the new total, so every snapshot stays
/// a full partition of supply.
struct SyntheticHolders {
    rng: StdRng,
    wallets: Vec<String>,
    amounts: Vec<f64>,
}

impl SyntheticHolders {
    fn new(count: usize, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let wallets = (0..count).map(|_| synthetic_wallet(&mut rng)).collect();
        let amounts = (0..count)
            .map(|_| rng.gen_range(1_000.0_f64..1_000_000.0))
            .collect();
        Self {
            rng,
            wallets,
            amounts,
        }
    }

    /// Advances the walk one round and returns the ranked wire rows.
    fn tick(&mut self) -> Vec<HolderRow> {
        for amount in &mut self.amounts {
            *amount *= self.rng.gen_range(0.97..1.03);
        }
        let total: f64 = self.amounts.iter().sum();
        let mut rows: Vec<HolderRow> = self
            .wallets
            .iter()
            .zip(&self.amounts)
            .map(|(wallet, &amount)| HolderRow {
                wallet_address: wallet.clone(),
                token_amount: amount,
                percentage: amount / total * 100.0,
            })
            .collect();
        rows.sort_by(|a, b| b.token_amount.total_cmp(&a.token_amount));
        rows
    }
}

fn synthetic_wallet(rng: &mut StdRng) -> String {
    // Base58-style alphabet so addresses abbreviate the way real ones do.
    const ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
    (0..44)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

enum Roster {
    Synthetic(SyntheticHolders),
    Replay(Vec<HolderRow>),
}

impl Roster {
    fn from_args(args: &Args) -> Result<Self> {
        match args.snapshot.as_deref() {
            Some(path) => Ok(Roster::Replay(load_replay_rows(path)?)),
            None => {
                if args.holders == 0 {
                    return Err(FeedError::EmptyRoster.into());
                }
                Ok(Roster::Synthetic(SyntheticHolders::new(
                    args.holders,
                    args.seed,
                )))
            }
        }
    }

    fn next_rows(&mut self) -> Vec<HolderRow> {
        match self {
            Roster::Synthetic(holders) => holders.tick(),
            Roster::Replay(rows) => rows.clone(),
        }
    }
}

/// Normalizes file rows once up front; replayed snapshots differ only in
/// their sequence numbers.
fn load_replay_rows(path: &Path) -> Result<Vec<HolderRow>> {
    let raw = orrery_data::load_snapshot_file(path)?;
    let outcome = orrery_data::normalize_rows(&raw);
    anyhow::ensure!(
        !outcome.records.is_empty(),
        "snapshot {} has no usable holder rows",
        path.display()
    );
    Ok(outcome
        .records
        .into_iter()
        .map(|record| HolderRow {
            wallet_address: record.wallet_address,
            token_amount: record.token_amount,
            percentage: record.percentage,
        })
        .collect())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    run(args).await
}

async fn run(args: Args) -> Result<()> {
    if args.interval_ms == 0 {
        return Err(anyhow::anyhow!("snapshot interval must be positive"));
    }
    let mut roster = Roster::from_args(&args)?;

    let listener = TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    println!("[holder_feed] serving holder snapshots at {}", args.bind);

    loop {
        let (socket, addr) = listener
            .accept()
            .await
            .with_context(|| format!("accepting viewer connection on {}", args.bind))?;
        println!("[holder_feed] viewer connected from {addr}");
        socket.set_nodelay(true)?;
        let mut writer = BufWriter::new(socket);
        // The roster keeps drifting across sessions; sequence numbers restart
        // with each hello.
        if let Err(err) = serve_client(&mut writer, &mut roster, &args).await {
            eprintln!("[holder_feed] viewer dropped: {err:?}");
        }
    }
}

async fn serve_client(
    writer: &mut BufWriter<TcpStream>,
    roster: &mut Roster,
    args: &Args,
) -> Result<()> {
    send_message(
        writer,
        MessageKind::Hello,
        &Hello::new(
            "holder_feed",
            Some(format!("protocol={:#06x}", PROTOCOL_VERSION)),
        ),
    )
    .await?;

    let started = Instant::now();
    let half_interval = Duration::from_millis((args.interval_ms / 2).max(1));
    let mut snapshot_seq: u64 = 0;
    let mut heartbeat_seq: u64 = 0;
    let mut customization_seq: u64 = 0;

    loop {
        snapshot_seq += 1;
        let rows = roster.next_rows();
        let top_wallet = rows.first().map(|row| row.wallet_address.clone());
        let snapshot = HolderSnapshot {
            seq: snapshot_seq,
            generated_at_ms: epoch_ms(),
            token_name: Some(args.token_name.clone()),
            rows,
        };
        send_message(writer, MessageKind::HolderSnapshot, &snapshot).await?;

        if args.customize_every > 0 && snapshot_seq % args.customize_every == 0 {
            if let Some(wallet_address) = top_wallet {
                customization_seq += 1;
                let set = CustomizationSet {
                    seq: customization_seq,
                    entries: vec![top_holder_entry(wallet_address, customization_seq)],
                };
                send_message(writer, MessageKind::CustomizationSet, &set).await?;
            }
        }

        tokio::time::sleep(half_interval).await;

        heartbeat_seq += 1;
        let beat = Heartbeat {
            seq: heartbeat_seq,
            host_time_ms: started.elapsed().as_millis() as u64,
        };
        send_message(writer, MessageKind::Heartbeat, &beat).await?;

        tokio::time::sleep(half_interval).await;
    }
}

/// Names whichever wallet currently tops the roster, cycling nickname and
/// skin so repeat sets stay visible in the viewer.
fn top_holder_entry(wallet_address: String, round: u64) -> CustomizationEntry {
    const NICKNAMES: [&str; 4] = ["whale", "deep pockets", "moby", "the accumulator"];
    CustomizationEntry {
        wallet_address,
        nickname: Some(NICKNAMES[(round as usize - 1) % NICKNAMES.len()].to_string()),
        skin_index: Some((round % 8) as u32),
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

async fn send_message<T>(
    writer: &mut BufWriter<TcpStream>,
    kind: MessageKind,
    payload: &T,
) -> Result<()>
where
    T: serde::Serialize,
{
    let bytes = encode_message(kind, payload)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}
