//! Synthetic sorting backend
//!
//! Emits the message stream a sorting backend would send for a line of
//! parcels: scans at the scanner, routing decisions once the item crosses
//! the photo-eye, occasional position-id updates, and periodic snapshots.
//!
//! # Usage
//! ```bash
//! ./belt-simulator --items 40 | ./beltsync --stdin
//! ```
//!
//! Timestamps are wall-clock seconds, so the output must be consumed live.

use clap::Parser;
use rand::prelude::*;
use serde_json::{json, Map, Value};
use std::io::{self, Write};
use std::time::Duration;

use beltsync::config::defaults::{
    BELT_SPEED_CM_PER_SEC, END_BUFFER_CM, PUSHER_COUNT, PUSHER_DISTANCES_CM, SCANNER_POSITION_CM,
};
use beltsync::position::cm_to_position_id;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "belt-simulator")]
#[command(about = "Synthetic sorting backend for BeltSync testing")]
#[command(version)]
struct Args {
    /// Number of parcels to send down the belt
    #[arg(short, long, default_value = "20")]
    items: u32,

    /// Gap between scans (ms)
    #[arg(long, default_value = "1500")]
    gap_ms: u64,

    /// Seconds between full snapshots
    #[arg(long, default_value = "5")]
    snapshot_secs: f64,

    /// Share of parcels that never get a pusher (0.0 - 1.0)
    #[arg(long, default_value = "0.1")]
    unassigned_ratio: f64,

    /// Probability per tick of a position-id update for a moving parcel
    #[arg(long, default_value = "0.05")]
    position_update_rate: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Suppress the stderr log
    #[arg(short, long)]
    quiet: bool,
}

// ============================================================================
// Simulation State
// ============================================================================

const TICK: Duration = Duration::from_millis(100);

struct Parcel {
    barcode: String,
    scanned_at: f64,
    /// Photo-eye crossing time; backend learns it shortly after.
    start_time: f64,
    pusher: Option<u8>,
    announce_at: f64,
    announced: bool,
}

impl Parcel {
    fn distance(&self) -> Option<f64> {
        self.pusher.map(|p| PUSHER_DISTANCES_CM[usize::from(p) - 1])
    }

    fn position_cm(&self, now: f64) -> f64 {
        (now - self.start_time) * BELT_SPEED_CM_PER_SEC
    }

    /// Backend view of the status.
    fn status(&self, now: f64) -> &'static str {
        if !self.announced {
            return "pending";
        }
        match self.distance() {
            Some(d) if self.position_cm(now) > d + BELT_SPEED_CM_PER_SEC => "completed",
            _ => "progress",
        }
    }

    /// Backend forgets the parcel after it leaves the belt.
    fn gone(&self, now: f64) -> bool {
        let far_end =
            self.distance().unwrap_or(PUSHER_DISTANCES_CM[PUSHER_COUNT - 1]) + END_BUFFER_CM;
        self.position_cm(now) > far_end + 3.0 * BELT_SPEED_CM_PER_SEC
    }

    fn fields(&self, now: f64) -> Value {
        let mut fields = Map::new();
        fields.insert("status".into(), json!(self.status(now)));
        if self.announced {
            fields.insert("startTime".into(), json!(self.start_time));
            if let Some(p) = self.pusher {
                fields.insert("pusher".into(), json!(p));
                fields.insert("distance".into(), json!(self.distance()));
                fields.insert("label".into(), json!(format!("Bucket {p}")));
            }
        }
        Value::Object(fields)
    }
}

struct Backend {
    rng: StdRng,
    parcels: Vec<Parcel>,
    next_serial: u32,
}

impl Backend {
    fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            parcels: Vec::new(),
            next_serial: 1,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn scan(&mut self, now: f64, unassigned_ratio: f64) -> Value {
        let barcode = format!("BC{:06}", self.next_serial);
        self.next_serial += 1;

        let start_time = now + SCANNER_POSITION_CM.abs() / BELT_SPEED_CM_PER_SEC;
        let pusher = if self.rng.gen_bool(unassigned_ratio.clamp(0.0, 1.0)) {
            None
        } else {
            Some(self.rng.gen_range(1..=PUSHER_COUNT as u8))
        };
        // Routing is decided just before the parcel reaches the eye.
        let lead = self.rng.gen_range(0.0..0.1);

        self.parcels.push(Parcel {
            barcode: barcode.clone(),
            scanned_at: now,
            start_time,
            pusher,
            announce_at: start_time - lead,
            announced: false,
        });
        json!({"type": "scan", "barcode": barcode})
    }

    fn snapshot(&self, now: f64) -> Value {
        let items: Map<String, Value> = self
            .parcels
            .iter()
            .map(|p| (p.barcode.clone(), p.fields(now)))
            .collect();
        json!({"type": "snapshot", "items": items})
    }

    /// Routing decisions and position updates due at `now`.
    fn step(&mut self, now: f64, position_update_rate: f64) -> Vec<Value> {
        let mut out = Vec::new();
        for parcel in &mut self.parcels {
            if !parcel.announced && now >= parcel.announce_at {
                parcel.announced = true;
                out.push(json!({
                    "type": "add",
                    "barcode": parcel.barcode,
                    "fields": parcel.fields(now),
                }));
            } else if parcel.announced
                && parcel.status(now) == "progress"
                && self.rng.gen_bool(position_update_rate.clamp(0.0, 1.0))
            {
                let pos = parcel.position_cm(now);
                out.push(json!({
                    "type": "update",
                    "barcode": parcel.barcode,
                    "fields": {
                        "positionId": cm_to_position_id(pos, PUSHER_DISTANCES_CM[PUSHER_COUNT - 1]),
                        "positionCm": pos,
                    },
                }));
            }
        }
        self.parcels.retain(|p| !p.gone(now));
        out
    }
}

fn now_secs() -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let micros = chrono::Utc::now().timestamp_micros() as f64;
    micros / 1_000_000.0
}

fn log(quiet: bool, msg: &str) {
    if !quiet {
        eprintln!("[belt-simulator] {msg}");
    }
}

fn emit(out: &mut impl Write, msg: &Value) -> io::Result<()> {
    writeln!(out, "{msg}")?;
    out.flush()
}

fn main() {
    let args = Args::parse();
    let mut backend = Backend::new(args.seed);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    log(args.quiet, &format!("{} parcels, {}ms apart", args.items, args.gap_ms));
    if let Some(seed) = args.seed {
        log(args.quiet, &format!("seed {seed}"));
    }

    #[allow(clippy::cast_precision_loss)]
    let gap_secs = args.gap_ms as f64 / 1000.0;
    let mut scanned = 0;
    let mut next_scan = now_secs();
    let mut next_snapshot = next_scan + args.snapshot_secs;

    loop {
        let now = now_secs();
        let mut batch = Vec::new();

        if scanned < args.items && now >= next_scan {
            batch.push(backend.scan(now, args.unassigned_ratio));
            scanned += 1;
            next_scan = now + gap_secs;
        }
        batch.extend(backend.step(now, args.position_update_rate));
        if now >= next_snapshot {
            batch.push(backend.snapshot(now));
            next_snapshot = now + args.snapshot_secs;
        }

        for msg in &batch {
            if emit(&mut out, msg).is_err() {
                log(args.quiet, "stdout closed, stopping");
                return;
            }
        }

        if scanned >= args.items && backend.parcels.is_empty() {
            let _ = emit(&mut out, &backend.snapshot(now));
            log(args.quiet, "all parcels cleared the belt");
            return;
        }

        if let Some(first) = backend.parcels.first() {
            if !args.quiet && batch.iter().any(|m| m["type"] == "snapshot") {
                log(
                    args.quiet,
                    &format!(
                        "{} on belt, oldest {} scanned {:.1}s ago",
                        backend.parcels.len(),
                        first.barcode,
                        now - first.scanned_at
                    ),
                );
            }
        }

        std::thread::sleep(TICK);
    }
}
