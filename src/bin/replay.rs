use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde_json::json;

use pose_filter_rs::types::{
    FilteredOrientationRecord, FilteredRecord, OrientationSample, PositionSample,
};
use pose_filter_rs::{OrientationFilter, PositionFilter};

#[derive(Parser, Debug)]
#[command(name = "pose_replay")]
#[command(about = "Replay a JSONL sample log through the pose filters", long_about = None)]
struct Args {
    /// Path to a JSONL log of samples
    #[arg(long)]
    input: PathBuf,

    /// Treat samples as quaternions and run the orientation filter
    #[arg(long, default_value_t = false)]
    orientation: bool,

    /// Process-noise scale (smaller is smoother)
    #[arg(long, default_value = "0.1")]
    smoothness: f32,

    /// Measurement-noise scale (smaller trusts samples more)
    #[arg(long, default_value = "0.1")]
    rapidness: f32,

    /// Track acceleration as well as velocity
    #[arg(long, default_value_t = false)]
    accel: bool,

    /// Track jerk as well; only takes effect together with --accel
    #[arg(long, default_value_t = false)]
    jerk: bool,

    /// Output path for filtered records (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let file =
        File::open(&args.input).with_context(|| format!("opening {}", args.input.display()))?;
    let reader = BufReader::new(file);

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => {
            Box::new(File::create(path).with_context(|| format!("creating {}", path.display()))?)
        }
        None => Box::new(std::io::stdout().lock()),
    };

    let mut samples = 0u64;
    let mut skipped = 0u64;

    let mut position = PositionFilter::new();
    let mut orientation = OrientationFilter::new();
    if args.orientation {
        orientation.init(args.smoothness, args.rapidness, args.accel, args.jerk);
    } else {
        position.init(args.smoothness, args.rapidness, args.accel, args.jerk);
    }

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", args.input.display()))?;
        if line.trim().is_empty() {
            continue;
        }

        if args.orientation {
            let sample: OrientationSample = match serde_json::from_str(&line) {
                Ok(s) => s,
                Err(err) => {
                    log::warn!("skipping line {}: {}", lineno + 1, err);
                    skipped += 1;
                    continue;
                }
            };
            let q = UnitQuaternion::from_quaternion(Quaternion::new(
                sample.qw, sample.qx, sample.qy, sample.qz,
            ));
            orientation.update(&q);

            let state = orientation.get_state();
            let record = FilteredOrientationRecord {
                timestamp: sample.timestamp,
                quaternion: state.quaternion,
                euler: state.euler,
            };
            writeln!(out, "{}", serde_json::to_string(&record)?)?;
        } else {
            let sample: PositionSample = match serde_json::from_str(&line) {
                Ok(s) => s,
                Err(err) => {
                    log::warn!("skipping line {}: {}", lineno + 1, err);
                    skipped += 1;
                    continue;
                }
            };
            position.update(Vector3::new(sample.x, sample.y, sample.z));

            let e = position.get_estimation();
            let p = position.get_prediction();
            let v = position.get_velocity();
            let record = FilteredRecord {
                timestamp: sample.timestamp,
                estimate: (e.x, e.y, e.z),
                prediction: (p.x, p.y, p.z),
                velocity: (v.x, v.y, v.z),
            };
            writeln!(out, "{}", serde_json::to_string(&record)?)?;
        }

        samples += 1;
        if samples % 1000 == 0 {
            log::info!("{samples} samples replayed");
        }
    }

    let final_state = if args.orientation {
        serde_json::to_value(orientation.get_state())?
    } else {
        serde_json::to_value(position.get_state())?
    };
    let summary = json!({
        "run_stamp": Utc::now().to_rfc3339(),
        "input": args.input.display().to_string(),
        "mode": if args.orientation { "orientation" } else { "position" },
        "samples": samples,
        "skipped": skipped,
        "final_state": final_state,
    });
    eprintln!("{summary}");

    Ok(())
}
