//! Rank crops for a climate descriptor file
//!
//! Usage:
//!   cargo run --bin recommend_crops -- <descriptor.json | -> [top_k] [--assess <crop>]
//!
//! Configuration comes from CROP_DATA_PATH, CROP_TOP_K and CROP_WEIGHTS_PATH.

use anyhow::{Context, Result};
use crop_ranker::{recommend_and_assess, CropScorer, EngineConfig};
use serde_json::Value;
use std::io::Read;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct Args {
    descriptor_path: String,
    top_k: Option<usize>,
    assess: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut descriptor_path = None;
    let mut top_k = None;
    let mut assess = None;

    while let Some(arg) = args.next() {
        if arg == "--assess" {
            assess = Some(args.next().context("--assess requires a crop name")?);
        } else if descriptor_path.is_none() {
            descriptor_path = Some(arg);
        } else {
            top_k = Some(
                arg.parse()
                    .with_context(|| format!("Invalid top_k: {}", arg))?,
            );
        }
    }

    Ok(Args {
        descriptor_path: descriptor_path
            .context("Usage: recommend_crops <descriptor.json | -> [top_k] [--assess <crop>]")?,
        top_k,
        assess,
    })
}

fn read_descriptor(path: &str) -> Result<Value> {
    let contents = if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read descriptor from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read descriptor: {}", path))?
    };

    serde_json::from_str(&contents).with_context(|| "Failed to parse descriptor JSON")
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crop_ranker=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = parse_args()?;
    let config = EngineConfig::from_env()?;
    let scorer = CropScorer::from_config(&config);
    let descriptor = read_descriptor(&args.descriptor_path)?;

    let output = recommend_and_assess(&scorer, &descriptor, args.top_k, args.assess.as_deref());

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
