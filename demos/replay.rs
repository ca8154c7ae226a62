//! Replays a directory of JPEG frames against a server.
//!
//! Demonstrates:
//! - Building a client from a host
//! - Acknowledgement-gated batch submission
//! - Cue playback through a console feedback sink
//! - Round-trip latency summary
//!
//! Usage:
//!   cargo run --example replay -- <host> <frames-dir>
//!   cargo run --example replay -- <host> <frames-dir> --debug

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use tokio::time::{sleep, timeout};
use tracing_subscriber::EnvFilter;

use frame_stream_client::{
    DataUri, FeedbackPlayer, FeedbackSink, SequentialSubmitter, StreamClient, SuppressionConfig,
};

// ============================================================================
// Constants
// ============================================================================

const CONNECT_WAIT: Duration = Duration::from_secs(10);

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    host: String,
    frames: PathBuf,
    debug: bool,
}

impl Args {
    fn parse() -> anyhow::Result<Self> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
        let [host, frames] = positional.as_slice() else {
            bail!("usage: replay <host> <frames-dir> [--debug]");
        };
        Ok(Self {
            host: (*host).clone(),
            frames: PathBuf::from(frames.as_str()),
            debug: args.iter().any(|a| a == "--debug"),
        })
    }
}

/// Prints cues instead of playing audio.
struct ConsoleSink;

impl FeedbackSink for ConsoleSink {
    fn play(&self, category: &str) {
        println!("        ♪ {category}");
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    println!("=== Replay ===\n");

    let frames = load_frames(&args.frames)?;
    println!("[Setup] Loaded {} frames from {}", frames.len(), args.frames.display());

    let client = StreamClient::connect(args.host.as_str())?;

    let player = Arc::new(FeedbackPlayer::new(ConsoleSink, SuppressionConfig::default()));
    player.init()?;
    let _playback = player.attach(&client);

    timeout(CONNECT_WAIT, async {
        while !client.is_connected() {
            if client.status().is_terminal() {
                break;
            }
            sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .context("timed out waiting for the server")?;

    if !client.is_connected() {
        bail!("{}", client.error().unwrap_or_else(|| client.status().to_string()));
    }
    println!("[Connect] {}\n", client.status());

    let submitter = SequentialSubmitter::new(Arc::new(client.clone()));
    let report = submitter
        .submit_all(frames, |progress| {
            println!(
                "[Frame {}/{}] {:.3}s  {}",
                progress.index + 1,
                progress.total,
                progress.latency.as_secs_f64(),
                progress.reply.kind().unwrap_or("?")
            );
        })
        .await?;

    println!();
    println!("Frames sent:    {}", report.frames_sent);
    println!("Responses:      {}", report.responses);
    println!("Server errors:  {}", report.server_errors);
    println!("Elapsed:        {:.2}s", report.elapsed.as_secs_f64());
    if let Some(latency) = report.latency {
        println!("Latency:        {latency}");
    }

    player.teardown();
    client.disconnect();
    Ok(())
}

// ============================================================================
// Functions
// ============================================================================

/// Reads every `.jpg`/`.jpeg` file in `dir`, sorted by name, as base64.
fn load_frames(dir: &Path) -> anyhow::Result<Vec<String>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        bail!("no JPEG frames in {}", dir.display());
    }

    paths
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            Ok(DataUri::from_jpeg_bytes(&bytes).payload().to_string())
        })
        .collect()
}

/// Initialize tracing/logging.
fn init_logging(debug: bool) {
    let filter = if debug {
        "frame_stream_client=debug"
    } else {
        "frame_stream_client=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
