use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::io::BufReader;
use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{EnvFilter, fmt};

use shuttle_core::app::{LogRelayLayer, WIRE_TARGET, Worker};
use shuttle_core::config::{WorkerConfig, parse_log_level};
use shuttle_core::domain::WorkerId;
use shuttle_core::impls::JsonLinesChannel;

mod engine;

use engine::CommandEngine;

#[derive(Parser, Debug)]
#[command(name = "shuttle-worker")]
#[command(version)]
#[command(about = "Runs one test-distribution worker over a JSON-lines stdio channel")]
struct Args {
    /// Worker id assigned by the controller
    #[arg(long, env = "SHUTTLE_WORKER", default_value = "gw0")]
    worker_id: String,

    /// Run id shared by every worker of one run (fresh ULID when omitted)
    #[arg(long, env = "SHUTTLE_TESTRUN_UID")]
    testrun_uid: Option<String>,

    /// Total number of workers in the run
    #[arg(long, env = "SHUTTLE_WORKER_COUNT", default_value = "1")]
    worker_count: usize,

    /// Log every event sent to the controller
    #[arg(long, short, env = "SHUTTLE_VERBOSE")]
    verbose: bool,

    /// Relay log records at or above this level (name or number)
    #[arg(long, env = "SHUTTLE_LOG_RELAY", value_parser = parse_relay_level)]
    log_relay: Option<Level>,

    /// Append `@group` to node ids of grouped items
    #[arg(long, env = "SHUTTLE_LOADGROUP")]
    loadgroup: bool,

    /// Manifest file, one shell command per line
    manifest: PathBuf,
}

fn parse_relay_level(value: &str) -> Result<Level, String> {
    parse_log_level(value).ok_or_else(|| format!("unknown log level: {value}"))
}

impl Args {
    fn into_config(self) -> (WorkerConfig, PathBuf) {
        let testrun_uid = self
            .testrun_uid
            .unwrap_or_else(WorkerConfig::generate_testrun_uid);
        let mut config =
            WorkerConfig::new(WorkerId::new(self.worker_id), testrun_uid, self.worker_count);
        config.verbose = self.verbose;
        config.log_relay_level = self.log_relay;
        config.loadgroup = self.loadgroup;
        (config, self.manifest)
    }
}

/// `RUST_LOG` (default `info`), plus the wire log when `--verbose` is set.
fn env_filter(verbose: bool) -> Result<EnvFilter, ParseError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if verbose {
        return Ok(filter.add_directive(format!("{WIRE_TARGET}=debug").parse()?));
    }
    Ok(filter)
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let (config, manifest) = Args::parse().into_config();

    // stdout は protocol 専用
    let (channel, writer) =
        JsonLinesChannel::spawn(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
    let channel = Arc::new(channel);
    let engine = Arc::new(CommandEngine::new(manifest));
    let worker = Worker::new(config.clone(), channel.clone(), engine);

    let relay = LogRelayLayer::from_config(&config, worker.emitter());
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter(config.verbose)?),
        )
        .with(relay)
        .init();

    let output = worker.run().await?;

    // 送信済みイベントを書き切ってから終了
    channel.close_outbound();
    writer.await??;

    Ok(ExitCode::from(output.exitstatus.clamp(0, 255) as u8))
}
