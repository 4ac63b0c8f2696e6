// main.rs
//
// Copyright 2026 Stéphane Cerveau <scerveau@igalia.com>
//
// This file is part of GstPrinceOfParser
//
// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use gpop_send::gst::{
    create_event_channel, Codec, FileSink, PipelineEvent, PipelineManager, SampleSink, StatsSink,
};
use gpop_send::SendError;

// Exit codes matching GStreamer convention (gst-launch MR !10088)
const EXIT_CODE_ERROR: i32 = 1;
const EXIT_CODE_UNSUPPORTED: i32 = 69; // EX_UNAVAILABLE

#[derive(Parser, Debug)]
#[command(name = "gpop-send")]
#[command(author = "Stéphane Cerveau")]
#[command(version)]
#[command(about = "GStreamer Prince of Parser - Encode a source and collect its samples")]
struct Args {
    /// Output codec: vp8, vp9, h264, opus, g722, pcmu, pcma
    #[arg(short, long, env = "GPOP_SEND_CODEC", default_value = "vp8")]
    codec: Codec,

    /// Source part of the pipeline (defaults to a test source matching the codec)
    #[arg(short, long, env = "GPOP_SEND_SOURCE")]
    source: Option<String>,

    /// Full pipeline description, must contain 'appsink name=appsink'.
    /// Overrides --source; --codec is then only used for sample timing.
    #[arg(short = 'p', long = "pipeline", conflicts_with = "source")]
    pipeline: Option<String>,

    /// Append every encoded sample to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print pipeline events as JSON lines on stdout
    #[arg(long)]
    json_events: bool,
}

fn exit_code_for(err: &SendError) -> i32 {
    match err {
        SendError::MediaNotSupported(_) => EXIT_CODE_UNSUPPORTED,
        _ => EXIT_CODE_ERROR,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("gpop_send=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    gstreamer::init()?;
    info!("GStreamer initialized");

    // Keep the initial receiver so pipeline_added is seen too
    let (event_tx, mut event_rx) = create_event_channel();
    let manager = PipelineManager::new(event_tx);

    let stats = Arc::new(StatsSink::new());
    let mut sinks: Vec<Arc<dyn SampleSink>> = Vec::new();
    sinks.push(stats.clone());
    if let Some(path) = &args.output {
        sinks.push(Arc::new(FileSink::create(path)?));
    }

    let added = match &args.pipeline {
        Some(description) => manager.add_pipeline(description, args.codec, sinks).await,
        None => {
            let source = args
                .source
                .as_deref()
                .unwrap_or_else(|| args.codec.default_source());
            manager.add_encoded_pipeline(args.codec, source, sinks).await
        }
    };

    let id = match added {
        Ok(id) => id,
        Err(e) => {
            error!("Failed to create pipeline: {}", e);
            std::process::exit(exit_code_for(&e));
        }
    };

    if let Err(e) = manager.start(id).await {
        error!("Failed to start pipeline '{}': {}", id, e);
        manager.shutdown().await;
        std::process::exit(exit_code_for(&e));
    }

    info!("gpop-send started. Press Ctrl+C to stop.");

    #[cfg(unix)]
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    let shutdown_signal = async {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = sigint.recv() => info!("Received SIGINT"),
                _ = sigterm.recv() => info!("Received SIGTERM"),
            }
        }
        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Received Ctrl+C");
        }
    };
    tokio::pin!(shutdown_signal);

    let mut exit_code = 0;

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => break,
            event = event_rx.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(n)) => {
                        warn!("Event receiver lagged by {} messages", n);
                        continue;
                    }
                    Err(RecvError::Closed) => {
                        warn!("Event channel closed");
                        exit_code = EXIT_CODE_ERROR;
                        break;
                    }
                };

                if args.json_events {
                    println!("{}", serde_json::to_string(&event)?);
                }

                if event.pipeline_id() != id || !event.is_terminal() {
                    continue;
                }

                exit_code = match event {
                    PipelineEvent::Eos { .. } => 0,
                    PipelineEvent::Unsupported { .. } => EXIT_CODE_UNSUPPORTED,
                    _ => EXIT_CODE_ERROR,
                };
                break;
            }
        }
    }

    info!("Shutting down...");
    manager.shutdown().await;

    info!(
        "Pipeline '{}' delivered {} sample(s), {} bytes, {} clock ticks",
        id,
        stats.samples(),
        stats.bytes(),
        stats.ticks()
    );

    if exit_code != 0 {
        warn!("Exiting with code {}", exit_code);
        std::process::exit(exit_code);
    }

    Ok(())
}
