// error.rs
//
// Copyright 2026 Stéphane Cerveau <scerveau@igalia.com>
//
// This file is part of GstPrinceOfParser
//
// SPDX-License-Identifier: GPL-3.0-only

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SendError {
    #[error("GStreamer error: {0}")]
    GStreamer(String),

    #[error("Pipeline not found: {0}")]
    PipelineNotFound(u32),

    #[error("Invalid pipeline description: {0}")]
    InvalidPipeline(String),

    #[error("Media not supported: {0}")]
    MediaNotSupported(String),

    #[error("State change failed: {0}")]
    StateChangeFailed(String),

    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    #[error("Pipeline '{0}' has no element named 'appsink'")]
    MissingAppSink(u32),

    #[error("Sample sink error: {0}")]
    Sink(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SendError>;
