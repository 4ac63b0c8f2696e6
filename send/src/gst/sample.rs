// sample.rs
//
// Copyright 2026 Stéphane Cerveau <scerveau@igalia.com>
//
// This file is part of GstPrinceOfParser
//
// SPDX-License-Identifier: GPL-3.0-only

use std::time::Duration;

use crate::error::Result;

/// One buffer pulled from a pipeline's appsink.
///
/// `data` is a copy of the buffer memory; the receiver owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub pipeline_id: u32,
    pub data: Vec<u8>,
    pub duration: Option<Duration>,
}

/// Receives every sample a started pipeline produces.
///
/// Called from a GStreamer streaming thread, so implementations must not
/// block for long and must not rely on being inside a tokio runtime.
pub trait SampleHandler: Send + Sync {
    fn handle_sample(&self, sample: Sample);
}

impl<F> SampleHandler for F
where
    F: Fn(Sample) + Send + Sync,
{
    fn handle_sample(&self, sample: Sample) {
        self(sample)
    }
}

/// Encoded payload plus the number of clock ticks it covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSample {
    pub data: Vec<u8>,
    pub samples: u32,
}

/// Output attached to a pipeline, fed by the manager's router.
pub trait SampleSink: Send + Sync {
    fn write_sample(&self, sample: &MediaSample) -> Result<()>;
}
