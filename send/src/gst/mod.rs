// mod.rs
//
// Copyright 2026 Stéphane Cerveau <scerveau@igalia.com>
//
// This file is part of GstPrinceOfParser
//
// SPDX-License-Identifier: GPL-3.0-only

pub mod codec;
pub mod event;
pub mod manager;
pub mod pipeline;
pub mod sample;
pub mod sink;

pub use codec::Codec;
pub use event::{create_event_channel, EventReceiver, EventSender, PipelineEvent, PipelineState};
pub use manager::{PipelineInfo, PipelineManager, SampleRouter};
pub use pipeline::Pipeline;
pub use sample::{MediaSample, Sample, SampleHandler, SampleSink};
pub use sink::{ChannelSink, FileSink, StatsSink};

/// Name the sample-delivering element must carry in every pipeline description
pub const APPSINK_NAME: &str = "appsink";

/// Grace period in milliseconds to wait for bus watcher to shutdown
pub const SHUTDOWN_GRACE_PERIOD_MS: u64 = 150;

/// Maximum number of pipelines that can be created to prevent resource exhaustion
pub const MAX_PIPELINES: usize = 100;

#[cfg(test)]
mod codec_tests;
