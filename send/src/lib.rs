// lib.rs
//
// Copyright 2026 Stéphane Cerveau <scerveau@igalia.com>
//
// This file is part of GstPrinceOfParser
//
// SPDX-License-Identifier: GPL-3.0-only

pub mod error;
pub mod gst;

pub use error::{Result, SendError};
pub use gst::{
    create_event_channel, Codec, MediaSample, Pipeline, PipelineEvent, PipelineInfo,
    PipelineManager, PipelineState, Sample, SampleHandler, SampleSink,
};
