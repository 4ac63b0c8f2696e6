// event.rs
//
// Copyright 2026 Stéphane Cerveau <scerveau@igalia.com>
//
// This file is part of GstPrinceOfParser
//
// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Pipeline is in void/pending state (transitioning)
    VoidPending,
    Null,
    Ready,
    Paused,
    Playing,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::VoidPending => write!(f, "void_pending"),
            PipelineState::Null => write!(f, "null"),
            PipelineState::Ready => write!(f, "ready"),
            PipelineState::Paused => write!(f, "paused"),
            PipelineState::Playing => write!(f, "playing"),
        }
    }
}

impl From<gstreamer::State> for PipelineState {
    fn from(state: gstreamer::State) -> Self {
        match state {
            gstreamer::State::VoidPending => PipelineState::VoidPending,
            gstreamer::State::Null => PipelineState::Null,
            gstreamer::State::Ready => PipelineState::Ready,
            gstreamer::State::Paused => PipelineState::Paused,
            gstreamer::State::Playing => PipelineState::Playing,
        }
    }
}

impl From<PipelineState> for gstreamer::State {
    fn from(state: PipelineState) -> Self {
        match state {
            PipelineState::VoidPending => gstreamer::State::VoidPending,
            PipelineState::Null => gstreamer::State::Null,
            PipelineState::Ready => gstreamer::State::Ready,
            PipelineState::Paused => gstreamer::State::Paused,
            PipelineState::Playing => gstreamer::State::Playing,
        }
    }
}

/// Events published by pipelines and the manager.
///
/// Bus errors and end-of-stream are reported here instead of ending the
/// process; whoever owns the receiver decides what to do with them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum PipelineEvent {
    #[serde(rename = "state_changed")]
    StateChanged {
        pipeline_id: u32,
        old_state: PipelineState,
        new_state: PipelineState,
    },
    #[serde(rename = "error")]
    Error { pipeline_id: u32, message: String },
    #[serde(rename = "unsupported")]
    Unsupported { pipeline_id: u32, message: String },
    #[serde(rename = "eos")]
    Eos { pipeline_id: u32 },
    #[serde(rename = "pipeline_added")]
    PipelineAdded { pipeline_id: u32, description: String },
    #[serde(rename = "pipeline_removed")]
    PipelineRemoved { pipeline_id: u32 },
}

impl PipelineEvent {
    pub fn pipeline_id(&self) -> u32 {
        match self {
            PipelineEvent::StateChanged { pipeline_id, .. }
            | PipelineEvent::Error { pipeline_id, .. }
            | PipelineEvent::Unsupported { pipeline_id, .. }
            | PipelineEvent::Eos { pipeline_id }
            | PipelineEvent::PipelineAdded { pipeline_id, .. }
            | PipelineEvent::PipelineRemoved { pipeline_id } => *pipeline_id,
        }
    }

    /// True for events after which the pipeline will not deliver more samples
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineEvent::Error { .. }
                | PipelineEvent::Unsupported { .. }
                | PipelineEvent::Eos { .. }
                | PipelineEvent::PipelineRemoved { .. }
        )
    }
}

pub type EventSender = tokio::sync::broadcast::Sender<PipelineEvent>;
pub type EventReceiver = tokio::sync::broadcast::Receiver<PipelineEvent>;

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    tokio::sync::broadcast::channel(256)
}
