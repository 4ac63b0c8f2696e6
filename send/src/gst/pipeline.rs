// pipeline.rs
//
// Copyright 2026 Stéphane Cerveau <scerveau@igalia.com>
//
// This file is part of GstPrinceOfParser
//
// SPDX-License-Identifier: GPL-3.0-only

use gstreamer::prelude::*;
use gstreamer::{self as gst};
use gstreamer_app::{AppSink, AppSinkCallbacks};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

use super::APPSINK_NAME;
use crate::error::{Result, SendError};
use crate::gst::event::{EventSender, PipelineEvent, PipelineState};
use crate::gst::sample::{Sample, SampleHandler};

/// Maximum length for pipeline descriptions to prevent memory exhaustion
pub const MAX_PIPELINE_DESCRIPTION_LENGTH: usize = 64 * 1024; // 64KB

/// Timeout for state changes in seconds
pub const STATE_CHANGE_TIMEOUT_SECS: u64 = 30;

/// How long a single bus poll blocks before the shutdown flag is rechecked
pub const BUS_POLL_INTERVAL_MS: u64 = 100;

const MEDIA_ERROR_PATTERNS: [&str; 16] = [
    "no suitable",
    "missing plugin",
    "missing element",
    "codec not found",
    "could not determine type",
    "unhandled",
    "not supported",
    "unsupported",
    "no decoder",
    "no encoder",
    "no demuxer",
    "no muxer",
    "format not supported",
    "caps not supported",
    "not negotiated",
    "stream type not supported",
];

/// Returns the error message when it points at missing codecs or formats
/// rather than at a broken pipeline.
pub fn is_media_not_supported_error(error: &gst::glib::Error) -> Option<String> {
    let message = error.message();
    let msg_lower = message.to_lowercase();

    MEDIA_ERROR_PATTERNS
        .iter()
        .any(|pattern| msg_lower.contains(pattern))
        .then(|| message.to_string())
}

/// Turn a failed start into an error carrying the bus ERROR message, if any.
/// Unsupported media keeps its own variant.
pub fn start_failure(err: SendError, bus_error: Option<&gst::Message>) -> SendError {
    let Some(gst::MessageView::Error(bus_error)) = bus_error.map(|msg| msg.view()) else {
        return err;
    };

    let gst_error = bus_error.error();
    if let Some(msg) = is_media_not_supported_error(&gst_error) {
        return SendError::MediaNotSupported(msg);
    }

    let context = match err {
        SendError::StateChangeFailed(msg) => msg,
        other => other.to_string(),
    };

    match bus_error.debug() {
        Some(debug) => {
            SendError::StateChangeFailed(format!("{}: {} ({})", context, gst_error, debug))
        }
        None => SendError::StateChangeFailed(format!("{}: {}", context, gst_error)),
    }
}

pub struct Pipeline {
    id: u32,
    description: String,
    pipeline: gst::Pipeline,
    bus_task: Option<tokio::task::JoinHandle<()>>,
    /// Flag to signal the bus watcher to stop
    shutdown_flag: Arc<AtomicBool>,
}

impl Pipeline {
    /// Parse `description` into a pipeline. `gst::init()` must have been called.
    pub fn new(id: u32, description: &str) -> Result<Self> {
        if description.trim().is_empty() {
            return Err(SendError::InvalidPipeline(
                "Pipeline description cannot be empty".to_string(),
            ));
        }

        if description.len() > MAX_PIPELINE_DESCRIPTION_LENGTH {
            return Err(SendError::InvalidPipeline(format!(
                "Pipeline description too long: {} bytes (max: {} bytes)",
                description.len(),
                MAX_PIPELINE_DESCRIPTION_LENGTH
            )));
        }

        let pipeline = gst::parse::launch(description)
            .map_err(|e| {
                if let Some(msg) = is_media_not_supported_error(&e) {
                    SendError::MediaNotSupported(msg)
                } else {
                    SendError::InvalidPipeline(e.to_string())
                }
            })?
            .downcast::<gst::Pipeline>()
            .map_err(|_| SendError::InvalidPipeline("Not a pipeline".to_string()))?;

        info!("Created pipeline '{}': {}", id, description);

        Ok(Self {
            id,
            description: description.to_string(),
            pipeline,
            bus_task: None,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Wire the bus watcher and the appsink sample callback, then go to PLAYING.
    ///
    /// Must be called from within a tokio runtime: the bus watcher runs as a task.
    pub fn start(&mut self, handler: Arc<dyn SampleHandler>, event_tx: EventSender) -> Result<()> {
        if self.bus_task.is_some() {
            return Err(SendError::StateChangeFailed(format!(
                "Pipeline '{}' is already started",
                self.id
            )));
        }

        tokio::runtime::Handle::try_current().map_err(|e| {
            SendError::GStreamer(format!(
                "Pipeline '{}' needs a tokio runtime to watch its bus: {}",
                self.id, e
            ))
        })?;

        let appsink = self.appsink()?;
        self.connect_new_sample(&appsink, handler);

        let bus = self
            .bus()
            .ok_or_else(|| SendError::InvalidPipeline("Pipeline has no bus".to_string()))?;

        self.shutdown_flag = Arc::new(AtomicBool::new(false));
        self.bus_task = Some(Self::start_bus_watch(
            bus.clone(),
            self.id,
            event_tx,
            Arc::clone(&self.shutdown_flag),
            self.pipeline.clone(),
        ));

        if let Err(e) = self.set_state(PipelineState::Playing) {
            self.halt_bus_watch();
            appsink.set_callbacks(AppSinkCallbacks::builder().build());
            // The element that refused the transition posted the reason on the bus
            let bus_error = bus.pop_filtered(&[gst::MessageType::Error]);
            return Err(start_failure(e, bus_error.as_ref()));
        }

        Ok(())
    }

    /// Set the pipeline to NULL and stop watching its bus
    pub fn stop(&mut self) -> Result<()> {
        self.set_state(PipelineState::Null)?;
        self.halt_bus_watch();
        Ok(())
    }

    fn appsink(&self) -> Result<AppSink> {
        self.pipeline
            .by_name(APPSINK_NAME)
            .ok_or(SendError::MissingAppSink(self.id))?
            .dynamic_cast::<AppSink>()
            .map_err(|_| {
                SendError::InvalidPipeline(format!(
                    "Element '{}' in pipeline '{}' is not an appsink",
                    APPSINK_NAME, self.id
                ))
            })
    }

    fn connect_new_sample(&self, appsink: &AppSink, handler: Arc<dyn SampleHandler>) {
        let id = self.id;

        appsink.set_property("emit-signals", true);
        appsink.set_callbacks(
            AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let sample = appsink.pull_sample().map_err(|e| {
                        debug!("Pipeline '{}' failed to pull sample: {}", id, e);
                        gst::FlowError::Eos
                    })?;

                    // Sample without a buffer carries nothing to deliver
                    let Some(buffer) = sample.buffer() else {
                        trace!("Pipeline '{}' produced a sample without buffer", id);
                        return Ok(gst::FlowSuccess::Ok);
                    };

                    let map = buffer.map_readable().map_err(|e| {
                        error!("Pipeline '{}' failed to map buffer: {}", id, e);
                        gst::FlowError::Error
                    })?;

                    handler.handle_sample(Sample {
                        pipeline_id: id,
                        data: map.as_slice().to_vec(),
                        duration: buffer
                            .duration()
                            .map(|d| Duration::from_nanos(d.nseconds())),
                    });

                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );

        debug!("Pipeline '{}' sample callback connected", id);
    }

    /// Poll the bus on a blocking task and turn messages into events.
    /// The bus, pipeline ID, event sender, and shutdown flag are passed in so
    /// the task never needs to lock the owning `Pipeline`.
    fn start_bus_watch(
        bus: gst::Bus,
        id: u32,
        event_tx: EventSender,
        shutdown_flag: Arc<AtomicBool>,
        pipeline: gst::Pipeline,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if shutdown_flag.load(Ordering::Acquire) {
                    debug!("Bus watcher for pipeline '{}' received shutdown signal", id);
                    break;
                }

                let bus_clone = bus.clone();
                let shutdown_clone = Arc::clone(&shutdown_flag);

                let msg = match tokio::task::spawn_blocking(move || {
                    if shutdown_clone.load(Ordering::Acquire) {
                        return None;
                    }
                    bus_clone.timed_pop(gst::ClockTime::from_mseconds(BUS_POLL_INTERVAL_MS))
                })
                .await
                {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(
                            "Bus watcher spawn_blocking failed for pipeline '{}': {}",
                            id, e
                        );
                        continue;
                    }
                };

                let Some(msg) = msg else {
                    continue;
                };

                let event = match msg.view() {
                    gst::MessageView::Error(err) => {
                        let gst_error = err.error();
                        let message =
                            format!("{}: {}", gst_error, err.debug().unwrap_or_default());

                        if is_media_not_supported_error(&gst_error).is_some() {
                            warn!("Pipeline '{}' unsupported media: {}", id, message);
                            Some(PipelineEvent::Unsupported {
                                pipeline_id: id,
                                message,
                            })
                        } else {
                            error!("Pipeline '{}' error: {}", id, message);
                            Some(PipelineEvent::Error {
                                pipeline_id: id,
                                message,
                            })
                        }
                    }
                    gst::MessageView::Warning(warning) => {
                        warn!(
                            "Pipeline '{}' warning: {}",
                            id,
                            warning.debug().unwrap_or_default()
                        );
                        None
                    }
                    gst::MessageView::Eos(_) => {
                        info!("Pipeline '{}' reached end of stream", id);
                        Some(PipelineEvent::Eos { pipeline_id: id })
                    }
                    gst::MessageView::StateChanged(state_changed) => {
                        // Child elements post their own transitions, only report the pipeline's
                        let from_pipeline = msg
                            .src()
                            .is_some_and(|src| src == pipeline.upcast_ref::<gst::Object>());
                        from_pipeline.then(|| {
                            let old = PipelineState::from(state_changed.old());
                            let new = PipelineState::from(state_changed.current());
                            debug!("Pipeline '{}' state changed: {} -> {}", id, old, new);
                            PipelineEvent::StateChanged {
                                pipeline_id: id,
                                old_state: old,
                                new_state: new,
                            }
                        })
                    }
                    _ => None,
                };

                if let Some(event) = event {
                    if event_tx.send(event).is_err() {
                        warn!(
                            "Failed to send event for pipeline '{}': no receivers",
                            id
                        );
                    }
                }
            }

            debug!("Bus watcher for pipeline '{}' stopped", id);
        })
    }

    fn halt_bus_watch(&mut self) {
        self.shutdown_flag.store(true, Ordering::Release);
        if let Some(task) = self.bus_task.take() {
            task.abort();
        }
    }

    pub fn bus(&self) -> Option<gst::Bus> {
        self.pipeline.bus()
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_started(&self) -> bool {
        self.bus_task.is_some()
    }

    pub fn state(&self) -> PipelineState {
        let (_result, current, _pending) = self.pipeline.state(gst::ClockTime::ZERO);
        PipelineState::from(current)
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.state(), PipelineState::Playing)
    }

    pub fn set_state(&self, state: PipelineState) -> Result<()> {
        let gst_state: gst::State = state.into();
        self.pipeline
            .set_state(gst_state)
            .map_err(|e| SendError::StateChangeFailed(e.to_string()))?;

        let timeout = gst::ClockTime::from_seconds(STATE_CHANGE_TIMEOUT_SECS);
        let (result, current, _pending) = self.pipeline.state(timeout);

        match result {
            Ok(gst::StateChangeSuccess::Success | gst::StateChangeSuccess::NoPreroll) => {
                info!("Pipeline '{}' state set to {}", self.id, state);
                Ok(())
            }
            Ok(gst::StateChangeSuccess::Async) => {
                info!(
                    "Pipeline '{}' state change to {} in progress (current: {:?})",
                    self.id, state, current
                );
                Ok(())
            }
            Err(_) => Err(SendError::StateChangeFailed(format!(
                "Failed to change state to {} for pipeline '{}'",
                state, self.id
            ))),
        }
    }

    /// Signal the bus watcher to stop
    pub fn signal_shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::Release);
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        debug!("Dropping pipeline '{}'", self.id);

        self.halt_bus_watch();
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}
