// manager.rs
//
// Copyright 2026 Stéphane Cerveau <scerveau@igalia.com>
//
// This file is part of GstPrinceOfParser
//
// SPDX-License-Identifier: GPL-3.0-only

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::{MAX_PIPELINES, SHUTDOWN_GRACE_PERIOD_MS};
use crate::error::{Result, SendError};
use crate::gst::codec::Codec;
use crate::gst::event::{EventSender, PipelineEvent, PipelineState};
use crate::gst::pipeline::Pipeline;
use crate::gst::sample::{MediaSample, Sample, SampleHandler, SampleSink};

struct Route {
    codec: Codec,
    sinks: Vec<Arc<dyn SampleSink>>,
}

/// Correlates pipeline IDs with their codec and outputs.
///
/// Installed as the sample handler of every managed pipeline, so it runs on
/// GStreamer streaming threads and uses a std lock.
#[derive(Default)]
pub struct SampleRouter {
    routes: std::sync::RwLock<HashMap<u32, Route>>,
}

impl SampleRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: u32, codec: Codec, sinks: Vec<Arc<dyn SampleSink>>) {
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        routes.insert(id, Route { codec, sinks });
    }

    pub fn unregister(&self, id: u32) -> bool {
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        routes.remove(&id).is_some()
    }

    pub fn contains(&self, id: u32) -> bool {
        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
        routes.contains_key(&id)
    }

    pub fn codec(&self, id: u32) -> Option<Codec> {
        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
        routes.get(&id).map(|route| route.codec)
    }

    /// Convert a raw sample to a [`MediaSample`] and write it to every sink of
    /// its pipeline. Samples from unknown pipelines are discarded.
    pub fn dispatch(&self, sample: Sample) {
        let (codec, sinks) = {
            let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
            match routes.get(&sample.pipeline_id) {
                Some(route) => (route.codec, route.sinks.clone()),
                None => {
                    warn!(
                        "Discarding {} byte sample, no pipeline with id '{}'",
                        sample.data.len(),
                        sample.pipeline_id
                    );
                    return;
                }
            }
        };

        let media = MediaSample {
            samples: codec.samples_for_duration(sample.duration),
            data: sample.data,
        };

        for sink in &sinks {
            if let Err(e) = sink.write_sample(&media) {
                warn!(
                    "Pipeline '{}' failed to write sample: {}",
                    sample.pipeline_id, e
                );
            }
        }
    }
}

impl SampleHandler for SampleRouter {
    fn handle_sample(&self, sample: Sample) {
        self.dispatch(sample);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineInfo {
    pub id: u32,
    pub description: String,
    pub codec: Codec,
    pub state: PipelineState,
    pub streaming: bool,
    pub started: bool,
}

#[derive(Clone)]
struct ManagedPipeline {
    pipeline: Arc<Mutex<Pipeline>>,
    codec: Codec,
}

impl ManagedPipeline {
    async fn info(&self) -> PipelineInfo {
        let p = self.pipeline.lock().await;
        PipelineInfo {
            id: p.id(),
            description: p.description().to_string(),
            codec: self.codec,
            state: p.state(),
            streaming: p.is_streaming(),
            started: p.is_started(),
        }
    }
}

/// Table of pipelines keyed by the integer ID stamped on their samples.
pub struct PipelineManager {
    pipelines: RwLock<HashMap<u32, ManagedPipeline>>,
    router: Arc<SampleRouter>,
    event_tx: EventSender,
    next_id: AtomicU32,
}

impl PipelineManager {
    pub fn new(event_tx: EventSender) -> Self {
        Self {
            pipelines: RwLock::new(HashMap::new()),
            router: Arc::new(SampleRouter::new()),
            event_tx,
            next_id: AtomicU32::new(0),
        }
    }

    pub fn router(&self) -> Arc<SampleRouter> {
        Arc::clone(&self.router)
    }

    /// Register a pipeline built from a raw description. The description must
    /// contain an element named `appsink`; this is only checked on start.
    pub async fn add_pipeline(
        &self,
        description: &str,
        codec: Codec,
        sinks: Vec<Arc<dyn SampleSink>>,
    ) -> Result<u32> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let pipeline = Pipeline::new(id, description)?;

        {
            // Limit check and insert must happen under the same write lock
            let mut pipelines = self.pipelines.write().await;
            if pipelines.len() >= MAX_PIPELINES {
                return Err(SendError::InvalidPipeline(format!(
                    "Maximum number of pipelines ({}) reached",
                    MAX_PIPELINES
                )));
            }

            self.router.register(id, codec, sinks);
            pipelines.insert(
                id,
                ManagedPipeline {
                    pipeline: Arc::new(Mutex::new(pipeline)),
                    codec,
                },
            );
        }

        info!("Added {} pipeline '{}': {}", codec, id, description);

        if self
            .event_tx
            .send(PipelineEvent::PipelineAdded {
                pipeline_id: id,
                description: description.to_string(),
            })
            .is_err()
        {
            warn!("Failed to send PipelineAdded event: no receivers");
        }

        Ok(id)
    }

    /// Register `<source> ! <encoder for codec> ! appsink name=appsink`
    pub async fn add_encoded_pipeline(
        &self,
        codec: Codec,
        source: &str,
        sinks: Vec<Arc<dyn SampleSink>>,
    ) -> Result<u32> {
        let description = codec.build_description(source)?;
        self.add_pipeline(&description, codec, sinks).await
    }

    async fn get(&self, id: u32) -> Result<ManagedPipeline> {
        let pipelines = self.pipelines.read().await;
        pipelines
            .get(&id)
            .cloned()
            .ok_or(SendError::PipelineNotFound(id))
    }

    pub async fn start(&self, id: u32) -> Result<()> {
        let entry = self.get(id).await?;
        let mut p = entry.pipeline.lock().await;
        let handler: Arc<dyn SampleHandler> = self.router();
        p.start(handler, self.event_tx.clone())
    }

    pub async fn stop(&self, id: u32) -> Result<()> {
        let entry = self.get(id).await?;
        let mut p = entry.pipeline.lock().await;
        p.stop()
    }

    pub async fn remove_pipeline(&self, id: u32) -> Result<()> {
        let entry = {
            let mut pipelines = self.pipelines.write().await;
            pipelines.remove(&id)
        }
        .ok_or(SendError::PipelineNotFound(id))?;

        // Samples still in flight are discarded from here on
        self.router.unregister(id);

        // The entry is already gone from the table, so a failed stop is not
        // reported to the caller. Dropping the pipeline forces it to NULL.
        {
            let mut p = entry.pipeline.lock().await;
            if let Err(e) = p.stop() {
                warn!("Pipeline '{}' did not stop cleanly on removal: {}", id, e);
            }
        }

        info!("Removed pipeline '{}'", id);

        if self
            .event_tx
            .send(PipelineEvent::PipelineRemoved { pipeline_id: id })
            .is_err()
        {
            warn!("Failed to send PipelineRemoved event: no receivers");
        }

        Ok(())
    }

    pub async fn get_pipeline_info(&self, id: u32) -> Result<PipelineInfo> {
        Ok(self.get(id).await?.info().await)
    }

    pub async fn list_pipelines(&self) -> Vec<PipelineInfo> {
        // Don't hold the table lock while waiting on individual pipelines
        let entries: Vec<ManagedPipeline> = {
            let pipelines = self.pipelines.read().await;
            pipelines.values().cloned().collect()
        };

        let mut infos = Vec::with_capacity(entries.len());
        for entry in entries {
            infos.push(entry.info().await);
        }
        infos.sort_by_key(|info| info.id);

        infos
    }

    pub async fn pipeline_count(&self) -> usize {
        let pipelines = self.pipelines.read().await;
        pipelines.len()
    }

    pub async fn shutdown(&self) {
        let entries: Vec<(u32, ManagedPipeline)> = {
            let mut pipelines = self.pipelines.write().await;
            pipelines.drain().collect()
        };

        if entries.is_empty() {
            return;
        }

        for (_, entry) in &entries {
            entry.pipeline.lock().await.signal_shutdown();
        }

        // Give bus watchers time to see the shutdown flag
        tokio::time::sleep(tokio::time::Duration::from_millis(SHUTDOWN_GRACE_PERIOD_MS)).await;

        for (id, entry) in entries {
            self.router.unregister(id);
            let mut p = entry.pipeline.lock().await;
            if let Err(e) = p.stop() {
                debug!("Pipeline '{}' did not stop cleanly: {}", id, e);
            }
            info!("Stopped pipeline '{}' during shutdown", id);
        }
    }
}
