// sink.rs
//
// Copyright 2026 Stéphane Cerveau <scerveau@igalia.com>
//
// This file is part of GstPrinceOfParser
//
// SPDX-License-Identifier: GPL-3.0-only

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::sample::{MediaSample, SampleSink};
use crate::error::{Result, SendError};

/// Default capacity for [`ChannelSink::channel`]
pub const SAMPLE_CHANNEL_BUFFER: usize = 256;

/// Forwards samples to a bounded tokio channel.
/// Samples are dropped when the receiver falls behind or is gone.
pub struct ChannelSink {
    tx: mpsc::Sender<MediaSample>,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<MediaSample>) -> Self {
        Self {
            tx,
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<MediaSample>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

impl SampleSink for ChannelSink {
    fn write_sample(&self, sample: &MediaSample) -> Result<()> {
        match self.tx.try_send(sample.clone()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!("Sample channel full, dropped {} sample(s) so far", dropped);
                Ok(())
            }
            // Only the first write after the receiver went away is reported
            Err(mpsc::error::TrySendError::Closed(_)) => {
                if self.closed.swap(true, Ordering::Relaxed) {
                    Ok(())
                } else {
                    Err(SendError::Sink("sample channel closed".to_string()))
                }
            }
        }
    }
}

/// Appends the raw encoded payload of every sample to a file
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        debug!("Writing samples to {}", path.display());
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SampleSink for FileSink {
    fn write_sample(&self, sample: &MediaSample) -> Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| SendError::Sink(format!("{} lock poisoned", self.path.display())))?;
        file.write_all(&sample.data)?;
        Ok(())
    }
}

/// Counts what went through it
#[derive(Default)]
pub struct StatsSink {
    samples: AtomicU64,
    bytes: AtomicU64,
    ticks: AtomicU64,
}

impl StatsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Sum of the clock ticks of every sample seen
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

impl SampleSink for StatsSink {
    fn write_sample(&self, sample: &MediaSample) -> Result<()> {
        self.samples.fetch_add(1, Ordering::Relaxed);
        self.bytes
            .fetch_add(sample.data.len() as u64, Ordering::Relaxed);
        self.ticks
            .fetch_add(u64::from(sample.samples), Ordering::Relaxed);
        Ok(())
    }
}
