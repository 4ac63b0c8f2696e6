// codec.rs
//
// Copyright 2026 Stéphane Cerveau <scerveau@igalia.com>
//
// This file is part of GstPrinceOfParser
//
// SPDX-License-Identifier: GPL-3.0-only

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::APPSINK_NAME;
use crate::error::{Result, SendError};

pub const VIDEO_CLOCK_RATE: u32 = 90_000;
pub const AUDIO_CLOCK_RATE: u32 = 48_000;
pub const PCM_CLOCK_RATE: u32 = 8_000;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Output encodings a pipeline can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Vp8,
    Vp9,
    H264,
    Opus,
    G722,
    Pcmu,
    Pcma,
}

impl Codec {
    pub const ALL: [Codec; 7] = [
        Codec::Vp8,
        Codec::Vp9,
        Codec::H264,
        Codec::Opus,
        Codec::G722,
        Codec::Pcmu,
        Codec::Pcma,
    ];

    pub fn is_video(&self) -> bool {
        matches!(self, Codec::Vp8 | Codec::Vp9 | Codec::H264)
    }

    /// RTP clock rate used to convert buffer durations into sample counts
    pub fn clock_rate(&self) -> u32 {
        match self {
            Codec::Vp8 | Codec::Vp9 | Codec::H264 => VIDEO_CLOCK_RATE,
            Codec::Opus | Codec::G722 => AUDIO_CLOCK_RATE,
            Codec::Pcmu | Codec::Pcma => PCM_CLOCK_RATE,
        }
    }

    /// Encoder chain placed between the source and the appsink
    pub fn encoder_fragment(&self) -> &'static str {
        match self {
            Codec::Vp8 => {
                "vp8enc error-resilient=partitions keyframe-max-dist=10 auto-alt-ref=true cpu-used=5 deadline=1"
            }
            Codec::Vp9 => "vp9enc",
            Codec::H264 => {
                "video/x-raw,format=I420 ! x264enc speed-preset=ultrafast tune=zerolatency key-int-max=20 ! video/x-h264,stream-format=byte-stream"
            }
            Codec::Opus => "opusenc",
            Codec::G722 => "avenc_g722",
            Codec::Pcmu => "audio/x-raw, rate=8000 ! mulawenc",
            Codec::Pcma => "audio/x-raw, rate=8000 ! alawenc",
        }
    }

    pub fn default_source(&self) -> &'static str {
        if self.is_video() {
            "videotestsrc"
        } else {
            "audiotestsrc"
        }
    }

    /// Full pipeline description: `<source> ! <encoder> ! appsink name=appsink`
    pub fn build_description(&self, source: &str) -> Result<String> {
        let source = source.trim();
        if source.is_empty() {
            return Err(SendError::InvalidPipeline(
                "Pipeline source cannot be empty".to_string(),
            ));
        }

        Ok(format!(
            "{} ! {} ! appsink name={}",
            source,
            self.encoder_fragment(),
            APPSINK_NAME
        ))
    }

    /// Number of clock ticks spanned by `duration`, truncated.
    /// Buffers without a duration count as zero ticks.
    pub fn samples_for_duration(&self, duration: Option<Duration>) -> u32 {
        let Some(duration) = duration else {
            return 0;
        };

        let ticks = duration.as_nanos() * u128::from(self.clock_rate()) / NANOS_PER_SEC;
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Codec::Vp8 => write!(f, "VP8"),
            Codec::Vp9 => write!(f, "VP9"),
            Codec::H264 => write!(f, "H264"),
            Codec::Opus => write!(f, "opus"),
            Codec::G722 => write!(f, "G722"),
            Codec::Pcmu => write!(f, "PCMU"),
            Codec::Pcma => write!(f, "PCMA"),
        }
    }
}

impl std::str::FromStr for Codec {
    type Err = SendError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "vp8" => Ok(Codec::Vp8),
            "vp9" => Ok(Codec::Vp9),
            "h264" => Ok(Codec::H264),
            "opus" => Ok(Codec::Opus),
            "g722" => Ok(Codec::G722),
            "pcmu" => Ok(Codec::Pcmu),
            "pcma" => Ok(Codec::Pcma),
            _ => Err(SendError::UnsupportedCodec(s.to_string())),
        }
    }
}
