// codec_tests.rs
//
// Copyright 2026 Stéphane Cerveau <scerveau@igalia.com>
//
// This file is part of GstPrinceOfParser
//
// SPDX-License-Identifier: GPL-3.0-only

use std::time::Duration;

use super::codec::*;
use crate::error::SendError;

#[test]
fn test_codec_from_str_case_insensitive() {
    assert_eq!("vp8".parse::<Codec>().unwrap(), Codec::Vp8);
    assert_eq!("VP9".parse::<Codec>().unwrap(), Codec::Vp9);
    assert_eq!("H264".parse::<Codec>().unwrap(), Codec::H264);
    assert_eq!("opus".parse::<Codec>().unwrap(), Codec::Opus);
    assert_eq!("g722".parse::<Codec>().unwrap(), Codec::G722);
    assert_eq!("PCMU".parse::<Codec>().unwrap(), Codec::Pcmu);
    assert_eq!("pcma".parse::<Codec>().unwrap(), Codec::Pcma);
}

#[test]
fn test_codec_from_str_unknown() {
    match "h265".parse::<Codec>() {
        Err(SendError::UnsupportedCodec(name)) => assert_eq!(name, "h265"),
        other => panic!("Expected UnsupportedCodec, got {:?}", other),
    }
}

#[test]
fn test_codec_display_parses_back() {
    for codec in Codec::ALL {
        assert_eq!(codec.to_string().parse::<Codec>().unwrap(), codec);
    }
    assert_eq!(Codec::Opus.to_string(), "opus");
    assert_eq!(Codec::H264.to_string(), "H264");
}

#[test]
fn test_codec_clock_rates() {
    assert_eq!(Codec::Vp8.clock_rate(), 90_000);
    assert_eq!(Codec::Vp9.clock_rate(), 90_000);
    assert_eq!(Codec::H264.clock_rate(), 90_000);
    assert_eq!(Codec::Opus.clock_rate(), 48_000);
    assert_eq!(Codec::G722.clock_rate(), 48_000);
    assert_eq!(Codec::Pcmu.clock_rate(), 8_000);
    assert_eq!(Codec::Pcma.clock_rate(), 8_000);
}

#[test]
fn test_codec_default_source_matches_media_type() {
    for codec in Codec::ALL {
        let expected = if codec.is_video() {
            "videotestsrc"
        } else {
            "audiotestsrc"
        };
        assert_eq!(codec.default_source(), expected, "codec {}", codec);
    }
}

#[test]
fn test_build_description_vp8() {
    let description = Codec::Vp8.build_description("videotestsrc").unwrap();
    assert_eq!(
        description,
        "videotestsrc ! vp8enc error-resilient=partitions keyframe-max-dist=10 auto-alt-ref=true cpu-used=5 deadline=1 ! appsink name=appsink"
    );
}

#[test]
fn test_build_description_pcmu_resamples_before_encoding() {
    let description = Codec::Pcmu.build_description("  pulsesrc  ").unwrap();
    assert_eq!(
        description,
        "pulsesrc ! audio/x-raw, rate=8000 ! mulawenc ! appsink name=appsink"
    );
}

#[test]
fn test_build_description_always_ends_with_appsink() {
    for codec in Codec::ALL {
        let description = codec.build_description(codec.default_source()).unwrap();
        assert!(
            description.ends_with("! appsink name=appsink"),
            "{} description: {}",
            codec,
            description
        );
        assert!(description.contains(codec.encoder_fragment()));
    }
}

#[test]
fn test_build_description_empty_source_fails() {
    let result = Codec::Opus.build_description(" \t ");
    assert!(matches!(result, Err(SendError::InvalidPipeline(msg)) if msg.contains("empty")));
}

#[test]
fn test_samples_for_duration() {
    // 20ms audio frames
    assert_eq!(
        Codec::Opus.samples_for_duration(Some(Duration::from_millis(20))),
        960
    );
    assert_eq!(
        Codec::Pcma.samples_for_duration(Some(Duration::from_millis(20))),
        160
    );
    // 25fps video
    assert_eq!(
        Codec::Vp8.samples_for_duration(Some(Duration::from_millis(40))),
        3600
    );
}

#[test]
fn test_samples_for_duration_truncates() {
    // 1/30s is 2999.99997 ticks at 90kHz
    assert_eq!(
        Codec::H264.samples_for_duration(Some(Duration::from_nanos(33_333_333))),
        2999
    );
}

#[test]
fn test_samples_for_unknown_duration_is_zero() {
    assert_eq!(Codec::Vp8.samples_for_duration(None), 0);
    assert_eq!(Codec::Opus.samples_for_duration(Some(Duration::ZERO)), 0);
}

#[test]
fn test_samples_for_huge_duration_saturates() {
    let duration = Duration::from_secs(u64::MAX / 2);
    assert_eq!(Codec::Vp8.samples_for_duration(Some(duration)), u32::MAX);
}

#[test]
fn test_codec_serde() {
    assert_eq!(serde_json::to_string(&Codec::H264).unwrap(), "\"h264\"");
    let codec: Codec = serde_json::from_str("\"pcmu\"").unwrap();
    assert_eq!(codec, Codec::Pcmu);
}
