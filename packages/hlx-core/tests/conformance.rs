//! Wire-protocol conformance properties.
//!
//! Quantified round-trip checks over the whole domain of each operation:
//! everything the formatter emits must classify back to the value it came
//! from, balance must survive its tagged/continuous conversion for every
//! bias, and the framer must honor its byte cap exactly.

use hlx_core::model::balance::{BIAS_MAX, BIAS_MIN};
use hlx_core::model::group::GroupSource;
use hlx_core::model::ids::{BandId, FavoriteId, GroupId, PresetId, SourceId, ZoneId};
use hlx_core::model::sound::SoundMode;
use hlx_core::protocol::format;
use hlx_core::protocol::{
    format_report, parse_report, parse_request, Framer, FramerEvent, Report, Request, FRAME_MAX,
};

fn z(n: u8) -> ZoneId {
    ZoneId::new(n).unwrap()
}

#[test]
fn balance_decodes_identically_for_every_bias() {
    for bias in BIAS_MIN..=BIAS_MAX {
        let frame = format::zone::balance(z(1), bias);
        match parse_report(&frame).unwrap() {
            Report::ZoneBalance { bias: decoded, .. } => assert_eq!(decoded, bias, "{frame}"),
            other => panic!("{frame} classified as {other:?}"),
        }
    }
}

#[test]
fn center_balance_decodes_from_either_channel() {
    // The codec may emit L0 or R0 for center; both must decode to 0.
    for frame in ["BO1L0", "BO1R0"] {
        match parse_report(frame).unwrap() {
            Report::ZoneBalance { bias, .. } => assert_eq!(bias, 0),
            other => panic!("{frame} classified as {other:?}"),
        }
    }
}

#[test]
fn volume_frames_round_trip_for_every_level_and_zone() {
    for zone in [1u8, 9, 24] {
        for level in -80i8..=0 {
            let frame = format::zone::volume(z(zone), level);
            assert_eq!(
                parse_request(&frame).unwrap(),
                Request::ZoneSetVolume {
                    zone: z(zone),
                    level
                }
            );
            assert_eq!(
                parse_report(&frame).unwrap(),
                Report::ZoneVolume {
                    zone: z(zone),
                    level
                }
            );
        }
    }
}

#[test]
fn tone_frames_round_trip_across_the_grid_corners() {
    for (bass, treble) in [(-10i8, -10i8), (-10, 10), (0, 0), (10, -10), (10, 10)] {
        let frame = format::zone::tone(z(3), bass, treble);
        assert_eq!(
            parse_request(&frame).unwrap(),
            Request::ZoneSetTone {
                zone: z(3),
                bass,
                treble
            }
        );
    }
}

#[test]
fn every_sound_mode_round_trips() {
    for mode in [
        SoundMode::Disabled,
        SoundMode::ZoneEqualizer,
        SoundMode::PresetEqualizer,
        SoundMode::Tone,
        SoundMode::Lowpass,
        SoundMode::Highpass,
    ] {
        let frame = format::zone::sound_mode(z(12), mode);
        assert_eq!(
            parse_request(&frame).unwrap(),
            Request::ZoneSetSoundMode { zone: z(12), mode }
        );
    }
}

#[test]
fn equalizer_band_frames_round_trip_for_every_band() {
    let preset = PresetId::new(7).unwrap();
    for band in 1u8..=10 {
        let band = BandId::new(band).unwrap();
        for level in [-10i8, -1, 0, 1, 10] {
            let zone_frame = format::zone::equalizer_band(z(2), band, level);
            assert_eq!(
                parse_request(&zone_frame).unwrap(),
                Request::ZoneSetEqualizerBand {
                    zone: z(2),
                    band,
                    level
                }
            );
            let preset_frame = format::preset::band(preset, band, level);
            assert_eq!(
                parse_request(&preset_frame).unwrap(),
                Request::PresetSetBand {
                    preset,
                    band,
                    level
                }
            );
        }
    }
}

#[test]
fn group_source_reports_round_trip_including_mixed() {
    let group = GroupId::new(3).unwrap();
    for source in 1u8..=8 {
        let frame = format::group::source(group, GroupSource::Single(SourceId::new(source).unwrap()));
        match parse_report(&frame).unwrap() {
            Report::GroupSource {
                source: GroupSource::Single(s),
                ..
            } => assert_eq!(s.get(), source),
            other => panic!("{frame} classified as {other:?}"),
        }
    }
    assert_eq!(
        parse_report(&format::group::source(group, GroupSource::Mixed)).unwrap(),
        Report::GroupSource {
            group,
            source: GroupSource::Mixed
        }
    );
}

#[test]
fn every_query_formats_to_its_own_completion_echo() {
    let queries: Vec<String> = vec![
        format::zone::query(z(5)),
        format::group::query(GroupId::new(2).unwrap()),
        format::source::query(SourceId::new(3).unwrap()),
        format::favorite::query(FavoriteId::new(4).unwrap()),
        format::preset::query(PresetId::new(6).unwrap()),
        format::network::query(),
        format::configuration::query_current(),
    ];
    for frame in queries {
        // Servers classify it as a query request...
        assert!(parse_request(&frame).is_ok(), "{frame}");
        // ...and clients classify the echo as a completion report that
        // formats straight back to the same bytes.
        let report = parse_report(&frame).unwrap();
        assert_eq!(format_report(&report), frame);
    }
}

#[test]
fn name_frames_accept_the_full_printable_range() {
    for name in ["A", "Great Room", "16 bytes exactly", "A/V #2 (deck)"] {
        let frame = format::zone::name(z(1), name);
        assert_eq!(
            parse_request(&frame).unwrap(),
            Request::ZoneSetName {
                zone: z(1),
                name: name.to_string()
            }
        );
    }
}

#[test]
fn framer_cap_is_exact() {
    // A frame at exactly the cap passes...
    let mut framer = Framer::new();
    let payload = "A".repeat(FRAME_MAX - 2);
    let events = framer.push(format!("[{payload}]").as_bytes());
    assert_eq!(events, vec![FramerEvent::Frame(payload)]);

    // ...one byte more is discarded with a recovery event, and the
    // stream keeps going.
    let mut framer = Framer::new();
    let over = "A".repeat(FRAME_MAX - 1);
    let events = framer.push(format!("[{over}][QE]").as_bytes());
    assert_eq!(
        events,
        vec![
            FramerEvent::Overflow,
            FramerEvent::Frame("QE".to_string()),
        ]
    );
}

#[test]
fn frames_survive_single_byte_delivery() {
    // Telnet may hand the stream over a byte at a time.
    let mut framer = Framer::new();
    let mut frames = Vec::new();
    for byte in b"\r\n[VO3R-25][VMTO1]junk[QX]" {
        for event in framer.push(&[*byte]) {
            if let FramerEvent::Frame(payload) = event {
                frames.push(payload);
            }
        }
    }
    assert_eq!(frames, vec!["VO3R-25", "VMTO1", "QX"]);
}

#[test]
fn identifier_zero_is_rejected_everywhere() {
    for frame in ["QO0", "VO0R-10", "CG0I1", "NI0\"X\"", "EP0B1L0", "AG1O0"] {
        assert!(parse_request(frame).is_err(), "{frame} should be malformed");
    }
}

#[test]
fn mixed_source_token_is_never_valid_as_input() {
    assert!(parse_request("CG1IX").is_err());
    // And plain zones never accept it at all.
    assert!(parse_request("CO1IX").is_err());
}
