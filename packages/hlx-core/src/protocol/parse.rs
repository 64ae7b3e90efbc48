//! Typed frame parsing.
//!
//! Two dispatch tables pair every pattern with its typed parser: the
//! request table classifies frames arriving at a server, the report table
//! classifies state reports and acknowledgements arriving at a client.
//! Tables are process-wide, built lazily on first use, and tried in
//! declaration order (more specific shapes first).
//!
//! A frame matching no pattern is an [`ProtocolError::UnknownCommand`]; a
//! frame that matches but carries values outside their domain is
//! [`ProtocolError::Malformed`]. Neither tears down the connection.

use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Captures;

use crate::error::{ProtocolError, ProtocolResult};
use crate::model::balance::{Bias, BIAS_MAX};
use crate::model::crossover::Frequency;
use crate::model::equalizer::BandLevel;
use crate::model::front_panel::Brightness;
use crate::model::group::GroupSource;
use crate::model::ids::{BandId, FavoriteId, GroupId, PresetId, SourceId, ZoneId};
use crate::model::network::Eui48;
use crate::model::sound::SoundMode;
use crate::model::tone::ToneLevel;
use crate::model::volume::Level;
use crate::protocol::patterns::{ip_address, Matcher, BOOL, EUI48, ID, NAME, SIGNED};

/// A command arriving at the server side of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `QO<z>`
    ZoneQuery(ZoneId),
    /// `QVO<z>`
    ZoneQueryVolume(ZoneId),
    /// `QVMO<z>`
    ZoneQueryMute(ZoneId),
    /// `QCO<z>`
    ZoneQuerySource(ZoneId),
    /// `NO<z>"name"`
    ZoneSetName { zone: ZoneId, name: String },
    /// `CO<z>I<s>`
    ZoneSetSource { zone: ZoneId, source: SourceId },
    /// `CXI<s>`
    ZoneSetSourceAll { source: SourceId },
    /// `VO<z>R<level>`
    ZoneSetVolume { zone: ZoneId, level: Level },
    /// `VXR<level>`
    ZoneSetVolumeAll { level: Level },
    /// `VO<z>U` / `VO<z>D`
    ZoneAdjustVolume { zone: ZoneId, up: bool },
    /// `VO<z>F<0|1>`
    ZoneSetVolumeFixed { zone: ZoneId, fixed: bool },
    /// `VMO<z>` / `VUMO<z>`
    ZoneSetMute { zone: ZoneId, mute: bool },
    /// `VMTO<z>`
    ZoneToggleMute(ZoneId),
    /// `BO<z><L|R><mag>`
    ZoneSetBalance { zone: ZoneId, bias: Bias },
    /// `BO<z>LU` / `BO<z>RU`
    ZoneAdjustBalance { zone: ZoneId, left: bool },
    /// `TO<z>B<bass>T<treble>`
    ZoneSetTone {
        zone: ZoneId,
        bass: ToneLevel,
        treble: ToneLevel,
    },
    /// `TO<z>BU` / `TO<z>BD`
    ZoneAdjustBass { zone: ZoneId, up: bool },
    /// `TO<z>TU` / `TO<z>TD`
    ZoneAdjustTreble { zone: ZoneId, up: bool },
    /// `SO<z><mode>`
    ZoneSetSoundMode { zone: ZoneId, mode: SoundMode },
    /// `EO<z>B<b>L<level>`
    ZoneSetEqualizerBand {
        zone: ZoneId,
        band: BandId,
        level: BandLevel,
    },
    /// `EO<z>B<b>U` / `…D`
    ZoneAdjustEqualizerBand {
        zone: ZoneId,
        band: BandId,
        up: bool,
    },
    /// `EO<z>P<p>`
    ZoneSetEqualizerPreset { zone: ZoneId, preset: PresetId },
    /// `HO<z>F<freq>`
    ZoneSetHighpass { zone: ZoneId, frequency: Frequency },
    /// `LO<z>F<freq>`
    ZoneSetLowpass { zone: ZoneId, frequency: Frequency },

    /// `QG<g>`
    GroupQuery(GroupId),
    /// `NG<g>"name"`
    GroupSetName { group: GroupId, name: String },
    /// `CG<g>I<s>`
    GroupSetSource { group: GroupId, source: SourceId },
    /// `VG<g>R<level>`
    GroupSetVolume { group: GroupId, level: Level },
    /// `VG<g>U` / `VG<g>D`
    GroupAdjustVolume { group: GroupId, up: bool },
    /// `VMG<g>` / `VUMG<g>`
    GroupSetMute { group: GroupId, mute: bool },
    /// `VMTG<g>`
    GroupToggleMute(GroupId),
    /// `AG<g>O<z>`
    GroupAddZone { group: GroupId, zone: ZoneId },
    /// `RG<g>O<z>`
    GroupRemoveZone { group: GroupId, zone: ZoneId },

    /// `QI<s>`
    SourceQuery(SourceId),
    /// `NI<s>"name"`
    SourceSetName { source: SourceId, name: String },

    /// `QF<f>`
    FavoriteQuery(FavoriteId),
    /// `NF<f>"name"`
    FavoriteSetName { favorite: FavoriteId, name: String },

    /// `QEP<p>`
    PresetQuery(PresetId),
    /// `NEP<p>"name"`
    PresetSetName { preset: PresetId, name: String },
    /// `EP<p>B<b>L<level>`
    PresetSetBand {
        preset: PresetId,
        band: BandId,
        level: BandLevel,
    },
    /// `EP<p>B<b>U` / `…D`
    PresetAdjustBand {
        preset: PresetId,
        band: BandId,
        up: bool,
    },

    /// `QFPL`
    FrontPanelQueryLocked,
    /// `FPB<0-3>`
    FrontPanelSetBrightness(Brightness),
    /// `FPL<0|1>`
    FrontPanelSetLocked(bool),

    /// `QE`
    NetworkQuery,

    /// `QX`
    ConfigurationQuery,
    /// `LOAD`
    ConfigurationLoad,
    /// `SAVE`
    ConfigurationSave,
    /// `RESET`
    ConfigurationReset,
}

/// A state report or acknowledgement arriving at the client side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// `NO<z>"name"`
    ZoneName { zone: ZoneId, name: String },
    /// `CO<z>I<s>`
    ZoneSource { zone: ZoneId, source: SourceId },
    /// `VO<z>R<level>`
    ZoneVolume { zone: ZoneId, level: Level },
    /// `VO<z>F<0|1>`
    ZoneVolumeFixed { zone: ZoneId, fixed: bool },
    /// `VMO<z>` / `VUMO<z>`
    ZoneMute { zone: ZoneId, mute: bool },
    /// `BO<z><L|R><mag>`
    ZoneBalance { zone: ZoneId, bias: Bias },
    /// `TO<z>B<bass>T<treble>`
    ZoneTone {
        zone: ZoneId,
        bass: ToneLevel,
        treble: ToneLevel,
    },
    /// `SO<z><mode>`
    ZoneSoundMode { zone: ZoneId, mode: SoundMode },
    /// `EO<z>B<b>L<level>`
    ZoneEqualizerBand {
        zone: ZoneId,
        band: BandId,
        level: BandLevel,
    },
    /// `EO<z>P<p>`
    ZoneEqualizerPreset { zone: ZoneId, preset: PresetId },
    /// `HO<z>F<freq>`
    ZoneHighpass { zone: ZoneId, frequency: Frequency },
    /// `LO<z>F<freq>`
    ZoneLowpass { zone: ZoneId, frequency: Frequency },
    /// `QO<z>` - end of a zone query dump.
    ZoneQueryDone(ZoneId),

    /// `NG<g>"name"`
    GroupName { group: GroupId, name: String },
    /// `CG<g>I<s|X>`
    GroupSource { group: GroupId, source: GroupSource },
    /// `VG<g>R<level>`
    GroupVolume { group: GroupId, level: Level },
    /// `VMG<g>` / `VUMG<g>`
    GroupMute { group: GroupId, mute: bool },
    /// `AG<g>O<z>`
    GroupZoneAdded { group: GroupId, zone: ZoneId },
    /// `RG<g>O<z>`
    GroupZoneRemoved { group: GroupId, zone: ZoneId },
    /// `QG<g>` - end of a group query dump.
    GroupQueryDone(GroupId),

    /// `NI<s>"name"`
    SourceName { source: SourceId, name: String },
    /// `QI<s>` - end of a source query dump.
    SourceQueryDone(SourceId),

    /// `NF<f>"name"`
    FavoriteName { favorite: FavoriteId, name: String },
    /// `QF<f>` - end of a favorite query dump.
    FavoriteQueryDone(FavoriteId),

    /// `NEP<p>"name"`
    PresetName { preset: PresetId, name: String },
    /// `EP<p>B<b>L<level>`
    PresetBand {
        preset: PresetId,
        band: BandId,
        level: BandLevel,
    },
    /// `QEP<p>` - end of a preset query dump.
    PresetQueryDone(PresetId),

    /// `FPB<0-3>`
    FrontPanelBrightness(Brightness),
    /// `FPL<0|1>`, also matched from the documented `FPL<0|1>QFPL` form.
    FrontPanelLocked(bool),

    /// `DHCP<0|1>`
    NetworkDhcp(bool),
    /// `SDDP<0|1>`
    NetworkSddp(bool),
    /// `MAC<EUI-48>`
    NetworkMac(Eui48),
    /// `IP<addr>`
    NetworkHostAddress(IpAddr),
    /// `NM<addr>`
    NetworkNetmask(IpAddr),
    /// `GW<addr>`
    NetworkRouter(IpAddr),
    /// `QE` - end of the network query dump.
    NetworkQueryDone,

    /// `QX` - end of the full configuration dump.
    ConfigurationQueryDone,
    /// `SAVING...`
    Saving,
    /// `LOAD`
    LoadComplete,
    /// `RESET`
    ResetComplete,
    /// `ERROR`
    Error,
}

// ─────────────────────────────────────────────────────────────────────────────
// Capture extraction
// ─────────────────────────────────────────────────────────────────────────────

fn malformed(caps: &Captures<'_>, reason: impl Into<String>) -> ProtocolError {
    ProtocolError::Malformed {
        frame: caps[0].to_string(),
        reason: reason.into(),
    }
}

fn cap_u8(caps: &Captures<'_>, index: usize, what: &str) -> ProtocolResult<u8> {
    caps[index]
        .parse()
        .map_err(|_| malformed(caps, format!("{what} {:?} does not fit in u8", &caps[index])))
}

fn cap_i8(caps: &Captures<'_>, index: usize, what: &str) -> ProtocolResult<i8> {
    caps[index]
        .parse()
        .map_err(|_| malformed(caps, format!("{what} {:?} does not fit in i8", &caps[index])))
}

fn cap_u16(caps: &Captures<'_>, index: usize, what: &str) -> ProtocolResult<u16> {
    caps[index]
        .parse()
        .map_err(|_| malformed(caps, format!("{what} {:?} does not fit in u16", &caps[index])))
}

fn cap_bool(caps: &Captures<'_>, index: usize) -> bool {
    // The pattern restricts the capture to [01].
    &caps[index] == "1"
}

fn cap_up(caps: &Captures<'_>, index: usize) -> bool {
    &caps[index] == "U"
}

macro_rules! cap_identifier {
    ($fn_name:ident, $ty:ident, $what:literal) => {
        fn $fn_name(caps: &Captures<'_>, index: usize) -> ProtocolResult<$ty> {
            let raw = cap_u8(caps, index, $what)?;
            $ty::new(raw).map_err(|e| malformed(caps, e.to_string()))
        }
    };
}

cap_identifier!(cap_zone, ZoneId, "zone identifier");
cap_identifier!(cap_source, SourceId, "source identifier");
cap_identifier!(cap_group, GroupId, "group identifier");
cap_identifier!(cap_favorite, FavoriteId, "favorite identifier");
cap_identifier!(cap_preset, PresetId, "equalizer preset identifier");
cap_identifier!(cap_band, BandId, "equalizer band identifier");

/// Decodes the tagged wire balance into the continuous model bias.
fn cap_bias(caps: &Captures<'_>, channel: usize, magnitude: usize) -> ProtocolResult<Bias> {
    let mag = cap_u8(caps, magnitude, "balance magnitude")?;
    if mag > BIAS_MAX as u8 {
        return Err(malformed(
            caps,
            format!("balance magnitude {mag} exceeds {BIAS_MAX}"),
        ));
    }
    Ok(match &caps[channel] {
        "L" => -(mag as Bias),
        _ => mag as Bias,
    })
}

fn cap_sound_mode(caps: &Captures<'_>, index: usize) -> ProtocolResult<SoundMode> {
    let raw = cap_u8(caps, index, "sound mode")?;
    SoundMode::from_wire(raw).map_err(|e| malformed(caps, e.to_string()))
}

fn cap_eui48(caps: &Captures<'_>, index: usize) -> ProtocolResult<Eui48> {
    caps[index]
        .parse()
        .map_err(|_| malformed(caps, format!("EUI-48 {:?} failed to parse", &caps[index])))
}

fn cap_ip(caps: &Captures<'_>, index: usize) -> ProtocolResult<IpAddr> {
    caps[index]
        .parse()
        .map_err(|_| malformed(caps, format!("IP address {:?} failed to parse", &caps[index])))
}

/// Decodes the mute operation capture: `M` mutes, `UM` unmutes.
fn cap_mute(caps: &Captures<'_>, index: usize) -> bool {
    &caps[index] == "M"
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch tables
// ─────────────────────────────────────────────────────────────────────────────

type RequestParser = fn(&Captures<'_>) -> ProtocolResult<Request>;
type ReportParser = fn(&Captures<'_>) -> ProtocolResult<Report>;

struct Entry<P> {
    matcher: Matcher,
    parse: P,
}

fn entry<P>(pattern: &str, expected: usize, parse: P) -> Entry<P> {
    Entry {
        matcher: Matcher::new(pattern, expected),
        parse,
    }
}

static REQUEST_TABLE: LazyLock<Vec<Entry<RequestParser>>> = LazyLock::new(|| {
    vec![
        // Zone queries, most specific first.
        entry(&format!("QVMO{ID}"), 2, |c| {
            Ok(Request::ZoneQueryMute(cap_zone(c, 1)?))
        }),
        entry(&format!("QVO{ID}"), 2, |c| {
            Ok(Request::ZoneQueryVolume(cap_zone(c, 1)?))
        }),
        entry(&format!("QCO{ID}"), 2, |c| {
            Ok(Request::ZoneQuerySource(cap_zone(c, 1)?))
        }),
        entry(&format!("QO{ID}"), 2, |c| {
            Ok(Request::ZoneQuery(cap_zone(c, 1)?))
        }),
        // Zone mutations.
        entry(&format!("VMTO{ID}"), 2, |c| {
            Ok(Request::ZoneToggleMute(cap_zone(c, 1)?))
        }),
        entry(&format!("V(U?M)O{ID}"), 3, |c| {
            Ok(Request::ZoneSetMute {
                zone: cap_zone(c, 2)?,
                mute: cap_mute(c, 1),
            })
        }),
        entry(&format!("VO{ID}R{SIGNED}"), 3, |c| {
            Ok(Request::ZoneSetVolume {
                zone: cap_zone(c, 1)?,
                level: cap_i8(c, 2, "volume level")?,
            })
        }),
        entry(&format!("VO{ID}F{BOOL}"), 3, |c| {
            Ok(Request::ZoneSetVolumeFixed {
                zone: cap_zone(c, 1)?,
                fixed: cap_bool(c, 2),
            })
        }),
        entry(&format!("VO{ID}(U|D)"), 3, |c| {
            Ok(Request::ZoneAdjustVolume {
                zone: cap_zone(c, 1)?,
                up: cap_up(c, 2),
            })
        }),
        entry(&format!("VXR{SIGNED}"), 2, |c| {
            Ok(Request::ZoneSetVolumeAll {
                level: cap_i8(c, 1, "volume level")?,
            })
        }),
        entry(&format!("BO{ID}(L|R)U"), 3, |c| {
            Ok(Request::ZoneAdjustBalance {
                zone: cap_zone(c, 1)?,
                left: &c[2] == "L",
            })
        }),
        entry(&format!("BO{ID}(L|R){ID}"), 4, |c| {
            Ok(Request::ZoneSetBalance {
                zone: cap_zone(c, 1)?,
                bias: cap_bias(c, 2, 3)?,
            })
        }),
        entry(&format!("TO{ID}B(U|D)"), 3, |c| {
            Ok(Request::ZoneAdjustBass {
                zone: cap_zone(c, 1)?,
                up: cap_up(c, 2),
            })
        }),
        entry(&format!("TO{ID}T(U|D)"), 3, |c| {
            Ok(Request::ZoneAdjustTreble {
                zone: cap_zone(c, 1)?,
                up: cap_up(c, 2),
            })
        }),
        entry(&format!("TO{ID}B{SIGNED}T{SIGNED}"), 4, |c| {
            Ok(Request::ZoneSetTone {
                zone: cap_zone(c, 1)?,
                bass: cap_i8(c, 2, "bass level")?,
                treble: cap_i8(c, 3, "treble level")?,
            })
        }),
        entry(&format!("SO{ID}([0-5])"), 3, |c| {
            Ok(Request::ZoneSetSoundMode {
                zone: cap_zone(c, 1)?,
                mode: cap_sound_mode(c, 2)?,
            })
        }),
        entry(&format!("EO{ID}B{ID}L{SIGNED}"), 4, |c| {
            Ok(Request::ZoneSetEqualizerBand {
                zone: cap_zone(c, 1)?,
                band: cap_band(c, 2)?,
                level: cap_i8(c, 3, "band level")?,
            })
        }),
        entry(&format!("EO{ID}B{ID}(U|D)"), 4, |c| {
            Ok(Request::ZoneAdjustEqualizerBand {
                zone: cap_zone(c, 1)?,
                band: cap_band(c, 2)?,
                up: cap_up(c, 3),
            })
        }),
        entry(&format!("EO{ID}P{ID}"), 3, |c| {
            Ok(Request::ZoneSetEqualizerPreset {
                zone: cap_zone(c, 1)?,
                preset: cap_preset(c, 2)?,
            })
        }),
        entry(&format!("HO{ID}F{ID}"), 3, |c| {
            Ok(Request::ZoneSetHighpass {
                zone: cap_zone(c, 1)?,
                frequency: cap_u16(c, 2, "crossover frequency")?,
            })
        }),
        entry(&format!("LO{ID}F{ID}"), 3, |c| {
            Ok(Request::ZoneSetLowpass {
                zone: cap_zone(c, 1)?,
                frequency: cap_u16(c, 2, "crossover frequency")?,
            })
        }),
        entry(&format!("NO{ID}{NAME}"), 3, |c| {
            Ok(Request::ZoneSetName {
                zone: cap_zone(c, 1)?,
                name: c[2].to_string(),
            })
        }),
        entry(&format!("CO{ID}I{ID}"), 3, |c| {
            Ok(Request::ZoneSetSource {
                zone: cap_zone(c, 1)?,
                source: cap_source(c, 2)?,
            })
        }),
        entry(&format!("CXI{ID}"), 2, |c| {
            Ok(Request::ZoneSetSourceAll {
                source: cap_source(c, 1)?,
            })
        }),
        // Groups.
        entry(&format!("QG{ID}"), 2, |c| {
            Ok(Request::GroupQuery(cap_group(c, 1)?))
        }),
        entry(&format!("VMTG{ID}"), 2, |c| {
            Ok(Request::GroupToggleMute(cap_group(c, 1)?))
        }),
        entry(&format!("V(U?M)G{ID}"), 3, |c| {
            Ok(Request::GroupSetMute {
                group: cap_group(c, 2)?,
                mute: cap_mute(c, 1),
            })
        }),
        entry(&format!("VG{ID}R{SIGNED}"), 3, |c| {
            Ok(Request::GroupSetVolume {
                group: cap_group(c, 1)?,
                level: cap_i8(c, 2, "volume level")?,
            })
        }),
        entry(&format!("VG{ID}(U|D)"), 3, |c| {
            Ok(Request::GroupAdjustVolume {
                group: cap_group(c, 1)?,
                up: cap_up(c, 2),
            })
        }),
        // The mixed token is read-only; an input carrying it matches here
        // and is rejected as malformed rather than unknown.
        entry(&format!("CG{ID}I(X|[[:digit:]]+)"), 3, |c| {
            if &c[2] == "X" {
                return Err(malformed(
                    c,
                    "the mixed source token is not valid as an input",
                ));
            }
            Ok(Request::GroupSetSource {
                group: cap_group(c, 1)?,
                source: cap_source(c, 2)?,
            })
        }),
        entry(&format!("NG{ID}{NAME}"), 3, |c| {
            Ok(Request::GroupSetName {
                group: cap_group(c, 1)?,
                name: c[2].to_string(),
            })
        }),
        entry(&format!("AG{ID}O{ID}"), 3, |c| {
            Ok(Request::GroupAddZone {
                group: cap_group(c, 1)?,
                zone: cap_zone(c, 2)?,
            })
        }),
        entry(&format!("RG{ID}O{ID}"), 3, |c| {
            Ok(Request::GroupRemoveZone {
                group: cap_group(c, 1)?,
                zone: cap_zone(c, 2)?,
            })
        }),
        // Sources.
        entry(&format!("QI{ID}"), 2, |c| {
            Ok(Request::SourceQuery(cap_source(c, 1)?))
        }),
        entry(&format!("NI{ID}{NAME}"), 3, |c| {
            Ok(Request::SourceSetName {
                source: cap_source(c, 1)?,
                name: c[2].to_string(),
            })
        }),
        // Favorites.
        entry(&format!("QF{ID}"), 2, |c| {
            Ok(Request::FavoriteQuery(cap_favorite(c, 1)?))
        }),
        entry(&format!("NF{ID}{NAME}"), 3, |c| {
            Ok(Request::FavoriteSetName {
                favorite: cap_favorite(c, 1)?,
                name: c[2].to_string(),
            })
        }),
        // Equalizer presets.
        entry(&format!("QEP{ID}"), 2, |c| {
            Ok(Request::PresetQuery(cap_preset(c, 1)?))
        }),
        entry(&format!("NEP{ID}{NAME}"), 3, |c| {
            Ok(Request::PresetSetName {
                preset: cap_preset(c, 1)?,
                name: c[2].to_string(),
            })
        }),
        entry(&format!("EP{ID}B{ID}L{SIGNED}"), 4, |c| {
            Ok(Request::PresetSetBand {
                preset: cap_preset(c, 1)?,
                band: cap_band(c, 2)?,
                level: cap_i8(c, 3, "band level")?,
            })
        }),
        entry(&format!("EP{ID}B{ID}(U|D)"), 4, |c| {
            Ok(Request::PresetAdjustBand {
                preset: cap_preset(c, 1)?,
                band: cap_band(c, 2)?,
                up: cap_up(c, 3),
            })
        }),
        // Front panel.
        entry("QFPL", 1, |_| Ok(Request::FrontPanelQueryLocked)),
        entry("FPB([0-3])", 2, |c| {
            Ok(Request::FrontPanelSetBrightness(cap_u8(
                c,
                1,
                "brightness",
            )?))
        }),
        entry(&format!("FPL{BOOL}"), 2, |c| {
            Ok(Request::FrontPanelSetLocked(cap_bool(c, 1)))
        }),
        // Network.
        entry("QE", 1, |_| Ok(Request::NetworkQuery)),
        // Configuration.
        entry("QX", 1, |_| Ok(Request::ConfigurationQuery)),
        entry("LOAD", 1, |_| Ok(Request::ConfigurationLoad)),
        entry("SAVE", 1, |_| Ok(Request::ConfigurationSave)),
        entry("RESET", 1, |_| Ok(Request::ConfigurationReset)),
    ]
});

static REPORT_TABLE: LazyLock<Vec<Entry<ReportParser>>> = LazyLock::new(|| {
    vec![
        // Zone reports.
        entry(&format!("NO{ID}{NAME}"), 3, |c| {
            Ok(Report::ZoneName {
                zone: cap_zone(c, 1)?,
                name: c[2].to_string(),
            })
        }),
        entry(&format!("CO{ID}I{ID}"), 3, |c| {
            Ok(Report::ZoneSource {
                zone: cap_zone(c, 1)?,
                source: cap_source(c, 2)?,
            })
        }),
        entry(&format!("VO{ID}R{SIGNED}"), 3, |c| {
            Ok(Report::ZoneVolume {
                zone: cap_zone(c, 1)?,
                level: cap_i8(c, 2, "volume level")?,
            })
        }),
        entry(&format!("VO{ID}F{BOOL}"), 3, |c| {
            Ok(Report::ZoneVolumeFixed {
                zone: cap_zone(c, 1)?,
                fixed: cap_bool(c, 2),
            })
        }),
        entry(&format!("V(U?M)O{ID}"), 3, |c| {
            Ok(Report::ZoneMute {
                zone: cap_zone(c, 2)?,
                mute: cap_mute(c, 1),
            })
        }),
        entry(&format!("BO{ID}(L|R){ID}"), 4, |c| {
            Ok(Report::ZoneBalance {
                zone: cap_zone(c, 1)?,
                bias: cap_bias(c, 2, 3)?,
            })
        }),
        entry(&format!("TO{ID}B{SIGNED}T{SIGNED}"), 4, |c| {
            Ok(Report::ZoneTone {
                zone: cap_zone(c, 1)?,
                bass: cap_i8(c, 2, "bass level")?,
                treble: cap_i8(c, 3, "treble level")?,
            })
        }),
        entry(&format!("SO{ID}([0-5])"), 3, |c| {
            Ok(Report::ZoneSoundMode {
                zone: cap_zone(c, 1)?,
                mode: cap_sound_mode(c, 2)?,
            })
        }),
        entry(&format!("EO{ID}B{ID}L{SIGNED}"), 4, |c| {
            Ok(Report::ZoneEqualizerBand {
                zone: cap_zone(c, 1)?,
                band: cap_band(c, 2)?,
                level: cap_i8(c, 3, "band level")?,
            })
        }),
        entry(&format!("EO{ID}P{ID}"), 3, |c| {
            Ok(Report::ZoneEqualizerPreset {
                zone: cap_zone(c, 1)?,
                preset: cap_preset(c, 2)?,
            })
        }),
        entry(&format!("HO{ID}F{ID}"), 3, |c| {
            Ok(Report::ZoneHighpass {
                zone: cap_zone(c, 1)?,
                frequency: cap_u16(c, 2, "crossover frequency")?,
            })
        }),
        entry(&format!("LO{ID}F{ID}"), 3, |c| {
            Ok(Report::ZoneLowpass {
                zone: cap_zone(c, 1)?,
                frequency: cap_u16(c, 2, "crossover frequency")?,
            })
        }),
        entry(&format!("QO{ID}"), 2, |c| {
            Ok(Report::ZoneQueryDone(cap_zone(c, 1)?))
        }),
        // Group reports.
        entry(&format!("NG{ID}{NAME}"), 3, |c| {
            Ok(Report::GroupName {
                group: cap_group(c, 1)?,
                name: c[2].to_string(),
            })
        }),
        entry(&format!("CG{ID}I(X|[[:digit:]]+)"), 3, |c| {
            let source = if &c[2] == "X" {
                GroupSource::Mixed
            } else {
                GroupSource::Single(cap_source(c, 2)?)
            };
            Ok(Report::GroupSource {
                group: cap_group(c, 1)?,
                source,
            })
        }),
        entry(&format!("VG{ID}R{SIGNED}"), 3, |c| {
            Ok(Report::GroupVolume {
                group: cap_group(c, 1)?,
                level: cap_i8(c, 2, "volume level")?,
            })
        }),
        entry(&format!("V(U?M)G{ID}"), 3, |c| {
            Ok(Report::GroupMute {
                group: cap_group(c, 2)?,
                mute: cap_mute(c, 1),
            })
        }),
        entry(&format!("AG{ID}O{ID}"), 3, |c| {
            Ok(Report::GroupZoneAdded {
                group: cap_group(c, 1)?,
                zone: cap_zone(c, 2)?,
            })
        }),
        entry(&format!("RG{ID}O{ID}"), 3, |c| {
            Ok(Report::GroupZoneRemoved {
                group: cap_group(c, 1)?,
                zone: cap_zone(c, 2)?,
            })
        }),
        entry(&format!("QG{ID}"), 2, |c| {
            Ok(Report::GroupQueryDone(cap_group(c, 1)?))
        }),
        // Source reports.
        entry(&format!("NI{ID}{NAME}"), 3, |c| {
            Ok(Report::SourceName {
                source: cap_source(c, 1)?,
                name: c[2].to_string(),
            })
        }),
        entry(&format!("QI{ID}"), 2, |c| {
            Ok(Report::SourceQueryDone(cap_source(c, 1)?))
        }),
        // Favorite reports.
        entry(&format!("NF{ID}{NAME}"), 3, |c| {
            Ok(Report::FavoriteName {
                favorite: cap_favorite(c, 1)?,
                name: c[2].to_string(),
            })
        }),
        entry(&format!("QF{ID}"), 2, |c| {
            Ok(Report::FavoriteQueryDone(cap_favorite(c, 1)?))
        }),
        // Equalizer preset reports.
        entry(&format!("NEP{ID}{NAME}"), 3, |c| {
            Ok(Report::PresetName {
                preset: cap_preset(c, 1)?,
                name: c[2].to_string(),
            })
        }),
        entry(&format!("EP{ID}B{ID}L{SIGNED}"), 4, |c| {
            Ok(Report::PresetBand {
                preset: cap_preset(c, 1)?,
                band: cap_band(c, 2)?,
                level: cap_i8(c, 3, "band level")?,
            })
        }),
        entry(&format!("QEP{ID}"), 2, |c| {
            Ok(Report::PresetQueryDone(cap_preset(c, 1)?))
        }),
        // Front panel reports. The documented query form normalizes to the
        // actual form on parse.
        entry(&format!("FPL{BOOL}QFPL"), 2, |c| {
            Ok(Report::FrontPanelLocked(cap_bool(c, 1)))
        }),
        entry(&format!("FPL{BOOL}"), 2, |c| {
            Ok(Report::FrontPanelLocked(cap_bool(c, 1)))
        }),
        entry("FPB([0-3])", 2, |c| {
            Ok(Report::FrontPanelBrightness(cap_u8(c, 1, "brightness")?))
        }),
        // Network reports.
        entry(&format!("DHCP{BOOL}"), 2, |c| {
            Ok(Report::NetworkDhcp(cap_bool(c, 1)))
        }),
        entry(&format!("SDDP{BOOL}"), 2, |c| {
            Ok(Report::NetworkSddp(cap_bool(c, 1)))
        }),
        entry(&format!("MAC{EUI48}"), 2, |c| {
            Ok(Report::NetworkMac(cap_eui48(c, 1)?))
        }),
        entry(&format!("IP{}", ip_address()), 2, |c| {
            Ok(Report::NetworkHostAddress(cap_ip(c, 1)?))
        }),
        entry(&format!("NM{}", ip_address()), 2, |c| {
            Ok(Report::NetworkNetmask(cap_ip(c, 1)?))
        }),
        entry(&format!("GW{}", ip_address()), 2, |c| {
            Ok(Report::NetworkRouter(cap_ip(c, 1)?))
        }),
        entry("QE", 1, |_| Ok(Report::NetworkQueryDone)),
        // Configuration singletons.
        entry("QX", 1, |_| Ok(Report::ConfigurationQueryDone)),
        entry("SAVING\\.\\.\\.", 1, |_| Ok(Report::Saving)),
        entry("LOAD", 1, |_| Ok(Report::LoadComplete)),
        entry("RESET", 1, |_| Ok(Report::ResetComplete)),
        entry("ERROR", 1, |_| Ok(Report::Error)),
    ]
});

/// Formats a report back into its frame payload.
///
/// Exact inverse of [`parse_report`] up to the codec's normalizations
/// (balance emits the channel the sign selects, the front-panel query
/// bug emits the actual hardware form). The proxy uses this to relay
/// upstream traffic downstream byte-for-byte.
#[must_use]
pub fn format_report(report: &Report) -> String {
    use crate::protocol::format;

    match report {
        Report::ZoneName { zone, name } => format::zone::name(*zone, name),
        Report::ZoneSource { zone, source } => format::zone::source(*zone, *source),
        Report::ZoneVolume { zone, level } => format::zone::volume(*zone, *level),
        Report::ZoneVolumeFixed { zone, fixed } => format::zone::volume_fixed(*zone, *fixed),
        Report::ZoneMute { zone, mute } => format::zone::mute(*zone, *mute),
        Report::ZoneBalance { zone, bias } => format::zone::balance(*zone, *bias),
        Report::ZoneTone { zone, bass, treble } => format::zone::tone(*zone, *bass, *treble),
        Report::ZoneSoundMode { zone, mode } => format::zone::sound_mode(*zone, *mode),
        Report::ZoneEqualizerBand { zone, band, level } => {
            format::zone::equalizer_band(*zone, *band, *level)
        }
        Report::ZoneEqualizerPreset { zone, preset } => {
            format::zone::equalizer_preset(*zone, *preset)
        }
        Report::ZoneHighpass { zone, frequency } => format::zone::highpass(*zone, *frequency),
        Report::ZoneLowpass { zone, frequency } => format::zone::lowpass(*zone, *frequency),
        Report::ZoneQueryDone(zone) => format::zone::query(*zone),

        Report::GroupName { group, name } => format::group::name(*group, name),
        Report::GroupSource { group, source } => format::group::source(*group, *source),
        Report::GroupVolume { group, level } => format::group::volume(*group, *level),
        Report::GroupMute { group, mute } => format::group::mute(*group, *mute),
        Report::GroupZoneAdded { group, zone } => format::group::add_zone(*group, *zone),
        Report::GroupZoneRemoved { group, zone } => format::group::remove_zone(*group, *zone),
        Report::GroupQueryDone(group) => format::group::query(*group),

        Report::SourceName { source, name } => format::source::name(*source, name),
        Report::SourceQueryDone(source) => format::source::query(*source),
        Report::FavoriteName { favorite, name } => format::favorite::name(*favorite, name),
        Report::FavoriteQueryDone(favorite) => format::favorite::query(*favorite),
        Report::PresetName { preset, name } => format::preset::name(*preset, name),
        Report::PresetBand {
            preset,
            band,
            level,
        } => format::preset::band(*preset, *band, *level),
        Report::PresetQueryDone(preset) => format::preset::query(*preset),

        Report::FrontPanelBrightness(brightness) => format::front_panel::brightness(*brightness),
        Report::FrontPanelLocked(locked) => format::front_panel::locked(*locked),

        Report::NetworkDhcp(enabled) => format::network::dhcp(*enabled),
        Report::NetworkSddp(enabled) => format::network::sddp(*enabled),
        Report::NetworkMac(address) => format::network::mac(*address),
        Report::NetworkHostAddress(address) => format::network::host(*address),
        Report::NetworkNetmask(address) => format::network::netmask(*address),
        Report::NetworkRouter(address) => format::network::router(*address),
        Report::NetworkQueryDone => format::network::query(),

        Report::ConfigurationQueryDone => format::configuration::query_current(),
        Report::Saving => format::configuration::saving(),
        Report::LoadComplete => format::configuration::load(),
        Report::ResetComplete => format::configuration::reset(),
        Report::Error => format::ERROR.to_string(),
    }
}

/// Classifies a frame arriving at the server side.
pub fn parse_request(frame: &str) -> ProtocolResult<Request> {
    for entry in REQUEST_TABLE.iter() {
        if let Some(caps) = entry.matcher.captures(frame) {
            return (entry.parse)(&caps);
        }
    }
    Err(ProtocolError::UnknownCommand(frame.to_string()))
}

/// Classifies a frame arriving at the client side.
pub fn parse_report(frame: &str) -> ProtocolResult<Report> {
    for entry in REPORT_TABLE.iter() {
        if let Some(caps) = entry.matcher.captures(frame) {
            return (entry.parse)(&caps);
        }
    }
    Err(ProtocolError::UnknownCommand(frame.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::format;

    fn z(n: u8) -> ZoneId {
        ZoneId::new(n).unwrap()
    }

    fn g(n: u8) -> GroupId {
        GroupId::new(n).unwrap()
    }

    #[test]
    fn volume_set_round_trips() {
        let frame = format::zone::volume(z(3), -30);
        assert_eq!(
            parse_request(&frame).unwrap(),
            Request::ZoneSetVolume {
                zone: z(3),
                level: -30
            }
        );
        assert_eq!(
            parse_report(&frame).unwrap(),
            Report::ZoneVolume {
                zone: z(3),
                level: -30
            }
        );
    }

    #[test]
    fn every_zone_mutation_parses_back() {
        let band = BandId::new(5).unwrap();
        let preset = PresetId::new(2).unwrap();
        let source = SourceId::new(4).unwrap();
        let cases: Vec<(String, Request)> = vec![
            (
                format::zone::name(z(1), "Kitchen"),
                Request::ZoneSetName {
                    zone: z(1),
                    name: "Kitchen".into(),
                },
            ),
            (
                format::zone::source(z(1), source),
                Request::ZoneSetSource {
                    zone: z(1),
                    source,
                },
            ),
            (
                format::zone::source_all(source),
                Request::ZoneSetSourceAll { source },
            ),
            (
                format::zone::volume_all(-12),
                Request::ZoneSetVolumeAll { level: -12 },
            ),
            (
                format::zone::volume_up(z(9)),
                Request::ZoneAdjustVolume { zone: z(9), up: true },
            ),
            (
                format::zone::volume_down(z(9)),
                Request::ZoneAdjustVolume {
                    zone: z(9),
                    up: false,
                },
            ),
            (
                format::zone::volume_fixed(z(2), true),
                Request::ZoneSetVolumeFixed {
                    zone: z(2),
                    fixed: true,
                },
            ),
            (
                format::zone::mute(z(7), true),
                Request::ZoneSetMute {
                    zone: z(7),
                    mute: true,
                },
            ),
            (
                format::zone::mute(z(7), false),
                Request::ZoneSetMute {
                    zone: z(7),
                    mute: false,
                },
            ),
            (
                format::zone::toggle_mute(z(7)),
                Request::ZoneToggleMute(z(7)),
            ),
            (
                format::zone::balance(z(4), -20),
                Request::ZoneSetBalance {
                    zone: z(4),
                    bias: -20,
                },
            ),
            (
                format::zone::balance_left(z(4)),
                Request::ZoneAdjustBalance {
                    zone: z(4),
                    left: true,
                },
            ),
            (
                format::zone::tone(z(5), -4, 7),
                Request::ZoneSetTone {
                    zone: z(5),
                    bass: -4,
                    treble: 7,
                },
            ),
            (
                format::zone::bass_adjust(z(5), true),
                Request::ZoneAdjustBass { zone: z(5), up: true },
            ),
            (
                format::zone::treble_adjust(z(5), false),
                Request::ZoneAdjustTreble {
                    zone: z(5),
                    up: false,
                },
            ),
            (
                format::zone::sound_mode(z(6), SoundMode::Highpass),
                Request::ZoneSetSoundMode {
                    zone: z(6),
                    mode: SoundMode::Highpass,
                },
            ),
            (
                format::zone::equalizer_band(z(3), band, -4),
                Request::ZoneSetEqualizerBand {
                    zone: z(3),
                    band,
                    level: -4,
                },
            ),
            (
                format::zone::equalizer_band_adjust(z(3), band, true),
                Request::ZoneAdjustEqualizerBand {
                    zone: z(3),
                    band,
                    up: true,
                },
            ),
            (
                format::zone::equalizer_preset(z(3), preset),
                Request::ZoneSetEqualizerPreset {
                    zone: z(3),
                    preset,
                },
            ),
            (
                format::zone::highpass(z(3), 250),
                Request::ZoneSetHighpass {
                    zone: z(3),
                    frequency: 250,
                },
            ),
            (
                format::zone::lowpass(z(3), 120),
                Request::ZoneSetLowpass {
                    zone: z(3),
                    frequency: 120,
                },
            ),
        ];
        for (frame, expected) in cases {
            assert_eq!(parse_request(&frame).unwrap(), expected, "frame {frame:?}");
        }
    }

    #[test]
    fn group_requests_parse_back() {
        let zone = z(3);
        let cases: Vec<(String, Request)> = vec![
            (format::group::query(g(1)), Request::GroupQuery(g(1))),
            (
                format::group::volume(g(1), -30),
                Request::GroupSetVolume {
                    group: g(1),
                    level: -30,
                },
            ),
            (
                format::group::mute(g(1), true),
                Request::GroupSetMute {
                    group: g(1),
                    mute: true,
                },
            ),
            (
                format::group::toggle_mute(g(1)),
                Request::GroupToggleMute(g(1)),
            ),
            (
                format::group::add_zone(g(1), zone),
                Request::GroupAddZone {
                    group: g(1),
                    zone,
                },
            ),
            (
                format::group::remove_zone(g(1), zone),
                Request::GroupRemoveZone {
                    group: g(1),
                    zone,
                },
            ),
        ];
        for (frame, expected) in cases {
            assert_eq!(parse_request(&frame).unwrap(), expected, "frame {frame:?}");
        }
    }

    #[test]
    fn mixed_source_is_reported_but_rejected_as_input() {
        assert_eq!(
            parse_report("CG1IX").unwrap(),
            Report::GroupSource {
                group: g(1),
                source: GroupSource::Mixed,
            }
        );
        assert!(matches!(
            parse_request("CG1IX"),
            Err(ProtocolError::Malformed { .. })
        ));
    }

    #[test]
    fn balance_wire_forms_decode_to_continuous_bias() {
        assert_eq!(
            parse_report("BO1L37").unwrap(),
            Report::ZoneBalance { zone: z(1), bias: -37 }
        );
        assert_eq!(
            parse_report("BO1R0").unwrap(),
            Report::ZoneBalance { zone: z(1), bias: 0 }
        );
        assert_eq!(
            parse_report("BO1L0").unwrap(),
            Report::ZoneBalance { zone: z(1), bias: 0 }
        );
        assert!(matches!(
            parse_report("BO1L81"),
            Err(ProtocolError::Malformed { .. })
        ));
    }

    #[test]
    fn unknown_frames_are_flagged() {
        assert_eq!(
            parse_request("ZZTOP"),
            Err(ProtocolError::UnknownCommand("ZZTOP".to_string()))
        );
        assert_eq!(
            parse_report(""),
            Err(ProtocolError::UnknownCommand(String::new()))
        );
    }

    #[test]
    fn zero_identifiers_are_malformed_not_unknown() {
        assert!(matches!(
            parse_request("QO0"),
            Err(ProtocolError::Malformed { .. })
        ));
        assert!(matches!(
            parse_report("VO0R-10"),
            Err(ProtocolError::Malformed { .. })
        ));
    }

    #[test]
    fn query_echoes_classify_as_done_reports() {
        assert_eq!(parse_report("QO3").unwrap(), Report::ZoneQueryDone(z(3)));
        assert_eq!(parse_report("QG1").unwrap(), Report::GroupQueryDone(g(1)));
        assert_eq!(parse_report("QE").unwrap(), Report::NetworkQueryDone);
        assert_eq!(parse_report("QX").unwrap(), Report::ConfigurationQueryDone);
    }

    #[test]
    fn front_panel_bug_forms_normalize() {
        assert_eq!(
            parse_report("FPL1").unwrap(),
            Report::FrontPanelLocked(true)
        );
        assert_eq!(
            parse_report("FPL1QFPL").unwrap(),
            Report::FrontPanelLocked(true)
        );
    }

    #[test]
    fn network_reports_parse() {
        assert_eq!(parse_report("DHCP1").unwrap(), Report::NetworkDhcp(true));
        assert_eq!(parse_report("SDDP0").unwrap(), Report::NetworkSddp(false));
        assert_eq!(
            parse_report("MAC70-B3-D5-07-0A-1F").unwrap(),
            Report::NetworkMac(Eui48::new([0x70, 0xB3, 0xD5, 0x07, 0x0A, 0x1F]))
        );
        assert_eq!(
            parse_report("IP192.168.1.48").unwrap(),
            Report::NetworkHostAddress("192.168.1.48".parse().unwrap())
        );
        assert_eq!(
            parse_report("GWfe80::1").unwrap(),
            Report::NetworkRouter("fe80::1".parse().unwrap())
        );
        assert_eq!(
            parse_report("NM255.255.255.0").unwrap(),
            Report::NetworkNetmask("255.255.255.0".parse().unwrap())
        );
    }

    #[test]
    fn format_report_inverts_parse_report() {
        let frames = [
            "NO1\"Kitchen\"",
            "CO3I4",
            "VO3R-25",
            "VO3F1",
            "VMO1",
            "VUMO2",
            "BO4L20",
            "TO2B-4T7",
            "SO15",
            "EO3B5L-4",
            "EO3P2",
            "HO3F250",
            "LO3F120",
            "QO3",
            "NG1\"Downstairs\"",
            "CG1IX",
            "CG1I4",
            "VG1R-30",
            "VMG1",
            "AG1O2",
            "RG1O2",
            "QG1",
            "NI1\"Tuner\"",
            "QI1",
            "NF9\"Jazz\"",
            "QF9",
            "NEP3\"Rock\"",
            "EP3B2L6",
            "QEP3",
            "FPB2",
            "FPL1",
            "DHCP1",
            "SDDP0",
            "MAC70-B3-D5-07-0A-1F",
            "IP192.168.1.48",
            "NM255.255.255.0",
            "GW192.168.1.1",
            "QE",
            "QX",
            "SAVING...",
            "LOAD",
            "RESET",
            "ERROR",
        ];
        for frame in frames {
            let report = parse_report(frame).unwrap();
            assert_eq!(format_report(&report), frame, "frame {frame:?}");
            // And the composed round trip is stable.
            assert_eq!(parse_report(&format_report(&report)).unwrap(), report);
        }
    }

    #[test]
    fn singleton_reports_parse() {
        assert_eq!(parse_report("SAVING...").unwrap(), Report::Saving);
        assert_eq!(parse_report("LOAD").unwrap(), Report::LoadComplete);
        assert_eq!(parse_report("RESET").unwrap(), Report::ResetComplete);
        assert_eq!(parse_report("ERROR").unwrap(), Report::Error);
    }

    #[test]
    fn formatted_reports_parse_back_for_every_report_family() {
        let band = BandId::new(2).unwrap();
        let preset = PresetId::new(3).unwrap();
        let cases: Vec<(String, Report)> = vec![
            (
                format::zone::name(z(1), "Den"),
                Report::ZoneName {
                    zone: z(1),
                    name: "Den".into(),
                },
            ),
            (
                format::zone::volume_fixed(z(1), false),
                Report::ZoneVolumeFixed {
                    zone: z(1),
                    fixed: false,
                },
            ),
            (
                format::zone::tone(z(1), 0, 0),
                Report::ZoneTone {
                    zone: z(1),
                    bass: 0,
                    treble: 0,
                },
            ),
            (
                format::zone::sound_mode(z(1), SoundMode::Disabled),
                Report::ZoneSoundMode {
                    zone: z(1),
                    mode: SoundMode::Disabled,
                },
            ),
            (
                format::zone::equalizer_preset(z(1), preset),
                Report::ZoneEqualizerPreset {
                    zone: z(1),
                    preset,
                },
            ),
            (
                format::zone::highpass(z(1), 100),
                Report::ZoneHighpass {
                    zone: z(1),
                    frequency: 100,
                },
            ),
            (
                format::zone::lowpass(z(1), 5000),
                Report::ZoneLowpass {
                    zone: z(1),
                    frequency: 5000,
                },
            ),
            (
                format::group::name(g(2), "Upstairs"),
                Report::GroupName {
                    group: g(2),
                    name: "Upstairs".into(),
                },
            ),
            (
                format::group::volume(g(2), -18),
                Report::GroupVolume {
                    group: g(2),
                    level: -18,
                },
            ),
            (
                format::group::mute(g(2), false),
                Report::GroupMute {
                    group: g(2),
                    mute: false,
                },
            ),
            (
                format::group::add_zone(g(2), z(4)),
                Report::GroupZoneAdded {
                    group: g(2),
                    zone: z(4),
                },
            ),
            (
                format::group::remove_zone(g(2), z(4)),
                Report::GroupZoneRemoved {
                    group: g(2),
                    zone: z(4),
                },
            ),
            (
                format::source::name(SourceId::new(1).unwrap(), "Tuner"),
                Report::SourceName {
                    source: SourceId::new(1).unwrap(),
                    name: "Tuner".into(),
                },
            ),
            (
                format::favorite::name(FavoriteId::new(9).unwrap(), "Jazz"),
                Report::FavoriteName {
                    favorite: FavoriteId::new(9).unwrap(),
                    name: "Jazz".into(),
                },
            ),
            (
                format::preset::name(preset, "Loud"),
                Report::PresetName {
                    preset,
                    name: "Loud".into(),
                },
            ),
            (
                format::preset::band(preset, band, 6),
                Report::PresetBand {
                    preset,
                    band,
                    level: 6,
                },
            ),
            (
                format::front_panel::brightness(2),
                Report::FrontPanelBrightness(2),
            ),
        ];
        for (frame, expected) in cases {
            assert_eq!(parse_report(&frame).unwrap(), expected, "frame {frame:?}");
        }
    }
}
