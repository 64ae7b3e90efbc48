//! Wire-frame formatting.
//!
//! Pure functions producing the exact payload bytes for every operation the
//! protocol knows, grouped by object class. Payloads are returned without
//! the enclosing brackets; the connection layer adds those on write.
//!
//! Byte-exactness rules: ASCII decimal identifiers with no leading zeros,
//! a leading `-` for negatives and no sign otherwise, no whitespace, no
//! fractions.

use std::net::IpAddr;

use crate::model::balance::Bias;
use crate::model::crossover::Frequency;
use crate::model::equalizer::BandLevel;
use crate::model::front_panel::Brightness;
use crate::model::group::GroupSource;
use crate::model::ids::{BandId, FavoriteId, GroupId, PresetId, SourceId, ZoneId};
use crate::model::network::Eui48;
use crate::model::sound::SoundMode;
use crate::model::tone::ToneLevel;
use crate::model::volume::Level;

/// The reply to any frame matching no request pattern.
pub const ERROR: &str = "ERROR";

/// Encodes a continuous balance bias into the tagged wire form.
///
/// Negative bias emits the `L` channel, non-negative the `R` channel, so a
/// centered balance goes out as `R0` (`L0` decodes identically).
#[must_use]
pub fn encode_balance(bias: Bias) -> (char, u8) {
    if bias < 0 {
        ('L', bias.unsigned_abs())
    } else {
        ('R', bias as u8)
    }
}

fn quoted(name: &str) -> String {
    format!("\"{name}\"")
}

fn onoff(flag: bool) -> char {
    if flag {
        '1'
    } else {
        '0'
    }
}

/// Zone commands and reports (object `O`).
pub mod zone {
    use super::*;

    /// `QO<z>` - query every zone property.
    #[must_use]
    pub fn query(zone: ZoneId) -> String {
        format!("QO{zone}")
    }

    /// `QVO<z>` - query the volume level only.
    #[must_use]
    pub fn query_volume(zone: ZoneId) -> String {
        format!("QVO{zone}")
    }

    /// `QVMO<z>` - query the mute state only.
    #[must_use]
    pub fn query_mute(zone: ZoneId) -> String {
        format!("QVMO{zone}")
    }

    /// `QCO<z>` - query the selected source only.
    #[must_use]
    pub fn query_source(zone: ZoneId) -> String {
        format!("QCO{zone}")
    }

    /// `NO<z>"name"` - set or report the zone name.
    #[must_use]
    pub fn name(zone: ZoneId, name: &str) -> String {
        format!("NO{zone}{}", quoted(name))
    }

    /// `CO<z>I<s>` - set or report the selected source.
    #[must_use]
    pub fn source(zone: ZoneId, source: SourceId) -> String {
        format!("CO{zone}I{source}")
    }

    /// `CXI<s>` - set every zone's source at once.
    #[must_use]
    pub fn source_all(source: SourceId) -> String {
        format!("CXI{source}")
    }

    /// `VO<z>R<level>` - set or report the volume level.
    #[must_use]
    pub fn volume(zone: ZoneId, level: Level) -> String {
        format!("VO{zone}R{level}")
    }

    /// `VXR<level>` - set every zone's volume at once.
    #[must_use]
    pub fn volume_all(level: Level) -> String {
        format!("VXR{level}")
    }

    /// `VO<z>U` - step the volume up.
    #[must_use]
    pub fn volume_up(zone: ZoneId) -> String {
        format!("VO{zone}U")
    }

    /// `VO<z>D` - step the volume down.
    #[must_use]
    pub fn volume_down(zone: ZoneId) -> String {
        format!("VO{zone}D")
    }

    /// `VO<z>F<0|1>` - set or report the volume fixed/locked flag.
    #[must_use]
    pub fn volume_fixed(zone: ZoneId, fixed: bool) -> String {
        format!("VO{zone}F{}", onoff(fixed))
    }

    /// `VMO<z>` / `VUMO<z>` - set or report mute.
    #[must_use]
    pub fn mute(zone: ZoneId, mute: bool) -> String {
        if mute {
            format!("VMO{zone}")
        } else {
            format!("VUMO{zone}")
        }
    }

    /// `VMTO<z>` - toggle mute.
    #[must_use]
    pub fn toggle_mute(zone: ZoneId) -> String {
        format!("VMTO{zone}")
    }

    /// `BO<z><L|R><mag>` - set or report balance, tagged wire form.
    #[must_use]
    pub fn balance(zone: ZoneId, bias: Bias) -> String {
        let (channel, magnitude) = encode_balance(bias);
        format!("BO{zone}{channel}{magnitude}")
    }

    /// `BO<z>LU` - step the balance toward the left channel.
    #[must_use]
    pub fn balance_left(zone: ZoneId) -> String {
        format!("BO{zone}LU")
    }

    /// `BO<z>RU` - step the balance toward the right channel.
    #[must_use]
    pub fn balance_right(zone: ZoneId) -> String {
        format!("BO{zone}RU")
    }

    /// `TO<z>B<bass>T<treble>` - set or report both tone knobs.
    #[must_use]
    pub fn tone(zone: ZoneId, bass: ToneLevel, treble: ToneLevel) -> String {
        format!("TO{zone}B{bass}T{treble}")
    }

    /// `TO<z>BU` / `TO<z>BD` - step bass.
    #[must_use]
    pub fn bass_adjust(zone: ZoneId, up: bool) -> String {
        format!("TO{zone}B{}", if up { 'U' } else { 'D' })
    }

    /// `TO<z>TU` / `TO<z>TD` - step treble.
    #[must_use]
    pub fn treble_adjust(zone: ZoneId, up: bool) -> String {
        format!("TO{zone}T{}", if up { 'U' } else { 'D' })
    }

    /// `SO<z><mode>` - set or report the sound mode.
    #[must_use]
    pub fn sound_mode(zone: ZoneId, mode: SoundMode) -> String {
        format!("SO{zone}{}", mode.to_wire())
    }

    /// `EO<z>B<band>L<level>` - set or report one zone equalizer band.
    #[must_use]
    pub fn equalizer_band(zone: ZoneId, band: BandId, level: BandLevel) -> String {
        format!("EO{zone}B{band}L{level}")
    }

    /// `EO<z>B<band>U` / `…D` - step one zone equalizer band.
    #[must_use]
    pub fn equalizer_band_adjust(zone: ZoneId, band: BandId, up: bool) -> String {
        format!("EO{zone}B{band}{}", if up { 'U' } else { 'D' })
    }

    /// `EO<z>P<p>` - select or report the preset equalizer.
    #[must_use]
    pub fn equalizer_preset(zone: ZoneId, preset: PresetId) -> String {
        format!("EO{zone}P{preset}")
    }

    /// `HO<z>F<freq>` - set or report the highpass crossover frequency.
    #[must_use]
    pub fn highpass(zone: ZoneId, frequency: Frequency) -> String {
        format!("HO{zone}F{frequency}")
    }

    /// `LO<z>F<freq>` - set or report the lowpass crossover frequency.
    #[must_use]
    pub fn lowpass(zone: ZoneId, frequency: Frequency) -> String {
        format!("LO{zone}F{frequency}")
    }
}

/// Group commands and reports (object `G`).
pub mod group {
    use super::*;

    /// `QG<g>` - query the group.
    #[must_use]
    pub fn query(group: GroupId) -> String {
        format!("QG{group}")
    }

    /// `NG<g>"name"` - set or report the group name.
    #[must_use]
    pub fn name(group: GroupId, name: &str) -> String {
        format!("NG{group}{}", quoted(name))
    }

    /// `CG<g>I<s>` / `CG<g>IX` - set or report the group source.
    ///
    /// The `X` form reports a mixed-source group; it is never emitted as a
    /// request.
    #[must_use]
    pub fn source(group: GroupId, source: GroupSource) -> String {
        match source {
            GroupSource::Single(s) => format!("CG{group}I{s}"),
            GroupSource::Mixed => format!("CG{group}IX"),
        }
    }

    /// `VG<g>R<level>` - set or report the group volume.
    #[must_use]
    pub fn volume(group: GroupId, level: Level) -> String {
        format!("VG{group}R{level}")
    }

    /// `VG<g>U` - step the group volume up.
    #[must_use]
    pub fn volume_up(group: GroupId) -> String {
        format!("VG{group}U")
    }

    /// `VG<g>D` - step the group volume down.
    #[must_use]
    pub fn volume_down(group: GroupId) -> String {
        format!("VG{group}D")
    }

    /// `VMG<g>` / `VUMG<g>` - set or report group mute.
    #[must_use]
    pub fn mute(group: GroupId, mute: bool) -> String {
        if mute {
            format!("VMG{group}")
        } else {
            format!("VUMG{group}")
        }
    }

    /// `VMTG<g>` - toggle group mute.
    #[must_use]
    pub fn toggle_mute(group: GroupId) -> String {
        format!("VMTG{group}")
    }

    /// `AG<g>O<z>` - add a zone, or report membership in a query dump.
    #[must_use]
    pub fn add_zone(group: GroupId, zone: ZoneId) -> String {
        format!("AG{group}O{zone}")
    }

    /// `RG<g>O<z>` - remove a zone.
    #[must_use]
    pub fn remove_zone(group: GroupId, zone: ZoneId) -> String {
        format!("RG{group}O{zone}")
    }
}

/// Source commands and reports (object `I`).
pub mod source {
    use super::*;

    /// `QI<s>` - query the source.
    #[must_use]
    pub fn query(source: SourceId) -> String {
        format!("QI{source}")
    }

    /// `NI<s>"name"` - set or report the source name.
    #[must_use]
    pub fn name(source: SourceId, name: &str) -> String {
        format!("NI{source}{}", quoted(name))
    }
}

/// Favorite commands and reports (object `F`).
pub mod favorite {
    use super::*;

    /// `QF<f>` - query the favorite.
    #[must_use]
    pub fn query(favorite: FavoriteId) -> String {
        format!("QF{favorite}")
    }

    /// `NF<f>"name"` - set or report the favorite name.
    #[must_use]
    pub fn name(favorite: FavoriteId, name: &str) -> String {
        format!("NF{favorite}{}", quoted(name))
    }
}

/// Equalizer preset commands and reports (object `EP`).
pub mod preset {
    use super::*;

    /// `QEP<p>` - query the preset.
    #[must_use]
    pub fn query(preset: PresetId) -> String {
        format!("QEP{preset}")
    }

    /// `NEP<p>"name"` - set or report the preset name.
    #[must_use]
    pub fn name(preset: PresetId, name: &str) -> String {
        format!("NEP{preset}{}", quoted(name))
    }

    /// `EP<p>B<band>L<level>` - set or report one preset band.
    #[must_use]
    pub fn band(preset: PresetId, band: BandId, level: BandLevel) -> String {
        format!("EP{preset}B{band}L{level}")
    }

    /// `EP<p>B<band>U` / `…D` - step one preset band.
    #[must_use]
    pub fn band_adjust(preset: PresetId, band: BandId, up: bool) -> String {
        format!("EP{preset}B{band}{}", if up { 'U' } else { 'D' })
    }
}

/// Front panel commands and reports (object `FP`, singleton).
pub mod front_panel {
    use super::*;

    /// `QFPL` - query the key lock.
    #[must_use]
    pub fn query_locked() -> String {
        "QFPL".to_string()
    }

    /// `FPB<0-3>` - set or report the display brightness.
    #[must_use]
    pub fn brightness(brightness: Brightness) -> String {
        format!("FPB{brightness}")
    }

    /// `FPL<0|1>` - set or report the key lock.
    #[must_use]
    pub fn locked(locked: bool) -> String {
        format!("FPL{}", onoff(locked))
    }

    /// `FPL<0|1>QFPL` - the documented (never shipped) query response.
    #[must_use]
    pub fn locked_documented(locked: bool) -> String {
        format!("FPL{}QFPL", onoff(locked))
    }
}

/// Network reports (object `E`, singleton, read-only on the wire).
pub mod network {
    use super::*;

    /// `QE` - query the Ethernet interface.
    #[must_use]
    pub fn query() -> String {
        "QE".to_string()
    }

    /// `DHCP<0|1>` - report the DHCPv4 state.
    #[must_use]
    pub fn dhcp(enabled: bool) -> String {
        format!("DHCP{}", onoff(enabled))
    }

    /// `SDDP<0|1>` - report the Control4 SDDP state.
    #[must_use]
    pub fn sddp(enabled: bool) -> String {
        format!("SDDP{}", onoff(enabled))
    }

    /// `MAC<EUI-48>` - report the hardware address.
    #[must_use]
    pub fn mac(address: Eui48) -> String {
        format!("MAC{address}")
    }

    /// `IP<addr>` - report the host address.
    #[must_use]
    pub fn host(address: IpAddr) -> String {
        format!("IP{address}")
    }

    /// `NM<addr>` - report the netmask.
    #[must_use]
    pub fn netmask(address: IpAddr) -> String {
        format!("NM{address}")
    }

    /// `GW<addr>` - report the default router.
    #[must_use]
    pub fn router(address: IpAddr) -> String {
        format!("GW{address}")
    }
}

/// Configuration singleton commands.
pub mod configuration {
    /// `QX` - query the current configuration (full dump).
    #[must_use]
    pub fn query_current() -> String {
        "QX".to_string()
    }

    /// `LOAD` - reload the saved configuration.
    #[must_use]
    pub fn load() -> String {
        "LOAD".to_string()
    }

    /// `SAVE` - save the configuration now.
    #[must_use]
    pub fn save() -> String {
        "SAVE".to_string()
    }

    /// `SAVING...` - broadcast while a save is in progress.
    #[must_use]
    pub fn saving() -> String {
        "SAVING...".to_string()
    }

    /// `RESET` - reset the configuration to defaults.
    #[must_use]
    pub fn reset() -> String {
        "RESET".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn z(n: u8) -> ZoneId {
        ZoneId::new(n).unwrap()
    }

    fn g(n: u8) -> GroupId {
        GroupId::new(n).unwrap()
    }

    #[test]
    fn volume_frames_are_byte_exact() {
        assert_eq!(zone::volume(z(3), -30), "VO3R-30");
        assert_eq!(zone::volume(z(3), 0), "VO3R0");
        assert_eq!(zone::volume_all(-40), "VXR-40");
        assert_eq!(zone::volume_up(z(12)), "VO12U");
    }

    #[test]
    fn mute_frames_select_operation_by_state() {
        assert_eq!(zone::mute(z(1), true), "VMO1");
        assert_eq!(zone::mute(z(1), false), "VUMO1");
        assert_eq!(zone::toggle_mute(z(1)), "VMTO1");
        assert_eq!(group::mute(g(2), true), "VMG2");
        assert_eq!(group::mute(g(2), false), "VUMG2");
    }

    #[test]
    fn balance_encoding_is_tagged() {
        assert_eq!(encode_balance(-80), ('L', 80));
        assert_eq!(encode_balance(80), ('R', 80));
        assert_eq!(encode_balance(0), ('R', 0));
        assert_eq!(zone::balance(z(4), -20), "BO4L20");
        assert_eq!(zone::balance(z(4), 35), "BO4R35");
    }

    #[test]
    fn tone_signs_follow_the_values() {
        assert_eq!(zone::tone(z(2), -4, 7), "TO2B-4T7");
        assert_eq!(zone::tone(z(2), 0, 0), "TO2B0T0");
    }

    #[test]
    fn names_are_quoted() {
        assert_eq!(zone::name(z(1), "Kitchen"), "NO1\"Kitchen\"");
        assert_eq!(group::name(g(1), "Downstairs"), "NG1\"Downstairs\"");
        assert_eq!(
            preset::name(PresetId::new(3).unwrap(), "Rock"),
            "NEP3\"Rock\""
        );
    }

    #[test]
    fn group_source_reports_mixed_as_x() {
        assert_eq!(
            group::source(g(1), GroupSource::Single(SourceId::new(4).unwrap())),
            "CG1I4"
        );
        assert_eq!(group::source(g(1), GroupSource::Mixed), "CG1IX");
    }

    #[test]
    fn equalizer_frames_carry_band_and_level() {
        let band = BandId::new(5).unwrap();
        assert_eq!(zone::equalizer_band(z(3), band, -4), "EO3B5L-4");
        assert_eq!(zone::equalizer_band_adjust(z(3), band, true), "EO3B5U");
        assert_eq!(preset::band(PresetId::new(2).unwrap(), band, 10), "EP2B5L10");
    }

    #[test]
    fn network_reports_format_like_the_hardware() {
        assert_eq!(network::dhcp(true), "DHCP1");
        assert_eq!(network::sddp(false), "SDDP0");
        assert_eq!(
            network::mac(Eui48::new([0x70, 0xB3, 0xD5, 0x07, 0x0A, 0x1F])),
            "MAC70-B3-D5-07-0A-1F"
        );
        assert_eq!(network::host("192.168.1.48".parse().unwrap()), "IP192.168.1.48");
        assert_eq!(network::netmask("255.255.255.0".parse().unwrap()), "NM255.255.255.0");
        assert_eq!(network::router("192.168.1.1".parse().unwrap()), "GW192.168.1.1");
    }

    #[test]
    fn front_panel_bug_forms() {
        assert_eq!(front_panel::locked(true), "FPL1");
        assert_eq!(front_panel::locked_documented(false), "FPL0QFPL");
    }

    #[test]
    fn singletons_are_literal() {
        assert_eq!(configuration::query_current(), "QX");
        assert_eq!(configuration::saving(), "SAVING...");
        assert_eq!(ERROR, "ERROR");
    }
}
