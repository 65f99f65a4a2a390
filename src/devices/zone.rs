// MIT License - Copyright (c) 2021 TJForc
// Zone definitions, names and status (ZD, SD and ZS responses)

use std::fmt;

use serde::Serialize;

use crate::constants::{TEXT_DESCRIPTION_LEN, NUM_ZONES, ZoneDefinition};
use crate::error::{ElkError, Result};
use crate::protocol::hex_digit;

/// Physical state of a zone's wiring, bits 0-1 of the status nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PhysicalStatus {
    Unconfigured,
    Open,
    #[serde(rename = "EOL")]
    EndOfLine,
    Short,
}

impl PhysicalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unconfigured => "Unconfigured",
            Self::Open => "Open",
            Self::EndOfLine => "EOL",
            Self::Short => "Short",
        }
    }
}

/// Logical (alarm) state of a zone, bits 2-3 of the status nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LogicalStatus {
    Normal,
    Trouble,
    Violated,
    Bypassed,
}

impl LogicalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Trouble => "Trouble",
            Self::Violated => "Violated",
            Self::Bypassed => "Bypassed",
        }
    }
}

/// Packed zone status as sent by the panel, one hex digit per zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ZoneStatus(pub u8);

impl ZoneStatus {
    pub fn from_hex(b: u8) -> Self {
        Self(hex_digit(b))
    }

    pub fn physical(&self) -> PhysicalStatus {
        match self.0 & 0x3 {
            0 => PhysicalStatus::Unconfigured,
            1 => PhysicalStatus::Open,
            2 => PhysicalStatus::EndOfLine,
            _ => PhysicalStatus::Short,
        }
    }

    pub fn logical(&self) -> LogicalStatus {
        match (self.0 >> 2) & 0x3 {
            0 => LogicalStatus::Normal,
            1 => LogicalStatus::Trouble,
            2 => LogicalStatus::Violated,
            _ => LogicalStatus::Bypassed,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.physical() != PhysicalStatus::Unconfigured
    }
}

impl fmt::Display for ZoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.physical().as_str(), self.logical().as_str())
    }
}

/// Zone definitions for every zone, indexed from zone 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneDefinitions([ZoneDefinition; NUM_ZONES]);

impl ZoneDefinitions {
    /// Definition of a 1-based zone number.
    pub fn get(&self, zone: u16) -> Option<ZoneDefinition> {
        zone_index(zone).map(|i| self.0[i])
    }

    /// `(zone number, definition)` pairs in zone order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, ZoneDefinition)> + '_ {
        self.0.iter().enumerate().map(|(i, d)| (i as u16 + 1, *d))
    }

    /// Zones whose definition is not `Disabled`.
    pub fn enabled(&self) -> impl Iterator<Item = (u16, ZoneDefinition)> + '_ {
        self.iter().filter(|(_, d)| !d.is_disabled())
    }
}

/// Status of every zone, indexed from zone 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneStatusTable([ZoneStatus; NUM_ZONES]);

impl ZoneStatusTable {
    /// Status of a 1-based zone number.
    pub fn get(&self, zone: u16) -> Option<ZoneStatus> {
        zone_index(zone).map(|i| self.0[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, ZoneStatus)> + '_ {
        self.0.iter().enumerate().map(|(i, s)| (i as u16 + 1, *s))
    }

    /// Zones that are physically configured.
    pub fn configured(&self) -> impl Iterator<Item = (u16, ZoneStatus)> + '_ {
        self.iter().filter(|(_, s)| s.is_configured())
    }
}

fn zone_index(zone: u16) -> Option<usize> {
    let idx = usize::from(zone).checked_sub(1)?;
    (idx < NUM_ZONES).then_some(idx)
}

/// Check that `zone` is a valid 1-based zone number.
pub fn validate_zone(zone: u32) -> Result<u16> {
    if zone == 0 || zone > NUM_ZONES as u32 {
        return Err(ElkError::InvalidZone {
            zone,
            max: NUM_ZONES as u32,
        });
    }
    Ok(zone as u16)
}

/// A named, enabled zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneInfo {
    pub zone: u16,
    pub name: String,
    pub definition: ZoneDefinition,
}

/// A configured zone's decoded status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZoneState {
    pub zone: u16,
    pub physical: PhysicalStatus,
    pub logical: LogicalStatus,
}

impl From<(u16, ZoneStatus)> for ZoneState {
    fn from((zone, status): (u16, ZoneStatus)) -> Self {
        Self {
            zone,
            physical: status.physical(),
            logical: status.logical(),
        }
    }
}

/// Parse the data of a `ZD` response.
pub fn parse_zone_definitions(data: &[u8]) -> Result<ZoneDefinitions> {
    if data.len() != NUM_ZONES {
        return Err(ElkError::UnexpectedZoneCount {
            got: data.len(),
            expected: NUM_ZONES,
        });
    }
    let mut defs = [ZoneDefinition::Disabled; NUM_ZONES];
    for (def, b) in defs.iter_mut().zip(data) {
        *def = ZoneDefinition::from_ascii(*b);
    }
    Ok(ZoneDefinitions(defs))
}

/// Parse the data of a `ZS` response.
pub fn parse_zone_status(data: &[u8]) -> Result<ZoneStatusTable> {
    if data.len() != NUM_ZONES {
        return Err(ElkError::UnexpectedZoneCount {
            got: data.len(),
            expected: NUM_ZONES,
        });
    }
    let mut status = [ZoneStatus::default(); NUM_ZONES];
    for (s, b) in status.iter_mut().zip(data) {
        *s = ZoneStatus::from_hex(*b);
    }
    Ok(ZoneStatusTable(status))
}

/// Parse the data of an `SD` response into `(zone number, name)`.
///
/// The name is the raw 16 byte field, padding included.
pub fn parse_text_description(data: &[u8]) -> Result<(u16, String)> {
    if data.len() != TEXT_DESCRIPTION_LEN {
        return Err(ElkError::UnexpectedResponseSize {
            what: "text description",
            got: data.len(),
            expected: TEXT_DESCRIPTION_LEN,
        });
    }
    let digits = &data[2..5];
    let id = digits
        .iter()
        .fold(0u16, |acc, b| acc * 10 + u16::from(b.wrapping_sub(b'0')));
    let name = String::from_utf8_lossy(&data[5..]).into_owned();
    Ok((id, name))
}

/// Conditions that can be tested on a single zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneCondition {
    Normal,
    Violated,
    Trouble,
    Bypassed,
}

impl ZoneCondition {
    pub const ALL: [ZoneCondition; 4] = [
        ZoneCondition::Normal,
        ZoneCondition::Violated,
        ZoneCondition::Trouble,
        ZoneCondition::Bypassed,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Violated => "violated",
            Self::Trouble => "trouble",
            Self::Bypassed => "bypassed",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == s)
    }

    pub fn help(&self) -> &'static str {
        match self {
            Self::Normal => "true if the zone is in its normal (secure) state",
            Self::Violated => "true if the zone is violated",
            Self::Trouble => "true if the zone reports trouble",
            Self::Bypassed => "true if the zone is bypassed",
        }
    }

    pub fn evaluate(&self, status: ZoneStatus) -> bool {
        let logical = status.logical();
        match self {
            Self::Normal => logical == LogicalStatus::Normal,
            Self::Violated => logical == LogicalStatus::Violated,
            Self::Trouble => logical == LogicalStatus::Trouble,
            Self::Bypassed => logical == LogicalStatus::Bypassed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{expect, ResponseTag};

    #[test]
    fn test_zone_status_bits() {
        let s = ZoneStatus(0x9);
        assert_eq!(s.physical(), PhysicalStatus::Open);
        assert_eq!(s.logical(), LogicalStatus::Violated);
        assert_eq!(s.to_string(), "Open/Violated");

        let s = ZoneStatus::from_hex(b'E');
        assert_eq!(s.physical(), PhysicalStatus::EndOfLine);
        assert_eq!(s.logical(), LogicalStatus::Bypassed);

        assert!(!ZoneStatus(0x4).is_configured());
    }

    #[test]
    fn test_parse_zone_definitions() {
        let mut data = vec![b'0'; NUM_ZONES];
        data[0] = b'1';
        data[1] = b'9';
        data[207] = b':';
        let defs = parse_zone_definitions(&data).unwrap();
        assert_eq!(defs.get(1), Some(ZoneDefinition::BurglarEntryExit1));
        assert_eq!(defs.get(2), Some(ZoneDefinition::BurglarBoxTamper));
        assert_eq!(defs.get(3), Some(ZoneDefinition::Disabled));
        assert_eq!(defs.get(208), Some(ZoneDefinition::FireAlarm));
        assert_eq!(defs.get(0), None);
        assert_eq!(defs.get(209), None);

        let enabled: Vec<u16> = defs.enabled().map(|(z, _)| z).collect();
        assert_eq!(enabled, vec![1, 2, 208]);
    }

    #[test]
    fn test_parse_zone_definitions_every_digit_in_order() {
        let data: Vec<u8> = (0..NUM_ZONES).map(|i| b'0' + (i % 10) as u8).collect();
        let defs = parse_zone_definitions(&data).unwrap();
        for (zone, def) in defs.iter() {
            let expected = ZoneDefinition::from_u8(((zone - 1) % 10) as u8);
            assert_eq!(def, expected, "zone {zone}");
        }
    }

    #[test]
    fn test_parse_zone_definitions_wrong_count() {
        for len in [0, 1, NUM_ZONES - 1, NUM_ZONES + 1] {
            let data = vec![b'0'; len];
            assert!(matches!(
                parse_zone_definitions(&data),
                Err(ElkError::UnexpectedZoneCount { got, expected: NUM_ZONES }) if got == len
            ));
        }
    }

    #[test]
    fn test_parse_zone_status() {
        let mut data = vec![b'0'; NUM_ZONES];
        data[0] = b'2';
        data[4] = b'9';
        data[9] = b'd';
        let status = parse_zone_status(&data).unwrap();
        let configured: Vec<ZoneState> = status.configured().map(ZoneState::from).collect();
        assert_eq!(
            configured,
            vec![
                ZoneState {
                    zone: 1,
                    physical: PhysicalStatus::EndOfLine,
                    logical: LogicalStatus::Normal,
                },
                ZoneState {
                    zone: 5,
                    physical: PhysicalStatus::Open,
                    logical: LogicalStatus::Violated,
                },
                ZoneState {
                    zone: 10,
                    physical: PhysicalStatus::Open,
                    logical: LogicalStatus::Bypassed,
                },
            ]
        );
        assert!(parse_zone_status(&data[1..]).is_err());
    }

    #[test]
    fn test_parse_text_description() {
        let data = expect(
            ResponseTag::TEXT_DESCRIPTION,
            b"1BSD01001Front DoorKeypad0089\r\n",
        )
        .unwrap();
        let (id, name) = parse_text_description(&data).unwrap();
        assert_eq!(id, 1);
        assert_eq!(name, "Front DoorKeypad");
    }

    #[test]
    fn test_parse_text_description_keeps_padding() {
        let (id, name) = parse_text_description(b"00208Garage          ").unwrap();
        assert_eq!(id, 208);
        assert_eq!(name, "Garage          ");
    }

    #[test]
    fn test_parse_text_description_wrong_size() {
        assert!(matches!(
            parse_text_description(b"01001Front"),
            Err(ElkError::UnexpectedResponseSize { got: 10, expected: 21, .. })
        ));
    }

    #[test]
    fn test_validate_zone() {
        assert_eq!(validate_zone(1).unwrap(), 1);
        assert_eq!(validate_zone(208).unwrap(), 208);
        assert!(matches!(
            validate_zone(0),
            Err(ElkError::InvalidZone { zone: 0, max: 208 })
        ));
        assert!(validate_zone(209).is_err());
    }

    #[test]
    fn test_zone_conditions() {
        let violated = ZoneStatus(0x9);
        assert!(ZoneCondition::Violated.evaluate(violated));
        assert!(!ZoneCondition::Normal.evaluate(violated));
        assert!(ZoneCondition::Normal.evaluate(ZoneStatus(0x2)));
        assert!(ZoneCondition::Trouble.evaluate(ZoneStatus(0x6)));
        assert!(ZoneCondition::Bypassed.evaluate(ZoneStatus(0xD)));
        assert_eq!(ZoneCondition::from_name("bypassed"), Some(ZoneCondition::Bypassed));
        assert_eq!(ZoneCondition::from_name("armed"), None);
    }
}
