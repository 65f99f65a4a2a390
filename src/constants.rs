// MIT License - Copyright (c) 2021 TJForc
// Panel constants for the Elk M1 / M1XEP

use std::fmt;

/// Number of zones supported by the M1 panel. Fixed by the panel firmware.
pub const NUM_ZONES: usize = 208;

/// Line terminator used by every frame and by the login prompts.
pub const CRLF: &str = "\r\n";

/// Identifier / credential value meaning "authentication disabled".
pub const NOT_SET: &str = "not-set";

/// Prompt written by the M1XEP when it wants a user name.
pub const USERNAME_PROMPT: &str = "Username:";

/// Prompt written by the M1XEP when it wants the password.
pub const PASSWORD_PROMPT: &str = "Password:";

/// Banner written by the M1XEP after a successful login.
pub const LOGIN_SUCCESS: &str = "Elk-M1XEP: Login successful.";

/// Text description payload: 2 byte type, 3 digit number, 16 byte name.
pub const TEXT_DESCRIPTION_LEN: usize = 2 + 3 + 16;

/// Minimum payload length of an `RR` real time response.
pub const REAL_TIME_LEN: usize = 14;

/// Zone definition (zone type) as returned by the `zd` request.
///
/// The wire value is one ASCII character per zone; subtracting `'0'` gives
/// the ordinal below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneDefinition {
    Disabled,
    BurglarEntryExit1,
    BurglarEntryExit2,
    BurglarPerimeterInstant,
    BurglarInterior,
    BurglarInteriorFollower,
    BurglarInteriorNight,
    BurglarInteriorNightDelay,
    Burglar24Hour,
    BurglarBoxTamper,
    FireAlarm,
    FireVerified,
    FireSupervisory,
    AuxAlarm1,
    AuxAlarm2,
    Keyfob,
    NonAlarm,
    CarbonMonoxide,
    EmergencyAlarm,
    FreezeAlarm,
    GasAlarm,
    HeatAlarm,
    MedicalAlarm,
    PoliceAlarm,
    PoliceNoIndication,
    WaterAlarm,
    KeyMomentaryArmDisarm,
    KeyMomentaryArmAway,
    KeyMomentaryArmStay,
    KeyMomentaryDisarm,
    KeyOnOff,
    MuteAudibles,
    PowerSupervisory,
    Temperature,
    AnalogZone,
    PhoneKey,
    IntercomKey,
    /// An ordinal the table above does not know about.
    Unknown(u8),
}

impl ZoneDefinition {
    /// Map an ordinal (0-36) to a zone definition.
    pub fn from_u8(val: u8) -> Self {
        match val {
            0 => Self::Disabled,
            1 => Self::BurglarEntryExit1,
            2 => Self::BurglarEntryExit2,
            3 => Self::BurglarPerimeterInstant,
            4 => Self::BurglarInterior,
            5 => Self::BurglarInteriorFollower,
            6 => Self::BurglarInteriorNight,
            7 => Self::BurglarInteriorNightDelay,
            8 => Self::Burglar24Hour,
            9 => Self::BurglarBoxTamper,
            10 => Self::FireAlarm,
            11 => Self::FireVerified,
            12 => Self::FireSupervisory,
            13 => Self::AuxAlarm1,
            14 => Self::AuxAlarm2,
            15 => Self::Keyfob,
            16 => Self::NonAlarm,
            17 => Self::CarbonMonoxide,
            18 => Self::EmergencyAlarm,
            19 => Self::FreezeAlarm,
            20 => Self::GasAlarm,
            21 => Self::HeatAlarm,
            22 => Self::MedicalAlarm,
            23 => Self::PoliceAlarm,
            24 => Self::PoliceNoIndication,
            25 => Self::WaterAlarm,
            26 => Self::KeyMomentaryArmDisarm,
            27 => Self::KeyMomentaryArmAway,
            28 => Self::KeyMomentaryArmStay,
            29 => Self::KeyMomentaryDisarm,
            30 => Self::KeyOnOff,
            31 => Self::MuteAudibles,
            32 => Self::PowerSupervisory,
            33 => Self::Temperature,
            34 => Self::AnalogZone,
            35 => Self::PhoneKey,
            36 => Self::IntercomKey,
            other => Self::Unknown(other),
        }
    }

    /// Decode the single wire character used by the `ZD` response.
    pub fn from_ascii(byte: u8) -> Self {
        Self::from_u8(byte.wrapping_sub(b'0'))
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Disabled => "Disabled",
            Self::BurglarEntryExit1 => "Burglar Entry/Exit 1",
            Self::BurglarEntryExit2 => "Burglar Entry/Exit 2",
            Self::BurglarPerimeterInstant => "Burglar Perimeter Instant",
            Self::BurglarInterior => "Burglar Interior",
            Self::BurglarInteriorFollower => "Burglar Interior Follower",
            Self::BurglarInteriorNight => "Burglar Interior Night",
            Self::BurglarInteriorNightDelay => "Burglar Interior Night Delay",
            Self::Burglar24Hour => "Burglar 24 Hour",
            Self::BurglarBoxTamper => "Burglar Box Tamper",
            Self::FireAlarm => "Fire Alarm",
            Self::FireVerified => "Fire Verified",
            Self::FireSupervisory => "Fire Supervisory",
            Self::AuxAlarm1 => "Aux Alarm 1",
            Self::AuxAlarm2 => "Aux Alarm 2",
            Self::Keyfob => "Keyfob",
            Self::NonAlarm => "Non Alarm",
            Self::CarbonMonoxide => "Carbon Monoxide",
            Self::EmergencyAlarm => "Emergency Alarm",
            Self::FreezeAlarm => "Freeze Alarm",
            Self::GasAlarm => "Gas Alarm",
            Self::HeatAlarm => "Heat Alarm",
            Self::MedicalAlarm => "Medical Alarm",
            Self::PoliceAlarm => "Police Alarm",
            Self::PoliceNoIndication => "Police No Indication",
            Self::WaterAlarm => "Water Alarm",
            Self::KeyMomentaryArmDisarm => "Key Momentary Arm / Disarm",
            Self::KeyMomentaryArmAway => "Key Momentary Arm Away",
            Self::KeyMomentaryArmStay => "Key Momentary Arm Stay",
            Self::KeyMomentaryDisarm => "Key Momentary Disarm",
            Self::KeyOnOff => "Key On/Off",
            Self::MuteAudibles => "Mute Audibles",
            Self::PowerSupervisory => "Power Supervisory",
            Self::Temperature => "Temperature",
            Self::AnalogZone => "Analog Zone",
            Self::PhoneKey => "Phone Key",
            Self::IntercomKey => "Intercom Key",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl fmt::Display for ZoneDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(n) => write!(f, "UnknownZoneType({n})"),
            other => f.write_str(other.description()),
        }
    }
}

impl serde::Serialize for ZoneDefinition {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
