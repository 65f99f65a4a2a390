// MIT License - Copyright (c) 2021 TJForc
// Typed views of panel responses

pub mod clock;
pub mod zone;

pub use clock::{parse_time, PanelTime};
pub use zone::{
    parse_text_description, parse_zone_definitions, parse_zone_status, LogicalStatus,
    PhysicalStatus, ZoneCondition, ZoneDefinitions, ZoneInfo, ZoneState, ZoneStatus,
    ZoneStatusTable,
};
