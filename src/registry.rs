// MIT License - Copyright (c) 2021 TJForc
// Named operations and conditions exposed by the controller and zone devices

use std::io::Write;

use serde::Serialize;

use crate::devices::ZoneCondition;
use crate::error::Result;
use crate::panel::ElkPanel;
use crate::transport::Connector;

pub const CONTROLLER_TYPE: &str = "elk-m1xep";
pub const ZONE_DEVICE_TYPE: &str = "elk-m1zone";

/// What kind of thing a type name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// The M1XEP itself, which runs operations.
    Controller,
    /// A single zone, which answers conditions.
    Device,
}

impl Capability {
    pub fn from_type(type_name: &str) -> Option<Self> {
        match type_name {
            CONTROLLER_TYPE => Some(Self::Controller),
            ZONE_DEVICE_TYPE => Some(Self::Device),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Controller => CONTROLLER_TYPE,
            Self::Device => ZONE_DEVICE_TYPE,
        }
    }

    /// `(name, help)` for each operation, sorted by name.
    pub fn operations(&self) -> Vec<(&'static str, &'static str)> {
        match self {
            Self::Controller => Operation::ALL.iter().map(|o| (o.name(), o.help())).collect(),
            Self::Device => Vec::new(),
        }
    }

    /// `(name, help)` for each condition, sorted by name.
    pub fn conditions(&self) -> Vec<(&'static str, &'static str)> {
        match self {
            Self::Controller => Vec::new(),
            Self::Device => {
                let mut conditions: Vec<_> = ZoneCondition::ALL
                    .iter()
                    .map(|c| (c.name(), c.help()))
                    .collect();
                conditions.sort_by_key(|(name, _)| *name);
                conditions
            }
        }
    }
}

/// Controller operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GetTime,
    ZoneNames,
    ZoneStatus,
}

impl Operation {
    pub const ALL: [Operation; 3] = [Self::GetTime, Self::ZoneNames, Self::ZoneStatus];

    pub fn name(&self) -> &'static str {
        match self {
            Self::GetTime => "gettime",
            Self::ZoneNames => "zonenames",
            Self::ZoneStatus => "zonestatus",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.name() == name)
    }

    pub fn help(&self) -> &'static str {
        match self {
            Self::GetTime => "get the current time from the M1XEP",
            Self::ZoneNames => "get the names of all zones",
            Self::ZoneStatus => "get the status of all zones",
        }
    }

    /// Run the operation and write its result, as text lines or as JSON.
    pub async fn execute<C: Connector>(
        &self,
        panel: &ElkPanel<C>,
        out: &mut impl Write,
        json: bool,
    ) -> Result<()> {
        match self {
            Self::GetTime => {
                let now = panel.get_time().await?;
                if json {
                    return write_json(out, &now);
                }
                let dst = if now.dst {
                    "(daylight saving time)"
                } else {
                    "(standard time)"
                };
                writeln!(out, "gettime: {} {}", now.time, dst)?;
            }
            Self::ZoneNames => {
                let zones = panel.zone_names().await?;
                if json {
                    return write_json(out, &zones);
                }
                for z in &zones {
                    writeln!(out, "zone {}: {}: {}", z.zone, z.definition, z.name.trim_end())?;
                }
            }
            Self::ZoneStatus => {
                let zones = panel.zone_status().await?;
                if json {
                    return write_json(out, &zones);
                }
                for z in &zones {
                    writeln!(
                        out,
                        "zone {}: {}/{}",
                        z.zone,
                        z.physical.as_str(),
                        z.logical.as_str()
                    )?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ConditionResult {
    zone: u32,
    condition: &'static str,
    value: bool,
}

/// Evaluate a zone device condition and write the outcome.
pub async fn evaluate<C: Connector>(
    panel: &ElkPanel<C>,
    zone: u32,
    condition: ZoneCondition,
    out: &mut impl Write,
    json: bool,
) -> Result<bool> {
    let value = panel.zone_condition(zone, condition).await?;
    if json {
        write_json(
            out,
            &ConditionResult {
                zone,
                condition: condition.name(),
                value,
            },
        )?;
    } else {
        writeln!(out, "zone {} {}: {}", zone, condition.name(), value)?;
    }
    Ok(value)
}

fn write_json<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).map_err(std::io::Error::from)?;
    writeln!(out)?;
    Ok(())
}
