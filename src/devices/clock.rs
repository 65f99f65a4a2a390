// MIT License - Copyright (c) 2021 TJForc
// Panel real time clock (RR response)

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;

use crate::constants::REAL_TIME_LEN;
use crate::error::{ElkError, Result};

/// Panel clock reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PanelTime {
    /// Panel wall clock, interpreted in the local time zone of this process.
    pub time: DateTime<Local>,
    /// Whether the panel reports daylight saving time.
    pub dst: bool,
}

fn dec2(buf: &[u8]) -> u32 {
    u32::from(buf[0].wrapping_sub(b'0')) * 10 + u32::from(buf[1].wrapping_sub(b'0'))
}

/// Parse the data of an `RR` response (or the clock in an `XK` message).
///
/// Layout: `ss mm hh D dd MM yy S ..` where `D` is the day of the week
/// (ignored) and `S` is `'1'` when daylight saving time is in effect.
pub fn parse_time(data: &[u8]) -> Result<PanelTime> {
    if data.len() < REAL_TIME_LEN {
        return Err(ElkError::UnexpectedResponseSize {
            what: "real time",
            got: data.len(),
            expected: REAL_TIME_LEN,
        });
    }
    let secs = dec2(&data[0..2]);
    let mins = dec2(&data[2..4]);
    let hours = dec2(&data[4..6]);
    let day = dec2(&data[7..9]);
    let month = dec2(&data[9..11]);
    let year = 2000 + dec2(&data[11..13]) as i32;
    let dst = data[13] == b'1';

    let time = Local
        .with_ymd_and_hms(year, month, day, hours, mins, secs)
        .earliest()
        .ok_or_else(|| ElkError::InvalidTimestamp {
            details: format!(
                "{year:04}-{month:02}-{day:02} {hours:02}:{mins:02}:{secs:02}"
            ),
        })?;
    Ok(PanelTime { time, dst })
}
