// MIT License - Copyright (c) 2021 TJForc
// M1 ASCII frame codec

use crate::constants::NUM_ZONES;
use crate::devices::zone::validate_zone;
use crate::error::{ElkError, Result, Tag};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Length, type/subtype, reserved, checksum and CRLF around the data.
const FRAME_OVERHEAD: usize = 2 + 2 + 2 + 2 + 2;

/// Type/subtype + reserved + checksum, the smallest in-frame length.
const MIN_MESSAGE_LEN: usize = 6;

/// Commands that can be sent to the panel.
///
/// # Frame layout
///
/// ```text
/// LL T S data.. 0 0 CC \r \n
/// ```
///
/// `LL` is the hex length of everything between itself and the CRLF, `T`/`S`
/// are the type and subtype letters, and `CC` is the hex two's complement of
/// the byte sum of everything before it. Requests use lowercase letters and
/// the panel answers with the same letters in uppercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `rr`: request real time clock. Answered by `RR`.
    RealTime,
    /// `zd`: request all zone definitions. Answered by `ZD`.
    ZoneDefinitions,
    /// `sd`: request the text name of a zone (1-based). Answered by `SD`.
    ZoneName { zone: u16 },
    /// `zs`: request the status of all zones. Answered by `ZS`.
    ZoneStatus,
}

impl Command {
    /// `sd` for a 1-based zone, rejecting zones the panel does not have.
    pub fn zone_name(zone: u32) -> Result<Self> {
        Ok(Command::ZoneName {
            zone: validate_zone(zone)?,
        })
    }

    /// Type and subtype bytes of the request.
    pub fn tag(&self) -> (u8, u8) {
        match self {
            Command::RealTime => (b'r', b'r'),
            Command::ZoneDefinitions => (b'z', b'd'),
            Command::ZoneName { .. } => (b's', b'd'),
            Command::ZoneStatus => (b'z', b's'),
        }
    }

    /// Response the panel sends back for this command.
    pub fn expected_response(&self) -> ResponseTag {
        match self {
            Command::RealTime => ResponseTag::REAL_TIME,
            Command::ZoneDefinitions => ResponseTag::ZONE_DEFINITIONS,
            Command::ZoneName { .. } => ResponseTag::TEXT_DESCRIPTION,
            Command::ZoneStatus => ResponseTag::ZONE_STATUS,
        }
    }

    /// Data bytes carried by the request.
    pub fn payload(&self) -> Vec<u8> {
        match self {
            // "00" is the zone-name text type, followed by a 3 digit zone.
            Command::ZoneName { zone } => {
                debug_assert!(
                    (1..=NUM_ZONES).contains(&usize::from(*zone)),
                    "zone {zone} out of range"
                );
                format!("00{zone:03}").into_bytes()
            }
            _ => Vec::new(),
        }
    }

    /// Encode the command into a request descriptor.
    pub fn request(&self) -> Request {
        let (kind, subtype) = self.tag();
        Request {
            bytes: encode(kind, subtype, &self.payload()),
            expected: self.expected_response(),
        }
    }
}

/// An encoded request paired with the response it anticipates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub bytes: Vec<u8>,
    pub expected: ResponseTag,
}

/// Type/subtype of a response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResponseTag {
    pub kind: u8,
    pub subtype: u8,
}

impl ResponseTag {
    pub const REAL_TIME: Self = Self::new(b'R', b'R');
    pub const ZONE_DEFINITIONS: Self = Self::new(b'Z', b'D');
    pub const TEXT_DESCRIPTION: Self = Self::new(b'S', b'D');
    pub const ZONE_STATUS: Self = Self::new(b'Z', b'S');
    /// Panel-initiated message, never a response to a request.
    pub const UNSOLICITED: Self = Self::new(b'X', b'K');

    pub const fn new(kind: u8, subtype: u8) -> Self {
        Self { kind, subtype }
    }

    /// Exact match of both type and subtype.
    pub fn matches(&self, kind: u8, subtype: u8) -> bool {
        self.kind == kind && self.subtype == subtype
    }

    /// Whether the raw frame carries this tag, without decoding the rest.
    pub fn is_tag_of(&self, frame: &[u8]) -> Result<bool> {
        let (kind, subtype) = peek_tag(frame)?;
        Ok(self.matches(kind, subtype))
    }
}

impl From<ResponseTag> for Tag {
    fn from(tag: ResponseTag) -> Self {
        Tag(tag.kind, tag.subtype)
    }
}

/// A decoded, checksum-validated frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: u8,
    pub subtype: u8,
    pub data: Vec<u8>,
}

/// Encode a frame: length, type, subtype, data, reserved `00`, checksum, CRLF.
pub fn encode(kind: u8, subtype: u8, data: &[u8]) -> Vec<u8> {
    let total = data.len() + FRAME_OVERHEAD;
    let msg_len = total - 4;
    let mut buf = Vec::with_capacity(total);
    push_hex(&mut buf, msg_len as u8);
    buf.push(kind);
    buf.push(subtype);
    buf.extend_from_slice(data);
    buf.extend_from_slice(b"00");
    let sum = buf.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    push_hex(&mut buf, (sum ^ 0xff).wrapping_add(1));
    buf.extend_from_slice(b"\r\n");
    buf
}

fn push_hex(buf: &mut Vec<u8>, val: u8) {
    buf.push(HEX_DIGITS[usize::from(val >> 4)]);
    buf.push(HEX_DIGITS[usize::from(val & 0x0f)]);
}

/// Read one hex digit. Anything outside `0-9A-Fa-f` reads as zero.
pub fn hex_digit(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'A'..=b'F' => b - b'A' + 10,
        b'a'..=b'f' => b - b'a' + 10,
        _ => 0,
    }
}

fn hex_u8(hi: u8, lo: u8) -> u8 {
    hex_digit(hi).wrapping_mul(16).wrapping_add(hex_digit(lo))
}

/// Read the type and subtype of a frame without validating it.
pub fn peek_tag(buf: &[u8]) -> Result<(u8, u8)> {
    if buf.len() < 4 {
        return Err(ElkError::FrameTooShort { len: buf.len() });
    }
    Ok((buf[2], buf[3]))
}

/// Decode and validate a frame.
///
/// Reserved bytes are checked first and fail immediately. The checksum and
/// terminator are both checked; when both are wrong the terminator error is
/// the one reported.
pub fn decode(buf: &[u8]) -> Result<Frame> {
    let (kind, subtype) = peek_tag(buf)?;
    let msg_len = usize::from(hex_u8(buf[0], buf[1]));
    if buf.len() < msg_len + 4 {
        return Err(ElkError::FrameTruncated {
            len: buf.len(),
            expected: msg_len + 4,
        });
    }
    if msg_len < MIN_MESSAGE_LEN {
        return Err(ElkError::FrameTooShort { len: msg_len + 4 });
    }

    let data_end = 4 + msg_len - MIN_MESSAGE_LEN;
    let data = buf[4..data_end].to_vec();

    let reserved = [buf[data_end], buf[data_end + 1]];
    if reserved != *b"00" {
        return Err(ElkError::InvalidReservedBytes { found: reserved });
    }

    let crc_at = data_end + 2;
    let crc = hex_u8(buf[crc_at], buf[crc_at + 1]);
    let remainder = buf[..crc_at]
        .iter()
        .fold(crc, |acc, b| acc.wrapping_add(*b));

    let mut err = None;
    if remainder != 0 {
        err = Some(ElkError::ChecksumMismatch { remainder });
    }
    let terminator = &buf[crc_at + 2..msg_len + 4];
    if terminator != b"\r\n" {
        err = Some(ElkError::InvalidTerminator {
            found: terminator.to_vec(),
        });
    }
    match err {
        Some(e) => Err(e),
        None => Ok(Frame {
            kind,
            subtype,
            data,
        }),
    }
}

/// Decode a frame and require that it carries `tag`; returns its data.
pub fn expect(tag: ResponseTag, buf: &[u8]) -> Result<Vec<u8>> {
    let frame = decode(buf)?;
    if !tag.matches(frame.kind, frame.subtype) {
        return Err(ElkError::UnexpectedResponse {
            expected: tag.into(),
            got: Tag(frame.kind, frame.subtype),
        });
    }
    Ok(frame.data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn byte_sum(buf: &[u8]) -> u8 {
        buf.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
    }

    #[test]
    fn test_real_time_request() {
        let req = Command::RealTime.request();
        assert_eq!(req.bytes, b"06rr0056\r\n");
        assert_eq!(req.expected, ResponseTag::REAL_TIME);
    }

    #[test]
    fn test_zone_name_request() {
        let req = Command::ZoneName { zone: 1 }.request();
        assert_eq!(req.bytes, b"0Bsd000010066\r\n");
        assert_eq!(req.expected, ResponseTag::TEXT_DESCRIPTION);
        assert_eq!(Command::ZoneName { zone: 208 }.payload(), b"00208");
    }

    #[test]
    fn test_zone_name_rejects_out_of_range() {
        for zone in [0, 209, 1000, 1001] {
            let err = Command::zone_name(zone).unwrap_err();
            assert!(matches!(err, ElkError::InvalidZone { max: 208, .. }));
        }
        let req = Command::zone_name(1).unwrap().request();
        assert_eq!(req.bytes, b"0Bsd000010066\r\n");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "out of range")]
    fn test_zone_name_payload_does_not_wrap() {
        // 1001 must never be sent as zone 1.
        Command::ZoneName { zone: 1001 }.payload();
    }

    #[test]
    fn test_other_requests() {
        assert_eq!(Command::ZoneDefinitions.request().bytes, b"06zd005C\r\n");
        assert_eq!(Command::ZoneStatus.request().bytes, b"06zs004D\r\n");
        assert_eq!(
            Command::ZoneStatus.expected_response(),
            ResponseTag::ZONE_STATUS
        );
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let cases: [(u8, u8, &[u8]); 4] = [
            (b'r', b'r', b""),
            (b's', b'd', b"00001"),
            (b'Z', b'S', &[b'0'; 208]),
            (b'S', b'D', b"01001Front DoorKeypad"),
        ];
        for (kind, subtype, data) in cases {
            let frame = encode(kind, subtype, data);
            let body = &frame[..frame.len() - 2];
            let sum_before_crc = byte_sum(&body[..body.len() - 2]);
            let crc = hex_u8(body[body.len() - 2], body[body.len() - 1]);
            assert_eq!(sum_before_crc.wrapping_add(crc), 0);

            let decoded = decode(&frame).unwrap();
            assert_eq!(decoded.kind, kind);
            assert_eq!(decoded.subtype, subtype);
            assert_eq!(decoded.data, data);
        }
    }

    #[test]
    fn test_decode_real_time_response() {
        let data = expect(ResponseTag::REAL_TIME, b"16RR0059107251205110006E\r\n").unwrap();
        assert_eq!(data, b"0059107251205110");
    }

    #[test]
    fn test_decode_text_description_response() {
        let data = expect(
            ResponseTag::TEXT_DESCRIPTION,
            b"1BSD01001Front DoorKeypad0089\r\n",
        )
        .unwrap();
        assert_eq!(data, b"01001Front DoorKeypad");
    }

    #[test]
    fn test_decode_lowercase_hex() {
        let mut frame = encode(b'R', b'R', b"ABCDEF");
        let crc_at = frame.len() - 4;
        frame[crc_at] = frame[crc_at].to_ascii_lowercase();
        frame[crc_at + 1] = frame[crc_at + 1].to_ascii_lowercase();
        assert!(decode(&frame).is_ok());
    }

    #[test]
    fn test_decode_too_short() {
        assert!(matches!(
            decode(b"06r"),
            Err(ElkError::FrameTooShort { len: 3 })
        ));
        assert!(matches!(
            decode(b"02rr\r\n"),
            Err(ElkError::FrameTooShort { .. })
        ));
    }

    #[test]
    fn test_decode_truncated() {
        assert!(matches!(
            decode(b"16RR00591072"),
            Err(ElkError::FrameTruncated { len: 12, expected: 26 })
        ));
    }

    #[test]
    fn test_decode_bad_reserved() {
        let mut frame = encode(b'Z', b'S', b"0123");
        frame[8] = b'1';
        assert!(matches!(
            decode(&frame),
            Err(ElkError::InvalidReservedBytes { found: [b'1', b'0'] })
        ));
    }

    #[test]
    fn test_decode_data_bit_flip_rejected() {
        let frame = encode(b'S', b'D', b"01001Front DoorKeypad");
        for bit in 0..7 {
            let mut corrupt = frame.clone();
            corrupt[6] ^= 1 << bit;
            assert!(
                matches!(decode(&corrupt), Err(ElkError::ChecksumMismatch { .. })),
                "bit {bit} flip was accepted"
            );
        }
    }

    #[test]
    fn test_decode_bad_terminator() {
        let mut frame = encode(b'R', b'R', b"");
        let end = frame.len();
        frame[end - 1] = b'X';
        assert!(matches!(
            decode(&frame),
            Err(ElkError::InvalidTerminator { .. })
        ));
    }

    #[test]
    fn test_decode_multiple_failures_reports_an_error() {
        let mut frame = encode(b'R', b'R', b"12");
        frame[4] = b'9';
        let end = frame.len();
        frame[end - 2] = b'\n';
        assert!(matches!(
            decode(&frame),
            Err(ElkError::ChecksumMismatch { .. } | ElkError::InvalidTerminator { .. })
        ));
    }

    #[test]
    fn test_non_hex_reads_as_zero() {
        assert_eq!(hex_digit(b'G'), 0);
        assert_eq!(hex_digit(b' '), 0);
        assert_eq!(hex_digit(b'f'), 15);
        assert_eq!(hex_digit(b'A'), 10);
    }

    #[test]
    fn test_expect_wrong_tag() {
        let frame = encode(b'Z', b'D', b"");
        assert!(matches!(
            expect(ResponseTag::ZONE_STATUS, &frame),
            Err(ElkError::UnexpectedResponse { .. })
        ));
    }

    #[test]
    fn test_unsolicited_tag() {
        let frame = encode(b'X', b'K', b"0059107251205110");
        assert!(ResponseTag::UNSOLICITED.is_tag_of(&frame).unwrap());
        assert!(!ResponseTag::ZONE_STATUS.is_tag_of(&frame).unwrap());
        assert!(ResponseTag::UNSOLICITED.is_tag_of(b"0").is_err());
    }
}
