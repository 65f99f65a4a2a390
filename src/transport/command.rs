// MIT License - Copyright (c) 2021 TJForc
// Request/response exchange over an open panel session

use tracing::{debug, trace};

use crate::constants::CRLF;
use crate::error::Result;
use crate::protocol::{self, Request, ResponseTag, peek_tag};
use crate::transport::session::Session;

/// Send `request` and wait for the frame carrying its expected tag.
///
/// Frames with any other tag (unsolicited `XK` keep-alives, late answers to
/// earlier requests) are discarded. The matching frame is fully decoded and
/// its data returned; read and decode errors propagate unchanged.
pub async fn call(session: &mut Session, request: &Request) -> Result<Vec<u8>> {
    debug!(
        "Sending {:?}, awaiting {}{}",
        String::from_utf8_lossy(&request.bytes[..request.bytes.len().min(4)]),
        request.expected.kind as char,
        request.expected.subtype as char
    );
    session.send(&request.bytes).await?;

    loop {
        let frame = session.read_frame().await?;
        // The M1XEP ends its login banner with a bare CRLF.
        if frame == CRLF.as_bytes() {
            trace!("Skipping empty line");
            continue;
        }
        let (kind, subtype) = peek_tag(&frame)?;
        if request.expected.matches(kind, subtype) {
            return protocol::expect(request.expected, &frame);
        }
        if ResponseTag::UNSOLICITED.matches(kind, subtype) {
            trace!("Skipping unsolicited frame");
        } else {
            debug!(
                "Discarding {}{} frame while awaiting {}{}",
                kind as char,
                subtype as char,
                request.expected.kind as char,
                request.expected.subtype as char
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ElkError;
    use crate::protocol::{Command, encode};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

    fn zone_status_frame() -> Vec<u8> {
        encode(b'Z', b'S', &[b'0'; 208])
    }

    #[tokio::test]
    async fn test_skips_unsolicited_frame() {
        let (client, mut panel) = duplex(1024);
        let mut session = Session::new(Box::new(client), Duration::from_secs(1));

        let mut script = encode(b'X', b'K', b"2636561006101110");
        script.extend(zone_status_frame());
        panel.write_all(&script).await.unwrap();

        let data = call(&mut session, &Command::ZoneStatus.request())
            .await
            .unwrap();
        assert_eq!(data.len(), 208);

        let mut sent = [0u8; 10];
        panel.read_exact(&mut sent).await.unwrap();
        assert_eq!(&sent, b"06zs004D\r\n");
    }

    #[tokio::test]
    async fn test_skips_other_responses() {
        let (client, mut panel) = duplex(1024);
        let mut session = Session::new(Box::new(client), Duration::from_secs(1));

        let mut script = encode(b'R', b'R', b"59107251205110");
        script.extend(b"1BSD01001Front DoorKeypad0089\r\n");
        panel.write_all(&script).await.unwrap();

        let data = call(&mut session, &Command::ZoneName { zone: 1 }.request())
            .await
            .unwrap();
        assert_eq!(data, b"01001Front DoorKeypad");
    }

    #[tokio::test]
    async fn test_skips_blank_line() {
        let (client, mut panel) = duplex(1024);
        let mut session = Session::new(Box::new(client), Duration::from_secs(1));

        let mut script = b"\r\n".to_vec();
        script.extend(encode(b'R', b'R', b"0059107251205110"));
        panel.write_all(&script).await.unwrap();

        let data = call(&mut session, &Command::RealTime.request())
            .await
            .unwrap();
        assert_eq!(data, b"0059107251205110");
    }

    #[tokio::test]
    async fn test_short_frame_is_an_error() {
        let (client, mut panel) = duplex(1024);
        let mut session = Session::new(Box::new(client), Duration::from_secs(1));
        panel.write_all(b"0\r\n").await.unwrap();

        let err = call(&mut session, &Command::RealTime.request())
            .await
            .unwrap_err();
        assert!(matches!(err, ElkError::FrameTooShort { len: 3 }));
    }

    #[tokio::test]
    async fn test_decode_error_propagates() {
        let (client, mut panel) = duplex(1024);
        let mut session = Session::new(Box::new(client), Duration::from_secs(1));
        panel.write_all(b"06ZS004E\r\n").await.unwrap();

        let err = call(&mut session, &Command::ZoneStatus.request())
            .await
            .unwrap_err();
        assert!(matches!(err, ElkError::ChecksumMismatch { .. }));
    }

    #[tokio::test]
    async fn test_eof_propagates() {
        let (client, mut panel) = duplex(1024);
        let mut session = Session::new(Box::new(client), Duration::from_secs(1));
        panel.write_all(&encode(b'X', b'K', b"")).await.unwrap();
        panel.shutdown().await.unwrap();

        let err = call(&mut session, &Command::RealTime.request())
            .await
            .unwrap_err();
        assert!(err.is_eof());
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_panel_times_out() {
        let (client, _panel) = duplex(1024);
        let mut session = Session::new(Box::new(client), Duration::from_millis(250));
        let err = call(&mut session, &Command::RealTime.request())
            .await
            .unwrap_err();
        assert!(matches!(err, ElkError::Timeout { .. }));
    }
}
