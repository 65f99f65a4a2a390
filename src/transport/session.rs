// MIT License - Copyright (c) 2021 TJForc
// Buffered byte-stream session shared by the login and RPC layers

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::constants::CRLF;
use crate::error::{ElkError, Result};
use crate::transport::BoxedStream;

/// An open connection to the panel.
///
/// Every read and write is bounded by the request timeout, so a silent
/// panel surfaces as [`ElkError::Timeout`] rather than a hung caller.
pub struct Session {
    stream: BufReader<BoxedStream>,
    timeout: Duration,
}

impl Session {
    pub fn new(stream: BoxedStream, timeout: Duration) -> Self {
        Self {
            stream: BufReader::new(stream),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Write `data` to the panel.
    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        trace!("send: {:?}", String::from_utf8_lossy(data));
        self.write(data).await
    }

    /// Write `data` without ever logging its content.
    pub async fn send_sensitive(&mut self, data: &[u8]) -> Result<()> {
        trace!("send: <redacted {} bytes>", data.len());
        self.write(data).await
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let stream = &mut self.stream;
        let write = async {
            stream.write_all(data).await?;
            stream.flush().await
        };
        timeout(self.timeout, write)
            .await
            .map_err(|_| ElkError::Timeout {
                operation: "writing to the panel",
            })?
            .map_err(ElkError::Io)
    }

    /// Read until the data read so far ends with one of `delims`.
    ///
    /// The returned bytes include the delimiter. End of stream is reported
    /// as an `UnexpectedEof` I/O error.
    pub async fn read_until(&mut self, delims: &[&str]) -> Result<Vec<u8>> {
        let stream = &mut self.stream;
        let read = async {
            let mut buf = Vec::new();
            loop {
                buf.push(stream.read_u8().await?);
                if delims.iter().any(|d| buf.ends_with(d.as_bytes())) {
                    return Ok::<_, std::io::Error>(buf);
                }
            }
        };
        let buf = timeout(self.timeout, read)
            .await
            .map_err(|_| ElkError::Timeout {
                operation: "reading from the panel",
            })??;
        trace!("recv: {:?}", String::from_utf8_lossy(&buf));
        Ok(buf)
    }

    /// Read one CRLF terminated frame.
    pub async fn read_frame(&mut self) -> Result<Vec<u8>> {
        self.read_until(&[CRLF]).await
    }

    /// Shut down the write side and drop the stream.
    pub async fn close(mut self) -> Result<()> {
        debug!("Closing panel session");
        match timeout(self.timeout, self.stream.shutdown()).await {
            Ok(res) => res.map_err(ElkError::Io),
            Err(_) => Err(ElkError::Timeout {
                operation: "closing the connection",
            }),
        }
    }
}
