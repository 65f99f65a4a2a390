// MIT License - Copyright (c) 2021 TJForc
// Error types for the M1XEP client

use std::fmt;

/// Which layer of the client an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connect, read, write or timeout on the underlying stream.
    Transport,
    /// A frame that could not be decoded or was not the expected response.
    Framing,
    /// The panel was reachable but the login prompt exchange failed.
    Auth,
    /// A decoded payload that does not make sense for the request.
    Domain,
    /// Bad configuration or credentials lookup.
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Transport => "transport",
            Self::Framing => "framing",
            Self::Auth => "auth",
            Self::Domain => "domain",
            Self::Config => "config",
        };
        f.write_str(s)
    }
}

/// Renders a two byte message tag such as `ZS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag(pub u8, pub u8);

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", char::from(self.0), char::from(self.1))
    }
}

/// All errors that can occur in the elk-m1-bridge library.
#[derive(Debug, thiserror::Error)]
pub enum ElkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection timeout: {address}")]
    ConnectionTimeout { address: String },

    #[error("Timeout while {operation}")]
    Timeout { operation: &'static str },

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Message size {len} is too short")]
    FrameTooShort { len: usize },

    #[error("Message size {len} is too short, expected {expected}")]
    FrameTruncated { len: usize, expected: usize },

    #[error("Invalid reserved bytes: {found:?}")]
    InvalidReservedBytes { found: [u8; 2] },

    #[error("Checksum error: {remainder} != 0")]
    ChecksumMismatch { remainder: u8 },

    #[error("Invalid terminator: {found:?}")]
    InvalidTerminator { found: Vec<u8> },

    #[error("Unexpected message type: got '{got}', want '{expected}'")]
    UnexpectedResponse { expected: Tag, got: Tag },

    #[error("Elk-M1XEP login failed{}", for_user(.user))]
    LoginFailed { user: Option<String> },

    #[error("Unexpected number of zones: got {got}, expected {expected}")]
    UnexpectedZoneCount { got: usize, expected: usize },

    #[error("Unexpected response size for {what}: got {got}, expected {expected}")]
    UnexpectedResponseSize {
        what: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("Unexpected zone: got {got}, expected {expected}")]
    ZoneMismatch { expected: u16, got: u16 },

    #[error("Invalid zone number: {zone} (max: {max})")]
    InvalidZone { zone: u32, max: u32 },

    #[error("Invalid timestamp: {details}")]
    InvalidTimestamp { details: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("No credentials for key id: {id}")]
    UnknownCredentials { id: String },
}

/// `std::io::Error` is not `Clone`; a cloned I/O error keeps its kind and
/// message but drops the inner source.
impl Clone for ElkError {
    fn clone(&self) -> Self {
        match self {
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), e.to_string())),
            Self::ConnectionTimeout { address } => Self::ConnectionTimeout {
                address: address.clone(),
            },
            Self::Timeout { operation } => Self::Timeout {
                operation: *operation,
            },
            Self::Tls(reason) => Self::Tls(reason.clone()),
            Self::FrameTooShort { len } => Self::FrameTooShort { len: *len },
            Self::FrameTruncated { len, expected } => Self::FrameTruncated {
                len: *len,
                expected: *expected,
            },
            Self::InvalidReservedBytes { found } => Self::InvalidReservedBytes { found: *found },
            Self::ChecksumMismatch { remainder } => Self::ChecksumMismatch {
                remainder: *remainder,
            },
            Self::InvalidTerminator { found } => Self::InvalidTerminator {
                found: found.clone(),
            },
            Self::UnexpectedResponse { expected, got } => Self::UnexpectedResponse {
                expected: *expected,
                got: *got,
            },
            Self::LoginFailed { user } => Self::LoginFailed { user: user.clone() },
            Self::UnexpectedZoneCount { got, expected } => Self::UnexpectedZoneCount {
                got: *got,
                expected: *expected,
            },
            Self::UnexpectedResponseSize {
                what,
                got,
                expected,
            } => Self::UnexpectedResponseSize {
                what: *what,
                got: *got,
                expected: *expected,
            },
            Self::ZoneMismatch { expected, got } => Self::ZoneMismatch {
                expected: *expected,
                got: *got,
            },
            Self::InvalidZone { zone, max } => Self::InvalidZone {
                zone: *zone,
                max: *max,
            },
            Self::InvalidTimestamp { details } => Self::InvalidTimestamp {
                details: details.clone(),
            },
            Self::Config { reason } => Self::Config {
                reason: reason.clone(),
            },
            Self::UnknownCredentials { id } => Self::UnknownCredentials { id: id.clone() },
        }
    }
}

impl ElkError {
    /// The layer this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ElkError::Io(_)
            | ElkError::ConnectionTimeout { .. }
            | ElkError::Timeout { .. }
            | ElkError::Tls(_) => ErrorKind::Transport,
            ElkError::FrameTooShort { .. }
            | ElkError::FrameTruncated { .. }
            | ElkError::InvalidReservedBytes { .. }
            | ElkError::ChecksumMismatch { .. }
            | ElkError::InvalidTerminator { .. }
            | ElkError::UnexpectedResponse { .. } => ErrorKind::Framing,
            ElkError::LoginFailed { .. } => ErrorKind::Auth,
            ElkError::UnexpectedZoneCount { .. }
            | ElkError::UnexpectedResponseSize { .. }
            | ElkError::ZoneMismatch { .. }
            | ElkError::InvalidZone { .. }
            | ElkError::InvalidTimestamp { .. } => ErrorKind::Domain,
            ElkError::Config { .. } | ElkError::UnknownCredentials { .. } => ErrorKind::Config,
        }
    }

    /// Whether the next operation may succeed on a fresh connection.
    ///
    /// The failed operation itself is never retried by the library.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    /// True when the stream reported end-of-file.
    pub fn is_eof(&self) -> bool {
        matches!(self, ElkError::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }

    pub(crate) fn config(reason: impl Into<String>) -> Self {
        ElkError::Config {
            reason: reason.into(),
        }
    }
}

fn for_user(user: &Option<String>) -> String {
    user.as_ref()
        .map(|u| format!(" for user {u}"))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, ElkError>;
