// MIT License - Copyright (c) 2021 TJForc
// Connection settings for an M1XEP

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::constants::NOT_SET;
use crate::error::{ElkError, Result};

/// TLS protocol version requested for the M1XEP secure port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsVersion {
    /// `"1.2"`
    V1_2,
}

impl TlsVersion {
    /// Parse a configured version; an empty string means no TLS.
    ///
    /// `"1.0"` is rejected: rustls implements TLS 1.2 and later only, so
    /// modules still on TLS 1.0 firmware must use the plain port.
    pub fn parse(s: &str) -> Result<Option<Self>> {
        match s.trim() {
            "" => Ok(None),
            "1.2" => Ok(Some(Self::V1_2)),
            "1.0" => Err(ElkError::config(
                "tls_version \"1.0\" is not supported by the rustls backend; \
                 upgrade the M1XEP firmware and configure \"1.2\"",
            )),
            other => Err(ElkError::config(format!(
                "unsupported tls_version {other:?} (expected \"1.2\")"
            ))),
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1_2 => write!(f, "TLS 1.2"),
        }
    }
}

/// Configuration for connecting to an Elk M1 through an M1XEP.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct M1Config {
    /// Module address as `host:port`
    pub address: String,
    /// Per-request (and connect) timeout in milliseconds
    pub timeout_ms: u64,
    /// Idle interval after which the connection is closed, in milliseconds
    pub keep_alive_ms: u64,
    /// Credential identifier; absent or `not-set` skips the login prompt
    #[serde(default)]
    pub key_id: Option<String>,
    /// `"1.2"` for the secure port; absent or empty is plain TCP
    #[serde(default)]
    pub tls_version: Option<String>,
}

impl Default for M1Config {
    fn default() -> Self {
        Self {
            address: "192.168.0.251:2101".to_string(),
            timeout_ms: 5000,
            keep_alive_ms: 60_000,
            key_id: None,
            tls_version: None,
        }
    }
}

impl M1Config {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> M1ConfigBuilder {
        M1ConfigBuilder::default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }

    /// Credential identifier, `not-set` when none is configured.
    pub fn key_id(&self) -> &str {
        match self.key_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => NOT_SET,
        }
    }

    /// Whether the login handshake runs on connect.
    pub fn requires_login(&self) -> bool {
        self.key_id() != NOT_SET
    }

    pub fn tls_version(&self) -> Result<Option<TlsVersion>> {
        TlsVersion::parse(self.tls_version.as_deref().unwrap_or(""))
    }

    /// Check the settings before connecting.
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(ElkError::config("address must be specified"));
        }
        if !self.address.contains(':') {
            return Err(ElkError::config(format!(
                "address {:?} must be host:port",
                self.address
            )));
        }
        if self.timeout_ms == 0 {
            return Err(ElkError::config("timeout must be specified"));
        }
        if self.keep_alive_ms == 0 {
            return Err(ElkError::config("keep_alive must be specified"));
        }
        self.tls_version()?;
        Ok(())
    }
}

/// Builder for M1Config.
#[derive(Debug, Clone, Default)]
pub struct M1ConfigBuilder {
    config: M1Config,
}

impl M1ConfigBuilder {
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = address.into();
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    pub fn keep_alive_ms(mut self, ms: u64) -> Self {
        self.config.keep_alive_ms = ms;
        self
    }

    pub fn key_id(mut self, id: impl Into<String>) -> Self {
        self.config.key_id = Some(id.into());
        self
    }

    pub fn tls_version(mut self, version: impl Into<String>) -> Self {
        self.config.tls_version = Some(version.into());
        self
    }

    pub fn build(self) -> M1Config {
        self.config
    }
}
