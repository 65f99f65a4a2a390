// MIT License - Copyright (c) 2021 TJForc
// Elk M1 panel client over an M1XEP Ethernet module
//
//! # elk-m1-bridge
//!
//! Client for the Elk M1 security panel's ASCII protocol, spoken through an
//! M1XEP module over plain TCP or TLS.
//!
//! The crate provides the frame codec, typed parsers for the panel's
//! responses, the M1XEP login handshake, and an on-demand connection manager
//! that opens the connection lazily, shares it between operations and closes
//! it after a keep-alive interval of inactivity.
//!
//! ## Quick Start
//!
//! ```no_run
//! use elk_m1_bridge::{ElkPanel, M1Config, StaticCredentials};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = M1Config::builder()
//!         .address("192.168.0.251:2101")
//!         .timeout_ms(5000)
//!         .keep_alive_ms(60_000)
//!         .build();
//!
//!     let panel = ElkPanel::from_config(&config, &StaticCredentials::new())?;
//!     for zone in panel.zone_names().await? {
//!         println!("zone {}: {}: {}", zone.zone, zone.definition, zone.name.trim_end());
//!     }
//!     panel.close().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod constants;
pub mod credentials;
pub mod devices;
pub mod error;
pub mod login;
pub mod panel;
pub mod protocol;
pub mod registry;
pub mod transport;

// Re-exports for convenience
pub use config::{M1Config, M1ConfigBuilder, TlsVersion};
pub use constants::{NUM_ZONES, ZoneDefinition};
pub use credentials::{CredentialStore, Credentials, StaticCredentials};
pub use devices::{
    LogicalStatus, PanelTime, PhysicalStatus, ZoneCondition, ZoneDefinitions, ZoneInfo, ZoneState,
    ZoneStatus, ZoneStatusTable,
};
pub use error::{ElkError, ErrorKind, Result};
pub use panel::ElkPanel;
pub use protocol::{Command, Frame, ResponseTag};
pub use transport::{ConnectionState, Connector, PanelStream, BoxedStream};
