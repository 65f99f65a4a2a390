// MIT License - Copyright (c) 2021 TJForc
// Public operations on an Elk M1 panel

use tokio::sync::watch;
use tracing::debug;

use crate::config::M1Config;
use crate::credentials::CredentialStore;
use crate::devices::zone::validate_zone;
use crate::devices::{
    PanelTime, ZoneCondition, ZoneDefinitions, ZoneInfo, ZoneState, ZoneStatusTable, parse_time,
    parse_text_description, parse_zone_definitions, parse_zone_status,
};
use crate::error::{ElkError, Result};
use crate::protocol::Command;
use crate::transport::direct::PanelConnector;
use crate::transport::{ConnectionManager, ConnectionState, Connector};

/// The main public API for querying an Elk M1 panel through an M1XEP.
///
/// The connection is opened on the first operation and shared by all
/// subsequent ones until it idles out.
///
/// # Example
///
/// ```no_run
/// use elk_m1_bridge::{ElkPanel, M1Config, StaticCredentials};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = M1Config::builder()
///         .address("192.168.0.251:2601")
///         .tls_version("1.2")
///         .key_id("elk")
///         .build();
///     let credentials = StaticCredentials::new().with("elk", "installer", "1234");
///
///     let panel = ElkPanel::from_config(&config, &credentials)?;
///     let now = panel.get_time().await?;
///     println!("Panel time: {} (dst={})", now.time, now.dst);
///
///     for zone in panel.zone_status().await? {
///         println!("zone {}: {}/{}", zone.zone, zone.physical.as_str(), zone.logical.as_str());
///     }
///     panel.close().await?;
///     Ok(())
/// }
/// ```
pub struct ElkPanel<C: Connector = PanelConnector> {
    manager: ConnectionManager<C>,
}

impl ElkPanel<PanelConnector> {
    /// Build a panel client using the plain or TLS transport selected by
    /// `config`. No connection is made until the first operation.
    pub fn from_config(config: &M1Config, store: &dyn CredentialStore) -> Result<Self> {
        config.validate()?;
        let connector = PanelConnector::from_config(config)?;
        Self::with_connector(connector, config, store)
    }
}

impl<C: Connector> ElkPanel<C> {
    /// Build a panel client over a caller supplied transport.
    ///
    /// Credentials are resolved here so that a missing key fails before any
    /// connection attempt.
    pub fn with_connector(
        connector: C,
        config: &M1Config,
        store: &dyn CredentialStore,
    ) -> Result<Self> {
        let credentials = if config.requires_login() {
            Some(store.resolve(config.key_id())?)
        } else {
            None
        };
        Ok(Self {
            manager: ConnectionManager::new(
                connector,
                credentials,
                config.timeout(),
                config.keep_alive(),
            ),
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.manager.subscribe()
    }

    async fn rpc(&self, command: Command) -> Result<Vec<u8>> {
        let mut session = self.manager.session().await?;
        session.call(&command).await
    }

    /// Read the panel's real time clock.
    pub async fn get_time(&self) -> Result<PanelTime> {
        let data = self.rpc(Command::RealTime).await?;
        parse_time(&data)
    }

    /// Read the definition of every zone.
    pub async fn zone_definitions(&self) -> Result<ZoneDefinitions> {
        let data = self.rpc(Command::ZoneDefinitions).await?;
        parse_zone_definitions(&data)
    }

    /// Read the 16 character name of one zone (padding included).
    pub async fn zone_name(&self, zone: u32) -> Result<String> {
        let command = Command::zone_name(zone)?;
        let data = self.rpc(command).await?;
        let (got, name) = parse_text_description(&data)?;
        if u32::from(got) != zone {
            return Err(ElkError::ZoneMismatch {
                expected: zone as u16,
                got,
            });
        }
        Ok(name)
    }

    /// Name and definition of every zone that is not disabled, in zone order.
    pub async fn zone_names(&self) -> Result<Vec<ZoneInfo>> {
        let defs = self.zone_definitions().await?;
        let mut zones = Vec::new();
        for (zone, definition) in defs.enabled() {
            let name = self.zone_name(u32::from(zone)).await?;
            debug!("Zone {}: {} ({})", zone, name.trim_end(), definition);
            zones.push(ZoneInfo {
                zone,
                name,
                definition,
            });
        }
        Ok(zones)
    }

    /// Read the status of every zone.
    pub async fn zone_status_all(&self) -> Result<ZoneStatusTable> {
        let data = self.rpc(Command::ZoneStatus).await?;
        parse_zone_status(&data)
    }

    /// Status of every configured zone, in zone order.
    pub async fn zone_status(&self) -> Result<Vec<ZoneState>> {
        let table = self.zone_status_all().await?;
        Ok(table.configured().map(ZoneState::from).collect())
    }

    /// Evaluate `condition` against the current status of `zone`.
    pub async fn zone_condition(&self, zone: u32, condition: ZoneCondition) -> Result<bool> {
        let zone = validate_zone(zone)?;
        let table = self.zone_status_all().await?;
        let status = table.get(zone).ok_or(ElkError::InvalidZone {
            zone: u32::from(zone),
            max: crate::constants::NUM_ZONES as u32,
        })?;
        Ok(condition.evaluate(status))
    }

    /// Close the connection. The next operation reconnects.
    pub async fn close(&self) -> Result<()> {
        self.manager.close().await
    }
}
