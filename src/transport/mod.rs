// MIT License - Copyright (c) 2021 TJForc
// Transport abstractions

pub mod command;
pub mod direct;
pub mod manager;
pub mod session;

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;

pub use direct::{PlainConnector, TlsConnector};
pub use manager::{ConnectionManager, ConnectionState, SessionGuard};
pub use session::Session;

/// A bidirectional byte stream to the panel (TCP, TLS or in-memory).
pub trait PanelStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> PanelStream for T {}

pub type BoxedStream = Box<dyn PanelStream>;

/// Opens a new byte stream to the panel.
///
/// Implementations must bound their own connect time; the manager calls
/// [`Connector::open`] whenever it needs a fresh transport.
pub trait Connector: Send + Sync + 'static {
    fn open(&self) -> impl Future<Output = Result<BoxedStream>> + Send;

    /// Human readable target, used in log messages.
    fn describe(&self) -> String;
}
