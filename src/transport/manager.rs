// MIT License - Copyright (c) 2021 TJForc
// On-demand connection lifecycle: lazy connect, reuse, idle close, reconnect

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until, timeout};
use tracing::{debug, info, warn};

use crate::credentials::Credentials;
use crate::error::{ElkError, Result};
use crate::login::login;
use crate::protocol::Command;
use crate::transport::command::call;
use crate::transport::session::Session;
use crate::transport::Connector;

/// Lifecycle state of the managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closing => "closing",
        };
        f.write_str(s)
    }
}

struct Slot {
    session: Option<Session>,
    /// Bumped on every successful connect so a stale idle task can tell
    /// that the connection it was armed for is gone.
    generation: u64,
    last_used: Instant,
    idle: Option<JoinHandle<()>>,
    /// Outcome of the latest connect attempt when it failed, tagged with its
    /// position in `Shared::finished`.
    failed: Option<(u64, ElkError)>,
}

struct Shared<C> {
    connector: C,
    credentials: Option<Credentials>,
    timeout: Duration,
    keep_alive: Duration,
    slot: Arc<Mutex<Slot>>,
    state: Arc<watch::Sender<ConnectionState>>,
    /// Count of connect attempts that have run to completion. Only written
    /// with the slot locked.
    finished: AtomicU64,
}

/// Owns at most one live panel connection and lends it out one exchange at
/// a time.
///
/// The connection is opened (and logged in) on first use, reused while it
/// is active, closed by a background task once it has been idle for the
/// keep-alive interval, and dropped after any transport failure so that the
/// next borrow reconnects.
pub struct ConnectionManager<C: Connector> {
    shared: Arc<Shared<C>>,
}

impl<C: Connector> ConnectionManager<C> {
    /// `credentials` of `None` skips the login handshake.
    pub fn new(
        connector: C,
        credentials: Option<Credentials>,
        timeout: Duration,
        keep_alive: Duration,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                connector,
                credentials,
                timeout,
                keep_alive,
                slot: Arc::new(Mutex::new(Slot {
                    session: None,
                    generation: 0,
                    last_used: Instant::now(),
                    idle: None,
                    failed: None,
                })),
                state: Arc::new(state),
                finished: AtomicU64::new(0),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Borrow the connection, opening it first if needed.
    ///
    /// Borrowers are serialized; concurrent callers queue behind a single
    /// connect attempt and share its outcome. Connect and login failures are
    /// returned without retry.
    pub async fn session(&self) -> Result<SessionGuard> {
        let seen = self.shared.finished.load(Ordering::SeqCst);
        let mut slot = self.shared.slot.clone().lock_owned().await;

        if slot.session.is_some() && slot.last_used.elapsed() >= self.shared.keep_alive {
            debug!("Connection idle past keep-alive, reopening");
            if let Err(e) = self.shared.teardown(&mut slot).await {
                debug!("Error closing idle connection: {}", e);
            }
        }
        if slot.session.is_none() {
            // An attempt that failed while we were queued answers for us too.
            if let Some((attempt, err)) = &slot.failed {
                if *attempt > seen {
                    debug!("Sharing failed connect attempt: {}", err);
                    return Err(err.clone());
                }
            }
            self.shared.connect(&mut slot).await?;
        }

        Ok(SessionGuard {
            slot,
            state: self.shared.state.clone(),
            clean: true,
        })
    }

    /// Close the connection if one is open.
    pub async fn close(&self) -> Result<()> {
        let mut slot = self.shared.slot.lock().await;
        self.shared.teardown(&mut slot).await
    }
}

impl<C: Connector> Shared<C> {
    async fn connect(self: &Arc<Self>, slot: &mut Slot) -> Result<()> {
        let attempt = Attempt::start(&self.state);
        let result = self.establish().await;
        let id = self.finished.fetch_add(1, Ordering::SeqCst) + 1;
        let session = match result {
            Ok(session) => session,
            Err(e) => {
                slot.failed = Some((id, e.clone()));
                return Err(e);
            }
        };
        attempt.finish();

        slot.failed = None;
        slot.session = Some(session);
        slot.generation = slot.generation.wrapping_add(1);
        slot.last_used = Instant::now();
        self.arm_idle(slot);
        self.state.send_replace(ConnectionState::Connected);
        info!("Connected to panel at {}", self.connector.describe());
        Ok(())
    }

    async fn establish(&self) -> Result<Session> {
        let stream = timeout(self.timeout, self.connector.open())
            .await
            .map_err(|_| ElkError::ConnectionTimeout {
                address: self.connector.describe(),
            })?
            .inspect_err(|e| warn!("Failed to open {}: {}", self.connector.describe(), e))?;

        let mut session = Session::new(stream, self.timeout);
        if let Some(credentials) = &self.credentials {
            login(&mut session, credentials)
                .await
                .inspect_err(|e| warn!("Login failed: {}", e))?;
        }
        Ok(session)
    }

    fn arm_idle(self: &Arc<Self>, slot: &mut Slot) {
        if let Some(handle) = slot.idle.take() {
            handle.abort();
        }
        let weak = Arc::downgrade(self);
        let generation = slot.generation;
        let keep_alive = self.keep_alive;
        let deadline = slot.last_used + keep_alive;
        slot.idle = Some(tokio::spawn(idle_watch(weak, generation, deadline)));
    }

    async fn teardown(&self, slot: &mut Slot) -> Result<()> {
        if let Some(handle) = slot.idle.take() {
            handle.abort();
        }
        let result = match slot.session.take() {
            Some(session) => {
                self.state.send_replace(ConnectionState::Closing);
                info!("Closing connection to {}", self.connector.describe());
                session.close().await
            }
            None => Ok(()),
        };
        self.state.send_replace(ConnectionState::Disconnected);
        result
    }
}

/// Close the connection of `generation` once it has been unused for the
/// keep-alive interval. Each release pushes the deadline out; the task ends
/// when the connection is replaced or the manager is dropped.
async fn idle_watch<C: Connector>(weak: Weak<Shared<C>>, generation: u64, mut deadline: Instant) {
    loop {
        sleep_until(deadline).await;
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let mut slot = shared.slot.lock().await;
        if slot.generation != generation || slot.session.is_none() {
            return;
        }
        let due = slot.last_used + shared.keep_alive;
        if Instant::now() < due {
            deadline = due;
            continue;
        }
        debug!("Connection idle for {:?}", shared.keep_alive);
        // Detach our own handle so teardown does not abort this task.
        slot.idle = None;
        if let Err(e) = shared.teardown(&mut slot).await {
            debug!("Error closing idle connection: {}", e);
        }
        return;
    }
}

impl<C> Drop for Shared<C> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.slot.try_lock() {
            if let Some(handle) = slot.idle.take() {
                handle.abort();
            }
        }
    }
}

/// Publishes `Connecting` and falls back to `Disconnected` unless the
/// attempt completes, including when the connect future is dropped.
struct Attempt<'a> {
    state: &'a watch::Sender<ConnectionState>,
    done: bool,
}

impl<'a> Attempt<'a> {
    fn start(state: &'a watch::Sender<ConnectionState>) -> Self {
        state.send_replace(ConnectionState::Connecting);
        Self { state, done: false }
    }

    fn finish(mut self) {
        self.done = true;
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.state.send_replace(ConnectionState::Disconnected);
        }
    }
}

/// Exclusive use of the connection for one or more exchanges.
///
/// Releasing the guard after successful exchanges (or after framing and
/// domain errors, which leave the stream line aligned) keeps the connection
/// and restarts its idle timer. Releasing it after a transport error, or
/// dropping it mid-exchange, discards the connection.
pub struct SessionGuard {
    slot: OwnedMutexGuard<Slot>,
    state: Arc<watch::Sender<ConnectionState>>,
    clean: bool,
}

impl SessionGuard {
    /// Run one request/response exchange and return the response data.
    pub async fn call(&mut self, command: &Command) -> Result<Vec<u8>> {
        let Some(session) = self.slot.session.as_mut() else {
            return Err(ElkError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "panel connection is closed",
            )));
        };
        self.clean = false;
        let result = call(session, &command.request()).await;
        self.clean = match &result {
            Ok(_) => true,
            Err(e) => !e.is_retryable(),
        };
        result
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.clean {
            self.slot.last_used = Instant::now();
            return;
        }
        if let Some(handle) = self.slot.idle.take() {
            handle.abort();
        }
        if self.slot.session.take().is_some() {
            warn!("Discarding panel connection after failed or interrupted exchange");
        }
        self.state.send_replace(ConnectionState::Disconnected);
    }
}
