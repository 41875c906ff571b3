//! Event-subscription client for the real-time feed.
//!
//! [`FeedClient`] owns at most one WebSocket transport at a time, decodes
//! every inbound frame and fans the decoded value out to all registered
//! observers, in registration order, one frame at a time.
//!
//! Connectivity is reported through [`ConnectionEvent`]s on a broadcast
//! channel ([`FeedClient::subscribe_state`]) rather than only through logs.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};

use super::connection::run_connection;
use super::messages::decode_frame;
use super::subscription::{DispatchReport, ObserverRegistry, SubscriptionId, dispatch};
use crate::config::{WS_SCHEMES, parse_endpoint};
use crate::domain::{ConnectionEvent, ConnectionId, ConnectionState, StateBus};
use crate::error::FeedError;

/// Tunables for a [`FeedClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Upper bound on the WebSocket handshake.
    pub connect_timeout: Duration,
    /// Capacity of the connection-state broadcast channel.
    pub state_channel_capacity: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            state_channel_capacity: 64,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Lifecycle<T> {
    state: ConnectionState,
    /// Transport allowed to drive `state`. `None` once it is terminal.
    active: Option<ConnectionId>,
    observers: ObserverRegistry<T>,
}

/// State shared between a [`FeedClient`] and its transport task.
pub(crate) struct ClientCore<T> {
    lifecycle: Mutex<Lifecycle<T>>,
    state_bus: StateBus,
}

impl<T> ClientCore<T> {
    fn new(state_channel_capacity: usize) -> Self {
        Self {
            lifecycle: Mutex::new(Lifecycle {
                state: ConnectionState::Idle,
                active: None,
                observers: ObserverRegistry::new(),
            }),
            state_bus: StateBus::new(state_channel_capacity),
        }
    }

    /// Makes `id` the active transport and moves to `Connecting`.
    fn begin(&self, id: ConnectionId) -> Result<(), FeedError> {
        let mut lifecycle = lock(&self.lifecycle);
        if let Some(active) = lifecycle.active {
            return Err(FeedError::AlreadyConnected(active));
        }
        let next = lifecycle.state.transition_to(ConnectionState::Connecting)?;
        let previous = std::mem::replace(&mut lifecycle.state, next.clone());
        lifecycle.active = Some(id);
        // Published under the lock so events leave in the order they were applied.
        self.publish(ConnectionEvent::new(id, previous, next));
        Ok(())
    }

    /// Applies a lifecycle event reported for transport `id`.
    ///
    /// Returns `false` if `id` is no longer the active transport or the
    /// transition is illegal; both cases are logged and otherwise ignored.
    pub(crate) fn transition(&self, id: ConnectionId, next: ConnectionState) -> bool {
        let mut lifecycle = lock(&self.lifecycle);
        if lifecycle.active != Some(id) {
            tracing::debug!(connection_id = %id, to = %next, "ignoring event from retired transport");
            return false;
        }
        let next = match lifecycle.state.transition_to(next) {
            Ok(next) => next,
            Err(err) => {
                tracing::warn!(
                    connection_id = %id,
                    kind = err.kind(),
                    error = %err,
                    "rejected connection state transition"
                );
                return false;
            }
        };
        if next.is_terminal() {
            lifecycle.active = None;
        }
        let previous = std::mem::replace(&mut lifecycle.state, next.clone());
        self.publish(ConnectionEvent::new(id, previous, next));
        true
    }

    /// Logs and broadcasts `event`. Never blocks, so it is safe under the
    /// lifecycle lock.
    fn publish(&self, event: ConnectionEvent) {
        tracing::info!(
            connection_id = %event.connection_id,
            from = %event.previous,
            to = %event.current,
            "connection state changed"
        );
        self.state_bus.publish(event);
    }
}

impl<T: DeserializeOwned> ClientCore<T> {
    /// Decodes one frame payload from transport `id` and dispatches it.
    ///
    /// Returns `None` when the frame was dropped: the transport is not the
    /// active open one, or the payload failed to decode.
    pub(crate) fn deliver(&self, id: ConnectionId, payload: &str) -> Option<DispatchReport> {
        let observers = {
            let lifecycle = lock(&self.lifecycle);
            if lifecycle.active != Some(id) || lifecycle.state != ConnectionState::Open {
                tracing::warn!(
                    connection_id = %id,
                    state = %lifecycle.state,
                    "frame arrived on inactive transport; dropped"
                );
                return None;
            }
            lifecycle.observers.snapshot()
        };

        let message = match decode_frame::<T>(payload) {
            Ok(message) => message,
            Err(err) => {
                tracing::error!(
                    connection_id = %id,
                    kind = err.kind(),
                    error = %err,
                    "failed to parse feed frame; dropped"
                );
                return None;
            }
        };

        let report = dispatch(&observers, &message);
        tracing::trace!(
            connection_id = %id,
            delivered = report.delivered,
            failed = report.failed,
            "frame dispatched"
        );
        Some(report)
    }
}

impl<T> fmt::Debug for ClientCore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lifecycle = lock(&self.lifecycle);
        f.debug_struct("ClientCore")
            .field("state", &lifecycle.state)
            .field("active", &lifecycle.active)
            .field("observers", &lifecycle.observers)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct Transport {
    id: ConnectionId,
    shutdown: oneshot::Sender<()>,
}

/// Real-time subscription client for one feed endpoint.
///
/// `T` is the type each frame is decoded into. The default,
/// [`serde_json::Value`], accepts any JSON payload.
///
/// # Lifecycle
///
/// `Idle -> Connecting -> Open -> Closed | Errored`. A new
/// [`connect`](Self::connect) after `Closed` or `Errored` starts a fresh
/// transport with a new [`ConnectionId`]; while a transport is `Connecting`
/// or `Open`, `connect` is rejected with [`FeedError::AlreadyConnected`].
///
/// Dropping the client shuts its transport down.
pub struct FeedClient<T = Value> {
    endpoint: String,
    options: ClientOptions,
    core: Arc<ClientCore<T>>,
    transport: Mutex<Option<Transport>>,
}

impl FeedClient<Value> {
    /// Creates an untyped client for `endpoint` with default options.
    ///
    /// Performs no I/O; see [`FeedClient::connect`].
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_options(endpoint, ClientOptions::default())
    }
}

impl<T> FeedClient<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Creates a client that decodes frames as `T`, with default options.
    #[must_use]
    pub fn typed(endpoint: impl Into<String>) -> Self {
        Self::with_options(endpoint, ClientOptions::default())
    }

    /// Creates a client with explicit options.
    #[must_use]
    pub fn with_options(endpoint: impl Into<String>, options: ClientOptions) -> Self {
        Self {
            endpoint: endpoint.into(),
            options,
            core: Arc::new(ClientCore::new(options.state_channel_capacity)),
            transport: Mutex::new(None),
        }
    }

    /// Returns the endpoint this client connects to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the options this client was built with.
    #[must_use]
    pub const fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Starts a new transport to the endpoint and returns immediately.
    ///
    /// The handshake runs on the ambient tokio runtime; its outcome arrives
    /// as an `Open` or `Errored` [`ConnectionEvent`].
    ///
    /// # Errors
    ///
    /// - [`FeedError::InvalidEndpoint`] if the endpoint is not a `ws`/`wss` URL.
    /// - [`FeedError::NoRuntime`] if called outside a tokio runtime.
    /// - [`FeedError::AlreadyConnected`] if a transport is connecting or open.
    pub fn connect(&self) -> Result<ConnectionId, FeedError> {
        let url = parse_endpoint(&self.endpoint, WS_SCHEMES)?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| FeedError::NoRuntime)?;

        let mut transport = lock(&self.transport);
        let id = ConnectionId::new();
        self.core.begin(id)?;

        let (shutdown, shutdown_rx) = oneshot::channel();
        runtime.spawn(run_connection(
            Arc::clone(&self.core),
            id,
            url,
            self.options.connect_timeout,
            shutdown_rx,
        ));
        // Any previous transport is already terminal.
        *transport = Some(Transport { id, shutdown });

        tracing::info!(connection_id = %id, endpoint = %self.endpoint, "feed connect requested");
        Ok(id)
    }

    /// Registers `observer` to receive every decoded message.
    ///
    /// Observers may be added at any time; they see frames dispatched after
    /// registration. Registering the same callback twice yields two calls
    /// per frame.
    pub fn on_message<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = lock(&self.core.lifecycle).observers.insert(Arc::new(observer));
        tracing::debug!(subscription = %id, "observer registered");
        id
    }

    /// Releases a subscription. Returns `false` if it was already released.
    pub fn remove_observer(&self, id: SubscriptionId) -> bool {
        let removed = lock(&self.core.lifecycle).observers.remove(id);
        if removed {
            tracing::debug!(subscription = %id, "observer released");
        }
        removed
    }

    /// Returns the number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        lock(&self.core.lifecycle).observers.len()
    }

    /// Shuts the current transport down.
    ///
    /// The state moves to `Closed` before this returns, and no observer is
    /// invoked for frames that arrive afterwards. Does nothing when no
    /// transport exists.
    pub fn close(&self) {
        let Some(transport) = lock(&self.transport).take() else {
            tracing::debug!(endpoint = %self.endpoint, "close requested without a transport");
            return;
        };
        self.core.transition(transport.id, ConnectionState::Closed);
        // The task may already have exited on its own.
        let _ = transport.shutdown.send(());
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        lock(&self.core.lifecycle).state.clone()
    }

    /// Returns the id of the transport currently connecting or open.
    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> {
        lock(&self.core.lifecycle).active
    }

    /// Subscribes to future connection state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.core.state_bus.subscribe()
    }
}

impl<T> fmt::Debug for FeedClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedClient")
            .field("endpoint", &self.endpoint)
            .field("options", &self.options)
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}
