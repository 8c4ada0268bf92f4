//! Consumer-facing broadcaster.
//!
//! Consumers connect over WebSocket and receive one JSON object per
//! message. Two triggers feed them:
//!
//! - a periodic task sends the latest cursor snapshot at a fixed interval,
//! - the sampling loop sends discrete gesture events as soon as they fire.
//!
//! Delivery never blocks the sender. Each consumer owns a bounded queue and
//! a consumer whose queue is full or closed is dropped from the registry.

use crate::{
    gestures::{GestureEvent, Mode},
    Error, Result,
};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Cursor position and mode as last published by the sampling loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorSnapshot {
    pub x_pct: f64,
    pub y_pct: f64,
    pub mode: Mode,
}

impl Default for CursorSnapshot {
    fn default() -> Self {
        Self {
            x_pct: 50.0,
            y_pct: 50.0,
            mode: Mode::default(),
        }
    }
}

/// Message sent to consumers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutboundEvent {
    CursorUpdate { x_pct: f64, y_pct: f64, mode: Mode },
    Select { x_pct: f64, y_pct: f64 },
    Click { x_pct: f64, y_pct: f64 },
    Delete { x_pct: f64, y_pct: f64 },
    ModeChange { mode: Mode, x_pct: f64, y_pct: f64 },
}

#[derive(Serialize)]
struct WireMessage<'a> {
    command: &'a str,
    x: String,
    y: String,
}

impl OutboundEvent {
    /// Message for a fired gesture at the given cursor position
    #[must_use]
    pub const fn gesture(event: GestureEvent, x_pct: f64, y_pct: f64) -> Self {
        match event {
            GestureEvent::Select => Self::Select { x_pct, y_pct },
            GestureEvent::Click => Self::Click { x_pct, y_pct },
            GestureEvent::Delete => Self::Delete { x_pct, y_pct },
            GestureEvent::ModeChange(mode) => Self::ModeChange { mode, x_pct, y_pct },
        }
    }

    /// Command name on the wire; cursor updates and mode changes use the mode name
    #[must_use]
    pub fn command(&self) -> &'static str {
        match self {
            Self::CursorUpdate { mode, .. } | Self::ModeChange { mode, .. } => mode.name(),
            Self::Select { .. } => "select",
            Self::Click { .. } => "click",
            Self::Delete { .. } => "delete",
        }
    }

    /// Cursor position carried by the event, in percent
    #[must_use]
    pub fn position(&self) -> (f64, f64) {
        match *self {
            Self::CursorUpdate { x_pct, y_pct, .. }
            | Self::Select { x_pct, y_pct }
            | Self::Click { x_pct, y_pct }
            | Self::Delete { x_pct, y_pct }
            | Self::ModeChange { x_pct, y_pct, .. } => (x_pct, y_pct),
        }
    }

    /// Encode as `{"command": ..., "x": "<pct>", "y": "<pct>"}`
    pub fn to_json(&self) -> Result<String> {
        let (x, y) = self.position();
        let wire = WireMessage {
            command: self.command(),
            x: format!("{x:.2}"),
            y: format!("{y:.2}"),
        };
        Ok(serde_json::to_string(&wire)?)
    }
}

impl From<CursorSnapshot> for OutboundEvent {
    fn from(snapshot: CursorSnapshot) -> Self {
        Self::CursorUpdate {
            x_pct: snapshot.x_pct,
            y_pct: snapshot.y_pct,
            mode: snapshot.mode,
        }
    }
}

pub type ConsumerId = u64;

#[derive(Debug, Default)]
struct RegistryInner {
    consumers: HashMap<ConsumerId, mpsc::Sender<String>>,
    next_id: ConsumerId,
    closed: bool,
}

/// Connected consumers, each with a bounded outbound queue
#[derive(Debug)]
pub struct ConsumerRegistry {
    inner: Mutex<RegistryInner>,
    queue_size: usize,
}

impl ConsumerRegistry {
    #[must_use]
    pub fn new(queue_size: usize) -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
            queue_size: queue_size.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a consumer; `None` once the registry is closed
    pub fn register(&self) -> Option<(ConsumerId, mpsc::Receiver<String>)> {
        let mut inner = self.lock();
        if inner.closed {
            return None;
        }
        let id = inner.next_id;
        inner.next_id += 1;
        let (tx, rx) = mpsc::channel(self.queue_size);
        inner.consumers.insert(id, tx);
        Some((id, rx))
    }

    /// Remove a consumer; returns whether it was registered
    pub fn unregister(&self, id: ConsumerId) -> bool {
        self.lock().consumers.remove(&id).is_some()
    }

    /// Queue `text` for every consumer without waiting
    ///
    /// Consumers with a full or closed queue are removed. Returns the number
    /// of consumers the message was queued for.
    pub fn send_text(&self, text: &str) -> usize {
        let mut inner = self.lock();
        let mut dropped = Vec::new();
        let mut delivered = 0;

        for (&id, tx) in &inner.consumers {
            match tx.try_send(text.to_owned()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("Consumer {id} is not keeping up, dropping it");
                    dropped.push(id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!("Consumer {id} went away");
                    dropped.push(id);
                }
            }
        }

        for id in dropped {
            inner.consumers.remove(&id);
        }
        delivered
    }

    /// Encode and queue an event for every consumer
    pub fn broadcast(&self, event: &OutboundEvent) -> Result<usize> {
        Ok(self.send_text(&event.to_json()?))
    }

    /// Refuse new consumers and drop every queue
    ///
    /// Connection tasks see their queue end, send a close frame and exit.
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        inner.consumers.clear();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().consumers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().consumers.is_empty()
    }
}

/// Handle shared by the sampling loop, the periodic sender and the server
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<ConsumerRegistry>,
}

impl Broadcaster {
    #[must_use]
    pub fn new(queue_size: usize) -> Self {
        Self {
            registry: Arc::new(ConsumerRegistry::new(queue_size)),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ConsumerRegistry> {
        &self.registry
    }

    /// Send a discrete event immediately; logged even with no consumers
    pub fn send_event(&self, event: &OutboundEvent) -> usize {
        let (x, y) = event.position();
        info!("Event {} at ({x:.2}%, {y:.2}%)", event.command());
        match self.registry.broadcast(event) {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!("Failed to encode event: {e}");
                0
            }
        }
    }

    /// Send a cursor update; a no-op when nobody is connected
    pub fn send_cursor(&self, snapshot: CursorSnapshot) -> usize {
        if self.registry.is_empty() {
            return 0;
        }
        match self.registry.broadcast(&snapshot.into()) {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!("Failed to encode cursor update: {e}");
                0
            }
        }
    }

    /// Send the latest snapshot every `interval` until cancelled
    pub async fn run_periodic(
        self,
        snapshot: watch::Receiver<CursorSnapshot>,
        interval: Duration,
        token: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = token.cancelled() => break,
                _ = ticker.tick() => {
                    let current = *snapshot.borrow();
                    self.send_cursor(current);
                }
            }
        }
        debug!("Periodic cursor sender stopped");
    }

    /// Accept WebSocket consumers on `listener` until cancelled
    ///
    /// Cancellation closes the registry, so open connections are told to
    /// close as well.
    pub async fn serve(self, listener: TcpListener, token: CancellationToken) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!("Broadcasting on ws://{addr}");
        }

        let registry = Arc::clone(&self.registry);
        let router = Router::new()
            .route("/", get(upgrade))
            .with_state(Arc::clone(&self.registry));

        axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(async move {
                token.cancelled().await;
                registry.close();
            })
            .await
            .map_err(|e| Error::Server(format!("WebSocket server failed: {e}")))
    }
}

async fn upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(registry): State<Arc<ConsumerRegistry>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_consumer(socket, peer, registry))
}

async fn handle_consumer(mut socket: WebSocket, peer: SocketAddr, registry: Arc<ConsumerRegistry>) {
    let Some((id, mut outbound)) = registry.register() else {
        debug!("Refusing consumer {peer}: shutting down");
        if let Err(e) = socket.send(Message::Close(None)).await {
            debug!("Close to refused consumer {peer} failed: {e}");
        }
        return;
    };
    info!("Consumer {id} connected from {peer} ({} connected)", registry.len());

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            queued = outbound.recv() => match queued {
                Some(text) => {
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        debug!("Send to consumer {id} failed: {e}");
                        break;
                    }
                }
                None => {
                    if let Err(e) = sink.send(Message::Close(None)).await {
                        debug!("Close to consumer {id} failed: {e}");
                    }
                    break;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Consumer {id} read error: {e}");
                    break;
                }
            },
        }
    }

    registry.unregister(id);
    info!("Consumer {id} disconnected ({} connected)", registry.len());
}
