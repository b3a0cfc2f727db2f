//! Per-socket connection handle
//!
//! A [`Connection`] decouples one WebSocket into an inbound stream of decoded
//! client messages and a bounded outbound queue. The socket itself is driven
//! by two tasks spawned through [`ConnectionIo::spawn`]; rooms and the hub
//! only ever see the `Arc<Connection>`.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::util::rate_limit::RateLimit;
use crate::util::signal::CancelSignal;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Outbound queue depth per connection
pub const SEND_BUFFER: usize = 64;
/// Decoded inbound messages waiting for a room
pub const RECV_BUFFER: usize = 64;
/// Deadline for a single socket write
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection errors
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("WebSocket transport error: {0}")]
    Transport(#[from] axum::Error),

    #[error("Write deadline exceeded")]
    Timeout,
}

/// Shared handle to one connected client
pub struct Connection {
    pub id: String,
    pub ip: IpAddr,
    nickname: Mutex<String>,
    outbound: mpsc::Sender<String>,
    inbound: Mutex<Option<mpsc::Receiver<ClientMsg>>>,
    closed: CancelSignal,
    close_frame: Mutex<Option<(u16, &'static str)>>,
}

/// Socket-facing ends of a connection's queues
pub struct ConnectionIo {
    outbound_rx: mpsc::Receiver<String>,
    inbound_tx: mpsc::Sender<ClientMsg>,
}

impl Connection {
    pub fn new(id: String, ip: IpAddr, nickname: String) -> (Arc<Self>, ConnectionIo) {
        let (outbound, outbound_rx) = mpsc::channel(SEND_BUFFER);
        let (inbound_tx, inbound_rx) = mpsc::channel(RECV_BUFFER);

        let conn = Arc::new(Self {
            id,
            ip,
            nickname: Mutex::new(nickname),
            outbound,
            inbound: Mutex::new(Some(inbound_rx)),
            closed: CancelSignal::new(),
            close_frame: Mutex::new(None),
        });

        (
            conn,
            ConnectionIo {
                outbound_rx,
                inbound_tx,
            },
        )
    }

    pub fn nickname(&self) -> String {
        self.nickname.lock().clone()
    }

    pub fn set_nickname(&self, nickname: String) {
        *self.nickname.lock() = nickname;
    }

    /// Encode and queue a message
    pub fn send(&self, msg: &ServerMsg, tick: u32) -> bool {
        match msg.encode(tick) {
            Ok(text) => self.send_text(text),
            Err(e) => {
                error!(conn_id = %self.id, error = %e, "Failed to encode message");
                false
            }
        }
    }

    /// Queue an already encoded frame without waiting.
    ///
    /// A full queue drops the frame; the next state broadcast supersedes it.
    pub fn send_text(&self, text: String) -> bool {
        if self.is_closed() {
            return false;
        }
        match self.outbound.try_send(text) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(conn_id = %self.id, "Send buffer full, dropping message");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Hand the inbound stream to its consumer. Only the first caller gets it.
    pub fn take_inbound(&self) -> Option<mpsc::Receiver<ClientMsg>> {
        self.inbound.lock().take()
    }

    /// Close normally. Idempotent; returns true for the call that closed.
    pub fn close(&self) -> bool {
        self.close_with(close_code::NORMAL, "")
    }

    /// Refuse the client because the server is at capacity
    pub fn reject(&self) -> bool {
        self.close_with(close_code::AGAIN, "server full")
    }

    fn close_with(&self, code: u16, reason: &'static str) -> bool {
        {
            let mut frame = self.close_frame.lock();
            if frame.is_none() {
                *frame = Some((code, reason));
            }
        }
        let first = self.closed.cancel();
        if first {
            debug!(conn_id = %self.id, code, "Connection closing");
        }
        first
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the connection is closed
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }

    fn close_frame(&self) -> CloseFrame<'static> {
        let frame = *self.close_frame.lock();
        let (code, reason) = frame.unwrap_or((close_code::NORMAL, ""));
        CloseFrame {
            code,
            reason: reason.into(),
        }
    }

    /// Rate-limit and decode one inbound frame. Rejects are dropped silently.
    fn admit_inbound(&self, text: &str, limiter: Option<&dyn RateLimit>) -> Option<ClientMsg> {
        if let Some(limiter) = limiter {
            if !limiter.message_allowed(self.ip) {
                return None;
            }
        }
        match ClientMsg::decode(text) {
            Ok(msg) => Some(msg),
            Err(e) => {
                debug!(conn_id = %self.id, error = %e, "Dropping inbound message");
                None
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("ip", &self.ip)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl ConnectionIo {
    /// Drive `socket` with a reader task and a writer task
    pub fn spawn(self, conn: Arc<Connection>, socket: WebSocket, limiter: Option<Arc<dyn RateLimit>>) {
        let (sink, stream) = socket.split();
        let Self {
            outbound_rx,
            inbound_tx,
        } = self;

        tokio::spawn(read_loop(conn.clone(), stream, inbound_tx, limiter));
        tokio::spawn(write_loop(conn, sink, outbound_rx));
    }
}

async fn read_loop(
    conn: Arc<Connection>,
    mut stream: SplitStream<WebSocket>,
    inbound_tx: mpsc::Sender<ClientMsg>,
    limiter: Option<Arc<dyn RateLimit>>,
) {
    loop {
        let frame = tokio::select! {
            biased;
            _ = conn.closed() => break,
            frame = stream.next() => frame,
        };

        let text = match frame {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => continue,
            },
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | None => {
                debug!(conn_id = %conn.id, "Client closed connection");
                break;
            }
            Some(Err(e)) => {
                debug!(conn_id = %conn.id, error = %e, "WebSocket read error");
                break;
            }
        };

        if let Some(msg) = conn.admit_inbound(&text, limiter.as_deref()) {
            // Nobody draining yet, or draining too slowly
            if let Err(TrySendError::Full(_)) = inbound_tx.try_send(msg) {
                debug!(conn_id = %conn.id, "Inbound queue full, dropping message");
            }
        }
    }

    conn.close();
}

async fn write_loop(
    conn: Arc<Connection>,
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<String>,
) {
    loop {
        let text = tokio::select! {
            biased;
            Some(text) = outbound_rx.recv() => text,
            _ = conn.closed() => break,
        };
        if let Err(e) = write_frame(&mut sink, Message::Text(text)).await {
            warn!(conn_id = %conn.id, error = %e, "WebSocket write failed");
            conn.close();
            return;
        }
    }

    // Flush what was queued before the close
    while let Ok(text) = outbound_rx.try_recv() {
        if write_frame(&mut sink, Message::Text(text)).await.is_err() {
            return;
        }
    }

    let frame = conn.close_frame();
    let _ = write_frame(&mut sink, Message::Close(Some(frame))).await;
}

async fn write_frame(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: Message,
) -> Result<(), ConnectionError> {
    timeout(WRITE_TIMEOUT, sink.send(msg))
        .await
        .map_err(|_| ConnectionError::Timeout)??;
    Ok(())
}

#[cfg(test)]
impl ConnectionIo {
    /// Frames the writer task would have sent
    pub fn drain_outbound(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(text) = self.outbound_rx.try_recv() {
            frames.push(text);
        }
        frames
    }

    /// Pretend the reader task decoded `msg`
    pub fn push_inbound(&self, msg: ClientMsg) {
        let _ = self.inbound_tx.try_send(msg);
    }
}
