//! A single live subscriber connection.
//!
//! Each connection runs two independent loops over the halves of one
//! websocket: the write loop drains the outbound queue filled by the
//! [`Hub`], the read loop consumes inbound frames. Whichever side stops
//! first triggers [`Connection::close`], which runs at most once.

use crate::connection::ConnectionHandle;
use crate::error::Error;
use crate::hub::Hub;
use crate::message::{coalesce, InboundMessage, Payload};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{Sink, SinkExt, Stream, StreamExt};
use log::*;
use std::error::Error as StdError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;

/// Upper bound on queued payloads merged into one text frame.
pub const MAX_COALESCED_PAYLOADS: usize = 256;

/// How long the write loop waits for the close handshake to be flushed.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

pub struct Connection {
    handle: ConnectionHandle,
    hub: Arc<Hub>,
    closed: AtomicBool,
    shutdown: CancellationToken,
}

impl Connection {
    pub fn new(hub: Arc<Hub>, handle: ConnectionHandle) -> Arc<Self> {
        Arc::new(Self {
            handle,
            hub,
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Drive `socket` until both loops have exited.
    pub async fn serve(self: Arc<Self>, socket: WebSocket, outbound: Receiver<Payload>) {
        let (sink, stream) = socket.split();
        self.run(sink, stream, outbound).await;
    }

    /// Spawn the write and read loops over an already split transport and
    /// wait for both to finish.
    pub async fn run<S, R, E>(self: Arc<Self>, sink: S, stream: R, outbound: Receiver<Payload>)
    where
        S: Sink<WsMessage> + Unpin + Send + 'static,
        S::Error: Into<Box<dyn StdError + Send + Sync>> + Send,
        R: Stream<Item = Result<WsMessage, E>> + Unpin + Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync>> + Send + 'static,
    {
        let writer = tokio::spawn(self.clone().write_loop(sink, outbound));
        let reader = tokio::spawn(self.clone().read_loop(stream));

        let (written, read) = tokio::join!(writer, reader);
        if let Err(e) = written.and(read) {
            error!("Connection {} task failed: {e}", self.handle.id.as_str());
            self.close();
        }

        debug!(
            "Connection {} for conversation {} terminated",
            self.handle.id.as_str(),
            self.handle.conversation_id
        );
    }

    /// Write queued payloads to the transport until the queue closes or the
    /// connection is closed from the read side.
    ///
    /// Payloads already waiting when a write starts are coalesced into the same
    /// text frame. Once the queue is closed (the connection was unregistered or
    /// evicted) a close frame is sent. A write still pending at shutdown is
    /// abandoned and the sink dropped, so a peer that stopped reading cannot
    /// hold the connection open.
    pub async fn write_loop<S>(self: Arc<Self>, mut sink: S, mut outbound: Receiver<Payload>)
    where
        S: Sink<WsMessage> + Unpin,
        S::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let mut batch: Vec<Payload> = Vec::new();

        loop {
            let payload = tokio::select! {
                payload = outbound.recv() => payload,
                _ = self.shutdown.cancelled() => None,
            };
            let Some(payload) = payload else { break };

            batch.push(payload);
            while batch.len() < MAX_COALESCED_PAYLOADS {
                match outbound.try_recv() {
                    Ok(payload) => batch.push(payload),
                    Err(_) => break,
                }
            }

            let frame = coalesce(&batch);
            batch.clear();

            let sent = tokio::select! {
                sent = sink.send(WsMessage::Text(frame.into())) => sent,
                _ = self.shutdown.cancelled() => {
                    debug!(
                        "Abandoning pending write to connection {}",
                        self.handle.id.as_str()
                    );
                    return;
                }
            };

            if let Err(e) = sent {
                let err = Error::transport(e);
                warn!("Write to connection {} failed: {err}", self.handle.id.as_str());
                self.close();
                return;
            }
        }

        let closing = async {
            sink.send(WsMessage::Close(None)).await?;
            sink.close().await
        };
        match tokio::time::timeout(CLOSE_TIMEOUT, closing).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let err = Error::transport(e);
                debug!("Close frame to connection {} not sent: {err}", self.handle.id.as_str());
            }
            Err(_) => debug!(
                "Close frame to connection {} timed out",
                self.handle.id.as_str()
            ),
        }

        self.close();
    }

    /// Consume inbound frames until the peer goes away, the transport fails,
    /// or the connection is closed from the write side.
    pub async fn read_loop<R, E>(self: Arc<Self>, mut stream: R)
    where
        R: Stream<Item = Result<WsMessage, E>> + Unpin,
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        loop {
            let frame = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                frame = stream.next() => frame,
            };

            match frame {
                Some(Ok(WsMessage::Text(text))) => self.receive(text.as_str()),
                Some(Ok(WsMessage::Binary(_))) => {
                    warn!(
                        "Discarding binary frame from {} on connection {}",
                        self.handle.subscriber_id,
                        self.handle.id.as_str()
                    );
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    debug!("Connection {} closed by peer", self.handle.id.as_str());
                    break;
                }
                // Ping/pong are answered by the transport
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let err = Error::transport(e);
                    warn!("Read from connection {} failed: {err}", self.handle.id.as_str());
                    break;
                }
            }
        }

        self.close();
    }

    /// Unregister from the hub and stop both loops. Only the first call has an
    /// effect.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.hub.unregister(&self.handle);
        self.shutdown.cancel();
    }

    fn receive(&self, text: &str) {
        match InboundMessage::decode(text) {
            Ok(inbound) => debug!(
                "Received message from {} in conversation {}: {}",
                self.handle.subscriber_id, self.handle.conversation_id, inbound.content
            ),
            Err(e) => warn!(
                "Discarding malformed frame from {} on connection {}: {e}",
                self.handle.subscriber_id,
                self.handle.id.as_str()
            ),
        }
    }
}
