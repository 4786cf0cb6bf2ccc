// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! WebSocket transport
//!
//! Framed text-message duplex over TLS. The read side is handed back as a
//! raw stream; buffering and backpressure live at the subscription layer,
//! never here.

use std::time::{Duration, Instant};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::StreamExt;
use nostrkit::RelayUrl;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Write half of the WebSocket
pub type Sink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;
/// Read half of the WebSocket
pub type Stream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Transport error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WebSocket error
    #[error(transparent)]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    /// Timeout while opening the connection
    #[error("connection timeout")]
    Timeout,
}

/// Open a WebSocket connection.
///
/// Returns the split sink/stream pair and the handshake latency.
pub async fn connect(
    url: &RelayUrl,
    timeout: Duration,
) -> Result<(Sink, Stream, Duration), Error> {
    let start: Instant = Instant::now();

    let (stream, _response) = tokio::time::timeout(timeout, connect_async(url.as_str()))
        .await
        .map_err(|_| Error::Timeout)??;

    let latency: Duration = start.elapsed();
    let (sink, stream) = stream.split();

    Ok((sink, stream, latency))
}

pub use tokio_tungstenite::tungstenite::Message;
