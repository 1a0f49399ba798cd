// src/server.rs
//! WebSocket endpoint that turns viewer connections into registry entries

use crate::{
    broadcast::{Subscriber, SubscriberRegistry},
    config::SourceConfig,
    error::{Result, TelemetryError},
};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Accepts viewer connections for one vehicle source
pub struct SubscriberServer {
    listener: TcpListener,
    registry: Arc<SubscriberRegistry>,
    buffer: usize,
    label: String,
}

impl SubscriberServer {
    pub async fn bind(
        config: &SourceConfig,
        registry: Arc<SubscriberRegistry>,
        buffer: usize,
    ) -> Result<Self> {
        let addr = config.ws_addr();
        let listener = TcpListener::bind(addr.as_str())
            .await
            .map_err(|e| TelemetryError::bind(&config.label, &addr, e))?;

        let label = config.label.to_uppercase();
        info!("[{}] WebSocket: ws://{}", label, listener.local_addr()?);

        Ok(Self {
            listener,
            registry,
            buffer,
            label,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the task is aborted
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let registry = Arc::clone(&self.registry);
                    let label = self.label.clone();
                    let buffer = self.buffer;
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, registry, buffer, &label).await {
                            warn!("[{}] WebSocket error from {}: {}", label, addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("[{}] failed to accept connection: {}", self.label, e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}

/// Drive one viewer: register on connect, forward pushes, unregister on
/// close, error or send failure.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    registry: Arc<SubscriberRegistry>,
    buffer: usize,
    label: &str,
) -> Result<()> {
    let ws = accept_async(stream).await?;
    let (mut sink, mut frames) = ws.split();

    let (subscriber, mut pushes) = Subscriber::channel(addr, buffer);
    let id = registry.register(subscriber);

    let outcome: Result<()> = loop {
        tokio::select! {
            push = pushes.recv() => match push {
                Some(payload) => {
                    if let Err(e) = sink.send(Message::Text(payload.to_string())).await {
                        break Err(e.into());
                    }
                }
                // Registry dropped us (slow consumer) or shut down
                None => break Ok(()),
            },
            incoming = frames.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break Ok(()),
                Some(Ok(Message::Text(text))) => {
                    debug!("[{}] ignoring message from {}: {}", label, addr, text);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(e.into()),
            },
        }
    };

    registry.unregister(id);
    let _ = sink.close().await;
    outcome
}
