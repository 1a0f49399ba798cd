// src/listener.rs
//! UDP datagram listener for one vehicle source

use crate::{
    broadcast::SubscriberRegistry,
    config::SourceConfig,
    error::{Result, TelemetryError},
    gps::{nmea, RawSentence, SourceState},
};
use log::{debug, error, info, warn};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::UdpSocket;

/// Largest UDP payload, so a datagram is never cut short
const MAX_DATAGRAM: usize = 65_536;

/// Turns datagram payloads into merges and broadcasts for one source.
///
/// Holds the source's only [`SourceState`]; the socket loop owns this value
/// so every merge happens on a single task.
pub struct SentenceIngest {
    state: SourceState,
    registry: Arc<SubscriberRegistry>,
    label: String,
}

impl SentenceIngest {
    pub fn new(state: SourceState, registry: Arc<SubscriberRegistry>) -> Self {
        let label = state.source().to_uppercase();
        Self {
            state,
            registry,
            label,
        }
    }

    pub fn state(&self) -> &SourceState {
        &self.state
    }

    /// Process every sentence in one datagram, in payload order. Returns the
    /// number of sentences merged (and broadcast).
    pub fn handle_datagram(&mut self, payload: &[u8], from: SocketAddr) -> usize {
        let text = String::from_utf8_lossy(payload);
        debug!("[{}] received {} bytes from {}", self.label, payload.len(), from);

        let mut merged = 0;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || !line.starts_with(nmea::START_MARKER) {
                continue;
            }
            if self.handle_sentence(RawSentence::new(line, from)) {
                merged += 1;
            }
        }
        merged
    }

    /// Parse, merge and broadcast one sentence. Returns false if the sentence
    /// was skipped.
    pub fn handle_sentence(&mut self, sentence: RawSentence) -> bool {
        debug!("[{}] parsing sentence: {}", self.label, sentence.text);

        let fix = match nmea::parse_sentence(&sentence.text) {
            Ok(fix) => fix,
            Err(reason) => {
                debug!("[{}] skipped '{}': {}", self.label, sentence.text, reason);
                return false;
            }
        };

        let snapshot = self.state.merge(&fix, &sentence);
        match fix.position() {
            Some((lat, lon)) => info!(
                "[{}] GPS update: {} - Lat: {:.6}, Lon: {:.6}",
                self.label,
                fix.kind(),
                lat,
                lon
            ),
            None => info!("[{}] GPS update: {}", self.label, fix.kind()),
        }

        match self.registry.broadcast_snapshot(snapshot) {
            Ok(delivered) => debug!("[{}] pushed snapshot to {} subscriber(s)", self.label, delivered),
            Err(e) => warn!("[{}] could not serialize snapshot: {}", self.label, e),
        }
        true
    }
}

/// A bound UDP socket feeding a [`SentenceIngest`]
pub struct DatagramListener {
    socket: UdpSocket,
    ingest: SentenceIngest,
}

impl DatagramListener {
    /// Bind the source's UDP address. A failure here is fatal for this
    /// source only and is returned to the caller.
    pub async fn bind(config: &SourceConfig, registry: Arc<SubscriberRegistry>) -> Result<Self> {
        let addr = config.udp_addr();
        let socket = UdpSocket::bind(addr.as_str())
            .await
            .map_err(|e| TelemetryError::bind(&config.label, &addr, e))?;

        info!(
            "[{}] UDP GPS listener started on {}",
            config.label.to_uppercase(),
            socket.local_addr()?
        );

        let state = SourceState::new(&config.label, &config.vehicle);
        Ok(Self {
            socket,
            ingest: SentenceIngest::new(state, registry),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive datagrams until the task is aborted
    pub async fn run(mut self) {
        let mut buffer = vec![0u8; MAX_DATAGRAM];

        loop {
            match self.socket.recv_from(&mut buffer).await {
                Ok((len, from)) => {
                    self.ingest.handle_datagram(&buffer[..len], from);
                }
                Err(e) => {
                    error!("[{}] error receiving datagram: {}", self.ingest.label, e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}
