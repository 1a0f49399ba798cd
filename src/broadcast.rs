// src/broadcast.rs
//! Subscriber registry and fan-out of serialized payloads
//!
//! Each vehicle source owns one [`SubscriberRegistry`]. Subscribers are
//! bounded channels drained by their connection task; the registry only ever
//! uses `try_send`, so a slow or dead viewer can never hold up ingestion.
//! A subscriber whose channel is full or closed is dropped on the spot.

use crate::error::Result;
use crate::gps::SourceSnapshot;
use log::{debug, info};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Serialized JSON shared by every subscriber of one broadcast
pub type Payload = Arc<str>;

pub type SubscriberId = u64;

/// Outbound side of one live viewer connection
#[derive(Debug)]
pub struct Subscriber {
    addr: SocketAddr,
    sender: mpsc::Sender<Payload>,
}

impl Subscriber {
    /// Create a subscriber and the receiver its connection task drains.
    /// `capacity` is how many pushes may queue before the viewer is dropped.
    pub fn channel(addr: SocketAddr, capacity: usize) -> (Self, mpsc::Receiver<Payload>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { addr, sender }, receiver)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    fn push(&self, payload: &Payload) -> std::result::Result<(), TrySendError<Payload>> {
        self.sender.try_send(Arc::clone(payload))
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: SubscriberId,
    subscribers: HashMap<SubscriberId, Subscriber>,
    latest: Option<Payload>,
}

/// Live subscribers of one source plus the last snapshot sent to them
#[derive(Debug)]
pub struct SubscriberRegistry {
    label: String,
    inner: Mutex<RegistryInner>,
}

impl SubscriberRegistry {
    pub fn new(source: &str) -> Self {
        Self {
            label: source.to_uppercase(),
            inner: Mutex::new(RegistryInner {
                next_id: 1,
                ..RegistryInner::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        // A panic while holding the lock cannot leave the map half-updated
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a subscriber. If a snapshot has been broadcast already, it is
    /// pushed to the newcomer only.
    pub fn register(&self, subscriber: Subscriber) -> SubscriberId {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        if let Some(latest) = &inner.latest {
            if let Err(e) = subscriber.push(latest) {
                debug!("[{}] could not replay snapshot to {}: {}", self.label, subscriber.addr, e);
            }
        }

        info!(
            "[{}] subscriber {} connected from {} ({} live)",
            self.label,
            id,
            subscriber.addr,
            inner.subscribers.len() + 1
        );
        inner.subscribers.insert(id, subscriber);
        id
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let removed = self.lock().subscribers.remove(&id);
        if let Some(subscriber) = &removed {
            info!("[{}] subscriber {} from {} disconnected", self.label, id, subscriber.addr);
        }
        removed.is_some()
    }

    /// Push the source's merged snapshot and keep it for newcomer replay
    pub fn broadcast_snapshot(&self, snapshot: &SourceSnapshot) -> Result<usize> {
        let payload: Payload = serde_json::to_string(snapshot)?.into();
        Ok(self.fan_out(payload, true))
    }

    /// Serialize `value` once and push it to every open subscriber. Returns
    /// the number of subscribers that accepted the push; any that did not are
    /// removed. The replayed snapshot is left untouched.
    pub fn broadcast<T: Serialize + ?Sized>(&self, value: &T) -> Result<usize> {
        let payload: Payload = serde_json::to_string(value)?.into();
        Ok(self.broadcast_payload(payload))
    }

    /// Push an already serialized payload to every open subscriber
    pub fn broadcast_payload(&self, payload: Payload) -> usize {
        self.fan_out(payload, false)
    }

    fn fan_out(&self, payload: Payload, replay: bool) -> usize {
        let mut inner = self.lock();
        let mut delivered = 0;
        let mut dead = Vec::new();

        for (id, subscriber) in inner.subscribers.iter() {
            if !subscriber.is_open() {
                dead.push(*id);
                continue;
            }
            match subscriber.push(&payload) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    info!("[{}] subscriber {} is not keeping up, dropping it", self.label, id);
                    dead.push(*id);
                }
                Err(TrySendError::Closed(_)) => dead.push(*id),
            }
        }

        for id in dead {
            if inner.subscribers.remove(&id).is_some() {
                debug!("[{}] removed subscriber {}", self.label, id);
            }
        }

        if replay {
            inner.latest = Some(payload);
        }
        delivered
    }

    /// Last snapshot broadcast, replayed to newcomers
    pub fn latest(&self) -> Option<Payload> {
        self.lock().latest.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.lock().subscribers.contains_key(&id)
    }
}
