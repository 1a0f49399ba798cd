// src/gps/state.rs
//! Per-source merge of successive fixes into one running snapshot

use super::data::{ParsedFix, RawSentence, SourceSnapshot};

/// Owns the snapshot of a single vehicle source.
///
/// There is exactly one `SourceState` per source and it is owned by that
/// source's listener task, so merges never contend with anything.
#[derive(Debug)]
pub struct SourceState {
    source: String,
    vehicle: String,
    snapshot: Option<SourceSnapshot>,
    merges: u64,
}

impl SourceState {
    pub fn new(source: &str, vehicle: &str) -> Self {
        Self {
            source: source.to_string(),
            vehicle: vehicle.to_string(),
            snapshot: None,
            merges: 0,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn vehicle(&self) -> &str {
        &self.vehicle
    }

    /// Current snapshot, `None` until the first fix is merged
    pub fn snapshot(&self) -> Option<&SourceSnapshot> {
        self.snapshot.as_ref()
    }

    /// Number of fixes merged so far
    pub fn merges(&self) -> u64 {
        self.merges
    }

    /// Fold `fix` into the snapshot and stamp the sentence text, labels and
    /// the time the sentence was received. Fields the fix does not carry keep
    /// their previous values.
    pub fn merge(&mut self, fix: &ParsedFix, sentence: &RawSentence) -> &SourceSnapshot {
        let now = sentence.received_at;
        let snapshot = self.snapshot.get_or_insert_with(|| {
            SourceSnapshot::new(fix.kind(), &self.source, &self.vehicle, &sentence.text, now)
        });

        snapshot.apply(fix);
        snapshot.timestamp = now;
        snapshot.received_at = now;
        snapshot.raw = sentence.text.clone();
        snapshot.source = self.source.clone();
        snapshot.vehicle = self.vehicle.clone();

        self.merges += 1;
        snapshot
    }
}
