// src/lib.rs
//! Vehicle Telemetry Library
//!
//! Receives NMEA position sentences for each vehicle source (ship, ROV, ...)
//! over UDP, merges them into a running per-source snapshot and pushes that
//! snapshot as JSON to every live WebSocket viewer of the source.
//!
//! Each source is an independent pipeline:
//!
//! ```text
//! datagram -> sentences -> ParsedFix -> SourceState::merge -> SubscriberRegistry::broadcast
//! ```

pub mod broadcast;
pub mod config;
pub mod error;
pub mod gps;
pub mod listener;
pub mod server;
pub mod supervisor;

// Re-export main types for convenience
pub use broadcast::{Subscriber, SubscriberRegistry};
pub use config::{PipelineConfig, SourceConfig};
pub use error::{Result, TelemetryError};
pub use gps::{parse_sentence, ParsedFix, SourceSnapshot, SourceState};
pub use supervisor::{PipelineSupervisor, SourcePipeline};
