// src/gps/mod.rs
//! NMEA parsing and per-source position state

pub mod coordinate;
pub mod data;
pub mod nmea;
pub mod state;

pub use data::{FixKind, ParsedFix, RawSentence, SourceSnapshot};
pub use nmea::{parse_sentence, SkipReason};
pub use state::SourceState;
