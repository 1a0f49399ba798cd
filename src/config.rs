// src/config.rs
//! Pipeline configuration: defaults, JSON file and environment overrides

use crate::error::{Result, TelemetryError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Default depth of each subscriber's outbound queue
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 32;

/// Addresses and labels of one vehicle source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Fixed source label stamped on every snapshot, e.g. "ship"
    pub label: String,
    /// Human vehicle name stamped on every snapshot
    pub vehicle: String,
    #[serde(default = "default_host")]
    pub udp_host: String,
    pub udp_port: u16,
    #[serde(default = "default_host")]
    pub ws_host: String,
    pub ws_port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_subscriber_buffer() -> usize {
    DEFAULT_SUBSCRIBER_BUFFER
}

impl SourceConfig {
    pub fn new(label: &str, vehicle: &str, udp_port: u16, ws_port: u16) -> Self {
        Self {
            label: label.to_string(),
            vehicle: vehicle.to_string(),
            udp_host: default_host(),
            udp_port,
            ws_host: default_host(),
            ws_port,
        }
    }

    pub fn udp_addr(&self) -> String {
        format!("{}:{}", self.udp_host, self.udp_port)
    }

    pub fn ws_addr(&self) -> String {
        format!("{}:{}", self.ws_host, self.ws_port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub sources: Vec<SourceConfig>,
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                SourceConfig::new("ship", "Falkor-too", 12345, 8081),
                SourceConfig::new("rov", "ROV", 12346, 8082),
            ],
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
        }
    }
}

impl PipelineConfig {
    /// Defaults with overrides from the process environment
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load from a JSON file, then apply environment overrides
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            TelemetryError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let mut config: Self = serde_json::from_str(&contents).map_err(|e| {
            TelemetryError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from `lookup`.
    ///
    /// `UDP_HOST`, `WS_HOST` and `SUBSCRIBER_BUFFER` apply globally;
    /// `UDP_PORT_<LABEL>`, `WS_PORT_<LABEL>` and `VEHICLE_<LABEL>` apply to the
    /// source with that label (upper-cased).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let udp_host = lookup("UDP_HOST");
        let ws_host = lookup("WS_HOST");

        for source in &mut self.sources {
            let suffix = source.label.to_uppercase();

            if let Some(host) = &udp_host {
                source.udp_host = host.clone();
            }
            if let Some(host) = &ws_host {
                source.ws_host = host.clone();
            }
            if let Some(port) = lookup(&format!("UDP_PORT_{}", suffix)) {
                source.udp_port = parse_env(&format!("UDP_PORT_{}", suffix), &port)?;
            }
            if let Some(port) = lookup(&format!("WS_PORT_{}", suffix)) {
                source.ws_port = parse_env(&format!("WS_PORT_{}", suffix), &port)?;
            }
            if let Some(vehicle) = lookup(&format!("VEHICLE_{}", suffix)) {
                source.vehicle = vehicle;
            }
        }

        if let Some(buffer) = lookup("SUBSCRIBER_BUFFER") {
            self.subscriber_buffer = parse_env("SUBSCRIBER_BUFFER", &buffer)?;
        }

        Ok(())
    }

    /// Reject configurations no pipeline could run with
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(TelemetryError::Config("no vehicle sources configured".to_string()));
        }
        if self.subscriber_buffer == 0 {
            return Err(TelemetryError::Config("subscriber_buffer must be at least 1".to_string()));
        }

        let mut labels = HashSet::new();
        for source in &self.sources {
            if source.label.trim().is_empty() {
                return Err(TelemetryError::Config("source label must not be empty".to_string()));
            }
            if !labels.insert(source.label.as_str()) {
                return Err(TelemetryError::Config(format!(
                    "duplicate source label '{}'",
                    source.label
                )));
            }
        }
        Ok(())
    }

    pub fn source(&self, label: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.label == label)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| TelemetryError::Config(format!("{}='{}': {}", key, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.sources.len(), 2);

        let ship = config.source("ship").unwrap();
        assert_eq!(ship.vehicle, "Falkor-too");
        assert_eq!(ship.udp_addr(), "0.0.0.0:12345");
        assert_eq!(ship.ws_addr(), "0.0.0.0:8081");

        let rov = config.source("rov").unwrap();
        assert_eq!(rov.vehicle, "ROV");
        assert_eq!(rov.udp_port, 12346);
        assert_eq!(rov.ws_port, 8082);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = PipelineConfig::default();
        config
            .apply_env(env(&[
                ("UDP_HOST", "127.0.0.1"),
                ("UDP_PORT_SHIP", "20000"),
                ("WS_PORT_ROV", "9092"),
                ("VEHICLE_ROV", "SuBastian"),
                ("SUBSCRIBER_BUFFER", "8"),
            ]))
            .unwrap();

        let ship = config.source("ship").unwrap();
        assert_eq!(ship.udp_addr(), "127.0.0.1:20000");
        assert_eq!(ship.ws_port, 8081);

        let rov = config.source("rov").unwrap();
        assert_eq!(rov.udp_host, "127.0.0.1");
        assert_eq!(rov.ws_port, 9092);
        assert_eq!(rov.vehicle, "SuBastian");
        assert_eq!(config.subscriber_buffer, 8);
    }

    #[test]
    fn test_invalid_env_port_fails() {
        let mut config = PipelineConfig::default();
        let err = config.apply_env(env(&[("UDP_PORT_SHIP", "seventy")])).unwrap_err();
        assert!(err.to_string().contains("UDP_PORT_SHIP"));
    }

    #[test]
    fn test_validate_rejects_duplicates_and_empty() {
        let mut config = PipelineConfig::default();
        config.sources.push(SourceConfig::new("ship", "Other", 1, 2));
        assert!(config.validate().is_err());

        config.sources.clear();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.subscriber_buffer = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_shape_with_defaults() {
        let json = r#"{
            "sources": [
                {"label": "auv", "vehicle": "Sentry", "udp_port": 12347, "ws_port": 8087}
            ]
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.subscriber_buffer, DEFAULT_SUBSCRIBER_BUFFER);
        let auv = config.source("auv").unwrap();
        assert_eq!(auv.udp_host, "0.0.0.0");
        assert_eq!(auv.ws_addr(), "0.0.0.0:8087");
    }

    #[test]
    fn test_load_missing_file() {
        let err = PipelineConfig::load_from_file(Path::new("/nonexistent/telemetry.json")).unwrap_err();
        assert!(matches!(err, TelemetryError::Config(_)));
    }
}
