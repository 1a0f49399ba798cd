// src/supervisor.rs
//! Starts and stops one independent pipeline per vehicle source

use crate::{
    broadcast::SubscriberRegistry,
    config::{PipelineConfig, SourceConfig},
    error::{Result, TelemetryError},
    listener::DatagramListener,
    server::SubscriberServer,
};
use log::{error, info};
use std::{net::SocketAddr, sync::Arc};
use tokio::task::JoinHandle;

/// Listener, merger and registry of a single vehicle source, running on
/// their own tasks
pub struct SourcePipeline {
    label: String,
    vehicle: String,
    registry: Arc<SubscriberRegistry>,
    udp_addr: SocketAddr,
    ws_addr: SocketAddr,
    tasks: Vec<JoinHandle<()>>,
}

impl SourcePipeline {
    /// Bind both sockets and spawn the source's tasks. Nothing is spawned
    /// unless both binds succeed.
    pub async fn start(config: &SourceConfig, subscriber_buffer: usize) -> Result<Self> {
        let registry = Arc::new(SubscriberRegistry::new(&config.label));

        let listener = DatagramListener::bind(config, Arc::clone(&registry)).await?;
        let server = SubscriberServer::bind(config, Arc::clone(&registry), subscriber_buffer).await?;
        let udp_addr = listener.local_addr()?;
        let ws_addr = server.local_addr()?;

        let tasks = vec![tokio::spawn(listener.run()), tokio::spawn(server.run())];

        Ok(Self {
            label: config.label.clone(),
            vehicle: config.vehicle.clone(),
            registry,
            udp_addr,
            ws_addr,
            tasks,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn vehicle(&self) -> &str {
        &self.vehicle
    }

    pub fn udp_addr(&self) -> SocketAddr {
        self.udp_addr
    }

    pub fn ws_addr(&self) -> SocketAddr {
        self.ws_addr
    }

    /// Registry of this source. Anything serializable pushed through it
    /// reaches the same viewers as the position snapshots.
    pub fn registry(&self) -> Arc<SubscriberRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().all(|task| !task.is_finished())
    }

    pub fn stop(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Drop for SourcePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Owns every source pipeline. A source that fails to start is reported and
/// left out; the others run regardless.
pub struct PipelineSupervisor {
    pipelines: Vec<SourcePipeline>,
    failures: Vec<TelemetryError>,
}

impl PipelineSupervisor {
    pub async fn start(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;

        let mut pipelines = Vec::new();
        let mut failures = Vec::new();

        for source in &config.sources {
            match SourcePipeline::start(source, config.subscriber_buffer).await {
                Ok(pipeline) => {
                    info!(
                        "[{}] pipeline for {} running (UDP {}, WebSocket {})",
                        source.label.to_uppercase(),
                        source.vehicle,
                        pipeline.udp_addr(),
                        pipeline.ws_addr()
                    );
                    pipelines.push(pipeline);
                }
                Err(e) => {
                    error!("{}", e);
                    failures.push(e);
                }
            }
        }

        Ok(Self {
            pipelines,
            failures,
        })
    }

    pub fn pipelines(&self) -> &[SourcePipeline] {
        &self.pipelines
    }

    pub fn pipeline(&self, label: &str) -> Option<&SourcePipeline> {
        self.pipelines.iter().find(|p| p.label == label)
    }

    pub fn registry(&self, label: &str) -> Option<Arc<SubscriberRegistry>> {
        self.pipeline(label).map(SourcePipeline::registry)
    }

    /// Errors of the sources that could not start
    pub fn failures(&self) -> &[TelemetryError] {
        &self.failures
    }

    pub fn has_running(&self) -> bool {
        self.pipelines.iter().any(SourcePipeline::is_running)
    }

    /// Stop every pipeline
    pub fn shutdown(self) {
        for pipeline in &self.pipelines {
            info!("[{}] stopping pipeline", pipeline.label.to_uppercase());
            pipeline.stop();
        }
    }
}
