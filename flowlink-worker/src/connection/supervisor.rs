//! Connection supervisor
//!
//! Owns the shared broker client and its perceived health. Each probe
//! queries the topology; edge transitions between UP and DOWN are broadcast
//! as [`ConnectionEvent`]s.

use flowlink_client::BrokerClient;
use flowlink_core::domain::health::HealthReport;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, error, info, warn};

use super::ClientFactory;
use super::health::evaluate;
use crate::config::BrokerConfig;

/// Capacity of the connection event channel
const EVENT_CAPACITY: usize = 16;

/// Connectivity transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Health went from DOWN to UP
    Established,
    /// Health went from UP to DOWN
    Lost,
}

/// Monitors broker reachability and owns the client handle
pub struct ConnectionSupervisor {
    config: BrokerConfig,
    factory: Arc<dyn ClientFactory>,
    client: RwLock<Option<Arc<dyn BrokerClient>>>,
    health: RwLock<HealthReport>,
    enabled: AtomicBool,
    /// Held for the duration of one probe
    probe_lock: Mutex<()>,
    events: broadcast::Sender<ConnectionEvent>,
}

impl ConnectionSupervisor {
    /// Create a supervisor. Connections start enabled unless the config is lazy.
    pub fn new(config: BrokerConfig, factory: Arc<dyn ClientFactory>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            enabled: AtomicBool::new(config.enabled && !config.lazy_connection),
            config,
            factory,
            client: RwLock::new(None),
            health: RwLock::new(HealthReport::default()),
            probe_lock: Mutex::new(()),
            events,
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Snapshot of the current client, if connected
    pub fn client(&self) -> Option<Arc<dyn BrokerClient>> {
        self.client.read().clone()
    }

    /// Last probed health; DOWN until the first probe completes
    pub fn health(&self) -> HealthReport {
        self.health.read().clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Receive future connectivity transitions
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    /// Probe broker health once
    ///
    /// Returns `None` without probing when another probe is in flight or
    /// connections are disabled.
    pub async fn probe_health(&self) -> Option<HealthReport> {
        let Ok(_guard) = self.probe_lock.try_lock() else {
            debug!("Health probe already in flight, skipping");
            return None;
        };

        if !self.is_enabled() {
            return None;
        }

        let (client, fresh) = match self.client() {
            Some(client) => (client, false),
            None => match self.factory.create(&self.config) {
                Ok(client) => (client, true),
                Err(e) => {
                    warn!("Failed to build broker client: {:#}", e);
                    let report = HealthReport::down_because(format!("Cannot build client: {}", e));
                    return Some(self.transition(report).await);
                }
            },
        };

        let probed = tokio::time::timeout(self.config.default_request_timeout, client.topology()).await;
        let report = match probed {
            Ok(Ok(topology)) => evaluate(&topology),
            Ok(Err(e)) => {
                error!("Failed to fetch broker topology: {:#}", e);
                HealthReport::down_because(e.to_string())
            }
            Err(_) => {
                error!(
                    "Topology request timed out after {:?}",
                    self.config.default_request_timeout
                );
                HealthReport::down_because("Topology request timed out")
            }
        };

        if fresh {
            if report.is_up() {
                *self.client.write() = Some(client);
            } else {
                client.close().await;
            }
        }

        Some(self.transition(report).await)
    }

    /// Record a new health value and act on edge transitions
    async fn transition(&self, report: HealthReport) -> HealthReport {
        let was_up = std::mem::replace(&mut *self.health.write(), report.clone()).is_up();
        debug!("Broker connection is healthy: {}", report.is_up());

        match (was_up, report.is_up()) {
            (true, false) => {
                info!("Connection to broker lost");
                self.discard_client().await;
                self.emit(ConnectionEvent::Lost);
            }
            (false, true) => {
                info!("Connection to broker established");
                self.emit(ConnectionEvent::Established);
            }
            _ => {}
        }

        report
    }

    /// Enable or disable broker connections
    ///
    /// Enabling probes immediately. Disabling closes the client and, if the
    /// connection was up, reports it lost.
    pub async fn switch_connection(&self, enabled: bool) {
        info!("Switching broker connection to {}", enabled);
        self.enabled.store(enabled, Ordering::Release);

        if enabled {
            self.probe_health().await;
        } else {
            let _guard = self.probe_lock.lock().await;
            self.transition(HealthReport::down_because("Broker connection disabled"))
                .await;
            self.discard_client().await;
        }
    }

    /// Close and drop the client. Idempotent.
    pub async fn close(&self) {
        self.discard_client().await;
    }

    async fn discard_client(&self) {
        let client = self.client.write().take();
        if let Some(client) = client {
            client.close().await;
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        if self.events.send(event).is_err() {
            debug!("No listeners for connection event {:?}", event);
        }
    }
}
