//! Wiring and supervision of the ingestor, autoscaler and API server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use fleetscale_autoscale::Autoscaler;
use fleetscale_ingest::StatusIngestor;
use fleetscale_provider::{FleetInventory, GceProvider, MemoryFleet, NodeProvisioner};
use fleetscale_queue::{AmqpBroker, Broker, MemoryBroker, MessagePublisher, QueueDepthProbe};
use fleetscale_state::{LivenessTracker, SharedClock, TaskMessage, encode_task};

use crate::api::{self, ApiState};
use crate::config::{BrokerConfig, Config, ProviderConfig};

/// One broker seen through the two roles the daemon needs.
#[derive(Clone)]
pub struct BrokerHandle {
    pub broker: Arc<dyn Broker>,
    pub depth: Arc<dyn QueueDepthProbe>,
}

impl BrokerHandle {
    pub fn new<B: Broker + 'static>(broker: Arc<B>) -> Self {
        Self {
            broker: broker.clone(),
            depth: broker,
        }
    }

    pub async fn connect(config: &BrokerConfig) -> anyhow::Result<Self> {
        match config {
            BrokerConfig::Amqp { url } => {
                let broker = AmqpBroker::connect(url)
                    .await
                    .context("failed to connect to broker")?;
                info!("connected to AMQP broker");
                Ok(Self::new(Arc::new(broker)))
            }
            BrokerConfig::Memory => {
                info!("using in-memory broker");
                Ok(Self::new(Arc::new(MemoryBroker::new())))
            }
        }
    }
}

/// One compute backend seen as inventory and provisioner.
#[derive(Clone)]
pub struct FleetHandle {
    pub inventory: Arc<dyn FleetInventory>,
    pub provisioner: Arc<dyn NodeProvisioner>,
}

impl FleetHandle {
    pub fn new<P: FleetInventory + NodeProvisioner + 'static>(fleet: Arc<P>) -> Self {
        Self {
            inventory: fleet.clone(),
            provisioner: fleet,
        }
    }

    pub fn from_config(config: &ProviderConfig, clock: SharedClock) -> Self {
        match config {
            ProviderConfig::Gce(settings) => {
                info!(project = %settings.project, zone = %settings.zone, "using GCE provider");
                Self::new(Arc::new(GceProvider::new(settings.clone())))
            }
            ProviderConfig::Memory => {
                info!("using in-memory fleet");
                Self::new(Arc::new(MemoryFleet::new(clock)))
            }
        }
    }
}

/// The assembled daemon for one labeled pool.
pub struct Daemon {
    label: String,
    tracker: LivenessTracker,
    autoscaler: Arc<Autoscaler>,
    ingestor: Arc<StatusIngestor>,
    broker: Arc<dyn Broker>,
    api: Option<SocketAddr>,
}

impl Daemon {
    /// Connect the configured backends.
    pub async fn connect(config: &Config, clock: SharedClock) -> anyhow::Result<Self> {
        let broker = BrokerHandle::connect(&config.broker).await?;
        let fleet = FleetHandle::from_config(&config.provider, clock.clone());
        Self::assemble(config, broker, fleet, clock)
    }

    /// Build both loops over already-constructed backends.
    pub fn assemble(
        config: &Config,
        broker: BrokerHandle,
        fleet: FleetHandle,
        clock: SharedClock,
    ) -> anyhow::Result<Self> {
        let settings = config.scaler_settings()?;
        let tracker = LivenessTracker::new();

        let autoscaler = Autoscaler::new(
            settings,
            fleet.inventory,
            fleet.provisioner,
            broker.depth,
            tracker.clone(),
        )
        .with_clock(clock.clone());

        let ingestor = StatusIngestor::new(tracker.clone(), clock)
            .with_queue(config.autoscale.status_queue.clone());

        Ok(Self {
            label: config.cluster.label.clone(),
            tracker,
            autoscaler: Arc::new(autoscaler),
            ingestor: Arc::new(ingestor),
            broker: broker.broker,
            api: config.api.as_ref().map(|a| a.listen),
        })
    }

    pub fn tracker(&self) -> &LivenessTracker {
        &self.tracker
    }

    pub fn router(&self) -> Router {
        api::build_router(ApiState {
            label: self.label.clone(),
            tracker: self.tracker.clone(),
        })
    }

    /// Run until `signal` resolves or either loop stops.
    ///
    /// Returns the first loop error, if any.
    pub async fn run_until<F>(self, signal: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(label = %self.label, "fleetscale daemon starting");

        // Bind before any loop starts so a busy port fails fast.
        let listener = match self.api {
            Some(addr) => {
                let listener = tokio::net::TcpListener::bind(addr)
                    .await
                    .with_context(|| format!("failed to bind API listener on {addr}"))?;
                info!(%addr, "API server starting");
                Some(listener)
            }
            None => None,
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shutdown_tx = Arc::new(shutdown_tx);

        let ingestor = self.ingestor.clone();
        let broker = self.broker.clone();
        let rx = shutdown_rx.clone();
        let ingest_handle = spawn_loop("status ingestor", shutdown_tx.clone(), async move {
            ingestor.run(broker.as_ref(), rx).await.map_err(anyhow::Error::from)
        });

        let autoscaler = self.autoscaler.clone();
        let rx = shutdown_rx.clone();
        let autoscale_handle = spawn_loop("autoscaler", shutdown_tx.clone(), async move {
            autoscaler.run(rx).await.map_err(anyhow::Error::from)
        });

        let api_handle = listener.map(|listener| {
            let router = self.router();
            let mut rx = shutdown_rx.clone();
            tokio::spawn(async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        let _ = rx.changed().await;
                    })
                    .await
            })
        });

        let mut stopped = shutdown_rx;
        tokio::select! {
            _ = signal => info!("shutdown signal received"),
            _ = stopped.changed() => {}
        }
        let _ = shutdown_tx.send(true);

        let ingest_result = ingest_handle.await?;
        let autoscale_result = autoscale_handle.await?;
        if let Some(handle) = api_handle {
            handle.await?.context("API server failed")?;
        }

        info!(label = %self.label, "fleetscale daemon stopped");
        ingest_result.and(autoscale_result)
    }
}

/// Spawn a loop that triggers shutdown of its siblings when it returns.
fn spawn_loop<F>(
    name: &'static str,
    shutdown: Arc<watch::Sender<bool>>,
    task: F,
) -> JoinHandle<anyhow::Result<()>>
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let result = task.await.with_context(|| format!("{name} failed"));
        if let Err(e) = &result {
            error!(error = %e, "{name} stopped");
        }
        let _ = shutdown.send(true);
        result
    })
}

/// Publish one task to `queue`.
pub async fn submit_task<P>(publisher: &P, queue: &str, task: &TaskMessage) -> anyhow::Result<()>
where
    P: MessagePublisher + ?Sized,
{
    let body = encode_task(task)?;
    publisher
        .publish(queue, &body)
        .await
        .with_context(|| format!("failed to publish task {}", task.task_id))?;
    info!(task = %task.task_id, %queue, "task submitted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use fleetscale_queue::MessageConsumer;
    use fleetscale_state::{ManualClock, decode_task};

    use super::*;

    #[tokio::test]
    async fn submit_publishes_encoded_task() {
        let broker = MemoryBroker::new();
        let task = TaskMessage {
            task_id: "job-7".to_string(),
            cmdline: "render --frame 7".to_string(),
        };

        submit_task(&broker, "tasks", &task).await.unwrap();
        assert_eq!(broker.depth("tasks").await.unwrap(), 1);

        let mut consumer = broker.consume("tasks", 1).await.unwrap();
        let delivery = consumer.next_delivery().await.unwrap().unwrap();
        assert_eq!(decode_task(&delivery.body).unwrap(), task);
        delivery.ack().await.unwrap();
    }

    #[tokio::test]
    async fn submit_fails_on_closed_broker() {
        let broker = MemoryBroker::new();
        broker.close();
        let task = TaskMessage {
            task_id: "job-8".to_string(),
            cmdline: "true".to_string(),
        };
        assert!(submit_task(&broker, "tasks", &task).await.is_err());
    }

    #[tokio::test]
    async fn memory_backends_connect_from_config() {
        let config = Config::from_toml_str(
            r#"
            [cluster]
            label = "batch"
            [autoscale]
            idle_timeout = "30s"
            [broker]
            kind = "memory"
            [provider]
            kind = "memory"
            "#,
        )
        .unwrap();

        let daemon = Daemon::connect(&config, Arc::new(ManualClock::new(0)))
            .await
            .unwrap();
        assert!(daemon.tracker().is_empty().await);
        assert!(daemon.api.is_none());
    }

    #[tokio::test]
    async fn busy_api_port_fails_before_loops_start() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();
        let config = Config::from_toml_str(&format!(
            r#"
            [cluster]
            label = "batch"
            [autoscale]
            idle_timeout = "30s"
            poll_interval = "10ms"
            [broker]
            kind = "memory"
            [provider]
            kind = "memory"
            [api]
            listen = "{addr}"
            "#
        ))
        .unwrap();

        let clock = Arc::new(ManualClock::new(0));
        let broker = Arc::new(MemoryBroker::new());
        broker.publish("status", b"{}").await.unwrap();
        let daemon = Daemon::assemble(
            &config,
            BrokerHandle::new(broker.clone()),
            FleetHandle::new(Arc::new(MemoryFleet::new(clock.clone()))),
            clock,
        )
        .unwrap();

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            daemon.run_until(std::future::pending()),
        )
        .await
        .expect("daemon did not return");
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("failed to bind"), "{err:#}");

        // The ingestor never ran, so the status message is untouched.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(broker.depth("status").await.unwrap(), 1);
        assert_eq!(broker.unacked_count("status"), 0);
    }
}
