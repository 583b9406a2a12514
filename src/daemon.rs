use crate::api::create_router;
use crate::config::NodeConfig;
use crate::kv::{KvServer, Op};
use crate::paxos::{HttpTransport, Paxos};
use crate::paxos_api::create_paxos_router;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

pub struct KvDaemon {
    config: NodeConfig,
    paxos: Arc<Paxos<Op>>,
    server: Arc<KvServer>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl KvDaemon {
    pub fn new(config: NodeConfig) -> Result<Self> {
        config.validate()?;

        info!(
            "Initializing KvDaemon me={} peers={:?}",
            config.me, config.peers
        );

        let backoff = config.backoff.to_backoff_config();
        let transport = HttpTransport::new(config.peers.clone(), config.rpc_timeout())?;
        let paxos = Paxos::new(config.me, config.peers.len(), Arc::new(transport), backoff.clone());
        let server = Arc::new(KvServer::new(paxos.clone(), backoff));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            paxos,
            server,
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn router(&self) -> Router {
        create_router(self.server.clone()).merge(create_paxos_router(self.paxos.clone()))
    }

    pub async fn run(&self) -> Result<()> {
        info!("KvDaemon running on {}", self.config.listen_addr());

        let status_handle = self.spawn_status_loop();
        self.wait_for_shutdown().await;
        info!("Shutdown signal received");
        status_handle.abort();

        Ok(())
    }

    fn spawn_status_loop(&self) -> tokio::task::JoinHandle<()> {
        let server = self.server.clone();
        let interval = self.config.status_interval_secs.max(1);
        let mut shutdown_rx = self.shutdown_rx.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let status = server.status().await;
                        debug!(
                            "status: min={} max={:?} applied={} cached={}",
                            status.min, status.max, status.applied, status.cached_results
                        );
                    }
                    _ = shutdown_rx.changed() => {
                        break;
                    }
                }
            }
        })
    }

    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.shutdown_rx.clone();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    pub fn shutdown(&self) {
        self.server.kill();
        let _ = self.shutdown_tx.send(true);
    }

    pub fn server(&self) -> &Arc<KvServer> {
        &self.server
    }

    pub fn paxos(&self) -> &Arc<Paxos<Op>> {
        &self.paxos
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }
}
