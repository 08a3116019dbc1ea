//! Shared helpers: a real broker server on an ephemeral local port

#![allow(dead_code)]

use memsqs::broker::{Broker, BrokerSettings};
use memsqs::client::HttpClient;
use memsqs::core::shutdown::ShutdownCoordinator;
use memsqs::queue::QueueManager;
use memsqs::server;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub struct TestServer {
    pub addr: SocketAddr,
    pub broker: Broker,
    coordinator: ShutdownCoordinator,
    server: Option<JoinHandle<std::io::Result<()>>>,
    maintenance: Option<JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(BrokerSettings {
            longpoll_window: Duration::from_millis(500),
            longpoll_tick: Duration::from_millis(50),
            sweep_interval: Duration::from_millis(50),
        })
        .await
    }

    pub async fn start_with(settings: BrokerSettings) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let broker = Broker::new(QueueManager::new(), settings);
        let coordinator = ShutdownCoordinator::new();

        let maintenance = broker.spawn_maintenance(coordinator.subscribe());
        let server = tokio::spawn(server::serve(
            listener,
            broker.clone(),
            coordinator.requested(),
        ));

        Self {
            addr,
            broker,
            coordinator,
            server: Some(server),
            maintenance: Some(maintenance),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn client(&self) -> HttpClient {
        HttpClient::new(self.url())
    }

    /// Stop the server and wait until the port is released
    pub async fn stop(mut self) {
        self.coordinator.trigger_shutdown();
        if let Some(server) = self.server.take() {
            server.await.expect("server task").expect("server result");
        }
        if let Some(maintenance) = self.maintenance.take() {
            maintenance.await.expect("maintenance task");
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.coordinator.trigger_shutdown();
    }
}
