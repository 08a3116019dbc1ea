//! Process startup and the server lifecycle

use crate::app::cli::{Args, BrokerConfig, ServerSettings};
use crate::broker::Broker;
use crate::core::logging::init_logging;
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::time::system_clock;
use crate::core::version;
use crate::queue::QueueManager;
use crate::server;
use tokio::net::TcpListener;

/// Resolve configuration, start logging and serve until a shutdown signal
pub async fn startup(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = BrokerConfig::load(args.config_file.as_deref()).await?;
    let settings = args.resolve(&config)?;

    init_logging(&settings.log)?;
    log::info!("{}", version::banner());

    let coordinator = ShutdownCoordinator::new();
    coordinator.install_signal_handlers();

    let listener = TcpListener::bind(settings.bind_addr)
        .await
        .map_err(|e| format!("cannot listen on {}: {}", settings.bind_addr, e))?;

    run(listener, &settings, &coordinator).await
}

/// Serve the broker on `listener` until `coordinator` requests shutdown
pub async fn run(
    listener: TcpListener,
    settings: &ServerSettings,
    coordinator: &ShutdownCoordinator,
) -> Result<(), Box<dyn std::error::Error>> {
    log::debug!("Queue defaults: {:?}", settings.queue_defaults);

    let manager = QueueManager::with_clock(settings.queue_defaults.clone(), system_clock());
    let broker = Broker::new(manager, settings.broker.clone());
    let maintenance = broker.spawn_maintenance(coordinator.subscribe());

    let served = server::serve(listener, broker.clone(), coordinator.requested()).await;

    // Stop maintenance even when the server ended on its own
    coordinator.trigger_shutdown();
    maintenance.await?;
    broker.log_summary()?;

    served?;
    Ok(())
}
