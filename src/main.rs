use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{error, info};
use vigil::clock::system_clock;
use vigil::dispatch::{Dispatcher, VehicleHandle};
use vigil::logging::init_logging;
use vigil::sink::RecordSink;
use vigil::vehicle::{ApiSession, VehicleClient, discover_vehicles};
use vigil::view::SharedView;
use vigil::{Config, MonitorContext, VehicleMonitor};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    init_logging(&config.logging).context("Failed to initialize logging")?;

    info!("Vigil {} starting up", env!("APP_VERSION"));

    let clock = system_clock();
    let session = Arc::new(ApiSession::new(&config.api).context("Cannot authenticate")?);
    let vehicles = discover_vehicles(session, clock.clone())
        .await
        .context("Vehicle discovery failed")?;
    if vehicles.is_empty() {
        error!("No vehicles on this account");
        anyhow::bail!("No vehicles found");
    }

    let ctx = MonitorContext {
        intervals: Arc::new(config.interval_table()?),
        view: SharedView::new(),
        sink: Arc::new(
            RecordSink::new(&config.records.directory, &config.records.prefix)
                .context("Cannot open record directory")?,
        ),
        clock,
        backoff_base_secs: config.backoff_base_secs,
    };
    ctx.sink
        .write_line(&format!("vigil {} started", env!("APP_VERSION")))?;

    let mut handles = Vec::with_capacity(vehicles.len());
    for vehicle in vehicles {
        let client: Arc<dyn VehicleClient> = Arc::new(vehicle);
        let (tx, rx) = mpsc::channel(config.command.queue_capacity);
        let monitor = VehicleMonitor::new(client.clone(), ctx.clone(), rx);
        info!("Monitoring {}", monitor.label());
        handles.push(VehicleHandle {
            id: client.identity().id,
            label: monitor.label().to_string(),
            queue: tx,
        });
        tokio::spawn(monitor.run());
    }

    let socket = UdpSocket::bind(&config.command.bind)
        .await
        .with_context(|| format!("Cannot bind command socket {}", config.command.bind))?;
    let dispatcher = Dispatcher::new(
        handles,
        ctx.view.clone(),
        Duration::from_millis(config.command.send_timeout_ms),
    );
    let listener = tokio::spawn(async move { dispatcher.serve(socket).await });

    match listener.await {
        Ok(Ok(())) => {
            info!("Shutdown complete");
            Ok(())
        }
        Ok(Err(e)) => {
            error!("Command listener failed: {}", e);
            Err(anyhow::anyhow!("Command listener error: {}", e))
        }
        Err(e) => Err(anyhow::anyhow!("Command listener panicked: {}", e)),
    }
}
