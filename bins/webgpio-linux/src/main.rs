use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use tokio::runtime::Handle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webgpio_core::store::{init_with_recovery, load_wifi, save_wifi};
use webgpio_core::{event, Actuator, Bringup, DeviceConfig, DirectoryMount, LinkEvent};
use webgpio_server::{AxumControlServer, FileConfigStore, SimulatedPin, SimulatedStation};

const DEFAULT_STORE: &str = "webgpio-store.json";
const DEFAULT_SIM_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,webgpio_core=debug,webgpio_server=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("webgpio simulator starting...");

    let config = load_config()?;
    let sim_ip = match env("WEBGPIO_SIM_IP") {
        Some(ip) => ip.parse().context("WEBGPIO_SIM_IP is not an IPv4 address")?,
        None => DEFAULT_SIM_IP,
    };

    let (events, dispatcher) = event::channel();
    let station = SimulatedStation::new(events, sim_ip);
    let injector = station.link_events();

    let (pin, _monitor) = SimulatedPin::new(config.gpio.pin);
    let actuator = Actuator::shared(Box::new(pin), config.gpio.polarity)
        .map_err(|e| anyhow::anyhow!("GPIO{} setup failed: {}", config.gpio.pin, e))?;

    let server = AxumControlServer::new(Handle::current(), Ipv4Addr::UNSPECIFIED.into());
    let mut bringup = Bringup::new(&config, station, DirectoryMount::new(), server, actuator)?;
    bringup.boot()?;

    // The station keeps a sender alive, so the dispatcher runs until exit.
    std::thread::Builder::new()
        .name("dispatcher".into())
        .spawn(move || dispatcher.run(bringup))
        .context("failed to spawn event dispatcher")?;

    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), config.http.port);
    tracing::info!("Control surface (once the link is up):");
    tracing::info!("   curl http://{}/", addr);
    tracing::info!("   curl -X {} http://{}/gpio/on", config.gpio.method, addr);
    tracing::info!("   curl -X {} http://{}/gpio/off", config.gpio.method, addr);

    let drops = tokio::spawn(async move {
        let Some(period) = drop_interval() else {
            return std::future::pending::<()>().await;
        };
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            tracing::info!("Simulating link drop");
            if !injector.send(LinkEvent::LinkDown) {
                break;
            }
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = drops => {
            tracing::warn!("Link drop simulator stopped");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Build the device configuration from file, config store and environment.
fn load_config() -> anyhow::Result<DeviceConfig> {
    let mut config = match env("WEBGPIO_CONFIG") {
        Some(path) => DeviceConfig::from_json_file(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => DeviceConfig::default(),
    };

    let store_path = env("WEBGPIO_STORE").unwrap_or_else(|| DEFAULT_STORE.to_string());
    let mut store = FileConfigStore::new(store_path);
    init_with_recovery(&mut store).context("config store unavailable")?;
    config.wifi = load_wifi(&store, &config.wifi)?;

    let mut provisioned = false;
    if let Some(ssid) = env("WEBGPIO_SSID") {
        config.wifi.ssid = ssid;
        provisioned = true;
    }
    if let Some(passphrase) = env("WEBGPIO_PASSPHRASE") {
        config.wifi.passphrase = passphrase;
        provisioned = true;
    }
    if provisioned {
        // Validate before persisting.
        config.credentials()?;
        save_wifi(&mut store, &config.wifi)?;
        tracing::info!("Stored credentials in {}", store.path().display());
    }

    if let Some(assets) = env("WEBGPIO_ASSETS") {
        config.fs.base_path = PathBuf::from(assets);
    }
    if let Some(port) = env("WEBGPIO_PORT") {
        config.http.port = port.parse().context("WEBGPIO_PORT is not a port number")?;
    }

    Ok(config)
}

fn drop_interval() -> Option<Duration> {
    let secs: u64 = env("WEBGPIO_SIM_DROP_SECS")?.parse().ok()?;
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
