//! Integration tests for the webgpio control surface.
//!
//! These tests drive the bring-up machine with a simulated station, mount a
//! real asset directory and talk to the resulting axum listener over TCP.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::time::timeout;

use webgpio_core::actuator;
use webgpio_core::event::{self, Dispatcher};
use webgpio_core::{
    Actuator, Bringup, BringupState, DeviceConfig, DirectoryMount, Level, LinkEvent, Polarity,
    SharedActuator,
};
use webgpio_server::{AxumControlServer, PinMonitor, SimulatedPin, SimulatedStation};

const DEVICE_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 10);
const INDEX: &str = "<!doctype html><title>webgpio</title>";

type HostBringup = Bringup<SimulatedStation, DirectoryMount, AxumControlServer>;

struct Device {
    bringup: HostBringup,
    dispatcher: Dispatcher,
    actuator: SharedActuator,
    monitor: PinMonitor,
}

impl Device {
    /// Deliver everything the station has queued so far.
    fn settle(&mut self) {
        self.dispatcher.drain(&mut self.bringup);
    }

    fn addr(&self) -> SocketAddr {
        self.bringup
            .server_handle()
            .map(|handle| handle.local_addr())
            .expect("control server running")
    }
}

fn write_assets(dir: &Path) {
    std::fs::write(dir.join("index.html"), INDEX).unwrap();
    std::fs::write(dir.join("styling.css"), "body { margin: 0; }").unwrap();
    std::fs::write(dir.join("index.js"), "console.log('ready');").unwrap();
}

/// Boot a device whose assets live in `assets` and run it up to the first
/// address acquisition.
fn start_device(assets: &Path) -> Device {
    start_device_on(assets, 0)
}

fn start_device_on(assets: &Path, port: u16) -> Device {
    let config = DeviceConfig::from_json_str(&format!(
        r#"{{
            "wifi": {{ "ssid": "workshop", "passphrase": "hunter22" }},
            "http": {{ "port": {} }},
            "fs": {{ "base_path": {:?} }}
        }}"#,
        port,
        assets.display().to_string()
    ))
    .unwrap();

    let (events, dispatcher) = event::channel();
    let station = SimulatedStation::new(events, DEVICE_IP);
    let (pin, monitor) = SimulatedPin::new(4);
    let actuator = Actuator::shared(Box::new(pin), Polarity::ActiveLow).unwrap();
    let server = AxumControlServer::new(Handle::current(), Ipv4Addr::LOCALHOST.into());

    let mut bringup = Bringup::new(
        &config,
        station,
        DirectoryMount::new(),
        server,
        actuator.clone(),
    )
    .unwrap();
    bringup.boot().unwrap();

    let mut device = Device {
        bringup,
        dispatcher,
        actuator,
        monitor,
    };
    device.settle();
    device
}

/// Issue one HTTP/1.1 request and return the status code and body.
async fn request(addr: SocketAddr, method: &str, path: &str) -> (u16, Vec<u8>) {
    let exchange = async {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let head = format!(
            "{} {} HTTP/1.1\r\nHost: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            method, path, addr
        );
        stream.write_all(head.as_bytes()).await.unwrap();

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        raw
    };
    let raw = timeout(Duration::from_secs(5), exchange)
        .await
        .expect("request timed out");

    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("complete response head");
    let head = String::from_utf8_lossy(&raw[..split]).to_string();
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .expect("status code");
    (status, raw[split + 4..].to_vec())
}

async fn content_type(addr: SocketAddr, path: &str) -> Option<String> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let head = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, addr
    );
    stream.write_all(head.as_bytes()).await.unwrap();
    let mut raw = String::new();
    timeout(Duration::from_secs(5), stream.read_to_string(&mut raw))
        .await
        .expect("request timed out")
        .unwrap();

    raw.lines()
        .take_while(|line| !line.is_empty())
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-type")
                .then(|| value.trim().to_string())
        })
}

#[tokio::test(flavor = "multi_thread")]
async fn test_index_served_after_first_address() {
    let assets = tempfile::tempdir().unwrap();
    write_assets(assets.path());
    let device = start_device(assets.path());

    assert_eq!(device.bringup.state(), BringupState::ServerRunning);

    let (status, body) = request(device.addr(), "GET", "/").await;
    assert_eq!(status, 200);
    assert_eq!(body, INDEX.as_bytes());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_assets_carry_content_types() {
    let assets = tempfile::tempdir().unwrap();
    write_assets(assets.path());
    let device = start_device(assets.path());
    let addr = device.addr();

    assert_eq!(content_type(addr, "/").await.as_deref(), Some("text/html"));
    assert_eq!(
        content_type(addr, "/styling.css").await.as_deref(),
        Some("text/css")
    );
    assert_eq!(
        content_type(addr, "/index.js").await.as_deref(),
        Some("application/javascript")
    );

    let (status, body) = request(addr, "GET", "/styling.css").await;
    assert_eq!(status, 200);
    assert_eq!(body, b"body { margin: 0; }");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reconnect_keeps_existing_server() {
    let assets = tempfile::tempdir().unwrap();
    write_assets(assets.path());
    let mut device = start_device(assets.path());
    let addr = device.addr();

    let injector = device.bringup.station().link_events();
    injector.send(LinkEvent::LinkDown);
    device.settle();

    let snapshot = device.bringup.snapshot();
    assert_eq!(snapshot.state, BringupState::ServerRunning);
    assert_eq!(snapshot.epoch.value(), 1);
    assert_eq!(snapshot.ip, Some(DEVICE_IP));
    assert_eq!(device.bringup.station().connects(), 2);
    assert_eq!(device.addr(), addr);

    let (status, body) = request(addr, "GET", "/").await;
    assert_eq!(status, 200);
    assert_eq!(body, INDEX.as_bytes());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_gpio_on_drives_active_low_pin() {
    let assets = tempfile::tempdir().unwrap();
    write_assets(assets.path());
    let device = start_device(assets.path());
    let addr = device.addr();

    let (status, body) = request(addr, "POST", "/gpio/on").await;
    assert_eq!(status, 204);
    assert!(body.is_empty());
    assert_eq!(actuator::lock(&device.actuator).level(), Some(Level::On));
    assert!(!device.monitor.is_high());

    // Repeating a command is harmless.
    let (status, _) = request(addr, "POST", "/gpio/on").await;
    assert_eq!(status, 204);
    assert_eq!(actuator::lock(&device.actuator).level(), Some(Level::On));

    let (status, _) = request(addr, "POST", "/gpio/off").await;
    assert_eq!(status, 204);
    assert_eq!(actuator::lock(&device.actuator).level(), Some(Level::Off));
    assert!(device.monitor.is_high());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_gpio_rejects_wrong_method() {
    let assets = tempfile::tempdir().unwrap();
    write_assets(assets.path());
    let device = start_device(assets.path());

    let (status, _) = request(device.addr(), "GET", "/gpio/on").await;
    assert_eq!(status, 405);
    assert_eq!(actuator::lock(&device.actuator).level(), None);

    let (status, _) = request(device.addr(), "GET", "/favicon.ico").await;
    assert_eq!(status, 404);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_asset_is_server_error() {
    let assets = tempfile::tempdir().unwrap();
    std::fs::write(assets.path().join("index.html"), INDEX).unwrap();
    let device = start_device(assets.path());

    let (status, _) = request(device.addr(), "GET", "/index.js").await;
    assert_eq!(status, 500);

    // The server keeps serving after a failed request.
    let (status, _) = request(device.addr(), "GET", "/").await;
    assert_eq!(status, 200);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_mount_failure_leaves_http_disabled() {
    let root = tempfile::tempdir().unwrap();
    let missing = root.path().join("spiffs");
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let mut device = start_device_on(&missing, port);

    let snapshot = device.bringup.snapshot();
    assert_eq!(snapshot.state, BringupState::AddressAcquired);
    assert!(!snapshot.filesystem_mounted);
    assert!(device.bringup.server_handle().is_none());
    assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());

    // A later address does not retry the mount.
    std::fs::create_dir(&missing).unwrap();
    device.bringup.station().link_events().send(LinkEvent::LinkDown);
    device.settle();

    assert_eq!(device.bringup.state(), BringupState::AddressAcquired);
    assert!(device.bringup.server_handle().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dispatcher_thread_brings_server_up() {
    let assets = tempfile::tempdir().unwrap();
    write_assets(assets.path());
    let config = DeviceConfig::from_json_str(&format!(
        r#"{{
            "wifi": {{ "ssid": "workshop", "passphrase": "" }},
            "http": {{ "port": 0 }},
            "fs": {{ "base_path": {:?} }}
        }}"#,
        assets.path().display().to_string()
    ))
    .unwrap();

    let (events, dispatcher) = event::channel();
    let station = SimulatedStation::new(events, DEVICE_IP);
    let (pin, _monitor) = SimulatedPin::new(4);
    let actuator = Actuator::shared(Box::new(pin), Polarity::ActiveLow).unwrap();
    let server = AxumControlServer::new(Handle::current(), Ipv4Addr::LOCALHOST.into());
    let mut bringup =
        Bringup::new(&config, station, DirectoryMount::new(), server, actuator).unwrap();
    bringup.boot().unwrap();

    // The station holds a sender, so `run` would never return here. Drain
    // instead and keep the machine (and its server) alive in the join handle.
    let (addr_tx, addr_rx) = tokio::sync::oneshot::channel();
    let worker = tokio::task::spawn_blocking(move || {
        dispatcher.drain(&mut bringup);
        let addr = bringup.server_handle().map(|handle| handle.local_addr());
        let _ = addr_tx.send(addr);
        bringup
    });

    let addr = addr_rx.await.unwrap().expect("control server running");
    let (status, body) = request(addr, "GET", "/").await;
    assert_eq!(status, 200);
    assert_eq!(body, INDEX.as_bytes());

    let bringup = worker.await.unwrap();
    assert_eq!(bringup.state(), BringupState::ServerRunning);
}
