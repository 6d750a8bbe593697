use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use fountain_bridge::ble_session::{self, BleSession};
use fountain_bridge::config::BridgeConfig;
use fountain_bridge::router::Router;
use fountain_bridge::server;
use fountain_bridge::state::BridgeServices;
use fountain_device::MidiBackend;

#[derive(Parser, Debug)]
#[command(name = "fountain-bridge", about = "Local HTTP bridge to device, BLE and network MIDI")]
struct Args {
    /// Host address to listen on
    #[arg(long)]
    listen: Option<String>,

    /// HTTP port
    #[arg(short, long, env = "BRIDGE_PORT")]
    port: Option<u16>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) if path.exists() => BridgeConfig::load(path).map_err(|e| {
            error!("Failed to load config {:?}: {}", path, e);
            e
        })?,
        Some(path) => {
            warn!(path = %path.display(), "Config file not found, using defaults");
            BridgeConfig::default()
        }
        None => BridgeConfig::default(),
    };
    let config = config.with_overrides(args.listen, args.port);
    let addr = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || config.listen_addr()).await??
    };

    info!(
        %addr,
        midi_client = %config.midi.client_name,
        rtp = config.rtp.enabled,
        "Fountain bridge starting"
    );

    let midi: Arc<dyn MidiBackend> = Arc::from(fountain_device::create_midi_backend(&config.midi.client_name));

    let (radio_tx, radio_rx) = mpsc::unbounded_channel();
    let ble = Arc::new(BleSession::new(fountain_device::create_ble_peripheral(radio_tx)));
    tokio::spawn(ble_session::run_events(Arc::clone(&ble), radio_rx));

    if config.ble.advertise_on_start && !ble.start(&config.ble.name) {
        warn!(name = %config.ble.name, "BLE advertising could not be started");
    }

    let network = fountain_device::create_network_midi(
        config.rtp.enabled,
        &config.rtp.session_name,
        &config.rtp.local_name,
        config.rtp.control_port,
    );

    info!(
        midi = midi.supported(),
        ble = ble.supported(),
        rtp = network.supported(),
        "Transports initialized"
    );

    let services = Arc::new(BridgeServices::new(midi, ble, network));
    let router = Arc::new(Router::new(services));

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!(%addr, "Failed to bind: {}", e);
        e
    })?;

    server::serve(listener, router, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
        info!("Shutting down...");
    })
    .await
}
