use remote_proto::config::Config;
use remote_watch::core::{ClientCore, ClientEvent};
use remote_watch::terminal::{spawn_key_reader, TerminalFace};
use remote_watch::transport::spawn_peer;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = remote_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("wrist-remote.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override
    let log_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,remote_watch=debug".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // The terminal is taken over below; point the operator at the log first.
    eprintln!("wrist-remote log: {}", log_path.display());

    tracing::info!("wrist-remote starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = Config::load().unwrap_or_default();
    tracing::info!(
        "Config: peer={} app={:?} combo={}ms volume={}ms",
        config.peer.address,
        config.peer.app,
        config.input.combo_window_ms,
        config.input.volume_window_ms
    );

    // ── Event channel (taps, timers, companion link → ClientCore) ────────────
    let (event_tx, event_rx) = mpsc::channel::<ClientEvent>(256);

    let face = TerminalFace::new(config.display.progress_max)?;
    let core = ClientCore::new(&config, face, event_tx.clone());

    spawn_peer(
        config.peer.address.clone(),
        config.peer.reconnect_delay(),
        event_tx.clone(),
    );
    spawn_key_reader(event_tx);

    let result = core.run(event_rx).await;
    tracing::info!("wrist-remote exiting");
    result
}
