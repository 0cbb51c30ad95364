//! iRemote console client entry point.
//!
//! ```text
//! iremote                        Connect with defaults
//! iremote --config <path>        Use custom config TOML
//! iremote --host 10.0.0.5        Override the controller address
//! iremote --json                 Print events as JSON lines
//! iremote --gen-config           Dump default config and exit
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use iremote_core::{ClientStatus, Session, SessionEvent};

use iremote_cli::config::CliConfig;
use iremote_cli::report;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "iremote", about = "iRemote controller console client")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "iremote.toml")]
    config: PathBuf,

    /// Controller host (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Controller port (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Print events as JSON lines instead of text.
    #[arg(long)]
    json: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&CliConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = CliConfig::load(&cli.config);
    if let Some(host) = cli.host {
        config.controller.host = host;
    }
    if let Some(port) = cli.port {
        config.controller.port = port;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("iremote v{}", env!("CARGO_PKG_VERSION"));
    config.session.validate()?;

    // ── 1. Session and event printer ────────────────────────────

    let session = Session::new(config.session.clone());
    let printer = tokio::spawn(print_events(session.subscribe(), cli.json));

    // ── 2. Connect, poll, reconnect ─────────────────────────────

    let host = config.controller.host.as_str();
    let port = config.controller.port;
    let reconnect_delay = Duration::from_millis(config.poll.reconnect_delay_ms);
    let mut ticker = tokio::time::interval(Duration::from_millis(config.poll.interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if !session.is_connected() {
            match session.connect(host, port).await {
                Ok(()) => print_snapshot(&session, cli.json)?,
                Err(e) if config.poll.reconnect => {
                    warn!("cannot connect to {host}:{port}: {e}; retrying in {reconnect_delay:?}");
                    if !pause(reconnect_delay).await {
                        break;
                    }
                    continue;
                }
                Err(e) => {
                    error!("cannot connect to {host}:{port}: {e}");
                    break;
                }
            }
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            _ = ticker.tick() => {}
        }

        match session.poll().await {
            Ok(true) => {}
            Ok(false) if config.poll.reconnect => {
                info!("session dropped; reconnecting in {reconnect_delay:?}");
                if !pause(reconnect_delay).await {
                    break;
                }
            }
            Ok(false) => {
                info!("session dropped");
                break;
            }
            Err(e) => {
                error!("poll failed: {e}");
                break;
            }
        }
    }

    // ── 3. Shutdown ─────────────────────────────────────────────

    info!("shutting down");
    session.dispose().await;
    let _ = printer.await;

    Ok(())
}

/// Print every event until the session is disposed.
async fn print_events(mut events: broadcast::Receiver<SessionEvent>, json: bool) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if json {
                    match report::event_json(&event) {
                        Ok(line) => println!("{line}"),
                        Err(e) => warn!("cannot encode event: {e}"),
                    }
                } else {
                    println!("{}", report::event_line(&event));
                }
                if event == SessionEvent::Status(ClientStatus::Disposed) {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "event printer fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_snapshot(session: &Session, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mirror = session.snapshot()?;
    if json {
        println!("{}", serde_json::to_string(&mirror)?);
    } else {
        print!("{}", report::snapshot(&mirror));
    }
    Ok(())
}

/// Sleep for `delay`; `false` if interrupted first.
async fn pause(delay: Duration) -> bool {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            false
        }
        _ = tokio::time::sleep(delay) => true,
    }
}
