//! MargaNav - Waypoint sequencer node
//!
//! Listens on the bridge port for a path and traversal commands, and walks
//! the path one goal at a time through the configured navigation backend.
//!
//! ## Threads
//!
//! - **bridge**: accepts clients; one receiver thread per client
//! - **sequencer**: applies path updates and runs commands (blocking per goal)
//! - **main**: monitors shutdown and worker health
//!
//! ## Usage
//!
//! ```bash
//! marga-nav                        # marga.toml if present, else defaults
//! marga-nav path/to/config.toml
//! marga-nav --config marga.toml --backend mock --bind 127.0.0.1:5560
//! ```

use marga_nav::bridge::{BridgePublisher, BridgeServer, ClientRegistry};
use marga_nav::config::{BackendKind, MargaConfig, NavigationConfig};
use marga_nav::error::{MargaError, Result};
use marga_nav::navigation::{MockNavigationClient, NavigationClient, TcpNavigationClient};
use marga_nav::node::SequencerNode;
use marga_nav::sequencer::WaypointSequencer;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Config file picked up from the working directory when none is given
const DEFAULT_CONFIG_FILE: &str = "marga.toml";

fn main() -> Result<()> {
    // Initialize logging
    let directive: tracing_subscriber::filter::Directive = "marga_nav=info"
        .parse()
        .map_err(|e| MargaError::Config(format!("Invalid log directive: {}", e)))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config = load_config(&args)?;

    // Command line overrides
    if let Some(backend) = flag_value(&args, "--backend") {
        config.navigation.backend = match backend.as_str() {
            "tcp" => BackendKind::Tcp,
            "mock" => BackendKind::Mock,
            other => {
                return Err(MargaError::Config(format!("Unknown backend: {}", other)));
            }
        };
    }
    if let Some(bind) = flag_value(&args, "--bind") {
        config.bridge.bind_address = bind;
    }

    info!("MargaNav v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Goal frame '{}', loop passes {}, failure limit {}",
        config.sequencer.goal_frame_id,
        config.sequencer.loop_passes,
        match config.sequencer.max_consecutive_failures {
            0 => "off".to_string(),
            n => n.to_string(),
        }
    );

    // Shutdown signal
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| MargaError::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let client = create_client(&config.navigation)?;
    let registry = ClientRegistry::new();
    let sequencer = WaypointSequencer::new(
        client,
        BridgePublisher::new(registry.clone()),
        config.sequencer.clone(),
    );
    let cancel = sequencer.cancel_token();

    let (event_tx, event_rx) = crossbeam_channel::unbounded();
    let bridge = BridgeServer::spawn(
        &config.bridge.bind_address,
        registry,
        event_tx,
        cancel.clone(),
        Arc::clone(&running),
    )?;
    let node = SequencerNode::new(sequencer, event_rx, Arc::clone(&running)).spawn()?;

    // Main thread: monitor until shutdown
    let check_interval = Duration::from_millis(500);
    while running.load(Ordering::Relaxed) {
        std::thread::sleep(check_interval);

        if node.is_finished() || bridge.is_finished() {
            warn!("A worker thread exited unexpectedly");
            break;
        }
    }

    // Signal shutdown; a run in progress stops after its current goal
    running.store(false, Ordering::Relaxed);
    cancel.cancel();

    info!("Waiting for threads to finish...");
    if let Err(e) = bridge.join() {
        warn!("Bridge thread panicked: {:?}", e);
    }

    // A goal in flight has no timeout, so don't wait on it forever
    let join_timeout = Duration::from_secs(5);
    let join_start = Instant::now();
    while !node.is_finished() && join_start.elapsed() < join_timeout {
        std::thread::sleep(Duration::from_millis(50));
    }
    if node.is_finished() {
        if let Err(e) = node.join() {
            warn!("Sequencer thread panicked: {:?}", e);
        }
    } else {
        warn!("Sequencer still waiting on a goal; exiting without it");
    }

    info!("MargaNav finished");
    Ok(())
}

/// Positional path, `--config <path>`, `marga.toml`, or defaults.
fn load_config(args: &[String]) -> Result<MargaConfig> {
    let explicit = flag_value(args, "--config").or_else(|| {
        args.get(1)
            .filter(|a| !a.starts_with("--"))
            .cloned()
    });

    match explicit {
        Some(path) => {
            info!("Loading configuration from {}", path);
            MargaConfig::load(Path::new(&path))
        }
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            info!("Loading configuration from {}", DEFAULT_CONFIG_FILE);
            MargaConfig::load(Path::new(DEFAULT_CONFIG_FILE))
        }
        None => {
            info!("Using default configuration");
            Ok(MargaConfig::default())
        }
    }
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn create_client(config: &NavigationConfig) -> Result<Box<dyn NavigationClient>> {
    match config.backend {
        BackendKind::Tcp => {
            let mut client = TcpNavigationClient::new(
                &config.address,
                Duration::from_millis(config.connect_timeout_ms),
            )?;
            if let Err(e) = client.connect() {
                warn!(
                    "Navigation backend {} not reachable yet ({}); retrying on first goal",
                    config.address, e
                );
            }
            Ok(Box::new(client))
        }
        BackendKind::Mock => {
            info!(
                "Using mock navigation backend ({}ms per goal)",
                config.mock_goal_duration_ms
            );
            Ok(Box::new(MockNavigationClient::new().with_goal_duration(
                Duration::from_millis(config.mock_goal_duration_ms),
            )))
        }
    }
}
