use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use ploytec_core::MidiBridge;
use ploytec_core::client::{SimUserClient, UserClient};
use ploytec_core::events::TracingObserver;
use ploytec_core::manager::{ManagerCallback, MockExtensionManager, RequestResult};
use ploytec_core::session::{SessionConfig, SessionController};

#[derive(Parser, Debug)]
#[command(author, version, about = "Ploytec driver control tool", long_about = None)]
struct Args {
    /// Path to a TOML session config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk the dext lifecycle against the mock extension manager
    Lifecycle,
    /// Run the MIDI bridge on virtual ports against the simulated driver
    Bridge,
    /// Full harness: session controller, stats polling and MIDI bridge
    Run,
    /// Write the default configuration to a TOML file
    Config { path: PathBuf },
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = match &args.config {
        Some(path) => match SessionConfig::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => SessionConfig::default(),
    };

    let result = match args.command {
        Command::Lifecycle => run_lifecycle(config),
        Command::Bridge => run_bridge(config),
        Command::Run => run_full(config),
        Command::Config { path } => write_config(&path),
    };

    if let Err(e) = result {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Drive a scripted activate/approve/finish/deactivate sequence and print
/// the status line after each step.
fn run_lifecycle(config: SessionConfig) -> Result<()> {
    let manager = Arc::new(MockExtensionManager::new());
    let client: Arc<dyn UserClient> = Arc::new(SimUserClient::new());
    let controller = SessionController::start(config, manager, client, Arc::new(TracingObserver));
    let sink = controller.callback_sink();

    controller.activate();
    settle(&controller);

    sink.deliver(ManagerCallback::NeedsApproval);
    settle(&controller);

    sink.deliver(ManagerCallback::Finished {
        result: RequestResult::Completed,
    });
    settle(&controller);

    controller.deactivate();
    settle(&controller);

    sink.deliver(ManagerCallback::Finished {
        result: RequestResult::Completed,
    });
    settle(&controller);

    controller.shutdown();
    Ok(())
}

fn settle(controller: &SessionController) {
    thread::sleep(Duration::from_millis(50));
    println!("{}", controller.state().status_message());
}

#[cfg(target_os = "macos")]
fn run_bridge(_config: SessionConfig) -> Result<()> {
    use ploytec_core::bridge::MidirEndpoints;

    let sim = Arc::new(SimUserClient::new());
    let client: Arc<dyn UserClient> = sim.clone();
    let status = client.open()?;
    info!(status = %status, "simulated driver connected");

    let bridge = Arc::new(MidiBridge::new(Arc::downgrade(&client)));
    let endpoints = MidirEndpoints::create(bridge.clone())?;
    bridge.attach_endpoints(endpoints);

    info!("MIDI bridge running; press Ctrl-C to quit");
    pump_echo(&sim, &bridge)
}

#[cfg(target_os = "macos")]
fn run_full(config: SessionConfig) -> Result<()> {
    use ploytec_core::bridge::MidirEndpoints;

    let manager = Arc::new(MockExtensionManager::new());
    let sim = Arc::new(SimUserClient::new());
    let client: Arc<dyn UserClient> = sim.clone();
    let controller = SessionController::start(config, manager, client, Arc::new(TracingObserver));

    let bridge = Arc::new(MidiBridge::new(controller.midi_write_path()));
    let endpoints = MidirEndpoints::create(bridge.clone())?;
    bridge.attach_endpoints(endpoints);

    info!("harness running; press Ctrl-C to quit");
    pump_echo(&sim, &bridge)
}

/// Feed the simulator's MIDI echo back to the bridge as hardware
/// notifications, standing in for the driver's notification path.
#[cfg(target_os = "macos")]
fn pump_echo(sim: &Arc<SimUserClient>, bridge: &Arc<MidiBridge>) -> Result<()> {
    loop {
        thread::sleep(Duration::from_millis(10));
        for (length, bytes) in sim.drain_midi_echo() {
            bridge.handle_notification(length, Some(&bytes));
        }
    }
}

#[cfg(not(target_os = "macos"))]
fn run_bridge(_config: SessionConfig) -> Result<()> {
    anyhow::bail!("virtual MIDI ports are only supported on unix targets")
}

#[cfg(not(target_os = "macos"))]
fn run_full(_config: SessionConfig) -> Result<()> {
    anyhow::bail!("virtual MIDI ports are only supported on unix targets")
}

fn write_config(path: &PathBuf) -> Result<()> {
    SessionConfig::default().save_to_file(path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
