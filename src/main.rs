use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wheel_steering_runtime::RuntimeError;
use wheel_steering_runtime::clock::MonotonicClock;
use wheel_steering_runtime::config::RuntimeConfig;
use wheel_steering_runtime::motor::LogActuator;
use wheel_steering_runtime::runtime::{Shutdown, WheelRuntime};
use wheel_steering_runtime::serial;

/// Steer a two-wheel base toward targets reported over serial
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON configuration file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port connected to the vision module
    #[arg(short, long)]
    port: Option<String>,

    #[arg(short, long)]
    baudrate: Option<u32>,

    /// Delay between poll cycles
    #[arg(long)]
    loop_delay_ms: Option<u64>,

    /// Stop the wheels when no data arrived for this long (disabled by default)
    #[arg(long)]
    command_timeout_ms: Option<u64>,
}

fn load_config(args: &Args) -> Result<RuntimeConfig, RuntimeError> {
    let mut config = match &args.config {
        Some(path) => {
            RuntimeConfig::from_json_file(path).map_err(|e| RuntimeError::Init(e.into()))?
        }
        None => RuntimeConfig::default(),
    };
    if let Some(port) = &args.port {
        config.port = port.clone();
    }
    if let Some(baudrate) = args.baudrate {
        config.baudrate = baudrate;
    }
    if let Some(delay) = args.loop_delay_ms {
        config.loop_delay_ms = delay;
    }
    if args.command_timeout_ms.is_some() {
        config.command_timeout_ms = args.command_timeout_ms;
    }
    Ok(config)
}

async fn run(args: Args) -> Result<(), RuntimeError> {
    let config = load_config(&args)?;

    let clock = Arc::new(MonotonicClock::new());
    let (mut runtime, rx) = WheelRuntime::builder()
        .config(config)
        .clock(clock)
        .actuator(LogActuator)
        .build()?;

    let config = runtime.config();
    let port = serial::open_port(&config.port, config.baudrate, config.read_timeout())?;

    let shutdown = Arc::new(Shutdown::new());
    let reader = serial::spawn_reader(port, rx, shutdown.listener());

    // A dead byte source ends the loop too
    let on_reader_exit = Arc::clone(&shutdown);
    let reader = tokio::task::spawn_blocking(move || {
        let outcome = reader.join();
        on_reader_exit.trigger();
        outcome
    });

    let on_ctrl_c = Arc::clone(&shutdown);
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
        }
        on_ctrl_c.trigger();
    });

    let result = runtime.run(shutdown.listener()).await;
    shutdown.trigger();
    ctrl_c.abort();

    match reader.await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => error!("Serial reader failed: {}", e),
        Ok(Err(_)) | Err(_) => return Err(RuntimeError::IngressPanicked),
    }
    result
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(Args::parse()).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
