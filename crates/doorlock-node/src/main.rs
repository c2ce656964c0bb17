//! Door lock node binary.
//!
//! # Usage
//!
//! ```bash
//! # Control node: owns the EEPROM image and waits for the HMI
//! doorlock-node --role control --listen 127.0.0.1:7400 --store eeprom.bin
//!
//! # HMI node: keypad on stdin, display in the log
//! doorlock-node --role hmi --connect 127.0.0.1:7400
//! ```

use std::{path::PathBuf, time::Duration};

use clap::{ArgGroup, Parser, ValueEnum};
use doorlock_core::store::DEFAULT_CAPACITY;
use doorlock_node::{
    ConsoleActuator, ControlRuntime, FileStore, HmiRuntime, IntervalTicker, LogDisplay, NodeConfig,
    NodeError, StreamKeypad, SystemEnv, TcpLink, link,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Which node this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Role {
    /// Motor, presence sensor, alarm and credential store
    Control,
    /// Keypad and display
    Hmi,
}

/// Door lock node
#[derive(Parser, Debug)]
#[command(name = "doorlock-node")]
#[command(about = "One node of the two-node door lock")]
#[command(version)]
#[command(group(ArgGroup::new("peer").required(true).args(["listen", "connect"])))]
struct Args {
    /// Node role
    #[arg(long, value_enum)]
    role: Role,

    /// Accept the peer on this address
    #[arg(long)]
    listen: Option<String>,

    /// Connect to the peer at this address
    #[arg(long)]
    connect: Option<String>,

    /// EEPROM image path (control only)
    #[arg(long, default_value = "eeprom.bin")]
    store: PathBuf,

    /// Tick period in milliseconds
    #[arg(long, default_value = "1000")]
    tick_ms: u64,

    /// Fault a silent peer after this many milliseconds (default: wait forever)
    #[arg(long)]
    link_timeout_ms: Option<u64>,

    /// Simulated time someone stays in the doorway, in milliseconds
    #[arg(long, default_value = "3000")]
    presence_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

async fn open_link(args: &Args, env: &SystemEnv) -> std::io::Result<TcpLink> {
    match (&args.listen, &args.connect) {
        (Some(addr), _) => link::listen(addr.as_str()).await,
        (None, Some(addr)) => link::connect(env, addr, Duration::from_millis(500)).await,
        (None, None) => Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "no peer address")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = NodeConfig {
        tick_period: Duration::from_millis(args.tick_ms),
        link_timeout: args.link_timeout_ms.map(Duration::from_millis),
        ..NodeConfig::default()
    };
    config.validate()?;

    tracing::info!(role = ?args.role, link = ?config.link, "door lock node starting");

    let env = SystemEnv::new();
    let ticks = IntervalTicker::new(env.clone(), config.tick_period);
    let link = open_link(&args, &env).await?;

    match args.role {
        Role::Control => {
            let store = FileStore::open_or_create(&args.store, DEFAULT_CAPACITY)?;
            let actuator = ConsoleActuator::new(env.clone(), Duration::from_millis(args.presence_ms));
            ControlRuntime::start(config, store, link, actuator, ticks, env).await?.run().await?;
        },
        Role::Hmi => {
            let keypad = StreamKeypad::stdin();
            let runtime = HmiRuntime::start(config, link, keypad, LogDisplay, ticks, env).await?;
            match runtime.run().await {
                Err(NodeError::OperatorClosed) => tracing::info!("keypad closed, shutting down"),
                result => result?,
            }
        },
    }

    Ok(())
}
