//! slicebridge - headless slicing event and configuration bridge
//!
//! Loads the configuration, starts the bridge and runs until Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use slicebridge::{init_logging, Bridge, Config, BUILD_DATE, VERSION};

#[derive(Parser)]
#[command(name = "slicebridge")]
#[command(about = "Bridge slicing events and configuration to MQTT and an HTTP API", long_about = None)]
struct Cli {
    /// Configuration file (.json or .toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,

    /// Do not connect to the MQTT broker
    #[arg(long)]
    no_mqtt: bool,

    /// Do not start the HTTP API
    #[arg(long)]
    no_http: bool,

    /// Override the HTTP API port
    #[arg(long)]
    port: Option<u16>,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from_file(path)
                .with_context(|| format!("reading {}", path.display()))?,
            None => Config::default(),
        };
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.no_mqtt {
            config.mqtt.enabled = false;
        }
        if self.no_http {
            config.http.enabled = false;
        }
        if let Some(port) = self.port {
            config.http.port = port;
        }
        config.validate()?;
        Ok(config)
    }
}

fn wait_for_ctrl_c() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(tokio::signal::ctrl_c())?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    init_logging(&config.logging)?;
    tracing::info!("SliceBridge {} (built {})", VERSION, BUILD_DATE);

    let mut bridge = Bridge::start(&config)?;
    tracing::info!("Running, press Ctrl-C to stop");

    wait_for_ctrl_c()?;
    tracing::info!("Shutdown requested");
    bridge.shutdown();

    Ok(())
}
