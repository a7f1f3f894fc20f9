mod check;
mod run;

pub use check::CheckConfigCommand;
pub use run::RunCommand;

use std::path::Path;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use tether_core::TetherConfig;

/// tether - register this service in etcd and keep it registered
#[derive(Parser)]
#[command(name = "tether")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Register and run the sidecar.
    Run(RunCommand),

    /// Print the resolved configuration and identity without contacting etcd.
    CheckConfig(CheckConfigCommand),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run(cmd) => cmd.execute().await,
            Commands::CheckConfig(cmd) => cmd.execute().await,
        }
    }
}

/// Overrides shared by every command.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Configuration file path (TOML).
    #[arg(short, long)]
    pub config: Option<String>,

    /// Service port (overrides SERVICE_PORT).
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Lease TTL in seconds (overrides LEASE_TTL).
    #[arg(long)]
    pub ttl: Option<u64>,

    /// Comma-separated etcd endpoints (overrides ETCD_ENDPOINTS).
    #[arg(long)]
    pub endpoints: Option<String>,
}

impl ConfigArgs {
    /// Defaults, then file, then environment, then flags.
    pub fn load(&self) -> Result<TetherConfig> {
        self.load_with(|name| std::env::var(name).ok())
    }

    fn load_with<F>(&self, lookup: F) -> Result<TetherConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = TetherConfig::load_with(self.config.as_deref().map(Path::new), lookup)?;
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut TetherConfig) {
        if let Some(port) = self.port {
            config.service.port = port;
        }
        if let Some(ttl) = self.ttl {
            config.lease.ttl_secs = ttl;
        }
        if let Some(endpoints) = &self.endpoints {
            config.coordinator.endpoints =
                tether_core::config::CoordinatorConfig::parse_endpoints(endpoints);
        }
    }
}
