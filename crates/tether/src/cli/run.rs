use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tether::Tether;
use tether_core::config::LoggingConfig;
use tether_core::TetherError;

use super::ConfigArgs;

/// Register and run the sidecar.
#[derive(Parser)]
pub struct RunCommand {
    #[command(flatten)]
    pub args: ConfigArgs,

    /// Emit logs as JSON.
    #[arg(long)]
    pub json_logs: bool,
}

impl RunCommand {
    /// Execute the run command.
    pub async fn execute(self) -> Result<()> {
        let mut config = self.args.load()?;
        if self.json_logs {
            config.logging.json_format = true;
        }

        init_tracing(&config.logging);

        info!("tether v{} starting", env!("CARGO_PKG_VERSION"));

        let tether = Tether::builder()
            .config(config)
            .build()
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        match tether.run().await {
            Ok(()) => Ok(()),
            Err(e) if is_lease_lost(&e) => {
                // In-flight requests are not drained.
                tracing::error!("Lease lost, exiting: {}", e);
                std::process::exit(1);
            }
            Err(e) => Err(anyhow::anyhow!("{}", e)),
        }
    }
}

/// Whether a run error means the registration may have lapsed.
fn is_lease_lost(e: &TetherError) -> bool {
    matches!(e, TetherError::RenewalFailed { .. })
}

/// Initialize tracing; `RUST_LOG` takes precedence over the configured level.
fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json_format {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
