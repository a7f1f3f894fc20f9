use anyhow::Result;
use clap::Parser;

use tether_core::ServiceIdentity;

use super::ConfigArgs;

/// Print the resolved configuration and identity.
#[derive(Parser)]
pub struct CheckConfigCommand {
    #[command(flatten)]
    pub args: ConfigArgs,
}

impl CheckConfigCommand {
    /// Execute the check-config command.
    pub async fn execute(self) -> Result<()> {
        let config = self.args.load()?;
        let identity = ServiceIdentity::resolve(&config.service).await?;

        println!("{}", serde_json::to_string_pretty(&config)?);
        println!();
        println!("key:      {}", identity.key);
        println!("value:    {}", identity.value);
        println!("renew:    every {:?}", config.lease.renew_interval());

        Ok(())
    }
}
