use super::KeyOptions;
use anyhow::Result;
use clap::Args;
use log::info;

/// Resolve the content key of a .blurl container and print it as hex.
#[derive(Debug, Clone, Args)]
pub struct Key {
    #[command(flatten)]
    pub options: KeyOptions,
}

impl Key {
    pub fn execute(self) -> Result<()> {
        let descriptor = self.options.descriptor()?;
        let key = self.options.source().resolve(&descriptor.ev)?;

        info!("Resolved content key for {}", self.options.input.to_string_lossy());
        println!("{}", key.to_hex());
        Ok(())
    }
}
