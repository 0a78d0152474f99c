use super::KeyOptions;
use crate::downloader::{self, DownloadOptions, Ffmpeg};
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use log::{info, warn};
use reqwest::Client;
use std::{path::PathBuf, process, time::Duration};
use tokio_util::sync::CancellationToken;

/// Download, decrypt and merge the asset described by a .blurl container.
#[derive(Debug, Clone, Args)]
pub struct Download {
    #[command(flatten)]
    pub options: KeyOptions,

    /// Output directory.
    #[arg(short, long, default_value = "downloads")]
    pub directory: PathBuf,

    /// Playlist to download by its position (1, 2, etc.).
    #[arg(long, help_heading = "Playlist Options", conflicts_with = "language")]
    pub playlist: Option<usize>,

    /// Playlist to download by its language tag.
    #[arg(long, help_heading = "Playlist Options")]
    pub language: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, help_heading = "Client Options", default_value_t = 30)]
    pub timeout: u64,

    #[arg(
        long,
        help_heading = "Client Options",
        default_value = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36"
    )]
    pub user_agent: String,

    /// Custom ffmpeg binary. Looked up in the current directory and PATH by default.
    #[arg(long, help_heading = "Download Options")]
    pub ffmpeg: Option<PathBuf>,

    /// Keep the downloaded containers after decryption.
    #[arg(long, help_heading = "Download Options")]
    pub keep_temp: bool,

    /// Skip merging video and audio into one file.
    #[arg(long, help_heading = "Download Options")]
    pub no_merge: bool,
}

impl Download {
    fn client(&self) -> Result<Client> {
        let client = Client::builder()
            .user_agent(&self.user_agent)
            .connect_timeout(Duration::from_secs(self.timeout))
            .build()?;
        Ok(client)
    }

    pub async fn execute(self) -> Result<()> {
        let descriptor = self.options.descriptor()?;
        let playlist =
            super::select_playlist(&descriptor, self.playlist, self.language.as_deref())?;

        if playlist.url.is_empty() {
            bail!("selected playlist has no url.");
        }

        let key = self.options.source().resolve(&descriptor.ev)?;
        info!("Key: {}", key.to_hex().green());

        let toolchain = match &self.ffmpeg {
            Some(bin) => Ffmpeg::new(bin, &self.directory),
            None => Ffmpeg::find(&self.directory)?,
        };

        let client = self.client()?;
        let token = CancellationToken::new();
        tokio::spawn(interrupt(token.clone()));

        let options = DownloadOptions {
            directory: self.directory.clone(),
            timeout: Duration::from_secs(self.timeout),
            merge: !self.no_merge,
            keep_temp: self.keep_temp,
            progress: true,
        };

        let outputs = downloader::download(
            &client,
            &toolchain,
            &playlist.url,
            &key,
            descriptor.audio_only,
            &options,
            token,
        )
        .await?;

        for output in outputs {
            info!("{} {}", "Saved".bold().green(), output.to_string_lossy());
        }

        Ok(())
    }
}

// First Ctrl+C cancels the running job, a second one exits right away.
async fn interrupt(token: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }

    warn!("Interrupted, cancelling download (press Ctrl+C again to exit).");
    token.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        process::exit(130);
    }
}
