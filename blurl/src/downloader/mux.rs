use crate::{
    error::{Error, Result},
    utils,
};
use colored::Colorize;
use log::info;
use std::{
    future::Future,
    path::{Path, PathBuf},
    process::Stdio,
};
use tokio::{fs, process::Command};

/// External decrypt and remux step.
pub trait MediaToolchain {
    /// Decrypt `container` with `key_hex` into `<output_id>.mp4`.
    fn decrypt(
        &self,
        container: &Path,
        key_hex: &str,
        output_id: &str,
    ) -> impl Future<Output = Result<PathBuf>> + Send;

    /// Merge a video and an audio file into `<short_id>_master.mp4`, removing both sources.
    fn merge(
        &self,
        video: &Path,
        audio: &Path,
        short_id: &str,
    ) -> impl Future<Output = Result<PathBuf>> + Send;
}

/// [`MediaToolchain`] backed by an `ffmpeg` binary.
#[derive(Clone, Debug)]
pub struct Ffmpeg {
    bin: PathBuf,
    output_dir: PathBuf,
}

impl Ffmpeg {
    pub fn new(bin: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Locate `ffmpeg` in the working directory or on `PATH`.
    pub fn find(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let bin = utils::find_ffmpeg().ok_or_else(|| {
            Error::Toolchain("ffmpeg couldn't be found, it is required to continue further.".to_owned())
        })?;
        Ok(Self::new(bin, output_dir))
    }

    async fn run(&self, args: Vec<String>, output: &Path) -> Result<()> {
        if output.exists() {
            info!("Deleting {}", output.to_string_lossy());
            fs::remove_file(output).await?;
        }

        info!(
            "Executing {} {}",
            "ffmpeg".bold(),
            args.iter()
                .map(|x| if x.contains(' ') {
                    format!("\"{x}\"")
                } else {
                    x.to_owned()
                })
                .collect::<Vec<_>>()
                .join(" ")
                .bold()
        );

        let code = Command::new(&self.bin)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?
            .wait()
            .await?;

        if !code.success() {
            return Err(Error::Toolchain(format!(
                "ffmpeg exited with code {}",
                code.code().unwrap_or(1)
            )));
        }

        Ok(())
    }
}

impl MediaToolchain for Ffmpeg {
    async fn decrypt(&self, container: &Path, key_hex: &str, output_id: &str) -> Result<PathBuf> {
        let output = self.output_dir.join(format!("{output_id}.mp4"));
        let args = vec![
            "-decryption_key".to_owned(),
            key_hex.to_owned(),
            "-i".to_owned(),
            container.to_string_lossy().into(),
            "-c".to_owned(),
            "copy".to_owned(),
            output.to_string_lossy().into(),
        ];

        self.run(args, &output).await?;
        Ok(output)
    }

    async fn merge(&self, video: &Path, audio: &Path, short_id: &str) -> Result<PathBuf> {
        let output = self.output_dir.join(format!("{short_id}_master.mp4"));
        let args = vec![
            "-i".to_owned(),
            video.to_string_lossy().into(),
            "-i".to_owned(),
            audio.to_string_lossy().into(),
            "-c:v".to_owned(),
            "copy".to_owned(),
            "-c:a".to_owned(),
            "copy".to_owned(),
            output.to_string_lossy().into(),
        ];

        self.run(args, &output).await?;

        for source in [video, audio] {
            info!("Deleting {}", source.to_string_lossy());
            fs::remove_file(source).await?;
        }

        Ok(output)
    }
}
