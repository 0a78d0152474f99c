mod job;
mod mux;
mod plan;
mod stream;

pub use job::{DownloadJob, JobState, SegmentState};
pub use mux::{Ffmpeg, MediaToolchain};
pub use plan::SegmentPlan;
pub use stream::{Container, DEFAULT_TIMEOUT, SegmentedDownloader};

use crate::{
    dash::Presentation,
    error::{Error, Result},
    keys::ContentKey,
    utils,
};
use log::{info, warn};
use reqwest::{Client, Url};
use std::{path::PathBuf, time::Duration};
use tokio::fs;
use tokio_util::sync::CancellationToken;

/// Effective settings of one download run.
#[derive(Clone, Debug)]
pub struct DownloadOptions {
    /// Output directory. Containers are kept in its `temp` subdirectory.
    pub directory: PathBuf,
    pub timeout: Duration,
    pub merge: bool,
    pub keep_temp: bool,
    pub progress: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("downloads"),
            timeout: DEFAULT_TIMEOUT,
            merge: true,
            keep_temp: false,
            progress: true,
        }
    }
}

impl DownloadOptions {
    pub fn work_dir(&self) -> PathBuf {
        self.directory.join("temp")
    }
}

/// Download, decrypt and (when there are exactly two tracks) merge every
/// track of the manifest at `playlist_url`.
///
/// Returns the paths of the final output files.
pub async fn download<T: MediaToolchain>(
    client: &Client,
    toolchain: &T,
    playlist_url: &str,
    key: &ContentKey,
    audio_only: bool,
    options: &DownloadOptions,
    cancel: CancellationToken,
) -> Result<Vec<PathBuf>> {
    let base_url = utils::base_url(playlist_url)?;
    let playlist_url = playlist_url
        .parse::<Url>()
        .map_err(|_| Error::Url(playlist_url.to_owned()))?;
    let presentation = Presentation::fetch(client, &playlist_url, options.timeout).await?;
    let expected = presentation.segment_count()?;

    for track in &presentation.tracks {
        info!(
            "Segments: {} | Media Type: {} | Codec: {} | Sample Rate: {}",
            expected,
            track.content_type,
            track.codecs.as_deref().unwrap_or("unknown"),
            track.sample_rate.as_deref().unwrap_or("-"),
        );
    }

    let work_dir = options.work_dir();

    if !work_dir.exists() {
        fs::create_dir_all(&work_dir).await?;
    }

    let downloader = SegmentedDownloader::new(client.clone())
        .timeout(options.timeout)
        .cancellation(cancel)
        .progress(options.progress);

    let mut outputs = Vec::with_capacity(presentation.tracks.len());

    for track in &presentation.tracks {
        let plan = SegmentPlan::new(
            base_url.clone(),
            &track.initialization,
            expected,
            &track.representation_id,
        );
        let container = downloader
            .download(&plan, &work_dir.join(&track.initialization))
            .await?;

        if container.tolerated_missing {
            info!(
                "{} track has {} segments",
                track.content_type, container.segments
            );
        }

        let decrypted = toolchain
            .decrypt(
                &container.path,
                &key.to_hex(),
                &format!("master_{}", track.content_type),
            )
            .await?;

        outputs.push(decrypted);
    }

    if outputs.len() == 2 && options.merge && !audio_only {
        match presentation.default_kid() {
            Some(kid) => {
                let (video, audio) = video_and_audio(&presentation, &outputs);
                let merged = toolchain
                    .merge(&video, &audio, &utils::short_id(kid))
                    .await?;
                outputs = vec![merged];
            }
            None => warn!("No default KID in the manifest, skipping merge."),
        }
    }

    if !options.keep_temp {
        info!("Deleting {}", work_dir.to_string_lossy());
        fs::remove_dir_all(&work_dir).await?;
    }

    Ok(outputs)
}

// Tracks come in manifest order, which need not be video first.
fn video_and_audio(presentation: &Presentation, outputs: &[PathBuf]) -> (PathBuf, PathBuf) {
    if presentation.tracks[0].content_type == "audio" {
        (outputs[1].clone(), outputs[0].clone())
    } else {
        (outputs[0].clone(), outputs[1].clone())
    }
}
