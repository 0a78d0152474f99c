use super::{DownloadJob, SegmentPlan, job::SegmentState};
use crate::{
    error::{Error, Result},
    progress::Progress,
};
use log::{debug, info, trace, warn};
use reqwest::{Client, StatusCode, Url};
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use tokio::{
    fs::{self, File, OpenOptions},
    io::{self, AsyncWriteExt},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of a finished segmented download.
#[derive(Debug)]
pub struct Container {
    pub path: PathBuf,
    /// Media segments written after the init segment.
    pub segments: usize,
    /// The last index answered 404 and was dropped from the count.
    pub tolerated_missing: bool,
}

/// Fetches an init segment plus every media segment of a [`SegmentPlan`]
/// concurrently and folds them into one container file.
#[derive(Clone)]
pub struct SegmentedDownloader {
    client: Client,
    timeout: Duration,
    cancel: CancellationToken,
    progress: bool,
}

enum Fetched {
    Bytes(usize),
    Missing,
}

impl SegmentedDownloader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
            cancel: CancellationToken::new(),
            progress: false,
        }
    }

    /// Timeout applied to every request, init segment included.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Cancelling `token` aborts any running download with [`Error::Cancelled`].
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Download `plan` into `output`.
    ///
    /// On failure neither the container nor any temporary slot is left behind.
    pub async fn download(&self, plan: &SegmentPlan, output: &Path) -> Result<Container> {
        let temp_dir = output.with_extension("parts");
        let result = self.download_inner(plan, output, &temp_dir).await;

        if temp_dir.exists() {
            debug!("Deleting {}", temp_dir.to_string_lossy());

            if let Err(e) = fs::remove_dir_all(&temp_dir).await {
                warn!("Couldn't delete {} ({})", temp_dir.to_string_lossy(), e);
            }
        }

        if result.is_err() && output.exists() {
            info!("Deleting {}", output.to_string_lossy());

            if let Err(e) = fs::remove_file(output).await {
                warn!("Couldn't delete {} ({})", output.to_string_lossy(), e);
            }
        }

        result
    }

    async fn download_inner(
        &self,
        plan: &SegmentPlan,
        output: &Path,
        temp_dir: &Path,
    ) -> Result<Container> {
        let init_url = plan.init_url()?;
        let response = self.client.get(init_url.clone()).timeout(self.timeout).send().await?;

        if !response.status().is_success() {
            return Err(Error::Network {
                url: init_url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let init = response.bytes().await?;

        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let mut container = File::create(output).await?;
        container.write_all(&init).await?;
        container.flush().await?;
        drop(container);

        fs::create_dir_all(temp_dir).await?;

        let job = Arc::new(Mutex::new(DownloadJob::new(plan.expected)));
        lock(&job).start();

        let token = self.cancel.child_token();
        let pb = if self.progress {
            Progress::new(&plan.adaptation_id, plan.expected)
        } else {
            Progress::hidden()
        };

        let mut set = JoinSet::new();

        for index in 1..=plan.expected {
            let task = SegmentTask {
                client: self.client.clone(),
                index,
                job: job.clone(),
                pb: pb.clone(),
                slot: slot_path(temp_dir, index),
                timeout: self.timeout,
                token: token.clone(),
                url: plan.segment_url(index)?,
            };

            set.spawn(task.execute());
        }

        let mut fatal = Vec::new();

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(())) => (),
                Ok(Err((index, e))) => fatal.push((index, e)),
                Err(e) => {
                    token.cancel();
                    fatal.push((usize::MAX, Error::Io(std::io::Error::other(e))));
                }
            }
        }

        drop(pb);

        let mut job = match Arc::try_unwrap(job) {
            Ok(job) => job.into_inner().unwrap_or_else(|x| x.into_inner()),
            Err(_) => return Err(Error::Io(std::io::Error::other("segment task outlived its job"))),
        };

        if let Some((_, e)) = fatal
            .into_iter()
            .filter(|(_, e)| !matches!(e, Error::Cancelled))
            .min_by_key(|(index, _)| *index)
        {
            job.abort();
            return Err(e);
        }

        if self.cancel.is_cancelled() || !job.begin_reassembly() {
            job.abort();
            return Err(Error::Cancelled);
        }

        let tolerated_missing = job.expected() < plan.expected;
        let segments = fold(output, temp_dir, job.completed()).await?;
        job.finish();

        Ok(Container {
            path: output.to_owned(),
            segments,
            tolerated_missing,
        })
    }
}

/// Append every slot to the container in ascending index order.
async fn fold(
    output: &Path,
    temp_dir: &Path,
    indices: impl Iterator<Item = usize>,
) -> Result<usize> {
    info!("Merging segments {}", output.to_string_lossy());

    let mut container = OpenOptions::new().append(true).open(output).await?;
    let mut count = 0;

    for index in indices {
        let mut slot = File::open(slot_path(temp_dir, index)).await?;
        io::copy(&mut slot, &mut container).await?;
        count += 1;
    }

    container.flush().await?;
    Ok(count)
}

fn slot_path(temp_dir: &Path, index: usize) -> PathBuf {
    temp_dir.join(format!("{index}.m4s"))
}

fn lock(job: &Mutex<DownloadJob>) -> MutexGuard<'_, DownloadJob> {
    job.lock().unwrap_or_else(|x| x.into_inner())
}

struct SegmentTask {
    client: Client,
    index: usize,
    job: Arc<Mutex<DownloadJob>>,
    pb: Progress,
    slot: PathBuf,
    timeout: Duration,
    token: CancellationToken,
    url: Url,
}

impl SegmentTask {
    async fn execute(self) -> std::result::Result<(), (usize, Error)> {
        let fetched = tokio::select! {
            _ = self.token.cancelled() => Err(Error::Cancelled),
            fetched = self.fetch() => fetched,
        };

        let mut job = lock(&self.job);

        let error = match fetched {
            Ok(Fetched::Bytes(len)) => {
                job.complete(self.index);
                drop(job);
                self.pb.update(len);
                return Ok(());
            }
            Ok(Fetched::Missing) if job.tolerate_missing(self.index) => {
                warn!(
                    "Segment {} wasn't found, segment count was overestimated by one ({} segments).",
                    self.index,
                    job.expected()
                );
                return Ok(());
            }
            Ok(Fetched::Missing) => Error::Network {
                url: self.url.to_string(),
                status: StatusCode::NOT_FOUND.as_u16(),
            },
            Err(e) => e,
        };

        if let Error::Cancelled = error {
            job.cancel(self.index);
        } else {
            debug!("Segment {} failed: {}", self.index, error);
            job.fail(self.index);
            self.token.cancel();
        }

        debug_assert!(job.segment(self.index) != Some(SegmentState::Pending));
        Err((self.index, error))
    }

    async fn fetch(&self) -> Result<Fetched> {
        trace!("Fetching segment {} {}", self.index, self.url);

        let response = self
            .client
            .get(self.url.clone())
            .timeout(self.timeout)
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(Fetched::Missing);
        }

        if !status.is_success() {
            return Err(Error::Network {
                url: self.url.to_string(),
                status: status.as_u16(),
            });
        }

        let data = response.bytes().await?;
        let part = self.slot.with_extension("m4s.part");
        let mut file = File::create(&part).await?;
        file.write_all(&data).await?;
        file.flush().await?;
        drop(file);
        fs::rename(&part, &self.slot).await?;

        Ok(Fetched::Bytes(data.len()))
    }
}
