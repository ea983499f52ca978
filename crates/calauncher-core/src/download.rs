use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use log::{debug, info, warn};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use crate::progress::{DownloadProgress, ProgressEvent, ProgressSampler};
use crate::release::{EXECUTABLE_NAME, RemoteRelease};

const CHUNK_SIZE: usize = 8 * 1024;
const FALLBACK_TOTAL_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    Http {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("download failed with HTTP {status}")]
    HttpStatus { status: reqwest::StatusCode },
    #[error("{context}: {source}")]
    Zip {
        context: &'static str,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("background task failed: {0}")]
    Join(String),
    #[error("no Windows portable asset found for release {version}")]
    MissingAsset { version: String },
    #[error("{0}")]
    Invalid(String),
    #[error("download cancelled")]
    Cancelled,
}

impl InstallError {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    fn http(context: &'static str, source: reqwest::Error) -> Self {
        Self::Http { context, source }
    }

    fn zip(context: &'static str, source: zip::result::ZipError) -> Self {
        Self::Zip { context, source }
    }

    fn io_with_path(context: &'static str, path: &Path, source: &std::io::Error) -> Self {
        Self::io(
            context,
            std::io::Error::new(source.kind(), format!("{}: {source}", path.display())),
        )
    }
}

/// Downloads release archives and unpacks them into the install tree.
#[derive(Debug, Clone)]
pub struct Installer {
    http: reqwest::Client,
    install_root: PathBuf,
    download_dir: PathBuf,
    max_bytes_per_second: Option<u64>,
}

impl Installer {
    #[must_use]
    pub fn new(http: reqwest::Client, install_root: PathBuf, download_dir: PathBuf) -> Self {
        Self {
            http,
            install_root,
            download_dir,
            max_bytes_per_second: None,
        }
    }

    /// Cap the download rate; `None` or zero disables throttling.
    #[must_use]
    pub fn with_max_speed(mut self, max_bytes_per_second: Option<u64>) -> Self {
        self.max_bytes_per_second = max_bytes_per_second.filter(|limit| *limit > 0);
        self
    }

    #[must_use]
    pub fn target_dir(&self, version: &str) -> PathBuf {
        self.install_root.join(version)
    }

    /// Download `release`'s portable archive and extract it into
    /// `<install root>/<tag>`.
    ///
    /// An install that already holds the executable is returned untouched.
    /// `on_progress` runs on the download loop; `on_extract_start` runs once
    /// when the download is complete. The temporary archive is removed on
    /// every exit path.
    ///
    /// # Errors
    /// Returns [`InstallError::Cancelled`] when `cancel` fires, and a
    /// descriptive error when the asset is missing, the download fails, or the
    /// archive does not produce any files.
    pub async fn install_release<P, E>(
        &self,
        release: &RemoteRelease,
        mut on_progress: P,
        mut on_extract_start: E,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, InstallError>
    where
        P: FnMut(&DownloadProgress),
        E: FnMut(),
    {
        let asset = release
            .portable_asset()
            .ok_or_else(|| InstallError::MissingAsset {
                version: release.tag.clone(),
            })?;

        let target = self.target_dir(&release.tag);
        if target.is_dir() && target.join(EXECUTABLE_NAME).is_file() {
            info!("{} is already installed at {}", release.tag, target.display());
            return Ok(target);
        }

        std::fs::create_dir_all(&self.download_dir).map_err(|error| {
            InstallError::io_with_path(
                "failed to create download directory",
                &self.download_dir,
                &error,
            )
        })?;
        let download_path = tempfile::Builder::new()
            .prefix(".calauncher-")
            .suffix(".zip")
            .tempfile_in(&self.download_dir)
            .map_err(|error| InstallError::io("failed to create temporary download file", error))?
            .into_temp_path();

        info!("Downloading {} from {}", release.tag, asset.download_url);
        let mut on_event = |event: ProgressEvent| match event {
            ProgressEvent::Progress(progress) => on_progress(&progress),
            ProgressEvent::ExtractionStarting => on_extract_start(),
        };
        let downloaded = self
            .download(&asset.download_url, asset.size, &download_path, &mut on_event, cancel)
            .await?;
        info!("Download of {} complete: {downloaded} bytes", release.tag);

        let archive = download_path.to_path_buf();
        let destination = target.clone();
        let result = tokio::task::spawn_blocking(move || install_archive(&archive, &destination))
            .await
            .map_err(|error| InstallError::Join(error.to_string()))?;

        if let Err(error) = download_path.close() {
            warn!("Failed to remove temporary download: {error}");
        }
        result.map(|()| target)
    }

    async fn download<F>(
        &self,
        url: &str,
        recorded_size: u64,
        dest: &Path,
        on_event: &mut F,
        cancel: &CancellationToken,
    ) -> Result<u64, InstallError>
    where
        F: FnMut(ProgressEvent),
    {
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(InstallError::Cancelled),
            response = self.http.get(url).send() => {
                response.map_err(|error| InstallError::http("download request failed", error))?
            }
        };

        if !response.status().is_success() {
            return Err(InstallError::HttpStatus {
                status: response.status(),
            });
        }

        let total = expected_total(response.content_length(), recorded_size);
        let mut file = tokio::fs::File::create(dest).await.map_err(|error| {
            InstallError::io_with_path("failed to create download file", dest, &error)
        })?;
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));
        let mut reader = StreamReader::new(stream);

        let mut sampler = ProgressSampler::new(total, Instant::now());
        let downloaded = copy_chunks(
            &mut reader,
            &mut file,
            self.max_bytes_per_second,
            &mut sampler,
            on_event,
            cancel,
        )
        .await?;
        drop(file);

        let size = tokio::fs::metadata(dest)
            .await
            .map_err(|_| InstallError::Invalid("Downloaded file does not exist".to_string()))?
            .len();
        if size == 0 {
            return Err(InstallError::Invalid("Downloaded file is empty".to_string()));
        }

        if let Some(event) = sampler.finish() {
            on_event(event);
        }
        Ok(downloaded)
    }
}

fn expected_total(content_length: Option<u64>, recorded_size: u64) -> u64 {
    content_length
        .filter(|length| *length > 0)
        .or(Some(recorded_size).filter(|size| *size > 0))
        .unwrap_or(FALLBACK_TOTAL_BYTES)
}

/// Per-chunk rate limiter.
///
/// Each chunk is given `bytes / limit` seconds; whatever part of that budget
/// has not already elapsed since the previous chunk is slept away. Arrival
/// jitter is not smoothed out.
#[derive(Debug)]
struct Throttle {
    bytes_per_second: Option<u64>,
    last: Instant,
}

impl Throttle {
    fn new(bytes_per_second: Option<u64>, now: Instant) -> Self {
        Self {
            bytes_per_second: bytes_per_second.filter(|limit| *limit > 0),
            last: now,
        }
    }

    fn is_enabled(&self) -> bool {
        self.bytes_per_second.is_some()
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn delay_for(&self, bytes: usize, now: Instant) -> Option<Duration> {
        let limit = self.bytes_per_second?;
        let budget = Duration::from_secs_f64(bytes as f64 / limit as f64);
        let elapsed = now.duration_since(self.last);
        let remaining = budget.checked_sub(elapsed)?;
        let millis = remaining.as_millis() as u64;
        (millis > 0).then(|| Duration::from_millis(millis))
    }

    fn reset(&mut self, now: Instant) {
        self.last = now;
    }
}

async fn copy_chunks<R, W, F>(
    reader: &mut R,
    writer: &mut W,
    max_bytes_per_second: Option<u64>,
    sampler: &mut ProgressSampler,
    on_event: &mut F,
    cancel: &CancellationToken,
) -> Result<u64, InstallError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    F: FnMut(ProgressEvent),
{
    let mut buffer = vec![0_u8; CHUNK_SIZE];
    let mut downloaded = 0_u64;
    let mut throttle = Throttle::new(max_bytes_per_second, Instant::now());

    loop {
        let read = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(InstallError::Cancelled),
            read = reader.read(&mut buffer) => {
                read.map_err(|error| InstallError::io("download stream error", error))?
            }
        };
        if read == 0 {
            break;
        }

        writer
            .write_all(&buffer[..read])
            .await
            .map_err(|error| InstallError::io("failed to write download data", error))?;
        downloaded += read as u64;

        if cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }

        if throttle.is_enabled() {
            if let Some(delay) = throttle.delay_for(read, Instant::now()) {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(InstallError::Cancelled),
                    () = tokio::time::sleep(delay) => {}
                }
            }
            throttle.reset(Instant::now());
        }

        if let Some(event) = sampler.record(downloaded, Instant::now()) {
            on_event(event);
        }
    }

    writer
        .flush()
        .await
        .map_err(|error| InstallError::io("failed to flush download file", error))?;
    debug!("Transferred {downloaded} bytes");
    Ok(downloaded)
}

/// Replace `target` with the contents of `archive`.
///
/// On failure the half-built target folder is removed so the install tree
/// never points at a broken release.
fn install_archive(archive: &Path, target: &Path) -> Result<(), InstallError> {
    if target.exists() {
        debug!("Removing previous install at {}", target.display());
        std::fs::remove_dir_all(target).map_err(|error| {
            InstallError::io_with_path("failed to remove existing release folder", target, &error)
        })?;
    }
    std::fs::create_dir_all(target).map_err(|error| {
        InstallError::io_with_path("failed to create release folder", target, &error)
    })?;

    let result = extract_zip(archive, target).and_then(|()| ensure_not_empty(target));
    if result.is_err() {
        let _ = std::fs::remove_dir_all(target);
    }
    result
}

fn ensure_not_empty(dir: &Path) -> Result<(), InstallError> {
    let mut entries = std::fs::read_dir(dir).map_err(|error| {
        InstallError::io_with_path("failed to read release folder", dir, &error)
    })?;
    if entries.next().is_none() {
        return Err(InstallError::Invalid(
            "ZIP extraction completed but release folder is empty".to_string(),
        ));
    }
    Ok(())
}

fn extract_zip(zip_path: &Path, dest: &Path) -> Result<(), InstallError> {
    let file = std::fs::File::open(zip_path).map_err(|error| {
        InstallError::io_with_path("failed to open zip file", zip_path, &error)
    })?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|error| InstallError::zip("failed to read zip archive", error))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|error| InstallError::zip("failed to read zip entry", error))?;
        let Some(name) = entry.enclosed_name() else {
            warn!("Skipping zip entry with unsafe path");
            continue;
        };
        let out_path = dest.join(name);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|error| {
                InstallError::io_with_path("failed to create extracted directory", &out_path, &error)
            })?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                InstallError::io_with_path("failed to create extracted directory", parent, &error)
            })?;
        }
        let mut outfile = std::fs::File::create(&out_path).map_err(|error| {
            InstallError::io_with_path("failed to create extracted file", &out_path, &error)
        })?;
        std::io::copy(&mut entry, &mut outfile).map_err(|error| {
            InstallError::io_with_path("failed to extract archive entry", &out_path, &error)
        })?;
    }

    debug!("Extraction complete to {}", dest.display());
    Ok(())
}
