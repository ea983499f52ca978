use std::path::{Component, Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use thiserror::Error;

use crate::metadata::MetadataStore;
use crate::release::{EXECUTABLE_NAME, ReleaseKind, classify};

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("release folder not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to delete release {version}: {source}")]
    Io {
        version: String,
        #[source]
        source: std::io::Error,
    },
    #[error("release {version} is not installed")]
    NotInstalled { version: String },
    #[error("failed to launch {version}: {source}")]
    Launch {
        version: String,
        #[source]
        source: std::io::Error,
    },
}

/// A release folder under the install root that holds a usable executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledRelease {
    /// Folder name, which is also the release tag.
    pub version: String,
    /// Directory containing the executable; nested below the release folder
    /// when the archive wrapped its contents.
    pub folder: PathBuf,
    pub installed_at: DateTime<Utc>,
    pub release_date: Option<DateTime<Utc>>,
    pub executable: PathBuf,
    pub is_latest: bool,
    pub is_latest_stable: bool,
}

impl InstalledRelease {
    /// Local installs carry no prerelease flag, so only the tag decides.
    #[must_use]
    pub fn kind(&self) -> ReleaseKind {
        classify(&self.version, false)
    }

    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.kind().is_stable()
    }

    #[must_use]
    pub fn effective_date(&self) -> DateTime<Utc> {
        self.release_date.unwrap_or(self.installed_at)
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        if self.is_latest {
            format!("{} (Latest)", self.version)
        } else if self.is_latest_stable && self.is_stable() {
            format!("{} (Latest Stable)", self.version)
        } else {
            self.version.clone()
        }
    }

    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.executable.is_file()
    }
}

/// List installs under `root`, newest first.
///
/// Only folders the metadata store knows about are considered, so archives
/// unpacked by hand never show up.
#[must_use]
pub fn scan_installed(root: &Path, metadata: &MetadataStore) -> Vec<InstalledRelease> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to read install root {}: {error}", root.display());
            }
            return Vec::new();
        }
    };

    let mut releases: Vec<InstalledRelease> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_dir()))
        .filter_map(|entry| {
            let version = entry.file_name().to_string_lossy().into_owned();
            let Some(release_date) = metadata.release_date(&version) else {
                debug!("Skipping {version}: no release metadata");
                return None;
            };
            let folder = entry.path();
            let Some(executable) = find_executable(&folder) else {
                debug!("Skipping {version}: {EXECUTABLE_NAME} not found");
                return None;
            };
            Some(InstalledRelease {
                installed_at: folder_timestamp(&folder),
                folder: executable
                    .parent()
                    .map_or_else(|| folder.clone(), Path::to_path_buf),
                version,
                release_date: Some(release_date),
                executable,
                is_latest: false,
                is_latest_stable: false,
            })
        })
        .collect();

    releases.sort_by(|a, b| b.effective_date().cmp(&a.effective_date()));
    releases
}

fn folder_timestamp(folder: &Path) -> DateTime<Utc> {
    std::fs::metadata(folder)
        .and_then(|meta| meta.created().or_else(|_| meta.modified()))
        .map_or_else(|_| Utc::now(), DateTime::<Utc>::from)
}

/// Locate the game executable in `dir`, looking at the folder itself first
/// and then depth-first through subfolders in name order.
#[must_use]
pub fn find_executable(dir: &Path) -> Option<PathBuf> {
    let direct = dir.join(EXECUTABLE_NAME);
    if direct.is_file() {
        return Some(direct);
    }
    search_tree(dir)
}

fn search_tree(dir: &Path) -> Option<PathBuf> {
    let mut entries: Vec<_> = std::fs::read_dir(dir).ok()?.filter_map(Result::ok).collect();
    entries.sort_by_key(std::fs::DirEntry::file_name);

    for entry in entries {
        let Ok(kind) = entry.file_type() else {
            continue;
        };
        if kind.is_file() && entry.file_name() == EXECUTABLE_NAME {
            return Some(entry.path());
        }
        if kind.is_dir()
            && let Some(found) = search_tree(&entry.path())
        {
            return Some(found);
        }
    }
    None
}

/// Remove the `<root>/<version>` folder and everything in it.
///
/// Blocking; callers on the async runtime should go through
/// `spawn_blocking`. Cached metadata for the version is left in place.
///
/// # Errors
/// Returns [`ReleaseError::NotFound`] when the folder does not exist and
/// [`ReleaseError::Io`] when it cannot be removed.
pub fn delete_release(root: &Path, version: &str) -> Result<(), ReleaseError> {
    let folder = root.join(version);
    let single_component = matches!(
        Path::new(version).components().collect::<Vec<_>>().as_slice(),
        [Component::Normal(_)]
    );
    if !single_component || !folder.is_dir() {
        return Err(ReleaseError::NotFound { path: folder });
    }

    std::fs::remove_dir_all(&folder).map_err(|source| ReleaseError::Io {
        version: version.to_string(),
        source,
    })?;
    info!("Deleted release {version} at {}", folder.display());
    Ok(())
}

/// Start the release's executable as an independent process.
///
/// # Errors
/// Returns [`ReleaseError::NotInstalled`] when the executable has gone
/// missing and [`ReleaseError::Launch`] when the process cannot be spawned.
pub fn launch_release(release: &InstalledRelease) -> Result<(), ReleaseError> {
    if !release.is_installed() {
        return Err(ReleaseError::NotInstalled {
            version: release.version.clone(),
        });
    }

    let working_dir = release
        .executable
        .parent()
        .unwrap_or(release.folder.as_path());
    let child = Command::new(&release.executable)
        .current_dir(working_dir)
        .spawn()
        .map_err(|source| ReleaseError::Launch {
            version: release.version.clone(),
            source,
        })?;
    info!("Launched {} (pid {})", release.version, child.id());
    Ok(())
}
