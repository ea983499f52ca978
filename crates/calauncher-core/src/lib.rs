//! Release management core for the Combined Arms launcher.
//!
//! This crate is independent of any presentation layer:
//! - Release model and tag classification.
//! - Release feed fetching with metadata write-through.
//! - The on-disk release metadata store.
//! - Local install scanning, deletion, and launching.
//! - The throttled, cancellable download and extract pipeline.
//! - Update reconciliation and latest-release labeling.

mod download;
mod feed;
mod installed;
mod metadata;
mod progress;
mod reconcile;
mod release;

/// Download and extract pipeline with its error type.
pub use download::{InstallError, Installer};
/// Release feed endpoints and the fetching client.
pub use feed::{FeedClient, FeedError, FeedSource};
/// Installed release scanning and filesystem operations.
pub use installed::{
    InstalledRelease, ReleaseError, delete_release, find_executable, launch_release,
    scan_installed,
};
/// Persistent release metadata cache.
pub use metadata::{CachedReleaseRecord, MetadataStore};
/// Download progress snapshots.
pub use progress::DownloadProgress;
/// Update decision and latest-release labeling.
pub use reconcile::{UpdateDecision, check_for_update, mark_latest};
/// Release model, classification, and platform constants.
pub use release::{
    Asset, EXECUTABLE_NAME, PORTABLE_ASSET_SUFFIX, ReleaseKind, RemoteRelease, classify,
    min_timestamp, parse_timestamp,
};
