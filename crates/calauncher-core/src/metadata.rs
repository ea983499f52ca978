use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::release::{Asset, RemoteRelease, filter_and_sort, min_timestamp};

/// Cached facts about one release, keyed by its tag in the metadata file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CachedReleaseRecord {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "min_timestamp", with = "timestamp")]
    pub release_date: DateTime<Utc>,
    #[serde(default)]
    pub pre_release: bool,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub windows_asset_name: String,
    #[serde(default)]
    pub windows_asset_download_url: String,
    #[serde(default)]
    pub windows_asset_size: u64,
}

impl CachedReleaseRecord {
    #[must_use]
    pub fn from_release(release: &RemoteRelease) -> Self {
        let asset = release.portable_asset();
        Self {
            version: release.tag.clone(),
            name: release.name.clone(),
            release_date: release.published_at,
            pre_release: release.prerelease,
            draft: release.draft,
            windows_asset_name: asset.map(|a| a.name.clone()).unwrap_or_default(),
            windows_asset_download_url: asset
                .map(|a| a.download_url.clone())
                .unwrap_or_default(),
            windows_asset_size: asset.map_or(0, |a| a.size),
        }
    }

    fn to_release(&self) -> RemoteRelease {
        let mut assets = Vec::new();
        if !self.windows_asset_name.is_empty() {
            assets.push(Asset {
                name: self.windows_asset_name.clone(),
                download_url: self.windows_asset_download_url.clone(),
                size: self.windows_asset_size,
            });
        }
        RemoteRelease {
            tag: self.version.clone(),
            name: self.name.clone(),
            published_at: self.release_date,
            prerelease: self.pre_release,
            draft: self.draft,
            assets,
        }
    }
}

/// Persistent map of release tag to cached release facts.
///
/// The store is the only writer of its file. Read and write failures never
/// reach the caller: an unreadable file starts the store empty and a failed
/// save keeps the in-memory state.
#[derive(Debug, Default)]
pub struct MetadataStore {
    path: Option<PathBuf>,
    records: BTreeMap<String, CachedReleaseRecord>,
}

impl MetadataStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = load_records(&path);
        debug!(
            "Loaded {} release metadata records from {}",
            records.len(),
            path.display()
        );
        Self {
            path: Some(path),
            records,
        }
    }

    /// A store that never touches the disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, version: &str) -> Option<&CachedReleaseRecord> {
        self.records.get(version)
    }

    #[must_use]
    pub fn release_date(&self, version: &str) -> Option<DateTime<Utc>> {
        self.records.get(version).map(|record| record.release_date)
    }

    /// Insert or replace records for every release, then persist once.
    pub fn upsert_all<'a>(&mut self, releases: impl IntoIterator<Item = &'a RemoteRelease>) {
        let mut added = 0_usize;
        let mut updated = 0_usize;
        for release in releases {
            let record = CachedReleaseRecord::from_release(release);
            if self.records.insert(release.tag.clone(), record).is_some() {
                updated += 1;
            } else {
                added += 1;
            }
        }
        debug!("Release metadata: {added} added, {updated} updated");
        self.save();
    }

    /// Rebuild the installable release list from cache alone.
    ///
    /// Records without a download URL are skipped. With `include_unstable`
    /// false only stable releases remain.
    #[must_use]
    pub fn cached_releases(&self, include_unstable: bool) -> Vec<RemoteRelease> {
        let releases = self
            .records
            .values()
            .filter(|record| !record.windows_asset_download_url.is_empty())
            .map(CachedReleaseRecord::to_release)
            .collect();

        let mut releases = filter_and_sort(releases);
        if !include_unstable {
            releases.retain(|release| !release.prerelease && release.is_stable());
        }
        releases
    }

    fn save(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let data = match serde_json::to_vec_pretty(&self.records) {
            Ok(data) => data,
            Err(error) => {
                warn!("Failed to serialize release metadata: {error}");
                return;
            }
        };
        if let Err(error) = calauncher_platform::write_atomic(path, &data) {
            warn!(
                "Failed to save release metadata to {}: {error}",
                path.display()
            );
        }
    }
}

fn load_records(path: &Path) -> BTreeMap<String, CachedReleaseRecord> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(error) => {
            warn!(
                "Failed to read release metadata {}: {error}",
                path.display()
            );
            return BTreeMap::new();
        }
    };
    serde_json::from_str(&data).unwrap_or_else(|error| {
        warn!(
            "Discarding unreadable release metadata {}: {error}",
            path.display()
        );
        BTreeMap::new()
    })
}

mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::release::{min_timestamp, parse_timestamp};

    pub(super) fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(min_timestamp))
    }
}
