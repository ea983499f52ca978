use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

/// Suffix that identifies the self-contained Windows build among a release's assets.
pub const PORTABLE_ASSET_SUFFIX: &str = "-x64-winportable.zip";

/// Game executable that marks a folder as a usable install.
pub const EXECUTABLE_NAME: &str = "CombinedArms.exe";

const DEV_TEST_MARKER: &str = "-devtest-";
const PRE_RELEASE_MARKER: &str = "-prerelease-";

static STABLE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+\.\d+(\.\d+)?$").expect("stable tag pattern should compile")
});

/// Timestamp used for dates a feed or cache could not provide.
///
/// Year one keeps it representable in RFC 3339, so it survives a trip through
/// the metadata file unchanged.
#[must_use]
pub fn min_timestamp() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map_or(DateTime::<Utc>::MIN_UTC, |naive| naive.and_utc())
}

/// Parse a feed timestamp, accepting RFC 3339 and zone-less ISO 8601 (read as UTC).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseKind {
    Stable,
    PreRelease,
    DevTest,
    Unknown,
}

impl ReleaseKind {
    #[must_use]
    pub fn is_stable(self) -> bool {
        self == Self::Stable
    }
}

/// Classify a release tag.
///
/// Markers win over everything else; a plain `major.minor[.patch]` tag is only
/// stable when the feed did not flag it as a prerelease.
#[must_use]
pub fn classify(tag: &str, prerelease: bool) -> ReleaseKind {
    let lowered = tag.to_ascii_lowercase();
    if lowered.contains(DEV_TEST_MARKER) {
        ReleaseKind::DevTest
    } else if lowered.contains(PRE_RELEASE_MARKER) {
        ReleaseKind::PreRelease
    } else if !prerelease && STABLE_TAG.is_match(tag) {
        ReleaseKind::Stable
    } else {
        ReleaseKind::Unknown
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub download_url: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRelease {
    pub tag: String,
    pub name: String,
    pub published_at: DateTime<Utc>,
    pub prerelease: bool,
    pub draft: bool,
    pub assets: Vec<Asset>,
}

impl RemoteRelease {
    #[must_use]
    pub fn kind(&self) -> ReleaseKind {
        classify(&self.tag, self.prerelease)
    }

    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.kind().is_stable()
    }

    #[must_use]
    pub fn portable_asset(&self) -> Option<&Asset> {
        self.assets.iter().find(|asset| {
            asset
                .name
                .to_ascii_lowercase()
                .ends_with(PORTABLE_ASSET_SUFFIX)
        })
    }

    /// Whether the launcher can offer this release at all.
    #[must_use]
    pub fn is_installable(&self) -> bool {
        !self.draft && self.kind() != ReleaseKind::Unknown && self.portable_asset().is_some()
    }
}

/// Keep installable releases, newest first.
pub(crate) fn filter_and_sort(mut releases: Vec<RemoteRelease>) -> Vec<RemoteRelease> {
    releases.retain(RemoteRelease::is_installable);
    releases.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    releases
}
