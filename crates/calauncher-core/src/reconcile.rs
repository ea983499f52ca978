use log::debug;

use crate::installed::InstalledRelease;
use crate::release::RemoteRelease;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateDecision {
    /// Newest release the current mode allows, if the feed offered any.
    pub best_available: Option<RemoteRelease>,
    pub update_available: bool,
}

impl UpdateDecision {
    /// The release to install when an update is pending.
    #[must_use]
    pub fn pending(&self) -> Option<&RemoteRelease> {
        self.best_available
            .as_ref()
            .filter(|_| self.update_available)
    }
}

/// Compare the newest offered release with the newest install.
///
/// `available` must be sorted newest first. With `include_unstable` false
/// both sides are restricted to stable releases.
#[must_use]
pub fn check_for_update(
    available: &[RemoteRelease],
    installed: &[InstalledRelease],
    include_unstable: bool,
) -> UpdateDecision {
    let best_available = available
        .iter()
        .find(|release| include_unstable || release.is_stable())
        .cloned();

    let best_installed = installed
        .iter()
        .filter(|release| include_unstable || release.is_stable())
        .max_by_key(|release| release.effective_date());

    let update_available = match (&best_available, best_installed) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(offered), Some(local)) => offered.published_at > local.effective_date(),
    };

    debug!(
        "Update check: best available {:?}, best installed {:?}, update {update_available}",
        best_available.as_ref().map(|r| r.tag.as_str()),
        best_installed.map(|r| r.version.as_str()),
    );

    UpdateDecision {
        best_available,
        update_available,
    }
}

/// Reset and recompute the latest / latest-stable flags on `installed`.
///
/// `available` is the list as the feed returned it, before any stability
/// filtering, sorted newest first.
pub fn mark_latest(
    installed: &mut [InstalledRelease],
    available: &[RemoteRelease],
    include_unstable: bool,
) {
    for release in installed.iter_mut() {
        release.is_latest = false;
        release.is_latest_stable = false;
    }

    let latest_stable = available.iter().find(|release| release.is_stable());
    let latest_overall = available.first();

    let mut flag = |tag: &str, set: fn(&mut InstalledRelease)| {
        if let Some(release) = installed.iter_mut().find(|r| r.version == tag) {
            set(release);
        }
    };

    match (latest_stable, latest_overall) {
        (Some(stable), Some(overall)) if stable.tag == overall.tag => {
            flag(&stable.tag, |r| r.is_latest = true);
        }
        (Some(stable), Some(overall)) => {
            flag(&stable.tag, |r| r.is_latest_stable = true);
            if include_unstable {
                flag(&overall.tag, |r| r.is_latest = true);
            }
        }
        (Some(stable), None) => flag(&stable.tag, |r| r.is_latest = true),
        (None, Some(overall)) if include_unstable => {
            flag(&overall.tag, |r| r.is_latest = true);
        }
        (None, _) => {}
    }
}
