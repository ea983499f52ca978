use std::collections::BTreeSet;

use calauncher_core::InstalledRelease;
use chrono::{DateTime, Utc};

use crate::frontend::Severity;

/// What the launcher is busy with. Checking and downloading never overlap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Checking,
    Downloading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Action {
    Launch,
    Delete,
    CheckForUpdates,
    InstallUpdate,
    CancelDownload,
    Select,
    ToggleIncludeTestReleases,
}

/// Snapshot of everything a frontend needs to render the launcher.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub phase: Phase,
    pub status: String,
    pub severity: Severity,
    pub installed: Vec<InstalledRelease>,
    pub selected: Option<String>,
    pub update_available: bool,
    pub pending_release: Option<String>,
    pub include_test_releases: bool,
    pub last_update_check: Option<DateTime<Utc>>,
    pub check_cooldown: chrono::Duration,
}

impl ViewState {
    pub fn selected_release(&self) -> Option<&InstalledRelease> {
        let selected = self.selected.as_deref()?;
        self.installed.iter().find(|r| r.version == selected)
    }

    /// Time left before a manual update check is allowed again.
    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let last = self.last_update_check?;
        let remaining = self.check_cooldown - (now - last);
        (remaining > chrono::Duration::zero()).then_some(remaining)
    }

    pub fn update_button_label(&self) -> &'static str {
        if self.phase == Phase::Downloading {
            "Cancel Download"
        } else if self.update_available {
            if self.installed.is_empty() {
                "Install Now"
            } else {
                "Update Now"
            }
        } else {
            "Check for Updates"
        }
    }
}

/// Operations a frontend may offer for `view` at `now`.
pub fn available_actions(view: &ViewState, now: DateTime<Utc>) -> BTreeSet<Action> {
    let mut actions = BTreeSet::new();

    match view.phase {
        Phase::Downloading => {
            actions.insert(Action::CancelDownload);
            return actions;
        }
        Phase::Checking => return actions,
        Phase::Idle => {}
    }

    if view
        .selected_release()
        .is_some_and(InstalledRelease::is_installed)
    {
        actions.insert(Action::Launch);
        actions.insert(Action::Delete);
    }
    if view.update_available && view.pending_release.is_some() {
        actions.insert(Action::InstallUpdate);
    }
    if view.cooldown_remaining(now).is_none() {
        actions.insert(Action::CheckForUpdates);
    }
    if !view.installed.is_empty() {
        actions.insert(Action::Select);
    }
    actions.insert(Action::ToggleIncludeTestReleases);
    actions
}
