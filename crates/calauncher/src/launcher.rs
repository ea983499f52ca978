use calauncher_core::{
    FeedClient, InstalledRelease, Installer, MetadataStore, RemoteRelease, UpdateDecision,
    check_for_update, delete_release, launch_release, mark_latest, scan_installed,
};
use calauncher_platform::AppPaths;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::LauncherConfig;
use crate::error::AppError;
use crate::frontend::{Frontend, Severity};
use crate::settings::SettingsStore;
use crate::state::{Phase, ViewState};

/// Where an update check gets its release list from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckSource {
    /// Query the feeds and refresh the metadata cache.
    Remote,
    /// Rebuild the list from the metadata cache only.
    Cached,
}

/// Owns every release-management operation and the state they share.
///
/// Each operation returns a fresh [`ViewState`]; status changes are also
/// pushed to the frontend as they happen.
pub struct Launcher<F> {
    frontend: F,
    paths: AppPaths,
    settings: SettingsStore,
    metadata: MetadataStore,
    feed: FeedClient,
    installer: Installer,
    check_cooldown: chrono::Duration,
    installed: Vec<InstalledRelease>,
    decision: UpdateDecision,
    selected: Option<String>,
    phase: Phase,
    status: String,
    severity: Severity,
}

impl<F: Frontend> Launcher<F> {
    pub fn new(config: &LauncherConfig, paths: AppPaths, frontend: F) -> Self {
        if let Err(error) = paths.ensure_dirs() {
            warn!("Failed to create launcher directories: {error}");
        }
        let http = config.http_client();
        Self {
            settings: SettingsStore::open(paths.settings_file()),
            metadata: MetadataStore::open(paths.metadata_file()),
            feed: FeedClient::new(http.clone(), config.feeds.clone()),
            installer: Installer::new(http, paths.releases_dir(), paths.downloads_dir())
                .with_max_speed(config.max_download_speed),
            check_cooldown: chrono::Duration::from_std(config.update_check_cooldown)
                .unwrap_or_else(|_| chrono::Duration::minutes(5)),
            frontend,
            paths,
            installed: Vec::new(),
            decision: UpdateDecision::default(),
            selected: None,
            phase: Phase::Idle,
            status: String::new(),
            severity: Severity::Normal,
        }
    }

    pub fn snapshot(&self) -> ViewState {
        ViewState {
            phase: self.phase,
            status: self.status.clone(),
            severity: self.severity,
            installed: self.installed.clone(),
            selected: self.selected.clone(),
            update_available: self.decision.update_available,
            pending_release: self.decision.pending().map(|r| r.tag.clone()),
            include_test_releases: self.settings.include_test_releases(),
            last_update_check: self.settings.last_update_check(),
            check_cooldown: self.check_cooldown,
        }
    }

    /// Startup sequence: query the feeds, then [`Launcher::load`]. The remote
    /// check here ignores the cooldown.
    pub async fn initialize(&mut self) -> ViewState {
        self.set_status("Initializing...", Severity::Normal);
        self.check_for_updates(CheckSource::Remote).await;
        self.load().await
    }

    /// Offline startup: scan installs, reconcile from cache so installs that
    /// predate the metadata are picked up, then restore the remembered
    /// selection.
    pub async fn load(&mut self) -> ViewState {
        self.refresh_installed();
        self.check_for_updates(CheckSource::Cached).await;

        let remembered = self
            .settings
            .selected_version()
            .filter(|version| self.installed.iter().any(|r| r.version == *version))
            .map(str::to_string);
        match remembered {
            Some(version) => self.selected = Some(version),
            None => self.select_newest(),
        }
        self.snapshot()
    }

    /// Run one update check. Does nothing while another check or a download
    /// is in progress.
    pub async fn check_for_updates(&mut self, source: CheckSource) -> ViewState {
        if self.phase != Phase::Idle {
            debug!("Skipping update check while {:?}", self.phase);
            return self.snapshot();
        }
        self.phase = Phase::Checking;
        self.set_status("Checking for updates...", Severity::Normal);

        let available = match source {
            CheckSource::Remote => {
                let releases = self.feed.fetch(&mut self.metadata).await;
                self.settings.set_last_update_check(Utc::now());
                releases
            }
            CheckSource::Cached => self.feed.cached(&self.metadata, true),
        };
        self.reconcile(&available);

        self.phase = Phase::Idle;
        self.snapshot()
    }

    /// Manual "check for updates", refused until the cooldown since the last
    /// remote check has passed.
    pub async fn request_update_check(&mut self) -> ViewState {
        self.request_update_check_at(Utc::now()).await
    }

    async fn request_update_check_at(&mut self, now: DateTime<Utc>) -> ViewState {
        if let Some(remaining) = self.snapshot().cooldown_remaining(now) {
            #[allow(clippy::cast_precision_loss)]
            let minutes = remaining.num_milliseconds() as f64 / 60_000.0;
            self.set_status(
                &format!("Please wait {minutes:.1} more minutes before checking for updates again"),
                Severity::Warning,
            );
            return self.snapshot();
        }
        self.check_for_updates(CheckSource::Remote).await
    }

    /// Download and install the pending update.
    ///
    /// `cancel` aborts the download; the install tree is left as it was.
    pub async fn install_update(&mut self, cancel: &CancellationToken) -> ViewState {
        if self.phase != Phase::Idle {
            debug!("Skipping install while {:?}", self.phase);
            return self.snapshot();
        }
        let Some(release) = self.decision.pending().cloned() else {
            self.set_status("No update available", Severity::Normal);
            return self.snapshot();
        };

        self.phase = Phase::Downloading;
        self.set_status(&format!("Downloading {}...", release.tag), Severity::Normal);

        let frontend = &self.frontend;
        let (status, severity) = (&mut self.status, &mut self.severity);
        let tag = release.tag.as_str();
        let result = self
            .installer
            .install_release(
                &release,
                |progress| {
                    frontend.report_progress(progress);
                    debug!(
                        "Downloading {tag}: {:.1}% at {}",
                        progress.percentage,
                        progress.formatted_speed()
                    );
                },
                || {
                    frontend.extraction_starting();
                    publish_status(
                        frontend,
                        status,
                        severity,
                        &format!("Extracting {tag}..."),
                        Severity::Normal,
                    );
                },
                cancel,
            )
            .await;
        self.phase = Phase::Idle;

        match result {
            Ok(path) => {
                info!("Installed {} at {}", release.tag, path.display());
                self.refresh_installed();
                self.check_for_updates(CheckSource::Cached).await;
                self.select(&release.tag);
                self.set_status(
                    &format!("Successfully installed {}", release.tag),
                    Severity::Success,
                );
            }
            Err(error) if error.is_cancelled() => {
                info!("Download of {} cancelled", release.tag);
                self.set_status(
                    &AppError::operation_cancelled("Download").to_string(),
                    Severity::Warning,
                );
            }
            Err(error) => {
                warn!("Installing {} failed: {error}", release.tag);
                self.set_status(
                    &AppError::operation_failed("Download", error).to_string(),
                    Severity::Error,
                );
            }
        }
        self.snapshot()
    }

    /// Delete the selected install after the frontend confirms it.
    pub async fn delete_selected(&mut self) -> ViewState {
        if self.phase != Phase::Idle {
            return self.snapshot();
        }
        let Some(version) = self.selected_installed().map(|r| r.version.clone()) else {
            return self.snapshot();
        };

        let confirmed = self
            .frontend
            .confirm(
                "Confirm Deletion",
                &format!("Are you sure you want to delete {version}?"),
            )
            .await;
        if !confirmed {
            debug!("Deletion of {version} declined");
            return self.snapshot();
        }

        self.set_status(&format!("Deleting {version}..."), Severity::Normal);
        let root = self.paths.releases_dir();
        let target = version.clone();
        let result = match tokio::task::spawn_blocking(move || delete_release(&root, &target)).await
        {
            Ok(result) => result.map_err(|error| {
                AppError::release_operation_failed("delete", version.as_str(), error)
            }),
            Err(error) => Err(AppError::release_operation_failed(
                "delete",
                version.as_str(),
                error,
            )),
        };

        if let Err(error) = result {
            warn!("{error}");
            self.set_status(&error.to_string(), Severity::Error);
            return self.snapshot();
        }

        self.refresh_installed();
        self.select_newest();
        self.check_for_updates(CheckSource::Cached).await;

        if !self.decision.update_available {
            let text = if self.selected.is_none() {
                format!("Successfully deleted {version}. No releases remaining.")
            } else {
                format!("Successfully deleted {version}")
            };
            self.set_status(&text, Severity::Success);
        }
        self.snapshot()
    }

    pub fn launch_selected(&mut self) -> ViewState {
        let result = match self.selected_installed() {
            Some(release) => launch_release(release)
                .map(|()| release.version.clone())
                .map_err(|error| AppError::operation_failed("Launch", error)),
            None => return self.snapshot(),
        };
        match result {
            Ok(version) => self.set_status(&format!("Launched {version}"), Severity::Success),
            Err(error) => self.set_status(&error.to_string(), Severity::Error),
        }
        self.snapshot()
    }

    /// Select an install by tag and remember the choice.
    ///
    /// # Errors
    /// Returns [`AppError::NotInstalled`] when no listed install has that tag.
    pub fn select_version(&mut self, version: &str) -> Result<ViewState, AppError> {
        if !self.installed.iter().any(|r| r.version == version) {
            return Err(AppError::not_installed(version));
        }
        self.select(version);
        Ok(self.snapshot())
    }

    pub async fn set_include_test_releases(&mut self, include: bool) -> ViewState {
        if self.settings.include_test_releases() == include {
            return self.snapshot();
        }
        self.settings.set_include_test_releases(include);
        self.refresh_installed();
        self.select_newest();
        self.check_for_updates(CheckSource::Cached).await
    }

    fn reconcile(&mut self, available: &[RemoteRelease]) {
        let include_unstable = self.settings.include_test_releases();
        self.decision = check_for_update(available, &self.installed, include_unstable);
        mark_latest(&mut self.installed, available, include_unstable);

        match (&self.decision.best_available, self.decision.update_available) {
            (None, _) => self.set_status("No releases found", Severity::Error),
            (Some(release), true) => {
                let text = format!("Update available: {}", release.tag);
                self.set_status(&text, Severity::Warning);
            }
            (Some(_), false) => self.set_status("No new updates.", Severity::Success),
        }
    }

    fn refresh_installed(&mut self) {
        let mut installed = scan_installed(&self.paths.releases_dir(), &self.metadata);
        if !self.settings.include_test_releases() {
            installed.retain(InstalledRelease::is_stable);
        }
        debug!("Found {} installed releases", installed.len());
        self.installed = installed;
        if let Some(selected) = &self.selected
            && !self.installed.iter().any(|r| r.version == *selected)
        {
            self.selected = None;
        }
    }

    fn selected_installed(&self) -> Option<&InstalledRelease> {
        let selected = self.selected.as_deref()?;
        self.installed
            .iter()
            .find(|r| r.version == selected && r.is_installed())
    }

    fn select(&mut self, version: &str) {
        if self.installed.iter().any(|r| r.version == version) {
            self.selected = Some(version.to_string());
            self.settings.set_selected_version(self.selected.clone());
        }
    }

    fn select_newest(&mut self) {
        self.selected = self.installed.first().map(|r| r.version.clone());
        self.settings.set_selected_version(self.selected.clone());
    }

    fn set_status(&mut self, text: &str, severity: Severity) {
        publish_status(
            &self.frontend,
            &mut self.status,
            &mut self.severity,
            text,
            severity,
        );
    }
}

/// Keep the snapshot's status line and the frontend in step.
fn publish_status<F: Frontend>(
    frontend: &F,
    status: &mut String,
    severity: &mut Severity,
    text: &str,
    new_severity: Severity,
) {
    text.clone_into(status);
    *severity = new_severity;
    frontend.set_status(text, new_severity);
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use calauncher_core::{DownloadProgress, EXECUTABLE_NAME, FeedSource};
    use calauncher_platform::AppPaths;
    use chrono::Utc;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{CheckSource, Launcher, publish_status};
    use crate::config::LauncherConfig;
    use crate::frontend::{Frontend, Severity};
    use crate::settings::SettingsStore;
    use crate::state::Phase;

    #[derive(Default)]
    struct RecordingFrontend {
        approve: bool,
        statuses: Mutex<Vec<(String, Severity)>>,
        confirmations: Mutex<Vec<String>>,
        extractions: Mutex<usize>,
        cancel_on_progress: Option<CancellationToken>,
    }

    impl RecordingFrontend {
        fn approving() -> Self {
            Self {
                approve: true,
                ..Self::default()
            }
        }

        fn saw_status(&self, text: &str) -> bool {
            self.statuses
                .lock()
                .expect("status lock")
                .iter()
                .any(|(status, _)| status == text)
        }
    }

    #[async_trait]
    impl Frontend for RecordingFrontend {
        async fn confirm(&self, _title: &str, message: &str) -> bool {
            self.confirmations
                .lock()
                .expect("confirmation lock")
                .push(message.to_string());
            self.approve
        }

        fn report_progress(&self, _progress: &DownloadProgress) {
            if let Some(cancel) = &self.cancel_on_progress {
                cancel.cancel();
            }
        }

        fn extraction_starting(&self) {
            *self.extractions.lock().expect("extraction lock") += 1;
        }

        fn set_status(&self, text: &str, severity: Severity) {
            self.statuses
                .lock()
                .expect("status lock")
                .push((text.to_string(), severity));
        }
    }

    struct Fixture {
        _temp: tempfile::TempDir,
        root: std::path::PathBuf,
        config: LauncherConfig,
    }

    impl Fixture {
        fn paths(&self) -> AppPaths {
            AppPaths::portable(&self.root)
        }

        fn launcher(&self, frontend: RecordingFrontend) -> Launcher<RecordingFrontend> {
            Launcher::new(&self.config, self.paths(), frontend)
        }

        fn install_on_disk(&self, version: &str) {
            let folder = self.paths().releases_dir().join(version);
            std::fs::create_dir_all(&folder).expect("release folder should be created");
            std::fs::write(folder.join(EXECUTABLE_NAME), b"exe").expect("exe should be written");
        }
    }

    fn feed_entry(tag: &str, published: &str, download_url: &str) -> serde_json::Value {
        json!({
            "tag_name": tag,
            "name": format!("Combined Arms {tag}"),
            "published_at": published,
            "prerelease": false,
            "draft": false,
            "assets": [{
                "name": format!("CombinedArms-{tag}-x64-winportable.zip"),
                "browser_download_url": download_url,
                "size": 0
            }]
        })
    }

    fn fixture(entries: &[serde_json::Value]) -> Fixture {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let root = temp.path().join("launcher");
        let feed_path = temp.path().join("feed.json");
        std::fs::write(&feed_path, serde_json::Value::from(entries.to_vec()).to_string())
            .expect("feed file should be written");
        let config = LauncherConfig {
            feeds: vec![FeedSource::File(feed_path)],
            portable_root: Some(root.clone()),
            ..LauncherConfig::default()
        };
        Fixture {
            _temp: temp,
            root,
            config,
        }
    }

    fn game_archive() -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file(EXECUTABLE_NAME, zip::write::SimpleFileOptions::default())
            .expect("entry should be started");
        writer.write_all(b"exe").expect("entry should be written");
        writer
            .finish()
            .expect("archive should be finalized")
            .into_inner()
    }

    async fn serve_archive(body: Vec<u8>) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn published_status_reaches_snapshot_and_frontend() {
        let frontend = RecordingFrontend::default();
        let mut status = "Downloading 1.07...".to_string();
        let mut severity = Severity::Normal;

        publish_status(
            &frontend,
            &mut status,
            &mut severity,
            "Extracting 1.07...",
            Severity::Normal,
        );
        publish_status(&frontend, &mut status, &mut severity, "Nope", Severity::Error);

        assert_eq!(status, "Nope");
        assert_eq!(severity, Severity::Error);
        assert!(frontend.saw_status("Extracting 1.07..."));
        assert!(frontend.saw_status("Nope"));
    }

    #[tokio::test]
    async fn initialize_reports_available_update_when_nothing_installed() {
        let fixture = fixture(&[
            feed_entry("1.07", "2025-01-10T00:00:00Z", "https://example.com/1.07.zip"),
            feed_entry("1.06", "2025-01-01T00:00:00Z", "https://example.com/1.06.zip"),
        ]);
        let mut launcher = fixture.launcher(RecordingFrontend::default());

        let view = launcher.initialize().await;

        assert!(view.update_available);
        assert_eq!(view.pending_release.as_deref(), Some("1.07"));
        assert_eq!(view.status, "Update available: 1.07");
        assert_eq!(view.severity, Severity::Warning);
        assert_eq!(view.update_button_label(), "Install Now");
        assert!(view.last_update_check.is_some());
        assert!(fixture.paths().metadata_file().is_file());
    }

    #[tokio::test]
    async fn initialize_restores_selection_and_labels_latest() {
        let fixture = fixture(&[
            feed_entry("1.07", "2025-01-10T00:00:00Z", "https://example.com/1.07.zip"),
            feed_entry("1.06", "2025-01-01T00:00:00Z", "https://example.com/1.06.zip"),
        ]);
        fixture.install_on_disk("1.07");
        fixture.install_on_disk("1.06");
        fixture.install_on_disk("hand-made");
        SettingsStore::open(fixture.paths().settings_file())
            .set_selected_version(Some("1.06".to_string()));
        let mut launcher = fixture.launcher(RecordingFrontend::default());

        let view = launcher.initialize().await;

        let names: Vec<_> = view.installed.iter().map(|r| r.display_name()).collect();
        assert_eq!(names, ["1.07 (Latest)", "1.06"]);
        assert_eq!(view.selected.as_deref(), Some("1.06"));
        assert!(!view.update_available);
        assert_eq!(view.status, "No new updates.");
        assert_eq!(view.severity, Severity::Success);
    }

    #[tokio::test]
    async fn empty_feed_reports_no_releases() {
        let fixture = fixture(&[]);
        let mut launcher = fixture.launcher(RecordingFrontend::default());

        let view = launcher.initialize().await;

        assert!(!view.update_available);
        assert_eq!(view.status, "No releases found");
        assert_eq!(view.severity, Severity::Error);
    }

    #[tokio::test]
    async fn manual_check_is_refused_during_cooldown() {
        let fixture = fixture(&[feed_entry(
            "1.07",
            "2025-01-10T00:00:00Z",
            "https://example.com/1.07.zip",
        )]);
        let mut launcher = fixture.launcher(RecordingFrontend::default());
        launcher.check_for_updates(CheckSource::Remote).await;
        let checked_at = launcher
            .snapshot()
            .last_update_check
            .expect("remote check should be recorded");

        let view = launcher
            .request_update_check_at(checked_at + chrono::Duration::minutes(2))
            .await;
        assert_eq!(view.severity, Severity::Warning);
        assert_eq!(
            view.status,
            "Please wait 3.0 more minutes before checking for updates again"
        );
        assert_eq!(view.last_update_check, Some(checked_at));

        let view = launcher
            .request_update_check_at(checked_at + chrono::Duration::minutes(6))
            .await;
        assert_eq!(view.status, "Update available: 1.07");
        assert!(view.last_update_check.is_some_and(|at| at <= Utc::now()));
    }

    #[tokio::test]
    async fn install_update_installs_selects_and_relabels() {
        let server = serve_archive(game_archive()).await;
        let url = format!("{}/1.07.zip", server.uri());
        let fixture = fixture(&[feed_entry("1.07", "2025-01-10T00:00:00Z", &url)]);
        let mut launcher = fixture.launcher(RecordingFrontend::default());
        launcher.initialize().await;

        let view = launcher.install_update(&CancellationToken::new()).await;

        assert_eq!(view.phase, Phase::Idle);
        assert_eq!(view.status, "Successfully installed 1.07");
        assert_eq!(view.severity, Severity::Success);
        assert_eq!(view.selected.as_deref(), Some("1.07"));
        assert!(!view.update_available);
        assert_eq!(view.installed[0].display_name(), "1.07 (Latest)");
        assert!(launcher.frontend.saw_status("Extracting 1.07..."));
        assert_eq!(*launcher.frontend.extractions.lock().expect("lock"), 1);
        assert_eq!(
            SettingsStore::open(fixture.paths().settings_file()).selected_version(),
            Some("1.07")
        );
    }

    #[tokio::test]
    async fn cancelled_install_reports_warning_and_leaves_no_folder() {
        let server = serve_archive(vec![0_u8; 1024 * 1024]).await;
        let url = format!("{}/1.07.zip", server.uri());
        let fixture = fixture(&[feed_entry("1.07", "2025-01-10T00:00:00Z", &url)]);
        let cancel = CancellationToken::new();
        let mut launcher = fixture.launcher(RecordingFrontend {
            cancel_on_progress: Some(cancel.clone()),
            ..RecordingFrontend::default()
        });
        launcher.initialize().await;

        let view = launcher.install_update(&cancel).await;

        assert_eq!(view.status, "Download cancelled");
        assert_eq!(view.severity, Severity::Warning);
        assert_eq!(view.phase, Phase::Idle);
        assert!(view.update_available);
        assert!(!fixture.paths().releases_dir().join("1.07").exists());
    }

    #[tokio::test]
    async fn failed_install_reports_error() {
        let server = serve_archive(Vec::new()).await;
        let url = format!("{}/1.07.zip", server.uri());
        let fixture = fixture(&[feed_entry("1.07", "2025-01-10T00:00:00Z", &url)]);
        let mut launcher = fixture.launcher(RecordingFrontend::default());
        launcher.initialize().await;

        let view = launcher.install_update(&CancellationToken::new()).await;

        assert_eq!(view.status, "Download failed: Downloaded file is empty");
        assert_eq!(view.severity, Severity::Error);
    }

    #[tokio::test]
    async fn delete_requires_confirmation() {
        let fixture = fixture(&[
            feed_entry("1.07", "2025-01-10T00:00:00Z", "https://example.com/1.07.zip"),
            feed_entry("1.06", "2025-01-01T00:00:00Z", "https://example.com/1.06.zip"),
        ]);
        fixture.install_on_disk("1.07");
        fixture.install_on_disk("1.06");

        let mut declined = fixture.launcher(RecordingFrontend::default());
        declined.initialize().await;
        let view = declined.delete_selected().await;
        assert_eq!(view.installed.len(), 2);
        assert_eq!(
            declined.frontend.confirmations.lock().expect("lock").as_slice(),
            ["Are you sure you want to delete 1.07?"]
        );

        let mut approved = fixture.launcher(RecordingFrontend::approving());
        approved.initialize().await;
        approved
            .select_version("1.06")
            .expect("1.06 should be selectable");
        let view = approved.delete_selected().await;

        assert!(!fixture.paths().releases_dir().join("1.06").exists());
        assert_eq!(view.selected.as_deref(), Some("1.07"));
        assert_eq!(view.status, "Successfully deleted 1.06");
        assert_eq!(view.severity, Severity::Success);
    }

    #[tokio::test]
    async fn deleting_the_last_install_offers_a_fresh_install() {
        let fixture = fixture(&[feed_entry(
            "1.07",
            "2025-01-10T00:00:00Z",
            "https://example.com/1.07.zip",
        )]);
        fixture.install_on_disk("1.07");
        let mut launcher = fixture.launcher(RecordingFrontend::approving());
        launcher.initialize().await;

        let view = launcher.delete_selected().await;

        assert!(view.installed.is_empty());
        assert_eq!(view.selected, None);
        assert_eq!(view.status, "Update available: 1.07");
        assert_eq!(view.update_button_label(), "Install Now");
    }

    #[tokio::test]
    async fn toggling_test_releases_filters_installs_and_persists() {
        let fixture = fixture(&[
            feed_entry(
                "1.08-DevTest-1",
                "2025-01-20T00:00:00Z",
                "https://example.com/1.08.zip",
            ),
            feed_entry("1.07", "2025-01-10T00:00:00Z", "https://example.com/1.07.zip"),
        ]);
        fixture.install_on_disk("1.08-DevTest-1");
        fixture.install_on_disk("1.07");
        let mut launcher = fixture.launcher(RecordingFrontend::default());

        let view = launcher.initialize().await;
        let versions: Vec<_> = view.installed.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, ["1.07"]);
        assert_eq!(view.installed[0].display_name(), "1.07 (Latest Stable)");

        let view = launcher.set_include_test_releases(true).await;
        let names: Vec<_> = view.installed.iter().map(|r| r.display_name()).collect();
        assert_eq!(names, ["1.08-DevTest-1 (Latest)", "1.07 (Latest Stable)"]);
        assert_eq!(view.selected.as_deref(), Some("1.08-DevTest-1"));
        assert!(view.include_test_releases);
        assert!(SettingsStore::open(fixture.paths().settings_file()).include_test_releases());
    }

    #[tokio::test]
    async fn selecting_unknown_version_is_an_error() {
        let fixture = fixture(&[]);
        let mut launcher = fixture.launcher(RecordingFrontend::default());

        let error = launcher
            .select_version("9.99")
            .expect_err("unknown version should be rejected");

        assert_eq!(error.to_string(), "9.99 is not installed");
    }

    #[tokio::test]
    async fn launch_without_selection_changes_nothing() {
        let fixture = fixture(&[]);
        let mut launcher = fixture.launcher(RecordingFrontend::default());

        let view = launcher.launch_selected();

        assert_eq!(view.status, "");
    }

    #[test]
    fn cooldown_comes_from_config() {
        let mut fixture = fixture(&[]);
        fixture.config.update_check_cooldown = Duration::from_secs(60);
        let launcher = fixture.launcher(RecordingFrontend::default());

        assert_eq!(launcher.snapshot().check_cooldown, chrono::Duration::minutes(1));
        assert!(Path::new(&fixture.root).join("Releases").is_dir());
    }
}
