use std::path::PathBuf;
use std::time::Duration;

use calauncher_core::FeedSource;
use calauncher_platform::AppPaths;

use crate::error::AppError;

const DEFAULT_FEEDS: [&str; 2] = [
    "https://api.github.com/repos/Inq8/CAmod/releases",
    "https://api.github.com/repos/darkademic/CAmod/releases",
];

#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub feeds: Vec<FeedSource>,
    pub http_timeout: Duration,
    pub user_agent: String,
    pub update_check_cooldown: Duration,
    /// Bytes per second; `None` downloads at full speed.
    pub max_download_speed: Option<u64>,
    pub max_log_size_bytes: u64,
    /// Keep settings, metadata, and installs under this folder instead of the
    /// platform directories.
    pub portable_root: Option<PathBuf>,
    pub debug_logging: bool,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            feeds: DEFAULT_FEEDS.iter().map(|url| FeedSource::parse(url)).collect(),
            http_timeout: Duration::from_secs(30),
            user_agent: format!("CALauncher/{}", env!("CARGO_PKG_VERSION")),
            update_check_cooldown: Duration::from_secs(5 * 60),
            max_download_speed: None,
            max_log_size_bytes: 5 * 1024 * 1024,
            portable_root: None,
            debug_logging: false,
        }
    }
}

impl LauncherConfig {
    /// Resolve where the launcher keeps its files.
    ///
    /// # Errors
    /// Returns an error when not running portable and a platform base
    /// directory cannot be determined.
    pub fn paths(&self) -> Result<AppPaths, AppError> {
        match &self.portable_root {
            Some(root) => Ok(AppPaths::portable(root)),
            None => Ok(AppPaths::new()?),
        }
    }

    pub fn http_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .user_agent(&self.user_agent)
            .build()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use calauncher_core::FeedSource;

    use super::LauncherConfig;

    #[test]
    fn defaults_point_at_both_release_feeds() {
        let config = LauncherConfig::default();

        assert_eq!(
            config.feeds,
            [
                FeedSource::Remote("https://api.github.com/repos/Inq8/CAmod/releases".to_string()),
                FeedSource::Remote(
                    "https://api.github.com/repos/darkademic/CAmod/releases".to_string()
                ),
            ]
        );
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.update_check_cooldown, Duration::from_secs(300));
        assert_eq!(config.max_download_speed, None);
        assert_eq!(config.max_log_size_bytes, 5 * 1024 * 1024);
        assert!(config.user_agent.starts_with("CALauncher/"));
    }

    #[test]
    fn portable_root_overrides_platform_paths() {
        let config = LauncherConfig {
            portable_root: Some(Path::new("portable").to_path_buf()),
            ..LauncherConfig::default()
        };

        let paths = config.paths().expect("portable paths should resolve");

        assert_eq!(paths.releases_dir(), Path::new("portable").join("Releases"));
    }
}
