//! Command-line launcher and updater for Combined Arms.

mod config;
mod error;
mod frontend;
mod launcher;
mod logging;
mod settings;
mod state;

use std::path::PathBuf;
use std::process::ExitCode;

use calauncher_core::FeedSource;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;

use crate::config::LauncherConfig;
use crate::error::AppError;
use crate::frontend::{Severity, TerminalFrontend};
use crate::launcher::Launcher;
use crate::state::{ViewState, available_actions};

/// Install, update, and launch Combined Arms releases
#[derive(Parser)]
#[command(name = "calauncher")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Release feed to query instead of the defaults (URL or JSON file; repeatable)
    #[arg(long = "feed", global = true)]
    feeds: Vec<String>,

    /// Keep settings, metadata, and releases under this folder
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Limit download speed, in bytes per second
    #[arg(long, global = true)]
    max_speed: Option<u64>,

    /// Log at debug level
    #[arg(long, global = true)]
    debug: bool,

    /// Answer yes to confirmation prompts
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Check the feeds and show installed releases (default)
    Status,
    /// Check for a newer release, respecting the check cooldown
    Check,
    /// Download and install the newest release
    Update,
    /// List installed releases
    List,
    /// Start a release (the selected one by default)
    Launch {
        tag: Option<String>,
    },
    /// Delete a release (the selected one by default)
    Delete {
        tag: Option<String>,
    },
    /// Remember a release as the selected one
    Select {
        tag: String,
    },
    /// Show or hide pre-release and dev-test builds
    IncludeTest {
        #[arg(value_enum)]
        state: Toggle,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

impl Cli {
    fn config(&self) -> LauncherConfig {
        let mut config = LauncherConfig::default();
        if !self.feeds.is_empty() {
            config.feeds = self.feeds.iter().map(|raw| FeedSource::parse(raw)).collect();
        }
        config.portable_root.clone_from(&self.root);
        config.max_download_speed = self.max_speed.filter(|speed| *speed > 0);
        config.debug_logging = self.debug;
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = cli.config();
    let paths = match config.paths() {
        Ok(paths) => paths,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };
    logging::init_logging(&paths, config.debug_logging, config.max_log_size_bytes);
    log::info!("calauncher {} starting", env!("CARGO_PKG_VERSION"));

    let mut launcher = Launcher::new(&config, paths, TerminalFrontend::new(cli.yes));
    let view = run(&mut launcher, cli.command.unwrap_or(Command::Status)).await;

    if view.severity == Severity::Error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn run(launcher: &mut Launcher<TerminalFrontend>, command: Command) -> ViewState {
    match command {
        Command::Status => {
            let view = launcher.initialize().await;
            print_releases(&view);
            println!("[{}]", view.update_button_label());
            view
        }
        Command::Check => {
            launcher.load().await;
            launcher.request_update_check().await
        }
        Command::Update => {
            let mut view = launcher.load().await;
            if !view.update_available {
                view = launcher.request_update_check().await;
            }
            if !view.update_available {
                return view;
            }
            install_with_ctrl_c(launcher).await
        }
        Command::List => {
            let view = launcher.load().await;
            print_releases(&view);
            view
        }
        Command::Launch { tag } => {
            launcher.load().await;
            if let Some(tag) = tag
                && let Err(error) = launcher.select_version(&tag)
            {
                return report(launcher, &error);
            }
            launcher.launch_selected()
        }
        Command::Delete { tag } => {
            launcher.load().await;
            if let Some(tag) = tag
                && let Err(error) = launcher.select_version(&tag)
            {
                return report(launcher, &error);
            }
            launcher.delete_selected().await
        }
        Command::Select { tag } => {
            launcher.load().await;
            match launcher.select_version(&tag) {
                Ok(view) => {
                    println!("Selected {tag}");
                    view
                }
                Err(error) => report(launcher, &error),
            }
        }
        Command::IncludeTest { state } => {
            launcher.load().await;
            let view = launcher
                .set_include_test_releases(matches!(state, Toggle::On))
                .await;
            print_releases(&view);
            view
        }
    }
}

async fn install_with_ctrl_c(launcher: &mut Launcher<TerminalFrontend>) -> ViewState {
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nCancelling download...");
                cancel.cancel();
            }
        })
    };
    let view = launcher.install_update(&cancel).await;
    watcher.abort();
    view
}

fn report(launcher: &Launcher<TerminalFrontend>, error: &AppError) -> ViewState {
    eprintln!("error: {error}");
    let mut view = launcher.snapshot();
    view.status = error.to_string();
    view.severity = Severity::Error;
    view
}

fn print_releases(view: &ViewState) {
    if view.include_test_releases {
        println!("Including pre-release and dev-test builds");
    }
    if view.installed.is_empty() {
        println!("No releases installed.");
        return;
    }
    for release in &view.installed {
        let marker = if view.selected.as_deref() == Some(release.version.as_str()) {
            '*'
        } else {
            ' '
        };
        println!(
            "{marker} {:<32} {}",
            release.display_name(),
            release.folder.display()
        );
    }
    let actions: Vec<String> = available_actions(view, Utc::now())
        .into_iter()
        .map(|action| format!("{action:?}"))
        .collect();
    println!("Available: {}", actions.join(", "));
}
