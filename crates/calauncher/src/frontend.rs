use std::io::Write as _;

use async_trait::async_trait;
use calauncher_core::DownloadProgress;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Severity {
    #[default]
    Normal,
    Success,
    Warning,
    Error,
}

/// What the launcher needs from whoever is presenting it.
#[async_trait]
pub trait Frontend: Send + Sync {
    /// Ask before something destructive happens.
    async fn confirm(&self, title: &str, message: &str) -> bool;

    /// Called from the download loop; must return quickly.
    fn report_progress(&self, progress: &DownloadProgress);

    fn extraction_starting(&self);

    fn set_status(&self, text: &str, severity: Severity);
}

/// Plain terminal output for the command-line launcher.
#[derive(Debug, Default)]
pub struct TerminalFrontend {
    assume_yes: bool,
}

impl TerminalFrontend {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

/// Read one answer line; only `y` or `yes` (any case) confirms.
async fn read_confirmation<R: AsyncBufRead + Unpin>(mut reader: R) -> bool {
    let mut answer = String::new();
    if reader.read_line(&mut answer).await.is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[async_trait]
impl Frontend for TerminalFrontend {
    async fn confirm(&self, title: &str, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{title}: {message} [y/N] ");
        let _ = std::io::stdout().flush();

        read_confirmation(BufReader::new(tokio::io::stdin())).await
    }

    fn report_progress(&self, progress: &DownloadProgress) {
        eprint!(
            "\r{:>5.1}%  {:>12}  {}    ",
            progress.percentage,
            progress.formatted_speed(),
            progress.formatted_size()
        );
        let _ = std::io::stderr().flush();
    }

    fn extraction_starting(&self) {
        eprintln!();
    }

    fn set_status(&self, text: &str, severity: Severity) {
        match severity {
            Severity::Normal => println!("{text}"),
            Severity::Success => println!("ok: {text}"),
            Severity::Warning => println!("warning: {text}"),
            Severity::Error => eprintln!("error: {text}"),
        }
    }
}
