use calauncher_core::{InstallError, ReleaseError};
use calauncher_platform::AppPathsError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppErrorDetail {
    Message(String),
}

impl std::fmt::Display for AppErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Message(message) => write!(f, "{message}"),
        }
    }
}

impl From<InstallError> for AppErrorDetail {
    fn from(value: InstallError) -> Self {
        Self::Message(value.to_string())
    }
}

impl From<ReleaseError> for AppErrorDetail {
    fn from(value: ReleaseError) -> Self {
        Self::Message(value.to_string())
    }
}

impl From<tokio::task::JoinError> for AppErrorDetail {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Message(value.to_string())
    }
}

/// Failures as the launcher reports them on its status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    Paths(AppPathsError),
    NotInstalled {
        version: String,
    },
    OperationFailed {
        operation: &'static str,
        details: AppErrorDetail,
    },
    ReleaseOperationFailed {
        operation: &'static str,
        version: String,
        details: AppErrorDetail,
    },
    OperationCancelled {
        operation: &'static str,
    },
}

impl AppError {
    pub fn not_installed(version: impl Into<String>) -> Self {
        Self::NotInstalled {
            version: version.into(),
        }
    }

    pub fn operation_failed(operation: &'static str, details: impl Into<AppErrorDetail>) -> Self {
        Self::OperationFailed {
            operation,
            details: details.into(),
        }
    }

    pub fn release_operation_failed(
        operation: &'static str,
        version: impl Into<String>,
        details: impl Into<AppErrorDetail>,
    ) -> Self {
        Self::ReleaseOperationFailed {
            operation,
            version: version.into(),
            details: details.into(),
        }
    }

    pub fn operation_cancelled(operation: &'static str) -> Self {
        Self::OperationCancelled { operation }
    }
}

impl From<AppPathsError> for AppError {
    fn from(value: AppPathsError) -> Self {
        Self::Paths(value)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paths(error) => write!(f, "{error}"),
            Self::NotInstalled { version } => write!(f, "{version} is not installed"),
            Self::OperationFailed { operation, details } => {
                write!(f, "{operation} failed: {details}")
            }
            Self::ReleaseOperationFailed {
                operation,
                version,
                details,
            } => write!(f, "Failed to {operation} {version}: {details}"),
            Self::OperationCancelled { operation } => write!(f, "{operation} cancelled"),
        }
    }
}

impl std::error::Error for AppError {}
