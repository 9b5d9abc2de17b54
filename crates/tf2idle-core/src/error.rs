use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Steam is not installed at {}", .0.display())]
    NotInstalled(PathBuf),

    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("Glob pattern '{pattern}' appears in more than one link category")]
    ConflictingRule { pattern: String },

    #[error("Could not link installation at {}: {source}{}", .dest.display(), rollback_suffix(.rollback))]
    Link {
        dest: PathBuf,
        source: Box<Error>,
        rollback: Option<Box<Error>>,
    },

    #[error("Could not unlink installation at {}: {source}", .path.display())]
    Unlink {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not launch steam.exe within {}s", .timeout.as_secs())]
    LauncherNotStarted { timeout: Duration },

    #[error("Sandbox '{context}': {message}")]
    Sandbox { context: String, message: String },

    #[error("Cleanup for '{account}' failed: {}", join_errors(.failures))]
    Teardown { account: String, failures: Vec<Error> },

    #[error("Could not start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Task for '{account}' panicked")]
    TaskPanicked { account: String },
}

impl Error {
    pub(crate) fn sandbox(context: &str, message: impl Into<String>) -> Self {
        Error::Sandbox {
            context: context.to_string(),
            message: message.into(),
        }
    }
}

fn rollback_suffix(rollback: &Option<Box<Error>>) -> String {
    match rollback {
        Some(err) => format!(" (rollback also failed: {})", err),
        None => String::new(),
    }
}

fn join_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
