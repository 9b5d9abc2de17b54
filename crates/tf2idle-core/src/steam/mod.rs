//! Steam/TF2 session control by observation: window titles, the process
//! table and the TF2 console log. Nothing here keeps session state; every
//! decision is re-derived from a fresh poll.

pub mod classify;
pub mod client;
pub mod registry;

use std::fmt;
use std::time::Duration;

pub use classify::{classify_launch, classify_login, LaunchState, LoginState, WindowSet};
pub use client::SteamClient;

use crate::tail::ConnectionInfo;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTimings {
    /// How long to wait for `steam.exe` to appear after asking for it.
    pub launcher_start: Duration,
    /// How long to wait for Steam to come back after a self-update.
    pub restart_after_update: Duration,
    /// Grace period for `-shutdown` before Steam is killed.
    pub shutdown: Duration,
    pub login_poll: Duration,
    pub launch_poll: Duration,
    pub console_poll: Duration,
    /// Overall login deadline. `None` polls until a verdict.
    pub login_timeout: Option<Duration>,
    /// One-time extension of `login_timeout` while Steam Guard is pending.
    pub steam_guard_extension: Option<Duration>,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            launcher_start: Duration::from_secs(10),
            restart_after_update: Duration::from_secs(30),
            shutdown: Duration::from_secs(30),
            login_poll: Duration::from_secs(1),
            launch_poll: Duration::from_secs(5),
            console_poll: Duration::from_secs(1),
            login_timeout: None,
            steam_guard_extension: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginResult {
    Succeeded,
    Failed,
    Canceled,
    AccountSuspended,
    TimedOut,
}

impl LoginResult {
    pub fn is_success(&self) -> bool {
        matches!(self, LoginResult::Succeeded)
    }
}

impl fmt::Display for LoginResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LoginResult::Succeeded => "login succeeded",
            LoginResult::Failed => "login failed",
            LoginResult::Canceled => "login canceled",
            LoginResult::AccountSuspended => "account suspended",
            LoginResult::TimedOut => "login timed out",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchResult {
    Succeeded(ConnectionInfo),
    Failed,
    NotLoggedIn,
    Canceled,
    UnknownVideoCard,
    FatalError,
}

impl LaunchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, LaunchResult::Succeeded(_))
    }
}

impl fmt::Display for LaunchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchResult::Succeeded(info) => {
                let ip = info
                    .ip
                    .map(|ip| ip.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                write!(
                    f,
                    "launched, server {}:{} (client port {})",
                    ip, info.server_port, info.client_port
                )
            }
            LaunchResult::Failed => f.write_str("launch failed"),
            LaunchResult::NotLoggedIn => f.write_str("not logged in"),
            LaunchResult::Canceled => f.write_str("launch canceled"),
            LaunchResult::UnknownVideoCard => f.write_str("unknown video card"),
            LaunchResult::FatalError => f.write_str("fatal error"),
        }
    }
}

/// Where an account's session stands, as inferred from one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    LoggingIn,
    LoggedIn,
    Running,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SessionState::Idle => "idle",
            SessionState::LoggingIn => "logging in",
            SessionState::LoggedIn => "logged in",
            SessionState::Running => "running",
        };
        f.write_str(text)
    }
}
