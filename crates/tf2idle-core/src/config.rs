use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::steam::SessionTimings;

pub const DEFAULT_WORKING_DIR: &str = "C:\\tf2idle";
pub const DEFAULT_STEAM_BASE_DIR: &str = "C:\\Program Files\\Steam";
pub const DEFAULT_SANDBOXIE_INSTALL_DIR: &str = "C:\\Program Files\\Sandboxie";

pub const DEFAULT_LAUNCH_OPTIONS: &str = "-textmode -sw -low -w 640 -h 480 -novid \
     -nosound -nomouse -noipx -nopreload -nopreloadmodels -nod3d9ex -nodev -nodns \
     -nohltv -nojoy -nomessagebox -nominidumps +clientport 27100 +hostport 27400 \
     -steamport 27700 +map itemtest";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
    #[serde(default = "default_steam_base_dir")]
    pub steam_base_dir: PathBuf,
    #[serde(default = "default_sandboxie_install_dir")]
    pub sandboxie_install_dir: PathBuf,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_launch_options")]
    pub launch_options: String,
    #[serde(default = "default_sandbox_options")]
    pub sandbox_options: BTreeMap<String, String>,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Poll intervals and deadlines, in the units named by each field.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub launcher_start_secs: u64,
    pub restart_after_update_secs: u64,
    pub shutdown_secs: u64,
    pub login_poll_ms: u64,
    pub launch_poll_ms: u64,
    pub console_poll_ms: u64,
    pub login_timeout_secs: Option<u64>,
    pub steam_guard_extension_secs: Option<u64>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            launcher_start_secs: 10,
            restart_after_update_secs: 30,
            shutdown_secs: 30,
            login_poll_ms: 1000,
            launch_poll_ms: 5000,
            console_poll_ms: 1000,
            login_timeout_secs: None,
            steam_guard_extension_secs: None,
        }
    }
}

impl TimeoutConfig {
    pub fn session_timings(&self) -> SessionTimings {
        SessionTimings {
            launcher_start: Duration::from_secs(self.launcher_start_secs),
            restart_after_update: Duration::from_secs(self.restart_after_update_secs),
            shutdown: Duration::from_secs(self.shutdown_secs),
            login_poll: Duration::from_millis(self.login_poll_ms),
            launch_poll: Duration::from_millis(self.launch_poll_ms),
            console_poll: Duration::from_millis(self.console_poll_ms),
            login_timeout: self.login_timeout_secs.map(Duration::from_secs),
            steam_guard_extension: self.steam_guard_extension_secs.map(Duration::from_secs),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            steam_base_dir: default_steam_base_dir(),
            sandboxie_install_dir: default_sandboxie_install_dir(),
            workers: default_workers(),
            launch_options: default_launch_options(),
            sandbox_options: default_sandbox_options(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl AppConfig {
    /// Launch options split the way they are handed to `-applaunch`.
    pub fn launch_option_list(&self) -> Vec<String> {
        split_launch_options(&self.launch_options)
    }
}

pub fn split_launch_options(options: &str) -> Vec<String> {
    options.split_whitespace().map(str::to_string).collect()
}

/// Load `Tf2Idle.toml` (optional) and `TF2IDLE__*` environment overrides.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Tf2Idle").required(false))
        .add_source(Environment::with_prefix("TF2IDLE").separator("__"))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(DEFAULT_WORKING_DIR)
}

fn default_steam_base_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STEAM_BASE_DIR)
}

fn default_sandboxie_install_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SANDBOXIE_INSTALL_DIR)
}

fn default_workers() -> usize {
    2
}

fn default_launch_options() -> String {
    DEFAULT_LAUNCH_OPTIONS.to_string()
}

fn default_sandbox_options() -> BTreeMap<String, String> {
    [
        ("AutoDelete", "y"),
        ("Enabled", "y"),
        ("ConfigLevel", "7"),
        ("AutoRecover", "n"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
