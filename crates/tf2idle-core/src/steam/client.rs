use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::classify::{self, LaunchState, LoginState, WindowSet};
use super::registry::{REG_FILE_NAME, TF2_IDLE_SETTINGS};
use super::{LaunchResult, LoginResult, SessionState, SessionTimings};
use crate::account::{CommandLine, Secret};
use crate::error::Error;
use crate::installation::linker::normalize;
use crate::installation::Installation;
use crate::platform::{Host, ProcessInfo};
use crate::sandbox::ExecutionContext;
use crate::tail::{ConnectionDiscovery, ConnectionInfo, LogTailer, StartOffset};

pub const STEAM_PROCESS_NAME: &str = "steam.exe";
pub const HL2_PROCESS_NAME: &str = "hl2.exe";
pub const TF2_APP_ID: &str = "440";
pub const CONDEBUG: &str = "-condebug";

/// Drives one account's Steam client inside its sandbox.
pub struct SteamClient {
    username: String,
    installation: Installation,
    root_key: PathBuf,
    sandbox: Arc<dyn ExecutionContext>,
    host: Arc<dyn Host>,
    timings: SessionTimings,
}

impl SteamClient {
    pub fn new(
        username: impl Into<String>,
        installation: Installation,
        sandbox: Arc<dyn ExecutionContext>,
        host: Arc<dyn Host>,
        timings: SessionTimings,
    ) -> Self {
        let root_key =
            normalize(installation.root()).unwrap_or_else(|_| installation.root().to_path_buf());
        Self {
            username: username.into(),
            installation,
            root_key,
            sandbox,
            host,
            timings,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The `steam.exe` running out of this account's installation, if any.
    pub fn steam_process(&self) -> Option<ProcessInfo> {
        self.host.process_of(&|process: &ProcessInfo| {
            process.name.eq_ignore_ascii_case(STEAM_PROCESS_NAME)
                && process
                    .cwd
                    .as_deref()
                    .map(|cwd| self.is_installation_root(cwd))
                    .unwrap_or(false)
        })
    }

    pub fn hl2_process(&self, steam: &ProcessInfo) -> Option<ProcessInfo> {
        self.host
            .children_of(steam.pid)
            .into_iter()
            .find(|child| child.name.eq_ignore_ascii_case(HL2_PROCESS_NAME))
    }

    /// Infer the session state from one fresh look at the host.
    pub fn session_state(&self) -> SessionState {
        let Some(steam) = self.steam_process() else {
            return SessionState::Idle;
        };
        if self.hl2_process(&steam).is_some() {
            return SessionState::Running;
        }
        match classify::classify_login(&self.window_set(steam.pid)) {
            LoginState::Ready => SessionState::LoggedIn,
            _ => SessionState::LoggingIn,
        }
    }

    pub fn login(&self, password: Option<&Secret>) -> Result<LoginResult, Error> {
        let mut steam = match self.steam_process() {
            Some(process) => process,
            None => {
                let mut command = self.steam_command().arg("-login").arg(&self.username);
                if let Some(password) = password {
                    command = command.secret_arg(password.clone());
                }
                self.sandbox
                    .start_in_context(&self.username, &command, false)?;
                self.wait_for_steam(self.timings.launcher_start)?
            }
        };

        if self.host.lower_priority(steam.pid).is_err() {
            return Ok(LoginResult::Canceled);
        }

        let mut is_update = false;
        let mut steam_guard_required = false;
        let mut deadline = self.timings.login_timeout.map(|t| Instant::now() + t);
        let mut deadline_extended = false;

        loop {
            let windows = self.window_set(steam.pid);
            let flags = classify::login_flags(&windows);
            if flags.updating && !is_update {
                info!("[{}] Steam update detected.", self.username);
                is_update = true;
            }
            if flags.guard_required && !steam_guard_required {
                warn!("[{}] Steam Guard authorization required.", self.username);
                steam_guard_required = true;
            }

            match classify::classify_login(&windows) {
                LoginState::Suspended => {
                    warn!("[{}] Steam account suspended!", self.username);
                    return Ok(self.terminate_with(steam.pid, LoginResult::AccountSuspended));
                }
                LoginState::Failed => {
                    info!("[{}] Login failed.", self.username);
                    return Ok(self.terminate_with(steam.pid, LoginResult::Failed));
                }
                LoginState::Ready => {
                    info!("[{}] Login succeeded.", self.username);
                    return Ok(LoginResult::Succeeded);
                }
                LoginState::NoWindows if is_update => {
                    // The updater exits and a fresh steam.exe takes its place.
                    // It may linger windowless for a poll or two, so the flag
                    // stays set for the rest of the login.
                    info!("[{}] Waiting for Steam to restart after update...", self.username);
                    steam = self.wait_for_steam(self.timings.restart_after_update)?;
                    if self.host.lower_priority(steam.pid).is_err() {
                        return Ok(LoginResult::Canceled);
                    }
                }
                LoginState::Updating
                | LoginState::GuardRequired
                | LoginState::NoWindows
                | LoginState::Pending => {}
            }

            if !self.host.is_running(steam.pid) {
                info!("[{}] Login canceled.", self.username);
                return Ok(LoginResult::Canceled);
            }

            if let Some(end) = deadline {
                if Instant::now() >= end {
                    match self.timings.steam_guard_extension {
                        Some(extension) if steam_guard_required && !deadline_extended => {
                            info!(
                                "[{}] Steam Guard pending, extending login deadline by {}s",
                                self.username,
                                extension.as_secs()
                            );
                            deadline = Some(end + extension);
                            deadline_extended = true;
                        }
                        _ => {
                            warn!("[{}] Login timed out.", self.username);
                            return Ok(self.terminate_with(steam.pid, LoginResult::TimedOut));
                        }
                    }
                }
            }

            thread::sleep(self.timings.login_poll);
        }
    }

    /// Ask Steam to shut down, killing it if it lingers. Succeeds once the
    /// process is gone, including when it was never running.
    pub fn logout(&self) -> bool {
        let Some(steam) = self.steam_process() else {
            debug!("[{}] Steam not running, nothing to log out", self.username);
            return true;
        };

        info!("[{}] Shutting down Steam", self.username);
        if let Err(err) = self.run_steam_command(["-shutdown"]) {
            warn!("[{}] Could not request shutdown: {}", self.username, err);
        }

        if !self.wait_for_exit(steam.pid, self.timings.shutdown) {
            warn!(
                "[{}] Steam still running after {}s, terminating",
                self.username,
                self.timings.shutdown.as_secs()
            );
            if self.host.terminate(steam.pid).is_err() {
                debug!("[{}] Steam exited before it could be terminated", self.username);
            }
        }
        true
    }

    pub fn launch_tf2(
        &self,
        launch_options: &[String],
        autoexec_cfg: Option<&Path>,
    ) -> Result<LaunchResult, Error> {
        let Some(steam) = self.steam_process() else {
            info!("[{}] Not logged in.", self.username);
            return Ok(LaunchResult::NotLoggedIn);
        };

        let console_log = self.installation.console_log_path(&self.username);

        if self.hl2_process(&steam).is_none() {
            self.apply_registry_settings()?;

            if let Some(cfg) = autoexec_cfg {
                self.install_autoexec(cfg)?;
            }

            // TF2 only writes tf/console.log when -condebug is given.
            let mut options = launch_options.to_vec();
            if !options.iter().any(|o| o == CONDEBUG) {
                options.push(CONDEBUG.to_string());
            }

            match fs::remove_file(&console_log) {
                Ok(()) => debug!("[{}] Removed stale {}", self.username, console_log.display()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => warn!(
                    "[{}] Could not remove {}: {}",
                    self.username,
                    console_log.display(),
                    err
                ),
            }

            let args = ["-applaunch".to_string(), TF2_APP_ID.to_string()]
                .into_iter()
                .chain(options);
            self.run_steam_command(args)?;
        }

        let hl2 = loop {
            if !self.host.is_running(steam.pid) {
                return Ok(LaunchResult::NotLoggedIn);
            }

            let windows = self.window_set(steam.pid);
            match classify::classify_launch(&windows) {
                LaunchState::UnknownVideoCard(window) => {
                    warn!("[{}] Unknown video card", self.username);
                    self.host.close_window(window);
                    return Ok(LaunchResult::UnknownVideoCard);
                }
                LaunchState::Failed(window) => {
                    warn!("[{}] Launch error: {}", self.username, window.title);
                    self.host.close_window(window);
                    return Ok(LaunchResult::Failed);
                }
                LaunchState::Preparing => debug!("[{}] Preparing to launch TF2...", self.username),
                LaunchState::Updating => debug!("[{}] Updating TF2...", self.username),
                LaunchState::Pending => {}
            }

            if let Some(hl2) = self.hl2_process(&steam) {
                break hl2;
            }
            thread::sleep(self.timings.launch_poll);
        };

        info!("[{}] hl2.exe launched (pid {})", self.username, hl2.pid);
        if self.host.lower_priority(hl2.pid).is_err() {
            return Ok(LaunchResult::Canceled);
        }

        Ok(self.discover_connection(hl2.pid, &console_log))
    }

    /// Kill TF2 and drop the account's TF2 directory to reclaim disk space.
    pub fn close_tf2(&self) -> Result<bool, Error> {
        if let Some(hl2) = self.steam_process().and_then(|steam| self.hl2_process(&steam)) {
            info!("[{}] Closing TF2", self.username);
            if self.host.terminate(hl2.pid).is_err() {
                debug!("[{}] hl2.exe already gone", self.username);
            }
        }

        let app_dir = self.installation.app_dir(&self.username);
        match fs::remove_dir_all(&app_dir) {
            Ok(()) => info!("[{}] Removed {}", self.username, app_dir.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        Ok(true)
    }

    fn discover_connection(&self, pid: u32, console_log: &Path) -> LaunchResult {
        let mut discovery = ConnectionDiscovery::new();
        let mut tailer: Option<LogTailer> = None;
        let mut resume = StartOffset::Beginning;

        loop {
            let windows = self.window_set(pid);
            if classify::has_fatal_error(&windows) {
                warn!("[{}] Fatal error", self.username);
                return LaunchResult::FatalError;
            }
            if !self.host.is_running(pid) {
                info!("[{}] hl2.exe exited before connecting", self.username);
                return LaunchResult::Canceled;
            }

            if tailer.is_none() {
                match LogTailer::open(console_log, resume) {
                    Ok(opened) => tailer = Some(opened),
                    Err(err) => debug!("[{}] Console log not readable yet: {}", self.username, err),
                }
            }

            let outcome = tailer.as_mut().map(|t| {
                drain(t, &mut discovery).map_err(|err| (err, t.resume_offset()))
            });
            match outcome {
                Some(Ok(Some(info))) => {
                    info!("[{}] TF2 launch succeeded: {:?}", self.username, info);
                    return LaunchResult::Succeeded(info);
                }
                Some(Err((err, offset))) => {
                    warn!("[{}] Error reading console log: {}", self.username, err);
                    resume = StartOffset::At(offset);
                    tailer = None;
                }
                Some(Ok(None)) | None => {}
            }

            thread::sleep(self.timings.console_poll);
        }
    }

    fn apply_registry_settings(&self) -> Result<(), Error> {
        let reg_dir = self.installation.data_dir().join(&self.username);
        fs::create_dir_all(&reg_dir)?;
        let reg_file = reg_dir.join(REG_FILE_NAME);
        fs::write(&reg_file, TF2_IDLE_SETTINGS)?;

        let command = CommandLine::new("regedit")
            .arg("/s")
            .arg(reg_file.to_string_lossy());
        self.sandbox.start_in_context(&self.username, &command, true)
    }

    fn install_autoexec(&self, cfg: &Path) -> Result<(), Error> {
        if !cfg.exists() {
            warn!("[{}] Autoexec {} does not exist, skipping", self.username, cfg.display());
            return Ok(());
        }
        let cfg_dir = self.installation.app_config_dir(&self.username);
        fs::create_dir_all(&cfg_dir)?;
        fs::copy(cfg, cfg_dir.join("autoexec.cfg"))?;
        Ok(())
    }

    fn steam_command(&self) -> CommandLine {
        CommandLine::new(self.installation.exe_path()).arg("-silent")
    }

    fn run_steam_command<I, S>(&self, args: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let command = self.steam_command().args(args);
        self.sandbox.start_in_context(&self.username, &command, false)
    }

    fn window_set(&self, pid: u32) -> WindowSet {
        let windows = WindowSet::new(self.host.windows_of(pid));
        debug!(
            "[{}] windows of {}: {:?}",
            self.username,
            pid,
            windows.titles().collect::<Vec<_>>()
        );
        windows
    }

    fn wait_for_steam(&self, timeout: Duration) -> Result<ProcessInfo, Error> {
        let started = Instant::now();
        loop {
            if let Some(process) = self.steam_process() {
                return Ok(process);
            }
            if started.elapsed() >= timeout {
                return Err(Error::LauncherNotStarted { timeout });
            }
            thread::sleep(self.timings.login_poll.min(timeout));
        }
    }

    fn wait_for_exit(&self, pid: u32, timeout: Duration) -> bool {
        let started = Instant::now();
        while self.host.is_running(pid) {
            if started.elapsed() >= timeout {
                return false;
            }
            thread::sleep(self.timings.login_poll.min(timeout));
        }
        true
    }

    fn terminate_with(&self, pid: u32, result: LoginResult) -> LoginResult {
        match self.host.terminate(pid) {
            Ok(()) => result,
            Err(gone) => {
                debug!("[{}] {}", self.username, gone);
                LoginResult::Canceled
            }
        }
    }

    fn is_installation_root(&self, cwd: &Path) -> bool {
        normalize(cwd).map(|cwd| cwd == self.root_key).unwrap_or(false)
    }
}

fn drain(
    tailer: &mut LogTailer,
    discovery: &mut ConnectionDiscovery,
) -> io::Result<Option<ConnectionInfo>> {
    while let Some(line) = tailer.read_line()? {
        if let Some(info) = discovery.feed(&line) {
            return Ok(Some(info));
        }
    }
    Ok(None)
}
