use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::account::Account;
use crate::config::{split_launch_options, AppConfig};
use crate::error::Error;
use crate::installation::linker::LinkedInstallation;
use crate::installation::rules::LinkRuleSets;
use crate::installation::Installation;
use crate::platform::{self, Host, SystemHost};
use crate::runner::{BatchReporter, BatchResults, TaskRunner};
use crate::sandbox::{ExecutionContext, SandboxOptions, Sandboxie};
use crate::steam::{LaunchResult, LoginResult, SessionState, SessionTimings, SteamClient};

/// Batch operations over a set of accounts, one sandbox and one linked
/// installation per account.
pub struct Tf2IdleApp {
    config: AppConfig,
    base_installation: Installation,
    rules: LinkRuleSets,
    sandbox: Arc<dyn ExecutionContext>,
    host: Arc<dyn Host>,
    runner: TaskRunner,
    timings: SessionTimings,
}

impl Tf2IdleApp {
    /// An app driving the real Sandboxie install and the local host.
    pub fn new(config: AppConfig) -> Result<Self, Error> {
        let sandbox = Arc::new(Sandboxie::new(config.sandboxie_install_dir.clone()));
        Self::with_collaborators(config, sandbox, Arc::new(SystemHost::new()))
    }

    pub fn with_collaborators(
        config: AppConfig,
        sandbox: Arc<dyn ExecutionContext>,
        host: Arc<dyn Host>,
    ) -> Result<Self, Error> {
        let runner = TaskRunner::new(config.workers)?;
        let timings = config.timeouts.session_timings();
        Ok(Self {
            base_installation: Installation::tf2(&config.steam_base_dir),
            rules: LinkRuleSets::steam_defaults()?,
            config,
            sandbox,
            host,
            runner,
            timings,
        })
    }

    pub fn with_rules(mut self, rules: LinkRuleSets) -> Self {
        self.rules = rules;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn base_installation(&self) -> &Installation {
        &self.base_installation
    }

    pub fn login(
        &self,
        accounts: &[Account],
        reporter: &dyn BatchReporter,
    ) -> BatchResults<LoginResult> {
        self.runner.run(accounts, reporter, |account| {
            let client = self.prepare(&account.username)?;
            client.login(account.password.as_ref())
        })
    }

    /// Log every account out, then clean each one up. A cleanup failure
    /// replaces that account's logout result.
    pub fn logout(&self, accounts: &[Account], reporter: &dyn BatchReporter) -> BatchResults<bool> {
        let mut results = self.runner.run(accounts, reporter, |account| {
            let client = self.prepare(&account.username)?;
            Ok(client.logout())
        });

        let usernames: Vec<String> = results.keys().cloned().collect();
        for username in usernames {
            if let Err(err) = self.cleanup(&username) {
                warn!("[{}] {}", username, err);
                if matches!(results.get(&username), Some(Ok(_))) {
                    results.insert(username, Err(err));
                }
            }
        }
        results
    }

    /// Launch TF2 for every account. `launch_options` replaces the configured
    /// options when given.
    pub fn launch_tf2(
        &self,
        accounts: &[Account],
        launch_options: Option<&str>,
        autoexec_cfg: Option<&Path>,
        reporter: &dyn BatchReporter,
    ) -> BatchResults<LaunchResult> {
        let options = match launch_options {
            Some(options) => split_launch_options(options),
            None => self.config.launch_option_list(),
        };
        self.runner.run(accounts, reporter, |account| {
            let client = self.prepare(&account.username)?;
            client.launch_tf2(&options, autoexec_cfg)
        })
    }

    pub fn close_tf2(
        &self,
        accounts: &[Account],
        reporter: &dyn BatchReporter,
    ) -> BatchResults<bool> {
        self.runner.run(accounts, reporter, |account| {
            let client = self.prepare(&account.username)?;
            client.close_tf2()
        })
    }

    /// Read-only: no sandbox is created and nothing is linked.
    pub fn status(
        &self,
        accounts: &[Account],
        reporter: &dyn BatchReporter,
    ) -> BatchResults<SessionState> {
        self.runner.run(accounts, reporter, |account| {
            Ok(self.client(&account.username).session_state())
        })
    }

    pub fn cleanup_all(
        &self,
        accounts: &[Account],
        reporter: &dyn BatchReporter,
    ) -> BatchResults<()> {
        self.runner
            .run(accounts, reporter, |account| self.cleanup(&account.username))
    }

    /// Terminate the account's processes, destroy its sandbox and unlink its
    /// installation. Every step runs even if an earlier one failed; safe to
    /// repeat.
    pub fn cleanup(&self, username: &str) -> Result<(), Error> {
        info!("[{}] Cleaning up", username);
        let mut failures = Vec::new();

        if let Err(err) = self.sandbox.terminate_processes(username) {
            failures.push(err);
        }
        if let Err(err) = self.sandbox.destroy_context(username) {
            failures.push(err);
        }
        if let Err(err) = self.linked_installation(username).unlink() {
            failures.push(err);
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Teardown {
                account: username.to_string(),
                failures,
            })
        }
    }

    pub fn account_dir(&self, username: &str) -> PathBuf {
        self.config.working_dir.join(username)
    }

    /// Sandbox, then linked installation, then the client that drives them.
    fn prepare(&self, username: &str) -> Result<SteamClient, Error> {
        self.sandbox
            .create_context(username, &self.sandbox_options())?;

        let mut linked = self.linked_installation(username);
        linked.link(&self.base_installation, false, &self.rules)?;

        Ok(self.client(username))
    }

    fn client(&self, username: &str) -> SteamClient {
        SteamClient::new(
            username,
            Installation::tf2(self.account_dir(username)),
            Arc::clone(&self.sandbox),
            Arc::clone(&self.host),
            self.timings.clone(),
        )
    }

    fn linked_installation(&self, username: &str) -> LinkedInstallation {
        LinkedInstallation::new(Installation::tf2(self.account_dir(username)))
    }

    /// Configured options plus open access to the Steam and working drives.
    fn sandbox_options(&self) -> SandboxOptions {
        let mut options = self.config.sandbox_options.clone();
        if let Some(drive) = platform::get_drive_letter(&self.config.steam_base_dir) {
            options.insert("OpenFilePath".to_string(), drive.to_string_lossy().into_owned());
        }
        if let Some(drive) = platform::get_drive_letter(&self.config.working_dir) {
            options.insert("OpenPipePath".to_string(), drive.to_string_lossy().into_owned());
        }
        options
    }
}
