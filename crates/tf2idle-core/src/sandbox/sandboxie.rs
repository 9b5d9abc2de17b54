use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use tracing::{debug, info};

use super::{ExecutionContext, SandboxOptions};
use crate::account::CommandLine;
use crate::error::Error;

/// Sandboxie driven through its `Start.exe` and `SbieIni.exe` tools.
#[derive(Debug, Clone)]
pub struct Sandboxie {
    install_dir: PathBuf,
}

impl Sandboxie {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
        }
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    fn start_exe(&self) -> PathBuf {
        self.install_dir.join("Start.exe")
    }

    fn sbie_ini_exe(&self) -> PathBuf {
        self.install_dir.join("SbieIni.exe")
    }

    fn write_setting(&self, name: &str, key: &str, value: &str) -> Result<(), Error> {
        let status = Command::new(self.sbie_ini_exe())
            .args(["set", name, key, value])
            .status()?;
        check_status(name, "SbieIni set", status)
    }

    fn reload(&self, name: &str) -> Result<(), Error> {
        let status = Command::new(self.start_exe()).arg("/reload").status()?;
        check_status(name, "reload", status)
    }
}

impl ExecutionContext for Sandboxie {
    fn create_context(&self, name: &str, options: &SandboxOptions) -> Result<(), Error> {
        info!("Creating sandbox '{}'", name);
        for (key, value) in options {
            self.write_setting(name, key, value)?;
        }
        self.reload(name)
    }

    fn start_in_context(&self, name: &str, command: &CommandLine, wait: bool) -> Result<(), Error> {
        debug!("[{}] {}", name, command);
        let mut process = Command::new(self.start_exe());
        process.arg(format!("/box:{}", name)).arg("/silent");
        if wait {
            process.arg("/wait");
        }
        append_command(&mut process, command);

        if wait {
            let status = process.status()?;
            check_status(name, "start", status)
        } else {
            process.spawn()?;
            Ok(())
        }
    }

    fn terminate_processes(&self, name: &str) -> Result<(), Error> {
        info!("Terminating processes in sandbox '{}'", name);
        let status = Command::new(self.start_exe())
            .arg(format!("/box:{}", name))
            .arg("/terminate")
            .status()?;
        check_status(name, "terminate", status)
    }

    fn destroy_context(&self, name: &str) -> Result<(), Error> {
        info!("Destroying sandbox '{}'", name);
        let status = Command::new(self.start_exe())
            .arg(format!("/box:{}", name))
            .arg("delete_sandbox_silent")
            .status()?;
        check_status(name, "delete", status)?;
        self.write_setting(name, "*", "")?;
        self.reload(name)
    }
}

#[cfg(windows)]
fn append_command(process: &mut Command, command: &CommandLine) {
    use std::os::windows::process::CommandExt;
    process.raw_arg(command.render_revealed());
}

#[cfg(not(windows))]
fn append_command(process: &mut Command, command: &CommandLine) {
    process.arg(command.render_revealed());
}

fn check_status(name: &str, action: &str, status: ExitStatus) -> Result<(), Error> {
    if status.success() {
        Ok(())
    } else {
        Err(Error::sandbox(name, format!("{} exited with {}", action, status)))
    }
}
