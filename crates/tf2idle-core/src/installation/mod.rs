pub mod linker;
pub mod rules;

use std::path::{Path, PathBuf};

pub use linker::LinkedInstallation;
pub use rules::{LinkAction, LinkRuleSets, LinkRules};

/// Archives that must be present under `steamapps/` for TF2 to run.
pub const REQUIRED_GCFS: [&str; 11] = [
    "multiplayer ob binaries.gcf",
    "orangebox media.gcf",
    "source 2007 shared materials.gcf",
    "source 2007 shared models.gcf",
    "source 2007 shared sounds.gcf",
    "source materials.gcf",
    "source models.gcf",
    "source sounds.gcf",
    "team fortress 2 client content.gcf",
    "team fortress 2 content.gcf",
    "team fortress 2 materials.gcf",
];

pub const STEAM_EXE: &str = "steam.exe";
pub const TF2_APP_DIR: &str = "team fortress 2";

pub type CompletenessCheck = fn(&Installation) -> bool;

/// A Steam tree on disk: the root (executables, DLLs) and its `steamapps`
/// data directory. What counts as "installed" is carried as a plain function.
#[derive(Debug, Clone)]
pub struct Installation {
    root: PathBuf,
    data_dir: PathBuf,
    exe_path: PathBuf,
    check: CompletenessCheck,
}

impl Installation {
    pub fn new(root: impl Into<PathBuf>, check: CompletenessCheck) -> Self {
        let root = root.into();
        Self {
            data_dir: root.join("steamapps"),
            exe_path: root.join(STEAM_EXE),
            root,
            check,
        }
    }

    /// Installed when `steam.exe` exists.
    pub fn steam(root: impl Into<PathBuf>) -> Self {
        Self::new(root, steam_installed)
    }

    /// Installed when `steam.exe` and every TF2 archive exist.
    pub fn tf2(root: impl Into<PathBuf>) -> Self {
        Self::new(root, tf2_installed)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn exe_path(&self) -> &Path {
        &self.exe_path
    }

    pub fn installed(&self) -> bool {
        (self.check)(self)
    }

    /// Per-account TF2 directory: `steamapps/{username}/team fortress 2`.
    pub fn app_dir(&self, username: &str) -> PathBuf {
        self.data_dir.join(username).join(TF2_APP_DIR)
    }

    pub fn console_log_path(&self, username: &str) -> PathBuf {
        self.app_dir(username).join("tf").join("console.log")
    }

    pub fn app_config_dir(&self, username: &str) -> PathBuf {
        self.app_dir(username).join("tf").join("cfg")
    }
}

pub fn steam_installed(installation: &Installation) -> bool {
    installation.exe_path.exists()
}

pub fn tf2_installed(installation: &Installation) -> bool {
    REQUIRED_GCFS
        .iter()
        .all(|gcf| installation.data_dir.join(gcf).exists())
        && steam_installed(installation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn populate_tf2(root: &Path) {
        fs::create_dir_all(root.join("steamapps")).unwrap();
        fs::write(root.join(STEAM_EXE), b"").unwrap();
        for gcf in REQUIRED_GCFS {
            fs::write(root.join("steamapps").join(gcf), b"").unwrap();
        }
    }

    #[test]
    fn test_steam_installed_needs_exe() {
        let tmp = tempdir().unwrap();
        let installation = Installation::steam(tmp.path());
        assert!(!installation.installed());
        fs::write(tmp.path().join(STEAM_EXE), b"").unwrap();
        assert!(installation.installed());
    }

    #[test]
    fn test_tf2_installed_flips_when_any_archive_missing() {
        let tmp = tempdir().unwrap();
        populate_tf2(tmp.path());
        let installation = Installation::tf2(tmp.path());
        assert!(installation.installed());

        for gcf in REQUIRED_GCFS {
            let path = tmp.path().join("steamapps").join(gcf);
            fs::remove_file(&path).unwrap();
            assert!(!installation.installed(), "{} removed but still installed", gcf);
            fs::write(&path, b"").unwrap();
        }
        assert!(installation.installed());
    }

    #[test]
    fn test_per_account_paths() {
        let installation = Installation::tf2("work/alice");
        assert_eq!(
            installation.console_log_path("alice"),
            PathBuf::from("work/alice/steamapps/alice/team fortress 2/tf/console.log")
        );
        assert_eq!(
            installation.app_config_dir("alice"),
            PathBuf::from("work/alice/steamapps/alice/team fortress 2/tf/cfg")
        );
    }
}
