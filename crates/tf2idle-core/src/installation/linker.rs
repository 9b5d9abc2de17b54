use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::rules::{LinkAction, LinkRuleSets, LinkRules};
use super::Installation;
use crate::error::Error;

/// An installation whose tree is projected from another one: large archives
/// are symlinked, executables and DLLs are copied.
///
/// The tree is either fully present or absent; a failed `link` rolls back.
#[derive(Debug, Clone)]
pub struct LinkedInstallation {
    installation: Installation,
    source: Option<PathBuf>,
}

impl LinkedInstallation {
    pub fn new(installation: Installation) -> Self {
        Self {
            installation,
            source: None,
        }
    }

    pub fn installation(&self) -> &Installation {
        &self.installation
    }

    /// Root of the installation this one was last linked from.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn installed(&self) -> bool {
        self.installation.installed()
    }

    /// Links this installation to `source`.
    ///
    /// A no-op when already installed and `remove_existing` is false.
    pub fn link(
        &mut self,
        source: &Installation,
        remove_existing: bool,
        rules: &LinkRuleSets,
    ) -> Result<(), Error> {
        if self.installed() && !remove_existing {
            debug!(
                "{} already installed, skipping link",
                self.installation.root().display()
            );
            return Ok(());
        }

        if !source.installed() {
            return Err(Error::NotInstalled(source.root().to_path_buf()));
        }

        self.unlink()?;

        info!(
            "Linking {} -> {}",
            self.installation.root().display(),
            source.root().display()
        );
        if let Err(err) = self.project(source, rules) {
            let rollback = self.unlink().err().map(Box::new);
            return Err(Error::Link {
                dest: self.installation.root().to_path_buf(),
                source: Box::new(err),
                rollback,
            });
        }

        self.source = Some(source.root().to_path_buf());
        Ok(())
    }

    /// Removes the linked tree, data directory first and then the root.
    pub fn unlink(&self) -> Result<(), Error> {
        // order is important
        for layer in [self.installation.data_dir(), self.installation.root()] {
            unlink_dir(layer).map_err(|source| Error::Unlink {
                path: layer.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    fn project(&self, source: &Installation, rules: &LinkRuleSets) -> Result<(), Error> {
        link_dir(source.root(), self.installation.root(), &rules.root)?;
        link_dir(source.data_dir(), self.installation.data_dir(), &rules.data)?;
        Ok(())
    }
}

/// Copy or symlink entries from `source_dir` into `dest_dir` per `rules`.
fn link_dir(source_dir: &Path, dest_dir: &Path, rules: &LinkRules) -> Result<(), Error> {
    fs::create_dir_all(dest_dir)?;

    for entry in fs::read_dir(source_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name_str) = name.to_str() else {
            warn!("Skipping non UTF-8 entry {:?}", name);
            continue;
        };
        let Some(action) = rules.classify(name_str) else {
            continue;
        };

        let src = normalize(&entry.path())?;
        let dest = dest_dir.join(&name);
        let is_dir = fs::metadata(&src)?.is_dir();

        match action {
            LinkAction::Symlink => symlink(&src, &dest, is_dir)?,
            LinkAction::CopyDir if is_dir => copy_tree(&src, &dest)?,
            LinkAction::CopyFile if !is_dir => {
                fs::copy(&src, &dest)?;
            }
            LinkAction::CopyDir | LinkAction::CopyFile => {
                warn!(
                    "Skipping {}: {:?} rule does not apply to a {}",
                    src.display(),
                    action,
                    if is_dir { "directory" } else { "file" }
                );
            }
        }
    }
    Ok(())
}

/// Remove files, directories and symlinks from `linked_dir`, then the directory.
fn unlink_dir(linked_dir: &Path) -> io::Result<()> {
    if fs::symlink_metadata(linked_dir).is_err() {
        return Ok(());
    }

    for entry in fs::read_dir(linked_dir)? {
        let path = entry?.path();
        let metadata = fs::symlink_metadata(&path)?;
        if metadata.file_type().is_symlink() {
            remove_symlink(&path)?;
        } else if metadata.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    fs::remove_dir(linked_dir)
}

/// Recursive copy that recreates symlinks instead of following them.
fn copy_tree(src: &Path, dest: &Path) -> Result<(), Error> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            let points_at_dir = fs::metadata(entry.path()).map(|m| m.is_dir()).unwrap_or(false);
            symlink(&link, &target, points_at_dir)?;
        } else if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Absolute, lexically normalized form of `path`; symlinks are not resolved.
pub fn normalize(path: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

#[cfg(unix)]
fn symlink(src: &Path, dest: &Path, _is_dir: bool) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dest)
}

#[cfg(windows)]
fn symlink(src: &Path, dest: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        std::os::windows::fs::symlink_dir(src, dest)
    } else {
        std::os::windows::fs::symlink_file(src, dest)
    }
}

#[cfg(unix)]
fn remove_symlink(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

#[cfg(windows)]
fn remove_symlink(path: &Path) -> io::Result<()> {
    // directory symlinks are directories to the Win32 API
    fs::remove_file(path).or_else(|_| fs::remove_dir(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_drops_dot_segments() {
        let base = std::env::current_dir().unwrap();
        let normalized = normalize(Path::new("a/./b/../c")).unwrap();
        assert_eq!(normalized, base.join("a").join("c"));
        assert!(normalized.is_absolute());
    }
}
