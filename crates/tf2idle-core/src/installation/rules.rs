use glob::Pattern;

use crate::error::Error;

/// How an entry of a linked layer is realized in the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    Symlink,
    CopyDir,
    CopyFile,
}

/// Three disjoint sets of glob patterns, matched case-sensitively against an
/// entry's base name. Checked in order symlink, copy-dir, copy-file; the first
/// matching category wins and unmatched entries are skipped.
#[derive(Debug, Clone, Default)]
pub struct LinkRules {
    symlinks: Vec<Pattern>,
    copy_dirs: Vec<Pattern>,
    copy_files: Vec<Pattern>,
}

impl LinkRules {
    pub fn new(symlinks: &[&str], copy_dirs: &[&str], copy_files: &[&str]) -> Result<Self, Error> {
        for pattern in symlinks.iter().chain(copy_dirs).chain(copy_files) {
            let categories = [symlinks, copy_dirs, copy_files]
                .iter()
                .filter(|set| set.contains(pattern))
                .count();
            if categories > 1 {
                return Err(Error::ConflictingRule {
                    pattern: pattern.to_string(),
                });
            }
        }

        Ok(Self {
            symlinks: compile(symlinks)?,
            copy_dirs: compile(copy_dirs)?,
            copy_files: compile(copy_files)?,
        })
    }

    pub fn classify(&self, name: &str) -> Option<LinkAction> {
        if matches_any(name, &self.symlinks) {
            Some(LinkAction::Symlink)
        } else if matches_any(name, &self.copy_dirs) {
            Some(LinkAction::CopyDir)
        } else if matches_any(name, &self.copy_files) {
            Some(LinkAction::CopyFile)
        } else {
            None
        }
    }
}

/// Rules for the installation root and for its `steamapps` data directory.
#[derive(Debug, Clone)]
pub struct LinkRuleSets {
    pub root: LinkRules,
    pub data: LinkRules,
}

impl LinkRuleSets {
    /// Copy `bin/`, DLLs and executables at the root; symlink the archives.
    pub fn steam_defaults() -> Result<Self, Error> {
        Ok(Self {
            root: LinkRules::new(&[], &["bin"], &["*.dll", "*.exe"])?,
            data: LinkRules::new(&["*.gcf"], &[], &[])?,
        })
    }
}

fn compile(patterns: &[&str]) -> Result<Vec<Pattern>, Error> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|source| Error::InvalidPattern {
                pattern: p.to_string(),
                source,
            })
        })
        .collect()
}

fn matches_any(name: &str, patterns: &[Pattern]) -> bool {
    patterns.iter().any(|pattern| pattern.matches(name))
}
