use crate::matcher::FullMatch;
use anyhow::{anyhow, Context, Result};
use lazy_regex::regex;
use log::{debug, info};
use regex::Regex;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// One row of the rename table: entries whose names fully match `matches`, and do not contain a
/// match for `unless`, are renamed to `canonical`.
#[derive(Clone, Debug)]
pub struct RenameRule {
    matches: FullMatch,
    unless: Option<Regex>,
    canonical: String,
}

/// An ordered list of rename rules. The first rule that applies to an entry wins.
#[derive(Clone, Debug, Default)]
pub struct RenameTable(Vec<RenameRule>);

/// A rename that was carried out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rename {
    pub from: String,
    pub to: String,
    /// True if a file with the canonical name was deleted to make room.
    pub replaced_existing: bool,
}

impl RenameRule {
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regex or `canonical` is not a bare file name.
    pub fn new(pattern: &str, canonical: &str) -> Result<Self> {
        Ok(Self {
            matches: FullMatch::new(pattern)?,
            unless: None,
            canonical: validate_canonical(canonical)?,
        })
    }

    /// Excludes names that contain a match for `pattern` anywhere.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regex.
    pub fn unless(mut self, pattern: &str) -> Result<Self> {
        self.unless = Some(
            Regex::new(pattern).with_context(|| format!("`{pattern}` is not a valid regex"))?,
        );
        Ok(self)
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn applies_to(&self, name: &str) -> bool {
        self.matches.is_match(name) && !self.unless.as_ref().is_some_and(|u| u.is_match(name))
    }
}

impl RenameTable {
    #[must_use]
    pub fn new(rules: Vec<RenameRule>) -> Self {
        RenameTable(rules)
    }

    /// The rules for the Windows build of Syncthing Tray: the CLI executable, the GUI executable,
    /// and the bundled readme.
    #[must_use]
    pub fn syncthingtray() -> Self {
        let not_cli = regex!("-cli");
        RenameTable(vec![
            RenameRule {
                matches: FullMatch::from_anchored(regex!(r"^syncthingtray.+-cli\.exe$")),
                unless: None,
                canonical: "syncthingtraycli.exe".to_string(),
            },
            RenameRule {
                matches: FullMatch::from_anchored(regex!(r"^syncthingtray.*\.exe$")),
                unless: Some(Regex::clone(not_cli)),
                canonical: "syncthingtray.exe".to_string(),
            },
            RenameRule {
                matches: FullMatch::from_anchored(regex!(r"^syncthingtray.*\.md$")),
                unless: Some(Regex::clone(not_cli)),
                canonical: "syncthingtray.md".to_string(),
            },
        ])
    }

    pub fn rules(&self) -> &[RenameRule] {
        &self.0
    }

    /// Returns the canonical name for `entry`, if any rule applies to it.
    pub fn canonical_name_for(&self, entry: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|r| r.applies_to(entry))
            .map(RenameRule::canonical)
    }

    /// Renames every entry in `dest` that a rule applies to. If a file with the canonical name
    /// already exists, it is deleted first. Entries without a rule are left alone.
    ///
    /// There's no rollback. If a rename fails, the renames made before it stay in place.
    pub(crate) fn apply(&self, dest: &Path, entries: &[String]) -> Result<Vec<Rename>> {
        let mut renames = vec![];

        for entry in entries {
            let Some(canonical) = self.canonical_name_for(entry) else {
                debug!("no rename rule applies to {entry}");
                continue;
            };

            let orig_path = dest.join(entry);
            let target_path = dest.join(canonical);
            if orig_path == target_path {
                debug!("{entry} already has its canonical name");
                continue;
            }

            let replaced_existing = target_path.exists();
            if replaced_existing {
                info!("Deleting existing file {canonical}");
                fs::remove_file(&target_path).with_context(|| {
                    format!("failed to delete existing file {}", target_path.display())
                })?;
            }

            info!("Renaming {entry} to {canonical}");
            fs::rename(&orig_path, &target_path).with_context(|| {
                format!(
                    "failed to rename {} to {}",
                    orig_path.display(),
                    target_path.display()
                )
            })?;

            renames.push(Rename {
                from: entry.clone(),
                to: canonical.to_string(),
                replaced_existing,
            });
        }

        Ok(renames)
    }
}

fn validate_canonical(canonical: &str) -> Result<String> {
    let is_bare = Path::new(canonical)
        .file_name()
        .is_some_and(|n| PathBuf::from(n) == Path::new(canonical));
    if !is_bare {
        return Err(anyhow!(
            "canonical name `{canonical}` must be a file name without any directories"
        ));
    }
    Ok(canonical.to_string())
}
