use anyhow::{Context, Result};
use log::{debug, warn};
use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

/// Where the release gets unpacked, and how that was decided.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Destination {
    pub path: PathBuf,
    pub source: DestinationSource,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DestinationSource {
    /// Set directly through [`UpdaterBuilder::destination`](crate::UpdaterBuilder::destination).
    Explicit,
    /// Read from the given configuration file.
    ConfigFile(PathBuf),
    /// The configuration file did not exist or was empty, so the working directory is used.
    WorkingDirectory,
}

// A missing or empty configuration file is recovered from, so each gets its own variant rather
// than an error.
#[derive(Debug, PartialEq, Eq)]
enum ConfigRead {
    Found(PathBuf),
    Missing,
    Empty,
}

/// How the updater should find its destination directory.
#[derive(Clone, Debug)]
pub(crate) enum DestinationSetting {
    Explicit(PathBuf),
    ConfigFile(PathBuf),
}

impl DestinationSetting {
    pub(crate) fn resolve(&self) -> Result<Destination> {
        match self {
            DestinationSetting::Explicit(path) => {
                debug!("using explicit destination {}", path.display());
                Ok(Destination {
                    path: path.clone(),
                    source: DestinationSource::Explicit,
                })
            }
            DestinationSetting::ConfigFile(config_file) => resolve_from_config_file(config_file),
        }
    }
}

fn resolve_from_config_file(config_file: &Path) -> Result<Destination> {
    let read = read_config_file(config_file).with_context(|| {
        format!(
            "failed to read the destination from {}",
            config_file.display()
        )
    })?;

    match read {
        ConfigRead::Found(path) => {
            debug!(
                "read destination {} from {}",
                path.display(),
                config_file.display()
            );
            Ok(Destination {
                path,
                source: DestinationSource::ConfigFile(config_file.to_path_buf()),
            })
        }
        ConfigRead::Missing => {
            warn!(
                "{} not found. Falling back to current working directory.",
                config_file.display()
            );
            working_directory()
        }
        ConfigRead::Empty => {
            warn!(
                "{} is empty. Falling back to current working directory.",
                config_file.display()
            );
            working_directory()
        }
    }
}

fn working_directory() -> Result<Destination> {
    let path = env::current_dir().context("could not get the current working directory")?;
    Ok(Destination {
        path,
        source: DestinationSource::WorkingDirectory,
    })
}

fn read_config_file(config_file: &Path) -> Result<ConfigRead> {
    let content = match fs::read_to_string(config_file) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ConfigRead::Missing),
        Err(e) => return Err(e.into()),
    };

    let path = content.trim_end();
    if path.trim_start().is_empty() {
        return Ok(ConfigRead::Empty);
    }

    Ok(ConfigRead::Found(PathBuf::from(path)))
}
