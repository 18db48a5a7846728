use crate::download::Download;
use anyhow::{Context, Result};
use log::{debug, info};
use std::{
    fs::{create_dir_all, File},
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use zip::ZipArchive;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("archive entry `{name}` would be extracted outside of {}", dest.display())]
    UnsafeEntryPath { name: String, dest: PathBuf },
}

#[derive(Debug)]
pub(crate) struct ArchiveExtractor {
    dest: PathBuf,
}

impl ArchiveExtractor {
    pub(crate) fn new(dest: PathBuf) -> Self {
        ArchiveExtractor { dest }
    }

    /// Unpacks every entry of the downloaded zip file into the destination and returns the entry
    /// names in archive order. Existing files are overwritten.
    pub(crate) fn extract(&self, download: &Download) -> Result<Vec<String>> {
        debug!(
            "extracting {} into {}",
            download.archive_path.display(),
            self.dest.display()
        );

        let mut zip = ZipArchive::new(open_file(&download.archive_path)?)
            .with_context(|| format!("{} is not a valid zip file", download.filename))?;
        create_dir_all(&self.dest)
            .with_context(|| format!("Cannot create directory {}", self.dest.display()))?;

        let mut names = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut zf = zip.by_index(i)?;
            let name = zf.name().to_string();
            let Some(relative) = zf.enclosed_name() else {
                return Err(ExtractError::UnsafeEntryPath {
                    name,
                    dest: self.dest.clone(),
                }
                .into());
            };
            let path = self.dest.join(relative);

            if zf.is_dir() {
                debug!("creating directory {}", path.display());
                create_dir_all(&path)
                    .with_context(|| format!("Cannot create directory {}", path.display()))?;
            } else {
                debug!("extracting zip entry {name} to {}", path.display());
                if let Some(parent) = path.parent() {
                    create_dir_all(parent).with_context(|| {
                        format!("Cannot create directory {}", parent.display())
                    })?;
                }
                let mut writer = File::create(&path)
                    .with_context(|| format!("Cannot write to {}", path.display()))?;
                io::copy(&mut zf, &mut writer)
                    .with_context(|| format!("failed to extract {name} from the zip file"))?;
            }

            names.push(name);
        }

        info!(
            "Extracted {} entries into {}",
            names.len(),
            self.dest.display()
        );

        Ok(names)
    }
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("Failed to open file at {}", path.display()))
}
