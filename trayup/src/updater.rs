use crate::{
    destination::{Destination, DestinationSetting},
    download::download_asset,
    extractor::ArchiveExtractor,
    github::ReleaseClient,
    matcher::FullMatch,
    release::Asset,
    renamer::{Rename, RenameTable},
};
use anyhow::Result;
use log::{debug, info};
use reqwest::Client;

/// `Updater` runs one complete update. Use the [`UpdaterBuilder`](crate::UpdaterBuilder) struct to
/// create a new `Updater` instance.
#[derive(Debug)]
pub struct Updater {
    release_client: ReleaseClient,
    reqwest_client: Client,
    destination: DestinationSetting,
    archive_matcher: FullMatch,
    renames: RenameTable,
}

/// What a successful [`Updater::run`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateReport {
    pub version: String,
    pub asset: Asset,
    /// The file name the server gave the download, or the last segment of its URL.
    pub downloaded_filename: String,
    pub destination: Destination,
    /// Every entry in the archive, in archive order, under its original name.
    pub extracted: Vec<String>,
    pub renamed: Vec<Rename>,
}

impl Updater {
    pub(crate) fn new(
        release_client: ReleaseClient,
        reqwest_client: Client,
        destination: DestinationSetting,
        archive_matcher: FullMatch,
        renames: RenameTable,
    ) -> Updater {
        Updater {
            release_client,
            reqwest_client,
            destination,
            archive_matcher,
            renames,
        }
    }

    /// Resolve the destination, find the matching asset in the latest release, download it,
    /// unpack it into the destination, and rename the files the rename table knows about.
    ///
    /// # Errors
    ///
    /// Only a missing configuration file is recovered from. Any of these ends the run:
    ///
    /// * The configuration file exists but cannot be read, or is empty.
    /// * Network errors on requests to GitHub, or GitHub returns an error status
    ///   ([`LookupError`](crate::LookupError)).
    /// * No asset matches the archive pattern ([`LookupError::MissingAsset`](crate::LookupError)).
    /// * The download returns a non-success status ([`DownloadError`](crate::DownloadError)).
    /// * The download is not a zip file, or an entry would land outside the destination
    ///   ([`ExtractError`](crate::ExtractError)).
    /// * A file cannot be written, deleted, or renamed.
    ///
    /// Files written or renamed before a failure stay where they are.
    pub async fn run(&self) -> Result<UpdateReport> {
        let destination = self.destination.resolve()?;

        let release = self.release_client.fetch_latest_release().await?;
        info!("Found Syncthing Tray {}", release.version());

        let asset = release.find_asset(&self.archive_matcher)?.clone();
        debug!("picked asset named {}", asset.name);

        info!("Downloading from {}...", asset.url);
        let download = download_asset(&self.reqwest_client, &self.release_client, &asset).await?;
        info!("Downloaded file: {}", download.filename);

        let extracted = ArchiveExtractor::new(destination.path.clone()).extract(&download)?;
        let renamed = self.renames.apply(&destination.path, &extracted)?;

        Ok(UpdateReport {
            version: release.name,
            asset,
            downloaded_filename: download.filename,
            destination,
            extracted,
            renamed,
        })
    }
}
