/// The `builder` module contains the `UpdaterBuilder` struct which is used to create an `Updater`
/// instance.
use crate::{
    defaults,
    destination::DestinationSetting,
    github::ReleaseClient,
    matcher::FullMatch,
    renamer::RenameTable,
    updater::Updater,
};
use anyhow::{Context, Result};
use log::debug;
use reqwest::{
    header::{HeaderMap, HeaderValue, USER_AGENT},
    Client,
};
use std::{
    env,
    path::{Path, PathBuf},
};
use url::Url;

/// `UpdaterBuilder` is used to create an [`Updater`] instance. Every setting has a default, so
/// `UpdaterBuilder::new().build()` gives you an updater for the 64-bit Windows build of Syncthing
/// Tray that reads its destination from `download_path.txt`.
#[derive(Debug, Default)]
#[allow(clippy::module_name_repetitions)]
pub struct UpdaterBuilder<'a> {
    api_url: Option<&'a str>,
    config_file: Option<PathBuf>,
    destination: Option<PathBuf>,
    archive_pattern: Option<&'a str>,
    renames: Option<RenameTable>,
    token: Option<&'a str>,
}

impl<'a> UpdaterBuilder<'a> {
    /// Returns a new empty `UpdaterBuilder`.
    #[must_use]
    pub fn new() -> Self {
        UpdaterBuilder::default()
    }

    /// Set the "latest release" API URL. This is useful for testing or for tracking a different
    /// project that ships the same kind of archive.
    #[must_use]
    pub fn api_url(mut self, api_url: &'a str) -> Self {
        self.api_url = Some(api_url);
        self
    }

    /// Set the file to read the destination directory from. Defaults to `download_path.txt`. If the
    /// file does not exist, the current working directory is used.
    #[must_use]
    pub fn config_file<P: AsRef<Path>>(mut self, config_file: P) -> Self {
        self.config_file = Some(config_file.as_ref().to_path_buf());
        self
    }

    /// Set the destination directory directly. When this is set, the config file is not read.
    #[must_use]
    pub fn destination<P: AsRef<Path>>(mut self, destination: P) -> Self {
        self.destination = Some(destination.as_ref().to_path_buf());
        self
    }

    /// Set the regex used to pick the release asset. It must match the whole asset name.
    #[must_use]
    pub fn archive_pattern(mut self, pattern: &'a str) -> Self {
        self.archive_pattern = Some(pattern);
        self
    }

    #[must_use]
    pub fn renames(mut self, renames: RenameTable) -> Self {
        self.renames = Some(renames);
        self
    }

    /// Set a token to use for API requests. If this is not set, then the `GITHUB_TOKEN` env var is
    /// used, if it is set.
    #[must_use]
    pub fn token(mut self, token: &'a str) -> Self {
        self.token = Some(token);
        self
    }

    /// Builds a new [`Updater`] instance and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL cannot be parsed, the archive pattern is not a valid regex,
    /// or the HTTP client cannot be created.
    pub fn build(self) -> Result<Updater> {
        let api_url = self.api_url.unwrap_or(defaults::API_URL);
        let api_url =
            Url::parse(api_url).with_context(|| format!("`{api_url}` is not a valid URL"))?;

        let archive_matcher =
            FullMatch::new(self.archive_pattern.unwrap_or(defaults::ARCHIVE_PATTERN))?;

        let destination = match self.destination {
            Some(d) => DestinationSetting::Explicit(d),
            None => DestinationSetting::ConfigFile(
                self.config_file
                    .unwrap_or_else(|| PathBuf::from(defaults::CONFIG_FILE)),
            ),
        };

        let reqwest_client = reqwest_client()?;
        let release_client =
            ReleaseClient::new(api_url, resolve_token(self.token), reqwest_client.clone());

        Ok(Updater::new(
            release_client,
            reqwest_client,
            destination,
            archive_matcher,
            self.renames.unwrap_or_else(RenameTable::syncthingtray),
        ))
    }
}

fn resolve_token(token: Option<&str>) -> Option<String> {
    if let Some(t) = token {
        return Some(t.to_string());
    }
    let token = env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());
    if token.is_some() {
        debug!("Using GitHub token from the GITHUB_TOKEN environment variable.");
    }
    token
}

fn reqwest_client() -> Result<Client> {
    let builder = Client::builder().gzip(true);

    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&format!("trayup version {}", super::VERSION))?,
    );
    Ok(builder.default_headers(headers).build()?)
}
