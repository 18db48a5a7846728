use crate::{github::LookupError, matcher::FullMatch};
use itertools::Itertools;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use url::Url;

/// The latest release of the tracked project, as returned by the release API.
///
/// Only the fields needed to pick and download an asset are kept. Anything else in the response is
/// ignored.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct Release {
    pub name: String,
    pub assets: Vec<Asset>,
}

/// One downloadable file attached to a release.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct Asset {
    pub name: String,
    #[serde(rename = "browser_download_url")]
    pub url: Url,
}

impl Release {
    /// The release's display name, which this project uses as its version string.
    pub fn version(&self) -> &str {
        &self.name
    }

    /// Returns the first asset, in the order the API listed them, whose name fully matches
    /// `matcher`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::MissingAsset`] if no asset matches.
    pub fn find_asset(&self, matcher: &FullMatch) -> Result<&Asset, LookupError> {
        debug!(
            "matching assets against `{matcher}`: {}",
            self.assets.iter().map(|a| a.name.as_str()).join(", ")
        );

        let mut matches = self.assets.iter().filter(|a| matcher.is_match(&a.name));
        let Some(first) = matches.next() else {
            return Err(LookupError::MissingAsset {
                pattern: matcher.pattern().to_string(),
            });
        };

        let ignored = matches.map(|a| a.name.as_str()).collect::<Vec<_>>();
        if !ignored.is_empty() {
            warn!(
                "`{matcher}` matched more than one asset, using {} and ignoring {}",
                first.name,
                ignored.iter().join(", "),
            );
        }

        Ok(first)
    }
}
