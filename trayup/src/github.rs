use crate::{matcher::FullMatch, release::Asset, release::Release};
use anyhow::Result;
use log::debug;
use reqwest::{
    header::{HeaderValue, ACCEPT, AUTHORIZATION},
    Client, RequestBuilder, StatusCode,
};
use thiserror::Error;
use url::Url;

/// Errors from looking up the latest release and picking an asset from it.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request for release info from {url} failed: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("request for release info from {url} returned {status}")]
    Status { status: StatusCode, url: Url },
    #[error("release info from {url} did not have the expected shape: {source}")]
    MalformedRelease {
        url: Url,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not find matching asset for `{pattern}`")]
    MissingAsset { pattern: String },
}

/// A client for one project's "latest release" API endpoint.
#[derive(Debug)]
pub struct ReleaseClient {
    api_url: Url,
    token: Option<String>,
    client: Client,
}

impl ReleaseClient {
    pub fn new(api_url: Url, token: Option<String>, client: Client) -> Self {
        Self {
            api_url,
            token,
            client,
        }
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Fetches and parses the latest release. Every call makes a new request.
    ///
    /// # Errors
    ///
    /// Returns a [`LookupError`] if the request fails, the server returns a non-success status, or
    /// the body is not a release.
    pub async fn fetch_latest_release(&self) -> Result<Release> {
        debug!("Getting release info from `{}`", self.api_url);

        let mut req_builder = self
            .client
            .get(self.api_url.clone())
            .header(ACCEPT, HeaderValue::from_str("application/json")?);
        req_builder = self.maybe_add_token_header(req_builder)?;
        let resp = self
            .client
            .execute(req_builder.build()?)
            .await
            .map_err(|source| self.transport_error(source))?;

        if !resp.status().is_success() {
            return Err(LookupError::Status {
                status: resp.status(),
                url: self.api_url.clone(),
            }
            .into());
        }

        let body = resp
            .text()
            .await
            .map_err(|source| self.transport_error(source))?;
        let release = serde_json::from_str::<Release>(&body).map_err(|source| {
            LookupError::MalformedRelease {
                url: self.api_url.clone(),
                source,
            }
        })?;
        debug!(
            "release {} has {} assets",
            release.version(),
            release.assets.len()
        );

        Ok(release)
    }

    /// Returns the latest release's name.
    ///
    /// # Errors
    ///
    /// See [`ReleaseClient::fetch_latest_release`].
    pub async fn fetch_latest_version(&self) -> Result<String> {
        Ok(self.fetch_latest_release().await?.name)
    }

    /// Fetches the latest release and returns the first asset whose name fully matches `pattern`.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regex, if the release cannot be fetched, or
    /// [`LookupError::MissingAsset`] if nothing matches.
    pub async fn find_asset_by_pattern(&self, pattern: &str) -> Result<Asset> {
        let matcher = FullMatch::new(pattern)?;
        let release = self.fetch_latest_release().await?;
        Ok(release.find_asset(&matcher)?.clone())
    }

    pub(crate) fn maybe_add_token_header(
        &self,
        mut req_builder: RequestBuilder,
    ) -> Result<RequestBuilder> {
        if let Some(token) = self.token.as_deref() {
            debug!("Adding GitHub token to GitHub request.");
            let bearer = format!("Bearer {token}");
            let mut auth_val = HeaderValue::from_str(&bearer)?;
            auth_val.set_sensitive(true);
            req_builder = req_builder.header(AUTHORIZATION, auth_val);
        } else {
            debug!("No token given.");
        }
        Ok(req_builder)
    }

    // Browser download URLs live on a different host than the API, and we don't want to hand the
    // token to whatever that host redirects to.
    pub(crate) fn maybe_add_token_header_for(
        &self,
        req_builder: RequestBuilder,
        url: &Url,
    ) -> Result<RequestBuilder> {
        if url.host_str() == self.api_url.host_str() && url.port() == self.api_url.port() {
            self.maybe_add_token_header(req_builder)
        } else {
            Ok(req_builder)
        }
    }

    fn transport_error(&self, source: reqwest::Error) -> LookupError {
        LookupError::Transport {
            url: self.api_url.clone(),
            source,
        }
    }
}
