use crate::{github::ReleaseClient, release::Asset};
use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_DISPOSITION},
    Client, StatusCode,
};
use std::{fs::File, io::Write, path::Path, path::PathBuf};
use tempfile::{tempdir, TempDir};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download failed with status code {status} downloading from {url}")]
    Status { status: StatusCode, url: Url },
    #[error("failed to download from {url}: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug)]
pub(crate) struct Download {
    // We need to keep the temp dir around so that it's not deleted before
    // we're done with it.
    pub(crate) _temp_dir: TempDir,
    pub(crate) archive_path: PathBuf,
    pub(crate) filename: String,
}

pub(crate) async fn download_asset(
    client: &Client,
    release_client: &ReleaseClient,
    asset: &Asset,
) -> Result<Download> {
    debug!("downloading asset from {}", asset.url);

    let mut req_builder = client.get(asset.url.clone()).header(
        ACCEPT,
        HeaderValue::from_str("application/octet-stream")
            .context("failed to create header value for Accept header")?,
    );
    req_builder = release_client.maybe_add_token_header_for(req_builder, &asset.url)?;
    let req = req_builder
        .build()
        .with_context(|| format!("failed to build HTTP request for {}", asset.url))?;

    let mut resp = client
        .execute(req)
        .await
        .map_err(|source| DownloadError::Transport {
            url: asset.url.clone(),
            source,
        })?;
    if !resp.status().is_success() {
        return Err(DownloadError::Status {
            status: resp.status(),
            url: asset.url.clone(),
        }
        .into());
    }

    let filename = served_filename(resp.headers(), &asset.url, &asset.name);

    let td = tempdir().context("failed to create temporary directory for download")?;
    let archive_path = td.path().join(archive_file_name(&asset.name));
    debug!("archive path is {}", archive_path.display());

    {
        let mut downloaded_file = File::create(&archive_path).with_context(|| {
            format!(
                "failed to create file at {} for downloaded asset",
                archive_path.display()
            )
        })?;
        while let Some(c) = resp
            .chunk()
            .await
            .map_err(|source| DownloadError::Transport {
                url: asset.url.clone(),
                source,
            })?
        {
            downloaded_file.write_all(c.as_ref()).with_context(|| {
                format!("failed to write chunk to {}", archive_path.display())
            })?;
        }
    }

    Ok(Download {
        _temp_dir: td,
        archive_path,
        filename,
    })
}

// The name comes from the server, so only its final path component is used.
fn served_filename(headers: &HeaderMap, url: &Url, asset_name: &str) -> String {
    let from_header = headers
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(content_disposition_filename);

    let name = if let Some(name) = from_header {
        name
    } else {
        warn!(
            "File had no Content-Disposition header with a usable filename. Falling back to URL \
             parsing."
        );
        url.path_segments()
            .and_then(|mut s| s.next_back())
            .filter(|s| !s.is_empty())
            .map_or_else(|| asset_name.to_string(), String::from)
    };

    match Path::new(&name).file_name().and_then(|n| n.to_str()) {
        Some(n) => n.to_string(),
        None => {
            debug!("served filename `{name}` is not usable, using the asset name");
            asset_name.to_string()
        }
    }
}

// The served name is only reported. The file on disk is named after the asset.
fn archive_file_name(asset_name: &str) -> &str {
    Path::new(asset_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download.zip")
}

/// Pulls the filename out of a `Content-Disposition` header value. An RFC 5987 `filename*` wins
/// over a plain `filename`.
fn content_disposition_filename(value: &str) -> Option<String> {
    let mut plain = None;

    for param in split_params(value) {
        let Some((key, v)) = param.trim().split_once('=') else {
            continue;
        };
        let v = v.trim();

        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = v
                    .split_once("''")
                    .filter(|(charset, _)| charset.eq_ignore_ascii_case("utf-8"))
                    .map(|(_, rest)| rest);
                if let Some(name) = encoded.map(percent_decode).filter(|n| !n.is_empty()) {
                    return Some(name);
                }
            }
            "filename" => {
                let unquoted = v
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .map_or_else(|| v.to_string(), |v| v.replace("\\\"", "\""));
                if !unquoted.is_empty() {
                    plain = Some(unquoted);
                }
            }
            _ => {}
        }
    }

    plain
}

// Splits on `;`, except inside a quoted string.
fn split_params(value: &str) -> Vec<&str> {
    let mut params = vec![];
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                params.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(&value[start..]);

    params
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input
                .get(i + 1..i + 3)
                .filter(|h| h.bytes().all(|b| b.is_ascii_hexdigit()))
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(b) = hex {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use rstest::rstest;

    #[rstest]
    #[case::plain_token("attachment; filename=tray.zip", Some("tray.zip"))]
    #[case::quoted(r#"attachment; filename="tray 1.zip""#, Some("tray 1.zip"))]
    #[case::escaped_quote(r#"attachment; filename="a\"b.zip""#, Some(r#"a"b.zip"#))]
    #[case::extended_wins(
        r#"attachment; filename="fallback.zip"; filename*=UTF-8''tr%C3%A4y.zip"#,
        Some("träy.zip")
    )]
    #[case::case_insensitive_key("attachment; FileName=tray.zip", Some("tray.zip"))]
    #[case::no_filename("inline", None)]
    #[case::empty_filename(r#"attachment; filename="""#, None)]
    #[case::semicolon_in_quotes(r#"attachment; filename="tray;1.zip""#, Some("tray;1.zip"))]
    #[case::escaped_quote_then_semicolon(
        r#"attachment; filename="a\";b.zip"; size=3"#,
        Some(r#"a";b.zip"#)
    )]
    fn parses_content_disposition(#[case] header: &str, #[case] expect: Option<&str>) {
        assert_eq!(
            content_disposition_filename(header).as_deref(),
            expect,
            "{header}"
        );
    }

    #[test_log::test]
    fn percent_decode_leaves_bad_escapes_alone() {
        assert_eq!(percent_decode("a%2"), "a%2");
        assert_eq!(percent_decode("a%zz.zip"), "a%zz.zip");
        assert_eq!(percent_decode("a%20b"), "a b");
    }

    #[rstest]
    #[case::header_wins(
        Some("attachment; filename=served.zip"),
        "https://example.com/d/from-url.zip",
        "served.zip"
    )]
    #[case::url_fallback(None, "https://example.com/d/from-url.zip", "from-url.zip")]
    #[case::header_without_filename(
        Some("inline"),
        "https://example.com/d/from-url.zip",
        "from-url.zip"
    )]
    #[case::header_path_is_stripped(
        Some("attachment; filename=../../etc/served.zip"),
        "https://example.com/d/from-url.zip",
        "served.zip"
    )]
    #[case::asset_name_when_url_has_no_file(None, "https://example.com/", "asset.zip")]
    fn picks_served_filename(
        #[case] header: Option<&str>,
        #[case] url: &str,
        #[case] expect: &str,
    ) -> Result<()> {
        let mut headers = HeaderMap::new();
        if let Some(h) = header {
            headers.insert(CONTENT_DISPOSITION, HeaderValue::from_str(h)?);
        }
        let url = Url::parse(url)?;
        assert_eq!(served_filename(&headers, &url, "asset.zip"), expect);
        Ok(())
    }

    fn release_client(server: &Server) -> Result<ReleaseClient> {
        Ok(ReleaseClient::new(
            Url::parse(&format!("{}/repos/x/y/releases/latest", server.url()))?,
            None,
            Client::new(),
        ))
    }

    #[test_log::test(tokio::test)]
    async fn downloads_into_temp_dir() -> Result<()> {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/download/tray.zip")
            .match_header("Accept", "application/octet-stream")
            .with_status(200)
            .with_header("Content-Disposition", "attachment; filename=served.zip")
            .with_body(b"not really a zip")
            .create_async()
            .await;

        let asset = Asset {
            name: "tray.zip".to_string(),
            url: Url::parse(&format!("{}/download/tray.zip", server.url()))?,
        };
        let download = download_asset(&Client::new(), &release_client(&server)?, &asset).await?;
        assert_eq!(download.filename, "served.zip");
        assert_eq!(
            download.archive_path.file_name(),
            Some(std::ffi::OsStr::new("tray.zip"))
        );
        assert_eq!(std::fs::read(&download.archive_path)?, b"not really a zip");

        m.assert_async().await;
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn not_found_is_a_download_error() -> Result<()> {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/download/tray.zip")
            .with_status(404)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/download/tray.zip", server.url()))?;
        let asset = Asset {
            name: "tray.zip".to_string(),
            url: url.clone(),
        };
        let err = download_asset(&Client::new(), &release_client(&server)?, &asset)
            .await
            .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("404"), "{msg}");
        assert!(msg.contains(url.as_str()), "{msg}");
        match err.downcast_ref::<DownloadError>() {
            Some(DownloadError::Status { status, url: got }) => {
                assert_eq!(*status, StatusCode::NOT_FOUND);
                assert_eq!(*got, url);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        Ok(())
    }
}
