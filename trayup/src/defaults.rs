//! Compile-time defaults for the release being tracked.

/// The "latest release" endpoint for Syncthing Tray.
pub const API_URL: &str = "https://api.github.com/repos/Martchus/syncthingtray/releases/latest";

/// Matches the 64-bit Windows build, e.g. `syncthingtray-1.7.4-x86_64-w64-mingw32.exe.zip`.
pub const ARCHIVE_PATTERN: &str = r"syncthingtray-\d+\.\d+\.\d+-x86_64-w64-mingw32\.exe\.zip";

/// The file, relative to the working directory, that holds the destination directory.
pub const CONFIG_FILE: &str = "download_path.txt";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::FullMatch;
    use anyhow::Result;
    use url::Url;

    #[test]
    fn api_url_parses() -> Result<()> {
        let url = Url::parse(API_URL)?;
        assert_eq!(url.host_str(), Some("api.github.com"));
        Ok(())
    }

    #[test]
    fn archive_pattern_picks_the_64_bit_windows_zip() -> Result<()> {
        let m = FullMatch::new(ARCHIVE_PATTERN)?;
        assert!(m.is_match("syncthingtray-1.7.4-x86_64-w64-mingw32.exe.zip"));
        assert!(m.is_match("syncthingtray-2.0.10-x86_64-w64-mingw32.exe.zip"));
        assert!(!m.is_match("syncthingtray-1.7.4-i686-w64-mingw32.exe.zip"));
        assert!(!m.is_match("syncthingtray-1.7.4-x86_64-w64-mingw32.exe.zip.sig"));
        assert!(!m.is_match("syncthingtray-1.7.4-x86_64-pc-linux-gnu.tar.xz"));
        Ok(())
    }
}
