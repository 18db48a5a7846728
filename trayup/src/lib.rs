//! A library for keeping a local copy of Syncthing Tray up to date.
//!
//! `trayup` asks the GitHub API for the latest Syncthing Tray release, downloads the 64-bit Windows
//! zip file attached to it, unpacks it into a destination directory, and renames the versioned
//! files inside to stable names. After a run, the destination holds `syncthingtray.exe`,
//! `syncthingtraycli.exe`, and `syncthingtray.md`, whatever the release's version is.
//!
//! This project also ships a CLI tool named `trayup`.
//!
//! The main entry point for programmatic use is the [`UpdaterBuilder`] struct. Here is an example of
//! its usage:
//!
//! ```ignore
//! use trayup::UpdaterBuilder;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let updater = UpdaterBuilder::new()
//!         .destination("C:\\Tools\\Syncthing Tray")
//!         .build()?;
//!
//!     let report = updater.run().await?;
//!     println!("updated to {}", report.version);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Where Files Go
//!
//! Unless [`UpdaterBuilder::destination`] is called, the destination directory is read from
//! `download_path.txt` in the working directory (see [`UpdaterBuilder::config_file`]). The file
//! holds one path. Trailing whitespace is ignored. If the file does not exist or is empty, the
//! working directory itself is used. Any other problem reading it is an error.
//!
//! ## How the Release Asset Is Picked
//!
//! The asset list is scanned in the order GitHub returns it, and the first asset whose name matches
//! the archive pattern in full is used. The default pattern matches names like
//! `syncthingtray-1.7.4-x86_64-w64-mingw32.exe.zip`. If more than one asset matches, a warning is
//! logged naming the ones that were skipped.
//!
//! ## Renaming
//!
//! Each extracted entry is checked against the [`RenameTable`] in order, and the first rule that
//! applies decides its new name. A file that already has the new name is deleted first, so running
//! twice leaves the same set of files. Entries no rule applies to keep the name they have in the
//! archive.
//!
//! ## Features
//!
//! This crate offers several features to control the TLS dependency used by `reqwest`:
//!
#![doc = document_features::document_features!()]

mod builder;
pub mod defaults;
mod destination;
mod download;
mod extractor;
mod github;
mod matcher;
mod release;
mod renamer;
mod updater;

pub use crate::{
    builder::UpdaterBuilder,
    destination::{Destination, DestinationSource},
    download::DownloadError,
    extractor::ExtractError,
    github::{LookupError, ReleaseClient},
    matcher::FullMatch,
    release::{Asset, Release},
    renamer::{Rename, RenameRule, RenameTable},
    updater::{UpdateReport, Updater},
};

// The version of the `trayup` crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(feature = "logging")]
use fern::{
    colors::{Color, ColoredLevelConfig},
    Dispatch,
};

/// This function initializes logging for the application. It's public for the sake of the `trayup`
/// binary, but it lives in the library crate so that test code can also enable logging.
///
/// # Errors
///
/// This can return a `log::SetLoggerError` error.
#[cfg(feature = "logging")]
pub fn init_logger(level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    let line_colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::BrightBlack)
        .debug(Color::BrightBlack)
        .trace(Color::BrightBlack);
    let level_colors = line_colors.info(Color::Green).debug(Color::Black);

    Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{color_line}[{level}{color_line}] {message}\x1B[0m",
                color_line = format_args!(
                    "\x1B[{}m",
                    line_colors.get_color(&record.level()).to_fg_str()
                ),
                level = level_colors.color(record.level()),
                message = message,
            ));
        })
        .level(level)
        // These are very noisy.
        .level_for("hyper", log::LevelFilter::Error)
        .level_for("hyper_util", log::LevelFilter::Error)
        .level_for("reqwest", log::LevelFilter::Error)
        .chain(std::io::stderr())
        .apply()
}
