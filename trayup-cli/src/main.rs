use anyhow::{Error, Result};
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use log::{error, info};
use std::time::Instant;
use thiserror::Error;
use trayup::{defaults, UpdateReport, Updater, UpdaterBuilder};

#[derive(Debug, Error)]
enum CliError {
    #[error("{0:}")]
    InvalidArgsError(String),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let start = Instant::now();

    let cmd = cmd();
    let matches = cmd.get_matches();
    let res = init_logger_from_matches(&matches);
    if let Err(e) = res {
        eprintln!("Error creating logger: {e}");
        std::process::exit(126);
    }

    let status = match make_updater(&matches) {
        Ok(u) => match u.run().await {
            Ok(report) => {
                print_report(&report);
                info!("Done! Elapsed time: {:.2?}", start.elapsed());
                0
            }
            Err(e) => {
                print_err(&e);
                1
            }
        },
        Err(e) => {
            print_err(&e);
            127
        }
    };
    std::process::exit(status);
}

const MAX_TERM_WIDTH: usize = 100;

fn cmd() -> Command {
    Command::new("trayup")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Dave Rolsky <autarch@urth.org>")
        .about("Downloads the latest Syncthing Tray release and gives its files stable names")
        .arg(
            Arg::new("in")
                .long("in")
                .short('i')
                .help(concat!(
                    "The directory into which the release should be unpacked. When this is set,",
                    " the config file is not read.",
                )),
        )
        .arg(
            Arg::new("config-file")
                .long("config-file")
                .short('c')
                .help(concat!(
                    "A file containing the directory into which the release should be unpacked.",
                    " If the file does not exist, the current directory is used.",
                ))
                .default_value(defaults::CONFIG_FILE),
        )
        .arg(Arg::new("api-url").long("api-url").help(concat!(
            "The URL of the \"latest release\" API endpoint. This is useful for testing or for",
            " tracking a fork that publishes the same kind of archive.",
        )))
        .arg(
            Arg::new("matching")
                .long("matching")
                .short('m')
                .help(concat!(
                    "A regex that must match the entire name of the release asset to download.",
                    " The default picks the 64-bit Windows zip file.",
                )),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable verbose output. This is the default."),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Enable debugging output."),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Suppresses most output."),
        )
        .group(ArgGroup::new("log-level").args(["verbose", "debug", "quiet"]))
        .max_term_width(MAX_TERM_WIDTH)
}

pub(crate) fn init_logger_from_matches(matches: &ArgMatches) -> Result<(), log::SetLoggerError> {
    let level = if matches.get_flag("debug") {
        log::LevelFilter::Debug
    } else if matches.get_flag("quiet") {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Info
    };

    trayup::init_logger(level)
}

fn make_updater(matches: &ArgMatches) -> Result<Updater> {
    validate_args(matches)?;

    let mut builder = UpdaterBuilder::new();
    if let Some(dir) = matches.get_one::<String>("in") {
        builder = builder.destination(dir);
    } else if let Some(f) = matches.get_one::<String>("config-file") {
        builder = builder.config_file(f);
    }
    if let Some(url) = matches.get_one::<String>("api-url") {
        builder = builder.api_url(url);
    }
    if let Some(m) = matches.get_one::<String>("matching") {
        builder = builder.archive_pattern(m);
    }

    builder.build()
}

fn validate_args(matches: &ArgMatches) -> Result<()> {
    if let Some(dir) = matches.get_one::<String>("in") {
        if dir.trim().is_empty() {
            return Err(CliError::InvalidArgsError(
                "The --in directory cannot be empty.".to_string(),
            )
            .into());
        }
    }
    if let Some(m) = matches.get_one::<String>("matching") {
        if m.is_empty() {
            return Err(CliError::InvalidArgsError(
                "The --matching pattern cannot be empty.".to_string(),
            )
            .into());
        }
    }

    Ok(())
}

fn print_report(report: &UpdateReport) {
    info!(
        "Unpacked {} entries from {} into {}",
        report.extracted.len(),
        report.downloaded_filename,
        report.destination.path.display(),
    );
    if report.renamed.is_empty() {
        info!("No files needed to be renamed");
    }
}

fn print_err(e: &Error) {
    error!("{e:#}");
    if let Some(ue) = e.downcast_ref::<CliError>() {
        match ue {
            CliError::InvalidArgsError(_) => {
                println!();
                if let Err(e) = cmd().print_help() {
                    eprintln!("Error printing help: {e}");
                }
            }
        }
    }
}
