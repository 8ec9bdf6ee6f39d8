//! CLI for the fwgrab firmware fetcher.

mod commands;
mod progress_bar;
mod prompt;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fwgrab_core::config::{self, FwgrabConfig, HtmlSource, RunConfig};
use std::io;
use std::path::PathBuf;

use commands::{run_checksum, run_download, run_list};

/// Top-level CLI for fwgrab.
#[derive(Debug, Parser)]
#[command(name = "fwgrab")]
#[command(
    about = "fwgrab: download firmware files listed in an HTML catalog page",
    long_about = None
)]
pub struct Cli {
    /// Defaults to `download`, prompting for anything not given.
    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

/// Where the catalog comes from and where files go. Missing values are prompted for.
#[derive(Debug, Default, Args)]
pub struct SourceArgs {
    /// Saved catalog HTML file.
    #[arg(long, value_name = "PATH", conflicts_with = "url")]
    pub html: Option<PathBuf>,

    /// Catalog page URL.
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Root directory for `<section>/<version>/<file>`.
    #[arg(long, value_name = "DIR")]
    pub dest: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download every firmware file in the catalog and write `.md5` records.
    Download {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Parse the catalog and print where each file would be saved.
    List {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print the MD5 of a file in md5sum format.
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },
}

/// How a command finished when it did not hit a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// Some entries failed; the rest were processed.
    PartialFailure,
}

impl SourceArgs {
    fn html_source(&self) -> Result<HtmlSource> {
        if let Some(path) = &self.html {
            return Ok(HtmlSource::LocalFile(path.clone()));
        }
        if let Some(url) = &self.url {
            return Ok(HtmlSource::RemoteUrl(url.clone()));
        }
        prompt::prompt_source(&mut io::stdin().lock(), &mut io::stdout())
    }

    /// Builds the run inputs, prompting on the terminal for what is missing.
    fn into_run_config(self, prompt_for_dest: bool) -> Result<RunConfig> {
        let source = self.html_source()?;
        let cwd = std::env::current_dir().context("current directory")?;
        let destination_root = match self.dest {
            Some(dir) => dir,
            None if prompt_for_dest => {
                prompt::prompt_destination(&mut io::stdin().lock(), &mut io::stdout(), &cwd)?
            }
            None => cwd,
        };
        Ok(RunConfig {
            source,
            destination_root,
        })
    }
}

impl CliCommand {
    pub fn run_from_args() -> Result<RunStatus> {
        let cli = Cli::parse();
        cli.command
            .unwrap_or(CliCommand::Download {
                source: SourceArgs::default(),
            })
            .run()
    }

    /// Runs the command. Only `download` and `list` read `config.toml`.
    pub fn run(self) -> Result<RunStatus> {
        match self {
            CliCommand::Download { source } => {
                let cfg = load_config()?;
                let run = source.into_run_config(true)?;
                run_download(&cfg, &run)
            }
            CliCommand::List { source } => {
                let cfg = load_config()?;
                let run = source.into_run_config(false)?;
                run_list(&cfg, &run)
            }
            CliCommand::Checksum { path } => run_checksum(&path),
        }
    }
}

fn load_config() -> Result<FwgrabConfig> {
    let cfg = config::load_or_init()?;
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

#[cfg(test)]
mod tests;
