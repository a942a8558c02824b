// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use pagesync::{
    batch::Importer,
    config::{ConfigFile, Overrides, Settings},
    remote::{
        script::render_teaser,
        ssh::SshExecutor,
        DryRunExecutor, RemoteExecutor,
    },
    teaser::{TeaserInstruction, DEFAULT_TEASER_WORDS},
};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use std::{path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "pagesync [options] <pagesync-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Remote host running the content store.
    #[arg(long, global = true, env = "SSH_HOST", value_name = "host")]
    pub host: Option<String>,

    /// Remote user to log in as.
    #[arg(long, global = true, env = "SSH_USER", value_name = "user")]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let config = ConfigFile::locate(self.config.as_deref())?;
        let mut overrides = Overrides {
            host: self.host,
            user: self.user,
            content_dir: None,
        };

        match self.command {
            Command::Import(opts) => {
                overrides.content_dir = opts.content_dir.clone();
                run_import(Settings::resolve(config, overrides)?, opts)
            }
            Command::Teaser(opts) => run_teaser(Settings::resolve(config, overrides)?, opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Import content files into remote content store.
    #[command(override_usage = "pagesync import [options]")]
    Import(ImportOptions),

    /// Create public preview copy of existing page.
    #[command(override_usage = "pagesync teaser [options] <slug>")]
    Teaser(TeaserOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ImportOptions {
    /// Directory holding content files.
    #[arg(short = 'd', long, value_name = "path")]
    pub content_dir: Option<PathBuf>,

    /// Print runner programs instead of executing them.
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct TeaserOptions {
    /// Slug of page to make teaser from.
    #[arg(required = true, value_name = "slug")]
    pub slug: String,

    /// Number of leading words to keep.
    #[arg(short, long, value_name = "count", default_value_t = DEFAULT_TEASER_WORDS)]
    pub words: usize,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn run_import(settings: Settings, opts: ImportOptions) -> Result<()> {
    let bar = ProgressBar::new(0);
    let report = if opts.dry_run {
        let executor = DryRunExecutor::new(settings.ssh.display_command()?, bar.clone());
        Importer::new(settings.import, executor, bar).run()?
    } else {
        let executor = SshExecutor::new(settings.ssh, bar.clone());
        Importer::new(settings.import, executor, bar).run()?
    };

    if !report.is_success() {
        bail!(
            "{} of {} content file(s) failed to import",
            report.failed.len(),
            report.total()
        );
    }

    Ok(())
}

fn run_teaser(settings: Settings, opts: TeaserOptions) -> Result<()> {
    let teaser = TeaserInstruction::new(opts.slug, opts.words)?;
    let program = render_teaser(&settings.import.encoder, &teaser)?;
    let executor = SshExecutor::new(settings.ssh, ProgressBar::hidden());

    info!("create teaser of {:?}", teaser.slug());
    let result = executor.execute(&program)?;
    if !result.succeeded {
        bail!("{result}");
    }

    Ok(())
}
