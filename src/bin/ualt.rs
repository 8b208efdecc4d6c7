// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use ualt::{
    path::{default_config_file, default_overlay_dir},
    Alternatives, Config, Importer, OverlayRoot, SearchPaths, UpdateAlternatives,
};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::{
    env,
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::exit,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = concat!(
        "\n  ualt [options] <ualt-command>",
        "\n  ualt [options] <update-alternatives-arguments>...",
    ),
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Base directory of overlay to operate on.
    #[arg(short, long, global = true, env = "UALT_ROOT", value_name = "path")]
    pub root: Option<PathBuf>,

    /// Path to configuration file.
    #[arg(short = 'f', long, global = true, value_name = "path")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let ctx = Context::new(self.root, self.config_file)?;
        match self.command {
            Command::Import(opts) => run_import(&ctx, opts),
            Command::Query(opts) => run_query(&ctx, opts),
            Command::Display(opts) => ctx.forward(["--display", opts.name.as_str()]),
            Command::List(opts) => ctx.forward(["--list", opts.name.as_str()]),
            Command::Config(opts) => {
                ctx.ensure_group(&opts.name)?;
                ctx.forward(["--config", opts.name.as_str()])
            }
            Command::Auto(opts) => {
                ctx.ensure_group(&opts.name)?;
                ctx.forward(["--auto", opts.name.as_str()])
            }
            Command::Set(opts) => {
                ctx.ensure_group(&opts.name)?;
                ctx.forward(["--set", opts.name.as_str(), opts.path.as_str()])
            }
            Command::Remove(opts) => {
                ctx.forward(["--remove", opts.name.as_str(), opts.path.as_str()])
            }
            Command::Env(opts) => run_env(&ctx, opts),
            Command::Exec(args) => ctx.forward(args),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Copy alternatives groups into overlay.
    #[command(override_usage = "ualt import [options] <name>...")]
    Import(ImportOptions),

    /// Show parsed query report of group in overlay.
    #[command(override_usage = "ualt query [options] <name>")]
    Query(NameOptions),

    /// Show group in overlay.
    #[command(override_usage = "ualt display [options] <name>")]
    Display(NameOptions),

    /// List candidates of group in overlay.
    #[command(override_usage = "ualt list [options] <name>")]
    List(NameOptions),

    /// Pick candidate of group interactively.
    #[command(override_usage = "ualt config [options] <name>")]
    Config(NameOptions),

    /// Return group to automatic selection.
    #[command(override_usage = "ualt auto [options] <name>")]
    Auto(NameOptions),

    /// Pin group to candidate.
    #[command(override_usage = "ualt set [options] <name> <path>")]
    Set(PathOptions),

    /// Remove candidate from group.
    #[command(override_usage = "ualt remove [options] <name> <path>")]
    Remove(PathOptions),

    /// Print shell commands that activate overlay.
    #[command(override_usage = "ualt env [options]")]
    Env(EnvOptions),

    /// Run alternatives executable directly on overlay.
    #[command(external_subcommand)]
    Exec(Vec<OsString>),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ImportOptions {
    /// Names of groups to import.
    #[arg(required = true, value_name = "name")]
    pub names: Vec<String>,

    /// Only print operations that would be applied.
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct NameOptions {
    /// Name of group.
    #[arg(required = true, value_name = "name")]
    pub name: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct PathOptions {
    /// Name of group.
    #[arg(required = true, value_name = "name")]
    pub name: String,

    /// Path of candidate.
    #[arg(required = true, value_name = "path")]
    pub path: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct EnvOptions {
    /// Create fresh temporary overlay for current shell.
    #[arg(short, long)]
    pub temp: bool,
}

/// Everything resolved from flags, environment, and configuration.
struct Context {
    overlay: OverlayRoot,
    persistent: OverlayRoot,
    system: OverlayRoot,
    alternatives: UpdateAlternatives,
}

impl Context {
    fn new(root: Option<PathBuf>, config_file: Option<PathBuf>) -> Result<Self> {
        let config_file = match config_file {
            Some(path) => path,
            None => default_config_file()?,
        };
        let config = Config::load(&config_file)?;

        let persistent = match config.settings.overlay {
            Some(path) => path,
            None => default_overlay_dir()?,
        };
        let overlay = root.unwrap_or_else(|| persistent.clone());

        Ok(Self {
            overlay: OverlayRoot::user(overlay),
            persistent: OverlayRoot::user(persistent),
            system: OverlayRoot::system(config.system.altdir, config.system.admindir),
            alternatives: UpdateAlternatives::new(config.settings.program),
        })
    }

    /// Roots to import groups from, in order of preference.
    fn sources(&self) -> Vec<OverlayRoot> {
        if self.overlay == self.persistent {
            vec![self.system.clone()]
        } else {
            vec![self.persistent.clone(), self.system.clone()]
        }
    }

    fn importer(&self) -> Importer<'_, UpdateAlternatives> {
        Importer::new(&self.alternatives, SearchPaths::from_env())
    }

    /// Import group unless overlay already knows it.
    fn ensure_group(&self, name: &str) -> Result<()> {
        let known = self
            .alternatives
            .query(&self.overlay, name)
            .map(|report| !report.trim().is_empty())
            .unwrap_or(false);

        if !known {
            info!("{name:?} not in overlay yet, importing it");
            self.importer().import(name, &self.overlay, &self.sources())?;
        }

        Ok(())
    }

    fn forward(&self, args: impl IntoIterator<Item = impl Into<OsString>>) -> Result<()> {
        self.overlay.ensure()?;
        self.alternatives.call_interactive(&self.overlay, args)?;
        Ok(())
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
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

fn run_import(ctx: &Context, opts: ImportOptions) -> Result<()> {
    let importer = ctx.importer();
    let sources = ctx.sources();
    for name in opts.names {
        if opts.dry_run {
            let plan = importer.plan(&name, &ctx.overlay, &sources)?;
            println!("# {} from {}", plan.report.name(), plan.source);
            for operation in &plan.operations {
                println!("{operation}");
            }
        } else {
            importer
                .import(&name, &ctx.overlay, &sources)
                .with_context(|| format!("failed to import {name:?}"))?;
        }
    }

    Ok(())
}

fn run_query(ctx: &Context, opts: NameOptions) -> Result<()> {
    let report = ctx.alternatives.query(&ctx.overlay, &opts.name)?;
    let report: ualt::GroupReport = report.parse()?;
    print!("{report}");

    Ok(())
}

fn run_env(ctx: &Context, opts: EnvOptions) -> Result<()> {
    let overlay = if opts.temp {
        let dir = tempfile::Builder::new().prefix("ualt-").tempdir()?.keep();
        OverlayRoot::user(dir)
    } else {
        ctx.overlay.clone()
    };
    overlay.ensure()?;

    println!("export UALT_ROOT={}", quote(overlay.base()));
    println!("export PATH={}:\"$PATH\"", quote(overlay.bin_dir()));
    match env::var_os("MANPATH").filter(|value| !value.is_empty()) {
        Some(_) => println!("export MANPATH={}:\"$MANPATH\"", quote(overlay.man_dir())),
        // INVARIANT: Trailing colon keeps man's default search path.
        None => println!("export MANPATH={}:", quote(overlay.man_dir())),
    }

    Ok(())
}

fn quote(path: impl AsRef<Path>) -> String {
    let raw = path.as_ref().as_os_str();
    format!("'{}'", OsStr::to_string_lossy(raw).replace('\'', r"'\''"))
}
