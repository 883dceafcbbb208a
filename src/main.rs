use anyhow::Result;
use clap::Parser;
use elm_patch_sync::config::{Config, DEFAULT_ELM_VERSION, DEFAULT_MARKER, Options};
use elm_patch_sync::runtime::{RealRuntime, Runtime};
use elm_patch_sync::sync::{SyncOutcome, SyncPlan, plan, synchronize};
use log::info;
use std::io::{self, Write};
use std::path::PathBuf;

/// elm-patch-sync - install patched Elm packages into ELM_HOME
///
/// Run this before `elm make`. When the package cache does not hold the
/// patched packages yet, they are copied in and the compiler caches are
/// removed so everything is rebuilt from the patched sources.
///
/// Examples:
///   ELM_HOME=elm-home elm-patch-sync elm-package-patches
#[derive(Parser, Debug)]
#[command(author, version = env!("ELM_PATCH_SYNC_VERSION"), about)]
struct Cli {
    /// Directory of patched packages, laid out as <author>/<project>/<version>/
    #[arg(value_name = "PATCH_DIR")]
    patch_dir: PathBuf,

    /// Elm home directory holding the package cache
    #[arg(long = "elm-home", env = "ELM_HOME", value_name = "PATH")]
    elm_home: Option<PathBuf>,

    /// Directory containing elm.json and elm-stuff/ (defaults to the current directory)
    #[arg(long = "project-root", value_name = "PATH")]
    project_root: Option<PathBuf>,

    /// Elm compiler version, as used in ELM_HOME and elm-stuff/
    #[arg(long = "elm-version", value_name = "VERSION", default_value = DEFAULT_ELM_VERSION)]
    elm_version: String,

    /// Text that elm-stuff/<version>/o.dat contains when compiled with the patches
    #[arg(long, value_name = "TEXT", default_value = DEFAULT_MARKER)]
    marker: String,

    /// Only report what would change
    #[arg(long = "dry-run")]
    dry_run: bool,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            patch_dir: self.patch_dir.clone(),
            elm_home: self.elm_home.clone(),
            project_root: self.project_root.clone(),
            elm_version: self.elm_version.clone(),
            marker: self.marker.clone(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Usage errors exit with 1 rather than clap's default of 2.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            let _ = err.print();
            std::process::exit(1);
        }
        Err(err) => err.exit(),
    };

    run(&RealRuntime, &cli, &mut io::stdout())
}

fn run<R: Runtime, W: Write>(runtime: &R, cli: &Cli, out: &mut W) -> Result<()> {
    if cli.dry_run {
        let config = Config::resolve(runtime, cli.options())?;
        let plan = plan(runtime, &config)?;
        write_plan(out, &config, &plan)?;
        return Ok(());
    }

    let config = Config::new(runtime, cli.options())?;
    match synchronize(runtime, &config)? {
        SyncOutcome::UpToDate => info!("Nothing to do"),
        SyncOutcome::Synced { reasons } => {
            for reason in &reasons {
                writeln!(out, "{}", reason)?;
            }
            writeln!(
                out,
                "Patched Elm packages installed into {}",
                config.packages_dir().display()
            )?;
        }
    }
    Ok(())
}

fn write_plan<W: Write>(out: &mut W, config: &Config, plan: &SyncPlan) -> io::Result<()> {
    if plan.is_up_to_date() {
        return writeln!(
            out,
            "{} patched package(s) are up to date in {}",
            plan.packages.len(),
            config.packages_dir().display()
        );
    }

    writeln!(out, "Package cache is stale:")?;
    for reason in &plan.reasons {
        writeln!(out, "  {}", reason)?;
    }
    writeln!(out, "Would:")?;
    for artifact in &plan.stale_artifacts {
        writeln!(out, "  remove {}", artifact.display())?;
    }
    writeln!(
        out,
        "  copy {} into {}",
        config.patch_dir.display(),
        config.packages_dir().display()
    )?;
    writeln!(out, "  remove {}", config.elm_stuff_dir().display())
}
