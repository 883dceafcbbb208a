use anyhow::{Context, Result, bail};
use log::{debug, info};
use std::path::PathBuf;

use crate::manifest::MANIFEST_FILE;
use crate::runtime::Runtime;

pub const ELM_HOME_ENV: &str = "ELM_HOME";
pub const DEFAULT_ELM_VERSION: &str = "0.19.1";

/// Only present in `o.dat` when it was compiled with the patched
/// `elm/virtual-dom`. Change as needed when patching other packages.
pub const DEFAULT_MARKER: &str = "_VirtualDom_createTNode";

/// Raw invocation inputs, before validation.
#[derive(Debug, Clone)]
pub struct Options {
    pub patch_dir: PathBuf,
    pub elm_home: Option<PathBuf>,
    pub project_root: Option<PathBuf>,
    pub elm_version: String,
    pub marker: String,
}

impl Options {
    pub fn new(patch_dir: impl Into<PathBuf>) -> Self {
        Self {
            patch_dir: patch_dir.into(),
            elm_home: None,
            project_root: None,
            elm_version: DEFAULT_ELM_VERSION.to_string(),
            marker: DEFAULT_MARKER.to_string(),
        }
    }
}

/// Validated locations used by a synchronization run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub patch_dir: PathBuf,
    pub elm_home: PathBuf,
    pub project_root: PathBuf,
    pub elm_version: String,
    pub marker: String,
}

impl Config {
    /// Validate the options and create `ELM_HOME` if it does not exist yet.
    #[tracing::instrument(skip(runtime))]
    pub fn new<R: Runtime>(runtime: &R, options: Options) -> Result<Self> {
        let config = Self::resolve(runtime, options)?;

        if !runtime.exists(&config.elm_home) {
            info!("Creating Elm home directory {}", config.elm_home.display());
            runtime.create_dir_all(&config.elm_home)?;
        }

        Ok(config)
    }

    /// Validate the options without touching the file system.
    #[tracing::instrument(skip(runtime))]
    pub fn resolve<R: Runtime>(runtime: &R, options: Options) -> Result<Self> {
        if !runtime.is_dir(&options.patch_dir) {
            bail!(
                "Elm package patches directory \"{}\" does not exist.",
                options.patch_dir.display()
            );
        }

        let elm_home = match options.elm_home.filter(|p| !p.as_os_str().is_empty()) {
            Some(path) => path,
            None => match runtime.env_var(ELM_HOME_ENV) {
                Ok(value) if !value.is_empty() => PathBuf::from(value),
                _ => bail!(
                    "{} environment variable is not set. It must point to the Elm home directory you want to patch.",
                    ELM_HOME_ENV
                ),
            },
        };

        let project_root = match options.project_root {
            Some(path) => path,
            None => runtime
                .current_dir()
                .context("Could not determine the project root")?,
        };

        debug!(
            "Patching {} from {} for project {}",
            elm_home.display(),
            options.patch_dir.display(),
            project_root.display()
        );

        Ok(Self {
            patch_dir: options.patch_dir,
            elm_home,
            project_root,
            elm_version: options.elm_version,
            marker: options.marker,
        })
    }

    /// `<ELM_HOME>/<version>/packages`, the compiler's package cache.
    pub fn packages_dir(&self) -> PathBuf {
        self.elm_home.join(&self.elm_version).join("packages")
    }

    /// The parts of `elm-stuff/` the compiler reads. elm-test and elm-review
    /// data live elsewhere and are left alone.
    pub fn elm_stuff_dir(&self) -> PathBuf {
        self.project_root.join("elm-stuff").join(&self.elm_version)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.project_root.join(MANIFEST_FILE)
    }

    pub fn o_dat_path(&self) -> PathBuf {
        self.elm_stuff_dir().join("o.dat")
    }
}
