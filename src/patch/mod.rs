//! Patched package tree
//!
//! A patch tree holds replacement sources for Elm packages, laid out the same
//! way as the compiler's package cache: `<root>/<author>/<project>/<version>/`.
//! Every version directory carries a `source.txt` recording where the patched
//! code was taken from.

mod discovery;

use std::path::{Path, PathBuf};
use thiserror::Error;

pub use discovery::find_patched_packages;

/// Provenance marker present in every patched package version.
pub const SOURCE_FILE: &str = "source.txt";

#[derive(Debug, Error, PartialEq)]
pub enum PatchTreeError {
    #[error(
        "Found more than one version of {package}!\n\nVersions: {}\n\nIn: {}",
        .versions.join(", "),
        .path.display()
    )]
    MultipleVersions {
        package: String,
        versions: Vec<String>,
        path: PathBuf,
    },

    #[error(
        "Expected version {expected} for {package} in elm.json, but got: {}",
        .found.as_deref().unwrap_or("nothing")
    )]
    VersionMismatch {
        package: String,
        expected: String,
        found: Option<String>,
    },
}

/// One `<author>/<project>/<version>` directory of the patch tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedPackage {
    pub author: String,
    pub project: String,
    pub version: String,
    pub path: PathBuf,
}

impl PatchedPackage {
    /// Package name as written in `elm.json`, e.g. `elm/virtual-dom`.
    pub fn id(&self) -> String {
        format!("{}/{}", self.author, self.project)
    }

    /// Where this package lives inside a packages directory laid out like the patch tree.
    pub fn destination(&self, packages_dir: &Path) -> PathBuf {
        packages_dir
            .join(&self.author)
            .join(&self.project)
            .join(&self.version)
    }

    pub fn source_file(&self) -> PathBuf {
        self.path.join(SOURCE_FILE)
    }
}
