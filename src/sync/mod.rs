//! Synchronization of patched packages into the Elm package cache.
//!
//! A run is split in two phases. [`plan`] reads the manifest, the patch tree,
//! the package cache and `elm-stuff/` without changing anything and decides
//! whether the cache is stale. [`apply`] then performs every mutation:
//! removing compiled package artifacts, copying the patch tree over the cache
//! and removing `elm-stuff/<version>/` so the compiler rebuilds everything.
//!
//! There is no locking. Two runs against the same `ELM_HOME` at once are not
//! safe.

mod apply;
mod plan;

use anyhow::Result;
use log::info;
use std::fmt;
use std::path::PathBuf;

pub use apply::apply;
pub use plan::plan;

use crate::config::Config;
use crate::patch::PatchedPackage;
use crate::runtime::Runtime;

/// Compiled-artifact cache the compiler keeps next to each package version.
pub const ARTIFACTS_FILE: &str = "artifacts.dat";

/// Why the package cache has to be patched again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// The cached `source.txt` is missing or differs from the patch.
    PackageMismatch { package: String },
    /// `o.dat` exists but was not compiled from the patched sources.
    LegacyArtifactMissingMarker { path: PathBuf },
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::PackageMismatch { package } => {
                write!(f, "{} is not patched in the package cache", package)
            }
            StaleReason::LegacyArtifactMissingMarker { path } => {
                write!(f, "{} was compiled without the patches", path.display())
            }
        }
    }
}

/// Outcome of the read-only planning phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    pub packages: Vec<PatchedPackage>,
    pub reasons: Vec<StaleReason>,
    /// Per-package `artifacts.dat` files to remove before copying.
    pub stale_artifacts: Vec<PathBuf>,
}

impl SyncPlan {
    pub fn is_up_to_date(&self) -> bool {
        self.reasons.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    UpToDate,
    Synced { reasons: Vec<StaleReason> },
}

/// Make sure the package cache holds the patched packages.
///
/// Fails before mutating anything if the manifest or the patch tree is
/// inconsistent. Running it again right after a successful run is a no-op.
#[tracing::instrument(skip(runtime, config))]
pub fn synchronize<R: Runtime>(runtime: &R, config: &Config) -> Result<SyncOutcome> {
    let plan = plan(runtime, config)?;

    if plan.is_up_to_date() {
        info!(
            "{} patched package(s) already up to date in {}",
            plan.packages.len(),
            config.packages_dir().display()
        );
        return Ok(SyncOutcome::UpToDate);
    }

    for reason in &plan.reasons {
        info!("Stale: {}", reason);
    }

    apply(runtime, config, &plan)?;

    Ok(SyncOutcome::Synced {
        reasons: plan.reasons,
    })
}
