use anyhow::{Context, Result};
use log::debug;
use std::path::Path;

use super::{ARTIFACTS_FILE, StaleReason, SyncPlan};
use crate::config::Config;
use crate::manifest::Manifest;
use crate::patch::{PatchTreeError, PatchedPackage, SOURCE_FILE, find_patched_packages};
use crate::runtime::Runtime;

/// Decide whether the package cache has to be patched. Reads only.
#[tracing::instrument(skip(runtime, config))]
pub fn plan<R: Runtime>(runtime: &R, config: &Config) -> Result<SyncPlan> {
    let dependencies = Manifest::load(runtime, &config.manifest_path())?.dependencies();
    let packages = find_patched_packages(runtime, &config.patch_dir)?;
    let packages_dir = config.packages_dir();

    let mut plan = SyncPlan::default();

    for package in &packages {
        let id = package.id();
        let requested = dependencies.get(&id);
        if requested != Some(&package.version) {
            return Err(PatchTreeError::VersionMismatch {
                package: id,
                expected: package.version.clone(),
                found: requested.cloned(),
            }
            .into());
        }

        let destination = package.destination(&packages_dir);
        if !is_patched(runtime, package, &destination)? {
            debug!("{} {} is not patched in {}", id, package.version, destination.display());
            plan.reasons.push(StaleReason::PackageMismatch { package: id });
            plan.stale_artifacts.push(destination.join(ARTIFACTS_FILE));
        }
    }

    // `o.dat` holds the JavaScript of every package. If it was produced before
    // the cache was patched, the compiler keeps using it even though every
    // package above looks up to date.
    if plan.is_up_to_date() {
        let o_dat = config.o_dat_path();
        if runtime.exists(&o_dat) && !contains(&runtime.read(&o_dat)?, config.marker.as_bytes()) {
            debug!("{} does not contain {:?}", o_dat.display(), config.marker);
            plan.reasons.push(StaleReason::LegacyArtifactMissingMarker { path: o_dat });
        }
    }

    plan.packages = packages;
    Ok(plan)
}

/// Compare the cached `source.txt` with the one from the patch, byte for byte.
/// Unreadable text in the cache only means it differs.
fn is_patched<R: Runtime>(runtime: &R, package: &PatchedPackage, destination: &Path) -> Result<bool> {
    let cached = destination.join(SOURCE_FILE);
    if !runtime.exists(&cached) {
        return Ok(false);
    }

    let expected = runtime
        .read(&package.source_file())
        .with_context(|| format!("Patch for {} has no readable {}", package.id(), SOURCE_FILE))?;
    Ok(runtime.read(&cached)? == expected)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}
