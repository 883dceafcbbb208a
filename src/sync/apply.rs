use anyhow::Result;
use log::{debug, info, warn};
use std::path::Path;

use super::SyncPlan;
use crate::config::Config;
use crate::runtime::Runtime;

/// Install the patch tree into the package cache and force a full recompile.
///
/// Files that exist only in the cache are kept; files present in both are
/// overwritten. Not transactional: if this fails halfway, some
/// `artifacts.dat` files may already be gone. The next run sees the cache as
/// stale and tries again.
#[tracing::instrument(skip(runtime, config, plan))]
pub fn apply<R: Runtime>(runtime: &R, config: &Config, plan: &SyncPlan) -> Result<()> {
    for artifact in &plan.stale_artifacts {
        remove_file_if_exists(runtime, artifact)?;
    }

    let packages_dir = config.packages_dir();
    info!(
        "Copying {} into {}",
        config.patch_dir.display(),
        packages_dir.display()
    );
    copy_dir_all(runtime, &config.patch_dir, &packages_dir)?;

    let elm_stuff = config.elm_stuff_dir();
    if runtime.exists(&elm_stuff) {
        info!("Removing {} to force a full recompile", elm_stuff.display());
        runtime.remove_dir_all(&elm_stuff)?;
    }

    Ok(())
}

fn remove_file_if_exists<R: Runtime>(runtime: &R, path: &Path) -> Result<()> {
    if runtime.exists(path) {
        debug!("Removing {}", path.display());
        runtime.remove_file(path)?;
    }
    Ok(())
}

/// Recursively copy `src` into `dst`, creating directories as needed.
/// Symlinks are skipped rather than followed.
fn copy_dir_all<R: Runtime>(runtime: &R, src: &Path, dst: &Path) -> Result<()> {
    runtime.create_dir_all(dst)?;
    for path in runtime.read_dir(src)? {
        let Some(name) = path.file_name() else {
            continue;
        };
        let target = dst.join(name);
        if runtime.is_symlink(&path) {
            warn!("Skipping symlink {} in the patch tree", path.display());
        } else if runtime.is_dir(&path) {
            copy_dir_all(runtime, &path, &target)?;
        } else {
            runtime.copy(&path, &target)?;
        }
    }
    Ok(())
}
