use anyhow::Result;
use log::{debug, warn};
use std::path::{Path, PathBuf};

use super::{PatchTreeError, PatchedPackage};
use crate::runtime::Runtime;

/// Find all patched packages by scanning the patch tree
///
/// Directory structure: `<root>/<author>/<project>/<version>/`
///
/// Hidden entries such as `.DS_Store` and plain files are skipped at every
/// level. A project directory with more than one version is an error; one
/// with no version at all is skipped.
#[tracing::instrument(skip(runtime))]
pub fn find_patched_packages<R: Runtime>(runtime: &R, root: &Path) -> Result<Vec<PatchedPackage>> {
    let mut packages = Vec::new();

    for (author, author_path) in visible_dirs(runtime, root)? {
        for (project, project_path) in visible_dirs(runtime, &author_path)? {
            let mut versions = visible_dirs(runtime, &project_path)?;

            match versions.len() {
                0 => {
                    warn!(
                        "No version directory in {}, skipping {}/{}",
                        project_path.display(),
                        author,
                        project
                    );
                }
                1 => {
                    let (version, path) = versions.remove(0);
                    debug!("Found patch for {}/{} {}", author, project, version);
                    packages.push(PatchedPackage {
                        author: author.clone(),
                        project,
                        version,
                        path,
                    });
                }
                _ => {
                    return Err(PatchTreeError::MultipleVersions {
                        package: format!("{}/{}", author, project),
                        versions: versions.into_iter().map(|(name, _)| name).collect(),
                        path: project_path,
                    }
                    .into());
                }
            }
        }
    }

    Ok(packages)
}

/// Non-hidden subdirectories of `dir` as `(name, path)`, sorted by name.
fn visible_dirs<R: Runtime>(runtime: &R, dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut entries: Vec<(String, PathBuf)> = runtime
        .read_dir(dir)?
        .into_iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_string_lossy().into_owned();
            if name.starts_with('.') {
                return None;
            }
            Some((name, path))
        })
        .filter(|(_, path)| runtime.is_dir(path))
        .collect();

    entries.sort();
    Ok(entries)
}
