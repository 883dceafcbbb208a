//! `elm.json` dependency manifest.
//!
//! Only application manifests are supported: the file must contain a
//! `dependencies` object with `direct` and `indirect` maps from
//! `author/project` to an exact version string.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::runtime::Runtime;

pub const MANIFEST_FILE: &str = "elm.json";

const DIRECT: &str = "dependencies.direct";
const INDIRECT: &str = "dependencies.indirect";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("elm.json is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("elm.json is not an object.")]
    NotAnObject,

    #[error("{}", describe_fields(.0))]
    MalformedFields(Vec<&'static str>),

    #[error("elm.json \"{section}\" entry for {package} is not a version string.")]
    NonStringVersion {
        section: &'static str,
        package: String,
    },
}

fn describe_fields(fields: &[&str]) -> String {
    match fields {
        [field] => format!("elm.json \"{}\" field is not an object.", field),
        _ => format!(
            "elm.json fields {} are not objects.",
            fields
                .iter()
                .map(|f| format!("\"{}\"", f))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Exact dependency versions of an Elm application.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub direct: BTreeMap<String, String>,
    pub indirect: BTreeMap<String, String>,
}

impl Manifest {
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime
            .read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let manifest = Self::parse(&content).context("Failed to parse elm.json")?;
        log::debug!(
            "Loaded {} direct and {} indirect dependencies from {}",
            manifest.direct.len(),
            manifest.indirect.len(),
            path.display()
        );
        Ok(manifest)
    }

    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let Value::Object(root) = serde_json::from_str::<Value>(content)? else {
            return Err(ManifestError::NotAnObject);
        };

        let Some(Value::Object(dependencies)) = root.get("dependencies") else {
            return Err(ManifestError::MalformedFields(vec!["dependencies"]));
        };

        let direct = dependencies.get("direct").and_then(Value::as_object);
        let indirect = dependencies.get("indirect").and_then(Value::as_object);

        match (direct, indirect) {
            (Some(direct), Some(indirect)) => Ok(Self {
                direct: versions(DIRECT, direct)?,
                indirect: versions(INDIRECT, indirect)?,
            }),
            (direct, indirect) => {
                let mut fields = Vec::new();
                if direct.is_none() {
                    fields.push(DIRECT);
                }
                if indirect.is_none() {
                    fields.push(INDIRECT);
                }
                Err(ManifestError::MalformedFields(fields))
            }
        }
    }

    /// Merge both sections into one map. Indirect entries are applied last,
    /// so they win when a package appears in both.
    pub fn dependencies(&self) -> BTreeMap<String, String> {
        let mut merged = self.direct.clone();
        merged.extend(self.indirect.clone());
        merged
    }
}

fn versions(
    section: &'static str,
    entries: &Map<String, Value>,
) -> Result<BTreeMap<String, String>, ManifestError> {
    entries
        .iter()
        .map(|(package, version)| match version {
            Value::String(version) => Ok((package.clone(), version.clone())),
            _ => Err(ManifestError::NonStringVersion {
                section,
                package: package.clone(),
            }),
        })
        .collect()
}
