use assert_cmd::Command;
use assert_cmd::cargo;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

const SOURCE: &str = "https://github.com/lydell/virtual-dom/commit/5f0b4f1\n";
const KERNEL: &str = "var _VirtualDom_createTNode = function(text) { return text; };\n";

struct Project {
    dir: TempDir,
}

impl Project {
    /// A project depending on elm/virtual-dom `manifest_version`, with a patch
    /// tree holding elm/virtual-dom 1.0.3.
    fn new(manifest_version: &str) -> Self {
        let project = Project { dir: tempdir().unwrap() };

        project.write("patches/.DS_Store", "");
        project.write("patches/elm/virtual-dom/1.0.3/source.txt", SOURCE);
        project.write(
            "patches/elm/virtual-dom/1.0.3/src/Elm/Kernel/VirtualDom.js",
            KERNEL,
        );
        project.write(
            "app/elm.json",
            &format!(
                r#"{{
                    "type": "application",
                    "source-directories": ["src"],
                    "elm-version": "0.19.1",
                    "dependencies": {{
                        "direct": {{ "elm/browser": "1.0.2", "elm/core": "1.0.5" }},
                        "indirect": {{ "elm/virtual-dom": "{}" }}
                    }},
                    "test-dependencies": {{ "direct": {{}}, "indirect": {{}} }}
                }}"#,
                manifest_version
            ),
        );

        project
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    fn write(&self, relative: &str, contents: &str) {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn cached(&self, relative: &str) -> PathBuf {
        self.path("elm-home/0.19.1/packages").join(relative)
    }

    /// `elm-patch-sync ../patches`, run from the app directory.
    fn command(&self) -> Command {
        let mut cmd = Command::new(cargo::cargo_bin!("elm-patch-sync"));
        cmd.current_dir(self.path("app"))
            .env("ELM_HOME", self.path("elm-home"))
            .arg(self.path("patches"));
        cmd
    }
}

#[test]
fn test_no_arguments_is_a_usage_error() {
    let dir = tempdir().unwrap();

    Command::new(cargo::cargo_bin!("elm-patch-sync"))
        .current_dir(dir.path())
        .env("ELM_HOME", dir.path().join("elm-home"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));

    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_two_arguments_is_a_usage_error() {
    let dir = tempdir().unwrap();

    Command::new(cargo::cargo_bin!("elm-patch-sync"))
        .current_dir(dir.path())
        .env("ELM_HOME", dir.path().join("elm-home"))
        .arg("patches")
        .arg("more-patches")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));

    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_missing_patch_dir() {
    let project = Project::new("1.0.3");

    Command::new(cargo::cargo_bin!("elm-patch-sync"))
        .current_dir(project.path("app"))
        .env("ELM_HOME", project.path("elm-home"))
        .arg(project.path("no-such-patches"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));

    assert!(!project.path("elm-home").exists());
}

#[test]
fn test_missing_elm_home() {
    let project = Project::new("1.0.3");

    project
        .command()
        .env_remove("ELM_HOME")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "ELM_HOME environment variable is not set",
        ));
}

#[test]
fn test_sync_then_no_op() {
    let project = Project::new("1.0.3");
    project.write("app/elm-stuff/0.19.1/o.dat", "compiled without patches");
    project.write("app/elm-stuff/generated-code/elm-review/cache", "keep");

    project
        .command()
        .assert()
        .success()
        .stdout(predicate::str::contains("elm/virtual-dom is not patched"));

    assert_eq!(
        fs::read_to_string(project.cached("elm/virtual-dom/1.0.3/source.txt")).unwrap(),
        SOURCE
    );
    assert_eq!(
        fs::read_to_string(project.cached("elm/virtual-dom/1.0.3/src/Elm/Kernel/VirtualDom.js"))
            .unwrap(),
        KERNEL
    );
    assert!(!project.path("app/elm-stuff/0.19.1").exists());
    assert!(project.path("app/elm-stuff/generated-code/elm-review/cache").exists());

    // Simulate `elm make` with the patched packages.
    project.write("app/elm-stuff/0.19.1/o.dat", KERNEL);
    project.write("elm-home/0.19.1/packages/elm/virtual-dom/1.0.3/artifacts.dat", "bin");

    project
        .command()
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert!(project.path("app/elm-stuff/0.19.1/o.dat").exists());
    assert!(project.cached("elm/virtual-dom/1.0.3/artifacts.dat").exists());
}

#[test]
fn test_legacy_o_dat_forces_resync() {
    let project = Project::new("1.0.3");
    project.command().assert().success();

    project.write("app/elm-stuff/0.19.1/o.dat", "compiled before patching");

    project
        .command()
        .assert()
        .success()
        .stdout(predicate::str::contains("was compiled without the patches"));

    assert!(!project.path("app/elm-stuff/0.19.1").exists());
}

#[test]
fn test_dry_run_changes_nothing() {
    let project = Project::new("1.0.3");
    project.write("app/elm-stuff/0.19.1/o.dat", "compiled without patches");

    project
        .command()
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Package cache is stale"))
        .stdout(predicate::str::contains("elm/virtual-dom"));

    assert!(!project.path("elm-home").exists());
    assert!(project.path("app/elm-stuff/0.19.1/o.dat").exists());
}

#[test]
fn test_version_mismatch() {
    let project = Project::new("1.0.2");

    project
        .command()
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Expected version 1.0.3 for elm/virtual-dom in elm.json, but got: 1.0.2",
        ));

    assert!(!project.path("elm-home/0.19.1/packages").exists());
}

#[test]
fn test_multiple_versions() {
    let project = Project::new("1.0.3");
    project.write("patches/elm/virtual-dom/1.0.2/source.txt", SOURCE);

    project
        .command()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Versions: 1.0.2, 1.0.3"));

    assert!(!project.path("elm-home/0.19.1/packages").exists());
}

#[test]
fn test_malformed_manifest() {
    let project = Project::new("1.0.3");
    project.write(
        "app/elm.json",
        r#"{"type": "application", "dependencies": {"direct": {}}}"#,
    );

    project
        .command()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse elm.json"))
        .stderr(predicate::str::contains(
            r#"elm.json "dependencies.indirect" field is not an object."#,
        ));
}

#[test]
fn test_explicit_project_root() {
    let project = Project::new("1.0.3");

    Command::new(cargo::cargo_bin!("elm-patch-sync"))
        .current_dir(project.root())
        .env_remove("ELM_HOME")
        .arg("--elm-home")
        .arg(project.path("cache/elm"))
        .arg("--project-root")
        .arg(project.path("app"))
        .arg(project.path("patches"))
        .assert()
        .success();

    assert!(
        project
            .path("cache/elm/0.19.1/packages/elm/virtual-dom/1.0.3/source.txt")
            .exists()
    );
}
