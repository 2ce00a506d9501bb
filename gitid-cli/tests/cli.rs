//! End-to-end tests for the gitid binary
//!
//! Each test points the binary at its own temporary home directory through
//! the environment, so nothing touches the real global config.

use assert_cmd::Command;
use gitid_core::editor::SECTION_START;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct Sandbox {
    home: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            home: TempDir::new().unwrap(),
        }
    }

    fn gitid(&self) -> Command {
        let mut cmd = Command::cargo_bin("gitid").unwrap();
        cmd.env("GITID_HOME", self.home.path())
            .env("HOME", self.home.path())
            .env("XDG_CONFIG_HOME", self.home.path().join(".config"))
            .env("NO_COLOR", "1")
            .env_remove("GITID_LOG")
            .env_remove("GITID_GLOBAL_CONFIG")
            .env_remove("GITID_IDENTITY_DIR")
            .env_remove("GITID_LOG_LEVEL")
            .env_remove("GITID_LOG_JSON");
        cmd
    }

    fn global_config(&self) -> PathBuf {
        self.home.path().join(".gitconfig")
    }

    fn global(&self) -> String {
        fs::read_to_string(self.global_config()).unwrap_or_default()
    }

    fn add(&self, name: &str, path: &str) {
        self.gitid()
            .args(["add", name, "--name", "John Doe", "--email", "john@co.com"])
            .args(["--path", path])
            .assert()
            .success();
    }
}

#[test]
fn test_add_then_list() {
    let sandbox = Sandbox::new();

    sandbox
        .gitid()
        .args(["add", "work", "--name", "John Doe", "--email", "john@co.com"])
        .args(["--path", "~/work"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added identity 'work'"));

    let global = sandbox.global();
    assert!(global.contains(SECTION_START));
    assert!(global.contains(&format!(
        "[includeIf \"gitdir:{}/work/\"]",
        sandbox.home.path().display()
    )));
    assert!(sandbox.home.path().join(".gitconfig-gitid-work").exists());

    sandbox
        .gitid()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("work"))
        .stdout(predicate::str::contains("john@co.com"));
}

#[test]
fn test_list_json() {
    let sandbox = Sandbox::new();
    sandbox.add("oss", "/src/oss");
    sandbox.add("work", "/src/work");

    let output = sandbox.gitid().args(["list", "--json"]).output().unwrap();
    assert!(output.status.success());

    let identities: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = identities
        .as_array()
        .unwrap()
        .iter()
        .map(|identity| identity["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["oss", "work"]);
    assert_eq!(identities[1]["paths"][0], "/src/work");
}

#[test]
fn test_list_empty() {
    Sandbox::new()
        .gitid()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No identities configured"));
}

#[test]
fn test_duplicate_add_fails() {
    let sandbox = Sandbox::new();
    sandbox.add("work", "/src/work");
    let before = sandbox.global();

    sandbox
        .gitid()
        .args(["add", "work", "--name", "Jane Roe", "--email", "jane@co.com"])
        .args(["--path", "/src/other"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(sandbox.global(), before);
}

#[test]
fn test_show_and_remove() {
    let sandbox = Sandbox::new();
    sandbox.add("work", "/src/work");

    sandbox
        .gitid()
        .args(["show", "work"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/src/work"));

    sandbox
        .gitid()
        .args(["remove", "work"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed identity 'work'"));

    assert_eq!(sandbox.global(), "");
    assert!(!sandbox.home.path().join(".gitconfig-gitid-work").exists());

    sandbox
        .gitid()
        .args(["show", "work"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_remove_unknown_fails() {
    Sandbox::new()
        .gitid()
        .args(["remove", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_path_matching() {
    let sandbox = Sandbox::new();
    sandbox.add("work", "/src/work");

    sandbox
        .gitid()
        .args(["test", "/src/work/api"])
        .assert()
        .success()
        .stdout(predicate::str::contains("john@co.com"))
        .stdout(predicate::str::contains("via /src/work"));

    sandbox
        .gitid()
        .args(["test", "/src/workshop"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No identity applies here"));
}

#[test]
fn test_status_in_covered_directory() {
    let sandbox = Sandbox::new();
    let project = sandbox.home.path().join("work").join("api");
    fs::create_dir_all(&project).unwrap();
    let project = project.canonicalize().unwrap();
    let covered = project.parent().unwrap().to_string_lossy().into_owned();
    sandbox.add("work", &covered);

    sandbox
        .gitid()
        .current_dir(&project)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("John Doe <john@co.com>"));
}

#[test]
fn test_malformed_section_blocks_changes_only() {
    let sandbox = Sandbox::new();
    let original = format!("[core]\n\tautocrlf = input\n{}\n", SECTION_START);
    fs::write(sandbox.global_config(), &original).unwrap();

    sandbox
        .gitid()
        .arg("list")
        .assert()
        .success()
        .stderr(predicate::str::contains("could not be loaded"));

    sandbox
        .gitid()
        .args(["add", "work", "--name", "John Doe", "--email", "john@co.com"])
        .args(["--path", "/src/work"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("refusing to modify"));

    assert_eq!(sandbox.global(), original);
}

#[test]
fn test_init_saves_settings() {
    let sandbox = Sandbox::new();
    let settings = sandbox.home.path().join("settings").join("gitid.toml");

    sandbox
        .gitid()
        .args(["init", "--save-config", "--config"])
        .arg(&settings)
        .assert()
        .failure();

    sandbox
        .gitid()
        .args(["init", "--save-config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Global config:"))
        .stdout(predicate::str::contains("gitid is ready"));

    let saved = sandbox
        .home
        .path()
        .join(".config")
        .join("gitid")
        .join("config.toml");
    let text = fs::read_to_string(saved).unwrap();
    assert!(text.contains("[paths]"));
    assert!(text.contains("global_config"));
}

#[test]
fn test_invalid_identity_name_rejected() {
    let sandbox = Sandbox::new();
    sandbox
        .gitid()
        .args(["add", "my work", "--name", "John Doe", "--email", "john@co.com"])
        .args(["--path", "/src/work"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("whitespace"));
    assert!(!sandbox.global_config().exists());
}
