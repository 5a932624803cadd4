use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Isolated config, data, and store directories for one test
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let sandbox = Self {
            dir: TempDir::new().unwrap(),
        };
        sandbox.write("mythologies", "greek", r#"{"name":"Greek"}"#);
        sandbox.write("mythologies", "norse", r#"{"name":"Norse"}"#);
        sandbox.write(
            "deities",
            "zeus",
            r#"{"name":"Zeus","mythology":"greek","domain":"sky"}"#,
        );
        sandbox.write("deities", "odin", r#"{"name":"Odin","mythology":"norse"}"#);
        sandbox.write("deities", "thor", r#"{"name":"Thor","mythology":"norse"}"#);
        sandbox
    }

    fn store(&self) -> std::path::PathBuf {
        self.dir.path().join("store")
    }

    fn write(&self, collection: &str, id: &str, body: &str) {
        let dir = self.store().join(collection);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{id}.json")), body).unwrap();
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("mythos").unwrap();
        cmd.env("XDG_CONFIG_HOME", self.root().join("config"))
            .env("XDG_DATA_HOME", self.root().join("data"))
            .env("HOME", self.root())
            .env("MYTHOS_STORE__ROOT", self.store())
            .env_remove("MYTHOS_AUTH__USER")
            .env_remove("RUST_LOG");
        cmd
    }
}

#[test]
fn test_version() {
    let mut cmd = Command::cargo_bin("mythos").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_get_document_as_json() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["get", "deities", "zeus", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""name": "Zeus""#))
        .stdout(predicate::str::contains(r#""id": "zeus""#));
}

#[test]
fn test_get_missing_document_fails() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["get", "deities", "loki"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_second_process_hits_session_tier() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["--stats", "get", "deities", "zeus"])
        .assert()
        .success()
        .stderr(predicate::str::contains(r#""misses":1"#));

    sandbox
        .cmd()
        .args(["--stats", "get", "deities", "zeus"])
        .assert()
        .success()
        .stderr(predicate::str::contains(r#""sessionHits":1"#));
}

#[test]
fn test_other_session_falls_back_to_durable_tier() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["get", "deities", "zeus"])
        .assert()
        .success();

    sandbox
        .cmd()
        .args(["--session", "other", "--stats", "get", "deities", "zeus"])
        .assert()
        .success()
        .stderr(predicate::str::contains(r#""durableHits":1"#));
}

#[test]
fn test_list_with_filter() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["list", "deities", "-f", "mythology=norse", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Odin"))
        .stdout(predicate::str::contains("Thor"))
        .stdout(predicate::str::contains("Zeus").not());
}

#[test]
fn test_browse_renders_markup() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["browse", "#/mythology/norse/deities", "#/nowhere"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<h2>Odin</h2>"))
        .stdout(predicate::str::contains("<h2>Thor</h2>"))
        .stdout(predicate::str::contains("view-404"));
}

#[test]
fn test_browse_reads_paths_from_stdin() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("browse")
        .write_stdin("/mythology/greek/deities/zeus\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("<h1>Zeus</h1>"))
        .stdout(predicate::str::contains("<dt>DOMAIN</dt><dd>sky</dd>"));
}

#[test]
fn test_config_set_then_get() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["config", "set", "router.max_history", "10"])
        .assert()
        .success();

    sandbox
        .cmd()
        .args(["config", "get", "router.max_history"])
        .assert()
        .success()
        .stdout(predicate::str::diff("10\n"));
}

#[test]
fn test_config_set_rejects_zero_ttl() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["config", "set", "cache.default_ttl_ms", "0"])
        .assert()
        .failure();
}

#[test]
fn test_browse_warms_foundational_collections() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["browse", "#/nowhere"])
        .assert()
        .success();

    sandbox
        .cmd()
        .args(["--stats", "list", "mythologies"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Greek"))
        .stderr(predicate::str::contains(r#""sessionHits":1"#));
}

#[test]
fn test_session_name_cannot_leave_sessions_dir() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["--session", "../escape", "get", "deities", "zeus"])
        .assert()
        .failure();

    assert!(!sandbox.root().join("data/mythos/escape.json").exists());
}
