//! End-to-end tests driving the `sfs` binary with the offline hashing provider.

use assert_cmd::Command;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

struct Env {
    home: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            home: tempfile::tempdir().unwrap(),
        }
    }

    fn db(&self) -> std::path::PathBuf {
        self.home.path().join("catalog.db")
    }

    /// `sfs --db <tmp> --provider hashing ...` isolated from the user's config.
    fn sfs(&self) -> Command {
        let mut cmd = Command::cargo_bin("sfs").unwrap();
        cmd.env("HOME", self.home.path())
            .env("SFS_HASH_DIMENSIONS", "128")
            .env_remove("SFS_DB")
            .env_remove("SFS_PROVIDER")
            .env_remove("SFS_METRIC")
            .env_remove("RUST_LOG")
            .arg("--db")
            .arg(self.db())
            .arg("--provider")
            .arg("hashing");
        cmd
    }

    fn json(&self, args: &[&str]) -> Value {
        let output = self.sfs().arg("--json").args(args).output().unwrap();
        assert!(
            output.status.success(),
            "sfs {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    fn ingest(&self, text: &str, meta: &[&str]) -> String {
        let mut args = vec!["ingest", text];
        for m in meta {
            args.push("--meta");
            args.push(m);
        }
        self.json(&args)["id"].as_str().unwrap().to_string()
    }
}

fn write(path: &Path, contents: &str) {
    std::fs::write(path, contents).unwrap();
}

#[test]
fn version_prints() {
    let env = Env::new();
    let out = env.json(&["version"]);
    assert_eq!(out["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn ingest_then_search_ranks_mug_first() {
    let env = Env::new();
    env.ingest("handmade ceramic mug", &["category=kitchen", "price=18.5"]);
    env.ingest("industrial steel pipe", &["category=hardware"]);

    let out = env.json(&["search", "ceramic mug", "-k", "2"]);
    let results = out["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["text"], "handmade ceramic mug");
    assert_eq!(results[0]["metadata"]["price"], 18.5);
    assert!(results[0]["distance"].as_f64().unwrap() <= results[1]["distance"].as_f64().unwrap());
}

#[test]
fn search_filter_and_empty_store() {
    let env = Env::new();
    let out = env.json(&["search", "anything"]);
    assert_eq!(out["count"], 0);

    env.ingest("handmade ceramic mug", &["category=kitchen"]);
    env.ingest("industrial steel pipe", &["category=hardware"]);

    let out = env.json(&["search", "ceramic mug", "--filter", "category=hardware"]);
    let results = out["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["text"], "industrial steel pipe");
}

#[test]
fn get_and_list() {
    let env = Env::new();
    let id = env.ingest("wool beanie", &["in_stock=true"]);
    env.ingest("linen apron", &[]);

    let doc = env.json(&["get", &id]);
    assert_eq!(doc["text"], "wool beanie");
    assert_eq!(doc["metadata"]["in_stock"], true);
    assert!(doc.get("vector").is_none());

    let listed = env.json(&["list", "--limit", "1"]);
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["documents"][0]["id"], id.as_str());

    let status = env.json(&["status"]);
    assert_eq!(status["documents"], 2);
    assert_eq!(status["dimensions"], 128);
    assert_eq!(status["metric"], "euclidean");
}

#[test]
fn missing_document_exits_not_found() {
    let env = Env::new();
    env.ingest("wool beanie", &[]);
    env.sfs().args(["--json", "get", "nope"]).assert().code(3);
}

#[test]
fn invalid_k_is_rejected() {
    let env = Env::new();
    let output = env
        .sfs()
        .args(["--json", "-q", "search", "mug", "-k", "0"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    let err: Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(err["error"]["code"], "INVALID_ARGUMENT");
}

#[test]
fn batch_reports_partial_failure() {
    let env = Env::new();
    let file = env.home.path().join("docs.json");
    write(
        &file,
        r#"[{"text": "valid text", "metadata": {}}, {"text": "", "metadata": {}}]"#,
    );

    let output = env
        .sfs()
        .args(["--json", "ingest", "--file"])
        .arg(&file)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));

    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["total"], 2);
    assert_eq!(report["succeeded"][0]["index"], 0);
    assert_eq!(report["failed"][0]["index"], 1);
    assert_eq!(report["failed"][0]["code"], "INVALID_ARGUMENT");

    let listed = env.json(&["list"]);
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["documents"][0]["text"], "valid text");
}

#[test]
fn batch_from_stdin() {
    let env = Env::new();
    env.sfs()
        .args(["--json", "ingest", "--file", "-"])
        .write_stdin(r#"{"documents": [{"text": "cast iron skillet"}, {"text": "bamboo cutting board"}]}"#)
        .assert()
        .success();

    let status = env.json(&["status"]);
    assert_eq!(status["documents"], 2);
}

#[test]
fn reopening_with_other_dimensions_fails() {
    let env = Env::new();
    env.ingest("wool beanie", &[]);

    env.sfs()
        .env("SFS_HASH_DIMENSIONS", "64")
        .args(["--json", "ingest", "linen apron"])
        .assert()
        .code(7);
}
