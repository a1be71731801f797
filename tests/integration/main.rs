//! Integration tests for apigraph
//!
//! These tests drive documents through loading, snapshotting and comparison,
//! both through the library crates and the `apigraph` binary.

use apigraph_compat::{CompatibilityChecker, IssueKind};
use apigraph_core::test_utils::sample_codebase;
use apigraph_core::{ApiSurfaces, CodebaseDocument, RunConfig};
use apigraph_snapshot::SnapshotEngine;
use apigraph_visit::{AcceptAll, ApiTraversal, BaseTraversal, EmitFilter, ItemFilterExt, NotHiddenFilter};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn apigraph(args: &[&str], dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_apigraph"))
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to execute apigraph")
}

fn sample_document(surfaces: &ApiSurfaces) -> CodebaseDocument {
    CodebaseDocument::from_codebase(&sample_codebase(surfaces))
}

fn without_class(mut document: CodebaseDocument, qualified_name: &str) -> CodebaseDocument {
    for package in &mut document.packages {
        package.classes.retain(|class| class.qualified_name != qualified_name);
    }
    document
}

fn write_document(dir: &TempDir, name: &str, document: &CodebaseDocument) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, document.to_json().unwrap()).unwrap();
    path
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_invocation() {
    let dir = TempDir::new().unwrap();
    let output = apigraph(&["--help"], dir.path());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("API surface snapshots and compatibility checks"));
    assert!(stdout.contains("snapshot"));
    assert!(stdout.contains("compare"));
}

/// Test that a snapshot written to disk loads back as the same API
#[test]
fn test_snapshot_survives_the_document_format() {
    let surfaces = ApiSurfaces::create(false);
    let dir = TempDir::new().unwrap();
    let path = write_document(&dir, "api.json", &sample_document(&surfaces));

    let text = fs::read_to_string(&path).unwrap();
    let source = CodebaseDocument::from_json(&text).unwrap().into_codebase(&surfaces).unwrap();
    let definition = ApiTraversal::new(EmitFilter.and(NotHiddenFilter), AcceptAll);
    let reference = BaseTraversal::default();
    let snapshot = SnapshotEngine::new(&definition, &reference).take(&source).unwrap();
    assert!(snapshot.is_pre_filtered());
    assert!(snapshot.find_class("test.pkg.internal.Helper").is_none());

    let written = write_document(&dir, "snapshot.json", &CodebaseDocument::from_codebase(&snapshot));
    let reloaded = CodebaseDocument::from_json(&fs::read_to_string(&written).unwrap())
        .unwrap()
        .into_codebase(&surfaces)
        .unwrap();
    assert!(reloaded.is_pre_filtered());
    assert_eq!(reloaded.class_count(), snapshot.class_count());

    let report = CompatibilityChecker::check(&source, &reloaded).unwrap();
    assert!(report.is_compatible(), "{}", report.render());
}

/// Test that removing a class is caught when checking two documents
#[test]
fn test_removed_class_breaks_compatibility() {
    let surfaces = ApiSurfaces::create(false);
    let old = sample_codebase(&surfaces);
    let new = without_class(sample_document(&surfaces), "test.pkg.Widget")
        .into_codebase(&surfaces)
        .unwrap();

    let report = CompatibilityChecker::check(&old, &new).unwrap();
    let removed: Vec<&str> = report
        .issues_of(IssueKind::RemovedClass)
        .map(|issue| issue.item.as_str())
        .collect();
    assert_eq!(removed, vec!["test.pkg.Widget"]);
    assert!(report.has_errors());
}

/// Test the snapshot command end to end
#[test]
fn test_cli_snapshot() {
    let dir = TempDir::new().unwrap();
    let surfaces = ApiSurfaces::create(false);
    let input = write_document(&dir, "api.json", &sample_document(&surfaces));
    let output = dir.path().join("snapshot.json");

    let result = apigraph(
        &["snapshot", input.to_str().unwrap(), output.to_str().unwrap()],
        dir.path(),
    );
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));

    let snapshot = CodebaseDocument::from_json(&fs::read_to_string(&output).unwrap()).unwrap();
    assert!(snapshot.pre_filtered);
    let packages: Vec<&str> = snapshot.packages.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(packages, vec!["test.pkg"]);
}

/// Test that compare fails on an incompatible change and reports it
#[test]
fn test_cli_compare() {
    let dir = TempDir::new().unwrap();
    let surfaces = ApiSurfaces::create(false);
    let old = write_document(&dir, "old.json", &sample_document(&surfaces));
    let new = write_document(
        &dir,
        "new.json",
        &without_class(sample_document(&surfaces), "test.pkg.Widget"),
    );

    let same = apigraph(&["compare", old.to_str().unwrap(), old.to_str().unwrap()], dir.path());
    assert!(same.status.success());
    assert!(String::from_utf8_lossy(&same.stdout).contains("0 errors"));

    let broken = apigraph(
        &["compare", "--json", old.to_str().unwrap(), new.to_str().unwrap()],
        dir.path(),
    );
    assert!(!broken.status.success());
    let report: serde_json::Value = serde_json::from_slice(&broken.stdout).unwrap();
    let kinds: Vec<&str> = report["issues"]
        .as_array()
        .unwrap()
        .iter()
        .map(|issue| issue["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["removed_class"]);
}

/// Test that the surfaces command reads apigraph.toml from the working directory
#[test]
fn test_cli_surfaces_from_config() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("apigraph.toml"),
        r#"
[[surfaces]]
name = "public"

[[surfaces]]
name = "system"
extends = "public"
main = true
"#,
    )
    .unwrap();

    let output = apigraph(&["surfaces"], dir.path());
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "public: public(C), public(R), public(D)",
            "system extends public (main): system(C), system(R), system(D)",
        ]
    );
}

/// Test that an invalid config is rejected before any command runs
#[test]
fn test_cli_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("broken.toml");
    let mut run = RunConfig::default();
    run.surfaces[0].extends = Some("missing".to_string());
    fs::write(&config, run.to_toml().unwrap()).unwrap();

    let output = apigraph(&["--config", config.to_str().unwrap(), "surfaces"], dir.path());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid configuration"));
}

/// Test that history marks a class removed in a later version
#[test]
fn test_cli_history() {
    let dir = TempDir::new().unwrap();
    let surfaces = ApiSurfaces::create(false);
    let v1 = write_document(&dir, "v1.json", &sample_document(&surfaces));
    let v2 = write_document(
        &dir,
        "v2.json",
        &without_class(sample_document(&surfaces), "test.pkg.Widget"),
    );

    let output = apigraph(
        &[
            "history",
            &format!("v1={}", v1.display()),
            &format!("v2={}", v2.display()),
        ],
        dir.path(),
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let history: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(history["versions"], serde_json::json!(["v1", "v2"]));
    let widget = history["classes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|class| class["name"] == "test.pkg.Widget")
        .unwrap();
    assert_eq!(widget["since"], "v1");
    assert_eq!(widget["removed"], "v2");
}

/// Test that history leaves hidden classes out and handles dangling supertypes
#[test]
fn test_cli_history_missing_and_hidden_classes() {
    let dir = TempDir::new().unwrap();
    let surfaces = ApiSurfaces::create(false);
    let v1 = write_document(
        &dir,
        "v1.json",
        &without_class(sample_document(&surfaces), "test.pkg.Base"),
    );
    let version = format!("v1={}", v1.display());

    let strict = apigraph(&["history", &version], dir.path());
    assert!(!strict.status.success());
    assert!(String::from_utf8_lossy(&strict.stderr).contains("test.pkg.Base"));

    let output = apigraph(&["history", "--remove-missing-classes", &version], dir.path());
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let history: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let classes = history["classes"].as_array().unwrap();
    assert!(classes.iter().all(|class| class["name"] != "test.pkg.internal.Helper"));
    let widget = classes.iter().find(|class| class["name"] == "test.pkg.Widget").unwrap();
    assert_eq!(widget["superclasses"], serde_json::json!([]));
}
