//! Integration tests for Trellis
//!
//! These tests run the full build pipeline over temporary projects and
//! verify that the crates work together correctly.

use std::path::Path;
use trellis_build::{BuildConfig, GraphBuilder};

fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

const RULES: &str = r#"
- id: requirements
  target: { idPrefix: "REQ_", pathPattern: "requirements/*" }
  enforcement: error
  hub: { id: requirements, title: "Requirements" }
  checks:
    diagramType: requirementDiagram
    requiredMetadata: [id, title]
    traceability:
      orphan: true

- id: designs
  target: { idPrefix: "DES_", pathPattern: "designs/*" }
  enforcement: error
  hub: { id: designs, title: "Designs" }
  checks:
    diagramType: flowchart
"#;

fn scaffold(root: &Path) {
    write_file(root, "trellis-rules.yaml", RULES);
    write_file(
        root,
        "requirements/REQ_LOGIN.mmd",
        "---\nid: REQ_LOGIN\ntitle: Login requirement\n---\nrequirementDiagram\nrequirement REQ_LOGIN {\n  id: 1\n}\n",
    );
    write_file(
        root,
        "designs/DES_LOGIN.mmd",
        "---\nid: DES_LOGIN\ntitle: Login design\nrequirements: [REQ_LOGIN]\n---\nflowchart TD\n  Entry --> Form\n  Form --> Submit\n",
    );
    write_file(
        root,
        "designs/footnotes/DES_LOGIN.md",
        "Details on the login design.\n",
    );
}

/// Full pipeline: parse, link, validate, synthesize, emit.
#[tokio::test]
async fn test_full_build() {
    let dir = tempfile::tempdir().unwrap();
    scaffold(dir.path());

    let config = BuildConfig::new(dir.path());
    let output_dir = config.output_dir.clone();
    let report = GraphBuilder::new(config).build().await.unwrap();

    assert_eq!(report.asset_count, 3);
    // Two category indexes plus the root hub.
    assert_eq!(report.synthetic_count, 3);

    for file in [
        "navigation.json",
        "navigation_flat.json",
        "metadata.json",
        "footnotes.json",
        "implementation.json",
    ] {
        assert!(output_dir.join(file).exists(), "missing {file}");
    }

    let metadata: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output_dir.join("metadata.json")).unwrap())
            .unwrap();
    // The design satisfies the requirement, so the requirement lists it as
    // a downlink.
    let downlinks = metadata["REQ_LOGIN"]["downlinks"].as_array().unwrap();
    assert!(downlinks.iter().any(|d| d == "DES_LOGIN"));

    let footnotes: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output_dir.join("footnotes.json")).unwrap())
            .unwrap();
    assert_eq!(
        footnotes["DES_LOGIN"].as_str().unwrap(),
        "designs/footnotes/DES_LOGIN.md"
    );
}

/// Rebuilding an unchanged project is served from the artifact cache.
#[tokio::test]
async fn test_rebuild_uses_cache() {
    let dir = tempfile::tempdir().unwrap();
    scaffold(dir.path());

    GraphBuilder::new(BuildConfig::new(dir.path()))
        .build()
        .await
        .unwrap();
    let second = GraphBuilder::new(BuildConfig::new(dir.path()))
        .build()
        .await
        .unwrap();
    assert!(second.cache_hits >= 2);
}

/// A failing build leaves no output directory behind.
#[tokio::test]
async fn test_failed_build_clears_output() {
    let dir = tempfile::tempdir().unwrap();
    scaffold(dir.path());
    GraphBuilder::new(BuildConfig::new(dir.path()))
        .build()
        .await
        .unwrap();

    // Break the project: a requirement written as a flowchart.
    write_file(
        dir.path(),
        "requirements/REQ_BROKEN.mmd",
        "---\nid: REQ_BROKEN\ntitle: Broken\n---\ngraph TD\n  A --> B\n",
    );

    let config = BuildConfig::new(dir.path());
    let output_dir = config.output_dir.clone();
    let err = GraphBuilder::new(config).build().await.unwrap_err();
    assert!(err.to_string().contains("requirementDiagram"));
    assert!(!output_dir.exists());
}
