//! Unit tests for trellis-core

use crate::cache::{hash_bytes, ArtifactEntry, ContentCache, FORMAT_VERSION};
use crate::graph::{LinkGraph, NodeMeta, ROOT_ID};
use crate::model::*;
use chrono::{Duration, Utc};
use std::collections::BTreeMap;

fn artifact(kind: DiagramKind) -> ArtifactEntry {
    ArtifactEntry {
        kind,
        validation_errors: vec![],
        timestamp: Utc::now(),
        format_version: FORMAT_VERSION,
        nodes: vec!["A".to_string(), "B".to_string()],
        defined_nodes: vec!["A".to_string()],
        relationships: vec![Relationship::new("A", "B")],
        aux_mappings: BTreeMap::new(),
    }
}

#[test]
fn test_diagram_kind_detection() {
    let cases = vec![
        ("flowchart", DiagramKind::Flowchart),
        ("flowchart-elk", DiagramKind::Flowchart),
        ("graph", DiagramKind::Flowchart),
        ("sequenceDiagram", DiagramKind::Sequence),
        ("classDiagram", DiagramKind::Class),
        ("stateDiagram-v2", DiagramKind::State),
        ("erDiagram", DiagramKind::Er),
        ("requirementDiagram", DiagramKind::Requirement),
        ("mindmap", DiagramKind::Mindmap),
        ("journey", DiagramKind::Journey),
        ("pie", DiagramKind::Unknown),
    ];
    for (token, expected) in cases {
        assert_eq!(DiagramKind::detect(token), expected, "failed for {token}");
    }
}

#[test]
fn test_front_matter_split() {
    let content = "---\nid: REQ_LOGIN\ntitle: Login\n---\nrequirementDiagram\n";
    let (fm, body) = split_front_matter(content);
    assert!(fm.contains("id: REQ_LOGIN"));
    assert_eq!(body.trim(), "requirementDiagram");
}

#[test]
fn test_front_matter_absent() {
    let (fm, body) = split_front_matter("flowchart TD\nA --> B\n");
    assert!(fm.is_empty());
    assert!(body.starts_with("flowchart TD"));
}

#[test]
fn test_front_matter_uplink_string_or_list() {
    let one: FrontMatter = serde_yaml::from_str("id: A\nuplink: B").unwrap();
    assert_eq!(one.uplink_ids(), vec!["B".to_string()]);

    let many: FrontMatter = serde_yaml::from_str("id: A\nuplinks: [B, C]").unwrap();
    assert_eq!(many.uplink_ids(), vec!["B".to_string(), "C".to_string()]);
}

#[test]
fn test_front_matter_entities() {
    let fm: FrontMatter =
        serde_yaml::from_str("id: F\nentities:\n  - id: SUB_A\n    uplinks: F\n").unwrap();
    assert_eq!(fm.entities.len(), 1);
    assert_eq!(fm.entities[0].id.as_deref(), Some("SUB_A"));
}

#[test]
fn test_graph_symmetry() {
    let mut graph = LinkGraph::new();
    graph.link("CHILD", "PARENT").unwrap();

    assert_eq!(graph.uplinks_of("CHILD"), vec!["PARENT".to_string()]);
    assert_eq!(graph.downlinks_of("PARENT"), vec!["CHILD".to_string()]);
}

#[test]
fn test_graph_rejects_self_reference() {
    let mut graph = LinkGraph::new();
    assert!(graph.link("A", "A").is_err());
}

#[test]
fn test_graph_deduplicates_links() {
    let mut graph = LinkGraph::new();
    graph.link("A", "B").unwrap();
    graph.link("A", "B").unwrap();

    assert_eq!(graph.uplinks_of("A").len(), 1);
    assert_eq!(graph.edge_count(), 1);
}

#[test]
fn test_graph_link_order_preserved() {
    let mut graph = LinkGraph::new();
    graph.link("A", "P1").unwrap();
    graph.link("A", "P2").unwrap();
    graph.link("A", "P3").unwrap();

    assert_eq!(
        graph.uplinks_of("A"),
        vec!["P1".to_string(), "P2".to_string(), "P3".to_string()]
    );
}

#[test]
fn test_graph_reachability_both_directions() {
    let mut graph = LinkGraph::new();
    graph.link("A", ROOT_ID).unwrap();
    graph.link("B", "A").unwrap();
    graph.ensure_node("LONER");

    let reached = graph.reachable_from(ROOT_ID);
    assert!(reached.contains("A"));
    assert!(reached.contains("B"));
    assert!(!reached.contains("LONER"));
}

#[test]
fn test_graph_trace_up_reaches_prefix() {
    let mut graph = LinkGraph::new();
    graph.link("CODE_X", "DES_Y").unwrap();
    graph.link("DES_Y", "REQ_Z").unwrap();

    assert!(graph.trace_up("CODE_X", |id| id.starts_with("REQ_")));
    assert!(!graph.trace_up("CODE_X", |id| id.starts_with("POL_")));
}

#[test]
fn test_graph_trace_up_cycle_guarded() {
    let mut graph = LinkGraph::new();
    graph.link("A", "B").unwrap();
    graph.link("B", "A").unwrap();

    // Must terminate and report no match.
    assert!(!graph.trace_up("A", |id| id.starts_with("REQ_")));
}

#[test]
fn test_graph_trace_up_root_sentinel() {
    let mut graph = LinkGraph::new();
    graph.link("A", ROOT_ID).unwrap();

    assert!(graph.trace_up("A", |_| false));
}

#[test]
fn test_node_meta() {
    let mut graph = LinkGraph::new();
    graph.set_meta(
        "A",
        NodeMeta {
            classification: Some("public".to_string()),
            is_file_root: true,
            synthetic: false,
        },
    );
    let meta = graph.meta("A").unwrap();
    assert!(meta.is_file_root);
    assert_eq!(meta.classification.as_deref(), Some("public"));
    assert!(!graph.is_synthetic("A"));
    assert!(!graph.is_synthetic("unknown"));
}

#[test]
fn test_hash_stability_without_content_read() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.mmd");
    std::fs::write(&file, "flowchart TD\n").unwrap();

    let cache = ContentCache::load(dir.path());
    let first = cache.file_hash(&file, "flowchart TD\n");

    // Overwrite the file bytes behind the cache's back but restore mtime
    // and size by writing identical content; the stored hash is reused.
    let second = cache.file_hash(&file, "flowchart TD\n");
    assert_eq!(first, second);
}

#[test]
fn test_file_hash_fallback_on_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ContentCache::load(dir.path());
    let hash = cache.file_hash(&dir.path().join("missing.mmd"), "some content");
    assert_eq!(hash, hash_bytes(b"some content"));
}

#[test]
fn test_artifact_roundtrip_and_version_gate() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ContentCache::load(dir.path());

    cache.store_artifact("h1", artifact(DiagramKind::Flowchart));
    assert!(cache.artifact("h1").is_some());

    let mut stale = artifact(DiagramKind::Flowchart);
    stale.format_version = FORMAT_VERSION + 1;
    cache.store_artifact("h2", stale);
    assert!(cache.artifact("h2").is_none());
}

#[test]
fn test_flush_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    {
        let cache = ContentCache::load(dir.path());
        cache.store_artifact("h1", artifact(DiagramKind::Sequence));
        cache.flush().unwrap();
    }
    let reloaded = ContentCache::load(dir.path());
    assert_eq!(reloaded.artifact_count(), 1);
    assert_eq!(
        reloaded.artifact("h1").unwrap().kind,
        DiagramKind::Sequence
    );
}

#[test]
fn test_flush_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ContentCache::load(dir.path());
    cache.flush().unwrap();
    cache.flush().unwrap();
}

#[test]
fn test_corrupt_cache_treated_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join(crate::cache::CACHE_DIR);
    std::fs::create_dir_all(&cache_dir).unwrap();
    std::fs::write(cache_dir.join(crate::cache::ARTIFACT_CACHE), "{not json").unwrap();

    let cache = ContentCache::load(dir.path());
    assert_eq!(cache.artifact_count(), 0);
}

#[test]
fn test_prune_zero_age_removes_everything() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ContentCache::load(dir.path());
    cache.store_artifact("h1", artifact(DiagramKind::Flowchart));
    cache.store_artifact("h2", artifact(DiagramKind::State));

    cache.prune(Duration::zero());
    assert_eq!(cache.artifact_count(), 0);
}

#[test]
fn test_prune_large_age_removes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ContentCache::load(dir.path());
    cache.store_artifact("h1", artifact(DiagramKind::Flowchart));

    cache.prune(Duration::days(365 * 100));
    assert_eq!(cache.artifact_count(), 1);
}

#[test]
fn test_prune_drops_vanished_files() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.mmd");
    std::fs::write(&file, "flowchart TD\n").unwrap();

    let cache = ContentCache::load(dir.path());
    cache.file_hash(&file, "");
    assert_eq!(cache.file_entry_count(), 1);

    std::fs::remove_file(&file).unwrap();
    cache.prune(Duration::days(30));
    assert_eq!(cache.file_entry_count(), 0);
}

#[test]
fn test_clear_resets_both_tiers() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.mmd");
    std::fs::write(&file, "flowchart TD\n").unwrap();

    let cache = ContentCache::load(dir.path());
    cache.file_hash(&file, "");
    cache.store_artifact("h1", artifact(DiagramKind::Flowchart));
    cache.clear().unwrap();

    assert_eq!(cache.file_entry_count(), 0);
    assert_eq!(cache.artifact_count(), 0);

    let reloaded = ContentCache::load(dir.path());
    assert_eq!(reloaded.artifact_count(), 0);
}

#[test]
fn test_identical_content_shares_hash_across_paths() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.mmd");
    let b = dir.path().join("b.mmd");
    std::fs::write(&a, "flowchart TD\nA --> B\n").unwrap();
    std::fs::write(&b, "flowchart TD\nA --> B\n").unwrap();

    let cache = ContentCache::load(dir.path());
    assert_eq!(cache.file_hash(&a, ""), cache.file_hash(&b, ""));
}

#[test]
fn test_analysis_case_insensitive_nodes() {
    let analysis = Analysis {
        nodes: vec!["Login".to_string()],
        ..Default::default()
    };
    assert!(analysis.has_node("LOGIN"));
    assert!(analysis.has_node("login"));
    assert!(!analysis.has_node("logout"));
}
