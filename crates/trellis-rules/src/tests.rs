//! Unit tests for trellis-rules

use crate::engine::{RuleContext, RuleEngine};
use crate::model::*;
use crate::target::TargetMatcher;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use trellis_core::model::parse_front_matter;
use trellis_core::{Analysis, Asset, DiagramKind, LinkGraph, NodeMeta};

fn asset(relative: &str, content: &str) -> Asset {
    let front_matter = parse_front_matter(content).unwrap();
    Asset {
        relative_path: PathBuf::from(relative),
        absolute_path: PathBuf::from("/docs").join(relative),
        raw_content: content.to_string(),
        front_matter,
        analysis: None,
        synthetic: false,
    }
}

fn rule(yaml: &str) -> Rule {
    serde_yaml::from_str(yaml).unwrap()
}

fn empty_ctx<'a>(
    graph: &'a LinkGraph,
    registry: &'a HashMap<String, PathBuf>,
    prefixes: &'a HashMap<String, String>,
) -> RuleContext<'a> {
    RuleContext {
        graph,
        registry,
        category_prefixes: prefixes,
    }
}

#[test]
fn test_target_id_prefix() {
    let matcher = TargetMatcher::compile(&RuleTarget {
        id_prefix: Some("REQ_".to_string()),
        path_pattern: None,
    })
    .unwrap();
    assert!(matcher.matches(Some("REQ_LOGIN"), Path::new("anything.mmd")));
    assert!(!matcher.matches(Some("POL_X"), Path::new("anything.mmd")));
    assert!(!matcher.matches(None, Path::new("anything.mmd")));
}

#[test]
fn test_target_path_patterns() {
    let matcher = TargetMatcher::compile(&RuleTarget {
        id_prefix: None,
        path_pattern: Some("requirements/*".to_string()),
    })
    .unwrap();
    assert!(matcher.matches(None, Path::new("requirements/REQ_A.mmd")));
    assert!(!matcher.matches(None, Path::new("requirements/sub/REQ_B.mmd")));

    let deep = TargetMatcher::compile(&RuleTarget {
        id_prefix: None,
        path_pattern: Some("requirements/**".to_string()),
    })
    .unwrap();
    assert!(deep.matches(None, Path::new("requirements/sub/REQ_B.mmd")));

    let alt = TargetMatcher::compile(&RuleTarget {
        id_prefix: None,
        path_pattern: Some("{requirements,policies}/*".to_string()),
    })
    .unwrap();
    assert!(alt.matches(None, Path::new("policies/POL_A.mmd")));
    assert!(!alt.matches(None, Path::new("designs/DES_A.mmd")));
}

#[test]
fn test_rule_yaml_shape() {
    let r = rule(
        r#"
id: requirements
target: { idPrefix: "REQ_", pathPattern: "requirements/*" }
enforcement: error
hub: { id: requirements, title: "Requirements" }
checks:
  diagramType: requirementDiagram
  requiredMetadata: [id, title]
  traceability:
    orphan: true
    traceToPrefixes: [POL_]
"#,
    );
    assert_eq!(r.id, "requirements");
    assert_eq!(r.enforcement, Enforcement::Error);
    assert_eq!(r.checks.diagram_type.as_deref(), Some("requirementDiagram"));
    assert!(r.checks.traceability.as_ref().unwrap().orphan);
    assert_eq!(r.hub_folder().as_deref(), Some("requirements"));
}

#[test]
fn test_hub_categories_derived() {
    let rules = vec![rule(
        r#"
id: requirements
target: { idPrefix: "REQ_", pathPattern: "requirements/*" }
enforcement: error
hub: { id: requirements, title: "Requirements" }
"#,
    )];
    let hubs = hub_categories(&rules);
    assert_eq!(hubs.len(), 1);
    assert_eq!(hubs[0].folder, "requirements");
    assert_eq!(hubs[0].id_prefix.as_deref(), Some("REQ_"));
}

#[test]
fn test_builtin_rules_load() {
    let dir = tempfile::tempdir().unwrap();
    let rules = load_rules(dir.path()).unwrap();
    assert!(!rules.is_empty());
}

#[test]
fn test_project_rules_layered_after_builtin() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(PROJECT_RULES_FILE),
        "- id: custom\n  enforcement: warn\n  target: { idPrefix: X_ }\n",
    )
    .unwrap();
    let rules = load_rules(dir.path()).unwrap();
    assert_eq!(rules.last().unwrap().id, "custom");
    assert!(rules.len() > 1);
}

#[test]
fn test_syntax_check_names_expected_and_found() {
    // A requirement rule applied to a flowchart file fails naming both
    // sides.
    let engine = RuleEngine::new(vec![rule(
        r#"
id: requirements
target: { idPrefix: "REQ_", pathPattern: "requirements/*" }
enforcement: error
checks: { diagramType: requirementDiagram }
"#,
    )])
    .unwrap();

    let a = asset(
        "requirements/REQ_A.mmd",
        "---\nid: REQ_A\n---\ngraph TD\n  A --> B\n",
    );
    let graph = LinkGraph::new();
    let registry = HashMap::new();
    let prefixes = HashMap::new();
    let outcome = engine.validate_asset(&a, &empty_ctx(&graph, &registry, &prefixes));

    assert_eq!(outcome.errors.len(), 1);
    let message = &outcome.errors[0].message;
    assert!(message.contains("requirementDiagram"));
    assert!(message.contains("graph TD"));
}

#[test]
fn test_syntax_check_accepts_graph_alias_for_flowchart() {
    let engine = RuleEngine::new(vec![rule(
        "id: flows\nenforcement: error\ntarget: { pathPattern: \"flows/*\" }\nchecks: { diagramType: flowchart }\n",
    )])
    .unwrap();
    let a = asset("flows/FLOW_A.mmd", "---\nid: FLOW_A\n---\ngraph TD\n  A --> B\n");
    let graph = LinkGraph::new();
    let registry = HashMap::new();
    let prefixes = HashMap::new();
    let outcome = engine.validate_asset(&a, &empty_ctx(&graph, &registry, &prefixes));
    assert!(outcome.errors.is_empty());
}

#[test]
fn test_metadata_and_extension_checks() {
    let engine = RuleEngine::new(vec![rule(
        "id: meta\nenforcement: error\ntarget: { pathPattern: \"**/*\" }\nchecks: { requiredMetadata: [id, title], requiredExtension: .mmd }\n",
    )])
    .unwrap();
    let a = asset("designs/DES_A.md", "---\nid: DES_A\n---\nflowchart TD\n");
    let graph = LinkGraph::new();
    let registry = HashMap::new();
    let prefixes = HashMap::new();
    let outcome = engine.validate_asset(&a, &empty_ctx(&graph, &registry, &prefixes));

    // Missing title and wrong extension aggregate under one rule.
    assert_eq!(outcome.errors.len(), 2);
}

#[test]
fn test_footnotes_exempt_from_extension_check() {
    let engine = RuleEngine::new(vec![rule(
        "id: ext\nenforcement: error\ntarget: { pathPattern: \"**/*\" }\nchecks: { requiredExtension: .mmd }\n",
    )])
    .unwrap();
    let a = asset("designs/footnotes/note.md", "some note\n");
    let graph = LinkGraph::new();
    let registry = HashMap::new();
    let prefixes = HashMap::new();
    let outcome = engine.validate_asset(&a, &empty_ctx(&graph, &registry, &prefixes));
    assert!(outcome.errors.is_empty());
}

#[test]
fn test_root_guide_exempt_from_extension_check() {
    let engine = RuleEngine::new(vec![rule(
        "id: ext\nenforcement: error\ntarget: { pathPattern: \"**/*\" }\nchecks: { requiredExtension: .mmd }\n",
    )])
    .unwrap();
    let graph = LinkGraph::new();
    let registry = HashMap::new();
    let prefixes = HashMap::new();

    let guide = asset("README.md", "# Guide\n");
    let outcome = engine.validate_asset(&guide, &empty_ctx(&graph, &registry, &prefixes));
    assert!(outcome.errors.is_empty());

    // Only the root-level guide is exempt.
    let nested = asset("designs/README.md", "# Not a guide\n");
    let outcome = engine.validate_asset(&nested, &empty_ctx(&graph, &registry, &prefixes));
    assert_eq!(outcome.errors.len(), 1);
}

#[test]
fn test_structural_check_uses_analysis() {
    let engine = RuleEngine::new(vec![rule(
        "id: struct\nenforcement: error\ntarget: { pathPattern: \"**/*\" }\nchecks: { requiredNodes: [login, LOGOUT] }\n",
    )])
    .unwrap();
    let mut a = asset("flows/FLOW_A.mmd", "---\nid: FLOW_A\n---\nflowchart TD\n");
    a.analysis = Some(Analysis {
        kind: DiagramKind::Flowchart,
        nodes: vec!["Login".to_string(), "logout".to_string()],
        ..Default::default()
    });
    let graph = LinkGraph::new();
    let registry = HashMap::new();
    let prefixes = HashMap::new();
    let outcome = engine.validate_asset(&a, &empty_ctx(&graph, &registry, &prefixes));
    assert!(outcome.errors.is_empty());
}

#[test]
fn test_structural_check_raw_scan_fallback() {
    let engine = RuleEngine::new(vec![rule(
        "id: struct\nenforcement: error\ntarget: { pathPattern: \"**/*\" }\nchecks: { requiredNodes: [needle] }\n",
    )])
    .unwrap();
    let a = asset("misc/X.mmd", "somekind\n  contains NEEDLE here\n");
    let graph = LinkGraph::new();
    let registry = HashMap::new();
    let prefixes = HashMap::new();
    let outcome = engine.validate_asset(&a, &empty_ctx(&graph, &registry, &prefixes));
    assert!(outcome.errors.is_empty());
}

#[test]
fn test_allowed_node_prefixes_and_registry_resolution() {
    let engine = RuleEngine::new(vec![rule(
        "id: nodes\nenforcement: error\ntarget: { pathPattern: \"**/*\" }\nchecks: { allowedNodePrefixes: [REQ_] }\n",
    )])
    .unwrap();
    let mut a = asset("requirements/REQ_A.mmd", "---\nid: REQ_A\n---\nrequirementDiagram\n");
    a.analysis = Some(Analysis {
        kind: DiagramKind::Requirement,
        nodes: vec![
            "REQ_A".to_string(),
            "REQ_MISSING".to_string(),
            "BAD_PREFIX".to_string(),
        ],
        ..Default::default()
    });
    let graph = LinkGraph::new();
    let mut registry = HashMap::new();
    registry.insert("REQ_A".to_string(), PathBuf::from("requirements/REQ_A.mmd"));
    let prefixes = HashMap::new();
    let outcome = engine.validate_asset(&a, &empty_ctx(&graph, &registry, &prefixes));

    assert_eq!(outcome.errors.len(), 2);
    assert!(outcome.errors.iter().any(|v| v.message.contains("REQ_MISSING")));
    assert!(outcome.errors.iter().any(|v| v.message.contains("BAD_PREFIX")));
}

#[test]
fn test_ambiguous_definition_in_file() {
    let engine = RuleEngine::new(vec![rule(
        "id: own\nenforcement: error\ntarget: { pathPattern: \"**/*\" }\nchecks: { singleOwnershipPrefix: REQ_ }\n",
    )])
    .unwrap();
    let a = asset(
        "requirements/REQ_A.mmd",
        "---\nid: REQ_A\nentities:\n  - id: REQ_B\n---\nrequirementDiagram\n",
    );
    let graph = LinkGraph::new();
    let registry = HashMap::new();
    let prefixes = HashMap::new();
    let outcome = engine.validate_asset(&a, &empty_ctx(&graph, &registry, &prefixes));
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].message.contains("ambiguous"));
}

#[test]
fn test_ownership_arithmetic() {
    let engine = RuleEngine::new(vec![rule(
        "id: own\nenforcement: error\ntarget: { idPrefix: REQ_ }\nchecks: { singleOwnershipPrefix: REQ_ }\n",
    )])
    .unwrap();

    let mut registry = HashMap::new();
    registry.insert("REQ_A".to_string(), PathBuf::from("requirements/REQ_A.mmd"));
    let prefixes = HashMap::new();

    // Two distinct parents: fails.
    let mut graph = LinkGraph::new();
    graph.link("REQ_A", "POL_ONE").unwrap();
    graph.link("REQ_A", "POL_TWO").unwrap();
    let outcome = engine.validate_project(&empty_ctx(&graph, &registry, &prefixes));
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].message.contains("shared ownership"));

    // Exactly one parent: passes.
    let mut graph = LinkGraph::new();
    graph.link("REQ_A", "POL_ONE").unwrap();
    let outcome = engine.validate_project(&empty_ctx(&graph, &registry, &prefixes));
    assert!(outcome.errors.is_empty());
}

#[test]
fn test_ownership_ignores_generated_hub_parents() {
    let engine = RuleEngine::new(vec![rule(
        "id: own\nenforcement: error\ntarget: { idPrefix: REQ_ }\nchecks: { singleOwnershipPrefix: REQ_ }\n",
    )])
    .unwrap();

    let mut registry = HashMap::new();
    registry.insert("REQ_A".to_string(), PathBuf::from("requirements/REQ_A.mmd"));
    let prefixes = HashMap::new();

    // One declared parent plus the generated category index: still a
    // single owner.
    let mut graph = LinkGraph::new();
    graph.link("REQ_A", "POL_ROOT").unwrap();
    graph.link("REQ_A", "requirements").unwrap();
    graph.set_meta(
        "requirements",
        NodeMeta {
            classification: None,
            is_file_root: true,
            synthetic: true,
        },
    );
    let outcome = engine.validate_project(&empty_ctx(&graph, &registry, &prefixes));
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);

    // A second real parent is still shared ownership.
    graph.link("REQ_A", "POL_TWO").unwrap();
    let outcome = engine.validate_project(&empty_ctx(&graph, &registry, &prefixes));
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].message.contains("shared ownership"));
}

#[test]
fn test_access_control() {
    let engine = RuleEngine::new(vec![rule(
        "id: access\nenforcement: error\ntarget: { idPrefix: REQ_ }\nchecks: { allowedUplinkPrefixes: [DES_] }\n",
    )])
    .unwrap();

    let mut registry = HashMap::new();
    registry.insert("REQ_A".to_string(), PathBuf::from("requirements/REQ_A.mmd"));
    let prefixes = HashMap::new();

    let mut graph = LinkGraph::new();
    graph.link("DES_OK", "REQ_A").unwrap();
    graph.link("HACK_BAD", "REQ_A").unwrap();
    let outcome = engine.validate_project(&empty_ctx(&graph, &registry, &prefixes));
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].message.contains("HACK_BAD"));
}

#[test]
fn test_traceability_checks() {
    let engine = RuleEngine::new(vec![rule(
        r#"
id: trace
enforcement: error
target: { idPrefix: REQ_ }
checks:
  traceability:
    orphan: true
    traceToPrefixes: [POL_]
    implementationNamespace: CODE_
"#,
    )])
    .unwrap();

    let mut registry = HashMap::new();
    registry.insert("REQ_A".to_string(), PathBuf::from("requirements/REQ_A.mmd"));
    let prefixes = HashMap::new();

    // Fully wired: uplink to policy, downlink into code namespace.
    let mut graph = LinkGraph::new();
    graph.link("REQ_A", "POL_ROOT").unwrap();
    graph.link("CODE_IMPL", "REQ_A").unwrap();
    let outcome = engine.validate_project(&empty_ctx(&graph, &registry, &prefixes));
    assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);

    // Isolated: all three checks fail.
    let graph = LinkGraph::new();
    let outcome = engine.validate_project(&empty_ctx(&graph, &registry, &prefixes));
    assert_eq!(outcome.errors.len(), 3);
}

#[test]
fn test_implementation_via_intermediate_node() {
    let engine = RuleEngine::new(vec![rule(
        "id: impl\nenforcement: error\ntarget: { idPrefix: REQ_ }\nchecks: { traceability: { implementationNamespace: CODE_ } }\n",
    )])
    .unwrap();

    let mut registry = HashMap::new();
    registry.insert("REQ_A".to_string(), PathBuf::from("requirements/REQ_A.mmd"));
    let prefixes = HashMap::new();

    let mut graph = LinkGraph::new();
    graph.link("DES_MID", "REQ_A").unwrap();
    graph.link("CODE_IMPL", "DES_MID").unwrap();
    let outcome = engine.validate_project(&empty_ctx(&graph, &registry, &prefixes));
    assert!(outcome.errors.is_empty());
}

#[test]
fn test_warn_enforcement_does_not_error() {
    let engine = RuleEngine::new(vec![rule(
        "id: soft\nenforcement: warn\ntarget: { pathPattern: \"**/*\" }\nchecks: { requiredMetadata: [title] }\n",
    )])
    .unwrap();
    let a = asset("misc/X.mmd", "flowchart TD\n");
    let graph = LinkGraph::new();
    let registry = HashMap::new();
    let prefixes = HashMap::new();
    let outcome = engine.validate_asset(&a, &empty_ctx(&graph, &registry, &prefixes));
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.warnings.len(), 1);
}

#[test]
fn test_governance_filename_identity() {
    let engine = RuleEngine::new(vec![]).unwrap();
    let a = asset("requirements/wrong_name.mmd", "---\nid: REQ_A\n---\nrequirementDiagram\n");
    let graph = LinkGraph::new();
    let registry = HashMap::new();
    let prefixes = HashMap::new();
    let failures = engine.governance(&a, &empty_ctx(&graph, &registry, &prefixes));
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("does not match declared id"));
}

#[test]
fn test_governance_folder_prefix() {
    let engine = RuleEngine::new(vec![]).unwrap();
    let a = asset("requirements/DES_X.mmd", "---\nid: DES_X\n---\nrequirementDiagram\n");
    let graph = LinkGraph::new();
    let registry = HashMap::new();
    let mut prefixes = HashMap::new();
    prefixes.insert("requirements".to_string(), "REQ_".to_string());
    let failures = engine.governance(&a, &empty_ctx(&graph, &registry, &prefixes));
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("must start with 'REQ_'"));
}

#[test]
fn test_governance_passes_for_conforming_asset() {
    let engine = RuleEngine::new(vec![]).unwrap();
    let a = asset("requirements/REQ_A.mmd", "---\nid: REQ_A\n---\nrequirementDiagram\n");
    let graph = LinkGraph::new();
    let registry = HashMap::new();
    let mut prefixes = HashMap::new();
    prefixes.insert("requirements".to_string(), "REQ_".to_string());
    assert!(engine
        .governance(&a, &empty_ctx(&graph, &registry, &prefixes))
        .is_empty());
}
