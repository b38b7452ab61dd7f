//! Individual rule checks
//!
//! Each check is independently optional per rule; all failures within one
//! rule aggregate before reporting. Content checks run against a single
//! asset, graph checks run against ids in the assembled link graph.

use crate::engine::RuleContext;
use crate::model::{RuleChecks, TraceabilityCheck};
use std::path::Path;
use trellis_core::model::strip_front_matter;
use trellis_core::{Asset, DiagramKind, ROOT_GUIDE};

/// Diagram content must begin with the declared kind's keyword. The
/// `graph` alias is accepted for flowcharts.
pub fn check_syntax(checks: &RuleChecks, asset: &Asset) -> Option<String> {
    let declared = checks.diagram_type.as_deref()?;
    let kind = DiagramKind::from_rule_name(declared);
    let first_line = strip_front_matter(&asset.raw_content)
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with("%%"))
        .unwrap_or("");
    let keyword = kind.keyword();
    let ok = first_line.starts_with(keyword)
        || (kind == DiagramKind::Flowchart && first_line.starts_with("graph"));
    if ok {
        None
    } else {
        Some(format!(
            "{}: expected first line to start with '{}', found '{}'",
            asset.relative_path.display(),
            keyword,
            first_line
        ))
    }
}

pub fn check_metadata(checks: &RuleChecks, asset: &Asset) -> Vec<String> {
    let fm = &asset.front_matter;
    checks
        .required_metadata
        .iter()
        .filter(|field| {
            let present = match field.as_str() {
                "id" => fm.id.is_some(),
                "title" => fm.title.is_some(),
                "description" => fm.description.is_some(),
                "uplink" | "uplinks" => fm.uplinks.is_some(),
                "downlink" | "downlinks" => fm.downlinks.is_some(),
                "requirements" => !fm.requirements.is_empty(),
                "classification" => fm.classification.is_some(),
                _ => false,
            };
            !present
        })
        .map(|field| {
            format!(
                "{}: missing required front-matter field '{}'",
                asset.relative_path.display(),
                field
            )
        })
        .collect()
}

/// Files under a `footnotes` directory and the root guide file are
/// exempt: both are always markdown.
pub fn check_extension(checks: &RuleChecks, asset: &Asset) -> Option<String> {
    let required = checks.required_extension.as_deref()?;
    if asset.relative_path == Path::new(ROOT_GUIDE) {
        return None;
    }
    if asset
        .relative_path
        .components()
        .any(|c| c.as_os_str() == "footnotes")
    {
        return None;
    }
    let actual = asset
        .relative_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    if actual == required {
        None
    } else {
        Some(format!(
            "{}: expected extension '{}', found '{}'",
            asset.relative_path.display(),
            required,
            actual
        ))
    }
}

/// Required nodes must appear in the parsed node set, case-insensitively.
/// Falls back to a raw-line scan when no analyzer produced nodes for the
/// kind.
pub fn check_structural(checks: &RuleChecks, asset: &Asset) -> Vec<String> {
    checks
        .required_nodes
        .iter()
        .filter(|required| {
            let found = match &asset.analysis {
                Some(analysis) if analysis.kind != DiagramKind::Unknown => {
                    analysis.has_node(required)
                }
                _ => {
                    let needle = required.to_ascii_lowercase();
                    asset
                        .raw_content
                        .lines()
                        .any(|l| l.to_ascii_lowercase().contains(&needle))
                }
            };
            !found
        })
        .map(|required| {
            format!(
                "{}: required node '{}' not found",
                asset.relative_path.display(),
                required
            )
        })
        .collect()
}

/// Every parsed node id must carry an allowed prefix and resolve to a real
/// documentation file in the global id registry.
pub fn check_allowed_node_prefixes(
    checks: &RuleChecks,
    asset: &Asset,
    ctx: &RuleContext<'_>,
) -> Vec<String> {
    if checks.allowed_node_prefixes.is_empty() {
        return Vec::new();
    }
    let Some(analysis) = &asset.analysis else {
        return Vec::new();
    };
    let mut failures = Vec::new();
    for node in &analysis.nodes {
        if !checks
            .allowed_node_prefixes
            .iter()
            .any(|p| node.starts_with(p.as_str()))
        {
            failures.push(format!(
                "{}: node '{}' does not match an allowed prefix",
                asset.relative_path.display(),
                node
            ));
        } else if !ctx.registry.contains_key(node) {
            failures.push(format!(
                "{}: node '{}' does not resolve to a documentation file",
                asset.relative_path.display(),
                node
            ));
        }
    }
    failures
}

/// At most one declared entity per governed prefix per file.
pub fn check_single_ownership_file(checks: &RuleChecks, asset: &Asset) -> Option<String> {
    let prefix = checks.single_ownership_prefix.as_deref()?;
    let declared = declared_ids_with_prefix(asset, prefix);
    if declared.len() > 1 {
        Some(format!(
            "{}: ambiguous definition, multiple '{}' entities declared: {}",
            asset.relative_path.display(),
            prefix,
            declared.join(", ")
        ))
    } else {
        None
    }
}

/// Every governed entity must have exactly one structural parent.
/// Generated navigation assets (category indexes, the root hub) add
/// uplinks of their own, so only parents backed by real files count.
pub fn check_single_ownership_graph(id: &str, ctx: &RuleContext<'_>) -> Option<String> {
    let parents: Vec<String> = ctx
        .graph
        .uplinks_of(id)
        .into_iter()
        .filter(|p| !ctx.graph.is_synthetic(p))
        .collect();
    if parents.len() > 1 {
        Some(format!(
            "'{}' has shared ownership: parents {}",
            id,
            parents.join(", ")
        ))
    } else {
        None
    }
}

/// All referencing nodes must carry an allowed prefix.
pub fn check_access_control(
    checks: &RuleChecks,
    id: &str,
    ctx: &RuleContext<'_>,
) -> Vec<String> {
    if checks.allowed_uplink_prefixes.is_empty() {
        return Vec::new();
    }
    ctx.graph
        .downlinks_of(id)
        .into_iter()
        .filter(|referrer| {
            !checks
                .allowed_uplink_prefixes
                .iter()
                .any(|p| referrer.starts_with(p.as_str()))
        })
        .map(|referrer| format!("'{}' is referenced by disallowed id '{}'", id, referrer))
        .collect()
}

pub fn check_traceability(
    trace: &TraceabilityCheck,
    id: &str,
    ctx: &RuleContext<'_>,
) -> Vec<String> {
    let mut failures = Vec::new();

    if trace.orphan
        && ctx.graph.uplinks_of(id).is_empty()
        && ctx.graph.downlinks_of(id).is_empty()
    {
        failures.push(format!("'{}' is not referenced by anything", id));
    }

    if !trace.trace_to_prefixes.is_empty() {
        let reached = ctx.graph.trace_up(id, |candidate| {
            trace
                .trace_to_prefixes
                .iter()
                .any(|p| candidate.starts_with(p.as_str()))
        });
        if !reached {
            failures.push(format!(
                "'{}' does not trace up to any of [{}]",
                id,
                trace.trace_to_prefixes.join(", ")
            ));
        }
    }

    if let Some(namespace) = &trace.implementation_namespace {
        let children = ctx.graph.downlinks_of(id);
        let direct = children.iter().any(|c| c.starts_with(namespace.as_str()));
        let via_child = children.iter().any(|c| {
            ctx.graph
                .downlinks_of(c)
                .iter()
                .any(|g| g.starts_with(namespace.as_str()))
        });
        if !direct && !via_child {
            failures.push(format!(
                "'{}' has no downstream node under '{}'",
                id, namespace
            ));
        }
    }

    failures
}

/// Ids declared by the file (root id plus sub-entities) carrying a prefix.
pub fn declared_ids_with_prefix(asset: &Asset, prefix: &str) -> Vec<String> {
    let mut ids = Vec::new();
    if let Some(id) = &asset.front_matter.id {
        if id.starts_with(prefix) {
            ids.push(id.clone());
        }
    }
    for entity in &asset.front_matter.entities {
        if let Some(id) = &entity.id {
            if id.starts_with(prefix) {
                ids.push(id.clone());
            }
        }
    }
    ids
}
