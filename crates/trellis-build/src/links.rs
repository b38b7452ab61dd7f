//! Id registry and link-graph assembly
//!
//! Two link sources merge into one graph: explicit front-matter
//! declarations and references inferred from parsed diagram bodies. The
//! inferred direction is normally file-is-parent; a pluggable policy can
//! flip specific ids to parents instead (the persona heuristic).

use crate::context::BuildContext;
use std::collections::HashMap;
use std::path::PathBuf;
use trellis_core::{Asset, DiagramKind, NodeMeta, TrellisError};

/// Decides whether an id referenced inside a diagram body should be
/// treated as a parent of the referencing file rather than a child.
pub trait LinkPolicy: Send + Sync {
    fn infers_parent(&self, kind: DiagramKind, node_id: &str) -> bool;
}

/// Default heuristic: actor and persona ids referenced from journey or
/// requirement diagrams describe who the diagram serves, so they sit above
/// it. Pattern-based; ids outside the convention are unaffected.
pub struct PersonaPolicy;

impl LinkPolicy for PersonaPolicy {
    fn infers_parent(&self, kind: DiagramKind, node_id: &str) -> bool {
        matches!(kind, DiagramKind::Journey | DiagramKind::Requirement)
            && (node_id.starts_with("PERSONA_") || node_id.starts_with("ACTOR_"))
    }
}

/// Build the global id → file map from declared ids, sub-entities
/// included. The same id declared in two files is fatal.
pub fn build_registry(assets: &[Asset]) -> Result<HashMap<String, PathBuf>, TrellisError> {
    let mut registry: HashMap<String, PathBuf> = HashMap::new();
    let mut register = |id: &str, path: &PathBuf| -> Result<(), TrellisError> {
        if let Some(existing) = registry.get(id) {
            if existing != path {
                return Err(TrellisError::GraphIntegrity(format!(
                    "id '{}' declared in both {} and {}",
                    id,
                    existing.display(),
                    path.display()
                )));
            }
            return Ok(());
        }
        registry.insert(id.to_string(), path.clone());
        Ok(())
    };

    for asset in assets {
        if let Some(id) = &asset.front_matter.id {
            register(id, &asset.relative_path)?;
        }
        for entity in &asset.front_matter.entities {
            if let Some(id) = &entity.id {
                register(id, &asset.relative_path)?;
            }
        }
    }
    Ok(registry)
}

/// Fold one asset's declared and inferred links into the context graph.
/// Link failures (self-references) are collected, not propagated, so one
/// bad declaration does not hide the rest.
pub fn assemble_asset_links(ctx: &mut BuildContext, asset: &Asset, policy: &dyn LinkPolicy) {
    let Some(id) = asset.front_matter.id.clone() else {
        return;
    };

    ctx.graph.ensure_node(&id);
    ctx.graph.set_meta(
        &id,
        NodeMeta {
            classification: asset.front_matter.classification.clone(),
            is_file_root: true,
            synthetic: asset.synthetic,
        },
    );

    let mut link = |child: &str, parent: &str, errors: &mut Vec<TrellisError>| {
        if let Err(e) = ctx.graph.link(child, parent) {
            errors.push(e);
        }
    };
    let mut errors = Vec::new();

    for parent in asset.front_matter.uplink_ids() {
        link(&id, &parent, &mut errors);
    }
    for child in asset.front_matter.downlink_ids() {
        link(&child, &id, &mut errors);
    }
    // A requirements declaration reads "this asset satisfies REQ_X", so
    // the requirement is the parent.
    for requirement in &asset.front_matter.requirements {
        link(&id, requirement, &mut errors);
    }

    for entity in &asset.front_matter.entities {
        let Some(entity_id) = &entity.id else {
            continue;
        };
        link(entity_id, &id, &mut errors);
        if let Some(uplinks) = &entity.uplinks {
            for parent in uplinks.as_vec() {
                link(entity_id, &parent, &mut errors);
            }
        }
        if let Some(downlinks) = &entity.downlinks {
            for child in downlinks.as_vec() {
                link(&child, entity_id, &mut errors);
            }
        }
    }

    if let Some(analysis) = &asset.analysis {
        for node in &analysis.nodes {
            if node == &id || !ctx.registry.contains_key(node) {
                continue;
            }
            if ctx.registry.get(node) == ctx.registry.get(&id) {
                // Sub-entity of the same file; the containment link above
                // already covers it.
                continue;
            }
            if policy.infers_parent(analysis.kind, node) {
                link(&id, node, &mut errors);
            } else {
                link(node, &id, &mut errors);
            }
        }
    }

    ctx.errors.extend(errors);
}
