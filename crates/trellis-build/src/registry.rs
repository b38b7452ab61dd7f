//! Output registries
//!
//! Compact JSON emitted for the external hub renderer. Five files:
//! navigation (id → target list), a flattened best-single-target variant,
//! metadata (id → title/links), footnotes, and implementation references.

use crate::assets::is_footnote;
use crate::context::BuildContext;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use trellis_core::{Asset, TrellisError};

pub const NAVIGATION_REGISTRY: &str = "navigation.json";
pub const NAVIGATION_FLAT_REGISTRY: &str = "navigation_flat.json";
pub const METADATA_REGISTRY: &str = "metadata.json";
pub const FOOTNOTE_REGISTRY: &str = "footnotes.json";
pub const IMPLEMENTATION_REGISTRY: &str = "implementation.json";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationTarget {
    pub id: String,
    /// Owning file of the target id, when it resolves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetadataEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub path: String,
    pub uplinks: Vec<String>,
    pub downlinks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
}

/// Write every registry into the output directory.
pub fn emit(ctx: &BuildContext, assets: &[Asset]) -> anyhow::Result<()> {
    std::fs::create_dir_all(&ctx.config.output_dir)?;

    let mut navigation: BTreeMap<String, Vec<NavigationTarget>> = BTreeMap::new();
    let mut flat: BTreeMap<String, NavigationTarget> = BTreeMap::new();
    let mut metadata: BTreeMap<String, MetadataEntry> = BTreeMap::new();

    let mut ids: Vec<&String> = ctx.registry.keys().collect();
    ids.sort();
    for id in ids {
        let uplinks = ctx.graph.uplinks_of(id);
        let downlinks = ctx.graph.downlinks_of(id);

        let targets: Vec<NavigationTarget> = uplinks
            .iter()
            .chain(downlinks.iter())
            .map(|t| target(ctx, t))
            .collect();
        // Flat pick: a parent beats a child, ties break by smallest id so
        // the choice is stable across runs.
        if let Some(best) = uplinks.iter().min().or_else(|| downlinks.iter().min()) {
            flat.insert(id.clone(), target(ctx, best));
        }
        navigation.insert(id.clone(), targets);

        let owning = ctx.registry[id].display().to_string();
        let (title, classification) = assets
            .iter()
            .find(|a| a.front_matter.id.as_deref() == Some(id))
            .map(|a| {
                (
                    a.front_matter.title.clone(),
                    a.front_matter.classification.clone(),
                )
            })
            .unwrap_or((None, None));
        metadata.insert(
            id.clone(),
            MetadataEntry {
                title,
                path: owning,
                uplinks,
                downlinks,
                classification,
            },
        );
    }

    // Footnotes are looked up by stem (the id they annotate), so two
    // footnotes sharing a stem are ambiguous.
    let mut footnotes: BTreeMap<String, String> = BTreeMap::new();
    for asset in assets.iter().filter(|a| is_footnote(a)) {
        let Some(stem) = asset.relative_path.file_stem() else {
            continue;
        };
        let stem = stem.to_string_lossy().into_owned();
        let path = asset.relative_path.display().to_string();
        if let Some(existing) = footnotes.insert(stem.clone(), path.clone()) {
            anyhow::bail!(TrellisError::GraphIntegrity(format!(
                "footnote stem '{stem}' maps to both {existing} and {path}"
            )));
        }
    }

    let implementation = implementation_registry(ctx);

    write_registry(&ctx.config.output_dir, NAVIGATION_REGISTRY, &navigation)?;
    write_registry(&ctx.config.output_dir, NAVIGATION_FLAT_REGISTRY, &flat)?;
    write_registry(&ctx.config.output_dir, METADATA_REGISTRY, &metadata)?;
    write_registry(&ctx.config.output_dir, FOOTNOTE_REGISTRY, &footnotes)?;
    write_registry(
        &ctx.config.output_dir,
        IMPLEMENTATION_REGISTRY,
        &implementation,
    )?;

    tracing::info!(
        "Emitted registries for {} ids to {}",
        navigation.len(),
        ctx.config.output_dir.display()
    );
    Ok(())
}

fn target(ctx: &BuildContext, id: &str) -> NavigationTarget {
    NavigationTarget {
        id: id.to_string(),
        path: ctx.registry.get(id).map(|p| p.display().to_string()),
    }
}

/// Id → downstream ids under any rule's implementation namespace.
fn implementation_registry(ctx: &BuildContext) -> BTreeMap<String, Vec<String>> {
    let namespaces: Vec<&str> = ctx
        .engine
        .rules()
        .filter_map(|r| r.checks.traceability.as_ref())
        .filter_map(|t| t.implementation_namespace.as_deref())
        .collect();
    if namespaces.is_empty() {
        return BTreeMap::new();
    }

    let mut registry = BTreeMap::new();
    for id in ctx.registry.keys() {
        let references: Vec<String> = ctx
            .graph
            .downlinks_of(id)
            .into_iter()
            .filter(|d| namespaces.iter().any(|n| d.starts_with(n)))
            .collect();
        if !references.is_empty() {
            registry.insert(id.clone(), references);
        }
    }
    registry
}

fn write_registry<T: Serialize>(dir: &Path, file: &str, value: &T) -> anyhow::Result<()> {
    // Compact encoding; these files grow with the tree.
    let json = serde_json::to_string(value)?;
    std::fs::write(dir.join(file), json)?;
    Ok(())
}
