//! Self-healing pass for requirement diagrams
//!
//! A relation endpoint with no matching declared element leaves the
//! diagram structurally broken for downstream rendering. Rather than fail,
//! a stub element is appended so the reference resolves; the stub is
//! visibly marked external.

use trellis_core::{Asset, DiagramKind};

/// Append stub declarations for undeclared relation endpoints. Returns the
/// ids that were stubbed, per asset path, for logging. With `write_back`
/// the amended content is persisted to the source file.
pub fn repair_requirements(assets: &mut [Asset], write_back: bool) -> std::io::Result<Vec<String>> {
    let mut repaired = Vec::new();

    for asset in assets.iter_mut() {
        let Some(analysis) = &asset.analysis else {
            continue;
        };
        if analysis.kind != DiagramKind::Requirement {
            continue;
        }

        let mut missing: Vec<String> = Vec::new();
        for rel in &analysis.relationships {
            for endpoint in [&rel.from, &rel.to] {
                if !analysis.defined_nodes.iter().any(|d| d == endpoint)
                    && !missing.contains(endpoint)
                {
                    missing.push(endpoint.clone());
                }
            }
        }
        if missing.is_empty() {
            continue;
        }

        if !asset.raw_content.ends_with('\n') {
            asset.raw_content.push('\n');
        }
        for id in &missing {
            asset
                .raw_content
                .push_str(&format!("element {id} {{\n  type: \"External\"\n}}\n"));
            tracing::info!(
                "Repaired {}: stubbed external element '{}'",
                asset.relative_path.display(),
                id
            );
            repaired.push(id.clone());
        }

        if let Some(analysis) = &mut asset.analysis {
            for id in &missing {
                analysis.defined_nodes.push(id.clone());
                if !analysis.nodes.contains(id) {
                    analysis.nodes.push(id.clone());
                }
            }
        }

        if write_back && !asset.synthetic {
            std::fs::write(&asset.absolute_path, &asset.raw_content)?;
        }
    }

    Ok(repaired)
}
