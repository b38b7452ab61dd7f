//! Synthetic navigation assets
//!
//! Generated in memory after the real assets are parsed: one auto-index
//! mindmap per hub category and a root hub diagram tying the categories
//! and standalone top-level assets together. Synthetic assets run through
//! the same parse and validation pipeline as files on disk.

use crate::context::BuildContext;
use std::path::{Component, Path};
use trellis_core::model::{FrontMatter, OneOrMany};
use trellis_core::{Asset, ROOT_ID};

/// Build every synthetic asset for the current tree. Categories without a
/// single titled, id-bearing member produce no index.
pub fn generate(ctx: &BuildContext, assets: &[Asset]) -> Vec<Asset> {
    let mut synthetic = Vec::new();
    let mut category_ids = Vec::new();

    for hub in &ctx.hub_categories {
        let members: Vec<&Asset> = assets
            .iter()
            .filter(|a| {
                in_folder(&a.relative_path, &hub.folder)
                    && a.front_matter.id.is_some()
                    && a.front_matter.title.is_some()
            })
            .collect();
        if members.is_empty() {
            continue;
        }

        let mut body = String::from("mindmap\n");
        body.push_str(&format!("  {}(({}))\n", hub.id, hub.title));
        for member in &members {
            if let Some(id) = &member.front_matter.id {
                body.push_str(&format!("    {id}\n"));
            }
        }

        // Index lives at the root, not inside the folder, so it is never
        // caught by the category's own content rules.
        synthetic.push(make_asset(
            ctx,
            &format!("{}.mmd", hub.id),
            &hub.id,
            &hub.title,
            Some(ROOT_ID),
            body,
        ));
        category_ids.push(hub.id.clone());
    }

    // Root hub: one flowchart reaching every category index and every
    // standalone top-level asset.
    let mut body = String::from("flowchart TD\n");
    for id in &category_ids {
        body.push_str(&format!("  {ROOT_ID} --> {id}\n"));
    }
    for asset in assets {
        if asset.relative_path.components().count() == 1 {
            if let Some(id) = &asset.front_matter.id {
                body.push_str(&format!("  {ROOT_ID} --> {id}\n"));
            }
        }
    }
    synthetic.push(make_asset(
        ctx,
        &format!("{ROOT_ID}.mmd"),
        ROOT_ID,
        "Hub",
        None,
        body,
    ));

    tracing::debug!("Generated {} synthetic assets", synthetic.len());
    synthetic
}

fn in_folder(relative: &Path, folder: &str) -> bool {
    let mut components = relative.components();
    components.next() == Some(Component::Normal(folder.as_ref()))
}

fn make_asset(
    ctx: &BuildContext,
    relative: &str,
    id: &str,
    title: &str,
    uplink: Option<&str>,
    body: String,
) -> Asset {
    let raw_content = format!("---\nid: {id}\ntitle: {title}\n---\n{body}");
    let front_matter = FrontMatter {
        id: Some(id.to_string()),
        title: Some(title.to_string()),
        uplinks: uplink.map(|u| OneOrMany::One(u.to_string())),
        ..Default::default()
    };
    Asset {
        relative_path: relative.into(),
        absolute_path: ctx.root().join(relative),
        raw_content,
        front_matter,
        analysis: None,
        synthetic: true,
    }
}
