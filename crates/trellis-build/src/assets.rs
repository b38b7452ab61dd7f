//! Asset discovery and loading
//!
//! Walks the documentation root and enforces the strict foreign-file
//! policy: a tree is diagrams plus footnotes plus images, nothing else.
//! Unexpected files are an error, not a skip, so stray content cannot
//! silently fall out of governance.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use trellis_core::model::parse_front_matter;
use trellis_core::{Asset, TrellisError};
use trellis_rules::model::PROJECT_RULES_FILE;

pub const DIAGRAM_EXTENSION: &str = "mmd";
pub const FOOTNOTES_DIR: &str = "footnotes";
/// Escape hatch: anything may live under `assets/`, none of it is loaded.
pub const ESCAPE_DIR: &str = "assets";
pub use trellis_core::ROOT_GUIDE;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp"];

enum FileClass {
    Diagram,
    Footnote,
    Guide,
    /// Present in the tree but never loaded (images, escape-hatch content,
    /// the project rule file).
    Ignored,
    Foreign,
}

fn classify(relative: &Path) -> FileClass {
    if relative.components().next().map(|c| c.as_os_str()) == Some(ESCAPE_DIR.as_ref()) {
        return FileClass::Ignored;
    }
    if relative == Path::new(PROJECT_RULES_FILE) {
        return FileClass::Ignored;
    }
    let extension = relative
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if extension == DIAGRAM_EXTENSION {
        return FileClass::Diagram;
    }
    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return FileClass::Ignored;
    }
    if extension == "md" {
        if relative == Path::new(ROOT_GUIDE) {
            return FileClass::Guide;
        }
        if relative
            .components()
            .any(|c| c.as_os_str() == FOOTNOTES_DIR)
        {
            return FileClass::Footnote;
        }
    }
    FileClass::Foreign
}

/// Load every governed file under the root, sorted by relative path so all
/// later phases are deterministic. Any foreign file fails the load.
pub fn load_assets(root: &Path) -> Result<Vec<Asset>, TrellisError> {
    let mut assets = Vec::new();
    let mut foreign = Vec::new();

    for entry in WalkBuilder::new(root).build() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Walk error under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let absolute = entry.path().to_path_buf();
        let relative = match absolute.strip_prefix(root) {
            Ok(r) => r.to_path_buf(),
            Err(_) => continue,
        };

        match classify(&relative) {
            FileClass::Ignored => continue,
            FileClass::Foreign => {
                foreign.push(relative.display().to_string());
                continue;
            }
            FileClass::Diagram | FileClass::Footnote | FileClass::Guide => {
                assets.push(load_one(relative, absolute)?);
            }
        }
    }

    if !foreign.is_empty() {
        foreign.sort();
        return Err(TrellisError::Governance(format!(
            "foreign files in documentation tree: {}",
            foreign.join(", ")
        )));
    }

    assets.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    tracing::debug!("Loaded {} assets from {}", assets.len(), root.display());
    Ok(assets)
}

fn load_one(relative: PathBuf, absolute: PathBuf) -> Result<Asset, TrellisError> {
    let raw_content = std::fs::read_to_string(&absolute)?;
    let front_matter = parse_front_matter(&raw_content).map_err(|e| TrellisError::Parse {
        path: relative.clone(),
        line: 0,
        message: format!("invalid front-matter: {e}"),
    })?;
    Ok(Asset {
        relative_path: relative,
        absolute_path: absolute,
        raw_content,
        front_matter,
        analysis: None,
        synthetic: false,
    })
}

/// True for files that carry a diagram body worth parsing.
pub fn is_diagram(asset: &Asset) -> bool {
    asset
        .relative_path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase() == DIAGRAM_EXTENSION)
        .unwrap_or(false)
}

/// True for markdown files under a `footnotes` directory.
pub fn is_footnote(asset: &Asset) -> bool {
    asset
        .relative_path
        .components()
        .any(|c| c.as_os_str() == FOOTNOTES_DIR)
}
