//! Per-invocation build context
//!
//! All state a build accumulates lives here, constructed at build start and
//! dropped at the end. Nothing outlives the build function.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use trellis_core::{LinkGraph, TrellisError};
use trellis_rules::engine::{RuleContext, Violation};
use trellis_rules::model::hub_categories;
use trellis_rules::{HubCategory, RuleEngine};

/// Registry output directory, under the cache dir so the asset walker never
/// sees it.
pub const OUTPUT_DIR: &str = ".trellis/out";

#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Documentation root the walker starts from.
    pub root: PathBuf,
    /// Where the output registries land. Cleared at build start.
    pub output_dir: PathBuf,
    /// Persist requirement-repair appends back to the source files.
    pub write_repairs: bool,
}

impl BuildConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let output_dir = root.join(OUTPUT_DIR);
        BuildConfig {
            root,
            output_dir,
            write_repairs: false,
        }
    }
}

pub struct BuildContext {
    pub config: BuildConfig,
    pub engine: RuleEngine,
    pub hub_categories: Vec<HubCategory>,
    /// Folder name → required id prefix, derived from hub-annotated rules.
    pub category_prefixes: HashMap<String, String>,
    /// Declared id → owning file, sub-entity ids included.
    pub registry: HashMap<String, PathBuf>,
    pub graph: LinkGraph,
    /// Fatal failures collected across the whole build before aborting.
    pub errors: Vec<TrellisError>,
    pub warnings: Vec<Violation>,
}

impl BuildContext {
    /// Load the layered rule set and derive the category structure.
    pub fn new(config: BuildConfig) -> anyhow::Result<Self> {
        let rules = trellis_rules::load_rules(&config.root)?;
        let hubs = hub_categories(&rules);
        let category_prefixes = hubs
            .iter()
            .filter_map(|h| Some((h.folder.clone(), h.id_prefix.clone()?)))
            .collect();
        let engine = RuleEngine::new(rules)?;
        Ok(BuildContext {
            config,
            engine,
            hub_categories: hubs,
            category_prefixes,
            registry: HashMap::new(),
            graph: LinkGraph::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        })
    }

    pub fn rule_context(&self) -> RuleContext<'_> {
        RuleContext {
            graph: &self.graph,
            registry: &self.registry,
            category_prefixes: &self.category_prefixes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }
}
