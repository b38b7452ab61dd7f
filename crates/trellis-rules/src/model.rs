//! Rule definitions and layered YAML loading
//!
//! Rules come from two layers: the built-in set embedded in the binary and
//! an optional project-level `trellis-rules.yaml`. The layers are
//! concatenated at load time and never mutated during evaluation.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Built-in rule layer, always loaded first.
const BUILTIN_RULES: &str = include_str!("builtin_rules.yaml");

/// Project-level rule file name, resolved against the documentation root.
pub const PROJECT_RULES_FILE: &str = "trellis-rules.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Enforcement {
    /// Aggregated violations abort the build.
    Error,
    /// Violations are logged and the build continues.
    Warn,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTarget {
    #[serde(default)]
    pub id_prefix: Option<String>,
    #[serde(default)]
    pub path_pattern: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceabilityCheck {
    /// Entity must be referenced by something else in the graph.
    #[serde(default)]
    pub orphan: bool,
    /// Walking uplinks must reach an id with one of these prefixes, or the
    /// graph root.
    #[serde(default)]
    pub trace_to_prefixes: Vec<String>,
    /// A downstream node under this namespace must exist, directly or one
    /// hop away.
    #[serde(default)]
    pub implementation_namespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleChecks {
    /// Diagram content must begin with this kind's keyword.
    #[serde(default)]
    pub diagram_type: Option<String>,
    /// Front-matter fields that must be present.
    #[serde(default)]
    pub required_metadata: Vec<String>,
    /// Required file extension, e.g. `.mmd`. Files under a `footnotes`
    /// directory are always exempt.
    #[serde(default)]
    pub required_extension: Option<String>,
    /// Node ids that must appear in the parsed node set.
    #[serde(default)]
    pub required_nodes: Vec<String>,
    /// Every parsed node id must start with one of these, and resolve in
    /// the global id registry.
    #[serde(default)]
    pub allowed_node_prefixes: Vec<String>,
    /// One declared entity per file for this prefix, with exactly one
    /// structural parent in the graph.
    #[serde(default)]
    pub single_ownership_prefix: Option<String>,
    /// Every node referencing the entity must carry one of these prefixes.
    #[serde(default)]
    pub allowed_uplink_prefixes: Vec<String>,
    #[serde(default)]
    pub traceability: Option<TraceabilityCheck>,
}

/// Navigational grouping annotation consumed by the graph builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubAnnotation {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    #[serde(default)]
    pub target: RuleTarget,
    #[serde(default)]
    pub checks: RuleChecks,
    pub enforcement: Enforcement,
    #[serde(default)]
    pub hub: Option<HubAnnotation>,
}

/// A derived folder-to-grouping mapping; computed from hub annotations,
/// never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct HubCategory {
    pub folder: String,
    pub id: String,
    pub title: String,
    /// Required id prefix for assets in this folder, when the annotated
    /// rule targets one.
    pub id_prefix: Option<String>,
}

impl Rule {
    /// The folder a hub-annotated rule governs: the first non-glob segment
    /// of its path pattern.
    pub fn hub_folder(&self) -> Option<String> {
        self.hub.as_ref()?;
        let pattern = self.target.path_pattern.as_deref()?;
        let first = pattern.split('/').next()?;
        if first.contains('*') || first.contains('{') {
            return None;
        }
        Some(first.to_string())
    }
}

/// Derive hub categories from every rule carrying a hub annotation.
pub fn hub_categories(rules: &[Rule]) -> Vec<HubCategory> {
    rules
        .iter()
        .filter_map(|rule| {
            let hub = rule.hub.as_ref()?;
            let folder = rule.hub_folder()?;
            Some(HubCategory {
                folder,
                id: hub.id.clone(),
                title: hub.title.clone(),
                id_prefix: rule.target.id_prefix.clone(),
            })
        })
        .collect()
}

/// Load the layered rule set: built-in rules first, then the project file
/// if present. Returns the concatenation.
pub fn load_rules(root: &Path) -> anyhow::Result<Vec<Rule>> {
    let mut rules: Vec<Rule> =
        serde_yaml::from_str(BUILTIN_RULES).expect("built-in rules must parse");

    let project_file = root.join(PROJECT_RULES_FILE);
    if project_file.exists() {
        let text = std::fs::read_to_string(&project_file)?;
        let project: Vec<Rule> = serde_yaml::from_str(&text)?;
        tracing::debug!(
            "Loaded {} project rules from {}",
            project.len(),
            project_file.display()
        );
        rules.extend(project);
    }

    Ok(rules)
}
