//! Core data structures for the documentation graph

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The one markdown file allowed at the documentation root.
pub const ROOT_GUIDE: &str = "README.md";

/// Discriminates the diagram notation a source file is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagramKind {
    Flowchart,
    Sequence,
    Class,
    State,
    Er,
    Requirement,
    Mindmap,
    Journey,
    /// Unrecognized first token. Parses to an empty analysis, never an error.
    Unknown,
}

impl DiagramKind {
    /// Detect the diagram kind from the first significant token of the
    /// cleaned source. Direct lookup first, then a prefix match against the
    /// known kind stems, then the literal `graph` alias for flowcharts.
    pub fn detect(first_token: &str) -> Self {
        match first_token {
            "flowchart" => return DiagramKind::Flowchart,
            "sequenceDiagram" => return DiagramKind::Sequence,
            "classDiagram" => return DiagramKind::Class,
            "stateDiagram" | "stateDiagram-v2" => return DiagramKind::State,
            "erDiagram" => return DiagramKind::Er,
            "requirementDiagram" => return DiagramKind::Requirement,
            "mindmap" => return DiagramKind::Mindmap,
            "journey" => return DiagramKind::Journey,
            _ => {}
        }
        const STEMS: &[(&str, DiagramKind)] = &[
            ("flowchart", DiagramKind::Flowchart),
            ("sequence", DiagramKind::Sequence),
            ("class", DiagramKind::Class),
            ("state", DiagramKind::State),
            ("er", DiagramKind::Er),
            ("requirement", DiagramKind::Requirement),
            ("mindmap", DiagramKind::Mindmap),
            ("journey", DiagramKind::Journey),
        ];
        for (stem, kind) in STEMS {
            if first_token.starts_with(stem) {
                return *kind;
            }
        }
        if first_token == "graph" {
            return DiagramKind::Flowchart;
        }
        DiagramKind::Unknown
    }

    /// The keyword an asset's first line must start with to satisfy the
    /// syntax check for this kind.
    pub fn keyword(&self) -> &'static str {
        match self {
            DiagramKind::Flowchart => "flowchart",
            DiagramKind::Sequence => "sequenceDiagram",
            DiagramKind::Class => "classDiagram",
            DiagramKind::State => "stateDiagram",
            DiagramKind::Er => "erDiagram",
            DiagramKind::Requirement => "requirementDiagram",
            DiagramKind::Mindmap => "mindmap",
            DiagramKind::Journey => "journey",
            DiagramKind::Unknown => "",
        }
    }

    /// Parse a kind name as written in rule files (`requirement`,
    /// `requirementDiagram`, `flowchart`, ...).
    pub fn from_rule_name(name: &str) -> Self {
        Self::detect(name)
    }
}

/// A directed node-to-node reference extracted from a diagram body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Relationship {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Relationship {
            from: from.into(),
            to: to.into(),
            label: None,
        }
    }

    pub fn labeled(
        from: impl Into<String>,
        to: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Relationship {
            from: from.into(),
            to: to.into(),
            label: Some(label.into()),
        }
    }
}

/// A structured parse error, located by source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseIssue {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// The canonical, kind-independent result of parsing one diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub kind: DiagramKind,
    /// Every node id that appears anywhere, including implicit nodes
    /// referenced only as relationship endpoints.
    pub nodes: Vec<String>,
    /// Node ids with an explicit definition in the diagram body.
    pub defined_nodes: Vec<String>,
    pub relationships: Vec<Relationship>,
    /// Kind-specific auxiliary key/value output (e.g. requirement element
    /// types, journey actors per task).
    pub aux_mappings: BTreeMap<String, String>,
    pub validation_errors: Vec<ParseIssue>,
    /// True when this analysis was served from the artifact cache.
    #[serde(default)]
    pub from_cache: bool,
}

impl Default for Analysis {
    fn default() -> Self {
        Analysis {
            kind: DiagramKind::Unknown,
            nodes: Vec::new(),
            defined_nodes: Vec::new(),
            relationships: Vec::new(),
            aux_mappings: BTreeMap::new(),
            validation_errors: Vec::new(),
            from_cache: false,
        }
    }
}

impl Analysis {
    /// Case-insensitive node membership, used by structural checks.
    pub fn has_node(&self, id: &str) -> bool {
        let needle = id.to_ascii_lowercase();
        self.nodes.iter().any(|n| n.to_ascii_lowercase() == needle)
    }
}

/// A front-matter link field that may be written as a string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn as_vec(&self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s.clone()],
            OneOrMany::Many(v) => v.clone(),
        }
    }
}

/// A sub-entity declared inside a file's front-matter, carrying its own id
/// and links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDecl {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uplinks: Option<OneOrMany>,
    #[serde(default)]
    pub downlinks: Option<OneOrMany>,
}

/// YAML metadata block at the top of every source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontMatter {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "uplink")]
    pub uplinks: Option<OneOrMany>,
    #[serde(default, alias = "downlink")]
    pub downlinks: Option<OneOrMany>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub entities: Vec<EntityDecl>,
    #[serde(default)]
    pub classification: Option<String>,
}

impl FrontMatter {
    pub fn uplink_ids(&self) -> Vec<String> {
        self.uplinks.as_ref().map(|u| u.as_vec()).unwrap_or_default()
    }

    pub fn downlink_ids(&self) -> Vec<String> {
        self.downlinks
            .as_ref()
            .map(|d| d.as_vec())
            .unwrap_or_default()
    }
}

/// One loaded source file. Immutable for the remainder of a build, except
/// for the requirement-repair pass which may append synthesized content.
#[derive(Debug, Clone)]
pub struct Asset {
    pub relative_path: PathBuf,
    pub absolute_path: PathBuf,
    pub raw_content: String,
    pub front_matter: FrontMatter,
    pub analysis: Option<Analysis>,
    /// Generated navigation asset (auto-index or root hub), not on disk.
    pub synthetic: bool,
}

impl Asset {
    /// The file's base name without extension. Governance requires it to
    /// equal the declared id.
    pub fn file_stem(&self) -> String {
        self.relative_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The diagram body with front-matter fences and `%%` comment lines
    /// stripped.
    pub fn diagram_body(&self) -> String {
        strip_front_matter(&self.raw_content)
            .lines()
            .filter(|l| !l.trim_start().starts_with("%%"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Split a file into its YAML front-matter block and the remaining body.
/// Returns `(front_matter_text, body)`; the front-matter part is empty when
/// the file carries no `---` fence.
pub fn split_front_matter(content: &str) -> (&str, &str) {
    let trimmed = content.trim_start_matches('\u{feff}');
    if let Some(rest) = trimmed.strip_prefix("---") {
        let rest = rest.strip_prefix('\n').unwrap_or(rest);
        if let Some(end) = rest.find("\n---") {
            let after = &rest[end + 4..];
            let body = after.strip_prefix('\n').unwrap_or(after);
            return (&rest[..end], body);
        }
    }
    ("", trimmed)
}

/// The body of a file with any front-matter block removed.
pub fn strip_front_matter(content: &str) -> &str {
    split_front_matter(content).1
}

/// Parse a front-matter block, tolerating an absent block as defaults.
pub fn parse_front_matter(content: &str) -> Result<FrontMatter, serde_yaml::Error> {
    let (fm, _) = split_front_matter(content);
    if fm.trim().is_empty() {
        return Ok(FrontMatter::default());
    }
    serde_yaml::from_str(fm)
}
