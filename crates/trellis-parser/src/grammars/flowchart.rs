//! Flowchart grammar (also covers the `graph` alias)

use super::{leading_ident, DiagramGrammar, RawAst};
use crate::mapper::IntentMapper;
use regex::Regex;
use std::sync::OnceLock;
use trellis_core::{DiagramKind, ParseIssue};

/// Arrow forms: `-->`, `---`, `-.->`, `==>`, optionally with `|label|` or
/// an inline `-- label -->` segment.
fn arrow_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(--\s*[^-<>|]+?\s*-->|-{2,3}>|-\.+->|={2,}>|-{3})(?:\s*\|([^|]*)\|)?")
            .unwrap()
    })
}

pub struct FlowchartGrammar;

impl DiagramGrammar for FlowchartGrammar {
    fn kind(&self) -> DiagramKind {
        DiagramKind::Flowchart
    }

    fn parse(&self, text: &str, mapper: &mut IntentMapper) -> Result<RawAst, ParseIssue> {
        for (lineno, line) in text.lines().enumerate().skip(1) {
            let trimmed = line.trim();
            if trimmed.is_empty() || is_directive(trimmed) {
                continue;
            }

            let re = arrow_re();
            let mut last_end = 0usize;
            let mut segments: Vec<&str> = Vec::new();
            let mut labels: Vec<Option<String>> = Vec::new();
            for cap in re.captures_iter(trimmed) {
                let m = cap.get(0).unwrap();
                segments.push(&trimmed[last_end..m.start()]);
                labels.push(edge_label(&cap));
                last_end = m.end();
            }
            segments.push(&trimmed[last_end..]);

            if labels.is_empty() {
                // Pure node definition line, e.g. `A[Some label]`.
                if let Some(id) = leading_ident(trimmed) {
                    mapper.define_node(id);
                }
                continue;
            }

            // Edge chain: A --> B --> C yields two relationships.
            let ids: Vec<Option<&str>> = segments.iter().map(|s| leading_ident(s)).collect();
            for window in 0..labels.len() {
                match (ids[window], ids[window + 1]) {
                    (Some(from), Some(to)) => {
                        if has_decoration(segments[window]) {
                            mapper.define_node(from);
                        }
                        if has_decoration(segments[window + 1]) {
                            mapper.define_node(to);
                        }
                        mapper.add_edge(from, to, labels[window].as_deref());
                    }
                    _ => {
                        return Err(ParseIssue {
                            line: lineno + 1,
                            message: format!("malformed edge: '{trimmed}'"),
                        })
                    }
                }
            }
        }
        Ok(RawAst::Generic)
    }
}

fn is_directive(line: &str) -> bool {
    const DIRECTIVES: &[&str] = &[
        "subgraph",
        "end",
        "direction",
        "click",
        "style",
        "classDef",
        "class ",
        "linkStyle",
    ];
    DIRECTIVES.iter().any(|d| line.starts_with(d)) || line == "class"
}

fn edge_label(cap: &regex::Captures<'_>) -> Option<String> {
    if let Some(pipe) = cap.get(2) {
        let text = pipe.as_str().trim();
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }
    let arrow = cap.get(1).unwrap().as_str();
    if let Some(inner) = arrow.strip_prefix("--").and_then(|s| s.strip_suffix("-->")) {
        let text = inner.trim();
        if !text.is_empty() && !text.chars().all(|c| c == '-' || c == '.' || c == '=') {
            return Some(text.to_string());
        }
    }
    None
}

/// Whether the segment carries an explicit shape (`A[..]`, `B(..)`,
/// `C{..}`), which makes the node defined rather than merely referenced.
fn has_decoration(segment: &str) -> bool {
    let rest = match leading_ident(segment.trim()) {
        Some(id) => &segment.trim()[id.len()..],
        None => return false,
    };
    matches!(
        rest.trim_start().chars().next(),
        Some('[') | Some('(') | Some('{') | Some('>')
    )
}
