//! Mindmap grammar — an indentation tree
//!
//! Each line is a node; its parent is the nearest shallower line above it.
//! Edges run parent → child.

use super::{DiagramGrammar, RawAst};
use crate::mapper::IntentMapper;
use trellis_core::{DiagramKind, ParseIssue};

pub struct MindmapGrammar;

impl DiagramGrammar for MindmapGrammar {
    fn kind(&self) -> DiagramKind {
        DiagramKind::Mindmap
    }

    fn parse(&self, text: &str, mapper: &mut IntentMapper) -> Result<RawAst, ParseIssue> {
        // Stack of (indent, id), deepest last.
        let mut stack: Vec<(usize, String)> = Vec::new();

        for line in text.lines().skip(1) {
            if line.trim().is_empty() || line.trim().starts_with("::icon") {
                continue;
            }
            let indent = line.len() - line.trim_start().len();
            let id = node_id(line.trim());
            if id.is_empty() {
                continue;
            }

            while stack.last().is_some_and(|(i, _)| *i >= indent) {
                stack.pop();
            }
            mapper.define_node(&id);
            if let Some((_, parent)) = stack.last() {
                let parent = parent.clone();
                mapper.add_edge(&parent, &id, None);
            }
            stack.push((indent, id));
        }
        Ok(RawAst::Generic)
    }
}

/// Strip shape decorations: `root((Text))`, `A(Text)`, `B[Text]`, plain.
fn node_id(line: &str) -> String {
    for (open, close) in [("((", "))"), ("(", ")"), ("[", "]"), ("{{", "}}")] {
        if let Some(start) = line.find(open) {
            if line.ends_with(close) {
                let inner = &line[start + open.len()..line.len() - close.len()];
                let outer = &line[..start];
                // `id((Label))` keeps the id, bare `((Label))` keeps the label.
                return if outer.is_empty() { inner } else { outer }
                    .trim()
                    .to_string();
            }
        }
    }
    line.to_string()
}
