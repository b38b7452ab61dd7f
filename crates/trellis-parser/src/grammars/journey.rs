//! User journey grammar
//!
//! Tasks are `name: score: actor[, actor]` lines. Actors become nodes so
//! persona references are visible to link inference; each task points at
//! the actors performing it.

use super::{DiagramGrammar, RawAst};
use crate::mapper::IntentMapper;
use trellis_core::{DiagramKind, ParseIssue};

pub struct JourneyGrammar;

impl DiagramGrammar for JourneyGrammar {
    fn kind(&self) -> DiagramKind {
        DiagramKind::Journey
    }

    fn parse(&self, text: &str, mapper: &mut IntentMapper) -> Result<RawAst, ParseIssue> {
        let mut section = String::new();
        for line in text.lines().skip(1) {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("title") {
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix("section ") {
                section = rest.trim().to_string();
                continue;
            }

            let parts: Vec<&str> = trimmed.splitn(3, ':').map(str::trim).collect();
            if parts.len() == 3 {
                let task = parts[0];
                mapper.define_node(task);
                if !section.is_empty() {
                    mapper.set_aux(&format!("section:{task}"), &section);
                }
                for actor in parts[2].split(',').map(str::trim).filter(|a| !a.is_empty()) {
                    mapper.add_edge(task, actor, Some("actor"));
                }
            }
        }
        Ok(RawAst::Generic)
    }
}
