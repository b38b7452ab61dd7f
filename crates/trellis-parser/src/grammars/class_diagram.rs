//! Class diagram grammar

use super::{leading_ident, DiagramGrammar, RawAst};
use crate::mapper::IntentMapper;
use regex::Regex;
use std::sync::OnceLock;
use trellis_core::{DiagramKind, ParseIssue};

fn relation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // A <|-- B, A *-- B, A o-- B, A --> B, A ..> B, A -- B, with optional
    // `: label` suffix.
    RE.get_or_init(|| {
        Regex::new(
            r"^([A-Za-z0-9_-]+)\s*(<\|--|\*--|o--|--\|>|--\*|--o|-->|\.\.>|\.\.\|>|--)\s*([A-Za-z0-9_-]+)\s*(?::\s*(.+))?$",
        )
        .unwrap()
    })
}

pub struct ClassGrammar;

impl DiagramGrammar for ClassGrammar {
    fn kind(&self) -> DiagramKind {
        DiagramKind::Class
    }

    fn parse(&self, text: &str, mapper: &mut IntentMapper) -> Result<RawAst, ParseIssue> {
        let mut in_body = false;
        for line in text.lines().skip(1) {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if in_body {
                // Members are not nodes; skip until the block closes.
                if trimmed.ends_with('}') {
                    in_body = false;
                }
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("class ") {
                if let Some(id) = leading_ident(rest) {
                    mapper.define_node(id);
                }
                if rest.trim_end().ends_with('{') {
                    in_body = true;
                }
                continue;
            }

            if let Some(cap) = relation_re().captures(trimmed) {
                mapper.add_edge(&cap[1], &cap[3], cap.get(4).map(|m| m.as_str()));
            }
        }
        Ok(RawAst::Generic)
    }
}
