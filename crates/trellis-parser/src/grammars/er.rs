//! Entity-relationship diagram grammar

use super::{leading_ident, DiagramGrammar, RawAst};
use crate::mapper::IntentMapper;
use regex::Regex;
use std::sync::OnceLock;
use trellis_core::{DiagramKind, ParseIssue};

fn relation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Crow's-foot relations: CUSTOMER ||--o{ ORDER : places
    RE.get_or_init(|| {
        Regex::new(
            r#"^([A-Za-z0-9_-]+)\s+[|}o][|o]?(?:--|\.\.)[|o][{|o]?\s+([A-Za-z0-9_-]+)\s*:\s*"?([^"]*)"?$"#,
        )
        .unwrap()
    })
}

pub struct ErGrammar;

impl DiagramGrammar for ErGrammar {
    fn kind(&self) -> DiagramKind {
        DiagramKind::Er
    }

    fn parse(&self, text: &str, mapper: &mut IntentMapper) -> Result<RawAst, ParseIssue> {
        let mut in_body = false;
        for line in text.lines().skip(1) {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if in_body {
                // Attribute rows inside an entity block.
                if trimmed == "}" {
                    in_body = false;
                }
                continue;
            }

            if let Some(cap) = relation_re().captures(trimmed) {
                let label = cap[3].trim();
                mapper.add_edge(&cap[1], &cap[2], (!label.is_empty()).then_some(label));
                continue;
            }

            // `CUSTOMER {` opens an attribute block and defines the entity.
            if trimmed.ends_with('{') {
                if let Some(id) = leading_ident(trimmed) {
                    mapper.define_node(id);
                }
                in_body = true;
            }
        }
        Ok(RawAst::Generic)
    }
}
