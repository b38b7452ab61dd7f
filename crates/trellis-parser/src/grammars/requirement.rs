//! Requirement diagram grammar
//!
//! Recognizes `requirement`/`element` blocks (all requirement variants)
//! and `src - verb -> dst` relations. Element types are recorded in the
//! aux mappings so governance and the repair pass can distinguish declared
//! elements from dangling references.

use super::{DiagramGrammar, RawAst};
use crate::mapper::IntentMapper;
use regex::Regex;
use std::sync::OnceLock;
use trellis_core::{DiagramKind, ParseIssue};

const REQUIREMENT_BLOCKS: &[&str] = &[
    "requirement",
    "functionalRequirement",
    "interfaceRequirement",
    "performanceRequirement",
    "physicalRequirement",
    "designConstraint",
];

fn relation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // test_entity - satisfies -> test_req
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9_-]+)\s*-\s*([A-Za-z]+)\s*->\s*([A-Za-z0-9_-]+)$").unwrap()
    })
}

pub struct RequirementGrammar;

impl DiagramGrammar for RequirementGrammar {
    fn kind(&self) -> DiagramKind {
        DiagramKind::Requirement
    }

    fn parse(&self, text: &str, mapper: &mut IntentMapper) -> Result<RawAst, ParseIssue> {
        let mut block: Option<String> = None;
        for (lineno, line) in text.lines().enumerate().skip(1) {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(name) = block.clone() {
                if trimmed == "}" {
                    block = None;
                } else if let Some((key, value)) = trimmed.split_once(':') {
                    if key.trim() == "type" {
                        let value = value.trim().trim_matches('"');
                        mapper.set_aux(&format!("element:{name}"), value);
                    }
                }
                continue;
            }

            if let Some(cap) = relation_re().captures(trimmed) {
                mapper.add_edge(&cap[1], &cap[3], Some(&cap[2]));
                continue;
            }

            if let Some((keyword, rest)) = trimmed.split_once(' ') {
                let is_req = REQUIREMENT_BLOCKS.contains(&keyword);
                if is_req || keyword == "element" {
                    let name = rest.trim().trim_end_matches('{').trim();
                    if name.is_empty() {
                        return Err(ParseIssue {
                            line: lineno + 1,
                            message: format!("{keyword} block without a name"),
                        });
                    }
                    mapper.define_node(name);
                    if is_req {
                        mapper.set_aux(&format!("requirement:{name}"), keyword);
                    }
                    if trimmed.ends_with('{') {
                        block = Some(name.to_string());
                    }
                }
            }
        }
        Ok(RawAst::Generic)
    }
}
