//! State diagram grammar
//!
//! States and transitions land in the raw structure; the secondary pass
//! recovers them. `[*]` start/end markers are not states and are dropped,
//! though the transition's real endpoint is still registered.

use super::{DiagramGrammar, RawAst, RawTransition};
use crate::mapper::IntentMapper;
use regex::Regex;
use std::sync::OnceLock;
use trellis_core::{DiagramKind, ParseIssue};

fn transition_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\[\*\]|[A-Za-z0-9_-]+)\s*-->\s*(\[\*\]|[A-Za-z0-9_-]+)\s*(?::\s*(.+))?$")
            .unwrap()
    })
}

pub struct StateGrammar;

impl DiagramGrammar for StateGrammar {
    fn kind(&self) -> DiagramKind {
        DiagramKind::State
    }

    fn parse(&self, text: &str, _mapper: &mut IntentMapper) -> Result<RawAst, ParseIssue> {
        let mut states: Vec<String> = Vec::new();
        let mut transitions = Vec::new();
        let mut push_state = |states: &mut Vec<String>, id: &str| {
            if id != "[*]" && !states.iter().any(|s| s == id) {
                states.push(id.to_string());
            }
        };

        for line in text.lines().skip(1) {
            let trimmed = line.trim().trim_end_matches('{').trim();
            if trimmed.is_empty() || trimmed == "}" || trimmed.starts_with("note") {
                continue;
            }

            if let Some(cap) = transition_re().captures(trimmed) {
                let (from, to) = (cap[1].to_string(), cap[2].to_string());
                push_state(&mut states, &from);
                push_state(&mut states, &to);
                if from != "[*]" && to != "[*]" {
                    transitions.push(RawTransition {
                        event: cap.get(3).map(|m| m.as_str().trim().to_string()),
                        from,
                        to,
                    });
                }
                continue;
            }

            // `state "description" as s2` or `state Composite`
            if let Some(rest) = trimmed.strip_prefix("state ") {
                let id = match rest.rsplit_once(" as ") {
                    Some((_, alias)) => alias.trim(),
                    None => rest.trim().trim_matches('"'),
                };
                push_state(&mut states, id);
            }
        }

        Ok(RawAst::State {
            states,
            transitions,
        })
    }
}
