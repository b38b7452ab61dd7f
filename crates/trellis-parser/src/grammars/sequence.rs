//! Sequence diagram grammar
//!
//! Participants and messages land in the raw structure only; the secondary
//! normalization pass recovers them into the canonical shape.

use super::{DiagramGrammar, RawAst, RawMessage};
use crate::mapper::IntentMapper;
use regex::Regex;
use std::sync::OnceLock;
use trellis_core::{DiagramKind, ParseIssue};

fn message_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // A->>B: text, A-->>B: text, A->B: text, A-)B: text, A-xB: text
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9_-]+)\s*(-{1,2}(?:>>|>|\)|x))\s*([A-Za-z0-9_-]+)\s*:\s*(.*)$")
            .unwrap()
    })
}

pub struct SequenceGrammar;

impl DiagramGrammar for SequenceGrammar {
    fn kind(&self) -> DiagramKind {
        DiagramKind::Sequence
    }

    fn parse(&self, text: &str, _mapper: &mut IntentMapper) -> Result<RawAst, ParseIssue> {
        let mut participants = Vec::new();
        let mut messages = Vec::new();

        for (lineno, line) in text.lines().enumerate().skip(1) {
            let trimmed = line.trim();
            if trimmed.is_empty() || is_control(trimmed) {
                continue;
            }

            if let Some(rest) = trimmed
                .strip_prefix("participant ")
                .or_else(|| trimmed.strip_prefix("actor "))
            {
                // `participant A as Alice` declares id A.
                let id = rest.split(" as ").next().unwrap_or(rest).trim();
                if id.is_empty() {
                    return Err(ParseIssue {
                        line: lineno + 1,
                        message: "participant declaration without an id".to_string(),
                    });
                }
                if !participants.contains(&id.to_string()) {
                    participants.push(id.to_string());
                }
                continue;
            }

            if let Some(cap) = message_re().captures(trimmed) {
                let text = cap[4].trim();
                messages.push(RawMessage {
                    from: cap[1].to_string(),
                    to: cap[3].to_string(),
                    text: (!text.is_empty()).then(|| text.to_string()),
                });
            }
        }

        Ok(RawAst::Sequence {
            participants,
            messages,
        })
    }
}

fn is_control(line: &str) -> bool {
    const CONTROL: &[&str] = &[
        "alt", "else", "opt", "loop", "par", "and", "end", "note", "Note", "activate",
        "deactivate", "autonumber", "rect", "box", "critical", "break",
    ];
    CONTROL
        .iter()
        .any(|c| line == *c || line.starts_with(&format!("{c} ")))
}
