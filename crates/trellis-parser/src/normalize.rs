//! Secondary normalization pass
//!
//! Sequence and state grammars park their results in the kind-specific raw
//! structure, which the generic node/edge collector cannot see. This pass
//! recovers participants/messages and states/transitions, then folds every
//! relationship endpoint into the node set so normalization is complete
//! for all kinds.

use crate::grammars::RawAst;
use crate::pool::ParsedDiagram;
use std::collections::HashSet;
use trellis_core::{Analysis, Relationship};

pub fn normalize(parsed: ParsedDiagram) -> Analysis {
    let ParsedDiagram {
        kind,
        mut nodes,
        mut defined_nodes,
        mut relationships,
        aux_mappings,
        raw,
    } = parsed;

    match &raw {
        RawAst::Sequence {
            participants,
            messages,
        } => {
            for p in participants {
                push_unique(&mut defined_nodes, p);
                push_unique(&mut nodes, p);
            }
            for m in messages {
                relationships.push(Relationship {
                    from: m.from.clone(),
                    to: m.to.clone(),
                    label: m.text.clone(),
                });
            }
        }
        RawAst::State { states, transitions } => {
            for s in states {
                push_unique(&mut defined_nodes, s);
                push_unique(&mut nodes, s);
            }
            for t in transitions {
                relationships.push(Relationship {
                    from: t.from.clone(),
                    to: t.to.clone(),
                    label: t.event.clone(),
                });
            }
        }
        RawAst::Generic => {}
    }

    // Implicit node discovery: endpoints referenced only by edges.
    let mut known: HashSet<String> = nodes.iter().cloned().collect();
    for rel in &relationships {
        for endpoint in [&rel.from, &rel.to] {
            if known.insert(endpoint.clone()) {
                nodes.push(endpoint.clone());
            }
        }
    }

    tracing::trace!(?kind, raw_echo = ?serde_json::to_string(&raw).ok(), "normalized diagram");

    Analysis {
        kind,
        nodes,
        defined_nodes,
        relationships,
        aux_mappings,
        validation_errors: Vec::new(),
        from_cache: false,
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}
