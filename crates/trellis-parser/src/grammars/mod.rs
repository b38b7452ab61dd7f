//! Per-kind diagram grammars behind a fixed, statically-typed trait
//!
//! Each grammar is a line-oriented automaton for one diagram notation,
//! selected through an enum-keyed table. Grammars only extract nodes and
//! edges; full notation semantics are out of scope.

pub mod class_diagram;
pub mod er;
pub mod flowchart;
pub mod journey;
pub mod mindmap;
pub mod requirement;
pub mod sequence;
pub mod state;

use crate::mapper::IntentMapper;
use serde::Serialize;
use std::collections::HashMap;
use trellis_core::{DiagramKind, ParseIssue};

/// Kind-specific raw structure kept for the secondary normalization pass.
/// Serialized only as a sanitized debugging echo, never consumed outside
/// the parser.
#[derive(Debug, Clone, Serialize)]
pub enum RawAst {
    Sequence {
        participants: Vec<String>,
        messages: Vec<RawMessage>,
    },
    State {
        states: Vec<String>,
        transitions: Vec<RawTransition>,
    },
    Generic,
}

#[derive(Debug, Clone, Serialize)]
pub struct RawMessage {
    pub from: String,
    pub to: String,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RawTransition {
    pub from: String,
    pub to: String,
    pub event: Option<String>,
}

pub trait DiagramGrammar: Send + Sync {
    fn kind(&self) -> DiagramKind;

    /// Run the automaton over the cleaned diagram text, writing nodes and
    /// edges into the injected mapper. Returns the kind-specific raw
    /// structure for the secondary pass.
    fn parse(&self, text: &str, mapper: &mut IntentMapper) -> Result<RawAst, ParseIssue>;
}

/// Grammar that records nothing. Terminal fallthrough for unrecognized
/// kinds — an unknown diagram is an empty result, not an error.
pub struct NoopGrammar;

impl DiagramGrammar for NoopGrammar {
    fn kind(&self) -> DiagramKind {
        DiagramKind::Unknown
    }

    fn parse(&self, _text: &str, _mapper: &mut IntentMapper) -> Result<RawAst, ParseIssue> {
        Ok(RawAst::Generic)
    }
}

/// One pre-built automaton per kind. Each pool worker owns its own table;
/// there is no shared mutable parser state across workers.
pub struct GrammarTable {
    grammars: HashMap<DiagramKind, Box<dyn DiagramGrammar>>,
    noop: NoopGrammar,
}

impl GrammarTable {
    pub fn new() -> Self {
        let mut grammars: HashMap<DiagramKind, Box<dyn DiagramGrammar>> = HashMap::new();
        grammars.insert(
            DiagramKind::Flowchart,
            Box::new(flowchart::FlowchartGrammar),
        );
        grammars.insert(DiagramKind::Sequence, Box::new(sequence::SequenceGrammar));
        grammars.insert(DiagramKind::Class, Box::new(class_diagram::ClassGrammar));
        grammars.insert(DiagramKind::State, Box::new(state::StateGrammar));
        grammars.insert(DiagramKind::Er, Box::new(er::ErGrammar));
        grammars.insert(
            DiagramKind::Requirement,
            Box::new(requirement::RequirementGrammar),
        );
        grammars.insert(DiagramKind::Mindmap, Box::new(mindmap::MindmapGrammar));
        grammars.insert(DiagramKind::Journey, Box::new(journey::JourneyGrammar));
        GrammarTable {
            grammars,
            noop: NoopGrammar,
        }
    }

    pub fn grammar_for(&self, kind: DiagramKind) -> &dyn DiagramGrammar {
        self.grammars
            .get(&kind)
            .map(|g| g.as_ref())
            .unwrap_or(&self.noop)
    }
}

impl Default for GrammarTable {
    fn default() -> Self {
        Self::new()
    }
}

/// The first token of the first non-empty, non-comment line.
pub fn first_significant_token(text: &str) -> Option<&str> {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with("%%"))
        .and_then(|l| l.split_whitespace().next())
}

/// Leading identifier characters of a segment, used to reduce decorated
/// node references (`A[Label]`, `B(Text)`) to their ids.
pub(crate) fn leading_ident(segment: &str) -> Option<&str> {
    let trimmed = segment.trim();
    let end = trimmed
        .char_indices()
        .find(|(_, c)| !c.is_ascii_alphanumeric() && *c != '_' && *c != '-')
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    if end == 0 {
        None
    } else {
        Some(&trimmed[..end])
    }
}
