//! Intent mapper — the semantic-action context a grammar writes into
//!
//! Decouples grammar mechanics from the canonical output shape: grammars
//! call `add_node`/`define_node`/`add_edge`/`set_aux` as they recognize
//! constructs, and the accumulated lists become the analysis. A fresh
//! mapper is injected per parse call; no state survives between files.

use std::collections::{BTreeMap, HashSet};
use trellis_core::Relationship;

#[derive(Debug, Default)]
pub struct IntentMapper {
    nodes: Vec<String>,
    seen_nodes: HashSet<String>,
    defined: Vec<String>,
    seen_defined: HashSet<String>,
    relationships: Vec<Relationship>,
    aux: BTreeMap<String, String>,
}

impl IntentMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node id. Idempotent, order-preserving.
    pub fn add_node(&mut self, id: &str) {
        let id = id.trim();
        if id.is_empty() {
            return;
        }
        if self.seen_nodes.insert(id.to_string()) {
            self.nodes.push(id.to_string());
        }
    }

    /// Register a node that carries an explicit definition in the diagram
    /// body, as opposed to one only referenced as an edge endpoint.
    pub fn define_node(&mut self, id: &str) {
        self.add_node(id);
        let id = id.trim();
        if !id.is_empty() && self.seen_defined.insert(id.to_string()) {
            self.defined.push(id.to_string());
        }
    }

    /// Record a relationship. Both endpoints become nodes.
    pub fn add_edge(&mut self, from: &str, to: &str, label: Option<&str>) {
        let (from, to) = (from.trim(), to.trim());
        if from.is_empty() || to.is_empty() {
            return;
        }
        self.add_node(from);
        self.add_node(to);
        self.relationships.push(Relationship {
            from: from.to_string(),
            to: to.to_string(),
            label: label.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
        });
    }

    pub fn set_aux(&mut self, key: &str, value: &str) {
        self.aux.insert(key.to_string(), value.to_string());
    }

    pub fn into_parts(
        self,
    ) -> (
        Vec<String>,
        Vec<String>,
        Vec<Relationship>,
        BTreeMap<String, String>,
    ) {
        (self.nodes, self.defined, self.relationships, self.aux)
    }
}
