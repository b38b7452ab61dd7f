//! Link graph wrapper using petgraph::StableDiGraph keyed by declared ids

use crate::error::TrellisError;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

/// Sentinel id for the navigation root. Trace-to walks and reachability
/// both terminate here.
pub const ROOT_ID: &str = "ROOT";

/// Per-node metadata carried alongside the id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMeta {
    pub classification: Option<String>,
    /// True when the node is a file's declared root entity rather than a
    /// sub-entity or an id only seen inside diagram bodies.
    pub is_file_root: bool,
    /// True when the node belongs to a generated navigation asset rather
    /// than a file on disk. Ownership checks skip these parents.
    pub synthetic: bool,
}

#[derive(Debug, Clone)]
struct LinkNode {
    id: String,
    meta: NodeMeta,
}

/// The global traceability graph. One directed edge child→parent backs both
/// the uplink view (outgoing) and the downlink view (incoming), so the two
/// are symmetric by construction.
pub struct LinkGraph {
    inner: StableDiGraph<LinkNode, ()>,
    index: HashMap<String, NodeIndex>,
}

impl std::fmt::Debug for LinkGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkGraph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl LinkGraph {
    pub fn new() -> Self {
        let mut graph = LinkGraph {
            inner: StableDiGraph::new(),
            index: HashMap::new(),
        };
        graph.ensure_node(ROOT_ID);
        graph
    }

    /// Get or create the node for an id.
    pub fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.inner.add_node(LinkNode {
            id: id.to_string(),
            meta: NodeMeta::default(),
        });
        self.index.insert(id.to_string(), idx);
        idx
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn meta(&self, id: &str) -> Option<&NodeMeta> {
        self.index
            .get(id)
            .and_then(|&idx| self.inner.node_weight(idx))
            .map(|n| &n.meta)
    }

    pub fn set_meta(&mut self, id: &str, meta: NodeMeta) {
        let idx = self.ensure_node(id);
        if let Some(node) = self.inner.node_weight_mut(idx) {
            node.meta = meta;
        }
    }

    /// True when the id belongs to a generated navigation asset.
    pub fn is_synthetic(&self, id: &str) -> bool {
        self.meta(id).map(|m| m.synthetic).unwrap_or(false)
    }

    /// Record that `child` uplinks to `parent`. Creates both endpoints,
    /// rejects self-references, and deduplicates repeated declarations.
    pub fn link(&mut self, child: &str, parent: &str) -> Result<(), TrellisError> {
        if child == parent {
            return Err(TrellisError::GraphIntegrity(format!(
                "self-referential link on '{child}'"
            )));
        }
        let child_idx = self.ensure_node(child);
        let parent_idx = self.ensure_node(parent);
        if !self.inner.contains_edge(child_idx, parent_idx) {
            self.inner.add_edge(child_idx, parent_idx, ());
        }
        Ok(())
    }

    /// Ids the given node declares as parents, in insertion order.
    pub fn uplinks_of(&self, id: &str) -> Vec<String> {
        self.neighbor_ids(id, Direction::Outgoing)
    }

    /// Ids that declare the given node as a parent, in insertion order.
    pub fn downlinks_of(&self, id: &str) -> Vec<String> {
        self.neighbor_ids(id, Direction::Incoming)
    }

    fn neighbor_ids(&self, id: &str, dir: Direction) -> Vec<String> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self.inner.edges_directed(idx, dir).collect();
        // StableDiGraph iterates newest edge first; restore insertion order.
        edges.reverse();
        edges
            .into_iter()
            .filter_map(|e| {
                let other = if dir == Direction::Outgoing {
                    e.target()
                } else {
                    e.source()
                };
                self.inner.node_weight(other).map(|n| n.id.clone())
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn all_ids(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(|s| s.as_str())
    }

    /// Breadth-first reachability from a start id, following edges in both
    /// directions. Feeds the no-orphan policy.
    pub fn reachable_from(&self, start: &str) -> HashSet<String> {
        let mut reached = HashSet::new();
        let Some(&start_idx) = self.index.get(start) else {
            return reached;
        };
        let mut queue = VecDeque::new();
        reached.insert(start.to_string());
        queue.push_back(start_idx);
        while let Some(idx) = queue.pop_front() {
            for dir in [Direction::Outgoing, Direction::Incoming] {
                for edge in self.inner.edges_directed(idx, dir) {
                    let other = if dir == Direction::Outgoing {
                        edge.target()
                    } else {
                        edge.source()
                    };
                    if let Some(node) = self.inner.node_weight(other) {
                        if reached.insert(node.id.clone()) {
                            queue.push_back(other);
                        }
                    }
                }
            }
        }
        reached
    }

    /// Walk uplinks from `start`, cycle-guarded, until a node satisfying
    /// `pred` or the root sentinel is reached.
    pub fn trace_up(&self, start: &str, pred: impl Fn(&str) -> bool) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![start.to_string()];
        while let Some(id) = stack.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            if id != start && (id == ROOT_ID || pred(&id)) {
                return true;
            }
            stack.extend(self.uplinks_of(&id));
        }
        false
    }
}

impl Default for LinkGraph {
    fn default() -> Self {
        Self::new()
    }
}
