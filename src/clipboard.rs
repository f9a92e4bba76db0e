use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::canvas::{Canvas, Edge, Node};

/// Visual offset applied to pasted copies so they do not land exactly on
/// top of the originals.
pub const PASTE_OFFSET: f32 = 50.0;

/// Transient copy of the current selection. Never persisted; lives only
/// as long as the editing session.
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the buffer with the selected nodes, the selected edges,
    /// and every edge running between two copied nodes — copying a
    /// connected subgraph carries its internal wiring whether or not the
    /// edges were selected themselves. An explicitly selected edge can
    /// still be copied without its endpoints, in which case paste drops
    /// it.
    pub fn copy(&mut self, canvas: &Canvas) {
        self.nodes = canvas.selected_nodes().cloned().collect();
        let copied: HashSet<&str> = self.nodes.iter().map(|node| node.id.as_str()).collect();
        self.edges = canvas
            .edges
            .iter()
            .filter(|edge| {
                edge.selected
                    || (copied.contains(edge.source.as_str())
                        && copied.contains(edge.target.as_str()))
            })
            .cloned()
            .collect();
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    /// Builds paste-ready copies: every node gets a fresh identifier and
    /// an offset position, edges are relinked through the remap, and
    /// edges whose endpoints were not part of the copied node set are
    /// dropped. All copies come back selected and out of edit mode.
    pub fn materialize(&self) -> (Vec<Node>, Vec<Edge>) {
        let mut remap: HashMap<String, String> = HashMap::with_capacity(self.nodes.len());

        let nodes: Vec<Node> = self
            .nodes
            .iter()
            .map(|node| {
                let fresh = Uuid::new_v4().to_string();
                remap.insert(node.id.clone(), fresh.clone());
                let mut copy = node.clone();
                copy.id = fresh;
                copy.position.x += PASTE_OFFSET;
                copy.position.y += PASTE_OFFSET;
                copy.selected = true;
                copy.set_editing(false);
                copy
            })
            .collect();

        let edges: Vec<Edge> = self
            .edges
            .iter()
            .filter_map(|edge| {
                let source = remap.get(&edge.source)?.clone();
                let target = remap.get(&edge.target)?.clone();
                let mut copy = edge.clone();
                copy.id = Uuid::new_v4().to_string();
                copy.source = source;
                copy.target = target;
                copy.selected = true;
                Some(copy)
            })
            .collect();

        (nodes, edges)
    }
}
