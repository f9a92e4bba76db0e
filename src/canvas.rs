use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
    Diamond,
    Cylinder,
}

impl ShapeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Ellipse => "ellipse",
            ShapeKind::Diamond => "diamond",
            ShapeKind::Cylinder => "cylinder",
        }
    }

    pub fn default_fill_color(&self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "#fde68a",
            ShapeKind::Ellipse => "#c4f1f9",
            ShapeKind::Diamond => "#fbcfe8",
            ShapeKind::Cylinder => "#e9d8fd",
        }
    }
}

/// Per-kind node payload. Each variant carries only the fields that make
/// sense for that kind of element, dispatched on the serialized `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodePayload {
    Shape {
        shape: ShapeKind,
        label: String,
        color: String,
        #[serde(default)]
        editing: bool,
    },
    Image {
        source: String,
    },
    Note {
        text: String,
        color: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Shape,
    Image,
    Note,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Shape => "shape",
            NodeKind::Image => "image",
            NodeKind::Note => "note",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub position: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    pub payload: NodePayload,
    #[serde(default)]
    pub selected: bool,
}

impl Node {
    pub fn shape(label: impl Into<String>, shape: ShapeKind, position: Point) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            position,
            size: None,
            payload: NodePayload::Shape {
                shape,
                label: label.into(),
                color: shape.default_fill_color().to_string(),
                editing: false,
            },
            selected: false,
        }
    }

    pub fn image(source: impl Into<String>, position: Point) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            position,
            size: None,
            payload: NodePayload::Image {
                source: source.into(),
            },
            selected: false,
        }
    }

    pub fn note(text: impl Into<String>, position: Point) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            position,
            size: None,
            payload: NodePayload::Note {
                text: text.into(),
                color: "#fef9c3".to_string(),
            },
            selected: false,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self.payload {
            NodePayload::Shape { .. } => NodeKind::Shape,
            NodePayload::Image { .. } => NodeKind::Image,
            NodePayload::Note { .. } => NodeKind::Note,
        }
    }

    /// Label text for shapes, note text for notes. Images carry no text.
    pub fn label(&self) -> Option<&str> {
        match &self.payload {
            NodePayload::Shape { label, .. } => Some(label),
            NodePayload::Note { text, .. } => Some(text),
            NodePayload::Image { .. } => None,
        }
    }

    pub fn set_label(&mut self, value: &str) {
        match &mut self.payload {
            NodePayload::Shape { label, .. } => *label = value.to_string(),
            NodePayload::Note { text, .. } => *text = value.to_string(),
            NodePayload::Image { .. } => {}
        }
    }

    pub fn set_color(&mut self, value: &str) {
        match &mut self.payload {
            NodePayload::Shape { color, .. } => *color = value.to_string(),
            NodePayload::Note { color, .. } => *color = value.to_string(),
            NodePayload::Image { .. } => {}
        }
    }

    pub fn set_shape(&mut self, value: ShapeKind) {
        if let NodePayload::Shape { shape, .. } = &mut self.payload {
            *shape = value;
        }
    }

    pub fn set_editing(&mut self, value: bool) {
        if let NodePayload::Shape { editing, .. } = &mut self.payload {
            *editing = value;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    #[default]
    Default,
    Straight,
    Step,
    Smoothstep,
    Labelled,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Default => "default",
            EdgeKind::Straight => "straight",
            EdgeKind::Step => "step",
            EdgeKind::Smoothstep => "smoothstep",
            EdgeKind::Labelled => "labelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default)]
    pub kind: EdgeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub selected: bool,
}

impl Edge {
    pub fn between(source: impl Into<String>, target: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            kind,
            label: None,
            selected: false,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CanvasError {
    #[error("canvas has no node '{0}'")]
    UnknownNode(String),
    #[error("canvas has no edge '{0}'")]
    UnknownEdge(String),
}

/// Live node/edge state for one view. Order of insertion is preserved so
/// z-ordering and serialized output stay stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|edge| edge.id == id)
    }

    pub fn edge_mut(&mut self, id: &str) -> Option<&mut Edge> {
        self.edges.iter_mut().find(|edge| edge.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn add_node(&mut self, node: Node) -> String {
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }

    /// Connects two existing nodes with a fresh edge and returns its
    /// identifier. Both endpoints must already be on the canvas.
    pub fn connect(
        &mut self,
        source: &str,
        target: &str,
        kind: EdgeKind,
    ) -> Result<String, CanvasError> {
        if !self.contains_node(source) {
            return Err(CanvasError::UnknownNode(source.to_string()));
        }
        if !self.contains_node(target) {
            return Err(CanvasError::UnknownNode(target.to_string()));
        }
        let edge = Edge::between(source, target, kind);
        let id = edge.id.clone();
        self.edges.push(edge);
        Ok(id)
    }

    /// Re-points an existing edge at new endpoints. `None` leaves the
    /// corresponding endpoint untouched.
    pub fn reconnect(
        &mut self,
        edge_id: &str,
        source: Option<&str>,
        target: Option<&str>,
    ) -> Result<(), CanvasError> {
        if let Some(id) = source {
            if !self.contains_node(id) {
                return Err(CanvasError::UnknownNode(id.to_string()));
            }
        }
        if let Some(id) = target {
            if !self.contains_node(id) {
                return Err(CanvasError::UnknownNode(id.to_string()));
            }
        }
        let edge = self
            .edge_mut(edge_id)
            .ok_or_else(|| CanvasError::UnknownEdge(edge_id.to_string()))?;
        if let Some(id) = source {
            edge.source = id.to_string();
            edge.source_handle = None;
        }
        if let Some(id) = target {
            edge.target = id.to_string();
            edge.target_handle = None;
        }
        Ok(())
    }

    pub fn set_position(&mut self, id: &str, position: Point) -> Result<(), CanvasError> {
        let node = self
            .node_mut(id)
            .ok_or_else(|| CanvasError::UnknownNode(id.to_string()))?;
        node.position = position;
        Ok(())
    }

    pub fn set_size(&mut self, id: &str, size: Size) -> Result<(), CanvasError> {
        let node = self
            .node_mut(id)
            .ok_or_else(|| CanvasError::UnknownNode(id.to_string()))?;
        node.size = Some(size);
        Ok(())
    }

    /// Removes a node and every edge touching it.
    pub fn remove_node(&mut self, node_id: &str) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|node| node.id != node_id);
        let existed = before != self.nodes.len();
        if existed {
            self.edges
                .retain(|edge| edge.source != node_id && edge.target != node_id);
        }
        existed
    }

    pub fn remove_edge(&mut self, edge_id: &str) -> bool {
        let before = self.edges.len();
        self.edges.retain(|edge| edge.id != edge_id);
        before != self.edges.len()
    }

    /// Removes every selected node and edge. Edges incident to a removed
    /// node go with it whether or not they were selected themselves.
    pub fn remove_selected(&mut self) -> (usize, usize) {
        let doomed: Vec<String> = self
            .nodes
            .iter()
            .filter(|node| node.selected)
            .map(|node| node.id.clone())
            .collect();

        let edges_before = self.edges.len();
        self.edges.retain(|edge| {
            !edge.selected && !doomed.contains(&edge.source) && !doomed.contains(&edge.target)
        });
        let nodes_before = self.nodes.len();
        self.nodes.retain(|node| !node.selected);

        (
            nodes_before - self.nodes.len(),
            edges_before - self.edges.len(),
        )
    }

    pub fn set_node_selected(&mut self, id: &str, selected: bool) -> Result<(), CanvasError> {
        let node = self
            .node_mut(id)
            .ok_or_else(|| CanvasError::UnknownNode(id.to_string()))?;
        node.selected = selected;
        Ok(())
    }

    pub fn set_edge_selected(&mut self, id: &str, selected: bool) -> Result<(), CanvasError> {
        let edge = self
            .edge_mut(id)
            .ok_or_else(|| CanvasError::UnknownEdge(id.to_string()))?;
        edge.selected = selected;
        Ok(())
    }

    pub fn deselect_all(&mut self) {
        for node in &mut self.nodes {
            node.selected = false;
        }
        for edge in &mut self.edges {
            edge.selected = false;
        }
    }

    pub fn selected_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|node| node.selected)
    }

    pub fn selected_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|edge| edge.selected)
    }

    pub fn selection_is_empty(&self) -> bool {
        self.selected_nodes().next().is_none() && self.selected_edges().next().is_none()
    }
}
