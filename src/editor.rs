use std::time::{Duration, Instant};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::canvas::{Canvas, CanvasError, Edge, EdgeKind, Node, Point, ShapeKind, Size};
use crate::clipboard::Clipboard;
use crate::history::{History, Snapshot};

/// Quiet period after the last settled mutation before the canvas is
/// handed to the persistence collaborator.
pub const AUTOSAVE_QUIET: Duration = Duration::from_millis(1000);

/// Where a freshly pasted image node lands.
pub const IMAGE_PASTE_POSITION: Point = Point { x: 120.0, y: 120.0 };

/// The editor's two pseudo-states. `Restoring` covers the window between
/// an undo/redo state replacement and the host's `settle` call; while it
/// is active, checkpoints are suppressed so the replacement itself is
/// never recorded as a new action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Restoring,
}

type ChangeListener = Box<dyn FnMut(&Canvas) + Send>;

/// One editing session over one view: live canvas state, its snapshot
/// history, a clipboard, and the autosave debounce clock.
///
/// Every mutating operation takes a checkpoint of the state as it was
/// immediately before the mutation. Continuous gestures (dragging,
/// resizing) checkpoint once at `begin_gesture`, not per frame.
pub struct Editor {
    canvas: Canvas,
    history: History,
    clipboard: Clipboard,
    phase: Phase,
    gesture_active: bool,
    dirty_since: Option<Instant>,
    listener: Option<ChangeListener>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        let canvas = Canvas::new();
        let mut history = History::new();
        history.reset(&canvas);
        Self {
            canvas,
            history,
            clipboard: Clipboard::new(),
            phase: Phase::Idle,
            gesture_active: false,
            dirty_since: None,
            listener: None,
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Registers a callback observing every state replacement (undo,
    /// redo, view load). The callback runs while the `Restoring` guard
    /// is still up, so anything it triggers cannot corrupt history.
    pub fn set_on_change(&mut self, listener: impl FnMut(&Canvas) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    fn notify(&mut self) {
        if let Some(listener) = self.listener.as_mut() {
            listener(&self.canvas);
        }
    }

    /// Records the current state as the undo point for the mutation
    /// about to happen. Suppressed while a restore is in flight.
    fn checkpoint(&mut self) {
        if self.phase == Phase::Restoring {
            return;
        }
        self.history.capture(&self.canvas);
    }

    fn mark_dirty(&mut self) {
        self.dirty_since = Some(Instant::now());
    }

    // ---- mutations -----------------------------------------------------

    pub fn add_node(&mut self, node: Node) -> String {
        self.checkpoint();
        let id = self.canvas.add_node(node);
        self.mark_dirty();
        id
    }

    pub fn connect(
        &mut self,
        source: &str,
        target: &str,
        kind: EdgeKind,
    ) -> Result<String, CanvasError> {
        if !self.canvas.contains_node(source) {
            return Err(CanvasError::UnknownNode(source.to_string()));
        }
        if !self.canvas.contains_node(target) {
            return Err(CanvasError::UnknownNode(target.to_string()));
        }
        self.checkpoint();
        let id = self.canvas.connect(source, target, kind)?;
        self.mark_dirty();
        Ok(id)
    }

    pub fn reconnect(
        &mut self,
        edge_id: &str,
        source: Option<&str>,
        target: Option<&str>,
    ) -> Result<(), CanvasError> {
        if self.canvas.edge(edge_id).is_none() {
            return Err(CanvasError::UnknownEdge(edge_id.to_string()));
        }
        for endpoint in [source, target].into_iter().flatten() {
            if !self.canvas.contains_node(endpoint) {
                return Err(CanvasError::UnknownNode(endpoint.to_string()));
            }
        }
        self.checkpoint();
        self.canvas.reconnect(edge_id, source, target)?;
        self.mark_dirty();
        Ok(())
    }

    pub fn set_edge_kind(&mut self, edge_id: &str, kind: EdgeKind) -> Result<(), CanvasError> {
        if self.canvas.edge(edge_id).is_none() {
            return Err(CanvasError::UnknownEdge(edge_id.to_string()));
        }
        self.checkpoint();
        if let Some(edge) = self.canvas.edge_mut(edge_id) {
            edge.kind = kind;
        }
        self.mark_dirty();
        Ok(())
    }

    pub fn set_edge_label(
        &mut self,
        edge_id: &str,
        label: Option<&str>,
    ) -> Result<(), CanvasError> {
        if self.canvas.edge(edge_id).is_none() {
            return Err(CanvasError::UnknownEdge(edge_id.to_string()));
        }
        self.checkpoint();
        if let Some(edge) = self.canvas.edge_mut(edge_id) {
            edge.label = label.map(str::to_string);
        }
        self.mark_dirty();
        Ok(())
    }

    pub fn set_label(&mut self, id: &str, label: &str) -> Result<(), CanvasError> {
        if !self.canvas.contains_node(id) {
            return Err(CanvasError::UnknownNode(id.to_string()));
        }
        self.checkpoint();
        if let Some(node) = self.canvas.node_mut(id) {
            node.set_label(label);
        }
        self.mark_dirty();
        Ok(())
    }

    pub fn set_color(&mut self, id: &str, color: &str) -> Result<(), CanvasError> {
        if !self.canvas.contains_node(id) {
            return Err(CanvasError::UnknownNode(id.to_string()));
        }
        self.checkpoint();
        if let Some(node) = self.canvas.node_mut(id) {
            node.set_color(color);
        }
        self.mark_dirty();
        Ok(())
    }

    pub fn set_shape(&mut self, id: &str, shape: ShapeKind) -> Result<(), CanvasError> {
        if !self.canvas.contains_node(id) {
            return Err(CanvasError::UnknownNode(id.to_string()));
        }
        self.checkpoint();
        if let Some(node) = self.canvas.node_mut(id) {
            node.set_shape(shape);
        }
        self.mark_dirty();
        Ok(())
    }

    /// Changes one property on every selected node in a single undoable
    /// step. Does nothing when the selection is empty.
    pub fn set_selection_color(&mut self, color: &str) -> usize {
        if self.canvas.selected_nodes().next().is_none() {
            return 0;
        }
        self.checkpoint();
        let mut changed = 0;
        for node in self.canvas.nodes.iter_mut().filter(|node| node.selected) {
            node.set_color(color);
            changed += 1;
        }
        self.mark_dirty();
        changed
    }

    pub fn set_selection_shape(&mut self, shape: ShapeKind) -> usize {
        if self.canvas.selected_nodes().next().is_none() {
            return 0;
        }
        self.checkpoint();
        let mut changed = 0;
        for node in self.canvas.nodes.iter_mut().filter(|node| node.selected) {
            node.set_shape(shape);
            changed += 1;
        }
        self.mark_dirty();
        changed
    }

    /// The editing flag is transient UI state; toggling it is not an
    /// undoable action.
    pub fn set_editing(&mut self, id: &str, editing: bool) -> Result<(), CanvasError> {
        let node = self
            .canvas
            .node_mut(id)
            .ok_or_else(|| CanvasError::UnknownNode(id.to_string()))?;
        node.set_editing(editing);
        Ok(())
    }

    pub fn delete_node(&mut self, id: &str) -> bool {
        if !self.canvas.contains_node(id) {
            return false;
        }
        self.checkpoint();
        let removed = self.canvas.remove_node(id);
        self.mark_dirty();
        removed
    }

    pub fn delete_selection(&mut self) -> (usize, usize) {
        if self.canvas.selection_is_empty() {
            return (0, 0);
        }
        self.checkpoint();
        let removed = self.canvas.remove_selected();
        self.mark_dirty();
        removed
    }

    // ---- gestures ------------------------------------------------------

    /// Checkpoints once at the start of a continuous move/resize gesture.
    /// Intermediate `drag_to`/`resize_to` frames do not capture.
    pub fn begin_gesture(&mut self) {
        if self.gesture_active {
            return;
        }
        self.checkpoint();
        self.gesture_active = true;
    }

    pub fn drag_to(&mut self, id: &str, position: Point) -> Result<(), CanvasError> {
        self.canvas.set_position(id, position)
    }

    pub fn resize_to(&mut self, id: &str, size: Size) -> Result<(), CanvasError> {
        self.canvas.set_size(id, size)
    }

    pub fn end_gesture(&mut self) {
        if self.gesture_active {
            self.gesture_active = false;
            self.mark_dirty();
        }
    }

    // ---- selection (not undoable) --------------------------------------

    pub fn set_node_selected(&mut self, id: &str, selected: bool) -> Result<(), CanvasError> {
        self.canvas.set_node_selected(id, selected)
    }

    pub fn set_edge_selected(&mut self, id: &str, selected: bool) -> Result<(), CanvasError> {
        self.canvas.set_edge_selected(id, selected)
    }

    pub fn deselect_all(&mut self) {
        self.canvas.deselect_all();
    }

    // ---- clipboard -----------------------------------------------------

    pub fn copy_selection(&mut self) {
        self.clipboard.copy(&self.canvas);
    }

    pub fn clipboard_is_empty(&self) -> bool {
        self.clipboard.is_empty()
    }

    /// Pastes the buffered subset with remapped identifiers. The copies
    /// replace the current selection. A no-op with an empty buffer.
    pub fn paste(&mut self) -> bool {
        if self.clipboard.is_empty() {
            return false;
        }
        self.checkpoint();
        let (nodes, edges) = self.clipboard.materialize();
        self.canvas.deselect_all();
        self.canvas.nodes.extend(nodes);
        self.canvas.edges.extend(edges);
        self.mark_dirty();
        true
    }

    /// Creates an image node from pasted bitmap bytes, wrapped in its own
    /// checkpoint. The new node becomes the sole selection.
    pub fn paste_image(&mut self, mime_type: &str, bytes: &[u8]) -> String {
        self.checkpoint();
        let source = format!("data:{};base64,{}", mime_type, BASE64.encode(bytes));
        let mut node = Node::image(source, IMAGE_PASTE_POSITION);
        node.selected = true;
        self.canvas.deselect_all();
        let id = self.canvas.add_node(node);
        self.mark_dirty();
        id
    }

    // ---- undo/redo -----------------------------------------------------

    /// Steps history back one position and replaces the live state with
    /// the snapshot there. If the live state has moved past the last
    /// checkpoint, it is stashed first so `redo` can return to it. The
    /// `Restoring` guard stays up until `settle` is called.
    pub fn undo(&mut self) -> bool {
        if !self.history.can_undo() {
            return false;
        }
        if self.live_is_ahead() {
            self.history.stash(Snapshot::of(&self.canvas));
        }
        self.phase = Phase::Restoring;
        let snapshot = self.history.step_back();
        snapshot.apply_to(&mut self.canvas);
        self.mark_dirty();
        self.notify();
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.history.can_redo() {
            return false;
        }
        self.phase = Phase::Restoring;
        let snapshot = self.history.step_forward();
        snapshot.apply_to(&mut self.canvas);
        self.mark_dirty();
        self.notify();
        true
    }

    /// Releases the `Restoring` guard. Hosts call this from their
    /// after-render hook, once the state replacement has been fully
    /// applied and observed.
    pub fn settle(&mut self) {
        self.phase = Phase::Idle;
    }

    fn live_is_ahead(&self) -> bool {
        Snapshot::of(&self.canvas) != self.history.current()
    }

    // ---- view lifecycle ------------------------------------------------

    /// Replaces the whole canvas with a loaded view payload and resets
    /// history to a singleton snapshot of it. Undo cannot cross a view
    /// switch.
    pub fn load_view(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) {
        self.canvas = Canvas { nodes, edges };
        self.history.reset(&self.canvas);
        self.phase = Phase::Idle;
        self.gesture_active = false;
        self.dirty_since = None;
        self.notify();
    }

    // ---- autosave ------------------------------------------------------

    pub fn is_dirty(&self) -> bool {
        self.dirty_since.is_some()
    }

    /// True once the quiet period has elapsed since the last mutation.
    pub fn autosave_due(&self, now: Instant) -> bool {
        match self.dirty_since {
            Some(since) => now.duration_since(since) >= AUTOSAVE_QUIET,
            None => false,
        }
    }

    /// Hands out the current state for persistence and clears the dirty
    /// flag. The editor has no knowledge of whether the save succeeds.
    pub fn take_save_payload(&mut self) -> Option<Snapshot> {
        self.dirty_since.take()?;
        Some(Snapshot::of(&self.canvas))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape_at(label: &str, x: f32) -> Node {
        Node::shape(label, ShapeKind::Rectangle, Point::new(x, 0.0))
    }

    #[test]
    fn undo_then_redo_round_trips_the_live_state() {
        let mut editor = Editor::new();
        editor.add_node(shape_at("a", 0.0));
        editor.add_node(shape_at("b", 100.0));
        let before = editor.canvas().clone();

        assert!(editor.undo());
        editor.settle();
        assert_eq!(editor.canvas().nodes.len(), 1);

        assert!(editor.redo());
        editor.settle();
        assert_eq!(editor.canvas(), &before);
    }

    #[test]
    fn undoing_every_add_returns_to_the_empty_canvas() {
        let mut editor = Editor::new();
        editor.add_node(shape_at("a", 0.0));
        editor.add_node(shape_at("b", 100.0));

        assert!(editor.undo());
        editor.settle();
        assert!(editor.undo());
        editor.settle();
        assert!(editor.canvas().is_empty());

        // Earlier duplicate captures of the empty state may remain, but
        // the canvas never goes further back than empty.
        while editor.undo() {
            editor.settle();
            assert!(editor.canvas().is_empty());
        }
    }

    #[test]
    fn checkpoints_are_suppressed_until_settle() {
        let mut editor = Editor::new();
        editor.add_node(shape_at("a", 0.0));
        editor.undo();
        assert_eq!(editor.phase(), Phase::Restoring);

        let depth = editor.history().len();
        // A re-entrant mutation observed during the restore window must
        // not capture.
        editor.add_node(shape_at("stray", 50.0));
        assert_eq!(editor.history().len(), depth);

        editor.settle();
        assert_eq!(editor.phase(), Phase::Idle);
        // Checkpoints flow again: the next mutation captures the state
        // as it stands (stray node included) and discards the redo
        // branch.
        editor.add_node(shape_at("b", 100.0));
        assert!(!editor.can_redo());
        assert_eq!(editor.history().current().nodes.len(), 1);
        assert_eq!(editor.canvas().nodes.len(), 2);
    }

    #[test]
    fn a_drag_gesture_checkpoints_exactly_once() {
        let mut editor = Editor::new();
        let id = editor.add_node(shape_at("a", 0.0));
        let depth = editor.history().len();

        editor.begin_gesture();
        for frame in 1..=20 {
            editor.drag_to(&id, Point::new(frame as f32 * 5.0, 0.0)).unwrap();
        }
        editor.end_gesture();

        assert_eq!(editor.history().len(), depth + 1);
        assert_eq!(editor.canvas().node(&id).unwrap().position.x, 100.0);

        editor.undo();
        editor.settle();
        assert_eq!(editor.canvas().node(&id).unwrap().position.x, 0.0);
    }

    #[test]
    fn selection_changes_are_not_undoable() {
        let mut editor = Editor::new();
        let id = editor.add_node(shape_at("a", 0.0));
        let depth = editor.history().len();

        editor.set_node_selected(&id, true).unwrap();
        editor.deselect_all();
        assert_eq!(editor.history().len(), depth);
    }

    #[test]
    fn undo_at_head_and_redo_at_tail_are_no_ops() {
        let mut editor = Editor::new();
        assert!(!editor.undo());
        assert!(!editor.redo());
        assert_eq!(editor.phase(), Phase::Idle);

        editor.add_node(shape_at("a", 0.0));
        assert!(!editor.redo());
    }

    #[test]
    fn paste_with_empty_buffer_is_a_no_op() {
        let mut editor = Editor::new();
        let depth = editor.history().len();
        assert!(!editor.paste());
        assert_eq!(editor.history().len(), depth);
        assert!(!editor.is_dirty());
    }

    #[test]
    fn image_paste_creates_a_selected_data_uri_node() {
        let mut editor = Editor::new();
        let id = editor.paste_image("image/png", b"\x89PNG\r\n\x1a\n");

        let node = editor.canvas().node(&id).unwrap();
        assert!(node.selected);
        assert_eq!(node.position, IMAGE_PASTE_POSITION);
        match &node.payload {
            crate::canvas::NodePayload::Image { source } => {
                assert!(source.starts_with("data:image/png;base64,"));
            }
            other => panic!("unexpected payload {other:?}"),
        }

        editor.undo();
        editor.settle();
        assert!(editor.canvas().is_empty());
    }

    #[test]
    fn autosave_fires_only_after_the_quiet_period() {
        let mut editor = Editor::new();
        assert!(!editor.autosave_due(Instant::now()));

        editor.add_node(shape_at("a", 0.0));
        let now = Instant::now();
        assert!(!editor.autosave_due(now));
        assert!(editor.autosave_due(now + AUTOSAVE_QUIET));

        let payload = editor.take_save_payload().unwrap();
        assert_eq!(payload.nodes.len(), 1);
        assert!(!editor.is_dirty());
        assert!(editor.take_save_payload().is_none());
    }

    #[test]
    fn loading_a_view_resets_history_to_a_singleton() {
        let mut editor = Editor::new();
        editor.add_node(shape_at("old", 0.0));

        let nodes = vec![shape_at("fresh", 10.0), shape_at("fresher", 20.0)];
        editor.load_view(nodes, Vec::new());

        assert_eq!(editor.canvas().nodes.len(), 2);
        assert_eq!(editor.history().len(), 1);
        assert!(!editor.can_undo());
        assert!(!editor.can_redo());
        assert!(!editor.is_dirty());
    }

    #[test]
    fn change_listener_observes_every_restore() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_by_listener = Arc::clone(&seen);

        let mut editor = Editor::new();
        editor.set_on_change(move |_canvas| {
            seen_by_listener.fetch_add(1, Ordering::SeqCst);
        });

        editor.add_node(shape_at("a", 0.0));
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        editor.undo();
        editor.settle();
        editor.redo();
        editor.settle();
        editor.load_view(Vec::new(), Vec::new());
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }
}
