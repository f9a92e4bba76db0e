use crate::canvas::{Canvas, Edge, Node};

/// Maximum number of snapshots retained before the oldest is evicted.
pub const HISTORY_CAPACITY: usize = 50;

/// One captured point of canvas state. Snapshots are taken as deep clones
/// of a canvas whose cascade rules already hold, so a snapshot's edges
/// never reference nodes missing from the same snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Snapshot {
    pub fn of(canvas: &Canvas) -> Self {
        Self {
            nodes: canvas.nodes.clone(),
            edges: canvas.edges.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn apply_to(&self, canvas: &mut Canvas) {
        canvas.nodes = self.nodes.clone();
        canvas.edges = self.edges.clone();
    }
}

/// Ordered snapshot sequence plus a cursor. The cursor always points at
/// a valid entry once anything has been captured; an empty history reads
/// back as an empty snapshot.
#[derive(Debug, Clone, Default)]
pub struct History {
    snapshots: Vec<Snapshot>,
    cursor: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a snapshot of the given canvas, discarding any redo branch
    /// beyond the cursor first. Identical consecutive states are captured
    /// verbatim; no deduplication happens here.
    pub fn capture(&mut self, canvas: &Canvas) {
        self.push(Snapshot::of(canvas));
        while self.snapshots.len() > HISTORY_CAPACITY {
            self.snapshots.remove(0);
            self.cursor -= 1;
        }
    }

    /// Appends a snapshot at the tail without enforcing the capacity cap.
    /// Used when undoing past a mutation that has not been checkpointed
    /// yet: the live state becomes the redo target, and evicting for it
    /// would drop the oldest state the user is navigating toward. The
    /// next `capture` truncates the branch and restores the cap.
    pub fn stash(&mut self, snapshot: Snapshot) {
        self.push(snapshot);
    }

    fn push(&mut self, snapshot: Snapshot) {
        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.cursor + 1);
        }
        self.snapshots.push(snapshot);
        self.cursor = self.snapshots.len() - 1;
    }

    /// Replaces the whole sequence with a single snapshot of the given
    /// canvas. Called when a different view is loaded.
    pub fn reset(&mut self, canvas: &Canvas) {
        self.snapshots = vec![Snapshot::of(canvas)];
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Snapshot {
        self.snapshots.get(self.cursor).cloned().unwrap_or_default()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.snapshots.is_empty() && self.cursor < self.snapshots.len() - 1
    }

    /// Moves the cursor back one position if possible and returns the new
    /// current snapshot. A no-op at the head of the sequence.
    pub fn step_back(&mut self) -> Snapshot {
        if self.can_undo() {
            self.cursor -= 1;
        }
        self.current()
    }

    /// Moves the cursor forward one position if possible and returns the
    /// new current snapshot. A no-op at the tail.
    pub fn step_forward(&mut self) -> Snapshot {
        if self.can_redo() {
            self.cursor += 1;
        }
        self.current()
    }
}
