//! Headless editing engine for a node-and-edge diagram canvas: live
//! canvas state, bounded snapshot history with undo/redo, a clipboard
//! with identifier remapping, keyboard/clipboard event routing, and a
//! SQLite-backed store for named views.
//!
//! Rendering, layout, and interaction physics are a host concern; this
//! crate only owns the state transitions underneath them.

pub mod canvas;
pub mod clipboard;
pub mod editor;
pub mod history;
pub mod input;
pub mod store;

pub use canvas::{
    Canvas, CanvasError, Edge, EdgeKind, Node, NodeKind, NodePayload, Point, ShapeKind, Size,
};
pub use clipboard::{Clipboard, PASTE_OFFSET};
pub use editor::{AUTOSAVE_QUIET, Editor, Phase};
pub use history::{HISTORY_CAPACITY, History, Snapshot};
pub use input::{Command, Focus, KeyEvent, dispatch, dispatch_image_paste, route};
pub use store::{StoreConfig, View, ViewListItem, ViewStore};
