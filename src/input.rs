use crate::editor::Editor;

/// Where keyboard focus currently sits. Shortcuts are only routed while
/// the canvas itself has focus; text-editing controls keep their normal
/// key handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Canvas,
    TextField,
}

/// One physical key event, already decoded from the platform's input
/// stream. `primary` covers ctrl and the platform command key alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: String,
    pub primary: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyEvent {
    pub fn plain(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            primary: false,
            shift: false,
            alt: false,
        }
    }

    pub fn primary(key: impl Into<String>) -> Self {
        Self {
            primary: true,
            ..Self::plain(key)
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    CopySelection,
    PasteBuffer,
    Undo,
    Redo,
    DeleteSelection,
}

fn key_is(event: &KeyEvent, letter: &str) -> bool {
    event.key.eq_ignore_ascii_case(letter)
}

/// Maps a key event to an editor command. At most one binding matches a
/// physical keystroke; the first match wins. Returns `None` while a text
/// field has focus, and for any unbound combination.
pub fn route(event: &KeyEvent, focus: Focus) -> Option<Command> {
    if focus == Focus::TextField {
        return None;
    }

    if event.primary && !event.shift && key_is(event, "z") {
        return Some(Command::Undo);
    }
    if event.primary && ((event.shift && key_is(event, "z")) || key_is(event, "y")) {
        return Some(Command::Redo);
    }
    if event.primary && !event.shift && key_is(event, "c") {
        return Some(Command::CopySelection);
    }
    if event.primary && !event.shift && key_is(event, "v") {
        return Some(Command::PasteBuffer);
    }
    if !event.primary && (event.key == "Delete" || event.key == "Backspace") {
        return Some(Command::DeleteSelection);
    }

    None
}

/// Routes a key event and applies the resulting command to the editor.
/// Returns the command that ran, if any.
pub fn dispatch(editor: &mut Editor, event: &KeyEvent, focus: Focus) -> Option<Command> {
    let command = route(event, focus)?;
    match command {
        Command::CopySelection => editor.copy_selection(),
        Command::PasteBuffer => {
            editor.paste();
        }
        Command::Undo => {
            editor.undo();
        }
        Command::Redo => {
            editor.redo();
        }
        Command::DeleteSelection => {
            editor.delete_selection();
        }
    }
    Some(command)
}

/// Routes an OS clipboard paste carrying bitmap data: a new image node in
/// its own undo step. Text-field focus swallows the event, like the key
/// bindings.
pub fn dispatch_image_paste(
    editor: &mut Editor,
    mime_type: &str,
    bytes: &[u8],
    focus: Focus,
) -> Option<String> {
    if focus == Focus::TextField {
        return None;
    }
    Some(editor.paste_image(mime_type, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Node, Point, ShapeKind};

    #[test]
    fn text_field_focus_swallows_every_binding() {
        for event in [
            KeyEvent::primary("z"),
            KeyEvent::primary("c"),
            KeyEvent::plain("Delete"),
        ] {
            assert_eq!(route(&event, Focus::TextField), None);
        }
    }

    #[test]
    fn letter_bindings_match_case_insensitively() {
        assert_eq!(route(&KeyEvent::primary("z"), Focus::Canvas), Some(Command::Undo));
        assert_eq!(route(&KeyEvent::primary("Z"), Focus::Canvas), Some(Command::Undo));
        assert_eq!(
            route(&KeyEvent::primary("V"), Focus::Canvas),
            Some(Command::PasteBuffer)
        );
    }

    #[test]
    fn redo_has_two_bindings() {
        assert_eq!(
            route(&KeyEvent::primary("z").with_shift(), Focus::Canvas),
            Some(Command::Redo)
        );
        assert_eq!(route(&KeyEvent::primary("y"), Focus::Canvas), Some(Command::Redo));
    }

    #[test]
    fn delete_has_two_key_variants_and_needs_no_modifier() {
        assert_eq!(
            route(&KeyEvent::plain("Delete"), Focus::Canvas),
            Some(Command::DeleteSelection)
        );
        assert_eq!(
            route(&KeyEvent::plain("Backspace"), Focus::Canvas),
            Some(Command::DeleteSelection)
        );
        assert_eq!(route(&KeyEvent::primary("Delete"), Focus::Canvas), None);
    }

    #[test]
    fn unbound_keys_route_nowhere() {
        assert_eq!(route(&KeyEvent::plain("x"), Focus::Canvas), None);
        assert_eq!(route(&KeyEvent::primary("q"), Focus::Canvas), None);
        assert_eq!(route(&KeyEvent::plain("z"), Focus::Canvas), None);
    }

    #[test]
    fn shifted_copy_and_paste_combos_are_unbound() {
        // Bindings match the exact modifier combination; an extra shift
        // means a different (unbound) chord.
        assert_eq!(route(&KeyEvent::primary("c").with_shift(), Focus::Canvas), None);
        assert_eq!(route(&KeyEvent::primary("v").with_shift(), Focus::Canvas), None);
    }

    #[test]
    fn shift_z_routes_to_redo_not_undo() {
        // Both bindings involve ctrl+z; only one may fire per event.
        let event = KeyEvent::primary("z").with_shift();
        assert_eq!(route(&event, Focus::Canvas), Some(Command::Redo));
    }

    #[test]
    fn dispatch_runs_the_full_copy_paste_flow() {
        let mut editor = Editor::new();
        let id = editor.add_node(Node::shape("a", ShapeKind::Rectangle, Point::default()));
        editor.set_node_selected(&id, true).unwrap();

        dispatch(&mut editor, &KeyEvent::primary("c"), Focus::Canvas).unwrap();
        dispatch(&mut editor, &KeyEvent::primary("v"), Focus::Canvas).unwrap();

        assert_eq!(editor.canvas().nodes.len(), 2);
    }

    #[test]
    fn image_paste_respects_the_focus_guard() {
        let mut editor = Editor::new();
        assert!(dispatch_image_paste(&mut editor, "image/png", b"png", Focus::TextField).is_none());
        assert!(editor.canvas().is_empty());

        let id = dispatch_image_paste(&mut editor, "image/png", b"png", Focus::Canvas).unwrap();
        assert!(editor.canvas().node(&id).is_some());
    }
}
