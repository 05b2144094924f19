//! Keybinding dispatcher for basemark.
//!
//! Translates raw crossterm `KeyEvent`s into `AppState` mutations and returns a
//! [`KeyAction`] describing the follow-up work the event loop must perform:
//! scheduling debounced saves and suggestion fetches, writing content back to
//! the store, committing, or quitting. The dispatcher branches first on
//! `state.mode` so every mode has an isolated handler.

use basemark_core::document::Document;
use basemark_core::staging::CommitRequest;
use basemark_core::workspace::{EditEffects, SaveRequest};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Position;

use crate::app::{AppState, Mode, PanelFocus};

/// Follow-up work returned from the key dispatcher.
#[derive(Debug)]
pub enum KeyAction {
    /// Nothing beyond the state change; redraw on the next render tick.
    Continue,
    /// Flush pending saves and exit.
    Quit,
    /// The active document was edited or its cursor moved.
    Edited(EditEffects),
    /// Content that must be written to the store now, e.g. from closed tabs.
    Save(Vec<SaveRequest>),
    /// Commit the staged files with this message.
    Commit(CommitRequest),
}

fn save_or_continue(saves: Vec<SaveRequest>) -> KeyAction {
    if saves.is_empty() {
        KeyAction::Continue
    } else {
        KeyAction::Save(saves)
    }
}

/// Dispatches a key event to the handler matching the current mode.
pub fn handle_key(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match state.mode {
        Mode::HelpOverlay => handle_help(key, state),
        Mode::Normal => handle_normal(key, state),
        Mode::Insert => handle_insert(key, state),
        Mode::CommitMessage => handle_commit_message(key, state),
    }
}

// ---------------------------------------------------------------------------
// Normal mode
// ---------------------------------------------------------------------------

fn handle_normal(key: KeyEvent, state: &mut AppState) -> KeyAction {
    if let Some(action) = handle_scroll_key(key, state) {
        return action;
    }
    if let Some(action) = handle_panel_key(key, state) {
        return action;
    }
    state.status = None;

    match key.code {
        // Panel focus
        KeyCode::Char('H') => {
            state.focus = state.focus.prev();
            KeyAction::Continue
        }
        KeyCode::Char('L') => {
            state.focus = state.focus.next();
            KeyAction::Continue
        }

        // Staging
        KeyCode::Char('S') => {
            state.stage_all();
            KeyAction::Continue
        }
        KeyCode::Char('U') => {
            state.staging.unstage_all();
            KeyAction::Continue
        }
        KeyCode::Char('c') => {
            if state.change_rows().iter().any(|row| row.staged) {
                state.mode = Mode::CommitMessage;
            } else {
                state.set_error("nothing staged to commit");
            }
            KeyAction::Continue
        }

        // Tabs
        KeyCode::Char('[') => {
            state.workspace.cycle_active(-1);
            state.editor_scroll = 0;
            KeyAction::Continue
        }
        KeyCode::Char(']') => {
            state.workspace.cycle_active(1);
            state.editor_scroll = 0;
            KeyAction::Continue
        }
        KeyCode::Char('p') => save_or_continue(state.pin_active()),
        KeyCode::Char('d') => {
            state.toggle_diff_view();
            KeyAction::Continue
        }
        KeyCode::Char('x') => {
            let closed = state.workspace.active_id().cloned().and_then(|id| state.workspace.close_tab(&id));
            state.editor_scroll = 0;
            save_or_continue(closed.and_then(|c| c.unsaved).into_iter().collect())
        }
        KeyCode::Char('X') => save_or_continue(state.workspace.close_all_tabs()),

        // Editing
        KeyCode::Char('i') => {
            match state.workspace.active() {
                Some(open) if open.view().is_split() => state.set_error("the diff view is read-only"),
                Some(_) => {
                    state.mode = Mode::Insert;
                    state.focus = PanelFocus::Editor;
                    state.follow_cursor();
                }
                None => state.set_error("no file open"),
            }
            KeyAction::Continue
        }

        // Left column resize
        KeyCode::Char('<') => {
            state.shrink_left_panel();
            KeyAction::Continue
        }
        KeyCode::Char('>') => {
            state.grow_left_panel();
            KeyAction::Continue
        }

        KeyCode::Char('?') => {
            state.help_scroll = 0;
            state.mode = Mode::HelpOverlay;
            KeyAction::Continue
        }
        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,

        _ => KeyAction::Continue,
    }
}

/// Keys whose meaning depends on the focused panel. Returns `None` when the
/// key should fall through to the rest of the Normal handler.
fn handle_panel_key(key: KeyEvent, state: &mut AppState) -> Option<KeyAction> {
    match (state.focus, key.code) {
        (PanelFocus::Files, KeyCode::Enter | KeyCode::Char('l')) => {
            Some(save_or_continue(state.open_selected_tree_row(false)))
        }
        (PanelFocus::Files, KeyCode::Char('o')) => Some(save_or_continue(state.open_selected_tree_row(true))),
        (PanelFocus::Changes, KeyCode::Enter | KeyCode::Char('l')) => {
            Some(save_or_continue(state.open_selected_change()))
        }
        (PanelFocus::Changes, KeyCode::Char(' ') | KeyCode::Char('s')) => {
            state.toggle_selected_stage();
            Some(KeyAction::Continue)
        }
        _ => None,
    }
}

/// j / k / g / G and the Ctrl half-page combos.
fn handle_scroll_key(key: KeyEvent, state: &mut AppState) -> Option<KeyAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => state.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => state.scroll_up(1),
        KeyCode::Char('g') => state.scroll_top(),
        KeyCode::Char('G') => state.scroll_bottom(),
        KeyCode::Char('d') if ctrl => state.half_page_down(),
        KeyCode::Char('u') if ctrl => state.half_page_up(),
        _ => return None,
    }
    Some(KeyAction::Continue)
}

// ---------------------------------------------------------------------------
// HelpOverlay mode
// ---------------------------------------------------------------------------

fn handle_help(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('j') => state.help_scroll = state.help_scroll.saturating_add(1),
        KeyCode::Char('k') => state.help_scroll = state.help_scroll.saturating_sub(1),
        KeyCode::Char('g') => state.help_scroll = 0,
        KeyCode::Char('G') => state.help_scroll = u16::MAX,
        KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => state.mode = Mode::Normal,
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Insert mode
// ---------------------------------------------------------------------------

/// Applies `edit` to the active document. Falls back to Normal mode when
/// there is no editable document (closed, or switched to the diff view).
fn edit(state: &mut AppState, edit: impl FnOnce(&mut Document) -> bool) -> KeyAction {
    match state.workspace.edit_active(edit) {
        Some(effects) => {
            state.follow_cursor();
            KeyAction::Edited(effects)
        }
        None => {
            state.mode = Mode::Normal;
            KeyAction::Continue
        }
    }
}

fn motion(state: &mut AppState, motion: impl FnOnce(&mut Document)) -> KeyAction {
    edit(state, |doc| {
        motion(doc);
        false
    })
}

fn handle_insert(key: KeyEvent, state: &mut AppState) -> KeyAction {
    let ctrl_or_alt = key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT);

    match key.code {
        KeyCode::Esc => {
            if !state.workspace.dismiss_suggestion() {
                state.mode = Mode::Normal;
            }
            KeyAction::Continue
        }
        KeyCode::Tab => match state.workspace.accept_suggestion() {
            Some(effects) => {
                state.follow_cursor();
                KeyAction::Edited(effects)
            }
            None => edit(state, |doc| doc.insert_str("    ")),
        },
        KeyCode::Char(c) if !ctrl_or_alt => edit(state, |doc| doc.insert_char(c)),
        KeyCode::Enter => edit(state, |doc| doc.insert_char('\n')),
        KeyCode::Backspace => edit(state, Document::backspace),
        KeyCode::Delete => edit(state, Document::delete_forward),
        KeyCode::Left => motion(state, Document::move_left),
        KeyCode::Right => motion(state, Document::move_right),
        KeyCode::Up => motion(state, |doc| doc.move_vertical(-1)),
        KeyCode::Down => motion(state, |doc| doc.move_vertical(1)),
        KeyCode::Home => motion(state, Document::move_line_start),
        KeyCode::End => motion(state, Document::move_line_end),
        _ => KeyAction::Continue,
    }
}

// ---------------------------------------------------------------------------
// CommitMessage mode
// ---------------------------------------------------------------------------

fn handle_commit_message(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Esc => {
            state.mode = Mode::Normal;
            KeyAction::Continue
        }
        KeyCode::Enter => match CommitRequest::new(&state.commit_message) {
            Some(request) => {
                state.mode = Mode::Normal;
                KeyAction::Commit(request)
            }
            None => {
                state.set_error("commit message is empty");
                KeyAction::Continue
            }
        },
        KeyCode::Backspace => {
            state.commit_message.pop();
            KeyAction::Continue
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.commit_message.push(c);
            KeyAction::Continue
        }
        _ => KeyAction::Continue,
    }
}

// ---------------------------------------------------------------------------
// Mouse events
// ---------------------------------------------------------------------------

/// Left click focuses the panel under the pointer; the wheel scrolls the
/// focused panel (or the help overlay) by 3 lines.
pub fn handle_mouse(mouse: MouseEvent, state: &mut AppState) -> KeyAction {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => handle_mouse_click(mouse.column, mouse.row, state),
        MouseEventKind::ScrollUp if state.mode == Mode::HelpOverlay => {
            state.help_scroll = state.help_scroll.saturating_sub(3);
        }
        MouseEventKind::ScrollDown if state.mode == Mode::HelpOverlay => {
            state.help_scroll = state.help_scroll.saturating_add(3);
        }
        MouseEventKind::ScrollUp => state.scroll_up(3),
        MouseEventKind::ScrollDown => state.scroll_down(3),
        _ => {}
    }
    KeyAction::Continue
}

/// Panels with zero width are skipped so collapsed panels cannot receive focus.
fn handle_mouse_click(col: u16, row: u16, state: &mut AppState) {
    let pos = Position { x: col, y: row };
    let [files, changes, editor] = state.panel_rects;
    let targets = [(files, PanelFocus::Files), (changes, PanelFocus::Changes), (editor, PanelFocus::Editor)];
    if let Some((_, focus)) = targets.into_iter().find(|(rect, _)| rect.width > 0 && rect.contains(pos)) {
        state.focus = focus;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basemark_core::tabs::{OpenOptions, PreviewPolicy};
    use basemark_core::types::{BaselineMap, FileId, FileKind, FileRecord, Identity, Project, ProjectId};
    use ratatui::layout::Rect;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app(content: &str, baseline: Option<&str>) -> AppState {
        let file = FileRecord {
            id: FileId::from("f"),
            project_id: ProjectId::from("p"),
            name: "notes.txt".to_owned(),
            parent_id: None,
            kind: FileKind::File,
            content: Some(content.to_owned()),
            storage_id: None,
        };
        let baselines: BaselineMap = baseline.map(|b| (FileId::from("f"), b.to_owned())).into_iter().collect();
        let project = Project { id: ProjectId::from("p"), owner_id: "alice".to_owned(), name: "demo".to_owned(), created_at: 0 };
        AppState::new(Identity::new("alice"), project, vec![file], baselines, PreviewPolicy::AlwaysPin)
    }

    fn text(state: &AppState) -> &str {
        state.workspace.active().unwrap().document().text()
    }

    #[test]
    fn typing_in_insert_mode_edits_and_arms_a_save() {
        let mut state = app("", None);
        state.open_file(&FileId::from("f"), OpenOptions::pinned());
        assert!(matches!(handle_key(press(KeyCode::Char('i')), &mut state), KeyAction::Continue));
        assert_eq!(state.mode, Mode::Insert);

        let action = handle_key(press(KeyCode::Char('h')), &mut state);
        let KeyAction::Edited(effects) = action else {
            panic!("expected an edit, got {action:?}");
        };
        assert_eq!(effects.file_id, FileId::from("f"));
        assert!(effects.save.is_some());
        handle_key(press(KeyCode::Enter), &mut state);
        handle_key(press(KeyCode::Char('i')), &mut state);
        assert_eq!(text(&state), "h\ni");

        let KeyAction::Edited(effects) = handle_key(press(KeyCode::Left), &mut state) else {
            panic!("expected a cursor move");
        };
        assert!(effects.save.is_none());

        handle_key(press(KeyCode::Esc), &mut state);
        assert_eq!(state.mode, Mode::Normal);
        // 'i' in Normal mode re-enters Insert instead of typing.
        handle_key(press(KeyCode::Char('i')), &mut state);
        assert_eq!(text(&state), "h\ni");
    }

    #[test]
    fn tab_indents_without_a_suggestion() {
        let mut state = app("x", None);
        state.open_file(&FileId::from("f"), OpenOptions::pinned());
        state.mode = Mode::Insert;
        handle_key(press(KeyCode::Tab), &mut state);
        assert_eq!(text(&state), "    x");
    }

    #[test]
    fn diff_view_refuses_insert_mode() {
        let mut state = app("new", Some("old"));
        state.open_file(&FileId::from("f"), OpenOptions::pinned().with_diff(true));
        handle_key(press(KeyCode::Char('i')), &mut state);
        assert_eq!(state.mode, Mode::Normal);
        assert!(state.status.as_ref().is_some_and(|s| s.error));

        handle_key(press(KeyCode::Char('d')), &mut state);
        handle_key(press(KeyCode::Char('i')), &mut state);
        assert_eq!(state.mode, Mode::Insert);
    }

    #[test]
    fn commit_needs_staged_files_and_a_message() {
        let mut state = app("new", Some("old"));
        handle_key(press(KeyCode::Char('c')), &mut state);
        assert_eq!(state.mode, Mode::Normal);

        state.focus = PanelFocus::Changes;
        handle_key(press(KeyCode::Char(' ')), &mut state);
        handle_key(press(KeyCode::Char('c')), &mut state);
        assert_eq!(state.mode, Mode::CommitMessage);

        assert!(matches!(handle_key(press(KeyCode::Enter), &mut state), KeyAction::Continue));
        assert_eq!(state.mode, Mode::CommitMessage);

        for c in "fix typo".chars() {
            handle_key(press(KeyCode::Char(c)), &mut state);
        }
        match handle_key(press(KeyCode::Enter), &mut state) {
            KeyAction::Commit(request) => assert_eq!(request.message(), "fix typo"),
            other => panic!("expected a commit, got {other:?}"),
        }
        assert_eq!(state.mode, Mode::Normal);
    }

    #[test]
    fn closing_a_dirty_tab_hands_back_its_content() {
        let mut state = app("a", None);
        state.open_file(&FileId::from("f"), OpenOptions::pinned());
        state.mode = Mode::Insert;
        handle_key(press(KeyCode::Char('b')), &mut state);
        handle_key(press(KeyCode::Esc), &mut state);

        match handle_key(press(KeyCode::Char('x')), &mut state) {
            KeyAction::Save(saves) => assert_eq!(saves[0].content, "ba"),
            other => panic!("expected a save, got {other:?}"),
        }
        assert!(state.workspace.active().is_none());
        assert!(matches!(handle_key(press(KeyCode::Char('x')), &mut state), KeyAction::Continue));
    }

    #[test]
    fn click_focuses_the_panel_under_the_pointer() {
        let mut state = app("", None);
        state.panel_rects = [Rect::new(0, 0, 20, 10), Rect::new(0, 10, 20, 10), Rect::new(20, 0, 60, 20)];
        let click = |col, row| MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: col,
            row,
            modifiers: KeyModifiers::NONE,
        };
        handle_mouse(click(30, 5), &mut state);
        assert_eq!(state.focus, PanelFocus::Editor);
        handle_mouse(click(5, 15), &mut state);
        assert_eq!(state.focus, PanelFocus::Changes);
    }
}
