use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, Focus};
use crate::tui::AppEvent;

const PAGE_LINES: u16 = 10;
const WHEEL_LINES: u16 = 3;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {
            if app.follow_tail {
                app.scroll_chat_to_bottom();
            }
        }
        AppEvent::Tick => app.tick(),
        AppEvent::Poll => app.dispatch_status_refresh(),
        response => app.apply_response(response),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys that work in any mode
    if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
        app.should_quit = true;
        return;
    }

    // The confirmation popup swallows everything else
    if app.controller.confirm_clear_pending() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.resolve_clear(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.resolve_clear(false),
            _ => {}
        }
        return;
    }

    if ctrl {
        match key.code {
            KeyCode::Char('u') => app.submit_upload(),
            KeyCode::Char('l') | KeyCode::Char('x') => app.request_clear(),
            KeyCode::Char('r') => app.dispatch_status_refresh(),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Tab | KeyCode::BackTab => app.toggle_focus(),
        KeyCode::PageUp => app.scroll_chat_up(PAGE_LINES),
        KeyCode::PageDown => app.scroll_chat_down(PAGE_LINES),
        KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::Down => app.scroll_chat_down(1),
        // Enter with a modifier is not a submit
        KeyCode::Enter if key.modifiers.is_empty() => match app.focus {
            Focus::QueryInput => app.submit_query(),
            Focus::FileInput => app.submit_upload(),
        },
        _ => edit_focused_input(app, key),
    }
}

fn edit_focused_input(app: &mut App, key: KeyEvent) {
    let (text, cursor) = match app.focus {
        Focus::QueryInput => (&mut app.controller.query_input, &mut app.query_cursor),
        Focus::FileInput => (&mut app.controller.file_input, &mut app.file_cursor),
    };
    edit_text(text, cursor, key);
}

/// Line editing shared by both input fields.
fn edit_text(text: &mut String, cursor: &mut usize, key: KeyEvent) {
    let char_count = text.chars().count();
    // The controller may have cleared the field behind our back
    *cursor = (*cursor).min(char_count);

    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < char_count {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            *cursor = cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            *cursor = (*cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            *cursor = 0;
        }
        KeyCode::End => {
            *cursor = char_count;
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => {}
    }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_chat_down(WHEEL_LINES),
        MouseEventKind::ScrollUp => app.scroll_chat_up(WHEEL_LINES),
        _ => {}
    }
}
