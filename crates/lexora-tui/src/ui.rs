use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use lexora_core::render::{citation_lines, sanitize, sanitize_line};
use lexora_core::{ChatRole, NoticeKind};
use crate::app::{App, Focus};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            // Consume the second *
            chars.next();

            // Push any accumulated plain text
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next(); // consume second *
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    // Push any remaining text
    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let notice_height = if app.controller.notice().is_some() { 1 } else { 0 };

    // Main layout: header, chat, file row, notice, query input, footer
    let [header_area, chat_area, file_area, notice_area, input_area, footer_area] =
        Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(3),
            Constraint::Length(notice_height),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_file_row(app, frame, file_area);
    if notice_height > 0 {
        render_notice(app, frame, notice_area);
    }
    render_query_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.controller.confirm_clear_pending() {
        render_clear_confirm(frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let status = app.controller.status();
    let model_style = if status.error.is_some() {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::White)
    };

    let title = Line::from(vec![
        Span::styled(" Lexora ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(" Documents: "),
        Span::styled(status.document_count.to_string(), Style::default().fg(Color::Yellow).bold()),
        Span::raw("  Model: "),
        Span::styled(sanitize_line(status.display_model()), model_style),
        Span::styled(format!("  {}", app.server_url), Style::default().fg(Color::Gray)),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store area for mouse hit-testing and inner size for scroll calculations
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    if app.follow_tail {
        app.scroll_chat_to_bottom();
    }

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat ");

    let controller = &app.controller;
    let chat_text = if controller.chat().is_empty() && !controller.is_query_in_flight() {
        Text::from(Span::styled(
            "Upload a PDF, then ask a question about it...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in controller.chat().messages() {
            let content = sanitize(&msg.content);
            match msg.role {
                ChatRole::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    for line in content.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                }
                ChatRole::Assistant => {
                    lines.push(Line::from(Span::styled(
                        "AI:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    // Split response into lines and parse markdown
                    for line in content.lines() {
                        lines.push(parse_markdown_line(line));
                    }
                    for (i, line) in citation_lines(&msg.sources).into_iter().enumerate() {
                        let style = if i == 0 {
                            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)
                        } else {
                            Style::default().fg(Color::Gray)
                        };
                        lines.push(Line::from(Span::styled(line, style)));
                    }
                }
                ChatRole::System => {
                    for line in content.lines() {
                        lines.push(Line::from(Span::styled(
                            line.to_string(),
                            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                        )).centered());
                    }
                }
            }
            lines.push(Line::default());
        }

        if controller.is_query_in_flight() {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

/// Visible slice of a single-line input and the cursor column inside it.
fn visible_input(text: &str, cursor: usize, inner_width: usize) -> (String, u16) {
    let cursor = cursor.min(text.chars().count());

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor >= inner_width {
        cursor - inner_width + 1
    } else {
        0
    };

    let visible: String = text.chars().skip(scroll_offset).take(inner_width).collect();
    (visible, (cursor - scroll_offset) as u16)
}

fn render_file_row(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == Focus::FileInput;
    let controller = &app.controller;

    if let Some(file) = controller.uploading_file() {
        // Busy indicator replaces the input while the upload runs
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Uploading ");
        let busy = Paragraph::new(Span::styled(
            format!("Uploading {}{}", sanitize_line(file), dots),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        ))
        .block(block);
        frame.render_widget(busy, area);
        return;
    }

    let border_color = if focused { Color::Yellow } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" PDF file (Enter or Ctrl-U to upload) ");

    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = visible_input(&controller.file_input, app.file_cursor, inner_width);

    let input = if controller.file_input.is_empty() && !focused {
        Paragraph::new(Span::styled(
            "path/to/document.pdf",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Paragraph::new(visible_text).style(Style::default().fg(Color::White))
    };
    frame.render_widget(input.block(block), area);

    if focused && !controller.confirm_clear_pending() {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_notice(app: &App, frame: &mut Frame, area: Rect) {
    let Some(notice) = app.controller.notice() else {
        return;
    };

    let style = match notice.kind {
        NoticeKind::Success => Style::default().bg(Color::Green).fg(Color::Black),
        NoticeKind::Error => Style::default().bg(Color::Red).fg(Color::White),
    };

    let bar = Paragraph::new(format!(" {} ", sanitize_line(&notice.text))).style(style);
    frame.render_widget(bar, area);
}

fn render_query_input(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == Focus::QueryInput;
    let controller = &app.controller;

    let (border_color, title) = if !controller.send_enabled() {
        (Color::DarkGray, " Waiting for answer... ")
    } else if focused {
        (Color::Yellow, " Ask (Enter to send) ")
    } else {
        (Color::DarkGray, " Ask (Tab to focus) ")
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = visible_input(&controller.query_input, app.query_cursor, inner_width);

    // Use cyan text to match the "You:" style - visible in both light and dark terminals
    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);

    frame.render_widget(input, area);

    if focused && !controller.confirm_clear_pending() {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mode_text = match app.focus {
        Focus::QueryInput => " ASK ",
        Focus::FileInput => " FILE ",
    };
    let mode_style = Style::default().bg(Color::Blue).fg(Color::White);

    let hints = if app.controller.confirm_clear_pending() {
        vec![
            Span::styled(" y ", key_style),
            Span::styled(" clear database ", label_style),
            Span::styled(" n/Esc ", key_style),
            Span::styled(" cancel ", label_style),
        ]
    } else {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(
                if app.focus == Focus::QueryInput { " send " } else { " upload " },
                label_style,
            ),
            Span::styled(" Tab ", key_style),
            Span::styled(" focus ", label_style),
            Span::styled(" PgUp/PgDn ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" ^U ", key_style),
            Span::styled(" upload ", label_style),
            Span::styled(" ^L ", key_style),
            Span::styled(" clear db ", label_style),
            Span::styled(" ^R ", key_style),
            Span::styled(" refresh ", label_style),
            Span::styled(" ^C ", key_style),
            Span::styled(" quit ", label_style),
        ]
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_clear_confirm(frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 56.min(area.width.saturating_sub(4));
    let popup_height = 5.min(area.height.saturating_sub(2));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Clear database ");

    let text = Text::from(vec![
        Line::from("Are you sure you want to clear the database?"),
        Line::from(Span::styled(
            "This action cannot be undone. (y/n)",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
    ]);

    let popup = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(popup, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_markdown_bold() {
        let line = parse_markdown_line("a **bold** move");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "bold");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_parse_markdown_unclosed_is_literal() {
        let line = parse_markdown_line("2 ** 3");
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "2 ** 3");
    }

    #[test]
    fn test_parse_markdown_keeps_markup() {
        let line = parse_markdown_line("<b>not bold</b>");
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "<b>not bold</b>");
    }

    #[test]
    fn test_visible_input_scrolls_to_cursor() {
        let (visible, cursor_x) = visible_input("abcdefghij", 10, 4);
        assert_eq!(visible, "hij");
        assert_eq!(cursor_x, 3);

        let (visible, cursor_x) = visible_input("abc", 1, 10);
        assert_eq!(visible, "abc");
        assert_eq!(cursor_x, 1);
    }
}
