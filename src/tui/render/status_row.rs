use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::io::kv::KvStore;
use crate::tui::app::{App, Mode};

use super::helpers::{push_right_aligned, split_at_cursor};

/// Render the status row (bottom of screen)
pub fn render_status_row<K: KvStore>(frame: &mut Frame, app: &App<K>, area: Rect) {
    let bg = app.theme.background;
    let width = area.width as usize;
    let fill = Style::default().bg(bg);
    let hint_style = Style::default().fg(app.theme.dim).bg(bg);

    let mut spans: Vec<Span<'static>> = Vec::new();
    let hint: &str = match app.mode {
        Mode::Navigate => {
            if let Some(msg) = &app.message {
                let color = if msg.is_error {
                    app.theme.red
                } else {
                    app.theme.text_bright
                };
                spans.push(Span::styled(
                    format!(" {}", msg.text),
                    Style::default().fg(color).bg(bg),
                ));
            } else if let Some(query) = app.search_query() {
                // Active filter shown dimmed, like a remembered search
                spans.push(Span::styled(format!(" /{}", query.text()), hint_style));
            }
            if app.show_key_hints {
                "n new  a sub  space timer  s status  / search  ? help "
            } else {
                ""
            }
        }
        Mode::Search => {
            spans.push(Span::styled(
                format!(" /{}", app.search_input),
                Style::default().fg(app.theme.text_bright).bg(bg),
            ));
            spans.push(Span::styled(
                "\u{258C}", // ▌
                Style::default().fg(app.theme.highlight).bg(bg),
            ));
            "Enter keep  Esc clear  \u{2191}\u{2193} history "
        }
        Mode::Edit => {
            let label = app.edit_target.as_ref().map_or("edit", |t| t.label());
            spans.push(Span::styled(
                format!(" {}: ", label),
                Style::default().fg(app.theme.highlight).bg(bg),
            ));
            let text_style = Style::default().fg(app.theme.text_bright).bg(bg);
            let cursor_style = Style::default()
                .fg(app.theme.background)
                .bg(app.theme.text_bright);
            let (before, at, after) = split_at_cursor(&app.edit_buffer, app.edit_cursor);
            spans.push(Span::styled(before.to_string(), text_style));
            spans.push(Span::styled(at.to_string(), cursor_style));
            spans.push(Span::styled(after.to_string(), text_style));
            if let Some(msg) = app.message.as_ref().filter(|m| m.is_error) {
                spans.push(Span::styled(
                    format!("  {}", msg.text),
                    Style::default().fg(app.theme.red).bg(bg),
                ));
            }
            "Enter save  Esc cancel "
        }
        Mode::Presets => "\u{2191}\u{2193} choose  Enter set  Esc close ",
        Mode::Confirm => {
            let title = app
                .pending_delete
                .as_ref()
                .and_then(|id| app.store().find(id))
                .map_or(String::new(), |t| t.title.clone());
            spans.push(Span::styled(
                format!(" delete \"{}\" and its subtasks? ", title),
                Style::default()
                    .fg(app.theme.red)
                    .bg(bg)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled("y/n", Style::default().fg(app.theme.text_bright).bg(bg)));
            ""
        }
    };

    if hint.is_empty() {
        push_right_aligned(&mut spans, Vec::new(), width, fill);
    } else {
        push_right_aligned(&mut spans, vec![Span::styled(hint, hint_style)], width, fill);
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(fill);
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::TaskId;
    use crate::tui::app::EditTarget;
    use crate::tui::render::test_helpers::*;

    fn render_row(app: &App<crate::io::kv::MemoryKv>) -> String {
        render_to_string(TERM_W, 1, |frame, area| {
            render_status_row(frame, app, area);
        })
    }

    #[test]
    fn navigate_shows_hints() {
        let app = app_with_sample_tree();
        let row = render_row(&app);
        assert!(row.ends_with("n new  a sub  space timer  s status  / search  ? help"));
        assert_eq!(row.chars().count(), TERM_W as usize - 1);
    }

    #[test]
    fn navigate_without_hints_shows_message() {
        let mut app = app_with_sample_tree();
        app.show_key_hints = false;
        app.set_message("timer finished: Tea");
        assert_eq!(render_row(&app), " timer finished: Tea");
    }

    #[test]
    fn search_prompt() {
        let mut app = app_with_sample_tree();
        app.mode = Mode::Search;
        app.search_input = "mil".into();
        assert!(render_row(&app).starts_with(" /mil\u{258C}"));
    }

    #[test]
    fn edit_prompt_with_cursor() {
        let mut app = app_with_sample_tree();
        app.mode = Mode::Edit;
        app.edit_target = Some(EditTarget::Due {
            task_id: TaskId::from("a"),
        });
        app.edit_buffer = "tomorrow".into();
        app.edit_cursor = 2;
        assert!(render_row(&app).starts_with(" due: tomorrow"));
    }

    #[test]
    fn confirm_names_the_task() {
        let mut app = app_with_sample_tree();
        app.mode = Mode::Confirm;
        app.pending_delete = Some(TaskId::from("b"));
        assert_eq!(
            render_row(&app),
            " delete \"Clean house\" and its subtasks? y/n"
        );
    }
}
