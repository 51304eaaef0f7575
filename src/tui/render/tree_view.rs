use chrono::{Local, NaiveDate};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::io::kv::KvStore;
use crate::model::task::{Task, TaskStatus};
use crate::ops::filter::SearchQuery;
use crate::ops::timer::format_time;
use crate::tui::app::{App, FlatItem, resolve_task};
use crate::util::dates::{DATE_FORMAT, format_due_relative};
use crate::util::unicode::{display_width, truncate_to_width};

use super::helpers::{push_right_aligned, spans_width, status_symbol};
use super::push_highlighted_spans;

/// Render the task tree
pub fn render_tree_view<K: KvStore>(frame: &mut Frame, app: &mut App<K>, area: Rect) {
    let flat_items = app.build_flat_items();
    let bg = app.theme.background;

    // Keep the cursor on screen
    let visible_height = area.height as usize;
    app.cursor = app.cursor.min(flat_items.len().saturating_sub(1));
    if app.cursor < app.scroll_offset {
        app.scroll_offset = app.cursor;
    } else if visible_height > 0 && app.cursor >= app.scroll_offset + visible_height {
        app.scroll_offset = app.cursor + 1 - visible_height;
    }

    if flat_items.is_empty() {
        let text = if app.search_query().is_some() {
            " no matching tasks"
        } else {
            " No tasks. Press n to add one."
        };
        let empty = Paragraph::new(text).style(Style::default().fg(app.theme.dim).bg(bg));
        frame.render_widget(empty, area);
        return;
    }

    let visible = app.visible_tasks();
    let query = app.search_query();
    let today = Local::now().date_naive();
    let scroll = app.scroll_offset;
    let end = flat_items.len().min(scroll + visible_height);

    let lines: Vec<Line> = flat_items[scroll..end]
        .iter()
        .zip(scroll..end)
        .filter_map(|(item, row)| {
            let task = resolve_task(&visible, &item.path)?;
            Some(render_task_line(
                app,
                task,
                item,
                row == app.cursor,
                area.width as usize,
                query.as_ref(),
                today,
            ))
        })
        .collect();

    let paragraph = Paragraph::new(lines).style(Style::default().bg(bg));
    frame.render_widget(paragraph, area);
}

/// Timer column text: remaining time, with a dot while counting down
pub(super) fn timer_text(task: &Task) -> String {
    let time = format_time(task.timer_remaining);
    if task.is_timer_running {
        format!("\u{25CF} {}", time) // ●
    } else {
        format!("  {}", time)
    }
}

/// Render one row: cursor bar, tree guides, status, title, then due date and
/// timer flush right.
fn render_task_line<K: KvStore>(
    app: &App<K>,
    task: &Task,
    item: &FlatItem,
    is_cursor: bool,
    width: usize,
    query: Option<&SearchQuery>,
    today: NaiveDate,
) -> Line<'static> {
    let theme = &app.theme;
    let row_bg = if is_cursor {
        theme.selection_bg
    } else {
        theme.background
    };
    let dim_style = Style::default().fg(theme.dim).bg(row_bg);
    let mut spans: Vec<Span<'static>> = Vec::new();

    // Column 0: cursor bar
    if is_cursor {
        spans.push(Span::styled(
            "\u{258E}",
            Style::default().fg(theme.selection_border).bg(row_bg),
        ));
    } else {
        spans.push(Span::styled(" ", Style::default().bg(row_bg)));
    }

    // Tree guides
    let expand_char = if item.has_children {
        if item.is_expanded {
            "\u{25BC}" // ▼
        } else {
            "\u{25B6}" // ▶
        }
    } else {
        " "
    };
    if item.depth > 0 {
        for (d, is_ancestor_last) in item.ancestor_last.iter().enumerate() {
            if d == 0 || *is_ancestor_last {
                spans.push(Span::styled("   ", dim_style));
            } else {
                spans.push(Span::styled("\u{2502}  ", dim_style)); // │
            }
        }
        let tree_char = if item.is_last_sibling {
            "\u{2514}" // └
        } else {
            "\u{251C}" // ├
        };
        spans.push(Span::styled(tree_char, dim_style));
    }
    spans.push(Span::styled(expand_char, dim_style));

    // Status
    let mut status_style = Style::default().fg(theme.status_color(task.status)).bg(row_bg);
    if is_cursor {
        status_style = status_style.add_modifier(Modifier::BOLD);
    }
    spans.push(Span::styled(status_symbol(task.status), status_style));
    spans.push(Span::styled(" ", Style::default().bg(row_bg)));

    // Right-hand columns
    let due = format_due_relative(&task.due_date, today);
    let overdue = NaiveDate::parse_from_str(&task.due_date, DATE_FORMAT)
        .is_ok_and(|d| d < today && task.status != TaskStatus::Completed);
    let due_color = if overdue { theme.red } else { theme.dim };
    let timer_color = if task.is_timer_running {
        theme.highlight
    } else if task.timer_remaining == 0 {
        theme.red
    } else {
        theme.text
    };
    let right = vec![
        Span::styled(due, Style::default().fg(due_color).bg(row_bg)),
        Span::styled(" ", Style::default().bg(row_bg)),
        Span::styled(timer_text(task), Style::default().fg(timer_color).bg(row_bg)),
        Span::styled(" ", Style::default().bg(row_bg)),
    ];

    // Title, truncated to leave room for the right-hand columns
    let title_style = if task.status == TaskStatus::Completed {
        Style::default()
            .fg(theme.dim)
            .bg(row_bg)
            .add_modifier(Modifier::CROSSED_OUT)
    } else if is_cursor {
        Style::default()
            .fg(theme.text_bright)
            .bg(row_bg)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text_bright).bg(row_bg)
    };
    let highlight_style = Style::default()
        .fg(theme.search_match_fg)
        .bg(theme.search_match_bg)
        .add_modifier(Modifier::BOLD);
    let available = width.saturating_sub(spans_width(&spans) + spans_width(&right) + 1);
    let title = if display_width(&task.title) > available {
        truncate_to_width(&task.title, available)
    } else {
        task.title.clone()
    };
    push_highlighted_spans(&mut spans, &title, title_style, highlight_style, query);

    push_right_aligned(&mut spans, right, width, Style::default().bg(row_bg));
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::TaskId;
    use crate::tui::render::test_helpers::*;
    use insta::assert_snapshot;

    fn render_tree(app: &mut App<crate::io::kv::MemoryKv>, w: u16, h: u16) -> String {
        render_to_string(w, h, |frame, area| {
            render_tree_view(frame, app, area);
        })
    }

    #[test]
    fn collapsed_roots() {
        let mut app = app_with_sample_tree();
        let output = render_tree(&mut app, 40, 5);
        assert_snapshot!(output, @r"
        ▎ [ ] Buy milk         today   00:05:00
         ▶[ ] Clean house      today   00:05:00
          [ ] Write report     today   00:05:00
        ");
    }

    #[test]
    fn expanded_branches_draw_guides() {
        let mut app = app_with_sample_tree();
        app.select_task(&TaskId::from("b2x"));
        let output = render_tree(&mut app, TERM_W, TERM_H);
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[1].starts_with(" \u{25BC}[ ] Clean house"));
        assert!(lines[2].starts_with("    \u{251C} [ ] Vacuum living room"));
        assert!(lines[3].starts_with("    \u{2514}\u{25BC}[ ] Dishes"));
        assert!(lines[4].starts_with("\u{258E}      \u{2514} [ ] Dry glasses"));
    }

    #[test]
    fn running_timer_and_status_marker() {
        let mut app = app_with_sample_tree();
        app.store_mut().toggle_timer(&TaskId::from("c")).unwrap();
        app.store_mut()
            .change_status(&TaskId::from("c"), TaskStatus::InProgress)
            .unwrap();
        let output = render_tree(&mut app, TERM_W, 5);
        let row = output.lines().nth(2).unwrap();
        assert!(row.contains("[>] Write report"));
        assert!(row.ends_with("\u{25CF} 00:05:00"));
    }

    #[test]
    fn long_titles_are_truncated() {
        let mut app = app_with_sample_tree();
        app.store_mut()
            .update_task(
                &TaskId::from("a"),
                &crate::model::task::TaskPatch {
                    title: Some("A very long title that cannot possibly fit".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let output = render_tree(&mut app, 40, 5);
        let row = output.lines().next().unwrap();
        assert!(row.contains('\u{2026}'));
        assert!(row.ends_with("today   00:05:00"));
    }

    #[test]
    fn empty_search_result() {
        let mut app = app_with_sample_tree();
        app.search_input = "nothing like this".into();
        let output = render_tree(&mut app, TERM_W, 5);
        assert_eq!(output, " no matching tasks");
    }

    #[test]
    fn scrolls_to_keep_cursor_visible() {
        let mut app = app_with_sample_tree();
        app.cursor = 2;
        let output = render_tree(&mut app, 40, 2);
        assert_eq!(app.scroll_offset, 1);
        assert!(output.contains("Write report"));
        assert!(!output.contains("Buy milk"));
    }
}
