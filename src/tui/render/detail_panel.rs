use chrono::Local;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::io::kv::KvStore;
use crate::model::task::{Task, TaskStatus};
use crate::ops::timer::{LOW_TIME_PERCENT, format_time, remaining_percent};
use crate::ops::tree;
use crate::tui::app::App;
use crate::util::dates::format_due_relative;
use crate::util::unicode::truncate_to_width;

use super::helpers::{progress_bar, push_right_aligned, status_symbol};
use super::push_highlighted_spans;

/// Cells in the time-left bar
const PROGRESS_WIDTH: usize = 20;

/// Render the summary of the task under the cursor
pub fn render_detail_panel<K: KvStore>(frame: &mut Frame, app: &App<K>, area: Rect) {
    let bg = app.theme.background;
    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(app.theme.dim).bg(bg))
        .style(Style::default().bg(bg));

    let lines = match app.cursor_task() {
        Some(task) => detail_lines(app, task, block.inner(area).width as usize),
        None => Vec::new(),
    };

    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(bg));
    frame.render_widget(paragraph, area);
}

fn detail_lines<K: KvStore>(app: &App<K>, task: &Task, width: usize) -> Vec<Line<'static>> {
    let theme = &app.theme;
    let bg = theme.background;
    let dim = Style::default().fg(theme.dim).bg(bg);
    let text = Style::default().fg(theme.text).bg(bg);
    let highlight = Style::default()
        .fg(theme.search_match_fg)
        .bg(theme.search_match_bg)
        .add_modifier(Modifier::BOLD);
    let query = app.search_query();
    let today = Local::now().date_naive();
    let mut lines = Vec::new();

    // Title, id on the right
    let mut title_spans = vec![
        Span::styled(" ", dim),
        Span::styled(
            status_symbol(task.status),
            Style::default().fg(theme.status_color(task.status)).bg(bg),
        ),
        Span::styled(" ", dim),
    ];
    push_highlighted_spans(
        &mut title_spans,
        &task.title,
        Style::default()
            .fg(theme.text_bright)
            .bg(bg)
            .add_modifier(Modifier::BOLD),
        highlight,
        query.as_ref(),
    );
    push_right_aligned(
        &mut title_spans,
        vec![Span::styled(format!("{} ", task.id), dim)],
        width,
        Style::default().bg(bg),
    );
    lines.push(Line::from(title_spans));

    // Status, due date, timer
    let mut timer = format!(
        "timer {} / {}",
        format_time(task.timer_remaining),
        format_time(task.timer_duration)
    );
    if task.is_timer_running {
        timer.push_str(" (running)");
    }
    lines.push(Line::from(vec![
        Span::styled(" ", dim),
        Span::styled(
            task.status.label(),
            Style::default().fg(theme.status_color(task.status)).bg(bg),
        ),
        Span::styled(
            format!(
                "  due {} ({})  ",
                task.due_date,
                format_due_relative(&task.due_date, today)
            ),
            text,
        ),
        Span::styled(timer, text),
    ]));

    // Time left
    let percent = remaining_percent(task);
    let bar_color = if percent < LOW_TIME_PERCENT {
        theme.red
    } else {
        theme.text_bright
    };
    lines.push(Line::from(vec![
        Span::styled(" ", dim),
        Span::styled(
            progress_bar(percent, PROGRESS_WIDTH),
            Style::default().fg(bar_color).bg(bg),
        ),
        Span::styled(format!(" {:>3}% left", percent), dim),
    ]));

    // First line of the description
    let mut desc_spans = vec![Span::styled(" ", dim)];
    match task.description.lines().next() {
        Some(first) => {
            let mut shown = truncate_to_width(first, width.saturating_sub(2));
            if task.description.lines().nth(1).is_some() && !shown.ends_with('\u{2026}') {
                shown.push_str(" \u{2026}");
            }
            push_highlighted_spans(&mut desc_spans, &shown, text, highlight, query.as_ref());
        }
        None => desc_spans.push(Span::styled("no description", dim)),
    }
    lines.push(Line::from(desc_spans));

    // Where it sits and what it holds
    let mut context = Vec::new();
    if let Some(ancestors) = tree::ancestors_of(app.store().tasks(), &task.id)
        && !ancestors.is_empty()
    {
        let titles: Vec<&str> = ancestors
            .iter()
            .filter_map(|id| app.store().find(id))
            .map(|t| t.title.as_str())
            .collect();
        context.push(format!("in {}", titles.join(" \u{203A} "))); // ›
    }
    if !task.subtasks.is_empty() {
        let stats = tree::tree_stats(&task.subtasks);
        let n = stats.total();
        context.push(format!(
            "{} subtask{}, {} done",
            n,
            if n == 1 { "" } else { "s" },
            stats.count(TaskStatus::Completed)
        ));
    }
    if !context.is_empty() {
        lines.push(Line::from(Span::styled(
            truncate_to_width(&format!(" {}", context.join("  ")), width),
            dim,
        )));
    }

    lines
}
