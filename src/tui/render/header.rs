use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::io::kv::KvStore;
use crate::ops::timer::format_time;
use crate::tui::app::App;

use super::helpers::push_right_aligned;

/// Render the title bar: app name, counts, time spent and the active filter
pub fn render_header<K: KvStore>(frame: &mut Frame, app: &App<K>, area: Rect) {
    let bg = app.theme.background;
    let stats = app.store().stats();

    let mut spans = vec![
        Span::styled(
            " tasktree",
            Style::default()
                .fg(app.theme.highlight)
                .bg(bg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {} tasks, {} done", stats.total(), stats.completed),
            Style::default().fg(app.theme.dim).bg(bg),
        ),
    ];
    if stats.running_timers > 0 {
        spans.push(Span::styled(
            format!(", {} running", stats.running_timers),
            Style::default().fg(app.theme.highlight).bg(bg),
        ));
    }
    if stats.elapsed_secs > 0 {
        spans.push(Span::styled(
            format!("  {} elapsed", format_time(stats.elapsed_secs)),
            Style::default().fg(app.theme.dim).bg(bg),
        ));
    }

    if let Some(query) = app.search_query() {
        let right = vec![Span::styled(
            format!("filter: {} ", query.text()),
            Style::default().fg(app.theme.search_match_bg).bg(bg),
        )];
        push_right_aligned(&mut spans, right, area.width as usize, Style::default().bg(bg));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(bg));
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{TaskId, TaskPatch};
    use crate::tui::render::test_helpers::*;

    #[test]
    fn counts_and_filter() {
        let mut app = app_with_sample_tree();
        app.store_mut().toggle_timer(&TaskId::from("a")).unwrap();
        app.search_input = "  milk ".into();
        let output = render_to_string(60, 1, |frame, area| {
            render_header(frame, &app, area);
        });
        assert_eq!(
            output,
            " tasktree  6 tasks, 0 done, 1 running          filter: milk"
        );
    }

    #[test]
    fn elapsed_time_once_timers_have_run() {
        let mut app = app_with_sample_tree();
        let patch = TaskPatch {
            timer_remaining: Some(250),
            ..Default::default()
        };
        app.store_mut().update_task(&TaskId::from("a"), &patch).unwrap();
        app.store_mut().set_timer_duration(&TaskId::from("c"), 90).unwrap();
        let output = render_to_string(60, 1, |frame, area| {
            render_header(frame, &app, area);
        });
        assert_eq!(output, " tasktree  6 tasks, 0 done  00:00:50 elapsed");
    }
}
