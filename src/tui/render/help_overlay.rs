use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::io::kv::KvStore;
use crate::tui::app::App;

const BINDINGS: &[(&str, &[(&str, &str)])] = &[
    (
        "Navigation",
        &[
            ("\u{2191}\u{2193}/jk", "Move cursor up/down"),
            ("\u{2190}/h", "Collapse / go to parent"),
            ("\u{2192}/l", "Expand / go to first child"),
            ("Enter", "Expand or collapse"),
            ("g/G", "Jump to top/bottom"),
        ],
    ),
    (
        "Tasks",
        &[
            ("n / a", "New task / new subtask"),
            ("e / E / u", "Edit title / description / due"),
            ("s / 1-4", "Next status / set status"),
            ("x", "Delete with subtasks"),
        ],
    ),
    (
        "Timer",
        &[
            ("Space/t", "Toggle timer"),
            ("r", "Reset timer"),
            ("d / T", "Preset / custom duration"),
        ],
    ),
    (
        "Global",
        &[
            ("/ / Esc", "Search / clear search"),
            ("?", "Toggle this help"),
            ("q", "Quit"),
        ],
    ),
];

/// Render the help overlay (toggled with ?)
pub fn render_help_overlay<K: KvStore>(frame: &mut Frame, app: &App<K>, area: Rect) {
    let overlay_area = centered_rect(60, 80, area);
    frame.render_widget(Clear, overlay_area);

    let bg = app.theme.background;
    let key_style = Style::default()
        .fg(app.theme.highlight)
        .bg(bg)
        .add_modifier(Modifier::BOLD);
    let desc_style = Style::default().fg(app.theme.text).bg(bg);
    let header_style = Style::default()
        .fg(app.theme.text_bright)
        .bg(bg)
        .add_modifier(Modifier::BOLD);

    let mut lines: Vec<Line> = vec![Line::from(Span::styled(" Key Bindings", header_style))];
    for (section, bindings) in BINDINGS {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", section), header_style)));
        for (key, desc) in *bindings {
            lines.push(Line::from(vec![
                Span::styled(format!(" {:<14}", key), key_style),
                Span::styled(*desc, desc_style),
            ]));
        }
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.dim).bg(bg))
        .style(Style::default().bg(bg));
    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(bg));
    frame.render_widget(paragraph, overlay_area);
}

/// Create a centered rectangle of the given percentage of the parent
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
