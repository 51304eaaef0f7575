use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::io::kv::KvStore;
use crate::ops::timer::{PRESETS, format_time};
use crate::tui::app::App;
use crate::util::unicode::pad_to_width;

const POPUP_WIDTH: u16 = 26;

/// Render the timer preset chooser, centered
pub fn render_preset_popup<K: KvStore>(frame: &mut Frame, app: &App<K>, area: Rect) {
    let height = (PRESETS.len() as u16 + 3).min(area.height);
    let width = POPUP_WIDTH.min(area.width);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };
    frame.render_widget(Clear, popup);

    let bg = app.theme.background;
    let current = app.cursor_task().map(|t| t.timer_duration);
    let mut lines: Vec<Line> = Vec::new();

    let rows = PRESETS
        .iter()
        .map(|&(label, secs)| (label.to_string(), Some(secs)))
        .chain(std::iter::once(("Custom\u{2026}".to_string(), None)));
    for (idx, (label, secs)) in rows.enumerate() {
        let selected = idx == app.preset_cursor;
        let row_bg = if selected { app.theme.selection_bg } else { bg };
        let marker = if secs.is_some() && secs == current {
            "\u{2022}" // •
        } else {
            " "
        };
        let key = if secs.is_some() {
            format!("{}", idx + 1)
        } else {
            "c".to_string()
        };
        let mut label_style = Style::default().fg(app.theme.text_bright).bg(row_bg);
        if selected {
            label_style = label_style.add_modifier(Modifier::BOLD);
        }
        lines.push(Line::from(vec![
            Span::styled(
                format!(" {} ", key),
                Style::default().fg(app.theme.highlight).bg(row_bg),
            ),
            Span::styled(format!("{}{}", marker, pad_to_width(&label, 8)), label_style),
            Span::styled(
                secs.map_or(String::new(), |s| format!(" {}", format_time(s))),
                Style::default().fg(app.theme.dim).bg(row_bg),
            ),
        ]));
    }

    let block = Block::default()
        .title(" Timer ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.highlight).bg(bg))
        .style(Style::default().bg(bg));
    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, popup);
}
