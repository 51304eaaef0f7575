pub mod detail_panel;
pub mod header;
pub mod help_overlay;
mod helpers;
pub mod preset_popup;
pub mod status_row;
pub mod tree_view;

#[cfg(test)]
pub(crate) mod test_helpers;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Style;
use ratatui::text::Span;
use ratatui::widgets::Block;

use crate::io::kv::KvStore;
use crate::ops::filter::SearchQuery;

use super::app::{App, Mode};

/// Rows taken by the detail panel, including its top border
const DETAIL_HEIGHT: u16 = 6;

/// Main render function: lays out the screen and dispatches to sub-renderers
pub fn render<K: KvStore>(frame: &mut Frame, app: &mut App<K>) {
    let area = frame.area();

    // Background fill
    let bg_style = Style::default().bg(app.theme.background);
    frame.render_widget(Block::default().style(bg_style), area);

    // Layout: header | tree | detail panel | status row
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(DETAIL_HEIGHT),
            Constraint::Length(1),
        ])
        .split(area);

    header::render_header(frame, app, chunks[0]);
    tree_view::render_tree_view(frame, app, chunks[1]);
    detail_panel::render_detail_panel(frame, app, chunks[2]);
    status_row::render_status_row(frame, app, chunks[3]);

    // Overlays (rendered on top of everything)
    if app.mode == Mode::Presets {
        preset_popup::render_preset_popup(frame, app, area);
    }
    if app.show_help {
        help_overlay::render_help_overlay(frame, app, area);
    }
}

/// Push spans for text with search match highlighting. With no query, or no
/// match, pushes a single span with `base_style`.
pub(super) fn push_highlighted_spans(
    spans: &mut Vec<Span<'static>>,
    text: &str,
    base_style: Style,
    highlight_style: Style,
    query: Option<&SearchQuery>,
) {
    let ranges = query.map(|q| q.spans(text)).unwrap_or_default();
    if ranges.is_empty() {
        spans.push(Span::styled(text.to_string(), base_style));
        return;
    }

    let mut last_end = 0;
    for range in ranges {
        if range.start > last_end {
            spans.push(Span::styled(
                text[last_end..range.start].to_string(),
                base_style,
            ));
        }
        spans.push(Span::styled(
            text[range.clone()].to_string(),
            highlight_style,
        ));
        last_end = range.end;
    }
    if last_end < text.len() {
        spans.push(Span::styled(text[last_end..].to_string(), base_style));
    }
}
