use ratatui::style::Style;
use ratatui::text::Span;

use crate::model::task::TaskStatus;
use crate::util::unicode;

/// Checkbox-style status symbol, e.g. `[>]`
pub(super) fn status_symbol(status: TaskStatus) -> String {
    format!("[{}]", status.marker())
}

/// Compute total display width of a slice of spans
pub(super) fn spans_width(spans: &[Span]) -> usize {
    spans
        .iter()
        .map(|s| unicode::display_width(&s.content))
        .sum()
}

/// Append `right` flush against the right edge, padding with `fill`. If the
/// row is too narrow the right part is dropped.
pub(super) fn push_right_aligned(
    spans: &mut Vec<Span<'static>>,
    right: Vec<Span<'static>>,
    width: usize,
    fill: Style,
) {
    let used = spans_width(spans);
    let right_w = spans_width(&right);
    if used + right_w < width {
        spans.push(Span::styled(" ".repeat(width - used - right_w), fill));
        spans.extend(right);
    } else if used < width {
        spans.push(Span::styled(" ".repeat(width - used), fill));
    }
}

/// Fixed-width bar, `percent` of it filled
pub(super) fn progress_bar(percent: u64, width: usize) -> String {
    let filled = (percent.min(100) as usize * width) / 100;
    format!(
        "{}{}",
        "\u{2588}".repeat(filled),
        "\u{2591}".repeat(width - filled)
    )
}

/// Split an edit buffer around a block cursor: (before, under cursor, after).
/// At the end of the buffer the cursor sits on a blank cell.
pub(super) fn split_at_cursor(buf: &str, cursor: usize) -> (&str, &str, &str) {
    let cursor = cursor.min(buf.len());
    match unicode::next_grapheme_boundary(buf, cursor) {
        Some(next) => (&buf[..cursor], &buf[cursor..next], &buf[next..]),
        None => (buf, " ", ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_split_respects_graphemes() {
        assert_eq!(split_at_cursor("cafe\u{301}!", 3), ("caf", "e\u{301}", "!"));
        assert_eq!(split_at_cursor("ab", 2), ("ab", " ", ""));
    }

    #[test]
    fn right_alignment_pads_to_width() {
        let mut spans = vec![Span::raw("left")];
        push_right_aligned(&mut spans, vec![Span::raw("right")], 20, Style::default());
        assert_eq!(spans_width(&spans), 20);
        assert_eq!(spans.last().unwrap().content, "right");
    }

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(progress_bar(50, 10), "\u{2588}".repeat(5) + &"\u{2591}".repeat(5));
        assert_eq!(progress_bar(0, 4), "\u{2591}".repeat(4));
        assert_eq!(progress_bar(100, 4), "\u{2588}".repeat(4));
        assert_eq!(progress_bar(19, 10).chars().filter(|c| *c == '\u{2588}').count(), 1);
    }

    #[test]
    fn right_part_dropped_when_narrow() {
        let mut spans = vec![Span::raw("left")];
        push_right_aligned(&mut spans, vec![Span::raw("right")], 8, Style::default());
        assert_eq!(spans_width(&spans), 8);
        assert!(spans.iter().all(|s| s.content != "right"));
    }
}
