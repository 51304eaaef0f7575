use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::layout::Rect;

use crate::alarm::SilentAlarm;
use crate::io::kv::MemoryKv;
use crate::model::config::UiConfig;
use crate::ops::tree::tests::sample_tree;
use crate::scheduler::Scheduler;
use crate::store::TaskStore;
use crate::tui::app::App;

pub const TERM_W: u16 = 80;
pub const TERM_H: u16 = 24;

/// Render into an in-memory buffer and return plain text (no styles).
pub fn render_to_string<F>(w: u16, h: u16, f: F) -> String
where
    F: FnOnce(&mut ratatui::Frame, Rect),
{
    let backend = TestBackend::new(w, h);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal
        .draw(|frame| {
            let area = frame.area();
            f(frame, area);
        })
        .unwrap();

    let buf = terminal.backend().buffer().clone();
    let w = buf.area.width as usize;
    let lines: Vec<String> = buf
        .content
        .chunks(w)
        .map(|row| {
            let s: String = row.iter().map(|cell| cell.symbol()).collect();
            s.trim_end().to_string()
        })
        .collect();

    // Trim trailing blank lines
    let end = lines
        .iter()
        .rposition(|l| !l.is_empty())
        .map_or(0, |i| i + 1);
    lines[..end].join("\n")
}

/// An App over an in-memory store holding the shared sample tree:
/// a "Buy milk", b "Clean house" [b1, b2 [b2x]], c "Write report".
pub fn app_with_sample_tree() -> App<MemoryKv> {
    let blob = serde_json::to_string(&sample_tree()).unwrap();
    let store = TaskStore::load(
        MemoryKv::with_entry("tasks", blob),
        "tasks",
        Box::new(SilentAlarm),
    )
    .unwrap();
    App::new(Scheduler::new(store), &UiConfig::default())
}
