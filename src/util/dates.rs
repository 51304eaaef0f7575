use chrono::{Duration, Local, NaiveDate};

/// Format used for due dates on disk and on screen
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a due-date entry relative to `today`.
///
/// Accepts `today`, `tomorrow`, `yesterday`, `in Nd`, `in Nw`, and
/// `YYYY-MM-DD`.
pub fn parse_due_input(input: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = input.trim().to_lowercase();
    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        let rest = rest.trim();
        if let Some(n) = rest.strip_suffix('d').and_then(|n| n.trim().parse::<i64>().ok()) {
            return today.checked_add_signed(Duration::days(n));
        }
        if let Some(n) = rest.strip_suffix('w').and_then(|n| n.trim().parse::<i64>().ok()) {
            return today.checked_add_signed(Duration::weeks(n));
        }
        return None;
    }

    NaiveDate::parse_from_str(&s, DATE_FORMAT).ok()
}

/// Normalize a due-date entry to `YYYY-MM-DD` against the local calendar.
pub fn normalize_due(input: &str) -> Option<String> {
    let today = Local::now().date_naive();
    parse_due_input(input, today).map(|d| d.format(DATE_FORMAT).to_string())
}

/// Short relative rendering of a stored due date: "today", "in 3d", "2d late".
/// Unparseable stored strings are shown as-is.
pub fn format_due_relative(due: &str, today: NaiveDate) -> String {
    let Ok(date) = NaiveDate::parse_from_str(due, DATE_FORMAT) else {
        return due.to_string();
    };
    let days = (date - today).num_days();
    match days {
        0 => "today".into(),
        1 => "tomorrow".into(),
        d if d > 1 => format!("in {}d", d),
        d => format!("{}d late", -d),
    }
}
