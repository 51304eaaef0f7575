use std::borrow::Cow;
use std::ops::Range;

use regex::{Regex, RegexBuilder};

use crate::model::task::Task;

/// A compiled, case-insensitive literal substring query.
///
/// A blank query (empty or whitespace only) compiles to `None` in
/// [`SearchQuery::new`]; callers treat that as "no filter".
#[derive(Debug, Clone)]
pub struct SearchQuery {
    text: String,
    re: Regex,
}

impl SearchQuery {
    pub fn new(query: &str) -> Option<SearchQuery> {
        let text = query.trim();
        if text.is_empty() {
            return None;
        }
        // The pattern is escaped, so it is always a valid regex.
        let re = RegexBuilder::new(&regex::escape(text))
            .case_insensitive(true)
            .build()
            .ok()?;
        Some(SearchQuery {
            text: text.to_string(),
            re,
        })
    }

    /// The trimmed query text
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.re.is_match(haystack)
    }

    /// Whether the task itself (not its subtasks) matches
    pub fn matches_task(&self, task: &Task) -> bool {
        self.is_match(&task.title) || self.is_match(&task.description)
    }

    /// Byte ranges of every non-overlapping match in `text`
    pub fn spans(&self, text: &str) -> Vec<Range<usize>> {
        self.re.find_iter(text).map(|m| m.start()..m.end()).collect()
    }
}

/// Prune the tree to tasks that match `query`, plus the ancestors of any match.
///
/// A blank query returns the input borrowed, untouched. Otherwise each kept
/// node carries only its kept subtasks, and sibling order is preserved.
pub fn filter_tasks<'a>(tasks: &'a [Task], query: &str) -> Cow<'a, [Task]> {
    match SearchQuery::new(query) {
        None => Cow::Borrowed(tasks),
        Some(q) => Cow::Owned(filter_with(tasks, &q)),
    }
}

/// Same as [`filter_tasks`] with a precompiled query.
pub fn filter_with(tasks: &[Task], query: &SearchQuery) -> Vec<Task> {
    tasks.iter().filter_map(|t| filter_task(t, query)).collect()
}

fn filter_task(task: &Task, query: &SearchQuery) -> Option<Task> {
    let kept_subtasks = filter_with(&task.subtasks, query);
    if query.matches_task(task) || !kept_subtasks.is_empty() {
        let mut kept = task.clone_shallow();
        kept.subtasks = kept_subtasks;
        Some(kept)
    } else {
        None
    }
}

impl Task {
    /// Clone every field except `subtasks`, which comes back empty.
    fn clone_shallow(&self) -> Task {
        Task {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status,
            due_date: self.due_date.clone(),
            timer_duration: self.timer_duration,
            timer_remaining: self.timer_remaining,
            is_timer_running: self.is_timer_running,
            subtasks: Vec::new(),
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::tree::tests::{sample_tree, task};

    fn titles(tasks: &[Task]) -> Vec<String> {
        let mut out = Vec::new();
        fn walk(tasks: &[Task], depth: usize, out: &mut Vec<String>) {
            for t in tasks {
                out.push(format!("{}{}", "  ".repeat(depth), t.title));
                walk(&t.subtasks, depth + 1, out);
            }
        }
        walk(tasks, 0, &mut out);
        out
    }

    #[test]
    fn blank_query_borrows_input() {
        let tree = sample_tree();
        for q in ["", "   ", "\t"] {
            let out = filter_tasks(&tree, q);
            assert!(matches!(out, Cow::Borrowed(_)));
            assert!(std::ptr::eq(out.as_ptr(), tree.as_ptr()));
        }
    }

    #[test]
    fn keeps_ancestor_chain_of_match() {
        let tree = vec![
            task("1", "Buy milk", vec![]),
            task(
                "2",
                "Clean house",
                vec![task("3", "Vacuum living room", vec![])],
            ),
        ];
        let out = filter_tasks(&tree, "room");
        assert_eq!(titles(&out), vec!["Clean house", "  Vacuum living room"]);
    }

    #[test]
    fn drops_non_matching_siblings_under_kept_parent() {
        let tree = sample_tree();
        let out = filter_tasks(&tree, "glasses");
        assert_eq!(
            titles(&out),
            vec!["Clean house", "  Dishes", "    Dry glasses"]
        );
    }

    #[test]
    fn direct_match_keeps_only_matching_children() {
        // "Clean house" matches itself; none of its children match "house".
        let tree = sample_tree();
        let out = filter_tasks(&tree, "house");
        assert_eq!(titles(&out), vec!["Clean house"]);
    }

    #[test]
    fn matches_description_case_insensitively() {
        let mut tree = sample_tree();
        tree[2].description = "Quarterly NUMBERS for finance".into();
        let out = filter_tasks(&tree, "numbers");
        assert_eq!(titles(&out), vec!["Write report"]);
    }

    #[test]
    fn query_is_literal_not_regex() {
        let tree = vec![
            task("1", "a.b", vec![]),
            task("2", "axb", vec![]),
        ];
        let out = filter_tasks(&tree, "a.b");
        assert_eq!(titles(&out), vec!["a.b"]);
    }

    #[test]
    fn query_is_trimmed() {
        let tree = sample_tree();
        let out = filter_tasks(&tree, "  milk  ");
        assert_eq!(titles(&out), vec!["Buy milk"]);
    }

    #[test]
    fn no_match_yields_empty() {
        let tree = sample_tree();
        let out = filter_tasks(&tree, "nothing like this");
        assert!(out.is_empty());
    }

    #[test]
    fn filtering_is_idempotent() {
        let tree = sample_tree();
        for q in ["room", "d", "glasses", "house", "zzz", ""] {
            let once = filter_tasks(&tree, q).into_owned();
            let twice = filter_tasks(&once, q).into_owned();
            assert_eq!(once, twice, "query {:?}", q);
        }
    }

    #[test]
    fn filter_does_not_touch_input() {
        let tree = sample_tree();
        let before = tree.clone();
        let _ = filter_tasks(&tree, "room");
        assert_eq!(tree, before);
    }

    #[test]
    fn spans_and_task_match() {
        let q = SearchQuery::new("ro").unwrap();
        assert_eq!(q.spans("Vacuum living ROom, room"), vec![14..16, 20..22]);
        let mut t = task("1", "Back door", vec![]);
        assert!(!q.matches_task(&t));
        t.description = "brown".into();
        assert!(q.matches_task(&t));
    }
}
