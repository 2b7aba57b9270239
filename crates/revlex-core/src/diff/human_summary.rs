//! Human-readable summaries of line deltas, used for the change log.

use crate::diff::model::{LineChangeKind, LineDelta};

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

/// One-line summary such as `"2 lines modified, 1 line added"`.
///
/// Returns `"no changes"` for an empty delta.
pub fn render_human_summary(delta: &LineDelta) -> String {
    let parts: Vec<String> = [
        (LineChangeKind::Modify, "modified"),
        (LineChangeKind::Add, "added"),
        (LineChangeKind::Delete, "removed"),
    ]
    .iter()
    .filter_map(|(kind, verb)| {
        let n = delta.count(*kind);
        (n > 0).then(|| format!("{} {}", plural(n, "line"), verb))
    })
    .collect();

    if parts.is_empty() {
        "no changes".to_string()
    } else {
        parts.join(", ")
    }
}

/// Multi-line listing of every change, one per line (`~ 2: old -> new`)
pub fn render_change_listing(delta: &LineDelta) -> String {
    let mut out = String::new();
    for change in &delta.changes {
        let line = match change.kind {
            LineChangeKind::Add => format!(
                "+ {}: {}",
                change.line,
                change.new_content.as_deref().unwrap_or("")
            ),
            LineChangeKind::Delete => format!(
                "- {}: {}",
                change.line,
                change.old_content.as_deref().unwrap_or("")
            ),
            LineChangeKind::Modify => format!(
                "~ {}: {} -> {}",
                change.line,
                change.old_content.as_deref().unwrap_or(""),
                change.new_content.as_deref().unwrap_or("")
            ),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}
