//! Unified-diff form of a delta.
//!
//! Hunks follow the textual `---`/`+++`/`@@ -a,b +c,d @@` convention so the
//! delta can be exchanged with ordinary diff tooling. Changed positions come
//! from the same position-aligned scan as the line delta; each run of changed
//! positions is written as its removed lines followed by its added lines.

use crate::diff::model::{Hunk, HunkLine, UnifiedDelta};
use crate::document::{join_lines, split_lines};
use crate::errors::{Result, RevlexError};

/// Context lines kept around each change
pub const DEFAULT_CONTEXT: usize = 3;

/// Unified delta with default labels and context
pub fn unified_delta(before: &str, after: &str) -> UnifiedDelta {
    unified_delta_with(before, after, DEFAULT_CONTEXT, "before", "after")
}

/// Unified delta with explicit context size and file labels
pub fn unified_delta_with(
    before: &str,
    after: &str,
    context: usize,
    old_label: &str,
    new_label: &str,
) -> UnifiedDelta {
    let old = split_lines(before);
    let new = split_lines(after);
    let total = old.len().max(new.len());
    let changed = |i: usize| i >= old.len() || i >= new.len() || old[i] != new[i];

    // Cluster changed positions whose unchanged gap fits inside shared context.
    let mut clusters: Vec<(usize, usize)> = Vec::new();
    for i in (0..total).filter(|&i| changed(i)) {
        match clusters.last_mut() {
            Some((_, end)) if i - *end <= 2 * context => *end = i + 1,
            _ => clusters.push((i, i + 1)),
        }
    }

    let hunks = clusters
        .into_iter()
        .map(|(start, end)| {
            let hunk_start = start.saturating_sub(context);
            let hunk_end = (end + context).min(total);
            let mut lines = Vec::new();
            let mut i = hunk_start;
            while i < hunk_end {
                if !changed(i) {
                    lines.push(HunkLine::Context(old[i].clone()));
                    i += 1;
                    continue;
                }
                let mut j = i;
                while j < hunk_end && changed(j) {
                    j += 1;
                }
                lines.extend(
                    old.iter()
                        .take(j)
                        .skip(i)
                        .map(|l| HunkLine::Removed(l.clone())),
                );
                lines.extend(
                    new.iter()
                        .take(j)
                        .skip(i)
                        .map(|l| HunkLine::Added(l.clone())),
                );
                i = j;
            }

            let old_len = lines
                .iter()
                .filter(|l| !matches!(l, HunkLine::Added(_)))
                .count();
            let new_len = lines
                .iter()
                .filter(|l| !matches!(l, HunkLine::Removed(_)))
                .count();
            Hunk {
                old_start: if old_len == 0 { hunk_start } else { hunk_start + 1 },
                old_len,
                new_start: if new_len == 0 { hunk_start } else { hunk_start + 1 },
                new_len,
                lines,
            }
        })
        .collect();

    UnifiedDelta {
        old_label: old_label.to_string(),
        new_label: new_label.to_string(),
        hunks,
    }
}

impl UnifiedDelta {
    /// Render as unified-diff text
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("--- {}\n+++ {}\n", self.old_label, self.new_label));
        for hunk in &self.hunks {
            out.push_str(&hunk.header());
            out.push('\n');
            for line in &hunk.lines {
                let (marker, text) = match line {
                    HunkLine::Context(t) => (' ', t),
                    HunkLine::Removed(t) => ('-', t),
                    HunkLine::Added(t) => ('+', t),
                };
                out.push(marker);
                out.push_str(text);
                out.push('\n');
            }
        }
        out
    }
}

fn parse_error(line: usize, reason: impl Into<String>) -> RevlexError {
    RevlexError::InvalidUnifiedDiff {
        line,
        reason: reason.into(),
    }
}

/// Parse `a` or `a,b` from a hunk header range
fn parse_range(range: &str, line_no: usize) -> Result<(usize, usize)> {
    let (start, len) = match range.split_once(',') {
        Some((s, l)) => (s, Some(l)),
        None => (range, None),
    };
    let start = start
        .parse::<usize>()
        .map_err(|_| parse_error(line_no, format!("bad range start {:?}", start)))?;
    let len = match len {
        Some(l) => l
            .parse::<usize>()
            .map_err(|_| parse_error(line_no, format!("bad range length {:?}", l)))?,
        None => 1,
    };
    Ok((start, len))
}

fn parse_hunk_header(header: &str, line_no: usize) -> Result<Hunk> {
    let body = header
        .strip_prefix("@@ ")
        .and_then(|rest| rest.split(" @@").next())
        .ok_or_else(|| parse_error(line_no, "malformed hunk header"))?;
    let mut parts = body.split_whitespace();
    let old = parts
        .next()
        .and_then(|p| p.strip_prefix('-'))
        .ok_or_else(|| parse_error(line_no, "missing old range"))?;
    let new = parts
        .next()
        .and_then(|p| p.strip_prefix('+'))
        .ok_or_else(|| parse_error(line_no, "missing new range"))?;
    let (old_start, old_len) = parse_range(old, line_no)?;
    let (new_start, new_len) = parse_range(new, line_no)?;
    Ok(Hunk {
        old_start,
        old_len,
        new_start,
        new_len,
        lines: Vec::new(),
    })
}

fn hunk_counts(hunk: &Hunk) -> (usize, usize) {
    let old = hunk
        .lines
        .iter()
        .filter(|l| !matches!(l, HunkLine::Added(_)))
        .count();
    let new = hunk
        .lines
        .iter()
        .filter(|l| !matches!(l, HunkLine::Removed(_)))
        .count();
    (old, new)
}

fn hunk_is_open(hunk: &Hunk) -> bool {
    let (old, new) = hunk_counts(hunk);
    old < hunk.old_len || new < hunk.new_len
}

fn check_hunk_counts(hunk: &Hunk, line_no: usize) -> Result<()> {
    let (old, new) = hunk_counts(hunk);
    if old != hunk.old_len || new != hunk.new_len {
        return Err(parse_error(
            line_no,
            format!(
                "hunk {} has {} old and {} new lines",
                hunk.header(),
                old,
                new
            ),
        ));
    }
    Ok(())
}

/// Parse unified-diff text for a single file.
///
/// `---`/`+++` headers are optional; multiple hunks are accepted. A second
/// file header after hunks is rejected. Lines are read as hunk content
/// while the current hunk still has fewer lines than its header declares.
///
/// # Errors
///
/// Returns `RevlexError::InvalidUnifiedDiff` on malformed input.
pub fn parse_unified(text: &str) -> Result<UnifiedDelta> {
    let mut raw: Vec<&str> = text.split('\n').collect();
    if raw.last() == Some(&"") {
        raw.pop();
    }

    let mut delta = UnifiedDelta {
        old_label: String::new(),
        new_label: String::new(),
        hunks: Vec::new(),
    };
    let mut current: Option<Hunk> = None;

    for (idx, &line) in raw.iter().enumerate() {
        let line_no = idx + 1;
        let line = line.strip_suffix('\r').unwrap_or(line);
        let open = current.as_ref().is_some_and(hunk_is_open);

        if !open {
            let seen_hunk = current.is_some() || !delta.hunks.is_empty();
            if let Some(label) = line.strip_prefix("--- ") {
                if seen_hunk {
                    return Err(parse_error(line_no, "multiple files are not supported"));
                }
                delta.old_label = label.split('\t').next().unwrap_or("").trim().to_string();
                continue;
            }
            if let Some(label) = line.strip_prefix("+++ ") {
                if seen_hunk {
                    return Err(parse_error(line_no, "multiple files are not supported"));
                }
                delta.new_label = label.split('\t').next().unwrap_or("").trim().to_string();
                continue;
            }
            if line.starts_with("@@") {
                if let Some(done) = current.take() {
                    check_hunk_counts(&done, line_no)?;
                    delta.hunks.push(done);
                }
                current = Some(parse_hunk_header(line, line_no)?);
                continue;
            }
            if line.is_empty() {
                continue;
            }
        }
        if line.starts_with('\\') {
            // "\ No newline at end of file"
            continue;
        }

        let hunk = match current.as_mut() {
            Some(h) if open => h,
            Some(h) => {
                return Err(parse_error(
                    line_no,
                    format!("hunk {} is longer than its header", h.header()),
                ))
            }
            None => return Err(parse_error(line_no, "content line outside of a hunk")),
        };
        let parsed = match line.chars().next() {
            Some(' ') => HunkLine::Context(line[1..].to_string()),
            Some('-') => HunkLine::Removed(line[1..].to_string()),
            Some('+') => HunkLine::Added(line[1..].to_string()),
            // Editors often strip the lone space of an empty context line.
            None => HunkLine::Context(String::new()),
            Some(other) => {
                return Err(parse_error(
                    line_no,
                    format!("unexpected line marker {:?}", other),
                ))
            }
        };
        hunk.lines.push(parsed);
    }

    if let Some(done) = current.take() {
        check_hunk_counts(&done, raw.len())?;
        delta.hunks.push(done);
    }
    Ok(delta)
}

fn delta_error(line: usize, reason: impl Into<String>) -> RevlexError {
    RevlexError::DeltaApplication {
        line,
        reason: reason.into(),
    }
}

/// Replay a unified delta against `before` with a single result cursor.
///
/// # Errors
///
/// Returns `RevlexError::DeltaApplication` when a context or removed line
/// does not match, or hunks overlap or run past the end of `before`.
pub fn apply_unified_delta(before: &str, delta: &UnifiedDelta) -> Result<String> {
    let old = split_lines(before);
    let mut out: Vec<String> = Vec::with_capacity(old.len());
    let mut cursor = 0usize;

    for hunk in &delta.hunks {
        let start = if hunk.old_len == 0 {
            hunk.old_start
        } else {
            hunk.old_start
                .checked_sub(1)
                .ok_or_else(|| delta_error(0, format!("hunk {} starts at 0", hunk.header())))?
        };
        if start < cursor {
            return Err(delta_error(
                hunk.old_start,
                format!("hunk {} overlaps the previous hunk", hunk.header()),
            ));
        }
        if start > old.len() {
            return Err(delta_error(
                hunk.old_start,
                format!("hunk {} starts past end of text", hunk.header()),
            ));
        }
        out.extend_from_slice(&old[cursor..start]);
        cursor = start;

        for line in &hunk.lines {
            match line {
                HunkLine::Context(text) | HunkLine::Removed(text) => {
                    let actual = old.get(cursor).ok_or_else(|| {
                        delta_error(cursor + 1, "hunk runs past end of text")
                    })?;
                    if actual != text {
                        return Err(delta_error(
                            cursor + 1,
                            format!("expected {:?}, found {:?}", text, actual),
                        ));
                    }
                    if matches!(line, HunkLine::Context(_)) {
                        out.push(actual.clone());
                    }
                    cursor += 1;
                }
                HunkLine::Added(text) => out.push(text.clone()),
            }
        }
    }

    out.extend_from_slice(&old[cursor..]);
    Ok(join_lines(&out))
}
