//! Text heuristics used by the conflict analyzer.
//!
//! None of this parses a real language. Brackets inside quoted strings and
//! `//` comments are skipped; everything else counts.

/// Where a bracket check first went wrong
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketIssue {
    /// 0-based line
    pub line: usize,
    pub message: String,
}

fn closer_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Index of the closing quote for a `'` at `start`, or `None` when the quote
/// is an apostrophe or lifetime rather than a literal.
fn single_quote_end(chars: &[char], start: usize) -> Option<usize> {
    let prev = start.checked_sub(1).map(|i| chars[i]);
    // Short char literals: 'x' and '\n'
    if chars.get(start + 2) == Some(&'\'') && chars.get(start + 1) != Some(&'\\') {
        return Some(start + 2);
    }
    if chars.get(start + 1) == Some(&'\\') {
        return (start + 2..chars.len().min(start + 8)).find(|&i| chars[i] == '\'');
    }
    if prev.is_some_and(|c| c.is_alphanumeric() || c == '&' || c == '<') {
        return None;
    }
    (start + 1..chars.len()).find(|&i| chars[i] == '\'' && chars[i - 1] != '\\')
}

fn double_quote_end(chars: &[char], start: usize, quote: char) -> Option<usize> {
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == '\\' {
            i += 2;
            continue;
        }
        if chars[i] == quote {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Check `()`, `[]` and `{}` balance. Returns the first problem, if any.
pub fn check_brackets(text: &str) -> Option<BracketIssue> {
    let mut stack: Vec<(char, usize)> = Vec::new();

    for (line_no, line) in text.split('\n').enumerate() {
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            match c {
                '/' if chars.get(i + 1) == Some(&'/') => break,
                '"' | '`' => {
                    // Unterminated quotes run to the end of the line.
                    match double_quote_end(&chars, i, c) {
                        Some(end) => i = end,
                        None => break,
                    }
                }
                '\'' => {
                    if let Some(end) = single_quote_end(&chars, i) {
                        i = end;
                    }
                }
                '(' | '[' | '{' => stack.push((c, line_no)),
                ')' | ']' | '}' => match stack.pop() {
                    Some((open, _)) if closer_for(open) == c => {}
                    Some((open, open_line)) => {
                        return Some(BracketIssue {
                            line: line_no,
                            message: format!(
                                "'{}' on line {} closes '{}' opened on line {}",
                                c,
                                line_no + 1,
                                open,
                                open_line + 1
                            ),
                        });
                    }
                    None => {
                        return Some(BracketIssue {
                            line: line_no,
                            message: format!("unmatched '{}' on line {}", c, line_no + 1),
                        });
                    }
                },
                _ => {}
            }
            i += 1;
        }
    }

    stack.pop().map(|(open, line)| BracketIssue {
        line,
        message: format!("'{}' opened on line {} is never closed", open, line + 1),
    })
}
