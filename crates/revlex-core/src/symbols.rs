//! Pluggable symbol extraction.
//!
//! Symbol extraction is an optional enrichment for the conflict analyzer. It
//! is fallible and may return nothing; the engine works the same either way.

use serde::{Deserialize, Serialize};

/// A named declaration found in a text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Symbol {
    pub name: String,
    /// Declaration keyword (`fn`, `class`, `import`, ...)
    pub kind: String,
    /// 0-based line index
    pub line: usize,
}

/// Extracts declared symbols from a text
pub trait SymbolExtractor: Send + Sync {
    /// # Errors
    ///
    /// Returns a description of why extraction failed. Callers treat failure
    /// as "no symbols".
    fn extract_symbols(&self, text: &str) -> std::result::Result<Vec<Symbol>, String>;
}

/// Extractor that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSymbolExtractor;

impl SymbolExtractor for NoopSymbolExtractor {
    fn extract_symbols(&self, _text: &str) -> std::result::Result<Vec<Symbol>, String> {
        Ok(Vec::new())
    }
}

/// Keywords that introduce a declaration when they start a (trimmed) line
pub const DECLARATION_KEYWORDS: &[&str] = &[
    "import",
    "export",
    "class",
    "function",
    "def",
    "fn",
    "struct",
    "enum",
    "trait",
    "interface",
    "use",
    "#include",
];

const MODIFIERS: &[&str] = &["pub", "pub(crate)", "async", "default", "static", "abstract"];

/// Declaration keyword of a line, if it starts with one
pub fn declaration_keyword(line: &str) -> Option<&'static str> {
    let mut words = line.split_whitespace().peekable();
    while let Some(w) = words.peek() {
        if MODIFIERS.contains(w) {
            words.next();
        } else {
            break;
        }
    }
    let first = words.next()?;
    DECLARATION_KEYWORDS.iter().copied().find(|kw| {
        first == *kw
            || first
                .strip_prefix(kw)
                .is_some_and(|rest| rest.starts_with(['(', '<', '{']))
    })
}

fn declared_name(line: &str, keyword: &str) -> Option<String> {
    let after = line.split_once(keyword)?.1.trim_start();
    let after = after.trim_start_matches(['<', '"']);
    let name: String = after
        .chars()
        .take_while(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '.' | ':' | '/'))
        .collect();
    let name = name.trim_end_matches([':', '.']);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Line-prefix heuristics: a line starting with a declaration keyword
/// declares the identifier that follows it.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicSymbolExtractor;

impl SymbolExtractor for HeuristicSymbolExtractor {
    fn extract_symbols(&self, text: &str) -> std::result::Result<Vec<Symbol>, String> {
        Ok(text
            .split('\n')
            .enumerate()
            .filter_map(|(line, content)| {
                let kind = declaration_keyword(content)?;
                let name = declared_name(content, kind)?;
                Some(Symbol {
                    name,
                    kind: kind.to_string(),
                    line,
                })
            })
            .collect())
    }
}
