//! Conflict analysis over a candidate patch.
//!
//! The analyzer is advisory: it never mutates the patch and never fails.
//! It simulates the patch on a copy of the document, tracking where every
//! line originally came from, and reports findings on the way.
//!
//! ## Checks
//!
//! | Check | Severity |
//! |---|---|
//! | malformed op, out-of-range address, failing `test` | critical |
//! | two mutating ops on the same index | high |
//! | resulting text has unbalanced brackets (input was balanced) | high |
//! | removes an import/export/declaration line | medium |
//! | extractor symbol disappears | medium |
//! | op addresses a line shifted or inserted by an earlier op | low |
//! | resulting text keeps a pre-existing bracket imbalance | low |

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::conflict::heuristics::check_brackets;
use crate::conflict::model::{
    ConflictReport, Finding, FindingCategory, Resolution, ResolutionAction, Severity,
};
use crate::document::{join_lines, split_lines};
use crate::errors::PatchFailure;
use crate::patch::apply::step;
use crate::patch::model::Patch;
use crate::patch::validate::{resolve_op, LineAddress, ResolvedOp};
use crate::symbols::{declaration_keyword, NoopSymbolExtractor, SymbolExtractor};

/// Patch screener with an optional symbol extractor
#[derive(Clone)]
pub struct ConflictAnalyzer {
    extractor: Arc<dyn SymbolExtractor>,
}

impl Default for ConflictAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConflictAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConflictAnalyzer").finish_non_exhaustive()
    }
}

/// Analyse `patch` against `text` with the default analyzer
pub fn analyze_conflicts(patch: &Patch, text: &str) -> ConflictReport {
    ConflictAnalyzer::new().analyze(patch, text)
}

fn finding(
    severity: Severity,
    category: FindingCategory,
    op_indices: Vec<usize>,
    line: Option<usize>,
    message: String,
) -> Finding {
    Finding {
        severity,
        category,
        op_indices,
        line,
        message,
    }
}

fn suggest(report: &mut ConflictReport, action: ResolutionAction, op_indices: Vec<usize>, description: String) {
    report.suggestions.push(Resolution {
        action,
        op_indices,
        description,
    });
}

/// Index a mutating op writes to, for duplicate detection
fn write_target(op: &ResolvedOp<'_>) -> Option<usize> {
    match *op {
        ResolvedOp::Add { at, .. } => at.index(),
        ResolvedOp::Remove { at } | ResolvedOp::Replace { at, .. } => Some(at),
        ResolvedOp::Move { from, .. } => Some(from),
        ResolvedOp::Copy { to, .. } => to.index(),
        ResolvedOp::Test { .. } => None,
    }
}

/// Existing line an op reads or replaces, for order-dependence checks
fn addressed_line(op: &ResolvedOp<'_>, len: usize) -> Option<usize> {
    let line = match *op {
        ResolvedOp::Add {
            at: LineAddress::Index(i),
            ..
        } if i < len => Some(i),
        ResolvedOp::Add { .. } => None,
        ResolvedOp::Remove { at } | ResolvedOp::Replace { at, .. } | ResolvedOp::Test { at, .. } => {
            Some(at)
        }
        ResolvedOp::Move { from, .. } | ResolvedOp::Copy { from, .. } => Some(from),
    };
    line.filter(|&i| i < len)
}

/// Mirror a successful step on the origin column
fn track_origins(origins: &mut Vec<Option<usize>>, op: &ResolvedOp<'_>) {
    match *op {
        ResolvedOp::Add { at, .. } => {
            let index = at.resolve(origins.len());
            origins.insert(index, None);
        }
        ResolvedOp::Remove { at } => {
            origins.remove(at);
        }
        ResolvedOp::Move { from, to } => {
            let dest = to.resolve(origins.len());
            let origin = origins.remove(from);
            let dest = if dest > from { dest - 1 } else { dest };
            origins.insert(dest, origin);
        }
        ResolvedOp::Copy { to, .. } => {
            let index = to.resolve(origins.len());
            origins.insert(index, None);
        }
        ResolvedOp::Replace { .. } | ResolvedOp::Test { .. } => {}
    }
}

impl ConflictAnalyzer {
    /// Analyzer without symbol extraction
    pub fn new() -> Self {
        Self {
            extractor: Arc::new(NoopSymbolExtractor),
        }
    }

    /// Analyzer that also reports symbols disappearing
    pub fn with_extractor(extractor: impl SymbolExtractor + 'static) -> Self {
        Self {
            extractor: Arc::new(extractor),
        }
    }

    /// Screen `patch` against `text`
    pub fn analyze(&self, patch: &Patch, text: &str) -> ConflictReport {
        let mut report = ConflictReport::default();

        let mut resolved = Vec::with_capacity(patch.len());
        for (i, op) in patch.iter().enumerate() {
            match resolve_op(op, i) {
                Ok(r) => resolved.push(Some(r)),
                Err(e) => {
                    report.push(finding(
                        Severity::Critical,
                        FindingCategory::Malformed,
                        vec![i],
                        None,
                        e.to_string(),
                    ));
                    suggest(
                        &mut report,
                        ResolutionAction::DropOperation,
                        vec![i],
                        format!("fix or drop malformed operation {}", i),
                    );
                    resolved.push(None);
                }
            }
        }

        self.check_duplicates(&resolved, &mut report);

        let before = split_lines(text);
        if let Some(after) = self.simulate(&resolved, &before, &mut report) {
            if resolved.iter().all(Option::is_some) {
                let result = join_lines(&after);
                self.check_result(text, &result, &mut report);
            }
        }

        report
    }

    fn check_duplicates(&self, resolved: &[Option<ResolvedOp<'_>>], report: &mut ConflictReport) {
        let mut by_target: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, op) in resolved.iter().enumerate() {
            if let Some(target) = op.as_ref().and_then(write_target) {
                by_target.entry(target).or_default().push(i);
            }
        }
        for (target, ops) in by_target {
            if ops.len() < 2 {
                continue;
            }
            report.push(finding(
                Severity::High,
                FindingCategory::DuplicateTarget,
                ops.clone(),
                Some(target),
                format!("operations {:?} all target line index {}", ops, target),
            ));
            suggest(
                report,
                ResolutionAction::MergeOperations,
                ops,
                format!("merge the operations on line index {} into one", target),
            );
        }
    }

    /// Run the patch on a copy. Returns the resulting lines, or `None` if an
    /// op would fail.
    fn simulate(
        &self,
        resolved: &[Option<ResolvedOp<'_>>],
        before: &[String],
        report: &mut ConflictReport,
    ) -> Option<Vec<String>> {
        let mut lines = before.to_vec();
        let mut origins: Vec<Option<usize>> = (0..before.len()).map(Some).collect();

        for (i, op) in resolved.iter().enumerate() {
            let Some(op) = op else { continue };

            if let Some(at) = addressed_line(op, lines.len()) {
                match origins[at] {
                    Some(orig) if orig == at => {}
                    Some(orig) => {
                        report.push(finding(
                            Severity::Low,
                            FindingCategory::OrderDependent,
                            vec![i],
                            Some(at),
                            format!(
                                "operation {} addresses index {}, which held original line {} before earlier operations shifted it",
                                i, at, orig
                            ),
                        ));
                        suggest(
                            report,
                            ResolutionAction::ReorderOperations,
                            vec![i],
                            "order operations from the bottom of the document up".to_string(),
                        );
                    }
                    None => {
                        report.push(finding(
                            Severity::Low,
                            FindingCategory::OrderDependent,
                            vec![i],
                            Some(at),
                            format!(
                                "operation {} addresses index {}, a line inserted by an earlier operation",
                                i, at
                            ),
                        ));
                    }
                }
            }

            self.check_declaration_loss(i, op, &lines, report);

            if let Err(failure) = step(&mut lines, op) {
                let (category, line) = match failure {
                    PatchFailure::IndexOutOfRange { index, .. } => (FindingCategory::OutOfRange, index),
                    PatchFailure::TestFailed { index, .. } => (FindingCategory::TestMismatch, index),
                };
                let message = format!("operation {}: {}", i, failure);
                report.push(finding(Severity::Critical, category, vec![i], Some(line), message));
                suggest(
                    report,
                    ResolutionAction::DropOperation,
                    vec![i],
                    format!("operation {} cannot apply to the current text", i),
                );
                return None;
            }
            track_origins(&mut origins, op);
        }

        Some(lines)
    }

    fn check_declaration_loss(
        &self,
        op_index: usize,
        op: &ResolvedOp<'_>,
        lines: &[String],
        report: &mut ConflictReport,
    ) {
        let (at, replacement) = match *op {
            ResolvedOp::Remove { at } => (at, None),
            ResolvedOp::Replace { at, value } => (at, Some(value)),
            _ => return,
        };
        let Some(current) = lines.get(at) else { return };
        let Some(keyword) = declaration_keyword(current) else {
            return;
        };
        if replacement.and_then(declaration_keyword) == Some(keyword) {
            return;
        }
        report.push(finding(
            Severity::Medium,
            FindingCategory::DeclarationRemoved,
            vec![op_index],
            Some(at),
            format!(
                "operation {} removes a '{}' line: {}",
                op_index,
                keyword,
                current.trim()
            ),
        ));
        suggest(
            report,
            ResolutionAction::ReviewManually,
            vec![op_index],
            format!("check nothing still depends on the removed '{}'", keyword),
        );
    }

    fn check_result(&self, before: &str, after: &str, report: &mut ConflictReport) {
        if let Some(issue) = check_brackets(after) {
            report.push(finding(
                Severity::High,
                FindingCategory::BracketImbalance,
                Vec::new(),
                Some(issue.line),
                format!("patched text is unbalanced: {}", issue.message),
            ));
            if check_brackets(before).is_some() {
                report.push(finding(
                    Severity::Low,
                    FindingCategory::BracketImbalance,
                    Vec::new(),
                    None,
                    "text was already unbalanced before the patch".to_string(),
                ));
            } else {
                suggest(
                    report,
                    ResolutionAction::ReviewManually,
                    Vec::new(),
                    "restore the missing or extra bracket".to_string(),
                );
            }
        }

        let symbols_before = self.extract(before);
        let symbols_after = self.extract(after);
        if let (Some(old), Some(new)) = (symbols_before, symbols_after) {
            let kept: BTreeSet<(String, String)> =
                new.into_iter().map(|s| (s.kind, s.name)).collect();
            let mut reported = BTreeSet::new();
            for symbol in old {
                let key = (symbol.kind.clone(), symbol.name.clone());
                if kept.contains(&key) || !reported.insert(key) {
                    continue;
                }
                report.push(finding(
                    Severity::Medium,
                    FindingCategory::SymbolRemoved,
                    Vec::new(),
                    Some(symbol.line),
                    format!("{} '{}' no longer exists", symbol.kind, symbol.name),
                ));
            }
        }
    }

    fn extract(&self, text: &str) -> Option<Vec<crate::symbols::Symbol>> {
        match self.extractor.extract_symbols(text) {
            Ok(symbols) => Some(symbols),
            Err(reason) => {
                tracing::warn!(
                    component = "conflict_analyzer",
                    reason = %reason,
                    "symbol extraction failed, skipping symbol checks"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::model::PatchOp;
    use crate::patch::invert::diff_patch;

    #[test]
    fn test_clean_patch() {
        let report = analyze_conflicts(&Patch::new(vec![PatchOp::replace(1, "  return 2;")]), "f() {\n  return 1;\n}");
        assert!(report.is_clean(), "{:?}", report);
    }

    #[test]
    fn test_generated_patches_are_clean() {
        let before = "a\nb\nc\nd";
        for after in ["a", "a\nB\nc\nd\ne\nf", "", "x"] {
            let report = analyze_conflicts(&diff_patch(before, after), before);
            assert!(report.is_clean(), "{} -> {}: {:?}", before, after, report);
        }
    }

    #[test]
    fn test_out_of_range_is_critical() {
        let report = analyze_conflicts(&Patch::new(vec![PatchOp::remove(5)]), "a\nb\nc");
        assert_eq!(report.severity, Severity::Critical);
        assert_eq!(report.conflicts[0].category, FindingCategory::OutOfRange);
        assert_eq!(report.suggestions[0].action, ResolutionAction::DropOperation);
    }

    #[test]
    fn test_order_dependence_is_low() {
        let report = analyze_conflicts(
            &Patch::new(vec![PatchOp::remove(0), PatchOp::replace(1, "x")]),
            "a\nb\nc",
        );
        assert_eq!(report.severity, Severity::Low);
        assert_eq!(report.warnings[0].category, FindingCategory::OrderDependent);
    }

    #[test]
    fn test_failure_in_analysis_does_not_panic_on_malformed() {
        let patch = Patch::new(vec![PatchOp {
            op: crate::patch::model::OpKind::Replace,
            path: "/nope".to_string(),
            value: None,
            from: None,
        }]);
        let report = analyze_conflicts(&patch, "a");
        assert_eq!(report.conflicts[0].category, FindingCategory::Malformed);
    }
}
