//! Conflict analyzer scenarios.

use revlex_core::conflict::{
    analyze_conflicts, ConflictAnalyzer, FindingCategory, RecommendedAction, ResolutionAction,
    Severity,
};
use revlex_core::patch::{diff_patch, Patch, PatchOp};
use revlex_core::symbols::{HeuristicSymbolExtractor, Symbol, SymbolExtractor};

const SOURCE: &str = "import os\n\ndef run(x):\n    return helper(x)\n\ndef helper(x):\n    return [x]";

#[test]
fn test_duplicate_target_is_high_and_suggests_merge() {
    // GIVEN two replacements of the same line
    let patch = Patch::new(vec![PatchOp::replace(1, "b1"), PatchOp::replace(1, "b2")]);

    // WHEN analysing
    let report = analyze_conflicts(&patch, "a\nb\nc");

    // THEN a high conflict names both ops and a merge is suggested
    assert_eq!(report.severity, Severity::High);
    let dup = report
        .conflicts
        .iter()
        .find(|f| f.category == FindingCategory::DuplicateTarget)
        .unwrap();
    assert_eq!(dup.op_indices, vec![0, 1]);
    assert!(report
        .suggestions
        .iter()
        .any(|s| s.action == ResolutionAction::MergeOperations && s.op_indices == vec![0, 1]));
    assert_eq!(report.recommended_action(), RecommendedAction::Block);
}

#[test]
fn test_removing_import_is_medium_warning() {
    let report = analyze_conflicts(&Patch::new(vec![PatchOp::remove(0)]), SOURCE);

    assert_eq!(report.severity, Severity::Medium);
    assert!(report.conflicts.is_empty());
    assert_eq!(report.warnings[0].category, FindingCategory::DeclarationRemoved);
    assert_eq!(report.recommended_action(), RecommendedAction::Warn);
}

#[test]
fn test_renaming_a_declaration_keeps_keyword_quietly() {
    let report = analyze_conflicts(&Patch::new(vec![PatchOp::replace(2, "def go(x):")]), SOURCE);
    assert!(report
        .findings()
        .all(|f| f.category != FindingCategory::DeclarationRemoved));
}

#[test]
fn test_bracket_imbalance_in_result_is_high() {
    // GIVEN a balanced function
    let text = "function f(){\n  return 1;\n}";

    // WHEN a patch drops the closing brace
    let report = analyze_conflicts(&Patch::new(vec![PatchOp::remove(2)]), text);

    // THEN the result is flagged high
    assert_eq!(report.severity, Severity::High);
    assert_eq!(report.conflicts[0].category, FindingCategory::BracketImbalance);
}

#[test]
fn test_unbalanced_result_is_high_even_if_already_unbalanced() {
    // GIVEN text that is already missing its closing brace
    let text = "function f(){\n  return 1;";

    // WHEN an unrelated line is replaced
    let report = analyze_conflicts(&Patch::new(vec![PatchOp::replace(1, "  return 2;")]), text);

    // THEN the unbalanced result still blocks, with a note on the prior state
    assert_eq!(report.severity, Severity::High);
    assert_eq!(report.conflicts[0].category, FindingCategory::BracketImbalance);
    assert_eq!(report.warnings[0].category, FindingCategory::BracketImbalance);
    assert_eq!(report.warnings[0].severity, Severity::Low);
}

#[test]
fn test_append_to_open_call_is_high() {
    let report = analyze_conflicts(&Patch::new(vec![PatchOp::append("x")]), "f(");
    assert!(report.blocks_at(Severity::High));
}

#[test]
fn test_test_op_mismatch_is_critical() {
    let patch = Patch::new(vec![PatchOp::test(0, "nope"), PatchOp::replace(0, "x")]);
    let report = analyze_conflicts(&patch, "a");
    assert_eq!(report.severity, Severity::Critical);
    assert_eq!(report.conflicts[0].category, FindingCategory::TestMismatch);
    assert_eq!(report.conflicts[0].op_indices, vec![0]);
}

#[test]
fn test_add_one_past_end_is_valid() {
    let report = analyze_conflicts(&Patch::new(vec![PatchOp::add(3, "d")]), "a\nb\nc");
    assert!(report.is_clean());
}

#[test]
fn test_analyzer_never_mutates_the_patch() {
    let patch = Patch::new(vec![PatchOp::remove(0), PatchOp::remove(0)]);
    let copy = patch.clone();
    let _ = analyze_conflicts(&patch, "a\nb");
    assert_eq!(patch, copy);
}

#[test]
fn test_extractor_reports_removed_symbols() {
    // GIVEN the heuristic extractor
    let analyzer = ConflictAnalyzer::with_extractor(HeuristicSymbolExtractor);
    let after = "import os\n\ndef run(x):\n    return x";

    // WHEN the patch deletes the helper function
    let report = analyzer.analyze(&diff_patch(SOURCE, after), SOURCE);

    // THEN the lost symbol is a medium warning
    let removed: Vec<_> = report
        .warnings
        .iter()
        .filter(|f| f.category == FindingCategory::SymbolRemoved)
        .collect();
    assert_eq!(removed.len(), 1);
    assert!(removed[0].message.contains("helper"));
}

struct FailingExtractor;

impl SymbolExtractor for FailingExtractor {
    fn extract_symbols(&self, _text: &str) -> Result<Vec<Symbol>, String> {
        Err("parser unavailable".to_string())
    }
}

#[test]
fn test_failing_extractor_is_ignored() {
    let analyzer = ConflictAnalyzer::with_extractor(FailingExtractor);
    let report = analyzer.analyze(&Patch::new(vec![PatchOp::replace(0, "b")]), "a");
    assert!(report.is_clean());
}
