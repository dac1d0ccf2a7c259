use jsil_common::diagnostics::*;

#[test]
fn test_format_message_fills_positional_placeholders() {
    let text = format_message("Instruction not yet implemented: {0} {1}", &["Localloc", "null"]);
    assert_eq!(text, "Instruction not yet implemented: Localloc null");
}

#[test]
fn test_from_code_uses_table_category() {
    let diag = TranslationDiagnostic::from_code(
        diagnostic_codes::UNTRANSLATABLE_INSTRUCTION,
        &["Cpblk", "TypeReference"],
    );
    assert_eq!(diag.category, DiagnosticCategory::Warning);
    assert_eq!(
        diag.message_text,
        "Instruction not yet implemented: Cpblk TypeReference"
    );
    assert!(diag.method.is_none());
}

#[test]
fn test_unknown_code_is_error() {
    let diag = TranslationDiagnostic::from_code(9999, &["a", "b"]);
    assert_eq!(diag.category, DiagnosticCategory::Error);
    assert_eq!(diag.message_text, "a b");
}

#[test]
fn test_collecting_sink_preserves_order_and_take_drains() {
    let sink = CollectingSink::new();
    sink.report(TranslationDiagnostic::from_code(
        diagnostic_codes::IGNORED_CATCH_CLAUSE,
        &["System.Object"],
    ));
    sink.report(
        TranslationDiagnostic::from_code(diagnostic_codes::UNTRANSLATABLE_NODE, &["Foo"])
            .in_method("A::B"),
    );

    assert_eq!(sink.count_code(diagnostic_codes::IGNORED_CATCH_CLAUSE), 1);
    let drained = sink.take();
    assert_eq!(drained.len(), 2);
    assert_eq!(drained[1].method.as_deref(), Some("A::B"));
    assert!(sink.diagnostics().is_empty());
}

#[test]
fn test_every_code_has_a_message() {
    for code in [
        diagnostic_codes::UNTRANSLATABLE_INSTRUCTION,
        diagnostic_codes::UNTRANSLATABLE_NODE,
        diagnostic_codes::FALLBACK_TRAVERSAL,
        diagnostic_codes::IGNORED_CATCH_CLAUSE,
        diagnostic_codes::NULL_CHILD_SKIPPED,
        diagnostic_codes::UNRESOLVED_MEMBER,
        diagnostic_codes::PROXY_OVER_PROXY,
        diagnostic_codes::INITIALIZER_ELEMENT_NOT_IMPLEMENTED,
        diagnostic_codes::IGNORED_MEMBER_ACCESS,
    ] {
        assert!(get_diagnostic_message(code).is_some(), "missing message for {code}");
    }
}
