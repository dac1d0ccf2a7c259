use jsil::metadata::{MethodRef, PrimitiveKind, TypeRef, well_known};
use jsil::translator::il::*;
use jsil::translator::UnsupportedConstruct;
use jsil::{
    CollectingSink, InMemoryMetadata, NullSink, TranslateError, TranslationSession,
    TranslatorOptions,
};
use std::sync::Arc;

// =============================================================================
// Fixtures
// =============================================================================

fn int32() -> TypeRef {
    TypeRef::value_type("System.Int32")
}

fn int64() -> TypeRef {
    TypeRef::value_type("System.Int64")
}

fn session(options: TranslatorOptions) -> TranslationSession {
    jsil::tracing_config::init_tracing();
    TranslationSession::new(Arc::new(InMemoryMetadata::new()), options).unwrap()
}

fn method(name: &str) -> MethodRef {
    MethodRef::new(
        TypeRef::class("Demo.Program"),
        name,
        TypeRef::value_type(well_known::VOID),
    )
    .static_method()
}

fn body(name: &str, statements: Vec<ILExpression>) -> MethodBody {
    MethodBody::new(
        method(name),
        ILBlock::new(statements.into_iter().map(ILNode::Expression).collect()),
    )
}

/// `l = (long)n;`
fn widening_body(name: &str) -> MethodBody {
    let n = ILVariable::local("n", int32());
    let l = ILVariable::local("l", int64());
    let conversion = ILExpression::new(ILCode::ConvOvf(PrimitiveKind::Int64))
        .with_argument(ILExpression::ldloc(&n));
    body(name, vec![ILExpression::stloc(&l, conversion)])
}

/// `x = value;`
fn assign_body(name: &str, value: i32) -> MethodBody {
    let x = ILVariable::local("x", int32());
    body(name, vec![ILExpression::stloc(&x, ILExpression::ldc_i4(value))])
}

fn fault_body(name: &str) -> MethodBody {
    let x = ILVariable::local("x", int32());
    let assign = ILNode::Expression(ILExpression::stloc(&x, ILExpression::ldc_i4(1)));
    MethodBody::new(
        method(name),
        ILBlock::new(vec![ILNode::TryCatch(ILTryCatchBlock {
            try_block: ILBlock::new(vec![assign.clone()]),
            catch_blocks: Vec::new(),
            finally_block: None,
            fault_block: Some(ILBlock::new(vec![assign])),
        })]),
    )
}

fn sequential() -> TranslatorOptions {
    TranslatorOptions {
        use_threads: false,
        ..TranslatorOptions::default()
    }
}

// =============================================================================
// Single methods
// =============================================================================

#[test]
fn test_casts_are_expanded_by_default() {
    let session = session(TranslatorOptions::default());
    let mut function = session.translate(&widening_body("Widen"), &NullSink).unwrap();
    assert_eq!(
        function.render_body(session.dispatch_cache()).unwrap(),
        "{ l = System.Int64.FromNumber(n); }"
    );
}

#[test]
fn test_cast_expansion_can_be_disabled() {
    let session = session(TranslatorOptions {
        simplify_casts: false,
        ..TranslatorOptions::default()
    });
    let mut function = session.translate(&widening_body("Widen"), &NullSink).unwrap();
    assert_eq!(
        function.render_body(session.dispatch_cache()).unwrap(),
        "{ l = cast<System.Int64>(n); }"
    );
}

#[test]
fn test_render_includes_function_header() {
    let session = session(sequential());
    let mut function = session.translate(&assign_body("Run", 7), &NullSink).unwrap();
    assert_eq!(
        session.render(&mut function).unwrap(),
        "function Run() { x = 7; }"
    );
}

#[test]
fn test_strict_mode_is_forwarded() {
    let localloc = body("Alloc", vec![ILExpression::new(ILCode::Localloc)]);

    let lenient = session(sequential());
    let sink = CollectingSink::new();
    assert!(lenient.translate(&localloc, &sink).is_ok());
    assert_eq!(sink.diagnostics().len(), 1);

    let strict = session(TranslatorOptions {
        strict_untranslatable: true,
        ..sequential()
    });
    let err = strict.translate(&localloc, &NullSink).unwrap_err();
    assert!(err.is_unsupported());
}

#[test]
fn test_invalid_ignore_pattern_fails_session_creation() {
    let options = TranslatorOptions {
        ignored_modules: vec!["Demo.[".to_string()],
        ..TranslatorOptions::default()
    };
    let result = TranslationSession::new(Arc::new(InMemoryMetadata::new()), options);
    let Err(err) = result else {
        panic!("expected an invalid glob to be rejected");
    };
    assert!(format!("{err:#}").contains("failed to build the type information cache"));
}

// =============================================================================
// Batches
// =============================================================================

fn mixed_batch() -> Vec<MethodBody> {
    vec![
        assign_body("First", 1),
        fault_body("Broken"),
        widening_body("Widen"),
        assign_body("Last", 4),
    ]
}

fn check_mixed_report(session: &TranslationSession) {
    let bodies = mixed_batch();
    let mut report = session.translate_batch(&bodies, &NullSink);

    assert!(!report.is_clean());
    assert_eq!(report.translated.len(), 3);
    assert_eq!(report.failed.len(), 1);

    let (failed_method, err) = &report.failed[0];
    assert_eq!(failed_method.name, "Broken");
    assert!(matches!(
        err,
        TranslateError::Unsupported(UnsupportedConstruct::FaultBlock)
    ));

    let names: Vec<&str> = report
        .translated
        .iter()
        .map(|function| function.method.name.as_str())
        .collect();
    assert_eq!(names, vec!["First", "Widen", "Last"]);

    let widen = bodies[2].method.full_name();
    let function = report.function_mut(&widen).unwrap();
    assert_eq!(
        function.render_body(session.dispatch_cache()).unwrap(),
        "{ l = System.Int64.FromNumber(n); }"
    );
}

#[test]
fn test_batch_isolates_failures_sequentially() {
    check_mixed_report(&session(sequential()));
}

#[test]
fn test_batch_isolates_failures_on_thread_pool() {
    check_mixed_report(&session(TranslatorOptions::default()));
}

#[test]
fn test_large_parallel_batch_matches_sequential() {
    let bodies: Vec<MethodBody> = (0..64)
        .map(|i| assign_body(&format!("M{i}"), i))
        .collect();

    let render_all = |session: &TranslationSession| -> Vec<String> {
        let mut report = session.translate_batch(&bodies, &NullSink);
        assert!(report.is_clean());
        report
            .translated
            .iter_mut()
            .map(|function| session.render(function).unwrap())
            .collect()
    };

    let threaded = render_all(&session(TranslatorOptions::default()));
    let single = render_all(&session(sequential()));
    assert_eq!(threaded, single);
    assert_eq!(threaded[5], "function M5() { x = 5; }");
}

#[test]
fn test_empty_batch() {
    let report = session(TranslatorOptions::default()).translate_batch(&[], &NullSink);
    assert!(report.is_clean());
    assert!(report.translated.is_empty());
}
