use jsil_ast::DispatchCache;
use jsil_common::diagnostics::{CollectingSink, diagnostic_codes};
use jsil_metadata::{InMemoryMetadata, MethodRef, TypeInfoCache, TypeRef, TypeSystem, well_known};
use jsil_translator::il::*;
use jsil_translator::{
    TranslateError, TranslateResult, TranslatedFunction, TranslatorContext, UnsupportedConstruct,
    translate_method,
};
use std::sync::Arc;

struct Fixture {
    types: TypeSystem,
    cache: TypeInfoCache,
    sink: CollectingSink,
}

impl Fixture {
    fn new() -> Self {
        Self {
            types: TypeSystem::new(),
            cache: TypeInfoCache::new(Arc::new(InMemoryMetadata::new()), &[]).unwrap(),
            sink: CollectingSink::new(),
        }
    }

    fn translate(&self, nodes: Vec<ILNode>) -> TranslateResult<TranslatedFunction> {
        let method = MethodRef::new(TypeRef::class("Demo.Program"), "Run", self.types.void())
            .static_method();
        let body = MethodBody::new(method, ILBlock::new(nodes));
        translate_method(&TranslatorContext::new(&self.types, &self.cache, &self.sink), &body)
    }

    fn render(&self, nodes: Vec<ILNode>) -> String {
        let mut function = self.translate(nodes).unwrap();
        function.render_body(&DispatchCache::new()).unwrap()
    }
}

fn int32() -> TypeRef {
    TypeRef::value_type("System.Int32")
}

fn x() -> ILVariable {
    ILVariable::local("x", int32())
}

/// `x = value;`
fn assign(value: i32) -> ILNode {
    ILNode::Expression(ILExpression::stloc(&x(), ILExpression::ldc_i4(value)))
}

fn block(nodes: Vec<ILNode>) -> ILBlock {
    ILBlock::new(nodes)
}

fn code(code: ILCode) -> ILNode {
    ILNode::Expression(ILExpression::new(code))
}

fn catch(exception_type: TypeRef, body: Vec<ILNode>) -> ILCatchBlock {
    ILCatchBlock {
        exception_type,
        exception_variable: None,
        body: block(body),
    }
}

// =============================================================================
// Branches and loops
// =============================================================================

#[test]
fn test_condition_with_else() {
    let flag = ILVariable::local("flag", TypeRef::value_type("System.Boolean"));
    let rendered = Fixture::new().render(vec![ILNode::Condition {
        condition: ILExpression::ldloc(&flag),
        true_block: block(vec![assign(1)]),
        false_block: Some(block(vec![assign(2)])),
    }]);
    assert_eq!(rendered, "{ if (flag) { x = 1; } else { x = 2; } }");
}

#[test]
fn test_constant_comparison_feeding_branch_collapses() {
    let boolean = TypeRef::value_type("System.Boolean");
    let one = || ILExpression::ldc_i4(1).expecting(boolean.clone());
    let equals = |left: ILExpression| {
        ILExpression::new(ILCode::Ceq)
            .with_argument(left)
            .with_argument(one())
    };
    let branch = |condition: ILExpression| ILNode::Condition {
        condition,
        true_block: block(vec![assign(1)]),
        false_block: None,
    };

    let rendered = Fixture::new().render(vec![branch(equals(one()))]);
    assert_eq!(rendered, "{ if (true) { x = 1; } }");

    let flag = ILVariable::local("flag", boolean.clone());
    let rendered = Fixture::new().render(vec![branch(equals(ILExpression::ldloc(&flag)))]);
    assert_eq!(rendered, "{ if (flag) { x = 1; } }");
}

#[test]
fn test_empty_else_is_omitted_and_condition_coerced() {
    let n = ILVariable::local("n", int32());
    let rendered = Fixture::new().render(vec![ILNode::Condition {
        condition: ILExpression::ldloc(&n),
        true_block: block(vec![assign(1)]),
        false_block: Some(block(Vec::new())),
    }]);
    assert_eq!(rendered, "{ if (coerce<System.Boolean>(n)) { x = 1; } }");
}

#[test]
fn test_loop_without_condition_runs_forever() {
    let rendered = Fixture::new().render(vec![ILNode::WhileLoop {
        condition: None,
        body: block(vec![
            assign(1),
            code(ILCode::LoopContinue),
            code(ILCode::LoopOrSwitchBreak),
        ]),
    }]);
    assert_eq!(rendered, "{ while (true) { x = 1; continue; break; } }");
}

#[test]
fn test_switch_cases_and_default() {
    let n = ILVariable::local("n", int32());
    let rendered = Fixture::new().render(vec![ILNode::Switch {
        condition: ILExpression::ldloc(&n),
        cases: vec![
            ILCase {
                values: vec![1, 2],
                body: block(vec![assign(1), code(ILCode::LoopOrSwitchBreak)]),
            },
            ILCase {
                values: Vec::new(),
                body: block(vec![assign(0)]),
            },
        ],
    }]);
    assert_eq!(
        rendered,
        "{ switch (n) { case 1: case 2: { x = 1; break; } default: { x = 0; } } }"
    );
}

#[test]
fn test_label_and_goto() {
    let rendered = Fixture::new().render(vec![
        ILNode::Label("top".to_string()),
        assign(1),
        ILNode::Expression(
            ILExpression::new(ILCode::Br).with_operand(ILOperand::Label("top".to_string())),
        ),
    ]);
    assert_eq!(rendered, "{ top: x = 1; goto top; }");
}

#[test]
fn test_nested_blocks_and_return() {
    let rendered = Fixture::new().render(vec![
        ILNode::Block(block(vec![assign(1), code(ILCode::Nop)])),
        code(ILCode::Ret),
    ]);
    assert_eq!(rendered, "{ { x = 1; } return; }");
}

// =============================================================================
// Protected regions
// =============================================================================

#[test]
fn test_specific_catch_falls_through_to_catch_all() {
    let e = ILVariable::local("e", TypeRef::class("System.IO.IOException"));
    let specific = ILCatchBlock {
        exception_type: TypeRef::class("System.IO.IOException"),
        exception_variable: Some(e),
        body: block(vec![assign(2)]),
    };
    let universal = catch(TypeRef::class(well_known::EXCEPTION), vec![assign(3)]);

    let fixture = Fixture::new();
    let mut function = fixture
        .translate(vec![ILNode::TryCatch(ILTryCatchBlock {
            try_block: block(vec![assign(1)]),
            catch_blocks: vec![specific, universal],
            finally_block: None,
            fault_block: None,
        })])
        .unwrap();

    assert_eq!(
        function.render_body(&DispatchCache::new()).unwrap(),
        "{ try { x = 1; } catch ($exception) { if (JSIL.CheckType($exception, System.IO.IOException)) \
         { e = $exception; x = 2; } else { x = 3; } } }"
    );
    assert!(function.variable_names().contains(&"e".to_string()));
}

#[test]
fn test_missing_catch_all_rethrows() {
    let rendered = Fixture::new().render(vec![ILNode::TryCatch(ILTryCatchBlock {
        try_block: block(vec![assign(1)]),
        catch_blocks: vec![catch(TypeRef::class("Demo.MyError"), vec![assign(2)])],
        finally_block: Some(block(vec![assign(4)])),
        fault_block: None,
    })]);
    assert_eq!(
        rendered,
        "{ try { x = 1; } catch ($exception) { if (JSIL.CheckType($exception, Demo.MyError)) \
         { x = 2; } else throw $exception; } finally { x = 4; } }"
    );
}

#[test]
fn test_lone_catch_all_and_rethrow() {
    let rendered = Fixture::new().render(vec![ILNode::TryCatch(ILTryCatchBlock {
        try_block: block(vec![assign(1)]),
        catch_blocks: vec![catch(
            TypeRef::class(well_known::EXCEPTION),
            vec![assign(2), code(ILCode::Rethrow)],
        )],
        finally_block: None,
        fault_block: None,
    })]);
    assert_eq!(
        rendered,
        "{ try { x = 1; } catch ($exception) { { x = 2; throw $exception; } } }"
    );
}

#[test]
fn test_try_finally_without_catch() {
    let rendered = Fixture::new().render(vec![ILNode::TryCatch(ILTryCatchBlock {
        try_block: block(vec![assign(1)]),
        catch_blocks: Vec::new(),
        finally_block: Some(block(vec![assign(2), code(ILCode::Endfinally)])),
        fault_block: None,
    })]);
    assert_eq!(rendered, "{ try { x = 1; } finally { x = 2; } }");
}

#[test]
fn test_object_catch_clause_is_dropped_with_diagnostic() {
    let fixture = Fixture::new();
    let rendered = fixture.render(vec![ILNode::TryCatch(ILTryCatchBlock {
        try_block: block(vec![assign(1)]),
        catch_blocks: vec![catch(TypeRef::class(well_known::OBJECT), vec![assign(2)])],
        finally_block: None,
        fault_block: None,
    })]);

    assert_eq!(
        rendered,
        "{ try { x = 1; } catch ($exception) { throw $exception; } }"
    );
    assert_eq!(
        fixture.sink.count_code(diagnostic_codes::IGNORED_CATCH_CLAUSE),
        1
    );
}

#[test]
fn test_catch_all_must_be_last() {
    let err = Fixture::new()
        .translate(vec![ILNode::TryCatch(ILTryCatchBlock {
            try_block: block(vec![assign(1)]),
            catch_blocks: vec![
                catch(TypeRef::class(well_known::EXCEPTION), vec![assign(2)]),
                catch(TypeRef::class("Demo.MyError"), vec![assign(3)]),
            ],
            finally_block: None,
            fault_block: None,
        })])
        .unwrap_err();

    match err {
        TranslateError::Unsupported(UnsupportedConstruct::CatchAllNotLast { exception_type }) => {
            assert_eq!(exception_type, "Demo.MyError");
        }
        other => panic!("expected catch ordering error, got {other:?}"),
    }
}

#[test]
fn test_fault_blocks_are_unsupported() {
    let err = Fixture::new()
        .translate(vec![ILNode::TryCatch(ILTryCatchBlock {
            try_block: block(vec![assign(1)]),
            catch_blocks: Vec::new(),
            finally_block: None,
            fault_block: Some(block(vec![assign(2)])),
        })])
        .unwrap_err();
    assert!(matches!(
        err,
        TranslateError::Unsupported(UnsupportedConstruct::FaultBlock)
    ));
    assert!(err.is_unsupported());
}

#[test]
fn test_rethrow_outside_catch_is_an_invariant_violation() {
    let err = Fixture::new()
        .translate(vec![code(ILCode::Rethrow)])
        .unwrap_err();
    assert!(matches!(err, TranslateError::Invariant(_)));
    assert!(!err.is_unsupported());
}
