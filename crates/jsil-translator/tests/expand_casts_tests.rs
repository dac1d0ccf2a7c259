use jsil_ast::{AstArena, AstPrinter, DispatchCache, Node, NodeId, VariableKind};
use jsil_common::diagnostics::NullSink;
use jsil_metadata::{
    FieldDefinition, InMemoryMetadata, TypeDefinition, TypeFlags, TypeInfoCache, TypeInfoProvider,
    TypeRef, TypeSystem, well_known,
};
use jsil_translator::ExpandCasts;
use rayon::prelude::*;
use std::sync::Arc;

fn primitive(name: &str) -> TypeRef {
    TypeRef::value_type(name)
}

fn color() -> TypeRef {
    TypeRef::value_type("Demo.Color")
}

fn color_definition() -> TypeDefinition {
    let mut t = TypeDefinition::new("Demo.Color", "Demo");
    t.flags = TypeFlags::ENUM | TypeFlags::VALUE_TYPE;
    t.base_type = Some(TypeRef::class(well_known::ENUM));
    let mut value = FieldDefinition::new("Demo.Color", "value__", primitive("System.Int32"));
    value.is_runtime_special_name = true;
    t.fields.push(value);
    for (name, constant) in [("Red", 0), ("Green", 1)] {
        let mut field = FieldDefinition::new("Demo.Color", name, color());
        field.is_static = true;
        field.constant = Some(constant);
        t.fields.push(field);
    }
    t
}

struct Fixture {
    types: Arc<TypeSystem>,
    provider: Arc<dyn TypeInfoProvider>,
    cache: DispatchCache,
}

impl Fixture {
    fn new() -> Self {
        let source = InMemoryMetadata::new().with_type(color_definition());
        let provider: Arc<dyn TypeInfoProvider> =
            Arc::new(TypeInfoCache::new(Arc::new(source), &[]).unwrap());
        Self {
            types: Arc::new(TypeSystem::new()),
            provider,
            cache: DispatchCache::new(),
        }
    }

    fn pass(&self) -> ExpandCasts {
        ExpandCasts::new(Arc::clone(&self.types), Arc::clone(&self.provider))
    }

    /// Expand `cast<target>(name)` for a variable `name` of type `source`,
    /// returning the rendered statement and the number of rewrites.
    fn expand(&self, name: &str, source: TypeRef, target: TypeRef, is_coercion: bool) -> (String, usize) {
        let mut arena = AstArena::new();
        let root = cast_statement(&mut arena, name, source, target, is_coercion);
        let rewritten = self
            .pass()
            .run(&mut arena, root, &self.cache, &NullSink)
            .unwrap();
        (AstPrinter::render(&mut arena, root, &self.cache).unwrap(), rewritten)
    }
}

fn cast_statement(
    arena: &mut AstArena,
    name: &str,
    source: TypeRef,
    target: TypeRef,
    is_coercion: bool,
) -> NodeId {
    let value = arena.variable_node(name, source, VariableKind::Local);
    let cast = arena.alloc(Node::Cast {
        expression: value,
        new_type: target,
        is_coercion,
    });
    let statement = arena.expression_statement(cast);
    arena.block(vec![statement])
}

// =============================================================================
// Rules
// =============================================================================

#[test]
fn test_cast_to_value_type_is_dropped() {
    let fixture = Fixture::new();
    let (rendered, rewritten) = fixture.expand(
        "n",
        primitive("System.Int32"),
        TypeRef::class(well_known::VALUE_TYPE),
        false,
    );
    assert_eq!(rendered, "{ n; }");
    assert_eq!(rewritten, 1);
}

#[test]
fn test_char_conversions() {
    let fixture = Fixture::new();
    let (to_char, _) = fixture.expand("n", primitive("System.Int32"), primitive("System.Char"), false);
    assert_eq!(to_char, "{ String.fromCharCode(n); }");

    let (from_enum, _) = fixture.expand("c", color(), primitive("System.Char"), false);
    assert_eq!(from_enum, "{ String.fromCharCode(c); }");

    let (to_int, _) = fixture.expand("ch", primitive("System.Char"), primitive("System.UInt16"), false);
    assert_eq!(to_int, "{ ch.charCodeAt(0); }");
}

#[test]
fn test_enum_sources() {
    let fixture = Fixture::new();

    let (to_int, rewritten) = fixture.expand("c", color(), primitive("System.Int32"), false);
    assert_eq!(to_int, "{ c.valueOf(); }");
    assert_eq!(rewritten, 1);

    // The coercion produced for the boolean test is itself an enum source.
    let (to_bool, rewritten) = fixture.expand("c", color(), primitive("System.Boolean"), false);
    assert_eq!(to_bool, "{ c.valueOf() !== 0; }");
    assert_eq!(rewritten, 2);

    let (to_enum, _) = fixture.expand("c", color(), TypeRef::class(well_known::ENUM), false);
    assert_eq!(to_enum, "{ c; }");

    let nullable = TypeRef::generic_instance(TypeRef::value_type(well_known::NULLABLE), vec![color()]);
    let (from_nullable, _) = fixture.expand("maybe", nullable, primitive("System.Int32"), false);
    assert_eq!(from_nullable, "{ JSIL.ValueOfNullable(maybe); }");
}

#[test]
fn test_enum_to_unrelated_type_keeps_cast() {
    let fixture = Fixture::new();
    let (rendered, rewritten) = fixture.expand("c", color(), TypeRef::class("Demo.Shape"), false);
    assert_eq!(rendered, "{ cast<Demo.Shape>(c); }");
    assert_eq!(rewritten, 0);
}

#[test]
fn test_boolean_targets() {
    let fixture = Fixture::new();
    let (from_int, _) = fixture.expand("n", primitive("System.Int32"), primitive("System.Boolean"), false);
    assert_eq!(from_int, "{ n !== JSIL.DefaultValue(System.Int32); }");

    let object = TypeRef::class(well_known::OBJECT);
    let (from_object, rewritten) = fixture.expand("o", object.clone(), primitive("System.Boolean"), false);
    assert_eq!(from_object, "{ cast<System.Boolean>(o); }");
    assert_eq!(rewritten, 0);

    let (coerced, _) = fixture.expand("o", object, primitive("System.Boolean"), true);
    assert_eq!(coerced, "{ o !== JSIL.DefaultValue(System.Object); }");
}

#[test]
fn test_64_bit_conversions() {
    let fixture = Fixture::new();
    let long = primitive("System.Int64");
    let ulong = primitive("System.UInt64");

    let (signed_to_unsigned, _) = fixture.expand("l", long.clone(), ulong.clone(), false);
    assert_eq!(signed_to_unsigned, "{ l.ToUInt64(); }");

    let (unsigned_to_signed, _) = fixture.expand("u", ulong, long.clone(), false);
    assert_eq!(unsigned_to_signed, "{ u.ToInt64(); }");

    let (to_number, _) = fixture.expand("l", long.clone(), primitive("System.Int32"), false);
    assert_eq!(to_number, "{ l.ToNumber(); }");

    let (from_number, _) = fixture.expand("n", primitive("System.Int32"), long, false);
    assert_eq!(from_number, "{ System.Int64.FromNumber(n); }");
}

#[test]
fn test_integral_width_changes() {
    let fixture = Fixture::new();

    let (widening, rewritten) = fixture.expand("s", primitive("System.Int16"), primitive("System.Int32"), false);
    assert_eq!(widening, "{ s; }");
    assert_eq!(rewritten, 1);

    let (narrowing, rewritten) = fixture.expand("n", primitive("System.Int32"), primitive("System.Int16"), false);
    assert_eq!(narrowing, "{ cast<System.Int16>(n); }");
    assert_eq!(rewritten, 0);

    let (to_float, _) = fixture.expand("n", primitive("System.Int32"), primitive("System.Double"), false);
    assert_eq!(to_float, "{ n; }");
}

#[test]
fn test_float_to_integer_truncates() {
    let fixture = Fixture::new();
    let (rendered, _) = fixture.expand("d", primitive("System.Double"), primitive("System.Int32"), false);
    assert_eq!(rendered, "{ trunc<System.Int32>(d); }");

    let (widened, _) = fixture.expand("f", primitive("System.Single"), primitive("System.Double"), false);
    assert_eq!(widened, "{ f; }");
}

#[test]
fn test_is_generic_parameter_compares_with_null() {
    let fixture = Fixture::new();
    let parameter = TypeRef::type_parameter("T", 0);

    let mut arena = AstArena::new();
    let value = arena.variable_node("o", TypeRef::class(well_known::OBJECT), VariableKind::Local);
    let type_id = arena.alloc(Node::TypeIdentifier {
        referenced: parameter.clone(),
    });
    let try_cast = arena.invoke_builtin("JSIL.TryCast", vec![value, type_id], parameter);
    let cast = arena.alloc(Node::Cast {
        expression: try_cast,
        new_type: primitive("System.Boolean"),
        is_coercion: false,
    });
    let statement = arena.expression_statement(cast);
    let root = arena.block(vec![statement]);

    let mut pass = fixture.pass();
    assert_eq!(pass.run(&mut arena, root, &fixture.cache, &NullSink).unwrap(), 1);
    assert_eq!(
        AstPrinter::render(&mut arena, root, &fixture.cache).unwrap(),
        "{ JSIL.TryCast(o, T) !== null; }"
    );
}

// =============================================================================
// Traversal
// =============================================================================

#[test]
fn test_second_run_finds_nothing() {
    let fixture = Fixture::new();
    let mut arena = AstArena::new();
    let root = cast_statement(&mut arena, "c", color(), primitive("System.Boolean"), false);

    let mut pass = fixture.pass();
    assert_eq!(pass.run(&mut arena, root, &fixture.cache, &NullSink).unwrap(), 2);
    let first = AstPrinter::render(&mut arena, root, &fixture.cache).unwrap();

    assert_eq!(pass.run(&mut arena, root, &fixture.cache, &NullSink).unwrap(), 0);
    assert_eq!(AstPrinter::render(&mut arena, root, &fixture.cache).unwrap(), first);
    assert_eq!(pass.rewritten(), 2);
}

#[test]
fn test_nested_functions_are_opt_in() {
    let fixture = Fixture::new();
    let build = |arena: &mut AstArena| {
        let inner = cast_statement(arena, "d", primitive("System.Double"), primitive("System.Int32"), false);
        let variables = arena.new_variable_table();
        let function = arena.alloc(Node::FunctionExpression {
            name: None,
            parameters: Vec::new(),
            body: inner,
            variables,
        });
        let statement = arena.expression_statement(function);
        arena.block(vec![statement])
    };

    let mut arena = AstArena::new();
    let root = build(&mut arena);
    let skipped = fixture
        .pass()
        .run(&mut arena, root, &fixture.cache, &NullSink)
        .unwrap();
    assert_eq!(skipped, 0);

    let mut arena = AstArena::new();
    let root = build(&mut arena);
    let visited = fixture
        .pass()
        .visiting_nested_functions(true)
        .run(&mut arena, root, &fixture.cache, &NullSink)
        .unwrap();
    assert_eq!(visited, 1);
    assert_eq!(
        AstPrinter::render(&mut arena, root, &fixture.cache).unwrap(),
        "{ function () { trunc<System.Int32>(d); }; }"
    );
}

#[test]
fn test_parallel_runs_share_dispatch_cache() {
    let fixture = Fixture::new();
    let rendered: Vec<String> = (0..16)
        .into_par_iter()
        .map(|i| {
            let mut arena = AstArena::new();
            let name = format!("v{i}");
            let root = cast_statement(&mut arena, &name, color(), primitive("System.Int32"), false);
            fixture
                .pass()
                .run(&mut arena, root, &fixture.cache, &NullSink)
                .unwrap();
            AstPrinter::render(&mut arena, root, &fixture.cache).unwrap()
        })
        .collect();

    for (i, text) in rendered.iter().enumerate() {
        assert_eq!(text, &format!("{{ v{i}.valueOf(); }}"));
    }
}

#[test]
fn test_cast_at_the_root_is_rewritten() {
    let fixture = Fixture::new();
    let mut arena = AstArena::new();
    let value = arena.variable_node("c", color(), VariableKind::Local);
    let cast = arena.alloc(Node::Cast {
        expression: value,
        new_type: primitive("System.Boolean"),
        is_coercion: false,
    });

    let (root, rewritten) = fixture
        .pass()
        .run_rooted(&mut arena, cast, &fixture.cache, &NullSink)
        .unwrap();
    assert_ne!(root, cast);
    assert_eq!(rewritten, 2);
    assert_eq!(
        AstPrinter::render(&mut arena, root, &fixture.cache).unwrap(),
        "c.valueOf() !== 0"
    );
}
