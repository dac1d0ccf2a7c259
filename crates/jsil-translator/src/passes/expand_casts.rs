//! Rewrites primitive and enum casts into the runtime's conversion helpers.
//!
//! Each `Cast` is examined once against its operand's type. A matching rule
//! replaces the node and the replacement is visited in its place, so a
//! second run over the output finds nothing left to rewrite.

use jsil_ast::{
    AstArena, AstError, AstVisitor, BinaryOp, DispatchCache, Handler, InvocationStyle, Node,
    NodeId, NodeKind, VisitCx, VisitResult, run_visitor_rooted,
};
use jsil_common::diagnostics::DiagnosticSink;
use jsil_metadata::{PrimitiveKind, TypeInfoProvider, TypeRef, TypeSystem, well_known};
use std::sync::Arc;
use tracing::trace;

pub struct ExpandCasts {
    types: Arc<TypeSystem>,
    provider: Arc<dyn TypeInfoProvider>,
    visit_nested: bool,
    rewritten: usize,
}

type Cx<'a> = VisitCx<'a, ExpandCasts>;

impl AstVisitor for ExpandCasts {
    fn handlers() -> Vec<(NodeKind, Handler<Self>)> {
        vec![(NodeKind::Cast, Self::visit_cast as Handler<Self>)]
    }

    fn visit_nested_functions(&self) -> bool {
        self.visit_nested
    }
}

impl ExpandCasts {
    #[must_use]
    pub fn new(types: Arc<TypeSystem>, provider: Arc<dyn TypeInfoProvider>) -> Self {
        Self {
            types,
            provider,
            visit_nested: false,
            rewritten: 0,
        }
    }

    #[must_use]
    pub fn visiting_nested_functions(mut self, visit_nested: bool) -> Self {
        self.visit_nested = visit_nested;
        self
    }

    /// Casts replaced so far.
    #[must_use]
    pub const fn rewritten(&self) -> usize {
        self.rewritten
    }

    /// Run over the tree at `root`, returning the number of casts replaced
    /// by this run. A rewritten root is dropped; use
    /// [`ExpandCasts::run_rooted`] when `root` may itself be a cast.
    pub fn run(
        &mut self,
        arena: &mut AstArena,
        root: NodeId,
        cache: &DispatchCache,
        sink: &dyn DiagnosticSink,
    ) -> Result<usize, AstError> {
        self.run_rooted(arena, root, cache, sink)
            .map(|(_, rewritten)| rewritten)
    }

    /// Like [`ExpandCasts::run`], also returning the root after the run.
    pub fn run_rooted(
        &mut self,
        arena: &mut AstArena,
        root: NodeId,
        cache: &DispatchCache,
        sink: &dyn DiagnosticSink,
    ) -> Result<(NodeId, usize), AstError> {
        let before = self.rewritten;
        let root = run_visitor_rooted(self, arena, root, cache, sink)?;
        Ok((root, self.rewritten - before))
    }

    fn visit_cast(&mut self, cx: &mut Cx<'_>, id: NodeId) -> VisitResult {
        let Some(Node::Cast {
            expression,
            new_type,
            is_coercion,
        }) = cx.arena().get(id).cloned()
        else {
            return cx.visit_children(self, id);
        };

        let Ok(current) = cx.arena().expected_type(expression, &self.types) else {
            return cx.visit_children(self, id);
        };

        match self.expand(cx.arena_mut(), expression, &current, &new_type, is_coercion) {
            Some(replacement) => {
                trace!(
                    from = %current,
                    to = %new_type,
                    "ExpandCasts::visit_cast - rewritten"
                );
                self.rewritten += 1;
                cx.replace_and_visit(self, replacement)
            }
            None => cx.visit_children(self, id),
        }
    }

    // =========================================================================
    // Rules
    // =========================================================================

    fn expand(
        &self,
        arena: &mut AstArena,
        expression: NodeId,
        current: &TypeRef,
        target: &TypeRef,
        is_coercion: bool,
    ) -> Option<NodeId> {
        let current_kind = current.primitive_kind();
        let target_kind = target.primitive_kind();

        if target.is(well_known::VALUE_TYPE) {
            return Some(expression);
        }

        if target_kind == Some(PrimitiveKind::Char)
            && (is_integral(current_kind) || self.is_enum(current))
        {
            return Some(arena.invoke_builtin("String.fromCharCode", vec![expression], target.clone()));
        }

        if current_kind == Some(PrimitiveKind::Char) && is_integral(target_kind) {
            let zero = arena.integer(0, self.types.int32());
            return Some(instance_call(arena, expression, "charCodeAt", vec![zero], target.clone()));
        }

        let nullable_enum = current.nullable_argument().is_some_and(|t| self.is_enum(t));
        if nullable_enum || self.is_enum(current) {
            return self.expand_enum(arena, expression, target, target_kind, nullable_enum);
        }

        // `t is T` with a generic T tests the `as` result against null.
        if target_kind == Some(PrimitiveKind::Boolean)
            && current.is_generic_parameter()
            && is_try_cast(arena, expression)
        {
            let null = arena.alloc(Node::NullLiteral);
            return Some(arena.binary(BinaryOp::NotEqual, expression, null, self.types.boolean()));
        }

        if target_kind == Some(PrimitiveKind::Boolean)
            && (is_coercion || !current.is(well_known::OBJECT))
        {
            let default = arena.alloc(Node::DefaultValue {
                value_type: current.clone(),
            });
            return Some(arena.binary(BinaryOp::NotEqual, expression, default, self.types.boolean()));
        }

        match (current_kind, target_kind) {
            (Some(from), Some(to)) if from.is_numeric() && to.is_numeric() && from != to => {
                Some(self.expand_numeric(arena, expression, from, to, target)?)
            }
            _ => None,
        }
    }

    fn expand_enum(
        &self,
        arena: &mut AstArena,
        expression: NodeId,
        target: &TypeRef,
        target_kind: Option<PrimitiveKind>,
        nullable: bool,
    ) -> Option<NodeId> {
        if target_kind == Some(PrimitiveKind::Boolean) {
            let int32 = self.types.int32();
            let value = arena.alloc(Node::Cast {
                expression,
                new_type: int32.clone(),
                is_coercion: true,
            });
            let zero = arena.integer(0, int32);
            return Some(arena.binary(BinaryOp::NotEqual, value, zero, self.types.boolean()));
        }

        if target_kind.is_some_and(PrimitiveKind::is_numeric) {
            if nullable {
                return Some(arena.invoke_builtin(
                    "JSIL.ValueOfNullable",
                    vec![expression],
                    target.clone(),
                ));
            }
            // Already converted from a 64-bit integer: the inner cast holds
            // the numeric value.
            if let Some(Node::Cast { expression: inner, .. }) = arena.get(expression)
                && arena
                    .expected_type(*inner, &self.types)
                    .ok()
                    .and_then(|t| t.primitive_kind())
                    .is_some_and(PrimitiveKind::is_64_bit_integer)
            {
                return Some(expression);
            }
            return Some(instance_call(arena, expression, "valueOf", Vec::new(), target.clone()));
        }

        if target.is(well_known::ENUM) {
            return Some(expression);
        }
        None
    }

    fn expand_numeric(
        &self,
        arena: &mut AstArena,
        expression: NodeId,
        from: PrimitiveKind,
        to: PrimitiveKind,
        target: &TypeRef,
    ) -> Option<NodeId> {
        match (from, to) {
            (PrimitiveKind::Int64, PrimitiveKind::UInt64) => {
                return Some(self.fake_call(arena, expression, "ToUInt64", target));
            }
            (PrimitiveKind::UInt64, PrimitiveKind::Int64) => {
                return Some(self.fake_call(arena, expression, "ToInt64", target));
            }
            (PrimitiveKind::Int64 | PrimitiveKind::UInt64, _) => {
                return Some(self.fake_call(arena, expression, "ToNumber", target));
            }
            (_, PrimitiveKind::Int64 | PrimitiveKind::UInt64) => {
                let type_id = arena.alloc(Node::TypeIdentifier {
                    referenced: target.clone(),
                });
                let from_number = arena.alloc(Node::FakeMethod {
                    name: "FromNumber".to_string(),
                    return_type: target.clone(),
                    parameter_types: vec![self.types.primitive(from)],
                });
                let method = arena.dot(type_id, from_number);
                return Some(arena.alloc(Node::Invocation {
                    style: InvocationStyle::Static,
                    method,
                    this_reference: AstArena::NULL_EXPRESSION,
                    arguments: vec![expression],
                    result_type: target.clone(),
                }));
            }
            _ => {}
        }

        if from.is_integral() || !to.is_integral() {
            // Widening needs no runtime conversion; narrowing keeps the cast.
            return (from.size_in_bytes() < to.size_in_bytes()).then_some(expression);
        }

        Some(arena.alloc(Node::Truncate {
            expression,
            new_type: target.clone(),
        }))
    }

    /// `expression.name()` through a method the runtime provides on 64-bit
    /// integers.
    fn fake_call(&self, arena: &mut AstArena, expression: NodeId, name: &str, target: &TypeRef) -> NodeId {
        let method = arena.alloc(Node::FakeMethod {
            name: name.to_string(),
            return_type: target.clone(),
            parameter_types: Vec::new(),
        });
        arena.alloc(Node::Invocation {
            style: InvocationStyle::Instance,
            method,
            this_reference: expression,
            arguments: Vec::new(),
            result_type: target.clone(),
        })
    }

    fn is_enum(&self, ty: &TypeRef) -> bool {
        self.provider
            .definition(ty)
            .is_some_and(|definition| definition.is_enum())
    }
}

fn is_integral(kind: Option<PrimitiveKind>) -> bool {
    kind.is_some_and(PrimitiveKind::is_integral)
}

fn instance_call(
    arena: &mut AstArena,
    receiver: NodeId,
    name: &str,
    arguments: Vec<NodeId>,
    result_type: TypeRef,
) -> NodeId {
    let method = arena.alloc(Node::StringIdentifier {
        text: name.to_string(),
        identifier_type: None,
    });
    arena.alloc(Node::Invocation {
        style: InvocationStyle::Instance,
        method,
        this_reference: receiver,
        arguments,
        result_type,
    })
}

fn is_try_cast(arena: &AstArena, expression: NodeId) -> bool {
    let Some(Node::Invocation { method, .. }) = arena.get(expression) else {
        return false;
    };
    matches!(
        arena.get(*method),
        Some(Node::StringIdentifier { text, .. }) if text == "JSIL.TryCast"
    )
}
