//! Calls, construction, function pointers, and member-policy substitution.

use super::MethodTranslator;
use super::expressions::argument;
use crate::error::{TranslateError, TranslateResult, UnsupportedConstruct};
use crate::il::{ILCode, ILExpression, ILOperand};
use jsil_ast::{AstArena, InvocationStyle, Node, NodeId};
use jsil_common::diagnostics::diagnostic_codes;
use jsil_metadata::{InvokePolicy, MemberHandle, MethodRef, ReadPolicy, TypeRef, WritePolicy, well_known};
use tracing::{debug, warn};

/// Which accessor of a property a call site targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Accessor {
    None,
    Getter,
    Setter,
}

impl Accessor {
    const fn of(code: ILCode) -> Self {
        match code {
            ILCode::CallGetter | ILCode::CallvirtGetter => Accessor::Getter,
            ILCode::CallSetter | ILCode::CallvirtSetter => Accessor::Setter,
            _ => Accessor::None,
        }
    }
}

impl MethodTranslator<'_> {
    // =========================================================================
    // Calls
    // =========================================================================

    pub(super) fn translate_call(&mut self, expression: &ILExpression, code: ILCode) -> TranslateResult<NodeId> {
        let method = operand_method(expression)?;
        if method.is_unbound_generic() {
            return Err(UnsupportedConstruct::UnboundGenericMethod(method.full_name()).into());
        }

        if let Some(type_of) = self.type_from_handle(method, expression) {
            return Ok(type_of);
        }

        let (identifier, member) = self.method_identifier(method);
        let parameters = method.resolved_parameters();
        let result_type = method.resolved_return_type();

        if !method.has_this {
            let arguments = self.translate_arguments(&expression.arguments, &parameters)?;
            if let Some(replacement) =
                self.call_substitution(member.as_ref(), Accessor::of(code), &result_type, &arguments)
            {
                return Ok(replacement);
            }
            let type_id = self.type_identifier(&method.declaring_type);
            let qualified = self.arena.dot(type_id, identifier);
            return Ok(self.arena.alloc(Node::Invocation {
                style: InvocationStyle::Static,
                method: qualified,
                this_reference: AstArena::NULL_EXPRESSION,
                arguments,
                result_type,
            }));
        }

        let receiver_expression = argument(expression, 0)?;
        let receiver = self.translate_expression(receiver_expression)?;
        let this_reference = self.call_receiver(receiver_expression, receiver)?;
        let arguments = self.translate_arguments(&expression.arguments[1..], &parameters)?;
        if let Some(replacement) =
            self.call_substitution(member.as_ref(), Accessor::of(code), &result_type, &arguments)
        {
            return Ok(replacement);
        }

        // A direct call on a receiver of exactly the declaring type can use
        // ordinary member syntax; anything else (base calls, calls through
        // `this` from a derived type) must name the declaring type.
        let receiver_type = receiver_expression
            .expected_type
            .as_ref()
            .or(receiver_expression.inferred_type.as_ref())
            .map(|t| t.dereferenced().clone());
        let declared_on_receiver = receiver_type
            .as_ref()
            .is_some_and(|t| same_definition(&method.declaring_type, t));
        let receiver_is_this = matches!(
            &receiver_expression.operand,
            ILOperand::Variable(variable) if variable.is_this()
        );
        let this_matches = receiver_type
            .as_ref()
            .is_some_and(|t| same_definition(self.method().declaring_type.dereferenced(), t));

        if declared_on_receiver && (!receiver_is_this || this_matches) {
            return Ok(self.arena.alloc(Node::Invocation {
                style: InvocationStyle::Instance,
                method: identifier,
                this_reference,
                arguments,
                result_type,
            }));
        }

        let type_id = self.type_identifier(&method.declaring_type);
        let qualified = self.arena.dot(type_id, identifier);
        Ok(self.arena.alloc(Node::Invocation {
            style: InvocationStyle::ExplicitThis,
            method: qualified,
            this_reference,
            arguments,
            result_type,
        }))
    }

    pub(super) fn translate_callvirt(&mut self, expression: &ILExpression, code: ILCode) -> TranslateResult<NodeId> {
        let method = operand_method(expression)?;
        if method.is_unbound_generic() {
            return Err(UnsupportedConstruct::UnboundGenericMethod(method.full_name()).into());
        }

        let (identifier, member) = self.method_identifier(method);
        let parameters = method.resolved_parameters();
        let result_type = method.resolved_return_type();

        let receiver_expression = argument(expression, 0)?;
        let receiver = self.translate_expression(receiver_expression)?;
        let this_reference = self.call_receiver(receiver_expression, receiver)?;
        let arguments = self.translate_arguments(&expression.arguments[1..], &parameters)?;
        if let Some(replacement) =
            self.call_substitution(member.as_ref(), Accessor::of(code), &result_type, &arguments)
        {
            return Ok(replacement);
        }

        Ok(self.arena.alloc(Node::Invocation {
            style: InvocationStyle::Instance,
            method: identifier,
            this_reference,
            arguments,
            result_type,
        }))
    }

    /// `typeof(T)` compiles to `ldtoken T; call Type.GetTypeFromHandle`.
    fn type_from_handle(&mut self, method: &MethodRef, expression: &ILExpression) -> Option<NodeId> {
        if method.name != "GetTypeFromHandle" || !method.declaring_type.is(well_known::TYPE) {
            return None;
        }
        match expression.argument(0) {
            Some(ILExpression {
                code: ILCode::Ldtoken,
                operand: ILOperand::Type(referenced),
                ..
            }) => Some(self.type_identifier(referenced)),
            _ => {
                debug!("type_from_handle - unrecognized typeof expression");
                None
            }
        }
    }

    /// Receivers of value-type methods arrive as references and must be
    /// loaded through.
    fn call_receiver(&mut self, receiver_expression: &ILExpression, receiver: NodeId) -> TranslateResult<NodeId> {
        let on_value_type = receiver_expression
            .value_type()
            .is_some_and(|t| t.dereferenced().is_value_type());
        if !on_value_type {
            return Ok(receiver);
        }
        self.try_dereference(receiver)?.ok_or_else(|| {
            TranslateError::invariant(
                "this-expression for method invocation on value type must be a reference",
            )
        })
    }

    fn translate_arguments(
        &mut self,
        arguments: &[ILExpression],
        parameters: &[TypeRef],
    ) -> TranslateResult<Vec<NodeId>> {
        let mut translated = Vec::with_capacity(arguments.len());
        for (index, value) in arguments.iter().enumerate() {
            let node = self.translate_expression(value)?;
            let by_reference = parameters.get(index).is_some_and(TypeRef::is_by_reference);
            translated.push(if by_reference {
                self.arena.pass_by_reference(node)?
            } else {
                node
            });
        }
        Ok(translated)
    }

    fn method_identifier(&mut self, method: &MethodRef) -> (NodeId, Option<MemberHandle>) {
        let member = self.cx.provider.get_method(method);
        if member.is_none() {
            self.report_unresolved(&method.name, &method.declaring_type);
        }
        let name = member
            .as_ref()
            .map_or_else(|| method.name.clone(), |m| m.name());
        let id = self.arena.alloc(Node::MethodIdentifier {
            name,
            method: method.clone(),
            member: member.clone(),
        });
        (id, member)
    }

    // =========================================================================
    // Construction and function pointers
    // =========================================================================

    pub(super) fn new_object(&mut self, expression: &ILExpression) -> TranslateResult<NodeId> {
        let constructor = operand_method(expression)?;
        let new_type = constructor.declaring_type.clone();
        let parameters = constructor.resolved_parameters();

        if self.is_delegate(&new_type) {
            let type_name = self.arena.type_name(new_type.clone());
            let mut arguments = vec![type_name];
            arguments.extend(self.translate_all(&expression.arguments)?);
            return Ok(self
                .arena
                .invoke_builtin("System.Delegate.New", arguments, new_type));
        }

        let arguments = self.translate_arguments(&expression.arguments, &parameters)?;

        if let Some(member) = self.cx.provider.get_method(constructor)
            && let Some(replacement) = self.invoke_substitution(&member, &new_type, &arguments)
        {
            return Ok(replacement);
        }

        if new_type.is_array() {
            let element_type = new_type
                .element_type()
                .cloned()
                .unwrap_or_else(|| self.cx.types.object());
            let type_id = self.type_identifier(&element_type);
            let mut dimensions = vec![type_id];
            dimensions.extend(arguments);
            return Ok(self
                .arena
                .invoke_builtin("JSIL.MultidimensionalArray.New", dimensions, new_type));
        }

        Ok(self.arena.alloc(Node::New {
            new_type,
            arguments,
        }))
    }

    /// A compiler-generated target with a known body becomes a nested
    /// function; anything else is a reference to the method itself.
    pub(super) fn load_function(&mut self, expression: &ILExpression) -> TranslateResult<NodeId> {
        let method = operand_method(expression)?;

        let compiler_generated = self
            .cx
            .provider
            .get_method(method)
            .and_then(|member| member.method().map(|m| m.is_compiler_generated()))
            .unwrap_or(false);
        if compiler_generated
            && let Some(bodies) = self.cx.bodies
            && let Some(body) = bodies.method_body(method)
        {
            return self.translate_lambda(&body);
        }

        let (identifier, _) = self.method_identifier(method);
        let type_id = self.type_identifier(&method.declaring_type);
        let owner = if method.has_this {
            let prototype = self.arena.alloc(Node::StringIdentifier {
                text: "prototype".to_string(),
                identifier_type: None,
            });
            self.arena.dot(type_id, prototype)
        } else {
            type_id
        };
        Ok(self.arena.dot(owner, identifier))
    }

    // =========================================================================
    // Member policies
    // =========================================================================

    /// Substitution for a call site: the method's own invoke policy first,
    /// then the read or write policy of the property the accessor belongs to.
    fn call_substitution(
        &mut self,
        member: Option<&MemberHandle>,
        accessor: Accessor,
        result_type: &TypeRef,
        arguments: &[NodeId],
    ) -> Option<NodeId> {
        let member = member?;
        if let Some(replacement) = self.invoke_substitution(member, result_type, arguments) {
            return Some(replacement);
        }

        let owner = member.owner()?;
        match accessor {
            Accessor::Getter => self.read_substitution(&owner, result_type, arguments.to_vec()),
            Accessor::Setter => {
                let value = arguments.last().copied()?;
                self.write_substitution(&owner, value)
            }
            Accessor::None => None,
        }
    }

    pub(super) fn read_substitution(
        &mut self,
        member: &MemberHandle,
        value_type: &TypeRef,
        arguments: Vec<NodeId>,
    ) -> Option<NodeId> {
        match (member.read_policy(), member.is_ignored()) {
            (ReadPolicy::Unmodified, false) => None,
            (ReadPolicy::ReturnDefaultValue, _) => Some(self.default_value(value_type)),
            (ReadPolicy::LogWarning, _) => Some(self.ignored_member(member, false, arguments)),
            (ReadPolicy::ThrowError, _) | (ReadPolicy::Unmodified, true) => {
                Some(self.ignored_member(member, true, arguments))
            }
        }
    }

    pub(super) fn write_substitution(&mut self, member: &MemberHandle, value: NodeId) -> Option<NodeId> {
        match (member.write_policy(), member.is_ignored()) {
            (WritePolicy::Unmodified, false) => None,
            (WritePolicy::DiscardValue, _) => Some(value),
            (WritePolicy::LogWarning, _) => Some(self.ignored_member(member, false, vec![value])),
            (WritePolicy::ThrowError, _) | (WritePolicy::Unmodified, true) => {
                Some(self.ignored_member(member, true, vec![value]))
            }
        }
    }

    fn invoke_substitution(
        &mut self,
        member: &MemberHandle,
        result_type: &TypeRef,
        arguments: &[NodeId],
    ) -> Option<NodeId> {
        match (member.invoke_policy(), member.is_ignored()) {
            (InvokePolicy::Unmodified, false) => None,
            (InvokePolicy::ReturnDefaultValue, _) => Some(self.default_value(result_type)),
            (InvokePolicy::LogWarning, _) => {
                Some(self.ignored_member(member, false, arguments.to_vec()))
            }
            (InvokePolicy::ThrowError, _) | (InvokePolicy::Unmodified, true) => {
                Some(self.ignored_member(member, true, arguments.to_vec()))
            }
        }
    }

    fn default_value(&mut self, value_type: &TypeRef) -> NodeId {
        if value_type.is(well_known::VOID) {
            return AstArena::NULL_EXPRESSION;
        }
        self.arena.alloc(Node::DefaultValue {
            value_type: value_type.clone(),
        })
    }

    fn ignored_member(&mut self, member: &MemberHandle, throw_error: bool, arguments: Vec<NodeId>) -> NodeId {
        let name = member.full_name();
        if throw_error {
            debug!(member = %name, "access to ignored member");
        } else {
            warn!(member = %name, "access to ignored member");
        }
        self.cx.report(
            self.method(),
            diagnostic_codes::IGNORED_MEMBER_ACCESS,
            &[&name],
        );
        self.arena.alloc(Node::IgnoredMemberReference {
            throw_error,
            member: name,
            arguments,
        })
    }
}

fn operand_method(expression: &ILExpression) -> TranslateResult<&MethodRef> {
    match &expression.operand {
        ILOperand::Method(method) => Ok(method),
        other => Err(TranslateError::invariant(format!(
            "{} expects a method operand, found {}",
            expression.code,
            other.type_name().unwrap_or("none")
        ))),
    }
}

fn same_definition(a: &TypeRef, b: &TypeRef) -> bool {
    match (a.definition_name(), b.definition_name()) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}
