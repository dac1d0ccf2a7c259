//! Per-opcode handlers for value-producing instructions.

use super::MethodTranslator;
use crate::error::{TranslateError, TranslateResult};
use crate::il::{ILCode, ILExpression, ILOperand};
use jsil_ast::{AstArena, BinaryOp, Node, NodeId, UnaryOp, VariableData, VariableKind};
use jsil_common::diagnostics::diagnostic_codes;
use jsil_metadata::{FieldRef, MemberHandle, PrimitiveKind, TypeRef};
use tracing::{debug, trace};

impl MethodTranslator<'_> {
    /// Route `code` to its handler. `None` means no handler exists for
    /// this exact opcode.
    pub(super) fn dispatch(
        &mut self,
        code: ILCode,
        expression: &ILExpression,
    ) -> TranslateResult<Option<NodeId>> {
        use ILCode::*;

        let node = match code {
            // ------------------------------------------------------------ arithmetic
            Add => self.binary_op(expression, BinaryOp::Add)?,
            Sub => self.binary_op(expression, BinaryOp::Subtract)?,
            Mul => self.binary_op(expression, BinaryOp::Multiply)?,
            Div => self.binary_op(expression, BinaryOp::Divide)?,
            Rem => self.binary_op(expression, BinaryOp::Remainder)?,
            And => self.binary_op(expression, BinaryOp::BitwiseAnd)?,
            Or => self.binary_op(expression, BinaryOp::BitwiseOr)?,
            Xor => self.binary_op(expression, BinaryOp::BitwiseXor)?,
            Shl => self.binary_op(expression, BinaryOp::ShiftLeft)?,
            Shr => self.binary_op(expression, BinaryOp::ShiftRight)?,
            ShrUn => self.binary_op(expression, BinaryOp::ShiftRightUnsigned)?,
            Neg => self.unary_op(expression, UnaryOp::Negate)?,
            Not => self.unary_op(expression, UnaryOp::BitwiseNot)?,

            // ------------------------------------------------------------ comparison
            Ceq => self.equality_comparison(expression, true)?,
            Cgt => self.greater_than(expression)?,
            Clt => self.binary_op(expression, BinaryOp::LessThan)?,
            LogicNot => self.logic_not(expression)?,
            LogicAnd => self.binary_op(expression, BinaryOp::LogicalAnd)?,
            LogicOr => self.binary_op(expression, BinaryOp::LogicalOr)?,
            NullCoalescing => {
                let arguments = self.translate_all(&expression.arguments)?;
                let result_type = self.result_type(expression);
                self.arena
                    .invoke_builtin("JSIL.Coalesce", arguments, result_type)
            }
            TernaryOp => {
                let condition = self.translate_argument(expression, 0)?;
                let true_value = self.translate_argument(expression, 1)?;
                let false_value = self.translate_argument(expression, 2)?;
                let result_type = self.result_type(expression);
                self.arena.alloc(Node::Ternary {
                    condition,
                    true_value,
                    false_value,
                    result_type,
                })
            }

            // ------------------------------------------------------------ locals
            Ldloc => {
                let variable = operand_variable(expression)?;
                self.variable_use(variable)
            }
            Ldloca => {
                let variable = operand_variable(expression)?;
                let local = self.variable_use(variable);
                self.arena.variable_reference(local)?
            }
            Stloc => {
                let variable = operand_variable(expression)?;
                let value = self.translate_argument(expression, 0)?;
                let target = self.variable_use(variable);
                self.arena.binary(
                    BinaryOp::Assignment,
                    target,
                    value,
                    variable.variable_type.clone(),
                )
            }

            // ------------------------------------------------------------ fields
            Ldfld => self.load_field(expression, false)?,
            Ldsfld => self.load_field(expression, true)?,
            Ldflda => {
                let referent = self.load_field(expression, false)?;
                self.arena.alloc(Node::MemberReference { referent })
            }
            Ldsflda => {
                let referent = self.load_field(expression, true)?;
                self.arena.alloc(Node::MemberReference { referent })
            }
            Stfld => self.store_field(expression, false)?,
            Stsfld => self.store_field(expression, true)?,

            // ------------------------------------------------------------ indirect access
            Ldobj | Ldind => {
                let reference = self.translate_argument(expression, 0)?;
                self.try_dereference(reference)?.ok_or_else(|| {
                    TranslateError::invariant(format!("{code} requires a reference operand"))
                })?
            }
            Stobj | Stind => {
                let reference = self.translate_argument(expression, 0)?;
                let target = self.try_dereference(reference)?.ok_or_else(|| {
                    TranslateError::invariant(format!("{code} requires a reference target"))
                })?;
                let value = self.translate_argument(expression, 1)?;
                let value_type = self
                    .arena
                    .expected_type(target, self.cx.types)
                    .unwrap_or_else(|_| self.result_type(expression));
                self.arena
                    .binary(BinaryOp::Assignment, target, value, value_type)
            }

            // ------------------------------------------------------------ constants
            Ldc => self.load_constant(expression)?,
            Ldstr => match &expression.operand {
                ILOperand::String(text) => self.arena.string(text),
                other => return Err(operand_mismatch(code, "a string", other)),
            },
            Ldnull => self.arena.alloc(Node::NullLiteral),
            Ldftn => self.load_function(expression)?,
            Ldtoken => {
                let referenced = operand_type(expression)?;
                self.arena.type_name(referenced.clone())
            }

            // ------------------------------------------------------------ arrays
            Newarr => {
                let element_type = operand_type(expression)?.clone();
                let type_id = self.type_identifier(&element_type);
                let count = self.translate_argument(expression, 0)?;
                self.arena.invoke_builtin(
                    "System.Array.New",
                    vec![type_id, count],
                    element_type.array(),
                )
            }
            InitArray => {
                let operand = operand_type(expression)?;
                let element_type = if operand.is_array() {
                    operand.element_type().cloned().unwrap_or_else(|| self.cx.types.object())
                } else {
                    operand.clone()
                };
                let elements = self.translate_all(&expression.arguments)?;
                let type_id = self.type_identifier(&element_type);
                let values = self.arena.alloc(Node::Array {
                    element_type: element_type.clone(),
                    elements,
                });
                self.arena.invoke_builtin(
                    "System.Array.New",
                    vec![type_id, values],
                    element_type.array(),
                )
            }
            Ldlen => {
                let array = self.translate_argument(expression, 0)?;
                let length = self.arena.alloc(Node::StringIdentifier {
                    text: "length".to_string(),
                    identifier_type: Some(self.cx.types.int32()),
                });
                self.arena.dot(array, length)
            }
            Ldelem => {
                let target = self.translate_argument(expression, 0)?;
                let index = self.translate_argument(expression, 1)?;
                let element_type = self.result_type(expression);
                self.arena.alloc(Node::Indexer {
                    target,
                    index,
                    element_type,
                })
            }
            Stelem => {
                let target = self.translate_argument(expression, 0)?;
                let index = self.translate_argument(expression, 1)?;
                let value = self.translate_argument(expression, 2)?;
                let element_type = self
                    .arena
                    .expected_type(target, self.cx.types)
                    .ok()
                    .and_then(|t| t.element_type().cloned())
                    .unwrap_or_else(|| self.result_type(&expression.arguments[2]));
                let element = self.arena.alloc(Node::Indexer {
                    target,
                    index,
                    element_type: element_type.clone(),
                });
                self.arena
                    .binary(BinaryOp::Assignment, element, value, element_type)
            }

            // ------------------------------------------------------------ objects
            Newobj => self.new_object(expression)?,
            InitObject => self.initialize_object(expression)?,
            InitCollection => self.initialize_collection(expression)?,
            InitializedObject => AstArena::NULL_EXPRESSION,
            Castclass | UnboxAny => self.cast_class(expression)?,
            Isinst => {
                let target = operand_type(expression)?.clone();
                let value = self.translate_argument(expression, 0)?;
                let type_id = self.type_identifier(&target);
                self.arena
                    .invoke_builtin("JSIL.TryCast", vec![value, type_id], target)
            }
            Box => self.translate_argument(expression, 0)?,
            Conv(kind) => {
                let value = self.translate_argument(expression, 0)?;
                self.arena.alloc(Node::Cast {
                    expression: value,
                    new_type: self.cx.types.primitive(kind),
                    is_coercion: false,
                })
            }

            // ------------------------------------------------------------ calls
            Call | CallGetter | CallSetter => self.translate_call(expression, code)?,
            Callvirt | CallvirtGetter | CallvirtSetter => self.translate_callvirt(expression, code)?,
            PostIncrement => self.post_increment(expression)?,

            // ------------------------------------------------------------ control transfer
            Ret => match expression.arguments.as_slice() {
                [] => self.arena.alloc(Node::Return {
                    value: AstArena::NULL_EXPRESSION,
                }),
                [value] => {
                    let value = self.translate_expression(value)?;
                    self.arena.alloc(Node::Return { value })
                }
                _ => return Err(TranslateError::invariant("ret takes at most one value")),
            },
            Throw => {
                let value = self.translate_argument(expression, 0)?;
                self.arena.alloc(Node::Throw { value })
            }
            Rethrow => {
                if self.catch_depth == 0 {
                    return Err(TranslateError::invariant("rethrow outside a catch clause"));
                }
                let value = self.exception_variable();
                self.arena.alloc(Node::Throw { value })
            }
            LoopOrSwitchBreak => self.arena.alloc(Node::Break { label: None }),
            LoopContinue => self.arena.alloc(Node::Continue { label: None }),
            Br => match &expression.operand {
                ILOperand::Label(label) => self.arena.alloc(Node::Goto {
                    label: label.clone(),
                }),
                other => return Err(operand_mismatch(code, "a label", other)),
            },
            Dup | Pop => self.translate_argument(expression, 0)?,
            Nop | Endfinally => AstArena::NULL_EXPRESSION,

            _ => return Ok(None),
        };

        Ok(Some(node))
    }

    // =========================================================================
    // Shared helpers
    // =========================================================================

    pub(super) fn translate_argument(
        &mut self,
        expression: &ILExpression,
        index: usize,
    ) -> TranslateResult<NodeId> {
        let argument = argument(expression, index)?;
        self.translate_expression(argument)
    }

    pub(super) fn translate_all(&mut self, arguments: &[ILExpression]) -> TranslateResult<Vec<NodeId>> {
        arguments
            .iter()
            .map(|argument| self.translate_expression(argument))
            .collect()
    }

    /// Inferred type, then expected type, then `System.Object`.
    pub(super) fn result_type(&self, expression: &ILExpression) -> TypeRef {
        expression
            .value_type()
            .cloned()
            .unwrap_or_else(|| self.cx.types.object())
    }

    /// The value `reference` points at, or `None` when it is not a
    /// reference at all. `&x` loads back to `x`; a variable of by-ref type
    /// is loaded through with `.get()`.
    pub(super) fn try_dereference(&mut self, reference: NodeId) -> TranslateResult<Option<NodeId>> {
        if let Ok(reference_type) = self.arena.expected_type(reference, self.cx.types)
            && self.cx.provider.is_ignored_type(reference_type.dereferenced())
        {
            let description = reference_type.full_name();
            return Ok(Some(self.arena.untranslatable(&description)));
        }

        enum Shape {
            Assignment(NodeId),
            ByReferenceVariable,
            Referent(NodeId),
            Other,
        }

        let shape = match self.arena.node(reference)? {
            Node::Binary {
                op: BinaryOp::Assignment,
                right,
                ..
            } => Shape::Assignment(*right),
            Node::Variable(VariableData {
                kind: VariableKind::Reference { referent },
                ..
            }) => Shape::Referent(*referent),
            Node::Variable(data) if data.is_reference() => Shape::ByReferenceVariable,
            Node::Reference { referent } | Node::MemberReference { referent } => {
                Shape::Referent(*referent)
            }
            _ => Shape::Other,
        };

        match shape {
            Shape::Assignment(right) => self.try_dereference(right),
            Shape::ByReferenceVariable => Ok(Some(self.arena.variable_dereference(reference)?)),
            Shape::Referent(referent) => Ok(Some(referent)),
            Shape::Other => Ok(None),
        }
    }

    // =========================================================================
    // Operators
    // =========================================================================

    fn binary_op(&mut self, expression: &ILExpression, op: BinaryOp) -> TranslateResult<NodeId> {
        let left = self.translate_argument(expression, 0)?;
        let right = self.translate_argument(expression, 1)?;
        let result_type = if op.is_comparison() || op.is_logical() {
            self.cx.types.boolean()
        } else {
            self.result_type(expression)
        };
        Ok(self.arena.binary(op, left, right, result_type))
    }

    fn unary_op(&mut self, expression: &ILExpression, op: UnaryOp) -> TranslateResult<NodeId> {
        let operand = self.translate_argument(expression, 0)?;
        let result_type = if op == UnaryOp::LogicalNot {
            self.cx.types.boolean()
        } else {
            self.result_type(expression)
        };
        Ok(self.arena.unary(op, operand, result_type))
    }

    /// `x == true` and `x != false` collapse to `x`; the negated forms to
    /// `!x`.
    fn equality_comparison(&mut self, expression: &ILExpression, check_equal: bool) -> TranslateResult<NodeId> {
        let left = argument(expression, 0)?;
        let right = argument(expression, 1)?;
        let boolean = self.cx.types.boolean();

        let both_boolean = left.expected_type.as_ref() == Some(&boolean)
            && right.expected_type.as_ref() == Some(&boolean);
        if both_boolean
            && right.code.is_constant_load()
            && let Some(comparand) = constant_truth(&right.operand)
        {
            let value = self.translate_expression(left)?;
            return Ok(if comparand == check_equal {
                value
            } else {
                self.arena.unary(UnaryOp::LogicalNot, value, boolean)
            });
        }

        let op = if check_equal {
            BinaryOp::Equal
        } else {
            BinaryOp::NotEqual
        };
        self.binary_op(expression, op)
    }

    fn logic_not(&mut self, expression: &ILExpression) -> TranslateResult<NodeId> {
        let inner = argument(expression, 0)?;
        match inner.code {
            ILCode::Ceq => self.equality_comparison(inner, false),
            ILCode::Clt | ILCode::CltUn => self.binary_op(inner, BinaryOp::GreaterThanOrEqual),
            ILCode::Cgt | ILCode::CgtUn => self.binary_op(inner, BinaryOp::LessThanOrEqual),
            _ => self.unary_op(expression, UnaryOp::LogicalNot),
        }
    }

    /// `isinst T; ldnull; cgt.un` is how a type test compiles; it becomes
    /// `JSIL.CheckType(value, T)`.
    fn greater_than(&mut self, expression: &ILExpression) -> TranslateResult<NodeId> {
        let left = argument(expression, 0)?;
        let right = argument(expression, 1)?;

        let reference_operands = match (&left.expected_type, &right.expected_type) {
            (Some(l), Some(r)) => !l.is_value_type() && !r.is_value_type() && l == r,
            _ => false,
        };
        if reference_operands
            && left.code == ILCode::Isinst
            && let ILOperand::Type(checked) = &left.operand
            && let Some(value) = left.argument(0)
        {
            let value = self.translate_expression(value)?;
            let type_id = self.type_identifier(checked);
            let boolean = self.cx.types.boolean();
            return Ok(self
                .arena
                .invoke_builtin("JSIL.CheckType", vec![value, type_id], boolean));
        }

        self.binary_op(expression, BinaryOp::GreaterThan)
    }

    fn post_increment(&mut self, expression: &ILExpression) -> TranslateResult<NodeId> {
        let step = match expression.operand {
            ILOperand::Int(step) => step,
            ref other => return Err(operand_mismatch(expression.code, "an integer step", other)),
        };
        let op = match step {
            1 => UnaryOp::Increment,
            -1 => UnaryOp::Decrement,
            other => return Err(crate::error::UnsupportedConstruct::PostfixStep(other).into()),
        };

        let reference = self.translate_argument(expression, 0)?;
        let operand = self.try_dereference(reference)?.ok_or_else(|| {
            TranslateError::invariant("postfix increment requires a reference operand")
        })?;
        let result_type = self
            .arena
            .expected_type(operand, self.cx.types)
            .unwrap_or_else(|_| self.result_type(expression));
        Ok(self.arena.alloc(Node::Unary {
            op,
            operand,
            postfix: true,
            result_type,
        }))
    }

    // =========================================================================
    // Constants
    // =========================================================================

    fn load_constant(&mut self, expression: &ILExpression) -> TranslateResult<NodeId> {
        let expected = expression.expected_type.as_ref();
        let fallback = match expression.code {
            ILCode::LdcI8 => self.cx.types.primitive(PrimitiveKind::Int64),
            ILCode::LdcR4 => self.cx.types.primitive(PrimitiveKind::Single),
            ILCode::LdcR8 => self.cx.types.primitive(PrimitiveKind::Double),
            _ => self.cx.types.int32(),
        };

        Ok(match expression.operand {
            ILOperand::Int(value) => self.constant(value, expected, &fallback),
            ILOperand::UInt(value) => match i64::try_from(value) {
                Ok(value) => self.constant(value, expected, &fallback),
                Err(_) => self.arena.alloc(Node::NumberLiteral {
                    value: value as f64,
                    value_type: self.cx.types.primitive(PrimitiveKind::UInt64),
                }),
            },
            ILOperand::Float(value) => {
                let value_type = expected
                    .filter(|t| t.primitive_kind().is_some_and(PrimitiveKind::is_floating_point))
                    .cloned()
                    .unwrap_or(fallback);
                self.arena.alloc(Node::NumberLiteral { value, value_type })
            }
            ref other => return Err(operand_mismatch(expression.code, "a number", other)),
        })
    }

    /// An integer constant shaped by the type its consumer expects: enum
    /// members by name, booleans as `true`/`false`.
    pub(super) fn constant(&mut self, value: i64, expected: Option<&TypeRef>, fallback: &TypeRef) -> NodeId {
        let Some(expected) = expected else {
            return self.arena.integer(value, fallback.clone());
        };

        if let Some(info) = self.cx.provider.get_type(expected)
            && info.is_enum()
        {
            if let Some(member) = info.enum_member_for_value(value) {
                return self.arena.alloc(Node::EnumLiteral {
                    value,
                    enum_type: expected.clone(),
                    names: vec![member.name.clone()],
                });
            }
            if info.is_flags_enum
                && let Some(names) = flag_names(value, info.enum_members.values().map(|m| (m.name.as_str(), m.value)))
            {
                return self.arena.alloc(Node::EnumLiteral {
                    value,
                    enum_type: expected.clone(),
                    names,
                });
            }
            trace!(value, enum_type = %expected.full_name(), "constant - no enum member for value");
            return self.arena.integer(value, expected.clone());
        }

        match expected.primitive_kind() {
            Some(PrimitiveKind::Boolean) => self.arena.boolean(value != 0),
            Some(kind) if kind.is_integral() => self.arena.integer(value, expected.clone()),
            Some(kind) if kind.is_floating_point() => self.arena.alloc(Node::NumberLiteral {
                value: value as f64,
                value_type: expected.clone(),
            }),
            _ => self.arena.integer(value, fallback.clone()),
        }
    }

    // =========================================================================
    // Fields
    // =========================================================================

    fn field_identifier(&mut self, field: &FieldRef) -> (NodeId, Option<MemberHandle>) {
        let member = self.cx.provider.get_field(field);
        if member.is_none() {
            self.report_unresolved(&field.name, &field.declaring_type);
        }
        let name = member
            .as_ref()
            .map_or_else(|| field.name.clone(), |m| m.name());
        let id = self.arena.alloc(Node::FieldIdentifier {
            name,
            declaring_type: field.declaring_type.clone(),
            field_type: field.resolved_field_type(),
            member: member.clone(),
        });
        (id, member)
    }

    fn load_field(&mut self, expression: &ILExpression, is_static: bool) -> TranslateResult<NodeId> {
        let field = operand_field(expression)?;
        let (identifier, member) = self.field_identifier(field);

        if let Some(member) = &member
            && let Some(replacement) = self.read_substitution(member, &field.resolved_field_type(), Vec::new())
        {
            return Ok(replacement);
        }

        let target = if is_static {
            self.type_identifier(&field.declaring_type)
        } else {
            self.translate_argument(expression, 0)?
        };
        Ok(self.arena.dot(target, identifier))
    }

    fn store_field(&mut self, expression: &ILExpression, is_static: bool) -> TranslateResult<NodeId> {
        let field = operand_field(expression)?;
        let (identifier, member) = self.field_identifier(field);
        let value_index = usize::from(!is_static);
        let value = self.translate_argument(expression, value_index)?;

        if let Some(member) = &member
            && let Some(replacement) = self.write_substitution(member, value)
        {
            return Ok(replacement);
        }

        let target = if is_static {
            self.type_identifier(&field.declaring_type)
        } else {
            self.translate_argument(expression, 0)?
        };
        let access = self.arena.dot(target, identifier);
        Ok(self
            .arena
            .binary(BinaryOp::Assignment, access, value, field.resolved_field_type()))
    }

    // =========================================================================
    // Objects
    // =========================================================================

    fn cast_class(&mut self, expression: &ILExpression) -> TranslateResult<NodeId> {
        let target = operand_type(expression)?.clone();
        let value = self.translate_argument(expression, 0)?;

        let delegate_to_delegate = self.is_delegate(&target)
            && expression
                .argument(0)
                .and_then(ILExpression::value_type)
                .is_some_and(|source| self.is_delegate(source));
        if delegate_to_delegate {
            return Ok(value);
        }

        let type_id = self.type_identifier(&target);
        Ok(self
            .arena
            .invoke_builtin("JSIL.Cast", vec![value, type_id], target))
    }

    pub(super) fn is_delegate(&self, ty: &TypeRef) -> bool {
        self.cx
            .provider
            .definition(ty)
            .is_some_and(|definition| definition.is_delegate())
    }

    fn initialize_collection(&mut self, expression: &ILExpression) -> TranslateResult<NodeId> {
        let target = self.translate_argument(expression, 0)?;
        let mut elements = Vec::with_capacity(expression.arguments.len().saturating_sub(1));
        for add in &expression.arguments[1..] {
            let translated = self.translate_expression(add)?;
            let first = match self.arena.node(translated)? {
                Node::Invocation { arguments, .. } => arguments.first().copied(),
                other => {
                    return Err(TranslateError::invariant(format!(
                        "collection initializer element must be an invocation, found {}",
                        other.kind()
                    )));
                }
            };
            elements.push(first.unwrap_or(AstArena::NULL_EXPRESSION));
        }

        let object = self.cx.types.object();
        let values = self.arena.alloc(Node::Array {
            element_type: object,
            elements,
        });
        let result_type = self.result_type(expression);
        Ok(self
            .arena
            .binary(BinaryOp::Assignment, target, values, result_type))
    }

    /// `new T { A = 1 }` becomes `target.__Initialize__({ A: 1 })`.
    fn initialize_object(&mut self, expression: &ILExpression) -> TranslateResult<NodeId> {
        let target = self.translate_argument(expression, 0)?;
        let mut pairs = Vec::with_capacity(expression.arguments.len().saturating_sub(1));

        for initializer in &expression.arguments[1..] {
            let translated = self.translate_expression(initializer)?;
            let assignment = match self.arena.node(translated)? {
                Node::Binary {
                    op: BinaryOp::Assignment,
                    left,
                    right,
                    ..
                } => Some((*left, *right)),
                _ => None,
            };
            let Some((left, right)) = assignment else {
                let kind = self
                    .arena
                    .kind(translated)
                    .map_or_else(|| "unknown".to_string(), |k| k.to_string());
                debug!(kind = %kind, "initialize_object - initializer element not implemented");
                self.cx.report(
                    self.method(),
                    diagnostic_codes::INITIALIZER_ELEMENT_NOT_IMPLEMENTED,
                    &[&kind],
                );
                continue;
            };
            let key = match self.arena.node(left)? {
                Node::Dot { member, .. } => *member,
                _ => left,
            };
            pairs.push(self.arena.alloc(Node::Pair { key, value: right }));
        }

        let object = self.arena.alloc(Node::Object { pairs });
        let method = self.arena.alloc(Node::StringIdentifier {
            text: "__Initialize__".to_string(),
            identifier_type: None,
        });
        let result_type = self.result_type(expression);
        Ok(self.arena.alloc(Node::Invocation {
            style: jsil_ast::InvocationStyle::Instance,
            method,
            this_reference: target,
            arguments: vec![object],
            result_type,
        }))
    }

    pub(super) fn report_unresolved(&self, name: &str, declaring_type: &TypeRef) {
        let declaring = declaring_type.full_name();
        trace!(member = name, declaring_type = %declaring, "member not found in metadata");
        self.cx.report(
            self.method(),
            diagnostic_codes::UNRESOLVED_MEMBER,
            &[name, &declaring],
        );
    }
}

// =============================================================================
// Operand access
// =============================================================================

pub(super) fn argument(expression: &ILExpression, index: usize) -> TranslateResult<&ILExpression> {
    expression.argument(index).ok_or_else(|| {
        TranslateError::invariant(format!(
            "{} is missing operand expression {index}",
            expression.code
        ))
    })
}

fn operand_mismatch(code: ILCode, wanted: &str, found: &ILOperand) -> TranslateError {
    TranslateError::invariant(format!(
        "{code} expects {wanted} operand, found {}",
        found.type_name().unwrap_or("none")
    ))
}

fn operand_variable(expression: &ILExpression) -> TranslateResult<&crate::il::ILVariable> {
    match &expression.operand {
        ILOperand::Variable(variable) => Ok(variable),
        other => Err(operand_mismatch(expression.code, "a variable", other)),
    }
}

fn operand_field(expression: &ILExpression) -> TranslateResult<&FieldRef> {
    match &expression.operand {
        ILOperand::Field(field) => Ok(field),
        other => Err(operand_mismatch(expression.code, "a field", other)),
    }
}

pub(super) fn operand_type(expression: &ILExpression) -> TranslateResult<&TypeRef> {
    match &expression.operand {
        ILOperand::Type(ty) => Ok(ty),
        other => Err(operand_mismatch(expression.code, "a type", other)),
    }
}

/// Truth value of a numeric constant operand.
fn constant_truth(operand: &ILOperand) -> Option<bool> {
    match *operand {
        ILOperand::Int(value) => Some(value != 0),
        ILOperand::UInt(value) => Some(value != 0),
        ILOperand::Float(value) => Some(value != 0.0),
        _ => None,
    }
}

/// Names of the single-bit-set flags whose union is exactly `value`.
fn flag_names<'a>(value: i64, members: impl Iterator<Item = (&'a str, i64)>) -> Option<Vec<String>> {
    if value == 0 {
        return None;
    }
    let mut covered = 0i64;
    let mut names = Vec::new();
    for (name, flag) in members {
        if flag != 0 && flag & value == flag && covered & flag != flag {
            covered |= flag;
            names.push(name.to_string());
        }
    }
    (covered == value).then_some(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_names_cover_value_exactly() {
        let members = [("Read", 1), ("Write", 2), ("Execute", 4)];
        assert_eq!(
            flag_names(3, members.iter().copied()),
            Some(vec!["Read".to_string(), "Write".to_string()])
        );
        assert_eq!(flag_names(8, members.iter().copied()), None);
        assert_eq!(flag_names(0, members.iter().copied()), None);
    }

    #[test]
    fn test_constant_truth() {
        assert_eq!(constant_truth(&ILOperand::Int(0)), Some(false));
        assert_eq!(constant_truth(&ILOperand::Float(2.5)), Some(true));
        assert_eq!(constant_truth(&ILOperand::None), None);
    }
}
