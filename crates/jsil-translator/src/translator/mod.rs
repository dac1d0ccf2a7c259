//! Lowering of decompiled method bodies into the JavaScript AST.
//!
//! # Architecture
//!
//! ```text
//! MethodBody ──translate_method──> MethodTranslator ──> FunctionExpression
//!                                    │
//!                                    ├─ structured nodes (this module)
//!                                    │    block / if / while / switch / try / label
//!                                    └─ ILExpression
//!                                         dispatch(code)      ── expressions.rs, calls.rs
//!                                         dispatch(base_code) ── qualified opcode fallback
//!                                         placeholder          ── JSIL.UntranslatableInstruction
//! ```
//!
//! One translator owns one function's worth of output; nested lambdas get a
//! child translator writing into the same arena. Unsupported constructs and
//! invariant violations abort the method with a [`TranslateError`].

mod calls;
mod expressions;

use crate::context::TranslatorContext;
use crate::error::{TranslateError, TranslateResult, UnsupportedConstruct};
use crate::il::{ILBlock, ILCase, ILExpression, ILNode, ILTryCatchBlock, ILVariable, ILVariableKind, MethodBody};
use jsil_ast::{AstArena, AstError, AstPrinter, DispatchCache, Node, NodeId, VariableKind, VariableTableId};
use jsil_common::diagnostics::diagnostic_codes;
use jsil_common::limits::{DEFAULT_ARENA_CAPACITY, MAX_TRANSLATION_DEPTH};
use jsil_metadata::{MethodRef, TypeRef, well_known};
use tracing::{debug, trace, warn};

/// Name of the value recovered by a lowered catch clause.
pub const EXCEPTION_VARIABLE: &str = "$exception";

// =============================================================================
// Output
// =============================================================================

/// A translated method: its arena, the function-expression root, and the
/// table of every local the body uses.
#[derive(Debug)]
pub struct TranslatedFunction {
    pub method: MethodRef,
    pub arena: AstArena,
    pub root: NodeId,
    pub variables: VariableTableId,
}

impl TranslatedFunction {
    /// Body block of the root function.
    #[must_use]
    pub fn body(&self) -> NodeId {
        match self.arena.get(self.root) {
            Some(Node::FunctionExpression { body, .. }) => *body,
            _ => AstArena::NULL_STATEMENT,
        }
    }

    /// Parameter variables of the root function, in declaration order.
    #[must_use]
    pub fn parameters(&self) -> Vec<NodeId> {
        match self.arena.get(self.root) {
            Some(Node::FunctionExpression { parameters, .. }) => parameters.clone(),
            _ => Vec::new(),
        }
    }

    /// Names in the all-locals table, in binding order.
    #[must_use]
    pub fn variable_names(&self) -> Vec<String> {
        self.arena
            .variables(self.variables)
            .map(|(name, _)| name.to_string())
            .collect()
    }

    pub fn render(&mut self, cache: &DispatchCache) -> Result<String, AstError> {
        AstPrinter::render(&mut self.arena, self.root, cache)
    }

    pub fn render_body(&mut self, cache: &DispatchCache) -> Result<String, AstError> {
        let body = self.body();
        AstPrinter::render(&mut self.arena, body, cache)
    }
}

/// Translate one method body into a fresh arena.
pub fn translate_method(
    cx: &TranslatorContext<'_>,
    body: &MethodBody,
) -> TranslateResult<TranslatedFunction> {
    let mut arena = AstArena::with_capacity(DEFAULT_ARENA_CAPACITY);
    let root = MethodTranslator::new(*cx, &mut arena, body, 0)
        .translate_function(Some(body.method.name.clone()))?;

    let variables = match arena.get(root) {
        Some(Node::FunctionExpression { variables, .. }) => *variables,
        _ => {
            return Err(TranslateError::invariant(
                "translation did not produce a function expression",
            ));
        }
    };

    debug!(
        method = %body.method.full_name(),
        nodes = arena.len(),
        "translate_method"
    );

    Ok(TranslatedFunction {
        method: body.method.clone(),
        arena,
        root,
        variables,
    })
}

// =============================================================================
// Translator
// =============================================================================

pub struct MethodTranslator<'t> {
    cx: TranslatorContext<'t>,
    arena: &'t mut AstArena,
    body: &'t MethodBody,
    variables: VariableTableId,
    /// Number of catch clauses enclosing the instruction being translated.
    catch_depth: usize,
    depth: u32,
}

impl<'t> MethodTranslator<'t> {
    pub fn new(
        cx: TranslatorContext<'t>,
        arena: &'t mut AstArena,
        body: &'t MethodBody,
        depth: u32,
    ) -> Self {
        let variables = arena.new_variable_table();
        Self {
            cx,
            arena,
            body,
            variables,
            catch_depth: 0,
            depth,
        }
    }

    /// Build the function expression for the whole body.
    pub fn translate_function(mut self, name: Option<String>) -> TranslateResult<NodeId> {
        let body = self.body;
        if body.method.is_unbound_generic() {
            return Err(UnsupportedConstruct::UnboundGenericMethod(body.method.full_name()).into());
        }
        trace!(
            method = %body.method.full_name(),
            depth = self.depth,
            "MethodTranslator::translate_function"
        );

        let mut parameters = Vec::with_capacity(body.parameters.len());
        for parameter in &body.parameters {
            let id = self.declare(parameter);
            parameters.push(id);
        }
        for variable in &body.variables {
            self.declare(variable);
        }

        let block = self.translate_block(&body.block)?;
        Ok(self.arena.alloc(Node::FunctionExpression {
            name,
            parameters,
            body: block,
            variables: self.variables,
        }))
    }

    pub(crate) fn method(&self) -> &'t MethodRef {
        &self.body.method
    }

    fn declare(&mut self, variable: &ILVariable) -> NodeId {
        let id = self.arena.variable_node(
            &variable.name,
            variable.variable_type.clone(),
            variable_kind(variable),
        );
        self.arena.bind_variable(self.variables, &variable.name, id);
        id
    }

    /// A fresh use of `variable`. Stack temporaries the decompiler
    /// introduced are added to the all-locals table on first use.
    pub(crate) fn variable_use(&mut self, variable: &ILVariable) -> NodeId {
        let id = self.arena.variable_node(
            &variable.name,
            variable.variable_type.clone(),
            variable_kind(variable),
        );
        if !variable.is_this() && self.arena.lookup_variable(self.variables, &variable.name).is_none() {
            self.arena.bind_variable(self.variables, &variable.name, id);
        }
        id
    }

    pub(crate) fn exception_variable(&mut self) -> NodeId {
        self.arena.variable_node(
            EXCEPTION_VARIABLE,
            self.cx.types.object(),
            VariableKind::Exception,
        )
    }

    pub(crate) fn type_identifier(&mut self, referenced: &TypeRef) -> NodeId {
        self.arena.alloc(Node::TypeIdentifier {
            referenced: referenced.clone(),
        })
    }

    // =========================================================================
    // Structured nodes
    // =========================================================================

    fn translate_block(&mut self, block: &ILBlock) -> TranslateResult<NodeId> {
        let statements = self.translate_statements(&block.body)?;
        Ok(self.arena.block(statements))
    }

    fn translate_statements(&mut self, nodes: &[ILNode]) -> TranslateResult<Vec<NodeId>> {
        let mut statements = Vec::with_capacity(nodes.len());
        for node in nodes {
            if let Some(statement) = self.translate_statement(node)? {
                statements.push(statement);
            }
        }
        Ok(statements)
    }

    /// `None` when the node produces no output (e.g. `nop`).
    fn translate_statement(&mut self, node: &ILNode) -> TranslateResult<Option<NodeId>> {
        let statement = match node {
            ILNode::Block(block) => self.translate_block(block)?,
            ILNode::Expression(expression) => {
                let translated = self.translate_expression(expression)?;
                if self.arena.is_null(translated) {
                    trace!(code = %expression.code, "MethodTranslator::translate_statement - no output");
                    return Ok(None);
                }
                self.arena.expression_statement(translated)
            }
            ILNode::Condition {
                condition,
                true_block,
                false_block,
            } => {
                let condition = self.translate_condition(condition)?;
                let true_clause = self.translate_block(true_block)?;
                let false_clause = match false_block {
                    Some(block) if !block.is_empty() => self.translate_block(block)?,
                    _ => AstArena::NULL_STATEMENT,
                };
                self.arena.alloc(Node::If {
                    condition,
                    true_clause,
                    false_clause,
                })
            }
            ILNode::WhileLoop { condition, body } => {
                let condition = match condition {
                    Some(condition) => self.translate_condition(condition)?,
                    None => self.arena.boolean(true),
                };
                let body = self.translate_block(body)?;
                self.arena.alloc(Node::While { condition, body })
            }
            ILNode::TryCatch(tcb) => self.translate_try_catch(tcb)?,
            ILNode::Switch { condition, cases } => self.translate_switch(condition, cases)?,
            ILNode::Label(label) => self.arena.alloc(Node::Label {
                label: label.clone(),
                body: AstArena::NULL_STATEMENT,
            }),
        };
        Ok(Some(statement))
    }

    /// Branch conditions must be boolean; anything else is coerced.
    fn translate_condition(&mut self, condition: &ILExpression) -> TranslateResult<NodeId> {
        let translated = self.translate_expression(condition)?;
        let boolean = self.cx.types.boolean();
        match self.arena.expected_type(translated, self.cx.types) {
            Ok(ty) if ty != boolean && ty != self.cx.types.void() => {
                Ok(self.arena.alloc(Node::Cast {
                    expression: translated,
                    new_type: boolean,
                    is_coercion: true,
                }))
            }
            _ => Ok(translated),
        }
    }

    fn translate_switch(&mut self, condition: &ILExpression, cases: &[ILCase]) -> TranslateResult<NodeId> {
        let translated = self.translate_expression(condition)?;
        let value_type = condition
            .value_type()
            .cloned()
            .unwrap_or_else(|| self.cx.types.int32());

        let mut case_nodes = Vec::with_capacity(cases.len());
        for case in cases {
            let values = case
                .values
                .iter()
                .map(|value| self.constant(*value, Some(&value_type), &value_type))
                .collect();
            let body = self.translate_block(&case.body)?;
            case_nodes.push(self.arena.alloc(Node::SwitchCase { values, body }));
        }

        Ok(self.arena.alloc(Node::Switch {
            condition: translated,
            cases: case_nodes,
        }))
    }

    // =========================================================================
    // Protected regions
    // =========================================================================

    /// Lower catch clauses into one catch block that tests the recovered
    /// exception against each clause in declaration order.
    fn translate_try_catch(&mut self, tcb: &ILTryCatchBlock) -> TranslateResult<NodeId> {
        if tcb.fault_block.is_some() {
            return Err(UnsupportedConstruct::FaultBlock.into());
        }

        let body = self.translate_block(&tcb.try_block)?;
        let mut catch_variable = AstArena::NULL_EXPRESSION;
        let mut catch_block = AstArena::NULL_STATEMENT;

        if !tcb.catch_blocks.is_empty() {
            catch_variable = self.exception_variable();

            let mut pairs: Vec<(Option<NodeId>, NodeId)> = Vec::with_capacity(tcb.catch_blocks.len() + 1);
            let mut found_universal = false;

            self.catch_depth += 1;
            for clause in &tcb.catch_blocks {
                let exception_type = &clause.exception_type;
                let condition = if exception_type.is(well_known::OBJECT) {
                    warn!(
                        method = %self.method().full_name(),
                        "MethodTranslator::translate_try_catch - ignoring impossible catch clause"
                    );
                    self.cx.report(
                        self.method(),
                        diagnostic_codes::IGNORED_CATCH_CLAUSE,
                        &[&exception_type.full_name()],
                    );
                    continue;
                } else if exception_type.is(well_known::EXCEPTION) {
                    found_universal = true;
                    None
                } else {
                    if found_universal {
                        self.catch_depth -= 1;
                        return Err(UnsupportedConstruct::CatchAllNotLast {
                            exception_type: exception_type.full_name(),
                        }
                        .into());
                    }
                    let exception = self.exception_variable();
                    let checked = self.type_identifier(exception_type);
                    let boolean = self.cx.types.boolean();
                    Some(
                        self.arena
                            .invoke_builtin("JSIL.CheckType", vec![exception, checked], boolean),
                    )
                };

                let mut statements = Vec::with_capacity(clause.body.body.len() + 1);
                if let Some(variable) = &clause.exception_variable {
                    let target = self.variable_use(variable);
                    let exception = self.exception_variable();
                    let assignment = self.arena.binary(
                        jsil_ast::BinaryOp::Assignment,
                        target,
                        exception,
                        variable.variable_type.clone(),
                    );
                    statements.push(self.arena.expression_statement(assignment));
                }
                statements.extend(self.translate_statements(&clause.body.body)?);
                let clause_block = self.arena.block(statements);
                pairs.push((condition, clause_block));
            }
            self.catch_depth -= 1;

            if !found_universal {
                let exception = self.exception_variable();
                let rethrow = self.arena.alloc(Node::Throw { value: exception });
                pairs.push((None, self.arena.expression_statement(rethrow)));
            }

            catch_block = if let [(None, only)] = pairs[..] {
                self.arena.block(vec![only])
            } else {
                let chain = self.if_chain(pairs);
                self.arena.block(vec![chain])
            };
        }

        let finally_block = match &tcb.finally_block {
            Some(block) => self.translate_block(block)?,
            None => AstArena::NULL_STATEMENT,
        };

        Ok(self.arena.alloc(Node::TryCatch {
            body,
            catch_variable,
            catch_block,
            finally_block,
        }))
    }

    /// `if (c1) b1 else if (c2) b2 ... else bn`; a pair without a condition
    /// becomes the final else.
    fn if_chain(&mut self, pairs: Vec<(Option<NodeId>, NodeId)>) -> NodeId {
        let mut tail = AstArena::NULL_STATEMENT;
        for (condition, body) in pairs.into_iter().rev() {
            tail = match condition {
                Some(condition) => self.arena.alloc(Node::If {
                    condition,
                    true_clause: body,
                    false_clause: tail,
                }),
                None => body,
            };
        }
        tail
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Translate one instruction: its own handler, then its base opcode's,
    /// then the untranslatable placeholder.
    pub(crate) fn translate_expression(&mut self, expression: &ILExpression) -> TranslateResult<NodeId> {
        if let Some(node) = self.dispatch(expression.code, expression)? {
            return Ok(node);
        }
        if let Some(base) = expression.code.base_code()
            && let Some(node) = self.dispatch(base, expression)?
        {
            return Ok(node);
        }
        self.untranslatable_instruction(expression)
    }

    fn untranslatable_instruction(&mut self, expression: &ILExpression) -> TranslateResult<NodeId> {
        let code = expression.code.to_string();
        let operand_type = expression.operand.type_name();

        warn!(
            method = %self.method().full_name(),
            code = %code,
            operand_type = operand_type.unwrap_or(""),
            "MethodTranslator::translate_expression - instruction not implemented"
        );
        self.cx.report(
            self.method(),
            diagnostic_codes::UNTRANSLATABLE_INSTRUCTION,
            &[&code, operand_type.unwrap_or("")],
        );

        if self.cx.strict_untranslatable {
            return Err(UnsupportedConstruct::UntranslatableInstruction(code).into());
        }

        let mut arguments = vec![self.arena.string(&code)];
        if let Some(operand_type) = operand_type {
            arguments.push(self.arena.string(operand_type));
        }
        let object = self.cx.types.object();
        Ok(self
            .arena
            .invoke_builtin("JSIL.UntranslatableInstruction", arguments, object))
    }

    /// Translate a compiler-generated method into a nested function.
    pub(crate) fn translate_lambda(&mut self, body: &MethodBody) -> TranslateResult<NodeId> {
        let depth = self.depth + 1;
        if depth > MAX_TRANSLATION_DEPTH {
            return Err(UnsupportedConstruct::NestingTooDeep(MAX_TRANSLATION_DEPTH).into());
        }
        MethodTranslator::new(self.cx, &mut *self.arena, body, depth).translate_function(None)
    }
}

fn variable_kind(variable: &ILVariable) -> VariableKind {
    match variable.kind {
        ILVariableKind::Local => VariableKind::Local,
        ILVariableKind::Parameter { .. } => VariableKind::Parameter,
        ILVariableKind::This => VariableKind::This,
    }
}
