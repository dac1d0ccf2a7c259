//! Compact JS-like rendering of a tree, for diagnostics and tests.
//!
//! `AstPrinter` is an ordinary [`AstVisitor`]: an emitter plugs into the
//! same dispatch machinery the rewrite passes use. Output is one line with
//! no formatting concerns.

use crate::arena::AstArena;
use crate::error::AstError;
use crate::kinds::NodeKind;
use crate::node::{InvocationStyle, Node, NodeId, VariableKind};
use crate::visitor::{AstVisitor, DispatchCache, Handler, VisitCx, VisitResult, run_visitor};
use jsil_common::diagnostics::NullSink;

#[derive(Debug, Default)]
pub struct AstPrinter {
    out: String,
}

type Cx<'a> = VisitCx<'a, AstPrinter>;

impl AstVisitor for AstPrinter {
    fn handlers() -> Vec<(NodeKind, Handler<Self>)> {
        vec![
            (NodeKind::Statement, Self::print_statement as Handler<Self>),
            (NodeKind::Literal, Self::print_literal as Handler<Self>),
            (NodeKind::Identifier, Self::print_identifier as Handler<Self>),
            (NodeKind::Operator, Self::print_operator as Handler<Self>),
            (NodeKind::Expression, Self::print_expression as Handler<Self>),
            (NodeKind::Invocation, Self::print_invocation as Handler<Self>),
            (NodeKind::FunctionExpression, Self::print_function as Handler<Self>),
        ]
    }

    fn reports_fallback(&self) -> bool {
        true
    }
}

impl AstPrinter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the subtree rooted at `id`.
    pub fn render(
        arena: &mut AstArena,
        id: NodeId,
        cache: &DispatchCache,
    ) -> Result<String, AstError> {
        let mut printer = Self::new();
        run_visitor(&mut printer, arena, id, cache, &NullSink)?;
        Ok(printer.out)
    }

    fn node(cx: &Cx<'_>, id: NodeId) -> Result<Node, AstError> {
        cx.arena().node(id).cloned()
    }

    fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn child(&mut self, cx: &mut Cx<'_>, id: NodeId, role: &'static str) -> VisitResult {
        cx.visit(self, id, role)
    }

    fn list(&mut self, cx: &mut Cx<'_>, ids: &[NodeId], role: &'static str) -> VisitResult {
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.child(cx, *id, role)?;
        }
        Ok(())
    }

    fn arguments(&mut self, cx: &mut Cx<'_>, ids: &[NodeId]) -> VisitResult {
        self.write("(");
        self.list(cx, ids, "argument")?;
        self.write(")");
        Ok(())
    }

    /// Operand of an operator, parenthesized when it is itself an operator.
    fn operand(&mut self, cx: &mut Cx<'_>, id: NodeId, role: &'static str) -> VisitResult {
        let nested = matches!(
            cx.arena().kind(id),
            Some(NodeKind::BinaryOperator | NodeKind::TernaryOperator)
        );
        if nested {
            self.write("(");
        }
        self.child(cx, id, role)?;
        if nested {
            self.write(")");
        }
        Ok(())
    }

    fn is_null_statement(cx: &Cx<'_>, id: NodeId) -> bool {
        id.is_none() || cx.arena().kind(id) == Some(NodeKind::NullStatement)
    }

    fn quoted(text: &str) -> String {
        serde_json::to_string(text).unwrap_or_else(|_| format!("{text:?}"))
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn print_statement(&mut self, cx: &mut Cx<'_>, id: NodeId) -> VisitResult {
        match Self::node(cx, id)? {
            Node::Block { statements } => {
                let statements: Vec<NodeId> = statements
                    .into_iter()
                    .filter(|s| !Self::is_null_statement(cx, *s))
                    .collect();
                if statements.is_empty() {
                    self.write("{}");
                    return Ok(());
                }
                self.write("{");
                for s in statements {
                    self.write(" ");
                    self.child(cx, s, "statement")?;
                }
                self.write(" }");
            }
            Node::If {
                condition,
                true_clause,
                false_clause,
            } => {
                self.write("if (");
                self.child(cx, condition, "condition")?;
                self.write(") ");
                self.child(cx, true_clause, "true_clause")?;
                if !Self::is_null_statement(cx, false_clause) {
                    self.write(" else ");
                    self.child(cx, false_clause, "false_clause")?;
                }
            }
            Node::While { condition, body } => {
                self.write("while (");
                self.child(cx, condition, "condition")?;
                self.write(") ");
                self.child(cx, body, "body")?;
            }
            Node::Switch { condition, cases } => {
                self.write("switch (");
                self.child(cx, condition, "condition")?;
                self.write(") {");
                for case in cases {
                    self.write(" ");
                    self.child(cx, case, "case")?;
                }
                self.write(" }");
            }
            Node::SwitchCase { values, body } => {
                if values.is_empty() {
                    self.write("default: ");
                }
                for value in values {
                    self.write("case ");
                    self.child(cx, value, "value")?;
                    self.write(": ");
                }
                self.child(cx, body, "body")?;
            }
            Node::TryCatch {
                body,
                catch_variable,
                catch_block,
                finally_block,
            } => {
                self.write("try ");
                self.child(cx, body, "body")?;
                if !Self::is_null_statement(cx, catch_block) {
                    self.write(" catch (");
                    self.child(cx, catch_variable, "catch_variable")?;
                    self.write(") ");
                    self.child(cx, catch_block, "catch")?;
                }
                if !Self::is_null_statement(cx, finally_block) {
                    self.write(" finally ");
                    self.child(cx, finally_block, "finally")?;
                }
            }
            Node::Label { label, body } => {
                self.write(&label);
                self.write(":");
                if !Self::is_null_statement(cx, body) {
                    self.write(" ");
                    self.child(cx, body, "body")?;
                }
            }
            Node::ExpressionStatement { expression } => {
                self.child(cx, expression, "expression")?;
                self.write(";");
            }
            Node::VariableDeclaration { declarations } => {
                self.write("var ");
                self.list(cx, &declarations, "declaration")?;
                self.write(";");
            }
            Node::UntranslatableStatement { description } => {
                self.write("JSIL.UntranslatableStatement(");
                self.write(&Self::quoted(&description));
                self.write(");");
            }
            _ => {}
        }
        Ok(())
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn print_literal(&mut self, cx: &mut Cx<'_>, id: NodeId) -> VisitResult {
        let text = match Self::node(cx, id)? {
            Node::NullLiteral => "null".to_string(),
            Node::DefaultValue { value_type } => format!("JSIL.DefaultValue({value_type})"),
            Node::BooleanLiteral(value) => value.to_string(),
            Node::CharLiteral(value) => Self::quoted(&value.to_string()),
            Node::StringLiteral(value) => Self::quoted(&value),
            Node::IntegerLiteral { value, .. } => value.to_string(),
            Node::NumberLiteral { value, .. } => value.to_string(),
            Node::EnumLiteral {
                value,
                enum_type,
                names,
            } => {
                if names.is_empty() {
                    format!("{enum_type}.$Cast({value})")
                } else {
                    names
                        .iter()
                        .map(|n| format!("{enum_type}.{n}"))
                        .collect::<Vec<_>>()
                        .join(" | ")
                }
            }
            Node::TypeNameLiteral { referenced } => format!("$typeof({referenced})"),
            Node::VerbatimLiteral { text, .. } => text,
            _ => String::new(),
        };
        self.write(&text);
        Ok(())
    }

    fn print_identifier(&mut self, cx: &mut Cx<'_>, id: NodeId) -> VisitResult {
        match Self::node(cx, id)? {
            Node::StringIdentifier { text, .. } => self.write(&text),
            Node::NamespaceIdentifier { name }
            | Node::FieldIdentifier { name, .. }
            | Node::PropertyIdentifier { name, .. }
            | Node::MethodIdentifier { name, .. }
            | Node::FakeMethod { name, .. } => self.write(&name),
            Node::TypeIdentifier { referenced } => self.write(&referenced.full_name()),
            Node::Variable(v) => match v.kind {
                VariableKind::This => self.write("this"),
                VariableKind::Reference { referent } => {
                    self.write("&");
                    self.child(cx, referent, "referent")?;
                }
                VariableKind::Dereference { referent } => {
                    self.child(cx, referent, "referent")?;
                    self.write(".get()");
                }
                _ => self.write(&v.name),
            },
            _ => {}
        }
        Ok(())
    }

    fn print_operator(&mut self, cx: &mut Cx<'_>, id: NodeId) -> VisitResult {
        match Self::node(cx, id)? {
            Node::Unary {
                op,
                operand,
                postfix,
                ..
            } => {
                if !postfix {
                    self.write(op.token());
                }
                self.operand(cx, operand, "operand")?;
                if postfix {
                    self.write(op.token());
                }
            }
            Node::Binary {
                op, left, right, ..
            } => {
                self.operand(cx, left, "left")?;
                self.write(" ");
                self.write(op.token());
                self.write(" ");
                self.operand(cx, right, "right")?;
            }
            Node::Ternary {
                condition,
                true_value,
                false_value,
                ..
            } => {
                self.operand(cx, condition, "condition")?;
                self.write(" ? ");
                self.operand(cx, true_value, "true_value")?;
                self.write(" : ");
                self.operand(cx, false_value, "false_value")?;
            }
            _ => {}
        }
        Ok(())
    }

    fn print_invocation(&mut self, cx: &mut Cx<'_>, id: NodeId) -> VisitResult {
        let Node::Invocation {
            style,
            method,
            this_reference,
            arguments,
            ..
        } = Self::node(cx, id)?
        else {
            return Ok(());
        };

        match style {
            InvocationStyle::Static => {
                self.child(cx, method, "method")?;
                self.arguments(cx, &arguments)?;
            }
            InvocationStyle::Instance => {
                self.operand(cx, this_reference, "this")?;
                self.write(".");
                self.child(cx, method, "method")?;
                self.arguments(cx, &arguments)?;
            }
            InvocationStyle::ExplicitThis => {
                match Self::node(cx, method)? {
                    Node::Dot { target, member } => {
                        self.child(cx, target, "target")?;
                        self.write(".prototype.");
                        self.child(cx, member, "member")?;
                    }
                    _ => self.child(cx, method, "method")?,
                }
                self.write(".call(");
                self.child(cx, this_reference, "this")?;
                for argument in arguments {
                    self.write(", ");
                    self.child(cx, argument, "argument")?;
                }
                self.write(")");
            }
        }
        Ok(())
    }

    fn print_function(&mut self, cx: &mut Cx<'_>, id: NodeId) -> VisitResult {
        let Node::FunctionExpression {
            name,
            parameters,
            body,
            ..
        } = Self::node(cx, id)?
        else {
            return Ok(());
        };
        self.write("function ");
        if let Some(name) = name {
            self.write(&name);
        }
        self.write("(");
        self.list(cx, &parameters, "parameter")?;
        self.write(") ");
        self.child(cx, body, "body")
    }

    fn print_expression(&mut self, cx: &mut Cx<'_>, id: NodeId) -> VisitResult {
        match Self::node(cx, id)? {
            Node::Return { value } => {
                self.write("return");
                if !cx.arena().is_null(value) {
                    self.write(" ");
                    self.child(cx, value, "value")?;
                }
            }
            Node::Throw { value } => {
                self.write("throw ");
                self.child(cx, value, "value")?;
            }
            Node::Break { label } => {
                self.write("break");
                if let Some(label) = label {
                    self.write(" ");
                    self.write(&label);
                }
            }
            Node::Continue { label } => {
                self.write("continue");
                if let Some(label) = label {
                    self.write(" ");
                    self.write(&label);
                }
            }
            Node::Goto { label } => {
                self.write("goto ");
                self.write(&label);
            }
            Node::Dot { target, member } => {
                self.operand(cx, target, "target")?;
                self.write(".");
                self.child(cx, member, "member")?;
            }
            Node::Indexer { target, index, .. } => {
                self.operand(cx, target, "target")?;
                self.write("[");
                self.child(cx, index, "index")?;
                self.write("]");
            }
            Node::New {
                new_type,
                arguments,
            } => {
                self.write("new ");
                self.write(&new_type.full_name());
                self.arguments(cx, &arguments)?;
            }
            Node::Array { elements, .. } => {
                self.write("[");
                self.list(cx, &elements, "element")?;
                self.write("]");
            }
            Node::Object { pairs } => {
                self.write("{");
                self.list(cx, &pairs, "pair")?;
                self.write("}");
            }
            Node::Pair { key, value } => {
                self.child(cx, key, "key")?;
                self.write(": ");
                self.child(cx, value, "value")?;
            }
            Node::Reference { referent } | Node::MemberReference { referent } => {
                self.write("&");
                self.operand(cx, referent, "referent")?;
            }
            Node::PassByReference { referent } => {
                self.write("ref ");
                self.operand(cx, referent, "referent")?;
            }
            Node::Cast {
                expression,
                new_type,
                is_coercion,
            } => {
                self.write(if is_coercion { "coerce<" } else { "cast<" });
                self.write(&new_type.full_name());
                self.write(">(");
                self.child(cx, expression, "expression")?;
                self.write(")");
            }
            Node::ChangeType {
                expression,
                new_type,
            } => {
                self.write(&format!("change<{new_type}>("));
                self.child(cx, expression, "expression")?;
                self.write(")");
            }
            Node::Truncate {
                expression,
                new_type,
            } => {
                self.write(&format!("trunc<{new_type}>("));
                self.child(cx, expression, "expression")?;
                self.write(")");
            }
            Node::UntranslatableExpression { description } => {
                self.write("JSIL.UntranslatableInstruction(");
                self.write(&Self::quoted(&description));
                self.write(")");
            }
            Node::IgnoredMemberReference {
                throw_error,
                member,
                arguments,
            } => {
                self.write(if throw_error {
                    "JSIL.IgnoredMember("
                } else {
                    "JSIL.WarnIgnoredMember("
                });
                self.write(&Self::quoted(&member));
                for argument in arguments {
                    self.write(", ");
                    self.child(cx, argument, "argument")?;
                }
                self.write(")");
            }
            _ => {}
        }
        Ok(())
    }
}
