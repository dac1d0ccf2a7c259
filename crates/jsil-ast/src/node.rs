//! Node payloads.
//!
//! A [`Node`] stores its children as [`NodeId`] handles into the owning
//! [`AstArena`](crate::AstArena). Rewrites overwrite those handles in place;
//! a node's own payload is never swapped for a different variant.

use crate::kinds::NodeKind;
use jsil_metadata::{MemberHandle, MethodRef, TypeRef};
use smallvec::SmallVec;
use std::fmt;

/// Handle of a node inside an [`AstArena`](crate::AstArena).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// "No node"; distinct from the null-expression sentinel.
    pub const NONE: NodeId = NodeId(u32::MAX);

    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    #[must_use]
    pub const fn is_some(self) -> bool {
        !self.is_none()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("#none")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Handle of a name→variable table in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VariableTableId(pub u32);

// =============================================================================
// Operators
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negate,
    LogicalNot,
    BitwiseNot,
    Increment,
    Decrement,
}

impl UnaryOp {
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::LogicalNot => "!",
            UnaryOp::BitwiseNot => "~",
            UnaryOp::Increment => "++",
            UnaryOp::Decrement => "--",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Assignment,
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    ShiftLeft,
    ShiftRight,
    ShiftRightUnsigned,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LogicalAnd,
    LogicalOr,
    AddAssign,
    SubtractAssign,
}

impl BinaryOp {
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            BinaryOp::Assignment => "=",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Remainder => "%",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::ShiftRightUnsigned => ">>>",
            BinaryOp::BitwiseAnd => "&",
            BinaryOp::BitwiseOr => "|",
            BinaryOp::BitwiseXor => "^",
            BinaryOp::Equal => "===",
            BinaryOp::NotEqual => "!==",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalOr => "||",
            BinaryOp::AddAssign => "+=",
            BinaryOp::SubtractAssign => "-=",
        }
    }

    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::LessThan
                | BinaryOp::LessThanOrEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterThanOrEqual
        )
    }

    #[must_use]
    pub const fn is_logical(self) -> bool {
        matches!(self, BinaryOp::LogicalAnd | BinaryOp::LogicalOr)
    }

    #[must_use]
    pub const fn is_assignment(self) -> bool {
        matches!(
            self,
            BinaryOp::Assignment | BinaryOp::AddAssign | BinaryOp::SubtractAssign
        )
    }

    /// The comparison that holds exactly when `self` does not.
    #[must_use]
    pub const fn inverted(self) -> Option<BinaryOp> {
        match self {
            BinaryOp::Equal => Some(BinaryOp::NotEqual),
            BinaryOp::NotEqual => Some(BinaryOp::Equal),
            BinaryOp::LessThan => Some(BinaryOp::GreaterThanOrEqual),
            BinaryOp::GreaterThanOrEqual => Some(BinaryOp::LessThan),
            BinaryOp::GreaterThan => Some(BinaryOp::LessThanOrEqual),
            BinaryOp::LessThanOrEqual => Some(BinaryOp::GreaterThan),
            _ => None,
        }
    }
}

// =============================================================================
// Variables
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum VariableKind {
    Local,
    Parameter,
    This,
    /// The value recovered in a catch clause.
    Exception,
    /// A by-reference view of `referent`.
    Reference { referent: NodeId },
    /// Load through `referent`, which must itself be a reference.
    Dereference { referent: NodeId },
    /// Bound by name through a variable table at query time.
    Indirect { table: VariableTableId },
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariableData {
    pub name: String,
    pub variable_type: TypeRef,
    pub kind: VariableKind,
}

impl VariableData {
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self.kind, VariableKind::Reference { .. }) || self.variable_type.is_by_reference()
    }

    #[must_use]
    pub fn is_parameter(&self) -> bool {
        matches!(self.kind, VariableKind::Parameter)
    }

    #[must_use]
    pub fn is_this(&self) -> bool {
        matches!(self.kind, VariableKind::This)
    }
}

// =============================================================================
// Nodes
// =============================================================================

/// How an invocation binds its receiver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvocationStyle {
    /// `Type.Method(args)` or a plain function call.
    Static,
    /// `receiver.Method(args)`.
    Instance,
    /// `Type.prototype.Method.call(receiver, args)`.
    ExplicitThis,
}

/// Whether a child slot accepts statements, expressions, or either.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotKind {
    Statement,
    Expression,
    Any,
}

impl SlotKind {
    #[must_use]
    pub fn accepts(self, kind: NodeKind) -> bool {
        match self {
            SlotKind::Statement => kind.is_statement(),
            SlotKind::Expression => kind.is_expression(),
            SlotKind::Any => true,
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SlotKind::Statement => "statement",
            SlotKind::Expression => "expression",
            SlotKind::Any => "node",
        })
    }
}

/// A direct child with its role label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChildSlot {
    pub node: NodeId,
    pub role: &'static str,
    pub slot: SlotKind,
}

pub type Children = SmallVec<[ChildSlot; 4]>;

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    // ------------------------------------------------------------------ statements
    Block {
        statements: Vec<NodeId>,
    },
    If {
        condition: NodeId,
        true_clause: NodeId,
        false_clause: NodeId,
    },
    While {
        condition: NodeId,
        body: NodeId,
    },
    Switch {
        condition: NodeId,
        cases: Vec<NodeId>,
    },
    /// `values` empty means `default:`.
    SwitchCase {
        values: Vec<NodeId>,
        body: NodeId,
    },
    TryCatch {
        body: NodeId,
        catch_variable: NodeId,
        catch_block: NodeId,
        finally_block: NodeId,
    },
    Label {
        label: String,
        body: NodeId,
    },
    ExpressionStatement {
        expression: NodeId,
    },
    VariableDeclaration {
        declarations: Vec<NodeId>,
    },
    UntranslatableStatement {
        description: String,
    },
    NullStatement,

    // ------------------------------------------------------------------ control transfer
    Return {
        value: NodeId,
    },
    Throw {
        value: NodeId,
    },
    Break {
        label: Option<String>,
    },
    Continue {
        label: Option<String>,
    },
    Goto {
        label: String,
    },

    FunctionExpression {
        name: Option<String>,
        parameters: Vec<NodeId>,
        body: NodeId,
        variables: VariableTableId,
    },

    // ------------------------------------------------------------------ literals
    NullLiteral,
    DefaultValue {
        value_type: TypeRef,
    },
    BooleanLiteral(bool),
    CharLiteral(char),
    StringLiteral(String),
    IntegerLiteral {
        value: i64,
        value_type: TypeRef,
    },
    NumberLiteral {
        value: f64,
        value_type: TypeRef,
    },
    /// `names` holds more than one entry for a combination of flags.
    EnumLiteral {
        value: i64,
        enum_type: TypeRef,
        names: Vec<String>,
    },
    TypeNameLiteral {
        referenced: TypeRef,
    },
    VerbatimLiteral {
        text: String,
        value_type: TypeRef,
    },

    // ------------------------------------------------------------------ identifiers
    StringIdentifier {
        text: String,
        identifier_type: Option<TypeRef>,
    },
    NamespaceIdentifier {
        name: String,
    },
    TypeIdentifier {
        referenced: TypeRef,
    },
    FieldIdentifier {
        name: String,
        declaring_type: TypeRef,
        field_type: TypeRef,
        member: Option<MemberHandle>,
    },
    PropertyIdentifier {
        name: String,
        declaring_type: TypeRef,
        property_type: TypeRef,
        member: Option<MemberHandle>,
    },
    MethodIdentifier {
        name: String,
        method: MethodRef,
        member: Option<MemberHandle>,
    },
    FakeMethod {
        name: String,
        return_type: TypeRef,
        parameter_types: Vec<TypeRef>,
    },
    Variable(VariableData),

    // ------------------------------------------------------------------ operators
    Unary {
        op: UnaryOp,
        operand: NodeId,
        postfix: bool,
        result_type: TypeRef,
    },
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
        result_type: TypeRef,
    },
    Ternary {
        condition: NodeId,
        true_value: NodeId,
        false_value: NodeId,
        result_type: TypeRef,
    },

    // ------------------------------------------------------------------ access and construction
    Invocation {
        style: InvocationStyle,
        method: NodeId,
        this_reference: NodeId,
        arguments: Vec<NodeId>,
        result_type: TypeRef,
    },
    Dot {
        target: NodeId,
        member: NodeId,
    },
    Indexer {
        target: NodeId,
        index: NodeId,
        element_type: TypeRef,
    },
    New {
        new_type: TypeRef,
        arguments: Vec<NodeId>,
    },
    Array {
        element_type: TypeRef,
        elements: Vec<NodeId>,
    },
    Object {
        pairs: Vec<NodeId>,
    },
    Pair {
        key: NodeId,
        value: NodeId,
    },

    // ------------------------------------------------------------------ reference wrappers
    Reference {
        referent: NodeId,
    },
    /// Reference to a field or element; `referent` is the access expression.
    MemberReference {
        referent: NodeId,
    },
    PassByReference {
        referent: NodeId,
    },

    // ------------------------------------------------------------------ conversions
    Cast {
        expression: NodeId,
        new_type: TypeRef,
        is_coercion: bool,
    },
    ChangeType {
        expression: NodeId,
        new_type: TypeRef,
    },
    Truncate {
        expression: NodeId,
        new_type: TypeRef,
    },

    // ------------------------------------------------------------------ sentinels
    NullExpression,
    UntranslatableExpression {
        description: String,
    },
    IgnoredMemberReference {
        throw_error: bool,
        member: String,
        arguments: Vec<NodeId>,
    },
}

impl Node {
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Block { .. } => NodeKind::Block,
            Node::If { .. } => NodeKind::If,
            Node::While { .. } => NodeKind::While,
            Node::Switch { .. } => NodeKind::Switch,
            Node::SwitchCase { .. } => NodeKind::SwitchCase,
            Node::TryCatch { .. } => NodeKind::TryCatch,
            Node::Label { .. } => NodeKind::Label,
            Node::ExpressionStatement { .. } => NodeKind::ExpressionStatement,
            Node::VariableDeclaration { .. } => NodeKind::VariableDeclaration,
            Node::UntranslatableStatement { .. } => NodeKind::UntranslatableStatement,
            Node::NullStatement => NodeKind::NullStatement,
            Node::Return { .. } => NodeKind::Return,
            Node::Throw { .. } => NodeKind::Throw,
            Node::Break { .. } => NodeKind::Break,
            Node::Continue { .. } => NodeKind::Continue,
            Node::Goto { .. } => NodeKind::Goto,
            Node::FunctionExpression { .. } => NodeKind::FunctionExpression,
            Node::NullLiteral => NodeKind::NullLiteral,
            Node::DefaultValue { .. } => NodeKind::DefaultValue,
            Node::BooleanLiteral(_) => NodeKind::BooleanLiteral,
            Node::CharLiteral(_) => NodeKind::CharLiteral,
            Node::StringLiteral(_) => NodeKind::StringLiteral,
            Node::IntegerLiteral { .. } => NodeKind::IntegerLiteral,
            Node::NumberLiteral { .. } => NodeKind::NumberLiteral,
            Node::EnumLiteral { .. } => NodeKind::EnumLiteral,
            Node::TypeNameLiteral { .. } => NodeKind::TypeNameLiteral,
            Node::VerbatimLiteral { .. } => NodeKind::VerbatimLiteral,
            Node::StringIdentifier { .. } => NodeKind::StringIdentifier,
            Node::NamespaceIdentifier { .. } => NodeKind::NamespaceIdentifier,
            Node::TypeIdentifier { .. } => NodeKind::TypeIdentifier,
            Node::FieldIdentifier { .. } => NodeKind::FieldIdentifier,
            Node::PropertyIdentifier { .. } => NodeKind::PropertyIdentifier,
            Node::MethodIdentifier { .. } => NodeKind::MethodIdentifier,
            Node::FakeMethod { .. } => NodeKind::FakeMethod,
            Node::Variable(v) => match v.kind {
                VariableKind::Local => NodeKind::Variable,
                VariableKind::Parameter => NodeKind::Parameter,
                VariableKind::This => NodeKind::This,
                VariableKind::Exception => NodeKind::ExceptionVariable,
                VariableKind::Reference { .. } => NodeKind::VariableReference,
                VariableKind::Dereference { .. } => NodeKind::VariableDereference,
                VariableKind::Indirect { .. } => NodeKind::IndirectVariable,
            },
            Node::Unary { .. } => NodeKind::UnaryOperator,
            Node::Binary { .. } => NodeKind::BinaryOperator,
            Node::Ternary { .. } => NodeKind::TernaryOperator,
            Node::Invocation { .. } => NodeKind::Invocation,
            Node::Dot { .. } => NodeKind::Dot,
            Node::Indexer { .. } => NodeKind::Indexer,
            Node::New { .. } => NodeKind::New,
            Node::Array { .. } => NodeKind::Array,
            Node::Object { .. } => NodeKind::Object,
            Node::Pair { .. } => NodeKind::Pair,
            Node::Reference { .. } => NodeKind::Reference,
            Node::MemberReference { .. } => NodeKind::MemberReference,
            Node::PassByReference { .. } => NodeKind::PassByReference,
            Node::Cast { .. } => NodeKind::Cast,
            Node::ChangeType { .. } => NodeKind::ChangeType,
            Node::Truncate { .. } => NodeKind::Truncate,
            Node::NullExpression => NodeKind::NullExpression,
            Node::UntranslatableExpression { .. } => NodeKind::UntranslatableExpression,
            Node::IgnoredMemberReference { .. } => NodeKind::IgnoredMemberReference,
        }
    }

    /// Direct children in their fixed order.
    #[must_use]
    pub fn children(&self) -> Children {
        use SlotKind::{Any, Expression as E, Statement as S};

        let mut out = Children::new();
        let mut push = |node: NodeId, role: &'static str, slot: SlotKind| {
            out.push(ChildSlot { node, role, slot });
        };

        match self {
            Node::Block { statements } => {
                for s in statements {
                    push(*s, "statement", S);
                }
            }
            Node::If {
                condition,
                true_clause,
                false_clause,
            } => {
                push(*condition, "condition", E);
                push(*true_clause, "true_clause", S);
                push(*false_clause, "false_clause", S);
            }
            Node::While { condition, body } => {
                push(*condition, "condition", E);
                push(*body, "body", S);
            }
            Node::Switch { condition, cases } => {
                push(*condition, "condition", E);
                for c in cases {
                    push(*c, "case", S);
                }
            }
            Node::SwitchCase { values, body } => {
                for v in values {
                    push(*v, "value", E);
                }
                push(*body, "body", S);
            }
            Node::TryCatch {
                body,
                catch_variable,
                catch_block,
                finally_block,
            } => {
                push(*body, "body", S);
                push(*catch_variable, "catch_variable", E);
                push(*catch_block, "catch", S);
                push(*finally_block, "finally", S);
            }
            Node::Label { body, .. } => push(*body, "body", S),
            Node::ExpressionStatement { expression } => push(*expression, "expression", E),
            Node::VariableDeclaration { declarations } => {
                for d in declarations {
                    push(*d, "declaration", E);
                }
            }
            Node::Return { value } | Node::Throw { value } => push(*value, "value", E),
            Node::FunctionExpression {
                parameters, body, ..
            } => {
                for p in parameters {
                    push(*p, "parameter", E);
                }
                push(*body, "body", S);
            }
            Node::Variable(VariableData {
                kind:
                    VariableKind::Reference { referent } | VariableKind::Dereference { referent },
                ..
            }) => push(*referent, "referent", E),
            Node::Unary { operand, .. } => push(*operand, "operand", E),
            Node::Binary { left, right, .. } => {
                push(*left, "left", E);
                push(*right, "right", E);
            }
            Node::Ternary {
                condition,
                true_value,
                false_value,
                ..
            } => {
                push(*condition, "condition", E);
                push(*true_value, "true_value", E);
                push(*false_value, "false_value", E);
            }
            Node::Invocation {
                method,
                this_reference,
                arguments,
                ..
            } => {
                push(*method, "method", E);
                push(*this_reference, "this", E);
                for a in arguments {
                    push(*a, "argument", E);
                }
            }
            Node::Dot { target, member } => {
                push(*target, "target", E);
                push(*member, "member", E);
            }
            Node::Indexer { target, index, .. } => {
                push(*target, "target", E);
                push(*index, "index", E);
            }
            Node::New { arguments, .. } => {
                for a in arguments {
                    push(*a, "argument", E);
                }
            }
            Node::Array { elements, .. } => {
                for e in elements {
                    push(*e, "element", E);
                }
            }
            Node::Object { pairs } => {
                for p in pairs {
                    push(*p, "pair", E);
                }
            }
            Node::Pair { key, value } => {
                push(*key, "key", E);
                push(*value, "value", Any);
            }
            Node::Reference { referent }
            | Node::MemberReference { referent }
            | Node::PassByReference { referent } => push(*referent, "referent", E),
            Node::Cast { expression, .. }
            | Node::ChangeType { expression, .. }
            | Node::Truncate { expression, .. } => push(*expression, "expression", E),
            Node::IgnoredMemberReference { arguments, .. } => {
                for a in arguments {
                    push(*a, "argument", E);
                }
            }
            Node::UntranslatableStatement { .. }
            | Node::NullStatement
            | Node::Break { .. }
            | Node::Continue { .. }
            | Node::Goto { .. }
            | Node::NullLiteral
            | Node::DefaultValue { .. }
            | Node::BooleanLiteral(_)
            | Node::CharLiteral(_)
            | Node::StringLiteral(_)
            | Node::IntegerLiteral { .. }
            | Node::NumberLiteral { .. }
            | Node::EnumLiteral { .. }
            | Node::TypeNameLiteral { .. }
            | Node::VerbatimLiteral { .. }
            | Node::StringIdentifier { .. }
            | Node::NamespaceIdentifier { .. }
            | Node::TypeIdentifier { .. }
            | Node::FieldIdentifier { .. }
            | Node::PropertyIdentifier { .. }
            | Node::MethodIdentifier { .. }
            | Node::FakeMethod { .. }
            | Node::Variable(_)
            | Node::NullExpression
            | Node::UntranslatableExpression { .. } => {}
        }

        out
    }

    /// Mutable child handles, in the same order as [`Node::children`].
    pub(crate) fn child_slots_mut(&mut self) -> SmallVec<[&mut NodeId; 4]> {
        let mut out: SmallVec<[&mut NodeId; 4]> = SmallVec::new();
        match self {
            Node::Block { statements } => out.extend(statements.iter_mut()),
            Node::If {
                condition,
                true_clause,
                false_clause,
            } => {
                out.push(condition);
                out.push(true_clause);
                out.push(false_clause);
            }
            Node::While { condition, body } => {
                out.push(condition);
                out.push(body);
            }
            Node::Switch { condition, cases } => {
                out.push(condition);
                out.extend(cases.iter_mut());
            }
            Node::SwitchCase { values, body } => {
                out.extend(values.iter_mut());
                out.push(body);
            }
            Node::TryCatch {
                body,
                catch_variable,
                catch_block,
                finally_block,
            } => {
                out.push(body);
                out.push(catch_variable);
                out.push(catch_block);
                out.push(finally_block);
            }
            Node::Label { body, .. } => out.push(body),
            Node::ExpressionStatement { expression } => out.push(expression),
            Node::VariableDeclaration { declarations } => out.extend(declarations.iter_mut()),
            Node::Return { value } | Node::Throw { value } => out.push(value),
            Node::FunctionExpression {
                parameters, body, ..
            } => {
                out.extend(parameters.iter_mut());
                out.push(body);
            }
            Node::Variable(VariableData {
                kind:
                    VariableKind::Reference { referent } | VariableKind::Dereference { referent },
                ..
            }) => out.push(referent),
            Node::Unary { operand, .. } => out.push(operand),
            Node::Binary { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            Node::Ternary {
                condition,
                true_value,
                false_value,
                ..
            } => {
                out.push(condition);
                out.push(true_value);
                out.push(false_value);
            }
            Node::Invocation {
                method,
                this_reference,
                arguments,
                ..
            } => {
                out.push(method);
                out.push(this_reference);
                out.extend(arguments.iter_mut());
            }
            Node::Dot { target, member } => {
                out.push(target);
                out.push(member);
            }
            Node::Indexer { target, index, .. } => {
                out.push(target);
                out.push(index);
            }
            Node::New { arguments, .. } => out.extend(arguments.iter_mut()),
            Node::Array { elements, .. } => out.extend(elements.iter_mut()),
            Node::Object { pairs } => out.extend(pairs.iter_mut()),
            Node::Pair { key, value } => {
                out.push(key);
                out.push(value);
            }
            Node::Reference { referent }
            | Node::MemberReference { referent }
            | Node::PassByReference { referent } => out.push(referent),
            Node::Cast { expression, .. }
            | Node::ChangeType { expression, .. }
            | Node::Truncate { expression, .. } => out.push(expression),
            Node::IgnoredMemberReference { arguments, .. } => out.extend(arguments.iter_mut()),
            _ => {}
        }
        out
    }

    /// Literals, and identifiers whose binding cannot change.
    #[must_use]
    pub fn is_constant_leaf(&self) -> bool {
        match self {
            Node::Variable(v) => v.is_this(),
            _ => {
                let kind = self.kind();
                kind.is_a(NodeKind::Literal)
                    || matches!(
                        kind,
                        NodeKind::StringIdentifier
                            | NodeKind::NamespaceIdentifier
                            | NodeKind::TypeIdentifier
                            | NodeKind::FieldIdentifier
                            | NodeKind::PropertyIdentifier
                            | NodeKind::MethodIdentifier
                            | NodeKind::FakeMethod
                    )
            }
        }
    }
}
