//! Node kind discriminants and the kind hierarchy.
//!
//! Every concrete node reports one [`NodeKind`]. Abstract kinds (`Node`,
//! `Statement`, `Literal`, `Variable`, ...) never appear on nodes; they exist
//! so visitors can register one handler for a whole family. The hierarchy is
//! walked only when a dispatch table is built, never per visit.

use std::fmt;

macro_rules! node_kinds {
    ($($kind:ident => $parent:expr, $abstract:expr;)+) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum NodeKind {
            $($kind,)+
        }

        impl NodeKind {
            pub const ALL: &'static [NodeKind] = &[$(NodeKind::$kind,)+];
            pub const COUNT: usize = Self::ALL.len();

            /// Next kind up the hierarchy; `None` only for [`NodeKind::Node`].
            #[must_use]
            pub const fn parent_kind(self) -> Option<NodeKind> {
                match self {
                    $(NodeKind::$kind => $parent,)+
                }
            }

            /// Abstract kinds group concrete kinds and never label a node.
            #[must_use]
            pub const fn is_abstract(self) -> bool {
                match self {
                    $(NodeKind::$kind => $abstract,)+
                }
            }

            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(NodeKind::$kind => stringify!($kind),)+
                }
            }
        }
    };
}

use NodeKind as K;

node_kinds! {
    Node => None, true;
    Statement => Some(K::Node), true;
    Expression => Some(K::Node), true;

    // Statements
    Block => Some(K::Statement), false;
    If => Some(K::Statement), false;
    While => Some(K::Statement), false;
    Switch => Some(K::Statement), false;
    SwitchCase => Some(K::Statement), false;
    TryCatch => Some(K::Statement), false;
    Label => Some(K::Statement), false;
    ExpressionStatement => Some(K::Statement), false;
    VariableDeclaration => Some(K::Statement), false;
    UntranslatableStatement => Some(K::Statement), false;
    NullStatement => Some(K::Statement), false;

    // Control transfer, as expressions
    Return => Some(K::Expression), false;
    Throw => Some(K::Expression), false;
    Break => Some(K::Expression), false;
    Continue => Some(K::Expression), false;
    Goto => Some(K::Expression), false;

    FunctionExpression => Some(K::Expression), false;

    // Literals
    Literal => Some(K::Expression), true;
    NullLiteral => Some(K::Literal), false;
    DefaultValue => Some(K::Literal), false;
    BooleanLiteral => Some(K::Literal), false;
    CharLiteral => Some(K::Literal), false;
    StringLiteral => Some(K::Literal), false;
    IntegerLiteral => Some(K::Literal), false;
    NumberLiteral => Some(K::Literal), false;
    EnumLiteral => Some(K::Literal), false;
    TypeNameLiteral => Some(K::Literal), false;
    VerbatimLiteral => Some(K::Literal), false;

    // Identifiers
    Identifier => Some(K::Expression), true;
    StringIdentifier => Some(K::Identifier), false;
    NamespaceIdentifier => Some(K::Identifier), false;
    TypeIdentifier => Some(K::Identifier), false;
    FieldIdentifier => Some(K::Identifier), false;
    PropertyIdentifier => Some(K::Identifier), false;
    MethodIdentifier => Some(K::Identifier), false;
    FakeMethod => Some(K::Identifier), false;
    Variable => Some(K::Identifier), false;
    Parameter => Some(K::Variable), false;
    This => Some(K::Variable), false;
    ExceptionVariable => Some(K::Variable), false;
    IndirectVariable => Some(K::Variable), false;
    VariableReference => Some(K::Variable), false;
    VariableDereference => Some(K::Variable), false;

    // Operators
    Operator => Some(K::Expression), true;
    UnaryOperator => Some(K::Operator), false;
    BinaryOperator => Some(K::Operator), false;
    TernaryOperator => Some(K::Operator), false;

    // Access and construction
    Invocation => Some(K::Expression), false;
    Dot => Some(K::Expression), false;
    Indexer => Some(K::Expression), false;
    New => Some(K::Expression), false;
    Array => Some(K::Expression), false;
    Object => Some(K::Expression), false;
    Pair => Some(K::Expression), false;

    // Reference wrappers
    Reference => Some(K::Expression), false;
    MemberReference => Some(K::Reference), false;
    PassByReference => Some(K::Expression), false;

    // Conversions
    Cast => Some(K::Expression), false;
    ChangeType => Some(K::Expression), false;
    Truncate => Some(K::Expression), false;

    // Sentinels
    NullExpression => Some(K::Expression), false;
    UntranslatableExpression => Some(K::Expression), false;
    IgnoredMemberReference => Some(K::Expression), false;
}

impl NodeKind {
    /// True when `self` is `ancestor` or derives from it.
    #[must_use]
    pub fn is_a(self, ancestor: NodeKind) -> bool {
        self.ancestors().any(|k| k == ancestor)
    }

    /// `self`, then each parent kind up to [`NodeKind::Node`].
    pub fn ancestors(self) -> impl Iterator<Item = NodeKind> {
        std::iter::successors(Some(self), |k| k.parent_kind())
    }

    #[must_use]
    pub fn is_statement(self) -> bool {
        self.is_a(NodeKind::Statement)
    }

    #[must_use]
    pub fn is_expression(self) -> bool {
        self.is_a(NodeKind::Expression)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
