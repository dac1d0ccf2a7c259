use crate::kinds::NodeKind;
use crate::node::{NodeId, SlotKind};

/// Tree invariant violations and recoverable expected-type misses.
///
/// Everything except [`AstError::NoExpectedType`] signals a bug in the code
/// building or rewriting the tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AstError {
    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Cannot replace the shared null sentinel under {parent}")]
    NullSentinelReplacement { parent: NodeId },

    #[error("Cannot make {parent} a child of itself")]
    SelfReplacement { parent: NodeId },

    #[error("Slot '{role}' of {parent} expects a {expected}, got {actual}")]
    SlotKindMismatch {
        parent: NodeId,
        role: &'static str,
        expected: SlotKind,
        actual: NodeKind,
    },

    #[error("{0} has no expected type")]
    NoExpectedType(NodeKind),

    #[error("Traversal cycle: {0} is already on the ancestor stack")]
    Cycle(NodeId),

    #[error("Pass-by-reference expressions cannot be nested")]
    NestedPassByReference,

    #[error("Unknown node handle {0}")]
    UnknownNode(NodeId),

    #[error("{0} is the traversal root and has no parent")]
    NoParent(NodeId),

    #[error("Traversal exceeded {0} nested nodes")]
    TraversalTooDeep(usize),

    #[error("Indirect variable '{0}' is not bound")]
    UnboundVariable(String),
}
