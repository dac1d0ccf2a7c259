//! Node storage and tree queries.
//!
//! # Architecture
//!
//! ```text
//! AstArena
//!   nodes[0]  NullExpression   (shared sentinel)
//!   nodes[1]  NullStatement    (shared sentinel)
//!   nodes[2..] translation output, children referenced by NodeId
//!   variable_tables            name → NodeId, for indirect variables
//! ```
//!
//! A method's tree lives in one arena. Nodes are never removed; a rewrite
//! allocates the replacement and overwrites the child handle in the parent.
//! The two sentinels may appear under any number of parents; every other
//! node has at most one parent.

use crate::error::AstError;
use crate::kinds::NodeKind;
use crate::node::{
    BinaryOp, Children, InvocationStyle, Node, NodeId, UnaryOp, VariableData, VariableKind,
    VariableTableId,
};
use indexmap::IndexMap;
use jsil_common::limits::{DEFAULT_ARENA_CAPACITY, MAX_TRAVERSAL_DEPTH};
use jsil_metadata::{PrimitiveKind, TypeRef, TypeSystem};
use tracing::trace;

#[derive(Clone, Debug)]
pub struct AstArena {
    nodes: Vec<Node>,
    variable_tables: Vec<IndexMap<String, NodeId>>,
}

impl Default for AstArena {
    fn default() -> Self {
        Self::new()
    }
}

impl AstArena {
    pub const NULL_EXPRESSION: NodeId = NodeId(0);
    pub const NULL_STATEMENT: NodeId = NodeId(1);

    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ARENA_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity.max(2));
        nodes.push(Node::NullExpression);
        nodes.push(Node::NullStatement);
        Self {
            nodes,
            variable_tables: Vec::new(),
        }
    }

    /// Store `node`. The null sentinels are shared, so allocating one
    /// returns the preallocated handle.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        match node {
            Node::NullExpression => Self::NULL_EXPRESSION,
            Node::NullStatement => Self::NULL_STATEMENT,
            node => {
                let id = NodeId(self.nodes.len() as u32);
                self.nodes.push(node);
                id
            }
        }
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, AstError> {
        self.get(id).ok_or(AstError::UnknownNode(id))
    }

    /// Mutable payload access. Child handles must be changed through
    /// [`AstArena::replace_child`] so slot checks apply.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, AstError> {
        if id == Self::NULL_EXPRESSION || id == Self::NULL_STATEMENT {
            return Err(AstError::NullSentinelReplacement { parent: id });
        }
        self.nodes
            .get_mut(id.0 as usize)
            .ok_or(AstError::UnknownNode(id))
    }

    #[must_use]
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get(id).map(Node::kind)
    }

    /// Number of stored nodes, sentinels included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 2
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> Children {
        self.get(id).map(Node::children).unwrap_or_default()
    }

    #[must_use]
    pub fn is_null(&self, id: NodeId) -> bool {
        id == Self::NULL_EXPRESSION || id == Self::NULL_STATEMENT
    }

    // =========================================================================
    // Replacement
    // =========================================================================

    /// Replace every occurrence of `old` among `parent`'s direct children
    /// with `new`. Returns the number of slots rewritten.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        old: NodeId,
        new: NodeId,
    ) -> Result<usize, AstError> {
        if new == parent {
            return Err(AstError::SelfReplacement { parent });
        }
        if self.is_null(old) {
            return Err(AstError::NullSentinelReplacement { parent });
        }
        let new_kind = self.kind(new).ok_or(AstError::UnknownNode(new))?;
        let children = self.node(parent)?.children();

        let mut found = false;
        for slot in children.iter().filter(|s| s.node == old) {
            found = true;
            if !slot.slot.accepts(new_kind) {
                return Err(AstError::SlotKindMismatch {
                    parent,
                    role: slot.role,
                    expected: slot.slot,
                    actual: new_kind,
                });
            }
        }
        if !found {
            return Err(AstError::NotAChild { parent, child: old });
        }

        let mut replaced = 0;
        for slot in self.nodes[parent.0 as usize].child_slots_mut() {
            if *slot == old {
                *slot = new;
                replaced += 1;
            }
        }
        trace!(%parent, %old, %new, replaced, "AstArena::replace_child");
        Ok(replaced)
    }

    /// Overwrite the child at `index` in [`AstArena::children`] order. Unlike
    /// [`AstArena::replace_child`], the current occupant may be a null
    /// sentinel.
    pub fn replace_child_at(
        &mut self,
        parent: NodeId,
        index: usize,
        new: NodeId,
    ) -> Result<(), AstError> {
        if new == parent {
            return Err(AstError::SelfReplacement { parent });
        }
        let new_kind = self.kind(new).ok_or(AstError::UnknownNode(new))?;
        let children = self.node(parent)?.children();
        let Some(slot) = children.get(index) else {
            return Err(AstError::NotAChild {
                parent,
                child: NodeId::NONE,
            });
        };
        if !slot.slot.accepts(new_kind) {
            return Err(AstError::SlotKindMismatch {
                parent,
                role: slot.role,
                expected: slot.slot,
                actual: new_kind,
            });
        }
        let mut slots = self.nodes[parent.0 as usize].child_slots_mut();
        if let Some(target) = slots.get_mut(index) {
            **target = new;
        }
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Literals and fixed-binding identifiers, through member access and
    /// conversions.
    #[must_use]
    pub fn is_constant(&self, id: NodeId) -> bool {
        match self.get(id) {
            Some(Node::Dot { target, member }) => {
                self.is_constant(*target) && self.is_constant(*member)
            }
            Some(
                Node::Cast { expression, .. }
                | Node::ChangeType { expression, .. }
                | Node::Truncate { expression, .. },
            ) => self.is_constant(*expression),
            Some(Node::Variable(VariableData {
                kind: VariableKind::Indirect { .. },
                ..
            })) => match self.resolve_variable(id) {
                Ok(bound) if bound != id => self.is_constant(bound),
                _ => false,
            },
            Some(node) => node.is_constant_leaf(),
            None => false,
        }
    }

    /// The type `id` evaluates to.
    ///
    /// Statements, sentinels and a few meta nodes have none; callers treat
    /// [`AstError::NoExpectedType`] as "unknown", not as a failure.
    pub fn expected_type(&self, id: NodeId, types: &TypeSystem) -> Result<TypeRef, AstError> {
        let node = self.node(id)?;
        let ty = match node {
            Node::NullLiteral | Node::Object { .. } | Node::IgnoredMemberReference { .. } => {
                types.object()
            }
            Node::DefaultValue { value_type }
            | Node::IntegerLiteral { value_type, .. }
            | Node::NumberLiteral { value_type, .. }
            | Node::VerbatimLiteral { value_type, .. } => value_type.clone(),
            Node::BooleanLiteral(_) => types.boolean(),
            Node::CharLiteral(_) => types.primitive(PrimitiveKind::Char),
            Node::StringLiteral(_) => types.string(),
            Node::EnumLiteral { enum_type, .. } => enum_type.clone(),
            Node::TypeNameLiteral { .. } | Node::TypeIdentifier { .. } => types.system_type(),
            Node::StringIdentifier {
                identifier_type: Some(t),
                ..
            } => t.clone(),
            Node::FieldIdentifier { field_type, .. } => field_type.clone(),
            Node::PropertyIdentifier { property_type, .. } => property_type.clone(),
            Node::MethodIdentifier { method, .. } => types.delegate_type(
                &method.resolved_return_type(),
                &method.resolved_parameters(),
            ),
            Node::FakeMethod {
                return_type,
                parameter_types,
                ..
            } => types.delegate_type(return_type, parameter_types),
            Node::Variable(v) => match &v.kind {
                VariableKind::Indirect { .. } => {
                    let bound = self.resolve_variable(id)?;
                    if bound == id {
                        v.variable_type.clone()
                    } else {
                        self.expected_type(bound, types)?
                    }
                }
                VariableKind::Reference { referent } => {
                    by_ref(self.expected_type(*referent, types)?)
                }
                VariableKind::Dereference { referent } => {
                    self.expected_type(*referent, types)?.dereferenced().clone()
                }
                _ => v.variable_type.clone(),
            },
            Node::Unary { result_type, .. }
            | Node::Binary { result_type, .. }
            | Node::Ternary { result_type, .. }
            | Node::Invocation { result_type, .. } => result_type.clone(),
            Node::Dot { member, .. } => self.expected_type(*member, types)?,
            Node::Indexer { element_type, .. } => element_type.clone(),
            Node::New { new_type, .. } => new_type.clone(),
            Node::Array { element_type, .. } => element_type.clone().array(),
            Node::Reference { referent } | Node::MemberReference { referent } => {
                by_ref(self.expected_type(*referent, types)?)
            }
            Node::PassByReference { referent } => self.expected_type(*referent, types)?,
            Node::Cast { new_type, .. }
            | Node::ChangeType { new_type, .. }
            | Node::Truncate { new_type, .. } => new_type.clone(),
            Node::Return { .. }
            | Node::Throw { .. }
            | Node::Break { .. }
            | Node::Continue { .. }
            | Node::Goto { .. } => types.void(),
            _ => return Err(AstError::NoExpectedType(node.kind())),
        };
        Ok(ty)
    }

    /// Deep comparison of two subtrees, ignoring node identity.
    #[must_use]
    pub fn structurally_equal(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return true;
        }
        let (Some(lhs), Some(rhs)) = (self.get(a), self.get(b)) else {
            return false;
        };

        let mut lhs_shell = lhs.clone();
        for slot in lhs_shell.child_slots_mut() {
            *slot = NodeId::NONE;
        }
        let mut rhs_shell = rhs.clone();
        for slot in rhs_shell.child_slots_mut() {
            *slot = NodeId::NONE;
        }
        if lhs_shell != rhs_shell {
            return false;
        }

        let lhs_children = lhs.children();
        let rhs_children = rhs.children();
        lhs_children.len() == rhs_children.len()
            && lhs_children
                .iter()
                .zip(rhs_children.iter())
                .all(|(l, r)| self.structurally_equal(l.node, r.node))
    }

    // =========================================================================
    // Variables
    // =========================================================================

    pub fn new_variable_table(&mut self) -> VariableTableId {
        self.variable_tables.push(IndexMap::new());
        VariableTableId(self.variable_tables.len() as u32 - 1)
    }

    /// Bind `name` in `table`; rebinding replaces the previous variable.
    pub fn bind_variable(&mut self, table: VariableTableId, name: &str, variable: NodeId) {
        if let Some(entries) = self.variable_tables.get_mut(table.0 as usize) {
            entries.insert(name.to_string(), variable);
        }
    }

    #[must_use]
    pub fn lookup_variable(&self, table: VariableTableId, name: &str) -> Option<NodeId> {
        self.variable_tables.get(table.0 as usize)?.get(name).copied()
    }

    /// Bound variables in binding order.
    pub fn variables(&self, table: VariableTableId) -> impl Iterator<Item = (&str, NodeId)> {
        self.variable_tables
            .get(table.0 as usize)
            .into_iter()
            .flat_map(|t| t.iter().map(|(k, v)| (k.as_str(), *v)))
    }

    /// Follow indirect variables to their current binding. Non-indirect
    /// nodes resolve to themselves.
    pub fn resolve_variable(&self, id: NodeId) -> Result<NodeId, AstError> {
        let mut current = id;
        for _ in 0..MAX_TRAVERSAL_DEPTH {
            match self.node(current)? {
                Node::Variable(VariableData {
                    name,
                    kind: VariableKind::Indirect { table },
                    ..
                }) => {
                    current = self
                        .lookup_variable(*table, name)
                        .ok_or_else(|| AstError::UnboundVariable(name.clone()))?;
                }
                _ => return Ok(current),
            }
        }
        Err(AstError::TraversalTooDeep(MAX_TRAVERSAL_DEPTH))
    }

    /// Variable payload after indirect resolution.
    #[must_use]
    pub fn variable(&self, id: NodeId) -> Option<&VariableData> {
        match self.get(self.resolve_variable(id).ok()?)? {
            Node::Variable(v) => Some(v),
            _ => None,
        }
    }

    // =========================================================================
    // Builders
    // =========================================================================

    pub fn local(&mut self, name: &str, variable_type: TypeRef) -> NodeId {
        self.variable_node(name, variable_type, VariableKind::Local)
    }

    pub fn parameter(&mut self, name: &str, variable_type: TypeRef) -> NodeId {
        self.variable_node(name, variable_type, VariableKind::Parameter)
    }

    pub fn this(&mut self, this_type: TypeRef) -> NodeId {
        self.variable_node("this", this_type, VariableKind::This)
    }

    pub fn variable_node(&mut self, name: &str, variable_type: TypeRef, kind: VariableKind) -> NodeId {
        self.alloc(Node::Variable(VariableData {
            name: name.to_string(),
            variable_type,
            kind,
        }))
    }

    /// A by-reference view of `referent`, typed `T&`.
    pub fn variable_reference(&mut self, referent: NodeId) -> Result<NodeId, AstError> {
        let data = self
            .variable(referent)
            .ok_or(AstError::UnknownNode(referent))?;
        let name = data.name.clone();
        let variable_type = by_ref(data.variable_type.clone());
        Ok(self.variable_node(&name, variable_type, VariableKind::Reference { referent }))
    }

    /// A load through `referent`, which must be a reference variable.
    pub fn variable_dereference(&mut self, referent: NodeId) -> Result<NodeId, AstError> {
        let data = self
            .variable(referent)
            .ok_or(AstError::UnknownNode(referent))?;
        let name = data.name.clone();
        let variable_type = data.variable_type.dereferenced().clone();
        Ok(self.variable_node(&name, variable_type, VariableKind::Dereference { referent }))
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.alloc(Node::BooleanLiteral(value))
    }

    pub fn integer(&mut self, value: i64, value_type: TypeRef) -> NodeId {
        self.alloc(Node::IntegerLiteral { value, value_type })
    }

    pub fn string(&mut self, value: &str) -> NodeId {
        self.alloc(Node::StringLiteral(value.to_string()))
    }

    pub fn type_name(&mut self, referenced: TypeRef) -> NodeId {
        self.alloc(Node::TypeNameLiteral { referenced })
    }

    pub fn unary(&mut self, op: UnaryOp, operand: NodeId, result_type: TypeRef) -> NodeId {
        self.alloc(Node::Unary {
            op,
            operand,
            postfix: false,
            result_type,
        })
    }

    pub fn binary(&mut self, op: BinaryOp, left: NodeId, right: NodeId, result_type: TypeRef) -> NodeId {
        self.alloc(Node::Binary {
            op,
            left,
            right,
            result_type,
        })
    }

    pub fn dot(&mut self, target: NodeId, member: NodeId) -> NodeId {
        self.alloc(Node::Dot { target, member })
    }

    /// Call of a runtime helper such as `JSIL.Cast`.
    pub fn invoke_builtin(&mut self, path: &str, arguments: Vec<NodeId>, result_type: TypeRef) -> NodeId {
        let method = self.alloc(Node::StringIdentifier {
            text: path.to_string(),
            identifier_type: None,
        });
        self.alloc(Node::Invocation {
            style: InvocationStyle::Static,
            method,
            this_reference: Self::NULL_EXPRESSION,
            arguments,
            result_type,
        })
    }

    pub fn expression_statement(&mut self, expression: NodeId) -> NodeId {
        self.alloc(Node::ExpressionStatement { expression })
    }

    pub fn block(&mut self, statements: Vec<NodeId>) -> NodeId {
        self.alloc(Node::Block { statements })
    }

    pub fn untranslatable(&mut self, description: &str) -> NodeId {
        self.alloc(Node::UntranslatableExpression {
            description: description.to_string(),
        })
    }

    /// Wrap `referent` for a by-reference argument.
    pub fn pass_by_reference(&mut self, referent: NodeId) -> Result<NodeId, AstError> {
        if self.kind(referent) == Some(NodeKind::PassByReference) {
            return Err(AstError::NestedPassByReference);
        }
        Ok(self.alloc(Node::PassByReference { referent }))
    }
}

fn by_ref(t: TypeRef) -> TypeRef {
    if t.is_by_reference() { t } else { t.by_ref() }
}
