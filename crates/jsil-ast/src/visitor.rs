//! Visitor dispatch and traversal state.
//!
//! # Architecture
//!
//! A visitor registers handlers for node kinds, concrete or abstract:
//!
//! ```text
//! impl AstVisitor for MyPass {
//!     fn handlers() -> Vec<(NodeKind, Handler<Self>)> {
//!         vec![
//!             (NodeKind::Literal, Self::visit_literal as Handler<Self>),
//!             (NodeKind::BooleanLiteral, Self::visit_bool as Handler<Self>),
//!         ]
//!     }
//! }
//! ```
//!
//! When a [`DispatchTable`] is built, every concrete kind is resolved to
//! the handler of its nearest registered ancestor in the kind hierarchy.
//! Per visit, dispatch is one indexed load. Kinds with no registered
//! ancestor fall back to visiting their children unchanged.
//!
//! Tables are immutable and shared through a [`DispatchCache`] keyed by
//! visitor type. Concurrent first use may build a table more than once; the
//! first published table wins.
//!
//! [`VisitCx`] carries the traversal state for one run: the ancestor stack,
//! role labels, node and statement counters, and sibling registers.

use crate::arena::AstArena;
use crate::error::AstError;
use crate::kinds::NodeKind;
use crate::node::NodeId;
use dashmap::DashMap;
use jsil_common::diagnostics::{DiagnosticSink, TranslationDiagnostic, diagnostic_codes};
use jsil_common::limits::MAX_TRAVERSAL_DEPTH;
use rustc_hash::FxHashMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

pub type VisitResult = Result<(), AstError>;

/// A registered node handler.
pub type Handler<V> = fn(&mut V, &mut VisitCx<'_, V>, NodeId) -> VisitResult;

pub trait AstVisitor: Sized + 'static {
    /// Handlers keyed by node kind. A later entry for the same kind wins.
    fn handlers() -> Vec<(NodeKind, Handler<Self>)>;

    /// Descend into nested function expressions instead of skipping them.
    fn visit_nested_functions(&self) -> bool {
        false
    }

    /// Report a diagnostic whenever a node without a handler is visited.
    fn reports_fallback(&self) -> bool {
        false
    }
}

// =============================================================================
// Dispatch tables
// =============================================================================

pub struct DispatchTable<V> {
    handlers: Vec<Option<Handler<V>>>,
    /// The registered kind each entry was resolved from.
    resolved_from: Vec<Option<NodeKind>>,
}

impl<V: AstVisitor> DispatchTable<V> {
    #[must_use]
    pub fn build() -> Self {
        let registered: FxHashMap<NodeKind, Handler<V>> = V::handlers().into_iter().collect();

        let mut handlers = vec![None; NodeKind::COUNT];
        let mut resolved_from = vec![None; NodeKind::COUNT];
        for &kind in NodeKind::ALL {
            if let Some(ancestor) = kind.ancestors().find(|k| registered.contains_key(k)) {
                handlers[kind.index()] = registered.get(&ancestor).copied();
                resolved_from[kind.index()] = Some(ancestor);
            }
        }

        trace!(
            visitor = std::any::type_name::<V>(),
            registered = registered.len(),
            "DispatchTable::build"
        );
        Self {
            handlers,
            resolved_from,
        }
    }
}

impl<V> DispatchTable<V> {
    #[must_use]
    pub fn handler(&self, kind: NodeKind) -> Option<Handler<V>> {
        self.handlers.get(kind.index()).copied().flatten()
    }

    /// Which registered kind handles `kind`, if any.
    #[must_use]
    pub fn handler_kind(&self, kind: NodeKind) -> Option<NodeKind> {
        self.resolved_from.get(kind.index()).copied().flatten()
    }
}

impl<V> fmt::Debug for DispatchTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("resolved", &self.handlers.iter().filter(|h| h.is_some()).count())
            .finish()
    }
}

/// Dispatch tables shared by every traversal in a session.
#[derive(Default)]
pub struct DispatchCache {
    tables: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl DispatchCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create<V: AstVisitor>(&self) -> Arc<DispatchTable<V>> {
        let key = TypeId::of::<V>();
        if let Some(hit) = self.tables.get(&key)
            && let Ok(table) = Arc::downcast::<DispatchTable<V>>(hit.value().clone())
        {
            return table;
        }

        let built = Arc::new(DispatchTable::<V>::build());
        let published = self
            .tables
            .entry(key)
            .or_insert_with(|| built.clone() as Arc<dyn Any + Send + Sync>)
            .value()
            .clone();
        Arc::downcast::<DispatchTable<V>>(published).unwrap_or(built)
    }

    /// Number of visitor types with a cached table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl fmt::Debug for DispatchCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchCache")
            .field("tables", &self.tables.len())
            .finish()
    }
}

// =============================================================================
// Traversal state
// =============================================================================

pub struct VisitCx<'a, V> {
    arena: &'a mut AstArena,
    table: Arc<DispatchTable<V>>,
    sink: &'a dyn DiagnosticSink,
    stack: Vec<NodeId>,
    names: Vec<&'static str>,
    /// Root of the traversal; moves when the root itself is replaced.
    root: NodeId,
    next_node_index: usize,
    next_statement_index: usize,
    node_index: usize,
    statement_index: usize,
    previous_sibling: NodeId,
    next_sibling: NodeId,
    visit_nested: bool,
}

impl<'a, V: AstVisitor> VisitCx<'a, V> {
    pub fn new(
        arena: &'a mut AstArena,
        table: Arc<DispatchTable<V>>,
        sink: &'a dyn DiagnosticSink,
        visit_nested: bool,
    ) -> Self {
        Self {
            arena,
            table,
            sink,
            stack: Vec::new(),
            names: Vec::new(),
            root: NodeId::NONE,
            next_node_index: 0,
            next_statement_index: 0,
            node_index: 0,
            statement_index: 0,
            previous_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
            visit_nested,
        }
    }

    /// Push `id` and dispatch it to the visitor.
    pub fn visit(&mut self, visitor: &mut V, id: NodeId, role: &'static str) -> VisitResult {
        if id.is_none() {
            self.report_null_child();
            return Ok(());
        }
        let kind = self.arena.kind(id).ok_or(AstError::UnknownNode(id))?;

        if self.stack.len() >= MAX_TRAVERSAL_DEPTH {
            return Err(AstError::TraversalTooDeep(MAX_TRAVERSAL_DEPTH));
        }
        #[cfg(debug_assertions)]
        if self.stack.contains(&id) {
            return Err(AstError::Cycle(id));
        }

        let saved = (self.node_index, self.statement_index);
        self.node_index = self.next_node_index;
        self.next_node_index += 1;
        if kind.is_statement() {
            self.statement_index = self.next_statement_index;
            self.next_statement_index += 1;
        }

        if self.stack.is_empty() && self.root.is_none() {
            self.root = id;
        }
        self.stack.push(id);
        self.names.push(role);
        let result = self.dispatch(visitor, id, kind);
        self.stack.pop();
        self.names.pop();

        (self.node_index, self.statement_index) = saved;
        result
    }

    fn dispatch(&mut self, visitor: &mut V, id: NodeId, kind: NodeKind) -> VisitResult {
        match self.table.handler(kind) {
            Some(handler) => handler(visitor, self, id),
            None => {
                if visitor.reports_fallback() {
                    self.sink.report(TranslationDiagnostic::from_code(
                        diagnostic_codes::FALLBACK_TRAVERSAL,
                        &[kind.name(), std::any::type_name::<V>()],
                    ));
                }
                self.visit_children(visitor, id)
            }
        }
    }

    /// Visit a snapshot of `id`'s children in order.
    ///
    /// Nested function expressions are skipped unless the visitor opted in.
    /// The sibling registers are restored before returning.
    pub fn visit_children(&mut self, visitor: &mut V, id: NodeId) -> VisitResult {
        let siblings = (self.previous_sibling, self.next_sibling);
        let result = self.visit_child_list(visitor, id);
        (self.previous_sibling, self.next_sibling) = siblings;
        result
    }

    fn visit_child_list(&mut self, visitor: &mut V, id: NodeId) -> VisitResult {
        let children = self.arena.children(id);
        for (i, child) in children.iter().enumerate() {
            if child.node.is_none() {
                self.report_null_child();
                continue;
            }
            if !self.visit_nested
                && self.arena.kind(child.node) == Some(NodeKind::FunctionExpression)
            {
                continue;
            }

            self.previous_sibling = i
                .checked_sub(1)
                .and_then(|p| children.get(p))
                .map_or(NodeId::NONE, |c| c.node);
            self.next_sibling = children.get(i + 1).map_or(NodeId::NONE, |c| c.node);
            self.visit(visitor, child.node, child.role)?;
        }
        Ok(())
    }

    /// Visit `new` in place of the current node, with the current node's
    /// ancestors and role.
    pub fn visit_replacement(&mut self, visitor: &mut V, new: NodeId) -> VisitResult {
        let Some(current) = self.stack.pop() else {
            return Err(AstError::NoParent(new));
        };
        let role = self.names.pop().unwrap_or("replacement");

        let result = self.visit(visitor, new, role);

        self.stack.push(current);
        self.names.push(role);
        result
    }

    /// Swap the current node for `new` in its parent. Replacing the root
    /// moves [`VisitCx::root`] instead.
    pub fn replace_current(&mut self, new: NodeId) -> VisitResult {
        let current = self.current_node();
        if self.stack.len() == 1 && current == self.root {
            self.root = new;
            return Ok(());
        }
        let parent = self.parent_node().ok_or(AstError::NoParent(current))?;
        self.arena.replace_child(parent, current, new)?;
        Ok(())
    }

    /// [`VisitCx::replace_current`] followed by [`VisitCx::visit_replacement`].
    pub fn replace_and_visit(&mut self, visitor: &mut V, new: NodeId) -> VisitResult {
        self.replace_current(new)?;
        self.visit_replacement(visitor, new)
    }

    fn report_null_child(&self) {
        let parent = self
            .stack
            .last()
            .and_then(|p| self.arena.kind(*p))
            .map_or("<root>", NodeKind::name);
        debug!(parent, "VisitCx::visit_children - null child skipped");
        self.sink.report(TranslationDiagnostic::from_code(
            diagnostic_codes::NULL_CHILD_SKIPPED,
            &[parent],
        ));
    }
}

impl<V> VisitCx<'_, V> {
    #[must_use]
    pub fn arena(&self) -> &AstArena {
        &*self.arena
    }

    pub fn arena_mut(&mut self) -> &mut AstArena {
        &mut *self.arena
    }

    #[must_use]
    pub fn sink(&self) -> &dyn DiagnosticSink {
        self.sink
    }

    /// Root of the traversal, after any replacement of it.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The node being visited, or [`NodeId::NONE`] outside a visit.
    #[must_use]
    pub fn current_node(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(NodeId::NONE)
    }

    #[must_use]
    pub fn parent_node(&self) -> Option<NodeId> {
        let len = self.stack.len();
        len.checked_sub(2).map(|i| self.stack[i])
    }

    /// Ancestors of the current node, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.stack.iter().rev().skip(1).copied()
    }

    /// Role label of the current node within its parent.
    #[must_use]
    pub fn current_role(&self) -> Option<&'static str> {
        self.names.last().copied()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    #[must_use]
    pub fn node_index(&self) -> usize {
        self.node_index
    }

    #[must_use]
    pub fn statement_index(&self) -> usize {
        self.statement_index
    }

    #[must_use]
    pub fn previous_sibling(&self) -> NodeId {
        self.previous_sibling
    }

    #[must_use]
    pub fn next_sibling(&self) -> NodeId {
        self.next_sibling
    }
}

/// Run `visitor` over the tree rooted at `root`.
pub fn run_visitor<V: AstVisitor>(
    visitor: &mut V,
    arena: &mut AstArena,
    root: NodeId,
    cache: &DispatchCache,
    sink: &dyn DiagnosticSink,
) -> VisitResult {
    run_visitor_rooted(visitor, arena, root, cache, sink).map(|_| ())
}

/// [`run_visitor`], returning the root after the run. It differs from
/// `root` only when a handler replaced the root node.
pub fn run_visitor_rooted<V: AstVisitor>(
    visitor: &mut V,
    arena: &mut AstArena,
    root: NodeId,
    cache: &DispatchCache,
    sink: &dyn DiagnosticSink,
) -> Result<NodeId, AstError> {
    let table = cache.get_or_create::<V>();
    let visit_nested = visitor.visit_nested_functions();
    let mut cx = VisitCx::new(arena, table, sink, visit_nested);
    cx.visit(visitor, root, "root")?;
    Ok(cx.root)
}
