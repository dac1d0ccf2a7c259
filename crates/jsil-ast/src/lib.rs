//! JavaScript AST for the jsil translator.
//!
//! This crate provides:
//! - [`NodeKind`], the closed node-kind hierarchy
//! - [`Node`] payloads stored in an [`AstArena`] and addressed by [`NodeId`]
//! - The visitor engine: [`AstVisitor`], [`DispatchCache`], [`VisitCx`]
//! - [`AstPrinter`], a compact renderer built on the visitor engine

pub mod arena;
pub mod error;
pub mod kinds;
pub mod node;
pub mod printer;
pub mod visitor;

pub use arena::AstArena;
pub use error::AstError;
pub use kinds::NodeKind;
pub use node::{
    BinaryOp, ChildSlot, Children, InvocationStyle, Node, NodeId, SlotKind, UnaryOp,
    VariableData, VariableKind, VariableTableId,
};
pub use printer::AstPrinter;
pub use visitor::{
    AstVisitor, DispatchCache, DispatchTable, Handler, VisitCx, VisitResult, run_visitor,
    run_visitor_rooted,
};
