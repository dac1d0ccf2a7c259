//! Common types and utilities for the jsil translator.
//!
//! This crate provides the pieces shared by every other jsil crate:
//! - Diagnostic categories, the message table, and diagnostic sinks
//! - Centralized traversal and translation limits

// Diagnostics - advisory notifications from translation and traversal
pub mod diagnostics;
pub use diagnostics::{
    CollectingSink, DiagnosticCategory, DiagnosticSink, NullSink, TracingSink,
    TranslationDiagnostic, diagnostic_codes, format_message,
};

// Centralized limits and thresholds
pub mod limits;
