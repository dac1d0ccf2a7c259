//! Diagnostic types and message lookup for the translator.
//!
//! Translation is best-effort: constructs that cannot be mapped become
//! placeholder nodes and a diagnostic is handed to a [`DiagnosticSink`].
//! Diagnostics are advisory and never drive control flow.

use serde::Serialize;
use std::sync::Mutex;

// =============================================================================
// Diagnostic Types
// =============================================================================

/// Diagnostic category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DiagnosticCategory {
    Warning = 0,
    Error = 1,
    Suggestion = 2,
    Message = 3,
}

/// A diagnostic message definition with code, category, and message template.
#[derive(Clone, Copy, Debug)]
pub struct DiagnosticMessage {
    pub code: u32,
    pub category: DiagnosticCategory,
    pub message: &'static str,
}

pub mod diagnostic_codes {
    pub const UNTRANSLATABLE_INSTRUCTION: u32 = 1001;
    pub const UNTRANSLATABLE_NODE: u32 = 1002;
    pub const FALLBACK_TRAVERSAL: u32 = 1003;
    pub const IGNORED_CATCH_CLAUSE: u32 = 1004;
    pub const NULL_CHILD_SKIPPED: u32 = 1005;
    pub const UNRESOLVED_MEMBER: u32 = 1006;
    pub const PROXY_OVER_PROXY: u32 = 1007;
    pub const INITIALIZER_ELEMENT_NOT_IMPLEMENTED: u32 = 1008;
    pub const IGNORED_MEMBER_ACCESS: u32 = 1009;
}

/// Message table keyed by code.
pub static DIAGNOSTIC_MESSAGES: &[DiagnosticMessage] = &[
    DiagnosticMessage {
        code: diagnostic_codes::UNTRANSLATABLE_INSTRUCTION,
        category: DiagnosticCategory::Warning,
        message: "Instruction not yet implemented: {0} {1}",
    },
    DiagnosticMessage {
        code: diagnostic_codes::UNTRANSLATABLE_NODE,
        category: DiagnosticCategory::Warning,
        message: "Node of type {0} not translated",
    },
    DiagnosticMessage {
        code: diagnostic_codes::FALLBACK_TRAVERSAL,
        category: DiagnosticCategory::Message,
        message: "No handler registered for {0} in {1}; visiting children",
    },
    DiagnosticMessage {
        code: diagnostic_codes::IGNORED_CATCH_CLAUSE,
        category: DiagnosticCategory::Warning,
        message: "Ignored catch clause for exception type {0}",
    },
    DiagnosticMessage {
        code: diagnostic_codes::NULL_CHILD_SKIPPED,
        category: DiagnosticCategory::Message,
        message: "Null child of {0} skipped during traversal",
    },
    DiagnosticMessage {
        code: diagnostic_codes::UNRESOLVED_MEMBER,
        category: DiagnosticCategory::Message,
        message: "Member {0} of type {1} could not be resolved",
    },
    DiagnosticMessage {
        code: diagnostic_codes::PROXY_OVER_PROXY,
        category: DiagnosticCategory::Warning,
        message: "Proxy member {0} replaced proxy member {1}",
    },
    DiagnosticMessage {
        code: diagnostic_codes::INITIALIZER_ELEMENT_NOT_IMPLEMENTED,
        category: DiagnosticCategory::Warning,
        message: "Object initializer element not implemented: {0}",
    },
    DiagnosticMessage {
        code: diagnostic_codes::IGNORED_MEMBER_ACCESS,
        category: DiagnosticCategory::Message,
        message: "Access to ignored member {0}",
    },
];

/// Format a diagnostic message by replacing {0}, {1}, etc. with arguments.
#[must_use]
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut result = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{i}}}"), arg);
    }
    result
}

/// Look up a diagnostic message definition by code.
#[must_use]
pub fn get_diagnostic_message(code: u32) -> Option<&'static DiagnosticMessage> {
    DIAGNOSTIC_MESSAGES.iter().find(|m| m.code == code)
}

/// A translation diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TranslationDiagnostic {
    pub code: u32,
    pub category: DiagnosticCategory,
    pub message_text: String,
    /// Fully qualified name of the method being translated, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl TranslationDiagnostic {
    /// Build a diagnostic from the message table, filling placeholders with `args`.
    ///
    /// Unknown codes produce an `Error` diagnostic whose text lists the arguments.
    #[must_use]
    pub fn from_code(code: u32, args: &[&str]) -> Self {
        match get_diagnostic_message(code) {
            Some(def) => Self {
                code,
                category: def.category,
                message_text: format_message(def.message, args),
                method: None,
            },
            None => Self {
                code,
                category: DiagnosticCategory::Error,
                message_text: args.join(" "),
                method: None,
            },
        }
    }

    #[must_use]
    pub fn in_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// One-way receiver for advisory diagnostics.
///
/// Sinks are shared between worker threads translating different methods.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: TranslationDiagnostic);
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&self, _diagnostic: TranslationDiagnostic) {}
}

/// Forwards diagnostics to `tracing` at a level matching the category.
#[derive(Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: TranslationDiagnostic) {
        let method = diagnostic.method.as_deref().unwrap_or("<unknown>");
        match diagnostic.category {
            DiagnosticCategory::Error => tracing::error!(
                code = diagnostic.code,
                method,
                "{}",
                diagnostic.message_text
            ),
            DiagnosticCategory::Warning => tracing::warn!(
                code = diagnostic.code,
                method,
                "{}",
                diagnostic.message_text
            ),
            DiagnosticCategory::Suggestion | DiagnosticCategory::Message => tracing::debug!(
                code = diagnostic.code,
                method,
                "{}",
                diagnostic.message_text
            ),
        }
    }
}

/// Accumulates diagnostics in memory, in report order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<TranslationDiagnostic>>,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<TranslationDiagnostic> {
        match self.diagnostics.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of diagnostics with the given code.
    #[must_use]
    pub fn count_code(&self, code: u32) -> usize {
        self.diagnostics()
            .iter()
            .filter(|d| d.code == code)
            .count()
    }

    /// Remove and return everything reported so far.
    pub fn take(&self) -> Vec<TranslationDiagnostic> {
        match self.diagnostics.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: TranslationDiagnostic) {
        match self.diagnostics.lock() {
            Ok(mut guard) => guard.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}
