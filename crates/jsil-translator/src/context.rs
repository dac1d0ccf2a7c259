//! Everything a method translation reads but does not own.

use crate::il::MethodBody;
use jsil_common::diagnostics::{DiagnosticSink, TranslationDiagnostic};
use jsil_metadata::{MethodRef, TypeInfoProvider, TypeSystem};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Supplies decompiled bodies for methods referenced by `Ldftn`, so
/// compiler-generated lambdas can be inlined as nested functions.
pub trait MethodBodySource: Send + Sync {
    fn method_body(&self, method: &MethodRef) -> Option<Arc<MethodBody>>;
}

/// Bodies keyed by method full name.
#[derive(Debug, Default)]
pub struct MethodBodyMap {
    bodies: FxHashMap<String, Arc<MethodBody>>,
}

impl MethodBodyMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, body: MethodBody) -> Arc<MethodBody> {
        let body = Arc::new(body);
        self.bodies
            .insert(body.method.full_name(), Arc::clone(&body));
        body
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

impl MethodBodySource for MethodBodyMap {
    fn method_body(&self, method: &MethodRef) -> Option<Arc<MethodBody>> {
        self.bodies.get(&method.full_name()).cloned()
    }
}

/// Shared, read-only inputs of a translation.
#[derive(Clone, Copy)]
pub struct TranslatorContext<'a> {
    pub types: &'a TypeSystem,
    pub provider: &'a dyn TypeInfoProvider,
    pub sink: &'a dyn DiagnosticSink,
    pub bodies: Option<&'a dyn MethodBodySource>,
    /// Fail the method on an untranslatable instruction instead of
    /// emitting a placeholder.
    pub strict_untranslatable: bool,
}

impl<'a> TranslatorContext<'a> {
    #[must_use]
    pub fn new(
        types: &'a TypeSystem,
        provider: &'a dyn TypeInfoProvider,
        sink: &'a dyn DiagnosticSink,
    ) -> Self {
        Self {
            types,
            provider,
            sink,
            bodies: None,
            strict_untranslatable: false,
        }
    }

    #[must_use]
    pub fn with_bodies(mut self, bodies: &'a dyn MethodBodySource) -> Self {
        self.bodies = Some(bodies);
        self
    }

    #[must_use]
    pub fn strict(mut self, strict_untranslatable: bool) -> Self {
        self.strict_untranslatable = strict_untranslatable;
        self
    }

    pub(crate) fn report(&self, method: &MethodRef, code: u32, args: &[&str]) {
        self.sink
            .report(TranslationDiagnostic::from_code(code, args).in_method(method.full_name()));
    }
}
