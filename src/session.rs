//! Batch translation of decompiled methods.
//!
//! # Architecture
//!
//! ```text
//! TranslatorOptions ─┐
//! MetadataSource ────┼─> TranslationSession
//!                    │     ├─ TypeInfoCache   (shared, lazily populated)
//!                    │     ├─ DispatchCache   (shared by every pass run)
//!                    │     └─ MethodBodyMap   (lambda bodies for Ldftn)
//!                    │
//! [MethodBody] ──────┴─> translate_batch ──rayon──> translate ──> ExpandCasts
//!                                                     └─> BatchReport
//! ```
//!
//! A failing method is recorded in the report and never stops the rest of
//! the batch.

use crate::config::TranslatorOptions;
use anyhow::{Context, Result};
use jsil_ast::DispatchCache;
use jsil_common::diagnostics::DiagnosticSink;
use jsil_metadata::{MetadataSource, MethodRef, TypeInfoCache, TypeInfoProvider, TypeSystem};
use jsil_translator::il::MethodBody;
use jsil_translator::{
    ExpandCasts, MethodBodyMap, TranslateError, TranslateResult, TranslatedFunction,
    TranslatorContext, translate_method,
};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

// =============================================================================
// Report
// =============================================================================

/// Outcome of [`TranslationSession::translate_batch`], in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub translated: Vec<TranslatedFunction>,
    pub failed: Vec<(MethodRef, TranslateError)>,
}

impl BatchReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Translated function for `full_name`, if it succeeded.
    #[must_use]
    pub fn function(&self, full_name: &str) -> Option<&TranslatedFunction> {
        self.translated
            .iter()
            .find(|function| function.method.full_name() == full_name)
    }

    pub fn function_mut(&mut self, full_name: &str) -> Option<&mut TranslatedFunction> {
        self.translated
            .iter_mut()
            .find(|function| function.method.full_name() == full_name)
    }
}

// =============================================================================
// Session
// =============================================================================

pub struct TranslationSession {
    options: TranslatorOptions,
    types: Arc<TypeSystem>,
    metadata: Arc<TypeInfoCache>,
    dispatch: DispatchCache,
    bodies: MethodBodyMap,
}

impl TranslationSession {
    /// Build a session over `source`. Fails if an ignored-module pattern is
    /// not a valid glob.
    pub fn new(source: Arc<dyn MetadataSource>, options: TranslatorOptions) -> Result<Self> {
        let metadata = TypeInfoCache::with_proxy_modules(
            source,
            &options.ignored_modules,
            &options.proxy_modules,
        )
        .context("failed to build the type information cache")?;

        debug!(
            ignored = options.ignored_modules.len(),
            proxies = options.proxy_modules.len(),
            threads = options.use_threads,
            "TranslationSession::new"
        );

        Ok(Self {
            options,
            types: Arc::new(TypeSystem::new()),
            metadata: Arc::new(metadata),
            dispatch: DispatchCache::new(),
            bodies: MethodBodyMap::new(),
        })
    }

    /// Bodies consulted when a method loads a pointer to a compiler-generated
    /// lambda.
    #[must_use]
    pub fn with_bodies(mut self, bodies: MethodBodyMap) -> Self {
        self.bodies = bodies;
        self
    }

    #[must_use]
    pub fn options(&self) -> &TranslatorOptions {
        &self.options
    }

    #[must_use]
    pub fn types(&self) -> &TypeSystem {
        &self.types
    }

    #[must_use]
    pub fn metadata(&self) -> &TypeInfoCache {
        &self.metadata
    }

    #[must_use]
    pub fn dispatch_cache(&self) -> &DispatchCache {
        &self.dispatch
    }

    /// Translate one method and, when enabled, expand its casts.
    pub fn translate(
        &self,
        body: &MethodBody,
        sink: &dyn DiagnosticSink,
    ) -> TranslateResult<TranslatedFunction> {
        let method = body.method.full_name();
        let _span = info_span!("translate", method = %method).entered();

        let cx = TranslatorContext::new(&self.types, self.metadata.as_ref(), sink)
            .with_bodies(&self.bodies)
            .strict(self.options.strict_untranslatable);
        let mut function = translate_method(&cx, body)?;

        if self.options.simplify_casts {
            let provider: Arc<dyn TypeInfoProvider> = self.metadata.clone();
            let rewritten = ExpandCasts::new(Arc::clone(&self.types), provider)
                .visiting_nested_functions(self.options.visit_nested_functions)
                .run(&mut function.arena, function.root, &self.dispatch, sink)?;
            debug!(method = %method, rewritten, "TranslationSession::translate - casts expanded");
        }

        Ok(function)
    }

    /// Translate every body, in parallel when `use_threads` is set.
    pub fn translate_batch(&self, bodies: &[MethodBody], sink: &dyn DiagnosticSink) -> BatchReport {
        let results: Vec<(MethodRef, TranslateResult<TranslatedFunction>)> =
            if self.options.use_threads {
                bodies
                    .par_iter()
                    .map(|body| (body.method.clone(), self.translate(body, sink)))
                    .collect()
            } else {
                bodies
                    .iter()
                    .map(|body| (body.method.clone(), self.translate(body, sink)))
                    .collect()
            };

        let mut report = BatchReport::default();
        for (method, result) in results {
            match result {
                Ok(function) => report.translated.push(function),
                Err(err) => {
                    warn!(method = %method.full_name(), error = %err, "method translation failed");
                    report.failed.push((method, err));
                }
            }
        }

        info!(
            translated = report.translated.len(),
            failed = report.failed.len(),
            "TranslationSession::translate_batch"
        );
        report
    }

    /// Render a translated function with this session's dispatch cache.
    pub fn render(&self, function: &mut TranslatedFunction) -> Result<String> {
        function
            .render(&self.dispatch)
            .with_context(|| format!("failed to render {}", function.method.full_name()))
    }
}
