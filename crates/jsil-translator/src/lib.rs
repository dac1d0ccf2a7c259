//! Translation of decompiled .NET method bodies into the jsil JavaScript AST.
//!
//! This crate provides:
//! - [`il`], the structured instruction tree the translator consumes
//! - [`translate_method`], the per-method instruction translator
//! - [`ExpandCasts`], the pass that lowers casts into runtime conversions
//!
//! Translation failures are per method: a [`TranslateError`] aborts the
//! method being translated and nothing else.

pub mod context;
pub mod error;
pub mod il;
pub mod passes;
pub mod translator;

pub use context::{MethodBodyMap, MethodBodySource, TranslatorContext};
pub use error::{TranslateError, TranslateResult, UnsupportedConstruct};
pub use passes::ExpandCasts;
pub use translator::{EXCEPTION_VARIABLE, MethodTranslator, TranslatedFunction, translate_method};
