//! jsil: translation of decompiled .NET method bodies into a JavaScript AST.
//!
//! # Architecture
//!
//! ```text
//! jsil-common      diagnostics, limits
//! jsil-metadata    type references, member tables, proxies, TypeInfoCache
//! jsil-ast         arena, node kinds, visitor dispatch, printer
//! jsil-translator  IL tree, translate_method, ExpandCasts
//! jsil (this)      options, tracing setup, TranslationSession
//! ```
//!
//! Most callers only need [`TranslationSession`]:
//!
//! ```ignore
//! let options = jsil::load_options(Path::new("jsil.json"))?;
//! let session = TranslationSession::new(source, options)?;
//! let report = session.translate_batch(&bodies, &TracingSink);
//! ```

// Options
pub mod config;
pub use config::{TranslatorOptions, load_options};

// Batch driver
pub mod session;
pub use session::{BatchReport, TranslationSession};

// Logging
pub mod tracing_config;

pub use jsil_ast as ast;
pub use jsil_common as common;
pub use jsil_metadata as metadata;
pub use jsil_translator as translator;

pub use jsil_common::diagnostics::{CollectingSink, DiagnosticSink, NullSink, TracingSink};
pub use jsil_metadata::{InMemoryMetadata, MetadataSource};
pub use jsil_translator::il::MethodBody;
pub use jsil_translator::{MethodBodyMap, TranslateError, TranslatedFunction};
