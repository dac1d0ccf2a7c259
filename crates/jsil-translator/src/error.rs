use jsil_ast::AstError;
use jsil_metadata::MetadataError;
use std::fmt;

/// Input constructs the translator refuses to lower.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedConstruct {
    FaultBlock,
    /// A specific catch clause listed after the catch-all.
    CatchAllNotLast { exception_type: String },
    UnboundGenericMethod(String),
    PostfixStep(i64),
    /// An instruction with no translation, under strict handling.
    UntranslatableInstruction(String),
    NestingTooDeep(u32),
}

impl fmt::Display for UnsupportedConstruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnsupportedConstruct::FaultBlock => f.write_str("fault blocks"),
            UnsupportedConstruct::CatchAllNotLast { exception_type } => write!(
                f,
                "catch clause for {exception_type} after the catch-all clause (catch-all clause must be last)"
            ),
            UnsupportedConstruct::UnboundGenericMethod(name) => {
                write!(f, "unbound generic method {name}")
            }
            UnsupportedConstruct::PostfixStep(step) => {
                write!(f, "postfix increment with step {step}")
            }
            UnsupportedConstruct::UntranslatableInstruction(code) => {
                write!(f, "instruction {code}")
            }
            UnsupportedConstruct::NestingTooDeep(depth) => {
                write!(f, "lambdas nested deeper than {depth}")
            }
        }
    }
}

/// Failure translating one method. Any of these aborts that method only.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("Unsupported: {0}")]
    Unsupported(UnsupportedConstruct),

    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error(transparent)]
    Ast(#[from] AstError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

impl TranslateError {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        TranslateError::Invariant(message.into())
    }

    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, TranslateError::Unsupported(_))
    }
}

impl From<UnsupportedConstruct> for TranslateError {
    fn from(construct: UnsupportedConstruct) -> Self {
        TranslateError::Unsupported(construct)
    }
}

pub type TranslateResult<T> = Result<T, TranslateError>;
