//! Type and member metadata for the jsil translator.
//!
//! This crate turns raw definitions into the merged view the translator
//! works against:
//! - [`TypeRef`] and [`TypeSystem`] for type references, primitives and
//!   delegate signatures
//! - [`TypeInfo`] member tables with proxy members layered on top
//! - [`TypeInfoCache`], a concurrent [`TypeInfoProvider`]

pub mod definitions;
pub mod identity;
pub mod metadata;
pub mod naming;
pub mod types;

// Merged views
pub mod members;
pub mod proxy;
pub mod type_info;

// Resolution
pub mod cache;
pub mod provider;

pub use cache::{MemberHandle, TypeInfoCache};
pub use definitions::{
    AttributeArgument, AttributeValue, CustomAttribute, EventDefinition, FieldDefinition,
    FieldRef, MethodDefinition, MethodFlags, MethodRef, ModuleDefinition, ParameterDefinition,
    PropertyDefinition, TypeDefinition, TypeFlags,
};
pub use identity::{MemberIdentifier, MemberKind};
pub use members::{
    EnumMemberInfo, InvokePolicy, MemberDefinition, MemberId, MemberInfo, MethodGroupInfo,
    ReadPolicy, WritePolicy,
};
pub use metadata::{MetadataCollection, attribute_names};
pub use provider::{InMemoryMetadata, MetadataSource, ModuleInfo, TypeInfoProvider};
pub use proxy::{ProxyAttributePolicy, ProxyInfo, ProxyMemberPolicy};
pub use type_info::TypeInfo;
pub use types::{PrimitiveKind, TypeRef, TypeSystem, well_known};

/// Errors raised while loading metadata.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("Type '{0}' has no JSProxy attribute")]
    NotAProxy(String),

    #[error("Proxy '{proxy}' has an argument of unsupported type {argument_type}")]
    UnsupportedProxyArgument {
        proxy: String,
        argument_type: String,
    },

    #[error("Proxy '{0}' does not name a proxied type")]
    UnknownProxiedType(String),

    #[error("Invalid value {value} for {policy}")]
    InvalidPolicyValue { policy: String, value: i64 },

    #[error("Invalid ignored-module pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },
}
