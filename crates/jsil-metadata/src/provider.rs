//! Metadata sources and the type-info provider seam.
//!
//! The translator never reads assemblies itself. A [`MetadataSource`]
//! hands out raw definitions; a [`TypeInfoProvider`] (normally the
//! [`TypeInfoCache`](crate::TypeInfoCache)) turns them into merged
//! [`TypeInfo`] records and answers member lookups.

use crate::cache::MemberHandle;
use crate::definitions::{FieldRef, MethodRef, ModuleDefinition, TypeDefinition};
use crate::metadata::{MetadataCollection, attribute_names};
use crate::naming::is_ignored_name;
use crate::proxy::ProxyInfo;
use crate::type_info::TypeInfo;
use crate::types::TypeRef;
use indexmap::IndexMap;
use std::sync::Arc;

/// Raw definitions, as read from compiled assemblies.
pub trait MetadataSource: Send + Sync {
    fn type_definition(&self, full_name: &str) -> Option<Arc<TypeDefinition>>;

    fn module_definition(&self, name: &str) -> Option<Arc<ModuleDefinition>>;

    /// Every definition carrying a proxy attribute.
    fn proxy_definitions(&self) -> Vec<Arc<TypeDefinition>>;
}

/// Merged type information and member resolution.
pub trait TypeInfoProvider: Send + Sync {
    fn get_type(&self, type_ref: &TypeRef) -> Option<Arc<TypeInfo>>;

    /// Proxies applying to `type_ref`, including inheritable proxies of its
    /// base types.
    fn get_proxies(&self, type_ref: &TypeRef) -> Vec<Arc<ProxyInfo>>;

    fn get_module(&self, name: &str) -> Arc<ModuleInfo>;

    /// Whether values of this type are never translated.
    fn is_ignored_type(&self, type_ref: &TypeRef) -> bool;

    fn definition(&self, type_ref: &TypeRef) -> Option<Arc<TypeDefinition>>;

    fn get_field(&self, field: &FieldRef) -> Option<MemberHandle>;

    fn get_method(&self, method: &MethodRef) -> Option<MemberHandle>;
}

#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub name: String,
    pub is_ignored: bool,
    pub metadata: MetadataCollection,
}

impl ModuleInfo {
    /// `force_ignored` comes from the session's ignored-module patterns.
    #[must_use]
    pub fn new(name: &str, definition: Option<&ModuleDefinition>, force_ignored: bool) -> Self {
        let metadata = definition
            .map(|d| MetadataCollection::new(&d.attributes))
            .unwrap_or_default();
        let is_ignored = force_ignored
            || is_ignored_name(name)
            || metadata.has_attribute(attribute_names::JS_IGNORE);
        Self {
            name: name.to_string(),
            is_ignored,
            metadata,
        }
    }
}

// =============================================================================
// In-memory source
// =============================================================================

/// A [`MetadataSource`] over definitions registered up front. Used by
/// tests, benchmarks and hosts that deserialize metadata themselves.
#[derive(Debug, Default)]
pub struct InMemoryMetadata {
    types: IndexMap<String, Arc<TypeDefinition>>,
    modules: IndexMap<String, Arc<ModuleDefinition>>,
}

impl InMemoryMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type; a later registration under the same name wins.
    pub fn add_type(&mut self, definition: TypeDefinition) -> Arc<TypeDefinition> {
        let definition = Arc::new(definition);
        self.types
            .insert(definition.full_name.clone(), definition.clone());
        definition
    }

    pub fn add_module(&mut self, definition: ModuleDefinition) {
        self.modules
            .insert(definition.name.clone(), Arc::new(definition));
    }

    #[must_use]
    pub fn with_type(mut self, definition: TypeDefinition) -> Self {
        self.add_type(definition);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl MetadataSource for InMemoryMetadata {
    fn type_definition(&self, full_name: &str) -> Option<Arc<TypeDefinition>> {
        self.types.get(full_name).cloned()
    }

    fn module_definition(&self, name: &str) -> Option<Arc<ModuleDefinition>> {
        self.modules.get(name).cloned()
    }

    fn proxy_definitions(&self) -> Vec<Arc<TypeDefinition>> {
        self.types
            .values()
            .filter(|t| t.has_attribute(attribute_names::JS_PROXY))
            .cloned()
            .collect()
    }
}
