//! Concurrent, shared type-info cache.
//!
//! # Architecture
//!
//! ```text
//! MetadataSource ──definitions──> TypeInfoCache ──Arc<TypeInfo>──> translators
//!                                   │
//!                                   ├─ types:   DashMap<full name, Arc<TypeInfo>>
//!                                   ├─ modules: DashMap<name, Arc<ModuleInfo>>
//!                                   └─ proxies: parsed once at construction
//! ```
//!
//! A `TypeInfo` is built outside any map lock and published with
//! `entry().or_insert`. Two threads racing on the same type may both build
//! it; the first to publish wins and both callers observe that value.
//! Published records are immutable, so readers never block writers.

use crate::definitions::{FieldRef, MethodRef, TypeDefinition};
use crate::identity::MemberIdentifier;
use crate::members::{MemberId, MemberInfo};
use crate::metadata::attribute_names;
use crate::naming::is_ignored_name;
use crate::provider::{MetadataSource, ModuleInfo, TypeInfoProvider};
use crate::proxy::ProxyInfo;
use crate::type_info::TypeInfo;
use crate::types::TypeRef;
use crate::MetadataError;
use dashmap::DashMap;
use globset::{Glob, GlobSet, GlobSetBuilder};
use jsil_common::limits::MAX_BASE_TYPE_CHAIN;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, trace};

// =============================================================================
// Member handles
// =============================================================================

/// A resolved member, keeping its owning [`TypeInfo`] alive.
#[derive(Clone)]
pub struct MemberHandle {
    type_info: Arc<TypeInfo>,
    id: MemberId,
}

impl MemberHandle {
    /// `None` when `id` does not name a live member of `type_info`.
    #[must_use]
    pub fn new(type_info: Arc<TypeInfo>, id: MemberId) -> Option<Self> {
        type_info.member(id)?;
        Some(Self { type_info, id })
    }

    #[must_use]
    pub fn type_info(&self) -> &Arc<TypeInfo> {
        &self.type_info
    }

    #[must_use]
    pub const fn id(&self) -> MemberId {
        self.id
    }

    /// The property or event this accessor belongs to.
    #[must_use]
    pub fn owner(&self) -> Option<MemberHandle> {
        let owner = self.declaring_property.or(self.declaring_event)?;
        MemberHandle::new(self.type_info.clone(), owner)
    }
}

impl Deref for MemberHandle {
    type Target = MemberInfo;

    fn deref(&self) -> &MemberInfo {
        self.type_info.members.slot(self.id)
    }
}

impl PartialEq for MemberHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.type_info, &other.type_info) && self.id == other.id
    }
}

impl Eq for MemberHandle {}

impl fmt::Debug for MemberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberHandle")
            .field("type", &self.type_info.full_name())
            .field("member", &self.identity.to_string())
            .finish()
    }
}

// =============================================================================
// Cache
// =============================================================================

pub struct TypeInfoCache {
    source: Arc<dyn MetadataSource>,
    types: DashMap<String, Arc<TypeInfo>>,
    modules: DashMap<String, Arc<ModuleInfo>>,
    proxies: Vec<Arc<ProxyInfo>>,
    ignored_modules: GlobSet,
}

impl TypeInfoCache {
    /// Parse every proxy the source knows about and compile the ignored
    /// module patterns.
    pub fn new(
        source: Arc<dyn MetadataSource>,
        ignored_modules: &[String],
    ) -> Result<Self, MetadataError> {
        Self::with_proxy_modules(source, ignored_modules, &[])
    }

    /// Like [`TypeInfoCache::new`], but only proxies declared in
    /// `proxy_modules` are registered. An empty list registers all of them.
    pub fn with_proxy_modules(
        source: Arc<dyn MetadataSource>,
        ignored_modules: &[String],
        proxy_modules: &[String],
    ) -> Result<Self, MetadataError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in ignored_modules {
            let glob = Glob::new(pattern).map_err(|e| MetadataError::InvalidGlob {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            builder.add(glob);
        }
        let ignored_modules = builder.build().map_err(|e| MetadataError::InvalidGlob {
            pattern: String::new(),
            message: e.to_string(),
        })?;

        let proxies = source
            .proxy_definitions()
            .into_iter()
            .filter(|d| proxy_modules.is_empty() || proxy_modules.contains(&d.module))
            .map(|definition| ProxyInfo::new(definition).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(proxies = proxies.len(), "TypeInfoCache::new");

        Ok(Self {
            source,
            types: DashMap::new(),
            modules: DashMap::new(),
            proxies,
            ignored_modules,
        })
    }

    #[must_use]
    pub fn proxies(&self) -> &[Arc<ProxyInfo>] {
        &self.proxies
    }

    /// Number of published type records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    #[must_use]
    pub fn contains(&self, full_name: &str) -> bool {
        self.types.contains_key(full_name)
    }

    /// Drop every cached record belonging to `module` so it is rebuilt on
    /// next access. Returns the number of evicted types.
    pub fn evict_module(&self, module: &str) -> usize {
        let before = self.types.len();
        self.types
            .retain(|_, info| info.definition.module != module);
        self.modules.remove(module);
        let evicted = before.saturating_sub(self.types.len());
        debug!(module, evicted, "TypeInfoCache::evict_module");
        evicted
    }

    fn type_info_by_name(&self, full_name: &str) -> Option<Arc<TypeInfo>> {
        if let Some(hit) = self.types.get(full_name) {
            return Some(hit.value().clone());
        }

        let definition = self.source.type_definition(full_name)?;
        let module = self.get_module(&definition.module);
        trace!(type_name = %full_name, "TypeInfoCache::get_type - building");
        let built = Arc::new(TypeInfo::build(self, &module, definition));

        Some(
            self.types
                .entry(full_name.to_string())
                .or_insert(built)
                .value()
                .clone(),
        )
    }

    fn definition_by_name(&self, full_name: &str) -> Option<Arc<TypeDefinition>> {
        self.source.type_definition(full_name)
    }

    fn push_unique(out: &mut Vec<Arc<ProxyInfo>>, proxy: &Arc<ProxyInfo>) {
        if !out.iter().any(|p| Arc::ptr_eq(p, proxy)) {
            out.push(proxy.clone());
        }
    }
}

impl TypeInfoProvider for TypeInfoCache {
    fn get_type(&self, type_ref: &TypeRef) -> Option<Arc<TypeInfo>> {
        self.type_info_by_name(type_ref.definition_name()?)
    }

    fn get_proxies(&self, type_ref: &TypeRef) -> Vec<Arc<ProxyInfo>> {
        let mut out = Vec::new();
        let Some(name) = type_ref.definition_name() else {
            return out;
        };

        for proxy in &self.proxies {
            if proxy.proxies(name) {
                Self::push_unique(&mut out, proxy);
            }
        }

        let mut current = self
            .definition_by_name(name)
            .and_then(|d| d.base_type.clone());
        let mut depth = 0;
        while let Some(base) = current {
            if depth >= MAX_BASE_TYPE_CHAIN {
                debug!(type_name = %name, "TypeInfoCache::get_proxies - base chain too deep");
                break;
            }
            depth += 1;

            let Some(base_name) = base.definition_name() else {
                break;
            };
            for proxy in &self.proxies {
                if proxy.is_inheritable && proxy.proxies(base_name) {
                    Self::push_unique(&mut out, proxy);
                }
            }
            current = self
                .definition_by_name(base_name)
                .and_then(|d| d.base_type.clone());
        }

        out
    }

    fn get_module(&self, name: &str) -> Arc<ModuleInfo> {
        if let Some(hit) = self.modules.get(name) {
            return hit.value().clone();
        }
        let definition = self.source.module_definition(name);
        let info = Arc::new(ModuleInfo::new(
            name,
            definition.as_deref(),
            self.ignored_modules.is_match(name),
        ));
        self.modules
            .entry(name.to_string())
            .or_insert(info)
            .value()
            .clone()
    }

    fn is_ignored_type(&self, type_ref: &TypeRef) -> bool {
        match type_ref {
            TypeRef::Pointer(_) => true,
            TypeRef::ByReference(inner) => self.is_ignored_type(inner),
            TypeRef::Array { element, .. } => self.is_ignored_type(element),
            TypeRef::GenericParameter { .. } => false,
            TypeRef::Named(_) | TypeRef::GenericInstance { .. } => {
                let Some(name) = type_ref.definition_name() else {
                    return false;
                };
                if is_ignored_name(name) {
                    return true;
                }
                match self.definition_by_name(name) {
                    Some(definition) => {
                        definition.has_attribute(attribute_names::JS_IGNORE)
                            || self.get_module(&definition.module).is_ignored
                    }
                    None => false,
                }
            }
        }
    }

    fn definition(&self, type_ref: &TypeRef) -> Option<Arc<TypeDefinition>> {
        self.definition_by_name(type_ref.definition_name()?)
    }

    fn get_field(&self, field: &FieldRef) -> Option<MemberHandle> {
        let info = self.get_type(&field.declaring_type)?;
        let identity = MemberIdentifier::for_field_ref(&field.name, &field.field_type);
        let id = info.members.find(&identity)?;
        MemberHandle::new(info, id)
    }

    fn get_method(&self, method: &MethodRef) -> Option<MemberHandle> {
        let info = self.get_type(&method.declaring_type)?;
        let identity = MemberIdentifier::for_method_ref(method);
        let id = info.members.find(&identity)?;
        MemberHandle::new(info, id)
    }
}

impl fmt::Debug for TypeInfoCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfoCache")
            .field("types", &self.types.len())
            .field("modules", &self.modules.len())
            .field("proxies", &self.proxies.len())
            .finish()
    }
}
