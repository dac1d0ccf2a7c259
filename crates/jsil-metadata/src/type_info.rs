//! Per-type merged member tables.
//!
//! # Architecture
//!
//! [`TypeInfo::build`] merges, in order:
//!
//! 1. the type's own fields, properties (+ accessors), events (+ accessors)
//!    and remaining methods;
//! 2. each applicable proxy's properties, events, fields and methods,
//!    under the proxy's member policy;
//!
//! then assigns overload indices and records the static constructor.
//! The finished value is immutable and shared behind an `Arc`.

use crate::definitions::{MethodDefinition, TypeDefinition};
use crate::identity::{MemberIdentifier, MemberKind};
use crate::members::{
    DeclaringContext, EnumMemberInfo, MemberDefinition, MemberId, MemberInfo, MethodGroupInfo,
};
use crate::metadata::{MetadataCollection, attribute_names};
use crate::naming::is_ignored_name;
use crate::provider::{ModuleInfo, TypeInfoProvider};
use crate::proxy::{ProxyAttributePolicy, ProxyInfo, ProxyMemberPolicy};
use crate::types::well_known;
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, warn};

// =============================================================================
// Member table
// =============================================================================

/// Members addressed by [`MemberId`], looked up by structural identity.
///
/// Removed members keep their slot so outstanding ids stay valid, but they
/// are no longer reachable through lookups or iteration.
#[derive(Debug, Default)]
pub struct MemberTable {
    slots: Vec<MemberInfo>,
    live: Vec<bool>,
    buckets: FxHashMap<(MemberKind, String), SmallVec<[MemberId; 2]>>,
}

impl MemberTable {
    fn next_id(&self) -> MemberId {
        MemberId(self.slots.len() as u32)
    }

    fn insert(&mut self, info: MemberInfo) -> MemberId {
        let id = info.id;
        debug_assert_eq!(id, self.next_id());
        self.buckets
            .entry((info.identity.kind, info.identity.name.clone()))
            .or_default()
            .push(id);
        self.slots.push(info);
        self.live.push(true);
        id
    }

    fn remove(&mut self, id: MemberId) {
        let index = id.0 as usize;
        if let Some(live) = self.live.get_mut(index) {
            *live = false;
        }
        if let Some(info) = self.slots.get(index) {
            let key = (info.identity.kind, info.identity.name.clone());
            if let Some(bucket) = self.buckets.get_mut(&key) {
                bucket.retain(|m| *m != id);
            }
        }
    }

    /// First live member whose identity matches.
    #[must_use]
    pub fn find(&self, identity: &MemberIdentifier) -> Option<MemberId> {
        self.buckets
            .get(&(identity.kind, identity.name.clone()))?
            .iter()
            .copied()
            .find(|id| self.slots[id.0 as usize].identity.matches(identity))
    }

    #[must_use]
    pub fn get(&self, id: MemberId) -> Option<&MemberInfo> {
        let index = id.0 as usize;
        if self.live.get(index).copied().unwrap_or(false) {
            self.slots.get(index)
        } else {
            None
        }
    }

    /// Slot access regardless of liveness.
    pub(crate) fn slot(&self, id: MemberId) -> &MemberInfo {
        &self.slots[id.0 as usize]
    }

    fn slot_mut(&mut self, id: MemberId) -> &mut MemberInfo {
        &mut self.slots[id.0 as usize]
    }

    /// Live members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &MemberInfo> {
        self.slots
            .iter()
            .zip(&self.live)
            .filter(|(_, live)| **live)
            .map(|(info, _)| info)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.live.iter().filter(|l| **l).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Type info
// =============================================================================

#[derive(Debug)]
pub struct TypeInfo {
    pub definition: Arc<TypeDefinition>,
    pub is_ignored: bool,
    pub metadata: MetadataCollection,
    pub proxies: Vec<Arc<ProxyInfo>>,
    pub members: MemberTable,
    pub constructors: Vec<MemberId>,
    pub static_constructor: Option<MemberId>,
    pub method_groups: Vec<MethodGroupInfo>,
    pub is_flags_enum: bool,
    pub value_to_enum_member: FxHashMap<i64, EnumMemberInfo>,
    pub enum_members: IndexMap<String, EnumMemberInfo>,
}

impl TypeInfo {
    pub fn build(
        provider: &dyn TypeInfoProvider,
        module: &ModuleInfo,
        definition: Arc<TypeDefinition>,
    ) -> TypeInfo {
        let type_ref = definition.to_type_ref();
        let proxies = provider.get_proxies(&type_ref);

        let mut metadata = MetadataCollection::new(&definition.attributes);
        for proxy in &proxies {
            metadata.update(
                &proxy.metadata,
                proxy.attribute_policy == ProxyAttributePolicy::ReplaceAll,
            );
        }

        let mut is_ignored = module.is_ignored
            || is_ignored_name(&definition.full_name)
            || metadata.has_attribute(attribute_names::JS_IGNORE);
        if let Some(declaring) = &definition.declaring_type {
            if let Some(outer) = provider.get_type(declaring) {
                is_ignored |= outer.is_ignored;
            }
        }

        let context = DeclaringContext {
            full_name: definition.full_name.clone(),
            is_ignored,
            is_interface: definition.is_interface(),
            interface_name: definition.name().to_string(),
        };

        let mut builder = MemberTableBuilder {
            provider,
            context,
            proxies: &proxies,
            table: MemberTable::default(),
        };
        builder.add_own_members(&definition);
        for proxy in &proxies {
            builder.add_proxy_members(proxy, definition.is_static());
        }
        let mut members = builder.table;

        let (is_flags_enum, value_to_enum_member, enum_members) = if definition.is_enum() {
            let (values, names) = build_enum_maps(&definition);
            (
                metadata.has_attribute(well_known::FLAGS_ATTRIBUTE),
                values,
                names,
            )
        } else {
            (false, FxHashMap::default(), IndexMap::new())
        };

        let (method_groups, static_constructor) = assign_overloads(&mut members);

        let constructors = members
            .iter()
            .filter(|m| m.method().is_some_and(|md| md.is_constructor()))
            .map(|m| m.id)
            .collect();

        debug!(
            type_name = %definition.full_name,
            members = members.len(),
            proxies = proxies.len(),
            is_ignored,
            "TypeInfo::build"
        );

        TypeInfo {
            definition,
            is_ignored,
            metadata,
            proxies,
            members,
            constructors,
            static_constructor,
            method_groups,
            is_flags_enum,
            value_to_enum_member,
            enum_members,
        }
    }

    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.definition.full_name
    }

    #[must_use]
    pub fn member(&self, id: MemberId) -> Option<&MemberInfo> {
        self.members.get(id)
    }

    #[must_use]
    pub fn find_member(&self, identity: &MemberIdentifier) -> Option<&MemberInfo> {
        self.members.find(identity).and_then(|id| self.members.get(id))
    }

    /// Live members of one kind, in insertion order.
    pub fn members_of_kind(&self, kind: MemberKind) -> impl Iterator<Item = &MemberInfo> {
        self.members.iter().filter(move |m| m.kind() == kind)
    }

    #[must_use]
    pub fn is_enum(&self) -> bool {
        self.definition.is_enum()
    }

    #[must_use]
    pub fn enum_member_for_value(&self, value: i64) -> Option<&EnumMemberInfo> {
        self.value_to_enum_member.get(&value)
    }

    #[must_use]
    pub fn method_group(&self, name: &str, is_static: bool) -> Option<&MethodGroupInfo> {
        self.method_groups
            .iter()
            .find(|g| g.name == name && g.is_static == is_static)
    }
}

// =============================================================================
// Construction
// =============================================================================

struct MemberTableBuilder<'a> {
    provider: &'a dyn TypeInfoProvider,
    context: DeclaringContext,
    proxies: &'a [Arc<ProxyInfo>],
    table: MemberTable,
}

/// Owner of an accessor method.
#[derive(Clone, Copy)]
enum AccessorOwner {
    Property(MemberId),
    Event(MemberId),
}

impl MemberTableBuilder<'_> {
    fn add_own_members(&mut self, definition: &TypeDefinition) {
        for field in &definition.fields {
            self.add_member(MemberDefinition::Field(field.clone()), None, false);
        }

        let mut accessors: FxHashSet<String> = FxHashSet::default();

        for property in &definition.properties {
            let owner = self.add_member(MemberDefinition::Property(property.clone()), None, false);
            for accessor in property.getter.iter().chain(property.setter.iter()) {
                accessors.insert(accessor.full_name());
                self.add_member(
                    MemberDefinition::Method(accessor.clone()),
                    Some(AccessorOwner::Property(owner)),
                    false,
                );
            }
        }

        for event in &definition.events {
            let owner = self.add_member(MemberDefinition::Event(event.clone()), None, false);
            for accessor in event.add_method.iter().chain(event.remove_method.iter()) {
                accessors.insert(accessor.full_name());
                self.add_member(
                    MemberDefinition::Method(accessor.clone()),
                    Some(AccessorOwner::Event(owner)),
                    false,
                );
            }
        }

        for method in &definition.methods {
            if accessors.contains(&method.full_name()) {
                continue;
            }
            self.add_member(MemberDefinition::Method(method.clone()), None, false);
        }
    }

    fn add_proxy_members(&mut self, proxy: &ProxyInfo, target_is_static: bool) {
        let mut seen_methods: FxHashSet<String> = FxHashSet::default();

        for property in proxy.properties() {
            let definition = MemberDefinition::Property(property.clone());
            let owner = self.add_proxy_member(proxy, definition.clone(), None);
            for accessor in property.getter.iter().chain(property.setter.iter()) {
                seen_methods.insert(accessor.full_name());
                self.add_proxy_member(
                    proxy,
                    MemberDefinition::Method(accessor.clone()),
                    Some((AccessorOwner::Property(owner), &definition)),
                );
            }
        }

        for event in proxy.events() {
            let definition = MemberDefinition::Event(event.clone());
            let owner = self.add_proxy_member(proxy, definition.clone(), None);
            for accessor in event.add_method.iter().chain(event.remove_method.iter()) {
                seen_methods.insert(accessor.full_name());
                self.add_proxy_member(
                    proxy,
                    MemberDefinition::Method(accessor.clone()),
                    Some((AccessorOwner::Event(owner), &definition)),
                );
            }
        }

        for field in proxy.fields() {
            if target_is_static && !field.is_static {
                continue;
            }
            self.add_proxy_member(proxy, MemberDefinition::Field(field.clone()), None);
        }

        for method in proxy.methods() {
            if seen_methods.contains(&method.full_name()) {
                continue;
            }
            if target_is_static && !method.is_static() {
                continue;
            }
            // Parameterless constructors are usually compiler-generated on
            // the proxy and must not clobber the real one.
            if method.is_constructor() && method.parameters.is_empty() {
                continue;
            }
            self.add_proxy_member(proxy, MemberDefinition::Method(method.clone()), None);
        }
    }

    /// Add a proxy member unless an existing member survives the proxy's
    /// policy, in which case the existing member's id is returned.
    fn add_proxy_member(
        &mut self,
        proxy: &ProxyInfo,
        definition: MemberDefinition,
        owner: Option<(AccessorOwner, &MemberDefinition)>,
    ) -> MemberId {
        let identity = definition.identity();

        while let Some(existing) = self.table.find(&identity) {
            let existing_info = self.table.slot(existing);
            let vetoed = definition.has_never_replace()
                || existing_info.definition.has_never_replace()
                || owner.is_some_and(|(_, owner_def)| owner_def.has_never_replace());

            if proxy.member_policy == ProxyMemberPolicy::ReplaceNone || vetoed {
                return existing;
            }

            if existing_info.is_from_proxy {
                warn!(
                    proxy_member = %definition.full_name(),
                    replaced = %existing_info.full_name(),
                    "Proxy member replacing proxy member"
                );
            }
            self.table.remove(existing);
        }

        self.add_member(definition, owner.map(|(o, _)| o), true)
    }

    fn add_member(
        &mut self,
        definition: MemberDefinition,
        owner: Option<AccessorOwner>,
        is_from_proxy: bool,
    ) -> MemberId {
        let provider = self.provider;
        let (is_ignored, is_external) = match &definition {
            MemberDefinition::Field(f) => (provider.is_ignored_type(&f.field_type), false),
            MemberDefinition::Property(p) => (provider.is_ignored_type(&p.property_type), false),
            MemberDefinition::Event(_) => (false, false),
            MemberDefinition::Method(m) => {
                let owner_ignored = match owner {
                    Some(AccessorOwner::Property(id) | AccessorOwner::Event(id)) => {
                        self.table.slot(id).is_ignored()
                    }
                    None => false,
                };
                (
                    owner_ignored || method_mentions_ignored_type(provider, m),
                    m.flags
                        .contains(crate::definitions::MethodFlags::EXTERNAL_IMPL),
                )
            }
        };

        let id = self.table.next_id();
        let mut info = MemberInfo::new(
            id,
            &self.context,
            definition,
            self.proxies,
            is_ignored,
            is_external,
            is_from_proxy,
        );
        match owner {
            Some(AccessorOwner::Property(p)) => info.declaring_property = Some(p),
            Some(AccessorOwner::Event(e)) => info.declaring_event = Some(e),
            None => {}
        }
        self.table.insert(info)
    }
}

fn method_mentions_ignored_type(provider: &dyn TypeInfoProvider, method: &MethodDefinition) -> bool {
    provider.is_ignored_type(&method.return_type)
        || method
            .parameters
            .iter()
            .any(|p| provider.is_ignored_type(&p.parameter_type))
}

/// Enum fields in declaration order; a field without a constant takes the
/// previous value plus one.
fn build_enum_maps(
    definition: &TypeDefinition,
) -> (FxHashMap<i64, EnumMemberInfo>, IndexMap<String, EnumMemberInfo>) {
    let mut values = FxHashMap::default();
    let mut names = IndexMap::new();
    let mut next_value: i64 = 0;

    for field in &definition.fields {
        if field.is_runtime_special_name {
            continue;
        }
        if let Some(constant) = field.constant {
            next_value = constant;
        }
        let info = EnumMemberInfo {
            declaring_type: definition.full_name.clone(),
            name: field.name.clone(),
            value: next_value,
        };
        values.insert(next_value, info.clone());
        names.insert(field.name.clone(), info);
        next_value = next_value.wrapping_add(1);
    }

    (values, names)
}

/// Group non-ignored methods by (name, static-ness) in full-name order.
/// Groups of two or more get overload indices; a lone `.cctor` becomes the
/// static constructor.
fn assign_overloads(members: &mut MemberTable) -> (Vec<MethodGroupInfo>, Option<MemberId>) {
    let mut methods: Vec<(String, MemberId, String, bool)> = members
        .iter()
        .filter(|m| m.kind() == MemberKind::Method && !m.is_ignored())
        .map(|m| (m.full_name(), m.id, m.name_with_mangling(false), m.is_static()))
        .collect();
    methods.sort_by(|a, b| a.0.cmp(&b.0));

    let mut groups: IndexMap<(String, bool), Vec<MemberId>> = IndexMap::new();
    for (_, id, name, is_static) in methods {
        groups.entry((name, is_static)).or_default().push(id);
    }

    let mut method_groups = Vec::new();
    let mut static_constructor = None;
    for ((name, is_static), ids) in groups {
        if ids.len() > 1 {
            for (index, id) in ids.iter().enumerate() {
                members.slot_mut(*id).overload_index = Some(index as u32);
            }
            method_groups.push(MethodGroupInfo {
                name,
                is_static,
                methods: ids,
            });
        } else if name == ".cctor" {
            static_constructor = ids.first().copied();
        }
    }

    (method_groups, static_constructor)
}
