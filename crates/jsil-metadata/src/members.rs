//! Member info records and access policies.

use crate::definitions::{
    AttributeValue, EventDefinition, FieldDefinition, MethodDefinition, PropertyDefinition,
};
use crate::identity::{MemberIdentifier, MemberKind};
use crate::metadata::{MetadataCollection, attribute_names};
use crate::naming::{is_ignored_name, short_member_name};
use crate::proxy::{ProxyAttributePolicy, ProxyInfo};
use crate::types::TypeRef;
use std::sync::Arc;

// =============================================================================
// Policies
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadPolicy {
    #[default]
    Unmodified,
    ReturnDefaultValue,
    LogWarning,
    ThrowError,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WritePolicy {
    #[default]
    Unmodified,
    DiscardValue,
    LogWarning,
    ThrowError,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InvokePolicy {
    #[default]
    Unmodified,
    ReturnDefaultValue,
    LogWarning,
    ThrowError,
}

impl ReadPolicy {
    const fn from_i64(v: i64) -> Self {
        match v {
            1 => Self::ReturnDefaultValue,
            2 => Self::LogWarning,
            3 => Self::ThrowError,
            _ => Self::Unmodified,
        }
    }
}

impl WritePolicy {
    const fn from_i64(v: i64) -> Self {
        match v {
            1 => Self::DiscardValue,
            2 => Self::LogWarning,
            3 => Self::ThrowError,
            _ => Self::Unmodified,
        }
    }
}

impl InvokePolicy {
    const fn from_i64(v: i64) -> Self {
        match v {
            1 => Self::ReturnDefaultValue,
            2 => Self::LogWarning,
            3 => Self::ThrowError,
            _ => Self::Unmodified,
        }
    }
}

// =============================================================================
// Member info
// =============================================================================

/// Handle of a member inside its owning [`TypeInfo`](crate::TypeInfo).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(pub u32);

#[derive(Clone, Debug)]
pub enum MemberDefinition {
    Field(FieldDefinition),
    Property(PropertyDefinition),
    Event(EventDefinition),
    Method(Arc<MethodDefinition>),
}

impl MemberDefinition {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            MemberDefinition::Field(f) => &f.name,
            MemberDefinition::Property(p) => &p.name,
            MemberDefinition::Event(e) => &e.name,
            MemberDefinition::Method(m) => &m.name,
        }
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        match self {
            MemberDefinition::Field(f) => f.full_name(),
            MemberDefinition::Property(p) => p.full_name(),
            MemberDefinition::Event(e) => e.full_name(),
            MemberDefinition::Method(m) => m.full_name(),
        }
    }

    #[must_use]
    pub fn identity(&self) -> MemberIdentifier {
        match self {
            MemberDefinition::Field(f) => MemberIdentifier::for_field(f),
            MemberDefinition::Property(p) => MemberIdentifier::for_property(p),
            MemberDefinition::Event(e) => MemberIdentifier::for_event(e),
            MemberDefinition::Method(m) => MemberIdentifier::for_method(m),
        }
    }

    fn attributes(&self) -> &[crate::definitions::CustomAttribute] {
        match self {
            MemberDefinition::Field(f) => &f.attributes,
            MemberDefinition::Property(p) => &p.attributes,
            MemberDefinition::Event(e) => &e.attributes,
            MemberDefinition::Method(m) => &m.attributes,
        }
    }

    #[must_use]
    pub fn has_never_replace(&self) -> bool {
        self.attributes()
            .iter()
            .any(|a| a.attribute_type == attribute_names::JS_NEVER_REPLACE)
    }
}

/// Facts about the type a member is being added to.
#[derive(Clone, Debug)]
pub struct DeclaringContext {
    pub full_name: String,
    pub is_ignored: bool,
    pub is_interface: bool,
    pub interface_name: String,
}

#[derive(Clone, Debug)]
pub struct MemberInfo {
    pub id: MemberId,
    pub identity: MemberIdentifier,
    pub definition: MemberDefinition,
    /// Owning type; for proxy members this is the proxied type.
    pub declaring_type: String,
    pub metadata: MetadataCollection,
    pub is_external: bool,
    pub is_from_proxy: bool,
    pub declaring_property: Option<MemberId>,
    pub declaring_event: Option<MemberId>,
    pub overload_index: Option<u32>,
    own_ignored: bool,
    declaring_type_ignored: bool,
    qualifier: Option<String>,
    read_policy: ReadPolicy,
    write_policy: WritePolicy,
    invoke_policy: InvokePolicy,
}

impl MemberInfo {
    /// Build the member record, overlaying metadata from every proxy member
    /// that shares the member's name.
    #[must_use]
    pub fn new(
        id: MemberId,
        context: &DeclaringContext,
        definition: MemberDefinition,
        proxies: &[Arc<ProxyInfo>],
        is_ignored: bool,
        is_external: bool,
        is_from_proxy: bool,
    ) -> Self {
        let mut metadata = MetadataCollection::new(definition.attributes());
        for proxy in proxies {
            let replace_all = proxy.attribute_policy == ProxyAttributePolicy::ReplaceAll;
            for attributes in proxy.member_attributes_named(definition.name()) {
                metadata.update(&MetadataCollection::new(attributes), replace_all);
            }
        }

        let own_ignored = is_ignored
            || is_ignored_name(&definition.full_name())
            || metadata.has_attribute(attribute_names::JS_IGNORE);
        let is_external = is_external
            || metadata.has_attribute(attribute_names::JS_EXTERNAL)
            || metadata.has_attribute(attribute_names::JS_REPLACEMENT);

        let mut read_policy = ReadPolicy::default();
        let mut write_policy = WritePolicy::default();
        let mut invoke_policy = InvokePolicy::default();
        if let Some(arguments) = metadata.attribute_arguments(attribute_names::JS_POLICY) {
            for argument in arguments {
                let AttributeValue::Int(value) = argument.value else {
                    continue;
                };
                match argument.type_name.as_str() {
                    attribute_names::READ_POLICY => read_policy = ReadPolicy::from_i64(value),
                    attribute_names::WRITE_POLICY => write_policy = WritePolicy::from_i64(value),
                    attribute_names::INVOKE_POLICY => {
                        invoke_policy = InvokePolicy::from_i64(value)
                    }
                    _ => {}
                }
            }
        }

        let qualifier = match &definition {
            MemberDefinition::Property(_) | MemberDefinition::Method(_) if context.is_interface => {
                Some(context.interface_name.clone())
            }
            MemberDefinition::Method(m) => m.overrides.first().map(|over| {
                match over.rfind(['.', '/']) {
                    Some(idx) => over[idx + 1..].to_string(),
                    None => over.clone(),
                }
            }),
            _ => None,
        };

        Self {
            id,
            identity: definition.identity(),
            definition,
            declaring_type: context.full_name.clone(),
            metadata,
            is_external,
            is_from_proxy,
            declaring_property: None,
            declaring_event: None,
            overload_index: None,
            own_ignored,
            declaring_type_ignored: context.is_ignored,
            qualifier,
            read_policy,
            write_policy,
            invoke_policy,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> MemberKind {
        self.identity.kind
    }

    /// Member-level ignore, with the declaring type's ignore layered on top.
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        self.own_ignored || self.declaring_type_ignored
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        match &self.definition {
            MemberDefinition::Field(f) => f.is_static,
            MemberDefinition::Property(p) => p.is_static(),
            MemberDefinition::Event(e) => e.is_static(),
            MemberDefinition::Method(m) => m.is_static(),
        }
    }

    #[must_use]
    pub fn return_type(&self) -> &TypeRef {
        match &self.definition {
            MemberDefinition::Field(f) => &f.field_type,
            MemberDefinition::Property(p) => &p.property_type,
            MemberDefinition::Event(e) => &e.event_type,
            MemberDefinition::Method(m) => &m.return_type,
        }
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        self.definition.full_name()
    }

    #[must_use]
    pub fn method(&self) -> Option<&Arc<MethodDefinition>> {
        match &self.definition {
            MemberDefinition::Method(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn forced_name(&self) -> Option<&str> {
        self.metadata
            .string_argument(attribute_names::JS_CHANGE_NAME)
    }

    /// Emitted name, with overload mangling unless the member opts into
    /// runtime dispatch.
    #[must_use]
    pub fn name(&self) -> String {
        let mangle = !self
            .metadata
            .has_attribute(attribute_names::JS_RUNTIME_DISPATCH);
        self.name_with_mangling(mangle)
    }

    #[must_use]
    pub fn name_with_mangling(&self, mangle: bool) -> String {
        let base = match self.forced_name() {
            Some(forced) => forced.to_string(),
            None => {
                let short = short_member_name(self.definition.name());
                match (&self.definition, &self.qualifier) {
                    (MemberDefinition::Field(_) | MemberDefinition::Event(_), _) => {
                        self.definition.name().to_string()
                    }
                    (_, Some(qualifier)) => format!("{qualifier}.{short}"),
                    (_, None) => short.to_string(),
                }
            }
        };

        match self.overload_index {
            Some(index) if mangle => format!("{base}${index}"),
            _ => base,
        }
    }

    #[must_use]
    pub const fn read_policy(&self) -> ReadPolicy {
        self.read_policy
    }

    #[must_use]
    pub const fn write_policy(&self) -> WritePolicy {
        self.write_policy
    }

    #[must_use]
    pub const fn invoke_policy(&self) -> InvokePolicy {
        self.invoke_policy
    }
}

#[derive(Clone, Debug)]
pub struct MethodGroupInfo {
    pub name: String,
    pub is_static: bool,
    /// Members in overload-index order.
    pub methods: Vec<MemberId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumMemberInfo {
    pub declaring_type: String,
    pub name: String,
    pub value: i64,
}

impl EnumMemberInfo {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.declaring_type, self.name)
    }
}
