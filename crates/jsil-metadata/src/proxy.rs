//! Proxy member sources.
//!
//! A proxy is a type carrying a `JSIL.Proxy.JSProxy` attribute. Its members
//! are layered onto the member tables of the types it names.

use crate::MetadataError;
use crate::definitions::{
    AttributeValue, CustomAttribute, EventDefinition, FieldDefinition, MethodDefinition,
    PropertyDefinition, TypeDefinition,
};
use crate::metadata::{MetadataCollection, attribute_names};
use std::sync::Arc;

/// How proxy members interact with same-identity members already present.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProxyMemberPolicy {
    /// Keep the existing member.
    ReplaceNone,
    /// Evict the existing member in favor of the proxy's.
    #[default]
    ReplaceDeclared,
}

impl ProxyMemberPolicy {
    fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::ReplaceNone),
            1 => Some(Self::ReplaceDeclared),
            _ => None,
        }
    }
}

/// How proxy type-level metadata is merged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProxyAttributePolicy {
    #[default]
    ReplaceDeclared,
    ReplaceAll,
}

impl ProxyAttributePolicy {
    fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::ReplaceDeclared),
            1 => Some(Self::ReplaceAll),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct ProxyInfo {
    pub definition: Arc<TypeDefinition>,
    /// Full names of the proxied types, from both `Type` and string arguments.
    pub proxied_type_names: Vec<String>,
    pub metadata: MetadataCollection,
    pub member_policy: ProxyMemberPolicy,
    pub attribute_policy: ProxyAttributePolicy,
    pub is_inheritable: bool,
}

impl ProxyInfo {
    /// Parse the `JSProxy` attribute of `definition`.
    ///
    /// Arguments are identified by their declared type rather than position.
    pub fn new(definition: Arc<TypeDefinition>) -> Result<Self, MetadataError> {
        let metadata = MetadataCollection::new(&definition.attributes);
        let mut proxied_type_names = Vec::new();
        let mut member_policy = ProxyMemberPolicy::default();
        let mut attribute_policy = ProxyAttributePolicy::default();
        let mut is_inheritable = true;

        let arguments = metadata
            .attribute_arguments(attribute_names::JS_PROXY)
            .ok_or_else(|| MetadataError::NotAProxy(definition.full_name.clone()))?;

        for argument in arguments {
            match (argument.type_name.as_str(), &argument.value) {
                (attribute_names::PROXY_ATTRIBUTE_POLICY, AttributeValue::Int(v)) => {
                    attribute_policy = ProxyAttributePolicy::from_i64(*v).ok_or_else(|| {
                        MetadataError::InvalidPolicyValue {
                            policy: argument.type_name.clone(),
                            value: *v,
                        }
                    })?;
                }
                (attribute_names::PROXY_MEMBER_POLICY, AttributeValue::Int(v)) => {
                    member_policy = ProxyMemberPolicy::from_i64(*v).ok_or_else(|| {
                        MetadataError::InvalidPolicyValue {
                            policy: argument.type_name.clone(),
                            value: *v,
                        }
                    })?;
                }
                ("System.Type", AttributeValue::Type(t)) => {
                    proxied_type_names = vec![t.full_name()];
                }
                ("System.Type[]", AttributeValue::Types(types)) => {
                    proxied_type_names = types.iter().map(|t| t.full_name()).collect();
                }
                ("System.Boolean", AttributeValue::Bool(b)) => is_inheritable = *b,
                ("System.String", AttributeValue::String(s)) => {
                    proxied_type_names = vec![s.clone()];
                }
                ("System.String[]", AttributeValue::Strings(names)) => {
                    proxied_type_names = names.clone();
                }
                _ => {
                    return Err(MetadataError::UnsupportedProxyArgument {
                        proxy: definition.full_name.clone(),
                        argument_type: argument.type_name.clone(),
                    });
                }
            }
        }

        if proxied_type_names.is_empty() {
            return Err(MetadataError::UnknownProxiedType(definition.full_name.clone()));
        }

        Ok(Self {
            definition,
            proxied_type_names,
            metadata,
            member_policy,
            attribute_policy,
            is_inheritable,
        })
    }

    #[must_use]
    pub fn proxies(&self, full_name: &str) -> bool {
        self.proxied_type_names.iter().any(|n| n == full_name)
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.definition.fields
    }

    #[must_use]
    pub fn properties(&self) -> &[PropertyDefinition] {
        &self.definition.properties
    }

    #[must_use]
    pub fn events(&self) -> &[EventDefinition] {
        &self.definition.events
    }

    #[must_use]
    pub fn methods(&self) -> &[Arc<MethodDefinition>] {
        &self.definition.methods
    }

    /// Attribute lists of every proxy member named `name`, of any kind.
    pub fn member_attributes_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a [CustomAttribute]> + 'a {
        let fields = self
            .fields()
            .iter()
            .filter(move |f| f.name == name)
            .map(|f| f.attributes.as_slice());
        let properties = self
            .properties()
            .iter()
            .filter(move |p| p.name == name)
            .map(|p| p.attributes.as_slice());
        let events = self
            .events()
            .iter()
            .filter(move |e| e.name == name)
            .map(|e| e.attributes.as_slice());
        let methods = self
            .methods()
            .iter()
            .filter(move |m| m.name == name)
            .map(|m| m.attributes.as_slice());
        fields.chain(properties).chain(events).chain(methods)
    }
}

/// Shorthand used by loaders and tests to mark a definition as a proxy.
#[must_use]
pub fn proxy_attribute(proxied_type: &str) -> CustomAttribute {
    CustomAttribute::new(attribute_names::JS_PROXY)
        .with_argument(crate::definitions::AttributeArgument::string(proxied_type))
}
