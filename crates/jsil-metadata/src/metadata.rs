//! Attribute collections and the translator's metadata attribute names.

use crate::definitions::{AttributeArgument, AttributeValue, CustomAttribute};
use indexmap::IndexMap;

pub mod attribute_names {
    pub const JS_IGNORE: &str = "JSIL.Meta.JSIgnore";
    pub const JS_EXTERNAL: &str = "JSIL.Meta.JSExternal";
    pub const JS_REPLACEMENT: &str = "JSIL.Meta.JSReplacement";
    pub const JS_POLICY: &str = "JSIL.Meta.JSPolicy";
    pub const JS_CHANGE_NAME: &str = "JSIL.Meta.JSChangeName";
    pub const JS_RUNTIME_DISPATCH: &str = "JSIL.Meta.JSRuntimeDispatch";
    pub const JS_PROXY: &str = "JSIL.Proxy.JSProxy";
    pub const JS_NEVER_REPLACE: &str = "JSIL.Proxy.JSNeverReplace";

    pub const READ_POLICY: &str = "JSIL.Meta.JSReadPolicy";
    pub const WRITE_POLICY: &str = "JSIL.Meta.JSWritePolicy";
    pub const INVOKE_POLICY: &str = "JSIL.Meta.JSInvokePolicy";
    pub const PROXY_MEMBER_POLICY: &str = "JSIL.Proxy.JSProxyMemberPolicy";
    pub const PROXY_ATTRIBUTE_POLICY: &str = "JSIL.Proxy.JSProxyAttributePolicy";
}

/// Custom attributes keyed by attribute type name; a later attribute of
/// the same type overwrites an earlier one.
#[derive(Clone, Debug, Default)]
pub struct MetadataCollection {
    attributes: IndexMap<String, CustomAttribute>,
}

impl MetadataCollection {
    #[must_use]
    pub fn new(attributes: &[CustomAttribute]) -> Self {
        let mut collection = Self::default();
        for attribute in attributes {
            collection
                .attributes
                .insert(attribute.attribute_type.clone(), attribute.clone());
        }
        collection
    }

    /// Overlay `rhs` on top of this collection. `replace_all` clears the
    /// existing attributes first.
    pub fn update(&mut self, rhs: &MetadataCollection, replace_all: bool) {
        if replace_all {
            self.attributes.clear();
        }
        for (key, value) in &rhs.attributes {
            self.attributes.insert(key.clone(), value.clone());
        }
    }

    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<&CustomAttribute> {
        self.attributes.get(name)
    }

    #[must_use]
    pub fn attribute_arguments(&self, name: &str) -> Option<&[AttributeArgument]> {
        self.attributes.get(name).map(|a| a.arguments.as_slice())
    }

    /// First string argument of the named attribute.
    #[must_use]
    pub fn string_argument(&self, name: &str) -> Option<&str> {
        self.attribute_arguments(name)?
            .iter()
            .find_map(|arg| match &arg.value {
                AttributeValue::String(s) => Some(s.as_str()),
                _ => None,
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}
