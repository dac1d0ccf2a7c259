//! Structural member identity.
//!
//! Members are matched by kind, name and signature, never by declaring
//! type: a proxy's `Foo(int)` is "the same" member as the real type's
//! `Foo(int)`. Matching is deliberately loose in two places:
//!
//! - by-ref and array types compare by element type, so encodings that
//!   differ only in wrapper details still match;
//! - generic parameters and `JSIL.Proxy.AnyType` match any type, and a
//!   lone `params AnyType[]` parameter matches any parameter list.
//!
//! Because the wildcard makes equality non-transitive, identities are not
//! used as hash keys directly. [`MemberTable`](crate::type_info::MemberTable)
//! buckets them by `(kind, name)` and matches linearly within a bucket.

use crate::definitions::{
    EventDefinition, FieldDefinition, MethodDefinition, MethodRef, ParameterDefinition,
    PropertyDefinition,
};
use crate::types::TypeRef;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Field,
    Property,
    Event,
    Method,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParameterSignature {
    /// Fields and events.
    None,
    /// Matches any parameter list.
    Any,
    Types(Vec<TypeRef>),
}

#[derive(Clone, Debug)]
pub struct MemberIdentifier {
    pub kind: MemberKind,
    pub name: String,
    pub return_type: Option<TypeRef>,
    pub parameters: ParameterSignature,
}

impl MemberIdentifier {
    #[must_use]
    pub fn for_field(field: &FieldDefinition) -> Self {
        Self {
            kind: MemberKind::Field,
            name: field.name.clone(),
            return_type: Some(field.field_type.clone()),
            parameters: ParameterSignature::None,
        }
    }

    #[must_use]
    pub fn for_property(property: &PropertyDefinition) -> Self {
        Self {
            kind: MemberKind::Property,
            name: property.name.clone(),
            return_type: Some(property.property_type.clone()),
            parameters: ParameterSignature::Types(property.index_parameter_types()),
        }
    }

    #[must_use]
    pub fn for_event(event: &EventDefinition) -> Self {
        Self {
            kind: MemberKind::Event,
            name: event.name.clone(),
            return_type: Some(event.event_type.clone()),
            parameters: ParameterSignature::None,
        }
    }

    #[must_use]
    pub fn for_method(method: &MethodDefinition) -> Self {
        Self {
            kind: MemberKind::Method,
            name: method.name.clone(),
            return_type: Some(method.return_type.clone()),
            parameters: method_parameter_signature(&method.parameters),
        }
    }

    /// Identity of a referenced method, using its unsubstituted signature
    /// so it lines up with the declaring definition.
    #[must_use]
    pub fn for_method_ref(method: &MethodRef) -> Self {
        Self {
            kind: MemberKind::Method,
            name: method.name.clone(),
            return_type: Some(method.return_type.clone()),
            parameters: ParameterSignature::Types(method.parameters.clone()),
        }
    }

    #[must_use]
    pub fn for_field_ref(name: &str, field_type: &TypeRef) -> Self {
        Self {
            kind: MemberKind::Field,
            name: name.to_string(),
            return_type: Some(field_type.clone()),
            parameters: ParameterSignature::None,
        }
    }

    /// Structural match, with wildcards.
    #[must_use]
    pub fn matches(&self, other: &MemberIdentifier) -> bool {
        if self.kind != other.kind || self.name != other.name {
            return false;
        }

        let returns_match = match (&self.return_type, &other.return_type) {
            (Some(lhs), Some(rhs)) => types_match(lhs, rhs),
            (None, None) => true,
            _ => false,
        };
        if !returns_match {
            return false;
        }

        match (&self.parameters, &other.parameters) {
            (ParameterSignature::Any, _) | (_, ParameterSignature::Any) => true,
            (ParameterSignature::None, ParameterSignature::None) => true,
            (ParameterSignature::Types(lhs), ParameterSignature::Types(rhs)) => {
                lhs.len() == rhs.len() && lhs.iter().zip(rhs).all(|(l, r)| types_match(l, r))
            }
            _ => false,
        }
    }
}

impl fmt::Display for MemberIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(return_type) = &self.return_type {
            write!(f, "{return_type} ")?;
        }
        f.write_str(&self.name)?;
        match &self.parameters {
            ParameterSignature::None => Ok(()),
            ParameterSignature::Any => f.write_str("( ... )"),
            ParameterSignature::Types(types) => {
                let names: Vec<String> = types.iter().map(TypeRef::full_name).collect();
                write!(f, "( {} )", names.join(", "))
            }
        }
    }
}

fn method_parameter_signature(parameters: &[ParameterDefinition]) -> ParameterSignature {
    if let [single] = parameters {
        if single.is_param_array() {
            if let Some(element) = single.parameter_type.dereferenced().element_type() {
                if single.parameter_type.dereferenced().is_array() && element.is_any_type() {
                    return ParameterSignature::Any;
                }
            }
        }
    }
    ParameterSignature::Types(parameters.iter().map(|p| p.parameter_type.clone()).collect())
}

/// Member-identity type comparison.
#[must_use]
pub fn types_match(lhs: &TypeRef, rhs: &TypeRef) -> bool {
    match (lhs, rhs) {
        (TypeRef::ByReference(l), TypeRef::ByReference(r)) => types_match(l, r),
        (TypeRef::ByReference(_), _) | (_, TypeRef::ByReference(_)) => false,
        (TypeRef::Array { element: l, .. }, TypeRef::Array { element: r, .. }) => {
            types_match(l, r)
        }
        (TypeRef::Array { .. }, _) | (_, TypeRef::Array { .. }) => false,
        _ if lhs.is_any_type() || rhs.is_any_type() => true,
        _ => lhs.full_name() == rhs.full_name(),
    }
}
