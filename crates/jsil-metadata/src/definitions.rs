//! Loaded bytecode metadata as consumed by the resolver.
//!
//! These are plain data records filled in by an external loader. The
//! resolver never mutates them; everything derived (policies, overload
//! indices, proxy merges) lives in [`crate::type_info`].

use crate::types::{TypeRef, well_known};
use bitflags::bitflags;
use std::sync::Arc;

// =============================================================================
// Custom attributes
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    String(String),
    Type(TypeRef),
    Strings(Vec<String>),
    Types(Vec<TypeRef>),
}

/// A positional constructor argument, tagged with its declared type name
/// (`System.String`, `JSIL.Meta.JSReadPolicy`, ...).
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeArgument {
    pub type_name: String,
    pub value: AttributeValue,
}

impl AttributeArgument {
    #[must_use]
    pub fn new(type_name: &str, value: AttributeValue) -> Self {
        Self {
            type_name: type_name.to_string(),
            value,
        }
    }

    #[must_use]
    pub fn string(value: &str) -> Self {
        Self::new("System.String", AttributeValue::String(value.to_string()))
    }

    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::new("System.Boolean", AttributeValue::Bool(value))
    }

    #[must_use]
    pub fn ty(value: TypeRef) -> Self {
        Self::new(well_known::TYPE, AttributeValue::Type(value))
    }

    /// An enum-typed argument such as a policy value.
    #[must_use]
    pub fn enum_value(enum_type: &str, value: i64) -> Self {
        Self::new(enum_type, AttributeValue::Int(value))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CustomAttribute {
    pub attribute_type: String,
    pub arguments: Vec<AttributeArgument>,
}

impl CustomAttribute {
    #[must_use]
    pub fn new(attribute_type: &str) -> Self {
        Self {
            attribute_type: attribute_type.to_string(),
            arguments: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_argument(mut self, argument: AttributeArgument) -> Self {
        self.arguments.push(argument);
        self
    }
}

fn has_attribute(attributes: &[CustomAttribute], name: &str) -> bool {
    attributes.iter().any(|a| a.attribute_type == name)
}

// =============================================================================
// Flags
// =============================================================================

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TypeFlags: u32 {
        const VALUE_TYPE = 1 << 0;
        const ENUM       = 1 << 1;
        const INTERFACE  = 1 << 2;
        const ABSTRACT   = 1 << 3;
        const SEALED     = 1 << 4;
        /// C# `static class`.
        const STATIC     = Self::ABSTRACT.bits() | Self::SEALED.bits();
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MethodFlags: u32 {
        const STATIC             = 1 << 0;
        const VIRTUAL            = 1 << 1;
        const ABSTRACT           = 1 << 2;
        const COMPILER_GENERATED = 1 << 3;
        /// Native, unmanaged, or internal-call implementation.
        const EXTERNAL_IMPL      = 1 << 4;
        const SPECIAL_NAME       = 1 << 5;
    }
}

// =============================================================================
// Definitions
// =============================================================================

#[derive(Clone, Debug)]
pub struct ParameterDefinition {
    pub name: String,
    pub parameter_type: TypeRef,
    pub attributes: Vec<CustomAttribute>,
}

impl ParameterDefinition {
    #[must_use]
    pub fn new(name: &str, parameter_type: TypeRef) -> Self {
        Self {
            name: name.to_string(),
            parameter_type,
            attributes: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_param_array(&self) -> bool {
        has_attribute(&self.attributes, well_known::PARAM_ARRAY_ATTRIBUTE)
    }
}

#[derive(Clone, Debug)]
pub struct MethodDefinition {
    pub name: String,
    /// Full name of the declaring type.
    pub declaring_type: String,
    pub return_type: TypeRef,
    pub parameters: Vec<ParameterDefinition>,
    pub generic_parameters: Vec<String>,
    pub flags: MethodFlags,
    /// Explicitly overridden (interface) methods, as declaring-type names.
    pub overrides: Vec<String>,
    pub attributes: Vec<CustomAttribute>,
}

impl MethodDefinition {
    #[must_use]
    pub fn new(declaring_type: &str, name: &str, return_type: TypeRef) -> Self {
        Self {
            name: name.to_string(),
            declaring_type: declaring_type.to_string(),
            return_type,
            parameters: Vec::new(),
            generic_parameters: Vec::new(),
            flags: MethodFlags::empty(),
            overrides: Vec::new(),
            attributes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, name: &str, parameter_type: TypeRef) -> Self {
        self.parameters
            .push(ParameterDefinition::new(name, parameter_type));
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: MethodFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, attribute: CustomAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.flags.contains(MethodFlags::STATIC)
    }

    #[must_use]
    pub const fn is_abstract(&self) -> bool {
        self.flags.contains(MethodFlags::ABSTRACT)
    }

    #[must_use]
    pub const fn is_compiler_generated(&self) -> bool {
        self.flags.contains(MethodFlags::COMPILER_GENERATED)
    }

    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == ".ctor"
    }

    /// `System.Void Ns.Type::Name(System.Int32,System.String)`
    #[must_use]
    pub fn full_name(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| p.parameter_type.full_name())
            .collect();
        format!(
            "{} {}::{}({})",
            self.return_type,
            self.declaring_type,
            self.name,
            params.join(",")
        )
    }

    #[must_use]
    pub fn parameter_types(&self) -> Vec<TypeRef> {
        self.parameters
            .iter()
            .map(|p| p.parameter_type.clone())
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct FieldDefinition {
    pub name: String,
    pub declaring_type: String,
    pub field_type: TypeRef,
    pub is_static: bool,
    /// `value__` on enums.
    pub is_runtime_special_name: bool,
    pub constant: Option<i64>,
    pub attributes: Vec<CustomAttribute>,
}

impl FieldDefinition {
    #[must_use]
    pub fn new(declaring_type: &str, name: &str, field_type: TypeRef) -> Self {
        Self {
            name: name.to_string(),
            declaring_type: declaring_type.to_string(),
            field_type,
            is_static: false,
            is_runtime_special_name: false,
            constant: None,
            attributes: Vec::new(),
        }
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}::{}", self.field_type, self.declaring_type, self.name)
    }
}

#[derive(Clone, Debug)]
pub struct PropertyDefinition {
    pub name: String,
    pub declaring_type: String,
    pub property_type: TypeRef,
    pub getter: Option<Arc<MethodDefinition>>,
    pub setter: Option<Arc<MethodDefinition>>,
    pub attributes: Vec<CustomAttribute>,
}

impl PropertyDefinition {
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.getter
            .as_ref()
            .or(self.setter.as_ref())
            .is_some_and(|m| m.is_static())
    }

    /// Index parameters: the getter's parameters, or the setter's minus the value.
    #[must_use]
    pub fn index_parameter_types(&self) -> Vec<TypeRef> {
        if let Some(getter) = &self.getter {
            return getter.parameter_types();
        }
        if let Some(setter) = &self.setter {
            let mut types = setter.parameter_types();
            types.pop();
            return types;
        }
        Vec::new()
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}::{}()", self.property_type, self.declaring_type, self.name)
    }
}

#[derive(Clone, Debug)]
pub struct EventDefinition {
    pub name: String,
    pub declaring_type: String,
    pub event_type: TypeRef,
    pub add_method: Option<Arc<MethodDefinition>>,
    pub remove_method: Option<Arc<MethodDefinition>>,
    pub attributes: Vec<CustomAttribute>,
}

impl EventDefinition {
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.add_method
            .as_ref()
            .or(self.remove_method.as_ref())
            .is_some_and(|m| m.is_static())
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}::{}", self.event_type, self.declaring_type, self.name)
    }
}

#[derive(Clone, Debug)]
pub struct TypeDefinition {
    pub full_name: String,
    pub module: String,
    pub flags: TypeFlags,
    pub base_type: Option<TypeRef>,
    /// Enclosing type for nested types.
    pub declaring_type: Option<TypeRef>,
    pub generic_parameters: Vec<String>,
    pub attributes: Vec<CustomAttribute>,
    pub fields: Vec<FieldDefinition>,
    pub properties: Vec<PropertyDefinition>,
    pub events: Vec<EventDefinition>,
    pub methods: Vec<Arc<MethodDefinition>>,
}

impl TypeDefinition {
    #[must_use]
    pub fn new(full_name: &str, module: &str) -> Self {
        Self {
            full_name: full_name.to_string(),
            module: module.to_string(),
            flags: TypeFlags::empty(),
            base_type: Some(TypeRef::class(well_known::OBJECT)),
            declaring_type: None,
            generic_parameters: Vec::new(),
            attributes: Vec::new(),
            fields: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
            methods: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_value_type(&self) -> bool {
        self.flags.contains(TypeFlags::VALUE_TYPE)
    }

    #[must_use]
    pub fn is_enum(&self) -> bool {
        self.flags.contains(TypeFlags::ENUM)
    }

    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flags.contains(TypeFlags::INTERFACE)
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(TypeFlags::STATIC)
    }

    #[must_use]
    pub fn is_delegate(&self) -> bool {
        self.base_type.as_ref().is_some_and(|b| {
            b.is(well_known::DELEGATE) || b.is(well_known::MULTICAST_DELEGATE)
        })
    }

    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        has_attribute(&self.attributes, name)
    }

    /// Short name after the namespace / nesting separator.
    #[must_use]
    pub fn name(&self) -> &str {
        match self.full_name.rfind(['.', '/']) {
            Some(idx) => &self.full_name[idx + 1..],
            None => &self.full_name,
        }
    }

    /// A reference to this definition.
    #[must_use]
    pub fn to_type_ref(&self) -> TypeRef {
        if self.is_value_type() {
            TypeRef::value_type(&self.full_name)
        } else {
            TypeRef::class(&self.full_name)
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ModuleDefinition {
    pub name: String,
    pub attributes: Vec<CustomAttribute>,
}

// =============================================================================
// Member references (instruction operands)
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct FieldRef {
    pub declaring_type: TypeRef,
    pub name: String,
    pub field_type: TypeRef,
}

impl FieldRef {
    #[must_use]
    pub fn new(declaring_type: TypeRef, name: &str, field_type: TypeRef) -> Self {
        Self {
            declaring_type,
            name: name.to_string(),
            field_type,
        }
    }

    /// Field type with the declaring instance's generic arguments applied.
    #[must_use]
    pub fn resolved_field_type(&self) -> TypeRef {
        self.field_type
            .substitute(self.declaring_type.generic_arguments(), &[])
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MethodRef {
    pub declaring_type: TypeRef,
    pub name: String,
    pub return_type: TypeRef,
    pub parameters: Vec<TypeRef>,
    pub has_this: bool,
    pub generic_parameter_count: u32,
    pub generic_arguments: Vec<TypeRef>,
}

impl MethodRef {
    #[must_use]
    pub fn new(declaring_type: TypeRef, name: &str, return_type: TypeRef) -> Self {
        Self {
            declaring_type,
            name: name.to_string(),
            return_type,
            parameters: Vec::new(),
            has_this: true,
            generic_parameter_count: 0,
            generic_arguments: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, parameter_type: TypeRef) -> Self {
        self.parameters.push(parameter_type);
        self
    }

    #[must_use]
    pub fn static_method(mut self) -> Self {
        self.has_this = false;
        self
    }

    /// Reference to a loaded definition declared on `declaring_type`.
    #[must_use]
    pub fn from_definition(declaring_type: TypeRef, method: &MethodDefinition) -> Self {
        Self {
            declaring_type,
            name: method.name.clone(),
            return_type: method.return_type.clone(),
            parameters: method.parameter_types(),
            has_this: !method.is_static(),
            generic_parameter_count: method.generic_parameters.len() as u32,
            generic_arguments: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == ".ctor"
    }

    fn substituted(&self, t: &TypeRef) -> TypeRef {
        t.substitute(
            self.declaring_type.generic_arguments(),
            &self.generic_arguments,
        )
    }

    #[must_use]
    pub fn resolved_return_type(&self) -> TypeRef {
        self.substituted(&self.return_type)
    }

    #[must_use]
    pub fn resolved_parameters(&self) -> Vec<TypeRef> {
        self.parameters.iter().map(|p| self.substituted(p)).collect()
    }

    /// A reference to a generic method definition that supplies fewer type
    /// arguments than the method declares.
    #[must_use]
    pub fn is_unbound_generic(&self) -> bool {
        self.generic_parameter_count as usize > self.generic_arguments.len()
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        let params: Vec<String> = self.parameters.iter().map(TypeRef::full_name).collect();
        format!(
            "{} {}::{}({})",
            self.return_type,
            self.declaring_type,
            self.name,
            params.join(",")
        )
    }
}
