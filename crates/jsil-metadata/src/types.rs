//! Type references and the per-session type system.
//!
//! A [`TypeRef`] is a structural description of a bytecode type as it
//! appears in signatures and instruction operands. It is cheap to clone
//! (names are `Arc<str>`) and compares by full name, so two references
//! produced by different loaders for "the same" type are equal.
//!
//! [`TypeSystem`] owns the well-known types and the delegate-signature
//! cache. One instance lives for the duration of a translation session.

use dashmap::DashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::trace;

pub mod well_known {
    pub const OBJECT: &str = "System.Object";
    pub const VALUE_TYPE: &str = "System.ValueType";
    pub const ENUM: &str = "System.Enum";
    pub const VOID: &str = "System.Void";
    pub const STRING: &str = "System.String";
    pub const TYPE: &str = "System.Type";
    pub const EXCEPTION: &str = "System.Exception";
    pub const DELEGATE: &str = "System.Delegate";
    pub const MULTICAST_DELEGATE: &str = "System.MulticastDelegate";
    pub const NULLABLE: &str = "System.Nullable`1";
    pub const ACTION: &str = "System.Action";
    pub const FUNC: &str = "System.Func";
    pub const METHOD_SIGNATURE: &str = "JSIL.Meta.MethodSignature";
    pub const ANY_TYPE: &str = "JSIL.Proxy.AnyType";
    pub const PARAM_ARRAY_ATTRIBUTE: &str = "System.ParamArrayAttribute";
    pub const FLAGS_ATTRIBUTE: &str = "System.FlagsAttribute";
}

// =============================================================================
// Type references
// =============================================================================

/// A named (non-generic-instance) type.
///
/// Equality and hashing use only the full name.
#[derive(Clone, Debug)]
pub struct NamedType {
    pub full_name: Arc<str>,
    pub is_value_type: bool,
}

impl PartialEq for NamedType {
    fn eq(&self, other: &Self) -> bool {
        self.full_name == other.full_name
    }
}

impl Eq for NamedType {}

impl Hash for NamedType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full_name.hash(state);
    }
}

/// Who declares a generic parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GenericParameterOwner {
    Type,
    Method,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(NamedType),
    GenericInstance {
        definition: NamedType,
        arguments: Vec<TypeRef>,
    },
    GenericParameter {
        name: Arc<str>,
        owner: GenericParameterOwner,
        position: u32,
    },
    ByReference(Box<TypeRef>),
    Pointer(Box<TypeRef>),
    Array {
        element: Box<TypeRef>,
        rank: u32,
    },
}

impl TypeRef {
    /// A reference type with the given full name.
    #[must_use]
    pub fn class(full_name: &str) -> Self {
        TypeRef::Named(NamedType {
            full_name: Arc::from(full_name),
            is_value_type: false,
        })
    }

    /// A value type with the given full name.
    #[must_use]
    pub fn value_type(full_name: &str) -> Self {
        TypeRef::Named(NamedType {
            full_name: Arc::from(full_name),
            is_value_type: true,
        })
    }

    #[must_use]
    pub fn generic_instance(definition: TypeRef, arguments: Vec<TypeRef>) -> Self {
        match definition {
            TypeRef::Named(definition) | TypeRef::GenericInstance { definition, .. } => {
                TypeRef::GenericInstance {
                    definition,
                    arguments,
                }
            }
            other => other,
        }
    }

    #[must_use]
    pub fn type_parameter(name: &str, position: u32) -> Self {
        TypeRef::GenericParameter {
            name: Arc::from(name),
            owner: GenericParameterOwner::Type,
            position,
        }
    }

    #[must_use]
    pub fn method_parameter(name: &str, position: u32) -> Self {
        TypeRef::GenericParameter {
            name: Arc::from(name),
            owner: GenericParameterOwner::Method,
            position,
        }
    }

    #[must_use]
    pub fn by_ref(self) -> Self {
        TypeRef::ByReference(Box::new(self))
    }

    #[must_use]
    pub fn pointer(self) -> Self {
        TypeRef::Pointer(Box::new(self))
    }

    #[must_use]
    pub fn array(self) -> Self {
        TypeRef::Array {
            element: Box::new(self),
            rank: 1,
        }
    }

    #[must_use]
    pub fn array_of_rank(self, rank: u32) -> Self {
        TypeRef::Array {
            element: Box::new(self),
            rank: rank.max(1),
        }
    }

    /// Full name in bytecode notation, e.g. `System.Int32&` or
    /// ``System.Collections.Generic.List`1<System.String>``.
    #[must_use]
    pub fn full_name(&self) -> String {
        self.to_string()
    }

    /// Full name of the underlying named type, ignoring generic arguments.
    #[must_use]
    pub fn definition_name(&self) -> Option<&str> {
        match self {
            TypeRef::Named(named) | TypeRef::GenericInstance { definition: named, .. } => {
                Some(&named.full_name)
            }
            _ => None,
        }
    }

    /// True when this is the named type `full_name` (generic instances match
    /// their definition name).
    #[must_use]
    pub fn is(&self, full_name: &str) -> bool {
        self.definition_name() == Some(full_name)
    }

    /// Name after the last namespace separator.
    #[must_use]
    pub fn short_name(&self) -> String {
        let full = self.full_name();
        let base = match full.find('<') {
            Some(idx) => &full[..idx],
            None => full.as_str(),
        };
        match base.rfind(['.', '/']) {
            Some(idx) => base[idx + 1..].to_string(),
            None => base.to_string(),
        }
    }

    #[must_use]
    pub fn is_value_type(&self) -> bool {
        match self {
            TypeRef::Named(named) | TypeRef::GenericInstance { definition: named, .. } => {
                named.is_value_type
            }
            _ => false,
        }
    }

    #[must_use]
    pub const fn is_by_reference(&self) -> bool {
        matches!(self, TypeRef::ByReference(_))
    }

    #[must_use]
    pub const fn is_pointer(&self) -> bool {
        matches!(self, TypeRef::Pointer(_))
    }

    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, TypeRef::Array { .. })
    }

    #[must_use]
    pub const fn is_generic_parameter(&self) -> bool {
        matches!(self, TypeRef::GenericParameter { .. })
    }

    /// Element type of a by-ref, pointer, or array type.
    #[must_use]
    pub fn element_type(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::ByReference(inner) | TypeRef::Pointer(inner) => Some(inner),
            TypeRef::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Strips any number of by-ref layers.
    #[must_use]
    pub fn dereferenced(&self) -> &TypeRef {
        let mut current = self;
        while let TypeRef::ByReference(inner) = current {
            current = inner;
        }
        current
    }

    /// Generic parameters and the proxy wildcard match any type in member
    /// identity comparisons.
    #[must_use]
    pub fn is_any_type(&self) -> bool {
        let t = self.dereferenced();
        t.is_generic_parameter() || t.is(well_known::ANY_TYPE)
    }

    /// Replace generic parameters with the given arguments.
    ///
    /// Parameters whose position is out of range are left untouched.
    #[must_use]
    pub fn substitute(&self, type_args: &[TypeRef], method_args: &[TypeRef]) -> TypeRef {
        match self {
            TypeRef::Named(_) => self.clone(),
            TypeRef::GenericParameter {
                owner, position, ..
            } => {
                let args = match owner {
                    GenericParameterOwner::Type => type_args,
                    GenericParameterOwner::Method => method_args,
                };
                args.get(*position as usize)
                    .cloned()
                    .unwrap_or_else(|| self.clone())
            }
            TypeRef::GenericInstance {
                definition,
                arguments,
            } => TypeRef::GenericInstance {
                definition: definition.clone(),
                arguments: arguments
                    .iter()
                    .map(|a| a.substitute(type_args, method_args))
                    .collect(),
            },
            TypeRef::ByReference(inner) => {
                TypeRef::ByReference(Box::new(inner.substitute(type_args, method_args)))
            }
            TypeRef::Pointer(inner) => {
                TypeRef::Pointer(Box::new(inner.substitute(type_args, method_args)))
            }
            TypeRef::Array { element, rank } => TypeRef::Array {
                element: Box::new(element.substitute(type_args, method_args)),
                rank: *rank,
            },
        }
    }

    /// Generic arguments of a generic instance, or an empty slice.
    #[must_use]
    pub fn generic_arguments(&self) -> &[TypeRef] {
        match self {
            TypeRef::GenericInstance { arguments, .. } => arguments,
            _ => &[],
        }
    }

    /// `System.Nullable<T>` argument, if this is a nullable instance.
    #[must_use]
    pub fn nullable_argument(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::GenericInstance {
                definition,
                arguments,
            } if &*definition.full_name == well_known::NULLABLE => arguments.first(),
            _ => None,
        }
    }

    #[must_use]
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            TypeRef::Named(named) => PrimitiveKind::from_full_name(&named.full_name),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(named) => f.write_str(&named.full_name),
            TypeRef::GenericInstance {
                definition,
                arguments,
            } => {
                write!(f, "{}<", definition.full_name)?;
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
            TypeRef::GenericParameter { name, .. } => f.write_str(name),
            TypeRef::ByReference(inner) => write!(f, "{inner}&"),
            TypeRef::Pointer(inner) => write!(f, "{inner}*"),
            TypeRef::Array { element, rank } => {
                write!(f, "{element}[")?;
                for _ in 1..*rank {
                    f.write_str(",")?;
                }
                f.write_str("]")
            }
        }
    }
}

// =============================================================================
// Primitive kinds
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Boolean,
    Char,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    IntPtr,
    UIntPtr,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 14] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Char,
        PrimitiveKind::SByte,
        PrimitiveKind::Byte,
        PrimitiveKind::Int16,
        PrimitiveKind::UInt16,
        PrimitiveKind::Int32,
        PrimitiveKind::UInt32,
        PrimitiveKind::Int64,
        PrimitiveKind::UInt64,
        PrimitiveKind::Single,
        PrimitiveKind::Double,
        PrimitiveKind::IntPtr,
        PrimitiveKind::UIntPtr,
    ];

    #[must_use]
    pub const fn full_name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "System.Boolean",
            PrimitiveKind::Char => "System.Char",
            PrimitiveKind::SByte => "System.SByte",
            PrimitiveKind::Byte => "System.Byte",
            PrimitiveKind::Int16 => "System.Int16",
            PrimitiveKind::UInt16 => "System.UInt16",
            PrimitiveKind::Int32 => "System.Int32",
            PrimitiveKind::UInt32 => "System.UInt32",
            PrimitiveKind::Int64 => "System.Int64",
            PrimitiveKind::UInt64 => "System.UInt64",
            PrimitiveKind::Single => "System.Single",
            PrimitiveKind::Double => "System.Double",
            PrimitiveKind::IntPtr => "System.IntPtr",
            PrimitiveKind::UIntPtr => "System.UIntPtr",
        }
    }

    #[must_use]
    pub fn from_full_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.full_name() == name)
    }

    /// Storage size in bytes; pointer-sized integers count as 4.
    #[must_use]
    pub const fn size_in_bytes(self) -> u32 {
        match self {
            PrimitiveKind::Boolean | PrimitiveKind::SByte | PrimitiveKind::Byte => 1,
            PrimitiveKind::Char | PrimitiveKind::Int16 | PrimitiveKind::UInt16 => 2,
            PrimitiveKind::Int32
            | PrimitiveKind::UInt32
            | PrimitiveKind::Single
            | PrimitiveKind::IntPtr
            | PrimitiveKind::UIntPtr => 4,
            PrimitiveKind::Int64 | PrimitiveKind::UInt64 | PrimitiveKind::Double => 8,
        }
    }

    /// Integral types, excluding `char` and `bool`.
    #[must_use]
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveKind::SByte
                | PrimitiveKind::Byte
                | PrimitiveKind::Int16
                | PrimitiveKind::UInt16
                | PrimitiveKind::Int32
                | PrimitiveKind::UInt32
                | PrimitiveKind::Int64
                | PrimitiveKind::UInt64
                | PrimitiveKind::IntPtr
                | PrimitiveKind::UIntPtr
        )
    }

    #[must_use]
    pub const fn is_floating_point(self) -> bool {
        matches!(self, PrimitiveKind::Single | PrimitiveKind::Double)
    }

    #[must_use]
    pub const fn is_numeric(self) -> bool {
        self.is_integral() || self.is_floating_point()
    }

    #[must_use]
    pub const fn is_64_bit_integer(self) -> bool {
        matches!(self, PrimitiveKind::Int64 | PrimitiveKind::UInt64)
    }
}

// =============================================================================
// Type system
// =============================================================================

/// Well-known types plus the delegate-signature cache for one session.
pub struct TypeSystem {
    object: TypeRef,
    value_type: TypeRef,
    enum_type: TypeRef,
    void: TypeRef,
    string: TypeRef,
    exception: TypeRef,
    system_type: TypeRef,
    primitives: Vec<TypeRef>,
    delegate_signatures: DashMap<(TypeRef, Vec<TypeRef>), TypeRef>,
}

impl Default for TypeSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeSystem {
    #[must_use]
    pub fn new() -> Self {
        Self {
            object: TypeRef::class(well_known::OBJECT),
            value_type: TypeRef::class(well_known::VALUE_TYPE),
            enum_type: TypeRef::class(well_known::ENUM),
            void: TypeRef::value_type(well_known::VOID),
            string: TypeRef::class(well_known::STRING),
            exception: TypeRef::class(well_known::EXCEPTION),
            system_type: TypeRef::class(well_known::TYPE),
            primitives: PrimitiveKind::ALL
                .iter()
                .map(|k| TypeRef::value_type(k.full_name()))
                .collect(),
            delegate_signatures: DashMap::new(),
        }
    }

    #[must_use]
    pub fn object(&self) -> TypeRef {
        self.object.clone()
    }

    #[must_use]
    pub fn value_type(&self) -> TypeRef {
        self.value_type.clone()
    }

    #[must_use]
    pub fn enum_type(&self) -> TypeRef {
        self.enum_type.clone()
    }

    #[must_use]
    pub fn void(&self) -> TypeRef {
        self.void.clone()
    }

    #[must_use]
    pub fn string(&self) -> TypeRef {
        self.string.clone()
    }

    #[must_use]
    pub fn exception(&self) -> TypeRef {
        self.exception.clone()
    }

    #[must_use]
    pub fn system_type(&self) -> TypeRef {
        self.system_type.clone()
    }

    #[must_use]
    pub fn primitive(&self, kind: PrimitiveKind) -> TypeRef {
        // `primitives` is built in `PrimitiveKind::ALL` order, which matches
        // declaration order.
        self.primitives[kind as usize].clone()
    }

    #[must_use]
    pub fn boolean(&self) -> TypeRef {
        self.primitive(PrimitiveKind::Boolean)
    }

    #[must_use]
    pub fn int32(&self) -> TypeRef {
        self.primitive(PrimitiveKind::Int32)
    }

    /// Delegate type describing a method signature.
    ///
    /// `void` returns map to ``System.Action`N``, others to ``System.Func`N``
    /// with the return type last. Signatures with by-ref parameters cannot
    /// be expressed as generic arguments and use the synthetic
    /// ``JSIL.Meta.MethodSignature`2`` instead. Results are cached per
    /// signature; concurrent first use converges on one value.
    #[must_use]
    pub fn delegate_type(&self, return_type: &TypeRef, parameters: &[TypeRef]) -> TypeRef {
        let key = (return_type.clone(), parameters.to_vec());
        if let Some(cached) = self.delegate_signatures.get(&key) {
            return cached.value().clone();
        }

        let built = self.build_delegate_type(return_type, parameters);
        trace!(signature = %built, "TypeSystem::delegate_type - caching");
        self.delegate_signatures
            .entry(key)
            .or_insert(built)
            .value()
            .clone()
    }

    fn build_delegate_type(&self, return_type: &TypeRef, parameters: &[TypeRef]) -> TypeRef {
        if parameters.iter().any(TypeRef::is_by_reference) || return_type.is_by_reference() {
            let definition = TypeRef::class(&format!("{}`2", well_known::METHOD_SIGNATURE));
            let argument_tuple = TypeRef::generic_instance(
                TypeRef::class(&format!("System.Tuple`{}", parameters.len())),
                parameters.iter().map(|p| p.dereferenced().clone()).collect(),
            );
            return TypeRef::generic_instance(
                definition,
                vec![return_type.dereferenced().clone(), argument_tuple],
            );
        }

        if return_type.is(well_known::VOID) {
            if parameters.is_empty() {
                return TypeRef::class(well_known::ACTION);
            }
            let definition =
                TypeRef::class(&format!("{}`{}", well_known::ACTION, parameters.len()));
            return TypeRef::generic_instance(definition, parameters.to_vec());
        }

        let mut arguments = parameters.to_vec();
        arguments.push(return_type.clone());
        let definition = TypeRef::class(&format!("{}`{}", well_known::FUNC, arguments.len()));
        TypeRef::generic_instance(definition, arguments)
    }

    /// Number of cached delegate signatures.
    #[must_use]
    pub fn cached_delegate_signatures(&self) -> usize {
        self.delegate_signatures.len()
    }
}
