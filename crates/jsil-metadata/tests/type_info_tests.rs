use jsil_metadata::*;
use std::sync::Arc;

fn void() -> TypeRef {
    TypeRef::value_type(well_known::VOID)
}

fn int32() -> TypeRef {
    TypeRef::value_type("System.Int32")
}

fn string() -> TypeRef {
    TypeRef::class(well_known::STRING)
}

fn cache_with(types: Vec<TypeDefinition>) -> TypeInfoCache {
    let mut source = InMemoryMetadata::new();
    for t in types {
        source.add_type(t);
    }
    TypeInfoCache::new(Arc::new(source), &[]).expect("cache")
}

fn point_type() -> TypeDefinition {
    let getter = Arc::new(MethodDefinition::new("Demo.Point", "get_X", int32()));
    let setter = Arc::new(
        MethodDefinition::new("Demo.Point", "set_X", void()).with_parameter("value", int32()),
    );
    let mut t = TypeDefinition::new("Demo.Point", "Demo");
    t.properties.push(PropertyDefinition {
        name: "X".to_string(),
        declaring_type: "Demo.Point".to_string(),
        property_type: int32(),
        getter: Some(getter.clone()),
        setter: Some(setter.clone()),
        attributes: Vec::new(),
    });
    // Accessors also appear in the method list, as in compiled metadata.
    t.methods.push(Arc::new((*getter).clone()));
    t.methods.push(Arc::new((*setter).clone()));
    t
}

#[test]
fn test_property_accessors_link_back_to_property() {
    let cache = cache_with(vec![point_type()]);
    let info = cache.get_type(&TypeRef::class("Demo.Point")).unwrap();

    let property = info
        .find_member(&MemberIdentifier {
            kind: MemberKind::Property,
            name: "X".to_string(),
            return_type: Some(int32()),
            parameters: identity::ParameterSignature::Types(Vec::new()),
        })
        .unwrap();

    let getter = cache
        .get_method(&MethodRef::new(TypeRef::class("Demo.Point"), "get_X", int32()))
        .unwrap();
    assert_eq!(getter.declaring_property, Some(property.id));
    assert_eq!(getter.owner().unwrap().id(), property.id);

    // Accessors listed again among the methods are not added twice.
    assert_eq!(info.members_of_kind(MemberKind::Method).count(), 2);
}

fn overloaded_type(string_first: bool) -> TypeDefinition {
    let by_int = Arc::new(MethodDefinition::new("Demo.T", "Foo", void()).with_parameter("a", int32()));
    let by_string =
        Arc::new(MethodDefinition::new("Demo.T", "Foo", void()).with_parameter("a", string()));
    let mut t = TypeDefinition::new("Demo.T", "Demo");
    if string_first {
        t.methods.push(by_string);
        t.methods.push(by_int);
    } else {
        t.methods.push(by_int);
        t.methods.push(by_string);
    }
    t
}

#[test]
fn test_overload_indices_do_not_depend_on_declaration_order() {
    for string_first in [false, true] {
        let cache = cache_with(vec![overloaded_type(string_first)]);
        let owner = TypeRef::class("Demo.T");

        let by_int = cache
            .get_method(&MethodRef::new(owner.clone(), "Foo", void()).with_parameter(int32()))
            .unwrap();
        let by_string = cache
            .get_method(&MethodRef::new(owner.clone(), "Foo", void()).with_parameter(string()))
            .unwrap();

        assert_eq!(by_int.overload_index, Some(0));
        assert_eq!(by_string.overload_index, Some(1));
        assert_eq!(by_int.name(), "Foo$0");
        assert_eq!(by_string.name_with_mangling(false), "Foo");

        let info = cache.get_type(&owner).unwrap();
        let group = info.method_group("Foo", false).unwrap();
        assert_eq!(group.methods, vec![by_int.id(), by_string.id()]);
    }
}

#[test]
fn test_runtime_dispatch_suppresses_mangling() {
    let mut t = overloaded_type(false);
    let dispatched = MethodDefinition::new("Demo.T", "Bar", void())
        .with_attribute(CustomAttribute::new(attribute_names::JS_RUNTIME_DISPATCH));
    let dispatched_2 = MethodDefinition::new("Demo.T", "Bar", void())
        .with_parameter("a", int32())
        .with_attribute(CustomAttribute::new(attribute_names::JS_RUNTIME_DISPATCH));
    t.methods.push(Arc::new(dispatched));
    t.methods.push(Arc::new(dispatched_2));

    let cache = cache_with(vec![t]);
    let bar = cache
        .get_method(&MethodRef::new(TypeRef::class("Demo.T"), "Bar", void()))
        .unwrap();
    assert!(bar.overload_index.is_some());
    assert_eq!(bar.name(), "Bar");
}

#[test]
fn test_static_constructor_and_constructors() {
    let mut t = TypeDefinition::new("Demo.C", "Demo");
    t.methods.push(Arc::new(
        MethodDefinition::new("Demo.C", ".cctor", void()).with_flags(MethodFlags::STATIC),
    ));
    t.methods
        .push(Arc::new(MethodDefinition::new("Demo.C", ".ctor", void())));
    t.methods.push(Arc::new(
        MethodDefinition::new("Demo.C", ".ctor", void()).with_parameter("a", int32()),
    ));

    let cache = cache_with(vec![t]);
    let info = cache.get_type(&TypeRef::class("Demo.C")).unwrap();

    let cctor = info.member(info.static_constructor.unwrap()).unwrap();
    assert_eq!(cctor.name(), ".cctor");
    assert_eq!(info.constructors.len(), 2);
    assert!(info.method_group(".ctor", false).is_some());
}

fn color_enum(flags: bool) -> TypeDefinition {
    let mut t = TypeDefinition::new("Demo.Color", "Demo");
    t.flags = TypeFlags::ENUM | TypeFlags::VALUE_TYPE;
    t.base_type = Some(TypeRef::class(well_known::ENUM));
    if flags {
        t.attributes
            .push(CustomAttribute::new(well_known::FLAGS_ATTRIBUTE));
    }

    let mut value = FieldDefinition::new("Demo.Color", "value__", int32());
    value.is_runtime_special_name = true;
    t.fields.push(value);

    for (name, constant) in [("Red", Some(0)), ("Green", None), ("Blue", Some(4))] {
        let mut field =
            FieldDefinition::new("Demo.Color", name, TypeRef::value_type("Demo.Color"));
        field.is_static = true;
        field.constant = constant;
        t.fields.push(field);
    }
    t
}

#[test]
fn test_enum_members_number_sequentially_and_skip_special_fields() {
    let cache = cache_with(vec![color_enum(false)]);
    let info = cache.get_type(&TypeRef::value_type("Demo.Color")).unwrap();

    assert!(info.is_enum());
    assert!(!info.is_flags_enum);
    let names: Vec<&str> = info.enum_members.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["Red", "Green", "Blue"]);
    assert_eq!(info.enum_member_for_value(1).unwrap().name, "Green");
    assert_eq!(
        info.enum_member_for_value(4).unwrap().full_name(),
        "Demo.Color.Blue"
    );
    assert!(info.enum_member_for_value(2).is_none());
}

#[test]
fn test_flags_enum_detected() {
    let cache = cache_with(vec![color_enum(true)]);
    let info = cache.get_type(&TypeRef::value_type("Demo.Color")).unwrap();
    assert!(info.is_flags_enum);
}

#[test]
fn test_interface_members_are_qualified() {
    let mut t = TypeDefinition::new("Demo.IShape", "Demo");
    t.flags = TypeFlags::INTERFACE | TypeFlags::ABSTRACT;
    t.methods
        .push(Arc::new(MethodDefinition::new("Demo.IShape", "Area", int32())));

    let cache = cache_with(vec![t]);
    let area = cache
        .get_method(&MethodRef::new(TypeRef::class("Demo.IShape"), "Area", int32()))
        .unwrap();
    assert_eq!(area.name(), "IShape.Area");
}

#[test]
fn test_change_name_forces_emitted_name() {
    let mut t = TypeDefinition::new("Demo.T", "Demo");
    t.methods.push(Arc::new(
        MethodDefinition::new("Demo.T", "Internal", void()).with_attribute(
            CustomAttribute::new(attribute_names::JS_CHANGE_NAME)
                .with_argument(AttributeArgument::string("external")),
        ),
    ));
    let cache = cache_with(vec![t]);
    let method = cache
        .get_method(&MethodRef::new(TypeRef::class("Demo.T"), "Internal", void()))
        .unwrap();
    assert_eq!(method.name(), "external");
}

#[test]
fn test_ignored_module_pattern_ignores_types_and_members() {
    let mut t = TypeDefinition::new("Vendor.Native", "Vendor.Interop");
    t.methods
        .push(Arc::new(MethodDefinition::new("Vendor.Native", "Call", void())));
    let mut source = InMemoryMetadata::new();
    source.add_type(t);
    let cache = TypeInfoCache::new(Arc::new(source), &["Vendor.*".to_string()]).unwrap();

    let info = cache.get_type(&TypeRef::class("Vendor.Native")).unwrap();
    assert!(info.is_ignored);
    let call = cache
        .get_method(&MethodRef::new(TypeRef::class("Vendor.Native"), "Call", void()))
        .unwrap();
    assert!(call.is_ignored());
}

#[test]
fn test_member_typed_with_ignored_type_is_ignored() {
    let mut hidden = TypeDefinition::new("Demo.Hidden", "Demo");
    hidden
        .attributes
        .push(CustomAttribute::new(attribute_names::JS_IGNORE));

    let mut t = TypeDefinition::new("Demo.T", "Demo");
    t.fields.push(FieldDefinition::new(
        "Demo.T",
        "secret",
        TypeRef::class("Demo.Hidden"),
    ));
    t.fields
        .push(FieldDefinition::new("Demo.T", "count", int32()));

    let cache = cache_with(vec![hidden, t]);
    let owner = TypeRef::class("Demo.T");
    let secret = cache
        .get_field(&FieldRef::new(owner.clone(), "secret", TypeRef::class("Demo.Hidden")))
        .unwrap();
    let count = cache
        .get_field(&FieldRef::new(owner, "count", int32()))
        .unwrap();
    assert!(secret.is_ignored());
    assert!(!count.is_ignored());
}
