use jsil_metadata::*;
use std::sync::Arc;

fn void() -> TypeRef {
    TypeRef::value_type(well_known::VOID)
}

fn widget() -> TypeRef {
    TypeRef::class("Demo.Widget")
}

fn draw_ref() -> MethodRef {
    MethodRef::new(widget(), "Draw", void())
}

fn widget_type(draw_attributes: Vec<CustomAttribute>) -> TypeDefinition {
    let mut draw = MethodDefinition::new("Demo.Widget", "Draw", void());
    draw.attributes = draw_attributes;
    let mut t = TypeDefinition::new("Demo.Widget", "Demo");
    t.methods.push(Arc::new(draw));
    t
}

fn proxy_type(name: &str, proxy: CustomAttribute, methods: Vec<MethodDefinition>) -> TypeDefinition {
    let mut t = TypeDefinition::new(name, "Proxies");
    t.attributes.push(proxy);
    t.methods = methods.into_iter().map(Arc::new).collect();
    t
}

fn cache_with(types: Vec<TypeDefinition>) -> TypeInfoCache {
    let mut source = InMemoryMetadata::new();
    for t in types {
        source.add_type(t);
    }
    TypeInfoCache::new(Arc::new(source), &[]).expect("cache")
}

#[test]
fn test_replace_declared_substitutes_proxy_member() {
    let proxy = proxy_type(
        "Proxies.WidgetProxy",
        proxy::proxy_attribute("Demo.Widget"),
        vec![MethodDefinition::new("Proxies.WidgetProxy", "Draw", void())],
    );
    let cache = cache_with(vec![widget_type(Vec::new()), proxy]);

    let draw = cache.get_method(&draw_ref()).unwrap();
    assert!(draw.is_from_proxy);
    assert_eq!(draw.declaring_type, "Demo.Widget");
    assert_eq!(
        cache.get_type(&widget()).unwrap().members_of_kind(MemberKind::Method).count(),
        1
    );
}

#[test]
fn test_replace_none_keeps_original_but_merges_metadata() {
    let attribute = proxy::proxy_attribute("Demo.Widget").with_argument(
        AttributeArgument::enum_value(attribute_names::PROXY_MEMBER_POLICY, 0),
    );
    let proxy = proxy_type(
        "Proxies.WidgetProxy",
        attribute,
        vec![
            MethodDefinition::new("Proxies.WidgetProxy", "Draw", void())
                .with_attribute(CustomAttribute::new(attribute_names::JS_IGNORE)),
        ],
    );
    let cache = cache_with(vec![widget_type(Vec::new()), proxy]);

    let draw = cache.get_method(&draw_ref()).unwrap();
    assert!(!draw.is_from_proxy);
    assert!(draw.is_ignored());
}

#[test]
fn test_never_replace_on_existing_member_vetoes_replacement() {
    let proxy = proxy_type(
        "Proxies.WidgetProxy",
        proxy::proxy_attribute("Demo.Widget"),
        vec![MethodDefinition::new("Proxies.WidgetProxy", "Draw", void())],
    );
    let cache = cache_with(vec![
        widget_type(vec![CustomAttribute::new(attribute_names::JS_NEVER_REPLACE)]),
        proxy,
    ]);

    let draw = cache.get_method(&draw_ref()).unwrap();
    assert!(!draw.is_from_proxy);
}

#[test]
fn test_proxy_adds_members_missing_from_target() {
    let proxy = proxy_type(
        "Proxies.WidgetProxy",
        proxy::proxy_attribute("Demo.Widget"),
        vec![
            MethodDefinition::new("Proxies.WidgetProxy", "Resize", void())
                .with_parameter("scale", TypeRef::value_type("System.Double")),
            // Parameterless constructors on proxies never replace the target's.
            MethodDefinition::new("Proxies.WidgetProxy", ".ctor", void()),
        ],
    );
    let cache = cache_with(vec![widget_type(Vec::new()), proxy]);

    let resize = cache
        .get_method(
            &MethodRef::new(widget(), "Resize", void())
                .with_parameter(TypeRef::value_type("System.Double")),
        )
        .unwrap();
    assert!(resize.is_from_proxy);
    assert!(cache.get_type(&widget()).unwrap().constructors.is_empty());
}

#[test]
fn test_non_static_proxy_members_skipped_for_static_target() {
    let mut target = widget_type(Vec::new());
    target.flags = TypeFlags::STATIC;
    let proxy = proxy_type(
        "Proxies.WidgetProxy",
        proxy::proxy_attribute("Demo.Widget"),
        vec![
            MethodDefinition::new("Proxies.WidgetProxy", "Instance", void()),
            MethodDefinition::new("Proxies.WidgetProxy", "Shared", void())
                .with_flags(MethodFlags::STATIC),
        ],
    );
    let cache = cache_with(vec![target, proxy]);

    assert!(cache
        .get_method(&MethodRef::new(widget(), "Instance", void()))
        .is_none());
    assert!(cache
        .get_method(&MethodRef::new(widget(), "Shared", void()).static_method())
        .is_some());
}

#[test]
fn test_any_type_parameters_match_every_signature() {
    let mut target = TypeDefinition::new("Demo.Widget", "Demo");
    target.methods.push(Arc::new(
        MethodDefinition::new("Demo.Widget", "Log", void())
            .with_parameter("a", TypeRef::value_type("System.Int32"))
            .with_parameter("b", TypeRef::class(well_known::STRING)),
    ));

    let mut params = ParameterDefinition::new(
        "args",
        TypeRef::class(well_known::ANY_TYPE).array(),
    );
    params
        .attributes
        .push(CustomAttribute::new(well_known::PARAM_ARRAY_ATTRIBUTE));
    let mut log = MethodDefinition::new("Proxies.WidgetProxy", "Log", void());
    log.parameters.push(params);

    let proxy = proxy_type(
        "Proxies.WidgetProxy",
        proxy::proxy_attribute("Demo.Widget"),
        vec![log],
    );
    let cache = cache_with(vec![target, proxy]);

    let resolved = cache
        .get_method(
            &MethodRef::new(widget(), "Log", void())
                .with_parameter(TypeRef::value_type("System.Int32"))
                .with_parameter(TypeRef::class(well_known::STRING)),
        )
        .unwrap();
    assert!(resolved.is_from_proxy);
}

#[test]
fn test_inheritable_proxies_apply_to_derived_types() {
    let mut derived = TypeDefinition::new("Demo.Button", "Demo");
    derived.base_type = Some(widget());

    let inheritable = proxy_type(
        "Proxies.Inheritable",
        proxy::proxy_attribute("Demo.Widget"),
        Vec::new(),
    );
    let sealed = proxy_type(
        "Proxies.Sealed",
        proxy::proxy_attribute("Demo.Widget").with_argument(AttributeArgument::boolean(false)),
        Vec::new(),
    );
    let cache = cache_with(vec![widget_type(Vec::new()), derived, inheritable, sealed]);

    let on_base: Vec<String> = cache
        .get_proxies(&widget())
        .iter()
        .map(|p| p.definition.full_name.clone())
        .collect();
    assert_eq!(on_base, vec!["Proxies.Inheritable", "Proxies.Sealed"]);

    let on_derived: Vec<String> = cache
        .get_proxies(&TypeRef::class("Demo.Button"))
        .iter()
        .map(|p| p.definition.full_name.clone())
        .collect();
    assert_eq!(on_derived, vec!["Proxies.Inheritable"]);
}

#[test]
fn test_attribute_policy_replace_all_clears_type_metadata() {
    let mut target = widget_type(Vec::new());
    target
        .attributes
        .push(CustomAttribute::new(attribute_names::JS_IGNORE));
    let proxy = proxy_type(
        "Proxies.WidgetProxy",
        proxy::proxy_attribute("Demo.Widget").with_argument(AttributeArgument::enum_value(
            attribute_names::PROXY_ATTRIBUTE_POLICY,
            1,
        )),
        Vec::new(),
    );
    let cache = cache_with(vec![target, proxy]);

    let info = cache.get_type(&widget()).unwrap();
    assert!(!info.metadata.has_attribute(attribute_names::JS_IGNORE));
    assert!(!info.is_ignored);
}

#[test]
fn test_invalid_member_policy_is_rejected() {
    let proxy = proxy_type(
        "Proxies.Bad",
        proxy::proxy_attribute("Demo.Widget").with_argument(AttributeArgument::enum_value(
            attribute_names::PROXY_MEMBER_POLICY,
            7,
        )),
        Vec::new(),
    );
    let err = ProxyInfo::new(Arc::new(proxy)).unwrap_err();
    assert!(matches!(
        err,
        MetadataError::InvalidPolicyValue { value: 7, .. }
    ));
}

#[test]
fn test_unsupported_proxy_argument_is_rejected() {
    let proxy = proxy_type(
        "Proxies.Bad",
        proxy::proxy_attribute("Demo.Widget").with_argument(AttributeArgument::new(
            "System.Int64",
            AttributeValue::Int(3),
        )),
        Vec::new(),
    );
    let mut source = InMemoryMetadata::new();
    source.add_type(proxy);
    let err = TypeInfoCache::new(Arc::new(source), &[]).unwrap_err();
    assert!(matches!(err, MetadataError::UnsupportedProxyArgument { .. }));
}

fn counter_type() -> TypeDefinition {
    let mut t = TypeDefinition::new("Demo.Counter", "Demo");
    t.fields.push(FieldDefinition::new(
        "Demo.Counter",
        "count",
        TypeRef::value_type("System.Int32"),
    ));
    t
}

fn counter_proxy(policy: Option<i64>) -> TypeDefinition {
    let mut attribute = proxy::proxy_attribute("Demo.Counter");
    if let Some(policy) = policy {
        attribute = attribute.with_argument(AttributeArgument::enum_value(
            attribute_names::PROXY_MEMBER_POLICY,
            policy,
        ));
    }
    let mut field = FieldDefinition::new(
        "Proxies.CounterProxy",
        "count",
        TypeRef::value_type("System.Int32"),
    );
    field.attributes.push(
        CustomAttribute::new(attribute_names::JS_CHANGE_NAME)
            .with_argument(AttributeArgument::string("total")),
    );
    let mut t = proxy_type("Proxies.CounterProxy", attribute, Vec::new());
    t.fields.push(field);
    t
}

fn count_ref() -> FieldRef {
    FieldRef::new(
        TypeRef::class("Demo.Counter"),
        "count",
        TypeRef::value_type("System.Int32"),
    )
}

#[test]
fn test_field_replaced_under_replace_declared() {
    let cache = cache_with(vec![counter_type(), counter_proxy(None)]);
    let count = cache.get_field(&count_ref()).unwrap();
    assert!(count.is_from_proxy);
    assert_eq!(count.name(), "total");

    let info = cache.get_type(&TypeRef::class("Demo.Counter")).unwrap();
    assert_eq!(info.members_of_kind(MemberKind::Field).count(), 1);
}

#[test]
fn test_field_kept_under_replace_none_with_metadata_merged() {
    let cache = cache_with(vec![counter_type(), counter_proxy(Some(0))]);
    let count = cache.get_field(&count_ref()).unwrap();
    assert!(!count.is_from_proxy);
    assert!(count.metadata.has_attribute(attribute_names::JS_CHANGE_NAME));
    assert_eq!(count.name(), "total");
}

#[test]
fn test_proxy_modules_filter_registration() {
    let mut source = InMemoryMetadata::new();
    source.add_type(counter_type());
    source.add_type(counter_proxy(None));

    let cache = TypeInfoCache::with_proxy_modules(
        Arc::new(source),
        &[],
        &["Elsewhere".to_string()],
    )
    .unwrap();
    assert!(cache.proxies().is_empty());
    assert!(!cache.get_field(&count_ref()).unwrap().is_from_proxy);
}

#[test]
fn test_proxy_without_target_is_rejected() {
    let proxy = proxy_type(
        "Proxies.Nowhere",
        CustomAttribute::new(attribute_names::JS_PROXY),
        Vec::new(),
    );
    let err = ProxyInfo::new(Arc::new(proxy)).unwrap_err();
    assert!(matches!(err, MetadataError::UnknownProxiedType(_)));
}
