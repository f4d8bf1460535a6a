use shimgen_ast::naming::NamingConfig;
use shimgen_ast::pointerize::{Argument, Binding, FieldKind, SkipReason, Slot, TypeEnv};
use shimgen_ast::*;

fn byte() -> TypeSpec {
    TypeSpec::named("char").with_unsigned()
}

fn struct_def(name: &str, fields: Vec<Field>) -> Declaration {
    Declaration::StructDef(StructDef {
        name: name.to_string(),
        tag: Some(name.to_string()),
        fields,
        is_union: false,
        is_typedef: true,
        position: Position::default(),
    })
}

fn color() -> Declaration {
    struct_def(
        "Color",
        ["r", "g", "b", "a"]
            .iter()
            .map(|n| Field::new(byte(), 0, n))
            .collect(),
    )
}

fn vector3() -> Declaration {
    struct_def(
        "Vector3",
        ["x", "y", "z"]
            .iter()
            .map(|n| Field::new(TypeSpec::named("float"), 0, n))
            .collect(),
    )
}

fn function(name: &str, ret: (&str, usize), params: Vec<Parameter>) -> Declaration {
    function_at(name, ret, params, Position { offset: 0, line: 1, column: 1 })
}

fn function_at(
    name: &str,
    ret: (&str, usize),
    params: Vec<Parameter>,
    position: Position,
) -> Declaration {
    Declaration::Function(Function {
        name: name.to_string(),
        annotations: vec!["RLAPI".to_string()],
        signature: Signature {
            return_type: TypeSpec::named(ret.0),
            return_pointer_depth: ret.1,
            params,
            is_variadic: false,
        },
        has_body: false,
        position,
    })
}

fn param(ty: &str, depth: usize, name: &str) -> Parameter {
    Parameter::new(TypeSpec::named(ty), depth, name)
}

fn run(decls: Vec<Declaration>) -> (Header, TypeTable) {
    (Header::new(decls), TypeTable::standard())
}

#[test]
fn test_by_value_param_is_pointerized() {
    let (header, table) = run(vec![
        color(),
        function("ClearBackground", ("void", 0), vec![param("Color", 0, "color")]),
    ]);
    let plan = analyze(&table, &header, &NamingConfig::default()).unwrap();

    let f = &plan.functions[0];
    let shim = f.shim().expect("ClearBackground needs a shim");
    assert_eq!(shim.symbol, "ClearBackground_pointerized");
    assert_eq!(shim.params[0].pointer_depth, 1);
    assert_eq!(shim.arguments, vec![Argument::Deref("color".to_string())]);
    assert_eq!(shim.call_expression("ClearBackground"), "ClearBackground(*color)");
    assert!(shim.by_value_params);
    assert!(!shim.by_value_return);

    assert_eq!(plan.helpers.len(), 1);
    let helper = &plan.helpers[0];
    assert_eq!(helper.alloc_symbol, "malloc_Color");
    assert_eq!(helper.free_symbol, "free_Color");
    let names: Vec<&str> = helper.fields.iter().map(|f| f.field.name.as_str()).collect();
    assert_eq!(names, ["r", "g", "b", "a"]);
    assert!(helper
        .fields
        .iter()
        .all(|f| f.kind == FieldKind::Scalar(HostType::U8)));
}

#[test]
fn test_argument_order_preserved() {
    let (header, table) = run(vec![
        color(),
        vector3(),
        function(
            "DrawCube",
            ("void", 0),
            vec![
                param("Vector3", 0, "position"),
                param("float", 0, "width"),
                param("float", 0, "height"),
                param("Color", 0, "color"),
            ],
        ),
    ]);
    let plan = analyze(&table, &header, &NamingConfig::default()).unwrap();
    let shim = plan.functions[0].shim().unwrap();
    assert_eq!(
        shim.call_expression("DrawCube"),
        "DrawCube(*position, width, height, *color)"
    );
    let helpers: Vec<&str> = plan.helpers.iter().map(|h| h.aggregate.name.as_str()).collect();
    assert_eq!(helpers, ["Vector3", "Color"]);
}

#[test]
fn test_pointer_param_is_direct() {
    let (header, table) = run(vec![
        color(),
        function("SetColor", ("void", 0), vec![param("Color", 1, "out")]),
    ]);
    let plan = analyze(&table, &header, &NamingConfig::default()).unwrap();
    assert_eq!(plan.functions[0].binding, Binding::Direct);
    assert_eq!(
        plan.functions[0].params[0].slot,
        Slot::Pointer {
            aggregate: Some("Color".to_string())
        }
    );
    assert!(plan.helpers.is_empty());
}

#[test]
fn test_primitives_never_shimmed() {
    let (header, table) = run(vec![function(
        "GetRandomValue",
        ("int", 0),
        vec![param("int", 0, "min"), param("int", 0, "max")],
    )]);
    let plan = analyze(&table, &header, &NamingConfig::default()).unwrap();
    let f = &plan.functions[0];
    assert_eq!(f.binding, Binding::Direct);
    assert_eq!(f.ret, Slot::Primitive(HostType::I32));
    assert!(f.params.iter().all(|p| p.slot == Slot::Primitive(HostType::I32)));
    assert!(plan.helpers.is_empty());
}

#[test]
fn test_return_only_trigger() {
    let (header, table) = run(vec![
        color(),
        function(
            "ColorFromHSV",
            ("Color", 0),
            vec![param("float", 0, "hue"), param("float", 0, "saturation")],
        ),
    ]);
    let plan = analyze(&table, &header, &NamingConfig::default()).unwrap();
    let shim = plan.functions[0].shim().expect("by-value return alone needs a shim");
    assert!(shim.by_value_return);
    assert!(!shim.by_value_params);
    assert_eq!(shim.call_expression("ColorFromHSV"), "ColorFromHSV(hue, saturation)");
    assert_eq!(plan.helpers.len(), 1);
}

#[test]
fn test_helpers_unique_in_first_need_order() {
    let (header, table) = run(vec![
        color(),
        vector3(),
        function("ClearBackground", ("void", 0), vec![param("Color", 0, "color")]),
        function("Fade", ("Color", 0), vec![param("Color", 0, "color"), param("float", 0, "alpha")]),
        function("DrawPoint3D", ("void", 0), vec![param("Vector3", 0, "p"), param("Color", 0, "c")]),
    ]);
    let plan = analyze(&table, &header, &NamingConfig::default()).unwrap();
    let helpers: Vec<&str> = plan.helpers.iter().map(|h| h.aggregate.name.as_str()).collect();
    assert_eq!(helpers, ["Color", "Vector3"]);
}

#[test]
fn test_helper_closure_follows_by_value_fields() {
    let (header, table) = run(vec![
        vector3(),
        struct_def(
            "Ray",
            vec![
                Field::new(TypeSpec::named("Vector3"), 0, "position"),
                Field::new(TypeSpec::named("Vector3"), 0, "direction"),
            ],
        ),
        function("GetRay", ("Ray", 0), vec![]),
    ]);
    let plan = analyze(&table, &header, &NamingConfig::default()).unwrap();
    let helpers: Vec<&str> = plan.helpers.iter().map(|h| h.aggregate.name.as_str()).collect();
    assert_eq!(helpers, ["Ray", "Vector3"]);
    assert_eq!(
        plan.helpers[0].fields[0].kind,
        FieldKind::Aggregate("Vector3".to_string())
    );
    assert!(plan.has_handle("Vector3"));
}

#[test]
fn test_array_and_pointer_fields() {
    let mut lens = Field::new(TypeSpec::named("float"), 0, "lens");
    lens.array_len = Some("4".to_string());
    let (header, table) = run(vec![
        struct_def(
            "Device",
            vec![lens, Field::new(TypeSpec::named("void"), 1, "data")],
        ),
        function("Use", ("void", 0), vec![param("Device", 0, "device")]),
    ]);
    let plan = analyze(&table, &header, &NamingConfig::default()).unwrap();
    let kinds: Vec<&FieldKind> = plan.helpers[0].fields.iter().map(|f| &f.kind).collect();
    assert_eq!(kinds, [&FieldKind::Array, &FieldKind::Pointer]);
}

#[test]
fn test_typedef_alias_keeps_alias_name() {
    let (header, table) = run(vec![
        struct_def(
            "Vector4",
            ["x", "y", "z", "w"]
                .iter()
                .map(|n| Field::new(TypeSpec::named("float"), 0, n))
                .collect(),
        ),
        Declaration::Typedef(Typedef {
            name: "Quaternion".to_string(),
            target: TypedefTarget::Type {
                ty: TypeSpec::named("Vector4"),
                pointer_depth: 0,
                array_len: None,
            },
        }),
        function("QuaternionIdentity", ("Quaternion", 0), vec![]),
    ]);
    let plan = analyze(&table, &header, &NamingConfig::default()).unwrap();
    let helper = &plan.helpers[0];
    assert_eq!(helper.aggregate.name, "Quaternion");
    assert_eq!(helper.aggregate.def.name, "Vector4");
    assert_eq!(helper.alloc_symbol, "malloc_Quaternion");
    assert_eq!(helper.fields.len(), 4);
}

#[test]
fn test_pointer_typedef_is_not_by_value() {
    let (header, table) = run(vec![
        color(),
        Declaration::Typedef(Typedef {
            name: "ColorRef".to_string(),
            target: TypedefTarget::Type {
                ty: TypeSpec::named("Color"),
                pointer_depth: 1,
                array_len: None,
            },
        }),
        function("Tint", ("void", 0), vec![param("ColorRef", 0, "target")]),
    ]);
    let plan = analyze(&table, &header, &NamingConfig::default()).unwrap();
    assert_eq!(plan.functions[0].binding, Binding::Direct);
    assert_eq!(plan.functions[0].params[0].slot, Slot::Pointer { aggregate: None });
}

#[test]
fn test_enums_and_callbacks() {
    let (header, table) = run(vec![
        Declaration::EnumDef(EnumDef {
            name: Some("TraceLogLevel".to_string()),
            tag: None,
            variants: vec![EnumVariant {
                name: "LOG_ALL".to_string(),
                value: Some("0".to_string()),
            }],
        }),
        Declaration::Typedef(Typedef {
            name: "TraceLogCallback".to_string(),
            target: TypedefTarget::FunctionPointer(Signature {
                return_type: TypeSpec::named("void"),
                return_pointer_depth: 0,
                params: vec![param("int", 0, "logLevel"), param("va_list", 0, "args")],
                is_variadic: false,
            }),
        }),
        function(
            "Configure",
            ("void", 0),
            vec![param("TraceLogLevel", 0, "level"), param("TraceLogCallback", 0, "callback")],
        ),
    ]);
    let plan = analyze(&table, &header, &NamingConfig::default()).unwrap();
    let slots: Vec<&Slot> = plan.functions[0].params.iter().map(|p| &p.slot).collect();
    assert_eq!(slots, [&Slot::Primitive(HostType::I32), &Slot::Callback]);
}

#[test]
fn test_text_versus_byte_pointer() {
    let (header, table) = run(vec![function(
        "LoadFileData",
        ("char", 1),
        vec![
            Parameter::new(TypeSpec::named("char").with_const(), 1, "fileName"),
            Parameter::new(byte(), 1, "buffer"),
        ],
    )]);
    let plan = analyze(&table, &header, &NamingConfig::default()).unwrap();
    let f = &plan.functions[0];
    assert_eq!(f.ret, Slot::Text);
    assert_eq!(f.params[0].slot, Slot::Text);
    assert_eq!(f.params[1].slot, Slot::Pointer { aggregate: None });
}

#[test]
fn test_variadic_and_static_skipped() {
    let mut variadic = function("TraceLog", ("void", 0), vec![param("Color", 0, "tint")]);
    if let Declaration::Function(f) = &mut variadic {
        f.signature.is_variadic = true;
    }
    let mut local = function("Clamp", ("float", 0), vec![param("float", 0, "value")]);
    if let Declaration::Function(f) = &mut local {
        f.annotations = vec!["static".to_string(), "inline".to_string()];
        f.has_body = true;
    }
    let (header, table) = run(vec![color(), variadic, local]);
    let plan = analyze(&table, &header, &NamingConfig::default()).unwrap();
    assert_eq!(plan.functions[0].binding, Binding::Skipped(SkipReason::Variadic));
    assert_eq!(plan.functions[1].binding, Binding::Skipped(SkipReason::Static));
    assert_eq!(plan.functions[0].symbol(), None);
    // Skipped functions require no helpers.
    assert!(plan.helpers.is_empty());
}

#[test]
fn test_unresolved_aggregate_names_type_and_function() {
    let position = Position { offset: 40, line: 3, column: 1 };
    let (header, table) = run(vec![function_at(
        "Spin",
        ("void", 0),
        vec![param("Frobnicator", 0, "f")],
        position,
    )]);
    let err = analyze(&table, &header, &NamingConfig::default()).unwrap_err();
    match &err {
        AnalysisError::UnresolvedAggregate { type_name, context, position: at } => {
            assert_eq!(type_name, "Frobnicator");
            assert!(context.contains("Spin"), "context: {}", context);
            assert_eq!(*at, position);
        }
        other => panic!("expected unresolved aggregate, got {:?}", other),
    }
    assert!(err.to_string().starts_with("3:1: unresolved type 'Frobnicator'"));
}

#[test]
fn test_unknown_keyword_type() {
    let (header, table) = run(vec![function(
        "Precise",
        ("void", 0),
        vec![param("long double", 0, "x")],
    )]);
    let err = analyze(&table, &header, &NamingConfig::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::UnknownType { ref name, .. } if name == "long double"));
}

#[test]
fn test_opaque_by_value_is_incomplete() {
    let (header, table) = run(vec![function(
        "Consume",
        ("void", 0),
        vec![Parameter::new(TypeSpec::named("Node").with_tag(Tag::Struct), 0, "node")],
    )]);
    let err = analyze(&table, &header, &NamingConfig::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::IncompleteAggregate { ref type_name, .. } if type_name == "Node"));
}

#[test]
fn test_opaque_pointer_is_fine() {
    let (header, table) = run(vec![function(
        "Consume",
        ("void", 0),
        vec![Parameter::new(TypeSpec::named("Node").with_tag(Tag::Struct), 1, "node")],
    )]);
    let plan = analyze(&table, &header, &NamingConfig::default()).unwrap();
    assert_eq!(plan.functions[0].params[0].slot, Slot::Pointer { aggregate: None });
}

#[test]
fn test_every_table_entry_is_primitive() {
    let table = TypeTable::standard();
    let header = Header::default();
    let env = TypeEnv::new(&table, &header);
    for (name, host) in table.entries() {
        let slot = env.classify_param(&param(name, 0, "v")).unwrap();
        let expected = if host == HostType::Void {
            Slot::Void
        } else {
            Slot::Primitive(host)
        };
        assert_eq!(slot, expected, "type {}", name);
    }
}

#[test]
fn test_custom_naming() {
    let (header, table) = run(vec![
        color(),
        function("ClearBackground", ("void", 0), vec![param("Color", 0, "color")]),
    ]);
    let naming = NamingConfig::default()
        .with_shim_suffix("_ptr")
        .with_alloc_prefix("new_")
        .with_free_prefix("delete_");
    let plan = analyze(&table, &header, &naming).unwrap();
    assert_eq!(plan.functions[0].symbol(), Some("ClearBackground_ptr"));
    assert_eq!(plan.helpers[0].alloc_symbol, "new_Color");
    assert_eq!(plan.helpers[0].free_symbol, "delete_Color");
}

#[test]
fn test_analysis_deterministic() {
    let (header, table) = run(vec![
        color(),
        vector3(),
        function("DrawCube", ("void", 0), vec![param("Vector3", 0, "p"), param("Color", 0, "c")]),
    ]);
    let first = analyze(&table, &header, &NamingConfig::default()).unwrap();
    let second = analyze(&table, &header, &NamingConfig::default()).unwrap();
    assert_eq!(first, second);
}
