//! Linking and validation over multi-file inputs.

mod support;

use lattice_core::element::{ExtendElement, Label, MessageElement, TagRange, TypeElement};
use lattice_core::schema_model::Type;
use lattice_core::TypeKind;
use lattice_linker::error::LinkError;
use lattice_linker::{LinkConfig, Loader, MemorySource};

use support::{enumeration, field, file, load, load_ok, message, rpc, service};

#[test]
fn test_cross_file_references_resolve() {
    let mut dinosaur = file(Some("squareup.dinosaurs"), &["geology/period.proto"]);
    dinosaur.types.push(message(
        "Dinosaur",
        vec![field("name", 1, "string"), field("period", 2, "Period")],
    ));

    let mut period = file(Some("squareup.geology"), &[]);
    period
        .types
        .push(enumeration("Period", &[("CRETACEOUS", 0), ("JURASSIC", 1)]));

    let schema = load_ok(vec![
        ("dinosaurs/dinosaur.proto", dinosaur),
        ("geology/period.proto", period),
    ]);

    let Some(Type::Message(dinosaur)) = schema.get_type("squareup.dinosaurs.Dinosaur") else {
        panic!("Dinosaur should be linked as a message");
    };
    let period_field = dinosaur.field("period").unwrap();
    assert_eq!(period_field.proto_type.name(), "squareup.geology.Period");
    assert_eq!(period_field.proto_type.kind(), TypeKind::Enum);
}

#[test]
fn test_recursive_messages_link() {
    // A legitimate data cycle: each type holds the other's key.
    let mut element = file(Some("tree"), &[]);
    element
        .types
        .push(message("Node", vec![field("children", 1, "Branch")]));
    element
        .types
        .push(message("Branch", vec![field("root", 1, "Node")]));

    let schema = load_ok(vec![("tree.proto", element)]);
    let Some(Type::Message(node)) = schema.get_type("tree.Node") else {
        panic!("missing tree.Node");
    };
    assert_eq!(node.field("children").unwrap().proto_type.name(), "tree.Branch");
}

#[test]
fn test_nested_scope_resolves_innermost_first() {
    let mut element = file(Some("pkg"), &[]);
    element.types.push(TypeElement::Message(MessageElement {
        name: "Outer".to_string(),
        fields: vec![field("status", 1, "Status")],
        nested_types: vec![enumeration("Status", &[("OK", 0)])],
        ..Default::default()
    }));
    // A top-level Status also exists; the nested one must win inside Outer.
    element.types.push(enumeration("Status", &[("TOP", 0)]));

    let schema = load_ok(vec![("pkg.proto", element)]);
    let Some(Type::Message(outer)) = schema.get_type("pkg.Outer") else {
        panic!("missing pkg.Outer");
    };
    assert_eq!(
        outer.field("status").unwrap().proto_type.name(),
        "pkg.Outer.Status"
    );
}

#[test]
fn test_unresolved_reference_reports_field_and_location() {
    let mut element = file(Some("pkg"), &[]);
    element
        .types
        .push(message("Holder", vec![field("thing", 1, "Missing")]));

    let errors = load(vec![("pkg.proto", element)]).unwrap_err();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        LinkError::UnresolvedReference {
            reference,
            context,
            location,
        } => {
            assert_eq!(reference, "Missing");
            assert_eq!(context, "pkg.Holder.thing");
            assert_eq!(location.path(), "pkg.proto");
        }
        other => panic!("expected UnresolvedReference, got {other:?}"),
    }
}

#[test]
fn test_all_errors_accumulate_in_one_load() {
    let mut element = file(Some("pkg"), &[]);
    element.types.push(message(
        "Holder",
        vec![
            field("first", 1, "MissingA"),
            field("second", 1, "MissingB"),
        ],
    ));

    let errors = load(vec![("pkg.proto", element)]).unwrap_err();
    // Two unresolved references and one duplicate tag, all in one pass.
    assert_eq!(errors.len(), 3);
}

#[test]
fn test_ambiguous_import_relative_reference() {
    let mut consumer = file(Some("app"), &["red/thing.proto", "blue/thing.proto"]);
    consumer
        .types
        .push(message("Holder", vec![field("thing", 1, "Thing")]));

    let mut red = file(Some("red"), &[]);
    red.types.push(message("Thing", vec![]));
    let mut blue = file(Some("blue"), &[]);
    blue.types.push(message("Thing", vec![]));

    let errors = load(vec![
        ("app.proto", consumer),
        ("red/thing.proto", red),
        ("blue/thing.proto", blue),
    ])
    .unwrap_err();
    assert!(matches!(
        &errors[0],
        LinkError::AmbiguousReference { candidates, .. } if candidates.len() == 2
    ));
}

#[test]
fn test_unimported_package_does_not_resolve() {
    let mut consumer = file(Some("app"), &[]);
    consumer
        .types
        .push(message("Holder", vec![field("thing", 1, "lib.Thing")]));

    let mut lib = file(Some("lib"), &[]);
    lib.types.push(message("Thing", vec![]));

    let errors = load(vec![("app.proto", consumer), ("lib/thing.proto", lib)]).unwrap_err();
    assert!(matches!(&errors[0], LinkError::UnresolvedReference { .. }));
}

#[test]
fn test_public_imports_reexport_transitively() {
    let mut consumer = file(Some("app"), &["facade.proto"]);
    consumer
        .types
        .push(message("Holder", vec![field("thing", 1, "lib.Thing")]));

    let mut facade = file(Some("facade"), &[]);
    facade.public_imports.push("lib/thing.proto".to_string());

    let mut lib = file(Some("lib"), &[]);
    lib.types.push(message("Thing", vec![]));

    let schema = load_ok(vec![
        ("app.proto", consumer),
        ("facade.proto", facade),
        ("lib/thing.proto", lib),
    ]);
    let Some(Type::Message(holder)) = schema.get_type("app.Holder") else {
        panic!("missing app.Holder");
    };
    assert_eq!(holder.field("thing").unwrap().proto_type.name(), "lib.Thing");
}

#[test]
fn test_duplicate_type_across_files() {
    let mut first = file(Some("pkg"), &[]);
    first.types.push(message("Thing", vec![]));
    let mut second = file(Some("pkg"), &[]);
    second.types.push(message("Thing", vec![]));

    let errors = load(vec![("a.proto", first), ("b.proto", second)]).unwrap_err();
    assert!(matches!(
        &errors[0],
        LinkError::DuplicateType { name, .. } if name == "pkg.Thing"
    ));
}

#[test]
fn test_tag_validation() {
    let mut element = file(Some("pkg"), &[]);
    element.types.push(message(
        "Tags",
        vec![
            field("zero", 0, "string"),
            field("huge", 1 << 29, "string"),
            field("reserved_range", 19_500, "string"),
            field("fine", 536_870_911, "string"),
        ],
    ));

    let errors = load(vec![("pkg.proto", element)]).unwrap_err();
    let out_of_range = errors
        .iter()
        .filter(|error| matches!(error, LinkError::TagOutOfRange { .. }))
        .count();
    assert_eq!(out_of_range, 3);
}

#[test]
fn test_reserved_tags_and_names_reject_fields() {
    let mut element = file(Some("pkg"), &[]);
    element.types.push(TypeElement::Message(MessageElement {
        name: "Legacy".to_string(),
        fields: vec![field("revived", 7, "string"), field("old_name", 20, "string")],
        reserved_tags: vec![TagRange::new(5, 10)],
        reserved_names: vec!["old_name".to_string()],
        ..Default::default()
    }));

    let errors = load(vec![("pkg.proto", element)]).unwrap_err();
    assert!(errors
        .iter()
        .any(|error| matches!(error, LinkError::ReservedTag { tag: 7, .. })));
    assert!(errors
        .iter()
        .any(|error| matches!(error, LinkError::ReservedName { field, .. } if field == "old_name")));
}

#[test]
fn test_map_field_synthesizes_entry_type() {
    let mut element = file(Some("demo"), &[]);
    element.types.push(message("Label", vec![field("text", 1, "string")]));
    element.types.push(message(
        "Project",
        vec![field("label_map", 1, "map<string, Label>")],
    ));

    let schema = load_ok(vec![("demo.proto", element)]);

    let Some(Type::Message(project)) = schema.get_type("demo.Project") else {
        panic!("missing demo.Project");
    };
    let map_field = project.field("label_map").unwrap();
    assert_eq!(map_field.label, Label::Repeated);
    assert_eq!(map_field.proto_type.name(), "demo.Project.LabelMapEntry");
    assert!(project
        .nested_types
        .iter()
        .any(|nested| nested.name() == "demo.Project.LabelMapEntry"));

    let Some(Type::Message(entry)) = schema.get_type("demo.Project.LabelMapEntry") else {
        panic!("entry type not registered");
    };
    assert!(entry.map_entry);
    assert_eq!(entry.fields.len(), 2);
    assert_eq!(entry.fields[0].name, "key");
    assert_eq!(entry.fields[0].tag, 1);
    assert_eq!(entry.fields[0].proto_type.name(), "string");
    assert_eq!(entry.fields[1].name, "value");
    assert_eq!(entry.fields[1].tag, 2);
    assert_eq!(entry.fields[1].proto_type.name(), "demo.Label");
}

#[test]
fn test_map_key_must_be_integral_string_or_bool() {
    let mut element = file(Some("demo"), &[]);
    element.types.push(message(
        "Project",
        vec![field("weights", 1, "map<double, string>")],
    ));

    let errors = load(vec![("demo.proto", element)]).unwrap_err();
    assert!(matches!(&errors[0], LinkError::InvalidMapKey { .. }));
}

#[test]
fn test_enum_aliases_need_allow_alias() {
    let mut element = file(Some("pkg"), &[]);
    element
        .types
        .push(enumeration("Status", &[("OK", 0), ("FINE", 0)]));

    let errors = load(vec![("pkg.proto", element)]).unwrap_err();
    assert!(matches!(
        &errors[0],
        LinkError::EnumValueCollision { value: 0, .. }
    ));

    // The same enum with allow_alias set links cleanly.
    let mut element = file(Some("pkg"), &[]);
    let TypeElement::Enum(mut aliased) = enumeration("Status", &[("OK", 0), ("FINE", 0)]) else {
        unreachable!();
    };
    aliased
        .options
        .insert("allow_alias".to_string(), serde_json::Value::Bool(true));
    element.types.push(TypeElement::Enum(aliased));

    let schema = load_ok(vec![("pkg.proto", element)]);
    let Some(Type::Enum(status)) = schema.get_type("pkg.Status") else {
        panic!("missing pkg.Status");
    };
    assert!(status.allow_alias);
}

#[test]
fn test_rpc_types_must_be_messages() {
    let mut element = file(Some("api"), &[]);
    element.types.push(message("Request", vec![]));
    element.types.push(enumeration("Code", &[("ZERO", 0)]));
    element
        .services
        .push(service("Lookup", vec![rpc("Get", "Request", "Code")]));

    let errors = load(vec![("api.proto", element)]).unwrap_err();
    assert!(matches!(
        &errors[0],
        LinkError::ExpectedMessage { name, .. } if name == "api.Code"
    ));
}

#[test]
fn test_service_rpcs_link() {
    let mut element = file(Some("api"), &[]);
    element.types.push(message("Request", vec![]));
    element.types.push(message("Response", vec![]));
    element
        .services
        .push(service("Lookup", vec![rpc("Get", "Request", "Response")]));

    let schema = load_ok(vec![("api.proto", element)]);
    let lookup = schema.get_service("api.Lookup").unwrap();
    let get = lookup.rpc("Get").unwrap();
    assert_eq!(get.request_type.name(), "api.Request");
    assert_eq!(get.response_type.name(), "api.Response");
}

#[test]
fn test_extension_tags_must_fall_in_declared_ranges() {
    let mut base = file(Some("base"), &[]);
    base.types.push(TypeElement::Message(MessageElement {
        name: "Envelope".to_string(),
        fields: vec![field("id", 1, "string")],
        extension_ranges: vec![TagRange::new(100, 199)],
        ..Default::default()
    }));

    let mut extender = file(Some("ext"), &["base.proto"]);
    extender.extend_blocks.push(ExtendElement {
        name: "base.Envelope".to_string(),
        fields: vec![
            field("trace_id", 150, "string"),
            field("rogue", 50, "string"),
        ],
        ..Default::default()
    });

    let errors = load(vec![("base.proto", base), ("ext.proto", extender)]).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        LinkError::ExtensionOutOfRange { tag: 50, target, .. } if target == "base.Envelope"
    ));
}

#[test]
fn test_import_not_found() {
    let mut element = file(Some("pkg"), &["nowhere/missing.proto"]);
    element.types.push(message("Thing", vec![]));

    let errors = load(vec![("pkg.proto", element)]).unwrap_err();
    assert!(matches!(
        &errors[0],
        LinkError::ImportNotFound { path, importer, .. }
            if path == "nowhere/missing.proto" && importer == "pkg.proto"
    ));
}

#[test]
fn test_proto_roots_satisfy_imports() {
    let mut app = file(Some("app"), &["lib/thing.proto"]);
    app.types
        .push(message("Holder", vec![field("thing", 1, "lib.Thing")]));

    let mut lib = file(Some("lib"), &[]);
    lib.types.push(message("Thing", vec![]));

    let mut source = MemorySource::new();
    source.add("protos", "app.proto", app);
    source.add("vendor", "lib/thing.proto", lib);

    let config = LinkConfig {
        source_roots: vec!["protos".to_string()],
        proto_roots: vec!["vendor".to_string()],
        ..Default::default()
    };
    let schema = Loader::new(&source).load(&config).unwrap();

    // Source files must be emitted; proto-root files are link-only.
    use lattice_core::schema_model::Role;
    assert_eq!(schema.proto_file("app.proto").unwrap().role, Role::Source);
    assert_eq!(
        schema.proto_file("lib/thing.proto").unwrap().role,
        Role::Path
    );
}

#[test]
fn test_package_cycles_are_rejected() {
    let mut alpha = file(Some("alpha"), &["beta.proto"]);
    alpha
        .types
        .push(message("A", vec![field("b", 1, "beta.B")]));
    let mut beta = file(Some("beta"), &["alpha.proto"]);
    beta.types
        .push(message("B", vec![field("a", 1, "alpha.A")]));

    let errors = load(vec![("alpha.proto", alpha), ("beta.proto", beta)]).unwrap_err();
    assert!(matches!(&errors[0], LinkError::PackageCycle { .. }));
}

#[test]
fn test_package_cycles_can_be_permitted() {
    let mut alpha = file(Some("alpha"), &["beta.proto"]);
    alpha
        .types
        .push(message("A", vec![field("b", 1, "beta.B")]));
    let mut beta = file(Some("beta"), &["alpha.proto"]);
    beta.types
        .push(message("B", vec![field("a", 1, "alpha.A")]));

    let mut source = MemorySource::new();
    source.add("protos", "alpha.proto", alpha);
    source.add("protos", "beta.proto", beta);

    let config = LinkConfig {
        source_roots: vec!["protos".to_string()],
        permit_package_cycles: true,
        ..Default::default()
    };
    let schema = Loader::new(&source).load(&config).unwrap();
    assert!(schema.get_type("alpha.A").is_some());
    assert!(schema.get_type("beta.B").is_some());
}

#[test]
fn test_same_package_cycle_is_not_a_package_cycle() {
    // Two files of one package importing each other is legal.
    let mut first = file(Some("pkg"), &["second.proto"]);
    first
        .types
        .push(message("First", vec![field("second", 1, "Second")]));
    let mut second = file(Some("pkg"), &["first.proto"]);
    second
        .types
        .push(message("Second", vec![field("first", 1, "First")]));

    let schema = load_ok(vec![("first.proto", first), ("second.proto", second)]);
    assert!(schema.get_type("pkg.First").is_some());
    assert!(schema.get_type("pkg.Second").is_some());
}

#[test]
fn test_leading_dot_forces_fully_qualified() {
    let mut consumer = file(Some("app"), &["lib/thing.proto"]);
    consumer
        .types
        .push(message("Holder", vec![field("thing", 1, ".lib.Thing")]));

    let mut lib = file(Some("lib"), &[]);
    lib.types.push(message("Thing", vec![]));

    let schema = load_ok(vec![("app.proto", consumer), ("lib/thing.proto", lib)]);
    let Some(Type::Message(holder)) = schema.get_type("app.Holder") else {
        panic!("missing app.Holder");
    };
    assert_eq!(holder.field("thing").unwrap().proto_type.name(), "lib.Thing");
}
