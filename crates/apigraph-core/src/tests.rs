//! Unit tests for apigraph-core

use crate::test_utils::*;
use crate::*;

// ── Variant sets ────────────────────────────────────────────

#[test]
fn test_add_then_remove_restores_original_set() {
    let surfaces = ApiSurfaces::create(true);
    let base = surfaces.base().unwrap().variant_for(ApiVariantType::Removed);
    let main = surfaces.main().variant_for(ApiVariantType::Core);

    let original = surfaces.variant_set([base]).unwrap();
    let mut set = original.to_mutable();
    set.add(main).unwrap();
    assert!(set.contains(main));
    set.remove(main);
    assert_eq!(set.to_immutable(), original);
}

#[test]
fn test_empty_sets_are_the_same_instance() {
    let surfaces = ApiSurfaces::create(true);
    let main = surfaces.main().variant_for(ApiVariantType::Core);

    let mut set = surfaces.mutable_variant_set();
    set.add(main).unwrap();
    set.clear();
    let emptied = set.to_immutable();

    assert!(ApiVariantSet::ptr_eq(&emptied, &surfaces.empty_variant_set()));
    assert!(ApiVariantSet::ptr_eq(
        &surfaces.variant_set([]).unwrap(),
        &surfaces.empty_variant_set()
    ));
}

#[test]
fn test_display_is_independent_of_insertion_order() {
    let surfaces = ApiSurfaces::create(true);
    let base_r = surfaces.base().unwrap().variant_for(ApiVariantType::Removed);
    let main_c = surfaces.main().variant_for(ApiVariantType::Core);

    let forward = surfaces.variant_set([base_r, main_c]).unwrap();
    let backward = surfaces.variant_set([main_c, base_r]).unwrap();
    assert_eq!(forward.to_string(), backward.to_string());
    insta::assert_snapshot!(forward.to_string(), @"ApiVariantSet[base(R),main(C)]");
}

#[test]
fn test_create_with_base_renders_both_surfaces() {
    let surfaces = ApiSurfaces::create(true);
    let names: Vec<&str> = surfaces.all().map(|s| s.name()).collect();
    assert_eq!(names, vec!["base", "main"]);
    assert_eq!(surfaces.main().extends(), surfaces.base().map(|s| s.id()));

    let set = surfaces.variant_set([
        surfaces.main().variant_for(ApiVariantType::Core),
        surfaces.base().unwrap().variant_for(ApiVariantType::Removed),
    ]).unwrap();
    assert_eq!(set.to_string(), "ApiVariantSet[base(R),main(C)]");
}

#[test]
fn test_parse_accepts_display_output() {
    let surfaces = ApiSurfaces::create(true);
    let set = surfaces.variant_set([
        surfaces.main().variant_for(ApiVariantType::Core),
        surfaces.main().variant_for(ApiVariantType::DocOnly),
        surfaces.base().unwrap().variant_for(ApiVariantType::Removed),
    ]).unwrap();
    let parsed = surfaces.parse_variant_set(&set.to_string()).unwrap();
    assert_eq!(parsed, set);
    assert!(parsed.contains_any(surfaces.main()));
}

// ── Codebase ────────────────────────────────────────────────

#[test]
fn test_duplicate_qualified_name_is_rejected() {
    let surfaces = ApiSurfaces::create(false);
    let mut codebase = empty_codebase(&surfaces);
    ClassBuilder::new(&mut codebase, "a", "a.C").build().unwrap();
    let err = ClassBuilder::new(&mut codebase, "a", "a.C").build().unwrap_err();
    assert_eq!(err, GraphError::QualifiedNameCollision("a.C".to_string()));
}

#[test]
fn test_containment_is_recorded_on_insert() {
    let surfaces = ApiSurfaces::create(false);
    let codebase = sample_codebase(&surfaces);

    let widget = codebase.find_class("test.pkg.Widget").unwrap();
    let inner = codebase.find_class("test.pkg.Widget.Inner").unwrap();
    assert_eq!(inner.containing_class(), Some(widget.id()));
    assert_eq!(inner.package(), widget.package());
    assert_eq!(inner.simple_name(), "Inner");
    assert_eq!(codebase.outer_classes(inner.id()), vec![widget.id()]);

    let get = codebase.find_callable(widget.id(), "get()").unwrap();
    assert_eq!(get.containing_class(), widget.id());
    assert_eq!(codebase.describe(ItemId::Callable(get.id())), "test.pkg.Widget#get()");
}

#[test]
fn test_all_classes_in_package_is_pre_order() {
    let surfaces = ApiSurfaces::create(false);
    let codebase = sample_codebase(&surfaces);
    let package = codebase.find_package("test.pkg").unwrap();

    let names: Vec<&str> = codebase
        .all_classes_in_package(package.id())
        .into_iter()
        .map(|id| codebase.class(id).qualified_name())
        .collect();
    assert_eq!(
        names,
        vec![
            "test.pkg.Base",
            "test.pkg.Widget",
            "test.pkg.Widget.Inner",
            "test.pkg.Listener",
            "test.pkg.Color",
        ]
    );
}

#[test]
fn test_descriptor_uses_erased_parameter_types() {
    let surfaces = ApiSurfaces::create(false);
    let codebase = sample_codebase(&surfaces);
    let widget = codebase.find_class("test.pkg.Widget").unwrap();
    let descriptors: Vec<String> = codebase
        .constructors(widget.id())
        .chain(codebase.methods(widget.id()))
        .map(|c| c.descriptor())
        .collect();
    assert_eq!(descriptors, vec!["Widget(java.lang.String)", "get()", "set(T)"]);
}

#[test]
fn test_super_class_lookup_misses_softly() {
    let surfaces = ApiSurfaces::create(false);
    let codebase = sample_codebase(&surfaces);
    let widget = codebase.find_class("test.pkg.Widget").unwrap();
    let base = codebase.find_class("test.pkg.Base").unwrap();

    assert_eq!(
        codebase.super_class_of(widget.id()).map(|c| c.qualified_name()),
        Some("test.pkg.Base")
    );
    assert!(codebase.super_class_of(base.id()).is_none());
    assert!(codebase.find_class("java.lang.Object").is_none());
}

struct Classpath;

impl ClassResolver for Classpath {
    fn resolve(&self, qualified_name: &str) -> Option<ClassStub> {
        let (package, containing_class) = match qualified_name {
            "java.util.Map" => ("java.util", None),
            "java.util.Map.Entry" => ("java.util", Some("java.util.Map".to_string())),
            _ => return None,
        };
        Some(ClassStub {
            qualified_name: qualified_name.to_string(),
            package: package.to_string(),
            containing_class,
            kind: ClassKind::Interface,
            modifiers: ModifierList::public(),
            super_class: None,
            interfaces: Vec::new(),
            type_parameters: Vec::new(),
        })
    }
}

#[test]
fn test_resolve_class_materializes_from_classpath() {
    let surfaces = ApiSurfaces::create(false);
    let mut codebase = empty_codebase(&surfaces).with_resolver(Box::new(Classpath));

    let entry = codebase.resolve_class("java.util.Map.Entry").unwrap();
    let entry = codebase.class(entry);
    assert!(!entry.emit());
    let outer = entry.containing_class().unwrap();
    assert_eq!(codebase.class(outer).qualified_name(), "java.util.Map");
    assert!(codebase.find_package("java.util").is_some());

    // Resolution is idempotent and misses are soft.
    let count = codebase.class_count();
    codebase.resolve_class("java.util.Map").unwrap();
    assert_eq!(codebase.class_count(), count);
    assert!(codebase.resolve_class("java.util.Missing").is_none());
}

// ── Hierarchy ───────────────────────────────────────────────

#[test]
fn test_hierarchy_ancestors_include_interfaces() {
    let surfaces = ApiSurfaces::create(false);
    let codebase = sample_codebase(&surfaces);
    let hierarchy = ClassHierarchy::build(&codebase);

    assert_eq!(
        hierarchy.ancestors("test.pkg.Widget"),
        vec!["test.pkg.Base", "test.pkg.Listener"]
    );
    assert_eq!(hierarchy.super_classes("test.pkg.Widget"), vec!["test.pkg.Base"]);
    assert!(hierarchy.is_subclass_of("test.pkg.Widget", "test.pkg.Listener"));
    assert!(!hierarchy.is_subclass_of("test.pkg.Base", "test.pkg.Widget"));
}

#[test]
fn test_hierarchy_survives_cycles() {
    let mut hierarchy = ClassHierarchy::new();
    hierarchy.add_supertype("a.A", "a.B", SupertypeKind::Extends);
    hierarchy.add_supertype("a.B", "a.A", SupertypeKind::Extends);

    assert_eq!(hierarchy.super_classes("a.A"), vec!["a.B"]);
    assert_eq!(hierarchy.ancestors("a.A"), vec!["a.B"]);
}

// ── Documents ───────────────────────────────────────────────

const DOCUMENT: &str = r#"{
  "description": "doc",
  "packages": [
    {
      "name": "a",
      "classes": [
        {
          "qualified_name": "a.C",
          "methods": [
            { "name": "m", "parameters": [ { "name": "x", "type": { "kind": "primitive", "primitive": "int" } } ] },
            {
              "name": "n",
              "reverts_to": "a.C#m(int)",
              "modifiers": { "deprecated": true },
              "variants": "ApiVariantSet[main(CD)]"
            }
          ],
          "fields": [ { "name": "F", "type": { "kind": "class", "qualified_name": "java.lang.String" }, "hidden": true } ]
        }
      ]
    }
  ]
}"#;

#[test]
fn test_document_populates_codebase() {
    let surfaces = ApiSurfaces::create(false);
    let codebase = CodebaseDocument::from_json(DOCUMENT)
        .unwrap()
        .into_codebase(&surfaces)
        .unwrap();

    let class = codebase.find_class("a.C").unwrap();
    let m = codebase.find_callable(class.id(), "m(int)").unwrap();
    let n = codebase.find_callable(class.id(), "n()").unwrap();
    assert_eq!(n.base.showability.revert_item, Some(ItemId::Callable(m.id())));
    assert!(n.is_deprecated());
    assert_eq!(n.selected_api_variants().to_string(), "ApiVariantSet[main(CD)]");
    assert_eq!(m.selected_api_variants().to_string(), "ApiVariantSet[main(C)]");
    assert!(codebase.find_field(class.id(), "F").unwrap().is_hidden());
}

#[test]
fn test_document_preserves_structure_when_rewritten() {
    let surfaces = ApiSurfaces::create(false);
    let original = sample_codebase(&surfaces);
    let text = CodebaseDocument::from_codebase(&original).to_json().unwrap();
    let reloaded = CodebaseDocument::from_json(&text)
        .unwrap()
        .into_codebase(&surfaces)
        .unwrap();

    assert_eq!(reloaded.item_count(), original.item_count());
    assert_eq!(
        method_names(&reloaded, "test.pkg.Widget"),
        method_names(&original, "test.pkg.Widget")
    );
    let inner = reloaded.find_class("test.pkg.Widget.Inner").unwrap();
    assert!(inner.containing_class().is_some());
    let color = reloaded.find_class("test.pkg.Color").unwrap();
    assert!(reloaded.fields_of(color.id()).all(|f| f.is_enum_constant));
}

#[test]
fn test_unknown_revert_target_is_an_error() {
    let surfaces = ApiSurfaces::create(false);
    let text = DOCUMENT.replace("a.C#m(int)", "a.C#missing()");
    let err = CodebaseDocument::from_json(&text)
        .unwrap()
        .into_codebase(&surfaces)
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidDocument(_)));
}

#[test]
fn test_config_loads_from_file() {
    let (_dir, path) = write_temp_file(
        CONFIG_FILE_NAME,
        r#"
        [[surfaces]]
        name = "public"

        [[surfaces]]
        name = "system"
        extends = "public"
        main = true

        [filters]
        hidden_packages = ["*.internal"]
        "#,
    );
    let config = RunConfig::load(&path).unwrap();
    assert!(config.validate().is_empty());

    let surfaces = config.build_surfaces().unwrap();
    assert_eq!(surfaces.main().name(), "system");
    assert!(config.hidden_packages().unwrap().is_match("test.pkg.internal"));
}
