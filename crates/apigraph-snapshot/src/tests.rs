//! Unit tests for apigraph-snapshot

use crate::*;
use apigraph_core::test_utils::*;
use apigraph_core::*;
use apigraph_visit::*;

/// Clear the emit flag of a class and everything in it.
fn exclude_from_output(codebase: &mut Codebase, qualified_name: &str) {
    let class = codebase.find_class(qualified_name).unwrap();
    let mut ids = vec![ItemId::Class(class.id())];
    ids.extend(codebase.callables().filter(|c| c.containing_class() == class.id()).map(|c| ItemId::Callable(c.id())));
    ids.extend(codebase.fields_of(class.id()).map(|f| ItemId::Field(f.id())));
    ids.extend(codebase.properties_of(class.id()).map(|p| ItemId::Property(p.id())));
    for id in ids {
        codebase.base_mut(id).unwrap().emit = false;
    }
}

#[derive(Default)]
struct ClassNames(Vec<String>);

impl ItemVisitor for ClassNames {
    fn visit_class(&mut self, _codebase: &Codebase, class: &ClassItem, emit: bool) -> Result<()> {
        if emit {
            self.0.push(class.qualified_name().to_string());
        }
        Ok(())
    }
}

fn emitted_classes(codebase: &Codebase) -> Vec<String> {
    let mut names = ClassNames::default();
    walk(codebase, &ApiTraversal::emitted(), &mut names).unwrap();
    names.0
}

/// `a.A` emits `B make()`; `a.B` is excluded from output.
fn referencing_codebase() -> Codebase {
    let surfaces = ApiSurfaces::create(false);
    let mut codebase = empty_codebase(&surfaces);
    ClassBuilder::new(&mut codebase, "a", "a.A")
        .method("make", TypeItem::class("a.B"), [])
        .method("copy", TypeItem::class("a.B"), [("other", TypeItem::class("a.B"))])
        .field("DEFAULT", TypeItem::class("a.B"))
        .build()
        .unwrap();
    ClassBuilder::new(&mut codebase, "a", "a.B")
        .method("b", TypeItem::void(), [])
        .build()
        .unwrap();
    exclude_from_output(&mut codebase, "a.B");
    codebase
}

#[test]
fn test_referenced_class_is_copied_without_emit() {
    let source = referencing_codebase();
    let snapshot = snapshot_api(&source).unwrap();

    let b = snapshot.find_class("a.B").unwrap();
    assert!(!b.emit());
    assert_eq!(method_names(&snapshot, "a.B"), vec!["b"]);
    assert!(snapshot.methods(b.id()).all(|m| !m.emit()));

    assert_eq!(emitted_classes(&snapshot), vec!["a.A"]);
}

#[test]
fn test_repeated_references_create_one_copy() {
    let source = referencing_codebase();
    let snapshot = snapshot_api(&source).unwrap();

    assert_eq!(snapshot.class_count(), 2);
    let b = snapshot.find_class("a.B").unwrap();
    assert_eq!(snapshot.methods(b.id()).count(), 1);
}

#[test]
fn test_reference_copies_never_emit() {
    let surfaces = ApiSurfaces::create(false);
    let mut source = empty_codebase(&surfaces);
    ClassBuilder::new(&mut source, "a", "a.A")
        .super_class("b.Base")
        .method("run", TypeItem::void(), [])
        .build()
        .unwrap();
    ClassBuilder::new(&mut source, "b", "b.Base")
        .method("base", TypeItem::void(), [])
        .build()
        .unwrap();

    let not_b = PackageFilter::excluding(PackageMatcher::new(&["b"]).unwrap());
    let definition = ApiTraversal::new(EmitFilter.and(not_b), AcceptAll);
    let reference = BaseTraversal::default();
    let snapshot = SnapshotEngine::new(&definition, &reference).take(&source).unwrap();

    let base = snapshot.find_class("b.Base").unwrap();
    assert!(!base.emit());
    assert!(!snapshot.find_package("b").unwrap().emit());
    assert!(snapshot.methods(base.id()).all(|m| !m.emit()));
    assert_eq!(emitted_classes(&snapshot), vec!["a.A"]);
}

#[test]
fn test_unknown_references_are_left_unresolved() {
    let surfaces = ApiSurfaces::create(false);
    let source = sample_codebase(&surfaces);
    let snapshot = snapshot_api(&source).unwrap();

    assert!(snapshot.find_class("java.lang.String").is_none());
    assert_eq!(snapshot.class_count(), source.class_count());
}

#[test]
fn test_snapshot_of_sample_api() {
    let surfaces = ApiSurfaces::create(false);
    let source = sample_codebase(&surfaces);
    let snapshot = snapshot_api(&source).unwrap();

    let listing: Vec<String> = snapshot
        .classes()
        .map(|class| {
            let members: Vec<String> = snapshot
                .constructors(class.id())
                .chain(snapshot.methods(class.id()))
                .map(|c| c.descriptor())
                .chain(snapshot.fields_of(class.id()).map(|f| f.name().to_string()))
                .chain(snapshot.properties_of(class.id()).map(|p| p.name().to_string()))
                .collect();
            format!("{} [{}]", class.qualified_name(), members.join(", "))
        })
        .collect();
    insta::assert_snapshot!(listing.join("\n"), @r"
    test.pkg.Base [Base(), size()]
    test.pkg.Color [GREEN, RED]
    test.pkg.Listener [onEvent(int)]
    test.pkg.Widget [Widget(java.lang.String), get(), set(T), NAME, label]
    test.pkg.Widget.Inner [run()]
    test.pkg.internal.Helper [help()]
    ");
}

#[test]
fn test_snapshot_is_pre_filtered_and_independent() {
    let surfaces = ApiSurfaces::create(false);
    let source = sample_codebase(&surfaces);
    assert!(!source.is_pre_filtered());

    let mut snapshot = snapshot_api(&source).unwrap();
    assert!(snapshot.is_pre_filtered());

    let widget = snapshot.find_class_id("test.pkg.Widget").unwrap();
    snapshot.class_mut(widget).base.documentation = Documentation::new("changed");
    snapshot.class_mut(widget).base.emit = false;

    let widget = source.find_class("test.pkg.Widget").unwrap();
    assert!(widget.documentation().is_empty());
    assert!(widget.emit());
}

#[test]
fn test_selection_is_preserved() {
    let surfaces = ApiSurfaces::create(false);
    let source = sample_codebase(&surfaces);
    let snapshot = snapshot_api(&source).unwrap();

    let main = surfaces.main().variant_for(ApiVariantType::Core);
    for class in snapshot.classes() {
        assert!(class.selected_api_variants().contains(main), "{}", class.qualified_name());
    }
}

#[test]
fn test_type_variables_resolve_to_their_declaration() {
    let surfaces = ApiSurfaces::create(false);
    let mut source = empty_codebase(&surfaces);
    let base = source.new_item_base();
    let mut convert = CallableItem::new(
        CallableKind::Method,
        "convert",
        TypeItem::variable("T"),
        vec![ParameterItem::new("value", TypeItem::variable("T"), base.clone())],
        base,
    );
    convert.type_parameters.push(TypeParameterItem::new("T"));
    ClassBuilder::new(&mut source, "a", "a.Box")
        .type_parameter(TypeParameterItem::new("T"))
        .method("get", TypeItem::variable("T"), [])
        .callable(convert)
        .build()
        .unwrap();

    let snapshot = snapshot_api(&source).unwrap();
    let class = snapshot.find_class("a.Box").unwrap();

    let get = snapshot.find_callable(class.id(), "get()").unwrap();
    let TypeItem::Variable(variable) = &get.return_type else {
        panic!("expected a type variable, got {:?}", get.return_type);
    };
    assert_eq!(variable.owner, Some(TypeParameterOwner::Class("a.Box".into())));

    let convert = snapshot.find_callable(class.id(), "convert(T)").unwrap();
    let TypeItem::Variable(variable) = &convert.parameters()[0].ty else {
        panic!("expected a type variable");
    };
    assert_eq!(
        variable.owner,
        Some(TypeParameterOwner::Callable {
            class: "a.Box".into(),
            descriptor: "convert(T)".into(),
        })
    );
}

#[test]
fn test_nested_class_sees_outer_type_parameters() {
    let surfaces = ApiSurfaces::create(false);
    let mut source = sample_codebase(&surfaces);
    let widget = source.find_class_id("test.pkg.Widget").unwrap();
    ClassBuilder::new(&mut source, "test.pkg", "test.pkg.Widget.Holder")
        .nested_in(widget)
        .field("value", TypeItem::variable("T"))
        .build()
        .unwrap();

    let snapshot = snapshot_api(&source).unwrap();
    let holder = snapshot.find_class_id("test.pkg.Widget.Holder").unwrap();
    let field = snapshot.find_field(holder, "value").unwrap();
    let TypeItem::Variable(variable) = &field.ty else {
        panic!("expected a type variable");
    };
    assert_eq!(variable.owner, Some(TypeParameterOwner::Class("test.pkg.Widget".into())));
}

#[test]
fn test_unresolved_type_parameter_is_an_error() {
    let surfaces = ApiSurfaces::create(false);
    let mut source = empty_codebase(&surfaces);
    ClassBuilder::new(&mut source, "a", "a.A")
        .method("get", TypeItem::variable("T"), [])
        .build()
        .unwrap();

    let err = snapshot_api(&source).unwrap_err();
    assert_eq!(
        err,
        GraphError::UnresolvedTypeParameter {
            name: "T".into(),
            context: "a.A#get()".into(),
        }
    );
}

#[test]
fn test_reference_to_nested_class_creates_outer_container() {
    let surfaces = ApiSurfaces::create(false);
    let mut source = empty_codebase(&surfaces);
    ClassBuilder::new(&mut source, "a", "a.A")
        .method("nested", TypeItem::class("a.Outer.Nested"), [])
        .build()
        .unwrap();
    let outer = ClassBuilder::new(&mut source, "a", "a.Outer")
        .method("outer", TypeItem::void(), [])
        .build()
        .unwrap();
    ClassBuilder::new(&mut source, "a", "a.Outer.Nested")
        .nested_in(outer)
        .method("inner", TypeItem::void(), [])
        .build()
        .unwrap();
    exclude_from_output(&mut source, "a.Outer");
    exclude_from_output(&mut source, "a.Outer.Nested");

    let snapshot = snapshot_api(&source).unwrap();

    let outer = snapshot.find_class("a.Outer").unwrap();
    assert!(!outer.emit());
    assert!(outer.methods().is_empty());
    let nested = snapshot.find_class("a.Outer.Nested").unwrap();
    assert_eq!(nested.containing_class(), Some(outer.id()));
    assert_eq!(method_names(&snapshot, "a.Outer.Nested"), vec!["inner"]);
}

#[test]
fn test_referenced_container_is_filled_in() {
    let surfaces = ApiSurfaces::create(false);
    let mut source = empty_codebase(&surfaces);
    ClassBuilder::new(&mut source, "a", "a.A")
        .method("nested", TypeItem::class("a.Outer.Nested"), [])
        .build()
        .unwrap();
    let outer = ClassBuilder::new(&mut source, "a", "a.Outer")
        .method("run", TypeItem::void(), [])
        .build()
        .unwrap();
    ClassBuilder::new(&mut source, "a", "a.Outer.Nested")
        .nested_in(outer)
        .method("parent", TypeItem::class("a.Outer"), [])
        .build()
        .unwrap();
    exclude_from_output(&mut source, "a.Outer");
    exclude_from_output(&mut source, "a.Outer.Nested");

    let snapshot = snapshot_api(&source).unwrap();
    assert_eq!(method_names(&snapshot, "a.Outer"), vec!["run"]);
    assert_eq!(method_names(&snapshot, "a.Outer.Nested"), vec!["parent"]);
    assert_eq!(snapshot.class_count(), 3);
}

#[test]
fn test_revert_copies_the_reverted_shape() {
    let surfaces = ApiSurfaces::create(false);
    let mut source = empty_codebase(&surfaces);
    let a = ClassBuilder::new(&mut source, "a", "a.A")
        .method("m", TypeItem::void(), [("x", int())])
        .build()
        .unwrap();
    let previous = ClassBuilder::new(&mut source, "a", "a.Previous")
        .hidden()
        .method("m", int(), [("value", int())])
        .build()
        .unwrap();
    exclude_from_output(&mut source, "a.Previous");

    let reverted = source.find_callable(previous, "m(int)").unwrap().id();
    let visited = source.find_callable(a, "m(int)").unwrap().id();
    let selection = source.api_surfaces().variant_set([surfaces.main().variant_for(ApiVariantType::Removed)]).unwrap();
    {
        let base = source.base_mut(ItemId::Callable(visited)).unwrap();
        base.modifiers.deprecated = true;
        base.documentation = Documentation::new("/** Does m. @deprecated use n() */");
        base.selected_api_variants = selection.clone();
        base.showability.revert_item = Some(ItemId::Callable(reverted));
    }

    let snapshot = snapshot_api(&source).unwrap();
    let class = snapshot.find_class_id("a.A").unwrap();
    let m = snapshot.find_callable(class, "m(int)").unwrap();

    assert_eq!(m.return_type, int());
    assert_eq!(m.parameters()[0].name, "value");
    assert!(!m.is_deprecated());
    assert!(!m.documentation().is_deprecated_in_docs());
    assert!(m.documentation().text().contains("Does m."));
    assert_eq!(m.selected_api_variants(), &selection);
    assert!(m.base.showability.revert_item.is_none());
    assert!(snapshot.find_class("a.Previous").is_none());
}
