//! Test utilities for apigraph

use crate::builder::ClassBuilder;
use crate::codebase::Codebase;
use crate::model::{ClassKind, Item, ItemId};
use crate::surfaces::ApiSurfaces;
use crate::types::{PrimitiveKind, TypeItem, TypeParameterItem};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub fn int() -> TypeItem {
    TypeItem::primitive(PrimitiveKind::Int)
}

pub fn string() -> TypeItem {
    TypeItem::class("java.lang.String")
}

/// Codebase whose selections default to the core variant of `main`.
pub fn empty_codebase(surfaces: &ApiSurfaces) -> Codebase {
    Codebase::new("test", surfaces.clone())
}

/// Select every item of `codebase` into the core variant of the main
/// surface.
pub fn select_all_in_main(codebase: &mut Codebase) {
    let surfaces = codebase.api_surfaces().clone();
    let selected = surfaces.main_core();
    let ids: Vec<ItemId> = codebase
        .packages()
        .map(|p| ItemId::Package(p.id()))
        .chain(codebase.classes().map(|c| ItemId::Class(c.id())))
        .chain(codebase.callables().flat_map(|c| {
            std::iter::once(ItemId::Callable(c.id()))
                .chain((0..c.parameters().len()).map(move |i| ItemId::Parameter(c.id(), i)))
        }))
        .chain(codebase.fields().map(|f| ItemId::Field(f.id())))
        .chain(codebase.properties().map(|p| ItemId::Property(p.id())))
        .collect();
    for id in ids {
        if let Some(base) = codebase.base_mut(id) {
            base.selected_api_variants = selected.clone();
        }
    }
}

/// A small API:
///
/// ```text
/// package test.pkg
///   class Base            { Base(); int size(); }
///   class Widget<T> extends Base implements test.pkg.Listener
///                          { Widget(String); T get(); void set(T value); String NAME; property label }
///     class Widget.Inner   { void run(); }
///   interface Listener     { void onEvent(int code); }
///   enum Color             { RED, GREEN }
/// package test.pkg.internal
///   class Helper (hidden)  { void help(); }
/// ```
pub fn sample_codebase(surfaces: &ApiSurfaces) -> Codebase {
    let mut codebase = empty_codebase(surfaces);

    ClassBuilder::new(&mut codebase, "test.pkg", "test.pkg.Base")
        .constructor([])
        .method("size", int(), [])
        .build()
        .unwrap();

    let widget = ClassBuilder::new(&mut codebase, "test.pkg", "test.pkg.Widget")
        .type_parameter(TypeParameterItem::new("T"))
        .super_class("test.pkg.Base")
        .interface("test.pkg.Listener")
        .constructor([("name", string())])
        .method("get", TypeItem::variable("T"), [])
        .method("set", TypeItem::void(), [("value", TypeItem::variable("T"))])
        .field("NAME", string())
        .property("label", string())
        .build()
        .unwrap();

    ClassBuilder::new(&mut codebase, "test.pkg", "test.pkg.Widget.Inner")
        .nested_in(widget)
        .method("run", TypeItem::void(), [])
        .build()
        .unwrap();

    ClassBuilder::new(&mut codebase, "test.pkg", "test.pkg.Listener")
        .kind(ClassKind::Interface)
        .method("onEvent", TypeItem::void(), [("code", int())])
        .build()
        .unwrap();

    ClassBuilder::new(&mut codebase, "test.pkg", "test.pkg.Color")
        .kind(ClassKind::Enum)
        .enum_constant("RED")
        .enum_constant("GREEN")
        .build()
        .unwrap();

    ClassBuilder::new(&mut codebase, "test.pkg.internal", "test.pkg.internal.Helper")
        .hidden()
        .method("help", TypeItem::void(), [])
        .build()
        .unwrap();

    select_all_in_main(&mut codebase);
    codebase
}

/// Names of the methods of a class, in declaration order.
pub fn method_names(codebase: &Codebase, qualified_name: &str) -> Vec<String> {
    let class = codebase.find_class(qualified_name).unwrap();
    codebase.methods(class.id()).map(|m| m.name().to_string()).collect()
}

/// Write `content` to a file in a fresh temporary directory.
pub fn write_temp_file(name: &str, content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    (dir, path)
}
