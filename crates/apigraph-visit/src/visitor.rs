//! Visitor callbacks and the traversal state machine driving them

use crate::traversal::{ClassSelection, Traversal};
use apigraph_core::{
    CallableItem, ClassId, ClassItem, Codebase, FieldItem, ItemRef, PackageItem, ParameterItem, PropertyItem,
    Result,
};

/// Callbacks fired while walking a codebase.
///
/// Every callback defaults to a no-op. Returning an error aborts the walk.
pub trait ItemVisitor {
    /// Called before the kind-specific `visit_*` callback of every item.
    fn visit_item(&mut self, codebase: &Codebase, item: ItemRef<'_>) -> Result<()> {
        let _ = (codebase, item);
        Ok(())
    }

    /// Called after the kind-specific `after_visit_*` callback of every item.
    fn after_visit_item(&mut self, codebase: &Codebase, item: ItemRef<'_>) -> Result<()> {
        let _ = (codebase, item);
        Ok(())
    }

    fn visit_codebase(&mut self, codebase: &Codebase) -> Result<()> {
        let _ = codebase;
        Ok(())
    }

    fn after_visit_codebase(&mut self, codebase: &Codebase) -> Result<()> {
        let _ = codebase;
        Ok(())
    }

    fn visit_package(&mut self, codebase: &Codebase, package: &PackageItem) -> Result<()> {
        let _ = (codebase, package);
        Ok(())
    }

    fn after_visit_package(&mut self, codebase: &Codebase, package: &PackageItem) -> Result<()> {
        let _ = (codebase, package);
        Ok(())
    }

    /// `emit` is false when the class is only visited to expose its members.
    fn visit_class(&mut self, codebase: &Codebase, class: &ClassItem, emit: bool) -> Result<()> {
        let _ = (codebase, class, emit);
        Ok(())
    }

    fn after_visit_class(&mut self, codebase: &Codebase, class: &ClassItem, emit: bool) -> Result<()> {
        let _ = (codebase, class, emit);
        Ok(())
    }

    fn visit_constructor(&mut self, codebase: &Codebase, constructor: &CallableItem) -> Result<()> {
        let _ = (codebase, constructor);
        Ok(())
    }

    fn after_visit_constructor(&mut self, codebase: &Codebase, constructor: &CallableItem) -> Result<()> {
        let _ = (codebase, constructor);
        Ok(())
    }

    fn visit_method(&mut self, codebase: &Codebase, method: &CallableItem) -> Result<()> {
        let _ = (codebase, method);
        Ok(())
    }

    fn after_visit_method(&mut self, codebase: &Codebase, method: &CallableItem) -> Result<()> {
        let _ = (codebase, method);
        Ok(())
    }

    fn visit_property(&mut self, codebase: &Codebase, property: &PropertyItem) -> Result<()> {
        let _ = (codebase, property);
        Ok(())
    }

    fn after_visit_property(&mut self, codebase: &Codebase, property: &PropertyItem) -> Result<()> {
        let _ = (codebase, property);
        Ok(())
    }

    fn visit_field(&mut self, codebase: &Codebase, field: &FieldItem) -> Result<()> {
        let _ = (codebase, field);
        Ok(())
    }

    fn after_visit_field(&mut self, codebase: &Codebase, field: &FieldItem) -> Result<()> {
        let _ = (codebase, field);
        Ok(())
    }

    fn visit_parameter(
        &mut self,
        codebase: &Codebase,
        callable: &CallableItem,
        parameter: &ParameterItem,
    ) -> Result<()> {
        let _ = (codebase, callable, parameter);
        Ok(())
    }

    fn after_visit_parameter(
        &mut self,
        codebase: &Codebase,
        callable: &CallableItem,
        parameter: &ParameterItem,
    ) -> Result<()> {
        let _ = (codebase, callable, parameter);
        Ok(())
    }
}

/// Walk `codebase` in the order chosen by `traversal`.
///
/// Each item is offered to [`Traversal::skip`] first; a skipped item fires no
/// callbacks and none of its children are visited.
pub fn walk<T, V>(codebase: &Codebase, traversal: &T, visitor: &mut V) -> Result<()>
where
    T: Traversal + ?Sized,
    V: ItemVisitor + ?Sized,
{
    visitor.visit_codebase(codebase)?;

    for package_id in traversal.packages(codebase) {
        let package = codebase.package(package_id);
        let item = ItemRef::Package(package);
        if traversal.skip(codebase, item) {
            continue;
        }

        visitor.visit_item(codebase, item)?;
        visitor.visit_package(codebase, package)?;
        for class in traversal.classes_in_package(codebase, package_id) {
            walk_class(codebase, traversal, visitor, class)?;
        }
        visitor.after_visit_package(codebase, package)?;
        visitor.after_visit_item(codebase, item)?;
    }

    visitor.after_visit_codebase(codebase)
}

/// Walk one class and its members (and, when nesting is preserved, its
/// nested classes) without visiting the codebase or package.
pub fn walk_class<T, V>(codebase: &Codebase, traversal: &T, visitor: &mut V, class_id: ClassId) -> Result<()>
where
    T: Traversal + ?Sized,
    V: ItemVisitor + ?Sized,
{
    let class = codebase.class(class_id);
    let item = ItemRef::Class(class);
    if traversal.skip(codebase, item) {
        return Ok(());
    }
    let emit = match traversal.select_class(codebase, class_id) {
        ClassSelection::Skip => return Ok(()),
        ClassSelection::Reference => false,
        ClassSelection::Emit => true,
    };

    visitor.visit_item(codebase, item)?;
    visitor.visit_class(codebase, class, emit)?;

    let members = traversal.members(codebase, class_id);
    let config = traversal.config();

    for id in &members.constructors {
        let constructor = codebase.callable(*id);
        let item = ItemRef::Callable(constructor);
        if traversal.skip(codebase, item) {
            continue;
        }
        visitor.visit_item(codebase, item)?;
        visitor.visit_constructor(codebase, constructor)?;
        if config.visit_parameters {
            walk_parameters(codebase, traversal, visitor, constructor)?;
        }
        visitor.after_visit_constructor(codebase, constructor)?;
        visitor.after_visit_item(codebase, item)?;
    }

    for id in &members.methods {
        let method = codebase.callable(*id);
        let item = ItemRef::Callable(method);
        if traversal.skip(codebase, item) {
            continue;
        }
        visitor.visit_item(codebase, item)?;
        visitor.visit_method(codebase, method)?;
        if config.visit_parameters {
            walk_parameters(codebase, traversal, visitor, method)?;
        }
        visitor.after_visit_method(codebase, method)?;
        visitor.after_visit_item(codebase, item)?;
    }

    for id in &members.properties {
        let property = codebase.property(*id);
        let item = ItemRef::Property(property);
        if traversal.skip(codebase, item) {
            continue;
        }
        visitor.visit_item(codebase, item)?;
        visitor.visit_property(codebase, property)?;
        visitor.after_visit_property(codebase, property)?;
        visitor.after_visit_item(codebase, item)?;
    }

    for id in &members.fields {
        let field = codebase.field(*id);
        let item = ItemRef::Field(field);
        if traversal.skip(codebase, item) {
            continue;
        }
        visitor.visit_item(codebase, item)?;
        visitor.visit_field(codebase, field)?;
        visitor.after_visit_field(codebase, field)?;
        visitor.after_visit_item(codebase, item)?;
    }

    if config.preserve_nesting {
        for nested in traversal.nested_classes(codebase, class_id) {
            walk_class(codebase, traversal, visitor, nested)?;
        }
    }

    visitor.after_visit_class(codebase, class, emit)?;
    visitor.after_visit_item(codebase, item)
}

fn walk_parameters<T, V>(codebase: &Codebase, traversal: &T, visitor: &mut V, callable: &CallableItem) -> Result<()>
where
    T: Traversal + ?Sized,
    V: ItemVisitor + ?Sized,
{
    for parameter in callable.parameters() {
        let item = ItemRef::Parameter(callable, parameter);
        if traversal.skip(codebase, item) {
            continue;
        }
        visitor.visit_item(codebase, item)?;
        visitor.visit_parameter(codebase, callable, parameter)?;
        visitor.after_visit_parameter(codebase, callable, parameter)?;
        visitor.after_visit_item(codebase, item)?;
    }
    Ok(())
}
