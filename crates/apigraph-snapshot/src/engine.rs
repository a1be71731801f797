//! Snapshot engine: filtered, self-contained copies of a codebase

use crate::docs::reverted_documentation;
use crate::scope::TypeParameterScope;
use apigraph_core::{
    descriptor_of, CallableItem, ClassId, ClassItem, ClassTypeItem, Codebase, FieldItem, Item, ItemBase, ItemId, ItemRef,
    PackageId, PackageItem, ParameterItem, PropertyItem, Result, Showability, TypeItem, TypeParameterOwner,
};
use apigraph_visit::{walk, walk_class, ApiTraversal, BaseTraversal, ItemVisitor, Traversal};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

/// Copies the part of a codebase selected by a definition traversal, plus
/// whatever those items refer to, selected by a reference traversal.
///
/// Classes copied only because they are referenced get `emit = false`.
pub struct SnapshotEngine<'a> {
    definition: &'a dyn Traversal,
    reference: &'a dyn Traversal,
}

impl<'a> SnapshotEngine<'a> {
    pub fn new(definition: &'a dyn Traversal, reference: &'a dyn Traversal) -> Self {
        SnapshotEngine { definition, reference }
    }

    pub fn take(&self, source: &Codebase) -> Result<Codebase> {
        let mut builder = SnapshotBuilder::new(source);
        walk(source, self.definition, &mut builder)?;
        let defined = builder.target.class_count();

        builder.reference_mode = true;
        let mut missed = HashSet::new();
        while let Some(name) = builder.pending.pop_first() {
            let copied = builder.target.find_class(&name).is_some() && !builder.shells.contains(&name);
            if copied || missed.contains(&name) {
                continue;
            }
            let Some(class) = source.find_class_id(&name) else {
                debug!("Referenced class {} is not part of {}", name, source.description());
                missed.insert(name);
                continue;
            };
            debug!("Materializing referenced class {}", name);
            builder.ensure_outer_classes(source, class)?;
            walk_class(source, self.reference, &mut builder, class)?;
        }

        let mut snapshot = builder.target;
        snapshot.set_pre_filtered(true);
        info!(
            "Snapshot of {}: {} classes defined, {} referenced, {} unresolved references",
            source.description(),
            defined,
            snapshot.class_count() - defined,
            missed.len()
        );
        Ok(snapshot)
    }
}

/// Snapshot of the emitted API of `source`; referenced classes are copied
/// whole.
pub fn snapshot_api(source: &Codebase) -> Result<Codebase> {
    let definition = ApiTraversal::emitted();
    let reference = BaseTraversal::default();
    SnapshotEngine::new(&definition, &reference).take(source)
}

struct ActiveClass {
    /// `None` when the class was already copied and its members are ignored.
    target: Option<ClassId>,
    qualified_name: String,
    scope: TypeParameterScope,
}

struct SnapshotBuilder {
    target: Codebase,
    /// Qualified names referenced by copied items.
    pending: BTreeSet<String>,
    /// Classes created only as containers, whose declaration may still be
    /// filled in by a later visit.
    shells: HashSet<String>,
    stack: Vec<ActiveClass>,
    reference_mode: bool,
}

/// Item data for a copy: identity and selection from `visited`, modifiers
/// from `shape`.
fn copy_base(visited: &ItemBase, shape: &ItemBase, reverted: bool, emit: bool) -> ItemBase {
    ItemBase {
        location: visited.location.clone(),
        documentation: reverted_documentation(visited, shape, reverted),
        modifiers: shape.modifiers.clone(),
        emit,
        hidden: visited.hidden,
        removed: visited.removed,
        selected_api_variants: visited.selected_api_variants.clone(),
        showability: Showability::default(),
    }
}

/// The item whose shape replaces `visited`, resolved with `pick`.
fn revert_target<'s, T>(
    source: &'s Codebase,
    visited: &'s T,
    pick: impl Fn(ItemRef<'s>) -> Option<&'s T>,
) -> (&'s T, bool)
where
    T: Item,
{
    match visited.base().showability.revert_item.and_then(|id| source.item(id)).and_then(pick) {
        Some(shape) => (shape, true),
        None => (visited, false),
    }
}

/// Copy a class declaration without members, resolving its type variables.
fn copy_class_declaration(
    source: &Codebase,
    class_id: ClassId,
    emit: bool,
) -> Result<(ClassItem, TypeParameterScope)> {
    let visited = source.class(class_id);
    let (shape, reverted) = revert_target(source, visited, |item| match item {
        ItemRef::Class(class) => Some(class),
        _ => None,
    });

    let base = copy_base(&visited.base, &shape.base, reverted, emit);
    let mut class = ClassItem::new(visited.qualified_name(), shape.kind, base);
    class.super_class = shape.super_class.clone();
    class.interfaces = shape.interfaces.clone();
    class.type_parameters = shape.type_parameters.clone();

    let mut scope = TypeParameterScope::global();
    for outer in source.outer_classes(class_id) {
        let outer = source.class(outer);
        scope.push(TypeParameterOwner::Class(outer.qualified_name().to_string()), &outer.type_parameters);
    }
    scope.push(
        TypeParameterOwner::Class(visited.qualified_name().to_string()),
        &class.type_parameters,
    );

    let context = visited.qualified_name();
    scope.resolve_bounds(&mut class.type_parameters, context)?;
    if let Some(super_class) = &mut class.super_class {
        scope.resolve_class_type(super_class, context)?;
    }
    for interface in &mut class.interfaces {
        scope.resolve_class_type(interface, context)?;
    }
    Ok((class, scope))
}

impl SnapshotBuilder {
    fn new(source: &Codebase) -> Self {
        SnapshotBuilder {
            target: Codebase::new(source.description(), source.api_surfaces().clone()),
            pending: BTreeSet::new(),
            shells: HashSet::new(),
            stack: Vec::new(),
            reference_mode: false,
        }
    }

    fn note_type(&mut self, ty: &TypeItem) {
        let pending = &mut self.pending;
        ty.for_each_class_reference(&mut |class| {
            pending.insert(class.qualified_name.clone());
        });
    }

    fn note_class_type(&mut self, class: &ClassTypeItem) {
        self.note_type(&TypeItem::Class(class.clone()));
    }

    fn note_declaration(&mut self, class: &ClassItem) {
        if let Some(super_class) = &class.super_class {
            self.note_class_type(super_class);
        }
        for interface in &class.interfaces {
            self.note_class_type(interface);
        }
        for bound in class.type_parameters.iter().flat_map(|p| p.bounds.iter()) {
            self.note_type(bound);
        }
    }

    fn ensure_package(&mut self, source: &Codebase, package_id: PackageId) -> PackageId {
        let package = source.package(package_id);
        if let Some(existing) = self.target.find_package(package.name()) {
            return existing.id();
        }
        let id = self.target.find_or_create_package(package.name());
        let emit = package.base.emit && !self.reference_mode;
        if let Some(base) = self.target.base_mut(ItemId::Package(id)) {
            *base = copy_base(&package.base, &package.base, false, emit);
        }
        id
    }

    fn insert_class(&mut self, source: &Codebase, class_id: ClassId, class: ClassItem) -> Result<ClassId> {
        let visited = source.class(class_id);
        match visited.containing_class() {
            Some(outer) => {
                let outer = self.ensure_class_shell(source, outer)?;
                self.target.add_nested_class(outer, class)
            }
            None => {
                let package = self.ensure_package(source, visited.package());
                self.target.add_class(package, class)
            }
        }
    }

    fn ensure_outer_classes(&mut self, source: &Codebase, class_id: ClassId) -> Result<()> {
        if let Some(outer) = source.class(class_id).containing_class() {
            self.ensure_class_shell(source, outer)?;
        }
        Ok(())
    }

    /// Make sure a copy of `class_id` exists, creating a member-less,
    /// non-emitted one if necessary.
    fn ensure_class_shell(&mut self, source: &Codebase, class_id: ClassId) -> Result<ClassId> {
        let name = source.class(class_id).qualified_name();
        if let Some(id) = self.target.find_class_id(name) {
            return Ok(id);
        }
        let (class, _) = copy_class_declaration(source, class_id, false)?;
        self.note_declaration(&class);
        let id = self.insert_class(source, class_id, class)?;
        self.shells.insert(name.to_string());
        debug!("Created container {} in snapshot", name);
        Ok(id)
    }

    /// Target class and scope of the class whose members are being visited.
    fn active(&self) -> Option<(ClassId, String, TypeParameterScope)> {
        let active = self.stack.last()?;
        let target = active.target?;
        Some((target, active.qualified_name.clone(), active.scope.clone()))
    }

    fn member_emit(&self, visited: &ItemBase) -> bool {
        visited.emit && !self.reference_mode
    }

    fn copy_callable(&mut self, source: &Codebase, visited: &CallableItem) -> Result<()> {
        let Some((target_class, class_name, mut scope)) = self.active() else {
            return Ok(());
        };
        let (shape, reverted) = revert_target(source, visited, |item| match item {
            ItemRef::Callable(callable) => Some(callable),
            _ => None,
        });
        let emit = self.member_emit(&visited.base);

        let mut parameters: Vec<ParameterItem> = shape
            .parameters()
            .iter()
            .enumerate()
            .map(|(index, parameter)| {
                let mut base = copy_base(&parameter.base, &parameter.base, false, emit);
                if reverted {
                    let selection = visited.parameters().get(index).map_or(&visited.base, |p| &p.base);
                    base.selected_api_variants = selection.selected_api_variants.clone();
                }
                let mut copy = ParameterItem::new(parameter.name.clone(), parameter.ty.clone(), base);
                copy.default_value = parameter.default_value.clone();
                copy
            })
            .collect();
        let mut return_type = shape.return_type.clone();
        let mut type_parameters = shape.type_parameters.clone();
        let mut throws = shape.throws.clone();

        let descriptor = descriptor_of(visited.name(), &parameters);
        let context = format!("{}#{}", class_name, descriptor);
        scope.push(
            TypeParameterOwner::Callable {
                class: class_name,
                descriptor,
            },
            &type_parameters,
        );
        scope.resolve_bounds(&mut type_parameters, &context)?;
        scope.resolve_type(&mut return_type, &context)?;
        for parameter in &mut parameters {
            scope.resolve_type(&mut parameter.ty, &context)?;
        }
        for thrown in &mut throws {
            scope.resolve_type(thrown, &context)?;
        }

        self.note_type(&return_type);
        for ty in parameters.iter().map(|p| &p.ty).chain(throws.iter()) {
            self.note_type(ty);
        }
        for bound in type_parameters.iter().flat_map(|p| p.bounds.iter()) {
            self.note_type(bound);
        }

        let base = copy_base(&visited.base, &shape.base, reverted, emit);
        let mut copy = CallableItem::new(visited.kind(), visited.name(), return_type, parameters, base);
        copy.type_parameters = type_parameters;
        copy.throws = throws;
        self.target.add_callable(target_class, copy)?;
        Ok(())
    }

    fn copy_field(&mut self, source: &Codebase, visited: &FieldItem) -> Result<()> {
        let Some((target_class, class_name, scope)) = self.active() else {
            return Ok(());
        };
        let (shape, reverted) = revert_target(source, visited, |item| match item {
            ItemRef::Field(field) => Some(field),
            _ => None,
        });

        let mut ty = shape.ty.clone();
        scope.resolve_type(&mut ty, &format!("{}#{}", class_name, visited.name()))?;
        self.note_type(&ty);

        let base = copy_base(&visited.base, &shape.base, reverted, self.member_emit(&visited.base));
        let mut copy = FieldItem::new(visited.name(), ty, base);
        copy.is_enum_constant = shape.is_enum_constant;
        copy.initial_value = shape.initial_value.clone();
        self.target.add_field(target_class, copy)?;
        Ok(())
    }

    fn copy_property(&mut self, source: &Codebase, visited: &PropertyItem) -> Result<()> {
        let Some((target_class, class_name, scope)) = self.active() else {
            return Ok(());
        };
        let (shape, reverted) = revert_target(source, visited, |item| match item {
            ItemRef::Property(property) => Some(property),
            _ => None,
        });

        let mut ty = shape.ty.clone();
        scope.resolve_type(&mut ty, &format!("{}#{}", class_name, visited.name()))?;
        self.note_type(&ty);

        let base = copy_base(&visited.base, &shape.base, reverted, self.member_emit(&visited.base));
        self.target.add_property(target_class, PropertyItem::new(visited.name(), ty, base))?;
        Ok(())
    }
}

impl ItemVisitor for SnapshotBuilder {
    fn visit_package(&mut self, codebase: &Codebase, package: &PackageItem) -> Result<()> {
        self.ensure_package(codebase, package.id());
        Ok(())
    }

    fn visit_class(&mut self, codebase: &Codebase, class: &ClassItem, emit: bool) -> Result<()> {
        let emit = emit && !self.reference_mode;
        let name = class.qualified_name();

        let active = match self.target.find_class_id(name) {
            Some(id) if self.shells.remove(name) => {
                let (copy, scope) = copy_class_declaration(codebase, class.id(), emit)?;
                self.note_declaration(&copy);
                let slot = self.target.class_mut(id);
                slot.kind = copy.kind;
                slot.super_class = copy.super_class;
                slot.interfaces = copy.interfaces;
                slot.type_parameters = copy.type_parameters;
                slot.base = copy.base;
                ActiveClass {
                    target: Some(id),
                    qualified_name: name.to_string(),
                    scope,
                }
            }
            Some(_) => {
                debug!("Class {} is already in the snapshot", name);
                ActiveClass {
                    target: None,
                    qualified_name: name.to_string(),
                    scope: TypeParameterScope::global(),
                }
            }
            None => {
                let (copy, scope) = copy_class_declaration(codebase, class.id(), emit)?;
                self.note_declaration(&copy);
                let id = self.insert_class(codebase, class.id(), copy)?;
                ActiveClass {
                    target: Some(id),
                    qualified_name: name.to_string(),
                    scope,
                }
            }
        };
        self.stack.push(active);
        Ok(())
    }

    fn after_visit_class(&mut self, _codebase: &Codebase, _class: &ClassItem, _emit: bool) -> Result<()> {
        self.stack.pop();
        Ok(())
    }

    fn visit_constructor(&mut self, codebase: &Codebase, constructor: &CallableItem) -> Result<()> {
        self.copy_callable(codebase, constructor)
    }

    fn visit_method(&mut self, codebase: &Codebase, method: &CallableItem) -> Result<()> {
        self.copy_callable(codebase, method)
    }

    fn visit_property(&mut self, codebase: &Codebase, property: &PropertyItem) -> Result<()> {
        self.copy_property(codebase, property)
    }

    fn visit_field(&mut self, codebase: &Codebase, field: &FieldItem) -> Result<()> {
        self.copy_field(codebase, field)
    }
}
