//! The codebase: root container owning the package/class/member arenas

use crate::error::{GraphError, Result};
use crate::model::*;
use crate::surfaces::ApiSurfaces;
use crate::types::{ClassTypeItem, TypeParameterItem};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

static NEXT_IDENTITY: AtomicU64 = AtomicU64::new(1);

/// Minimal description of a class supplied by an external classpath.
#[derive(Debug, Clone)]
pub struct ClassStub {
    pub qualified_name: String,
    pub package: String,
    /// Qualified name of the enclosing class for nested classes.
    pub containing_class: Option<String>,
    pub kind: ClassKind,
    pub modifiers: ModifierList,
    pub super_class: Option<ClassTypeItem>,
    pub interfaces: Vec<ClassTypeItem>,
    pub type_parameters: Vec<TypeParameterItem>,
}

/// Source of classes that are referenced but not part of the codebase,
/// e.g. a platform classpath.
pub trait ClassResolver {
    fn resolve(&self, qualified_name: &str) -> Option<ClassStub>;
}

/// Root container for one loaded API.
pub struct Codebase {
    identity: u64,
    description: String,
    api_surfaces: ApiSurfaces,
    pre_filtered: bool,
    packages: Vec<PackageItem>,
    classes: Vec<ClassItem>,
    callables: Vec<CallableItem>,
    fields: Vec<FieldItem>,
    properties: Vec<PropertyItem>,
    package_index: HashMap<String, PackageId>,
    class_index: HashMap<String, ClassId>,
    resolver: Option<Box<dyn ClassResolver>>,
}

impl std::fmt::Debug for Codebase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codebase")
            .field("description", &self.description)
            .field("pre_filtered", &self.pre_filtered)
            .field("package_count", &self.packages.len())
            .field("class_count", &self.classes.len())
            .field("callable_count", &self.callables.len())
            .field("field_count", &self.fields.len())
            .field("property_count", &self.properties.len())
            .finish()
    }
}

impl Codebase {
    pub fn new(description: impl Into<String>, api_surfaces: ApiSurfaces) -> Self {
        Codebase {
            identity: NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed),
            description: description.into(),
            api_surfaces,
            pre_filtered: false,
            packages: Vec::new(),
            classes: Vec::new(),
            callables: Vec::new(),
            fields: Vec::new(),
            properties: Vec::new(),
            package_index: HashMap::new(),
            class_index: HashMap::new(),
            resolver: None,
        }
    }

    /// Attach an external classpath used by [`resolve_class`](Self::resolve_class).
    pub fn with_resolver(mut self, resolver: Box<dyn ClassResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Process-unique identity of this codebase instance.
    pub fn identity(&self) -> u64 {
        self.identity
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn api_surfaces(&self) -> &ApiSurfaces {
        &self.api_surfaces
    }

    /// Whether this codebase was already restricted to an API, in which case
    /// every item is a definition and reference filtering is moot.
    pub fn is_pre_filtered(&self) -> bool {
        self.pre_filtered
    }

    pub fn set_pre_filtered(&mut self, pre_filtered: bool) {
        self.pre_filtered = pre_filtered;
    }

    /// Fresh item data selected into no variants.
    pub fn new_item_base(&self) -> ItemBase {
        ItemBase::new(self.api_surfaces.empty_variant_set())
    }

    // ── Population ──────────────────────────────────────────

    /// Return the package with this name, creating it if necessary.
    pub fn find_or_create_package(&mut self, name: &str) -> PackageId {
        if let Some(id) = self.package_index.get(name) {
            return *id;
        }
        let id = PackageId(self.packages.len() as u32);
        let base = self.new_item_base();
        self.packages.push(PackageItem {
            id,
            name: name.to_string(),
            top_level_classes: Vec::new(),
            base,
        });
        self.package_index.insert(name.to_string(), id);
        id
    }

    /// Insert a top-level class into `package`.
    pub fn add_class(&mut self, package: PackageId, class: ClassItem) -> Result<ClassId> {
        let id = self.insert_class(package, None, class)?;
        self.package_entry(package)?.top_level_classes.push(id);
        Ok(id)
    }

    /// Insert a class nested in `outer`; it joins the outer class's package.
    pub fn add_nested_class(&mut self, outer: ClassId, class: ClassItem) -> Result<ClassId> {
        let package = self.class_entry(outer)?.package;
        let id = self.insert_class(package, Some(outer), class)?;
        self.class_entry_mut(outer)?.nested_classes.push(id);
        Ok(id)
    }

    fn insert_class(
        &mut self,
        package: PackageId,
        containing_class: Option<ClassId>,
        mut class: ClassItem,
    ) -> Result<ClassId> {
        if self.class_index.contains_key(&class.qualified_name) {
            return Err(GraphError::QualifiedNameCollision(class.qualified_name));
        }
        self.package_entry(package)?;

        let id = ClassId(self.classes.len() as u32);
        class.id = id;
        class.package = package;
        class.containing_class = containing_class;
        self.class_index.insert(class.qualified_name.clone(), id);
        self.classes.push(class);
        Ok(id)
    }

    /// Insert a constructor or method into `class`.
    pub fn add_callable(&mut self, class: ClassId, mut callable: CallableItem) -> Result<CallableId> {
        let id = CallableId(self.callables.len() as u32);
        callable.id = id;
        callable.containing_class = class;
        let kind = callable.kind;

        let owner = self.class_entry_mut(class)?;
        match kind {
            CallableKind::Constructor => owner.constructors.push(id),
            CallableKind::Method => owner.methods.push(id),
        }
        self.callables.push(callable);
        Ok(id)
    }

    /// Insert `callable` into `class` as a constructor.
    pub fn add_constructor(&mut self, class: ClassId, mut callable: CallableItem) -> Result<CallableId> {
        callable.kind = CallableKind::Constructor;
        self.add_callable(class, callable)
    }

    /// Insert `callable` into `class` as a method.
    pub fn add_method(&mut self, class: ClassId, mut callable: CallableItem) -> Result<CallableId> {
        callable.kind = CallableKind::Method;
        self.add_callable(class, callable)
    }

    pub fn add_field(&mut self, class: ClassId, mut field: FieldItem) -> Result<FieldId> {
        let id = FieldId(self.fields.len() as u32);
        field.id = id;
        field.containing_class = class;
        self.class_entry_mut(class)?.fields.push(id);
        self.fields.push(field);
        Ok(id)
    }

    pub fn add_property(&mut self, class: ClassId, mut property: PropertyItem) -> Result<PropertyId> {
        let id = PropertyId(self.properties.len() as u32);
        property.id = id;
        property.containing_class = class;
        self.class_entry_mut(class)?.properties.push(id);
        self.properties.push(property);
        Ok(id)
    }

    fn package_entry(&mut self, id: PackageId) -> Result<&mut PackageItem> {
        self.packages
            .get_mut(id.0 as usize)
            .ok_or_else(|| GraphError::UnknownItem(ItemId::Package(id).to_string()))
    }

    fn class_entry(&self, id: ClassId) -> Result<&ClassItem> {
        self.classes
            .get(id.0 as usize)
            .ok_or_else(|| GraphError::UnknownItem(ItemId::Class(id).to_string()))
    }

    fn class_entry_mut(&mut self, id: ClassId) -> Result<&mut ClassItem> {
        self.classes
            .get_mut(id.0 as usize)
            .ok_or_else(|| GraphError::UnknownItem(ItemId::Class(id).to_string()))
    }

    // ── Lookup ──────────────────────────────────────────────

    pub fn find_package(&self, name: &str) -> Option<&PackageItem> {
        self.package_index.get(name).map(|id| &self.packages[id.0 as usize])
    }

    pub fn find_class(&self, qualified_name: &str) -> Option<&ClassItem> {
        self.class_index
            .get(qualified_name)
            .map(|id| &self.classes[id.0 as usize])
    }

    pub fn find_class_id(&self, qualified_name: &str) -> Option<ClassId> {
        self.class_index.get(qualified_name).copied()
    }

    /// Find a class, materializing it from the attached [`ClassResolver`] if
    /// it is not already present. Materialized classes are never emitted.
    pub fn resolve_class(&mut self, qualified_name: &str) -> Option<ClassId> {
        if let Some(id) = self.find_class_id(qualified_name) {
            return Some(id);
        }

        let stub = match self.resolver.as_ref().and_then(|r| r.resolve(qualified_name)) {
            Some(stub) => stub,
            None => {
                debug!("Class {} could not be resolved", qualified_name);
                return None;
            }
        };

        let outer = match &stub.containing_class {
            Some(outer) => Some(self.resolve_class(outer)?),
            None => None,
        };

        let mut base = self.new_item_base();
        base.emit = false;
        base.modifiers = stub.modifiers;
        let mut class = ClassItem::new(stub.qualified_name, stub.kind, base);
        class.super_class = stub.super_class;
        class.interfaces = stub.interfaces;
        class.type_parameters = stub.type_parameters;

        let inserted = match outer {
            Some(outer) => self.add_nested_class(outer, class),
            None => {
                let package = self.find_or_create_package(&stub.package);
                self.add_class(package, class)
            }
        };

        match inserted {
            Ok(id) => {
                debug!("Materialized class {} from classpath", qualified_name);
                Some(id)
            }
            Err(e) => {
                debug!("Classpath returned an unusable stub for {}: {}", qualified_name, e);
                None
            }
        }
    }

    /// # Panics
    /// Panics if `id` was not issued by this codebase.
    pub fn package(&self, id: PackageId) -> &PackageItem {
        &self.packages[id.0 as usize]
    }

    /// # Panics
    /// Panics if `id` was not issued by this codebase.
    pub fn class(&self, id: ClassId) -> &ClassItem {
        &self.classes[id.0 as usize]
    }

    /// Mutable access to a class's declaration. Containment cannot be
    /// changed through it.
    ///
    /// # Panics
    /// Panics if `id` was not issued by this codebase.
    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassItem {
        &mut self.classes[id.0 as usize]
    }

    /// # Panics
    /// Panics if `id` was not issued by this codebase.
    pub fn callable(&self, id: CallableId) -> &CallableItem {
        &self.callables[id.0 as usize]
    }

    /// # Panics
    /// Panics if `id` was not issued by this codebase.
    pub fn field(&self, id: FieldId) -> &FieldItem {
        &self.fields[id.0 as usize]
    }

    /// # Panics
    /// Panics if `id` was not issued by this codebase.
    pub fn property(&self, id: PropertyId) -> &PropertyItem {
        &self.properties[id.0 as usize]
    }

    /// Borrow any item by id.
    pub fn item(&self, id: ItemId) -> Option<ItemRef<'_>> {
        match id {
            ItemId::Package(id) => self.packages.get(id.0 as usize).map(ItemRef::Package),
            ItemId::Class(id) => self.classes.get(id.0 as usize).map(ItemRef::Class),
            ItemId::Callable(id) => self.callables.get(id.0 as usize).map(ItemRef::Callable),
            ItemId::Field(id) => self.fields.get(id.0 as usize).map(ItemRef::Field),
            ItemId::Property(id) => self.properties.get(id.0 as usize).map(ItemRef::Property),
            ItemId::Parameter(id, index) => {
                let callable = self.callables.get(id.0 as usize)?;
                callable
                    .parameters
                    .get(index)
                    .map(|parameter| ItemRef::Parameter(callable, parameter))
            }
        }
    }

    /// Mutable access to the non-structural data of an item.
    pub fn base_mut(&mut self, id: ItemId) -> Option<&mut ItemBase> {
        match id {
            ItemId::Package(id) => self.packages.get_mut(id.0 as usize).map(|i| &mut i.base),
            ItemId::Class(id) => self.classes.get_mut(id.0 as usize).map(|i| &mut i.base),
            ItemId::Callable(id) => self.callables.get_mut(id.0 as usize).map(|i| &mut i.base),
            ItemId::Field(id) => self.fields.get_mut(id.0 as usize).map(|i| &mut i.base),
            ItemId::Property(id) => self.properties.get_mut(id.0 as usize).map(|i| &mut i.base),
            ItemId::Parameter(id, index) => self
                .callables
                .get_mut(id.0 as usize)
                .and_then(|c| c.parameters.get_mut(index))
                .map(|p| &mut p.base),
        }
    }

    // ── Iteration ───────────────────────────────────────────

    pub fn packages(&self) -> impl Iterator<Item = &PackageItem> {
        self.packages.iter()
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassItem> {
        self.classes.iter()
    }

    pub fn callables(&self) -> impl Iterator<Item = &CallableItem> {
        self.callables.iter()
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldItem> {
        self.fields.iter()
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertyItem> {
        self.properties.iter()
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Total number of items of every kind except parameters.
    pub fn item_count(&self) -> usize {
        self.packages.len()
            + self.classes.len()
            + self.callables.len()
            + self.fields.len()
            + self.properties.len()
    }

    pub fn top_level_classes(&self, package: PackageId) -> impl Iterator<Item = &ClassItem> {
        self.package(package)
            .top_level_classes
            .iter()
            .map(move |id| self.class(*id))
    }

    pub fn nested_classes(&self, class: ClassId) -> impl Iterator<Item = &ClassItem> {
        self.class(class)
            .nested_classes
            .iter()
            .map(move |id| self.class(*id))
    }

    /// Every class in a package, nested ones included, in pre-order of the
    /// containment tree.
    pub fn all_classes_in_package(&self, package: PackageId) -> Vec<ClassId> {
        let mut result = Vec::new();
        let mut stack: Vec<ClassId> = self.package(package).top_level_classes.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            result.push(id);
            stack.extend(self.class(id).nested_classes.iter().rev().copied());
        }
        result
    }

    /// Enclosing classes of `class`, outermost first.
    pub fn outer_classes(&self, class: ClassId) -> Vec<ClassId> {
        let mut chain = Vec::new();
        let mut current = self.class(class).containing_class;
        while let Some(id) = current {
            chain.push(id);
            current = self.class(id).containing_class;
        }
        chain.reverse();
        chain
    }

    pub fn constructors(&self, class: ClassId) -> impl Iterator<Item = &CallableItem> {
        self.class(class).constructors.iter().map(move |id| self.callable(*id))
    }

    pub fn methods(&self, class: ClassId) -> impl Iterator<Item = &CallableItem> {
        self.class(class).methods.iter().map(move |id| self.callable(*id))
    }

    pub fn fields_of(&self, class: ClassId) -> impl Iterator<Item = &FieldItem> {
        self.class(class).fields.iter().map(move |id| self.field(*id))
    }

    pub fn properties_of(&self, class: ClassId) -> impl Iterator<Item = &PropertyItem> {
        self.class(class).properties.iter().map(move |id| self.property(*id))
    }

    /// Constructor or method of `class` with the given descriptor.
    pub fn find_callable(&self, class: ClassId, descriptor: &str) -> Option<&CallableItem> {
        let class = self.class(class);
        class
            .constructors
            .iter()
            .chain(class.methods.iter())
            .map(|id| self.callable(*id))
            .find(|callable| callable.descriptor() == descriptor)
    }

    pub fn find_field(&self, class: ClassId, name: &str) -> Option<&FieldItem> {
        self.fields_of(class).find(|field| field.name == name)
    }

    pub fn find_property(&self, class: ClassId, name: &str) -> Option<&PropertyItem> {
        self.properties_of(class).find(|property| property.name == name)
    }

    /// The super class declared by `class`, if it is part of this codebase.
    pub fn super_class_of(&self, class: ClassId) -> Option<&ClassItem> {
        let super_type = self.class(class).super_class.as_ref()?;
        self.find_class(&super_type.qualified_name)
    }

    /// Interfaces declared by `class` that are part of this codebase.
    pub fn interfaces_of(&self, class: ClassId) -> impl Iterator<Item = &ClassItem> {
        self.class(class)
            .interfaces
            .iter()
            .filter_map(move |i| self.find_class(&i.qualified_name))
    }

    /// Human-readable identity of an item, e.g. `a.b.C#m(int)`.
    pub fn describe(&self, id: ItemId) -> String {
        match self.item(id) {
            None => id.to_string(),
            Some(ItemRef::Package(package)) => package.name.clone(),
            Some(ItemRef::Class(class)) => class.qualified_name.clone(),
            Some(ItemRef::Callable(callable)) => format!(
                "{}#{}",
                self.class(callable.containing_class).qualified_name,
                callable.descriptor()
            ),
            Some(ItemRef::Field(field)) => format!(
                "{}#{}",
                self.class(field.containing_class).qualified_name,
                field.name
            ),
            Some(ItemRef::Property(property)) => format!(
                "{}#{}",
                self.class(property.containing_class).qualified_name,
                property.name
            ),
            Some(ItemRef::Parameter(callable, parameter)) => format!(
                "{}#{}/{}",
                self.class(callable.containing_class).qualified_name,
                callable.descriptor(),
                parameter.name
            ),
        }
    }
}
