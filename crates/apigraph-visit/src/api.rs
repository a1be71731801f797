//! Filtered traversal over the emittable API

use crate::comparators::{compare_callables, compare_classes, compare_fields, compare_packages, compare_properties};
use crate::filters::{AcceptAll, EmitFilter, ItemFilter};
use crate::traversal::{ClassMembers, ClassSelection, Traversal, TraversalConfig};
use apigraph_core::{ClassId, ClassTypeItem, Codebase, ItemRef, PackageId};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{debug, warn};

/// Traversal restricted by two predicates:
///
/// * `filter_emit` decides whether an item is part of the output;
/// * `filter_reference` decides whether an item may appear as a reference
///   target, e.g. as the super class of an emitted class.
///
/// Packages and classes are visited sorted by name, members by the
/// comparators in [`crate::comparators`]. A class that is not emitted is
/// still visited, without its declaration, if it has emitted members or
/// (with nesting preserved) a selected nested class.
///
/// Per-class results are computed once and memoized, so the codebase must
/// not change while the traversal is alive. The memo tables belong to one
/// codebase at a time; handing the traversal a different codebase discards
/// them.
pub struct ApiTraversal {
    config: TraversalConfig,
    /// Identity of the codebase the memo tables were computed for.
    bound: Cell<Option<u64>>,
    filter_emit: Box<dyn ItemFilter>,
    filter_reference: Box<dyn ItemFilter>,
    members: RefCell<HashMap<ClassId, Rc<ClassMembers>>>,
    selections: RefCell<HashMap<ClassId, ClassSelection>>,
    super_classes: RefCell<HashMap<ClassId, Option<ClassTypeItem>>>,
}

impl std::fmt::Debug for ApiTraversal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiTraversal")
            .field("config", &self.config)
            .field("memoized_classes", &self.members.borrow().len())
            .finish()
    }
}

impl ApiTraversal {
    pub fn new(filter_emit: impl ItemFilter + 'static, filter_reference: impl ItemFilter + 'static) -> Self {
        ApiTraversal {
            config: TraversalConfig::default(),
            bound: Cell::new(None),
            filter_emit: Box::new(filter_emit),
            filter_reference: Box::new(filter_reference),
            members: RefCell::new(HashMap::new()),
            selections: RefCell::new(HashMap::new()),
            super_classes: RefCell::new(HashMap::new()),
        }
    }

    /// Emit items whose `emit` flag is set; anything may be referenced.
    pub fn emitted() -> Self {
        Self::new(EmitFilter, AcceptAll)
    }

    pub fn with_config(mut self, config: TraversalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn filter_emit(&self) -> &dyn ItemFilter {
        self.filter_emit.as_ref()
    }

    pub fn filter_reference(&self) -> &dyn ItemFilter {
        self.filter_reference.as_ref()
    }

    pub fn emits(&self, codebase: &Codebase, item: ItemRef<'_>) -> bool {
        self.filter_emit.test(codebase, item)
    }

    pub fn references(&self, codebase: &Codebase, item: ItemRef<'_>) -> bool {
        self.filter_reference.test(codebase, item)
    }

    fn bind(&self, codebase: &Codebase) {
        let identity = codebase.identity();
        if self.bound.get() == Some(identity) {
            return;
        }
        if self.bound.get().is_some() {
            debug!("Traversal moved to {}, dropping memoized results", codebase.description());
        }
        self.members.borrow_mut().clear();
        self.selections.borrow_mut().clear();
        self.super_classes.borrow_mut().clear();
        self.bound.set(Some(identity));
    }

    /// Emitted members of `class`, sorted, computed on first request.
    pub fn filtered_members(&self, codebase: &Codebase, class: ClassId) -> Rc<ClassMembers> {
        self.bind(codebase);
        if let Some(members) = self.members.borrow().get(&class) {
            return Rc::clone(members);
        }

        let item = codebase.class(class);
        let emits = |item: ItemRef<'_>| self.filter_emit.test(codebase, item);

        let mut constructors: Vec<_> = codebase.constructors(class).filter(|c| emits(ItemRef::Callable(*c))).collect();
        constructors.sort_by(|a, b| compare_callables(a, b));
        let mut methods: Vec<_> = codebase.methods(class).filter(|m| emits(ItemRef::Callable(*m))).collect();
        methods.sort_by(|a, b| compare_callables(a, b));
        let mut properties: Vec<_> = codebase.properties_of(class).filter(|p| emits(ItemRef::Property(*p))).collect();
        properties.sort_by(|a, b| compare_properties(a, b));
        let mut fields: Vec<_> = codebase.fields_of(class).filter(|f| emits(ItemRef::Field(*f))).collect();
        fields.sort_by(|a, b| compare_fields(a, b));

        let members = Rc::new(ClassMembers {
            constructors: constructors.iter().map(|c| c.id()).collect(),
            methods: methods.iter().map(|m| m.id()).collect(),
            properties: properties.iter().map(|p| p.id()).collect(),
            fields: fields.iter().map(|f| f.id()).collect(),
        });
        debug!("Filtered {} members of {}", members.len(), item.qualified_name());
        self.members.borrow_mut().insert(class, Rc::clone(&members));
        members
    }

    /// Nearest super class of `class` that may be referenced, skipping over
    /// classes rejected by `filter_reference`. Super classes outside the
    /// codebase are returned as declared.
    pub fn visible_super_class(&self, codebase: &Codebase, class: ClassId) -> Option<ClassTypeItem> {
        self.bind(codebase);
        if let Some(cached) = self.super_classes.borrow().get(&class) {
            return cached.clone();
        }

        let mut seen = HashSet::from([class]);
        let mut current = class;
        let resolved = loop {
            let Some(super_type) = codebase.class(current).super_class.clone() else {
                break None;
            };
            let Some(super_class) = codebase.find_class(&super_type.qualified_name) else {
                break Some(super_type);
            };
            if self.filter_reference.test(codebase, ItemRef::Class(super_class)) {
                break Some(super_type);
            }
            if !seen.insert(super_class.id()) {
                warn!(
                    "Super class cycle through {} while resolving {}",
                    super_class.qualified_name(),
                    codebase.class(class).qualified_name()
                );
                break None;
            }
            current = super_class.id();
        };

        self.super_classes.borrow_mut().insert(class, resolved.clone());
        resolved
    }

    fn compute_selection(&self, codebase: &Codebase, class: ClassId) -> ClassSelection {
        if self.filter_emit.test(codebase, ItemRef::Class(codebase.class(class))) {
            return ClassSelection::Emit;
        }
        if !self.filtered_members(codebase, class).is_empty() {
            return ClassSelection::Reference;
        }
        if self.config.preserve_nesting
            && codebase
                .class(class)
                .nested_classes()
                .iter()
                .any(|nested| self.select_class(codebase, *nested) != ClassSelection::Skip)
        {
            return ClassSelection::Reference;
        }
        ClassSelection::Skip
    }
}

impl Traversal for ApiTraversal {
    fn config(&self) -> TraversalConfig {
        self.config
    }

    fn packages(&self, codebase: &Codebase) -> Vec<PackageId> {
        let mut packages: Vec<_> = codebase
            .packages()
            .filter(|package| {
                codebase
                    .all_classes_in_package(package.id())
                    .into_iter()
                    .any(|class| self.select_class(codebase, class) != ClassSelection::Skip)
            })
            .collect();
        packages.sort_by(|a, b| compare_packages(a, b));
        packages.into_iter().map(|p| p.id()).collect()
    }

    fn classes_in_package(&self, codebase: &Codebase, package: PackageId) -> Vec<ClassId> {
        let ids = if self.config.preserve_nesting {
            codebase.package(package).top_level_classes().to_vec()
        } else {
            codebase.all_classes_in_package(package)
        };
        let mut classes: Vec<_> = ids.into_iter().map(|id| codebase.class(id)).collect();
        classes.sort_by(|a, b| compare_classes(a, b));
        classes.into_iter().map(|c| c.id()).collect()
    }

    fn nested_classes(&self, codebase: &Codebase, class: ClassId) -> Vec<ClassId> {
        let mut nested: Vec<_> = codebase.nested_classes(class).collect();
        nested.sort_by(|a, b| compare_classes(a, b));
        nested.into_iter().map(|c| c.id()).collect()
    }

    fn select_class(&self, codebase: &Codebase, class: ClassId) -> ClassSelection {
        self.bind(codebase);
        if let Some(selection) = self.selections.borrow().get(&class) {
            return *selection;
        }
        let selection = self.compute_selection(codebase, class);
        self.selections.borrow_mut().insert(class, selection);
        selection
    }

    fn members(&self, codebase: &Codebase, class: ClassId) -> Rc<ClassMembers> {
        self.filtered_members(codebase, class)
    }
}
