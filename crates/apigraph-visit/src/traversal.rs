//! Traversal strategies: which items a walk visits and in what order

use crate::filters::ItemFilter;
use apigraph_core::{CallableId, ClassId, Codebase, FieldId, Item, ItemRef, PackageId, PropertyId};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraversalConfig {
    /// Visit nested classes inside their outer class instead of as direct
    /// children of the package.
    pub preserve_nesting: bool,
    pub visit_parameters: bool,
}

/// How a class takes part in a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassSelection {
    Skip,
    /// Visited without its own declaration so its members can be reached.
    Reference,
    Emit,
}

/// Members of one class in visiting order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassMembers {
    pub constructors: Vec<CallableId>,
    pub methods: Vec<CallableId>,
    pub properties: Vec<PropertyId>,
    pub fields: Vec<FieldId>,
}

impl ClassMembers {
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty() && self.methods.is_empty() && self.properties.is_empty() && self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.constructors.len() + self.methods.len() + self.properties.len() + self.fields.len()
    }
}

/// Decides the shape of a walk. See [`walk`](crate::walk).
pub trait Traversal {
    fn config(&self) -> TraversalConfig;

    fn skip(&self, codebase: &Codebase, item: ItemRef<'_>) -> bool {
        let _ = (codebase, item);
        false
    }

    fn packages(&self, codebase: &Codebase) -> Vec<PackageId>;

    /// Classes visited as direct children of `package`: the top level ones
    /// when nesting is preserved, otherwise every class in the package.
    fn classes_in_package(&self, codebase: &Codebase, package: PackageId) -> Vec<ClassId>;

    fn nested_classes(&self, codebase: &Codebase, class: ClassId) -> Vec<ClassId>;

    fn select_class(&self, codebase: &Codebase, class: ClassId) -> ClassSelection;

    fn members(&self, codebase: &Codebase, class: ClassId) -> Rc<ClassMembers>;
}

/// Visits everything in declaration order, except items rejected by an
/// optional skip predicate.
#[derive(Default)]
pub struct BaseTraversal {
    config: TraversalConfig,
    skip: Option<Box<dyn ItemFilter>>,
}

impl BaseTraversal {
    pub fn new(config: TraversalConfig) -> Self {
        BaseTraversal { config, skip: None }
    }

    /// Skip every item `filter` accepts.
    pub fn with_skip(mut self, filter: impl ItemFilter + 'static) -> Self {
        self.skip = Some(Box::new(filter));
        self
    }
}

impl Traversal for BaseTraversal {
    fn config(&self) -> TraversalConfig {
        self.config
    }

    fn skip(&self, codebase: &Codebase, item: ItemRef<'_>) -> bool {
        self.skip.as_ref().is_some_and(|skip| skip.test(codebase, item))
    }

    fn packages(&self, codebase: &Codebase) -> Vec<PackageId> {
        codebase.packages().map(|p| p.id()).collect()
    }

    fn classes_in_package(&self, codebase: &Codebase, package: PackageId) -> Vec<ClassId> {
        if self.config.preserve_nesting {
            codebase.package(package).top_level_classes().to_vec()
        } else {
            codebase.all_classes_in_package(package)
        }
    }

    fn nested_classes(&self, codebase: &Codebase, class: ClassId) -> Vec<ClassId> {
        codebase.class(class).nested_classes().to_vec()
    }

    fn select_class(&self, codebase: &Codebase, class: ClassId) -> ClassSelection {
        if codebase.class(class).emit() {
            ClassSelection::Emit
        } else {
            ClassSelection::Reference
        }
    }

    fn members(&self, codebase: &Codebase, class: ClassId) -> Rc<ClassMembers> {
        let item = codebase.class(class);
        let mut fields = item.fields().to_vec();
        if item.is_enum() {
            // Stable, so declaration order holds within each group.
            fields.sort_by_key(|id| !codebase.field(*id).is_enum_constant);
        }
        Rc::new(ClassMembers {
            constructors: item.constructors().to_vec(),
            methods: item.methods().to_vec(),
            properties: item.properties().to_vec(),
            fields,
        })
    }
}
