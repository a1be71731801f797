//! Item predicates used by traversals and the comparator

use apigraph_core::{ApiSurface, Codebase, Item, ItemRef, PackageMatcher};
use std::rc::Rc;

/// A total predicate over items.
///
/// Implementations must not panic; a panicking filter aborts the whole
/// traversal.
pub trait ItemFilter {
    fn test(&self, codebase: &Codebase, item: ItemRef<'_>) -> bool;
}

impl<T: ItemFilter + ?Sized> ItemFilter for Box<T> {
    fn test(&self, codebase: &Codebase, item: ItemRef<'_>) -> bool {
        (**self).test(codebase, item)
    }
}

impl<T: ItemFilter + ?Sized> ItemFilter for Rc<T> {
    fn test(&self, codebase: &Codebase, item: ItemRef<'_>) -> bool {
        (**self).test(codebase, item)
    }
}

impl<T: ItemFilter + ?Sized> ItemFilter for &T {
    fn test(&self, codebase: &Codebase, item: ItemRef<'_>) -> bool {
        (**self).test(codebase, item)
    }
}

/// Filter backed by a closure.
pub struct FnFilter<F>(F);

pub fn from_fn<F>(f: F) -> FnFilter<F>
where
    F: Fn(&Codebase, ItemRef<'_>) -> bool,
{
    FnFilter(f)
}

impl<F> ItemFilter for FnFilter<F>
where
    F: Fn(&Codebase, ItemRef<'_>) -> bool,
{
    fn test(&self, codebase: &Codebase, item: ItemRef<'_>) -> bool {
        (self.0)(codebase, item)
    }
}

pub struct And<A, B>(A, B);

impl<A: ItemFilter, B: ItemFilter> ItemFilter for And<A, B> {
    fn test(&self, codebase: &Codebase, item: ItemRef<'_>) -> bool {
        self.0.test(codebase, item) && self.1.test(codebase, item)
    }
}

pub struct Or<A, B>(A, B);

impl<A: ItemFilter, B: ItemFilter> ItemFilter for Or<A, B> {
    fn test(&self, codebase: &Codebase, item: ItemRef<'_>) -> bool {
        self.0.test(codebase, item) || self.1.test(codebase, item)
    }
}

pub struct Not<A>(A);

impl<A: ItemFilter> ItemFilter for Not<A> {
    fn test(&self, codebase: &Codebase, item: ItemRef<'_>) -> bool {
        !self.0.test(codebase, item)
    }
}

/// Combinators available on every filter.
pub trait ItemFilterExt: ItemFilter + Sized {
    fn and<B: ItemFilter>(self, other: B) -> And<Self, B> {
        And(self, other)
    }

    fn or<B: ItemFilter>(self, other: B) -> Or<Self, B> {
        Or(self, other)
    }

    fn not(self) -> Not<Self> {
        Not(self)
    }

    fn boxed(self) -> Box<dyn ItemFilter>
    where
        Self: 'static,
    {
        Box::new(self)
    }
}

impl<T: ItemFilter + Sized> ItemFilterExt for T {}

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ItemFilter for AcceptAll {
    fn test(&self, _codebase: &Codebase, _item: ItemRef<'_>) -> bool {
        true
    }
}

/// Accepts items whose `emit` flag is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmitFilter;

impl ItemFilter for EmitFilter {
    fn test(&self, _codebase: &Codebase, item: ItemRef<'_>) -> bool {
        item.emit()
    }
}

/// Rejects hidden and removed items.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotHiddenFilter;

impl ItemFilter for NotHiddenFilter {
    fn test(&self, _codebase: &Codebase, item: ItemRef<'_>) -> bool {
        !item.is_hidden() && !item.is_removed()
    }
}

/// Accepts items selected into any variant of one surface.
#[derive(Debug, Clone)]
pub struct SurfaceFilter {
    surface: ApiSurface,
}

impl SurfaceFilter {
    pub fn new(surface: &ApiSurface) -> Self {
        SurfaceFilter {
            surface: surface.clone(),
        }
    }
}

impl ItemFilter for SurfaceFilter {
    fn test(&self, _codebase: &Codebase, item: ItemRef<'_>) -> bool {
        item.base().selected_api_variants.contains_any(&self.surface)
    }
}

/// Accepts items by the name of the package they live in.
#[derive(Debug, Clone)]
pub struct PackageFilter {
    matcher: PackageMatcher,
    exclude: bool,
}

impl PackageFilter {
    /// Accept only items in packages matching `matcher`.
    pub fn including(matcher: PackageMatcher) -> Self {
        PackageFilter { matcher, exclude: false }
    }

    /// Reject items in packages matching `matcher`.
    pub fn excluding(matcher: PackageMatcher) -> Self {
        PackageFilter { matcher, exclude: true }
    }
}

/// Name of the package `item` belongs to.
pub fn package_name<'a>(codebase: &'a Codebase, item: ItemRef<'a>) -> &'a str {
    match item {
        ItemRef::Package(package) => package.name(),
        other => {
            // Every non-package item has an owning class.
            let class = other.class_id().map(|id| codebase.class(id));
            class.map(|c| codebase.package(c.package()).name()).unwrap_or("")
        }
    }
}

impl ItemFilter for PackageFilter {
    fn test(&self, codebase: &Codebase, item: ItemRef<'_>) -> bool {
        self.matcher.is_match(package_name(codebase, item)) != self.exclude
    }
}
