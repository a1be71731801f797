//! Structural comparison of two codebases

use apigraph_core::{
    CallableItem, ClassItem, Codebase, FieldItem, Item, ItemRef, PackageItem, ParameterItem, PropertyItem, Result,
};
use apigraph_visit::ItemFilter;
use std::cmp::Ordering;
use tracing::debug;

/// The two codebases being compared, handed to every callback.
#[derive(Debug, Clone, Copy)]
pub struct CompareContext<'a> {
    pub old: &'a Codebase,
    pub new: &'a Codebase,
}

/// Callbacks invoked by [`CodebaseComparator`].
///
/// `compare_*` is called for items present on both sides, `added_*` for
/// items only in the new codebase and `removed_*` for items only in the old
/// one. An added or removed package or class is reported once; its contents
/// are not reported separately.
pub trait ComparisonVisitor {
    fn compare_package(&mut self, cx: CompareContext<'_>, old: &PackageItem, new: &PackageItem) -> Result<()> {
        let _ = (cx, old, new);
        Ok(())
    }

    fn added_package(&mut self, cx: CompareContext<'_>, new: &PackageItem) -> Result<()> {
        let _ = (cx, new);
        Ok(())
    }

    fn removed_package(&mut self, cx: CompareContext<'_>, old: &PackageItem) -> Result<()> {
        let _ = (cx, old);
        Ok(())
    }

    fn compare_class(&mut self, cx: CompareContext<'_>, old: &ClassItem, new: &ClassItem) -> Result<()> {
        let _ = (cx, old, new);
        Ok(())
    }

    fn added_class(&mut self, cx: CompareContext<'_>, new: &ClassItem) -> Result<()> {
        let _ = (cx, new);
        Ok(())
    }

    fn removed_class(&mut self, cx: CompareContext<'_>, old: &ClassItem) -> Result<()> {
        let _ = (cx, old);
        Ok(())
    }

    fn compare_callable(&mut self, cx: CompareContext<'_>, old: &CallableItem, new: &CallableItem) -> Result<()> {
        let _ = (cx, old, new);
        Ok(())
    }

    fn added_callable(&mut self, cx: CompareContext<'_>, new: &CallableItem) -> Result<()> {
        let _ = (cx, new);
        Ok(())
    }

    fn removed_callable(&mut self, cx: CompareContext<'_>, old: &CallableItem) -> Result<()> {
        let _ = (cx, old);
        Ok(())
    }

    /// Parameters of matched callables, paired by position.
    fn compare_parameter(
        &mut self,
        cx: CompareContext<'_>,
        callable: &CallableItem,
        old: &ParameterItem,
        new: &ParameterItem,
    ) -> Result<()> {
        let _ = (cx, callable, old, new);
        Ok(())
    }

    fn compare_field(&mut self, cx: CompareContext<'_>, old: &FieldItem, new: &FieldItem) -> Result<()> {
        let _ = (cx, old, new);
        Ok(())
    }

    fn added_field(&mut self, cx: CompareContext<'_>, new: &FieldItem) -> Result<()> {
        let _ = (cx, new);
        Ok(())
    }

    fn removed_field(&mut self, cx: CompareContext<'_>, old: &FieldItem) -> Result<()> {
        let _ = (cx, old);
        Ok(())
    }

    fn compare_property(&mut self, cx: CompareContext<'_>, old: &PropertyItem, new: &PropertyItem) -> Result<()> {
        let _ = (cx, old, new);
        Ok(())
    }

    fn added_property(&mut self, cx: CompareContext<'_>, new: &PropertyItem) -> Result<()> {
        let _ = (cx, new);
        Ok(())
    }

    fn removed_property(&mut self, cx: CompareContext<'_>, old: &PropertyItem) -> Result<()> {
        let _ = (cx, old);
        Ok(())
    }
}

/// One step of a sorted merge.
enum Matched<'a, T> {
    Both(&'a T, &'a T),
    Old(&'a T),
    New(&'a T),
}

/// Sort both sides by `key` and pair up equal keys.
fn merge<'a, T, K, F>(mut old: Vec<&'a T>, mut new: Vec<&'a T>, key: F) -> Vec<Matched<'a, T>>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    old.sort_by_key(|item| key(item));
    new.sort_by_key(|item| key(item));

    let mut merged = Vec::with_capacity(old.len().max(new.len()));
    let mut old = old.into_iter().peekable();
    let mut new = new.into_iter().peekable();
    loop {
        let order = match (old.peek(), new.peek()) {
            (Some(o), Some(n)) => key(o).cmp(&key(n)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };
        match order {
            Ordering::Less => merged.extend(old.next().map(Matched::Old)),
            Ordering::Greater => merged.extend(new.next().map(Matched::New)),
            Ordering::Equal => {
                if let (Some(o), Some(n)) = (old.next(), new.next()) {
                    merged.push(Matched::Both(o, n));
                }
            }
        }
    }
    merged
}

fn classes_in<'a>(codebase: &'a Codebase, package: &PackageItem) -> Vec<&'a ClassItem> {
    codebase
        .all_classes_in_package(package.id())
        .into_iter()
        .map(|id| codebase.class(id))
        .collect()
}

fn callables_of<'a>(codebase: &'a Codebase, class: &ClassItem) -> Vec<&'a CallableItem> {
    codebase.constructors(class.id()).chain(codebase.methods(class.id())).collect()
}

/// Walks two codebases in parallel, matching packages by name, classes by
/// qualified name, callables by kind and descriptor and fields and
/// properties by name.
///
/// Classes are matched per package regardless of nesting. The optional
/// filter is applied to old items before a `removed_*` callback; matched
/// and added items are always reported.
#[derive(Default)]
pub struct CodebaseComparator {
    filter: Option<Box<dyn ItemFilter>>,
}

impl CodebaseComparator {
    pub fn new() -> Self {
        CodebaseComparator::default()
    }

    pub fn with_filter(mut self, filter: impl ItemFilter + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    fn report_removal(&self, old: &Codebase, item: ItemRef<'_>) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter.test(old, item))
    }

    pub fn compare<V>(&self, old: &Codebase, new: &Codebase, visitor: &mut V) -> Result<()>
    where
        V: ComparisonVisitor + ?Sized,
    {
        let cx = CompareContext { old, new };
        debug!("Comparing {} with {}", old.description(), new.description());

        let old_packages = old.packages().collect();
        let new_packages = new.packages().collect();
        for step in merge(old_packages, new_packages, |p: &PackageItem| p.name().to_string()) {
            match step {
                Matched::Both(o, n) => {
                    visitor.compare_package(cx, o, n)?;
                    self.compare_classes(cx, o, n, visitor)?;
                }
                Matched::Old(o) => {
                    if self.report_removal(old, ItemRef::Package(o)) {
                        visitor.removed_package(cx, o)?;
                    }
                }
                Matched::New(n) => visitor.added_package(cx, n)?,
            }
        }
        Ok(())
    }

    fn compare_classes<V>(
        &self,
        cx: CompareContext<'_>,
        old: &PackageItem,
        new: &PackageItem,
        visitor: &mut V,
    ) -> Result<()>
    where
        V: ComparisonVisitor + ?Sized,
    {
        let old_classes = classes_in(cx.old, old);
        let new_classes = classes_in(cx.new, new);

        for step in merge(old_classes, new_classes, |c: &ClassItem| c.qualified_name().to_string()) {
            match step {
                Matched::Both(o, n) => {
                    visitor.compare_class(cx, o, n)?;
                    self.compare_members(cx, o, n, visitor)?;
                }
                Matched::Old(o) => {
                    if self.report_removal(cx.old, ItemRef::Class(o)) {
                        visitor.removed_class(cx, o)?;
                    }
                }
                Matched::New(n) => visitor.added_class(cx, n)?,
            }
        }
        Ok(())
    }

    fn compare_members<V>(&self, cx: CompareContext<'_>, old: &ClassItem, new: &ClassItem, visitor: &mut V) -> Result<()>
    where
        V: ComparisonVisitor + ?Sized,
    {
        let old_callables = callables_of(cx.old, old);
        let new_callables = callables_of(cx.new, new);
        for step in merge(old_callables, new_callables, |c: &CallableItem| (c.kind(), c.descriptor())) {
            match step {
                Matched::Both(o, n) => {
                    visitor.compare_callable(cx, o, n)?;
                    for (old_parameter, new_parameter) in o.parameters().iter().zip(n.parameters()) {
                        visitor.compare_parameter(cx, n, old_parameter, new_parameter)?;
                    }
                }
                Matched::Old(o) => {
                    if self.report_removal(cx.old, ItemRef::Callable(o)) {
                        visitor.removed_callable(cx, o)?;
                    }
                }
                Matched::New(n) => visitor.added_callable(cx, n)?,
            }
        }

        let old_fields = cx.old.fields_of(old.id()).collect();
        let new_fields = cx.new.fields_of(new.id()).collect();
        for step in merge(old_fields, new_fields, |f: &FieldItem| f.name().to_string()) {
            match step {
                Matched::Both(o, n) => visitor.compare_field(cx, o, n)?,
                Matched::Old(o) => {
                    if self.report_removal(cx.old, ItemRef::Field(o)) {
                        visitor.removed_field(cx, o)?;
                    }
                }
                Matched::New(n) => visitor.added_field(cx, n)?,
            }
        }

        let old_properties = cx.old.properties_of(old.id()).collect();
        let new_properties = cx.new.properties_of(new.id()).collect();
        for step in merge(old_properties, new_properties, |p: &PropertyItem| p.name().to_string()) {
            match step {
                Matched::Both(o, n) => visitor.compare_property(cx, o, n)?,
                Matched::Old(o) => {
                    if self.report_removal(cx.old, ItemRef::Property(o)) {
                        visitor.removed_property(cx, o)?;
                    }
                }
                Matched::New(n) => visitor.added_property(cx, n)?,
            }
        }
        Ok(())
    }
}
