//! Sort orders used for filtered traversals and reports

use apigraph_core::{CallableItem, ClassItem, FieldItem, Item, PackageItem, PropertyItem};
use std::cmp::Ordering;

/// By name, then parameter types, then arity.
pub fn compare_callables(a: &CallableItem, b: &CallableItem) -> Ordering {
    a.name()
        .cmp(b.name())
        .then_with(|| {
            let left = a.parameters().iter().map(|p| p.ty.erased());
            let right = b.parameters().iter().map(|p| p.ty.erased());
            left.cmp(right)
        })
        .then_with(|| a.parameters().len().cmp(&b.parameters().len()))
}

/// Enum constants first, then by name.
pub fn compare_fields(a: &FieldItem, b: &FieldItem) -> Ordering {
    b.is_enum_constant
        .cmp(&a.is_enum_constant)
        .then_with(|| a.name().cmp(b.name()))
}

pub fn compare_properties(a: &PropertyItem, b: &PropertyItem) -> Ordering {
    a.name().cmp(b.name())
}

pub fn compare_classes(a: &ClassItem, b: &ClassItem) -> Ordering {
    a.qualified_name().cmp(b.qualified_name())
}

pub fn compare_packages(a: &PackageItem, b: &PackageItem) -> Ordering {
    a.name().cmp(b.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use apigraph_core::test_utils::{int, string};
    use apigraph_core::{ApiSurfaces, CallableKind, ParameterItem, TypeItem};

    fn method(name: &str, parameters: Vec<TypeItem>) -> CallableItem {
        let base = apigraph_core::ItemBase::new(ApiSurfaces::create(false).empty_variant_set());
        let parameters = parameters
            .into_iter()
            .enumerate()
            .map(|(i, ty)| ParameterItem::new(format!("p{}", i), ty, base.clone()))
            .collect();
        CallableItem::new(CallableKind::Method, name, TypeItem::void(), parameters, base)
    }

    #[test]
    fn test_callables_order_by_name_then_parameters() {
        let mut callables = vec![
            method("b", vec![]),
            method("a", vec![string()]),
            method("a", vec![int(), int()]),
            method("a", vec![int()]),
        ];
        callables.sort_by(compare_callables);
        let descriptors: Vec<String> = callables.iter().map(|c| c.descriptor()).collect();
        assert_eq!(descriptors, vec!["a(int)", "a(int,int)", "a(java.lang.String)", "b()"]);
    }

    #[test]
    fn test_enum_constants_sort_first() {
        let base = apigraph_core::ItemBase::new(ApiSurfaces::create(false).empty_variant_set());
        let mut plain = FieldItem::new("A_FIELD", int(), base.clone());
        plain.is_enum_constant = false;
        let mut constant = FieldItem::new("Z_CONSTANT", int(), base);
        constant.is_enum_constant = true;

        assert_eq!(compare_fields(&constant, &plain), Ordering::Less);
        assert_eq!(compare_fields(&plain, &constant), Ordering::Greater);
    }
}
