//! Core data structures for the API item graph

use crate::surfaces::ApiVariantSet;
use crate::types::{ClassTypeItem, TypeItem, TypeParameterItem};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

// ── Identifiers ─────────────────────────────────────────────

/// Index of a package within its codebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(pub u32);

/// Index of a class within its codebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

/// Index of a constructor or method within its codebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallableId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId(pub u32);

/// Any addressable item in one codebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemId {
    Package(PackageId),
    Class(ClassId),
    Callable(CallableId),
    Field(FieldId),
    Property(PropertyId),
    Parameter(CallableId, usize),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Package(id) => write!(f, "package#{}", id.0),
            ItemId::Class(id) => write!(f, "class#{}", id.0),
            ItemId::Callable(id) => write!(f, "callable#{}", id.0),
            ItemId::Field(id) => write!(f, "field#{}", id.0),
            ItemId::Property(id) => write!(f, "property#{}", id.0),
            ItemId::Parameter(id, index) => write!(f, "callable#{}/param#{}", id.0, index),
        }
    }
}

// ── Shared item data ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceLocation {
    pub path: Option<PathBuf>,
    pub line: Option<u32>,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, self.line) {
            (Some(path), Some(line)) => write!(f, "{}:{}", path.display(), line),
            (Some(path), None) => write!(f, "{}", path.display()),
            _ => f.write_str("<unknown>"),
        }
    }
}

/// Raw documentation comment attached to an item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Documentation(pub String);

/// `@deprecated` up to the next block tag or the end of the comment.
static DEPRECATED_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\n?[ \t]*\*?[ \t]*@deprecated\b.*?(?:(\n[ \t]*\*?[ \t]*@)|\s*\*/\s*$|\z)")
        .expect("deprecated tag pattern is valid")
});

impl Documentation {
    pub fn new(text: impl Into<String>) -> Self {
        Documentation(text.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn text(&self) -> &str {
        &self.0
    }

    pub fn is_deprecated_in_docs(&self) -> bool {
        self.0.contains("@deprecated")
    }

    /// Copy of the documentation with any `@deprecated` block removed.
    pub fn without_deprecation_text(&self) -> Documentation {
        if !self.is_deprecated_in_docs() {
            return self.clone();
        }
        let stripped = DEPRECATED_TAG.replace_all(&self.0, |caps: &regex::Captures<'_>| {
            match caps.get(1) {
                // Keep the start of the following block tag.
                Some(next_tag) => next_tag.as_str().to_string(),
                None if self.0.trim_end().ends_with("*/") => "\n */".to_string(),
                None => String::new(),
            }
        });
        Documentation(stripped.into_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Private,
    PackagePrivate,
    Protected,
    #[default]
    Public,
}

impl Visibility {
    pub fn keyword(self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::PackagePrivate => "",
            Visibility::Protected => "protected",
            Visibility::Public => "public",
        }
    }
}

/// Closed set of annotation attribute values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnnotationValue {
    Literal(String),
    ClassReference(String),
    EnumConstant(String),
    Array(Vec<AnnotationValue>),
    Annotation(AnnotationItem),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationItem {
    pub qualified_name: String,
    #[serde(default)]
    pub attributes: Vec<(String, AnnotationValue)>,
}

impl AnnotationItem {
    pub fn new(qualified_name: impl Into<String>) -> Self {
        AnnotationItem {
            qualified_name: qualified_name.into(),
            attributes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifierList {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    pub is_default: bool,
    pub is_synchronized: bool,
    pub deprecated: bool,
    pub annotations: Vec<AnnotationItem>,
}

impl ModifierList {
    pub fn public() -> Self {
        ModifierList::default()
    }

    pub fn has_annotation(&self, qualified_name: &str) -> bool {
        self.annotations.iter().any(|a| a.qualified_name == qualified_name)
    }
}

/// Optional link to the item whose shape should be used in place of this
/// one when a flagged API change is rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Showability {
    pub revert_item: Option<ItemId>,
}

/// Data common to every item.
#[derive(Debug, Clone)]
pub struct ItemBase {
    pub location: SourceLocation,
    pub documentation: Documentation,
    pub modifiers: ModifierList,
    /// Include this item's own declaration in the current output.
    pub emit: bool,
    pub hidden: bool,
    pub removed: bool,
    pub selected_api_variants: ApiVariantSet,
    pub showability: Showability,
}

impl ItemBase {
    pub fn new(selected_api_variants: ApiVariantSet) -> Self {
        ItemBase {
            location: SourceLocation::default(),
            documentation: Documentation::default(),
            modifiers: ModifierList::default(),
            emit: true,
            hidden: false,
            removed: false,
            selected_api_variants,
            showability: Showability::default(),
        }
    }
}

/// Behaviour shared by every item kind.
pub trait Item {
    fn base(&self) -> &ItemBase;
    fn base_mut(&mut self) -> &mut ItemBase;
    fn name(&self) -> &str;

    fn emit(&self) -> bool {
        self.base().emit
    }

    fn is_hidden(&self) -> bool {
        self.base().hidden
    }

    fn is_removed(&self) -> bool {
        self.base().removed
    }

    fn is_deprecated(&self) -> bool {
        self.base().modifiers.deprecated
    }

    fn modifiers(&self) -> &ModifierList {
        &self.base().modifiers
    }

    fn documentation(&self) -> &Documentation {
        &self.base().documentation
    }

    fn selected_api_variants(&self) -> &ApiVariantSet {
        &self.base().selected_api_variants
    }
}

// ── Item kinds ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PackageItem {
    pub(crate) id: PackageId,
    pub(crate) name: String,
    pub(crate) top_level_classes: Vec<ClassId>,
    pub base: ItemBase,
}

impl PackageItem {
    pub fn id(&self) -> PackageId {
        self.id
    }

    pub fn top_level_classes(&self) -> &[ClassId] {
        &self.top_level_classes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    #[default]
    Class,
    Interface,
    Enum,
    AnnotationType,
    Record,
}

#[derive(Debug, Clone)]
pub struct ClassItem {
    pub(crate) id: ClassId,
    pub(crate) qualified_name: String,
    pub(crate) simple_name: String,
    pub(crate) package: PackageId,
    pub(crate) containing_class: Option<ClassId>,
    pub(crate) nested_classes: Vec<ClassId>,
    pub(crate) constructors: Vec<CallableId>,
    pub(crate) methods: Vec<CallableId>,
    pub(crate) fields: Vec<FieldId>,
    pub(crate) properties: Vec<PropertyId>,
    pub kind: ClassKind,
    pub super_class: Option<ClassTypeItem>,
    pub interfaces: Vec<ClassTypeItem>,
    pub type_parameters: Vec<TypeParameterItem>,
    pub base: ItemBase,
}

/// Placeholder for ids assigned when an item is inserted into a codebase.
const DETACHED: u32 = u32::MAX;

impl ClassItem {
    /// A class not yet inserted into a codebase. Ownership is assigned by
    /// `Codebase::add_class`/`Codebase::add_nested_class`.
    pub fn new(qualified_name: impl Into<String>, kind: ClassKind, base: ItemBase) -> Self {
        let qualified_name = qualified_name.into();
        let simple_name = qualified_name
            .rsplit('.')
            .next()
            .unwrap_or(&qualified_name)
            .to_string();
        ClassItem {
            id: ClassId(DETACHED),
            qualified_name,
            simple_name,
            package: PackageId(DETACHED),
            containing_class: None,
            nested_classes: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            properties: Vec::new(),
            kind,
            super_class: None,
            interfaces: Vec::new(),
            type_parameters: Vec::new(),
            base,
        }
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }

    pub fn package(&self) -> PackageId {
        self.package
    }

    pub fn containing_class(&self) -> Option<ClassId> {
        self.containing_class
    }

    pub fn nested_classes(&self) -> &[ClassId] {
        &self.nested_classes
    }

    pub fn constructors(&self) -> &[CallableId] {
        &self.constructors
    }

    pub fn methods(&self) -> &[CallableId] {
        &self.methods
    }

    pub fn fields(&self) -> &[FieldId] {
        &self.fields
    }

    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }

    pub fn is_enum(&self) -> bool {
        self.kind == ClassKind::Enum
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.kind, ClassKind::Interface | ClassKind::AnnotationType)
    }

    pub fn has_members(&self) -> bool {
        !(self.constructors.is_empty()
            && self.methods.is_empty()
            && self.fields.is_empty()
            && self.properties.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallableKind {
    Constructor,
    Method,
}

/// Descriptor of a parameter's default value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DefaultValue {
    #[default]
    None,
    /// Has a default whose source is not available.
    Unknown,
    Expression(String),
}

impl DefaultValue {
    pub fn is_present(&self) -> bool {
        !matches!(self, DefaultValue::None)
    }
}

#[derive(Debug, Clone)]
pub struct ParameterItem {
    pub(crate) index: usize,
    pub name: String,
    pub ty: TypeItem,
    pub default_value: DefaultValue,
    pub base: ItemBase,
}

impl ParameterItem {
    pub fn new(name: impl Into<String>, ty: TypeItem, base: ItemBase) -> Self {
        ParameterItem {
            index: 0,
            name: name.into(),
            ty,
            default_value: DefaultValue::None,
            base,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug, Clone)]
pub struct CallableItem {
    pub(crate) id: CallableId,
    pub(crate) kind: CallableKind,
    pub(crate) name: String,
    pub(crate) containing_class: ClassId,
    pub(crate) parameters: Vec<ParameterItem>,
    pub return_type: TypeItem,
    pub type_parameters: Vec<TypeParameterItem>,
    pub throws: Vec<TypeItem>,
    pub base: ItemBase,
}

impl CallableItem {
    /// A callable not yet inserted into a codebase. Parameter indices are
    /// assigned from their position.
    pub fn new(
        kind: CallableKind,
        name: impl Into<String>,
        return_type: TypeItem,
        parameters: Vec<ParameterItem>,
        base: ItemBase,
    ) -> Self {
        let parameters = parameters
            .into_iter()
            .enumerate()
            .map(|(index, mut parameter)| {
                parameter.index = index;
                parameter
            })
            .collect();
        CallableItem {
            id: CallableId(DETACHED),
            kind,
            name: name.into(),
            containing_class: ClassId(DETACHED),
            parameters,
            return_type,
            type_parameters: Vec::new(),
            throws: Vec::new(),
            base,
        }
    }

    pub fn id(&self) -> CallableId {
        self.id
    }

    pub fn kind(&self) -> CallableKind {
        self.kind
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == CallableKind::Constructor
    }

    pub fn containing_class(&self) -> ClassId {
        self.containing_class
    }

    pub fn parameters(&self) -> &[ParameterItem] {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> impl Iterator<Item = &mut ItemBase> {
        self.parameters.iter_mut().map(|p| &mut p.base)
    }

    /// `name(erased, parameter, types)`, the identity of a callable within
    /// its class.
    pub fn descriptor(&self) -> String {
        descriptor_of(&self.name, &self.parameters)
    }
}

/// Descriptor of a callable named `name` taking `parameters`.
pub fn descriptor_of(name: &str, parameters: &[ParameterItem]) -> String {
    let params: Vec<String> = parameters.iter().map(|p| p.ty.erased()).collect();
    format!("{}({})", name, params.join(","))
}

#[derive(Debug, Clone)]
pub struct FieldItem {
    pub(crate) id: FieldId,
    pub(crate) name: String,
    pub(crate) containing_class: ClassId,
    pub ty: TypeItem,
    pub is_enum_constant: bool,
    pub initial_value: Option<String>,
    pub base: ItemBase,
}

impl FieldItem {
    pub fn new(name: impl Into<String>, ty: TypeItem, base: ItemBase) -> Self {
        FieldItem {
            id: FieldId(DETACHED),
            name: name.into(),
            containing_class: ClassId(DETACHED),
            ty,
            is_enum_constant: false,
            initial_value: None,
            base,
        }
    }

    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn containing_class(&self) -> ClassId {
        self.containing_class
    }
}

#[derive(Debug, Clone)]
pub struct PropertyItem {
    pub(crate) id: PropertyId,
    pub(crate) name: String,
    pub(crate) containing_class: ClassId,
    pub ty: TypeItem,
    pub base: ItemBase,
}

impl PropertyItem {
    pub fn new(name: impl Into<String>, ty: TypeItem, base: ItemBase) -> Self {
        PropertyItem {
            id: PropertyId(DETACHED),
            name: name.into(),
            containing_class: ClassId(DETACHED),
            ty,
            base,
        }
    }

    pub fn id(&self) -> PropertyId {
        self.id
    }

    pub fn containing_class(&self) -> ClassId {
        self.containing_class
    }
}

macro_rules! impl_item {
    ($($ty:ty => $name:ident),* $(,)?) => {
        $(
            impl Item for $ty {
                fn base(&self) -> &ItemBase {
                    &self.base
                }

                fn base_mut(&mut self) -> &mut ItemBase {
                    &mut self.base
                }

                fn name(&self) -> &str {
                    &self.$name
                }
            }
        )*
    };
}

impl_item! {
    PackageItem => name,
    ClassItem => simple_name,
    CallableItem => name,
    FieldItem => name,
    PropertyItem => name,
    ParameterItem => name,
}

/// Borrowed view of any item, used by filters and predicates.
#[derive(Debug, Clone, Copy)]
pub enum ItemRef<'a> {
    Package(&'a PackageItem),
    Class(&'a ClassItem),
    Callable(&'a CallableItem),
    Field(&'a FieldItem),
    Property(&'a PropertyItem),
    Parameter(&'a CallableItem, &'a ParameterItem),
}

impl<'a> ItemRef<'a> {
    pub fn base(&self) -> &'a ItemBase {
        match *self {
            ItemRef::Package(item) => &item.base,
            ItemRef::Class(item) => &item.base,
            ItemRef::Callable(item) => &item.base,
            ItemRef::Field(item) => &item.base,
            ItemRef::Property(item) => &item.base,
            ItemRef::Parameter(_, item) => &item.base,
        }
    }

    pub fn name(&self) -> &'a str {
        match *self {
            ItemRef::Package(item) => &item.name,
            ItemRef::Class(item) => &item.simple_name,
            ItemRef::Callable(item) => &item.name,
            ItemRef::Field(item) => &item.name,
            ItemRef::Property(item) => &item.name,
            ItemRef::Parameter(_, item) => &item.name,
        }
    }

    pub fn id(&self) -> ItemId {
        match *self {
            ItemRef::Package(item) => ItemId::Package(item.id),
            ItemRef::Class(item) => ItemId::Class(item.id),
            ItemRef::Callable(item) => ItemId::Callable(item.id),
            ItemRef::Field(item) => ItemId::Field(item.id),
            ItemRef::Property(item) => ItemId::Property(item.id),
            ItemRef::Parameter(callable, item) => ItemId::Parameter(callable.id, item.index),
        }
    }

    pub fn emit(&self) -> bool {
        self.base().emit
    }

    pub fn is_hidden(&self) -> bool {
        self.base().hidden
    }

    pub fn is_removed(&self) -> bool {
        self.base().removed
    }

    /// The class that owns this item, if it is a class member or a class.
    pub fn class_id(&self) -> Option<ClassId> {
        match *self {
            ItemRef::Package(_) => None,
            ItemRef::Class(item) => Some(item.id),
            ItemRef::Callable(item) | ItemRef::Parameter(item, _) => Some(item.containing_class),
            ItemRef::Field(item) => Some(item.containing_class),
            ItemRef::Property(item) => Some(item.containing_class),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_deprecation_from_javadoc() {
        let docs = Documentation::new(
            "/**\n * Does a thing.\n * @deprecated use other() instead\n * @param x the x\n */",
        );
        let stripped = docs.without_deprecation_text();
        assert!(!stripped.is_deprecated_in_docs());
        assert!(stripped.text().contains("Does a thing."));
        assert!(stripped.text().contains("@param x the x"));
    }

    #[test]
    fn test_strip_trailing_deprecation() {
        let docs = Documentation::new("/**\n * Does a thing.\n * @deprecated gone soon\n */");
        let stripped = docs.without_deprecation_text();
        assert!(!stripped.is_deprecated_in_docs());
        assert!(stripped.text().starts_with("/**\n * Does a thing."));
        assert!(stripped.text().trim_end().ends_with("*/"));
    }

    #[test]
    fn test_docs_without_deprecation_are_untouched() {
        let docs = Documentation::new("Plain text");
        assert_eq!(docs.without_deprecation_text(), docs);
    }

    #[test]
    fn test_visibility_ordering() {
        assert!(Visibility::Public > Visibility::Protected);
        assert!(Visibility::Protected > Visibility::PackagePrivate);
        assert!(Visibility::PackagePrivate > Visibility::Private);
    }
}
