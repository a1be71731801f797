//! JSON interchange document for populated codebases.
//!
//! The document mirrors the containment tree: packages hold classes, classes
//! hold members and nested classes. Variant selections use the canonical
//! `ApiVariantSet[...]` text and revert links use the item's description
//! (`a.b.C`, `a.b.C#m(int)`, `a.b.C#FIELD`).

use crate::codebase::Codebase;
use crate::error::{GraphError, Result};
use crate::model::*;
use crate::surfaces::ApiSurfaces;
use crate::types::{ClassTypeItem, TypeItem, TypeParameterItem};
use serde::{Deserialize, Serialize};
use tracing::debug;

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_true(value: &bool) -> bool {
    *value
}

fn default_true() -> bool {
    true
}

/// Item data shared by every entry in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDocument {
    #[serde(default, skip_serializing_if = "Documentation::is_empty")]
    pub documentation: Documentation,
    #[serde(default)]
    pub modifiers: ModifierList,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub emit: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub removed: bool,
    /// Canonical variant set; absent means the core variant of the main
    /// surface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverts_to: Option<String>,
}

impl Default for ItemDocument {
    fn default() -> Self {
        ItemDocument {
            documentation: Documentation::default(),
            modifiers: ModifierList::default(),
            emit: true,
            hidden: false,
            removed: false,
            variants: None,
            location: None,
            reverts_to: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeItem,
    #[serde(default, skip_serializing_if = "is_absent")]
    pub default_value: DefaultValue,
    #[serde(flatten)]
    pub item: ItemDocument,
}

fn is_absent(value: &DefaultValue) -> bool {
    !value.is_present()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallableDocument {
    pub name: String,
    /// Constructors may omit this; it defaults to the owning class type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<TypeItem>,
    #[serde(default)]
    pub parameters: Vec<ParameterDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_parameters: Vec<TypeParameterItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub throws: Vec<TypeItem>,
    #[serde(flatten)]
    pub item: ItemDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeItem,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_enum_constant: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<String>,
    #[serde(flatten)]
    pub item: ItemDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeItem,
    #[serde(flatten)]
    pub item: ItemDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDocument {
    pub qualified_name: String,
    #[serde(default)]
    pub kind: ClassKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_class: Option<ClassTypeItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<ClassTypeItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_parameters: Vec<TypeParameterItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constructors: Vec<CallableDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<CallableDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested_classes: Vec<ClassDocument>,
    #[serde(flatten)]
    pub item: ItemDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDocument {
    pub name: String,
    #[serde(default)]
    pub classes: Vec<ClassDocument>,
    #[serde(flatten)]
    pub item: ItemDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodebaseDocument {
    pub description: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub pre_filtered: bool,
    #[serde(default)]
    pub packages: Vec<PackageDocument>,
}

/// Revert links are resolved once every item exists.
struct PendingRevert {
    item: ItemId,
    target: String,
}

impl CodebaseDocument {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| GraphError::InvalidDocument(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| GraphError::InvalidDocument(e.to_string()))
    }

    /// Populate a new codebase using `surfaces` to interpret variant sets.
    pub fn into_codebase(self, surfaces: &ApiSurfaces) -> Result<Codebase> {
        let mut codebase = Codebase::new(self.description, surfaces.clone());
        codebase.set_pre_filtered(self.pre_filtered);
        let mut reverts = Vec::new();

        for package in self.packages {
            let id = codebase.find_or_create_package(&package.name);
            let base = item_base(&codebase, package.item, ItemId::Package(id), &mut reverts)?;
            if let Some(slot) = codebase.base_mut(ItemId::Package(id)) {
                *slot = base;
            }
            for class in package.classes {
                insert_class(&mut codebase, ClassOwner::Package(id), class, &mut reverts)?;
            }
        }

        for revert in reverts {
            let target = resolve_description(&codebase, revert.item, &revert.target).ok_or_else(|| {
                GraphError::InvalidDocument(format!(
                    "{} reverts to unknown item '{}'",
                    codebase.describe(revert.item),
                    revert.target
                ))
            })?;
            if let Some(base) = codebase.base_mut(revert.item) {
                base.showability.revert_item = Some(target);
            }
        }

        debug!("Loaded document '{}' with {} items", codebase.description(), codebase.item_count());
        Ok(codebase)
    }

    /// Describe `codebase` as a document.
    pub fn from_codebase(codebase: &Codebase) -> Self {
        let packages = codebase
            .packages()
            .map(|package| PackageDocument {
                name: package.name().to_string(),
                classes: codebase
                    .top_level_classes(package.id())
                    .map(|class| class_document(codebase, class))
                    .collect(),
                item: item_document(codebase, &package.base),
            })
            .collect();

        CodebaseDocument {
            description: codebase.description().to_string(),
            pre_filtered: codebase.is_pre_filtered(),
            packages,
        }
    }
}

enum ClassOwner {
    Package(PackageId),
    Class(ClassId),
}

fn item_base(
    codebase: &Codebase,
    doc: ItemDocument,
    id: ItemId,
    reverts: &mut Vec<PendingRevert>,
) -> Result<ItemBase> {
    let surfaces = codebase.api_surfaces();
    let selected = match &doc.variants {
        Some(text) => surfaces.parse_variant_set(text)?,
        None => surfaces.main_core(),
    };
    if let Some(target) = doc.reverts_to {
        reverts.push(PendingRevert { item: id, target });
    }
    Ok(ItemBase {
        location: doc.location.unwrap_or_default(),
        documentation: doc.documentation,
        modifiers: doc.modifiers,
        emit: doc.emit,
        hidden: doc.hidden,
        removed: doc.removed,
        selected_api_variants: selected,
        showability: Showability::default(),
    })
}

fn insert_class(
    codebase: &mut Codebase,
    owner: ClassOwner,
    doc: ClassDocument,
    reverts: &mut Vec<PendingRevert>,
) -> Result<ClassId> {
    // Ids are assigned on insertion; the revert entry is patched afterwards.
    let mut pending = Vec::new();
    let base = item_base(codebase, doc.item, ItemId::Class(ClassId(0)), &mut pending)?;
    let mut class = ClassItem::new(doc.qualified_name.clone(), doc.kind, base);
    class.super_class = doc.super_class;
    class.interfaces = doc.interfaces;
    class.type_parameters = doc.type_parameters;

    let id = match owner {
        ClassOwner::Package(package) => codebase.add_class(package, class)?,
        ClassOwner::Class(outer) => codebase.add_nested_class(outer, class)?,
    };
    reverts.extend(pending.into_iter().map(|revert| PendingRevert {
        item: ItemId::Class(id),
        target: revert.target,
    }));

    for constructor in doc.constructors {
        let return_type = TypeItem::class(doc.qualified_name.clone());
        insert_callable(codebase, id, CallableKind::Constructor, constructor, return_type, reverts)?;
    }
    for method in doc.methods {
        insert_callable(codebase, id, CallableKind::Method, method, TypeItem::void(), reverts)?;
    }
    for field in doc.fields {
        let mut pending = Vec::new();
        let base = item_base(codebase, field.item, ItemId::Field(FieldId(0)), &mut pending)?;
        let mut item = FieldItem::new(field.name, field.ty, base);
        item.is_enum_constant = field.is_enum_constant;
        item.initial_value = field.initial_value;
        let field_id = codebase.add_field(id, item)?;
        reverts.extend(pending.into_iter().map(|revert| PendingRevert {
            item: ItemId::Field(field_id),
            target: revert.target,
        }));
    }
    for property in doc.properties {
        let mut pending = Vec::new();
        let base = item_base(codebase, property.item, ItemId::Property(PropertyId(0)), &mut pending)?;
        let property_id = codebase.add_property(id, PropertyItem::new(property.name, property.ty, base))?;
        reverts.extend(pending.into_iter().map(|revert| PendingRevert {
            item: ItemId::Property(property_id),
            target: revert.target,
        }));
    }
    for nested in doc.nested_classes {
        insert_class(codebase, ClassOwner::Class(id), nested, reverts)?;
    }
    Ok(id)
}

fn insert_callable(
    codebase: &mut Codebase,
    class: ClassId,
    kind: CallableKind,
    doc: CallableDocument,
    default_return: TypeItem,
    reverts: &mut Vec<PendingRevert>,
) -> Result<CallableId> {
    let mut pending = Vec::new();
    let base = item_base(codebase, doc.item, ItemId::Callable(CallableId(0)), &mut pending)?;
    let mut parameters = Vec::with_capacity(doc.parameters.len());
    for parameter in doc.parameters {
        // Parameters do not carry revert links of their own.
        let mut ignored = Vec::new();
        let base = item_base(codebase, parameter.item, ItemId::Parameter(CallableId(0), 0), &mut ignored)?;
        let mut item = ParameterItem::new(parameter.name, parameter.ty, base);
        item.default_value = parameter.default_value;
        parameters.push(item);
    }

    let mut callable = CallableItem::new(
        kind,
        doc.name,
        doc.return_type.unwrap_or(default_return),
        parameters,
        base,
    );
    callable.type_parameters = doc.type_parameters;
    callable.throws = doc.throws;

    let id = codebase.add_callable(class, callable)?;
    reverts.extend(pending.into_iter().map(|revert| PendingRevert {
        item: ItemId::Callable(id),
        target: revert.target,
    }));
    Ok(id)
}

/// Find the item of the same kind as `item` named by `description`.
fn resolve_description(codebase: &Codebase, item: ItemId, description: &str) -> Option<ItemId> {
    match item {
        ItemId::Package(_) => codebase.find_package(description).map(|p| ItemId::Package(p.id())),
        ItemId::Class(_) => codebase.find_class_id(description).map(ItemId::Class),
        ItemId::Callable(_) | ItemId::Field(_) | ItemId::Property(_) => {
            let (class, member) = description.split_once('#')?;
            let class = codebase.find_class_id(class)?;
            match item {
                ItemId::Callable(_) => codebase.find_callable(class, member).map(|c| ItemId::Callable(c.id())),
                ItemId::Field(_) => codebase.find_field(class, member).map(|f| ItemId::Field(f.id())),
                _ => codebase.find_property(class, member).map(|p| ItemId::Property(p.id())),
            }
        }
        ItemId::Parameter(..) => None,
    }
}

fn item_document(codebase: &Codebase, base: &ItemBase) -> ItemDocument {
    let location = (base.location != SourceLocation::default()).then(|| base.location.clone());
    ItemDocument {
        documentation: base.documentation.clone(),
        modifiers: base.modifiers.clone(),
        emit: base.emit,
        hidden: base.hidden,
        removed: base.removed,
        variants: Some(base.selected_api_variants.to_string()),
        location,
        reverts_to: base.showability.revert_item.map(|id| codebase.describe(id)),
    }
}

fn callable_document(codebase: &Codebase, callable: &CallableItem) -> CallableDocument {
    CallableDocument {
        name: callable.name().to_string(),
        return_type: Some(callable.return_type.clone()),
        parameters: callable
            .parameters()
            .iter()
            .map(|parameter| ParameterDocument {
                name: parameter.name.clone(),
                ty: parameter.ty.clone(),
                default_value: parameter.default_value.clone(),
                item: item_document(codebase, &parameter.base),
            })
            .collect(),
        type_parameters: callable.type_parameters.clone(),
        throws: callable.throws.clone(),
        item: item_document(codebase, &callable.base),
    }
}

fn class_document(codebase: &Codebase, class: &ClassItem) -> ClassDocument {
    let id = class.id();
    ClassDocument {
        qualified_name: class.qualified_name().to_string(),
        kind: class.kind,
        super_class: class.super_class.clone(),
        interfaces: class.interfaces.clone(),
        type_parameters: class.type_parameters.clone(),
        constructors: codebase.constructors(id).map(|c| callable_document(codebase, c)).collect(),
        methods: codebase.methods(id).map(|m| callable_document(codebase, m)).collect(),
        fields: codebase
            .fields_of(id)
            .map(|field| FieldDocument {
                name: field.name().to_string(),
                ty: field.ty.clone(),
                is_enum_constant: field.is_enum_constant,
                initial_value: field.initial_value.clone(),
                item: item_document(codebase, &field.base),
            })
            .collect(),
        properties: codebase
            .properties_of(id)
            .map(|property| PropertyDocument {
                name: property.name().to_string(),
                ty: property.ty.clone(),
                item: item_document(codebase, &property.base),
            })
            .collect(),
        nested_classes: codebase
            .nested_classes(id)
            .map(|nested| class_document(codebase, nested))
            .collect(),
        item: item_document(codebase, &class.base),
    }
}
