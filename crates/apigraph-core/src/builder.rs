//! Fluent construction of classes and their members

use crate::codebase::Codebase;
use crate::error::Result;
use crate::model::*;
use crate::surfaces::ApiVariantSet;
use crate::types::{ClassTypeItem, TypeItem, TypeParameterItem};

enum PendingMember {
    Callable(CallableItem),
    Field(FieldItem),
    Property(PropertyItem),
}

/// Builds one class, inserts it, then inserts its members in the order they
/// were declared.
///
/// ```ignore
/// let id = ClassBuilder::new(&mut codebase, "a.b", "a.b.C")
///     .method("m", TypeItem::void(), [])
///     .field("F", TypeItem::class("java.lang.String"))
///     .build()?;
/// ```
pub struct ClassBuilder<'a> {
    codebase: &'a mut Codebase,
    package: String,
    outer: Option<ClassId>,
    class: ClassItem,
    members: Vec<PendingMember>,
}

impl<'a> ClassBuilder<'a> {
    pub fn new(codebase: &'a mut Codebase, package: &str, qualified_name: &str) -> Self {
        let base = codebase.new_item_base();
        ClassBuilder {
            codebase,
            package: package.to_string(),
            outer: None,
            class: ClassItem::new(qualified_name, ClassKind::Class, base),
            members: Vec::new(),
        }
    }

    /// Insert the class as a nested class of `outer` instead of as a top
    /// level class of the package.
    pub fn nested_in(mut self, outer: ClassId) -> Self {
        self.outer = Some(outer);
        self
    }

    pub fn kind(mut self, kind: ClassKind) -> Self {
        self.class.kind = kind;
        self
    }

    pub fn modifiers(mut self, modifiers: ModifierList) -> Self {
        self.class.base.modifiers = modifiers;
        self
    }

    pub fn documentation(mut self, text: &str) -> Self {
        self.class.base.documentation = Documentation::new(text);
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.class.base.modifiers.deprecated = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.class.base.hidden = true;
        self
    }

    pub fn emit(mut self, emit: bool) -> Self {
        self.class.base.emit = emit;
        self
    }

    pub fn selected(mut self, variants: ApiVariantSet) -> Self {
        self.class.base.selected_api_variants = variants;
        self
    }

    pub fn super_class(mut self, qualified_name: &str) -> Self {
        self.class.super_class = Some(ClassTypeItem::new(qualified_name));
        self
    }

    pub fn super_type(mut self, super_class: ClassTypeItem) -> Self {
        self.class.super_class = Some(super_class);
        self
    }

    pub fn interface(mut self, qualified_name: &str) -> Self {
        self.class.interfaces.push(ClassTypeItem::new(qualified_name));
        self
    }

    pub fn type_parameter(mut self, type_parameter: TypeParameterItem) -> Self {
        self.class.type_parameters.push(type_parameter);
        self
    }

    /// Fresh item data for a member, selected like the class itself.
    pub fn member_base(&self) -> ItemBase {
        let mut base = self.codebase.new_item_base();
        base.selected_api_variants = self.class.base.selected_api_variants.clone();
        base
    }

    fn parameters<'p>(&self, parameters: impl IntoIterator<Item = (&'p str, TypeItem)>) -> Vec<ParameterItem> {
        parameters
            .into_iter()
            .map(|(name, ty)| ParameterItem::new(name, ty, self.member_base()))
            .collect()
    }

    pub fn constructor<'p>(mut self, parameters: impl IntoIterator<Item = (&'p str, TypeItem)>) -> Self {
        let parameters = self.parameters(parameters);
        let name = self.class.simple_name().to_string();
        let return_type = TypeItem::class(self.class.qualified_name());
        let callable = CallableItem::new(CallableKind::Constructor, name, return_type, parameters, self.member_base());
        self.members.push(PendingMember::Callable(callable));
        self
    }

    pub fn method<'p>(
        mut self,
        name: &str,
        return_type: TypeItem,
        parameters: impl IntoIterator<Item = (&'p str, TypeItem)>,
    ) -> Self {
        let parameters = self.parameters(parameters);
        let callable = CallableItem::new(CallableKind::Method, name, return_type, parameters, self.member_base());
        self.members.push(PendingMember::Callable(callable));
        self
    }

    /// Add a fully configured constructor or method.
    pub fn callable(mut self, callable: CallableItem) -> Self {
        self.members.push(PendingMember::Callable(callable));
        self
    }

    pub fn field(mut self, name: &str, ty: TypeItem) -> Self {
        let field = FieldItem::new(name, ty, self.member_base());
        self.members.push(PendingMember::Field(field));
        self
    }

    pub fn enum_constant(mut self, name: &str) -> Self {
        let ty = TypeItem::class(self.class.qualified_name());
        let mut field = FieldItem::new(name, ty, self.member_base());
        field.is_enum_constant = true;
        field.base.modifiers.is_static = true;
        field.base.modifiers.is_final = true;
        self.members.push(PendingMember::Field(field));
        self
    }

    /// Add a fully configured field.
    pub fn field_item(mut self, field: FieldItem) -> Self {
        self.members.push(PendingMember::Field(field));
        self
    }

    pub fn property(mut self, name: &str, ty: TypeItem) -> Self {
        let property = PropertyItem::new(name, ty, self.member_base());
        self.members.push(PendingMember::Property(property));
        self
    }

    pub fn build(self) -> Result<ClassId> {
        let ClassBuilder {
            codebase,
            package,
            outer,
            class,
            members,
        } = self;

        let id = match outer {
            Some(outer) => codebase.add_nested_class(outer, class)?,
            None => {
                let package = codebase.find_or_create_package(&package);
                codebase.add_class(package, class)?
            }
        };

        for member in members {
            match member {
                PendingMember::Callable(callable) => {
                    codebase.add_callable(id, callable)?;
                }
                PendingMember::Field(field) => {
                    codebase.add_field(id, field)?;
                }
                PendingMember::Property(property) => {
                    codebase.add_property(id, property)?;
                }
            }
        }
        Ok(id)
    }
}
