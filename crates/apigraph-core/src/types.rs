//! Type references carried by API items

use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolved nullness of a type use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Nullability {
    /// Nothing is known; the platform default applies.
    #[default]
    Platform,
    NonNull,
    Nullable,
}

/// The individual sources of nullness information for one type use.
///
/// [`resolve`](NullabilityHints::resolve) applies the priority chain:
/// forced by context, source language, annotations, inferred, then the
/// platform default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NullabilityHints {
    /// Imposed by the context, e.g. an enum constant or a primitive.
    pub forced: Option<Nullability>,
    /// Declared by the source language itself (`String?` vs `String`).
    pub language: Option<Nullability>,
    /// Derived from nullness annotations.
    pub annotation: Option<Nullability>,
    /// Inferred from usage, e.g. an overridden method.
    pub inferred: Option<Nullability>,
}

impl NullabilityHints {
    pub fn forced(nullability: Nullability) -> Self {
        NullabilityHints {
            forced: Some(nullability),
            ..Default::default()
        }
    }

    pub fn resolve(&self) -> Nullability {
        self.forced
            .or(self.language)
            .or(self.annotation)
            .or(self.inferred)
            .unwrap_or_default()
    }
}

/// Metadata shared by every type variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TypeModifiers {
    pub nullability: NullabilityHints,
    /// Qualified names of type-use annotations.
    pub annotations: Vec<String>,
}

impl TypeModifiers {
    pub fn nullability(&self) -> Nullability {
        self.nullability.resolve()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
}

impl PrimitiveKind {
    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Void => "void",
        }
    }
}

/// Identity of the declaration a type variable refers to.
///
/// Expressed by name so it can be re-resolved in another codebase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeParameterOwner {
    Class(String),
    Callable { class: String, descriptor: String },
}

impl fmt::Display for TypeParameterOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeParameterOwner::Class(class) => f.write_str(class),
            TypeParameterOwner::Callable { class, descriptor } => {
                write!(f, "{}#{}", class, descriptor)
            }
        }
    }
}

/// Reference to a class, possibly parameterized and nested in an outer type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassTypeItem {
    pub qualified_name: String,
    #[serde(default)]
    pub arguments: Vec<TypeItem>,
    #[serde(default)]
    pub outer: Option<Box<ClassTypeItem>>,
    #[serde(default)]
    pub modifiers: TypeModifiers,
}

impl ClassTypeItem {
    pub fn new(qualified_name: impl Into<String>) -> Self {
        ClassTypeItem {
            qualified_name: qualified_name.into(),
            arguments: Vec::new(),
            outer: None,
            modifiers: TypeModifiers::default(),
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<TypeItem>) -> Self {
        self.arguments = arguments;
        self
    }
}

/// Use of a type parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableTypeItem {
    pub name: String,
    /// Declaration this variable resolved to, if resolution has happened.
    #[serde(default)]
    pub owner: Option<TypeParameterOwner>,
    #[serde(default)]
    pub modifiers: TypeModifiers,
}

/// The closed set of type shapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeItem {
    Primitive {
        primitive: PrimitiveKind,
        #[serde(default)]
        modifiers: TypeModifiers,
    },
    Class(ClassTypeItem),
    Variable(VariableTypeItem),
    Wildcard {
        #[serde(default)]
        extends_bound: Option<Box<TypeItem>>,
        #[serde(default)]
        super_bound: Option<Box<TypeItem>>,
        #[serde(default)]
        modifiers: TypeModifiers,
    },
    Array {
        component: Box<TypeItem>,
        #[serde(default)]
        varargs: bool,
        #[serde(default)]
        modifiers: TypeModifiers,
    },
    Lambda {
        #[serde(default)]
        receiver: Option<Box<TypeItem>>,
        #[serde(default)]
        parameters: Vec<TypeItem>,
        return_type: Box<TypeItem>,
        #[serde(default)]
        modifiers: TypeModifiers,
    },
}

impl TypeItem {
    pub fn primitive(primitive: PrimitiveKind) -> Self {
        TypeItem::Primitive {
            primitive,
            modifiers: TypeModifiers {
                nullability: NullabilityHints::forced(Nullability::NonNull),
                annotations: Vec::new(),
            },
        }
    }

    pub fn void() -> Self {
        Self::primitive(PrimitiveKind::Void)
    }

    pub fn class(qualified_name: impl Into<String>) -> Self {
        TypeItem::Class(ClassTypeItem::new(qualified_name))
    }

    pub fn variable(name: impl Into<String>) -> Self {
        TypeItem::Variable(VariableTypeItem {
            name: name.into(),
            owner: None,
            modifiers: TypeModifiers::default(),
        })
    }

    pub fn array(component: TypeItem) -> Self {
        TypeItem::Array {
            component: Box::new(component),
            varargs: false,
            modifiers: TypeModifiers::default(),
        }
    }

    pub fn modifiers(&self) -> &TypeModifiers {
        match self {
            TypeItem::Primitive { modifiers, .. }
            | TypeItem::Wildcard { modifiers, .. }
            | TypeItem::Array { modifiers, .. }
            | TypeItem::Lambda { modifiers, .. } => modifiers,
            TypeItem::Class(class) => &class.modifiers,
            TypeItem::Variable(variable) => &variable.modifiers,
        }
    }

    pub fn modifiers_mut(&mut self) -> &mut TypeModifiers {
        match self {
            TypeItem::Primitive { modifiers, .. }
            | TypeItem::Wildcard { modifiers, .. }
            | TypeItem::Array { modifiers, .. }
            | TypeItem::Lambda { modifiers, .. } => modifiers,
            TypeItem::Class(class) => &mut class.modifiers,
            TypeItem::Variable(variable) => &mut variable.modifiers,
        }
    }

    pub fn nullability(&self) -> Nullability {
        self.modifiers().nullability()
    }

    /// Erasure used in member descriptors: type arguments, bounds and
    /// nullness are dropped, and varargs erase to plain arrays.
    pub fn erased(&self) -> String {
        match self {
            TypeItem::Primitive { primitive, .. } => primitive.keyword().to_string(),
            TypeItem::Class(class) => class.qualified_name.clone(),
            TypeItem::Variable(variable) => variable.name.clone(),
            TypeItem::Wildcard { extends_bound, .. } => extends_bound
                .as_ref()
                .map(|bound| bound.erased())
                .unwrap_or_else(|| "java.lang.Object".to_string()),
            TypeItem::Array { component, .. } => format!("{}[]", component.erased()),
            TypeItem::Lambda { parameters, .. } => format!("kotlin.jvm.functions.Function{}", parameters.len()),
        }
    }

    /// Visit every class reference in this type, including nested ones.
    pub fn for_each_class_reference<'a>(&'a self, f: &mut impl FnMut(&'a ClassTypeItem)) {
        match self {
            TypeItem::Primitive { .. } | TypeItem::Variable(_) => {}
            TypeItem::Class(class) => visit_class_type(class, f),
            TypeItem::Wildcard {
                extends_bound,
                super_bound,
                ..
            } => {
                for bound in extends_bound.iter().chain(super_bound.iter()) {
                    bound.for_each_class_reference(f);
                }
            }
            TypeItem::Array { component, .. } => component.for_each_class_reference(f),
            TypeItem::Lambda {
                receiver,
                parameters,
                return_type,
                ..
            } => {
                if let Some(receiver) = receiver {
                    receiver.for_each_class_reference(f);
                }
                for parameter in parameters {
                    parameter.for_each_class_reference(f);
                }
                return_type.for_each_class_reference(f);
            }
        }
    }
}

fn visit_class_type<'a>(class: &'a ClassTypeItem, f: &mut impl FnMut(&'a ClassTypeItem)) {
    f(class);
    if let Some(outer) = &class.outer {
        visit_class_type(outer, f);
    }
    for argument in &class.arguments {
        argument.for_each_class_reference(f);
    }
}

impl fmt::Display for ClassTypeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name)?;
        if !self.arguments.is_empty() {
            f.write_str("<")?;
            for (i, argument) in self.arguments.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}", argument)?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

impl fmt::Display for TypeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeItem::Primitive { primitive, .. } => f.write_str(primitive.keyword()),
            TypeItem::Class(class) => write!(f, "{}", class),
            TypeItem::Variable(variable) => f.write_str(&variable.name),
            TypeItem::Wildcard {
                extends_bound,
                super_bound,
                ..
            } => match (extends_bound, super_bound) {
                (Some(bound), _) => write!(f, "? extends {}", bound),
                (None, Some(bound)) => write!(f, "? super {}", bound),
                (None, None) => f.write_str("?"),
            },
            TypeItem::Array {
                component, varargs, ..
            } => write!(f, "{}{}", component, if *varargs { "..." } else { "[]" }),
            TypeItem::Lambda {
                receiver,
                parameters,
                return_type,
                ..
            } => {
                if let Some(receiver) = receiver {
                    write!(f, "{}.", receiver)?;
                }
                f.write_str("(")?;
                for (i, parameter) in parameters.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", parameter)?;
                }
                write!(f, ") -> {}", return_type)
            }
        }
    }
}

/// Declaration of a type parameter on a class or callable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeParameterItem {
    pub name: String,
    #[serde(default)]
    pub bounds: Vec<TypeItem>,
}

impl TypeParameterItem {
    pub fn new(name: impl Into<String>) -> Self {
        TypeParameterItem {
            name: name.into(),
            bounds: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullability_priority_chain() {
        let mut hints = NullabilityHints::default();
        assert_eq!(hints.resolve(), Nullability::Platform);

        hints.inferred = Some(Nullability::Nullable);
        assert_eq!(hints.resolve(), Nullability::Nullable);

        hints.annotation = Some(Nullability::NonNull);
        assert_eq!(hints.resolve(), Nullability::NonNull);

        hints.language = Some(Nullability::Nullable);
        assert_eq!(hints.resolve(), Nullability::Nullable);

        hints.forced = Some(Nullability::NonNull);
        assert_eq!(hints.resolve(), Nullability::NonNull);
    }

    #[test]
    fn test_display_and_erasure() {
        let list = TypeItem::Class(
            ClassTypeItem::new("java.util.List").with_arguments(vec![TypeItem::Wildcard {
                extends_bound: Some(Box::new(TypeItem::variable("T"))),
                super_bound: None,
                modifiers: TypeModifiers::default(),
            }]),
        );
        assert_eq!(list.to_string(), "java.util.List<? extends T>");
        assert_eq!(list.erased(), "java.util.List");

        let varargs = TypeItem::Array {
            component: Box::new(TypeItem::primitive(PrimitiveKind::Int)),
            varargs: true,
            modifiers: TypeModifiers::default(),
        };
        assert_eq!(varargs.to_string(), "int...");
        assert_eq!(varargs.erased(), "int[]");
        assert_eq!(varargs.erased(), TypeItem::array(TypeItem::primitive(PrimitiveKind::Int)).erased());
        assert_eq!(TypeItem::array(TypeItem::class("java.lang.String")).erased(), "java.lang.String[]");
    }

    #[test]
    fn test_class_references_include_arguments() {
        let map = TypeItem::Class(ClassTypeItem::new("java.util.Map").with_arguments(vec![
            TypeItem::class("java.lang.String"),
            TypeItem::array(TypeItem::class("android.Foo")),
        ]));
        let mut names = Vec::new();
        map.for_each_class_reference(&mut |class| names.push(class.qualified_name.clone()));
        assert_eq!(names, vec!["java.util.Map", "java.lang.String", "android.Foo"]);
    }

    #[test]
    fn test_type_item_json_shape() {
        let json = serde_json::to_value(TypeItem::class("a.B")).unwrap();
        assert_eq!(json["kind"], "class");
        assert_eq!(json["qualified_name"], "a.B");
    }
}
