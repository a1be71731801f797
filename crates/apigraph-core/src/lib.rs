//! apigraph core: API item graph, surfaces and variants, configuration

pub mod builder;
pub mod codebase;
pub mod config;
pub mod document;
pub mod error;
pub mod hierarchy;
pub mod model;
pub mod surfaces;
pub mod types;

#[cfg(test)]
pub mod tests;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use builder::ClassBuilder;
pub use codebase::{ClassResolver, ClassStub, Codebase};
pub use config::{ConfigError, FilterConfig, PackageMatcher, RunConfig, SurfaceConfig, CONFIG_FILE_NAME};
pub use document::CodebaseDocument;
pub use error::{GraphError, Result};
pub use hierarchy::{ClassHierarchy, SupertypeKind};
pub use model::{
    descriptor_of, AnnotationItem, AnnotationValue, CallableId, CallableItem, CallableKind, ClassId, ClassItem, ClassKind,
    DefaultValue, Documentation, FieldId, FieldItem, Item, ItemBase, ItemId, ItemRef, ModifierList, PackageId,
    PackageItem, ParameterItem, PropertyId, PropertyItem, Showability, SourceLocation, Visibility,
};
pub use surfaces::{
    ApiSurface, ApiSurfaces, ApiSurfacesBuilder, ApiVariant, ApiVariantSet, ApiVariantType, MutableApiVariantSet,
    SurfaceId,
};
pub use types::{
    ClassTypeItem, Nullability, NullabilityHints, PrimitiveKind, TypeItem, TypeModifiers, TypeParameterItem,
    TypeParameterOwner, VariableTypeItem,
};
