//! API surfaces, variants and per-item variant sets
//!
//! An [`ApiSurfaces`] configuration is built once per run. Each surface
//! crossed with each [`ApiVariantType`] yields one [`ApiVariant`], and every
//! selectable item records the variants it participates in with an
//! [`ApiVariantSet`] bit vector.

use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of surfaces that fit in the `u64` variant bit vector.
pub const MAX_SURFACES: usize = 64 / ApiVariantType::COUNT;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// The kind of participation an item has in a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ApiVariantType {
    /// Part of the surface's API proper.
    Core,
    /// Previously part of the surface, now listed as removed.
    Removed,
    /// Only present in documentation stubs.
    DocOnly,
}

impl ApiVariantType {
    pub const COUNT: usize = 3;

    /// Fixed rendering order used by the canonical set format.
    pub const ALL: [ApiVariantType; 3] = [
        ApiVariantType::Core,
        ApiVariantType::Removed,
        ApiVariantType::DocOnly,
    ];

    /// Stable one-letter code: `C`, `R` or `D`.
    pub fn short_code(self) -> char {
        match self {
            ApiVariantType::Core => 'C',
            ApiVariantType::Removed => 'R',
            ApiVariantType::DocOnly => 'D',
        }
    }

    pub fn from_short_code(code: char) -> Option<Self> {
        match code {
            'C' => Some(ApiVariantType::Core),
            'R' => Some(ApiVariantType::Removed),
            'D' => Some(ApiVariantType::DocOnly),
            _ => None,
        }
    }

    fn ordinal(self) -> usize {
        match self {
            ApiVariantType::Core => 0,
            ApiVariantType::Removed => 1,
            ApiVariantType::DocOnly => 2,
        }
    }
}

/// Index of a surface in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub usize);

/// One (surface, variant type) combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApiVariant {
    surface: SurfaceId,
    kind: ApiVariantType,
    token: u64,
}

impl ApiVariant {
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    pub fn kind(&self) -> ApiVariantType {
        self.kind
    }

    fn bit(&self) -> u64 {
        1u64 << (self.surface.0 * ApiVariantType::COUNT + self.kind.ordinal())
    }
}

/// A named API boundary, optionally extending one other surface.
#[derive(Debug, Clone)]
pub struct ApiSurface {
    id: SurfaceId,
    name: String,
    extends: Option<SurfaceId>,
    is_main: bool,
    token: u64,
}

impl ApiSurface {
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extends(&self) -> Option<SurfaceId> {
        self.extends
    }

    pub fn is_main(&self) -> bool {
        self.is_main
    }

    pub fn variant_for(&self, kind: ApiVariantType) -> ApiVariant {
        ApiVariant {
            surface: self.id,
            kind,
            token: self.token,
        }
    }

    /// All variants of this surface in C, R, D order.
    pub fn variants(&self) -> impl Iterator<Item = ApiVariant> + '_ {
        ApiVariantType::ALL.into_iter().map(|kind| self.variant_for(kind))
    }

    fn mask(&self) -> u64 {
        0b111 << (self.id.0 * ApiVariantType::COUNT)
    }
}

#[derive(Debug)]
struct SurfaceTable {
    token: u64,
    /// Creation order, indexed by `SurfaceId`.
    surfaces: Vec<ApiSurface>,
    /// Dependency order with main last.
    order: Vec<SurfaceId>,
    main: SurfaceId,
}

impl SurfaceTable {
    fn by_name(&self, name: &str) -> Option<&ApiSurface> {
        self.surfaces.iter().find(|s| s.name == name)
    }
}

/// The surfaces configuration for one run.
///
/// Cloning is cheap; clones share the same configuration and the same empty
/// variant set singleton.
#[derive(Clone)]
pub struct ApiSurfaces {
    table: Arc<SurfaceTable>,
    empty: ApiVariantSet,
}

impl fmt::Debug for ApiSurfaces {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiSurfaces")
            .field("surfaces", &self.all().map(|s| s.name()).collect::<Vec<_>>())
            .field("main", &self.main().name())
            .finish()
    }
}

impl ApiSurfaces {
    pub fn builder() -> ApiSurfacesBuilder {
        ApiSurfacesBuilder::default()
    }

    /// Standard configuration: a single `main` surface, or `main` extending
    /// `base` when `needs_base` is set.
    pub fn create(needs_base: bool) -> Self {
        let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        let mut surfaces = Vec::new();
        if needs_base {
            surfaces.push(ApiSurface {
                id: SurfaceId(0),
                name: "base".to_string(),
                extends: None,
                is_main: false,
                token,
            });
        }
        let main = SurfaceId(surfaces.len());
        surfaces.push(ApiSurface {
            id: main,
            name: "main".to_string(),
            extends: needs_base.then_some(SurfaceId(0)),
            is_main: true,
            token,
        });
        let order = surfaces.iter().map(|s| s.id).collect();
        Self::from_table(SurfaceTable {
            token,
            surfaces,
            order,
            main,
        })
    }

    fn from_table(table: SurfaceTable) -> Self {
        let table = Arc::new(table);
        let empty = ApiVariantSet {
            inner: Arc::new(VariantSetInner {
                table: Arc::clone(&table),
                bits: 0,
                empty: None,
            }),
        };
        ApiSurfaces { table, empty }
    }

    /// Surfaces ordered so each appears after the surface it extends, with
    /// the main surface last.
    pub fn all(&self) -> impl Iterator<Item = &ApiSurface> + '_ {
        self.table.order.iter().map(|id| &self.table.surfaces[id.0])
    }

    pub fn main(&self) -> &ApiSurface {
        &self.table.surfaces[self.table.main.0]
    }

    /// The surface the main surface extends, if any.
    pub fn base(&self) -> Option<&ApiSurface> {
        self.main().extends.map(|id| &self.table.surfaces[id.0])
    }

    pub fn by_name(&self, name: &str) -> Option<&ApiSurface> {
        self.table.by_name(name)
    }

    /// Look up a surface by id. Ids from another configuration yield `None`.
    pub fn surface(&self, id: SurfaceId) -> Option<&ApiSurface> {
        self.table.surfaces.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.table.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.surfaces.is_empty()
    }

    /// Every variant of every surface, in surface dependency order.
    pub fn variants(&self) -> impl Iterator<Item = ApiVariant> + '_ {
        self.all().flat_map(|s| s.variants())
    }

    /// Render a variant as `name(C)`.
    pub fn describe(&self, variant: ApiVariant) -> String {
        match self.surface(variant.surface) {
            Some(surface) if variant.token == self.table.token => {
                format!("{}({})", surface.name, variant.kind.short_code())
            }
            _ => format!("?({})", variant.kind.short_code()),
        }
    }

    /// The shared empty set for this configuration.
    pub fn empty_variant_set(&self) -> ApiVariantSet {
        self.empty.clone()
    }

    pub fn mutable_variant_set(&self) -> MutableApiVariantSet {
        MutableApiVariantSet {
            empty: self.empty.clone(),
            bits: 0,
        }
    }

    /// Build an immutable set from variants of this configuration.
    pub fn variant_set(&self, variants: impl IntoIterator<Item = ApiVariant>) -> Result<ApiVariantSet> {
        let mut set = self.mutable_variant_set();
        for variant in variants {
            set.add(variant)?;
        }
        Ok(set.to_immutable())
    }

    /// The set holding only the core variant of the main surface.
    pub fn main_core(&self) -> ApiVariantSet {
        let mut set = self.mutable_variant_set();
        set.insert(self.main().variant_for(ApiVariantType::Core));
        set.to_immutable()
    }

    /// Whether two handles refer to the same configuration.
    pub fn same_configuration(&self, other: &ApiSurfaces) -> bool {
        Arc::ptr_eq(&self.table, &other.table)
    }

    /// Parse the canonical `ApiVariantSet[base(R),main(C)]` form.
    pub fn parse_variant_set(&self, text: &str) -> Result<ApiVariantSet> {
        let malformed = |reason: String| GraphError::MalformedVariantSet {
            input: text.to_string(),
            reason,
        };

        let body = text
            .trim()
            .strip_prefix("ApiVariantSet[")
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| malformed("expected ApiVariantSet[...]".to_string()))?;

        let mut set = self.mutable_variant_set();
        if body.is_empty() {
            return Ok(set.to_immutable());
        }

        for group in body.split(',') {
            let (name, codes) = group
                .split_once('(')
                .and_then(|(name, rest)| rest.strip_suffix(')').map(|codes| (name, codes)))
                .ok_or_else(|| malformed(format!("expected name(codes), found '{}'", group)))?;
            let surface = self
                .by_name(name)
                .ok_or_else(|| malformed(format!("unknown surface '{}'", name)))?;
            if codes.is_empty() {
                return Err(malformed(format!("surface '{}' has no variant codes", name)));
            }
            for code in codes.chars() {
                let kind = ApiVariantType::from_short_code(code)
                    .ok_or_else(|| malformed(format!("unknown variant code '{}'", code)))?;
                set.insert(surface.variant_for(kind));
            }
        }

        Ok(set.to_immutable())
    }
}

/// Builder enforcing the surface configuration rules.
#[derive(Debug, Default)]
pub struct ApiSurfacesBuilder {
    pending: Vec<(String, Option<SurfaceId>, bool)>,
    main: Option<SurfaceId>,
}

impl ApiSurfacesBuilder {
    /// Register a surface. `extends` must name a surface created earlier.
    pub fn create_surface(
        &mut self,
        name: &str,
        extends: Option<&str>,
        is_main: bool,
    ) -> Result<SurfaceId> {
        if self.pending.iter().any(|(existing, _, _)| existing == name) {
            return Err(GraphError::DuplicateSurface(name.to_string()));
        }

        let extends = match extends {
            Some(target) => Some(
                self.pending
                    .iter()
                    .position(|(existing, _, _)| existing == target)
                    .map(SurfaceId)
                    .ok_or_else(|| GraphError::UnknownExtends {
                        surface: name.to_string(),
                        extends: target.to_string(),
                    })?,
            ),
            None => None,
        };

        let id = SurfaceId(self.pending.len());
        if is_main {
            if let Some(existing) = self.main {
                return Err(GraphError::MultipleMainSurfaces {
                    surface: name.to_string(),
                    existing: self.pending[existing.0].0.clone(),
                });
            }
            self.main = Some(id);
        }

        self.pending.push((name.to_string(), extends, is_main));
        Ok(id)
    }

    pub fn build(self) -> Result<ApiSurfaces> {
        let main = self.main.ok_or(GraphError::NoMainSurface)?;

        if self.pending.len() > MAX_SURFACES {
            return Err(GraphError::TooManySurfaces {
                count: self.pending.len(),
                max: MAX_SURFACES,
            });
        }

        let roots: Vec<&str> = self
            .pending
            .iter()
            .filter(|(_, extends, _)| extends.is_none())
            .map(|(name, _, _)| name.as_str())
            .collect();
        if roots.len() > 1 {
            return Err(GraphError::MultipleRootSurfaces(roots.join(", ")));
        }

        if let Some((name, _, _)) = self
            .pending
            .iter()
            .find(|(_, extends, _)| *extends == Some(main))
        {
            return Err(GraphError::MainSurfaceExtended {
                surface: name.clone(),
                main: self.pending[main.0].0.clone(),
            });
        }

        let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        let surfaces: Vec<ApiSurface> = self
            .pending
            .into_iter()
            .enumerate()
            .map(|(index, (name, extends, is_main))| ApiSurface {
                id: SurfaceId(index),
                name,
                extends,
                is_main,
                token,
            })
            .collect();

        // `extends` can only point backwards, so creation order already
        // respects dependencies. Nothing extends main, so it can move last.
        let mut order: Vec<SurfaceId> = surfaces.iter().map(|s| s.id).filter(|id| *id != main).collect();
        order.push(main);

        tracing::debug!(
            "Configured API surfaces: {}",
            order
                .iter()
                .map(|id| surfaces[id.0].name.as_str())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        Ok(ApiSurfaces::from_table(SurfaceTable {
            token,
            surfaces,
            order,
            main,
        }))
    }
}

struct VariantSetInner {
    table: Arc<SurfaceTable>,
    bits: u64,
    /// The configuration's empty singleton; `None` for the singleton itself.
    empty: Option<ApiVariantSet>,
}

/// Immutable set of variants an item participates in.
#[derive(Clone)]
pub struct ApiVariantSet {
    inner: Arc<VariantSetInner>,
}

impl ApiVariantSet {
    /// Reference identity, used to observe empty-set interning.
    pub fn ptr_eq(a: &ApiVariantSet, b: &ApiVariantSet) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    pub fn bits(&self) -> u64 {
        self.inner.bits
    }

    pub fn is_empty(&self) -> bool {
        self.inner.bits == 0
    }

    pub fn len(&self) -> usize {
        self.inner.bits.count_ones() as usize
    }

    pub fn contains(&self, variant: ApiVariant) -> bool {
        variant.token == self.inner.table.token && self.inner.bits & variant.bit() != 0
    }

    /// Whether any variant of `surface` is present.
    pub fn contains_any(&self, surface: &ApiSurface) -> bool {
        surface.token == self.inner.table.token && self.inner.bits & surface.mask() != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = ApiVariant> + '_ {
        let table = &self.inner.table;
        table
            .order
            .iter()
            .flat_map(move |id| table.surfaces[id.0].variants())
            .filter(move |v| self.inner.bits & v.bit() != 0)
    }

    pub fn to_mutable(&self) -> MutableApiVariantSet {
        MutableApiVariantSet {
            empty: self.empty_singleton(),
            bits: self.inner.bits,
        }
    }

    fn empty_singleton(&self) -> ApiVariantSet {
        match &self.inner.empty {
            Some(empty) => empty.clone(),
            None => self.clone(),
        }
    }
}

impl PartialEq for ApiVariantSet {
    fn eq(&self, other: &Self) -> bool {
        self.inner.bits == other.inner.bits && self.inner.table.token == other.inner.table.token
    }
}

impl Eq for ApiVariantSet {}

impl Hash for ApiVariantSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.bits.hash(state);
    }
}

impl fmt::Display for ApiVariantSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render_variant_set(&self.inner.table, self.inner.bits, f)
    }
}

impl fmt::Debug for ApiVariantSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Mutable counterpart of [`ApiVariantSet`].
#[derive(Clone)]
pub struct MutableApiVariantSet {
    empty: ApiVariantSet,
    bits: u64,
}

impl MutableApiVariantSet {
    /// Add a variant. Variants of another configuration are rejected.
    pub fn add(&mut self, variant: ApiVariant) -> Result<()> {
        if !self.owns(variant) {
            return Err(GraphError::ForeignVariant(format!("{:?}", variant)));
        }
        self.insert(variant);
        Ok(())
    }

    /// Add a variant already known to belong to this configuration.
    fn insert(&mut self, variant: ApiVariant) {
        self.bits |= variant.bit();
    }

    pub fn remove(&mut self, variant: ApiVariant) {
        if self.owns(variant) {
            self.bits &= !variant.bit();
        }
    }

    pub fn contains(&self, variant: ApiVariant) -> bool {
        self.owns(variant) && self.bits & variant.bit() != 0
    }

    pub fn contains_any(&self, surface: &ApiSurface) -> bool {
        surface.token == self.table().token && self.bits & surface.mask() != 0
    }

    pub fn clear(&mut self) {
        self.bits = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// Freeze the set. An empty set is interned to the shared singleton.
    pub fn to_immutable(&self) -> ApiVariantSet {
        if self.bits == 0 {
            return self.empty.clone();
        }
        ApiVariantSet {
            inner: Arc::new(VariantSetInner {
                table: Arc::clone(self.table()),
                bits: self.bits,
                empty: Some(self.empty.clone()),
            }),
        }
    }

    fn table(&self) -> &Arc<SurfaceTable> {
        &self.empty.inner.table
    }

    fn owns(&self, variant: ApiVariant) -> bool {
        variant.token == self.table().token
    }
}

impl fmt::Display for MutableApiVariantSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render_variant_set(self.table(), self.bits, f)
    }
}

impl fmt::Debug for MutableApiVariantSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn render_variant_set(table: &SurfaceTable, bits: u64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut surfaces: Vec<&ApiSurface> = table
        .surfaces
        .iter()
        .filter(|s| bits & s.mask() != 0)
        .collect();
    surfaces.sort_by(|a, b| a.name.cmp(&b.name));

    f.write_str("ApiVariantSet[")?;
    for (i, surface) in surfaces.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{}(", surface.name)?;
        for kind in ApiVariantType::ALL {
            if bits & surface.variant_for(kind).bit() != 0 {
                write!(f, "{}", kind.short_code())?;
            }
        }
        f.write_str(")")?;
    }
    f.write_str("]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_rejects_duplicate_surface() {
        let mut builder = ApiSurfaces::builder();
        builder.create_surface("public", None, false).unwrap();
        let err = builder.create_surface("public", None, true).unwrap_err();
        assert_eq!(err, GraphError::DuplicateSurface("public".to_string()));
    }

    #[test]
    fn test_builder_rejects_unknown_extends() {
        let mut builder = ApiSurfaces::builder();
        let err = builder.create_surface("system", Some("public"), true).unwrap_err();
        assert!(matches!(err, GraphError::UnknownExtends { .. }));
        assert!(err.to_string().contains("public"));
    }

    #[test]
    fn test_builder_rejects_second_main() {
        let mut builder = ApiSurfaces::builder();
        builder.create_surface("public", None, true).unwrap();
        let err = builder.create_surface("system", Some("public"), true).unwrap_err();
        assert!(matches!(err, GraphError::MultipleMainSurfaces { .. }));
    }

    #[test]
    fn test_build_requires_main() {
        let mut builder = ApiSurfaces::builder();
        builder.create_surface("public", None, false).unwrap();
        assert_eq!(builder.build().unwrap_err(), GraphError::NoMainSurface);
    }

    #[test]
    fn test_build_rejects_extending_main() {
        let mut builder = ApiSurfaces::builder();
        builder.create_surface("public", None, true).unwrap();
        builder.create_surface("system", Some("public"), false).unwrap();
        assert!(matches!(
            builder.build().unwrap_err(),
            GraphError::MainSurfaceExtended { .. }
        ));
    }

    #[test]
    fn test_main_is_ordered_last() {
        let mut builder = ApiSurfaces::builder();
        builder.create_surface("public", None, false).unwrap();
        builder.create_surface("system", Some("public"), true).unwrap();
        builder.create_surface("test", Some("public"), false).unwrap();
        let surfaces = builder.build().unwrap();

        let names: Vec<&str> = surfaces.all().map(|s| s.name()).collect();
        assert_eq!(names, vec!["public", "test", "system"]);
        assert_eq!(surfaces.base().map(|s| s.name()), Some("public"));
    }

    #[test]
    fn test_empty_set_renders_without_groups() {
        let surfaces = ApiSurfaces::create(false);
        assert_eq!(surfaces.empty_variant_set().to_string(), "ApiVariantSet[]");
    }

    #[test]
    fn test_multiple_codes_render_in_fixed_order() {
        let surfaces = ApiSurfaces::create(false);
        let main = surfaces.main();
        let set = surfaces.variant_set([
            main.variant_for(ApiVariantType::DocOnly),
            main.variant_for(ApiVariantType::Core),
        ]).unwrap();
        assert_eq!(set.to_string(), "ApiVariantSet[main(CD)]");
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        let surfaces = ApiSurfaces::create(true);
        for input in [
            "main(C)",
            "ApiVariantSet[main]",
            "ApiVariantSet[main(X)]",
            "ApiVariantSet[other(C)]",
            "ApiVariantSet[main()]",
        ] {
            let err = surfaces.parse_variant_set(input).unwrap_err();
            assert!(err.is_configuration(), "{} should be rejected", input);
        }
    }

    #[test]
    fn test_foreign_variant_is_rejected() {
        let ours = ApiSurfaces::create(false);
        let theirs = ApiSurfaces::create(false);
        let mut set = ours.mutable_variant_set();
        let foreign = theirs.main().variant_for(ApiVariantType::Core);
        assert!(set.add(foreign).is_err());
        assert!(!set.contains(foreign));
        assert!(matches!(ours.variant_set([foreign]), Err(GraphError::ForeignVariant(_))));
    }

    #[test]
    fn test_main_core_set() {
        let surfaces = ApiSurfaces::create(true);
        assert_eq!(surfaces.main_core().to_string(), "ApiVariantSet[main(C)]");
    }
}
