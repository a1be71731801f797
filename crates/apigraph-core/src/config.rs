//! Run configuration loaded from `apigraph.toml`.
//!
//! ```toml
//! [[surfaces]]
//! name = "public"
//!
//! [[surfaces]]
//! name = "system"
//! extends = "public"
//! main = true
//!
//! [filters]
//! hidden_packages = ["*.internal", "*.internal.*"]
//! include_hidden = false
//! ```

use crate::error::GraphError;
use crate::surfaces::ApiSurfaces;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Conventional file name looked up next to the inputs.
pub const CONFIG_FILE_NAME: &str = "apigraph.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid package pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error(transparent)]
    Surfaces(#[from] GraphError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceConfig {
    pub name: String,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub main: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Glob patterns over package names; matching packages are treated as
    /// hidden.
    pub hidden_packages: Vec<String>,
    /// Keep hidden items in the emitted API.
    pub include_hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_surfaces")]
    pub surfaces: Vec<SurfaceConfig>,
    #[serde(default)]
    pub filters: FilterConfig,
}

fn default_surfaces() -> Vec<SurfaceConfig> {
    vec![SurfaceConfig {
        name: "main".to_string(),
        extends: None,
        main: true,
    }]
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            surfaces: default_surfaces(),
            filters: FilterConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Every problem with this configuration, empty if it is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if let Err(e) = self.build_surfaces() {
            problems.push(e.to_string());
        }
        for pattern in &self.filters.hidden_packages {
            if let Err(e) = Glob::new(pattern) {
                problems.push(format!("invalid package pattern '{}': {}", pattern, e));
            }
        }
        problems
    }

    pub fn build_surfaces(&self) -> Result<ApiSurfaces, GraphError> {
        let mut builder = ApiSurfaces::builder();
        for surface in &self.surfaces {
            builder.create_surface(&surface.name, surface.extends.as_deref(), surface.main)?;
        }
        builder.build()
    }

    pub fn hidden_packages(&self) -> Result<PackageMatcher, ConfigError> {
        PackageMatcher::new(&self.filters.hidden_packages)
    }
}

/// Compiled set of package name globs.
#[derive(Debug, Clone)]
pub struct PackageMatcher {
    patterns: Vec<String>,
    set: GlobSet,
}

impl PackageMatcher {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern).map_err(|source| ConfigError::Pattern {
                pattern: pattern.to_string(),
                source,
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|source| ConfigError::Pattern {
            pattern: patterns.iter().map(|p| p.as_ref()).collect::<Vec<_>>().join(","),
            source,
        })?;
        Ok(PackageMatcher {
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            set,
        })
    }

    pub fn empty() -> Self {
        PackageMatcher {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn is_match(&self, package: &str) -> bool {
        self.set.is_match(package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_single_main_surface() {
        let surfaces = RunConfig::default().build_surfaces().unwrap();
        assert_eq!(surfaces.len(), 1);
        assert_eq!(surfaces.main().name(), "main");
    }

    #[test]
    fn test_missing_surfaces_table_uses_default() {
        let config = RunConfig::from_toml("[filters]\ninclude_hidden = true\n").unwrap();
        assert_eq!(config.surfaces.len(), 1);
        assert!(config.filters.include_hidden);
    }

    #[test]
    fn test_validate_reports_unknown_extends() {
        let config = RunConfig::from_toml(
            r#"
            [[surfaces]]
            name = "system"
            extends = "public"
            main = true
            "#,
        )
        .unwrap();
        let problems = config.validate();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("public"));
    }

    #[test]
    fn test_package_matcher_globs_cross_dots() {
        let matcher = PackageMatcher::new(&["*.internal", "*.internal.*"]).unwrap();
        assert!(matcher.is_match("android.internal"));
        assert!(matcher.is_match("android.internal.util"));
        assert!(!matcher.is_match("android.util"));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let config = RunConfig {
            filters: FilterConfig {
                hidden_packages: vec!["a[".to_string()],
                include_hidden: false,
            },
            ..RunConfig::default()
        };
        assert!(config.hidden_packages().is_err());
        assert_eq!(config.validate().len(), 1);
    }
}
