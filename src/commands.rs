//! CLI command implementations

use anyhow::{Context, bail};
use apigraph_compat::{ApiHistory, CompatibilityChecker};
use apigraph_core::{ApiSurfaces, Codebase, CodebaseDocument, RunConfig, CONFIG_FILE_NAME};
use apigraph_snapshot::SnapshotEngine;
use apigraph_visit::{
    AcceptAll, ApiTraversal, BaseTraversal, EmitFilter, ItemFilter, ItemFilterExt, NotHiddenFilter, PackageFilter,
};
use std::fs;
use std::path::Path;

/// Explicit config, else `apigraph.toml` in the working directory, else the
/// single-surface default.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<RunConfig> {
    let config = match path {
        Some(path) => {
            RunConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))?
        }
        None if Path::new(CONFIG_FILE_NAME).exists() => RunConfig::load(Path::new(CONFIG_FILE_NAME))
            .with_context(|| format!("Failed to load {}", CONFIG_FILE_NAME))?,
        None => RunConfig::default(),
    };

    let problems = config.validate();
    if !problems.is_empty() {
        bail!("Invalid configuration:\n  {}", problems.join("\n  "));
    }
    Ok(config)
}

fn load_codebase(path: &Path, surfaces: &ApiSurfaces) -> anyhow::Result<Codebase> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let document = CodebaseDocument::from_json(&text).with_context(|| format!("Failed to parse {}", path.display()))?;
    let codebase = document
        .into_codebase(surfaces)
        .with_context(|| format!("Failed to load codebase from {}", path.display()))?;
    tracing::info!(
        "Loaded {}: {} packages, {} classes",
        codebase.description(),
        codebase.package_count(),
        codebase.class_count()
    );
    Ok(codebase)
}

/// Emit predicate for the configured filters.
fn emit_filter(config: &RunConfig) -> anyhow::Result<Box<dyn ItemFilter>> {
    let hidden = config.hidden_packages().context("Invalid hidden package pattern")?;
    let visible = PackageFilter::excluding(hidden);
    Ok(if config.filters.include_hidden {
        EmitFilter.and(visible).boxed()
    } else {
        EmitFilter.and(visible).and(NotHiddenFilter).boxed()
    })
}

pub fn surfaces(config: &RunConfig) -> anyhow::Result<()> {
    let surfaces = config.build_surfaces().context("Failed to configure API surfaces")?;
    for surface in surfaces.all() {
        let extends = surface
            .extends()
            .and_then(|id| surfaces.surface(id))
            .map(|base| format!(" extends {}", base.name()))
            .unwrap_or_default();
        let main = if surface.is_main() { " (main)" } else { "" };
        let variants: Vec<String> = surface.variants().map(|v| surfaces.describe(v)).collect();
        println!("{}{}{}: {}", surface.name(), extends, main, variants.join(", "));
    }
    Ok(())
}

pub fn snapshot(config: &RunConfig, input: &Path, output: &Path) -> anyhow::Result<()> {
    let surfaces = config.build_surfaces().context("Failed to configure API surfaces")?;
    let source = load_codebase(input, &surfaces)?;

    let definition = ApiTraversal::new(emit_filter(config)?, AcceptAll);
    let reference = BaseTraversal::default();
    let snapshot = SnapshotEngine::new(&definition, &reference)
        .take(&source)
        .with_context(|| format!("Failed to snapshot {}", input.display()))?;

    let json = CodebaseDocument::from_codebase(&snapshot).to_json()?;
    fs::write(output, json).with_context(|| format!("Failed to write {}", output.display()))?;
    tracing::info!("Wrote snapshot with {} classes to {}", snapshot.class_count(), output.display());
    Ok(())
}

pub fn compare(config: &RunConfig, old: &Path, new: &Path, json: bool) -> anyhow::Result<()> {
    let surfaces = config.build_surfaces().context("Failed to configure API surfaces")?;
    let old_codebase = load_codebase(old, &surfaces)?;
    let new_codebase = load_codebase(new, &surfaces)?;

    let report = CompatibilityChecker::check(&old_codebase, &new_codebase)?;
    if json {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report.render());
    }

    if report.has_errors() {
        bail!("{} is not compatible with {}", new.display(), old.display());
    }
    Ok(())
}

pub fn history(config: &RunConfig, versions: &[String], remove_missing_classes: bool) -> anyhow::Result<()> {
    let surfaces = config.build_surfaces().context("Failed to configure API surfaces")?;
    let mut history = ApiHistory::new();
    let mut names = Vec::with_capacity(versions.len());

    for (index, version) in versions.iter().enumerate() {
        let Some((name, path)) = version.split_once('=') else {
            bail!("Expected NAME=FILE, got '{}'", version);
        };
        let codebase = load_codebase(Path::new(path), &surfaces)?;
        let level = u32::try_from(index + 1).context("Too many API versions")?;
        history.add_codebase(level, &codebase)?;
        names.push(name.to_string());
    }
    history.inline_from_hidden_super_classes();
    history.remove_implicit_interfaces();
    history.remove_overriding_methods();
    history.remove_hidden_super_classes();
    if remove_missing_classes {
        history.remove_missing_classes();
    } else {
        history
            .verify_no_missing_classes()
            .context("Use --remove-missing-classes to drop them")?;
    }

    println!("{}", serde_json::to_string_pretty(&history.to_json(&names))?);
    Ok(())
}
