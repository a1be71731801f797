//! Compatibility checking between a released and a current API

use crate::comparator::{CodebaseComparator, CompareContext, ComparisonVisitor};
use apigraph_core::{
    CallableItem, ClassId, ClassItem, Codebase, FieldItem, Item, ItemBase, ItemId, ItemRef, PackageItem, ParameterItem, PropertyItem,
    Result,
};
use apigraph_visit::{EmitFilter, ItemFilter, ItemFilterExt, NotHiddenFilter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// How serious an incompatibility is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    RemovedPackage,
    RemovedClass,
    RemovedMethod,
    RemovedField,
    RemovedProperty,
    ChangedType,
    ChangedSuperClass,
    AddedFinal,
    ChangedStatic,
    ReducedVisibility,
    AddedAbstractMethod,
    ChangedParameterName,
    AddedDeprecation,
}

impl IssueKind {
    pub fn name(self) -> &'static str {
        match self {
            IssueKind::RemovedPackage => "removed_package",
            IssueKind::RemovedClass => "removed_class",
            IssueKind::RemovedMethod => "removed_method",
            IssueKind::RemovedField => "removed_field",
            IssueKind::RemovedProperty => "removed_property",
            IssueKind::ChangedType => "changed_type",
            IssueKind::ChangedSuperClass => "changed_super_class",
            IssueKind::AddedFinal => "added_final",
            IssueKind::ChangedStatic => "changed_static",
            IssueKind::ReducedVisibility => "reduced_visibility",
            IssueKind::AddedAbstractMethod => "added_abstract_method",
            IssueKind::ChangedParameterName => "changed_parameter_name",
            IssueKind::AddedDeprecation => "added_deprecation",
        }
    }

    pub fn default_severity(self) -> Severity {
        match self {
            IssueKind::ChangedParameterName => Severity::Warning,
            IssueKind::AddedDeprecation => Severity::Info,
            _ => Severity::Error,
        }
    }
}

/// A single incompatibility, located by its description in the old or new
/// codebase (`a.b.C`, `a.b.C#m(int)`, `a.b.C#FIELD`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub item: String,
    pub message: String,
}

impl fmt::Display for CompatibilityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}: {}", self.severity, self.kind.name(), self.item, self.message)
    }
}

/// Result of checking one codebase against another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityReport {
    pub old: String,
    pub new: String,
    pub generated_at: DateTime<Utc>,
    pub issues: Vec<CompatibilityIssue>,
}

impl CompatibilityReport {
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        CompatibilityReport {
            old: old.into(),
            new: new.into(),
            generated_at: Utc::now(),
            issues: Vec::new(),
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|issue| issue.severity == severity).count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    pub fn is_compatible(&self) -> bool {
        !self.has_errors()
    }

    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &CompatibilityIssue> {
        self.issues.iter().filter(move |issue| issue.kind == kind)
    }

    /// One line per issue followed by a summary line.
    pub fn render(&self) -> String {
        let mut text = String::new();
        for issue in &self.issues {
            text.push_str(&issue.to_string());
            text.push('\n');
        }
        text.push_str(&format!(
            "{} errors, {} warnings, {} infos ({} -> {})",
            self.count(Severity::Error),
            self.count(Severity::Warning),
            self.count(Severity::Info),
            self.old,
            self.new
        ));
        text
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// [`ComparisonVisitor`] that records incompatibilities between an old
/// (released) and a new (current) codebase.
///
/// Only the emitted, non-hidden API counts: an item is part of it when it
/// and every class enclosing it pass [`api_filter`]. Items that leave the
/// API are reported as removed; items outside it on either side are not
/// checked.
pub struct CompatibilityChecker {
    report: CompatibilityReport,
    /// Whether the callable last passed to `compare_callable` is API on
    /// both sides; its parameters are compared right after it.
    callable_in_api: bool,
}

/// Predicate for items that make up the checked API.
pub fn api_filter() -> impl ItemFilter {
    EmitFilter.and(NotHiddenFilter)
}

fn class_in_api(codebase: &Codebase, class: ClassId) -> bool {
    let api = api_filter();
    std::iter::once(class)
        .chain(codebase.outer_classes(class))
        .all(|id| api.test(codebase, ItemRef::Class(codebase.class(id))))
}

fn member_in_api(codebase: &Codebase, member: ItemRef<'_>, class: ClassId) -> bool {
    api_filter().test(codebase, member) && class_in_api(codebase, class)
}

/// Whether the old counterpart of `class` was part of the API.
fn class_was_api(cx: CompareContext<'_>, class: &ClassItem) -> bool {
    cx.old
        .find_class_id(class.qualified_name())
        .is_some_and(|id| class_in_api(cx.old, id))
}

/// Whether a member removed from `class` should be reported: it was API
/// and its class still is, so the removal is not already covered by the
/// class leaving.
fn member_removal_counts(cx: CompareContext<'_>, member: ItemRef<'_>, class: ClassId) -> bool {
    member_in_api(cx.old, member, class)
        && cx
            .new
            .find_class_id(cx.old.class(class).qualified_name())
            .is_some_and(|id| class_in_api(cx.new, id))
}

impl CompatibilityChecker {
    pub fn new(old: &Codebase, new: &Codebase) -> Self {
        CompatibilityChecker {
            report: CompatibilityReport::new(old.description(), new.description()),
            callable_in_api: false,
        }
    }

    /// Compare the emitted, non-hidden API of `old` with `new`.
    pub fn check(old: &Codebase, new: &Codebase) -> Result<CompatibilityReport> {
        let mut checker = CompatibilityChecker::new(old, new);
        CodebaseComparator::new()
            .with_filter(api_filter())
            .compare(old, new, &mut checker)?;
        let report = checker.finish();
        info!(
            "Compatibility of {} against {}: {} errors, {} warnings",
            report.new,
            report.old,
            report.count(Severity::Error),
            report.count(Severity::Warning)
        );
        Ok(report)
    }

    pub fn finish(self) -> CompatibilityReport {
        self.report
    }

    fn report(&mut self, kind: IssueKind, item: String, message: String) {
        self.report.issues.push(CompatibilityIssue {
            kind,
            severity: kind.default_severity(),
            item,
            message,
        });
    }

    /// Modifier changes shared by every kind of declaration.
    fn check_modifiers(&mut self, item: &str, old: &ItemBase, new: &ItemBase, can_add_final: bool) {
        let (old_modifiers, new_modifiers) = (&old.modifiers, &new.modifiers);
        if new_modifiers.visibility < old_modifiers.visibility {
            self.report(
                IssueKind::ReducedVisibility,
                item.to_string(),
                format!(
                    "visibility reduced from {} to {}",
                    old_modifiers.visibility.keyword(),
                    new_modifiers.visibility.keyword()
                ),
            );
        }
        if old_modifiers.is_static != new_modifiers.is_static {
            let change = if new_modifiers.is_static { "became static" } else { "is no longer static" };
            self.report(IssueKind::ChangedStatic, item.to_string(), change.to_string());
        }
        if !can_add_final && !old_modifiers.is_final && new_modifiers.is_final {
            self.report(IssueKind::AddedFinal, item.to_string(), "added final".to_string());
        }
        if !old_modifiers.deprecated && new_modifiers.deprecated {
            self.report(IssueKind::AddedDeprecation, item.to_string(), "deprecated".to_string());
        }
    }

    fn check_added_callable(&mut self, cx: CompareContext<'_>, new: &CallableItem) {
        let class = cx.new.class(new.containing_class());
        let modifiers = &new.base.modifiers;
        let is_abstract = if class.is_interface() {
            !modifiers.is_default && !modifiers.is_static
        } else {
            modifiers.is_abstract
        };
        if !new.is_constructor() && is_abstract {
            self.report(
                IssueKind::AddedAbstractMethod,
                describe_callable(cx.new, new),
                format!("added abstract method to {}", class.qualified_name()),
            );
        }
    }
}

fn describe_callable(codebase: &Codebase, callable: &CallableItem) -> String {
    codebase.describe(ItemId::Callable(callable.id()))
}

/// How a matched pair relates to the API on each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Both,
    /// API in the old codebase only: the item was hidden or stopped being
    /// emitted.
    Left,
    /// API in the new codebase only.
    Entered,
    Neither,
}

impl Presence {
    fn of(old: bool, new: bool) -> Self {
        match (old, new) {
            (true, true) => Presence::Both,
            (true, false) => Presence::Left,
            (false, true) => Presence::Entered,
            (false, false) => Presence::Neither,
        }
    }
}

const LEFT_API: &str = "no longer part of the API";

impl ComparisonVisitor for CompatibilityChecker {
    fn removed_package(&mut self, cx: CompareContext<'_>, old: &PackageItem) -> Result<()> {
        // A package holding only hidden classes was never part of the API.
        let has_api_classes = cx
            .old
            .all_classes_in_package(old.id())
            .into_iter()
            .any(|id| class_in_api(cx.old, id));
        if !has_api_classes {
            return Ok(());
        }
        self.report(IssueKind::RemovedPackage, old.name().to_string(), "removed package".to_string());
        Ok(())
    }

    fn compare_class(&mut self, cx: CompareContext<'_>, old: &ClassItem, new: &ClassItem) -> Result<()> {
        let item = new.qualified_name();
        match Presence::of(class_in_api(cx.old, old.id()), class_in_api(cx.new, new.id())) {
            Presence::Both => {}
            Presence::Left => {
                self.report(IssueKind::RemovedClass, item.to_string(), LEFT_API.to_string());
                return Ok(());
            }
            Presence::Entered | Presence::Neither => return Ok(()),
        }

        let old_super = old.super_class.as_ref().map(|s| s.qualified_name.as_str());
        let new_super = new.super_class.as_ref().map(|s| s.qualified_name.as_str());
        if old_super != new_super {
            self.report(
                IssueKind::ChangedSuperClass,
                item.to_string(),
                format!(
                    "super class changed from {} to {}",
                    old_super.unwrap_or("none"),
                    new_super.unwrap_or("none")
                ),
            );
        }
        self.check_modifiers(item, &old.base, &new.base, false);
        Ok(())
    }

    fn removed_class(&mut self, cx: CompareContext<'_>, old: &ClassItem) -> Result<()> {
        if class_in_api(cx.old, old.id()) {
            self.report(IssueKind::RemovedClass, old.qualified_name().to_string(), "removed class".to_string());
        }
        Ok(())
    }

    fn compare_callable(&mut self, cx: CompareContext<'_>, old: &CallableItem, new: &CallableItem) -> Result<()> {
        let old_api = member_in_api(cx.old, ItemRef::Callable(old), old.containing_class());
        let new_api = member_in_api(cx.new, ItemRef::Callable(new), new.containing_class());
        let presence = Presence::of(old_api, new_api);
        self.callable_in_api = presence == Presence::Both;

        let item = describe_callable(cx.new, new);
        match presence {
            Presence::Both => {}
            // A class leaving the API is reported once, for the class.
            Presence::Left if class_in_api(cx.new, new.containing_class()) => {
                let what = if new.is_constructor() { "constructor" } else { "method" };
                self.report(IssueKind::RemovedMethod, item, format!("{} {}", what, LEFT_API));
                return Ok(());
            }
            Presence::Entered if class_was_api(cx, cx.new.class(new.containing_class())) => {
                self.check_added_callable(cx, new);
                return Ok(());
            }
            _ => return Ok(()),
        }

        if !new.is_constructor() && old.return_type.erased() != new.return_type.erased() {
            self.report(
                IssueKind::ChangedType,
                item.clone(),
                format!(
                    "return type changed from {} to {}",
                    old.return_type.erased(),
                    new.return_type.erased()
                ),
            );
        }
        let class_is_final = cx.new.class(new.containing_class()).base.modifiers.is_final;
        self.check_modifiers(&item, &old.base, &new.base, class_is_final || new.base.modifiers.is_static);
        Ok(())
    }

    fn added_callable(&mut self, cx: CompareContext<'_>, new: &CallableItem) -> Result<()> {
        let class = cx.new.class(new.containing_class());
        if member_in_api(cx.new, ItemRef::Callable(new), class.id()) && class_was_api(cx, class) {
            self.check_added_callable(cx, new);
        }
        Ok(())
    }

    fn removed_callable(&mut self, cx: CompareContext<'_>, old: &CallableItem) -> Result<()> {
        if !member_removal_counts(cx, ItemRef::Callable(old), old.containing_class()) {
            return Ok(());
        }
        let what = if old.is_constructor() { "removed constructor" } else { "removed method" };
        self.report(IssueKind::RemovedMethod, describe_callable(cx.old, old), what.to_string());
        Ok(())
    }

    fn compare_parameter(
        &mut self,
        cx: CompareContext<'_>,
        callable: &CallableItem,
        old: &ParameterItem,
        new: &ParameterItem,
    ) -> Result<()> {
        if !self.callable_in_api {
            return Ok(());
        }
        if !old.name.is_empty() && !new.name.is_empty() && old.name != new.name {
            self.report(
                IssueKind::ChangedParameterName,
                describe_callable(cx.new, callable),
                format!("parameter {} renamed from {} to {}", new.index(), old.name, new.name),
            );
        }
        Ok(())
    }

    fn compare_field(&mut self, cx: CompareContext<'_>, old: &FieldItem, new: &FieldItem) -> Result<()> {
        let item = cx.new.describe(ItemId::Field(new.id()));
        let old_api = member_in_api(cx.old, ItemRef::Field(old), old.containing_class());
        let new_api = member_in_api(cx.new, ItemRef::Field(new), new.containing_class());
        match Presence::of(old_api, new_api) {
            Presence::Both => {}
            Presence::Left if class_in_api(cx.new, new.containing_class()) => {
                self.report(IssueKind::RemovedField, item, format!("field {}", LEFT_API));
                return Ok(());
            }
            _ => return Ok(()),
        }

        if old.ty.erased() != new.ty.erased() {
            self.report(
                IssueKind::ChangedType,
                item.clone(),
                format!("type changed from {} to {}", old.ty.erased(), new.ty.erased()),
            );
        }
        self.check_modifiers(&item, &old.base, &new.base, false);
        Ok(())
    }

    fn removed_field(&mut self, cx: CompareContext<'_>, old: &FieldItem) -> Result<()> {
        if !member_removal_counts(cx, ItemRef::Field(old), old.containing_class()) {
            return Ok(());
        }
        let what = if old.is_enum_constant { "removed enum constant" } else { "removed field" };
        self.report(IssueKind::RemovedField, cx.old.describe(ItemId::Field(old.id())), what.to_string());
        Ok(())
    }

    fn compare_property(&mut self, cx: CompareContext<'_>, old: &PropertyItem, new: &PropertyItem) -> Result<()> {
        let item = cx.new.describe(ItemId::Property(new.id()));
        let old_api = member_in_api(cx.old, ItemRef::Property(old), old.containing_class());
        let new_api = member_in_api(cx.new, ItemRef::Property(new), new.containing_class());
        match Presence::of(old_api, new_api) {
            Presence::Both => {}
            Presence::Left if class_in_api(cx.new, new.containing_class()) => {
                self.report(IssueKind::RemovedProperty, item, format!("property {}", LEFT_API));
                return Ok(());
            }
            _ => return Ok(()),
        }

        if old.ty.erased() != new.ty.erased() {
            self.report(
                IssueKind::ChangedType,
                item,
                format!("type changed from {} to {}", old.ty.erased(), new.ty.erased()),
            );
        }
        Ok(())
    }

    fn removed_property(&mut self, cx: CompareContext<'_>, old: &PropertyItem) -> Result<()> {
        if !member_removal_counts(cx, ItemRef::Property(old), old.containing_class()) {
            return Ok(());
        }
        self.report(
            IssueKind::RemovedProperty,
            cx.old.describe(ItemId::Property(old.id())),
            "removed property".to_string(),
        );
        Ok(())
    }
}
