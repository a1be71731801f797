//! API level history: when each class and member was introduced,
//! deprecated and last present across an ordered series of API versions

use apigraph_core::{
    CallableItem, ClassHierarchy, ClassItem, Codebase, FieldItem, GraphError, Item, Result, SupertypeKind,
};
use apigraph_visit::{walk, ApiTraversal, ItemVisitor};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Version bookkeeping for one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiElement {
    pub since: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated_in: Option<u32>,
    pub last_present: u32,
}

impl ApiElement {
    fn new(level: u32, deprecated: bool) -> Self {
        ApiElement {
            since: level,
            deprecated_in: deprecated.then_some(level),
            last_present: level,
        }
    }

    /// Record that the element exists at `level`.
    pub fn update(&mut self, level: u32, deprecated: bool) {
        self.since = self.since.min(level);
        self.last_present = self.last_present.max(level);
        if deprecated && self.deprecated_in.is_none_or(|existing| level < existing) {
            self.deprecated_in = Some(level);
        }
    }

    pub fn introduced_not_later_than(&self, other: &ApiElement) -> bool {
        self.since <= other.since
    }

    /// The levels at which this element is reachable through `edge`, or
    /// `None` if the two never overlap.
    fn through(&self, edge: &ApiElement) -> Option<ApiElement> {
        let since = self.since.max(edge.since);
        let last_present = self.last_present.min(edge.last_present);
        (since <= last_present).then(|| ApiElement {
            since,
            deprecated_in: self.deprecated_in.map(|level| level.max(since)),
            last_present,
        })
    }

    fn merge(&mut self, other: &ApiElement) {
        self.since = self.since.min(other.since);
        self.last_present = self.last_present.max(other.last_present);
        if let Some(level) = other.deprecated_in {
            self.deprecated_in = Some(self.deprecated_in.map_or(level, |existing| existing.min(level)));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiClass {
    #[serde(flatten)]
    pub element: ApiElement,
    pub super_classes: BTreeMap<String, ApiElement>,
    pub interfaces: BTreeMap<String, ApiElement>,
    /// Constructors and methods keyed by descriptor.
    pub methods: BTreeMap<String, ApiElement>,
    pub fields: BTreeMap<String, ApiElement>,
    /// Hidden at every level it was recorded at.
    #[serde(skip)]
    pub hidden: bool,
}

impl ApiClass {
    fn new(level: u32, deprecated: bool, hidden: bool) -> Self {
        ApiClass {
            element: ApiElement::new(level, deprecated),
            super_classes: BTreeMap::new(),
            interfaces: BTreeMap::new(),
            methods: BTreeMap::new(),
            fields: BTreeMap::new(),
            hidden,
        }
    }

    fn supertypes(&self) -> impl Iterator<Item = (&String, &ApiElement)> {
        self.super_classes.iter().chain(&self.interfaces)
    }
}

/// Copy `from`, as seen through `edge`, into `into`.
fn inherit(into: &mut BTreeMap<String, ApiElement>, from: &BTreeMap<String, ApiElement>, edge: &ApiElement) {
    for (name, element) in from {
        let Some(element) = element.through(edge) else {
            continue;
        };
        match into.get_mut(name) {
            Some(existing) => existing.merge(&element),
            None => {
                into.insert(name.clone(), element);
            }
        }
    }
}

fn record(elements: &mut BTreeMap<String, ApiElement>, name: &str, level: u32, deprecated: bool) {
    match elements.get_mut(name) {
        Some(element) => element.update(level, deprecated),
        None => {
            elements.insert(name.to_string(), ApiElement::new(level, deprecated));
        }
    }
}

/// Classes and members accumulated over API levels.
#[derive(Debug, Clone, Default)]
pub struct ApiHistory {
    classes: BTreeMap<String, ApiClass>,
    latest: u32,
}

impl ApiHistory {
    pub fn new() -> Self {
        ApiHistory::default()
    }

    pub fn class(&self, name: &str) -> Option<&ApiClass> {
        self.classes.get(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = (&str, &ApiClass)> {
        self.classes.iter().map(|(name, class)| (name.as_str(), class))
    }

    pub fn latest_level(&self) -> u32 {
        self.latest
    }

    /// Record the emitted API of `codebase` as level `level`.
    pub fn add_codebase(&mut self, level: u32, codebase: &Codebase) -> Result<()> {
        let before = self.classes.len();
        let mut collector = HistoryCollector {
            history: self,
            level,
            stack: Vec::new(),
        };
        walk(codebase, &ApiTraversal::emitted(), &mut collector)?;
        self.latest = self.latest.max(level);
        info!(
            "Added API level {} from {}: {} new classes",
            level,
            codebase.description(),
            self.classes.len() - before
        );
        Ok(())
    }

    fn hierarchy(&self) -> ClassHierarchy {
        let mut hierarchy = ClassHierarchy::new();
        for (name, class) in &self.classes {
            for super_class in class.super_classes.keys() {
                hierarchy.add_supertype(name, super_class, SupertypeKind::Extends);
            }
            for interface in class.interfaces.keys() {
                hierarchy.add_supertype(name, interface, SupertypeKind::Implements);
            }
        }
        hierarchy
    }

    /// Whether `class` or one of its ancestors lists `interface` no later
    /// than `element`.
    fn implements(&self, hierarchy: &ClassHierarchy, class: &str, interface: &str, element: &ApiElement) -> bool {
        std::iter::once(class).chain(hierarchy.ancestors(class)).any(|name| {
            self.classes
                .get(name)
                .and_then(|c| c.interfaces.get(interface))
                .is_some_and(|existing| existing.introduced_not_later_than(element))
        })
    }

    /// Drop interfaces that a super class already introduced at the same or
    /// an earlier level.
    pub fn remove_implicit_interfaces(&mut self) {
        let hierarchy = self.hierarchy();
        let mut implicit = Vec::new();
        for (name, class) in &self.classes {
            for (interface, element) in &class.interfaces {
                let inherited = class.super_classes.iter().any(|(super_class, super_element)| {
                    super_element.introduced_not_later_than(element)
                        && self.implements(&hierarchy, super_class, interface, element)
                });
                if inherited {
                    implicit.push((name.clone(), interface.clone()));
                }
            }
        }
        for (class, interface) in implicit {
            debug!("Dropping implicit interface {} of {}", interface, class);
            if let Some(class) = self.classes.get_mut(&class) {
                class.interfaces.remove(&interface);
            }
        }
    }

    fn hidden_classes(&self) -> BTreeSet<String> {
        self.classes
            .iter()
            .filter(|(_, class)| class.hidden)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Copy the members and supertypes of hidden super classes and
    /// interfaces into each visible class extending them, following chains
    /// of hidden classes. Inherited entries only cover the levels at which
    /// the class actually extended the hidden one.
    pub fn inline_from_hidden_super_classes(&mut self) {
        let hidden = self.hidden_classes();
        if hidden.is_empty() {
            return;
        }

        let mut inlined = Vec::new();
        for (name, class) in &self.classes {
            if class.hidden {
                continue;
            }
            let mut pending: Vec<(String, ApiElement)> = class
                .supertypes()
                .filter(|(supertype, _)| hidden.contains(*supertype))
                .map(|(supertype, edge)| (supertype.clone(), edge.clone()))
                .collect();
            if pending.is_empty() {
                continue;
            }

            let mut inherited = ApiClass::new(class.element.since, false, false);
            let mut seen = BTreeSet::new();
            while let Some((supertype, edge)) = pending.pop() {
                if !seen.insert(supertype.clone()) {
                    continue;
                }
                let Some(hidden_class) = self.classes.get(&supertype) else {
                    continue;
                };
                debug!("Inlining hidden {} into {}", supertype, name);
                inherit(&mut inherited.methods, &hidden_class.methods, &edge);
                inherit(&mut inherited.fields, &hidden_class.fields, &edge);
                inherit(&mut inherited.super_classes, &hidden_class.super_classes, &edge);
                inherit(&mut inherited.interfaces, &hidden_class.interfaces, &edge);
                for (next, next_edge) in hidden_class.supertypes() {
                    if hidden.contains(next) {
                        pending.extend(next_edge.through(&edge).map(|e| (next.clone(), e)));
                    }
                }
            }
            inlined.push((name.clone(), inherited));
        }

        for (name, inherited) in inlined {
            if let Some(class) = self.classes.get_mut(&name) {
                let bounds = class.element.clone();
                inherit(&mut class.methods, &inherited.methods, &bounds);
                inherit(&mut class.fields, &inherited.fields, &bounds);
                inherit(&mut class.super_classes, &inherited.super_classes, &bounds);
                inherit(&mut class.interfaces, &inherited.interfaces, &bounds);
            }
        }
    }

    /// Drop hidden classes along with every super class and interface entry
    /// naming one. Run [`Self::inline_from_hidden_super_classes`] first so
    /// their members survive in the visible subclasses.
    pub fn remove_hidden_super_classes(&mut self) {
        let hidden = self.hidden_classes();
        for name in &hidden {
            debug!("Dropping hidden class {}", name);
            self.classes.remove(name);
        }
        for class in self.classes.values_mut() {
            class.super_classes.retain(|name, _| !hidden.contains(name));
            class.interfaces.retain(|name, _| !hidden.contains(name));
        }
    }

    /// Names referenced as super classes or interfaces that have no entry
    /// of their own.
    pub fn missing_classes(&self) -> BTreeSet<String> {
        self.classes
            .values()
            .flat_map(|class| class.supertypes())
            .map(|(name, _)| name)
            .filter(|name| !self.classes.contains_key(*name))
            .cloned()
            .collect()
    }

    /// Drop references to missing classes, returning their names.
    pub fn remove_missing_classes(&mut self) -> BTreeSet<String> {
        let missing = self.missing_classes();
        for (name, class) in &mut self.classes {
            for (kind, supertypes) in [("super class", &mut class.super_classes), ("interface", &mut class.interfaces)] {
                supertypes.retain(|supertype, _| {
                    let keep = !missing.contains(supertype);
                    if !keep {
                        warn!("Dropping missing {} {} of {}", kind, supertype, name);
                    }
                    keep
                });
            }
        }
        missing
    }

    /// Fail if any super class or interface is missing from the history.
    pub fn verify_no_missing_classes(&self) -> Result<()> {
        let missing = self.missing_classes();
        if missing.is_empty() {
            return Ok(());
        }
        Err(GraphError::MissingClasses(missing.into_iter().collect::<Vec<_>>().join(", ")))
    }

    /// Drop methods that an ancestor already declared at the same or an
    /// earlier level.
    pub fn remove_overriding_methods(&mut self) {
        let hierarchy = self.hierarchy();
        let mut overriding = Vec::new();
        for (name, class) in &self.classes {
            let ancestors = hierarchy.ancestors(name);
            for (descriptor, element) in &class.methods {
                let declared_above = ancestors.iter().any(|ancestor| {
                    self.classes
                        .get(*ancestor)
                        .and_then(|a| a.methods.get(descriptor))
                        .is_some_and(|existing| existing.introduced_not_later_than(element))
                });
                if declared_above {
                    overriding.push((name.clone(), descriptor.clone()));
                }
            }
        }
        for (class, descriptor) in overriding {
            debug!("Dropping overriding method {}#{}", class, descriptor);
            if let Some(class) = self.classes.get_mut(&class) {
                class.methods.remove(&descriptor);
            }
        }
    }

    /// Render the history as JSON. `version_names[n - 1]` names level `n`;
    /// levels without a name are printed as numbers. Elements missing from
    /// the latest level get a `removed` entry naming the first level
    /// without them.
    pub fn to_json(&self, version_names: &[String]) -> serde_json::Value {
        let name = |level: u32| -> serde_json::Value {
            level
                .checked_sub(1)
                .and_then(|index| version_names.get(index as usize))
                .map_or_else(|| serde_json::Value::from(level), |n| serde_json::Value::from(n.as_str()))
        };
        let element = |element: &ApiElement| -> serde_json::Value {
            let mut value = serde_json::json!({ "since": name(element.since) });
            if let Some(level) = element.deprecated_in {
                value["deprecated"] = name(level);
            }
            if element.last_present < self.latest {
                value["removed"] = name(element.last_present + 1);
            }
            value
        };
        let members = |members: &BTreeMap<String, ApiElement>| -> serde_json::Value {
            members
                .iter()
                .map(|(member, e)| {
                    let mut value = element(e);
                    value["name"] = serde_json::Value::from(member.as_str());
                    value
                })
                .collect()
        };

        let classes: Vec<serde_json::Value> = self
            .classes
            .iter()
            .map(|(class_name, class)| {
                let mut value = element(&class.element);
                value["name"] = serde_json::Value::from(class_name.as_str());
                value["superclasses"] = members(&class.super_classes);
                value["interfaces"] = members(&class.interfaces);
                value["methods"] = members(&class.methods);
                value["fields"] = members(&class.fields);
                value
            })
            .collect();
        serde_json::json!({ "versions": version_names, "classes": classes })
    }
}

struct HistoryCollector<'h> {
    history: &'h mut ApiHistory,
    level: u32,
    /// Qualified names of the classes being visited; `None` for classes
    /// visited without being emitted.
    stack: Vec<Option<String>>,
}

impl HistoryCollector<'_> {
    fn current(&mut self) -> Option<&mut ApiClass> {
        let name = self.stack.last()?.as_ref()?;
        self.history.classes.get_mut(name)
    }

    fn add_callable(&mut self, callable: &CallableItem) {
        let level = self.level;
        if let Some(class) = self.current() {
            record(&mut class.methods, &callable.descriptor(), level, callable.is_deprecated());
        }
    }
}

impl ItemVisitor for HistoryCollector<'_> {
    fn visit_class(&mut self, _codebase: &Codebase, class: &ClassItem, emit: bool) -> Result<()> {
        if !emit {
            self.stack.push(None);
            return Ok(());
        }
        let level = self.level;
        let deprecated = class.is_deprecated();
        let hidden = class.is_hidden();
        let entry = self
            .history
            .classes
            .entry(class.qualified_name().to_string())
            .and_modify(|existing| {
                existing.element.update(level, deprecated);
                existing.hidden &= hidden;
            })
            .or_insert_with(|| ApiClass::new(level, deprecated, hidden));

        if let Some(super_class) = &class.super_class {
            record(&mut entry.super_classes, &super_class.qualified_name, level, false);
        }
        for interface in &class.interfaces {
            record(&mut entry.interfaces, &interface.qualified_name, level, false);
        }
        self.stack.push(Some(class.qualified_name().to_string()));
        Ok(())
    }

    fn after_visit_class(&mut self, _codebase: &Codebase, _class: &ClassItem, _emit: bool) -> Result<()> {
        self.stack.pop();
        Ok(())
    }

    fn visit_constructor(&mut self, _codebase: &Codebase, constructor: &CallableItem) -> Result<()> {
        self.add_callable(constructor);
        Ok(())
    }

    fn visit_method(&mut self, _codebase: &Codebase, method: &CallableItem) -> Result<()> {
        self.add_callable(method);
        Ok(())
    }

    fn visit_field(&mut self, _codebase: &Codebase, field: &FieldItem) -> Result<()> {
        let level = self.level;
        if let Some(class) = self.current() {
            record(&mut class.fields, field.name(), level, field.is_deprecated());
        }
        Ok(())
    }
}
