//! Static checks over the definition graph.
//!
//! [`BeanContainer::validate`](crate::BeanContainer::validate) inspects the
//! registered definitions without creating anything and reports references
//! that cannot be satisfied, by-type injection points with zero or several
//! candidates, and reference cycles the singleton cache cannot break.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::autowire::InjectionKind;
use crate::config::ContainerSettings;
use crate::container::FACTORY_BEAN_PREFIX;
use crate::definition::{BeanDefinition, PropertySource};
use crate::key::TypeKey;
use crate::registration::DefinitionRegistry;

/// Validation errors that would make resolution fail.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A property references a bean that is neither defined nor registered.
    MissingReference {
        bean: String,
        property: String,
        reference: String,
    },
    /// A by-type injection point has no candidate.
    UnsatisfiedTypeDependency {
        bean: String,
        property: String,
        type_name: &'static str,
    },
    /// A by-type injection point has more than one candidate.
    AmbiguousTypeDependency {
        bean: String,
        property: String,
        type_name: &'static str,
        candidates: Vec<String>,
    },
    /// A reference cycle that early exposure cannot break: it runs through
    /// a prototype, or circular references are disabled.
    UnresolvableCycle { cycle: Vec<String> },
}

/// Validation warnings for configurations that work but are suspicious.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationWarning {
    /// A singleton holds a prototype, so it only ever sees one instance.
    SingletonDependsOnPrototype { singleton: String, prototype: String },
    /// A lazy singleton that nothing references will never be created
    /// unless it is asked for by name.
    UnusedLazyDefinition { bean: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingReference {
                bean,
                property,
                reference,
            } => write!(
                f,
                "Bean '{}' property '{}' references undefined bean '{}'",
                bean, property, reference
            ),
            ValidationError::UnsatisfiedTypeDependency {
                bean,
                property,
                type_name,
            } => write!(
                f,
                "Bean '{}' property '{}' needs a bean of type {} but none is defined",
                bean, property, type_name
            ),
            ValidationError::AmbiguousTypeDependency {
                bean,
                property,
                type_name,
                candidates,
            } => write!(
                f,
                "Bean '{}' property '{}' needs a single bean of type {} but found: {}",
                bean,
                property,
                type_name,
                candidates.join(", ")
            ),
            ValidationError::UnresolvableCycle { cycle } => {
                write!(f, "Unresolvable circular reference: {}", cycle.join(" -> "))
            }
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::SingletonDependsOnPrototype {
                singleton,
                prototype,
            } => write!(
                f,
                "Singleton '{}' depends on prototype '{}' - will always hold the same instance",
                singleton, prototype
            ),
            ValidationWarning::UnusedLazyDefinition { bean } => {
                write!(f, "Lazy bean '{}' is never referenced", bean)
            }
        }
    }
}

/// Validation result with errors and warnings.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{Bean, BeanContainer, BeanDefinition, BeanType, ValidationError};
///
/// #[derive(Default)]
/// struct Service;
/// impl Bean for Service {}
///
/// let container = BeanContainer::new();
/// container.register_definition(
///     "service",
///     BeanDefinition::new(BeanType::of::<Service>()).reference("mapper", "mapper"),
/// );
///
/// let result = container.validate();
/// assert!(!result.is_valid());
/// assert!(matches!(result.errors[0], ValidationError::MissingReference { .. }));
/// assert!(result.format_issues().contains("undefined bean 'mapper'"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    /// Returns true if validation passed without errors.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns true if there are warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Formats errors and warnings for display.
    pub fn format_issues(&self) -> String {
        let mut output = String::new();

        if !self.errors.is_empty() {
            output.push_str("Validation Errors:\n");
            for error in &self.errors {
                output.push_str(&format!("  - {}\n", error));
            }
        }

        if !self.warnings.is_empty() {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str("Validation Warnings:\n");
            for warning in &self.warnings {
                output.push_str(&format!("  - {}\n", warning));
            }
        }

        output
    }
}

/// One outgoing edge of the reference graph.
struct Edge {
    property: String,
    target: String,
}

struct Graph<'a> {
    order: Vec<String>,
    definitions: HashMap<String, Arc<BeanDefinition>>,
    singletons: &'a [(String, TypeKey)],
    edges: HashMap<String, Vec<Edge>>,
}

impl<'a> Graph<'a> {
    fn is_known(&self, name: &str) -> bool {
        self.definitions.contains_key(name) || self.singletons.iter().any(|(n, _)| n == name)
    }

    fn is_prototype(&self, name: &str) -> bool {
        self.definitions
            .get(name)
            .map(|def| !def.is_singleton())
            .unwrap_or(false)
    }

    fn candidates(&self, key: &TypeKey) -> Vec<String> {
        let mut names: Vec<String> = self
            .order
            .iter()
            .filter(|name| {
                self.definitions
                    .get(*name)
                    .map(|def| def.bean_type().matches(key))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        for (name, concrete) in self.singletons {
            if concrete == key && !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

/// Validates the reference graph of `registry`.
///
/// `singletons` lists pre-built singletons by name and concrete type; they
/// satisfy references but contribute no edges.
pub(crate) fn validate(
    registry: &DefinitionRegistry,
    singletons: &[(String, TypeKey)],
    settings: &ContainerSettings,
) -> ValidationResult {
    let entries = registry.entries();
    let mut graph = Graph {
        order: entries.iter().map(|(name, _)| name.clone()).collect(),
        definitions: entries.into_iter().collect(),
        singletons,
        edges: HashMap::new(),
    };
    let mut result = ValidationResult::default();

    for name in graph.order.clone() {
        let definition = match graph.definitions.get(&name) {
            Some(definition) => definition.clone(),
            None => continue,
        };
        let mut edges = Vec::new();

        for property in definition.property_values().iter() {
            if let PropertySource::Reference(reference) = property.source() {
                edges.push(Edge {
                    property: property.name().to_string(),
                    target: reference.bean_name().to_string(),
                });
            }
        }

        if settings.annotation_injection {
            for point in definition.bean_type().injection_points() {
                match point.kind() {
                    InjectionKind::ByName(target) => edges.push(Edge {
                        property: point.property().to_string(),
                        target: target.clone(),
                    }),
                    InjectionKind::ByType(key) => {
                        let mut candidates = graph.candidates(key);
                        match candidates.len() {
                            0 => result.errors.push(ValidationError::UnsatisfiedTypeDependency {
                                bean: name.clone(),
                                property: point.property().to_string(),
                                type_name: key.name(),
                            }),
                            1 => edges.push(Edge {
                                property: point.property().to_string(),
                                target: candidates.remove(0),
                            }),
                            _ => result.errors.push(ValidationError::AmbiguousTypeDependency {
                                bean: name.clone(),
                                property: point.property().to_string(),
                                type_name: key.name(),
                                candidates,
                            }),
                        }
                    }
                    InjectionKind::Value(_) => {}
                }
            }
        }

        for edge in &edges {
            let target = edge.target.strip_prefix(FACTORY_BEAN_PREFIX).unwrap_or(&edge.target);
            if !graph.is_known(target) {
                result.errors.push(ValidationError::MissingReference {
                    bean: name.clone(),
                    property: edge.property.clone(),
                    reference: edge.target.clone(),
                });
            } else if definition.is_singleton() && graph.is_prototype(target) {
                result.warnings.push(ValidationWarning::SingletonDependsOnPrototype {
                    singleton: name.clone(),
                    prototype: target.to_string(),
                });
            }
        }

        graph.edges.insert(name, edges);
    }

    for cycle in detect_cycles(&graph) {
        let breakable = settings.allow_circular_references
            && cycle.iter().all(|name| !graph.is_prototype(name));
        if !breakable {
            result.errors.push(ValidationError::UnresolvableCycle { cycle });
        }
    }

    let referenced: HashSet<&str> = graph
        .edges
        .values()
        .flatten()
        .map(|edge| edge.target.strip_prefix(FACTORY_BEAN_PREFIX).unwrap_or(&edge.target))
        .collect();
    for name in &graph.order {
        let lazy = graph
            .definitions
            .get(name)
            .map(|def| def.is_singleton() && def.is_lazy_init())
            .unwrap_or(false);
        if lazy && !referenced.contains(name.as_str()) {
            result
                .warnings
                .push(ValidationWarning::UnusedLazyDefinition { bean: name.clone() });
        }
    }

    result
}

/// Detects reference cycles using DFS, in registration order. Each cycle is
/// reported once, closed with its first name.
fn detect_cycles(graph: &Graph<'_>) -> Vec<Vec<String>> {
    let mut visited = HashSet::new();
    let mut path = Vec::new();
    let mut cycles = Vec::new();
    let mut seen: HashSet<Vec<String>> = HashSet::new();

    for name in &graph.order {
        if !visited.contains(name.as_str()) {
            dfs_cycles(graph, name, &mut visited, &mut path, &mut cycles, &mut seen);
        }
    }

    cycles
}

fn dfs_cycles<'g>(
    graph: &'g Graph<'_>,
    current: &'g str,
    visited: &mut HashSet<&'g str>,
    path: &mut Vec<&'g str>,
    cycles: &mut Vec<Vec<String>>,
    seen: &mut HashSet<Vec<String>>,
) {
    if let Some(cycle_start) = path.iter().position(|&name| name == current) {
        let members = &path[cycle_start..];
        // Rotations of one cycle are the same cycle.
        let mut canonical: Vec<String> = members.iter().map(|s| s.to_string()).collect();
        canonical.sort();
        if seen.insert(canonical) {
            let mut cycle: Vec<String> = members.iter().map(|s| s.to_string()).collect();
            cycle.push(current.to_string());
            cycles.push(cycle);
        }
        return;
    }

    if visited.contains(current) {
        return;
    }

    visited.insert(current);
    path.push(current);

    if let Some(edges) = graph.edges.get(current) {
        for edge in edges {
            let target = edge
                .target
                .strip_prefix(FACTORY_BEAN_PREFIX)
                .unwrap_or(&edge.target);
            if graph.definitions.contains_key(target) {
                dfs_cycles(graph, target, visited, path, cycles, seen);
            }
        }
    }

    path.pop();
}
