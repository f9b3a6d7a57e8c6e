use std::{
    any::TypeId,
    collections::{BTreeMap, HashSet},
};

use thiserror::Error;

use crate::{
    builder::DiBuilder,
    types::{DependencyInfo, Lifestyle, TypeInfo},
};

/// Graph of the entire application
/// Used to check circular dependencies, missing registrations and lifestyle mismatches
pub struct DependencyGraph {
    map: BTreeMap<TypeId, DependencyGraphEntry>,
}
impl DependencyGraph {
    pub fn new(builder: &DiBuilder) -> Result<Self, DependencyGraphError> {
        let mut graph = Self {
            map: Default::default(),
        };

        for instance in builder.registered_instances.values() {
            graph.add(instance.info, Lifestyle::Singleton, vec![])?;
        }

        for factory in &builder.registered_factories {
            graph.add(factory.supplies(), Lifestyle::Singleton, factory.dependencies())?;
        }

        for registration in &builder.registered_scoped {
            graph.add(
                registration.factory.supplies(),
                registration.lifestyle,
                registration.factory.dependencies(),
            )?;
        }

        Ok(graph)
    }

    pub fn add(
        &mut self,
        info: TypeInfo,
        lifestyle: Lifestyle,
        dependencies: Vec<DependencyInfo>,
    ) -> Result<(), DependencyGraphError> {
        if let Some(existing) = self.map.insert(
            info.type_id,
            DependencyGraphEntry {
                info,
                lifestyle,
                dependencies,
            },
        ) {
            return Err(DependencyGraphError::Duplicate(existing.info));
        }

        Ok(())
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Validate the graph
    ///
    /// Returns a list of all issues
    pub fn check(&self) -> Result<(), DependencyGraphErrors> {
        let mut checked = HashSet::new();
        let mut errors = Vec::new();
        for entry in self.map.values() {
            let mut dependency_chain = Vec::new();
            check_recurse(
                self,
                &mut checked,
                &mut errors,
                &mut dependency_chain,
                entry,
            );
        }

        if !errors.is_empty() {
            return Err(DependencyGraphErrors { errors });
        }

        return Ok(());

        fn check_recurse(
            graph: &DependencyGraph,
            checked: &mut HashSet<TypeId>,
            errors: &mut Vec<DependencyGraphError>,
            dependency_chain: &mut Vec<TypeInfo>,
            entry: &DependencyGraphEntry,
        ) {
            // Circular Dependency Check
            if dependency_chain.contains(&entry.info) {
                let from = *dependency_chain.first().expect("must have entries");
                let to = entry.info;

                let mut chain = dependency_chain.clone();
                chain.push(to); // Add current so chain is complete

                errors.push(DependencyGraphError::CircularDependency { from, to, chain });
                return;
            }

            // Skip other checks if already checked
            if !checked.insert(entry.info.type_id) {
                return;
            };

            dependency_chain.push(entry.info);

            for dependency in &entry.dependencies {
                let Some(next_entry) = graph.map.get(&dependency.type_info.type_id) else {
                    if !dependency.optional {
                        errors.push(DependencyGraphError::MissingDependency {
                            dependency: dependency.type_info,
                            required_by: entry.info,
                        });
                    }

                    continue;
                };

                // A singleton would capture the first scope's instance forever
                if entry.lifestyle == Lifestyle::Singleton
                    && next_entry.lifestyle != Lifestyle::Singleton
                {
                    errors.push(DependencyGraphError::LifestyleMismatch {
                        consumer: entry.info,
                        dependency: next_entry.info,
                        lifestyle: next_entry.lifestyle,
                    });
                    continue;
                }

                check_recurse(graph, checked, errors, dependency_chain, next_entry);
            }

            dependency_chain.pop();
        }
    }
}

struct DependencyGraphEntry {
    info: TypeInfo,
    lifestyle: Lifestyle,
    dependencies: Vec<DependencyInfo>,
}

#[derive(Error, Debug, Clone)]
pub enum DependencyGraphError {
    #[error("A Type has been registered twice: '{0}'")]
    Duplicate(TypeInfo),
    #[error("'{required_by}' needs '{dependency}' but it is missing")]
    MissingDependency {
        dependency: TypeInfo,
        required_by: TypeInfo,
    },
    #[error("A Circular Dependency exists between '{from}' and '{to}' through {chain:?}")]
    CircularDependency {
        from: TypeInfo,
        to: TypeInfo,
        chain: Vec<TypeInfo>,
    },
    #[error("Singleton '{consumer}' depends on {lifestyle} '{dependency}'")]
    LifestyleMismatch {
        consumer: TypeInfo,
        dependency: TypeInfo,
        lifestyle: Lifestyle,
    },
}
impl std::fmt::Display for DependencyGraphErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut display = Vec::new();
        display.push("The dependency graph had one or more errors:".to_string());
        for error in &self.errors {
            display.push(format!("- {}", error));
        }
        f.write_str(&display.join("\n"))
    }
}

#[derive(Error, Debug, Clone)]
pub struct DependencyGraphErrors {
    pub errors: Vec<DependencyGraphError>,
}
