use std::{
    collections::{HashMap, HashSet},
    marker::PhantomData,
};

use crate::{
    error::SchedulerError,
    task::{TaskBody, TaskSpec, TaskTags},
};

pub struct Building;
pub struct Built;

/// A task plus the bookkeeping the scheduler derives from it: its
/// already-resolved explicit+prefix dependency set and the tag set
/// guaranteed to hold once it completes.
pub(crate) struct Node {
    pub spec: TaskSpec,
    pub resolved_deps: Vec<String>,
    pub guaranteed_tags: HashSet<String>,
}

/// The actual mutable graph storage, shared by the pre-run `Scheduler`
/// builder and by the live run loop (owner tasks mutate the same shape
/// while the graph is executing, so the logic lives here once instead of
/// being duplicated between "building" and "running").
#[derive(Default)]
pub(crate) struct GraphState {
    pub nodes: HashMap<String, Node>,
    pub insertion_order: Vec<String>,
}

impl GraphState {
    /// Prefix-pattern dependencies ("name*") are re-evaluated against every
    /// task currently in the graph; this is also invoked again each time a
    /// new task is added so that later additions can't slip past an
    /// already-declared barrier (spec.md §4.1).
    fn resolve_deps(&self, deps: &[String]) -> Vec<String> {
        let mut resolved = Vec::new();
        for dep in deps {
            if let Some(prefix) = dep.strip_suffix('*') {
                resolved.extend(
                    self.insertion_order
                        .iter()
                        .filter(|name| name.starts_with(prefix))
                        .cloned(),
                );
            } else if self.nodes.contains_key(dep) {
                resolved.push(dep.clone());
            }
            // An unmatched non-prefix dependency is allowed only if the
            // name is going to be registered as a placeholder later;
            // checked for real at `seal()` / left to fail at run time if a
            // dynamically-added task dangles one.
        }
        resolved.sort();
        resolved.dedup();
        resolved
    }

    fn guaranteed_tags_for(&self, resolved_deps: &[String], own: &TaskTags) -> HashSet<String> {
        let mut tags: HashSet<String> = own.provided.iter().cloned().collect();
        for dep in resolved_deps {
            if let Some(node) = self.nodes.get(dep) {
                tags.extend(node.guaranteed_tags.iter().cloned());
            }
        }
        tags
    }

    pub fn add_task(&mut self, spec: TaskSpec) -> Result<(), SchedulerError> {
        if self.nodes.contains_key(&spec.name) {
            return Err(SchedulerError::DuplicateTask(spec.name.clone()));
        }

        let resolved_deps = self.resolve_deps(&spec.deps);
        let guaranteed = self.guaranteed_tags_for(&resolved_deps, &spec.tags);

        for tag in &spec.tags.required {
            if !guaranteed.contains(tag) {
                return Err(SchedulerError::MissingRequiredTag {
                    task: spec.name.clone(),
                    tag: tag.clone(),
                });
            }
        }
        for tag in &spec.tags.required_not {
            if guaranteed.contains(tag) {
                return Err(SchedulerError::ForbiddenTagPresent {
                    task: spec.name.clone(),
                    tag: tag.clone(),
                });
            }
        }

        let name = spec.name.clone();
        let mut guaranteed_tags = guaranteed;
        guaranteed_tags.extend(spec.tags.provided.iter().cloned());

        self.insertion_order.push(name.clone());
        self.nodes.insert(
            name.clone(),
            Node {
                spec,
                resolved_deps,
                guaranteed_tags,
            },
        );

        // Re-resolve every already-registered task's prefix dependencies,
        // in case the new task's name now matches one of them.
        let names: Vec<String> = self.insertion_order.clone();
        for existing_name in names {
            if existing_name == name {
                continue;
            }
            let matches_new_prefix = self.nodes[&existing_name]
                .spec
                .deps
                .iter()
                .any(|d| d.strip_suffix('*').is_some_and(|prefix| name.starts_with(prefix)));
            if matches_new_prefix {
                let deps = self.nodes[&existing_name].spec.deps.clone();
                let resolved = self.resolve_deps(&deps);
                self.nodes.get_mut(&existing_name).expect("known task").resolved_deps = resolved;
            }
        }

        Ok(())
    }

    pub fn replace_placeholder(&mut self, name: &str, body: TaskBody) -> Result<(), SchedulerError> {
        let node = self
            .nodes
            .get_mut(name)
            .ok_or_else(|| SchedulerError::UnknownDependency {
                task: name.to_string(),
                dependency: name.to_string(),
            })?;
        node.spec.body = body;
        Ok(())
    }

    /// Checks that need the whole graph at once: every explicit (non-prefix)
    /// dependency must name a real task, and the dependency graph must be
    /// acyclic.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        for node in self.nodes.values() {
            for dep in &node.spec.deps {
                if dep.ends_with('*') {
                    continue;
                }
                if !self.nodes.contains_key(dep) {
                    return Err(SchedulerError::UnknownDependency {
                        task: node.spec.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        if let Some(cycle) = crate::cycle::find_cycle(&self.nodes) {
            return Err(SchedulerError::Cycle { nodes: cycle });
        }

        Ok(())
    }
}

/// Typestate graph builder, grounded on `turborepo-lib::engine::{Engine,
/// EngineBuilder}`'s `Building`/`Built` split: tasks accumulate with
/// `add_task` while `Building`, then `seal()` performs the one-time global
/// checks (cycle detection across the whole graph) that can't be done
/// incrementally. Tag-contract and prefix-dependency checks still happen
/// per `add_task`, per spec.md, since later additions must not be able to
/// violate a barrier a dependant already declared.
pub struct Scheduler<State> {
    pub(crate) state: GraphState,
    marker: PhantomData<State>,
}

impl Default for Scheduler<Building> {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler<Building> {
    pub fn new() -> Self {
        Self {
            state: GraphState::default(),
            marker: PhantomData,
        }
    }

    pub fn add_task(&mut self, spec: TaskSpec) -> Result<(), SchedulerError> {
        self.state.add_task(spec)
    }

    pub fn replace_placeholder(&mut self, name: &str, body: TaskBody) -> Result<(), SchedulerError> {
        self.state.replace_placeholder(name, body)
    }

    pub fn seal(self) -> Result<Scheduler<Built>, SchedulerError> {
        self.state.validate()?;
        Ok(Scheduler {
            state: self.state,
            marker: PhantomData,
        })
    }
}

impl crate::TaskRegistrar for Scheduler<Building> {
    fn add_task(&mut self, spec: TaskSpec) -> Result<(), SchedulerError> {
        Scheduler::add_task(self, spec)
    }
}

impl Scheduler<Built> {
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.state.insertion_order.iter().map(|s| s.as_str())
    }

    pub(crate) fn into_state(self) -> GraphState {
        self.state
    }
}
