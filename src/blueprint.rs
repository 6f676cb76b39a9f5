use std::collections::HashMap;
use std::sync::Arc;

use petgraph::graph::DiGraph;

use crate::error::{BuildError, StageError};
use crate::graph::{TaskFn, TaskGraph, TaskNode};

/// The declaration of a task graph.
///
/// `Blueprint` collects task declarations in order. Prerequisites are referred
/// to by name and may point at tasks declared later; they are only resolved
/// when [`Blueprint::finish`] turns the declarations into an immutable
/// [`TaskGraph`].
///
/// # Example
///
/// ```rust
/// use assetline::Blueprint;
///
/// let mut blueprint = Blueprint::new();
/// blueprint.task("clean").run(|| Ok(()));
/// blueprint.task("minify-css").depends_on(["clean"]).run(|| Ok(()));
/// blueprint.task("default").depends_on(["minify-css"]).group();
/// blueprint.default_task("default");
///
/// let graph = blueprint.finish().unwrap();
/// assert_eq!(graph.plan(None).unwrap().tasks(), ["clean", "minify-css", "default"]);
/// ```
#[derive(Default)]
pub struct Blueprint {
    tasks: Vec<TaskNode>,
    default: Option<String>,
}

impl Blueprint {
    /// Creates a new, empty blueprint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start declaring a task called `name`.
    pub fn task(&mut self, name: impl Into<String>) -> TaskDef<'_> {
        TaskDef {
            blueprint: self,
            name: name.into(),
            prerequisites: Vec::new(),
        }
    }

    /// Task to run when none is requested.
    pub fn default_task(&mut self, name: impl Into<String>) -> &mut Self {
        self.default = Some(name.into());
        self
    }

    /// Validate the declarations and build the graph.
    ///
    /// Fails on duplicate task names, on prerequisites naming undefined tasks,
    /// and on a default task that isn't defined. Cycles are legal here and are
    /// reported when the graph is planned.
    pub fn finish(self) -> Result<TaskGraph, BuildError> {
        let mut graph = DiGraph::with_capacity(self.tasks.len(), self.tasks.len());
        let mut lookup = HashMap::new();

        for task in self.tasks {
            if lookup.contains_key(&task.name) {
                return Err(BuildError::DuplicateTask(task.name));
            }

            let name = task.name.clone();
            let index = graph.add_node(task);
            lookup.insert(name, index);
        }

        let mut edges = Vec::new();
        for index in graph.node_indices() {
            let task = &graph[index];

            for prerequisite in &task.prerequisites {
                let &source = lookup
                    .get(prerequisite)
                    .ok_or_else(|| BuildError::UnknownPrerequisite {
                        task: task.name.clone(),
                        prerequisite: prerequisite.clone(),
                    })?;

                edges.push((source, index));
            }
        }

        for (source, target) in edges {
            graph.update_edge(source, target, ());
        }

        if let Some(name) = &self.default
            && !lookup.contains_key(name)
        {
            return Err(BuildError::UnknownTask(name.clone()));
        }

        Ok(TaskGraph {
            graph,
            lookup,
            default: self.default,
        })
    }
}

/// A task being declared. Finish it with [`TaskDef::run`] or [`TaskDef::group`].
pub struct TaskDef<'a> {
    blueprint: &'a mut Blueprint,
    name: String,
    prerequisites: Vec<String>,
}

impl<'a> TaskDef<'a> {
    /// Tasks that must reach `Done` before this one may start.
    pub fn depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerequisites.extend(names.into_iter().map(Into::into));
        self
    }

    /// Finish the declaration with a body.
    pub fn run<F>(self, body: F)
    where
        F: Fn() -> Result<(), StageError> + Send + Sync + 'static,
    {
        self.finish(Some(Arc::new(body)));
    }

    /// Finish the declaration without a body; the task only aggregates its
    /// prerequisites.
    pub fn group(self) {
        self.finish(None);
    }

    fn finish(self, body: Option<TaskFn>) {
        self.blueprint.tasks.push(TaskNode {
            name: self.name,
            prerequisites: self.prerequisites,
            body,
        });
    }
}
