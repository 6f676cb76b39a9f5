//! The immutable task graph.
//!
//! A [`TaskGraph`] is built once by a [`Blueprint`](crate::Blueprint) and is
//! never mutated afterwards. Each node is a named task, each edge points from a
//! prerequisite to the task that depends on it. Nodes are inserted in
//! declaration order, so a node's index doubles as its declaration rank and
//! breaks ties between independent tasks when planning.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};

use crate::error::{BuildError, StageError};

/// Body of a task: a zero-argument action with filesystem side effects.
pub(crate) type TaskFn = Arc<dyn Fn() -> Result<(), StageError> + Send + Sync>;

pub(crate) struct TaskNode {
    pub name: String,
    pub prerequisites: Vec<String>,
    pub body: Option<TaskFn>,
}

impl TaskNode {
    pub(crate) fn run(&self) -> Result<(), StageError> {
        match &self.body {
            Some(body) => body(),
            None => Ok(()),
        }
    }
}

/// A validated set of named tasks and their prerequisite edges.
pub struct TaskGraph {
    pub(crate) graph: DiGraph<TaskNode, ()>,
    pub(crate) lookup: HashMap<String, NodeIndex>,
    pub(crate) default: Option<String>,
}

/// The tasks a request resolves to, in the order they may run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub target: String,
    pub(crate) order: Vec<NodeIndex>,
    names: Vec<String>,
}

impl Plan {
    /// Task names in execution order.
    pub fn tasks(&self) -> &[String] {
        &self.names
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}

impl TaskGraph {
    /// Task names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(|node| node.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    /// Declared prerequisites of `name`, in declaration order.
    pub fn prerequisites(&self, name: &str) -> Option<&[String]> {
        self.lookup
            .get(name)
            .map(|&index| self.graph[index].prerequisites.as_slice())
    }

    pub fn default_task(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub(crate) fn node(&self, index: NodeIndex) -> &TaskNode {
        &self.graph[index]
    }

    /// Resolve `target` (or the default task) into an execution order.
    ///
    /// The order holds the target and its transitive prerequisites only, with
    /// every prerequisite strictly before its dependents. Among tasks that
    /// become ready at the same time the one declared first goes first.
    pub fn plan(&self, target: Option<&str>) -> Result<Plan, BuildError> {
        let target = match target {
            Some(name) => name,
            None => self.default.as_deref().ok_or(BuildError::NoDefault)?,
        };

        let &start = self
            .lookup
            .get(target)
            .ok_or_else(|| BuildError::UnknownTask(target.to_string()))?;

        // Reject any cycle up front, before a single body gets a chance to run.
        petgraph::algo::toposort(&self.graph, None)
            .map_err(|cycle| BuildError::Cycle(self.graph[cycle.node_id()].name.clone()))?;

        let mut closure = HashSet::new();
        let mut dfs = Dfs::new(Reversed(&self.graph), start);
        while let Some(index) = dfs.next(Reversed(&self.graph)) {
            closure.insert(index);
        }

        let mut pending: HashMap<NodeIndex, usize> = closure
            .iter()
            .map(|&index| {
                let count = self
                    .graph
                    .neighbors_directed(index, Direction::Incoming)
                    .count();
                (index, count)
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<NodeIndex>> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(&index, _)| Reverse(index))
            .collect();

        let mut order = Vec::with_capacity(closure.len());
        while let Some(Reverse(index)) = ready.pop() {
            order.push(index);

            for dependent in self.graph.neighbors_directed(index, Direction::Outgoing) {
                if let Some(count) = pending.get_mut(&dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(Reverse(dependent));
                    }
                }
            }
        }

        let names = order
            .iter()
            .map(|&index| self.graph[index].name.clone())
            .collect();

        Ok(Plan {
            target: target.to_string(),
            order,
            names,
        })
    }
}

impl Display for TaskGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "graph LR")?;

        for index in self.graph.node_indices() {
            let name = self.graph[index].name.replace('"', "\\\"");
            writeln!(f, "    {}[\"{}\"]", index.index(), name)?;
        }

        for edge in self.graph.raw_edges() {
            writeln!(f, "    {} --> {}", edge.source().index(), edge.target().index())?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGraph")
            .field("tasks", &self.names().collect::<Vec<_>>())
            .field("default", &self.default)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::Blueprint;
    use crate::error::BuildError;

    fn position(plan: &[String], name: &str) -> usize {
        plan.iter().position(|n| n == name).unwrap()
    }

    fn pipeline_shape() -> crate::TaskGraph {
        let mut blueprint = Blueprint::new();
        blueprint.task("default").depends_on(["web-resources", "uglify", "minify-css"]).group();
        blueprint.task("clean").run(|| Ok(()));
        blueprint.task("web-resources").depends_on(["clean"]).run(|| Ok(()));
        blueprint.task("uglify").depends_on(["uglify-bespoke", "uglify-vendor"]).group();
        blueprint.task("uglify-bespoke").depends_on(["clean"]).run(|| Ok(()));
        blueprint.task("uglify-vendor").depends_on(["clean"]).run(|| Ok(()));
        blueprint.task("minify-css").depends_on(["clean"]).run(|| Ok(()));
        blueprint.task("unrelated").run(|| Ok(()));
        blueprint.default_task("default");
        blueprint.finish().unwrap()
    }

    #[test]
    fn plan_is_topological() {
        let graph = pipeline_shape();
        let plan = graph.plan(None).unwrap();
        let tasks = plan.tasks();

        for name in tasks {
            for prerequisite in graph.prerequisites(name).unwrap() {
                assert!(position(tasks, prerequisite) < position(tasks, name));
            }
        }
        assert_eq!(tasks.last().map(String::as_str), Some("default"));
    }

    #[test]
    fn plan_breaks_ties_by_declaration() {
        let graph = pipeline_shape();
        let plan = graph.plan(Some("default")).unwrap();

        assert_eq!(
            plan.tasks(),
            [
                "clean",
                "web-resources",
                "uglify-bespoke",
                "uglify-vendor",
                "uglify",
                "minify-css",
                "default"
            ]
        );
    }

    #[test]
    fn plan_only_holds_the_closure() {
        let graph = pipeline_shape();

        let plan = graph.plan(Some("uglify-vendor")).unwrap();
        assert_eq!(plan.tasks(), ["clean", "uglify-vendor"]);
        assert_eq!(plan.target, "uglify-vendor");

        let plan = graph.plan(Some("clean")).unwrap();
        assert_eq!(plan.tasks(), ["clean"]);
    }

    #[test]
    fn unknown_task_fails() {
        let graph = pipeline_shape();
        let err = graph.plan(Some("deploy")).unwrap_err();
        assert!(matches!(err, BuildError::UnknownTask(name) if name == "deploy"));
    }

    #[test]
    fn missing_default_fails() {
        let mut blueprint = Blueprint::new();
        blueprint.task("clean").run(|| Ok(()));
        let graph = blueprint.finish().unwrap();

        assert!(matches!(graph.plan(None), Err(BuildError::NoDefault)));
    }

    #[test]
    fn cycle_fails() {
        let mut blueprint = Blueprint::new();
        blueprint.task("clean").run(|| Ok(()));
        blueprint.task("a").depends_on(["clean", "b"]).run(|| Ok(()));
        blueprint.task("b").depends_on(["a"]).run(|| Ok(()));
        let graph = blueprint.finish().unwrap();

        let err = graph.plan(Some("clean")).unwrap_err();
        assert!(matches!(err, BuildError::Cycle(name) if name == "a" || name == "b"));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut blueprint = Blueprint::new();
        blueprint.task("loop").depends_on(["loop"]).run(|| Ok(()));
        let graph = blueprint.finish().unwrap();

        assert!(matches!(graph.plan(Some("loop")), Err(BuildError::Cycle(_))));
    }

    #[test]
    fn display_is_mermaid() {
        let mut blueprint = Blueprint::new();
        blueprint.task("clean").run(|| Ok(()));
        blueprint.task("minify-css").depends_on(["clean"]).run(|| Ok(()));
        let graph = blueprint.finish().unwrap();

        let text = graph.to_string();
        assert!(text.starts_with("graph LR\n"));
        assert!(text.contains("    0[\"clean\"]"));
        assert!(text.contains("    1[\"minify-css\"]"));
        assert!(text.contains("    0 --> 1"));
    }
}
