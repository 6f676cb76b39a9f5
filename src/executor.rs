//! Running a planned task graph.

use std::collections::HashMap;
use std::fmt::Write;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use petgraph::Direction;
use petgraph::graph::NodeIndex;
use tracing::Level;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::error::{BuildError, StageError};
use crate::graph::{Plan, TaskGraph, TaskNode};
use crate::utils::{as_overhead, get_style_build, get_style_task};

/// Lifecycle of a single task within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub struct TaskExecution {
    pub name: String,
    pub start: Instant,
    pub duration: Duration,
}

/// What a successful run did.
#[derive(Debug, Default)]
pub struct Diagnostics {
    /// The planned order.
    pub plan: Vec<String>,
    /// Executions in the order the tasks finished.
    pub executions: Vec<TaskExecution>,
    /// Final state of every planned task.
    pub states: HashMap<String, TaskState>,
}

impl Diagnostics {
    pub fn state(&self, name: &str) -> Option<TaskState> {
        self.states.get(name).copied()
    }

    pub fn duration(&self, name: &str) -> Option<Duration> {
        self.executions
            .iter()
            .find(|exec| exec.name == name)
            .map(|exec| exec.duration)
    }

    /// Renders the executed part of the graph as a Mermaid diagram,
    /// labelled with how long each task took.
    pub fn render_mermaid(&self, graph: &TaskGraph) -> String {
        let mut f = String::new();
        let _ = writeln!(f, "graph LR");

        for index in graph.graph.node_indices() {
            let task = graph.node(index);
            if !self.states.contains_key(&task.name) {
                continue;
            }

            let name = task.name.replace('"', "\\\"");
            let label = match self.duration(&task.name) {
                Some(duration) => format!("{duration:.2?}"),
                None => "Skipped".to_string(),
            };
            let _ = writeln!(f, "    {}[\"{}\\n{}\"]", index.index(), name, label);
        }

        for edge in graph.graph.raw_edges() {
            let source = &graph.node(edge.source()).name;
            let target = &graph.node(edge.target()).name;
            if self.states.contains_key(source) && self.states.contains_key(target) {
                let _ = writeln!(f, "    {} --> {}", edge.source().index(), edge.target().index());
            }
        }

        f
    }
}

type Finished = (NodeIndex, Result<(), StageError>, Instant, Duration);

/// Runs tasks of a [`TaskGraph`] in dependency order.
///
/// In parallel mode, tasks whose prerequisites are all `Done` are spawned on
/// a `rayon` pool owned by the run as soon as they become ready, while the
/// calling thread keeps track of what finished. In sequential mode the plan
/// order is followed one task at a time. Either way, the first failure stops
/// anything new from starting and is what the run reports.
pub struct Executor<'g> {
    graph: &'g TaskGraph,
    parallel: bool,
}

impl<'g> Executor<'g> {
    pub fn new(graph: &'g TaskGraph) -> Self {
        Self {
            graph,
            parallel: true,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run `target` (or the default task) together with its prerequisites.
    pub fn run(&self, target: Option<&str>) -> Result<Diagnostics, BuildError> {
        let plan = self.graph.plan(target)?;
        let s = Instant::now();

        tracing::info!(target = %plan.target, tasks = plan.len(), "running");

        let mut states: HashMap<NodeIndex, TaskState> = plan
            .order
            .iter()
            .map(|&index| (index, TaskState::Pending))
            .collect();

        let executions = if self.parallel {
            self.run_parallel(&plan, &mut states)?
        } else {
            self.run_sequential(&plan, &mut states)?
        };

        tracing::info!("Finished '{}' {}", plan.target, as_overhead(s));

        Ok(Diagnostics {
            plan: plan.tasks().to_vec(),
            executions,
            states: states
                .into_iter()
                .map(|(index, state)| (self.graph.node(index).name.clone(), state))
                .collect(),
        })
    }

    fn run_sequential(
        &self,
        plan: &Plan,
        states: &mut HashMap<NodeIndex, TaskState>,
    ) -> Result<Vec<TaskExecution>, BuildError> {
        let root_span = build_span(plan.len() as u64);
        let _enter = root_span.enter();

        let mut executions = Vec::with_capacity(plan.len());

        for &index in &plan.order {
            let task = self.graph.node(index);
            states.insert(index, TaskState::Running);

            let (result, start, duration) = execute(task);
            root_span.pb_inc(1);

            match result {
                Ok(()) => {
                    states.insert(index, TaskState::Done);
                    executions.push(TaskExecution {
                        name: task.name.clone(),
                        start,
                        duration,
                    });
                }
                Err(source) => {
                    states.insert(index, TaskState::Failed);
                    return Err(BuildError::Task {
                        name: task.name.clone(),
                        source,
                    });
                }
            }
        }

        Ok(executions)
    }

    fn run_parallel(
        &self,
        plan: &Plan,
        states: &mut HashMap<NodeIndex, TaskState>,
    ) -> Result<Vec<TaskExecution>, BuildError> {
        let graph = &self.graph.graph;

        // Every prerequisite of a planned task is planned too, so the counts
        // can be taken straight from the graph.
        let mut dependency_counts: HashMap<NodeIndex, usize> = plan
            .order
            .iter()
            .map(|&index| (index, graph.neighbors_directed(index, Direction::Incoming).count()))
            .collect();

        let root_span = build_span(plan.len() as u64);
        let _enter = root_span.enter();

        // The coordinator blocks on the channel, so it must not occupy a
        // worker of the pool the bodies run on.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(rayon::current_num_threads())
            .thread_name(|i| format!("assetline-{i}"))
            .build()?;

        let mut executions = Vec::with_capacity(plan.len());
        let mut failure: Option<BuildError> = None;

        pool.in_place_scope(|s| {
            let (sender, receiver) = channel::<Finished>();

            let spawn_task = |index: NodeIndex| {
                let task = self.graph.node(index);
                let sender = sender.clone();

                s.spawn(move |_| {
                    let (result, start, duration) = execute(task);
                    // The receiver outlives every spawned task.
                    let _ = sender.send((index, result, start, duration));
                });
            };

            let mut in_flight = 0usize;

            // Seed in plan order.
            for &index in &plan.order {
                if dependency_counts.get(&index) == Some(&0) {
                    states.insert(index, TaskState::Running);
                    spawn_task(index);
                    in_flight += 1;
                }
            }

            while in_flight > 0 {
                let Ok((index, result, start, duration)) = receiver.recv() else {
                    break;
                };
                in_flight -= 1;
                root_span.pb_inc(1);

                let name = self.graph.node(index).name.clone();

                match result {
                    Ok(()) => {
                        states.insert(index, TaskState::Done);
                        executions.push(TaskExecution {
                            name,
                            start,
                            duration,
                        });
                    }
                    Err(source) => {
                        states.insert(index, TaskState::Failed);
                        if failure.is_none() {
                            failure = Some(BuildError::Task { name, source });
                        }
                        continue;
                    }
                }

                if failure.is_some() {
                    continue;
                }

                let mut ready: Vec<NodeIndex> = Vec::new();
                for dependent in graph.neighbors_directed(index, Direction::Outgoing) {
                    if let Some(count) = dependency_counts.get_mut(&dependent) {
                        *count -= 1;
                        if *count == 0 {
                            ready.push(dependent);
                        }
                    }
                }

                ready.sort();
                for dependent in ready {
                    states.insert(dependent, TaskState::Running);
                    spawn_task(dependent);
                    in_flight += 1;
                }
            }
        });

        match failure {
            Some(err) => Err(err),
            None => Ok(executions),
        }
    }
}

fn build_span(len: u64) -> tracing::Span {
    let span = tracing::span!(Level::INFO, "building_tasks");
    span.pb_set_length(len);
    if let Ok(style) = get_style_build() {
        span.pb_set_style(&style);
    }
    span.pb_set_message("Running tasks...");
    span
}

/// Run one task body inside its own span, turning a panic into an error.
fn execute(task: &TaskNode) -> (Result<(), StageError>, Instant, Duration) {
    let span = tracing::span!(Level::INFO, "task", name = task.name.as_str());
    if let Ok(style) = get_style_task() {
        span.pb_set_style(&style);
    }
    span.pb_set_message(&format!("Running {}", task.name));
    let _enter = span.enter();

    tracing::debug!(task = task.name.as_str(), "started");
    let start = Instant::now();

    let result = match catch_unwind(AssertUnwindSafe(|| task.run())) {
        Ok(result) => result,
        Err(panic) => {
            let msg = if let Some(s) = panic.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                String::from("unknown payload")
            };

            Err(StageError::Panic(msg))
        }
    };

    let duration = start.elapsed();

    match &result {
        Ok(()) => tracing::info!("Finished {} {}", task.name, as_overhead(start)),
        Err(err) => tracing::error!(task = task.name.as_str(), "{err}"),
    }

    (result, start, duration)
}
