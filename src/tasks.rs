//! Dependency-aware task execution.
//!
//! A [`TaskGraph`] holds named one-shot tasks and their prerequisites. The
//! [`Scheduler`] runs it in dependency *waves*: every task whose
//! prerequisites have finished runs in the current wave, in parallel on
//! rayon workers or in id order when sequential. A task therefore never
//! waits or polls; ordering comes entirely from declared dependencies.

use anyhow::{Context, Result, anyhow, bail};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A one-shot unit of work.
pub type Task<'a> = Box<dyn FnOnce() -> Result<()> + Send + 'a>;

/// Index of a task inside its graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(usize);

impl TaskId {
    #[must_use]
    pub fn raw(&self) -> usize {
        self.0
    }
}

struct TaskNode<'a> {
    name: String,
    deps: Vec<TaskId>,
    run: Option<Task<'a>>,
}

/// Named tasks plus explicit prerequisite lists.
#[derive(Default)]
pub struct TaskGraph<'a> {
    nodes: Vec<TaskNode<'a>>,
}

impl<'a> TaskGraph<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a task with no prerequisites.
    pub fn add<F>(&mut self, name: impl Into<String>, task: F) -> TaskId
    where
        F: FnOnce() -> Result<()> + Send + 'a,
    {
        self.add_with_deps(name, Vec::new(), task)
    }

    /// Add a task that runs only after every task in `deps` has completed.
    pub fn add_with_deps<F>(&mut self, name: impl Into<String>, deps: Vec<TaskId>, task: F) -> TaskId
    where
        F: FnOnce() -> Result<()> + Send + 'a,
    {
        let id = TaskId(self.nodes.len());
        self.nodes.push(TaskNode {
            name: name.into(),
            deps,
            run: Some(Box::new(task)),
        });
        id
    }

    /// Append every task of `other`; returns the ids `other`'s tasks now have.
    pub fn extend(&mut self, other: TaskGraph<'a>) -> Vec<TaskId> {
        let base = self.nodes.len();
        let mut ids = Vec::with_capacity(other.nodes.len());
        for node in other.nodes {
            ids.push(TaskId(self.nodes.len()));
            self.nodes.push(TaskNode {
                name: node.name,
                deps: node.deps.into_iter().map(|d| TaskId(d.0 + base)).collect(),
                run: node.run,
            });
        }
        ids
    }

    #[must_use]
    pub fn name(&self, id: TaskId) -> Option<&str> {
        self.nodes.get(id.0).map(|n| n.name.as_str())
    }

    #[must_use]
    pub fn dependencies(&self, id: TaskId) -> &[TaskId] {
        self.nodes.get(id.0).map_or(&[][..], |n| n.deps.as_slice())
    }

    /// Group task ids into dependency waves.
    ///
    /// # Errors
    /// Fails on a dependency that names no task or on a cycle.
    pub fn waves(&self) -> Result<Vec<Vec<TaskId>>> {
        let n = self.nodes.len();
        let mut remaining = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, node) in self.nodes.iter().enumerate() {
            for dep in &node.deps {
                if dep.0 >= n {
                    bail!("task {:?} depends on unknown task #{}", node.name, dep.0);
                }
                remaining[i] += 1;
                dependents[dep.0].push(i);
            }
        }

        let mut waves = Vec::new();
        let mut ready: Vec<usize> = (0..n).filter(|i| remaining[*i] == 0).collect();
        let mut scheduled = 0;
        while !ready.is_empty() {
            scheduled += ready.len();
            let mut next = Vec::new();
            for &i in &ready {
                for &d in &dependents[i] {
                    remaining[d] -= 1;
                    if remaining[d] == 0 {
                        next.push(d);
                    }
                }
            }
            next.sort_unstable();
            waves.push(ready.into_iter().map(TaskId).collect());
            ready = next;
        }
        if scheduled != n {
            bail!("task graph has a dependency cycle");
        }
        Ok(waves)
    }
}

/// Wrap plain tasks into a graph given a per-task prerequisite list.
///
/// `deps[i]` lists indexes into `tasks` that task `i` waits for; `None`
/// (or a missing `deps`) means no prerequisites.
///
/// # Errors
/// Fails when `deps` is longer than `tasks`.
pub fn create_dependency_tasks<'a>(
    tasks: Vec<(String, Task<'a>)>,
    deps: Option<Vec<Option<Vec<usize>>>>,
) -> Result<TaskGraph<'a>> {
    let mut deps = deps.unwrap_or_default();
    if deps.len() > tasks.len() {
        bail!(
            "{} dependency lists given for {} tasks",
            deps.len(),
            tasks.len()
        );
    }
    deps.resize(tasks.len(), None);
    let mut graph = TaskGraph::new();
    for ((name, task), dep) in tasks.into_iter().zip(deps) {
        let dep_ids = dep.unwrap_or_default().into_iter().map(TaskId).collect();
        graph.add_with_deps(name, dep_ids, task);
    }
    Ok(graph)
}

/// How a [`Scheduler`] executes independent tasks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecMode {
    Sequential,
    /// Parallel on rayon; `threads` selects a dedicated pool of that size.
    Parallel { threads: Option<usize> },
}

impl Default for ExecMode {
    fn default() -> Self {
        Self::Parallel { threads: None }
    }
}

/// Runs task graphs and row-block jobs according to an [`ExecMode`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Scheduler {
    pub mode: ExecMode,
}

impl Scheduler {
    #[must_use]
    pub fn new(mode: ExecMode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub fn sequential() -> Self {
        Self::new(ExecMode::Sequential)
    }

    /// Default partition count for parallel work.
    #[must_use]
    pub fn default_partitions(&self) -> usize {
        match self.mode {
            ExecMode::Sequential => 1,
            ExecMode::Parallel { threads: None } => 2 * num_cpus::get().max(2),
            ExecMode::Parallel { threads: Some(t) } => 2 * t.max(1),
        }
    }

    /// Execute every task of `graph`, honoring dependencies.
    ///
    /// # Errors
    /// Returns the first task failure (with the task name as context), or a
    /// graph error for unknown dependencies and cycles.
    pub fn run(&self, mut graph: TaskGraph<'_>) -> Result<()> {
        let waves = graph.waves()?;
        log::debug!(
            "running {} tasks in {} waves ({:?})",
            graph.len(),
            waves.len(),
            self.mode
        );
        for wave in waves {
            let mut jobs: Vec<(String, Task<'_>)> = Vec::with_capacity(wave.len());
            for id in wave {
                let node = &mut graph.nodes[id.0];
                let run = node
                    .run
                    .take()
                    .ok_or_else(|| anyhow!("task {:?} already ran", node.name))?;
                jobs.push((node.name.clone(), run));
            }
            self.for_each(jobs, |(name, run)| {
                run().with_context(|| format!("task {name} failed"))
            })?;
        }
        Ok(())
    }

    /// Apply `f` to each item, in parallel unless sequential.
    ///
    /// # Errors
    /// Returns the first error produced by `f` (or a thread pool error).
    pub fn for_each<T, F>(&self, items: Vec<T>, f: F) -> Result<()>
    where
        T: Send,
        F: Fn(T) -> Result<()> + Send + Sync,
    {
        match self.mode {
            ExecMode::Sequential => items.into_iter().try_for_each(f),
            ExecMode::Parallel { threads: None } => items.into_par_iter().try_for_each(f),
            ExecMode::Parallel { threads: Some(t) } => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(t.max(1))
                    .build()
                    .context("build scheduler thread pool")?;
                pool.install(|| items.into_par_iter().try_for_each(f))
            }
        }
    }
}
