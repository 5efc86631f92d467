//! Task graph: named tasks with dependencies, run in dependency order.
//!
//! A graph is assembled with [`TaskGraphBuilder`] and validated once when
//! built (undefined dependencies, duplicates, cycles). Running a target
//! executes the target and its transitive dependencies exactly once each,
//! sequentially, every dependency before its dependents. The first failing
//! task aborts the run; nothing scheduled after it is started.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::types::TaskState;

/// Identifier usable as a task key.
pub trait TaskKey: Copy + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + 'static {}

impl<T> TaskKey for T where T: Copy + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + 'static {}

/// Unit of work attached to a task. `C` is the run context handed to every
/// action of a single run.
#[async_trait]
pub trait TaskAction<C: Send>: Send + Sync {
    async fn run(&self, ctx: &mut C) -> Result<()>;
}

struct TaskNode<K, C> {
    deps: Vec<K>,
    action: Option<Box<dyn TaskAction<C>>>,
}

/// Builder collecting task definitions before validation.
pub struct TaskGraphBuilder<K, C> {
    nodes: HashMap<K, TaskNode<K, C>>,
    order: Vec<K>,
    duplicate: Option<K>,
}

impl<K: TaskKey, C: Send + 'static> TaskGraphBuilder<K, C> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            duplicate: None,
        }
    }

    /// Register a task with an action.
    pub fn define<A>(self, id: K, deps: &[K], action: A) -> Self
    where
        A: TaskAction<C> + 'static,
    {
        self.insert(id, deps, Some(Box::new(action)))
    }

    /// Register a task that only groups its dependencies.
    pub fn alias(self, id: K, deps: &[K]) -> Self {
        self.insert(id, deps, None)
    }

    fn insert(mut self, id: K, deps: &[K], action: Option<Box<dyn TaskAction<C>>>) -> Self {
        if self.nodes.contains_key(&id) {
            self.duplicate.get_or_insert(id);
            return self;
        }
        self.order.push(id);
        self.nodes.insert(
            id,
            TaskNode {
                deps: deps.to_vec(),
                action,
            },
        );
        self
    }

    /// Validate and freeze the graph.
    pub fn build(self) -> Result<TaskGraph<K, C>> {
        if let Some(id) = self.duplicate {
            return Err(Error::DuplicateTask(id.to_string()));
        }

        for id in &self.order {
            for dep in &self.nodes[id].deps {
                if !self.nodes.contains_key(dep) {
                    return Err(Error::MissingDependency {
                        from: id.to_string(),
                        to: dep.to_string(),
                    });
                }
            }
        }

        let graph = TaskGraph {
            nodes: self.nodes,
            order: self.order,
        };
        graph.check_acyclic()?;
        Ok(graph)
    }
}

impl<K: TaskKey, C: Send + 'static> Default for TaskGraphBuilder<K, C> {
    fn default() -> Self {
        Self::new()
    }
}

/// A validated, acyclic task graph.
pub struct TaskGraph<K, C> {
    nodes: HashMap<K, TaskNode<K, C>>,
    order: Vec<K>,
}

impl<K: TaskKey, C: Send + 'static> TaskGraph<K, C> {
    pub fn builder() -> TaskGraphBuilder<K, C> {
        TaskGraphBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: K) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Tasks with their dependencies, in definition order.
    pub fn tasks(&self) -> impl Iterator<Item = (K, &[K])> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.nodes.get(id).map(|n| (*id, n.deps.as_slice())))
    }

    pub fn dependencies(&self, id: K) -> Option<&[K]> {
        self.nodes.get(&id).map(|n| n.deps.as_slice())
    }

    /// Kahn's algorithm over the whole graph.
    fn check_acyclic(&self) -> Result<()> {
        let mut in_degree: HashMap<K, usize> = HashMap::new();
        let mut dependents: HashMap<K, Vec<K>> = HashMap::new();

        for id in &self.order {
            let deps = &self.nodes[id].deps;
            in_degree.insert(*id, deps.len());
            for dep in deps {
                dependents.entry(*dep).or_default().push(*id);
            }
        }

        let mut queue: VecDeque<K> = self
            .order
            .iter()
            .filter(|id| in_degree[*id] == 0)
            .copied()
            .collect();
        let mut visited = 0;

        while let Some(id) = queue.pop_front() {
            visited += 1;
            if let Some(next) = dependents.get(&id) {
                for dependent in next {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(*dependent);
                        }
                    }
                }
            }
        }

        if visited != self.order.len() {
            let node = self
                .order
                .iter()
                .find(|id| in_degree[*id] > 0)
                .map(|id| id.to_string())
                .unwrap_or_default();
            return Err(Error::CycleDetected(node));
        }

        Ok(())
    }

    /// Execution order for `target`: every transitive dependency once,
    /// depth-first in declared order, the target last.
    pub fn plan(&self, target: K) -> Result<Vec<K>> {
        if !self.nodes.contains_key(&target) {
            return Err(Error::UnknownTask(target.to_string()));
        }
        let mut visited = HashSet::new();
        let mut plan = Vec::new();
        self.visit(target, &mut visited, &mut plan);
        Ok(plan)
    }

    fn visit(&self, id: K, visited: &mut HashSet<K>, plan: &mut Vec<K>) {
        if !visited.insert(id) {
            return;
        }
        if let Some(node) = self.nodes.get(&id) {
            for dep in &node.deps {
                self.visit(*dep, visited, plan);
            }
        }
        plan.push(id);
    }

    /// Run `target` and its dependencies against `ctx`.
    pub async fn run(&self, target: K, ctx: &mut C) -> Result<RunReport<K>> {
        let plan = self.plan(target)?;
        let mut report = RunReport::new(target, &plan);

        for id in plan {
            let node = self
                .nodes
                .get(&id)
                .ok_or_else(|| Error::UnknownTask(id.to_string()))?;

            report.set_state(id, TaskState::Running);
            info!("Starting '{}'...", id);
            let started = Instant::now();

            let outcome = match &node.action {
                Some(action) => action.run(ctx).await,
                None => Ok(()),
            };
            let duration_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(()) => {
                    info!("Finished '{}' after {} ms", id, duration_ms);
                    report.finish(id, TaskState::Succeeded, duration_ms);
                }
                Err(e) => {
                    error!("'{}' errored after {} ms: {}", id, duration_ms, e);
                    report.finish(id, TaskState::Failed, duration_ms);
                    return Err(Error::TaskFailed {
                        task: id.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}

/// Final state of one task in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord<K> {
    pub id: K,
    pub state: TaskState,
    pub duration_ms: u64,
}

/// Outcome of a successful graph run.
#[derive(Debug, Clone)]
pub struct RunReport<K> {
    pub target: K,
    pub tasks: Vec<TaskRecord<K>>,
}

impl<K: TaskKey> RunReport<K> {
    fn new(target: K, plan: &[K]) -> Self {
        Self {
            target,
            tasks: plan
                .iter()
                .map(|id| TaskRecord {
                    id: *id,
                    state: TaskState::Pending,
                    duration_ms: 0,
                })
                .collect(),
        }
    }

    fn set_state(&mut self, id: K, state: TaskState) {
        if let Some(record) = self.tasks.iter_mut().find(|r| r.id == id) {
            record.state = state;
        }
    }

    fn finish(&mut self, id: K, state: TaskState, duration_ms: u64) {
        if let Some(record) = self.tasks.iter_mut().find(|r| r.id == id) {
            record.state = state;
            record.duration_ms = duration_ms;
        }
    }

    /// Task ids in execution order.
    pub fn executed(&self) -> Vec<K> {
        self.tasks
            .iter()
            .filter(|r| r.state == TaskState::Succeeded)
            .map(|r| r.id)
            .collect()
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.tasks.iter().map(|r| r.duration_ms).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Appends its id to the run log.
    struct Record(u32);

    #[async_trait]
    impl TaskAction<Vec<u32>> for Record {
        async fn run(&self, ctx: &mut Vec<u32>) -> Result<()> {
            ctx.push(self.0);
            Ok(())
        }
    }

    /// Appends its id, then fails.
    struct Fail(u32);

    #[async_trait]
    impl TaskAction<Vec<u32>> for Fail {
        async fn run(&self, ctx: &mut Vec<u32>) -> Result<()> {
            ctx.push(self.0);
            Err(Error::Internal(format!("task {} broke", self.0)))
        }
    }

    fn diamond() -> TaskGraphBuilder<u32, Vec<u32>> {
        TaskGraph::builder()
            .define(1, &[], Record(1))
            .define(2, &[1], Record(2))
            .define(3, &[1], Record(3))
            .define(4, &[2, 3], Record(4))
    }

    #[tokio::test]
    async fn test_diamond_runs_each_dependency_once() {
        let graph = diamond().build().unwrap();
        let mut log = Vec::new();

        let report = graph.run(4, &mut log).await.unwrap();

        assert_eq!(log, vec![1, 2, 3, 4]);
        assert_eq!(report.executed(), vec![1, 2, 3, 4]);
        assert!(report
            .tasks
            .iter()
            .all(|r| r.state == TaskState::Succeeded));
    }

    #[tokio::test]
    async fn test_zero_dependency_task_runs_alone() {
        let graph = diamond().build().unwrap();
        let mut log = Vec::new();

        graph.run(1, &mut log).await.unwrap();

        assert_eq!(log, vec![1]);
    }

    #[tokio::test]
    async fn test_failure_aborts_dependents() {
        let graph = TaskGraph::builder()
            .define(1, &[], Record(1))
            .define(2, &[1], Fail(2))
            .define(3, &[1], Record(3))
            .define(4, &[2, 3], Record(4))
            .build()
            .unwrap();
        let mut log = Vec::new();

        let err = graph.run(4, &mut log).await.unwrap_err();

        assert!(matches!(err, Error::TaskFailed { ref task, .. } if task == "2"));
        assert!(!log.contains(&4));
        assert_eq!(log, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_alias_groups_dependencies() {
        let graph = diamond().alias(5, &[4]).build().unwrap();
        let mut log = Vec::new();

        let report = graph.run(5, &mut log).await.unwrap();

        assert_eq!(log, vec![1, 2, 3, 4]);
        assert_eq!(report.executed(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_cycle_rejected_at_build() {
        let result = TaskGraph::<u32, Vec<u32>>::builder()
            .define(1, &[3], Record(1))
            .define(2, &[1], Record(2))
            .define(3, &[2], Record(3))
            .define(4, &[], Record(4))
            .build();

        assert!(matches!(result, Err(Error::CycleDetected(_))));
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let result = TaskGraph::<u32, Vec<u32>>::builder()
            .define(1, &[1], Record(1))
            .build();

        assert!(matches!(result, Err(Error::CycleDetected(ref n)) if n == "1"));
    }

    #[test]
    fn test_missing_dependency_rejected() {
        let result = TaskGraph::<u32, Vec<u32>>::builder()
            .define(1, &[9], Record(1))
            .build();

        assert!(matches!(
            result,
            Err(Error::MissingDependency { ref from, ref to }) if from == "1" && to == "9"
        ));
    }

    #[test]
    fn test_duplicate_rejected() {
        let result = TaskGraph::<u32, Vec<u32>>::builder()
            .define(1, &[], Record(1))
            .define(1, &[], Record(1))
            .build();

        assert!(matches!(result, Err(Error::DuplicateTask(_))));
    }

    #[test]
    fn test_unknown_target() {
        let graph = diamond().build().unwrap();
        assert!(matches!(graph.plan(42), Err(Error::UnknownTask(_))));
    }

    #[tokio::test]
    async fn test_random_dags_respect_dependency_order() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let n: u32 = rng.gen_range(1..=12);
            let mut builder = TaskGraph::builder();
            let mut edges: HashMap<u32, Vec<u32>> = HashMap::new();

            for id in 0..n {
                let deps: Vec<u32> = (0..id).filter(|_| rng.gen_bool(1.0 / 3.0)).collect();
                builder = builder.define(id, &deps, Record(id));
                edges.insert(id, deps);
            }
            let graph = builder.build().unwrap();
            let target = n - 1;
            let mut log = Vec::new();

            graph.run(target, &mut log).await.unwrap();

            let unique: HashSet<u32> = log.iter().copied().collect();
            assert_eq!(unique.len(), log.len(), "a task ran twice: {:?}", log);
            assert_eq!(log.last(), Some(&target));

            let position: HashMap<u32, usize> =
                log.iter().enumerate().map(|(i, id)| (*id, i)).collect();
            for id in &log {
                for dep in &edges[id] {
                    assert!(
                        position[dep] < position[id],
                        "{} ran before its dependency {}",
                        id,
                        dep
                    );
                }
            }
        }
    }
}
