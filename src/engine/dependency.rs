// ABOUTME: Dependency graph with Kahn's-algorithm ordering and longest-path level grouping
// ABOUTME: Cycle detection is fatal at schedule time; no partial order reaches an engine

use petgraph::graph::{Graph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, VecDeque};

use super::error::{ExecutionError, Result};
use super::workflow::Workflow;

/// Directed graph over a workflow's tasks; edges point dependency → dependent.
pub struct DependencyGraph {
    graph: Graph<String, ()>,
    task_indices: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Build the graph from a workflow. Node order follows declared task
    /// order, which keeps the topological order deterministic.
    pub fn from_workflow(workflow: &Workflow) -> Self {
        let mut graph = Graph::new();
        let mut task_indices = HashMap::new();

        for task in workflow.tasks() {
            let node = graph.add_node(task.id.clone());
            task_indices.insert(task.id.clone(), node);
        }

        for task in workflow.tasks() {
            let task_node = task_indices[&task.id];
            for dependency in &task.dependencies {
                // Workflow::add_dependency guarantees the id exists
                let dep_node = task_indices[dependency];
                graph.add_edge(dep_node, task_node, ());
            }
        }

        Self {
            graph,
            task_indices,
        }
    }

    /// Kahn's algorithm: repeatedly emit a zero-in-degree task and release
    /// its dependents. Emitting fewer tasks than the graph holds means a
    /// cycle; the error names the tasks still caught in it.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let mut in_degree: HashMap<NodeIndex, usize> = HashMap::new();
        for node in self.graph.node_indices() {
            in_degree.insert(
                node,
                self.graph
                    .neighbors_directed(node, Direction::Incoming)
                    .count(),
            );
        }

        let mut queue: VecDeque<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|n| in_degree[n] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.graph.node_count());

        while let Some(node) = queue.pop_front() {
            order.push(self.graph[node].clone());
            let mut released = Vec::new();
            for dependent in self.graph.neighbors_directed(node, Direction::Outgoing) {
                let degree = in_degree
                    .get_mut(&dependent)
                    .expect("dependent node is part of the graph");
                *degree -= 1;
                if *degree == 0 {
                    released.push(dependent);
                }
            }
            // Petgraph iterates neighbors newest-edge-first; re-sort released
            // tasks by declared position to keep the order deterministic.
            released.sort_by_key(|n| n.index());
            queue.extend(released);
        }

        if order.len() < self.graph.node_count() {
            let stuck: Vec<String> = self
                .graph
                .node_indices()
                .filter(|n| in_degree[n] > 0)
                .map(|n| self.graph[n].clone())
                .collect();
            return Err(ExecutionError::CycleDetected { tasks: stuck });
        }

        Ok(order)
    }

    /// Group tasks by longest-path distance from the roots. A task with no
    /// dependencies sits at level 0; otherwise one past its deepest
    /// dependency. Tasks in one level share no edge and may run together;
    /// levels execute in order. Requires an acyclic graph.
    pub fn levels(&self) -> Result<Vec<Vec<String>>> {
        let order = self.topological_order()?;

        let mut level_of: HashMap<String, usize> = HashMap::new();
        let mut levels: Vec<Vec<String>> = Vec::new();

        for task_id in order {
            let node = self.task_indices[&task_id];
            let level = self
                .graph
                .neighbors_directed(node, Direction::Incoming)
                .map(|dep| level_of[&self.graph[dep]] + 1)
                .max()
                .unwrap_or(0);

            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(task_id.clone());
            level_of.insert(task_id, level);
        }

        Ok(levels)
    }

    pub fn dependencies_of(&self, task_id: &str) -> Vec<String> {
        self.neighbors(task_id, Direction::Incoming)
    }

    pub fn dependents_of(&self, task_id: &str) -> Vec<String> {
        self.neighbors(task_id, Direction::Outgoing)
    }

    /// Tasks with no dependencies.
    pub fn root_tasks(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .filter(|n| {
                self.graph
                    .neighbors_directed(*n, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|n| self.graph[n].clone())
            .collect()
    }

    fn neighbors(&self, task_id: &str, direction: Direction) -> Vec<String> {
        match self.task_indices.get(task_id) {
            Some(&node) => self
                .graph
                .neighbors_directed(node, direction)
                .map(|n| self.graph[n].clone())
                .collect(),
            None => Vec::new(),
        }
    }
}
