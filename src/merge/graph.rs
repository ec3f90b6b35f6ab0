//! Ordering graph for sequence merges.
//!
//! Nodes are step names held in integer-indexed slots; edges mean "source
//! runs before target". The merge builds one graph out of the new sequence
//! order, the current sequence order, and rerun-dependency edges, then asks
//! for a topological order.

use std::collections::HashMap;

use crate::error::{Result, StagehandError};

/// Directed graph over step names with a deterministic topological order.
#[derive(Debug, Default)]
pub struct StepGraph {
    names: Vec<String>,
    index: HashMap<String, usize>,
    /// Adjacency lists: `edges[u]` contains `v` when `u` must precede `v`.
    edges: Vec<Vec<usize>>,
    /// Tie-break priority: lower rank is emitted first among ready nodes.
    rank: Vec<usize>,
}

impl StepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, keeping the rank of the first insertion.
    pub fn add_node(&mut self, name: &str, rank: usize) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), i);
        self.edges.push(Vec::new());
        self.rank.push(rank);
        i
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Add an edge meaning `before` must precede `after`. Both nodes must
    /// already exist; duplicate edges collapse to one.
    pub fn add_edge(&mut self, before: &str, after: &str) {
        let (Some(&u), Some(&v)) = (self.index.get(before), self.index.get(after)) else {
            return;
        };
        if u != v && !self.edges[u].contains(&v) {
            self.edges[u].push(v);
        }
    }

    /// Nodes in topological order, lowest rank first among ties.
    ///
    /// Returns [`StagehandError::CircularDependency`] naming one offending
    /// cycle when the graph cannot be ordered.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let n = self.names.len();
        let mut in_degree = vec![0usize; n];
        for targets in &self.edges {
            for &v in targets {
                in_degree[v] += 1;
            }
        }

        // Min-heap on (rank, index) keeps the emitted order stable across
        // runs regardless of node insertion order.
        use std::cmp::Reverse;
        use std::collections::BinaryHeap;
        let mut ready: BinaryHeap<Reverse<(usize, usize)>> = (0..n)
            .filter(|&i| in_degree[i] == 0)
            .map(|i| Reverse((self.rank[i], i)))
            .collect();

        let mut order = Vec::with_capacity(n);
        while let Some(Reverse((_, u))) = ready.pop() {
            order.push(self.names[u].clone());
            for &v in &self.edges[u] {
                in_degree[v] -= 1;
                if in_degree[v] == 0 {
                    ready.push(Reverse((self.rank[v], v)));
                }
            }
        }

        if order.len() != n {
            let cycle = self
                .find_cycle()
                .unwrap_or_else(|| {
                    // Unreachable when Kahn leaves nodes behind, but keep a
                    // usable message rather than panicking mid-merge.
                    self.names
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| in_degree[*i] > 0)
                        .map(|(_, s)| s.clone())
                        .collect()
                })
                .join(" -> ");
            return Err(StagehandError::CircularDependency { cycle });
        }

        Ok(order)
    }

    /// Find a cycle, returning its node path (first element repeated last)
    /// if one exists.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            Unvisited,
            Visiting,
            Visited,
        }

        fn dfs(
            node: usize,
            graph: &StepGraph,
            state: &mut Vec<State>,
            path: &mut Vec<usize>,
        ) -> Option<Vec<usize>> {
            state[node] = State::Visiting;
            path.push(node);

            for &next in &graph.edges[node] {
                match state[next] {
                    State::Visiting => {
                        let start = path.iter().position(|&p| p == next).unwrap();
                        let mut cycle = path[start..].to_vec();
                        cycle.push(next);
                        return Some(cycle);
                    }
                    State::Unvisited => {
                        if let Some(cycle) = dfs(next, graph, state, path) {
                            return Some(cycle);
                        }
                    }
                    State::Visited => {}
                }
            }

            path.pop();
            state[node] = State::Visited;
            None
        }

        let mut state = vec![State::Unvisited; self.names.len()];
        let mut path = Vec::new();
        for start in 0..self.names.len() {
            if state[start] == State::Unvisited {
                if let Some(cycle) = dfs(start, self, &mut state, &mut path) {
                    return Some(cycle.into_iter().map(|i| self.names[i].clone()).collect());
                }
            }
        }
        None
    }
}
