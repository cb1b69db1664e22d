// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use crate::config::model::{BlockConfig, PipelineConfig};

/// In-memory DAG over the build blocks, keyed by block name.
///
/// This is intentionally lightweight; acyclicity and reference validity are
/// already checked in `config::validate`, so here we keep adjacency
/// information plus the original declaration order, which determines the
/// order runnable blocks are returned in.
#[derive(Debug, Clone)]
pub struct BuildGraph {
    /// All blocks, in declaration order.
    blocks: Vec<BlockConfig>,
    /// Direct dependents: block name -> names of blocks that require it.
    dependents: HashMap<String, Vec<String>>,
}

impl BuildGraph {
    /// Build a graph from a validated [`PipelineConfig`].
    ///
    /// Assumes that:
    /// - all `requires` references are valid
    /// - there are no cycles
    pub fn from_config(cfg: &PipelineConfig) -> Self {
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();

        for block in &cfg.blocks {
            dependents.entry(block.name.clone()).or_default();
        }

        for block in &cfg.blocks {
            for dep in &block.requires {
                dependents
                    .entry(dep.clone())
                    .or_default()
                    .push(block.name.clone());
            }
        }

        Self {
            blocks: cfg.blocks.clone(),
            dependents,
        }
    }

    /// Number of blocks in the graph.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// All blocks in declaration order.
    pub fn blocks(&self) -> &[BlockConfig] {
        &self.blocks
    }

    /// Look up a block by name.
    pub fn block(&self, name: &str) -> Option<&BlockConfig> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// Direct dependents of a block (blocks that list it in `requires`).
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.dependents
            .get(name)
            .map(|d| d.as_slice())
            .unwrap_or(&[])
    }

    /// The set of blocks that can run *now*, given which blocks have
    /// completed successfully and which have failed.
    ///
    /// A block is runnable iff:
    /// - it has not already completed or failed,
    /// - none of its transitive prerequisites failed (such blocks are
    ///   poisoned: skipped for the rest of the pipeline, but never recorded
    ///   as broken themselves),
    /// - every direct prerequisite is in `completed`.
    ///
    /// Blocks are returned in declaration order, so the result is a pure,
    /// deterministic function of the graph and the two sets. The first call
    /// with both sets empty yields all blocks with no prerequisites.
    pub fn frontier(
        &self,
        completed: &HashSet<String>,
        broken: &HashSet<String>,
    ) -> Vec<&BlockConfig> {
        debug_assert!(
            completed.is_disjoint(broken),
            "a block cannot be both completed and broken"
        );

        let poisoned = self.poisoned_by(broken);

        self.blocks
            .iter()
            .filter(|b| {
                !completed.contains(&b.name)
                    && !broken.contains(&b.name)
                    && !poisoned.contains(b.name.as_str())
            })
            .filter(|b| b.requires.iter().all(|dep| completed.contains(dep)))
            .collect()
    }

    /// Names of all blocks with a broken block among their transitive
    /// prerequisites.
    fn poisoned_by(&self, broken: &HashSet<String>) -> HashSet<&str> {
        let mut poisoned: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = broken
            .iter()
            .flat_map(|name| self.dependents_of(name))
            .map(|s| s.as_str())
            .collect();

        while let Some(name) = stack.pop() {
            if !poisoned.insert(name) {
                continue;
            }
            for dependent in self.dependents_of(name) {
                stack.push(dependent);
            }
        }

        poisoned
    }
}
